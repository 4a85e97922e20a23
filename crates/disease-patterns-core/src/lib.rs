//! Disease Patterns Core Library
//!
//! Turns free-text clinical notes into ranked, demographically segmented
//! disease statistics.
//!
//! # Architecture
//!
//! ```text
//! Medical records + Patients (ClinicSnapshot)
//!                  │
//!                  ▼
//!          RecordNormalizer ──── skipped: unmatched patient,
//!                  │                      bad visit date, low-signal label
//!                  ▼
//!      TemporalFilter → DemographicFilter
//!                  │
//!       ┌──────────┴──────────┐
//!       │                     │
//!  [A] all records   [B] LatestPerPatientResolver
//!       │                     │
//!       └──────────┬──────────┘
//!                  ▼
//!          DiseaseAggregator ───────────────┐
//!                  │                        │ cached aggregates
//!                  ▼                        ▼
//!        DemographicSummarizer     DemographicFilter::reslice
//!                  │                 (aggregate-only, flagged)
//!                  ▼
//!                Ranker
//!                  │
//!                  ▼
//!           ReportExporter (delimited / JSON)
//! ```
//!
//! # Core Principle
//!
//! **Every run is a pure function of its snapshot.** The reference instant is
//! injected, aggregates are built fresh per call, and identical inputs give
//! byte-identical reports.
//!
//! # Modules
//!
//! - [`models`]: Domain types (raw inputs, normalized records, aggregates, summaries)
//! - [`normalizer`]: Diagnosis label, date, age, gender and tag resolution
//! - [`analytics`]: Filters, aggregation, summaries, ranking and the pipeline
//! - [`config`]: Caller-supplied analysis configuration
//! - [`snapshot`]: Partial-failure tolerant input assembly
//! - [`export`]: Delimited and JSON report export

pub mod analytics;
pub mod config;
pub mod export;
pub mod models;
pub mod normalizer;
pub mod snapshot;

// Re-export commonly used types
pub use analytics::{
    AnalysisMode, AnalysisReport, AnalysisTotals, AnalyticsError, AnalyticsResult, Branch,
    DemographicFilter, DiseaseAggregator, DiseaseAnalytics, LatestPerPatientResolver,
    RankedDisease, Ranker, ReportMetadata,
};
pub use config::{AnalysisConfig, ConfigError};
pub use export::{ExportMetadata, ExportOptions, ReportExporter, RiskTier};
pub use models::{
    AgeBucketScheme, DiseaseAggregate, DiseaseSummary, DominantGender, Gender, NormalizedRecord,
    RawMedicalRecord, RawPatient,
};
pub use normalizer::{NormalizationStats, RecordNormalizer, SkipReason, TagExtractor};
pub use snapshot::ClinicSnapshot;
