//! Disease analytics pipeline.
//!
//! Pipeline: Normalization → Temporal/Demographic Filter → [Latest per Patient]
//! → Aggregation → Summaries → Ranking
//!
//! Cached reports can be re-sliced by age group and gender without the raw
//! records (see [`DemographicFilter::reslice`]).

mod aggregator;
mod filter;
mod latest;
mod ranker;
mod summarizer;

pub use aggregator::*;
pub use filter::*;
pub use latest::*;
pub use ranker::*;
pub use summarizer::*;

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{describe_demographics, AnalysisConfig, ConfigError};
use crate::models::{AgeBucketScheme, DiseaseAggregate, NormalizedRecord};
use crate::normalizer::{NormalizationStats, RecordNormalizer, TagExtractor};
use crate::snapshot::{ClinicSnapshot, ResourceKind};

/// Analytics errors.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// Nothing usable remained after normalization and filtering.
    #[error("No data for this selection ({filter}): none of {examined} examined entries remained")]
    NoDataForSelection { examined: usize, filter: String },

    #[error("All data sources are unavailable")]
    AllSourcesUnavailable,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalyticsError {
    /// The selection was empty, as opposed to a failure reading inputs.
    pub fn is_no_data(&self) -> bool {
        matches!(self, AnalyticsError::NoDataForSelection { .. })
    }
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

/// Which record set feeds the aggregator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    /// Every visit counts
    #[default]
    AllRecords,
    /// Only the latest visit of each patient counts
    LatestPerPatient,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Branch::AllRecords => "all records",
            Branch::LatestPerPatient => "latest per patient",
        })
    }
}

/// How a report's numbers were obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Computed from normalized records
    #[default]
    Exact,
    /// Re-derived from cached aggregates
    AggregateOnly,
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnalysisMode::Exact => "exact",
            AnalysisMode::AggregateOnly => "aggregate-only",
        })
    }
}

/// Run metadata carried with every report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub branch: Branch,
    pub mode: AnalysisMode,
    pub bucket_scheme: AgeBucketScheme,
    pub filter_description: String,
    /// Age and gender were both re-sliced from cached aggregates
    pub approximate: bool,
    #[serde(default)]
    pub unavailable_sources: Vec<ResourceKind>,
}

/// Batch-wide totals over every disease that survived filtering.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisTotals {
    pub total_records: usize,
    pub unique_diagnosis_count: usize,
    pub unique_patients: usize,
    /// Rounded percentage of the top-ranked disease
    pub top_condition_prevalence: u32,
}

/// Ranked output of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,
    pub totals: AnalysisTotals,
    pub rows: Vec<RankedDisease>,
    /// Every aggregate before truncation, kept for re-slicing
    pub aggregates: Vec<DiseaseAggregate>,
    #[serde(default)]
    pub normalization: NormalizationStats,
}

impl AnalysisReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Runs the full pipeline for one configuration.
///
/// `now` is fixed at construction so repeated runs over the same snapshot
/// produce identical reports.
pub struct DiseaseAnalytics {
    config: AnalysisConfig,
    now: DateTime<Utc>,
    normalizer: RecordNormalizer,
}

impl DiseaseAnalytics {
    pub fn new(config: AnalysisConfig, now: DateTime<Utc>) -> AnalyticsResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            now,
            normalizer: RecordNormalizer::new(now),
        })
    }

    /// Replace the tag extractor (for custom catalogues).
    pub fn with_tag_extractor(mut self, tags: TagExtractor) -> Self {
        self.normalizer = RecordNormalizer::new(self.now).with_tag_extractor(tags);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyse the snapshot on the configured branch.
    pub fn analyze(&self, snapshot: &ClinicSnapshot) -> AnalyticsResult<AnalysisReport> {
        self.analyze_branch(snapshot, self.config.branch())
    }

    /// Analyse the snapshot on an explicit branch.
    pub fn analyze_branch(
        &self,
        snapshot: &ClinicSnapshot,
        branch: Branch,
    ) -> AnalyticsResult<AnalysisReport> {
        let scheme = self.config.bucket_scheme;
        let batch = self
            .normalizer
            .normalize_all(&snapshot.medical_records, &snapshot.patients);

        let dated = self.config.temporal_filter().apply(&batch.records);
        let selected = self.config.demographic_filter().apply_records(scheme, dated);

        let aggregator = DiseaseAggregator::new(scheme);
        let (aggregates, analysed) = match branch {
            Branch::AllRecords => (aggregator.aggregate(selected.iter().copied()), selected.len()),
            Branch::LatestPerPatient => {
                let latest: Vec<NormalizedRecord> =
                    LatestPerPatientResolver::new().resolve(selected.iter().copied());
                (aggregator.aggregate(&latest), latest.len())
            }
        };

        tracing::info!(
            %branch,
            input_records = batch.stats.input_records,
            normalized = batch.stats.normalized,
            skipped = batch.stats.skipped(),
            after_filters = selected.len(),
            analysed,
            diseases = aggregates.len(),
            "disease analysis complete"
        );

        let filter_description = self.config.describe();
        if aggregates.is_empty() {
            return Err(AnalyticsError::NoDataForSelection {
                examined: batch.stats.input_records,
                filter: filter_description,
            });
        }

        let metadata = ReportMetadata {
            generated_at: self.now,
            branch,
            mode: AnalysisMode::Exact,
            bucket_scheme: scheme,
            filter_description,
            approximate: false,
            unavailable_sources: snapshot.unavailable.clone(),
        };

        Ok(self.build_report(metadata, aggregates, batch.stats))
    }

    /// Re-slice a cached report by age group and gender without raw records.
    pub fn reslice(
        &self,
        cached: &AnalysisReport,
        filter: &DemographicFilter,
    ) -> AnalyticsResult<AnalysisReport> {
        let scheme = cached.metadata.bucket_scheme;
        filter.age_group.validate(scheme)?;

        let resliced = filter.reslice(&cached.aggregates);

        let parts = describe_demographics(filter);
        let filter_description = if parts.is_empty() {
            cached.metadata.filter_description.clone()
        } else {
            format!("{}; re-sliced by {}", cached.metadata.filter_description, parts.join(", "))
        };

        tracing::info!(
            cached = cached.aggregates.len(),
            remaining = resliced.aggregates.len(),
            approximate = resliced.approximate,
            "re-sliced cached aggregates"
        );

        if resliced.aggregates.is_empty() {
            return Err(AnalyticsError::NoDataForSelection {
                examined: cached.aggregates.len(),
                filter: filter_description,
            });
        }

        let metadata = ReportMetadata {
            generated_at: self.now,
            branch: cached.metadata.branch,
            mode: AnalysisMode::AggregateOnly,
            bucket_scheme: scheme,
            filter_description,
            approximate: resliced.approximate,
            unavailable_sources: cached.metadata.unavailable_sources.clone(),
        };

        Ok(self.build_report(metadata, resliced.aggregates, cached.normalization))
    }

    fn build_report(
        &self,
        metadata: ReportMetadata,
        aggregates: Vec<DiseaseAggregate>,
        normalization: NormalizationStats,
    ) -> AnalysisReport {
        let summarizer = DemographicSummarizer::new(self.config.top_age_buckets);
        let stats: Vec<DiseaseStats> = aggregates
            .iter()
            .cloned()
            .zip(summarizer.summarize_all(&aggregates))
            .map(|(aggregate, summary)| DiseaseStats { aggregate, summary })
            .collect();

        let rows = Ranker::new(self.config.top_n).rank(stats);
        let totals = compute_totals(&aggregates, &rows, metadata.mode);

        AnalysisReport {
            metadata,
            totals,
            rows,
            aggregates,
            normalization,
        }
    }
}

fn compute_totals(
    aggregates: &[DiseaseAggregate],
    rows: &[RankedDisease],
    mode: AnalysisMode,
) -> AnalysisTotals {
    let total_records = total_cases(aggregates);
    let patients: BTreeSet<&str> = aggregates
        .iter()
        .flat_map(|a| a.unique_patients.iter().map(String::as_str))
        .collect();
    // Re-sliced aggregates keep their unfiltered patient sets
    let unique_patients = match mode {
        AnalysisMode::Exact => patients.len(),
        AnalysisMode::AggregateOnly => patients.len().min(total_records),
    };

    AnalysisTotals {
        total_records,
        unique_diagnosis_count: aggregates.len(),
        unique_patients,
        top_condition_prevalence: rows.first().map_or(0, |r| r.summary.percentage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Precision, RawMedicalRecord, RawPatient};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    fn note(patient: &str, complaint: &str, date: &str) -> RawMedicalRecord {
        RawMedicalRecord {
            chief_complaint: Some(complaint.into()),
            created_at: Some(date.into()),
            ..RawMedicalRecord::new(patient)
        }
    }

    fn snapshot() -> ClinicSnapshot {
        ClinicSnapshot::new(
            vec![
                RawPatient::new("A").with_birth_date("1990-01-01").with_sex("M"),
                RawPatient::new("B").with_birth_date("2016-03-01").with_sex("F"),
                RawPatient::new("C").with_birth_date("1950-05-05").with_sex("F"),
            ],
            vec![
                note("A", "fever and cough", "2024-01-10"),
                note("B", "fever and cough", "2024-02-11"),
                note("C", "hypertension", "2024-02-12"),
                note("A", "fever and cough", "2024-03-01"),
            ],
        )
    }

    #[test]
    fn test_analyze_all_records() {
        let engine = DiseaseAnalytics::new(AnalysisConfig::default(), now()).unwrap();
        let report = engine.analyze(&snapshot()).unwrap();

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].label(), "fever and cough");
        assert_eq!(report.rows[0].summary.total_cases, 3);
        assert_eq!(report.rows[0].summary.percentage, 75);
        assert_eq!(report.totals.total_records, 4);
        assert_eq!(report.totals.unique_diagnosis_count, 2);
        assert_eq!(report.totals.unique_patients, 3);
        assert_eq!(report.totals.top_condition_prevalence, 75);
        assert_eq!(report.metadata.mode, AnalysisMode::Exact);
        assert_eq!(report.normalization.normalized, 4);
    }

    #[test]
    fn test_latest_branch() {
        let engine = DiseaseAnalytics::new(AnalysisConfig::default(), now()).unwrap();
        let report = engine.analyze_branch(&snapshot(), Branch::LatestPerPatient).unwrap();
        assert_eq!(report.totals.total_records, 3);
        assert_eq!(report.metadata.branch, Branch::LatestPerPatient);
    }

    #[test]
    fn test_empty_selection_is_distinct_error() {
        let config = AnalysisConfig {
            gender: GenderFilter::Unknown,
            ..AnalysisConfig::default()
        };
        let engine = DiseaseAnalytics::new(config, now()).unwrap();
        let err = engine.analyze(&snapshot()).unwrap_err();
        assert!(err.is_no_data());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AnalysisConfig {
            top_n: 0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            DiseaseAnalytics::new(config, now()),
            Err(AnalyticsError::Config(ConfigError::ZeroTopN))
        ));
    }

    #[test]
    fn test_reslice_report() {
        let engine = DiseaseAnalytics::new(AnalysisConfig::default(), now()).unwrap();
        let cached = engine.analyze(&snapshot()).unwrap();

        let filter = DemographicFilter::new(AgeGroupFilter::All, GenderFilter::Female);
        let resliced = engine.reslice(&cached, &filter).unwrap();
        assert_eq!(resliced.metadata.mode, AnalysisMode::AggregateOnly);
        assert!(!resliced.metadata.approximate);
        assert!(resliced.metadata.filter_description.ends_with("re-sliced by gender female"));
        assert!(resliced.aggregates.iter().all(|a| a.precision == Precision::Resliced));
        // hypertension 1 female of 1; fever and cough 1 female of 3
        assert_eq!(resliced.totals.total_records, 2);
        assert_eq!(resliced.totals.unique_patients, 2);
        assert!(resliced.totals.unique_patients <= resliced.totals.total_records);

        let filter = DemographicFilter::new(AgeGroupFilter::Bucket("31-45".into()), GenderFilter::Male);
        let resliced = engine.reslice(&cached, &filter).unwrap();
        assert!(resliced.metadata.approximate);
        // 2 cases in 31-45 scaled by 2 of 3 male
        assert_eq!(resliced.rows[0].summary.total_cases, 1);
        assert_eq!(resliced.totals.unique_patients, 1);
    }

    #[test]
    fn test_report_json_roundtrip_for_caching() {
        let engine = DiseaseAnalytics::new(AnalysisConfig::default(), now()).unwrap();
        let report = engine.analyze(&snapshot()).unwrap();
        let restored = AnalysisReport::from_json(&report.to_json().unwrap()).unwrap();
        assert_eq!(restored.aggregates, report.aggregates);
        assert_eq!(restored.totals, report.totals);
        assert_eq!(restored.metadata, report.metadata);
    }
}
