//! Record normalizer: raw medical record + patient → [`NormalizedRecord`].
//!
//! Handles:
//! - Diagnosis label resolution from the note fields
//! - Visit date, age and gender resolution through ordered field probes
//! - Symptom/medication tag extraction with negation handling
//!
//! Bad records are skipped with a [`SkipReason`], never surfaced as errors.

mod diagnosis;
mod fields;
mod tags;

pub use diagnosis::*;
pub use fields::*;
pub use tags::*;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{NormalizedRecord, RawMedicalRecord, RawPatient};

/// Why a record was left out of the analysis.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    #[error("no patient matches the record's patient id")]
    UnmatchedPatient,

    #[error("no visit timestamp field could be parsed")]
    InvalidVisitDate,

    #[error("diagnosis text carries no usable signal")]
    LowSignalLabel,
}

/// Counts of what happened to each input record during normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationStats {
    pub input_records: usize,
    pub normalized: usize,
    pub unmatched_patient: usize,
    pub invalid_visit_date: usize,
    pub low_signal_label: usize,
}

impl NormalizationStats {
    fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::UnmatchedPatient => self.unmatched_patient += 1,
            SkipReason::InvalidVisitDate => self.invalid_visit_date += 1,
            SkipReason::LowSignalLabel => self.low_signal_label += 1,
        }
    }

    /// Total number of skipped records.
    pub fn skipped(&self) -> usize {
        self.unmatched_patient + self.invalid_visit_date + self.low_signal_label
    }
}

/// Normalized records of a batch together with the skip statistics.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub records: Vec<NormalizedRecord>,
    pub stats: NormalizationStats,
}

/// Turns raw records into [`NormalizedRecord`]s.
pub struct RecordNormalizer {
    /// Reference instant for age computation
    now: DateTime<Utc>,
    tags: TagExtractor,
}

impl RecordNormalizer {
    /// Create a normalizer computing ages relative to `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            tags: TagExtractor::new(),
        }
    }

    /// Replace the tag extractor (for custom catalogues).
    pub fn with_tag_extractor(mut self, tags: TagExtractor) -> Self {
        self.tags = tags;
        self
    }

    /// Get the tag extractor for direct access.
    pub fn tag_extractor(&self) -> &TagExtractor {
        &self.tags
    }

    /// Normalize one record against its patient (`None` when no patient
    /// matched the record's id).
    pub fn normalize(
        &self,
        record: &RawMedicalRecord,
        patient: Option<&RawPatient>,
    ) -> Result<NormalizedRecord, SkipReason> {
        let patient = patient.ok_or(SkipReason::UnmatchedPatient)?;
        let visit_date = resolve_visit_date(record).ok_or(SkipReason::InvalidVisitDate)?;

        let diagnosis_label = resolve_label(record);
        if is_low_signal(&diagnosis_label) {
            return Err(SkipReason::LowSignalLabel);
        }

        // Explicit values recorded at the visit win over the patient record
        let age = record
            .age
            .and_then(plausible_age)
            .or_else(|| resolve_patient_age(patient, self.now));
        let gender = record
            .gender
            .as_deref()
            .and_then(parse_known_gender)
            .unwrap_or_else(|| resolve_patient_gender(patient));

        Ok(NormalizedRecord {
            patient_id: record.patient_id.clone(),
            diagnosis_label,
            visit_date,
            age,
            gender,
            tags: self.tags.extract(&record.free_text()),
        })
    }

    /// Normalize a batch, matching records to patients by id. Skipped records
    /// are counted, never fatal.
    pub fn normalize_all(
        &self,
        records: &[RawMedicalRecord],
        patients: &[RawPatient],
    ) -> NormalizedBatch {
        let mut by_id: HashMap<&str, &RawPatient> = HashMap::with_capacity(patients.len());
        for patient in patients {
            by_id.entry(patient.id.as_str()).or_insert(patient);
        }

        let mut batch = NormalizedBatch {
            records: Vec::with_capacity(records.len()),
            stats: NormalizationStats {
                input_records: records.len(),
                ..NormalizationStats::default()
            },
        };

        for (index, record) in records.iter().enumerate() {
            let patient = by_id.get(record.patient_id.as_str()).copied();
            match self.normalize(record, patient) {
                Ok(normalized) => batch.records.push(normalized),
                Err(reason) => {
                    tracing::debug!(index, %reason, "skipping medical record");
                    batch.stats.record_skip(reason);
                }
            }
        }

        batch.stats.normalized = batch.records.len();
        batch
    }
}
