//! Point-in-time input snapshot assembled from independently fetched resources.

use std::fmt;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::analytics::{AnalyticsError, AnalyticsResult};
use crate::models::{RawMedicalRecord, RawPatient};

/// External resources the engine reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Patients,
    MedicalRecords,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::Patients => "patients",
            ResourceKind::MedicalRecords => "medical records",
        })
    }
}

/// Fully materialized inputs for one analysis run.
#[derive(Debug, Clone, Default)]
pub struct ClinicSnapshot {
    pub patients: Vec<RawPatient>,
    pub medical_records: Vec<RawMedicalRecord>,
    /// Resources whose fetch failed and were replaced by an empty collection
    pub unavailable: Vec<ResourceKind>,
}

impl ClinicSnapshot {
    pub fn new(patients: Vec<RawPatient>, medical_records: Vec<RawMedicalRecord>) -> Self {
        Self {
            patients,
            medical_records,
            unavailable: Vec::new(),
        }
    }

    /// Combine per-resource fetch results. A failed fetch degrades to an
    /// empty collection; only the failure of every resource is an error.
    pub fn assemble<E: fmt::Display>(
        patients: Result<Vec<RawPatient>, E>,
        medical_records: Result<Vec<RawMedicalRecord>, E>,
    ) -> AnalyticsResult<Self> {
        let mut unavailable = Vec::new();
        let patients = degrade(ResourceKind::Patients, patients, &mut unavailable);
        let medical_records = degrade(ResourceKind::MedicalRecords, medical_records, &mut unavailable);

        if unavailable.len() == 2 {
            return Err(AnalyticsError::AllSourcesUnavailable);
        }

        Ok(Self {
            patients,
            medical_records,
            unavailable,
        })
    }

    pub fn is_degraded(&self) -> bool {
        !self.unavailable.is_empty()
    }
}

fn degrade<T, E: fmt::Display>(
    kind: ResourceKind,
    fetched: Result<Vec<T>, E>,
    unavailable: &mut Vec<ResourceKind>,
) -> Vec<T> {
    match fetched {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(resource = %kind, error = %e, "resource unavailable, continuing with empty collection");
            unavailable.push(kind);
            Vec::new()
        }
    }
}

/// Parse a JSON array, skipping elements that do not deserialize as `T`.
///
/// Fails only when the document itself is not a JSON array.
pub fn parse_collection<T: DeserializeOwned>(json: &str) -> AnalyticsResult<Vec<T>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let total = values.len();

    let items: Vec<T> = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::debug!(index, error = %e, "skipping malformed element");
                None
            }
        })
        .collect();

    if items.len() < total {
        tracing::warn!(skipped = total - items.len(), total, "malformed elements skipped");
    }
    Ok(items)
}

/// Read and parse a JSON array file with [`parse_collection`].
pub fn load_collection<T: DeserializeOwned>(path: impl AsRef<Path>) -> AnalyticsResult<Vec<T>> {
    let json = std::fs::read_to_string(path)?;
    parse_collection(&json)
}
