//! Group normalized records by diagnosis label.

use std::collections::BTreeMap;

use crate::models::{AgeBucketScheme, DiseaseAggregate, NormalizedRecord};

/// Builds [`DiseaseAggregate`]s from normalized records.
///
/// Each call accumulates into a fresh local map and hands it back; the
/// aggregator itself holds no counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiseaseAggregator {
    scheme: AgeBucketScheme,
}

impl DiseaseAggregator {
    pub fn new(scheme: AgeBucketScheme) -> Self {
        Self { scheme }
    }

    pub fn scheme(&self) -> AgeBucketScheme {
        self.scheme
    }

    /// Aggregate records per diagnosis label, returned in label order.
    ///
    /// Final counts do not depend on input order.
    pub fn aggregate<'r, I>(&self, records: I) -> Vec<DiseaseAggregate>
    where
        I: IntoIterator<Item = &'r NormalizedRecord>,
    {
        let mut by_label: BTreeMap<&str, DiseaseAggregate> = BTreeMap::new();

        for record in records {
            let label = record.diagnosis_label.trim();
            if label.is_empty() {
                tracing::debug!(patient_id = %record.patient_id, "ignoring record without diagnosis label");
                continue;
            }

            by_label
                .entry(label)
                .or_insert_with(|| DiseaseAggregate::new(label, self.scheme))
                .absorb(record);
        }

        by_label.into_values().collect()
    }
}

/// Sum of `total_cases` over a set of aggregates.
pub fn total_cases(aggregates: &[DiseaseAggregate]) -> usize {
    aggregates.iter().map(|a| a.total_cases).sum()
}
