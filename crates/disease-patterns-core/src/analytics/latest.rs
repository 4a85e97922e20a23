//! Reduce a record set to the latest record per patient.

use std::collections::HashMap;

use crate::models::NormalizedRecord;

/// Keeps one record per patient: the one with the latest visit timestamp.
///
/// A record only replaces the current pick when it is strictly later, so on
/// an exact tie the record seen first in input order wins. Output follows the
/// order in which each patient first appears in the input.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatestPerPatientResolver;

impl LatestPerPatientResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `records` to at most one record per distinct patient id.
    pub fn resolve<'r, I>(&self, records: I) -> Vec<NormalizedRecord>
    where
        I: IntoIterator<Item = &'r NormalizedRecord>,
    {
        let mut latest: Vec<&NormalizedRecord> = Vec::new();
        let mut slot_by_patient: HashMap<&str, usize> = HashMap::new();

        for record in records {
            match slot_by_patient.get(record.patient_id.as_str()) {
                Some(&slot) => {
                    if record.visit_date > latest[slot].visit_date {
                        latest[slot] = record;
                    }
                }
                None => {
                    slot_by_patient.insert(record.patient_id.as_str(), latest.len());
                    latest.push(record);
                }
            }
        }

        latest.into_iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;

    fn record(patient: &str, label: &str, y: i32, m: u32, d: u32) -> NormalizedRecord {
        NormalizedRecord {
            patient_id: patient.into(),
            diagnosis_label: label.into(),
            visit_date: Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap(),
            age: Some(30),
            gender: Gender::Female,
            tags: BTreeSet::new(),
        }
    }

    #[test]
    fn test_latest_record_wins() {
        let records = vec![
            record("P7", "first visit", 2024, 1, 1),
            record("P7", "second visit", 2024, 6, 15),
        ];
        let latest = LatestPerPatientResolver::new().resolve(&records);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].diagnosis_label, "second visit");
    }

    #[test]
    fn test_input_order_irrelevant_for_distinct_dates() {
        let records = vec![
            record("P7", "second visit", 2024, 6, 15),
            record("P7", "first visit", 2024, 1, 1),
        ];
        let latest = LatestPerPatientResolver::new().resolve(&records);
        assert_eq!(latest[0].diagnosis_label, "second visit");
    }

    #[test]
    fn test_exact_tie_keeps_first_in_input_order() {
        let records = vec![
            record("P1", "entered first", 2024, 3, 3),
            record("P1", "entered second", 2024, 3, 3),
        ];
        let latest = LatestPerPatientResolver::new().resolve(&records);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].diagnosis_label, "entered first");
    }

    #[test]
    fn test_one_record_per_patient_in_first_seen_order() {
        let records = vec![
            record("B", "b1", 2024, 1, 1),
            record("A", "a1", 2024, 1, 2),
            record("B", "b2", 2024, 2, 1),
            record("C", "c1", 2024, 1, 3),
        ];
        let latest = LatestPerPatientResolver::new().resolve(&records);
        let ids: Vec<&str> = latest.iter().map(|r| r.patient_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A", "C"]);
        assert_eq!(latest[0].diagnosis_label, "b2");
    }

    #[test]
    fn test_empty_input() {
        let latest = LatestPerPatientResolver::new().resolve(&Vec::<NormalizedRecord>::new());
        assert!(latest.is_empty());
    }
}
