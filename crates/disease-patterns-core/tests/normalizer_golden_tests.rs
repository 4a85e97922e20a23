//! Golden tests for the record normalizer.
//!
//! These tests verify label, age, gender and tag resolution against known
//! test cases.

use chrono::{DateTime, TimeZone, Utc};
use disease_patterns_core::models::{Gender, RawMedicalRecord, RawPatient};
use disease_patterns_core::normalizer::{RecordNormalizer, SkipReason, FALLBACK_LABEL};

/// Test case from golden file.
struct GoldenCase {
    id: &'static str,
    hpi: Option<&'static str>,
    chief_complaint: Option<&'static str>,
    assessment: Option<&'static str>,
    created_at: Option<&'static str>,
    visit_date: Option<&'static str>,
    expected: Result<Expected, SkipReason>,
}

struct Expected {
    label: &'static str,
    visit_month: &'static str,
    tags: &'static [&'static str],
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
}

fn get_golden_cases() -> Vec<GoldenCase> {
    vec![
        GoldenCase {
            id: "hpi-preferred",
            hpi: Some("History of Present Illness: Loose stools for 3 days, no fever"),
            chief_complaint: Some("Chief Complaint: diarrhea"),
            assessment: None,
            created_at: Some("2024-02-03T10:15:00Z"),
            visit_date: None,
            expected: Ok(Expected {
                label: "Loose stools for 3 days, no fever",
                visit_month: "2024-02",
                tags: &["diarrhea"],
            }),
        },
        GoldenCase {
            id: "chief-complaint-prefix-stripped",
            hpi: Some("  "),
            chief_complaint: Some("CHIEF COMPLAINT: Productive cough and colds"),
            assessment: None,
            created_at: Some("2024-03-09 08:30:00"),
            visit_date: None,
            expected: Ok(Expected {
                label: "Productive cough and colds",
                visit_month: "2024-03",
                tags: &["colds", "cough"],
            }),
        },
        GoldenCase {
            id: "assessment-fallback",
            hpi: None,
            chief_complaint: Some("ok"),
            assessment: Some("Assessment: Hypertension stage 2, continue Amlodipine"),
            created_at: None,
            visit_date: Some("2024-04-01"),
            expected: Ok(Expected {
                label: "Hypertension stage 2, continue Amlodipine",
                visit_month: "2024-04",
                tags: &["amlodipine"],
            }),
        },
        GoldenCase {
            id: "long-text-kept-verbatim-untruncated",
            hpi: None,
            chief_complaint: Some(
                "Patient reports intermittent headache over the past two weeks, worse in the \
                 morning, relieved by Paracetamol; denies dizziness and denies nausea",
            ),
            assessment: None,
            created_at: Some("2024-05-20T23:59:59+08:00"),
            visit_date: None,
            expected: Ok(Expected {
                label: "Patient reports intermittent headache over the past two weeks, worse in the \
                        morning, relieved by Paracetamol; denies dizziness and denies nausea",
                visit_month: "2024-05",
                tags: &["headache", "paracetamol"],
            }),
        },
        GoldenCase {
            id: "prefix-only-verbatim",
            hpi: Some("History: n/a"),
            chief_complaint: None,
            assessment: None,
            created_at: Some("2024-01-05"),
            visit_date: None,
            expected: Ok(Expected {
                label: "History: n/a",
                visit_month: "2024-01",
                tags: &[],
            }),
        },
        GoldenCase {
            id: "ok-only-excluded",
            hpi: None,
            chief_complaint: Some("ok"),
            assessment: None,
            created_at: Some("2024-01-05"),
            visit_date: None,
            expected: Err(SkipReason::LowSignalLabel),
        },
        GoldenCase {
            id: "no-text-excluded",
            hpi: None,
            chief_complaint: None,
            assessment: None,
            created_at: Some("2024-01-05"),
            visit_date: None,
            expected: Err(SkipReason::LowSignalLabel),
        },
        GoldenCase {
            id: "bad-creation-time-falls-through",
            hpi: None,
            chief_complaint: Some("Sore throat and fever"),
            assessment: None,
            created_at: Some("not a date"),
            visit_date: Some("2024-06-01T09:00:00"),
            expected: Ok(Expected {
                label: "Sore throat and fever",
                visit_month: "2024-06",
                tags: &["fever", "sore throat"],
            }),
        },
        GoldenCase {
            id: "no-parseable-date",
            hpi: None,
            chief_complaint: Some("Sore throat and fever"),
            assessment: None,
            created_at: Some("31/12/2023"),
            visit_date: None,
            expected: Err(SkipReason::InvalidVisitDate),
        },
    ]
}

#[test]
fn test_golden_cases() {
    let normalizer = RecordNormalizer::new(now());
    let patient = RawPatient::new("P1").with_birth_date("1979-01-01").with_sex("F");

    for case in get_golden_cases() {
        let record = RawMedicalRecord {
            history_of_present_illness: case.hpi.map(String::from),
            chief_complaint: case.chief_complaint.map(String::from),
            assessment: case.assessment.map(String::from),
            created_at: case.created_at.map(String::from),
            visit_date: case.visit_date.map(String::from),
            ..RawMedicalRecord::new("P1")
        };

        let result = normalizer.normalize(&record, Some(&patient));

        match (&case.expected, result) {
            (Ok(expected), Ok(normalized)) => {
                assert_eq!(normalized.diagnosis_label, expected.label, "Case {}: label mismatch", case.id);
                assert_ne!(normalized.diagnosis_label, FALLBACK_LABEL, "Case {}", case.id);
                assert_eq!(normalized.visit_month(), expected.visit_month, "Case {}: month mismatch", case.id);
                let tags: Vec<&str> = normalized.tags.iter().map(|t| t.name.as_str()).collect();
                let mut expected_tags = expected.tags.to_vec();
                expected_tags.sort_unstable();
                let mut actual_tags = tags.clone();
                actual_tags.sort_unstable();
                assert_eq!(actual_tags, expected_tags, "Case {}: tags mismatch", case.id);
                assert_eq!(normalized.age, Some(45), "Case {}: age mismatch", case.id);
                assert_eq!(normalized.gender, Gender::Female, "Case {}: gender mismatch", case.id);
            }
            (Err(reason), Err(actual)) => {
                assert_eq!(actual, *reason, "Case {}: skip reason mismatch", case.id);
            }
            (expected, actual) => panic!(
                "Case {}: expected {}, got {:?}",
                case.id,
                if expected.is_ok() { "a record" } else { "a skip" },
                actual.map(|r| r.diagnosis_label)
            ),
        }
    }
}

#[test]
fn test_patient_field_aliases() {
    let normalizer = RecordNormalizer::new(now());
    let record = RawMedicalRecord {
        chief_complaint: Some("fever and cough".into()),
        created_at: Some("2024-02-01".into()),
        ..RawMedicalRecord::new("P2")
    };

    let json_cases = [
        (r#"{"id": "P2", "date_of_birth": "2016-03-01", "gender": "female"}"#, Some(8), Gender::Female),
        (r#"{"id": "P2", "birthdate": "2016-03-01", "sex_gender": "M"}"#, Some(8), Gender::Male),
        (r#"{"id": "P2", "dob": "1890-01-01", "sex": "F"}"#, None, Gender::Female),
        (r#"{"id": "P2", "birthDate": "2016-03-01", "sex": "other", "gender": "m"}"#, Some(8), Gender::Male),
        (r#"{"id": "P2", "birth_date": null, "dob": "2016-03-01"}"#, Some(8), Gender::Unknown),
    ];

    for (json, age, gender) in json_cases {
        let patient: RawPatient = serde_json::from_str(json).unwrap();
        let normalized = normalizer.normalize(&record, Some(&patient)).unwrap();
        assert_eq!(normalized.age, age, "{}", json);
        assert_eq!(normalized.gender, gender, "{}", json);
    }
}

#[test]
fn test_negation_table_cases() {
    let normalizer = RecordNormalizer::new(now());
    let patient = RawPatient::new("P3");
    let cases: &[(&str, &[&str])] = &[
        ("no diarrhea, no fever", &[]),
        ("severe diarrhea", &["diarrhea"]),
        ("Afebrile. Cough for 2 days", &["cough"]),
        ("Vomiting twice, denies abdominal pain", &["vomiting"]),
        ("Rash on arms, no rash on legs", &[]),
    ];

    for (text, expected) in cases {
        let record = RawMedicalRecord {
            history_of_present_illness: Some(text.to_string()),
            created_at: Some("2024-02-01".into()),
            ..RawMedicalRecord::new("P3")
        };
        let normalized = normalizer.normalize(&record, Some(&patient)).unwrap();
        let tags: Vec<&str> = normalized.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tags, *expected, "text: {}", text);
    }
}
