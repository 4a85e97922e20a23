//! Integration tests for the analyze and reslice commands.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tempfile::TempDir;

use disease_patterns_cli::commands::{
    build_config, load_snapshot, run_analyze, run_reslice, AnalyzeOptions, OutputFormat,
    OutputOptions, ResliceOptions,
};
use disease_patterns_core::analytics::GenderFilter;
use disease_patterns_core::models::AgeBucketScheme;
use disease_patterns_core::snapshot::ResourceKind;
use disease_patterns_core::{AnalysisReport, AnalyticsError, Branch};

const PATIENTS: &str = r#"[
    {"id": "A", "birth_date": "1979-01-01", "sex": "male"},
    {"id": 2, "dob": "2016-03-01", "gender": "F"},
    {"id": "C", "birthDate": "1990-05-05", "sex_gender": "m"},
    "not a patient"
]"#;

const RECORDS: &str = r#"[
    {"patient_id": "A", "chief_complaint": "chest pain, sharp, no fever", "created_at": "2024-01-15T09:00:00Z"},
    {"patient_id": "A", "chief_complaint": "follow-up, resolved", "created_at": "2024-03-15T09:00:00Z"},
    {"patient_id": 2, "history_of_present_illness": "fever and cough", "created_at": "2024-02-10T09:00:00Z"},
    {"patient_id": "C", "created_at": "2024-02-11T09:00:00Z"}
]"#;

fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
}

struct Fixture {
    dir: TempDir,
    patients: PathBuf,
    records: PathBuf,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let patients = dir.path().join("patients.json");
    let records = dir.path().join("records.json");
    fs::write(&patients, PATIENTS).unwrap();
    fs::write(&records, RECORDS).unwrap();
    Fixture {
        dir,
        patients,
        records,
    }
}

fn output(format: OutputFormat) -> OutputOptions {
    OutputOptions {
        format,
        as_of: Some(as_of()),
        operator: "dr. tester".to_string(),
        ..OutputOptions::default()
    }
}

fn analyze_options(fixture: &Fixture, format: OutputFormat) -> AnalyzeOptions {
    AnalyzeOptions {
        patients: fixture.patients.clone(),
        records: fixture.records.clone(),
        output: output(format),
        ..AnalyzeOptions::default()
    }
}

fn write_config(dir: &Path, json: &str) -> PathBuf {
    let path = dir.join("config.json");
    fs::write(&path, json).unwrap();
    path
}

#[test]
fn test_analyze_latest_per_patient_table() {
    let fixture = fixture();
    let options = AnalyzeOptions {
        latest: true,
        ..analyze_options(&fixture, OutputFormat::Table)
    };

    let result = run_analyze(&options).unwrap();
    assert_eq!(result.report.metadata.branch, Branch::LatestPerPatient);
    let labels: Vec<&str> = result.report.rows.iter().map(|r| r.label()).collect();
    assert_eq!(labels, vec!["fever and cough", "follow-up, resolved"]);
    assert!(result
        .rendered
        .starts_with("Filters: latest record per patient\n"));
    assert!(result.export_path.is_none());
}

#[test]
fn test_analyze_writes_export_and_saved_report() {
    let fixture = fixture();
    let export_dir = fixture.dir.path().join("exports");
    let saved = fixture.dir.path().join("report.json");
    let mut options = analyze_options(&fixture, OutputFormat::Csv);
    options.output.export_dir = Some(export_dir.clone());
    options.output.save_report = Some(saved.clone());

    let result = run_analyze(&options).unwrap();

    let export_path = result.export_path.clone().unwrap();
    assert_eq!(export_path, export_dir.join("disease_patterns_2024-06-30.csv"));
    let written = fs::read_to_string(&export_path).unwrap();
    assert_eq!(written, result.rendered);
    assert!(written.starts_with("Disease Pattern Report\n"));
    assert!(written.contains("Generated By,dr. tester\n"));
    assert!(written.contains("Total Records,3\n"));

    let cached = AnalysisReport::from_json(&fs::read_to_string(&saved).unwrap()).unwrap();
    assert_eq!(cached.aggregates, result.report.aggregates);
}

#[test]
fn test_analyze_json_output_parses_back() {
    let fixture = fixture();
    let result = run_analyze(&analyze_options(&fixture, OutputFormat::Json)).unwrap();
    let parsed = AnalysisReport::from_json(&result.rendered).unwrap();
    assert_eq!(parsed.totals, result.report.totals);
    assert_eq!(parsed.totals.total_records, 3);
}

#[test]
fn test_semicolon_delimiter() {
    let fixture = fixture();
    let mut options = analyze_options(&fixture, OutputFormat::Csv);
    options.output.delimiter = ';';
    let result = run_analyze(&options).unwrap();
    assert!(result
        .rendered
        .contains("chest pain, sharp, no fever;1;33.33%;1;31-45;High"));
}

#[test]
fn test_flags_override_config_file() {
    let fixture = fixture();
    let config = write_config(
        fixture.dir.path(),
        r#"{"gender": "female", "topN": 5, "bucketScheme": "analytics"}"#,
    );
    let options = AnalyzeOptions {
        config: Some(config),
        gender: Some(GenderFilter::Male),
        ..analyze_options(&fixture, OutputFormat::Table)
    };

    let config = build_config(&options).unwrap();
    assert_eq!(config.gender, GenderFilter::Male);
    assert_eq!(config.top_n, 5);
    assert_eq!(config.bucket_scheme, AgeBucketScheme::Analytics);
}

#[test]
fn test_half_open_date_range_rejected() {
    let fixture = fixture();
    let options = AnalyzeOptions {
        from: NaiveDate::from_ymd_opt(2024, 1, 1),
        ..analyze_options(&fixture, OutputFormat::Table)
    };
    assert!(build_config(&options).is_err());
}

#[test]
fn test_age_group_from_other_scheme_rejected() {
    let fixture = fixture();
    let options = AnalyzeOptions {
        age_group: Some("19-35".to_string()),
        ..analyze_options(&fixture, OutputFormat::Table)
    };
    assert!(run_analyze(&options).is_err());
}

#[test]
fn test_no_data_is_distinguishable() {
    let fixture = fixture();
    let options = AnalyzeOptions {
        from: NaiveDate::from_ymd_opt(2023, 1, 1),
        to: NaiveDate::from_ymd_opt(2023, 12, 31),
        ..analyze_options(&fixture, OutputFormat::Table)
    };

    let error = run_analyze(&options).unwrap_err();
    match error.downcast_ref::<AnalyticsError>() {
        Some(AnalyticsError::NoDataForSelection { examined, .. }) => assert_eq!(*examined, 4),
        other => panic!("expected NoDataForSelection, got {:?}", other),
    }
}

#[test]
fn test_missing_patients_file_degrades() {
    let fixture = fixture();
    let missing = fixture.dir.path().join("absent.json");

    let snapshot = load_snapshot(&missing, &fixture.records).unwrap();
    assert_eq!(snapshot.unavailable, vec![ResourceKind::Patients]);
    assert_eq!(snapshot.medical_records.len(), 4);

    let both = load_snapshot(&missing, &missing).unwrap_err();
    assert!(matches!(
        both.downcast_ref::<AnalyticsError>(),
        Some(AnalyticsError::AllSourcesUnavailable)
    ));
}

#[test]
fn test_reslice_saved_report() {
    let fixture = fixture();
    let saved = fixture.dir.path().join("report.json");
    let mut options = analyze_options(&fixture, OutputFormat::Table);
    options.output.save_report = Some(saved.clone());
    run_analyze(&options).unwrap();

    let reslice = ResliceOptions {
        report: saved.clone(),
        age_group: Some("6-12".to_string()),
        output: output(OutputFormat::Table),
        ..ResliceOptions::default()
    };
    let result = run_reslice(&reslice).unwrap();
    assert_eq!(result.report.rows.len(), 1);
    assert_eq!(result.report.rows[0].label(), "fever and cough");
    assert!(!result.report.metadata.approximate);
    assert!(result.rendered.contains("aggregate-only"));

    let combined = ResliceOptions {
        report: saved,
        age_group: Some("31-45".to_string()),
        gender: Some(GenderFilter::Male),
        output: output(OutputFormat::Table),
        ..ResliceOptions::default()
    };
    let result = run_reslice(&combined).unwrap();
    assert!(result.report.metadata.approximate);
    assert!(result.rendered.contains("approximate"));
}

#[test]
fn test_reslice_unreadable_report() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.json");
    fs::write(&path, "{ not json").unwrap();
    let options = ResliceOptions {
        report: path,
        output: output(OutputFormat::Table),
        ..ResliceOptions::default()
    };
    assert!(run_reslice(&options).is_err());
}
