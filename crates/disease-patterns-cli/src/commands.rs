use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, info_span, warn};

use disease_patterns_core::analytics::{AgeGroupFilter, DateRange, DemographicFilter, GenderFilter};
use disease_patterns_core::export::{ExportMetadata, ExportOptions, ReportExporter};
use disease_patterns_core::models::{AgeBucketScheme, RawMedicalRecord, RawPatient};
use disease_patterns_core::snapshot::load_collection;
use disease_patterns_core::{AnalysisConfig, AnalysisReport, ClinicSnapshot, DiseaseAnalytics};

use crate::summary::render_table;

/// How the report is printed to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

/// Settings shared by every command that produces a report.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: OutputFormat,
    /// Write the delimited export into this directory.
    pub export_dir: Option<PathBuf>,
    /// Save the full report (with aggregates) as JSON for later re-slicing.
    pub save_report: Option<PathBuf>,
    pub delimiter: char,
    pub operator: String,
    /// Reference instant; the current time when absent.
    pub as_of: Option<DateTime<Utc>>,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Table,
            export_dir: None,
            save_report: None,
            delimiter: ExportOptions::default().delimiter,
            operator: "disease-patterns".to_string(),
            as_of: None,
        }
    }
}

/// Inputs and overrides for `analyze`.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    pub patients: PathBuf,
    pub records: PathBuf,
    pub config: Option<PathBuf>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub age_group: Option<String>,
    pub gender: Option<GenderFilter>,
    pub top_n: Option<usize>,
    pub scheme: Option<AgeBucketScheme>,
    pub latest: bool,
    pub output: OutputOptions,
}

/// Inputs for `reslice`.
#[derive(Debug, Clone, Default)]
pub struct ResliceOptions {
    /// A report previously written with `--save-report`.
    pub report: PathBuf,
    pub age_group: Option<String>,
    pub gender: Option<GenderFilter>,
    pub top_n: Option<usize>,
    pub output: OutputOptions,
}

/// What a command produced.
#[derive(Debug)]
pub struct CommandOutput {
    pub report: AnalysisReport,
    /// Text to print on stdout
    pub rendered: String,
    pub export_path: Option<PathBuf>,
}

pub fn run_analyze(options: &AnalyzeOptions) -> Result<CommandOutput> {
    let span = info_span!("analyze", records = %options.records.display());
    let _guard = span.enter();

    let config = build_config(options)?;
    let snapshot = load_snapshot(&options.patients, &options.records)?;
    if snapshot.is_degraded() {
        warn!(unavailable = ?snapshot.unavailable, "analysing a partial snapshot");
    }

    let analytics = DiseaseAnalytics::new(config, reference_instant(&options.output))
        .context("invalid analysis configuration")?;
    let report = analytics.analyze(&snapshot).context("analysis failed")?;
    finish(report, &options.output)
}

pub fn run_reslice(options: &ResliceOptions) -> Result<CommandOutput> {
    let span = info_span!("reslice", report = %options.report.display());
    let _guard = span.enter();

    let json = std::fs::read_to_string(&options.report)
        .with_context(|| format!("read cached report {}", options.report.display()))?;
    let cached = AnalysisReport::from_json(&json)
        .with_context(|| format!("parse cached report {}", options.report.display()))?;

    let mut config = AnalysisConfig {
        bucket_scheme: cached.metadata.bucket_scheme,
        ..AnalysisConfig::default()
    };
    if let Some(top_n) = options.top_n {
        config.top_n = top_n;
    }
    let filter = DemographicFilter::new(
        options
            .age_group
            .clone()
            .map(AgeGroupFilter::from)
            .unwrap_or_default(),
        options.gender.unwrap_or_default(),
    );

    let analytics = DiseaseAnalytics::new(config, reference_instant(&options.output))
        .context("invalid analysis configuration")?;
    let report = analytics
        .reslice(&cached, &filter)
        .context("re-slice failed")?;
    if report.metadata.approximate {
        warn!("age and gender were re-sliced together; counts are approximate");
    }
    finish(report, &options.output)
}

/// File config first, then command-line overrides.
pub fn build_config(options: &AnalyzeOptions) -> Result<AnalysisConfig> {
    let mut config = match &options.config {
        Some(path) => AnalysisConfig::from_json_file(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    match (options.from, options.to) {
        (Some(start), Some(end)) => {
            config.date_range = Some(DateRange::new(start, end).context("invalid date range")?);
        }
        (None, None) => {}
        _ => bail!("--from and --to must be given together"),
    }
    if let Some(group) = &options.age_group {
        config.age_group = AgeGroupFilter::from(group.clone());
    }
    if let Some(gender) = options.gender {
        config.gender = gender;
    }
    if let Some(top_n) = options.top_n {
        config.top_n = top_n;
    }
    if let Some(scheme) = options.scheme {
        config.bucket_scheme = scheme;
    }
    if options.latest {
        config.latest_per_patient = true;
    }

    config.validate().context("invalid analysis configuration")?;
    Ok(config)
}

/// Load both resources; a missing or unreadable file degrades that resource.
pub fn load_snapshot(patients: &Path, records: &Path) -> Result<ClinicSnapshot> {
    let patients = load_collection::<RawPatient>(patients)
        .with_context(|| format!("load patients {}", patients.display()));
    let records = load_collection::<RawMedicalRecord>(records)
        .with_context(|| format!("load medical records {}", records.display()));

    let snapshot = ClinicSnapshot::assemble(
        patients.map_err(|e| format!("{:#}", e)),
        records.map_err(|e| format!("{:#}", e)),
    )?;
    info!(
        patients = snapshot.patients.len(),
        records = snapshot.medical_records.len(),
        "loaded snapshot"
    );
    Ok(snapshot)
}

fn reference_instant(output: &OutputOptions) -> DateTime<Utc> {
    output.as_of.unwrap_or_else(Utc::now)
}

fn finish(report: AnalysisReport, output: &OutputOptions) -> Result<CommandOutput> {
    let exporter = ReportExporter::new(ExportOptions {
        delimiter: output.delimiter,
    });
    let metadata = ExportMetadata::for_report(&report, output.operator.clone());

    if let Some(path) = &output.save_report {
        let json = report.to_json().context("serialize report")?;
        std::fs::write(path, json).with_context(|| format!("save report {}", path.display()))?;
        info!(path = %path.display(), "saved report for re-slicing");
    }

    let export_path = match &output.export_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create export directory {}", dir.display()))?;
            Some(
                exporter
                    .write_to_dir(&report, &metadata, dir)
                    .context("write export")?,
            )
        }
        None => None,
    };

    let rendered = match output.format {
        OutputFormat::Table => render_table(&report),
        OutputFormat::Json => exporter.to_json(&report).context("serialize report")?,
        OutputFormat::Csv => exporter
            .to_delimited(&report, &metadata)
            .context("render delimited report")?,
    };

    Ok(CommandOutput {
        report,
        rendered,
        export_path,
    })
}
