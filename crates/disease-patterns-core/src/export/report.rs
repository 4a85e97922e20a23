//! Delimited and JSON export of ranked disease reports.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::analytics::{AnalysisReport, AnalyticsResult, RankedDisease};

/// Default record separator.
pub const DEFAULT_DELIMITER: char = ',';

/// Column headers of the disease rows.
pub const ROW_HEADERS: [&str; 7] = [
    "Rank",
    "Diagnosis",
    "Total Cases",
    "Percentage",
    "Unique Patients",
    "Dominant Age Group",
    "Risk Level",
];

/// Risk classification by share of total case volume.
///
/// | tier | percentage |
/// |---|---|
/// | High | > 15 |
/// | Medium | > 8 |
/// | Low | otherwise |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    High,
    Medium,
    Low,
}

impl RiskTier {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage > 15.0 {
            RiskTier::High
        } else if percentage > 8.0 {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskTier::High => "High",
            RiskTier::Medium => "Medium",
            RiskTier::Low => "Low",
        })
    }
}

/// Export formatting options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub delimiter: char,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

/// Run metadata written into the export header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportMetadata {
    pub generated_at: DateTime<Utc>,
    /// Operator identity
    pub generated_by: String,
    pub filter_description: String,
}

impl ExportMetadata {
    /// Metadata taken from a report, attributed to `generated_by`.
    pub fn for_report(report: &AnalysisReport, generated_by: impl Into<String>) -> Self {
        Self {
            generated_at: report.metadata.generated_at,
            generated_by: generated_by.into(),
            filter_description: report.metadata.filter_description.clone(),
        }
    }
}

/// Serializes ranked reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportExporter {
    options: ExportOptions,
}

impl ReportExporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ExportOptions {
        self.options
    }

    /// Export to JSON.
    pub fn to_json(&self, report: &AnalysisReport) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(report)
    }

    /// Export to the delimited document: metadata block, disease rows,
    /// summary block, separated by blank lines.
    pub fn to_delimited(
        &self,
        report: &AnalysisReport,
        metadata: &ExportMetadata,
    ) -> Result<String, serde_json::Error> {
        let digest = report_digest(&report.rows)?;
        let mut out = String::new();

        // Metadata
        self.push_line(&mut out, &["Disease Pattern Report"]);
        self.push_pair(
            &mut out,
            "Generated At",
            &metadata
                .generated_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        self.push_pair(&mut out, "Generated By", &metadata.generated_by);
        self.push_pair(&mut out, "Filters", &metadata.filter_description);
        self.push_pair(&mut out, "Branch", &report.metadata.branch.to_string());
        self.push_pair(&mut out, "Mode", &report.metadata.mode.to_string());
        self.push_pair(&mut out, "Age Buckets", report.metadata.bucket_scheme.as_str());
        self.push_pair(
            &mut out,
            "Approximate",
            if report.metadata.approximate { "yes" } else { "no" },
        );
        self.push_pair(&mut out, "Digest (SHA-256)", &digest);
        out.push('\n');

        // Rows
        self.push_line(&mut out, &ROW_HEADERS);
        for row in &report.rows {
            let summary = &row.summary;
            let rank = row.rank.to_string();
            let cases = summary.total_cases.to_string();
            let percentage = format!("{:.2}%", summary.percentage_exact);
            let patients = summary.unique_patients.to_string();
            let risk = RiskTier::from_percentage(summary.percentage_exact).to_string();
            self.push_line(
                &mut out,
                &[
                    rank.as_str(),
                    summary.label.as_str(),
                    cases.as_str(),
                    percentage.as_str(),
                    patients.as_str(),
                    summary.dominant_age_bucket.as_str(),
                    risk.as_str(),
                ],
            );
        }
        out.push('\n');

        // Summary
        let totals = &report.totals;
        self.push_line(&mut out, &["Summary"]);
        self.push_pair(&mut out, "Total Records", &totals.total_records.to_string());
        self.push_pair(
            &mut out,
            "Unique Diagnoses",
            &totals.unique_diagnosis_count.to_string(),
        );
        self.push_pair(&mut out, "Unique Patients", &totals.unique_patients.to_string());
        self.push_pair(
            &mut out,
            "Top Condition Prevalence",
            &format!("{}%", totals.top_condition_prevalence),
        );
        self.push_pair(&mut out, "Diseases Listed", &report.rows.len().to_string());

        Ok(out)
    }

    /// Write the delimited document under [`export_filename`] in `dir`.
    pub fn write_to_dir(
        &self,
        report: &AnalysisReport,
        metadata: &ExportMetadata,
        dir: impl AsRef<Path>,
    ) -> AnalyticsResult<PathBuf> {
        let document = self.to_delimited(report, metadata)?;
        let path = dir
            .as_ref()
            .join(export_filename(metadata.generated_at.date_naive()));
        std::fs::write(&path, document)?;
        tracing::info!(path = %path.display(), rows = report.rows.len(), "wrote disease report");
        Ok(path)
    }

    fn push_line(&self, out: &mut String, fields: &[&str]) {
        let mut separator = [0u8; 4];
        let separator: &str = self.options.delimiter.encode_utf8(&mut separator);
        let line: Vec<String> = fields
            .iter()
            .map(|f| escape_field(f, self.options.delimiter))
            .collect();
        out.push_str(&line.join(separator));
        out.push('\n');
    }

    fn push_pair(&self, out: &mut String, key: &str, value: &str) {
        self.push_line(out, &[key, value]);
    }
}

/// Quote a field that contains the delimiter, a double quote, CR or LF;
/// embedded quotes are doubled.
pub fn escape_field(value: &str, delimiter: char) -> String {
    if value.contains(|c: char| c == delimiter || matches!(c, '"' | '\n' | '\r')) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// `disease_patterns_YYYY-MM-DD.csv`
pub fn export_filename(date: NaiveDate) -> String {
    format!("disease_patterns_{}.csv", date.format("%Y-%m-%d"))
}

/// SHA-256 (hex) of the canonical JSON of the ranked rows.
pub fn report_digest(rows: &[RankedDisease]) -> Result<String, serde_json::Error> {
    let canonical = serde_json::to_vec(rows)?;
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(hex::encode(hasher.finalize()))
}
