//! CLI argument definitions for the disease pattern analyzer.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};

use disease_patterns_cli::commands::{
    AnalyzeOptions, OutputFormat, OutputOptions, ResliceOptions,
};
use disease_patterns_core::analytics::GenderFilter;
use disease_patterns_core::models::AgeBucketScheme;

#[derive(Parser)]
#[command(
    name = "disease-patterns",
    version,
    about = "Rank and segment disease patterns from clinical notes",
    long_about = "Turn a snapshot of patients and free-text medical records into ranked,\n\
                  demographically segmented disease statistics.\n\n\
                  `analyze` works from raw records; `reslice` filters a saved report\n\
                  by age group and gender without the raw records."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Explicit log level (overrides -v).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Analyse raw patient and medical record files.
    Analyze(AnalyzeArgs),

    /// Re-slice a saved report by age group and gender.
    Reslice(ResliceArgs),
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// JSON array of patients.
    #[arg(long = "patients", value_name = "FILE")]
    pub patients: PathBuf,

    /// JSON array of medical records.
    #[arg(long = "records", value_name = "FILE")]
    pub records: PathBuf,

    /// JSON analysis config; flags below override its fields.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// First visit day included (YYYY-MM-DD).
    #[arg(long = "from", value_name = "DATE", requires = "to")]
    pub from: Option<NaiveDate>,

    /// Last visit day included, through 23:59:59.999 UTC (YYYY-MM-DD).
    #[arg(long = "to", value_name = "DATE", requires = "from")]
    pub to: Option<NaiveDate>,

    /// Age bucket label of the selected scheme, or "all".
    #[arg(long = "age-group", value_name = "BUCKET")]
    pub age_group: Option<String>,

    #[arg(long = "gender", value_enum)]
    pub gender: Option<GenderArg>,

    /// Number of ranked diseases to keep.
    #[arg(long = "top", value_name = "N")]
    pub top_n: Option<usize>,

    #[arg(long = "scheme", value_enum)]
    pub scheme: Option<SchemeArg>,

    /// Analyse only each patient's latest record.
    #[arg(long = "latest")]
    pub latest: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct ResliceArgs {
    /// Report saved by `analyze --save-report`.
    #[arg(value_name = "REPORT")]
    pub report: PathBuf,

    #[arg(long = "age-group", value_name = "BUCKET")]
    pub age_group: Option<String>,

    #[arg(long = "gender", value_enum)]
    pub gender: Option<GenderArg>,

    #[arg(long = "top", value_name = "N")]
    pub top_n: Option<usize>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct OutputArgs {
    /// What to print on stdout.
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: OutputFormatArg,

    /// Write disease_patterns_<date>.csv into this directory.
    #[arg(long = "export-dir", value_name = "DIR")]
    pub export_dir: Option<PathBuf>,

    /// Save the full report as JSON for `reslice`.
    #[arg(long = "save-report", value_name = "FILE")]
    pub save_report: Option<PathBuf>,

    /// Field delimiter for delimited output.
    #[arg(long = "delimiter", default_value_t = ',')]
    pub delimiter: char,

    /// Operator recorded in the export metadata.
    #[arg(long = "operator", default_value = "disease-patterns")]
    pub operator: String,

    /// Reference instant for ages and the report timestamp (RFC 3339).
    #[arg(long = "as-of", value_name = "TIMESTAMP")]
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormatArg {
    Table,
    Json,
    Csv,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum GenderArg {
    All,
    Male,
    Female,
    Unknown,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SchemeArg {
    Coarse,
    Analytics,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<GenderArg> for GenderFilter {
    fn from(arg: GenderArg) -> Self {
        match arg {
            GenderArg::All => GenderFilter::All,
            GenderArg::Male => GenderFilter::Male,
            GenderArg::Female => GenderFilter::Female,
            GenderArg::Unknown => GenderFilter::Unknown,
        }
    }
}

impl From<SchemeArg> for AgeBucketScheme {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::Coarse => AgeBucketScheme::Coarse,
            SchemeArg::Analytics => AgeBucketScheme::Analytics,
        }
    }
}

impl From<OutputArgs> for OutputOptions {
    fn from(args: OutputArgs) -> Self {
        Self {
            format: match args.format {
                OutputFormatArg::Table => OutputFormat::Table,
                OutputFormatArg::Json => OutputFormat::Json,
                OutputFormatArg::Csv => OutputFormat::Csv,
            },
            export_dir: args.export_dir,
            save_report: args.save_report,
            delimiter: args.delimiter,
            operator: args.operator,
            as_of: args.as_of,
        }
    }
}

impl From<AnalyzeArgs> for AnalyzeOptions {
    fn from(args: AnalyzeArgs) -> Self {
        Self {
            patients: args.patients,
            records: args.records,
            config: args.config,
            from: args.from,
            to: args.to,
            age_group: args.age_group,
            gender: args.gender.map(GenderFilter::from),
            top_n: args.top_n,
            scheme: args.scheme.map(AgeBucketScheme::from),
            latest: args.latest,
            output: args.output.into(),
        }
    }
}

impl From<ResliceArgs> for ResliceOptions {
    fn from(args: ResliceArgs) -> Self {
        Self {
            report: args.report,
            age_group: args.age_group,
            gender: args.gender.map(GenderFilter::from),
            top_n: args.top_n,
            output: args.output.into(),
        }
    }
}
