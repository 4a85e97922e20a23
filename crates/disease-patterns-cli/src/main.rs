//! Disease pattern analyzer CLI.

use clap::Parser;
use disease_patterns_cli::commands::{run_analyze, run_reslice, CommandOutput};
use disease_patterns_cli::logging::{init_logging, LogConfig, LogFormat};
use disease_patterns_core::AnalyticsError;
use tracing::Level;

mod cli;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};

/// Exit code when the filters leave nothing to report.
const EXIT_NO_DATA: i32 = 2;

fn main() {
    let cli = Cli::parse();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }

    let result = match cli.command {
        Command::Analyze(args) => run_analyze(&args.into()),
        Command::Reslice(args) => run_reslice(&args.into()),
    };

    let exit_code = match result {
        Ok(output) => {
            print_output(&output);
            0
        }
        Err(error) => match error.downcast_ref::<AnalyticsError>() {
            Some(AnalyticsError::NoDataForSelection { examined, filter }) => {
                eprintln!("no data: {examined} records examined, nothing matched {filter}");
                EXIT_NO_DATA
            }
            _ => {
                eprintln!("error: {error:#}");
                1
            }
        },
    };
    std::process::exit(exit_code);
}

fn print_output(output: &CommandOutput) {
    print!("{}", output.rendered);
    if let Some(path) = &output.export_path {
        eprintln!("Export: {}", path.display());
    }
}

/// `--log-level` wins over `-v`; either disables `RUST_LOG`.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig::from_verbosity(cli.verbose);
    if let Some(level) = cli.log_level {
        config.level = match level {
            LogLevelArg::Error => Level::ERROR,
            LogLevelArg::Warn => Level::WARN,
            LogLevelArg::Info => Level::INFO,
            LogLevelArg::Debug => Level::DEBUG,
            LogLevelArg::Trace => Level::TRACE,
        };
        config.use_env_filter = false;
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config
}
