//! Command-line parsing for the multi-calendar sales forecaster.
//!
//! The goal of this module is to keep **argument parsing** separate from
//! command dispatch (`app`) and from the forecasting code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::{Horizon, RegressorKind};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "salescast", version, about = "Multi-calendar daily sales forecaster")]
pub struct Cli {
    /// Log level when RUST_LOG is not set.
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Emit logs as JSON lines (stderr).
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Normalize the configured sources, validate, fit and forecast.
    Run(RunArgs),
    /// Forecast from a previously exported model without retraining.
    Predict(PredictArgs),
    /// Write synthetic aggregator extracts plus a matching config.
    Generate(GenerateArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Forecast horizon flags shared by `run` and `predict`.
#[derive(Debug, Clone, Args)]
pub struct HorizonArgs {
    /// Number of days to forecast after the last training date.
    #[arg(long, conflicts_with = "dates")]
    pub horizon: Option<usize>,

    /// Explicit forecast dates (comma separated, YYYY-MM-DD).
    #[arg(long, value_delimiter = ',', value_parser = parse_cli_date)]
    pub dates: Vec<NaiveDate>,
}

impl HorizonArgs {
    /// Explicit dates win; otherwise `--horizon`, otherwise `default_days`.
    pub fn resolve(&self, default_days: usize) -> Horizon {
        if !self.dates.is_empty() {
            return Horizon::Dates(self.dates.clone());
        }
        Horizon::Days(self.horizon.unwrap_or(default_days))
    }
}

/// Options for `salescast run`.
#[derive(Debug, Clone, Parser)]
pub struct RunArgs {
    /// Config file (TOML/JSON/YAML). Defaults to ./salescast.toml when present.
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override a configured source's file (repeatable).
    #[arg(long = "source", value_name = "ID=PATH", value_parser = parse_source_override)]
    pub sources: Vec<SourceOverride>,

    #[command(flatten)]
    pub horizon: HorizonArgs,

    /// Regressor to fit.
    #[arg(long, value_enum)]
    pub model: Option<RegressorKind>,

    /// Number of trees for the forest regressor.
    #[arg(long)]
    pub estimators: Option<usize>,

    /// Random seed for bootstrap sampling.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Holiday region (e.g. IN, IN-MH).
    #[arg(short = 'r', long)]
    pub region: Option<String>,

    /// Fraction of the most recent history held out for validation.
    #[arg(long)]
    pub validation_fraction: Option<f64>,

    /// Continue with the remaining sources when one fails.
    #[arg(long)]
    pub tolerate_partial_failure: bool,

    /// Forecast with the model fitted on the training window only.
    #[arg(long)]
    pub no_refit: bool,

    /// Add the `is_islamic_festival` feature column.
    #[arg(long)]
    pub islamic_festivals: bool,

    /// Export the forecast table to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the trained model to JSON.
    #[arg(long = "export-model", value_name = "JSON")]
    pub export_model: Option<PathBuf>,

    /// Write a markdown diagnostics bundle into this directory.
    #[arg(long, value_name = "DIR")]
    pub diagnostics: Option<PathBuf>,
}

/// Options for `salescast predict`.
#[derive(Debug, Clone, Parser)]
pub struct PredictArgs {
    /// Model JSON produced by `salescast run --export-model`.
    #[arg(short = 'm', long = "model-file", value_name = "JSON")]
    pub model_file: PathBuf,

    /// Config file; its region, holidays and festivals must match the model.
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub horizon: HorizonArgs,

    /// Export the forecast table to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

/// Options for `salescast generate`.
#[derive(Debug, Clone, Parser)]
pub struct GenerateArgs {
    /// Output directory for the CSV files and config.
    #[arg(short = 'o', long, default_value = "data")]
    pub out_dir: PathBuf,

    /// First date (YYYY-MM-DD).
    #[arg(long, value_parser = parse_cli_date, default_value = "2023-01-01")]
    pub start: NaiveDate,

    /// Number of days to generate.
    #[arg(long, default_value_t = 540)]
    pub days: usize,

    /// Random seed.
    #[arg(long, default_value_t = 7)]
    pub seed: u64,

    /// Expected combined daily sales before seasonality.
    #[arg(long, default_value_t = 25_000.0)]
    pub base: f64,

    /// Holiday region used for the uplift.
    #[arg(short = 'r', long, default_value = "IN")]
    pub region: String,
}

/// `--source id=path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOverride {
    pub id: String,
    pub path: PathBuf,
}

fn parse_source_override(raw: &str) -> Result<SourceOverride, String> {
    let (id, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=PATH, got '{raw}'"))?;
    let (id, path) = (id.trim(), path.trim());
    if id.is_empty() || path.is_empty() {
        return Err(format!("expected ID=PATH, got '{raw}'"));
    }
    Ok(SourceOverride {
        id: id.to_string(),
        path: PathBuf::from(path),
    })
}

fn parse_cli_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| format!("invalid date '{raw}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "salescast",
            "run",
            "--config",
            "cfg.toml",
            "--source",
            "swiggy=/tmp/s.csv",
            "--horizon",
            "14",
            "--model",
            "linear",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level, LogLevel::Debug);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.config, Some(PathBuf::from("cfg.toml")));
        assert_eq!(
            args.sources,
            vec![SourceOverride {
                id: "swiggy".to_string(),
                path: PathBuf::from("/tmp/s.csv")
            }]
        );
        assert_eq!(args.model, Some(RegressorKind::Linear));
        assert_eq!(args.horizon.resolve(30), Horizon::Days(14));
    }

    #[test]
    fn dates_conflict_with_horizon() {
        let ok = Cli::try_parse_from(["salescast", "run", "--dates", "2024-07-01,2024-07-03"]).unwrap();
        let Command::Run(args) = ok.command else {
            panic!("expected run");
        };
        assert_eq!(
            args.horizon.resolve(30),
            Horizon::Dates(vec![
                NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 7, 3).unwrap()
            ])
        );

        assert!(Cli::try_parse_from(["salescast", "run", "--dates", "2024-07-01", "--horizon", "3"]).is_err());
        assert!(Cli::try_parse_from(["salescast", "run", "--dates", "07/01/2024"]).is_err());
    }

    #[test]
    fn source_override_requires_id_and_path() {
        assert!(parse_source_override("swiggy").is_err());
        assert!(parse_source_override("=x.csv").is_err());
        assert_eq!(parse_source_override(" a = b.csv ").unwrap().path, PathBuf::from("b.csv"));
    }

    #[test]
    fn generate_defaults() {
        let cli = Cli::try_parse_from(["salescast", "generate"]).unwrap();
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.days, 540);
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(args.out_dir, PathBuf::from("data"));
    }
}
