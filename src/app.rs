//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - layers configuration (file, environment, flags)
//! - runs the forecasting pipeline or a saved model
//! - prints reports and writes optional exports

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, GenerateArgs, PredictArgs, RunArgs};
use crate::config::{PipelineConfig, load_config};
use crate::domain::Horizon;
use crate::error::{AppError, ForecastError};

pub mod pipeline;

const DEFAULT_CONFIG: &str = "salescast.toml";

/// Entry point for the `salescast` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // `salescast` and `salescast -c cfg.toml` behave like `salescast run ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    init_tracing(cli.log_level.as_str(), cli.log_json);

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Predict(args) => handle_predict(args),
        Command::Generate(args) => handle_generate(args),
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `--log-level`.
///
/// Logs go to stderr so stdout stays clean for the report.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sales_calendar_forecast={level}")));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    // A subscriber may already be installed (tests); ignore that.
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args)?;
    let horizon = args.horizon.resolve(config.horizon_days);
    let run = pipeline::run_forecast(&config, &horizon)?;

    println!("{}", crate::report::format_run_summary(&run));
    println!("{}", crate::report::format_forecast_table(&run.forecast));

    if let Some(path) = &args.export {
        crate::io::export::write_forecast_csv(path, &run.forecast)?;
        info!(path = %path.display(), "forecast exported");
    }
    if let Some(path) = &args.export_model {
        crate::io::model_file::write_model_json(path, &run.model_file())?;
        info!(path = %path.display(), "model exported");
    }
    if let Some(dir) = &args.diagnostics {
        let path = crate::diagnostics::write_diagnostics_bundle(dir, &run)?;
        eprintln!("Diagnostics written to {}", path.display());
    }

    Ok(())
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    let file = crate::io::model_file::read_model_json(&args.model_file)?;
    // Region, holidays and festivals come from the model file; a config may
    // only restate them.
    let config = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Some(load_config(Some(&path))?),
        None => None,
    };

    let default_days = config.as_ref().map_or(Horizon::default_days(), |c| c.horizon_days);
    let horizon = args.horizon.resolve(default_days);
    let forecast = pipeline::predict_from_file(&file, config.as_ref(), &horizon)?;

    println!("{}", crate::report::format_predict_summary(&file));
    println!("{}", crate::report::format_forecast_table(&forecast));

    if let Some(path) = &args.export {
        crate::io::export::write_forecast_csv(path, &forecast)?;
        info!(path = %path.display(), "forecast exported");
    }
    Ok(())
}

fn handle_generate(args: GenerateArgs) -> Result<(), AppError> {
    let spec = crate::data::SampleSpec {
        start: args.start,
        days: args.days,
        seed: args.seed,
        base: args.base,
        region: args.region.trim().to_string(),
    };
    let extracts = crate::data::generate_sample(&spec)?;
    let config_path = crate::data::write_sample(&args.out_dir, &extracts, &spec.region)?;

    for extract in &extracts {
        println!(
            "wrote {} ({} rows)",
            args.out_dir.join(format!("{}.csv", extract.id)).display(),
            extract.rows.len()
        );
    }
    println!("wrote {}", config_path.display());
    println!("next: salescast run --config {}", config_path.display());
    Ok(())
}

/// Load the layered config and apply `run` flags on top.
pub fn run_config_from_args(args: &RunArgs) -> Result<PipelineConfig, ForecastError> {
    let config_path = resolve_config_path(args.config.as_deref());
    let mut config = load_config(config_path.as_deref())?;
    apply_run_overrides(&mut config, args)?;
    config.validate()?;
    Ok(config)
}

fn apply_run_overrides(config: &mut PipelineConfig, args: &RunArgs) -> Result<(), ForecastError> {
    for o in &args.sources {
        let spec = config
            .sources
            .iter_mut()
            .find(|s| s.id.trim() == o.id)
            .ok_or_else(|| ForecastError::InvalidConfig(format!("--source: unknown source id '{}'.", o.id)))?;
        spec.path = o.path.clone();
    }

    if let Some(kind) = args.model {
        config.model.kind = kind;
    }
    if let Some(n) = args.estimators {
        config.model.n_estimators = n;
    }
    if let Some(seed) = args.seed {
        config.model.seed = seed;
    }
    if let Some(region) = &args.region {
        config.region = region.trim().to_string();
    }
    if let Some(fraction) = args.validation_fraction {
        config.validation_fraction = fraction;
    }
    if args.tolerate_partial_failure {
        config.tolerate_partial_failure = true;
    }
    if args.no_refit {
        config.refit_on_full_history = false;
    }
    if args.islamic_festivals {
        config.features.islamic_festival_column = true;
    }
    Ok(())
}

/// Explicit path, else `./salescast.toml` when present.
fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let default = PathBuf::from(DEFAULT_CONFIG);
    default.is_file().then_some(default)
}

/// Rewrite argv so `salescast` defaults to `salescast run`.
///
/// Rules:
/// - `salescast`                      -> `salescast run`
/// - `salescast -c cfg.toml ...`      -> `salescast run -c cfg.toml ...`
/// - `salescast --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("run".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "run" | "predict" | "generate");
    if is_subcommand {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
        return argv;
    }

    argv
}
