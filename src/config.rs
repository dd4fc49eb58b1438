//! Pipeline configuration.
//!
//! Sources are layered in this order (later wins):
//! 1. built-in defaults
//! 2. an optional config file (TOML/JSON/YAML, chosen by extension)
//! 3. environment variables prefixed `SALESCAST__` (e.g. `SALESCAST__REGION=IN-MH`,
//!    `SALESCAST__MODEL__N_ESTIMATORS=200`)
//!
//! CLI flags are applied on top by `app`. Everything is validated eagerly,
//! before any file is opened.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calendar::HolidayEntry;
use crate::domain::{Horizon, ModelParams};
use crate::error::ForecastError;

const ENV_PREFIX: &str = "SALESCAST";

/// Where one aggregator's extract lives and which columns hold date/amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub id: String,
    pub path: PathBuf,
    pub date_column: String,
    pub amount_column: String,
    /// Interpret ambiguous `01/02/2024` as 1 February (true) or 2 January (false).
    #[serde(default = "default_true")]
    pub day_first: bool,
}

/// Validated `{source_id -> SourceSpec}` mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMapping {
    sources: BTreeMap<String, SourceSpec>,
}

impl SourceMapping {
    pub fn new(specs: Vec<SourceSpec>) -> Result<Self, ForecastError> {
        if specs.is_empty() {
            return Err(ForecastError::InvalidConfig(
                "At least one source must be configured.".to_string(),
            ));
        }

        let mut sources = BTreeMap::new();
        for spec in specs {
            let id = spec.id.trim().to_string();
            if id.is_empty() {
                return Err(ForecastError::InvalidConfig("Source id must not be empty.".to_string()));
            }
            if spec.date_column.trim().is_empty() || spec.amount_column.trim().is_empty() {
                return Err(ForecastError::InvalidConfig(format!(
                    "Source '{id}': date_column and amount_column must not be empty."
                )));
            }
            if spec.date_column.trim() == spec.amount_column.trim() {
                return Err(ForecastError::InvalidConfig(format!(
                    "Source '{id}': date_column and amount_column must differ."
                )));
            }
            if sources.contains_key(&id) {
                return Err(ForecastError::InvalidConfig(format!("Duplicate source id '{id}'.")));
            }
            sources.insert(id.clone(), SourceSpec { id, ..spec });
        }

        Ok(Self { sources })
    }

    pub fn get(&self, id: &str) -> Option<&SourceSpec> {
        self.sources.get(id)
    }

    /// Sources in id order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceSpec> {
        self.sources.values()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Optional extra feature columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Append an `is_islamic_festival` column.
    pub islamic_festival_column: bool,
    /// Hijri `(month, day)` pairs treated as festivals.
    pub islamic_festivals: Vec<(u32, u32)>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            islamic_festival_column: false,
            // 1 Shawwal (Eid al-Fitr), 10 Dhu al-Hijjah (Eid al-Adha).
            islamic_festivals: vec![(10, 1), (12, 10)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sources: Vec<SourceSpec>,
    pub region: String,
    /// Continue with the remaining sources when one fails schema validation.
    pub tolerate_partial_failure: bool,
    pub horizon_days: usize,
    /// Most recent fraction of history held out for validation.
    pub validation_fraction: f64,
    /// Minimum rows required to fit a model.
    pub min_samples: usize,
    /// Refit on train+validation before forecasting.
    pub refit_on_full_history: bool,
    pub model: ModelParams,
    pub features: FeatureConfig,
    /// Extra holiday entries appended to the built-in table.
    pub holidays: Vec<HolidayEntry>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            region: "IN".to_string(),
            tolerate_partial_failure: false,
            horizon_days: Horizon::default_days(),
            validation_fraction: 0.2,
            min_samples: 5,
            refit_on_full_history: true,
            model: ModelParams::default(),
            features: FeatureConfig::default(),
            holidays: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Check every setting that does not depend on the data.
    pub fn validate(&self) -> Result<(), ForecastError> {
        let invalid = |msg: String| Err(ForecastError::InvalidConfig(msg));

        if self.region.trim().is_empty() {
            return invalid("region must not be empty.".to_string());
        }
        if self.horizon_days == 0 {
            return invalid("horizon_days must be >= 1.".to_string());
        }
        if !(self.validation_fraction.is_finite()
            && self.validation_fraction > 0.0
            && self.validation_fraction < 1.0)
        {
            return invalid(format!(
                "validation_fraction must be in (0, 1), got {}.",
                self.validation_fraction
            ));
        }
        if self.min_samples < 2 {
            return invalid("min_samples must be >= 2.".to_string());
        }

        let m = &self.model;
        if m.n_estimators == 0 {
            return invalid("model.n_estimators must be >= 1.".to_string());
        }
        if m.min_samples_split < 2 {
            return invalid("model.min_samples_split must be >= 2.".to_string());
        }
        if m.min_samples_leaf == 0 {
            return invalid("model.min_samples_leaf must be >= 1.".to_string());
        }
        if m.max_depth == Some(0) {
            return invalid("model.max_depth must be >= 1 when set.".to_string());
        }
        if !(m.interval_level.is_finite() && m.interval_level > 0.0 && m.interval_level < 1.0) {
            return invalid(format!(
                "model.interval_level must be in (0, 1), got {}.",
                m.interval_level
            ));
        }

        for &(month, day) in &self.features.islamic_festivals {
            if !(1..=12).contains(&month) || !(1..=30).contains(&day) {
                return invalid(format!("Invalid Hijri festival ({month}, {day})."));
            }
        }

        let mut seen = HashSet::new();
        for spec in &self.sources {
            if !seen.insert(spec.id.trim()) {
                return invalid(format!("Duplicate source id '{}'.", spec.id.trim()));
            }
        }

        Ok(())
    }

    /// Build the validated source mapping.
    pub fn source_mapping(&self) -> Result<SourceMapping, ForecastError> {
        SourceMapping::new(self.sources.clone())
    }
}

/// Load configuration from `path` (if given) plus `SALESCAST__*` environment variables.
///
/// Relative source paths are resolved against the config file's directory.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig, ForecastError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        if !path.exists() {
            return Err(ForecastError::InvalidConfig(format!(
                "Config file '{}' does not exist.",
                path.display()
            )));
        }
        builder = builder.add_source(File::from(path).required(true));
    }
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    let settings = builder
        .build()
        .map_err(|e| ForecastError::InvalidConfig(format!("Failed to load configuration: {e}")))?;
    let mut config: PipelineConfig = settings
        .try_deserialize()
        .map_err(|e| ForecastError::InvalidConfig(format!("Failed to parse configuration: {e}")))?;

    if let Some(base) = path.and_then(Path::parent) {
        for spec in &mut config.sources {
            if spec.path.is_relative() {
                spec.path = base.join(&spec.path);
            }
        }
    }

    config.validate()?;
    debug!(
        sources = config.sources.len(),
        region = %config.region,
        model = ?config.model.kind,
        "configuration loaded"
    );
    Ok(config)
}

fn default_true() -> bool {
    true
}
