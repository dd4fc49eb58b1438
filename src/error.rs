//! Error types.
//!
//! Two layers:
//!
//! - [`ForecastError`]: typed failures of the forecasting core (calendar range,
//!   schema, data volume, feature shape). Row-level data-quality problems are
//!   *not* errors; they are counted as `SkippedRow`s by the normalizer.
//! - [`AppError`]: what the binary reports (message + process exit code).

use chrono::NaiveDate;

/// Typed failures raised by the pipeline stages.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForecastError {
    #[error("Date {date} is outside the supported calendar range (1900-01-01..=2100-12-31).")]
    DateOutOfRange { date: NaiveDate },

    #[error("Source '{source_id}': missing column `{column}` (available: {}).", available.join(", "))]
    SchemaMismatch {
        source_id: String,
        column: String,
        available: Vec<String>,
    },

    #[error("Source '{source_id}' could not be read: {message}")]
    SourceUnreadable { source_id: String, message: String },

    #[error("Insufficient data for {stage}: need at least {required} rows, have {available}.")]
    InsufficientData {
        stage: &'static str,
        required: usize,
        available: usize,
    },

    #[error("Feature shape mismatch: model was fit on [{}], got [{}].", expected.join(", "), found.join(", "))]
    FeatureShapeMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Model fit failed: {0}")]
    ModelFit(String),

    #[error("Invalid forecast horizon: {0}")]
    InvalidHorizon(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse {context}: {message}")]
    Parse { context: String, message: String },

    #[error("I/O error on {context}: {message}")]
    Io { context: String, message: String },
}

impl ForecastError {
    /// Process exit code used when this error reaches the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            ForecastError::SchemaMismatch { .. }
            | ForecastError::SourceUnreadable { .. }
            | ForecastError::InvalidHorizon(_)
            | ForecastError::InvalidConfig(_)
            | ForecastError::Parse { .. }
            | ForecastError::Io { .. }
            | ForecastError::DateOutOfRange { .. } => 2,
            ForecastError::InsufficientData { .. } => 3,
            ForecastError::FeatureShapeMismatch { .. } | ForecastError::ModelFit(_) => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<ForecastError> for AppError {
    fn from(err: ForecastError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
