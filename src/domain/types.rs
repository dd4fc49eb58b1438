//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed between pipeline stages in-memory
//! - exported to CSV/JSON
//! - reloaded later (trained model files)

use chrono::NaiveDate;
use clap::ValueEnum;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One aggregated sales observation for a calendar date.
///
/// After normalization there is at most one record per date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub date: NaiveDate,
    pub amount: Decimal,
}

/// Why a raw row was dropped during normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The CSV reader could not decode the record.
    Malformed(String),
    MissingDate,
    MissingAmount,
    UnparsableDate(String),
    UnparsableAmount(String),
    DateOutOfRange(NaiveDate),
    /// Adding the amount to its date's running total would overflow.
    AmountOverflow(NaiveDate),
}

impl SkipReason {
    /// Stable short label used for grouping in reports.
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::Malformed(_) => "malformed record",
            SkipReason::MissingDate => "missing date",
            SkipReason::MissingAmount => "missing amount",
            SkipReason::UnparsableDate(_) => "unparsable date",
            SkipReason::UnparsableAmount(_) => "unparsable amount",
            SkipReason::DateOutOfRange(_) => "date out of range",
            SkipReason::AmountOverflow(_) => "amount overflow",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Malformed(msg) => write!(f, "malformed record: {msg}"),
            SkipReason::MissingDate => write!(f, "missing date"),
            SkipReason::MissingAmount => write!(f, "missing amount"),
            SkipReason::UnparsableDate(raw) => write!(f, "unparsable date '{raw}'"),
            SkipReason::UnparsableAmount(raw) => write!(f, "unparsable amount '{raw}'"),
            SkipReason::DateOutOfRange(date) => write!(f, "date {date} out of supported range"),
            SkipReason::AmountOverflow(date) => write!(f, "amount overflows the total for {date}"),
        }
    }
}

/// A raw row dropped by the normalizer, with enough context to find it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub source_id: String,
    /// 1-based line number in the source file (header is line 1).
    pub line: usize,
    pub reason: SkipReason,
}

/// One column of the calendar feature vector.
///
/// The declaration order of the first eleven variants is the canonical
/// column order; optional columns are appended after them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureColumn {
    GregorianYear,
    GregorianMonth,
    GregorianDay,
    DayOfWeek,
    IslamicYear,
    IslamicMonth,
    IslamicDay,
    HinduYear,
    HinduMonth,
    HinduDay,
    IsHoliday,
    IsIslamicFestival,
}

impl FeatureColumn {
    /// The fixed core columns, in order.
    pub const CORE: [FeatureColumn; 11] = [
        FeatureColumn::GregorianYear,
        FeatureColumn::GregorianMonth,
        FeatureColumn::GregorianDay,
        FeatureColumn::DayOfWeek,
        FeatureColumn::IslamicYear,
        FeatureColumn::IslamicMonth,
        FeatureColumn::IslamicDay,
        FeatureColumn::HinduYear,
        FeatureColumn::HinduMonth,
        FeatureColumn::HinduDay,
        FeatureColumn::IsHoliday,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FeatureColumn::GregorianYear => "gregorian_year",
            FeatureColumn::GregorianMonth => "gregorian_month",
            FeatureColumn::GregorianDay => "gregorian_day",
            FeatureColumn::DayOfWeek => "day_of_week",
            FeatureColumn::IslamicYear => "islamic_year",
            FeatureColumn::IslamicMonth => "islamic_month",
            FeatureColumn::IslamicDay => "islamic_day",
            FeatureColumn::HinduYear => "hindu_year",
            FeatureColumn::HinduMonth => "hindu_month",
            FeatureColumn::HinduDay => "hindu_day",
            FeatureColumn::IsHoliday => "is_holiday",
            FeatureColumn::IsIslamicFestival => "is_islamic_festival",
        }
    }
}

/// Column names for error messages and reports.
pub fn column_names(columns: &[FeatureColumn]) -> Vec<String> {
    columns.iter().map(|c| c.name().to_string()).collect()
}

/// A date plus its feature vector (and the observed amount, for history).
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub date: NaiveDate,
    /// `None` for future dates.
    pub amount: Option<Decimal>,
    pub features: Vec<f64>,
}

/// Enriched rows together with the column order that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedBatch {
    pub columns: Vec<FeatureColumn>,
    pub records: Vec<EnrichedRecord>,
}

impl EnrichedBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Split into two batches at `at`, keeping the column order on both halves.
    pub fn split_at(&self, at: usize) -> (EnrichedBatch, EnrichedBatch) {
        let at = at.min(self.records.len());
        let (head, tail) = self.records.split_at(at);
        (
            EnrichedBatch {
                columns: self.columns.clone(),
                records: head.to_vec(),
            },
            EnrichedBatch {
                columns: self.columns.clone(),
                records: tail.to_vec(),
            },
        )
    }
}

/// A single forecast point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub date: NaiveDate,
    pub predicted_amount: f64,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
}

/// Which future dates to forecast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Horizon {
    /// `n` consecutive days after the last training date.
    Days(usize),
    /// Explicit dates, each strictly after the last training date.
    Dates(Vec<NaiveDate>),
}

impl Horizon {
    pub const fn default_days() -> usize {
        30
    }
}

impl Default for Horizon {
    fn default() -> Self {
        Horizon::Days(Self::default_days())
    }
}

/// Which regressor to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RegressorKind {
    /// Bagged regression trees.
    Forest,
    /// Ordinary least squares with intercept.
    Linear,
}

impl RegressorKind {
    pub fn display_name(self) -> &'static str {
        match self {
            RegressorKind::Forest => "random forest",
            RegressorKind::Linear => "linear (OLS)",
        }
    }
}

/// Regressor hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    pub kind: RegressorKind,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
    /// Central coverage of the reported prediction interval (e.g. 0.8).
    pub interval_level: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            kind: RegressorKind::Forest,
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
            interval_level: 0.8,
        }
    }
}

/// Error metrics on the held-out validation window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub n: usize,
    pub mae: f64,
    pub rmse: f64,
    /// Mean absolute percentage error over non-zero actuals (if any).
    pub mape: Option<f64>,
}

/// One validation-window prediction (for diagnostics).
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationPoint {
    pub date: NaiveDate,
    pub actual: f64,
    pub predicted: f64,
}
