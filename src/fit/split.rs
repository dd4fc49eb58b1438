//! Time-ordered train/validation split.
//!
//! The most recent `ceil(fraction * n)` rows are held out; nothing is shuffled.
//! Every training date is therefore strictly earlier than every validation date.

use crate::domain::EnrichedBatch;
use crate::error::ForecastError;

#[derive(Debug, Clone)]
pub struct TemporalSplit {
    pub train: EnrichedBatch,
    pub validation: EnrichedBatch,
}

/// Split `history` (any order; sorted here) into train and validation partitions.
///
/// Fails with `InsufficientData` when the training partition would have fewer
/// than `min_train` rows.
pub fn temporal_split(
    history: &EnrichedBatch,
    validation_fraction: f64,
    min_train: usize,
) -> Result<TemporalSplit, ForecastError> {
    let mut sorted = history.clone();
    sorted.records.sort_by_key(|r| r.date);

    let n = sorted.len();
    let n_valid = validation_size(n, validation_fraction);
    let n_train = n - n_valid;

    if n_valid == 0 || n_train < min_train {
        return Err(ForecastError::InsufficientData {
            stage: "train/validation split",
            required: min_rows_for_split(validation_fraction, min_train),
            available: n,
        });
    }

    let (train, validation) = sorted.split_at(n_train);
    Ok(TemporalSplit { train, validation })
}

/// Rows held out for validation: `ceil(fraction * n)`, at least one when `n > 0`.
pub fn validation_size(n: usize, fraction: f64) -> usize {
    if n == 0 {
        return 0;
    }
    let raw = (fraction.clamp(0.0, 1.0) * n as f64).ceil() as usize;
    raw.clamp(1, n)
}

/// Smallest history length that leaves `min_train` training rows.
fn min_rows_for_split(fraction: f64, min_train: usize) -> usize {
    (min_train + 1..)
        .take(100_000)
        .find(|&n| n - validation_size(n, fraction) >= min_train)
        .unwrap_or(min_train + 1)
}
