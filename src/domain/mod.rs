//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - normalized sales observations (`SalesRecord`) and skip accounting
//! - the calendar feature columns and enriched rows
//! - forecast outputs and model hyper-parameters

pub mod types;

pub use types::*;
