//! Reporting utilities: terminal summaries and forecast tables.

pub mod format;

pub use format::*;
