//! `sales-calendar-forecast` library crate.
//!
//! The binary (`salescast`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the calendar and feature code can be reused outside the CLI
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod data;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod features;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod normalize;
pub mod report;
