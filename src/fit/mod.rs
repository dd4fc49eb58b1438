//! Forecast model: temporal split, fitting, validation and prediction.
//!
//! Responsibilities:
//!
//! - hold out the most recent rows without shuffling (`split`)
//! - fit the configured regressor and score it on the held-out window (`forecaster`)
//! - compute error metrics (`metrics`)

pub mod forecaster;
pub mod metrics;
pub mod split;

pub use forecaster::*;
pub use metrics::*;
pub use split::*;
