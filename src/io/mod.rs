//! Input/output helpers.
//!
//! - raw extract loading (`ingest`)
//! - forecast CSV export (`export`)
//! - trained model JSON read/write (`model_file`)

pub mod export;
pub mod ingest;
pub mod model_file;

pub use export::*;
pub use ingest::*;
pub use model_file::*;
