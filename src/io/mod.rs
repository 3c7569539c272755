//! Input/output helpers.
//!
//! - CSV ingest + covariate joins + row-level validation (`ingest`)
//! - ranking/coefficient CSV and run-summary JSON exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
