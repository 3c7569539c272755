//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the species and nutrient enumerations that index the 12 analysis runs
//! - joined field observations (`Observation`)
//! - model-ready data for one species group (`ModelData`, `Factor`)
//! - run configuration derived from CLI flags (`RunConfig`)

pub mod types;

pub use types::*;
