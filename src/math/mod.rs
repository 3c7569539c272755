//! Mathematical utilities: least squares, standardization, normal quantiles.

pub mod norm;
pub mod ols;
pub mod standardize;

pub use norm::*;
pub use ols::*;
pub use standardize::*;
