//! ASCII diagnostic plots for fitted models.

pub mod ascii;

pub use ascii::*;
