//! Model specifications and Gaussian GLM fitting.
//!
//! A `Formula` is a pure description (response ~ terms); fitting it against a
//! `ModelData` produces an immutable `FittedModel`. The `FitEngine` trait is
//! the seam between the selection machinery and the regression routine, so
//! ranking and dredging can be exercised with stub engines in tests.

pub mod design;
pub mod fit;
pub mod formula;

pub use design::*;
pub use fit::*;
pub use formula::*;
