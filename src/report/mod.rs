//! Reporting utilities: formatted terminal output for runs and batches.
//!
//! We keep formatting code in one place so:
//! - the math/selection code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

pub mod format;

pub use format::*;
