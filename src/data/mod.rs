//! Synthetic dataset generation (for the `sample` subcommand and tests).

pub mod sample;

pub use sample::*;
