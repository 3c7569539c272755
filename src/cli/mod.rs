//! Command-line parsing.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the modeling/selection code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "stoich",
    version,
    about = "Leaf tissue C/N/P GLM selection (AICc ranking + mechanism dredging)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full batch: 4 species × 3 nutrients, each standardized,
    /// ranked, and (when a year effect is present) dredged.
    Run(RunArgs),
    /// Generate a synthetic field campaign (the three input CSVs).
    Sample(SampleArgs),
}

/// Options for the batch analysis.
#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Tissue chemistry CSV (plot,site,species,year,pct_c,pct_n,pct_p).
    #[arg(long)]
    pub tissue: PathBuf,

    /// Growing-degree-day CSV (plot,species,gdd).
    #[arg(long)]
    pub gdd: PathBuf,

    /// Spectral index CSV (plot,evi,ndmi).
    #[arg(long)]
    pub spectral: PathBuf,

    /// Directory for ranking/coefficient/summary exports (omit to skip).
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Write ASCII diagnostic panels per fitted candidate (requires --out-dir).
    #[arg(long, default_value_t = false)]
    pub plots: bool,

    /// Plot grid width in characters.
    #[arg(long, default_value_t = 72)]
    pub plot_width: usize,

    /// Plot grid height in characters.
    #[arg(long, default_value_t = 16)]
    pub plot_height: usize,

    /// ΔAICc window for competitive models (ambiguity + pretending checks).
    #[arg(long, default_value_t = 2.0)]
    pub delta_cutoff: f64,
}

/// Options for synthetic dataset generation.
#[derive(Debug, Parser, Clone)]
pub struct SampleArgs {
    /// Directory to write tissue.csv, gdd.csv and spectral.csv into.
    #[arg(long)]
    pub out_dir: PathBuf,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Plots per site (total rows = 2 sites × plots × 4 species × 2 years).
    #[arg(long, default_value_t = 5)]
    pub plots_per_site: usize,

    /// Year effect injected into responses, in group-sd units.
    #[arg(long, default_value_t = 1.5)]
    pub year_effect: f64,

    /// Residual noise scale, in group-sd units.
    #[arg(long, default_value_t = 0.5)]
    pub noise: f64,
}
