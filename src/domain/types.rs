//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting and ranking
//! - exported to JSON/CSV
//! - reconstructed in tests without touching the filesystem

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// The four tundra species sampled in the field campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Species {
    /// Betula nana (dwarf birch).
    Betnan,
    /// Salix pulchra (diamondleaf willow).
    Salpul,
    /// Eriophorum vaginatum (tussock cottongrass).
    Erivag,
    /// Carex aquatilis (water sedge).
    Caraqu,
}

impl Species {
    pub const ALL: [Species; 4] = [
        Species::Betnan,
        Species::Salpul,
        Species::Erivag,
        Species::Caraqu,
    ];

    /// Six-letter field code used in the input CSVs.
    pub fn code(self) -> &'static str {
        match self {
            Species::Betnan => "BETNAN",
            Species::Salpul => "SALPUL",
            Species::Erivag => "ERIVAG",
            Species::Caraqu => "CARAQU",
        }
    }

    pub fn from_code(code: &str) -> Option<Species> {
        Species::ALL.iter().copied().find(|s| s.code() == code)
    }
}

impl std::fmt::Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// The three elemental response variables (percent of dry tissue mass).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nutrient {
    Carbon,
    Nitrogen,
    Phosphorus,
}

impl Nutrient {
    pub const ALL: [Nutrient; 3] = [Nutrient::Carbon, Nutrient::Nitrogen, Nutrient::Phosphorus];

    /// Column name in the tissue CSV.
    pub fn column(self) -> &'static str {
        match self {
            Nutrient::Carbon => "pct_c",
            Nutrient::Nitrogen => "pct_n",
            Nutrient::Phosphorus => "pct_p",
        }
    }
}

impl std::fmt::Display for Nutrient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// One joined (plot, species, year) sample, ready for analysis.
///
/// Rows that failed the covariate joins never become `Observation`s; they are
/// dropped (and reported) during ingest.
#[derive(Debug, Clone)]
pub struct Observation {
    pub plot: String,
    pub site: String,
    pub species: Species,
    /// Sampling year, treated as a categorical factor (two discrete seasons).
    pub year: String,
    pub pct_c: f64,
    pub pct_n: f64,
    pub pct_p: f64,
    /// Accumulated growing-degree-days (joined on plot + species).
    pub gdd: f64,
    /// Enhanced vegetation index (joined on plot).
    pub evi: f64,
    /// Normalized-difference moisture index (joined on plot).
    pub ndmi: f64,
}

impl Observation {
    pub fn response(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Carbon => self.pct_c,
            Nutrient::Nitrogen => self.pct_n,
            Nutrient::Phosphorus => self.pct_p,
        }
    }
}

/// A categorical predictor encoded against sorted unique levels.
///
/// The first level is the reference; design-matrix dummies are emitted for
/// levels `1..`. Encoding is deterministic (levels sorted lexically), so
/// coefficient labels are stable across runs.
#[derive(Debug, Clone)]
pub struct Factor {
    pub name: &'static str,
    pub levels: Vec<String>,
    /// Per-row index into `levels`.
    pub codes: Vec<usize>,
}

impl Factor {
    pub fn from_values(name: &'static str, values: &[String]) -> Factor {
        let mut levels: Vec<String> = values.to_vec();
        levels.sort();
        levels.dedup();
        let codes = values
            .iter()
            .map(|v| levels.iter().position(|l| l == v).unwrap_or(0))
            .collect();
        Factor { name, levels, codes }
    }

    pub fn n_levels(&self) -> usize {
        self.levels.len()
    }
}

/// Model-ready data for one (species, nutrient) run.
///
/// The response is already z-scored within the species group; predictors are
/// carried in raw units.
#[derive(Debug, Clone)]
pub struct ModelData {
    pub response_name: String,
    /// Standardized response values, one per observation.
    pub z: Vec<f64>,
    pub year: Factor,
    pub site: Factor,
    pub gdd: Vec<f64>,
    pub evi: Vec<f64>,
    pub ndmi: Vec<f64>,
    /// Group mean of the raw response (for reporting).
    pub raw_mean: f64,
    /// Group sample standard deviation of the raw response.
    pub raw_sd: f64,
}

impl ModelData {
    pub fn n(&self) -> usize {
        self.z.len()
    }

    /// Assemble model data for one species group.
    ///
    /// Precondition: `group` contains only observations of a single species
    /// and every field is finite (guaranteed by ingest). Standardization
    /// failures (too few rows, zero variance) surface as errors here.
    pub fn from_group(
        group: &[Observation],
        nutrient: Nutrient,
    ) -> Result<ModelData, AppError> {
        let raw: Vec<f64> = group.iter().map(|o| o.response(nutrient)).collect();
        let std = crate::math::standardize(&raw).map_err(|e| {
            AppError::new(
                e.exit_code(),
                format!("Standardizing {} failed: {e}", nutrient.column()),
            )
        })?;

        let years: Vec<String> = group.iter().map(|o| o.year.clone()).collect();
        let sites: Vec<String> = group.iter().map(|o| o.site.clone()).collect();

        Ok(ModelData {
            response_name: nutrient.column().to_string(),
            z: std.values,
            year: Factor::from_values("year", &years),
            site: Factor::from_values("site", &sites),
            gdd: group.iter().map(|o| o.gdd).collect(),
            evi: group.iter().map(|o| o.evi).collect(),
            ndmi: group.iter().map(|o| o.ndmi).collect(),
            raw_mean: std.mean,
            raw_sd: std.sd,
        })
    }
}

/// A full batch run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub tissue_path: PathBuf,
    pub gdd_path: PathBuf,
    pub spectral_path: PathBuf,

    pub out_dir: Option<PathBuf>,

    /// Render ASCII diagnostic panels for fitted candidates.
    pub plots: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    /// ΔAICc window used for "competitive" models (ambiguous-support flag and
    /// pretending-variable detection).
    pub delta_cutoff: f64,
}
