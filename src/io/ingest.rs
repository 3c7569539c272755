//! CSV ingest and covariate joins.
//!
//! Three input tables become one clean observation list:
//!
//! - tissue chemistry: `plot,site,species,year,pct_c,pct_n,pct_p`
//! - growing-degree-days: `plot,species,gdd` (joined on plot + species)
//! - spectral indices: `plot,evi,ndmi` (joined on plot)
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation**: a bad or unjoinable row is dropped and
//!   reported, never silently carried as NaN
//! - **Separation of concerns**: no standardization or fitting logic here

use std::collections::HashMap;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{Observation, Species};
use crate::error::AppError;

/// A row dropped during ingest, with enough context to audit the join.
#[derive(Debug, Clone)]
pub struct RowDrop {
    /// 1-based data-row number in the tissue CSV.
    pub line: usize,
    pub plot: Option<String>,
    pub message: String,
}

/// A covariate-table row skipped during ingest. These never abort the load,
/// but a corrupt gdd or spectral file must not degrade silently either: every
/// skip is counted and reported.
#[derive(Debug, Clone)]
pub struct CovariateSkip {
    /// Which covariate table the row came from (`gdd` or `spectral`).
    pub table: &'static str,
    /// 1-based data-row number in that table.
    pub line: usize,
    pub message: String,
}

/// Result of loading and joining the three input tables.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub observations: Vec<Observation>,
    pub dropped: Vec<RowDrop>,
    pub covariate_skips: Vec<CovariateSkip>,
}

impl IngestedData {
    /// All observations for one species, in input order.
    pub fn species_group(&self, species: Species) -> Vec<Observation> {
        self.observations
            .iter()
            .filter(|o| o.species == species)
            .cloned()
            .collect()
    }
}

/// Load the three CSVs and join covariates onto tissue rows.
///
/// Returns an error for unreadable files or missing columns; individual rows
/// that fail validation or a join are collected in `dropped`.
pub fn load_dataset(
    tissue: &Path,
    gdd: &Path,
    spectral: &Path,
) -> Result<IngestedData, AppError> {
    let mut covariate_skips = Vec::new();
    let gdd_by_key = read_gdd(gdd, &mut covariate_skips)?;
    let spectral_by_plot = read_spectral(spectral, &mut covariate_skips)?;

    let mut reader = open(tissue)?;
    let header = header_map(&mut reader, tissue)?;
    let cols = TissueColumns::resolve(&header, tissue)?;

    let mut observations = Vec::new();
    let mut dropped = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        let line = idx + 1;
        let record = record.map_err(|e| {
            AppError::new(2, format!("Failed to read '{}' row {line}: {e}", tissue.display()))
        })?;

        match tissue_row(&record, &cols, &gdd_by_key, &spectral_by_plot) {
            Ok(obs) => observations.push(obs),
            Err(drop) => dropped.push(RowDrop {
                line,
                plot: record.get(cols.plot).map(str::to_string),
                message: drop,
            }),
        }
    }

    if observations.is_empty() {
        return Err(AppError::new(
            3,
            format!("No usable observations in '{}'.", tissue.display()),
        ));
    }

    Ok(IngestedData {
        observations,
        dropped,
        covariate_skips,
    })
}

struct TissueColumns {
    plot: usize,
    site: usize,
    species: usize,
    year: usize,
    pct_c: usize,
    pct_n: usize,
    pct_p: usize,
}

impl TissueColumns {
    fn resolve(header: &HashMap<String, usize>, path: &Path) -> Result<TissueColumns, AppError> {
        let find = |name: &str| required_column(header, name, path);
        Ok(TissueColumns {
            plot: find("plot")?,
            site: find("site")?,
            species: find("species")?,
            year: find("year")?,
            pct_c: find("pct_c")?,
            pct_n: find("pct_n")?,
            pct_p: find("pct_p")?,
        })
    }
}

fn tissue_row(
    record: &StringRecord,
    cols: &TissueColumns,
    gdd_by_key: &HashMap<(String, Species), f64>,
    spectral_by_plot: &HashMap<String, (f64, f64)>,
) -> Result<Observation, String> {
    let plot = field(record, cols.plot, "plot")?;
    let site = field(record, cols.site, "site")?;
    let year = field(record, cols.year, "year")?;

    let species_code = field(record, cols.species, "species")?;
    let species = Species::from_code(&species_code)
        .ok_or_else(|| format!("Unknown species code '{species_code}'."))?;

    let pct_c = positive_number(record, cols.pct_c, "pct_c")?;
    let pct_n = positive_number(record, cols.pct_n, "pct_n")?;
    let pct_p = positive_number(record, cols.pct_p, "pct_p")?;

    // Covariate joins: gdd keyed by (plot, species), indices by plot alone.
    let &gdd = gdd_by_key
        .get(&(plot.clone(), species))
        .ok_or_else(|| format!("No growing-degree-day match for plot '{plot}' × {species}."))?;
    let &(evi, ndmi) = spectral_by_plot
        .get(&plot)
        .ok_or_else(|| format!("No spectral-index match for plot '{plot}'."))?;

    Ok(Observation {
        plot,
        site,
        species,
        year,
        pct_c,
        pct_n,
        pct_p,
        gdd,
        evi,
        ndmi,
    })
}

fn read_gdd(
    path: &Path,
    skips: &mut Vec<CovariateSkip>,
) -> Result<HashMap<(String, Species), f64>, AppError> {
    let mut reader = open(path)?;
    let header = header_map(&mut reader, path)?;
    let plot_col = required_column(&header, "plot", path)?;
    let species_col = required_column(&header, "species", path)?;
    let gdd_col = required_column(&header, "gdd", path)?;

    let mut out = HashMap::new();
    for (idx, record) in reader.records().enumerate() {
        let line = idx + 1;
        let record = record.map_err(|e| {
            AppError::new(2, format!("Failed to read '{}' row {line}: {e}", path.display()))
        })?;
        let mut skip = |message: String| {
            skips.push(CovariateSkip {
                table: "gdd",
                line,
                message,
            });
        };
        let plot = match field(&record, plot_col, "plot") {
            Ok(v) => v,
            Err(message) => {
                skip(message);
                continue;
            }
        };
        let Some(species) = record.get(species_col).and_then(Species::from_code) else {
            let raw = record.get(species_col).unwrap_or_default();
            skip(format!("Unknown species code '{raw}'."));
            continue;
        };
        let value = match finite_number(&record, gdd_col, "gdd") {
            Ok(v) => v,
            Err(message) => {
                skip(message);
                continue;
            }
        };
        out.insert((plot, species), value);
    }
    Ok(out)
}

fn read_spectral(
    path: &Path,
    skips: &mut Vec<CovariateSkip>,
) -> Result<HashMap<String, (f64, f64)>, AppError> {
    let mut reader = open(path)?;
    let header = header_map(&mut reader, path)?;
    let plot_col = required_column(&header, "plot", path)?;
    let evi_col = required_column(&header, "evi", path)?;
    let ndmi_col = required_column(&header, "ndmi", path)?;

    let mut out = HashMap::new();
    for (idx, record) in reader.records().enumerate() {
        let line = idx + 1;
        let record = record.map_err(|e| {
            AppError::new(2, format!("Failed to read '{}' row {line}: {e}", path.display()))
        })?;
        let mut skip = |message: String| {
            skips.push(CovariateSkip {
                table: "spectral",
                line,
                message,
            });
        };
        let plot = match field(&record, plot_col, "plot") {
            Ok(v) => v,
            Err(message) => {
                skip(message);
                continue;
            }
        };
        let (evi, ndmi) = match (
            finite_number(&record, evi_col, "evi"),
            finite_number(&record, ndmi_col, "ndmi"),
        ) {
            (Ok(evi), Ok(ndmi)) => (evi, ndmi),
            (Err(message), _) | (_, Err(message)) => {
                skip(message);
                continue;
            }
        };
        out.insert(plot, (evi, ndmi));
    }
    Ok(out)
}

fn open(path: &Path) -> Result<csv::Reader<std::fs::File>, AppError> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to open '{}': {e}", path.display())))
}

fn header_map(
    reader: &mut csv::Reader<std::fs::File>,
    path: &Path,
) -> Result<HashMap<String, usize>, AppError> {
    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read header of '{}': {e}", path.display())))?;
    Ok(headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_ascii_lowercase(), i))
        .collect())
}

fn required_column(
    header: &HashMap<String, usize>,
    name: &str,
    path: &Path,
) -> Result<usize, AppError> {
    header.get(name).copied().ok_or_else(|| {
        AppError::new(
            2,
            format!("Missing required column '{name}' in '{}'.", path.display()),
        )
    })
}

fn field(record: &StringRecord, idx: usize, name: &str) -> Result<String, String> {
    match record.get(idx) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(format!("Empty '{name}' field.")),
    }
}

fn finite_number(record: &StringRecord, idx: usize, name: &str) -> Result<f64, String> {
    let raw = field(record, idx, name)?;
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("Unparseable '{name}' value '{raw}'."))?;
    if !value.is_finite() {
        return Err(format!("Non-finite '{name}' value."));
    }
    Ok(value)
}

fn positive_number(record: &StringRecord, idx: usize, name: &str) -> Result<f64, String> {
    let value = finite_number(record, idx, name)?;
    if value <= 0.0 {
        return Err(format!("Non-positive '{name}' value {value}."));
    }
    Ok(value)
}
