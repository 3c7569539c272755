//! Result exports: ranking tables and coefficient summaries as CSV, plus a
//! structured JSON summary per run.
//!
//! Exports are meant to be easy to consume in spreadsheets or downstream
//! scripts; the JSON file is the "portable" record of a run's decisions.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::AppError;
use crate::select::rank::{RankedModel, RankingTable};

/// Write one AICc ranking table to CSV.
pub fn write_ranking_csv(path: &Path, table: &RankingTable) -> Result<(), AppError> {
    let mut file = create(path)?;

    writeln!(file, "model,df,log_lik,aicc,delta_aicc,weight")
        .map_err(|e| write_err(path, e))?;
    for row in &table.models {
        writeln!(
            file,
            "\"{}\",{},{:.4},{:.4},{:.4},{:.4}",
            row.label(),
            row.df,
            row.log_lik,
            row.aicc,
            row.delta,
            row.weight,
        )
        .map_err(|e| write_err(path, e))?;
    }
    for skip in &table.skipped {
        writeln!(file, "\"{}\",,,,,skipped: {}", skip.model, skip.reason)
            .map_err(|e| write_err(path, e))?;
    }
    Ok(())
}

/// Write the selected model's coefficient summary to CSV.
pub fn write_coefficients_csv(path: &Path, model: &RankedModel) -> Result<(), AppError> {
    let mut file = create(path)?;

    writeln!(file, "term,estimate,std_err,ci_lo,ci_hi").map_err(|e| write_err(path, e))?;
    for c in &model.coef {
        writeln!(
            file,
            "\"{}\",{:.6},{:.6},{:.6},{:.6}",
            c.term, c.estimate, c.std_err, c.ci_lo, c.ci_hi,
        )
        .map_err(|e| write_err(path, e))?;
    }
    Ok(())
}

/// Serializable record of one run's outcome.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummaryFile {
    pub species: String,
    pub nutrient: String,
    pub n: usize,
    pub raw_mean: f64,
    pub raw_sd: f64,
    pub structural: Vec<RankRow>,
    /// Human-facing note when a simpler structural model sits within ΔAICc ≤ 2.
    pub ambiguous_support: Option<String>,
    pub proceeded_to_mechanism: bool,
    pub flagged_pretending: Vec<String>,
    pub dredge: Option<Vec<RankRow>>,
    pub redredge: Option<Vec<RankRow>>,
    pub selected_model: String,
    pub selected_coefficients: Vec<crate::model::fit::Coefficient>,
}

/// One serializable ranking-table row.
#[derive(Debug, Clone, Serialize)]
pub struct RankRow {
    pub model: String,
    pub df: usize,
    pub log_lik: f64,
    pub aicc: f64,
    pub delta_aicc: f64,
    pub weight: f64,
}

impl RankRow {
    pub fn from_table(table: &RankingTable) -> Vec<RankRow> {
        table
            .models
            .iter()
            .map(|m| RankRow {
                model: m.label(),
                df: m.df,
                log_lik: m.log_lik,
                aicc: m.aicc,
                delta_aicc: m.delta,
                weight: m.weight,
            })
            .collect()
    }
}

/// Write a run summary as pretty-printed JSON.
pub fn write_run_json(path: &Path, summary: &RunSummaryFile) -> Result<(), AppError> {
    let file = create(path)?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| AppError::new(4, format!("Failed to write JSON '{}': {e}", path.display())))
}

fn create(path: &Path) -> Result<File, AppError> {
    File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create '{}': {e}", path.display())))
}

fn write_err(path: &Path, e: std::io::Error) -> AppError {
    AppError::new(4, format!("Failed to write '{}': {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::formula::{Formula, Predictor, Term};
    use crate::select::rank::RankingTable;
    use crate::select::rank::test_support::stub_fit;

    fn tmp(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("leaf_stoich_export_{}_{name}", std::process::id()))
    }

    #[test]
    fn ranking_csv_has_one_line_per_model() {
        let fits = vec![
            stub_fit(Formula::null("z"), -12.0, 40),
            stub_fit(Formula::new("z", vec![Term::Main(Predictor::Gdd)]), -5.0, 40),
        ];
        let table = RankingTable::build(fits, Vec::new()).unwrap();

        let path = tmp("rank.csv");
        write_ranking_csv(&path, &table).unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "model,df,log_lik,aicc,delta_aicc,weight");
        assert!(lines[1].starts_with("\"gdd\""));
        assert!(lines[1].contains(",0.0000,")); // top row delta
    }

    #[test]
    fn coefficient_csv_round_trips_terms() {
        let fit = stub_fit(Formula::new("z", vec![Term::Main(Predictor::Evi)]), -5.0, 40);
        let table = RankingTable::build(vec![fit], Vec::new()).unwrap();

        let path = tmp("coef.csv");
        write_coefficients_csv(&path, table.top()).unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(body.contains("\"(Intercept)\""));
        assert!(body.contains("\"evi\""));
    }
}
