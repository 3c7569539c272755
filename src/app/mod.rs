//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - ingests and joins the input tables
//! - runs the 12-run analysis batch
//! - prints reports and writes optional exports/diagnostics

use std::path::Path;

use clap::Parser;

use crate::cli::{Command, RunArgs, SampleArgs};
use crate::data::sample::{SampleConfig, write_sample_csvs};
use crate::domain::{ModelData, RunConfig};
use crate::error::AppError;
use crate::io::export::{
    RankRow, RunSummaryFile, write_coefficients_csv, write_ranking_csv, write_run_json,
};
use crate::io::ingest::{IngestedData, load_dataset};
use crate::model::fit::{FitEngine, OlsEngine};
use crate::model::formula::Formula;
use crate::select::candidates::structural_set;
use crate::select::pretend::CiSpansZero;

pub mod pipeline;

use pipeline::{RunOutput, StructuralDecision};

/// Entry point for the `stoich` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Sample(args) => handle_sample(args),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args);

    let data = load_dataset(&config.tissue_path, &config.gdd_path, &config.spectral_path)?;
    report_drops(&data);

    let engine = OlsEngine;
    let policy = CiSpansZero {
        delta_cutoff: config.delta_cutoff,
    };
    let results = pipeline::run_all(&engine, &policy, &data.observations, &config);

    for (key, result) in &results {
        match result {
            Ok(run) => println!("{}", crate::report::format_run_summary(run)),
            Err(e) => eprintln!("Run {} × {} failed: {e}", key.species, key.nutrient),
        }
    }
    println!("{}", crate::report::format_batch_summary(&results));

    if let Some(out_dir) = &config.out_dir {
        std::fs::create_dir_all(out_dir).map_err(|e| {
            AppError::new(4, format!("Failed to create '{}': {e}", out_dir.display()))
        })?;
        for (_, result) in &results {
            if let Ok(run) = result {
                export_run(out_dir, run, &data, &config)?;
            }
        }
    }

    if results.iter().all(|(_, r)| r.is_err()) {
        return Err(AppError::new(3, "Every analysis run failed."));
    }
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = SampleConfig {
        seed: args.seed,
        plots_per_site: args.plots_per_site,
        year_effect: args.year_effect,
        noise: args.noise,
    };
    write_sample_csvs(&args.out_dir, &config)?;
    println!(
        "Wrote tissue.csv, gdd.csv, spectral.csv to {} (seed {}).",
        args.out_dir.display(),
        config.seed
    );
    Ok(())
}

fn report_drops(data: &IngestedData) {
    if !data.covariate_skips.is_empty() {
        eprintln!(
            "Skipped {} malformed covariate row(s):",
            data.covariate_skips.len()
        );
        for skip in &data.covariate_skips {
            eprintln!("  {} row {}: {}", skip.table, skip.line, skip.message);
        }
    }
    if data.dropped.is_empty() {
        return;
    }
    eprintln!(
        "Dropped {} row(s) lacking required covariates or valid values:",
        data.dropped.len()
    );
    for drop in &data.dropped {
        let plot = drop.plot.as_deref().unwrap_or("?");
        eprintln!("  row {} (plot {plot}): {}", drop.line, drop.message);
    }
}

/// Write the per-run CSV/JSON artifacts (and optional diagnostics).
fn export_run(
    out_dir: &Path,
    run: &RunOutput,
    data: &IngestedData,
    config: &RunConfig,
) -> Result<(), AppError> {
    let stem = run.key.stem();

    write_ranking_csv(&out_dir.join(format!("{stem}_structural_aicc.csv")), &run.structural)?;
    if let Some(search) = &run.mechanism {
        write_ranking_csv(&out_dir.join(format!("{stem}_dredge_aicc.csv")), &search.initial)?;
        if let Some(refit) = &search.refit {
            write_ranking_csv(&out_dir.join(format!("{stem}_redredge_aicc.csv")), refit)?;
        }
    }
    write_coefficients_csv(
        &out_dir.join(format!("{stem}_coefficients.csv")),
        run.selected(),
    )?;
    write_run_json(&out_dir.join(format!("{stem}_summary.json")), &run_summary(run))?;

    if config.plots {
        write_diagnostics(out_dir, run, data, config)?;
    }
    Ok(())
}

fn run_summary(run: &RunOutput) -> RunSummaryFile {
    RunSummaryFile {
        species: run.key.species.code().to_string(),
        nutrient: run.key.nutrient.column().to_string(),
        n: run.n,
        raw_mean: run.raw_mean,
        raw_sd: run.raw_sd,
        structural: RankRow::from_table(&run.structural),
        ambiguous_support: run.ambiguous_support.clone(),
        proceeded_to_mechanism: run.decision == StructuralDecision::Mechanism,
        flagged_pretending: run
            .mechanism
            .iter()
            .flat_map(|s| s.flagged.iter().map(|p| p.name().to_string()))
            .collect(),
        dredge: run
            .mechanism
            .as_ref()
            .map(|s| RankRow::from_table(&s.initial)),
        redredge: run
            .mechanism
            .as_ref()
            .and_then(|s| s.refit.as_ref())
            .map(RankRow::from_table),
        selected_model: run.selected().label(),
        selected_coefficients: run.selected().coef.clone(),
    }
}

/// Every candidate that was fit during this run, in diagnostic order: the
/// structural set, then the ranked mechanism models (re-dredge included),
/// then the selected model, deduplicated.
fn diagnostic_formulas(run: &RunOutput, response: &str) -> Vec<Formula> {
    let mut formulas = structural_set(response);
    if let Some(search) = &run.mechanism {
        let ranked = search
            .initial
            .models
            .iter()
            .chain(search.refit.iter().flat_map(|t| t.models.iter()));
        for model in ranked {
            if !formulas.contains(&model.formula) {
                formulas.push(model.formula.clone());
            }
        }
    }
    let selected = run.selected().formula.clone();
    if !formulas.contains(&selected) {
        formulas.push(selected);
    }
    formulas
}

/// Render ASCII diagnostic panels for every fitted candidate: the structural
/// set, the dredged mechanism models (re-dredge included), and the selected
/// model.
///
/// Fits are deterministic, so candidates are refit here rather than carrying
/// residual vectors through the ranking tables.
fn write_diagnostics(
    out_dir: &Path,
    run: &RunOutput,
    data: &IngestedData,
    config: &RunConfig,
) -> Result<(), AppError> {
    let plots_dir = out_dir.join("diagnostics");
    std::fs::create_dir_all(&plots_dir).map_err(|e| {
        AppError::new(4, format!("Failed to create '{}': {e}", plots_dir.display()))
    })?;

    let group = data.species_group(run.key.species);
    let model_data = ModelData::from_group(&group, run.key.nutrient)?;
    let response = format!("z_{}", run.key.nutrient.column());

    for (idx, formula) in diagnostic_formulas(run, &response).iter().enumerate() {
        // A candidate that failed during ranking will fail identically here;
        // skip it silently, the table already reports the reason.
        let Ok(fit) = OlsEngine.fit(formula, &model_data) else {
            continue;
        };
        let art = crate::plot::render_diagnostics(&fit, config.plot_width, config.plot_height);
        let path = plots_dir.join(format!("{}_{idx}.txt", run.key.stem()));
        std::fs::write(&path, art).map_err(|e| {
            AppError::new(4, format!("Failed to write '{}': {e}", path.display()))
        })?;
    }
    Ok(())
}

fn run_config_from_args(args: &RunArgs) -> RunConfig {
    RunConfig {
        tissue_path: args.tissue.clone(),
        gdd_path: args.gdd.clone(),
        spectral_path: args.spectral.clone(),
        out_dir: args.out_dir.clone(),
        plots: args.plots,
        plot_width: args.plot_width,
        plot_height: args.plot_height,
        delta_cutoff: args.delta_cutoff,
    }
}
