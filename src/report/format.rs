//! Formatted terminal output for run and batch summaries.

use crate::app::pipeline::{RunKey, RunOutput, StructuralDecision};
use crate::error::AppError;
use crate::select::rank::{RankedModel, RankingTable};

/// Format one AICc ranking table as an aligned text block.
pub fn format_ranking_table(table: &RankingTable) -> String {
    let label_width = table
        .models
        .iter()
        .map(|m| m.label().len())
        .max()
        .unwrap_or(5)
        .max(5);

    let mut out = String::new();
    out.push_str(&format!(
        "  {:<label_width$}  {:>3}  {:>9}  {:>9}  {:>6}  {:>6}\n",
        "model", "df", "logLik", "AICc", "dAICc", "w",
    ));
    for row in &table.models {
        out.push_str(&format!(
            "  {:<label_width$}  {:>3}  {:>9.3}  {:>9.3}  {:>6.2}  {:>6.3}\n",
            row.label(),
            row.df,
            row.log_lik,
            row.aicc,
            row.delta,
            row.weight,
        ));
    }
    for skip in &table.skipped {
        out.push_str(&format!("  (skipped {}) {}\n", skip.model, skip.reason));
    }
    out
}

/// Format the selected model's coefficient table.
pub fn format_coef_table(model: &RankedModel) -> String {
    let term_width = model
        .coef
        .iter()
        .map(|c| c.term.len())
        .max()
        .unwrap_or(4)
        .max(4);

    let mut out = String::new();
    out.push_str(&format!(
        "  {:<term_width$}  {:>9}  {:>8}  {:>18}\n",
        "term", "estimate", "SE", "95% CI",
    ));
    for c in &model.coef {
        out.push_str(&format!(
            "  {:<term_width$}  {:>9.4}  {:>8.4}  [{:>7.4}, {:>7.4}]\n",
            c.term, c.estimate, c.std_err, c.ci_lo, c.ci_hi,
        ));
    }
    out
}

/// Full per-run summary: standardization, structural stage, mechanism stage.
pub fn format_run_summary(run: &RunOutput) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== {} × {} (n={}) ===\n",
        run.key.species, run.key.nutrient, run.n
    ));
    out.push_str(&format!(
        "Standardized against group mean {:.3}, sd {:.3}\n",
        run.raw_mean, run.raw_sd
    ));

    out.push_str("\nStructural candidates:\n");
    out.push_str(&format_ranking_table(&run.structural));
    if let Some(note) = &run.ambiguous_support {
        out.push_str(&format!("  ! ambiguous support: {note}\n"));
    }

    match run.decision {
        StructuralDecision::Stop => {
            out.push_str(&format!(
                "\nDecision: no temporal signal (top model: {}); mechanism search skipped.\n",
                run.structural.top().label()
            ));
        }
        StructuralDecision::Mechanism => {
            out.push_str("\nDecision: year effect present; dredging mechanism models.\n");
        }
    }

    if let Some(search) = &run.mechanism {
        out.push_str("\nMechanism dredge:\n");
        out.push_str(&format_ranking_table(&search.initial));

        if search.flagged.is_empty() {
            out.push_str("  No pretending variables flagged.\n");
        } else {
            let names: Vec<&str> = search.flagged.iter().map(|p| p.name()).collect();
            out.push_str(&format!(
                "  Pretending variables flagged: {}; re-dredging without them.\n",
                names.join(", ")
            ));
        }
        if let Some(refit) = &search.refit {
            out.push_str("\nRe-dredge:\n");
            out.push_str(&format_ranking_table(refit));
        }
    }

    out.push_str(&format!("\nSelected model: {}\n", run.selected().label()));
    out.push_str(&format_coef_table(run.selected()));
    out.push('\n');
    out
}

/// One-line-per-run batch summary, failures included.
pub fn format_batch_summary(results: &[(RunKey, Result<RunOutput, AppError>)]) -> String {
    let mut out = String::new();
    out.push_str("=== Batch summary (4 species × 3 nutrients) ===\n");
    for (key, result) in results {
        match result {
            Ok(run) => {
                let stage = match run.decision {
                    StructuralDecision::Stop => "structural only",
                    StructuralDecision::Mechanism => "mechanism",
                };
                out.push_str(&format!(
                    "  {:<6} × {:<5}  ok    [{stage}] selected: {}\n",
                    key.species.code(),
                    key.nutrient.column(),
                    run.selected().label(),
                ));
            }
            Err(e) => {
                out.push_str(&format!(
                    "  {:<6} × {:<5}  FAIL  {e}\n",
                    key.species.code(),
                    key.nutrient.column(),
                ));
            }
        }
    }
    out
}
