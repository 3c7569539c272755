//! AICc ranking of a candidate set.
//!
//! For each fitted candidate:
//!
//! ```text
//! AIC  = -2 logLik + 2k
//! AICc = AIC + 2k(k+1) / (n - k - 1)
//! w_i  = exp(-Δ_i / 2) / Σ_j exp(-Δ_j / 2)
//! ```
//!
//! where `k` counts every estimated parameter (coefficients plus the residual
//! variance). Tables are sorted ascending by AICc, so row 0 is the top model
//! and always has Δ = 0.

use rayon::prelude::*;

use crate::domain::ModelData;
use crate::error::AppError;
use crate::model::fit::{Coefficient, FitEngine, FitFailure, FittedModel};
use crate::model::formula::Formula;

/// Corrected AIC. `None` when the small-sample correction is undefined
/// (`n <= k + 1`), which callers treat as a fit failure.
pub fn aicc(log_lik: f64, k: usize, n: usize) -> Option<f64> {
    if n <= k + 1 {
        return None;
    }
    let kf = k as f64;
    let aic = -2.0 * log_lik + 2.0 * kf;
    Some(aic + 2.0 * kf * (kf + 1.0) / (n as f64 - kf - 1.0))
}

/// One row of an AICc ranking table.
#[derive(Debug, Clone)]
pub struct RankedModel {
    pub formula: Formula,
    /// Parameter count (coefficients + residual variance), reported as `df`.
    pub df: usize,
    pub log_lik: f64,
    pub aicc: f64,
    pub delta: f64,
    pub weight: f64,
    pub coef: Vec<Coefficient>,
}

impl RankedModel {
    pub fn label(&self) -> String {
        self.formula.rhs()
    }

    pub fn coefficient(&self, term: &str) -> Option<&Coefficient> {
        self.coef.iter().find(|c| c.term == term)
    }
}

/// A ranked candidate set: rows ascending by AICc, plus per-model skips.
#[derive(Debug, Clone)]
pub struct RankingTable {
    pub models: Vec<RankedModel>,
    pub skipped: Vec<FitFailure>,
}

impl RankingTable {
    /// Rank fitted models; moves fits whose AICc is undefined into `skipped`.
    ///
    /// Errors only when no model survives.
    pub fn build(
        fits: Vec<FittedModel>,
        mut skipped: Vec<FitFailure>,
    ) -> Result<RankingTable, AppError> {
        let mut rows: Vec<RankedModel> = Vec::with_capacity(fits.len());
        for fit in fits {
            match aicc(fit.log_lik, fit.k, fit.n) {
                Some(value) => rows.push(RankedModel {
                    df: fit.k,
                    log_lik: fit.log_lik,
                    aicc: value,
                    delta: 0.0,
                    weight: 0.0,
                    coef: fit.coef,
                    formula: fit.formula,
                }),
                None => skipped.push(FitFailure {
                    model: fit.formula.rhs(),
                    reason: format!("AICc undefined: n={} <= k+1={}.", fit.n, fit.k + 1),
                }),
            }
        }

        if rows.is_empty() {
            return Err(AppError::new(
                4,
                "No candidate model survived fitting; ranking table is empty.",
            ));
        }

        rows.sort_by(|a, b| a.aicc.partial_cmp(&b.aicc).unwrap_or(std::cmp::Ordering::Equal));

        let min = rows[0].aicc;
        let mut norm = 0.0;
        for row in &mut rows {
            row.delta = row.aicc - min;
            norm += (-row.delta / 2.0).exp();
        }
        for row in &mut rows {
            row.weight = (-row.delta / 2.0).exp() / norm;
        }

        Ok(RankingTable { models: rows, skipped })
    }

    /// The selected model (Δ = 0).
    pub fn top(&self) -> &RankedModel {
        &self.models[0]
    }

    /// Models within `cutoff` AICc units of the top, top included.
    pub fn competitive(&self, cutoff: f64) -> Vec<&RankedModel> {
        self.models.iter().filter(|m| m.delta <= cutoff).collect()
    }

    /// A simpler model (fewer parameters than the top) within `cutoff`.
    ///
    /// This is the ambiguous-support signal: it is surfaced to the analyst,
    /// never auto-resolved.
    pub fn simpler_within(&self, cutoff: f64) -> Option<&RankedModel> {
        self.models[1..]
            .iter()
            .find(|m| m.delta <= cutoff && m.df < self.top().df)
    }
}

/// Fit every candidate with `engine` (in parallel) and rank the survivors
/// by AICc.
pub fn rank_candidates<E: FitEngine + Sync + ?Sized>(
    engine: &E,
    candidates: &[Formula],
    data: &ModelData,
) -> Result<RankingTable, AppError> {
    let results: Vec<Result<FittedModel, FitFailure>> = candidates
        .par_iter()
        .map(|formula| engine.fit(formula, data))
        .collect();

    let mut fits = Vec::with_capacity(candidates.len());
    let mut skipped = Vec::new();
    for result in results {
        match result {
            Ok(fit) => fits.push(fit),
            Err(failure) => skipped.push(failure),
        }
    }
    RankingTable::build(fits, skipped)
}
