//! Gaussian GLM fitting (identity link, i.e. OLS with likelihood bookkeeping).
//!
//! A `FittedModel` owns everything downstream stages need:
//!
//! - coefficients with standard errors and 95% confidence intervals
//! - fitted values, residuals, leverage and Cook's distance (for diagnostics)
//! - log-likelihood and parameter count (for AICc ranking)
//!
//! Fit failures (rank-deficient design, ill-conditioned solve, too few rows)
//! are reported per model as `FitFailure` so a candidate set can drop the
//! offender and keep ranking the rest.

use nalgebra::{DMatrix, DVector};

use crate::domain::ModelData;
use crate::math::{solve_least_squares, z_crit_95};
use crate::model::design::design_matrix;
use crate::model::formula::Formula;

/// One estimated coefficient of a fitted model.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Coefficient {
    pub term: String,
    pub estimate: f64,
    pub std_err: f64,
    pub ci_lo: f64,
    pub ci_hi: f64,
}

impl Coefficient {
    pub fn ci_spans_zero(&self) -> bool {
        self.ci_lo <= 0.0 && self.ci_hi >= 0.0
    }
}

/// Immutable result of fitting one formula against one dataset.
#[derive(Debug, Clone)]
pub struct FittedModel {
    pub formula: Formula,
    pub coef: Vec<Coefficient>,
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
    /// Hat-matrix diagonal per observation.
    pub leverage: Vec<f64>,
    pub cooks: Vec<f64>,
    pub n: usize,
    /// Number of regression coefficients (columns of the design).
    pub n_coef: usize,
    /// Parameters counted by information criteria: coefficients + residual
    /// variance.
    pub k: usize,
    pub sse: f64,
    /// Residual standard error (n - p denominator).
    pub sigma: f64,
    pub log_lik: f64,
}

impl FittedModel {
    pub fn label(&self) -> String {
        self.formula.rhs()
    }
}

/// A per-model fit failure, reported rather than aborting the candidate set.
#[derive(Debug, Clone)]
pub struct FitFailure {
    pub model: String,
    pub reason: String,
}

impl std::fmt::Display for FitFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.model, self.reason)
    }
}

/// Capability seam between selection logic and the regression routine.
///
/// Ranking, dredging and the pretending-variable refinement only ever talk to
/// this trait, so they can be tested against stub engines that fabricate
/// likelihoods without solving anything.
pub trait FitEngine {
    fn fit(&self, formula: &Formula, data: &ModelData) -> Result<FittedModel, FitFailure>;
}

/// The real engine: ordinary least squares with Gaussian likelihood.
#[derive(Debug, Clone, Copy, Default)]
pub struct OlsEngine;

impl FitEngine for OlsEngine {
    fn fit(&self, formula: &Formula, data: &ModelData) -> Result<FittedModel, FitFailure> {
        let fail = |reason: String| FitFailure {
            model: formula.rhs(),
            reason,
        };

        let (x, labels) = design_matrix(formula, data);
        let n = x.nrows();
        let p = x.ncols();
        if n <= p {
            return Err(fail(format!("Underdetermined: n={n} <= p={p}.")));
        }

        let y = DVector::from_column_slice(&data.z);
        let beta = solve_least_squares(&x, &y)
            .ok_or_else(|| fail("Ill-conditioned design; SVD solve failed.".to_string()))?;

        // Cross-product inverse for standard errors and leverage. A singular
        // X'X means the design is rank deficient even though SVD produced a
        // minimum-norm solution; treat that as a fit failure.
        let xtx = x.transpose() * &x;
        let xtx_inv = xtx
            .try_inverse()
            .ok_or_else(|| fail("Rank-deficient design (singular X'X).".to_string()))?;

        let fitted_v = &x * &beta;
        let resid_v = &y - &fitted_v;
        let sse: f64 = resid_v.iter().map(|e| e * e).sum();

        let df_resid = (n - p) as f64;
        let s2 = sse / df_resid;
        let sigma = s2.sqrt();

        let coef = coefficients(&labels, &beta, &xtx_inv, s2);
        let (leverage, cooks) = influence(&x, &xtx_inv, &resid_v, p, s2);

        // Gaussian log-likelihood at the ML variance estimate (SSE / n).
        let sigma2_ml = (sse / n as f64).max(f64::MIN_POSITIVE);
        let ln_2pi = (2.0 * std::f64::consts::PI).ln();
        let log_lik = -0.5 * n as f64 * (ln_2pi + sigma2_ml.ln() + 1.0);

        Ok(FittedModel {
            formula: formula.clone(),
            coef,
            fitted: fitted_v.iter().copied().collect(),
            residuals: resid_v.iter().copied().collect(),
            leverage,
            cooks,
            n,
            n_coef: p,
            k: p + 1,
            sse,
            sigma,
            log_lik,
        })
    }
}

fn coefficients(
    labels: &[String],
    beta: &DVector<f64>,
    xtx_inv: &DMatrix<f64>,
    s2: f64,
) -> Vec<Coefficient> {
    let z = z_crit_95();
    labels
        .iter()
        .enumerate()
        .map(|(j, label)| {
            let estimate = beta[j];
            let std_err = (s2 * xtx_inv[(j, j)].max(0.0)).sqrt();
            Coefficient {
                term: label.clone(),
                estimate,
                std_err,
                ci_lo: estimate - z * std_err,
                ci_hi: estimate + z * std_err,
            }
        })
        .collect()
}

fn influence(
    x: &DMatrix<f64>,
    xtx_inv: &DMatrix<f64>,
    resid: &DVector<f64>,
    p: usize,
    s2: f64,
) -> (Vec<f64>, Vec<f64>) {
    let n = x.nrows();
    let mut leverage = Vec::with_capacity(n);
    let mut cooks = Vec::with_capacity(n);
    for i in 0..n {
        let row = x.row(i);
        let h = (row * xtx_inv * row.transpose())[(0, 0)].clamp(0.0, 1.0);
        leverage.push(h);

        let e = resid[i];
        let denom = (1.0 - h).max(1e-12);
        let d = (e * e / (p as f64 * s2)) * (h / (denom * denom));
        cooks.push(d);
    }
    (leverage, cooks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Factor;
    use crate::model::formula::{Predictor, Term};

    /// One species group with a clean year effect and smooth covariates.
    fn data_with_year_effect() -> ModelData {
        let n = 24;
        let years: Vec<String> = (0..n)
            .map(|i| if i % 2 == 0 { "2022" } else { "2023" }.to_string())
            .collect();
        let sites: Vec<String> = (0..n)
            .map(|i| if i < n / 2 { "north" } else { "south" }.to_string())
            .collect();
        // z = -0.8 for 2022, +0.8 for 2023, plus a small deterministic wiggle.
        let z: Vec<f64> = (0..n)
            .map(|i| {
                let base = if i % 2 == 0 { -0.8 } else { 0.8 };
                base + 0.05 * ((i as f64) * 0.7).sin()
            })
            .collect();
        ModelData {
            response_name: "z_pct_n".to_string(),
            z,
            year: Factor::from_values("year", &years),
            site: Factor::from_values("site", &sites),
            gdd: (0..n).map(|i| 380.0 + 6.0 * i as f64).collect(),
            evi: (0..n).map(|i| 0.35 + 0.01 * i as f64).collect(),
            ndmi: (0..n).map(|i| 0.10 + 0.004 * i as f64).collect(),
            raw_mean: 2.1,
            raw_sd: 0.4,
        }
    }

    #[test]
    fn recovers_year_contrast() {
        let data = data_with_year_effect();
        let f = Formula::new("z_pct_n", vec![Term::Main(Predictor::Year)]);
        let fit = OlsEngine.fit(&f, &data).unwrap();

        assert_eq!(fit.n_coef, 2);
        assert_eq!(fit.k, 3);
        let year = fit.coef.iter().find(|c| c.term == "year2023").unwrap();
        // True contrast is 1.6 sd units; wiggle noise is tiny.
        assert!((year.estimate - 1.6).abs() < 0.1, "{}", year.estimate);
        assert!(!year.ci_spans_zero());
    }

    #[test]
    fn leverage_sums_to_column_count() {
        let data = data_with_year_effect();
        let f = Formula::new(
            "z_pct_n",
            vec![Term::Main(Predictor::Year), Term::Main(Predictor::Site)],
        );
        let fit = OlsEngine.fit(&f, &data).unwrap();
        let trace: f64 = fit.leverage.iter().sum();
        assert!((trace - fit.n_coef as f64).abs() < 1e-8, "trace = {trace}");
    }

    #[test]
    fn residuals_match_fitted_values() {
        let data = data_with_year_effect();
        let fit = OlsEngine.fit(&Formula::null("z_pct_n"), &data).unwrap();
        for i in 0..fit.n {
            let recon = fit.fitted[i] + fit.residuals[i];
            assert!((recon - data.z[i]).abs() < 1e-10);
        }
    }

    #[test]
    fn underdetermined_design_is_a_fit_failure() {
        let mut data = data_with_year_effect();
        data.z.truncate(2);
        data.gdd.truncate(2);
        data.evi.truncate(2);
        data.ndmi.truncate(2);
        data.year.codes.truncate(2);
        data.site.codes.truncate(2);

        let f = Formula::new(
            "z_pct_n",
            vec![
                Term::Main(Predictor::Gdd),
                Term::Main(Predictor::Evi),
                Term::Main(Predictor::Ndmi),
            ],
        );
        let err = OlsEngine.fit(&f, &data).unwrap_err();
        assert!(err.reason.contains("Underdetermined"), "{}", err.reason);
    }

    #[test]
    fn duplicated_column_is_rank_deficient() {
        // Two copies of the same dummy: SVD may still return a minimum-norm
        // solution, but X'X is singular and the fit must be rejected.
        let n = 12;
        let years: Vec<String> = (0..n)
            .map(|i| if i % 2 == 0 { "a" } else { "b" }.to_string())
            .collect();
        let data = ModelData {
            response_name: "z".to_string(),
            z: (0..n).map(|i| i as f64 * 0.1).collect(),
            year: Factor::from_values("year", &years),
            // Site identical to year: site dummy duplicates the year dummy.
            site: Factor::from_values("site", &years),
            gdd: vec![0.0; n],
            evi: vec![0.0; n],
            ndmi: vec![0.0; n],
            raw_mean: 0.0,
            raw_sd: 1.0,
        };
        let f = Formula::new(
            "z",
            vec![Term::Main(Predictor::Year), Term::Main(Predictor::Site)],
        );
        assert!(OlsEngine.fit(&f, &data).is_err());
    }
}
