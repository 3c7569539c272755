//! Candidate-set builders.
//!
//! Two fixed candidate families are used at different stages of a run:
//!
//! - the **structural set** asks whether temporal or spatial structure explains
//!   variance at all: `year * site`, `year`, `site`, `1`
//! - the **mechanism set** is the constrained power set of a global model over
//!   the continuous covariates with pairwise interactions, respecting
//!   marginality (an interaction only appears when both of its main effects do)

use crate::model::formula::{Formula, Predictor, Term};

/// The continuous covariates of the global mechanism model.
pub const MECHANISM_PREDICTORS: [Predictor; 3] = [Predictor::Gdd, Predictor::Evi, Predictor::Ndmi];

/// Structural candidates, most complex first.
pub fn structural_set(response: &str) -> Vec<Formula> {
    vec![
        Formula::new(
            response,
            vec![
                Term::Main(Predictor::Year),
                Term::Main(Predictor::Site),
                Term::interaction(Predictor::Year, Predictor::Site),
            ],
        ),
        Formula::new(response, vec![Term::Main(Predictor::Year)]),
        Formula::new(response, vec![Term::Main(Predictor::Site)]),
        Formula::null(response),
    ]
}

/// The global mechanism model: all base main effects plus every pairwise
/// interaction among them. No three-way term exists by construction.
pub fn global_model(response: &str, base: &[Predictor]) -> Formula {
    let mut terms: Vec<Term> = base.iter().map(|&p| Term::Main(p)).collect();
    for i in 0..base.len() {
        for j in (i + 1)..base.len() {
            terms.push(Term::interaction(base[i], base[j]));
        }
    }
    Formula::new(response, terms)
}

/// Every marginality-respecting sub-model of the global model.
///
/// Enumeration: each subset of main effects, crossed with each subset of the
/// pairwise interactions whose endpoints are both present. The null model is
/// included (empty main-effect subset). For 3 base predictors this yields
/// exactly 18 formulas.
pub fn mechanism_set(response: &str, base: &[Predictor]) -> Vec<Formula> {
    let mut out = Vec::new();
    let n = base.len();

    for main_mask in 0u32..(1 << n) {
        let mains: Vec<Predictor> = (0..n)
            .filter(|&i| main_mask & (1 << i) != 0)
            .map(|i| base[i])
            .collect();

        let mut pairs: Vec<Term> = Vec::new();
        for i in 0..mains.len() {
            for j in (i + 1)..mains.len() {
                pairs.push(Term::interaction(mains[i], mains[j]));
            }
        }

        for pair_mask in 0u32..(1 << pairs.len()) {
            let mut terms: Vec<Term> = mains.iter().map(|&p| Term::Main(p)).collect();
            terms.extend(
                pairs
                    .iter()
                    .enumerate()
                    .filter(|(k, _)| pair_mask & (1 << k) != 0)
                    .map(|(_, t)| *t),
            );
            out.push(Formula::new(response, terms));
        }
    }

    out
}
