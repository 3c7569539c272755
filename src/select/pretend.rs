//! Pretending-variable detection.
//!
//! A predictor is "pretending" when it rides along in AICc-competitive models
//! (Δ ≤ 2 of the best, conventionally) while its coefficient's 95% confidence
//! interval contains zero in every one of those appearances: its apparent
//! importance is an artifact of model selection, not a real effect.
//!
//! The judgment is a policy, not a hard-coded rule. The pipeline hands the
//! full ranking + coefficient table to a `PretendingPolicy`, so the default
//! CI-based rule can be swapped for a stricter or manual one and tested in
//! isolation.

use crate::model::formula::Predictor;
use crate::select::rank::RankingTable;

/// Decides which predictors to drop before the re-dredge.
pub trait PretendingPolicy {
    /// Inspect a mechanism ranking table and return the predictors to exclude
    /// from the rebuilt global model.
    fn flag(&self, table: &RankingTable, base: &[Predictor]) -> Vec<Predictor>;
}

/// Default policy: flag a predictor when every competitive model containing
/// its main effect has a 95% CI spanning zero for it.
#[derive(Debug, Clone, Copy)]
pub struct CiSpansZero {
    /// ΔAICc window defining "competitive".
    pub delta_cutoff: f64,
}

impl Default for CiSpansZero {
    fn default() -> Self {
        CiSpansZero { delta_cutoff: 2.0 }
    }
}

impl PretendingPolicy for CiSpansZero {
    fn flag(&self, table: &RankingTable, base: &[Predictor]) -> Vec<Predictor> {
        let competitive = table.competitive(self.delta_cutoff);

        base.iter()
            .copied()
            .filter(|&p| {
                let appearances: Vec<_> = competitive
                    .iter()
                    .filter(|m| m.formula.has_main(p))
                    .filter_map(|m| m.coefficient(p.name()))
                    .collect();
                !appearances.is_empty() && appearances.iter().all(|c| c.ci_spans_zero())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fit::Coefficient;
    use crate::model::formula::{Formula, Predictor, Term};
    use crate::select::rank::RankedModel;

    fn coef(term: &str, lo: f64, hi: f64) -> Coefficient {
        Coefficient {
            term: term.to_string(),
            estimate: (lo + hi) / 2.0,
            std_err: (hi - lo) / (2.0 * 1.96),
            ci_lo: lo,
            ci_hi: hi,
        }
    }

    fn row(terms: Vec<Term>, delta: f64, coefs: Vec<Coefficient>) -> RankedModel {
        RankedModel {
            formula: Formula::new("z", terms),
            df: coefs.len() + 1,
            log_lik: -10.0,
            aicc: 100.0 + delta,
            delta,
            weight: 0.3,
            coef: coefs,
        }
    }

    fn table(models: Vec<RankedModel>) -> RankingTable {
        RankingTable {
            models,
            skipped: Vec::new(),
        }
    }

    #[test]
    fn flags_predictor_whose_interval_spans_zero() {
        let t = table(vec![row(
            vec![Term::Main(Predictor::Gdd)],
            0.0,
            vec![coef("(Intercept)", 0.5, 0.9), coef("gdd", -0.3, 0.5)],
        )]);
        let flagged = CiSpansZero::default().flag(&t, &[Predictor::Gdd]);
        assert_eq!(flagged, vec![Predictor::Gdd]);
    }

    #[test]
    fn does_not_flag_predictor_with_interval_away_from_zero() {
        let t = table(vec![row(
            vec![Term::Main(Predictor::Gdd)],
            0.0,
            vec![coef("(Intercept)", 0.5, 0.9), coef("gdd", 0.2, 0.5)],
        )]);
        let flagged = CiSpansZero::default().flag(&t, &[Predictor::Gdd]);
        assert!(flagged.is_empty());
    }

    #[test]
    fn one_confident_appearance_clears_the_predictor() {
        // evi spans zero in the top model but is clearly nonzero in another
        // competitive model, so it is not pretending.
        let t = table(vec![
            row(
                vec![Term::Main(Predictor::Evi)],
                0.0,
                vec![coef("(Intercept)", 0.5, 0.9), coef("evi", -0.1, 0.4)],
            ),
            row(
                vec![Term::Main(Predictor::Evi), Term::Main(Predictor::Gdd)],
                1.2,
                vec![
                    coef("(Intercept)", 0.5, 0.9),
                    coef("evi", 0.1, 0.6),
                    coef("gdd", 0.2, 0.7),
                ],
            ),
        ]);
        let flagged = CiSpansZero::default().flag(&t, &[Predictor::Gdd, Predictor::Evi]);
        assert!(flagged.is_empty());
    }

    #[test]
    fn non_competitive_models_are_ignored() {
        // gdd spans zero only in a model far from the top; absent from the
        // competitive set, it cannot be flagged.
        let t = table(vec![
            row(
                vec![Term::Main(Predictor::Evi)],
                0.0,
                vec![coef("(Intercept)", 0.5, 0.9), coef("evi", 0.2, 0.6)],
            ),
            row(
                vec![Term::Main(Predictor::Gdd)],
                6.5,
                vec![coef("(Intercept)", 0.5, 0.9), coef("gdd", -0.4, 0.4)],
            ),
        ]);
        let flagged = CiSpansZero::default().flag(&t, &[Predictor::Gdd, Predictor::Evi]);
        assert!(flagged.is_empty());
    }
}
