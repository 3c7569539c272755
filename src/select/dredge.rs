//! Mechanism dredging with a single pretending-variable refinement pass.
//!
//! "Dredging" fits and ranks every marginality-respecting sub-model of the
//! global specification. After the first pass, the pretending-variable policy
//! inspects the table; if it flags predictors, the global model is rebuilt
//! without them (interactions referencing them vanish with their main effect)
//! and dredging runs exactly once more. The removal is deliberately not
//! iterated to a fixed point.

use crate::domain::ModelData;
use crate::error::AppError;
use crate::model::fit::FitEngine;
use crate::model::formula::Predictor;
use crate::select::candidates::mechanism_set;
use crate::select::pretend::PretendingPolicy;
use crate::select::rank::{RankedModel, RankingTable, rank_candidates};

/// Outcome of the mechanism stage for one run.
#[derive(Debug, Clone)]
pub struct MechanismSearch {
    /// First-pass ranking over the full mechanism set.
    pub initial: RankingTable,
    /// Predictors the policy flagged as pretending (possibly empty).
    pub flagged: Vec<Predictor>,
    /// Second-pass ranking without the flagged predictors, when any were.
    pub refit: Option<RankingTable>,
}

impl MechanismSearch {
    /// The selected mechanism model: top of the refit when one happened,
    /// otherwise top of the initial table.
    pub fn selected(&self) -> &RankedModel {
        self.refit.as_ref().unwrap_or(&self.initial).top()
    }
}

/// Rank the full mechanism candidate set for `base`.
pub fn dredge<E: FitEngine + Sync + ?Sized>(
    engine: &E,
    data: &ModelData,
    response: &str,
    base: &[Predictor],
) -> Result<RankingTable, AppError> {
    rank_candidates(engine, &mechanism_set(response, base), data)
}

/// Dredge, apply the pretending-variable policy, and re-dredge once if it
/// flagged anything.
pub fn dredge_with_refinement<E: FitEngine + Sync + ?Sized, P: PretendingPolicy + ?Sized>(
    engine: &E,
    data: &ModelData,
    response: &str,
    base: &[Predictor],
    policy: &P,
) -> Result<MechanismSearch, AppError> {
    let initial = dredge(engine, data, response, base)?;
    let flagged = policy.flag(&initial, base);

    let refit = if flagged.is_empty() {
        None
    } else {
        let reduced: Vec<Predictor> = base
            .iter()
            .copied()
            .filter(|p| !flagged.contains(p))
            .collect();
        Some(dredge(engine, data, response, &reduced)?)
    };

    Ok(MechanismSearch {
        initial,
        flagged,
        refit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Factor, ModelData};
    use crate::select::candidates::MECHANISM_PREDICTORS;
    use crate::select::pretend::CiSpansZero;
    use crate::select::rank::test_support::TableEngine;

    fn placeholder_data() -> ModelData {
        let labels: Vec<String> = (0..4).map(|i| format!("r{i}")).collect();
        ModelData {
            response_name: "z".to_string(),
            z: vec![0.0; 4],
            year: Factor::from_values("year", &labels),
            site: Factor::from_values("site", &labels),
            gdd: vec![0.0; 4],
            evi: vec![0.0; 4],
            ndmi: vec![0.0; 4],
            raw_mean: 0.0,
            raw_sd: 1.0,
        }
    }

    /// Likelihood table rewarding gdd-containing models (stub engine).
    fn gdd_wins(label: &str) -> f64 {
        if label.split(" + ").any(|t| t == "gdd") {
            -5.0 - label.len() as f64 * 0.01
        } else {
            -25.0
        }
    }

    #[test]
    fn dredge_ranks_the_full_mechanism_set() {
        let engine = TableEngine {
            n: 60,
            log_lik: gdd_wins,
        };
        let table = dredge(&engine, &placeholder_data(), "z", &MECHANISM_PREDICTORS).unwrap();
        assert_eq!(table.models.len() + table.skipped.len(), 18);
        assert_eq!(table.top().label(), "gdd");
    }

    #[test]
    fn no_flags_means_no_refit() {
        // Stub coefficients never span zero, so the policy flags nothing.
        let engine = TableEngine {
            n: 60,
            log_lik: gdd_wins,
        };
        let search = dredge_with_refinement(
            &engine,
            &placeholder_data(),
            "z",
            &MECHANISM_PREDICTORS,
            &CiSpansZero::default(),
        )
        .unwrap();
        assert!(search.flagged.is_empty());
        assert!(search.refit.is_none());
    }

    #[test]
    fn refinement_is_idempotent_when_nothing_is_flagged() {
        let engine = TableEngine {
            n: 60,
            log_lik: gdd_wins,
        };
        let policy = CiSpansZero::default();
        let data = placeholder_data();

        let first =
            dredge_with_refinement(&engine, &data, "z", &MECHANISM_PREDICTORS, &policy).unwrap();
        let second =
            dredge_with_refinement(&engine, &data, "z", &MECHANISM_PREDICTORS, &policy).unwrap();

        assert_eq!(first.selected().formula, second.selected().formula);
        assert!(second.refit.is_none());
    }

    #[test]
    fn flagged_predictor_is_rebuilt_out_of_the_global_model() {
        struct FlagNdmi;
        impl PretendingPolicy for FlagNdmi {
            fn flag(&self, _table: &RankingTable, base: &[Predictor]) -> Vec<Predictor> {
                base.iter().copied().filter(|&p| p == Predictor::Ndmi).collect()
            }
        }

        let engine = TableEngine {
            n: 60,
            log_lik: gdd_wins,
        };
        let search = dredge_with_refinement(
            &engine,
            &placeholder_data(),
            "z",
            &MECHANISM_PREDICTORS,
            &FlagNdmi,
        )
        .unwrap();

        assert_eq!(search.flagged, vec![Predictor::Ndmi]);
        let refit = search.refit.as_ref().unwrap();
        // 2 remaining predictors => 5 marginality-respecting sub-models, and
        // ndmi appears in none of them.
        assert_eq!(refit.models.len(), 5);
        assert!(
            refit
                .models
                .iter()
                .all(|m| !m.formula.contains(Predictor::Ndmi))
        );
    }
}
