//! The per-run analysis pipeline and the 12-run orchestrator.
//!
//! One run = one (species, nutrient) combination:
//!
//! standardize → structural AICc ranking → (if a year effect tops the table)
//! mechanism dredge → pretending-variable check → one re-dredge → summary
//!
//! Runs share no mutable state, so the orchestrator executes them in parallel;
//! a failure in one run is isolated and reported, never fatal to the batch.

use rayon::prelude::*;

use crate::domain::{ModelData, Nutrient, Observation, RunConfig, Species};
use crate::error::AppError;
use crate::model::fit::FitEngine;
use crate::model::formula::Predictor;
use crate::select::candidates::{MECHANISM_PREDICTORS, structural_set};
use crate::select::dredge::{MechanismSearch, dredge_with_refinement};
use crate::select::pretend::PretendingPolicy;
use crate::select::rank::{RankedModel, RankingTable, rank_candidates};

/// One of the 12 (species, nutrient) combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunKey {
    pub species: Species,
    pub nutrient: Nutrient,
}

impl RunKey {
    /// All 12 combinations, species-major.
    pub fn all() -> Vec<RunKey> {
        Species::ALL
            .iter()
            .flat_map(|&species| {
                Nutrient::ALL
                    .iter()
                    .map(move |&nutrient| RunKey { species, nutrient })
            })
            .collect()
    }

    /// File-name stem for exports, e.g. `betnan_pct_n`.
    pub fn stem(&self) -> String {
        format!(
            "{}_{}",
            self.species.code().to_ascii_lowercase(),
            self.nutrient.column()
        )
    }
}

/// Outcome of the structural stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralDecision {
    /// Null or site-only model won; mechanism search is not warranted.
    Stop,
    /// `year` or `year * site` topped the table; proceed to dredging.
    Mechanism,
}

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub key: RunKey,
    pub n: usize,
    pub raw_mean: f64,
    pub raw_sd: f64,
    pub structural: RankingTable,
    /// Set when a simpler structural model sits within the ΔAICc cutoff of
    /// the top model. Surfaced to the analyst, never auto-resolved.
    pub ambiguous_support: Option<String>,
    pub decision: StructuralDecision,
    pub mechanism: Option<MechanismSearch>,
}

impl RunOutput {
    /// The model this run settles on: the mechanism selection when the run
    /// got that far, otherwise the top structural model.
    pub fn selected(&self) -> &RankedModel {
        match &self.mechanism {
            Some(search) => search.selected(),
            None => self.structural.top(),
        }
    }
}

/// Execute one (species, nutrient) run.
pub fn run_one<E, P>(
    engine: &E,
    policy: &P,
    group: &[Observation],
    key: RunKey,
    config: &RunConfig,
) -> Result<RunOutput, AppError>
where
    E: FitEngine + Sync + ?Sized,
    P: PretendingPolicy + ?Sized,
{
    if group.is_empty() {
        return Err(AppError::new(
            3,
            format!("No observations for {} × {}.", key.species, key.nutrient),
        ));
    }

    let data = ModelData::from_group(group, key.nutrient)?;
    let response = format!("z_{}", key.nutrient.column());

    // Stage 1: does temporal or spatial structure explain variance at all?
    let structural = rank_candidates(engine, &structural_set(&response), &data)?;

    let ambiguous_support = structural.simpler_within(config.delta_cutoff).map(|m| {
        format!(
            "'{}' within dAICc {:.2} of '{}'",
            m.label(),
            m.delta,
            structural.top().label()
        )
    });

    // Mechanism search is only warranted when the year effect carries the top
    // model; a site-only or null winner ends the run here.
    let decision = if structural.top().formula.has_main(Predictor::Year) {
        StructuralDecision::Mechanism
    } else {
        StructuralDecision::Stop
    };

    let mechanism = match decision {
        StructuralDecision::Stop => None,
        StructuralDecision::Mechanism => Some(dredge_with_refinement(
            engine,
            &data,
            &response,
            &MECHANISM_PREDICTORS,
            policy,
        )?),
    };

    Ok(RunOutput {
        key,
        n: data.n(),
        raw_mean: data.raw_mean,
        raw_sd: data.raw_sd,
        structural,
        ambiguous_support,
        decision,
        mechanism,
    })
}

/// Execute all 12 runs over a joined dataset.
///
/// Runs are independent and execute in parallel; each failure stays paired
/// with its key so the caller can report it without losing the others.
pub fn run_all<E, P>(
    engine: &E,
    policy: &P,
    observations: &[Observation],
    config: &RunConfig,
) -> Vec<(RunKey, Result<RunOutput, AppError>)>
where
    E: FitEngine + Sync + ?Sized,
    P: PretendingPolicy + Sync + ?Sized,
{
    RunKey::all()
        .into_par_iter()
        .map(|key| {
            let group: Vec<Observation> = observations
                .iter()
                .filter(|o| o.species == key.species)
                .cloned()
                .collect();
            let result = run_one(engine, policy, &group, key, config);
            (key, result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample::{SampleConfig, generate_dataset};
    use crate::model::fit::OlsEngine;
    use crate::select::pretend::CiSpansZero;

    fn test_config() -> RunConfig {
        RunConfig {
            tissue_path: "tissue.csv".into(),
            gdd_path: "gdd.csv".into(),
            spectral_path: "spectral.csv".into(),
            out_dir: None,
            plots: false,
            plot_width: 72,
            plot_height: 16,
            delta_cutoff: 2.0,
        }
    }

    /// Observations for one species: 2 years × 2 sites, strong year effect.
    fn year_effect_group() -> Vec<Observation> {
        let sample = SampleConfig {
            seed: 7,
            plots_per_site: 10,
            year_effect: 2.0,
            noise: 0.5,
        };
        generate_dataset(&sample)
            .into_iter()
            .filter(|o| o.species == Species::Erivag)
            .collect()
    }

    #[test]
    fn scenario_group_is_40_obs_across_2_years_and_2_sites() {
        let group = year_effect_group();
        assert_eq!(group.len(), 40);
        assert_eq!(group.iter().filter(|o| o.year == "2023").count(), 20);
        assert_eq!(group.iter().filter(|o| o.site == "south").count(), 20);
    }

    #[test]
    fn structural_stage_picks_year_and_rejects_null() {
        let group = year_effect_group();
        let key = RunKey {
            species: Species::Erivag,
            nutrient: Nutrient::Nitrogen,
        };
        let run = run_one(
            &OlsEngine,
            &CiSpansZero::default(),
            &group,
            key,
            &test_config(),
        )
        .unwrap();

        let top = run.structural.top();
        assert!(
            top.label() == "year" || top.label() == "year + site + year:site",
            "unexpected top model: {}",
            top.label()
        );

        let null = run
            .structural
            .models
            .iter()
            .find(|m| m.label() == "1")
            .expect("null model present");
        assert!(null.delta > 2.0, "null dAICc = {}", null.delta);

        assert_eq!(run.decision, StructuralDecision::Mechanism);
        assert!(run.mechanism.is_some());
    }

    #[test]
    fn standardization_stats_are_group_moments() {
        let group = year_effect_group();
        let key = RunKey {
            species: Species::Erivag,
            nutrient: Nutrient::Carbon,
        };
        let run = run_one(
            &OlsEngine,
            &CiSpansZero::default(),
            &group,
            key,
            &test_config(),
        )
        .unwrap();

        let raw: Vec<f64> = group.iter().map(|o| o.pct_c).collect();
        let mean = raw.iter().sum::<f64>() / raw.len() as f64;
        assert!((run.raw_mean - mean).abs() < 1e-9);
        assert!(run.raw_sd > 0.0);
    }

    #[test]
    fn empty_group_fails_without_touching_other_runs() {
        let group = year_effect_group();
        // Dataset holds only ERIVAG rows: 3 runs succeed, 9 fail, none abort.
        let results = run_all(
            &OlsEngine,
            &CiSpansZero::default(),
            &group,
            &test_config(),
        );
        assert_eq!(results.len(), 12);

        let ok = results.iter().filter(|(_, r)| r.is_ok()).count();
        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        assert_eq!(ok, 3);
        assert_eq!(failed, 9);
        for (key, result) in &results {
            if key.species == Species::Erivag {
                assert!(result.is_ok());
            } else {
                assert!(result.is_err());
            }
        }
    }

    #[test]
    fn constant_response_is_fatal_for_the_run_only() {
        let mut group = year_effect_group();
        for o in &mut group {
            o.pct_p = 0.15;
        }
        let key = RunKey {
            species: Species::Erivag,
            nutrient: Nutrient::Phosphorus,
        };
        let err = run_one(
            &OlsEngine,
            &CiSpansZero::default(),
            &group,
            key,
            &test_config(),
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("Zero variance"));
    }
}
