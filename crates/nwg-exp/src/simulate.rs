use indexmap::IndexMap;
use nwg_core::errors::{ErrorInfo, NwgError};
use nwg_core::learner::{Learner, LearnerFactory, LearnerParams, Metric, ProbQuery, SimTime};
use nwg_core::params::ExpandedCondition;
use nwg_core::stimulus::{ExperimentResult, Scene, TrialResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::axes::{CompareToPrior, LearnerType, TrialSettings, ZeroDenominatorPolicy};
use crate::stimuli::Stimuli;

/// Context path forwarded with every training exposure.
pub const EXPOSURE_CONTEXT: &str = "./";

/// A ratio or normalisation step whose denominator was zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("zero denominator during {step}")]
pub struct ZeroDenominator {
    /// `ratio-to-prior` or `prototype-normalisation`.
    pub step: &'static str,
}

/// Why a trial produced no result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum SkipReason {
    /// Combined learner with level-specific hyperparameters.
    DifferentiatedParameters,
    /// Zero denominator under the `skip` policy.
    ZeroDenominator {
        /// Step that divided by zero.
        step: String,
        /// Training condition being simulated.
        training_condition: String,
        /// Test condition being probed.
        test_condition: String,
    },
}

/// Outcome of simulating one condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Simulation {
    /// Every pair ran.
    Completed(ExperimentResult),
    /// The condition produced no result.
    Skipped(SkipReason),
}

/// Applies the comparison-to-prior transform to one raw probability.
pub fn compare_to_prior(mode: CompareToPrior, value: f64, prior: f64) -> Result<f64, ZeroDenominator> {
    match mode {
        CompareToPrior::None => Ok(value),
        CompareToPrior::Difference => Ok(value - prior),
        CompareToPrior::Ratio if value == 0.0 => Err(ZeroDenominator {
            step: "ratio-to-prior",
        }),
        CompareToPrior::Ratio => Ok(1.0 - prior / value),
    }
}

/// Divides `value` by the mean of `references`.
pub fn normalize_by_prototype(value: f64, references: &[f64]) -> Result<f64, ZeroDenominator> {
    let err = ZeroDenominator {
        step: "prototype-normalisation",
    };
    if references.is_empty() {
        return Err(err);
    }
    let normaliser = references.iter().sum::<f64>() / references.len() as f64;
    if normaliser == 0.0 {
        return Err(err);
    }
    Ok(value / normaliser)
}

/// Simulates a condition end to end: settings, gate, stimuli, protocol.
pub fn simulate_condition<F: LearnerFactory>(
    factory: &F,
    condition: &ExpandedCondition,
) -> Result<Simulation, NwgError> {
    let settings = TrialSettings::from_condition(condition)?;
    let params = LearnerParams::from_condition(condition)?;
    if settings.learner_type == LearnerType::Combined && !params.is_undifferentiated() {
        return Ok(Simulation::Skipped(SkipReason::DifferentiatedParameters));
    }
    let stimuli = Stimuli::load(&settings.data_path, settings.feature_space)?;
    TrialSimulator::new(factory, settings, params, &stimuli)?.run()
}

/// Drives the temporal protocol for one condition.
pub struct TrialSimulator<'a, F: LearnerFactory> {
    factory: &'a F,
    settings: TrialSettings,
    params: LearnerParams,
    stimuli: &'a Stimuli,
    words: Vec<String>,
    unseen_prob: f64,
}

impl<'a, F: LearnerFactory> TrialSimulator<'a, F> {
    /// Prepares a simulator and computes the untrained prior on the unseen object.
    pub fn new(
        factory: &'a F,
        settings: TrialSettings,
        params: LearnerParams,
        stimuli: &'a Stimuli,
    ) -> Result<Self, NwgError> {
        let pristine = factory.build(&params, &stimuli.taxonomy)?;
        let unseen_prob = pristine.generalization_prob(
            &settings.word,
            &stimuli.unseen_object,
            ProbQuery::default(),
            SimTime::ZERO,
        );
        let words = vec![settings.word.clone()];
        Ok(Self {
            factory,
            settings,
            params,
            stimuli,
            words,
            unseen_prob,
        })
    }

    /// Prior probability of the word on the unseen object.
    pub fn unseen_prob(&self) -> f64 {
        self.unseen_prob
    }

    /// Runs every (training condition, test condition) pair on a fresh learner.
    pub fn run(&self) -> Result<Simulation, NwgError> {
        let mut result = ExperimentResult::default();
        for (training_name, trials) in &self.stimuli.training_sets {
            debug!(training_condition = %training_name, "executing training condition");
            let mut trial_result = TrialResult::default();
            for (test_name, objects) in &self.stimuli.test_sets {
                debug!(test_condition = %test_name, "testing");
                match self.run_pair(training_name, trials, test_name, objects)? {
                    Ok(values) => {
                        trial_result.0.insert(test_name.clone(), values);
                    }
                    Err(zero) => {
                        return Ok(Simulation::Skipped(SkipReason::ZeroDenominator {
                            step: zero.step.to_string(),
                            training_condition: training_name.clone(),
                            test_condition: test_name.clone(),
                        }))
                    }
                }
            }
            result.0.insert(training_name.clone(), trial_result);
        }
        Ok(Simulation::Completed(result))
    }

    /// The inner error carries a zero denominator hit under the `skip` policy.
    fn run_pair(
        &self,
        training_name: &str,
        trials: &IndexMap<String, Scene>,
        test_name: &str,
        objects: &IndexMap<String, Scene>,
    ) -> Result<Result<Vec<f64>, ZeroDenominator>, NwgError> {
        let mut learner = self.factory.build(&self.params, &self.stimuli.taxonomy)?;
        let spacing = self.settings.spacing;

        let mut now = SimTime::ZERO;
        for scene in trials.values() {
            now = learner.process_pair(
                &self.words,
                scene,
                EXPOSURE_CONTEXT,
                now,
                spacing.increments_per_exposure(),
            );
            now = now.advance(spacing.inter_exposure_delay());
        }
        now = now.advance(spacing.closing_step());
        debug!(training_condition = training_name, %now, "training complete");
        now = now.advance(self.settings.test_delay);

        let metric = self.settings.metric;
        let prototype = if metric == Some(Metric::IntersectionOverPrototype) {
            let query = ProbQuery {
                metric,
                test_condition: None,
            };
            Some(
                trials
                    .values()
                    .map(|scene| learner.generalization_prob(&self.settings.word, scene, query, now))
                    .collect::<Vec<_>>(),
            )
        } else {
            None
        };

        let query = ProbQuery {
            metric,
            test_condition: Some(test_name),
        };
        let mut values = Vec::with_capacity(objects.len());
        for (object, scene) in objects {
            let raw = learner.generalization_prob(&self.settings.word, scene, query, now);
            let compared = compare_to_prior(self.settings.compare_to_prior, raw, self.unseen_prob);
            let mut value = match self.resolve(compared, raw, training_name, test_name, object)? {
                Ok(value) => value,
                Err(zero) => return Ok(Err(zero)),
            };
            if let Some(references) = prototype.as_deref() {
                let normalized = normalize_by_prototype(value, references);
                value = match self.resolve(normalized, value, training_name, test_name, object)? {
                    Ok(value) => value,
                    Err(zero) => return Ok(Err(zero)),
                };
            }
            values.push(value);
        }
        Ok(Ok(values))
    }

    fn resolve(
        &self,
        outcome: Result<f64, ZeroDenominator>,
        fallback: f64,
        training_name: &str,
        test_name: &str,
        object: &str,
    ) -> Result<Result<f64, ZeroDenominator>, NwgError> {
        let zero = match outcome {
            Ok(value) => return Ok(Ok(value)),
            Err(zero) => zero,
        };
        match self.settings.zero_denominator {
            ZeroDenominatorPolicy::KeepRaw => {
                warn!(
                    step = zero.step,
                    training_condition = training_name,
                    test_condition = test_name,
                    object,
                    "zero denominator; keeping untransformed value"
                );
                Ok(Ok(fallback))
            }
            ZeroDenominatorPolicy::Skip => Ok(Err(zero)),
            ZeroDenominatorPolicy::Fail => Err(NwgError::Numeric(
                ErrorInfo::new("zero-denominator", zero.to_string())
                    .with_context("training_condition", training_name)
                    .with_context("test_condition", test_name)
                    .with_context("object", object),
            )),
        }
    }
}
