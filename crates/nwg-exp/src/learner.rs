//! Exposure-memory learner used when no external model is plugged in.
//!
//! Every exposure is remembered with its time. A feature's association with a
//! word is the decayed, level-weighted fraction of that word's exposures in
//! which the feature was present; scores are novelty-smoothed overlaps between
//! a scene and those associations.

use indexmap::IndexMap;
use nwg_core::errors::NwgError;
use nwg_core::learner::{
    Learner, LearnerFactory, LearnerParams, Metric, ProbQuery, SimTime, TaxonomicLevel,
};
use nwg_core::stimulus::{Scene, Taxonomy};
use serde_json::Value;

/// Builds [`PrototypeLearner`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrototypeLearnerFactory;

impl LearnerFactory for PrototypeLearnerFactory {
    type Output = PrototypeLearner;

    fn build(&self, params: &LearnerParams, taxonomy: &Taxonomy) -> Result<Self::Output, NwgError> {
        Ok(PrototypeLearner::new(params.clone(), taxonomy.clone()))
    }
}

#[derive(Debug, Clone)]
struct Exposure {
    words: Vec<String>,
    features: Vec<String>,
    at: SimTime,
}

/// Remembers every exposure and scores scenes by decayed feature overlap.
#[derive(Debug, Clone)]
pub struct PrototypeLearner {
    params: LearnerParams,
    taxonomy: Taxonomy,
    exposures: Vec<Exposure>,
}

impl PrototypeLearner {
    /// A learner with no exposures.
    pub fn new(params: LearnerParams, taxonomy: Taxonomy) -> Self {
        Self {
            params,
            taxonomy,
            exposures: Vec::new(),
        }
    }

    /// Number of exposures recorded so far.
    pub fn exposures(&self) -> usize {
        self.exposures.len()
    }

    /// Static weight and decay exponent of a feature.
    fn feature_terms(&self, feature: &str) -> (f64, f64) {
        match self
            .taxonomy
            .level_of(feature)
            .and_then(TaxonomicLevel::from_label)
        {
            Some(level) => {
                let level = self.params.level(level);
                (level.feature_weight, level.decay)
            }
            None => (1.0, self.params.decay),
        }
    }

    /// Decayed association of every feature seen with `word`, as of `now`.
    fn associations(&self, word: &str, now: SimTime) -> IndexMap<&str, f64> {
        let heard: Vec<&Exposure> = self
            .exposures
            .iter()
            .filter(|exposure| exposure.words.iter().any(|w| w == word))
            .collect();
        let mut strengths: IndexMap<&str, f64> = IndexMap::new();
        if heard.is_empty() {
            return strengths;
        }
        for exposure in &heard {
            let age = (now.since(exposure.at) + 1) as f64;
            for feature in &exposure.features {
                let (weight, decay) = self.feature_terms(feature);
                *strengths.entry(feature.as_str()).or_insert(0.0) += weight * age.powf(-decay);
            }
        }
        let count = heard.len() as f64;
        for value in strengths.values_mut() {
            *value /= count;
        }
        strengths
    }
}

fn active_features(scene: &Scene) -> Vec<String> {
    scene
        .features()
        .filter(|(_, value)| is_present(value))
        .map(|(feature, _)| feature.to_string())
        .collect()
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map_or(true, |v| v != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl Learner for PrototypeLearner {
    fn observe(&mut self, words: &[String], scene: &Scene, _context: &str, at: SimTime) {
        self.exposures.push(Exposure {
            words: words.to_vec(),
            features: active_features(scene),
            at,
        });
    }

    fn generalization_prob(
        &self,
        word: &str,
        scene: &Scene,
        query: ProbQuery<'_>,
        now: SimTime,
    ) -> f64 {
        let novelty = self.params.novelty;
        let learned = self.associations(word, now);
        let features = active_features(scene);
        let overlap: f64 = features
            .iter()
            .map(|feature| learned.get(feature.as_str()).copied().unwrap_or(0.0))
            .sum();
        let scene_mass: f64 = features
            .iter()
            .map(|feature| self.feature_terms(feature).0)
            .sum();
        let denominator = match query.metric.unwrap_or(Metric::Intersection) {
            Metric::Intersection | Metric::IntersectionOverPrototype => scene_mass,
            Metric::Union => {
                let learned_only: f64 = learned
                    .keys()
                    .filter(|feature| !features.iter().any(|f| f.as_str() == **feature))
                    .map(|feature| self.feature_terms(feature).0)
                    .sum();
                scene_mass + learned_only
            }
        };
        let total = denominator + novelty;
        if total <= 0.0 {
            return 0.0;
        }
        (overlap + novelty) / total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nwg_core::learner::LevelParams;
    use serde_json::json;

    fn params(decay: f64) -> LearnerParams {
        let level = LevelParams {
            gamma: 1.0,
            k: 1.0,
            p: 0.5,
            decay,
            feature_weight: 1.0,
        };
        LearnerParams {
            novelty: 0.1,
            decay,
            alpha: 20.0,
            beta: 100.0,
            levels: [level; 4],
        }
    }

    fn scene(features: &[&str]) -> Scene {
        features.iter().map(|f| (*f, json!(1))).collect()
    }

    fn words() -> Vec<String> {
        vec!["fep".to_string()]
    }

    #[test]
    fn trained_features_score_higher() {
        let mut learner = PrototypeLearnerFactory
            .build(&params(0.5), &Taxonomy::default())
            .unwrap();
        let prior = learner.generalization_prob("fep", &scene(&["a", "b"]), ProbQuery::default(), SimTime::ZERO);
        learner.observe(&words(), &scene(&["a", "b"]), "./", SimTime::ZERO);
        let now = SimTime::new(1);
        let seen = learner.generalization_prob("fep", &scene(&["a", "b"]), ProbQuery::default(), now);
        let unseen = learner.generalization_prob("fep", &scene(&["c", "d"]), ProbQuery::default(), now);
        assert!(seen > unseen);
        assert!(seen > prior);
        assert_eq!(learner.exposures(), 1);
    }

    #[test]
    fn associations_decay_with_time() {
        let mut learner = PrototypeLearner::new(params(1.0), Taxonomy::default());
        learner.observe(&words(), &scene(&["a"]), "./", SimTime::ZERO);
        let early = learner.generalization_prob("fep", &scene(&["a"]), ProbQuery::default(), SimTime::new(1));
        let late = learner.generalization_prob("fep", &scene(&["a"]), ProbQuery::default(), SimTime::new(10));
        assert!(early > late);
    }

    #[test]
    fn union_penalises_unmatched_learned_features() {
        let mut learner = PrototypeLearner::new(params(0.0), Taxonomy::default());
        learner.observe(&words(), &scene(&["a", "b", "c"]), "./", SimTime::ZERO);
        let target = scene(&["a"]);
        let intersection = learner.generalization_prob("fep", &target, ProbQuery::default(), SimTime::ZERO);
        let union = learner.generalization_prob(
            "fep",
            &target,
            ProbQuery {
                metric: Some(Metric::Union),
                test_condition: None,
            },
            SimTime::ZERO,
        );
        assert!(union < intersection);
    }

    #[test]
    fn taxonomy_weights_features_by_level() {
        let mut taxonomy = Taxonomy::default();
        taxonomy.feature_to_group.insert("a".into(), "g-sub".into());
        taxonomy.group_to_level.insert("g-sub".into(), "subordinate".into());
        let mut weighted = params(0.0);
        weighted.levels[2].feature_weight = 3.0;
        let learner = PrototypeLearner::new(weighted, taxonomy);
        assert_eq!(learner.feature_terms("a").0, 3.0);
        assert_eq!(learner.feature_terms("z").0, 1.0);
    }
}
