//! Stimulus and result containers exchanged between the simulator and its collaborators.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque feature description of one object: feature identifier to value.
///
/// The orchestrator never inspects scene contents; they are forwarded to the
/// learner unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Scene(pub IndexMap<String, Value>);

impl Scene {
    /// Iterates over `(feature, value)` pairs in declaration order.
    pub fn features(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Number of features in the scene.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the scene has no features.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Scene {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Scene(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Training condition name to ordered trial label to scene.
pub type TrainingSets = IndexMap<String, IndexMap<String, Scene>>;

/// Test condition name to object label to scene.
pub type TestSets = IndexMap<String, IndexMap<String, Scene>>;

/// Feature taxonomy consumed by learners: feature to group, group to level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Taxonomy {
    /// Feature identifier to feature group.
    pub feature_to_group: IndexMap<String, String>,
    /// Feature group to taxonomic level label.
    pub group_to_level: IndexMap<String, String>,
}

impl Taxonomy {
    /// Resolves the level label for a feature, if both hops are known.
    pub fn level_of(&self, feature: &str) -> Option<&str> {
        let group = self.feature_to_group.get(feature)?;
        self.group_to_level.get(group).map(String::as_str)
    }
}

/// Test condition name to one generalization value per test object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct TrialResult(pub IndexMap<String, Vec<f64>>);

impl TrialResult {
    /// Returns the values recorded for a test condition.
    pub fn values(&self, test_condition: &str) -> Option<&[f64]> {
        self.0.get(test_condition).map(Vec::as_slice)
    }

    /// Arithmetic mean of a test condition's values.
    pub fn mean(&self, test_condition: &str) -> Option<f64> {
        self.values(test_condition).and_then(mean)
    }

    /// Population standard deviation of a test condition's values.
    pub fn std(&self, test_condition: &str) -> Option<f64> {
        let values = self.values(test_condition)?;
        let mu = mean(values)?;
        let var = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64;
        Some(var.sqrt())
    }
}

/// Training condition name to its [`TrialResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ExperimentResult(pub IndexMap<String, TrialResult>);

impl ExperimentResult {
    /// Returns the result block for a training condition.
    pub fn condition(&self, training_condition: &str) -> Option<&TrialResult> {
        self.0.get(training_condition)
    }

    /// Mean value for a `(training, test)` pair.
    pub fn mean(&self, training_condition: &str, test_condition: &str) -> Option<f64> {
        self.condition(training_condition)?.mean(test_condition)
    }

    /// Iterates over training conditions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TrialResult)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trial_result_statistics() {
        let mut result = TrialResult::default();
        result.0.insert("subordinate matches".into(), vec![1.0, 3.0]);
        result.0.insert("empty".into(), vec![]);
        assert_eq!(result.mean("subordinate matches"), Some(2.0));
        assert_eq!(result.std("subordinate matches"), Some(1.0));
        assert_eq!(result.mean("empty"), None);
        assert_eq!(result.mean("absent"), None);
    }

    #[test]
    fn taxonomy_resolves_two_hops() {
        let mut taxonomy = Taxonomy::default();
        taxonomy.feature_to_group.insert("f1".into(), "g1".into());
        taxonomy.group_to_level.insert("g1".into(), "basic-level".into());
        assert_eq!(taxonomy.level_of("f1"), Some("basic-level"));
        assert_eq!(taxonomy.level_of("f2"), None);
    }
}
