#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use nwg_core::errors::NwgError;
use nwg_core::learner::{
    Learner, LearnerFactory, LearnerParams, LevelParams, Metric, ProbQuery, SimTime,
};
use nwg_core::params::{ExpandedCondition, ParameterSpec, Scalar};
use nwg_core::stimulus::{Scene, Taxonomy};
use nwg_exp::axes::{CompareToPrior, FeatureSpace, LearnerType, Spacing, TrialSettings, ZeroDenominatorPolicy};
use nwg_exp::stimuli::{Stimuli, FEATURE_TO_GROUP_FILE, GROUP_TO_LEVEL_FILE, STIMULI_FILE};
use serde_json::json;

pub const TRAINING: [(&str, usize); 4] = [
    ("one example", 1),
    ("three subordinate examples", 3),
    ("three basic-level examples", 3),
    ("three superordinate examples", 3),
];
pub const TESTS: [&str; 3] = [
    "subordinate matches",
    "basic-level matches",
    "superordinate matches",
];

pub fn scene(features: &[&str]) -> Scene {
    features.iter().map(|f| (*f, json!(1))).collect()
}

/// Stimuli with the canonical training conditions, two objects per test category.
pub fn stimuli() -> Stimuli {
    let mut training_sets = IndexMap::new();
    for (name, count) in TRAINING {
        let trials: IndexMap<String, Scene> = (0..count)
            .map(|i| {
                let breed = format!("dalmatian-{i}");
                (format!("trial {i}"), scene(&["animal", "dog", breed.as_str()]))
            })
            .collect();
        training_sets.insert(name.to_string(), trials);
    }
    let mut test_sets = IndexMap::new();
    for (test, features) in TESTS.iter().zip([
        vec!["animal", "dog", "dalmatian-0"],
        vec!["animal", "dog", "terrier"],
        vec!["animal", "cat"],
    ]) {
        let objects: IndexMap<String, Scene> = (0..2)
            .map(|i| (format!("object {i}"), scene(&features)))
            .collect();
        test_sets.insert(test.to_string(), objects);
    }
    let mut taxonomy = Taxonomy::default();
    for (feature, group, level) in [
        ("animal", "kingdom", "superordinate"),
        ("dog", "species", "basic-level"),
        ("cat", "species", "basic-level"),
        ("terrier", "breed", "subordinate"),
        ("dalmatian-0", "breed", "subordinate"),
    ] {
        taxonomy.feature_to_group.insert(feature.into(), group.into());
        taxonomy.group_to_level.insert(group.into(), level.into());
    }
    Stimuli {
        training_sets,
        test_sets,
        unseen_object: scene(&["rock"]),
        taxonomy,
    }
}

/// Writes [`stimuli`] in the on-disk layout for `space` under `data_path`.
pub fn write_stimuli(data_path: &Path, space: FeatureSpace) {
    let stimuli = stimuli();
    let dir = Stimuli::directory(data_path, space);
    fs::create_dir_all(&dir).expect("stimuli dir");
    let document = json!({
        "training set": stimuli.training_sets,
        "test set": stimuli.test_sets,
        "unseen object features": stimuli.unseen_object,
    });
    fs::write(dir.join(STIMULI_FILE), document.to_string()).expect("stimuli");
    fs::write(
        dir.join(FEATURE_TO_GROUP_FILE),
        serde_json::to_string(&stimuli.taxonomy.feature_to_group).expect("encode"),
    )
    .expect("feature map");
    fs::write(
        dir.join(GROUP_TO_LEVEL_FILE),
        serde_json::to_string(&stimuli.taxonomy.group_to_level).expect("encode"),
    )
    .expect("level map");
}

pub fn params() -> LearnerParams {
    let level = LevelParams {
        gamma: 0.5,
        k: 1.0,
        p: 0.5,
        decay: 0.5,
        feature_weight: 1.0,
    };
    LearnerParams {
        novelty: 0.1,
        decay: 0.5,
        alpha: 20.0,
        beta: 100.0,
        levels: [level; 4],
    }
}

pub fn settings(spacing: Spacing, test_delay: u64) -> TrialSettings {
    TrialSettings {
        word: "fep".into(),
        feature_space: FeatureSpace::Simple,
        data_path: "unused".into(),
        metric: Some(Metric::Intersection),
        compare_to_prior: CompareToPrior::None,
        spacing,
        test_delay,
        learner_type: LearnerType::Differentiated,
        zero_denominator: ZeroDenominatorPolicy::KeepRaw,
    }
}

/// A complete single experiment block reading stimuli from `data_path`.
pub fn block(name: &str, data_path: &Path, output_path: &Path) -> ParameterSpec {
    let mut spec = ParameterSpec::new(name)
        .with("word", Scalar::Str("fep".into()))
        .with("feature-space", Scalar::Str("simple".into()))
        .with("data-path", Scalar::Str(data_path.display().to_string()))
        .with("output-path", Scalar::Str(output_path.display().to_string()))
        .with("metric", Scalar::Str("intersection".into()))
        .with("compare-to-prior", Scalar::Null)
        .with("spacing-condition", Scalar::Str("simultaneous".into()))
        .with("test-delay", Scalar::Int(0))
        .with("learner-type", Scalar::Str("adult".into()))
        .with("novelty", Scalar::Float(0.1))
        .with("decay", Scalar::Float(0.5))
        .with("alpha", Scalar::Int(20))
        .with("beta", Scalar::Int(100))
        .with("check-xt-condition", Scalar::Bool(false))
        .with("check-spencer-condition", Scalar::Bool(false));
    for suffix in ["sup", "basic", "sub", "instance"] {
        spec = spec
            .with(format!("gamma-{suffix}"), Scalar::Float(0.5))
            .with(format!("k-{suffix}"), Scalar::Float(1.0))
            .with(format!("p-{suffix}"), Scalar::Float(0.5))
            .with(format!("decay-{suffix}"), Scalar::Float(0.5))
            .with(format!("feature-weight-{suffix}"), Scalar::Float(1.0));
    }
    spec
}

pub fn condition(name: &str, data_path: &Path, output_path: &Path) -> ExpandedCondition {
    ExpandedCondition::from_spec(block(name, data_path, output_path))
}

/// One call seen by a [`RecordingLearner`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Built,
    Observed(SimTime),
    Queried {
        now: SimTime,
        metric: Option<Metric>,
        test_condition: Option<String>,
    },
}

/// Fixed answers returned by a [`RecordingLearner`].
#[derive(Debug, Clone, Copy)]
pub struct Answers {
    /// Queries without a metric (the untrained prior).
    pub prior: f64,
    /// Queries with a metric but no test condition (prototype references).
    pub reference: f64,
    /// Queries naming a test condition.
    pub test: f64,
}

impl Default for Answers {
    fn default() -> Self {
        Self {
            prior: 0.1,
            reference: 0.5,
            test: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingFactory {
    pub events: Arc<Mutex<Vec<Event>>>,
    pub answers: Answers,
}

impl RecordingFactory {
    pub fn with_answers(answers: Answers) -> Self {
        Self {
            answers,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("events").clone()
    }

    pub fn query_times(&self) -> Vec<SimTime> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Queried {
                    now,
                    test_condition: Some(_),
                    ..
                } => Some(now),
                _ => None,
            })
            .collect()
    }

    pub fn observe_times(&self) -> Vec<SimTime> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Observed(at) => Some(at),
                _ => None,
            })
            .collect()
    }

    pub fn builds(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, Event::Built))
            .count()
    }
}

pub struct RecordingLearner {
    events: Arc<Mutex<Vec<Event>>>,
    answers: Answers,
}

impl LearnerFactory for RecordingFactory {
    type Output = RecordingLearner;

    fn build(&self, _params: &LearnerParams, _taxonomy: &Taxonomy) -> Result<Self::Output, NwgError> {
        self.events.lock().expect("events").push(Event::Built);
        Ok(RecordingLearner {
            events: Arc::clone(&self.events),
            answers: self.answers,
        })
    }
}

impl Learner for RecordingLearner {
    fn observe(&mut self, _words: &[String], _scene: &Scene, _context: &str, at: SimTime) {
        self.events.lock().expect("events").push(Event::Observed(at));
    }

    fn generalization_prob(&self, _word: &str, _scene: &Scene, query: ProbQuery<'_>, now: SimTime) -> f64 {
        self.events.lock().expect("events").push(Event::Queried {
            now,
            metric: query.metric,
            test_condition: query.test_condition.map(str::to_string),
        });
        match (query.metric, query.test_condition) {
            (_, Some(_)) => self.answers.test,
            (Some(_), None) => self.answers.reference,
            (None, None) => self.answers.prior,
        }
    }
}
