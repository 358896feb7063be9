//! Contract for the simulated word learner and its hyperparameters.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::NwgError;
use crate::params::ExpandedCondition;
use crate::stimulus::{Scene, Taxonomy};

/// Simulated time on one trial's timeline.
///
/// Time is a plain value threaded through every exposure and query; learners
/// never own a mutable clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct SimTime(u64);

impl SimTime {
    /// The start of every timeline.
    pub const ZERO: SimTime = SimTime(0);

    /// Creates a time value from raw units.
    pub const fn new(units: u64) -> Self {
        Self(units)
    }

    /// Returns the raw number of elapsed units.
    pub const fn units(self) -> u64 {
        self.0
    }

    /// Returns the time `units` later.
    #[must_use]
    pub const fn advance(self, units: u64) -> Self {
        Self(self.0 + units)
    }

    /// Units elapsed since `earlier`, saturating at zero.
    pub const fn since(self, earlier: SimTime) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={}", self.0)
    }
}

/// Taxonomic level scoping per-level hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaxonomicLevel {
    /// Broadest categories (e.g. animal).
    Superordinate,
    /// Basic-level categories (e.g. dog).
    Basic,
    /// Subordinate categories (e.g. dalmatian).
    Subordinate,
    /// Individual objects.
    Instance,
}

impl TaxonomicLevel {
    /// All levels, broadest first.
    pub const ALL: [TaxonomicLevel; 4] = [
        TaxonomicLevel::Superordinate,
        TaxonomicLevel::Basic,
        TaxonomicLevel::Subordinate,
        TaxonomicLevel::Instance,
    ];

    /// Suffix used by configuration keys (`gamma-sup`, `k-basic`, ...).
    pub const fn key_suffix(self) -> &'static str {
        match self {
            TaxonomicLevel::Superordinate => "sup",
            TaxonomicLevel::Basic => "basic",
            TaxonomicLevel::Subordinate => "sub",
            TaxonomicLevel::Instance => "instance",
        }
    }

    /// Parses the level labels used in taxonomy files.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "superordinate" | "sup" | "super" => Some(TaxonomicLevel::Superordinate),
            "basic" | "basic-level" | "basic level" => Some(TaxonomicLevel::Basic),
            "subordinate" | "sub" | "subord" => Some(TaxonomicLevel::Subordinate),
            "instance" | "inst" => Some(TaxonomicLevel::Instance),
            _ => None,
        }
    }
}

/// Hyperparameters scoped to one taxonomic level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelParams {
    /// Smoothing weight.
    pub gamma: f64,
    /// Prior strength.
    pub k: f64,
    /// Prior probability mass.
    pub p: f64,
    /// Memory decay exponent.
    pub decay: f64,
    /// Relative weight of features at this level.
    pub feature_weight: f64,
}

/// Full hyperparameter bundle required to construct a learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerParams {
    /// Novelty parameter for unseen words and features.
    pub novelty: f64,
    /// Global decay rate.
    pub decay: f64,
    /// Association smoothing.
    pub alpha: f64,
    /// Expected feature count.
    pub beta: f64,
    /// Per-level parameters indexed in [`TaxonomicLevel::ALL`] order.
    pub levels: [LevelParams; 4],
}

impl LearnerParams {
    /// Reads every learner hyperparameter from a condition, verbatim.
    pub fn from_condition(condition: &ExpandedCondition) -> Result<Self, NwgError> {
        let level = |level: TaxonomicLevel| -> Result<LevelParams, NwgError> {
            let suffix = level.key_suffix();
            Ok(LevelParams {
                gamma: condition.f64(&format!("gamma-{suffix}"))?,
                k: condition.f64(&format!("k-{suffix}"))?,
                p: condition.f64(&format!("p-{suffix}"))?,
                decay: condition.f64(&format!("decay-{suffix}"))?,
                feature_weight: condition.f64(&format!("feature-weight-{suffix}"))?,
            })
        };
        Ok(Self {
            novelty: condition.f64("novelty")?,
            decay: condition.f64("decay")?,
            alpha: condition.f64("alpha")?,
            beta: condition.f64("beta")?,
            levels: [
                level(TaxonomicLevel::Superordinate)?,
                level(TaxonomicLevel::Basic)?,
                level(TaxonomicLevel::Subordinate)?,
                level(TaxonomicLevel::Instance)?,
            ],
        })
    }

    /// Parameters for one level.
    pub fn level(&self, level: TaxonomicLevel) -> &LevelParams {
        let idx = TaxonomicLevel::ALL
            .iter()
            .position(|candidate| *candidate == level)
            .unwrap_or(0);
        &self.levels[idx]
    }

    /// True when gamma, k, p, decay and feature weight agree across all four levels.
    pub fn is_undifferentiated(&self) -> bool {
        let first = self.levels[0];
        self.levels.iter().all(|level| *level == first)
    }
}

/// Scoring metric passed through to the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    /// Overlap between the scene and the learned meaning.
    Intersection,
    /// Overlap normalised by the union of scene and learned meaning.
    Union,
    /// Intersection scored relative to the learned prototype.
    IntersectionOverPrototype,
}

impl Metric {
    /// Canonical configuration spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Metric::Intersection => "intersection",
            Metric::Union => "union",
            Metric::IntersectionOverPrototype => "intersection-over-prototype",
        }
    }
}

impl FromStr for Metric {
    type Err = NwgError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "intersection" => Ok(Metric::Intersection),
            "union" => Ok(Metric::Union),
            "intersection-over-prototype" => Ok(Metric::IntersectionOverPrototype),
            other => Err(NwgError::invalid_parameter(
                "metric",
                format!("unknown metric `{other}`"),
            )),
        }
    }
}

/// Optional qualifiers for a generalization query.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProbQuery<'a> {
    /// Scoring metric; learners choose their own default when absent.
    pub metric: Option<Metric>,
    /// Name of the test condition being probed, if any.
    pub test_condition: Option<&'a str>,
}

/// A stateful simulated word learner.
///
/// Learners record exposures at explicit times and answer generalization
/// queries as of an explicit time. They never advance a clock themselves;
/// [`Learner::process_pair`] returns the next time on the caller's timeline.
pub trait Learner: Send {
    /// Records one exposure of `words` with `scene` at time `at`.
    fn observe(&mut self, words: &[String], scene: &Scene, context: &str, at: SimTime);

    /// Scores generalizing `word` to `scene` as of `now`. Must not mutate learned state.
    fn generalization_prob(
        &self,
        word: &str,
        scene: &Scene,
        query: ProbQuery<'_>,
        now: SimTime,
    ) -> f64;

    /// Records one training exposure and returns the time after it.
    ///
    /// Time advances by exactly one unit when `time_increment` is true and is
    /// unchanged otherwise.
    fn process_pair(
        &mut self,
        words: &[String],
        scene: &Scene,
        context: &str,
        now: SimTime,
        time_increment: bool,
    ) -> SimTime {
        self.observe(words, scene, context, now);
        if time_increment {
            now.advance(1)
        } else {
            now
        }
    }
}

/// Builds fresh learners; shared read-only across worker threads.
pub trait LearnerFactory: Send + Sync {
    /// Learner type produced by this factory.
    type Output: Learner;

    /// Constructs a pristine learner. Construction has no side effects.
    fn build(&self, params: &LearnerParams, taxonomy: &Taxonomy) -> Result<Self::Output, NwgError>;
}
