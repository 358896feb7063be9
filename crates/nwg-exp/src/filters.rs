use nwg_core::errors::{ErrorInfo, NwgError};
use nwg_core::params::ExpandedCondition;
use nwg_core::stimulus::ExperimentResult;
use serde::{Deserialize, Serialize};

/// Canonical training condition: a single example.
pub const ONE_EXAMPLE: &str = "one example";
/// Canonical training condition: three subordinate examples.
pub const THREE_SUBORDINATE: &str = "three subordinate examples";
/// Canonical training condition: three basic-level examples.
pub const THREE_BASIC: &str = "three basic-level examples";
/// Canonical training condition: three superordinate examples.
pub const THREE_SUPERORDINATE: &str = "three superordinate examples";

/// Test category: subordinate matches.
pub const SUBORDINATE_MATCHES: &str = "subordinate matches";
/// Test category: basic-level matches.
pub const BASIC_MATCHES: &str = "basic-level matches";
/// Test category: superordinate matches.
pub const SUPERORDINATE_MATCHES: &str = "superordinate matches";

/// Option enabling the bounds predicate.
pub const CHECK_BOUNDS_KEY: &str = "check-xt-condition";
/// Option enabling the reversal predicate.
pub const CHECK_REVERSAL_KEY: &str = "check-spencer-condition";

/// Absolute tolerance of [`is_close_default`].
pub const DEFAULT_ATOL: f64 = 0.2;
/// Relative tolerance of [`is_close_default`].
pub const DEFAULT_RTOL: f64 = 0.0;

/// Target ratio of basic-level proportions, three subordinate over one example.
pub const REVERSAL_PROPORTION_RATIO: f64 = 1.3;
/// Lower bound (exclusive) on the one-example subordinate-to-basic ratio.
pub const REVERSAL_SUB_BASIC_MIN: f64 = 2.0;

/// Training condition and the option names of its two bounds targets.
const BOUNDS_TABLE: [(&str, &str, &str); 4] = [
    (
        ONE_EXAMPLE,
        "one-ex-basic-sub-ratio",
        "one-ex-sup-sub-ratio",
    ),
    (
        THREE_SUBORDINATE,
        "three-subord-basic-sub-ratio",
        "three-subord-sup-sub-ratio",
    ),
    (
        THREE_BASIC,
        "three-basic-basic-sub-ratio",
        "three-basic-sup-sub-ratio",
    ),
    (
        THREE_SUPERORDINATE,
        "three-super-basic-sub-ratio",
        "three-super-sup-sub-ratio",
    ),
];

/// Returns true iff `|x - y| <= atol + rtol * y`.
pub fn is_close(x: f64, y: f64, atol: f64, rtol: f64) -> bool {
    (x - y).abs() <= atol + rtol * y
}

/// [`is_close`] with the default tolerances.
pub fn is_close_default(x: f64, y: f64) -> bool {
    is_close(x, y, DEFAULT_ATOL, DEFAULT_RTOL)
}

/// Mean match values of one training condition per taxonomic category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryMeans {
    /// Mean over subordinate matches.
    pub sub: f64,
    /// Mean over basic-level matches.
    pub basic: f64,
    /// Mean over superordinate matches.
    pub sup: f64,
}

impl CategoryMeans {
    /// Reads the three category means for `training` from a result.
    pub fn from_result(result: &ExperimentResult, training: &str) -> Result<Self, NwgError> {
        let mean = |category: &str| {
            result
                .mean(training, category)
                .ok_or_else(|| missing_category(training, category))
        };
        Ok(Self {
            sub: mean(SUBORDINATE_MATCHES)?,
            basic: mean(BASIC_MATCHES)?,
            sup: mean(SUPERORDINATE_MATCHES)?,
        })
    }

    /// `basic / sub`.
    pub fn basic_sub_ratio(&self) -> f64 {
        self.basic / self.sub
    }

    /// `sup / sub`.
    pub fn sup_sub_ratio(&self) -> f64 {
        self.sup / self.sub
    }

    /// Basic-level share of the summed category means.
    pub fn basic_proportion(&self) -> f64 {
        self.basic / (self.sub + self.basic + self.sup)
    }
}

fn missing_category(training: &str, category: &str) -> NwgError {
    NwgError::Stimuli(
        ErrorInfo::new("missing-condition", "result lacks a condition required by a filter")
            .with_context("training_condition", training)
            .with_context("test_condition", category),
    )
}

/// Target basic/sub and sup/sub ratios for one training condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioTarget {
    /// Canonical training condition the targets apply to.
    pub training_condition: String,
    /// Expected basic/sub ratio.
    pub basic_sub: f64,
    /// Expected sup/sub ratio.
    pub sup_sub: f64,
}

/// Bounds predicate: every canonical condition's ratios sit near their targets.
pub fn bounds_predicate(result: &ExperimentResult, targets: &[RatioTarget]) -> Result<bool, NwgError> {
    for target in targets {
        let means = CategoryMeans::from_result(result, &target.training_condition)?;
        if !is_close_default(means.basic_sub_ratio(), target.basic_sub)
            || !is_close_default(means.sup_sub_ratio(), target.sup_sub)
        {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Reversal predicate on the one-example and three-subordinate conditions.
pub fn reversal_predicate(result: &ExperimentResult) -> Result<bool, NwgError> {
    let one_ex = CategoryMeans::from_result(result, ONE_EXAMPLE)?;
    let three_sub = CategoryMeans::from_result(result, THREE_SUBORDINATE)?;
    let proportion_ratio = three_sub.basic_proportion() / one_ex.basic_proportion();
    let sub_basic = one_ex.sub / one_ex.basic;
    Ok(is_close_default(proportion_ratio, REVERSAL_PROPORTION_RATIO)
        && sub_basic > REVERSAL_SUB_BASIC_MIN)
}

/// Which acceptance predicates a condition requires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AcceptanceSpec {
    /// Targets of the bounds predicate; `None` when it is not required.
    pub bounds: Option<Vec<RatioTarget>>,
    /// Whether the reversal predicate is required.
    pub reversal: bool,
}

impl AcceptanceSpec {
    /// Reads the predicate switches and, when needed, the eight bounds targets.
    pub fn from_condition(condition: &ExpandedCondition) -> Result<Self, NwgError> {
        let bounds = if condition.bool_or(CHECK_BOUNDS_KEY, false)? {
            let targets = BOUNDS_TABLE
                .iter()
                .map(|(training, basic_key, sup_key)| {
                    Ok(RatioTarget {
                        training_condition: (*training).to_string(),
                        basic_sub: condition.f64(basic_key)?,
                        sup_sub: condition.f64(sup_key)?,
                    })
                })
                .collect::<Result<Vec<_>, NwgError>>()?;
            Some(targets)
        } else {
            None
        };
        Ok(Self {
            bounds,
            reversal: condition.bool_or(CHECK_REVERSAL_KEY, false)?,
        })
    }

    /// Evaluates the required predicates against a completed result.
    pub fn evaluate(&self, result: &ExperimentResult) -> Result<FilterDecision, NwgError> {
        let bounds = match &self.bounds {
            Some(targets) => Some(bounds_predicate(result, targets)?),
            None => None,
        };
        let reversal = if self.reversal {
            Some(reversal_predicate(result)?)
        } else {
            None
        };
        Ok(FilterDecision { bounds, reversal })
    }
}

/// Outcome of the acceptance predicates; `None` marks a predicate not required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FilterDecision {
    /// Bounds predicate result.
    pub bounds: Option<bool>,
    /// Reversal predicate result.
    pub reversal: Option<bool>,
}

impl FilterDecision {
    /// True when no predicate is required, or any required predicate holds.
    pub fn passes(&self) -> bool {
        match (self.bounds, self.reversal) {
            (None, None) => true,
            (bounds, reversal) => bounds == Some(true) || reversal == Some(true),
        }
    }
}
