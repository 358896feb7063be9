//! Closed vocabularies for the string-valued experiment axes.

use std::fmt::{self, Display};
use std::path::PathBuf;
use std::str::FromStr;

use nwg_core::errors::{ErrorInfo, NwgError};
use nwg_core::learner::Metric;
use nwg_core::params::ExpandedCondition;
use serde::{Deserialize, Serialize};

/// Stimulus feature space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureSpace {
    /// `simple`
    Simple,
    /// `grid_simple`
    GridSimple,
    /// `simple_with_dominance`
    SimpleWithDominance,
    /// `clothing`
    Clothing,
    /// `containers`
    Containers,
    /// `seats`
    Seats,
    /// `xt-animals`, read from `xt_animals/`.
    XtAnimals,
    /// `xt-vegetables`, read from `xt_vegetables/`.
    XtVegetables,
    /// `xt-vehicles`, read from `xt_vehicles/`.
    XtVehicles,
}

impl FeatureSpace {
    /// Every feature space, in declaration order.
    pub const ALL: [FeatureSpace; 9] = [
        FeatureSpace::Simple,
        FeatureSpace::GridSimple,
        FeatureSpace::SimpleWithDominance,
        FeatureSpace::Clothing,
        FeatureSpace::Containers,
        FeatureSpace::Seats,
        FeatureSpace::XtAnimals,
        FeatureSpace::XtVegetables,
        FeatureSpace::XtVehicles,
    ];

    /// Identifier used in configuration files.
    pub const fn as_str(self) -> &'static str {
        match self {
            FeatureSpace::Simple => "simple",
            FeatureSpace::GridSimple => "grid_simple",
            FeatureSpace::SimpleWithDominance => "simple_with_dominance",
            FeatureSpace::Clothing => "clothing",
            FeatureSpace::Containers => "containers",
            FeatureSpace::Seats => "seats",
            FeatureSpace::XtAnimals => "xt-animals",
            FeatureSpace::XtVegetables => "xt-vegetables",
            FeatureSpace::XtVehicles => "xt-vehicles",
        }
    }

    /// Data subdirectory holding this space's stimulus documents.
    pub const fn directory(self) -> &'static str {
        match self {
            FeatureSpace::XtAnimals => "xt_animals",
            FeatureSpace::XtVegetables => "xt_vegetables",
            FeatureSpace::XtVehicles => "xt_vehicles",
            other => other.as_str(),
        }
    }
}

impl FromStr for FeatureSpace {
    type Err = NwgError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        FeatureSpace::ALL
            .into_iter()
            .find(|space| space.as_str() == value)
            .ok_or_else(|| {
                NwgError::InvalidParameter(
                    ErrorInfo::new("feature-space", "undefined feature space")
                        .with_context("key", "feature-space")
                        .with_context("value", value),
                )
            })
    }
}

impl Display for FeatureSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Temporal distribution of training exposures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Spacing {
    /// All exposures share one instant.
    Simultaneous,
    /// One unit per exposure plus `delay` extra units after each.
    Sequential {
        /// Extra units after each exposure.
        delay: u64,
    },
}

impl Spacing {
    /// Whether each exposure consumes its own time step.
    pub const fn increments_per_exposure(self) -> bool {
        matches!(self, Spacing::Sequential { .. })
    }

    /// Extra units inserted after every exposure.
    pub const fn inter_exposure_delay(self) -> u64 {
        match self {
            Spacing::Simultaneous => 0,
            Spacing::Sequential { delay } => delay,
        }
    }

    /// Units consumed once all exposures are done.
    pub const fn closing_step(self) -> u64 {
        match self {
            Spacing::Simultaneous => 1,
            Spacing::Sequential { .. } => 0,
        }
    }
}

impl FromStr for Spacing {
    type Err = NwgError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            NwgError::InvalidParameter(
                ErrorInfo::new("spacing-condition", "unknown spacing condition")
                    .with_context("key", "spacing-condition")
                    .with_context("value", value)
                    .with_hint("use `simultaneous` or `sequential-N`"),
            )
        };
        match value {
            "simultaneous" => Ok(Spacing::Simultaneous),
            "sequential" => Ok(Spacing::Sequential { delay: 0 }),
            other => {
                let delay = other.strip_prefix("sequential-").ok_or_else(invalid)?;
                let delay = delay.parse::<u64>().map_err(|_| invalid())?;
                Ok(Spacing::Sequential { delay })
            }
        }
    }
}

impl Display for Spacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Spacing::Simultaneous => f.write_str("simultaneous"),
            Spacing::Sequential { delay } => write!(f, "sequential-{delay}"),
        }
    }
}

/// Transform contrasting a measured probability with the untrained prior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareToPrior {
    /// Raw probability.
    None,
    /// `value - prior`.
    Difference,
    /// `1 - prior / value`.
    Ratio,
}

impl CompareToPrior {
    /// Parses the configured mode; `None` when the option is absent or `None`.
    pub fn from_option(value: Option<&str>) -> Result<Self, NwgError> {
        match value {
            None | Some("none") | Some("None") => Ok(CompareToPrior::None),
            Some("difference") => Ok(CompareToPrior::Difference),
            Some("ratio") => Ok(CompareToPrior::Ratio),
            Some(other) => Err(NwgError::Unimplemented(
                ErrorInfo::new("compare-to-prior", "comparison-to-prior mode not implemented")
                    .with_context("key", "compare-to-prior")
                    .with_context("value", other),
            )),
        }
    }
}

/// Learner role; the combined role requires undifferentiated level parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LearnerType {
    /// Single undifferentiated taxonomy (`child`).
    Combined,
    /// Level-specific parameters allowed (`adult`).
    Differentiated,
}

impl FromStr for LearnerType {
    type Err = NwgError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "child" => Ok(LearnerType::Combined),
            "adult" => Ok(LearnerType::Differentiated),
            other => Err(NwgError::invalid_parameter(
                "learner-type",
                format!("unknown learner type `{other}`"),
            )),
        }
    }
}

/// What to do when a ratio or normalisation hits a zero denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ZeroDenominatorPolicy {
    /// Keep the untransformed value and log a warning.
    #[default]
    KeepRaw,
    /// Abandon the trial without output.
    Skip,
    /// Fail the trial with a numeric error.
    Fail,
}

impl FromStr for ZeroDenominatorPolicy {
    type Err = NwgError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "keep-raw" => Ok(ZeroDenominatorPolicy::KeepRaw),
            "skip" => Ok(ZeroDenominatorPolicy::Skip),
            "fail" => Ok(ZeroDenominatorPolicy::Fail),
            other => Err(NwgError::invalid_parameter(
                "zero-denominator",
                format!("unknown zero-denominator policy `{other}`"),
            )),
        }
    }
}

/// Experiment-level settings read from one condition.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSettings {
    /// Novel word taught and probed.
    pub word: String,
    /// Stimulus set the trial reads.
    pub feature_space: FeatureSpace,
    /// Root holding one directory per feature space.
    pub data_path: PathBuf,
    /// Similarity metric forwarded with test queries; `None` lets the learner choose.
    pub metric: Option<Metric>,
    /// Transform applied against the unseen-object prior.
    pub compare_to_prior: CompareToPrior,
    /// Exposure spacing during training.
    pub spacing: Spacing,
    /// Units between the end of training and the test probes.
    pub test_delay: u64,
    /// Learner role; the combined role gates on uniform level parameters.
    pub learner_type: LearnerType,
    /// What to do when a ratio or normalisation divides by zero.
    pub zero_denominator: ZeroDenominatorPolicy,
}

impl TrialSettings {
    /// Parses and validates the experiment-level options of a condition.
    pub fn from_condition(condition: &ExpandedCondition) -> Result<Self, NwgError> {
        Ok(Self {
            word: condition.str("word")?.to_string(),
            feature_space: condition.str("feature-space")?.parse()?,
            data_path: PathBuf::from(condition.str("data-path")?),
            metric: condition
                .optional_str("metric")?
                .map(str::parse::<Metric>)
                .transpose()?,
            compare_to_prior: CompareToPrior::from_option(
                condition.optional_str("compare-to-prior")?,
            )?,
            spacing: condition.str("spacing-condition")?.parse()?,
            test_delay: condition.u64("test-delay")?,
            learner_type: match condition.optional_str("learner-type")? {
                Some(value) => value.parse()?,
                None => LearnerType::Differentiated,
            },
            zero_denominator: condition
                .optional_str("zero-denominator")?
                .map(str::parse::<ZeroDenominatorPolicy>)
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spacing_vocabulary() {
        assert_eq!("simultaneous".parse::<Spacing>().unwrap(), Spacing::Simultaneous);
        assert_eq!(
            "sequential-5".parse::<Spacing>().unwrap(),
            Spacing::Sequential { delay: 5 }
        );
        assert_eq!(
            "sequential".parse::<Spacing>().unwrap(),
            Spacing::Sequential { delay: 0 }
        );
        assert!("sequental-5".parse::<Spacing>().is_err());
        assert!("sequential-x".parse::<Spacing>().is_err());
        assert_eq!(Spacing::Sequential { delay: 5 }.to_string(), "sequential-5");
    }

    #[test]
    fn feature_space_vocabulary() {
        for space in FeatureSpace::ALL {
            assert_eq!(space.as_str().parse::<FeatureSpace>().unwrap(), space);
        }
        assert_eq!(FeatureSpace::XtAnimals.directory(), "xt_animals");
        let err = "shapes".parse::<FeatureSpace>().unwrap_err();
        assert!(matches!(err, NwgError::InvalidParameter(_)));
    }

    #[test]
    fn unknown_prior_mode_is_unimplemented() {
        assert_eq!(CompareToPrior::from_option(None).unwrap(), CompareToPrior::None);
        assert_eq!(
            CompareToPrior::from_option(Some("ratio")).unwrap(),
            CompareToPrior::Ratio
        );
        let err = CompareToPrior::from_option(Some("log-odds")).unwrap_err();
        assert!(matches!(err, NwgError::Unimplemented(_)));
    }
}
