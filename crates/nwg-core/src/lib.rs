#![deny(missing_docs)]
#![doc = "Core data types and the learner contract for novel word generalization experiments."]

pub mod errors;
pub mod learner;
pub mod params;
pub mod rng;
pub mod stimulus;

pub use errors::{ErrorInfo, NwgError};
pub use learner::{
    Learner, LearnerFactory, LearnerParams, LevelParams, Metric, ProbQuery, SimTime,
    TaxonomicLevel,
};
pub use params::{ExpandedCondition, ParamValue, ParameterSpec, Scalar, MODE_KEY, SINGLE_TRIAL};
pub use rng::{derive_substream_seed, RngHandle, SHUFFLE_SUBSTREAM};
pub use stimulus::{ExperimentResult, Scene, Taxonomy, TestSets, TrainingSets, TrialResult};
