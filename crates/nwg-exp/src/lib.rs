#![doc = "Experiment orchestration for novel word generalization: expansion, simulation, filtering and export."]
#![deny(missing_docs)]

/// Closed vocabularies for string-valued options.
pub mod axes;
/// Section-based configuration parsing.
pub mod config;
/// Trial scheduling across a worker pool.
pub mod dispatch;
/// Cartesian expansion of parameter specifications.
pub mod expand;
/// Artefact writers.
pub mod export;
/// Acceptance predicates over experiment results.
pub mod filters;
/// Canonical hashing helpers.
pub mod hash;
/// Reference exposure-memory learner.
pub mod learner;
mod plot;
/// Per-trial outcomes and the run report.
pub mod report;
/// Canonical JSON serde helpers.
pub mod serde;
/// Temporal trial protocol.
pub mod simulate;
/// Stimulus document loading.
pub mod stimuli;

pub use axes::{CompareToPrior, FeatureSpace, LearnerType, Spacing, TrialSettings, ZeroDenominatorPolicy};
pub use config::{load_config, parse_config, parse_value};
pub use dispatch::{run_conditions, run_trial, shuffle_conditions, RunOpts};
pub use expand::{expand, expanded_len};
pub use export::{artifact_title, sanitize, Exporter, FsExporter, OUTPUT_PATH_KEY};
pub use filters::{is_close, AcceptanceSpec, FilterDecision};
pub use learner::{PrototypeLearner, PrototypeLearnerFactory};
pub use report::{write_run_report, RunReport, TrialOutcome, TrialReport, TrialState};
pub use simulate::{simulate_condition, SkipReason, Simulation, TrialSimulator};
pub use stimuli::Stimuli;
