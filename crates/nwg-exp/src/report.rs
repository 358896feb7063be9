use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use nwg_core::errors::{ErrorInfo, NwgError};
use nwg_core::params::ExpandedCondition;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::filters::FilterDecision;
use crate::hash::stable_hash_string;
use crate::serde::{from_json_slice, to_canonical_json_bytes};
use crate::simulate::SkipReason;

/// File name of the persisted run report.
pub const RUN_REPORT_FILE: &str = "run_report.json";

fn io_error(code: &str, err: impl ToString) -> NwgError {
    NwgError::Io(ErrorInfo::new(code, err.to_string()))
}

/// Report hashes are informational: a failed encoding is logged and leaves the hash empty.
fn hash_or_empty<T: Serialize>(value: &T, subject: &str) -> String {
    stable_hash_string(value, subject).unwrap_or_else(|err| {
        warn!(subject, %err, "hash unavailable; recording an empty hash");
        String::new()
    })
}

/// State enumeration for a single trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrialState {
    /// Exported.
    Accepted,
    /// Filtered out.
    Rejected,
    /// No result produced.
    Skipped,
    /// Raised an error.
    Failed,
}

/// What happened to one expanded condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum TrialOutcome {
    /// Filters passed and artefacts were written.
    Accepted {
        /// Predicate results.
        filters: FilterDecision,
    },
    /// Simulation completed but the configured filters rejected the result.
    Rejected {
        /// Predicate results.
        filters: FilterDecision,
    },
    /// The trial produced no result.
    Skipped {
        /// Why no result was produced.
        reason: SkipReason,
    },
    /// The trial raised an error; siblings are unaffected.
    Failed {
        /// The error that ended the trial.
        error: NwgError,
    },
}

impl TrialOutcome {
    /// The outcome's state without its payload.
    pub fn state(&self) -> TrialState {
        match self {
            TrialOutcome::Accepted { .. } => TrialState::Accepted,
            TrialOutcome::Rejected { .. } => TrialState::Rejected,
            TrialOutcome::Skipped { .. } => TrialState::Skipped,
            TrialOutcome::Failed { .. } => TrialState::Failed,
        }
    }
}

/// Report entry for one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialReport {
    /// Position in the scheduled (post-shuffle) order.
    pub index: usize,
    /// Experiment block the condition came from.
    pub experiment: String,
    /// Canonical hash of the condition's options.
    pub condition_hash: String,
    /// What happened to the trial.
    pub outcome: TrialOutcome,
}

impl TrialReport {
    /// Entry for `condition` at scheduled position `index`.
    pub fn new(index: usize, condition: &ExpandedCondition, outcome: TrialOutcome) -> Self {
        Self {
            index,
            experiment: condition.name.clone(),
            condition_hash: hash_or_empty(&condition.options, "condition"),
            outcome,
        }
    }
}

/// Number of trials in each state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OutcomeCounts {
    /// Trials exported.
    pub accepted: usize,
    /// Trials filtered out.
    pub rejected: usize,
    /// Trials without a result.
    pub skipped: usize,
    /// Trials that raised an error.
    pub failed: usize,
}

impl OutcomeCounts {
    /// Tallies the states of `trials`.
    pub fn from_trials(trials: &[TrialReport]) -> Self {
        let mut counts = Self::default();
        for trial in trials {
            match trial.outcome.state() {
                TrialState::Accepted => counts.accepted += 1,
                TrialState::Rejected => counts.rejected += 1,
                TrialState::Skipped => counts.skipped += 1,
                TrialState::Failed => counts.failed += 1,
            }
        }
        counts
    }

    /// Number of trials counted.
    pub fn total(&self) -> usize {
        self.accepted + self.rejected + self.skipped + self.failed
    }
}

/// Aggregate report of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Hash over every scheduled condition, in scheduled order.
    pub conditions_hash: String,
    /// Shuffle seed, when one was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Worker threads used.
    pub workers: usize,
    /// Trials per state.
    pub counts: OutcomeCounts,
    /// One entry per trial, in scheduled order.
    pub trials: Vec<TrialReport>,
    /// Version of the crate that produced the report.
    pub tool_version: String,
    /// RFC 3339 creation time.
    pub created_at: String,
}

impl RunReport {
    /// Assembles a report from trial entries already in scheduled order.
    pub fn new(trials: Vec<TrialReport>, seed: Option<u64>, workers: usize) -> Self {
        let hashes: Vec<&String> = trials.iter().map(|trial| &trial.condition_hash).collect();
        let conditions_hash = if hashes.is_empty() {
            String::new()
        } else {
            hash_or_empty(&hashes, "run conditions")
        };
        Self {
            conditions_hash,
            seed,
            workers,
            counts: OutcomeCounts::from_trials(&trials),
            trials,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: Utc::now().to_rfc3339(),
        }
    }

    /// Trials that failed, in scheduled order.
    pub fn failures(&self) -> impl Iterator<Item = &TrialReport> {
        self.trials
            .iter()
            .filter(|trial| trial.outcome.state() == TrialState::Failed)
    }
}

/// Writes `run_report.json` into `root` as canonical JSON.
pub fn write_run_report(root: &Path, report: &RunReport) -> Result<PathBuf, NwgError> {
    fs::create_dir_all(root).map_err(|err| io_error("report-dir", err))?;
    let path = root.join(RUN_REPORT_FILE);
    let bytes = to_canonical_json_bytes(report, "run report")?;
    fs::write(&path, bytes).map_err(|err| io_error("report-write", err))?;
    Ok(path)
}

/// Reads a report previously written by [`write_run_report`].
pub fn load_run_report(root: &Path) -> Result<RunReport, NwgError> {
    let bytes = fs::read(root.join(RUN_REPORT_FILE)).map_err(|err| io_error("report-read", err))?;
    from_json_slice(&bytes, "run report")
}
