use nwg_core::errors::{ErrorInfo, NwgError};
use nwg_core::learner::LearnerFactory;
use nwg_core::params::ExpandedCondition;
use nwg_core::rng::{RngHandle, SHUFFLE_SUBSTREAM};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::export::Exporter;
use crate::filters::AcceptanceSpec;
use crate::report::{RunReport, TrialOutcome, TrialReport};
use crate::simulate::{simulate_condition, Simulation};

fn pool_error(err: impl ToString) -> NwgError {
    NwgError::Io(ErrorInfo::new("thread-pool", err.to_string()))
}

/// Options governing a run.
#[derive(Debug, Clone)]
pub struct RunOpts {
    /// Number of worker threads; `1` runs trials inline, in order.
    pub workers: usize,
    /// Seed for the one-off shuffle of the condition list; random when absent.
    pub seed: Option<u64>,
}

impl Default for RunOpts {
    fn default() -> Self {
        Self {
            workers: 1,
            seed: None,
        }
    }
}

/// Shuffles `conditions` once, as seeded by `seed` or from entropy.
pub fn shuffle_conditions(conditions: &mut [ExpandedCondition], seed: Option<u64>) {
    let mut rng = match seed {
        Some(seed) => RngHandle::substream(seed, SHUFFLE_SUBSTREAM),
        None => RngHandle::from_entropy(),
    };
    rng.shuffle(conditions);
}

/// Runs every condition through simulate, filter and export.
///
/// One worker processes conditions inline, strictly in input order. More
/// workers shuffle the list once (seeded by `opts.seed`) before handing it to
/// the pool. Each trial yields its own [`TrialOutcome`]; a failing trial is
/// recorded and never aborts its siblings. Reports come back in scheduled
/// order whatever the completion order.
pub fn run_conditions<F, E>(
    factory: &F,
    exporter: &E,
    mut conditions: Vec<ExpandedCondition>,
    opts: &RunOpts,
) -> Result<RunReport, NwgError>
where
    F: LearnerFactory,
    E: Exporter + ?Sized,
{
    let workers = opts.workers.max(1);
    info!(trials = conditions.len(), workers, "dispatching trials");

    let trials = if workers == 1 {
        conditions
            .iter()
            .enumerate()
            .map(|(index, condition)| execute(factory, exporter, index, condition))
            .collect::<Vec<_>>()
    } else {
        shuffle_conditions(&mut conditions, opts.seed);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(pool_error)?;
        let mut ordered: Vec<TrialReport> = pool.install(|| {
            conditions
                .par_iter()
                .enumerate()
                .map(|(index, condition)| execute(factory, exporter, index, condition))
                .collect()
        });
        ordered.sort_by_key(|trial| trial.index);
        ordered
    };

    let report = RunReport::new(trials, opts.seed, workers);
    info!(
        accepted = report.counts.accepted,
        rejected = report.counts.rejected,
        skipped = report.counts.skipped,
        failed = report.counts.failed,
        "run complete"
    );
    Ok(report)
}

fn execute<F, E>(factory: &F, exporter: &E, index: usize, condition: &ExpandedCondition) -> TrialReport
where
    F: LearnerFactory,
    E: Exporter + ?Sized,
{
    info!(index, experiment = %condition.name, "trial start");
    let outcome = match run_trial(factory, exporter, condition) {
        Ok(outcome) => outcome,
        Err(error) => {
            warn!(index, experiment = %condition.name, %error, "trial failed");
            TrialOutcome::Failed { error }
        }
    };
    TrialReport::new(index, condition, outcome)
}

/// Simulates one condition, applies its acceptance predicates and exports on acceptance.
pub fn run_trial<F, E>(
    factory: &F,
    exporter: &E,
    condition: &ExpandedCondition,
) -> Result<TrialOutcome, NwgError>
where
    F: LearnerFactory,
    E: Exporter + ?Sized,
{
    let acceptance = AcceptanceSpec::from_condition(condition)?;
    let result = match simulate_condition(factory, condition)? {
        Simulation::Completed(result) => result,
        Simulation::Skipped(reason) => return Ok(TrialOutcome::Skipped { reason }),
    };
    let filters = acceptance.evaluate(&result)?;
    if !filters.passes() {
        return Ok(TrialOutcome::Rejected { filters });
    }
    exporter.export(condition, &result)?;
    Ok(TrialOutcome::Accepted { filters })
}
