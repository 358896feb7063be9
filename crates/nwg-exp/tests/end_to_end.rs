mod common;

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use common::RecordingFactory;
use nwg_core::errors::NwgError;
use nwg_core::params::{ExpandedCondition, Scalar};
use nwg_core::stimulus::ExperimentResult;
use nwg_exp::axes::FeatureSpace;
use nwg_exp::export::{artifact_title, ArtifactPaths};
use nwg_exp::report::load_run_report;
use nwg_exp::{
    expand, parse_config, run_conditions, write_run_report, Exporter, FsExporter,
    PrototypeLearnerFactory, RunOpts, TrialOutcome, TrialState,
};

#[derive(Default)]
struct CountingExporter {
    calls: AtomicUsize,
    results: Mutex<Vec<ExperimentResult>>,
}

impl Exporter for CountingExporter {
    fn export(&self, _condition: &ExpandedCondition, result: &ExperimentResult) -> Result<(), NwgError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results.lock().expect("results").push(result.clone());
        Ok(())
    }
}

fn config_text(data: &std::path::Path, out: &std::path::Path) -> String {
    let mut text = String::from("[single block]\n");
    for (key, value) in &common::block("single block", data, out).options {
        let rendered = match value.as_scalar() {
            Some(Scalar::Str(raw)) => format!("'{raw}'"),
            _ => value.to_string(),
        };
        text.push_str(&format!("{key} = {rendered}\n"));
    }
    text
}

#[test]
fn single_block_runs_and_exports_once_for_any_worker_count() {
    let data = tempfile::tempdir().expect("data");
    let out = tempfile::tempdir().expect("out");
    common::write_stimuli(data.path(), FeatureSpace::Simple);
    let specs = parse_config(&config_text(data.path(), out.path())).expect("parse");
    let conditions = expand(&specs);
    assert_eq!(conditions.len(), 1);

    for workers in [1, 4] {
        let exporter = CountingExporter::default();
        let opts = RunOpts {
            workers,
            seed: Some(3),
        };
        let report = run_conditions(&PrototypeLearnerFactory, &exporter, conditions.clone(), &opts)
            .expect("run");
        assert_eq!(exporter.calls.load(Ordering::SeqCst), 1, "workers={workers}");
        assert_eq!(report.counts.accepted, 1);
        assert_eq!(report.trials.len(), 1);
        let results = exporter.results.lock().expect("results");
        assert_eq!(results[0].iter().count(), 4);
    }
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let data = tempfile::tempdir().expect("data");
    common::write_stimuli(data.path(), FeatureSpace::Simple);
    let mut spec = common::block("sweep", data.path(), data.path());
    spec.options.insert(
        "test-delay".into(),
        nwg_core::params::ParamValue::List(vec![Scalar::Int(0), Scalar::Int(2), Scalar::Int(5)]),
    );
    spec.options.insert(
        "spacing-condition".into(),
        nwg_core::params::ParamValue::List(vec![
            Scalar::Str("simultaneous".into()),
            Scalar::Str("sequential-3".into()),
        ]),
    );
    let conditions = expand(&[spec]);
    assert_eq!(conditions.len(), 6);

    let run = |workers| {
        let exporter = CountingExporter::default();
        let opts = RunOpts {
            workers,
            seed: Some(17),
        };
        let report = run_conditions(&PrototypeLearnerFactory, &exporter, conditions.clone(), &opts)
            .expect("run");
        (report, exporter.calls.load(Ordering::SeqCst))
    };
    let (sequential, seq_calls) = run(1);
    let (parallel, par_calls) = run(3);
    assert_eq!(seq_calls, 6);
    assert_eq!(par_calls, 6);
    let indices: Vec<usize> = parallel.trials.iter().map(|trial| trial.index).collect();
    assert_eq!(indices, (0..6).collect::<Vec<_>>());
    // the pool runs a shuffled schedule; outcomes per condition must still agree
    let by_condition = |report: &nwg_exp::RunReport| {
        let mut entries: Vec<(String, TrialOutcome)> = report
            .trials
            .iter()
            .map(|trial| (trial.condition_hash.clone(), trial.outcome.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    };
    assert_eq!(by_condition(&sequential), by_condition(&parallel));
    let expected_order: Vec<String> = conditions
        .iter()
        .map(|condition| nwg_exp::hash::stable_hash_string(&condition.options, "condition").expect("hash"))
        .collect();
    let sequential_order: Vec<String> = sequential
        .trials
        .iter()
        .map(|trial| trial.condition_hash.clone())
        .collect();
    assert_eq!(sequential_order, expected_order);
}

#[test]
fn failing_trials_do_not_abort_siblings() {
    let data = tempfile::tempdir().expect("data");
    common::write_stimuli(data.path(), FeatureSpace::Simple);
    let good = common::condition("good", data.path(), data.path());
    let mut bad_space = good.clone();
    bad_space.name = "bad space".into();
    bad_space.set("feature-space", Scalar::Str("shapes".into()));
    let mut bad_prior = good.clone();
    bad_prior.name = "bad prior".into();
    bad_prior.set("compare-to-prior", Scalar::Str("log-odds".into()));

    for workers in [1, 2] {
        let exporter = CountingExporter::default();
        let report = run_conditions(
            &RecordingFactory::default(),
            &exporter,
            vec![good.clone(), bad_space.clone(), bad_prior.clone()],
            &RunOpts {
                workers,
                seed: Some(5),
            },
        )
        .expect("run");
        assert_eq!(exporter.calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.counts.accepted, 1);
        assert_eq!(report.counts.failed, 2);
        for trial in report.failures() {
            match (&trial.experiment[..], &trial.outcome) {
                ("bad space", TrialOutcome::Failed { error }) => {
                    assert!(matches!(error, NwgError::InvalidParameter(_)))
                }
                ("bad prior", TrialOutcome::Failed { error }) => {
                    assert!(matches!(error, NwgError::Unimplemented(_)))
                }
                other => panic!("unexpected failure {other:?}"),
            }
        }
    }
}

#[test]
fn skipped_and_rejected_trials_are_reported_without_export() {
    let data = tempfile::tempdir().expect("data");
    common::write_stimuli(data.path(), FeatureSpace::Simple);
    let mut skipped = common::condition("child", data.path(), data.path());
    skipped.set("learner-type", Scalar::Str("child".into()));
    skipped.set("decay-sup", Scalar::Float(0.9));
    let mut rejected = common::condition("reversal", data.path(), data.path());
    rejected.set("check-spencer-condition", Scalar::Bool(true));

    let exporter = CountingExporter::default();
    // the recording learner answers 0.5 everywhere: no reversal
    let report = run_conditions(
        &RecordingFactory::default(),
        &exporter,
        vec![skipped, rejected],
        &RunOpts {
            workers: 1,
            seed: Some(9),
        },
    )
    .expect("run");
    assert_eq!(exporter.calls.load(Ordering::SeqCst), 0);
    let states: Vec<(String, TrialState)> = report
        .trials
        .iter()
        .map(|trial| (trial.experiment.clone(), trial.outcome.state()))
        .collect();
    assert!(states.contains(&("child".into(), TrialState::Skipped)));
    assert!(states.contains(&("reversal".into(), TrialState::Rejected)));
}

#[test]
fn filesystem_export_and_report_land_under_output_path() {
    let data = tempfile::tempdir().expect("data");
    let out = tempfile::tempdir().expect("out");
    common::write_stimuli(data.path(), FeatureSpace::Simple);
    let condition = common::condition("exp", data.path(), &out.path().join("exp"));
    let report = run_conditions(
        &PrototypeLearnerFactory,
        &FsExporter,
        vec![condition.clone()],
        &RunOpts::default(),
    )
    .expect("run");
    assert_eq!(report.counts.accepted, 1);

    let title = artifact_title(&condition).expect("title");
    let paths = ArtifactPaths::new(&out.path().join("exp"), &title);
    assert!(paths.plot.exists());
    assert!(paths.sc.exists());
    let table = fs::read_to_string(&paths.csv).expect("csv");
    let labels: Vec<&str> = table
        .lines()
        .skip(1)
        .map(|line| line.split(',').next().unwrap_or_default())
        .collect();
    assert_eq!(labels, vec!["1 ex.", "3 subord.", "3 basic", "3 super."]);

    write_run_report(out.path(), &report).expect("write report");
    let loaded = load_run_report(out.path()).expect("load report");
    assert_eq!(loaded.trials, report.trials);
}
