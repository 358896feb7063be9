use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use nwg_core::params::{ExpandedCondition, Scalar};
use nwg_exp::{
    expand, load_config, run_conditions, write_run_report, FsExporter, PrototypeLearnerFactory,
    RunOpts, OUTPUT_PATH_KEY,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nwg-sim", about = "Novel word generalization experiment runner")]
struct Cli {
    /// Default log level; `RUST_LOG` takes precedence when set.
    #[arg(long, value_enum, default_value_t = LogLevel::Info, ignore_case = true)]
    logging: LogLevel,
    /// Experiment configuration file.
    #[arg(short = 'c', long = "config-file", default_value = "exp.cfg")]
    config_file: PathBuf,
    /// Number of worker threads.
    #[arg(short = 'n', long = "num-cores", default_value_t = 1)]
    num_cores: usize,
    /// Root directory for results; defaults to the directory of this executable.
    #[arg(short = 'r', long = "results-path")]
    results_path: Option<PathBuf>,
    /// Seed for the condition shuffle.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
#[value(rename_all = "UPPER")]
enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

fn init_logging(level: LogLevel) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn default_results_path() -> Result<PathBuf, Box<dyn Error>> {
    let exe = std::env::current_exe()?;
    Ok(exe
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".")))
}

/// Points conditions without an explicit output path at `<results>/<experiment>`.
fn assign_output_paths(conditions: &mut [ExpandedCondition], results: &Path) {
    for condition in conditions.iter_mut() {
        if !condition.contains(OUTPUT_PATH_KEY) {
            let path = results.join(&condition.name);
            condition.set(OUTPUT_PATH_KEY, Scalar::Str(path.display().to_string()));
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.logging);

    let results = match cli.results_path {
        Some(path) => path,
        None => default_results_path()?,
    };
    let specs = load_config(&cli.config_file)?;
    let mut conditions = expand(&specs);
    assign_output_paths(&mut conditions, &results);
    info!(
        config = %cli.config_file.display(),
        experiments = specs.len(),
        trials = conditions.len(),
        "configuration loaded"
    );

    let opts = RunOpts {
        workers: cli.num_cores,
        seed: cli.seed,
    };
    let report = run_conditions(&PrototypeLearnerFactory, &FsExporter, conditions, &opts)?;
    let path = write_run_report(&results, &report)?;
    info!(report = %path.display(), failed = report.counts.failed, "run report written");
    Ok(())
}
