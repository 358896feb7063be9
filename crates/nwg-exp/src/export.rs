use std::fs;
use std::path::{Path, PathBuf};

use nwg_core::errors::{ErrorInfo, NwgError};
use nwg_core::params::{ExpandedCondition, Scalar};
use nwg_core::stimulus::ExperimentResult;
use tracing::{debug, warn};

use crate::filters::{
    CategoryMeans, BASIC_MATCHES, ONE_EXAMPLE, SUBORDINATE_MATCHES, SUPERORDINATE_MATCHES,
    THREE_SUBORDINATE,
};
use crate::plot::render_bar_chart;

/// Option naming the directory artefacts are written under.
pub const OUTPUT_PATH_KEY: &str = "output-path";
/// Subdirectory for bar charts.
pub const PLOTS_DIR: &str = "plots";
/// Subdirectory for suspicious-coincidence scores.
pub const SC_DIR: &str = "sc";
/// Subdirectory for summary tables.
pub const CSV_DIR: &str = "csv";

/// Header row of the summary table.
pub const CSV_HEADER: [&str; 4] = ["condition", "sub. match", "basic match", "super. match"];

/// Training conditions summarised in the chart and table, with their short labels.
pub const CANONICAL_CONDITIONS: [(&str, &str); 10] = [
    (ONE_EXAMPLE, "1 ex."),
    ("two subordinate examples", "2 subord."),
    ("two basic-level examples", "2 basic"),
    ("two superordinate examples", "2 super."),
    (THREE_SUBORDINATE, "3 subord."),
    ("three basic-level examples", "3 basic"),
    ("three superordinate examples", "3 super."),
    ("four subordinate examples", "4 subord."),
    ("four basic-level examples", "4 basic"),
    ("four superordinate examples", "4 super."),
];

fn io_error(code: &str, path: &Path, err: impl ToString) -> NwgError {
    NwgError::Io(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

/// Persists the artefacts of an accepted trial.
pub trait Exporter: Send + Sync {
    /// Called once per accepted trial, possibly from several workers at once.
    fn export(&self, condition: &ExpandedCondition, result: &ExperimentResult) -> Result<(), NwgError>;
}

/// Writes chart, coincidence score and summary table under the condition's `output-path`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsExporter;

impl Exporter for FsExporter {
    fn export(&self, condition: &ExpandedCondition, result: &ExperimentResult) -> Result<(), NwgError> {
        let root = PathBuf::from(condition.str(OUTPUT_PATH_KEY)?);
        let title = artifact_title(condition)?;
        let paths = ArtifactPaths::new(&root, &title);
        for dir in [PLOTS_DIR, SC_DIR, CSV_DIR] {
            let dir = root.join(dir);
            fs::create_dir_all(&dir).map_err(|err| io_error("artifact-dir", &dir, err))?;
        }

        let rows = summary_rows(result);
        render_bar_chart(&paths.plot, &rows)?;
        write_suspicious_coincidence(&paths.sc, suspicious_coincidence(result))?;
        write_summary_csv(&paths.csv, &rows)?;
        debug!(title = %title, root = %root.display(), "artefacts written");
        Ok(())
    }
}

/// Locations of the three artefacts of one trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// `plots/<title>.svg`
    pub plot: PathBuf,
    /// `sc/<title>.dat`
    pub sc: PathBuf,
    /// `csv/<title>.dat`
    pub csv: PathBuf,
}

impl ArtifactPaths {
    /// Paths for `title` under `root`.
    pub fn new(root: &Path, title: &str) -> Self {
        Self {
            plot: root.join(PLOTS_DIR).join(format!("{title}.svg")),
            sc: root.join(SC_DIR).join(format!("{title}.dat")),
            csv: root.join(CSV_DIR).join(format!("{title}.dat")),
        }
    }
}

/// File stem naming a trial by its decay rates, spacing and test delay.
pub fn artifact_title(condition: &ExpandedCondition) -> Result<String, NwgError> {
    let parts = [
        format!("decaysup_{}", condition.scalar("decay-sup")?),
        format!("decaybas_{}", condition.scalar("decay-basic")?),
        format!("decaysub_{}", condition.scalar("decay-sub")?),
        format!("decayinst_{}", condition.scalar("decay-instance")?),
        format!("spacing_{}", condition.str("spacing-condition")?),
        format!("test_{:03}", condition.i64("test-delay")?),
    ];
    Ok(sanitize(&parts.join(",")))
}

/// Drops characters other than word characters, whitespace and `-`, then
/// collapses whitespace runs into `_`.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
                in_space = true;
            }
        } else if c.is_alphanumeric() || c == '_' || c == '-' {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Category means of one training condition scaled by its subordinate mean.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    /// Training condition name.
    pub condition: &'static str,
    /// Abbreviated name used in the chart and table.
    pub label: &'static str,
    /// Subordinate, basic, superordinate.
    pub means: [f64; 3],
    /// Population standard deviations, same order and scale.
    pub errors: [f64; 3],
}

/// Summary rows for the canonical conditions present in `result`.
pub fn summary_rows(result: &ExperimentResult) -> Vec<SummaryRow> {
    let mut rows = Vec::new();
    for (condition, label) in CANONICAL_CONDITIONS {
        let Some(trial) = result.condition(condition) else {
            continue;
        };
        let Ok(means) = CategoryMeans::from_result(result, condition) else {
            warn!(training_condition = condition, "incomplete categories; row omitted");
            continue;
        };
        let std = |category: &str| trial.std(category).unwrap_or(f64::NAN);
        let mut row = SummaryRow {
            condition,
            label,
            means: [means.sub, means.basic, means.sup],
            errors: [
                std(SUBORDINATE_MATCHES),
                std(BASIC_MATCHES),
                std(SUPERORDINATE_MATCHES),
            ],
        };
        if means.sub == 0.0 {
            warn!(training_condition = condition, "subordinate mean is zero; row left unscaled");
        } else {
            for value in row.means.iter_mut().chain(row.errors.iter_mut()) {
                *value /= means.sub;
            }
        }
        rows.push(row);
    }
    rows
}

/// `(basic/sub for one example) / (basic/sub for three subordinate examples)`.
pub fn suspicious_coincidence(result: &ExperimentResult) -> Option<f64> {
    let one = CategoryMeans::from_result(result, ONE_EXAMPLE).ok()?;
    let three = CategoryMeans::from_result(result, THREE_SUBORDINATE).ok()?;
    Some(one.basic_sub_ratio() / three.basic_sub_ratio())
}

/// Formats a float the way the summary files expect (`1.0`, `0.25`, `nan`, `inf`).
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        Scalar::Float(value).to_string()
    }
}

fn write_suspicious_coincidence(path: &Path, score: Option<f64>) -> Result<(), NwgError> {
    let score = score.unwrap_or_else(|| {
        warn!(path = %path.display(), "coincidence conditions missing; writing nan");
        f64::NAN
    });
    fs::write(path, format_value(score)).map_err(|err| io_error("sc-write", path, err))
}

fn write_summary_csv(path: &Path, rows: &[SummaryRow]) -> Result<(), NwgError> {
    let mut writer = csv::WriterBuilder::new()
        .from_path(path)
        .map_err(|err| io_error("csv-open", path, err))?;
    writer
        .write_record(CSV_HEADER)
        .map_err(|err| io_error("csv-write", path, err))?;
    for row in rows {
        let record = [
            row.label.to_string(),
            format_value(row.means[0]),
            format_value(row.means[1]),
            format_value(row.means[2]),
        ];
        writer
            .write_record(&record)
            .map_err(|err| io_error("csv-write", path, err))?;
    }
    writer.flush().map_err(|err| io_error("csv-write", path, err))
}
