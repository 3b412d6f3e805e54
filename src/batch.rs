//! Compare every inferred tree of a results directory against its true tree.
//!
//! # Layout
//! ```text
//! <results>/<model>/<replicate>/true.tre
//! <results>/<model>/<replicate>/fasttree_gtr.tre
//! <results>/<model>/<replicate>/nj_logdet.tre
//! ```
//! Each (model, replicate, method) triple is one work unit. Its record is
//! written to `<replicate>/<method>_comparison.txt`, so units never share
//! an output path and run in parallel without coordination.
//!
//! A unit whose record already parses as a completed comparison is
//! skipped. Failed units leave a failure record and are retried on the
//! next run.

use crate::compare::{Comparison, compare_files};
use crate::error::ErrorKind;
use crate::io::write_tsv;
use crate::record::{RecordOutcome, format_result, read_record, write_record};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const COMPARISON_SUFFIX: &str = "_comparison.txt";

/// Errors that stop a whole batch before any unit runs.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("could not scan {path:?}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("could not write summary {path:?}: {source}")]
    Summary {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Everything a batch run needs; nothing is read from ambient state.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub results_dir: PathBuf,
    /// Model condition directories to visit. Empty means all of them.
    pub models: Vec<String>,
    /// Methods to compare. Empty means every `*.<tree_ext>` file.
    pub methods: Vec<String>,
    /// File name of the true tree inside each replicate directory.
    pub true_tree: String,
    /// Extension of inferred tree files, without the dot.
    pub tree_ext: String,
    /// Worker threads; 0 lets rayon decide.
    pub threads: usize,
    /// Recompute units even when a completed record exists.
    pub force: bool,
    /// Where to write the status table, if anywhere.
    pub summary: Option<PathBuf>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            results_dir: PathBuf::from("."),
            models: Vec::new(),
            methods: Vec::new(),
            true_tree: "true.tre".to_string(),
            tree_ext: "tre".to_string(),
            threads: 0,
            force: false,
            summary: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct WorkUnit {
    pub model: String,
    pub replicate: String,
    pub method: String,
    pub true_tree: PathBuf,
    pub inferred_tree: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    Compared(Comparison),
    /// A completed record was already on disk.
    Skipped(Comparison),
    Failed { kind: ErrorKind, message: String },
    /// The comparison ran but its record could not be written.
    Unwritten(String),
}

impl UnitOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            UnitOutcome::Compared(_) => "compared",
            UnitOutcome::Skipped(_) => "skipped",
            UnitOutcome::Failed { .. } => "failed",
            UnitOutcome::Unwritten(_) => "unwritten",
        }
    }

    pub fn comparison(&self) -> Option<&Comparison> {
        match self {
            UnitOutcome::Compared(cmp) | UnitOutcome::Skipped(cmp) => Some(cmp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnitReport {
    pub unit: WorkUnit,
    pub outcome: UnitOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub units: Vec<UnitReport>,
}

impl BatchReport {
    pub fn count(&self, status: &str) -> usize {
        self.units.iter().filter(|u| u.outcome.status() == status).count()
    }

    pub fn has_failures(&self) -> bool {
        self.units
            .iter()
            .any(|u| matches!(u.outcome, UnitOutcome::Failed { .. } | UnitOutcome::Unwritten(_)))
    }

    /// One row per unit, `NA` where a unit has no comparison.
    pub fn summary_rows(&self) -> Vec<Vec<String>> {
        self.units
            .iter()
            .map(|report| {
                let unit = &report.unit;
                let mut row = vec![
                    unit.model.clone(),
                    unit.replicate.clone(),
                    unit.method.clone(),
                    report.outcome.status().to_string(),
                ];
                match report.outcome.comparison() {
                    Some(cmp) => row.extend([
                        cmp.num_leaves.to_string(),
                        cmp.false_negatives.to_string(),
                        cmp.false_positives.to_string(),
                        cmp.rf_distance().to_string(),
                        format!("{:?}", cmp.fn_rate()),
                        format!("{:?}", cmp.fp_rate()),
                    ]),
                    None => row.extend(std::iter::repeat_n("NA".to_string(), 6)),
                }
                row
            })
            .collect()
    }
}

pub const SUMMARY_HEADER: [&str; 10] = [
    "model", "replicate", "method", "status", "leaves", "FN", "FP", "RF", "FN_rate", "FP_rate",
];

/// Sorted subdirectory names of `dir`.
fn subdirectories(dir: &Path) -> Result<Vec<String>, BatchError> {
    let scan_err = |source| BatchError::Scan { path: dir.to_path_buf(), source };
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(scan_err)? {
        let entry = entry.map_err(scan_err)?;
        if entry.file_type().map_err(scan_err)?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Methods present in a replicate directory: stems of `*.<ext>` files
/// other than the true tree and this tool's own records.
fn discover_methods(rep_dir: &Path, config: &BatchConfig) -> Result<Vec<String>, BatchError> {
    let scan_err = |source| BatchError::Scan { path: rep_dir.to_path_buf(), source };
    let mut methods = Vec::new();
    for entry in fs::read_dir(rep_dir).map_err(scan_err)? {
        let path = entry.map_err(scan_err)?.path();
        if !path.is_file() || path.extension().is_none_or(|e| e != config.tree_ext.as_str()) {
            continue;
        }
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        if name == config.true_tree || is_record_file(&name) {
            continue;
        }
        if let Some(stem) = path.file_stem() {
            methods.push(stem.to_string_lossy().into_owned());
        }
    }
    methods.sort();
    Ok(methods)
}

/// Comparison records and their in-flight `.tmp` copies.
fn is_record_file(name: &str) -> bool {
    let name = name.strip_suffix(".tmp").unwrap_or(name);
    name.ends_with(COMPARISON_SUFFIX)
}

/// List the work units of a results directory in a stable order.
pub fn discover_units(config: &BatchConfig) -> Result<Vec<WorkUnit>, BatchError> {
    let models = if config.models.is_empty() {
        subdirectories(&config.results_dir)?
    } else {
        config.models.clone()
    };

    let mut units = Vec::new();
    for model in models {
        let model_dir = config.results_dir.join(&model);
        if !model_dir.is_dir() {
            warn!("Model directory {} does not exist", model_dir.display());
            continue;
        }

        for replicate in subdirectories(&model_dir)? {
            let rep_dir = model_dir.join(&replicate);
            let true_tree = rep_dir.join(&config.true_tree);
            if !true_tree.is_file() {
                warn!("No true tree at {}", true_tree.display());
            }

            let methods = if config.methods.is_empty() {
                discover_methods(&rep_dir, config)?
            } else {
                config.methods.clone()
            };

            for method in methods {
                units.push(WorkUnit {
                    inferred_tree: rep_dir.join(format!("{method}.{}", config.tree_ext)),
                    output: rep_dir.join(format!("{method}{COMPARISON_SUFFIX}")),
                    true_tree: true_tree.clone(),
                    model: model.clone(),
                    replicate: replicate.clone(),
                    method,
                });
            }
        }
    }

    units.sort();
    Ok(units)
}

/// Run one work unit. Never panics on bad input and never touches
/// another unit's files.
pub fn run_unit(unit: &WorkUnit, force: bool) -> UnitOutcome {
    if !force {
        match read_record(&unit.output) {
            Ok(Some(RecordOutcome::Completed(cmp))) => {
                debug!("Skipping {}: already compared", unit.output.display());
                return UnitOutcome::Skipped(cmp);
            }
            Ok(_) => {}
            Err(e) => warn!("Could not read {}: {e}; recomputing", unit.output.display()),
        }
    }

    let result = compare_files(&unit.true_tree, &unit.inferred_tree);
    if let Err(e) = write_record(&unit.output, &format_result(&result)) {
        warn!("Could not write {}: {e}", unit.output.display());
        return UnitOutcome::Unwritten(e.to_string());
    }

    match result {
        Ok(cmp) => {
            debug!(
                "{}/{}/{}: FN rate {:.4}, FP rate {:.4}",
                unit.model,
                unit.replicate,
                unit.method,
                cmp.fn_rate(),
                cmp.fp_rate()
            );
            UnitOutcome::Compared(cmp)
        }
        Err(e) => {
            warn!("{}/{}/{}: {e}", unit.model, unit.replicate, unit.method);
            UnitOutcome::Failed {
                kind: e.kind(),
                message: e.to_string(),
            }
        }
    }
}

/// Discover and run every unit on a dedicated thread pool.
pub fn run_batch(config: &BatchConfig) -> Result<BatchReport, BatchError> {
    let units = discover_units(config)?;
    info!(
        "Found {} work units under {}",
        units.len(),
        config.results_dir.display()
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()?;

    let reports: Vec<UnitReport> = pool.install(|| {
        units
            .into_par_iter()
            .map(|unit| {
                let outcome = run_unit(&unit, config.force);
                UnitReport { unit, outcome }
            })
            .collect()
    });

    let report = BatchReport { units: reports };
    info!(
        "{} compared, {} skipped, {} failed, {} unwritten",
        report.count("compared"),
        report.count("skipped"),
        report.count("failed"),
        report.count("unwritten")
    );

    if let Some(path) = &config.summary {
        write_tsv(path, &SUMMARY_HEADER, &report.summary_rows()).map_err(|source| {
            BatchError::Summary { path: path.clone(), source }
        })?;
        info!("Summary written to {}", path.display());
    }

    Ok(report)
}
