//! Python binding layer for tree comparisons.
//!
//! Provides Python functions that score an inferred tree against a true
//! tree, from Newick strings or from files.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use rayon::prelude::*;

use crate::compare::{Comparison, compare_files as compare_paths, compare_trees};
use crate::error::CompareError;
use crate::io::parse_newick;

/// Compare two Newick strings.
///
/// Args:
///     true_tree: Newick string of the true (reference) tree
///     inferred_tree: Newick string of the inferred tree
///
/// Returns:
///     A dict with leaves, split counts, FN, FP, RF and the two rates
///
/// Raises:
///     ValueError: If a tree cannot be parsed, is empty, or the leaf sets differ
#[pyfunction]
fn compare_newick<'py>(py: Python<'py>, true_tree: &str, inferred_tree: &str) -> PyResult<Bound<'py, PyDict>> {
    let result = parse_newick(true_tree)
        .and_then(|t| Ok((t, parse_newick(inferred_tree)?)))
        .and_then(|(t, i)| compare_trees(&t, &i))
        .map_err(to_py_err)?;
    to_dict(py, &result)
}

/// Compare two tree files.
///
/// Raises:
///     ValueError: If a file cannot be read or parsed, or the leaf sets differ
#[pyfunction]
fn compare_files<'py>(py: Python<'py>, true_path: &str, inferred_path: &str) -> PyResult<Bound<'py, PyDict>> {
    let result = compare_paths(true_path, inferred_path).map_err(to_py_err)?;
    to_dict(py, &result)
}

/// Compare many inferred tree files against one true tree, in parallel.
///
/// Failed comparisons come back as None so one bad file does not hide
/// the others.
#[pyfunction]
fn compare_many<'py>(
    py: Python<'py>,
    true_path: &str,
    inferred_paths: Vec<String>,
) -> PyResult<Vec<Option<Bound<'py, PyDict>>>> {
    let results: Vec<Result<Comparison, CompareError>> = py.detach(|| {
        inferred_paths
            .par_iter()
            .map(|path| compare_paths(true_path, path))
            .collect()
    });

    results
        .iter()
        .map(|result| match result {
            Ok(cmp) => to_dict(py, cmp).map(Some),
            Err(_) => Ok(None),
        })
        .collect()
}

fn to_py_err(err: CompareError) -> PyErr {
    PyValueError::new_err(format!("{}: {err}", err.kind()))
}

fn to_dict<'py>(py: Python<'py>, cmp: &Comparison) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("leaves", cmp.num_leaves)?;
    dict.set_item("true_splits", cmp.true_splits)?;
    dict.set_item("inferred_splits", cmp.inferred_splits)?;
    dict.set_item("shared", cmp.shared)?;
    dict.set_item("max_splits", cmp.max_splits())?;
    dict.set_item("fn", cmp.false_negatives)?;
    dict.set_item("fp", cmp.false_positives)?;
    dict.set_item("rf", cmp.rf_distance())?;
    dict.set_item("fn_rate", cmp.fn_rate())?;
    dict.set_item("fp_rate", cmp.fp_rate())?;
    Ok(dict)
}

/// Python module definition
#[pymodule]
fn split_accuracy(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(compare_newick, m)?)?;
    m.add_function(wrap_pyfunction!(compare_files, m)?)?;
    m.add_function(wrap_pyfunction!(compare_many, m)?)?;
    Ok(())
}
