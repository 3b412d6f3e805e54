//! Plain-text comparison records, one `Key: value` pair per line.
//!
//! A record is what a work unit leaves behind. A parsable success record
//! doubles as the unit's completion marker, so a rerun can skip it.

use crate::compare::Comparison;
use crate::error::{CompareError, ErrorKind};
use std::fs;
use std::io;
use std::path::Path;

const RESULTS_HEADER: &str = "Tree comparison results:";
const ERROR_PREFIX: &str = "Tree comparison error:";

/// What a record file says about its work unit.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Completed(Comparison),
    Failed { kind: ErrorKind, message: String },
}

impl RecordOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, RecordOutcome::Completed(_))
    }
}

/// Render a successful comparison.
pub fn format_comparison(cmp: &Comparison) -> String {
    format!(
        "{RESULTS_HEADER}\n\
         Leaves: {}\n\
         True tree splits: {}\n\
         Inferred tree splits: {}\n\
         Shared splits: {}\n\
         Max splits: {}\n\
         FN: {}\n\
         FP: {}\n\
         RF distance: {}\n\
         FN rate: {:?}\n\
         FP rate: {:?}\n",
        cmp.num_leaves,
        cmp.true_splits,
        cmp.inferred_splits,
        cmp.shared,
        cmp.max_splits(),
        cmp.false_negatives,
        cmp.false_positives,
        cmp.rf_distance(),
        cmp.fn_rate(),
        cmp.fp_rate(),
    )
}

/// Render a failed comparison.
pub fn format_failure(err: &CompareError) -> String {
    let message = err.to_string().replace('\n', " ");
    format!("{ERROR_PREFIX} {message}\nError kind: {}\n", err.kind())
}

/// Render either outcome of a comparison.
pub fn format_result(result: &Result<Comparison, CompareError>) -> String {
    match result {
        Ok(cmp) => format_comparison(cmp),
        Err(err) => format_failure(err),
    }
}

/// Parse a record back. `None` when the text is neither form or is truncated.
///
/// Rates are not read: they are recomputed from the counts.
pub fn parse_record(text: &str) -> Option<RecordOutcome> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let first = lines.next()?;

    if let Some(message) = first.strip_prefix(ERROR_PREFIX) {
        let kind = lines
            .find_map(|l| l.strip_prefix("Error kind:"))
            .and_then(|k| ErrorKind::from_name(k.trim()))?;
        return Some(RecordOutcome::Failed {
            kind,
            message: message.trim().to_string(),
        });
    }

    if first != RESULTS_HEADER {
        return None;
    }

    let mut fields = std::collections::HashMap::new();
    for line in lines {
        if let Some((key, value)) = line.split_once(':') {
            fields.insert(key.trim(), value.trim());
        }
    }
    let count = |key: &str| -> Option<usize> { fields.get(key)?.parse().ok() };

    // the rate lines come last; without them the record was cut short
    if !fields.contains_key("FP rate") {
        return None;
    }

    Some(RecordOutcome::Completed(Comparison {
        num_leaves: count("Leaves")?,
        true_splits: count("True tree splits")?,
        inferred_splits: count("Inferred tree splits")?,
        shared: count("Shared splits")?,
        false_negatives: count("FN")?,
        false_positives: count("FP")?,
    }))
}

/// Read and parse a record file. A missing file reads as `Ok(None)`.
pub fn read_record<P: AsRef<Path>>(path: P) -> io::Result<Option<RecordOutcome>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(parse_record(&text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Write a record next to its final path, then rename it into place, so
/// a reader never sees a half-written record.
pub fn write_record<P: AsRef<Path>>(path: P, text: &str) -> io::Result<()> {
    let path = path.as_ref();
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    fs::write(&tmp, text)?;
    fs::rename(&tmp, path)
}
