//! Error type shared by parsing, snapshotting and comparison.

use itertools::Itertools;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a single comparison.
///
/// None of these are fatal to a batch: the caller records the failure
/// and moves on to the next work unit.
#[derive(Error, Debug)]
pub enum CompareError {
    /// The tree text could not be turned into a tree with labeled leaves.
    #[error("could not parse tree: {0}")]
    Parse(String),

    /// The two trees are not over the same set of leaf labels.
    #[error("leaf label sets differ ({})", describe_mismatch(.only_in_true, .only_in_inferred))]
    LabelMismatch {
        only_in_true: Vec<String>,
        only_in_inferred: Vec<String>,
    },

    /// The input holds no tree at all.
    #[error("empty tree input: {0}")]
    EmptyTree(String),

    /// The input file could not be read.
    #[error("could not read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The three failure kinds reported in comparison records.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    ParseError,
    LabelMismatch,
    EmptyTree,
}

impl CompareError {
    /// Reported kind. An unreadable file counts as an empty input.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompareError::Parse(_) => ErrorKind::ParseError,
            CompareError::LabelMismatch { .. } => ErrorKind::LabelMismatch,
            CompareError::EmptyTree(_) | CompareError::Io { .. } => ErrorKind::EmptyTree,
        }
    }
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ParseError => "ParseError",
            ErrorKind::LabelMismatch => "LabelMismatch",
            ErrorKind::EmptyTree => "EmptyTree",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ParseError" => Some(ErrorKind::ParseError),
            "LabelMismatch" => Some(ErrorKind::LabelMismatch),
            "EmptyTree" => Some(ErrorKind::EmptyTree),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Long label lists are cut so a single record line stays readable.
const MAX_LISTED_LABELS: usize = 5;

fn describe_mismatch(only_in_true: &[String], only_in_inferred: &[String]) -> String {
    format!(
        "{} only in true tree [{}], {} only in inferred tree [{}]",
        only_in_true.len(),
        abbreviate(only_in_true),
        only_in_inferred.len(),
        abbreviate(only_in_inferred),
    )
}

fn abbreviate(labels: &[String]) -> String {
    let shown = labels.iter().take(MAX_LISTED_LABELS).join(", ");
    if labels.len() > MAX_LISTED_LABELS {
        format!("{shown}, ...")
    } else {
        shown
    }
}
