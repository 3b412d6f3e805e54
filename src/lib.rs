//! Crate root: lightweight module orchestration and public re-exports.
//!
//! Modules:
//! - `compare`: false negative / false positive split counts and rates.
//! - `snapshot`: non-trivial split extraction from a parsed tree.
//! - `taxa`: label-to-bit mapping shared by both trees of a comparison.
//! - `bitset`: compact bitset representation for split sides.
//! - `io`: reading Newick / Nexus trees and writing TSV tables.
//! - `record`: the per-comparison text record.
//! - `batch`: parallel, resumable comparison over a results directory.
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).

pub mod batch;
pub mod bitset;
pub mod compare;
pub mod error;
pub mod io;
pub mod record;
pub mod snapshot;
pub mod taxa;

#[cfg(feature = "python")]
pub mod api;

// Re-export frequently used types & functions
pub use batch::{BatchConfig, BatchReport, run_batch};
pub use bitset::Bitset;
pub use compare::{Comparison, compare_files, compare_trees};
pub use error::{CompareError, ErrorKind};
pub use io::{parse_newick, read_tree_file};
pub use snapshot::SplitSnapshot;
