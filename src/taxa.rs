//! Leaf label bookkeeping shared by the two trees of a comparison.
//!
//! Node ids are assigned during parsing and differ between files, so
//! bit positions come from taxon NAMES: labels are sorted and label `i`
//! owns bit `i`. Both trees are encoded against the reference tree's
//! index, which is where a label mismatch is caught.

use crate::error::CompareError;
use phylotree::tree::Tree as PhyloTree;
use std::collections::{BTreeSet, HashMap};

/// Sorted leaf labels of a tree and their bit positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonIndex {
    labels: Vec<String>,
    positions: HashMap<String, usize>,
}

impl TaxonIndex {
    /// Build an index from labels. Duplicates are a parse error.
    pub fn from_labels<I, S>(labels: I) -> Result<Self, CompareError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut sorted: Vec<String> = labels.into_iter().map(Into::into).collect();
        sorted.sort_unstable();
        if let Some(pair) = sorted.windows(2).find(|w| w[0] == w[1]) {
            return Err(CompareError::Parse(format!(
                "duplicate leaf label '{}'",
                pair[0]
            )));
        }

        let positions = sorted
            .iter()
            .enumerate()
            .map(|(idx, label)| (label.clone(), idx))
            .collect();

        Ok(TaxonIndex { labels: sorted, positions })
    }

    /// Index the leaves of a parsed tree.
    pub fn from_tree(tree: &PhyloTree) -> Result<Self, CompareError> {
        Self::from_labels(leaf_labels(tree)?.into_iter().map(|(_, label)| label))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn position(&self, label: &str) -> Option<usize> {
        self.positions.get(label).copied()
    }

    /// `Ok` when both indices hold exactly the same labels.
    pub fn check_same_taxa(&self, other: &TaxonIndex) -> Result<(), CompareError> {
        if self.labels == other.labels {
            return Ok(());
        }
        let ours: BTreeSet<&String> = self.labels.iter().collect();
        let theirs: BTreeSet<&String> = other.labels.iter().collect();
        Err(CompareError::LabelMismatch {
            only_in_true: ours.difference(&theirs).map(|s| s.to_string()).collect(),
            only_in_inferred: theirs.difference(&ours).map(|s| s.to_string()).collect(),
        })
    }
}

/// `(node_id, label)` for every leaf, with surrounding quotes removed.
///
/// Unnamed leaves make the tree unusable for comparison.
pub fn leaf_labels(tree: &PhyloTree) -> Result<Vec<(usize, String)>, CompareError> {
    tree.get_leaves()
        .into_iter()
        .map(|leaf_id| {
            let node = tree
                .get(&leaf_id)
                .map_err(|e| CompareError::Parse(e.to_string()))?;
            let label = node.name.as_deref().map(clean_label).unwrap_or_default();
            if label.is_empty() {
                return Err(CompareError::Parse(format!("leaf node {leaf_id} has no label")));
            }
            Ok((leaf_id, label))
        })
        .collect()
}

fn clean_label(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = ['\'', '"']
        .iter()
        .find_map(|q| {
            trimmed
                .strip_prefix(*q)
                .and_then(|rest| rest.strip_suffix(*q))
        })
        .unwrap_or(trimmed);
    unquoted.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_sorted() {
        let index = TaxonIndex::from_labels(["Human", "Chimp", "Gorilla"]).unwrap();
        assert_eq!(index.labels(), ["Chimp", "Gorilla", "Human"]);
        assert_eq!(index.position("Chimp"), Some(0));
        assert_eq!(index.position("Human"), Some(2));
        assert_eq!(index.position("Orangutan"), None);
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let err = TaxonIndex::from_labels(["A", "B", "A"]).unwrap_err();
        assert!(matches!(err, CompareError::Parse(msg) if msg.contains("'A'")));
    }

    #[test]
    fn test_mismatch_lists_both_sides() {
        let a = TaxonIndex::from_labels(["A", "B", "C", "D"]).unwrap();
        let b = TaxonIndex::from_labels(["A", "B", "C", "E"]).unwrap();
        match a.check_same_taxa(&b) {
            Err(CompareError::LabelMismatch { only_in_true, only_in_inferred }) => {
                assert_eq!(only_in_true, vec!["D".to_string()]);
                assert_eq!(only_in_inferred, vec!["E".to_string()]);
            }
            other => panic!("expected LabelMismatch, got {other:?}"),
        }
        assert!(a.check_same_taxa(&a.clone()).is_ok());
    }

    #[test]
    fn test_quoted_labels_from_tree() {
        let tree = PhyloTree::from_newick("(\"A\",B,(C,D));").unwrap();
        let index = TaxonIndex::from_tree(&tree).unwrap();
        assert_eq!(index.labels(), ["A", "B", "C", "D"]);
    }

    #[test]
    fn test_unnamed_leaf_rejected() {
        let tree = PhyloTree::from_newick("(A,B,(C,));").unwrap();
        assert!(matches!(TaxonIndex::from_tree(&tree), Err(CompareError::Parse(_))));
    }
}
