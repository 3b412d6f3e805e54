//! Topological accuracy of an inferred tree against a true tree.
//!
//! Both trees are reduced to their non-trivial splits (see
//! [`snapshot`](crate::snapshot)) and compared as sets:
//!
//! ```text
//! FN     = |T − I|   splits of the true tree the inferred tree missed
//! FP     = |I − T|   splits of the inferred tree the true tree lacks
//! shared = |T ∩ I|
//! ```
//!
//! Rates are normalized by the number of splits a fully resolved tree
//! over the same n leaves has, `n − 3`.
//!
//! # Example
//! ```text
//! True:      ((A,B),(C,D))    splits: {A,B}|{C,D}
//! Inferred:  ((A,C),(B,D))    splits: {A,C}|{B,D}
//!
//! FN = 1, FP = 1, shared = 0, max_splits = 1
//! FN rate = FP rate = 1.0, RF = 2
//! ```

use crate::error::CompareError;
use crate::io::read_tree_file;
use crate::snapshot::SplitSnapshot;
use crate::taxa::TaxonIndex;
use phylotree::tree::Tree as PhyloTree;
use std::path::Path;

/// Result of comparing one inferred tree with its true tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comparison {
    pub num_leaves: usize,
    /// Resolved internal edges of the true tree.
    pub true_splits: usize,
    /// Resolved internal edges of the inferred tree.
    pub inferred_splits: usize,
    pub shared: usize,
    pub false_negatives: usize,
    pub false_positives: usize,
}

impl Comparison {
    /// Splits of a fully resolved tree over `num_leaves` leaves.
    pub fn max_splits(&self) -> usize {
        max_splits(self.num_leaves)
    }

    /// Symmetric difference of the two split sets.
    pub fn rf_distance(&self) -> usize {
        self.false_negatives + self.false_positives
    }

    pub fn fn_rate(&self) -> f64 {
        rate(self.false_negatives, self.max_splits())
    }

    pub fn fp_rate(&self) -> f64 {
        rate(self.false_positives, self.max_splits())
    }

    /// Whether the true tree had any split to validate against.
    ///
    /// An unresolved (star) reference has none, in which case FP is
    /// reported as 0 whatever the inferred tree looks like.
    pub fn reference_resolved(&self) -> bool {
        self.true_splits > 0
    }
}

/// `n − 3` for n ≥ 4, 0 below that.
pub fn max_splits(num_leaves: usize) -> usize {
    num_leaves.saturating_sub(3)
}

// With fewer than four leaves no non-trivial split exists, so both
// counts are 0 and the rate is reported as 0.0.
fn rate(count: usize, max: usize) -> f64 {
    if max == 0 {
        0.0
    } else {
        count as f64 / max as f64
    }
}

/// Compare two split snapshots built over the same taxon index.
pub fn compare_snapshots(true_snap: &SplitSnapshot, inferred_snap: &SplitSnapshot) -> Comparison {
    let shared = true_snap
        .splits
        .intersection(&inferred_snap.splits)
        .count();
    let false_negatives = true_snap.len() - shared;
    let false_positives = if true_snap.is_empty() {
        0
    } else {
        inferred_snap.len() - shared
    };

    Comparison {
        num_leaves: true_snap.num_leaves,
        true_splits: true_snap.len(),
        inferred_splits: inferred_snap.len(),
        shared,
        false_negatives,
        false_positives,
    }
}

/// Compare an inferred tree against the true tree.
///
/// # Errors
/// - `ParseError` if a tree has unnamed or duplicated leaf labels
/// - `LabelMismatch` if the two trees are not over the same labels
pub fn compare_trees(true_tree: &PhyloTree, inferred_tree: &PhyloTree) -> Result<Comparison, CompareError> {
    let index = TaxonIndex::from_tree(true_tree)?;
    let true_snap = SplitSnapshot::from_tree(true_tree, &index)?;
    let inferred_snap = SplitSnapshot::from_tree(inferred_tree, &index)?;
    Ok(compare_snapshots(&true_snap, &inferred_snap))
}

/// Read both trees from disk and compare them.
pub fn compare_files<P: AsRef<Path>, Q: AsRef<Path>>(
    true_path: P,
    inferred_path: Q,
) -> Result<Comparison, CompareError> {
    let true_tree = read_tree_file(true_path)?;
    let inferred_tree = read_tree_file(inferred_path)?;
    compare_trees(&true_tree, &inferred_tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::parse_newick;
    use itertools::Itertools;

    fn cmp(true_nwk: &str, inferred_nwk: &str) -> Result<Comparison, CompareError> {
        compare_trees(&parse_newick(true_nwk)?, &parse_newick(inferred_nwk)?)
    }

    const TREES: [&str; 6] = [
        "((A,B),(C,D),(E,(F,G)));",
        "((A,C),(B,D),(E,(F,G)));",
        "(((A,B),C),D,(E,(F,G)));",
        "(A,B,C,D,E,F,G);",
        "((A,B),C,D,E,(F,G));",
        "((G,F),(E,((D,C),(B,A))));",
    ];

    #[test]
    fn test_self_comparison_is_zero() {
        for t in TREES {
            let res = cmp(t, t).unwrap();
            assert_eq!(res.false_negatives, 0, "{t}");
            assert_eq!(res.false_positives, 0, "{t}");
            assert_eq!(res.shared, res.true_splits, "{t}");
            assert_eq!(res.fn_rate(), 0.0);
            assert_eq!(res.fp_rate(), 0.0);
        }
    }

    #[test]
    fn test_swap_symmetry() {
        // star tree excluded: it is the only reference without splits
        let resolved = TREES.iter().filter(|t| !t.starts_with("(A,B,C"));
        for pair in resolved.combinations(2) {
            let ab = cmp(pair[0], pair[1]).unwrap();
            let ba = cmp(pair[1], pair[0]).unwrap();
            assert_eq!(ab.false_negatives, ba.false_positives, "{pair:?}");
            assert_eq!(ab.false_positives, ba.false_negatives, "{pair:?}");
            assert_eq!(ab.shared, ba.shared, "{pair:?}");
        }
    }

    #[test]
    fn test_four_leaf_quartets() {
        let res = cmp("((a,b),(c,d));", "((a,c),(b,d));").unwrap();
        assert_eq!(res.false_negatives, 1);
        assert_eq!(res.false_positives, 1);
        assert_eq!(res.shared, 0);
        assert_eq!(res.max_splits(), 1);
        assert_eq!(res.fn_rate(), 1.0);
        assert_eq!(res.fp_rate(), 1.0);
        assert_eq!(res.rf_distance(), 2);
    }

    #[test]
    fn test_star_reference_convention() {
        let res = cmp("(A,B,C,D,E,F,G);", "((A,B),(C,D),(E,(F,G)));").unwrap();
        assert_eq!(res.false_negatives, 0);
        assert_eq!(res.false_positives, 0);
        assert_eq!(res.true_splits, 0);
        assert_eq!(res.inferred_splits, 4);
        assert!(!res.reference_resolved());

        // the other way round every true split is missed
        let res = cmp("((A,B),(C,D),(E,(F,G)));", "(A,B,C,D,E,F,G);").unwrap();
        assert_eq!(res.false_negatives, 4);
        assert_eq!(res.false_positives, 0);
        assert_eq!(res.fn_rate(), 1.0);
    }

    #[test]
    fn test_polytomy_is_proportional() {
        let res = cmp("((A,B),(C,D),(E,(F,G)));", "((A,B),C,D,E,(F,G));").unwrap();
        assert_eq!(res.true_splits, 4);
        assert_eq!(res.inferred_splits, 2);
        assert_eq!(res.shared, 2);
        assert_eq!(res.false_negatives, 2);
        assert_eq!(res.false_positives, 0);
        assert_eq!(res.fn_rate(), 0.5);
    }

    #[test]
    fn test_rooting_independence() {
        let truth = "((A,B),(C,D),(E,(F,G)));";
        let inferred = "((A,C),(B,D),(E,(F,G)));";
        let base = cmp(truth, inferred).unwrap();
        for rerooted in [
            "(((A,C),(B,D)),(E,(F,G)));",
            "(G,(F,(E,((A,C),(B,D)))));",
            "(B,(D,((E,(F,G)),(A,C))));",
            "[&R] ((B,D),((A,C),(E,(F,G))));",
        ] {
            assert_eq!(cmp(truth, rerooted).unwrap(), base, "{rerooted}");
        }
        let rerooted_truth = "(A,(B,((C,D),(E,(F,G)))));";
        assert_eq!(cmp(rerooted_truth, inferred).unwrap(), base);
    }

    #[test]
    fn test_label_mismatch() {
        let err = cmp("((A,B),(C,D));", "((A,B),(C,E));").unwrap_err();
        assert!(matches!(err, CompareError::LabelMismatch { .. }));
        let err = cmp("((A,B),(C,D));", "((A,B),(C,D),E);").unwrap_err();
        match err {
            CompareError::LabelMismatch { only_in_true, only_in_inferred } => {
                assert!(only_in_true.is_empty());
                assert_eq!(only_in_inferred, vec!["E".to_string()]);
            }
            other => panic!("expected LabelMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_tiny_trees_do_not_divide() {
        let res = cmp("(A,B,C);", "((A,B),C);").unwrap();
        assert_eq!(res.max_splits(), 0);
        assert_eq!(res.fn_rate(), 0.0);
        assert_eq!(res.fp_rate(), 0.0);
    }

    #[test]
    fn test_compare_snapshots_directly() {
        let index = TaxonIndex::from_labels(["A", "B", "C", "D", "E", "F"]).unwrap();
        let truth: [&[&str]; 3] = [&["A", "B"], &["E", "F"], &["A", "B", "C"]];
        let inferred: [&[&str]; 2] = [&["A", "B"], &["C", "D"]];
        let res = compare_snapshots(
            &SplitSnapshot::from_sides(&index, truth).unwrap(),
            &SplitSnapshot::from_sides(&index, inferred).unwrap(),
        );
        assert_eq!(res.shared, 1);
        assert_eq!(res.false_negatives, 2);
        assert_eq!(res.false_positives, 1);
        assert_eq!(res.max_splits(), 3);
    }

    #[test]
    // Symmetric differences according to
    // https://evolution.genetics.washington.edu/phylip/doc/treedist.html
    fn robinson_foulds_treedist() {
        let trees = [
            "(A:0.1,(B:0.1,(H:0.1,(D:0.1,(J:0.1,(((G:0.1,E:0.1):0.1,(F:0.1,I:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
            "(A:0.1,(B:0.1,(D:0.1,((J:0.1,H:0.1):0.1,(((G:0.1,E:0.1):0.1,(F:0.1,I:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1);",
            "(A:0.1,(B:0.1,(D:0.1,(H:0.1,(J:0.1,(((G:0.1,E:0.1):0.1,(F:0.1,I:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
            "(A:0.1,(B:0.1,(E:0.1,(G:0.1,((F:0.1,I:0.1):0.1,((J:0.1,(H:0.1,D:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
            "(A:0.1,(B:0.1,(E:0.1,(G:0.1,((F:0.1,I:0.1):0.1,(((J:0.1,H:0.1):0.1,D:0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
            "(A:0.1,(B:0.1,(E:0.1,((F:0.1,I:0.1):0.1,(G:0.1,((J:0.1,(H:0.1,D:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
            "(A:0.1,(B:0.1,(E:0.1,((F:0.1,I:0.1):0.1,(G:0.1,(((J:0.1,H:0.1):0.1,D:0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
            "(A:0.1,(B:0.1,(E:0.1,((G:0.1,(F:0.1,I:0.1):0.1):0.1,((J:0.1,(H:0.1,D:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1);",
            "(A:0.1,(B:0.1,(E:0.1,((G:0.1,(F:0.1,I:0.1):0.1):0.1,(((J:0.1,H:0.1):0.1,D:0.1):0.1,C:0.1):0.1):0.1):0.1):0.1);",
            "(A:0.1,(B:0.1,(E:0.1,(G:0.1,((F:0.1,I:0.1):0.1,((J:0.1,(H:0.1,D:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
            "(A:0.1,(B:0.1,(D:0.1,(H:0.1,(J:0.1,(((G:0.1,E:0.1):0.1,(F:0.1,I:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
            "(A:0.1,(B:0.1,(E:0.1,((G:0.1,(F:0.1,I:0.1):0.1):0.1,((J:0.1,(H:0.1,D:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1);",
        ];
        let rfs = [
            [0, 4, 2, 10, 10, 10, 10, 10, 10, 10, 2, 10],
            [4, 0, 2, 10, 8, 10, 8, 10, 8, 10, 2, 10],
            [2, 2, 0, 10, 10, 10, 10, 10, 10, 10, 0, 10],
            [10, 10, 10, 0, 2, 2, 4, 2, 4, 0, 10, 2],
            [10, 8, 10, 2, 0, 4, 2, 4, 2, 2, 10, 4],
            [10, 10, 10, 2, 4, 0, 2, 2, 4, 2, 10, 2],
            [10, 8, 10, 4, 2, 2, 0, 4, 2, 4, 10, 4],
            [10, 10, 10, 2, 4, 2, 4, 0, 2, 2, 10, 0],
            [10, 8, 10, 4, 2, 4, 2, 2, 0, 4, 10, 2],
            [10, 10, 10, 0, 2, 2, 4, 2, 4, 0, 10, 2],
            [2, 2, 0, 10, 10, 10, 10, 10, 10, 10, 0, 10],
            [10, 10, 10, 2, 4, 2, 4, 0, 2, 2, 10, 0],
        ];

        for indices in (0..trees.len()).combinations(2) {
            let (i0, i1) = (indices[0], indices[1]);
            let res = cmp(trees[i0], trees[i1]).unwrap();
            assert_eq!(res.rf_distance(), rfs[i0][i1], "[{i0}, {i1}]");
            assert_eq!(res.num_leaves, 10);
            assert_eq!(res.true_splits, 7);
            // fully resolved on both sides, so errors come in pairs
            assert_eq!(res.false_negatives, res.false_positives);
        }
    }
}
