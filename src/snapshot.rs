//! Extract the non-trivial splits of a phylogenetic tree.
//!
//! # What is a split?
//! Removing one internal edge divides the leaves into two groups:
//! ```text
//!   A --\              /-- C
//!        u ---------- v
//!   B --/              \-- D
//! ```
//! The edge `u-v` induces {A,B}|{C,D}. A split where one side holds a
//! single leaf is trivial: every tree over the same leaves has it, so it
//! is never stored.
//!
//! # Rooting
//! The tree is treated as unrooted. The root node itself never yields a
//! split, and a bifurcating root produces the same split from both of its
//! child edges, which collapses after canonicalization. A root placed on a
//! leaf edge produces only a trivial split and is dropped as well.
//!
//! # Canonicalization
//! Each split is stored as the side that does NOT contain taxon 0 (the
//! first label alphabetically), so identical splits from differently
//! rooted or differently ordered serializations map to identical bitsets.

use crate::bitset::Bitset;
use crate::error::CompareError;
use crate::taxa::{TaxonIndex, leaf_labels};
use phylotree::tree::Tree as PhyloTree;
use std::collections::{HashMap, HashSet};

/// An immutable set of canonical non-trivial splits of one tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSnapshot {
    /// Canonical splits (side without taxon 0).
    pub splits: HashSet<Bitset>,

    /// Number of leaves the bitsets are defined over.
    pub num_leaves: usize,
}

impl SplitSnapshot {
    /// Collect the splits of `tree`, mapping leaves through `index`.
    ///
    /// The index usually comes from the reference tree. A leaf label the
    /// index does not know, or an index label the tree lacks, is a
    /// `LabelMismatch`.
    ///
    /// # Algorithm
    /// 1. Map every leaf node to its bit via its label
    /// 2. Post-order walk from the root with an explicit stack, OR-ing
    ///    child bitsets into their parent
    /// 3. Keep every non-root bitset whose both sides hold two or more leaves
    /// 4. Canonicalize and deduplicate
    pub fn from_tree(tree: &PhyloTree, index: &TaxonIndex) -> Result<Self, CompareError> {
        let tree_index = TaxonIndex::from_tree(tree)?;
        index.check_same_taxa(&tree_index)?;

        let num_leaves = index.len();
        let words = Bitset::words_for(num_leaves);

        let mut leaf_bits: HashMap<usize, usize> = HashMap::with_capacity(num_leaves);
        for (node_id, label) in leaf_labels(tree)? {
            // check_same_taxa guarantees the label is known
            let bit = index.position(&label).ok_or_else(|| CompareError::LabelMismatch {
                only_in_true: Vec::new(),
                only_in_inferred: vec![label.clone()],
            })?;
            leaf_bits.insert(node_id, bit);
        }

        let root_id = tree.get_root().map_err(to_parse_error)?;
        let below = Self::compute_bitsets(tree, root_id, &leaf_bits, words)?;

        let mut splits = HashSet::with_capacity(below.len());
        for (node_id, bitset) in below {
            if node_id == root_id {
                continue;
            }
            let size = bitset.count_ones();
            if size < 2 || num_leaves - size < 2 {
                continue;
            }
            splits.insert(Self::canonicalize(bitset, num_leaves));
        }

        Ok(SplitSnapshot { splits, num_leaves })
    }

    /// Build a snapshot straight from leaf-label groups, one group per side.
    ///
    /// Used by tests and by callers that already know the split structure.
    /// Trivial groups are ignored like in [`from_tree`](Self::from_tree).
    pub fn from_sides<'a, I>(index: &TaxonIndex, sides: I) -> Result<Self, CompareError>
    where
        I: IntoIterator<Item = &'a [&'a str]>,
    {
        let num_leaves = index.len();
        let words = Bitset::words_for(num_leaves);
        let mut splits = HashSet::new();
        for side in sides {
            let mut bitset = Bitset::zeros(words);
            for label in side {
                let bit = index.position(label).ok_or_else(|| CompareError::LabelMismatch {
                    only_in_true: Vec::new(),
                    only_in_inferred: vec![label.to_string()],
                })?;
                bitset.set(bit);
            }
            let size = bitset.count_ones();
            if size >= 2 && num_leaves - size >= 2 {
                splits.insert(Self::canonicalize(bitset, num_leaves));
            }
        }
        Ok(SplitSnapshot { splits, num_leaves })
    }

    /// Number of resolved internal edges (distinct non-trivial splits).
    pub fn len(&self) -> usize {
        self.splits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    /// Leaf set below every node reachable from `root_id`.
    ///
    /// Iterative so that caterpillar trees with thousands of leaves do not
    /// exhaust the stack.
    fn compute_bitsets(
        tree: &PhyloTree,
        root_id: usize,
        leaf_bits: &HashMap<usize, usize>,
        words: usize,
    ) -> Result<HashMap<usize, Bitset>, CompareError> {
        let mut below: HashMap<usize, Bitset> = HashMap::new();
        // (node, children already pushed)
        let mut stack: Vec<(usize, bool)> = vec![(root_id, false)];

        while let Some((node_id, expanded)) = stack.pop() {
            let node = tree.get(&node_id).map_err(to_parse_error)?;

            if node.children.is_empty() {
                let mut bitset = Bitset::zeros(words);
                if let Some(&bit) = leaf_bits.get(&node_id) {
                    bitset.set(bit);
                }
                below.insert(node_id, bitset);
                continue;
            }

            if !expanded {
                stack.push((node_id, true));
                stack.extend(node.children.iter().map(|&child| (child, false)));
                continue;
            }

            let mut bitset = Bitset::zeros(words);
            for child in &node.children {
                if let Some(child_bits) = below.get(child) {
                    bitset.or_assign(child_bits);
                }
            }
            below.insert(node_id, bitset);
        }

        Ok(below)
    }

    /// Always store the side WITHOUT taxon 0.
    ///
    /// Leaves: A=0, B=1, C=2, D=3
    /// - {A,B} `0b0011` contains A → flip to {C,D} `0b1100`
    /// - {C,D} `0b1100` → kept
    fn canonicalize(bitset: Bitset, num_leaves: usize) -> Bitset {
        if bitset.contains(0) {
            bitset.complement(num_leaves)
        } else {
            bitset
        }
    }
}

fn to_parse_error(err: phylotree::tree::TreeError) -> CompareError {
    CompareError::Parse(err.to_string())
}
