//! Generalized-index addressing for the persistent Merkle tree.
//!
//! A generalized index `1` addresses the root; `2k`/`2k+1` address the left/right child of
//! the node at index `k`. This is the same indexing convention the teacher's own
//! `merkle_proof.rs` assumes when it pads leaf counts to the next power of two and computes
//! proof positions — spelled out here as a first-class type instead of raw `usize` offsets.

use crate::error::TreeError;

/// A 1-indexed generalized index into a binary Merkle tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GeneralizedIndex(pub u64);

impl GeneralizedIndex {
    pub const ROOT: GeneralizedIndex = GeneralizedIndex(1);

    /// The depth of this index: `floor(log2(index))`.
    pub fn depth(self) -> usize {
        64 - self.0.leading_zeros() as usize - 1
    }

    pub fn left_child(self) -> GeneralizedIndex {
        GeneralizedIndex(self.0 * 2)
    }

    pub fn right_child(self) -> GeneralizedIndex {
        GeneralizedIndex(self.0 * 2 + 1)
    }

    pub fn parent(self) -> Option<GeneralizedIndex> {
        if self.0 <= 1 {
            None
        } else {
            Some(GeneralizedIndex(self.0 / 2))
        }
    }

    /// `true` if this index is the right child of its parent.
    pub fn is_right_child(self) -> bool {
        self.0 % 2 == 1
    }

    /// The generalized index of the `position`-th leaf (0-indexed) at tree `depth`.
    pub fn leaf(depth: usize, position: u64) -> Self {
        GeneralizedIndex((1u64 << depth) + position)
    }

    /// Walks from the root down to `self`, yielding (ancestor, take_right_child) pairs in
    /// root-to-leaf order; used by `Node::get`/`Node::set` to descend a tree.
    pub fn path_from_root(self, root_depth: usize) -> Vec<bool> {
        let depth = self.depth();
        if depth > root_depth {
            // index is deeper than the tree: still usable, descent just continues past
            // root_depth into zero-subtrees, which callers treat as an out-of-range error.
        }
        let mut bits = Vec::with_capacity(depth);
        for level in (0..depth).rev() {
            bits.push((self.0 >> level) & 1 == 1);
        }
        bits
    }

    pub fn validate_within(self, tree_depth: usize) -> Result<(), TreeError> {
        if self.depth() > tree_depth {
            Err(TreeError::IndexOutOfRange(self.0, tree_depth))
        } else {
            Ok(())
        }
    }
}

impl From<u64> for GeneralizedIndex {
    fn from(value: u64) -> Self {
        GeneralizedIndex(value)
    }
}
