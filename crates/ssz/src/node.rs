//! A persistent, content-addressed binary Merkle tree.
//!
//! This is the "engine" spec.md §4.B calls for: every container, vector, list, bitvector and
//! bitlist is ultimately a tree of these nodes. Updates return a new root; unchanged subtrees
//! are shared via `Arc`, so `set` is O(depth) in both time and allocation rather than O(tree
//! size). Hashes are memoized per node instance with `OnceLock`, matching spec.md's "caches its
//! SHA-256 digest lazily" branch-node invariant.
//!
//! Zero-subtree hashes are looked up from `ethereum_hashing::ZERO_HASHES`, the same table the
//! teacher's `hashing.rs::pad_to_depth` draws from, rather than recomputed from scratch.

use std::sync::{Arc, OnceLock};

use ethereum_hashing::{hash32_concat, ZERO_HASHES};

use crate::error::TreeError;
use crate::gindex::GeneralizedIndex;
use crate::primitives::Bytes32;

#[derive(Debug)]
struct Branch {
    left: Node,
    right: Node,
    hash: OnceLock<Bytes32>,
}

/// A node in the persistent tree: either a 32-byte leaf or a branch committing to two children.
#[derive(Debug, Clone)]
pub enum Node {
    Leaf(Bytes32),
    Branch(Arc<Branch>),
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.root() == other.root()
    }
}
impl Eq for Node {}

impl Node {
    pub fn leaf(bytes: Bytes32) -> Self {
        Node::Leaf(bytes)
    }

    pub fn branch(left: Node, right: Node) -> Self {
        Node::Branch(Arc::new(Branch {
            left,
            right,
            hash: OnceLock::new(),
        }))
    }

    /// The canonical zero-subtree of the given depth (0 = a single zero leaf).
    pub fn zero(depth: usize) -> Self {
        if depth == 0 {
            Node::Leaf(Bytes32::zero())
        } else {
            let child = Node::zero(depth - 1);
            let hash = OnceLock::new();
            let root = match ZERO_HASHES.get(depth) {
                Some(tabulated) => Bytes32(
                    tabulated
                        .as_slice()
                        .try_into()
                        .expect("ZERO_HASHES entries are 32 bytes"),
                ),
                None => zero_hash_fallback(depth),
            };
            let _ = hash.set(root);
            Node::Branch(Arc::new(Branch {
                left: child.clone(),
                right: child,
                hash,
            }))
        }
    }

    /// This node's (memoized) Merkle root.
    pub fn root(&self) -> Bytes32 {
        match self {
            Node::Leaf(bytes) => *bytes,
            Node::Branch(branch) => *branch.hash.get_or_init(|| {
                let left = branch.left.root();
                let right = branch.right.root();
                Bytes32(hash32_concat(left.as_bytes(), right.as_bytes()))
            }),
        }
    }

    /// Builds a perfect binary tree of the given `depth` from `leaves`, zero-padding any
    /// remaining capacity. `leaves.len()` must be `<= 2^depth`.
    pub fn from_leaves(leaves: &[Bytes32], depth: usize) -> Self {
        let capacity = 1usize << depth;
        debug_assert!(leaves.len() <= capacity);

        if depth == 0 {
            return leaves
                .first()
                .copied()
                .map(Node::Leaf)
                .unwrap_or_else(|| Node::zero(0));
        }

        let half = capacity / 2;
        let (left_leaves, right_leaves) = if leaves.len() <= half {
            (leaves, &[][..])
        } else {
            leaves.split_at(half)
        };

        let left = Self::from_leaves(left_leaves, depth - 1);
        let right = if right_leaves.is_empty() && left_leaves.len() < half {
            // Entire right subtree is zero; sharing the canonical zero node avoids duplicate
            // allocation for, e.g., a near-empty `validators` list at mainnet's 2^40 capacity.
            Node::zero(depth - 1)
        } else {
            Self::from_leaves(right_leaves, depth - 1)
        };

        Node::branch(left, right)
    }

    /// Reads the subtree rooted at `index`, relative to `self` being the root of a tree of
    /// `tree_depth`.
    pub fn get(&self, index: GeneralizedIndex, tree_depth: usize) -> Result<Node, TreeError> {
        index.validate_within(tree_depth)?;
        let mut cursor = self.clone();
        for take_right in index.path_from_root(tree_depth) {
            cursor = match cursor {
                Node::Leaf(_) => return Err(TreeError::IndexOutOfRange(index.0, tree_depth)),
                Node::Branch(branch) => {
                    if take_right {
                        branch.right.clone()
                    } else {
                        branch.left.clone()
                    }
                }
            };
        }
        Ok(cursor)
    }

    /// Returns a new tree with the subtree at `index` replaced by `replacement`, sharing every
    /// node off the root-to-`index` path with `self`.
    pub fn set(
        &self,
        index: GeneralizedIndex,
        replacement: Node,
        tree_depth: usize,
    ) -> Result<Node, TreeError> {
        index.validate_within(tree_depth)?;
        Self::set_along_path(self, &index.path_from_root(tree_depth), replacement)
    }

    fn set_along_path(node: &Node, path: &[bool], replacement: Node) -> Result<Node, TreeError> {
        let Some((&take_right, rest)) = path.split_first() else {
            return Ok(replacement);
        };
        match node {
            Node::Leaf(_) => Err(TreeError::NotALeaf(0)),
            Node::Branch(branch) => {
                if take_right {
                    let new_right = Self::set_along_path(&branch.right, rest, replacement)?;
                    Ok(Node::branch(branch.left.clone(), new_right))
                } else {
                    let new_left = Self::set_along_path(&branch.left, rest, replacement)?;
                    Ok(Node::branch(new_left, branch.right.clone()))
                }
            }
        }
    }
}

/// `ethereum_hashing::ZERO_HASHES` only tabulates a bounded number of levels; depths beyond
/// that (e.g. the `2**40`-capacity validator registry) fall back to computing the chain by
/// hand. Kept separate so the common, tabulated case never pays for it.
fn zero_hash_fallback(depth: usize) -> Bytes32 {
    let tabulated_max = ZERO_HASHES.len() - 1;
    let mut current = Bytes32(
        ZERO_HASHES[tabulated_max]
            .as_slice()
            .try_into()
            .expect("ZERO_HASHES entries are 32 bytes"),
    );
    for _ in tabulated_max..depth {
        current = Bytes32(hash32_concat(current.as_bytes(), current.as_bytes()));
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(n: u8) -> Bytes32 {
        let mut b = [0u8; 32];
        b[31] = n;
        Bytes32(b)
    }

    #[test]
    fn empty_tree_root_is_zero_hash() {
        assert_eq!(Node::zero(3).root(), Node::from_leaves(&[], 3).root());
    }

    #[test]
    fn set_preserves_sibling_subtree() {
        let leaves: Vec<_> = (0..8).map(leaf).collect();
        let root = Node::from_leaves(&leaves, 3);
        let idx = GeneralizedIndex::leaf(3, 2);
        let updated = root.set(idx, Node::Leaf(leaf(99)), 3).unwrap();

        assert_ne!(root.root(), updated.root());
        // every other leaf is untouched
        for i in [0, 1, 3, 4, 5, 6, 7] {
            let gi = GeneralizedIndex::leaf(3, i);
            assert_eq!(
                root.get(gi, 3).unwrap().root(),
                updated.get(gi, 3).unwrap().root()
            );
        }
        assert_eq!(updated.get(idx, 3).unwrap().root(), leaf(99));
    }

    #[test]
    fn structurally_equal_trees_hash_equal() {
        let a = Node::from_leaves(&[leaf(1), leaf(2), leaf(3)], 2);
        let b = Node::from_leaves(&[leaf(1), leaf(2), leaf(3)], 2);
        assert_eq!(a.root(), b.root());
    }
}
