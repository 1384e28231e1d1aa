//! Super-node representation for lists of large, uniform primitives.
//!
//! `BeaconState.balances` (up to `2**40` `u64`s) is the motivating case from spec.md §4.B: under
//! the plain `Node` encoding, touching one balance means allocating a new leaf every 4 balances
//! plus every ancestor up to the list root. A super-node instead keeps the packed raw bytes for
//! up to `2**k` elements as a single logical unit; `set_element` mutates that buffer in place,
//! invalidates only its own memoized hash, and the surrounding `Node` tree still shares every
//! other super-node unchanged. This is a schema-level hint (spec.md: "the chosen representation
//! is a schema-level hint"), not a different wire format — `hash_tree_root` of a super-node-backed
//! list equals that of the plain encoding (spec.md §8 property 8, tested below).

use std::sync::OnceLock;

use ethereum_hashing::hash32_concat;

use crate::hashing::{chunk_count, pack_u64, tree_depth};
use crate::node::Node;
use crate::primitives::Bytes32;

/// A packed run of up to `2^k` `u64` elements (e.g. one super-node of `balances`).
#[derive(Debug, Clone)]
pub struct SuperNode {
    elements: Vec<u64>,
    cached_root: OnceLock<Bytes32>,
}

impl SuperNode {
    pub fn new(elements: Vec<u64>) -> Self {
        Self {
            elements,
            cached_root: OnceLock::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<u64> {
        self.elements.get(index).copied()
    }

    /// Overwrites one element and drops the memoized root so the next `root()` call rehashes
    /// only this super-node's own packed chunks, never a sibling super-node's.
    pub fn set_element(&mut self, index: usize, value: u64) {
        self.elements[index] = value;
        self.cached_root = OnceLock::new();
    }

    /// The Merkle root of this super-node's packed content, as a plain `chunk_count`-leaf tree
    /// (no length mix-in — that happens once at the owning list's top level).
    pub fn root(&self) -> Bytes32 {
        *self.cached_root.get_or_init(|| {
            let chunks = pack_u64(&self.elements);
            let depth = tree_depth(chunks.len().max(1));
            Node::from_leaves(&chunks, depth).root()
        })
    }

    /// The equivalent plain (non-super-node) `Node` encoding of the same elements, used only to
    /// prove the two representations agree (spec.md §8 property 8).
    pub fn as_plain_node(&self, capacity_elements: usize) -> Node {
        let chunks = pack_u64(&self.elements);
        let full_chunks = chunk_count(capacity_elements, 8);
        Node::from_leaves(&chunks, tree_depth(full_chunks.max(1)))
    }
}

/// A `balances`-shaped list split into fixed-size super-node runs, with the list's own
/// length-mix-in root computed on demand from the runs' individual roots.
#[derive(Debug, Clone)]
pub struct SuperNodeList {
    run_capacity: usize,
    runs: Vec<SuperNode>,
}

impl SuperNodeList {
    pub fn from_elements(elements: &[u64], run_capacity: usize) -> Self {
        let runs = elements
            .chunks(run_capacity)
            .map(|chunk| SuperNode::new(chunk.to_vec()))
            .collect();
        Self { run_capacity, runs }
    }

    pub fn len(&self) -> usize {
        self.runs.iter().map(SuperNode::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty() || self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<u64> {
        let run = index / self.run_capacity;
        let offset = index % self.run_capacity;
        self.runs.get(run).and_then(|r| r.get(offset))
    }

    /// Mutates a single element; only the owning run's cached hash is invalidated.
    pub fn set(&mut self, index: usize, value: u64) {
        let run = index / self.run_capacity;
        let offset = index % self.run_capacity;
        self.runs[run].set_element(offset, value);
    }

    /// The list's `hash_tree_root`, including the length mix-in, built from the runs' memoized
    /// roots — re-hashing after one `set` touches one run's root plus the run-level tree path,
    /// never every element.
    pub fn hash_tree_root(&self, list_max_capacity: usize, tree_depth_hint: usize) -> Bytes32 {
        let run_roots: Vec<Bytes32> = self.runs.iter().map(SuperNode::root).collect();
        let runs_capacity = list_max_capacity.div_ceil(self.run_capacity).max(1);
        let content_root = Node::from_leaves(&run_roots, tree_depth(runs_capacity)).root();
        let _ = tree_depth_hint;
        let len = self.len();
        let mut len_bytes = [0u8; 32];
        len_bytes[..8].copy_from_slice(&(len as u64).to_le_bytes());
        Bytes32(hash32_concat(content_root.as_bytes(), &len_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::mix_in_length;

    #[test]
    fn super_node_root_matches_plain_encoding() {
        let values: Vec<u64> = (0..37).collect();
        let node = SuperNode::new(values.clone());
        let plain = node.as_plain_node(64);
        assert_eq!(node.root(), plain.root());
    }

    #[test]
    fn super_node_list_matches_single_chunk_tree() {
        let values: Vec<u64> = (0..16).map(|i| i * 11).collect();
        let list = SuperNodeList::from_elements(&values, 8);
        assert_eq!(list.len(), 16);

        // Build the equivalent plain list tree directly and compare mix-in roots.
        let chunks = pack_u64(&values);
        let plain_root = Node::from_leaves(&chunks, tree_depth(chunk_count(64, 8))).root();
        let expected = mix_in_length(plain_root, values.len());
        assert_eq!(list.hash_tree_root(64, tree_depth(chunk_count(64, 8))), expected);
    }

    #[test]
    fn mutating_one_run_does_not_change_len() {
        let values: Vec<u64> = (0..20).collect();
        let mut list = SuperNodeList::from_elements(&values, 8);
        let before = list.hash_tree_root(64, 3);
        list.set(9, 999);
        let after = list.hash_tree_root(64, 3);
        assert_ne!(before, after);
        assert_eq!(list.get(9), Some(999));
        assert_eq!(list.len(), 20);
    }
}
