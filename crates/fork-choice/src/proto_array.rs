//! The proto-array index tree: LMD-GHOST head selection with FFG viability filtering.
//!
//! Grounded on the retrieval pack's `fork_choice.rs`/`ProtoArrayForkChoice` lineage (lighthouse's
//! `proto_array` crate) for the overall shape — `ProtoNode`/`ProtoArray`, children-before-parent
//! delta propagation, best-child/best-descendant bookkeeping — reimplemented here against this
//! crate's own `Bytes32`/`Epoch`/`Slot` primitives instead of lighthouse's `types` crate.

use std::collections::HashMap;

use phase0_ssz::{Bytes32, Epoch, Slot};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};

use crate::error::ForkChoiceError;

/// One block in the candidate tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct ProtoNode {
    pub slot: Slot,
    pub state_root: Bytes32,
    pub block_root: Bytes32,
    /// `u32::MAX` sentinel for "no parent" (SSZ has no native `Option`).
    parent_index_raw: u32,
    pub justified_epoch: Epoch,
    pub finalized_epoch: Epoch,
    pub weight: i64,
    best_child_index_raw: u32,
    best_descendant_index_raw: u32,
}

const NONE_INDEX: u32 = u32::MAX;

fn to_raw(index: Option<usize>) -> u32 {
    index.map(|i| i as u32).unwrap_or(NONE_INDEX)
}

fn from_raw(raw: u32) -> Option<usize> {
    if raw == NONE_INDEX {
        None
    } else {
        Some(raw as usize)
    }
}

impl ProtoNode {
    pub fn parent_index(&self) -> Option<usize> {
        from_raw(self.parent_index_raw)
    }

    pub fn best_child_index(&self) -> Option<usize> {
        from_raw(self.best_child_index_raw)
    }

    pub fn best_descendant_index(&self) -> Option<usize> {
        from_raw(self.best_descendant_index_raw)
    }
}

/// An index-based DAG of candidate blocks; ancestors always sit at lower indices than their
/// descendants (spec.md §3.4 invariant iii), which is what lets [`ProtoArray::apply_score_changes`]
/// propagate deltas in a single reverse pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtoArray {
    pub prune_threshold: usize,
    pub justified_epoch: Epoch,
    pub finalized_epoch: Epoch,
    pub nodes: Vec<ProtoNode>,
    pub indices: HashMap<Bytes32, usize>,
}

impl ProtoArray {
    pub fn new(prune_threshold: usize, justified_epoch: Epoch, finalized_epoch: Epoch) -> Self {
        Self {
            prune_threshold,
            justified_epoch,
            finalized_epoch,
            nodes: Vec::new(),
            indices: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains_block(&self, root: &Bytes32) -> bool {
        self.indices.contains_key(root)
    }

    pub fn get_node(&self, root: &Bytes32) -> Option<&ProtoNode> {
        self.indices.get(root).map(|&i| &self.nodes[i])
    }

    /// Idempotent: a no-op if `root` is already present. Appends a new node and updates the
    /// parent's best-child/best-descendant pointers.
    #[allow(clippy::too_many_arguments)]
    pub fn on_block(
        &mut self,
        slot: Slot,
        root: Bytes32,
        parent_root: Option<Bytes32>,
        state_root: Bytes32,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
    ) -> Result<(), ForkChoiceError> {
        if self.indices.contains_key(&root) {
            return Ok(());
        }

        let parent_index = match parent_root {
            Some(parent_root) => Some(
                *self
                    .indices
                    .get(&parent_root)
                    .ok_or(ForkChoiceError::MissingParent(parent_root))?,
            ),
            None => None,
        };

        let node_index = self.nodes.len();
        let node = ProtoNode {
            slot,
            state_root,
            block_root: root,
            parent_index_raw: to_raw(parent_index),
            justified_epoch,
            finalized_epoch,
            weight: 0,
            best_child_index_raw: NONE_INDEX,
            best_descendant_index_raw: NONE_INDEX,
        };

        self.indices.insert(root, node_index);
        self.nodes.push(node);

        if let Some(parent_index) = parent_index {
            self.maybe_update_best_child_and_descendant(parent_index, node_index)?;
        }

        Ok(())
    }

    /// Descends the `best_descendant_index` chain from `justified_root`; fails if the resulting
    /// head is not viable under the current justified/finalized epochs.
    pub fn find_head(&self, justified_root: &Bytes32) -> Result<Bytes32, ForkChoiceError> {
        let justified_index = *self
            .indices
            .get(justified_root)
            .ok_or(ForkChoiceError::MissingProtoArrayBlock(*justified_root))?;
        let justified_node = &self.nodes[justified_index];

        let best_index = justified_node.best_descendant_index().unwrap_or(justified_index);
        let best_node = self
            .nodes
            .get(best_index)
            .ok_or(ForkChoiceError::Invariant("best_descendant_index out of range"))?;

        if !self.node_is_viable_for_head(best_node) {
            return Err(ForkChoiceError::NotViableHead(*justified_root));
        }

        Ok(best_node.block_root)
    }

    /// Applies per-node weight deltas from highest index to lowest — every child is processed
    /// (and its delta folded into its parent's) before its parent is, since parents always sit
    /// at lower indices. A second pass would be wrong here: folding the best-child decision into
    /// the same reverse walk means each parent sees its children's *final* weights.
    pub fn apply_score_changes(
        &mut self,
        mut deltas: Vec<i64>,
        new_justified_epoch: Epoch,
        new_finalized_epoch: Epoch,
    ) -> Result<(), ForkChoiceError> {
        if deltas.len() != self.nodes.len() {
            return Err(ForkChoiceError::InvalidDeltaLength {
                given: deltas.len(),
                expected: self.nodes.len(),
            });
        }

        self.justified_epoch = new_justified_epoch;
        self.finalized_epoch = new_finalized_epoch;

        for node_index in (0..self.nodes.len()).rev() {
            let node_delta = deltas[node_index];
            let node = &mut self.nodes[node_index];
            node.weight = node.weight.saturating_add(node_delta);

            if let Some(parent_index) = node.parent_index() {
                if node_delta != 0 {
                    deltas[parent_index] = deltas[parent_index].saturating_add(node_delta);
                }
                self.maybe_update_best_child_and_descendant(parent_index, node_index)?;
            }
        }

        Ok(())
    }

    /// Removes every node with index below `finalized_root`'s index, once that index reaches
    /// `prune_threshold`. Remaining indices are shifted down by the amount pruned; the new root
    /// (the finalized node itself) has its parent severed since its ancestor is gone.
    pub fn maybe_prune(&mut self, finalized_root: Bytes32) -> Result<(), ForkChoiceError> {
        let finalized_index = *self
            .indices
            .get(&finalized_root)
            .ok_or(ForkChoiceError::MissingProtoArrayBlock(finalized_root))?;

        if finalized_index < self.prune_threshold {
            return Ok(());
        }

        for node in &self.nodes[..finalized_index] {
            self.indices.remove(&node.block_root);
        }
        self.nodes.drain(..finalized_index);

        for (_, index) in self.indices.iter_mut() {
            *index -= finalized_index;
        }

        for node in &mut self.nodes {
            if let Some(parent) = node.parent_index() {
                node.parent_index_raw = to_raw(parent.checked_sub(finalized_index));
            }
            if let Some(best_child) = node.best_child_index() {
                node.best_child_index_raw = to_raw(Some(best_child - finalized_index));
            }
            if let Some(best_descendant) = node.best_descendant_index() {
                node.best_descendant_index_raw = to_raw(Some(best_descendant - finalized_index));
            }
        }

        if let Some(root) = self.nodes.first_mut() {
            root.parent_index_raw = NONE_INDEX;
        }

        Ok(())
    }

    fn node_is_viable_for_head(&self, node: &ProtoNode) -> bool {
        (node.justified_epoch == self.justified_epoch || self.justified_epoch.as_u64() == 0)
            && (node.finalized_epoch == self.finalized_epoch || self.finalized_epoch.as_u64() == 0)
    }

    fn node_leads_to_viable_head(&self, node: &ProtoNode) -> bool {
        match node.best_descendant_index() {
            Some(best_descendant_index) => {
                match self.nodes.get(best_descendant_index) {
                    Some(best_descendant) => self.node_is_viable_for_head(best_descendant),
                    None => false,
                }
            }
            None => self.node_is_viable_for_head(node),
        }
    }

    /// The best-child rule: higher weight wins; equal weight is broken by the lexicographically
    /// greater root (spec.md §4.D tie-break).
    fn maybe_update_best_child_and_descendant(
        &mut self,
        parent_index: usize,
        child_index: usize,
    ) -> Result<(), ForkChoiceError> {
        let child_leads_to_viable_head = self.node_leads_to_viable_head(&self.nodes[child_index]);

        enum Change {
            ChangeToChild,
            RemoveChild,
            UpdateDescendantOnly,
            Keep,
        }

        let change = match self.nodes[parent_index].best_child_index() {
            None => Change::ChangeToChild,
            Some(best_child_index) if best_child_index == child_index => {
                if child_leads_to_viable_head {
                    Change::UpdateDescendantOnly
                } else {
                    Change::RemoveChild
                }
            }
            Some(best_child_index) => {
                let best_child = &self.nodes[best_child_index];
                let best_child_leads_to_viable_head = self.node_leads_to_viable_head(best_child);

                if child_leads_to_viable_head && !best_child_leads_to_viable_head {
                    Change::ChangeToChild
                } else if !child_leads_to_viable_head && best_child_leads_to_viable_head {
                    Change::Keep
                } else {
                    let child = &self.nodes[child_index];
                    let best_child = &self.nodes[best_child_index];
                    if child.weight == best_child.weight {
                        if child.block_root > best_child.block_root {
                            Change::ChangeToChild
                        } else {
                            Change::Keep
                        }
                    } else if child.weight > best_child.weight {
                        Change::ChangeToChild
                    } else {
                        Change::Keep
                    }
                }
            }
        };

        match change {
            Change::ChangeToChild => {
                let descendant = self.nodes[child_index]
                    .best_descendant_index()
                    .unwrap_or(child_index);
                self.nodes[parent_index].best_child_index_raw = to_raw(Some(child_index));
                self.nodes[parent_index].best_descendant_index_raw = to_raw(Some(descendant));
            }
            Change::RemoveChild => {
                self.nodes[parent_index].best_child_index_raw = NONE_INDEX;
                self.nodes[parent_index].best_descendant_index_raw = NONE_INDEX;
            }
            Change::UpdateDescendantOnly => {
                let descendant = self.nodes[child_index]
                    .best_descendant_index()
                    .unwrap_or(child_index);
                self.nodes[parent_index].best_descendant_index_raw = to_raw(Some(descendant));
            }
            Change::Keep => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(byte: u8) -> Bytes32 {
        let mut b = [0u8; 32];
        b[31] = byte;
        Bytes32::from(b)
    }

    fn array() -> ProtoArray {
        ProtoArray::new(usize::MAX, Epoch::new(0), Epoch::new(0))
    }

    #[test]
    fn on_block_is_idempotent() {
        let mut pa = array();
        pa.on_block(Slot::new(0), root(1), None, root(1), Epoch::new(0), Epoch::new(0))
            .unwrap();
        pa.on_block(Slot::new(0), root(1), None, root(1), Epoch::new(0), Epoch::new(0))
            .unwrap();
        assert_eq!(pa.len(), 1);
    }

    #[test]
    fn find_head_prefers_heavier_branch() {
        let mut pa = array();
        pa.on_block(Slot::new(0), root(1), None, root(1), Epoch::new(0), Epoch::new(0))
            .unwrap();
        pa.on_block(Slot::new(1), root(2), Some(root(1)), root(2), Epoch::new(0), Epoch::new(0))
            .unwrap();
        pa.on_block(Slot::new(1), root(3), Some(root(1)), root(3), Epoch::new(0), Epoch::new(0))
            .unwrap();

        // give root(3) more weight
        pa.apply_score_changes(vec![0, 0, 10], Epoch::new(0), Epoch::new(0)).unwrap();
        assert_eq!(pa.find_head(&root(1)).unwrap(), root(3));
    }

    #[test]
    fn reorg_after_score_change() {
        let mut pa = array();
        pa.on_block(Slot::new(0), root(1), None, root(1), Epoch::new(0), Epoch::new(0))
            .unwrap();
        pa.on_block(Slot::new(1), root(2), Some(root(1)), root(2), Epoch::new(0), Epoch::new(0))
            .unwrap();
        pa.on_block(Slot::new(1), root(3), Some(root(1)), root(3), Epoch::new(0), Epoch::new(0))
            .unwrap();
        pa.on_block(Slot::new(2), root(4), Some(root(3)), root(4), Epoch::new(0), Epoch::new(0))
            .unwrap();

        pa.apply_score_changes(vec![0, 5, 0, 0], Epoch::new(0), Epoch::new(0)).unwrap();
        assert_eq!(pa.find_head(&root(1)).unwrap(), root(2));

        // root(4)'s branch becomes heavier than root(2)
        pa.apply_score_changes(vec![0, 0, 0, 20], Epoch::new(0), Epoch::new(0)).unwrap();
        assert_eq!(pa.find_head(&root(1)).unwrap(), root(4));
    }

    #[test]
    fn maybe_prune_removes_every_node_below_the_finalized_index() {
        // root(1)=0 <- root(2)=1 <- root(3)=2 <- root(4)=3, a single chain.
        let mut pa = array();
        pa.prune_threshold = 0;
        pa.on_block(Slot::new(0), root(1), None, root(1), Epoch::new(0), Epoch::new(0))
            .unwrap();
        pa.on_block(Slot::new(1), root(2), Some(root(1)), root(2), Epoch::new(0), Epoch::new(0))
            .unwrap();
        pa.on_block(Slot::new(2), root(3), Some(root(2)), root(3), Epoch::new(0), Epoch::new(0))
            .unwrap();
        pa.on_block(Slot::new(3), root(4), Some(root(3)), root(4), Epoch::new(0), Epoch::new(0))
            .unwrap();

        pa.apply_score_changes(vec![0, 0, 0, 0], Epoch::new(0), Epoch::new(0)).unwrap();
        // root(3) sits at index 2 >= prune_threshold (0), so finalizing it drops every node at a
        // lower index (root(1), root(2)); root(3) and root(4) survive, re-indexed and with
        // root(3)'s own parent link severed since its ancestor is gone.
        pa.maybe_prune(root(3)).unwrap();

        assert!(!pa.contains_block(&root(1)));
        assert!(!pa.contains_block(&root(2)));
        assert!(pa.contains_block(&root(3)));
        assert!(pa.contains_block(&root(4)));

        let new_root_index = *pa.indices.get(&root(3)).unwrap();
        assert_eq!(pa.get_node(&root(3)).unwrap().parent_index(), None);
        assert_eq!(pa.get_node(&root(4)).unwrap().parent_index(), Some(new_root_index));
    }

    #[test]
    fn viability_rejects_mismatched_justified_epoch() {
        let mut pa = ProtoArray::new(usize::MAX, Epoch::new(2), Epoch::new(0));
        pa.on_block(Slot::new(0), root(1), None, root(1), Epoch::new(2), Epoch::new(0))
            .unwrap();
        pa.on_block(Slot::new(1), root(2), Some(root(1)), root(2), Epoch::new(1), Epoch::new(0))
            .unwrap();
        pa.apply_score_changes(vec![0, 0], Epoch::new(2), Epoch::new(0)).unwrap();
        // root(2) has the wrong justified epoch, so the best descendant of root(1) stays root(1).
        assert_eq!(pa.find_head(&root(1)).unwrap(), root(1));
    }
}
