//! `StoreTransaction` (spec.md §4.F): accumulates a batch of store mutations that
//! [`crate::store::Store::commit`] applies atomically, or that the caller can simply drop to
//! discard (a rollback) without ever touching the store.

use std::collections::HashMap;

use phase0_ssz::{Bytes32, Slot, ValidatorIndex};
use phase0_types::{BeaconState, SignedBeaconBlock};

use crate::tables::{CheckpointKind, StoredCheckpoint, VoteRecord};

#[derive(Debug, Clone)]
pub(crate) struct PendingBlock {
    pub slot: Slot,
    pub parent_root: Option<Bytes32>,
    pub block: SignedBeaconBlock,
}

#[derive(Debug, Clone)]
pub(crate) struct PendingState {
    pub block_root: Bytes32,
    pub slot: Slot,
    pub state: BeaconState,
}

/// A batch of pending writes. Nothing in `self` is visible to readers of the [`Store`](crate::store::Store)
/// until [`Store::commit`](crate::store::Store::commit) consumes it; dropping it without
/// committing is the rollback spec.md §4.F describes.
#[derive(Debug, Default)]
pub struct StoreTransaction {
    pub(crate) new_blocks: HashMap<Bytes32, PendingBlock>,
    pub(crate) new_states: HashMap<Bytes32, PendingState>,
    pub(crate) hot_deletions: Vec<Bytes32>,
    pub(crate) checkpoint_updates: HashMap<CheckpointKind, StoredCheckpoint>,
    pub(crate) vote_updates: HashMap<ValidatorIndex, VoteRecord>,
}

impl StoreTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new (or updated) block, keyed by its own root.
    pub fn put_block(&mut self, block_root: Bytes32, parent_root: Option<Bytes32>, block: SignedBeaconBlock) {
        let slot = block.message.slot;
        self.new_blocks.insert(
            block_root,
            PendingBlock {
                slot,
                parent_root,
                block,
            },
        );
    }

    /// Records a new (or updated) materialized state belonging to `block_root`, keyed by the
    /// state's own root.
    pub fn put_state(&mut self, state_root: Bytes32, block_root: Bytes32, state: BeaconState) {
        let slot = state.slot;
        self.new_states.insert(
            state_root,
            PendingState {
                block_root,
                slot,
                state,
            },
        );
    }

    pub fn delete_hot(&mut self, block_root: Bytes32) {
        self.hot_deletions.push(block_root);
    }

    pub fn set_checkpoint(&mut self, kind: CheckpointKind, checkpoint: StoredCheckpoint) {
        self.checkpoint_updates.insert(kind, checkpoint);
    }

    pub fn set_vote(&mut self, validator_index: ValidatorIndex, vote: VoteRecord) {
        self.vote_updates.insert(validator_index, vote);
    }

    pub fn is_empty(&self) -> bool {
        self.new_blocks.is_empty()
            && self.new_states.is_empty()
            && self.hot_deletions.is_empty()
            && self.checkpoint_updates.is_empty()
            && self.vote_updates.is_empty()
    }
}
