//! `Store` (spec.md §3.5, §4.F): the hot/cold chain database. Non-finalized candidates and at
//! least one state per candidate live in the hot set; everything at or before the finalized
//! checkpoint migrates to the cold archive on [`Store::commit`].
//!
//! Grounded on `beacon_fork_choice_store.rs`'s `get_forkchoice_store(anchor)` for the genesis
//! anchor convention (justified == finalized == the anchor checkpoint) and on
//! `partial_beacon_state.rs`'s "some state fields lazily loaded from separate storage" design,
//! generalized here to whole materialized-or-not *states* rather than individual vector fields.

use std::collections::HashMap;

use ssz::{Decode, Encode};
use tree_hash::TreeHash;

use phase0_ssz::{Bytes32, Epoch, Slot, ValidatorIndex};
use phase0_state_transition::committee::compute_epoch_at_slot;
use phase0_types::{BeaconState, SignedBeaconBlock, SpecConfig};

use crate::block_provider::BlockProvider;
use crate::error::{Result, StoreError};
use crate::regen::regenerate_from_ancestry;
use crate::tables::{BlobStore, BlockRecord, CheckpointKind, StateRecord, StorageMode, StoredCheckpoint, VoteRecord};
use crate::transaction::StoreTransaction;

fn block_root_of(block: &SignedBeaconBlock) -> Bytes32 {
    Bytes32::from_slice(block.message.tree_hash_root().as_bytes()).expect("tree_hash_root is 32 bytes")
}

fn state_root_of(state: &BeaconState) -> Bytes32 {
    Bytes32::from_slice(state.tree_hash_root().as_bytes()).expect("tree_hash_root is 32 bytes")
}

pub struct Store {
    pub config: SpecConfig,
    pub genesis_validators_root: Bytes32,
    storage_mode: StorageMode,

    hot_blocks: HashMap<Bytes32, BlockRecord>,
    hot_states: HashMap<Bytes32, StateRecord>,
    /// The most recently known state root for a given block root, hot or cold.
    state_root_of_block: HashMap<Bytes32, Bytes32>,

    cold_blocks: HashMap<Bytes32, BlockRecord>,
    cold_states: HashMap<Bytes32, StateRecord>,

    blobs: BlobStore,
    checkpoints: HashMap<CheckpointKind, StoredCheckpoint>,
    votes: HashMap<ValidatorIndex, VoteRecord>,
}

impl Store {
    /// Builds the genesis hot/cold entry: a single block+state, both finalized and justified at
    /// the genesis epoch, per spec.md §3.5's lifecycle description.
    pub fn from_genesis(mut genesis_state: BeaconState, config: SpecConfig, storage_mode: StorageMode) -> (Self, Bytes32) {
        let genesis_state_root = state_root_of(&genesis_state);
        if genesis_state.latest_block_header.state_root == Bytes32::zero() {
            genesis_state.latest_block_header.state_root = genesis_state_root;
        }
        let genesis_root =
            Bytes32::from_slice(genesis_state.latest_block_header.tree_hash_root().as_bytes())
                .expect("tree_hash_root is 32 bytes");

        let mut store = Self {
            genesis_validators_root: genesis_state.genesis_validators_root,
            config,
            storage_mode,
            hot_blocks: HashMap::new(),
            hot_states: HashMap::new(),
            state_root_of_block: HashMap::new(),
            cold_blocks: HashMap::new(),
            cold_states: HashMap::new(),
            blobs: BlobStore::default(),
            checkpoints: HashMap::new(),
            votes: HashMap::new(),
        };

        store.blobs.put(genesis_state_root, genesis_state.as_ssz_bytes());
        store.cold_blocks.insert(
            genesis_root,
            BlockRecord {
                slot: genesis_state.slot,
                parent_root: None,
                finalized: true,
                blob_id: genesis_root,
            },
        );
        store.cold_states.insert(
            genesis_state_root,
            StateRecord {
                block_root: genesis_root,
                slot: genesis_state.slot,
                blob_id: Some(genesis_state_root),
            },
        );
        store.state_root_of_block.insert(genesis_root, genesis_state_root);

        let genesis_epoch = compute_epoch_at_slot(genesis_state.slot, &store.config);
        let anchor = StoredCheckpoint {
            block_root: genesis_root,
            epoch: genesis_epoch,
        };
        store.checkpoints.insert(CheckpointKind::Justified, anchor);
        store.checkpoints.insert(CheckpointKind::BestJustified, anchor);
        store.checkpoints.insert(CheckpointKind::Finalized, anchor);

        (store, genesis_root)
    }

    pub fn begin_transaction(&self) -> StoreTransaction {
        StoreTransaction::new()
    }

    pub fn contains_block(&self, root: &Bytes32) -> bool {
        self.hot_blocks.contains_key(root) || self.cold_blocks.contains_key(root)
    }

    pub fn block_record(&self, root: &Bytes32) -> Option<&BlockRecord> {
        self.hot_blocks.get(root).or_else(|| self.cold_blocks.get(root))
    }

    pub fn checkpoint(&self, kind: CheckpointKind) -> Option<StoredCheckpoint> {
        self.checkpoints.get(&kind).copied()
    }

    pub fn vote(&self, validator_index: ValidatorIndex) -> Option<VoteRecord> {
        self.votes.get(&validator_index).copied()
    }

    /// Fetches a full signed block by root, searching the hot set and then the blob store
    /// directly (every committed block keeps its body blob regardless of finalization).
    pub fn block(&self, root: &Bytes32) -> Result<SignedBeaconBlock> {
        let record = self.block_record(root).ok_or(StoreError::UnknownBlock(*root))?;
        let bytes = self.blobs.get(&record.blob_id).ok_or(StoreError::UnknownBlock(*root))?;
        SignedBeaconBlock::from_ssz_bytes(bytes).map_err(|_| StoreError::Corrupt("block blob failed to decode"))
    }

    fn materialized_state(&self, state_root: &Bytes32) -> Option<BeaconState> {
        let record = self.hot_states.get(state_root).or_else(|| self.cold_states.get(state_root))?;
        let blob_id = record.blob_id?;
        let bytes = self.blobs.get(&blob_id)?;
        BeaconState::from_ssz_bytes(bytes).ok()
    }

    /// Returns the state belonging to `block_root`, materializing it via STF replay from the
    /// nearest stored ancestor state if it is only "known, not materialized".
    pub fn state_for_block(&self, block_root: Bytes32, provider: &dyn BlockProvider) -> Result<BeaconState> {
        if let Some(state_root) = self.state_root_of_block.get(&block_root) {
            if let Some(state) = self.materialized_state(state_root) {
                return Ok(state);
            }
        }

        let (ancestor_root, mut ancestry) = self.nearest_materialized_ancestor(block_root)?;
        ancestry.reverse();
        let ancestor_state_root = self
            .state_root_of_block
            .get(&ancestor_root)
            .ok_or(StoreError::UnknownState(ancestor_root))?;
        let ancestor_state = self
            .materialized_state(ancestor_state_root)
            .ok_or(StoreError::UnknownState(*ancestor_state_root))?;

        regenerate_from_ancestry(
            ancestor_state,
            &ancestry,
            provider,
            &self.config,
            self.genesis_validators_root,
        )
    }

    /// Walks parent pointers from `block_root` back to the nearest ancestor (inclusive of
    /// `block_root` itself if it already has a materialized state) whose state is materialized.
    /// Returns the ancestor root and the chain of descendant roots (nearest-first) to replay.
    fn nearest_materialized_ancestor(&self, block_root: Bytes32) -> Result<(Bytes32, Vec<Bytes32>)> {
        let mut chain = Vec::new();
        let mut cursor = block_root;
        loop {
            if let Some(state_root) = self.state_root_of_block.get(&cursor) {
                if self.materialized_state(state_root).is_some() {
                    return Ok((cursor, chain));
                }
            }
            chain.push(cursor);
            let record = self.block_record(&cursor).ok_or(StoreError::UnknownBlock(cursor))?;
            cursor = record.parent_root.ok_or(StoreError::Corrupt("reached root block without a materialized state"))?;
        }
    }

    /// Applies a transaction atomically: new blocks/states land in the hot set, deletions are
    /// removed, and a `Finalized` checkpoint update triggers the hot-to-cold migration before any
    /// of the other updates are considered committed.
    pub fn commit(&mut self, txn: StoreTransaction) -> Result<()> {
        for (root, pending) in &txn.new_blocks {
            self.blobs.put(*root, pending.block.as_ssz_bytes());
            self.hot_blocks.insert(
                *root,
                BlockRecord {
                    slot: pending.slot,
                    parent_root: pending.parent_root,
                    finalized: false,
                    blob_id: *root,
                },
            );
        }

        for (state_root, pending) in &txn.new_states {
            self.blobs.put(*state_root, pending.state.as_ssz_bytes());
            self.hot_states.insert(
                *state_root,
                StateRecord {
                    block_root: pending.block_root,
                    slot: pending.slot,
                    blob_id: Some(*state_root),
                },
            );
            self.state_root_of_block.insert(pending.block_root, *state_root);
        }

        for (validator_index, vote) in &txn.vote_updates {
            self.votes.insert(*validator_index, *vote);
        }

        for (kind, checkpoint) in &txn.checkpoint_updates {
            if *kind == CheckpointKind::Finalized {
                let current = self.checkpoints.get(&CheckpointKind::Finalized).copied();
                if let Some(current) = current {
                    if checkpoint.epoch.as_u64() < current.epoch.as_u64() {
                        tracing::error!(
                            current_epoch = current.epoch.as_u64(),
                            new_epoch = checkpoint.epoch.as_u64(),
                            "refusing to finalize an epoch behind the current finalized checkpoint"
                        );
                        return Err(StoreError::Conflict {
                            current_epoch: current.epoch.as_u64(),
                            new_epoch: checkpoint.epoch.as_u64(),
                        });
                    }
                    if checkpoint.epoch.as_u64() > current.epoch.as_u64() {
                        tracing::debug!(
                            from_epoch = current.epoch.as_u64(),
                            to_epoch = checkpoint.epoch.as_u64(),
                            "finalization advancing, migrating ancestry to the cold archive"
                        );
                        self.finalize(*checkpoint)?;
                    }
                } else {
                    self.finalize(*checkpoint)?;
                }
            }
            self.checkpoints.insert(*kind, *checkpoint);
        }

        for root in &txn.hot_deletions {
            self.evict_hot(root);
        }

        Ok(())
    }

    fn evict_hot(&mut self, root: &Bytes32) {
        if let Some(record) = self.hot_blocks.remove(root) {
            if !record.finalized {
                self.blobs.remove(&record.blob_id);
            }
        }
        if let Some(state_root) = self.state_root_of_block.get(root).copied() {
            if self.hot_states.remove(&state_root).is_some() {
                self.blobs.remove(&state_root);
            }
        }
    }

    /// Migrates the ancestry of a newly-finalized block from hot to cold, per spec.md §4.F:
    /// collect the chain back to the previous finalized ancestor, materialize and archive each
    /// state, then prune every hot block at or before the finalized slot that the chain does not
    /// contain.
    fn finalize(&mut self, new_finalized: StoredCheckpoint) -> Result<()> {
        let new_root = new_finalized.block_root;
        if self.cold_blocks.contains_key(&new_root) {
            return Ok(());
        }

        let mut chain = Vec::new();
        let mut cursor = new_root;
        loop {
            if self.cold_blocks.contains_key(&cursor) {
                break;
            }
            let record = self.hot_blocks.get(&cursor).cloned().ok_or(StoreError::UnknownBlock(cursor))?;
            chain.push((cursor, record));
            cursor = match cursor_parent(&chain) {
                Some(parent) => parent,
                None => break,
            };
        }
        chain.reverse();

        let finalized_slot = self
            .block_record(&new_root)
            .map(|r| r.slot.as_u64())
            .ok_or(StoreError::UnknownBlock(new_root))?;

        let mut keep: std::collections::HashSet<Bytes32> = std::collections::HashSet::new();
        for (root, mut record) in chain {
            record.finalized = true;
            keep.insert(root);

            let state = self.materialize_for_finalization(root, &record)?;
            let state_root = state_root_of(&state);
            self.state_root_of_block.insert(root, state_root);

            let archive = match self.storage_mode {
                StorageMode::Archive { state_storage_frequency } => {
                    root == new_root || record.slot.as_u64() % state_storage_frequency.max(1) == 0
                }
                StorageMode::Prune => root == new_root,
            };

            if archive {
                self.blobs.put(state_root, state.as_ssz_bytes());
                self.cold_states.insert(
                    state_root,
                    StateRecord {
                        block_root: root,
                        slot: record.slot,
                        blob_id: Some(state_root),
                    },
                );
            } else {
                self.cold_states.insert(
                    state_root,
                    StateRecord {
                        block_root: root,
                        slot: record.slot,
                        blob_id: None,
                    },
                );
            }

            self.hot_blocks.remove(&root);
            self.cold_blocks.insert(root, record);
        }

        let stale: Vec<Bytes32> = self
            .hot_blocks
            .iter()
            .filter(|(root, record)| record.slot.as_u64() <= finalized_slot && !keep.contains(*root))
            .map(|(root, _)| *root)
            .collect();
        for root in stale {
            self.evict_hot(&root);
        }

        Ok(())
    }

    fn materialize_for_finalization(&self, root: Bytes32, _record: &BlockRecord) -> Result<BeaconState> {
        if let Some(state_root) = self.state_root_of_block.get(&root) {
            if let Some(state) = self.materialized_state(state_root) {
                return Ok(state);
            }
        }
        let provider = HotBlockProvider { store: self };
        self.state_for_block(root, &provider)
    }
}

fn cursor_parent(chain: &[(Bytes32, BlockRecord)]) -> Option<Bytes32> {
    chain.last().and_then(|(_, record)| record.parent_root)
}

/// Adapts the store's own hot block bodies (which are always kept, regardless of whether their
/// state is materialized) to a [`BlockProvider`] for use during regeneration.
struct HotBlockProvider<'a> {
    store: &'a Store,
}

impl<'a> BlockProvider for HotBlockProvider<'a> {
    fn get(&self, block_root: &Bytes32) -> Option<SignedBeaconBlock> {
        self.store.block(block_root).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phase0_types::containers::*;
    use ssz_types::VariableList;

    fn zero_validator(balance: u64) -> Validator {
        Validator {
            pubkey: Default::default(),
            withdrawal_credentials: Bytes32::zero(),
            effective_balance: phase0_ssz::Gwei::new(balance),
            slashed: false,
            activation_eligibility_epoch: Epoch::new(0),
            activation_epoch: Epoch::new(0),
            exit_epoch: phase0_ssz::FAR_FUTURE_EPOCH,
            withdrawable_epoch: phase0_ssz::FAR_FUTURE_EPOCH,
        }
    }

    fn genesis_state(config: &SpecConfig) -> BeaconState {
        BeaconState {
            genesis_time: 0,
            genesis_validators_root: Bytes32::zero(),
            slot: Slot::new(0),
            fork: Fork {
                previous_version: Default::default(),
                current_version: Default::default(),
                epoch: Epoch::new(0),
            },
            latest_block_header: BeaconBlockHeader {
                slot: Slot::new(0),
                proposer_index: ValidatorIndex::new(0),
                parent_root: Bytes32::zero(),
                state_root: Bytes32::zero(),
                body_root: Bytes32::zero(),
            },
            block_roots: Default::default(),
            state_roots: Default::default(),
            historical_roots: VariableList::empty(),
            eth1_data: Eth1Data {
                deposit_root: Bytes32::zero(),
                deposit_count: 1,
                block_hash: Bytes32::zero(),
            },
            eth1_data_votes: VariableList::empty(),
            eth1_deposit_index: 1,
            validators: VariableList::new(vec![zero_validator(config.max_effective_balance.as_u64())]).unwrap(),
            balances: VariableList::new(vec![config.max_effective_balance]).unwrap(),
            randao_mixes: Default::default(),
            slashings: Default::default(),
            previous_epoch_attestations: VariableList::empty(),
            current_epoch_attestations: VariableList::empty(),
            justification_bits: Default::default(),
            previous_justified_checkpoint: Checkpoint {
                epoch: Epoch::new(0),
                root: Bytes32::zero(),
            },
            current_justified_checkpoint: Checkpoint {
                epoch: Epoch::new(0),
                root: Bytes32::zero(),
            },
            finalized_checkpoint: Checkpoint {
                epoch: Epoch::new(0),
                root: Bytes32::zero(),
            },
        }
    }

    #[test]
    fn from_genesis_seeds_a_single_finalized_entry() {
        let config = SpecConfig::minimal();
        let (store, genesis_root) = Store::from_genesis(genesis_state(&config), config, StorageMode::Prune);
        assert!(store.contains_block(&genesis_root));
        assert_eq!(store.checkpoint(CheckpointKind::Finalized).unwrap().block_root, genesis_root);
        assert!(store.block(&genesis_root).is_err(), "genesis has no signed-block body, only a state");
    }

    #[test]
    fn commit_adds_a_hot_block_and_state() {
        let config = SpecConfig::minimal();
        let (mut store, genesis_root) = Store::from_genesis(genesis_state(&config), config, StorageMode::Prune);

        let mut block = sample_signed_block(genesis_root);
        block.message.slot = Slot::new(1);
        let root = block_root_of(&block);

        let mut txn = store.begin_transaction();
        txn.put_block(root, Some(genesis_root), block);
        store.commit(txn).unwrap();

        assert!(store.contains_block(&root));
        assert!(!store.cold_blocks.contains_key(&root));
    }

    fn sample_signed_block(parent_root: Bytes32) -> SignedBeaconBlock {
        SignedBeaconBlock {
            message: BeaconBlock {
                slot: Slot::new(1),
                proposer_index: ValidatorIndex::new(0),
                parent_root,
                state_root: Bytes32::zero(),
                body: BeaconBlockBody {
                    randao_reveal: Default::default(),
                    eth1_data: Eth1Data {
                        deposit_root: Bytes32::zero(),
                        deposit_count: 1,
                        block_hash: Bytes32::zero(),
                    },
                    graffiti: Bytes32::zero(),
                    proposer_slashings: VariableList::empty(),
                    attester_slashings: VariableList::empty(),
                    attestations: VariableList::empty(),
                    deposits: VariableList::empty(),
                    voluntary_exits: VariableList::empty(),
                },
            },
            signature: Default::default(),
        }
    }
}
