//! `ChainUpdater` (spec.md §2 data-flow, §4.G): the orchestrator tying slot-clock ticks and
//! inbound blocks/attestations to the state-transition function, the chain store and fork choice.
//!
//! Grounded on `other_examples/fdc7a6d7_michaelsproul-lighthouse__beacon_node-beacon_chain-src-
//! beacon_fork_choice_store.rs.rs`'s "store and fork choice as two collaborators driven from one
//! call site" shape, generalized from a read-only proxy into the full import path: fetch parent
//! state, run `transition`, commit, feed fork choice, recompute head.

use phase0_fork_choice::ForkChoice;
use phase0_ssz::{Bytes32, Gwei, Slot};
use phase0_state_transition::{committee, operations, transition};
use phase0_store::{BlockProvider, CheckpointKind, Store, StoredCheckpoint};
use phase0_types::{BeaconState, SignedBeaconBlock, SpecConfig};

use crate::cancellation::CancellationToken;
use crate::clock::Clock;
use crate::error::{NodeError, Result};
use crate::events::{Event, EventSink};

/// Ties the store, fork choice and a slot clock together behind a small async surface whose only
/// suspension points are store reads/writes and `BlockProvider::get`, per spec.md §5. `transition`
/// and proto-array scoring stay synchronous pure functions underneath; `tokio::task::yield_now`
/// marks the documented suspension points without requiring either collaborator to be made async.
pub struct ChainUpdater<C: Clock, E: EventSink> {
    store: Store,
    fork_choice: ForkChoice,
    config: SpecConfig,
    genesis_validators_root: Bytes32,
    clock: C,
    events: E,
    cancellation: CancellationToken,
}

impl<C: Clock, E: EventSink> ChainUpdater<C, E> {
    pub fn new(
        store: Store,
        fork_choice: ForkChoice,
        config: SpecConfig,
        genesis_validators_root: Bytes32,
        clock: C,
        events: E,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            store,
            fork_choice,
            config,
            genesis_validators_root,
            clock,
            events,
            cancellation,
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Imports a new signed block: fetches the parent state (possibly regenerating it), runs the
    /// state-transition function, commits the resulting block/state/checkpoints atomically, feeds
    /// the block and its attestations to fork choice, and only then asks for and emits the new
    /// canonical head — the ordering spec.md §5 calls "store and fork-choice agree" before a
    /// `head_update` event fires.
    pub async fn import_block(
        &mut self,
        signed_block: SignedBeaconBlock,
        provider: &dyn BlockProvider,
        verify_signatures: bool,
    ) -> Result<Bytes32> {
        if self.cancellation.is_cancelled() {
            return Err(NodeError::Cancelled);
        }

        let parent_root = signed_block.message.parent_root;
        let slot = signed_block.message.slot;

        tokio::task::yield_now().await;
        let parent_state = self.store.state_for_block(parent_root, provider)?;

        let post_state = transition(
            &parent_state,
            &signed_block,
            &self.config,
            self.genesis_validators_root,
            verify_signatures,
        )?;

        let block_root = block_root_of(&signed_block);
        let state_root = state_root_of(&post_state);

        let justified_epoch = post_state.current_justified_checkpoint.epoch;
        let finalized_checkpoint = post_state.finalized_checkpoint;

        let mut txn = self.store.begin_transaction();
        txn.put_block(block_root, Some(parent_root), signed_block.clone());
        txn.put_state(state_root, block_root, post_state.clone());

        let finalization_advanced = self
            .store
            .checkpoint(CheckpointKind::Finalized)
            .map(|current| finalized_checkpoint.epoch.as_u64() > current.epoch.as_u64())
            .unwrap_or(true);
        if finalization_advanced {
            txn.set_checkpoint(
                CheckpointKind::Finalized,
                StoredCheckpoint {
                    block_root: finalized_checkpoint.root,
                    epoch: finalized_checkpoint.epoch,
                },
            );
        }

        tokio::task::yield_now().await;
        self.store.commit(txn)?;

        if finalization_advanced {
            self.events.emit(Event::Finalized {
                checkpoint: StoredCheckpoint {
                    block_root: finalized_checkpoint.root,
                    epoch: finalized_checkpoint.epoch,
                },
            });
        }

        self.fork_choice.on_block(
            slot,
            block_root,
            parent_root,
            state_root,
            justified_epoch,
            finalized_checkpoint.epoch,
        )?;
        self.apply_attestations_to_fork_choice(&post_state, &signed_block, slot)?;

        let active_indices = committee::get_active_validator_indices(&post_state, committee::get_current_epoch(&post_state, &self.config));
        let justified_balances: Vec<Gwei> = active_indices
            .iter()
            .map(|&index| post_state.balances.get(index.as_u64() as usize).copied().unwrap_or(Gwei::new(0)))
            .collect();
        self.fork_choice
            .cache_justified_balances(post_state.current_justified_checkpoint.root, justified_balances.clone());
        self.fork_choice
            .compute_and_apply_deltas(&justified_balances, justified_epoch, finalized_checkpoint.epoch)?;

        if finalization_advanced {
            self.fork_choice.prune(finalized_checkpoint.root)?;
        }

        let head = self.fork_choice.get_head(self.clock.now_slot())?;
        self.events.emit(Event::HeadUpdate { head, slot });

        Ok(head)
    }

    /// Feeds every attestation in a block's body to fork choice, deriving each one's attesting
    /// validator indices against the post-block state's committee assignments. `current_slot`
    /// decides whether fork choice queues or immediately applies the resulting vote, per
    /// `ForkChoice::on_attestation`'s queuing rule.
    fn apply_attestations_to_fork_choice(
        &mut self,
        post_state: &BeaconState,
        signed_block: &SignedBeaconBlock,
        current_slot: Slot,
    ) -> Result<()> {
        let builder = post_state.clone().to_builder();
        for attestation in signed_block.message.body.attestations.iter() {
            let indexed = operations::get_indexed_attestation(&builder, attestation, &self.config)?;
            self.fork_choice.on_attestation(
                current_slot,
                attestation.data.slot,
                attestation.data.beacon_block_root,
                attestation.data.target.epoch,
                indexed.attesting_indices.iter().copied().collect(),
            );
        }
        Ok(())
    }

    /// Drives the attestation-queue drain and head recomputation for a slot boundary with no new
    /// block, emitting a `SlotTick` event.
    pub async fn on_slot_tick(&mut self, slot: Slot) -> Result<Bytes32> {
        if self.cancellation.is_cancelled() {
            return Err(NodeError::Cancelled);
        }
        tokio::task::yield_now().await;
        let head = self.fork_choice.get_head(slot)?;
        self.events.emit(Event::SlotTick { slot });
        Ok(head)
    }
}

fn block_root_of(block: &SignedBeaconBlock) -> Bytes32 {
    use tree_hash::TreeHash;
    Bytes32::from_slice(block.message.tree_hash_root().as_bytes()).expect("tree_hash_root is 32 bytes")
}

fn state_root_of(state: &BeaconState) -> Bytes32 {
    use tree_hash::TreeHash;
    Bytes32::from_slice(state.tree_hash_root().as_bytes()).expect("tree_hash_root is 32 bytes")
}
