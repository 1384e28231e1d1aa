//! The stateful wrapper around [`ProtoArray`]: queued attestations, vote tracking, balance
//! snapshots and persistence — the parts spec.md §3.4 adds on top of the bare index tree.
//!
//! Grounded on the retrieval pack's `ForkChoice<T, E>` wrapper (`on_block`/`on_attestation`/
//! `get_head`/`update_time`/`to_persisted`) layered over `ProtoArrayForkChoice`.

use std::collections::HashMap;

use phase0_ssz::{Bytes32, Epoch, Gwei, Slot, ValidatorIndex};
use serde::{Deserialize, Serialize};

use crate::balances_cache::BalancesCache;
use crate::error::ForkChoiceError;
use crate::proto_array::ProtoArray;

/// The latest attestation seen from each validator (spec.md §3.5's `votes` table, owned here
/// since fork-choice is the sole consumer).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoteTracker {
    pub current_root: Bytes32,
    pub next_root: Bytes32,
    pub next_epoch: Epoch,
}

impl Default for VoteTracker {
    fn default() -> Self {
        Self {
            current_root: Bytes32::zero(),
            next_root: Bytes32::zero(),
            next_epoch: Epoch::new(0),
        }
    }
}

/// An attestation not yet applied to the proto-array, queued per spec.md §3.4: "attestations for
/// the current slot are queued and only applied once their slot is in the past" (the FFG rule
/// that an attestation only affects *subsequent*-slot fork choice).
#[derive(Debug, Clone)]
pub struct QueuedAttestation {
    pub attestation_slot: Slot,
    pub block_root: Bytes32,
    pub target_epoch: Epoch,
    pub attesting_indices: Vec<ValidatorIndex>,
}

#[derive(Debug, Clone)]
pub struct ForkChoice {
    proto_array: ProtoArray,
    votes: Vec<VoteTracker>,
    queued_attestations: Vec<QueuedAttestation>,
    balances_cache: BalancesCache,
    justified_root: Bytes32,
    finalized_root: Bytes32,
}

impl ForkChoice {
    /// Seeds fork choice from a genesis (or weak-subjectivity) anchor: a single root that is
    /// simultaneously justified and finalized, per the genesis/anchor convention in
    /// `get_forkchoice_store(anchor)`.
    pub fn from_anchor(
        anchor_root: Bytes32,
        anchor_state_root: Bytes32,
        anchor_slot: Slot,
        anchor_epoch: Epoch,
        prune_threshold: usize,
    ) -> Result<Self, ForkChoiceError> {
        let mut proto_array = ProtoArray::new(prune_threshold, anchor_epoch, anchor_epoch);
        proto_array.on_block(
            anchor_slot,
            anchor_root,
            None,
            anchor_state_root,
            anchor_epoch,
            anchor_epoch,
        )?;

        Ok(Self {
            proto_array,
            votes: Vec::new(),
            queued_attestations: Vec::new(),
            balances_cache: BalancesCache::default(),
            justified_root: anchor_root,
            finalized_root: anchor_root,
        })
    }

    pub fn contains_block(&self, root: &Bytes32) -> bool {
        self.proto_array.contains_block(root)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn on_block(
        &mut self,
        slot: Slot,
        root: Bytes32,
        parent_root: Bytes32,
        state_root: Bytes32,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
    ) -> Result<(), ForkChoiceError> {
        self.proto_array
            .on_block(slot, root, Some(parent_root), state_root, justified_epoch, finalized_epoch)
    }

    /// Queues an attestation if its slot has not yet passed relative to `current_slot`;
    /// otherwise applies it to the vote table immediately.
    pub fn on_attestation(
        &mut self,
        current_slot: Slot,
        attestation_slot: Slot,
        block_root: Bytes32,
        target_epoch: Epoch,
        attesting_indices: Vec<ValidatorIndex>,
    ) {
        if attestation_slot.as_u64() >= current_slot.as_u64() {
            self.queued_attestations.push(QueuedAttestation {
                attestation_slot,
                block_root,
                target_epoch,
                attesting_indices,
            });
        } else {
            self.apply_vote(block_root, target_epoch, &attesting_indices);
        }
    }

    /// Drains every queued attestation whose slot is now in the past relative to `current_slot`,
    /// applying each to the vote table.
    pub fn update_time(&mut self, current_slot: Slot) {
        let (ready, pending): (Vec<_>, Vec<_>) = self
            .queued_attestations
            .drain(..)
            .partition(|a| a.attestation_slot.as_u64() < current_slot.as_u64());
        self.queued_attestations = pending;
        for attestation in ready {
            self.apply_vote(
                attestation.block_root,
                attestation.target_epoch,
                &attestation.attesting_indices,
            );
        }
    }

    fn apply_vote(&mut self, block_root: Bytes32, target_epoch: Epoch, attesting_indices: &[ValidatorIndex]) {
        for &index in attesting_indices {
            let i = index.as_u64() as usize;
            if self.votes.len() <= i {
                self.votes.resize(i + 1, VoteTracker::default());
            }
            let vote = &mut self.votes[i];
            if target_epoch.as_u64() > vote.next_epoch.as_u64() || vote.next_root == Bytes32::zero() {
                vote.next_root = block_root;
                vote.next_epoch = target_epoch;
            }
        }
    }

    /// Moves every validator's `next_root` into `current_root` and computes the per-node weight
    /// delta this induces (old vote subtracts its balance from its old root's subtree, new vote
    /// adds it to the new root's), then applies it via [`ProtoArray::apply_score_changes`].
    pub fn compute_and_apply_deltas(
        &mut self,
        justified_balances: &[Gwei],
        new_justified_epoch: Epoch,
        new_finalized_epoch: Epoch,
    ) -> Result<(), ForkChoiceError> {
        let mut deltas = vec![0i64; self.proto_array.len()];

        for (validator_index, vote) in self.votes.iter_mut().enumerate() {
            let balance = justified_balances
                .get(validator_index)
                .copied()
                .unwrap_or(Gwei::new(0))
                .as_u64() as i64;

            if vote.current_root != vote.next_root || balance != 0 {
                if let Some(&old_index) = self.proto_array.indices.get(&vote.current_root) {
                    deltas[old_index] = deltas[old_index].saturating_sub(balance);
                }
                if let Some(&new_index) = self.proto_array.indices.get(&vote.next_root) {
                    deltas[new_index] = deltas[new_index].saturating_add(balance);
                }
                vote.current_root = vote.next_root;
            }
        }

        self.proto_array
            .apply_score_changes(deltas, new_justified_epoch, new_finalized_epoch)
    }

    /// Drains the attestation queue for `current_slot`, then returns the current canonical head.
    pub fn get_head(&mut self, current_slot: Slot) -> Result<Bytes32, ForkChoiceError> {
        self.update_time(current_slot);
        self.proto_array.find_head(&self.justified_root)
    }

    pub fn set_justified_root(&mut self, root: Bytes32) {
        self.justified_root = root;
    }

    pub fn justified_root(&self) -> Bytes32 {
        self.justified_root
    }

    pub fn finalized_root(&self) -> Bytes32 {
        self.finalized_root
    }

    pub fn cache_justified_balances(&mut self, block_root: Bytes32, balances: Vec<Gwei>) {
        self.balances_cache.insert(block_root, balances);
    }

    pub fn cached_justified_balances(&self, block_root: &Bytes32) -> Option<&[Gwei]> {
        self.balances_cache.get(block_root)
    }

    /// Prunes the proto-array at the new finalized root and records it as the new finalization
    /// point.
    pub fn prune(&mut self, finalized_root: Bytes32) -> Result<(), ForkChoiceError> {
        self.proto_array.maybe_prune(finalized_root)?;
        self.finalized_root = finalized_root;
        Ok(())
    }

    /// Serializes enough state to resume fork-choice after a restart without replaying history.
    pub fn to_persisted(&self) -> PersistedForkChoice {
        PersistedForkChoice {
            proto_array: self.proto_array.clone(),
            votes: self.votes.clone(),
            justified_root: self.justified_root,
            finalized_root: self.finalized_root,
        }
    }

    pub fn from_persisted(persisted: PersistedForkChoice) -> Self {
        Self {
            proto_array: persisted.proto_array,
            votes: persisted.votes,
            queued_attestations: Vec::new(),
            balances_cache: BalancesCache::default(),
            justified_root: persisted.justified_root,
            finalized_root: persisted.finalized_root,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedForkChoice {
    pub proto_array: ProtoArray,
    pub votes: Vec<VoteTracker>,
    pub justified_root: Bytes32,
    pub finalized_root: Bytes32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(byte: u8) -> Bytes32 {
        let mut b = [0u8; 32];
        b[31] = byte;
        Bytes32::from(b)
    }

    fn setup() -> ForkChoice {
        let mut fc = ForkChoice::from_anchor(root(1), root(1), Slot::new(0), Epoch::new(0), usize::MAX).unwrap();
        fc.on_block(Slot::new(1), root(2), root(1), root(2), Epoch::new(0), Epoch::new(0))
            .unwrap();
        fc.on_block(Slot::new(1), root(3), root(1), root(3), Epoch::new(0), Epoch::new(0))
            .unwrap();
        fc
    }

    #[test]
    fn attestation_for_future_slot_is_queued() {
        let mut fc = setup();
        fc.on_attestation(Slot::new(1), Slot::new(1), root(2), Epoch::new(1), vec![ValidatorIndex::new(0)]);
        assert_eq!(fc.queued_attestations.len(), 1);
        assert_eq!(fc.votes.len(), 0);
    }

    #[test]
    fn update_time_drains_past_slot_attestations() {
        let mut fc = setup();
        fc.on_attestation(Slot::new(1), Slot::new(1), root(2), Epoch::new(1), vec![ValidatorIndex::new(0)]);
        fc.update_time(Slot::new(2));
        assert!(fc.queued_attestations.is_empty());
        assert_eq!(fc.votes[0].next_root, root(2));
    }

    #[test]
    fn heavier_branch_wins_head_after_deltas() {
        let mut fc = setup();
        fc.on_attestation(Slot::new(1), Slot::new(1), root(3), Epoch::new(1), vec![ValidatorIndex::new(0)]);
        fc.update_time(Slot::new(2));
        fc.compute_and_apply_deltas(&[Gwei::new(32_000_000_000)], Epoch::new(0), Epoch::new(0))
            .unwrap();
        assert_eq!(fc.get_head(Slot::new(2)).unwrap(), root(3));
    }

    #[test]
    fn persisted_round_trip_preserves_head() {
        let mut fc = setup();
        fc.on_attestation(Slot::new(1), Slot::new(1), root(3), Epoch::new(1), vec![ValidatorIndex::new(0)]);
        fc.update_time(Slot::new(2));
        fc.compute_and_apply_deltas(&[Gwei::new(32_000_000_000)], Epoch::new(0), Epoch::new(0))
            .unwrap();
        let head_before = fc.get_head(Slot::new(2)).unwrap();

        let persisted = fc.to_persisted();
        let mut restored = ForkChoice::from_persisted(persisted);
        assert_eq!(restored.get_head(Slot::new(2)).unwrap(), head_before);
    }
}
