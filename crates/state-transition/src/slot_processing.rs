//! `process_slots`: advances a state to (but not including) `target_slot`, caching the state
//! root of every slot it passes through and running `process_epoch` at epoch boundaries.

use tree_hash::TreeHash;

use phase0_ssz::{Bytes32, Slot};
use phase0_types::{BeaconState, SpecConfig};

use crate::epoch_processing::process_epoch;
use crate::error::{Result, StateTransitionError};

fn state_root_bytes32(state: &BeaconState) -> Bytes32 {
    Bytes32::from_slice(state.tree_hash_root().as_bytes()).expect("tree_hash_root is 32 bytes")
}

pub fn process_slots(state: &mut BeaconState, target_slot: Slot, config: &SpecConfig) -> Result<()> {
    if target_slot.as_u64() <= state.slot.as_u64() {
        return Err(StateTransitionError::SlotNotAhead {
            current: state.slot.as_u64(),
            requested: target_slot.as_u64(),
        });
    }

    while state.slot.as_u64() < target_slot.as_u64() {
        process_slot(state, config)?;

        let next_slot = state.slot.checked_add(1)?;
        let crosses_epoch_boundary =
            (next_slot.as_u64() % config.slots_per_epoch) == 0;
        if crosses_epoch_boundary {
            process_epoch(state, config)?;
        }
        state.slot = next_slot;
    }

    Ok(())
}

/// Caches this slot's state root and, on the very first slot after genesis, backfills
/// `latest_block_header.state_root` so the header can be hashed by the next block's proposer.
fn process_slot(state: &mut BeaconState, config: &SpecConfig) -> Result<()> {
    let state_root = state_root_bytes32(state);
    let index = (state.slot.as_u64() % config.slots_per_historical_root) as usize;
    state.state_roots[index] = state_root;

    if state.latest_block_header.state_root == Bytes32::zero() {
        state.latest_block_header.state_root = state_root;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::minimal_genesis_state;

    #[test]
    fn process_slots_advances_slot_and_caches_state_root() {
        let config = SpecConfig::minimal();
        let mut state = minimal_genesis_state(&config, 8);
        process_slots(&mut state, Slot::new(3), &config).unwrap();
        assert_eq!(state.slot.as_u64(), 3);
        assert_ne!(state.state_roots[0], Bytes32::zero());
    }

    #[test]
    fn process_slots_rejects_non_advancing_target() {
        let config = SpecConfig::minimal();
        let mut state = minimal_genesis_state(&config, 8);
        state.slot = Slot::new(5);
        assert!(process_slots(&mut state, Slot::new(5), &config).is_err());
    }

    #[test]
    fn process_slots_runs_epoch_processing_at_boundary() {
        let config = SpecConfig::minimal();
        let mut state = minimal_genesis_state(&config, 8);
        let target = Slot::new(config.slots_per_epoch + 1);
        process_slots(&mut state, target, &config).unwrap();
        assert_eq!(state.previous_justified_checkpoint.epoch.as_u64(), 0);
    }
}
