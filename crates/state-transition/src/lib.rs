//! `phase0-state-transition`: the deterministic per-slot/per-block pure function advancing a
//! `BeaconState`, per spec.md §4.E.
//!
//! [`transition`] is the sole public entry point; it is the composition the consensus-spec calls
//! `state_transition` — advance slots up to the block's own slot (running `process_epoch` at any
//! crossed epoch boundary), then apply the block's header/RANDAO/eth1/operations in order.
//! Grounded on `per_slot_processing.rs`'s slot-then-epoch loop and `block_processing.rs`'s
//! ordered per-kind operation dispatch, both from the retrieval pack's consensus-client sources.

pub mod block_processing;
pub mod committee;
pub mod domain;
pub mod epoch_processing;
pub mod error;
pub mod operations;
pub mod rewards;
pub mod slot_processing;
pub mod validator_registry;

use phase0_ssz::Bytes32;
use phase0_types::{BeaconState, SignedBeaconBlock, SpecConfig};

pub use error::{OperationKind, Result, SignatureKind, StateTransitionError};

#[cfg(test)]
mod test_utils;

/// Advances `pre_state` by `signed_block`: `process_slots` up to (not including) the block's own
/// slot, then `process_block`. Pure and total over well-typed inputs — no wall-clock, no global
/// mutable state, per spec.md's determinism contract. Caller decides whether `verify_signatures`
/// is `true` (normal block import) or `false` (replaying already-verified blocks during state
/// regeneration, where re-checking BLS signatures would be pure waste).
///
/// `post_state.latest_block_header.state_root` stays zeroed on return — `process_block_header`
/// sets it to zero per spec.md §4.E step 1, and only the *next* slot's `process_slots` step 2
/// backfills it once that root is actually known. Filling it in here would make `state_roots`
/// diverge from the canonical per-slot caching order.
pub fn transition(
    pre_state: &BeaconState,
    signed_block: &SignedBeaconBlock,
    config: &SpecConfig,
    genesis_validators_root: Bytes32,
    verify_signatures: bool,
) -> Result<BeaconState> {
    let mut state = pre_state.clone();
    slot_processing::process_slots(&mut state, signed_block.message.slot, config)?;

    let mut builder = state.to_builder();
    if verify_signatures {
        block_processing::verify_block_signature(&builder, signed_block, config, genesis_validators_root)?;
    }
    block_processing::process_block(&mut builder, &signed_block.message, config, genesis_validators_root)?;
    let post_state = builder.commit();

    Ok(post_state)
}
