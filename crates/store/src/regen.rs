//! State regeneration (spec.md §4.F): given a target block whose state is not currently
//! materialized, find the nearest stored ancestor state and replay the state-transition function
//! forward block-by-block using a [`BlockProvider`] for the bodies in between.

use phase0_ssz::Bytes32;
use phase0_state_transition::transition;
use phase0_types::{BeaconState, SignedBeaconBlock, SpecConfig};

use crate::block_provider::BlockProvider;
use crate::error::{Result, StoreError};

/// Replays `ancestry` (ordered oldest-first, each entry a block to apply) on top of
/// `ancestor_state`, re-fetching each block's body from `provider`. Signatures are not
/// re-verified: every block in `ancestry` was already accepted by `transition` once, at import
/// time, and state regeneration is a pure replay of that same deterministic computation.
pub fn regenerate_from_ancestry(
    mut state: BeaconState,
    ancestry: &[Bytes32],
    provider: &dyn BlockProvider,
    config: &SpecConfig,
    genesis_validators_root: Bytes32,
) -> Result<BeaconState> {
    for block_root in ancestry {
        let signed_block = provider_get(provider, block_root)?;
        state = transition(&state, &signed_block, config, genesis_validators_root, false)
            .map_err(|source| StoreError::Regeneration {
                root: *block_root,
                source,
            })?;
    }
    Ok(state)
}

fn provider_get(provider: &dyn BlockProvider, block_root: &Bytes32) -> Result<SignedBeaconBlock> {
    provider.get(block_root).ok_or(StoreError::UnknownBlock(*block_root))
}
