//! `process_block` (spec.md §4.E): header validation, RANDAO mixing, eth1-vote tallying, and
//! dispatch of the five block-body operation lists, plus the outer block-signature check.
//!
//! Grounded on `other_examples/f7040777_..._per_block_processing.rs.rs`'s overall shape
//! (`process_block_header` / `process_randao` / `process_eth1_data` / `process_operations` as
//! separate ordered steps feeding a shared `&mut BeaconState`), reimplemented against this
//! crate's own `BeaconStateBuilder` and the operation processors in [`crate::operations`].

use tree_hash::TreeHash;

use phase0_ssz::bls::{BlsPublicKey, BlsSignatureValue};
use phase0_ssz::Bytes32;
use phase0_types::{BeaconBlock, BeaconBlockHeader, BeaconStateBuilder, SignedBeaconBlock, SpecConfig};

use crate::committee::{get_beacon_proposer_index, get_current_epoch, get_randao_mix};
use crate::domain::{compute_signing_root, get_domain};
use crate::error::{Result, SignatureKind, StateTransitionError};
use crate::operations::{
    process_attestation, process_attester_slashing, process_deposit, process_proposer_slashing,
    process_voluntary_exit,
};

fn root_of<T: TreeHash>(value: &T) -> Bytes32 {
    Bytes32::from_slice(value.tree_hash_root().as_bytes()).expect("tree_hash_root is 32 bytes")
}

/// `process_block_header`: checks the block targets the state's current slot and the expected
/// proposer, chains from the previous header, and that proposer is not currently slashed, then
/// replaces `latest_block_header` with a stub (`state_root` zeroed — filled in by the caller
/// once this slot's post-state root is known).
fn process_block_header(builder: &mut BeaconStateBuilder, block: &BeaconBlock, config: &SpecConfig) -> Result<()> {
    let state = builder.state();
    if block.slot != state.slot {
        return Err(StateTransitionError::InvalidHeader("block slot does not match state slot"));
    }
    if block.slot.as_u64() <= state.latest_block_header.slot.as_u64() {
        return Err(StateTransitionError::InvalidHeader(
            "block slot is not ahead of the latest processed block",
        ));
    }
    let expected_proposer = get_beacon_proposer_index(state, config)?;
    if block.proposer_index != expected_proposer {
        return Err(StateTransitionError::InvalidHeader("block proposer index is incorrect"));
    }

    let expected_parent_root = root_of(&state.latest_block_header);
    if block.parent_root != expected_parent_root {
        return Err(StateTransitionError::InvalidHeader(
            "block parent root does not match the latest processed block",
        ));
    }

    let proposer = &state.validators[block.proposer_index.as_u64() as usize];
    if proposer.slashed {
        return Err(StateTransitionError::InvalidHeader("block proposer is slashed"));
    }

    builder.state_mut().latest_block_header = BeaconBlockHeader {
        slot: block.slot,
        proposer_index: block.proposer_index,
        parent_root: block.parent_root,
        state_root: Bytes32::zero(),
        body_root: root_of(&block.body),
    };
    Ok(())
}

/// `process_randao`: verifies the proposer's RANDAO reveal over the current epoch, then mixes
/// its hash into this epoch's randao slot.
fn process_randao(
    builder: &mut BeaconStateBuilder,
    block: &BeaconBlock,
    config: &SpecConfig,
    genesis_validators_root: Bytes32,
) -> Result<()> {
    let epoch = get_current_epoch(builder.state(), config);
    let proposer_pubkey = {
        let proposer = &builder.state().validators[block.proposer_index.as_u64() as usize];
        BlsPublicKey::from_bytes(&proposer.pubkey)
            .map_err(|_| StateTransitionError::InvalidHeader("invalid proposer pubkey encoding"))?
    };

    let domain = get_domain(builder.state(), config.domain_randao, Some(epoch), genesis_validators_root);
    let signing_root = compute_signing_root(&epoch, domain);

    let reveal = BlsSignatureValue::from_bytes(&block.body.randao_reveal)
        .map_err(|_| StateTransitionError::InvalidSignature(SignatureKind::Randao))?;
    if !reveal.verify(&proposer_pubkey, signing_root.as_bytes()) {
        return Err(StateTransitionError::InvalidSignature(SignatureKind::Randao));
    }

    let current_mix = get_randao_mix(builder.state(), epoch, config);
    let reveal_hash = Bytes32::from_slice(&ethereum_hashing::hash(block.body.randao_reveal.as_bytes()))
        .expect("sha256 output is 32 bytes");
    let mixed = xor32(current_mix, reveal_hash);

    let index = (epoch.as_u64() % config.epochs_per_historical_vector) as usize;
    builder.state_mut().randao_mixes[index] = mixed;
    Ok(())
}

fn xor32(a: Bytes32, b: Bytes32) -> Bytes32 {
    let mut out = [0u8; 32];
    for i in 0..32 {
        out[i] = a.as_bytes()[i] ^ b.as_bytes()[i];
    }
    Bytes32(out)
}

/// `process_eth1_data`: tallies this block's eth1 vote, adopting it as the canonical
/// `eth1_data` once it holds a strict majority of the current voting period's votes.
fn process_eth1_data(builder: &mut BeaconStateBuilder, block: &BeaconBlock, config: &SpecConfig) -> Result<()> {
    builder
        .state_mut()
        .eth1_data_votes
        .push(block.body.eth1_data.clone())
        .map_err(|_| StateTransitionError::InvalidHeader("eth1 data votes list is full"))?;

    let matching_votes = builder
        .state()
        .eth1_data_votes
        .iter()
        .filter(|vote| **vote == block.body.eth1_data)
        .count();
    if matching_votes * 2 > config.epochs_per_eth1_voting_period as usize * config.slots_per_epoch as usize {
        builder.state_mut().eth1_data = block.body.eth1_data.clone();
    }
    Ok(())
}

/// `process_operations`: the one structural cap not already enforced by a `VariableList`'s
/// compile-time bound — the number of deposits in a block must exactly match what is available
/// between `state.eth1_deposit_index` and `state.eth1_data.deposit_count` — then dispatches
/// every operation in body order.
fn process_operations(
    builder: &mut BeaconStateBuilder,
    block: &BeaconBlock,
    config: &SpecConfig,
    genesis_validators_root: Bytes32,
) -> Result<()> {
    let body = &block.body;

    let deposit_backlog = phase0_ssz::erroring_sub_u64(
        builder.state().eth1_data.deposit_count,
        builder.state().eth1_deposit_index,
    )?;
    let expected_deposits = config.max_deposits.min(deposit_backlog);
    if body.deposits.len() as u64 != expected_deposits {
        return Err(StateTransitionError::InvalidHeader(
            "deposit count does not match the eth1 deposit backlog",
        ));
    }

    for slashing in body.proposer_slashings.iter() {
        process_proposer_slashing(builder, slashing, config, genesis_validators_root)?;
    }
    for slashing in body.attester_slashings.iter() {
        process_attester_slashing(builder, slashing, config, genesis_validators_root)?;
    }
    for attestation in body.attestations.iter() {
        process_attestation(builder, attestation, config, genesis_validators_root)?;
    }
    for deposit in body.deposits.iter() {
        process_deposit(builder, deposit, config)?;
    }
    for exit in body.voluntary_exits.iter() {
        process_voluntary_exit(builder, exit, config, genesis_validators_root)?;
    }
    Ok(())
}

/// `process_block`: the four ordered per-block steps, run against a state already advanced to
/// `block.slot` by [`crate::slot_processing::process_slots`].
pub fn process_block(
    builder: &mut BeaconStateBuilder,
    block: &BeaconBlock,
    config: &SpecConfig,
    genesis_validators_root: Bytes32,
) -> Result<()> {
    process_block_header(builder, block, config)?;
    process_randao(builder, block, config, genesis_validators_root)?;
    process_eth1_data(builder, block, config)?;
    process_operations(builder, block, config, genesis_validators_root)?;
    Ok(())
}

/// Verifies a `SignedBeaconBlock`'s outer signature against the proposer named in `block.message`,
/// under the `DOMAIN_BEACON_PROPOSER` domain for the block's own slot.
pub fn verify_block_signature(
    builder: &BeaconStateBuilder,
    signed_block: &SignedBeaconBlock,
    config: &SpecConfig,
    genesis_validators_root: Bytes32,
) -> Result<()> {
    let proposer = builder
        .state()
        .validators
        .get(signed_block.message.proposer_index.as_u64() as usize)
        .ok_or(StateTransitionError::InvalidHeader("unknown block proposer index"))?;
    let pubkey = BlsPublicKey::from_bytes(&proposer.pubkey)
        .map_err(|_| StateTransitionError::InvalidHeader("invalid proposer pubkey encoding"))?;

    let epoch = crate::committee::compute_epoch_at_slot(signed_block.message.slot, config);
    let domain = get_domain(builder.state(), config.domain_beacon_proposer, Some(epoch), genesis_validators_root);
    let signing_root = compute_signing_root(&signed_block.message, domain);

    let signature = BlsSignatureValue::from_bytes(&signed_block.signature)
        .map_err(|_| StateTransitionError::InvalidSignature(SignatureKind::Block))?;
    if !signature.verify(&pubkey, signing_root.as_bytes()) {
        return Err(StateTransitionError::InvalidSignature(SignatureKind::Block));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xor32_is_its_own_inverse() {
        let a = Bytes32([0xAA; 32]);
        let b = Bytes32([0x55; 32]);
        let mixed = xor32(a, b);
        assert_eq!(xor32(mixed, b), a);
    }
}
