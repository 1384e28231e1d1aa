//! Block-operation processors (spec.md §4.E): proposer slashings, attester slashings,
//! attestations, deposits and voluntary exits, plus the shared predicates
//! (`is_slashable_attestation_data`, `get_indexed_attestation`, `is_valid_indexed_attestation`,
//! `is_valid_merkle_branch`) they build on.
//!
//! Grounded on the consensus-spec phase0 operation-processing pseudocode and on
//! `other_examples/f7040777_..._per_block_processing.rs.rs`'s overall processor shape
//! (one function per operation kind, threaded through a mutable state and a `VerifySignatures`
//! switch collapsed here into always-verify, since this crate has no "trusted replay" mode).

use ssz_types::VariableList;
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash as DeriveTreeHash;

use ssz_derive::{Decode, Encode};

use phase0_ssz::bls::{BlsPublicKey, BlsSignatureValue};
use phase0_ssz::{Bytes32, ValidatorIndex, FAR_FUTURE_EPOCH};
use phase0_types::{
    AttestationData, AttesterSlashing, BeaconStateBuilder, Deposit, IndexedAttestation,
    PendingAttestation, ProposerSlashing, SignedVoluntaryExit, SpecConfig,
};

use crate::committee::{
    compute_epoch_at_slot, get_beacon_committee, get_beacon_proposer_index,
    get_committee_count_per_slot, get_current_epoch, get_previous_epoch, is_active_validator,
    is_slashable_validator,
};
use crate::domain::{compute_deposit_domain, compute_signing_root, get_domain};
use crate::error::{OperationKind, Result, SignatureKind, StateTransitionError};
use crate::validator_registry::{
    add_validator_to_registry, get_validator_index_by_pubkey, initiate_validator_exit,
    slash_validator,
};

/// `DepositMessage`: `DepositData` without its signature, the container whose root is what a
/// deposit signature actually covers.
#[derive(Debug, Clone, Encode, Decode, DeriveTreeHash)]
struct DepositMessage {
    pubkey: phase0_types::containers::BlsPublicKey,
    withdrawal_credentials: phase0_types::containers::WithdrawalCredentials,
    amount: phase0_ssz::Gwei,
}

/// `DEPOSIT_CONTRACT_TREE_DEPTH + 1`, matching `phase0_types::eth_spec::DepositProofDepth`.
const DEPOSIT_PROOF_DEPTH: usize = 33;

fn invalid(kind: OperationKind, reason: &'static str) -> StateTransitionError {
    StateTransitionError::InvalidOperation { kind, reason }
}

/// Two attestation data values are slashable if they are a double vote (same target, different
/// data) or a surround vote (one's source/target interval strictly contains the other's).
pub fn is_slashable_attestation_data(a: &AttestationData, b: &AttestationData) -> bool {
    let double_vote = a != b && a.target.epoch == b.target.epoch;
    let surround_vote =
        a.source.epoch.as_u64() < b.source.epoch.as_u64() && b.target.epoch.as_u64() < a.target.epoch.as_u64();
    double_vote || surround_vote
}

/// The committee-ordered validator indices a `PendingAttestation`/`Attestation`'s bitfield marks.
fn attesting_committee_indices(
    builder: &BeaconStateBuilder,
    data: &AttestationData,
    aggregation_bits: &ssz_types::BitList<phase0_types::eth_spec::MaxValidatorsPerCommittee>,
    config: &SpecConfig,
) -> Result<Vec<ValidatorIndex>> {
    let committee = get_beacon_committee(builder.state(), data.slot, data.index.as_u64(), config)?;
    if committee.len() != aggregation_bits.len() {
        return Err(invalid(
            OperationKind::Attestation,
            "aggregation bits length does not match committee size",
        ));
    }
    Ok(committee
        .into_iter()
        .enumerate()
        .filter(|(i, _)| aggregation_bits.get(*i).unwrap_or(false))
        .map(|(_, index)| index)
        .collect())
}

pub fn get_indexed_attestation(
    builder: &BeaconStateBuilder,
    attestation: &phase0_types::Attestation,
    config: &SpecConfig,
) -> Result<IndexedAttestation> {
    let mut indices =
        attesting_committee_indices(builder, &attestation.data, &attestation.aggregation_bits, config)?;
    indices.sort_by_key(|i| i.as_u64());

    Ok(IndexedAttestation {
        attesting_indices: VariableList::new(indices).map_err(|_| {
            invalid(
                OperationKind::Attestation,
                "attesting indices exceed committee capacity",
            )
        })?,
        data: attestation.data.clone(),
        signature: attestation.signature,
    })
}

/// Verifies an `IndexedAttestation`'s invariants (non-empty, sorted, unique) and its aggregate
/// BLS signature over `compute_signing_root(data, domain)`.
pub fn is_valid_indexed_attestation(
    builder: &BeaconStateBuilder,
    indexed: &IndexedAttestation,
    config: &SpecConfig,
    genesis_validators_root: Bytes32,
) -> Result<()> {
    let indices = &indexed.attesting_indices;
    if indices.is_empty() {
        return Err(invalid(OperationKind::Attestation, "no attesting indices"));
    }
    if !indices.windows(2).all(|w| w[0].as_u64() < w[1].as_u64()) {
        return Err(invalid(
            OperationKind::Attestation,
            "attesting indices are not sorted and unique",
        ));
    }

    let pubkeys: Vec<BlsPublicKey> = indices
        .iter()
        .map(|&index| {
            let validator = builder
                .state()
                .validators
                .get(index.as_u64() as usize)
                .ok_or(invalid(OperationKind::Attestation, "attesting index out of range"))?;
            BlsPublicKey::from_bytes(&validator.pubkey)
                .map_err(|_| invalid(OperationKind::Attestation, "invalid attester pubkey encoding"))
        })
        .collect::<Result<_>>()?;
    let pubkey_refs: Vec<&BlsPublicKey> = pubkeys.iter().collect();

    let domain = get_domain(
        builder.state(),
        config.domain_beacon_attester,
        Some(indexed.data.target.epoch),
        genesis_validators_root,
    );
    let signing_root = compute_signing_root(&indexed.data, domain);

    let signature = BlsSignatureValue::from_bytes(&indexed.signature)
        .map_err(|_| StateTransitionError::InvalidSignature(SignatureKind::Attestation))?;
    if !signature.verify_fast_aggregate(&pubkey_refs, signing_root.as_bytes()) {
        return Err(StateTransitionError::InvalidSignature(SignatureKind::Attestation));
    }
    Ok(())
}

/// `process_attestation`: validates slot/committee bookkeeping, appends a `PendingAttestation`
/// to the relevant epoch's rolling list, then checks the aggregate signature.
pub fn process_attestation(
    builder: &mut BeaconStateBuilder,
    attestation: &phase0_types::Attestation,
    config: &SpecConfig,
    genesis_validators_root: Bytes32,
) -> Result<()> {
    let data = &attestation.data;
    let state_slot = builder.state().slot.as_u64();

    if data.slot.as_u64() + config.min_attestation_inclusion_delay > state_slot
        || state_slot > data.slot.as_u64() + config.slots_per_epoch
    {
        return Err(invalid(OperationKind::Attestation, "attestation slot out of range"));
    }

    let epoch = compute_epoch_at_slot(data.slot, config);
    let current_epoch = get_current_epoch(builder.state(), config);
    let previous_epoch = get_previous_epoch(builder.state(), config);
    if epoch != data.target.epoch || (epoch != current_epoch && epoch != previous_epoch) {
        return Err(invalid(OperationKind::Attestation, "attestation targets wrong epoch"));
    }

    let committee_count = get_committee_count_per_slot(builder.state(), epoch, config);
    if data.index.as_u64() >= committee_count {
        return Err(invalid(OperationKind::Attestation, "committee index out of range"));
    }

    let expected_source = if data.target.epoch == current_epoch {
        builder.state().current_justified_checkpoint
    } else {
        builder.state().previous_justified_checkpoint
    };
    if data.source != expected_source {
        return Err(invalid(OperationKind::Attestation, "FFG source does not match justified checkpoint"));
    }

    let proposer_index = get_beacon_proposer_index(builder.state(), config)?;
    let pending = PendingAttestation {
        aggregation_bits: attestation.aggregation_bits.clone(),
        data: data.clone(),
        inclusion_delay: phase0_ssz::Slot::new(state_slot - data.slot.as_u64()),
        proposer_index,
    };

    let target_list = if data.target.epoch == current_epoch {
        &mut builder.state_mut().current_epoch_attestations
    } else {
        &mut builder.state_mut().previous_epoch_attestations
    };
    target_list
        .push(pending)
        .map_err(|_| invalid(OperationKind::Attestation, "epoch pending-attestations list is full"))?;

    let indexed = get_indexed_attestation(builder, attestation, config)?;
    is_valid_indexed_attestation(builder, &indexed, config, genesis_validators_root)
}

/// `process_proposer_slashing`: checks both headers describe the same slot/proposer but differ,
/// checks the proposer is slashable, verifies both signatures, then slashes.
pub fn process_proposer_slashing(
    builder: &mut BeaconStateBuilder,
    slashing: &ProposerSlashing,
    config: &SpecConfig,
    genesis_validators_root: Bytes32,
) -> Result<()> {
    let header_1 = &slashing.signed_header_1.message;
    let header_2 = &slashing.signed_header_2.message;

    if header_1.slot != header_2.slot || header_1.proposer_index != header_2.proposer_index {
        return Err(invalid(
            OperationKind::ProposerSlashing,
            "headers reference different slot or proposer",
        ));
    }
    if header_1 == header_2 {
        return Err(invalid(
            OperationKind::ProposerSlashing,
            "headers are identical, not a double proposal",
        ));
    }

    let proposer_index = header_1.proposer_index;
    let current_epoch = get_current_epoch(builder.state(), config);
    let proposer = builder
        .state()
        .validators
        .get(proposer_index.as_u64() as usize)
        .ok_or(invalid(OperationKind::ProposerSlashing, "unknown proposer index"))?
        .clone();
    if !is_slashable_validator(&proposer, current_epoch) {
        return Err(invalid(OperationKind::ProposerSlashing, "proposer is not slashable"));
    }

    let proposer_pubkey = BlsPublicKey::from_bytes(&proposer.pubkey)
        .map_err(|_| invalid(OperationKind::ProposerSlashing, "invalid proposer pubkey encoding"))?;
    for signed_header in [&slashing.signed_header_1, &slashing.signed_header_2] {
        let domain = get_domain(
            builder.state(),
            config.domain_beacon_proposer,
            Some(compute_epoch_at_slot(signed_header.message.slot, config)),
            genesis_validators_root,
        );
        let signing_root = compute_signing_root(&signed_header.message, domain);
        let signature = BlsSignatureValue::from_bytes(&signed_header.signature)
            .map_err(|_| StateTransitionError::InvalidSignature(SignatureKind::ProposerSlashing))?;
        if !signature.verify(&proposer_pubkey, signing_root.as_bytes()) {
            return Err(StateTransitionError::InvalidSignature(SignatureKind::ProposerSlashing));
        }
    }

    slash_validator(builder, proposer_index, None, config)
}

/// `process_attester_slashing`: verifies both indexed attestations and that they are mutually
/// slashable, then slashes every slashable validator in their intersection.
pub fn process_attester_slashing(
    builder: &mut BeaconStateBuilder,
    slashing: &AttesterSlashing,
    config: &SpecConfig,
    genesis_validators_root: Bytes32,
) -> Result<()> {
    if !is_slashable_attestation_data(&slashing.attestation_1.data, &slashing.attestation_2.data) {
        return Err(invalid(
            OperationKind::AttesterSlashing,
            "attestation data is not mutually slashable",
        ));
    }
    is_valid_indexed_attestation(builder, &slashing.attestation_1, config, genesis_validators_root)?;
    is_valid_indexed_attestation(builder, &slashing.attestation_2, config, genesis_validators_root)?;

    let current_epoch = get_current_epoch(builder.state(), config);
    let set_2: std::collections::HashSet<u64> = slashing
        .attestation_2
        .attesting_indices
        .iter()
        .map(|i| i.as_u64())
        .collect();

    let mut slashed_any = false;
    let mut candidates: Vec<ValidatorIndex> = slashing
        .attestation_1
        .attesting_indices
        .iter()
        .filter(|i| set_2.contains(&i.as_u64()))
        .copied()
        .collect();
    candidates.sort_by_key(|i| i.as_u64());

    for index in candidates {
        let validator = builder
            .state()
            .validators
            .get(index.as_u64() as usize)
            .ok_or(invalid(OperationKind::AttesterSlashing, "attesting index out of range"))?
            .clone();
        if is_slashable_validator(&validator, current_epoch) {
            slash_validator(builder, index, None, config)?;
            slashed_any = true;
        }
    }

    if !slashed_any {
        return Err(invalid(
            OperationKind::AttesterSlashing,
            "no slashable validator in the intersection",
        ));
    }
    Ok(())
}

/// `process_voluntary_exit`: validates eligibility (active, not already exiting, past both the
/// requested epoch and the shard-committee waiting period), verifies the signature, then queues
/// the exit.
pub fn process_voluntary_exit(
    builder: &mut BeaconStateBuilder,
    signed_exit: &SignedVoluntaryExit,
    config: &SpecConfig,
    genesis_validators_root: Bytes32,
) -> Result<()> {
    let exit = &signed_exit.message;
    let current_epoch = get_current_epoch(builder.state(), config);
    let validator = builder
        .state()
        .validators
        .get(exit.validator_index.as_u64() as usize)
        .ok_or(invalid(OperationKind::VoluntaryExit, "unknown validator index"))?
        .clone();

    if !is_active_validator(&validator, current_epoch) {
        return Err(invalid(OperationKind::VoluntaryExit, "validator is not active"));
    }
    if validator.exit_epoch.as_u64() != FAR_FUTURE_EPOCH.as_u64() {
        return Err(invalid(OperationKind::VoluntaryExit, "validator has already initiated exit"));
    }
    if current_epoch.as_u64() < exit.epoch.as_u64() {
        return Err(invalid(OperationKind::VoluntaryExit, "exit epoch is in the future"));
    }
    if current_epoch.as_u64() < validator.activation_epoch.as_u64() + config.shard_committee_period {
        return Err(invalid(
            OperationKind::VoluntaryExit,
            "validator has not served the shard committee period",
        ));
    }

    let pubkey = BlsPublicKey::from_bytes(&validator.pubkey)
        .map_err(|_| invalid(OperationKind::VoluntaryExit, "invalid validator pubkey encoding"))?;
    let domain = get_domain(
        builder.state(),
        config.domain_voluntary_exit,
        Some(exit.epoch),
        genesis_validators_root,
    );
    let signing_root = compute_signing_root(exit, domain);
    let signature = BlsSignatureValue::from_bytes(&signed_exit.signature)
        .map_err(|_| StateTransitionError::InvalidSignature(SignatureKind::Exit))?;
    if !signature.verify(&pubkey, signing_root.as_bytes()) {
        return Err(StateTransitionError::InvalidSignature(SignatureKind::Exit));
    }

    initiate_validator_exit(builder, exit.validator_index, config)
}

/// `process_deposit`: verifies the inclusion Merkle branch against the deposit tree root always;
/// verifies the deposit signature only when introducing a new validator, and silently drops the
/// deposit (still consuming `eth1_deposit_index`) if that signature check fails — the one
/// operation kind whose failure mode is "no-op", not "reject the block".
pub fn process_deposit(builder: &mut BeaconStateBuilder, deposit: &Deposit, config: &SpecConfig) -> Result<()> {
    let leaf = deposit.data.tree_hash_root();
    let leaf = Bytes32::from_slice(leaf.as_bytes()).expect("tree_hash_root is 32 bytes");
    let branch: Vec<Bytes32> = deposit.proof.iter().copied().collect();
    let deposit_index = builder.state().eth1_deposit_index;
    let root = builder.state().eth1_data.deposit_root;

    if !is_valid_merkle_branch(leaf, &branch, DEPOSIT_PROOF_DEPTH, deposit_index, root) {
        return Err(invalid(OperationKind::Deposit, "invalid deposit Merkle branch"));
    }

    builder.state_mut().eth1_deposit_index += 1;

    let pubkey = deposit.data.pubkey;
    let amount = deposit.data.amount;

    match get_validator_index_by_pubkey(builder, &pubkey) {
        Some(index) => {
            builder.increase_balance(index, amount)?;
        }
        None => {
            let deposit_message = DepositMessage {
                pubkey,
                withdrawal_credentials: deposit.data.withdrawal_credentials,
                amount,
            };
            let domain = compute_deposit_domain(config, Bytes32::zero());
            let signing_root = compute_signing_root(&deposit_message, domain);

            let signature_valid = BlsPublicKey::from_bytes(&pubkey)
                .ok()
                .zip(BlsSignatureValue::from_bytes(&deposit.data.signature).ok())
                .map(|(pk, sig)| sig.verify(&pk, signing_root.as_bytes()))
                .unwrap_or(false);

            if signature_valid {
                add_validator_to_registry(
                    builder,
                    pubkey,
                    deposit.data.withdrawal_credentials,
                    amount,
                    config,
                )?;
            }
        }
    }
    Ok(())
}

/// `is_valid_merkle_branch`: recomputes the root from `leaf` and `branch`, guided by the bits of
/// `index`, and checks it matches `root`.
pub fn is_valid_merkle_branch(leaf: Bytes32, branch: &[Bytes32], depth: usize, index: u64, root: Bytes32) -> bool {
    if branch.len() < depth {
        return false;
    }
    let mut value = leaf;
    for (i, sibling) in branch.iter().take(depth).enumerate() {
        let value_is_right = (index >> i) & 1 == 1;
        value = hash_pair(value, *sibling, value_is_right);
    }
    value == root
}

fn hash_pair(value: Bytes32, sibling: Bytes32, value_is_right: bool) -> Bytes32 {
    let mut input = Vec::with_capacity(64);
    if value_is_right {
        input.extend_from_slice(sibling.as_bytes());
        input.extend_from_slice(value.as_bytes());
    } else {
        input.extend_from_slice(value.as_bytes());
        input.extend_from_slice(sibling.as_bytes());
    }
    Bytes32::from_slice(&ethereum_hashing::hash(&input)).expect("sha256 output is 32 bytes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_slashable_attestation_data_detects_double_vote() {
        let base = |source: u64, target: u64| AttestationData {
            slot: phase0_ssz::Slot::new(0),
            index: phase0_ssz::CommitteeIndex::new(0),
            beacon_block_root: Bytes32::zero(),
            source: phase0_types::Checkpoint {
                epoch: phase0_ssz::Epoch::new(source),
                root: Bytes32::zero(),
            },
            target: phase0_types::Checkpoint {
                epoch: phase0_ssz::Epoch::new(target),
                root: Bytes32([1u8; 32]),
            },
        };
        let a = base(1, 2);
        let mut b = base(1, 2);
        b.beacon_block_root = Bytes32([9u8; 32]);
        assert!(is_slashable_attestation_data(&a, &b));
    }

    #[test]
    fn is_slashable_attestation_data_detects_surround_vote() {
        let a = AttestationData {
            slot: phase0_ssz::Slot::new(0),
            index: phase0_ssz::CommitteeIndex::new(0),
            beacon_block_root: Bytes32::zero(),
            source: phase0_types::Checkpoint {
                epoch: phase0_ssz::Epoch::new(1),
                root: Bytes32::zero(),
            },
            target: phase0_types::Checkpoint {
                epoch: phase0_ssz::Epoch::new(5),
                root: Bytes32::zero(),
            },
        };
        let b = AttestationData {
            source: phase0_types::Checkpoint {
                epoch: phase0_ssz::Epoch::new(2),
                root: Bytes32::zero(),
            },
            target: phase0_types::Checkpoint {
                epoch: phase0_ssz::Epoch::new(4),
                root: Bytes32::zero(),
            },
            ..a.clone()
        };
        assert!(is_slashable_attestation_data(&a, &b));
    }

    #[test]
    fn is_valid_merkle_branch_accepts_genuine_proof() {
        let leaves: Vec<Bytes32> = (0..4u8)
            .map(|n| {
                let mut b = [0u8; 32];
                b[31] = n;
                Bytes32(b)
            })
            .collect();
        let tree = phase0_ssz::Node::from_leaves(&leaves, 2);
        let idx = phase0_ssz::GeneralizedIndex::leaf(2, 1);
        let sibling_0 = tree.get(phase0_ssz::GeneralizedIndex(idx.0 ^ 1), 2).unwrap().root();
        let parent = idx.parent().unwrap();
        let sibling_1 = tree
            .get(
                phase0_ssz::GeneralizedIndex(parent.0 ^ 1),
                2,
            )
            .unwrap()
            .root();
        let branch = [sibling_0, sibling_1];
        assert!(is_valid_merkle_branch(leaves[1], &branch, 2, 1, tree.root()));
        assert!(!is_valid_merkle_branch(leaves[0], &branch, 2, 1, tree.root()));
    }
}
