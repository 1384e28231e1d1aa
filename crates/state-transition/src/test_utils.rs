//! Test-only state construction shared by this crate's unit tests, grounded on
//! `phase0_types::views::tests::sample_state`'s field-by-field `BeaconState` literal, generalized
//! to an arbitrary validator count and wired through a supplied [`SpecConfig`].

use ssz_types::VariableList;

use phase0_ssz::{Epoch, Gwei, Slot, ValidatorIndex, FAR_FUTURE_EPOCH};
use phase0_types::{
    BeaconBlockHeader, BeaconState, Checkpoint, Eth1Data, Fork, Root, SpecConfig, Validator,
    Version,
};

fn deterministic_pubkey(index: u64) -> phase0_types::BlsPublicKey {
    let mut bytes = [0u8; 48];
    bytes[40..].copy_from_slice(&index.to_le_bytes());
    phase0_types::BlsPublicKey::from(bytes)
}

/// A genesis-shaped state with `validator_count` fully active, fully-staked validators, all
/// justification/finality checkpoints at epoch 0, and an empty history — the precondition every
/// `process_slots`/`process_epoch` unit test in this crate starts from.
pub fn minimal_genesis_state(config: &SpecConfig, validator_count: u64) -> BeaconState {
    let validators: Vec<Validator> = (0..validator_count)
        .map(|i| Validator {
            pubkey: deterministic_pubkey(i),
            withdrawal_credentials: Root::zero(),
            effective_balance: config.max_effective_balance,
            slashed: false,
            activation_eligibility_epoch: Epoch::new(0),
            activation_epoch: Epoch::new(0),
            exit_epoch: FAR_FUTURE_EPOCH,
            withdrawable_epoch: FAR_FUTURE_EPOCH,
        })
        .collect();
    let balances = vec![config.max_effective_balance; validator_count as usize];

    BeaconState {
        genesis_time: 0,
        genesis_validators_root: Root::zero(),
        slot: Slot::new(0),
        fork: Fork {
            previous_version: Version::zero(),
            current_version: Version::zero(),
            epoch: Epoch::new(0),
        },
        latest_block_header: BeaconBlockHeader {
            slot: Slot::new(0),
            proposer_index: ValidatorIndex::new(0),
            parent_root: Root::zero(),
            state_root: Root::zero(),
            body_root: Root::zero(),
        },
        block_roots: Default::default(),
        state_roots: Default::default(),
        historical_roots: VariableList::empty(),
        eth1_data: Eth1Data {
            deposit_root: Root::zero(),
            deposit_count: validator_count,
            block_hash: Root::zero(),
        },
        eth1_data_votes: VariableList::empty(),
        eth1_deposit_index: validator_count,
        validators: VariableList::new(validators).unwrap(),
        balances: VariableList::new(balances).unwrap(),
        randao_mixes: Default::default(),
        slashings: Default::default(),
        previous_epoch_attestations: VariableList::empty(),
        current_epoch_attestations: VariableList::empty(),
        justification_bits: Default::default(),
        previous_justified_checkpoint: Checkpoint {
            epoch: Epoch::new(0),
            root: Root::zero(),
        },
        current_justified_checkpoint: Checkpoint {
            epoch: Epoch::new(0),
            root: Root::zero(),
        },
        finalized_checkpoint: Checkpoint {
            epoch: Epoch::new(0),
            root: Root::zero(),
        },
    }
}

#[allow(dead_code)]
pub fn gwei(value: u64) -> Gwei {
    Gwei::new(value)
}
