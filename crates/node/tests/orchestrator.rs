//! Integration test for the `ChainUpdater` wiring: genesis seeds both the store and fork choice
//! at the same anchor, and a bare slot tick (no new block) should resolve the head back to that
//! anchor without touching the state-transition function at all.

use ssz_types::VariableList;
use tree_hash::TreeHash;

use phase0_fork_choice::ForkChoice;
use phase0_node::{CancellationToken, ChainUpdater, ManualClock, NullEventSink};
use phase0_ssz::{Epoch, Slot, ValidatorIndex};
use phase0_store::{Store, StorageMode};
use phase0_types::containers::*;
use phase0_types::SpecConfig;

fn zero_validator(balance: u64) -> Validator {
    Validator {
        pubkey: Default::default(),
        withdrawal_credentials: phase0_ssz::Bytes32::zero(),
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
        genesis_validators_root: phase0_ssz::Bytes32::zero(),
        slot: Slot::new(0),
        fork: Fork {
            previous_version: Default::default(),
            current_version: Default::default(),
            epoch: Epoch::new(0),
        },
        latest_block_header: BeaconBlockHeader {
            slot: Slot::new(0),
            proposer_index: ValidatorIndex::new(0),
            parent_root: phase0_ssz::Bytes32::zero(),
            state_root: phase0_ssz::Bytes32::zero(),
            body_root: phase0_ssz::Bytes32::zero(),
        },
        block_roots: Default::default(),
        state_roots: Default::default(),
        historical_roots: VariableList::empty(),
        eth1_data: Eth1Data {
            deposit_root: phase0_ssz::Bytes32::zero(),
            deposit_count: 1,
            block_hash: phase0_ssz::Bytes32::zero(),
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
            root: phase0_ssz::Bytes32::zero(),
        },
        current_justified_checkpoint: Checkpoint {
            epoch: Epoch::new(0),
            root: phase0_ssz::Bytes32::zero(),
        },
        finalized_checkpoint: Checkpoint {
            epoch: Epoch::new(0),
            root: phase0_ssz::Bytes32::zero(),
        },
    }
}

#[tokio::test]
async fn slot_tick_with_no_new_block_resolves_head_to_the_genesis_anchor() {
    let config = SpecConfig::minimal();
    let mut genesis = genesis_state(&config);
    let genesis_state_root =
        phase0_ssz::Bytes32::from_slice(genesis.tree_hash_root().as_bytes()).unwrap();
    genesis.latest_block_header.state_root = genesis_state_root;
    let genesis_root =
        phase0_ssz::Bytes32::from_slice(genesis.latest_block_header.tree_hash_root().as_bytes()).unwrap();

    let (store, stored_genesis_root) = Store::from_genesis(genesis.clone(), config.clone(), StorageMode::Prune);
    assert_eq!(stored_genesis_root, genesis_root);

    let fork_choice = ForkChoice::from_anchor(
        genesis_root,
        genesis_state_root,
        Slot::new(0),
        Epoch::new(0),
        usize::MAX,
    )
    .unwrap();

    let clock = ManualClock::new(Slot::new(0));
    let mut updater = ChainUpdater::new(
        store,
        fork_choice,
        config,
        genesis.genesis_validators_root,
        clock,
        NullEventSink,
        CancellationToken::new(),
    );

    let head = updater.on_slot_tick(Slot::new(0)).await.unwrap();
    assert_eq!(head, genesis_root);
}

#[tokio::test]
async fn cancellation_short_circuits_a_pending_slot_tick() {
    let config = SpecConfig::minimal();
    let mut genesis = genesis_state(&config);
    let genesis_state_root =
        phase0_ssz::Bytes32::from_slice(genesis.tree_hash_root().as_bytes()).unwrap();
    genesis.latest_block_header.state_root = genesis_state_root;
    let genesis_root =
        phase0_ssz::Bytes32::from_slice(genesis.latest_block_header.tree_hash_root().as_bytes()).unwrap();

    let (store, _) = Store::from_genesis(genesis.clone(), config.clone(), StorageMode::Prune);
    let fork_choice = ForkChoice::from_anchor(
        genesis_root,
        genesis_state_root,
        Slot::new(0),
        Epoch::new(0),
        usize::MAX,
    )
    .unwrap();

    let cancellation = CancellationToken::new();
    cancellation.cancel();

    let mut updater = ChainUpdater::new(
        store,
        fork_choice,
        config,
        genesis.genesis_validators_root,
        ManualClock::new(Slot::new(0)),
        NullEventSink,
        cancellation,
    );

    assert!(updater.on_slot_tick(Slot::new(0)).await.is_err());
}
