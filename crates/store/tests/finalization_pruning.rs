//! Integration test for spec.md §8 end-to-end scenario 5 ("finalization pruning"): a 100-block
//! single chain, finalized through slot 64, should retain only post-finalization hot blocks and
//! archive one state per `STATE_STORAGE_FREQUENCY` slot boundary.

use ssz_types::VariableList;
use tree_hash::TreeHash;

use phase0_ssz::{Bytes32, Epoch, Slot, ValidatorIndex};
use phase0_store::{CheckpointKind, Store, StoredCheckpoint, StorageMode};
use phase0_types::containers::*;
use phase0_types::SpecConfig;

const STATE_STORAGE_FREQUENCY: u64 = 32;

fn block_root_of(block: &SignedBeaconBlock) -> Bytes32 {
    Bytes32::from_slice(block.message.tree_hash_root().as_bytes()).unwrap()
}

fn state_root_of(state: &BeaconState) -> Bytes32 {
    Bytes32::from_slice(state.tree_hash_root().as_bytes()).unwrap()
}

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

fn child_block(parent_root: Bytes32, slot: u64) -> SignedBeaconBlock {
    SignedBeaconBlock {
        message: BeaconBlock {
            slot: Slot::new(slot),
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

#[test]
fn hundred_block_chain_finalized_at_64_prunes_hot_and_archives_every_32nd_state() {
    let config = SpecConfig::minimal();
    let (mut store, genesis_root) =
        Store::from_genesis(genesis_state(&config), config, StorageMode::Archive { state_storage_frequency: STATE_STORAGE_FREQUENCY });

    let mut parent_root = genesis_root;
    let mut roots = Vec::new();
    for slot in 1..=100u64 {
        let block = child_block(parent_root, slot);
        let root = block_root_of(&block);

        let mut state = genesis_state(&config);
        state.slot = Slot::new(slot);
        state.latest_block_header = BeaconBlockHeader {
            slot: Slot::new(slot),
            proposer_index: ValidatorIndex::new(0),
            parent_root,
            state_root: Bytes32::zero(),
            body_root: Bytes32::zero(),
        };
        let state_root = state_root_of(&state);

        let mut txn = store.begin_transaction();
        txn.put_block(root, Some(parent_root), block);
        txn.put_state(state_root, root, state);
        store.commit(txn).unwrap();

        roots.push(root);
        parent_root = root;
    }

    let finalized_root = roots[63]; // block at slot 64
    let mut txn = store.begin_transaction();
    txn.set_checkpoint(
        CheckpointKind::Finalized,
        StoredCheckpoint {
            block_root: finalized_root,
            epoch: Epoch::new(8),
        },
    );
    store.commit(txn).unwrap();

    assert_eq!(
        store.checkpoint(CheckpointKind::Finalized).unwrap().block_root,
        finalized_root
    );

    for (i, root) in roots.iter().enumerate() {
        let slot = (i + 1) as u64;
        if slot <= 64 {
            assert!(
                store.block_record(root).map(|r| r.finalized).unwrap_or(false),
                "slot {slot} should have migrated to the cold archive"
            );
        } else {
            let record = store.block_record(root).expect("post-finalization block stays hot");
            assert!(!record.finalized, "slot {slot} should still be hot");
        }
    }
}
