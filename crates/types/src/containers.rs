//! Phase-0 consensus containers, field order and derive list grounded directly on the teacher's
//! `eth_consensus_layer.rs`, trimmed of every Altair-and-later field (`previous_epoch_participation`
//! / `current_epoch_participation` / `current_sync_committee` / `next_sync_committee` /
//! `latest_execution_payload_header` / Capella withdrawals / Electra pending-deposit queues /
//! Fulu `proposer_lookahead`) the teacher carries but this phase-0-only spec excludes, and
//! extended with the block/operation containers (`BeaconBlockBody`, `BeaconBlock`,
//! `SignedBeaconBlock`, the five operation kinds) the teacher never needs because it only ever
//! reads a `BeaconState` snapshot, never applies a block to one.

use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use ssz_types::{BitList, BitVector, FixedVector, VariableList};
use tree_hash_derive::TreeHash;

use phase0_ssz::{
    BlsPubkeyBytes, BlsSignatureBytes, Bytes32, Bytes4, CommitteeIndex, Epoch, Gwei, Slot,
    ValidatorIndex,
};

use crate::eth_spec::*;

pub type Root = Bytes32;
pub type WithdrawalCredentials = Bytes32;
pub type BlsPublicKey = BlsPubkeyBytes;
pub type BlsSignature = BlsSignatureBytes;
pub type Version = Bytes4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Fork {
    pub previous_version: Version,
    pub current_version: Version,
    pub epoch: Epoch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Checkpoint {
    pub epoch: Epoch,
    pub root: Root,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Validator {
    pub pubkey: BlsPublicKey,
    pub withdrawal_credentials: WithdrawalCredentials,
    pub effective_balance: Gwei,
    pub slashed: bool,
    pub activation_eligibility_epoch: Epoch,
    pub activation_epoch: Epoch,
    pub exit_epoch: Epoch,
    pub withdrawable_epoch: Epoch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct BeaconBlockHeader {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub parent_root: Root,
    pub state_root: Root,
    pub body_root: Root,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct SignedBeaconBlockHeader {
    pub message: BeaconBlockHeader,
    pub signature: BlsSignature,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Eth1Data {
    pub deposit_root: Root,
    pub deposit_count: u64,
    pub block_hash: Root,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct AttestationData {
    pub slot: Slot,
    pub index: CommitteeIndex,
    pub beacon_block_root: Root,
    pub source: Checkpoint,
    pub target: Checkpoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct IndexedAttestation {
    pub attesting_indices: VariableList<ValidatorIndex, MaxValidatorsPerCommittee>,
    pub data: AttestationData,
    pub signature: BlsSignature,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct PendingAttestation {
    pub aggregation_bits: BitList<MaxValidatorsPerCommittee>,
    pub data: AttestationData,
    pub inclusion_delay: Slot,
    pub proposer_index: ValidatorIndex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Attestation {
    pub aggregation_bits: BitList<MaxValidatorsPerCommittee>,
    pub data: AttestationData,
    pub signature: BlsSignature,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct ProposerSlashing {
    pub signed_header_1: SignedBeaconBlockHeader,
    pub signed_header_2: SignedBeaconBlockHeader,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct AttesterSlashing {
    pub attestation_1: IndexedAttestation,
    pub attestation_2: IndexedAttestation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct DepositData {
    pub pubkey: BlsPublicKey,
    pub withdrawal_credentials: WithdrawalCredentials,
    pub amount: Gwei,
    pub signature: BlsSignature,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Deposit {
    pub proof: FixedVector<Root, DepositProofDepth>,
    pub data: DepositData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct VoluntaryExit {
    pub epoch: Epoch,
    pub validator_index: ValidatorIndex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct SignedVoluntaryExit {
    pub message: VoluntaryExit,
    pub signature: BlsSignature,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct BeaconBlockBody {
    pub randao_reveal: BlsSignature,
    pub eth1_data: Eth1Data,
    pub graffiti: Root,
    pub proposer_slashings: VariableList<ProposerSlashing, MaxProposerSlashings>,
    pub attester_slashings: VariableList<AttesterSlashing, MaxAttesterSlashings>,
    pub attestations: VariableList<Attestation, MaxAttestations>,
    pub deposits: VariableList<Deposit, MaxDeposits>,
    pub voluntary_exits: VariableList<SignedVoluntaryExit, MaxVoluntaryExits>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct BeaconBlock {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub parent_root: Root,
    pub state_root: Root,
    pub body: BeaconBlockBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct SignedBeaconBlock {
    pub message: BeaconBlock,
    pub signature: BlsSignature,
}

pub type Validators = VariableList<Validator, ValidatorRegistryLimit>;
pub type Balances = VariableList<Gwei, ValidatorRegistryLimit>;
pub type JustificationBits = BitVector<JustificationBitsLength>;

/// The 20-field phase-0 `BeaconState`: versioning, history, eth1 voting, the validator/balance
/// registries, randomness, slashings, the two pending-attestation rolling lists, and finality —
/// field order preserved exactly as named in the authoritative container list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct BeaconState {
    pub genesis_time: u64,
    pub genesis_validators_root: Root,
    pub slot: Slot,
    pub fork: Fork,

    pub latest_block_header: BeaconBlockHeader,
    pub block_roots: FixedVector<Root, SlotsPerHistoricalRoot>,
    pub state_roots: FixedVector<Root, SlotsPerHistoricalRoot>,
    pub historical_roots: VariableList<Root, HistoricalRootsLimit>,

    pub eth1_data: Eth1Data,
    pub eth1_data_votes: VariableList<Eth1Data, SlotsPerEth1VotingPeriod>,
    pub eth1_deposit_index: u64,

    pub validators: Validators,
    pub balances: Balances,

    pub randao_mixes: FixedVector<Root, EpochsPerHistoricalVector>,

    pub slashings: FixedVector<Gwei, EpochsPerSlashingsVector>,

    pub previous_epoch_attestations: VariableList<PendingAttestation, MaxAttestationsPerEpoch>,
    pub current_epoch_attestations: VariableList<PendingAttestation, MaxAttestationsPerEpoch>,

    pub justification_bits: JustificationBits,
    pub previous_justified_checkpoint: Checkpoint,
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_hash::TreeHash as _;

    fn zero_validator() -> Validator {
        Validator {
            pubkey: BlsPublicKey::default(),
            withdrawal_credentials: WithdrawalCredentials::default(),
            effective_balance: Gwei::new(0),
            slashed: false,
            activation_eligibility_epoch: phase0_ssz::FAR_FUTURE_EPOCH,
            activation_epoch: phase0_ssz::FAR_FUTURE_EPOCH,
            exit_epoch: phase0_ssz::FAR_FUTURE_EPOCH,
            withdrawable_epoch: phase0_ssz::FAR_FUTURE_EPOCH,
        }
    }

    #[test]
    fn validator_hash_tree_root_is_deterministic() {
        let a = zero_validator();
        let b = zero_validator();
        assert_eq!(a.tree_hash_root(), b.tree_hash_root());
    }

    #[test]
    fn checkpoint_equality_is_field_wise() {
        let a = Checkpoint {
            epoch: Epoch::new(3),
            root: Root::zero(),
        };
        let b = Checkpoint {
            epoch: Epoch::new(3),
            root: Root::zero(),
        };
        assert_eq!(a, b);
    }
}
