//! Compile-time SSZ capacity constants.
//!
//! These mirror the teacher's `eth_spec.rs` file-for-file: a flat `typenum` alias per named
//! consensus list/vector bound. They stay fixed at mainnet size regardless of which
//! [`crate::spec_config::SpecConfig`] preset is in use — `ssz_types`' `VariableList`/
//! `FixedVector` bounds are part of a container's Rust *type*, not a runtime value, exactly as
//! they are for the teacher's own `BeaconState`. `SpecConfig::minimal()` only varies the
//! *behavioral* constants (`slots_per_epoch`, churn limits, …) consumed at runtime by
//! state-transition and fork-choice.

pub use typenum::*;

pub type MaxValidatorsPerCommittee = U2048;
pub type SlotsPerEth1VotingPeriod = U2048;
pub type SlotsPerHistoricalRoot = U8192;
pub type EpochsPerHistoricalVector = U65536;
pub type EpochsPerSlashingsVector = U8192;
pub type HistoricalRootsLimit = U16777216;
pub type ValidatorRegistryLimit = U1099511627776;
pub type JustificationBitsLength = U4;
pub type SlotsPerEpoch = U32;

pub type MaxProposerSlashings = U16;
pub type MaxAttesterSlashings = U2;
pub type MaxAttestations = U128;
pub type MaxDeposits = U16;
pub type MaxVoluntaryExits = U16;

/// `DEPOSIT_CONTRACT_TREE_DEPTH + 1`: the deposit Merkle proof length, the extra level mixing
/// in the deposit count per the consensus-spec convention.
pub type DepositProofDepth = U33;

/// `MAX_ATTESTATIONS * SLOTS_PER_EPOCH`, the per-epoch pending-attestation list bound used by
/// `previous_epoch_attestations`/`current_epoch_attestations` in this (pre-Altair) `BeaconState`.
pub type MaxAttestationsPerEpoch = U4096;
