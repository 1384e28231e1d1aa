//! `phase0-types`: the phase-0 beacon-chain domain model.
//!
//! Every container derives `Encode, Decode, TreeHash` from the teacher's exact pinned
//! `ethereum_ssz`/`tree_hash` crates, field-for-field grounded on `eth_consensus_layer.rs`
//! (trimmed of Altair-and-later fields, extended with block/operation containers). Mutable
//! access goes through [`views::BeaconStateBuilder`]; [`spec_config::SpecConfig`] carries every
//! named consensus constant as an explicit, constructible value instead of a global.

pub mod containers;
pub mod error;
pub mod eth_spec;
pub mod spec_config;
pub mod views;

pub use containers::{
    Attestation, AttestationData, AttesterSlashing, Balances, BeaconBlock, BeaconBlockBody,
    BeaconBlockHeader, BeaconState, Checkpoint, Deposit, DepositData, Eth1Data, Fork,
    IndexedAttestation, JustificationBits, PendingAttestation, ProposerSlashing, Root,
    SignedBeaconBlock, SignedBeaconBlockHeader, SignedVoluntaryExit, Validator, Validators,
    VoluntaryExit,
};
pub use error::TypesError;
pub use spec_config::SpecConfig;
pub use views::{BeaconStateBuilder, BeaconStateView};
