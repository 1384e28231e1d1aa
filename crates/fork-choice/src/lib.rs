//! `phase0-fork-choice`: LMD-GHOST head selection with FFG-finality viability filtering.
//!
//! [`proto_array`] is the bare index tree (spec.md §3.4/§4.D); [`fork_choice`] wraps it with the
//! vote table, attestation queue and justified-balances cache that turn "weight deltas in, head
//! out" into the stateful object the orchestrator drives.

pub mod balances_cache;
pub mod error;
pub mod fork_choice;
pub mod proto_array;

pub use error::ForkChoiceError;
pub use fork_choice::{ForkChoice, PersistedForkChoice, VoteTracker};
pub use proto_array::{ProtoArray, ProtoNode};
