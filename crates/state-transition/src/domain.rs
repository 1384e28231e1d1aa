//! Domain separation and signing roots (spec.md §4.E "Signatures and domains").
//!
//! Grounded on the retrieval pack's `ream` `misc.rs::compute_domain`/`compute_signing_root`,
//! reimplemented against this crate's own `Fork`/`SpecConfig` rather than `ream`'s global
//! constants.

use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash as DeriveTreeHash;

use phase0_ssz::{Bytes32, Bytes4, Epoch};
use phase0_types::{BeaconState, Fork, SpecConfig};

/// `ForkData` per the consensus-spec: the container whose root, truncated, forms the last 28
/// bytes of a `Domain`.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode, DeriveTreeHash)]
struct ForkData {
    current_version: Bytes4,
    genesis_validators_root: Bytes32,
}

/// `SigningData` per the consensus-spec: what actually gets signed is this container's root,
/// not the bare object root.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode, DeriveTreeHash)]
struct SigningData {
    object_root: Bytes32,
    domain: Bytes32,
}

pub fn compute_domain(
    domain_type: u32,
    fork_version: Bytes4,
    genesis_validators_root: Bytes32,
) -> Bytes32 {
    let fork_data = ForkData {
        current_version: fork_version,
        genesis_validators_root,
    };
    let fork_data_root = fork_data.tree_hash_root();

    let mut domain = [0u8; 32];
    domain[0..4].copy_from_slice(&domain_type.to_le_bytes());
    domain[4..32].copy_from_slice(&fork_data_root.as_bytes()[0..28]);
    Bytes32(domain)
}

/// `get_domain(state, domain_type, epoch?)`: picks `fork.previous_version` for messages from
/// before the fork epoch, `fork.current_version` otherwise.
pub fn get_domain(
    state: &BeaconState,
    domain_type: u32,
    message_epoch: Option<Epoch>,
    genesis_validators_root: Bytes32,
) -> Bytes32 {
    get_domain_for_fork(&state.fork, domain_type, message_epoch, genesis_validators_root)
}

pub fn get_domain_for_fork(
    fork: &Fork,
    domain_type: u32,
    message_epoch: Option<Epoch>,
    genesis_validators_root: Bytes32,
) -> Bytes32 {
    let epoch = message_epoch.unwrap_or(fork.epoch);
    let fork_version = if epoch.as_u64() < fork.epoch.as_u64() {
        fork.previous_version
    } else {
        fork.current_version
    };
    compute_domain(domain_type, fork_version, genesis_validators_root)
}

/// `get_domain` pinned to a fixed (cross-fork) version, used by `Deposit` processing per
/// spec.md §4.E: a deposit's signature domain never depends on the state's current fork.
pub fn compute_deposit_domain(config: &SpecConfig, genesis_validators_root: Bytes32) -> Bytes32 {
    compute_domain(
        config.domain_deposit,
        Bytes4::zero(),
        genesis_validators_root,
    )
}

pub fn compute_signing_root<T: TreeHash>(object: &T, domain: Bytes32) -> Bytes32 {
    let signing_data = SigningData {
        object_root: tree_hash_root_bytes32(object),
        domain,
    };
    tree_hash_root_bytes32(&signing_data)
}

/// Small bridge so callers never have to juggle `tree_hash::Hash256` directly.
fn tree_hash_root_bytes32<T: TreeHash>(object: &T) -> Bytes32 {
    Bytes32::from_slice(object.tree_hash_root().as_bytes()).expect("tree_hash_root is 32 bytes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_differs_by_fork_version() {
        let root = Bytes32::zero();
        let a = compute_domain(0, Bytes4::zero(), root);
        let b = compute_domain(0, Bytes4::from([1, 0, 0, 0]), root);
        assert_ne!(a, b);
    }

    #[test]
    fn signing_root_differs_from_object_root() {
        let fork_data = ForkData {
            current_version: Bytes4::zero(),
            genesis_validators_root: Bytes32::zero(),
        };
        let object_root = tree_hash_root_bytes32(&fork_data);
        let signing_root = compute_signing_root(&fork_data, Bytes32::zero());
        assert_ne!(object_root, signing_root);
    }
}
