//! `phase0-ssz`: the typed Merkle-tree engine underlying the beacon-chain data model.
//!
//! Three layers, from the bottom up:
//! - [`gindex`] and [`node`]: a generic, schema-agnostic persistent binary Merkle tree addressed
//!   by generalized index, with structural sharing on every `set`.
//! - [`hashing`] and [`supernode`]: the SSZ merkleization rules (packing, length mix-in, chunk
//!   counts) and the super-node packed-leaf optimization for large uniform lists like
//!   `balances`.
//! - [`primitives`] and [`bls`]: the newtype primitives (`Slot`, `Epoch`, ...), fixed-byte types,
//!   and BLS12-381 signature operations that the domain model in `phase0-types` builds on.
//!
//! Concrete container encode/decode/hash-tree-root derives stay on the teacher's pinned
//! `ethereum_ssz`/`tree_hash` crates in `phase0-types`; this crate supplies the generic tree
//! underneath the handful of fields (`validators`, `balances`) that need per-element mutation.

pub mod bls;
pub mod error;
pub mod gindex;
pub mod hashing;
pub mod node;
pub mod primitives;
mod ssz_impls;
pub mod supernode;

pub use error::{ArithmeticError, SszError, TreeError};
pub use gindex::GeneralizedIndex;
pub use node::Node;
pub use primitives::{
    erroring_add_u64, erroring_sub_u64, Bytes32, Bytes4, BlsPubkeyBytes, BlsSecretBytes,
    BlsSignatureBytes, CommitteeIndex, Epoch, Gwei, Slot, ValidatorIndex, FAR_FUTURE_EPOCH,
};
pub use supernode::{SuperNode, SuperNodeList};
