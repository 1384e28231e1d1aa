//! `Signer` (spec.md §6.3): the interface a validator client would implement to produce BLS
//! signatures over a domain-scoped signing root. Validator key management is out of scope (spec.md
//! §1 Non-goals), so this trait has no implementation here beyond what tests need — it exists so
//! the orchestrator's external interfaces are complete, not so `ChainUpdater` can drive it.

use phase0_ssz::{BlsSignatureBytes, Bytes32};

pub trait Signer: Send + Sync {
    fn sign(&self, domain: Bytes32, signing_root: Bytes32) -> BlsSignatureBytes;
}
