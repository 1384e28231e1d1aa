//! `phase0-store`: the dual hot/cold chain store (spec.md §3.5, §4.F).
//!
//! [`store::Store`] holds every non-finalized candidate block and at least one state per
//! candidate in its hot set, and migrates an ancestry to the cold archive as soon as
//! [`store::Store::commit`] observes a new, strictly-later `Finalized` checkpoint. All mutation
//! goes through a [`transaction::StoreTransaction`]: nothing is visible to readers until it is
//! consumed by `commit`, and dropping one without committing is the rollback spec.md describes.

pub mod block_provider;
pub mod error;
pub mod regen;
pub mod store;
pub mod tables;
pub mod transaction;

pub use block_provider::{BlockProvider, WithKnownBlocks};
pub use error::{Result, StoreError};
pub use regen::regenerate_from_ancestry;
pub use store::Store;
pub use tables::{BlobStore, BlockRecord, CheckpointKind, StateRecord, StorageMode, StoredCheckpoint, VoteRecord};
pub use transaction::StoreTransaction;
