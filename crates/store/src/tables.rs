//! Logical row types for the four tables spec.md §6.2 names, plus the content-addressed blob
//! store. The backing engine is intentionally opaque (an in-memory map here): every table is a
//! small, independently-indexable record so a future on-disk engine can store each one in its own
//! column family without changing any caller above this module.

use std::collections::HashMap;

use phase0_ssz::{Bytes32, Epoch, Slot};

/// `block(block_root PK, slot, parent_root, finalized, blob_id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecord {
    pub slot: Slot,
    pub parent_root: Option<Bytes32>,
    pub finalized: bool,
    /// Content-addressed id of the `SignedBeaconBlock`'s SSZ bytes in the blob store.
    pub blob_id: Bytes32,
}

/// `state(state_root PK, block_root, slot, blob_id NULL)`. A `None` `blob_id` means the state
/// is known to exist (its root and slot are recorded) but has not been materialized — it must be
/// regenerated on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateRecord {
    pub block_root: Bytes32,
    pub slot: Slot,
    pub blob_id: Option<Bytes32>,
}

/// `checkpoint(type PK, block_root, epoch)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckpointKind {
    Justified,
    BestJustified,
    Finalized,
    WeakSubjectivity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredCheckpoint {
    pub block_root: Bytes32,
    pub epoch: Epoch,
}

/// `vote(validator_index PK, current_root, next_root, next_epoch)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteRecord {
    pub current_root: Bytes32,
    pub next_root: Bytes32,
    pub next_epoch: Epoch,
}

/// How aggressively finalized states are retained once a block becomes unreachable from the
/// head: `Archive` keeps one state per `state_storage_frequency` slots for historical queries;
/// `Prune` keeps only the finalized state itself, relying on regeneration for anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Archive { state_storage_frequency: u64 },
    Prune,
}

/// Content-addressed SSZ byte store: `id = hash_tree_root` of the value for states, `block_root`
/// for blocks (its canonical root already is the hash of its header, not its body).
#[derive(Debug, Clone, Default)]
pub struct BlobStore {
    blobs: HashMap<Bytes32, Vec<u8>>,
}

impl BlobStore {
    pub fn put(&mut self, id: Bytes32, bytes: Vec<u8>) {
        self.blobs.insert(id, bytes);
    }

    pub fn get(&self, id: &Bytes32) -> Option<&[u8]> {
        self.blobs.get(id).map(|v| v.as_slice())
    }

    pub fn remove(&mut self, id: &Bytes32) {
        self.blobs.remove(id);
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}
