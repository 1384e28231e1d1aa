//! `ethereum_ssz`/`tree_hash` trait bridges for this crate's primitives.
//!
//! The teacher's `eth_consensus_layer.rs` types `Slot`/`Epoch`/… as bare `u64` and gets
//! `Encode`/`Decode`/`TreeHash` for free from the upstream crate's blanket impl. Wrapping them in
//! newtypes (so a `Slot` can't be added to a `ValidatorIndex` by accident) means that blanket
//! impl no longer applies, so each one is bridged here by delegating to the wrapped `u64`/byte
//! array's own impl — the containers in `phase0-types` then derive `Encode, Decode, TreeHash`
//! exactly as the teacher's containers do, unaware that the leaf fields are newtypes underneath.

use ssz::{Decode, DecodeError, Encode};
use tree_hash::{PackedEncoding, TreeHash, TreeHashType};

use crate::hashing::{chunk_count, tree_depth};
use crate::node::Node;
use crate::primitives::{
    BlsPubkeyBytes, BlsSecretBytes, BlsSignatureBytes, Bytes32, Bytes4, CommitteeIndex, Epoch,
    Gwei, Slot, ValidatorIndex,
};

macro_rules! delegate_u64_newtype {
    ($name:ident) => {
        impl Encode for $name {
            fn is_ssz_fixed_len() -> bool {
                <u64 as Encode>::is_ssz_fixed_len()
            }

            fn ssz_fixed_len() -> usize {
                <u64 as Encode>::ssz_fixed_len()
            }

            fn ssz_bytes_len(&self) -> usize {
                self.0.ssz_bytes_len()
            }

            fn ssz_append(&self, buf: &mut Vec<u8>) {
                self.0.ssz_append(buf)
            }
        }

        impl Decode for $name {
            fn is_ssz_fixed_len() -> bool {
                <u64 as Decode>::is_ssz_fixed_len()
            }

            fn ssz_fixed_len() -> usize {
                <u64 as Decode>::ssz_fixed_len()
            }

            fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
                u64::from_ssz_bytes(bytes).map($name::new)
            }
        }

        impl TreeHash for $name {
            fn tree_hash_type() -> TreeHashType {
                <u64 as TreeHash>::tree_hash_type()
            }

            fn tree_hash_packed_encoding(&self) -> PackedEncoding {
                self.0.tree_hash_packed_encoding()
            }

            fn tree_hash_packing_factor() -> usize {
                <u64 as TreeHash>::tree_hash_packing_factor()
            }

            fn tree_hash_root(&self) -> tree_hash::Hash256 {
                self.0.tree_hash_root()
            }
        }
    };
}

delegate_u64_newtype!(Slot);
delegate_u64_newtype!(Epoch);
delegate_u64_newtype!(ValidatorIndex);
delegate_u64_newtype!(Gwei);
delegate_u64_newtype!(CommitteeIndex);

/// Merkleizes `N` raw bytes as SSZ's `Vector[uint8, N]` would: zero-padded 32-byte chunks,
/// merkleized bottom-up. For `N <= 32` this is just the single zero-padded chunk.
fn byte_vector_root(bytes: &[u8]) -> tree_hash::Hash256 {
    let chunks = chunk_count(bytes.len(), 1);
    if chunks <= 1 {
        let mut chunk = [0u8; 32];
        chunk[..bytes.len()].copy_from_slice(bytes);
        return tree_hash::Hash256::from_slice(&chunk);
    }
    let mut leaves = Vec::with_capacity(chunks);
    for group in bytes.chunks(32) {
        let mut leaf = [0u8; 32];
        leaf[..group.len()].copy_from_slice(group);
        leaves.push(Bytes32(leaf));
    }
    let root = Node::from_leaves(&leaves, tree_depth(chunks)).root();
    tree_hash::Hash256::from_slice(root.as_bytes())
}

macro_rules! delegate_fixed_bytes {
    ($name:ident, $len:expr) => {
        impl Encode for $name {
            fn is_ssz_fixed_len() -> bool {
                true
            }

            fn ssz_fixed_len() -> usize {
                $len
            }

            fn ssz_bytes_len(&self) -> usize {
                $len
            }

            fn ssz_append(&self, buf: &mut Vec<u8>) {
                buf.extend_from_slice(&self.0);
            }
        }

        impl Decode for $name {
            fn is_ssz_fixed_len() -> bool {
                true
            }

            fn ssz_fixed_len() -> usize {
                $len
            }

            fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
                if bytes.len() != $len {
                    return Err(DecodeError::InvalidByteLength {
                        len: bytes.len(),
                        expected: $len,
                    });
                }
                let mut array = [0u8; $len];
                array.copy_from_slice(bytes);
                Ok($name(array))
            }
        }

        impl TreeHash for $name {
            fn tree_hash_type() -> TreeHashType {
                TreeHashType::Vector
            }

            fn tree_hash_packed_encoding(&self) -> PackedEncoding {
                unreachable!("Vector leaves are not packed")
            }

            fn tree_hash_packing_factor() -> usize {
                1
            }

            fn tree_hash_root(&self) -> tree_hash::Hash256 {
                byte_vector_root(&self.0)
            }
        }
    };
}

delegate_fixed_bytes!(Bytes32, 32);
delegate_fixed_bytes!(Bytes4, 4);
delegate_fixed_bytes!(BlsPubkeyBytes, 48);
delegate_fixed_bytes!(BlsSignatureBytes, 96);
delegate_fixed_bytes!(BlsSecretBytes, 32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_round_trips_through_ssz() {
        let slot = Slot::new(12345);
        let bytes = slot.as_ssz_bytes();
        assert_eq!(Slot::from_ssz_bytes(&bytes).unwrap(), slot);
    }

    #[test]
    fn bytes32_tree_hash_root_is_itself() {
        let b = Bytes32([7u8; 32]);
        assert_eq!(b.tree_hash_root().as_bytes(), &b.0[..]);
    }

    #[test]
    fn pubkey_bytes_round_trip_through_ssz() {
        let pk = BlsPubkeyBytes([9u8; 48]);
        let bytes = pk.as_ssz_bytes();
        assert_eq!(BlsPubkeyBytes::from_ssz_bytes(&bytes).unwrap(), pk);
    }
}
