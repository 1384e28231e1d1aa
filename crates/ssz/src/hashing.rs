//! SSZ merkleization helpers shared by lists, vectors, bitlists and the super-node packer.
//!
//! Grounded on the teacher's `hashing.rs` (`packing_factor`, `target_tree_depth`,
//! `pad_to_depth`): the packing-factor/tree-depth arithmetic for basic types is identical here,
//! generalized from a single `tree_hash::TreeHash` packing factor to the explicit per-width
//! packing this crate's generic `Node` tree needs.

use ethereum_hashing::hash32_concat;

use crate::primitives::Bytes32;

/// Number of 32-byte chunks needed to hold `element_count` basic values of `width` bytes each.
pub fn chunk_count(element_count: usize, width: usize) -> usize {
    let per_chunk = (32 / width).max(1);
    element_count.div_ceil(per_chunk)
}

/// `ceil(log2(x))`, with `tree_depth(0) == tree_depth(1) == 0`.
pub fn tree_depth(chunks: usize) -> usize {
    if chunks <= 1 {
        0
    } else {
        (usize::BITS - (chunks - 1).leading_zeros()) as usize
    }
}

/// Packs fixed-width little-endian basic values (e.g. `u64` balances) into 32-byte chunks,
/// per SSZ's `pack` operation — this is exactly what a super-node's raw byte buffer holds.
pub fn pack_u64(values: &[u64]) -> Vec<Bytes32> {
    let mut chunks = Vec::with_capacity(chunk_count(values.len(), 8));
    for group in values.chunks(4) {
        let mut chunk = [0u8; 32];
        for (i, v) in group.iter().enumerate() {
            chunk[i * 8..i * 8 + 8].copy_from_slice(&v.to_le_bytes());
        }
        chunks.push(Bytes32(chunk));
    }
    chunks
}

/// `hash_tree_root` of a `List`/`BitList`: `sha256(content_root ++ uint256_le(length))`,
/// per spec.md §3.3.
pub fn mix_in_length(content_root: Bytes32, length: usize) -> Bytes32 {
    let mut len_bytes = [0u8; 32];
    len_bytes[..8].copy_from_slice(&(length as u64).to_le_bytes());
    Bytes32(hash32_concat(content_root.as_bytes(), &len_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_count_packs_four_u64_per_chunk() {
        assert_eq!(chunk_count(4, 8), 1);
        assert_eq!(chunk_count(5, 8), 2);
        assert_eq!(chunk_count(0, 8), 0);
    }

    #[test]
    fn tree_depth_rounds_up() {
        assert_eq!(tree_depth(1), 0);
        assert_eq!(tree_depth(2), 1);
        assert_eq!(tree_depth(3), 2);
        assert_eq!(tree_depth(4), 2);
        assert_eq!(tree_depth(5), 3);
    }

    #[test]
    fn pack_u64_round_trips_values() {
        let chunks = pack_u64(&[1, 2, 3, 4, 5]);
        assert_eq!(chunks.len(), 2);
        assert_eq!(&chunks[0].as_bytes()[0..8], &1u64.to_le_bytes());
        assert_eq!(&chunks[1].as_bytes()[0..8], &5u64.to_le_bytes());
    }
}
