//! A small LRU-style cache of justified-balance snapshots keyed by epoch-boundary block root.
//!
//! Grounded in the retrieval pack's `beacon_fork_choice_store.rs` `BalancesCache`/`process_state`
//! pattern: avoids a state read from the store every time the justified checkpoint advances to
//! an epoch boundary already seen recently.

use std::collections::VecDeque;

use phase0_ssz::{Bytes32, Gwei};

const CACHE_SIZE: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct BalancesCache {
    entries: VecDeque<(Bytes32, Vec<Gwei>)>,
}

impl BalancesCache {
    pub fn get(&self, block_root: &Bytes32) -> Option<&[Gwei]> {
        self.entries
            .iter()
            .find(|(root, _)| root == block_root)
            .map(|(_, balances)| balances.as_slice())
    }

    /// Inserts or refreshes the entry for `block_root`, evicting the oldest entry once the
    /// cache exceeds its fixed capacity.
    pub fn insert(&mut self, block_root: Bytes32, balances: Vec<Gwei>) {
        self.entries.retain(|(root, _)| *root != block_root);
        self.entries.push_back((block_root, balances));
        while self.entries.len() > CACHE_SIZE {
            self.entries.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(byte: u8) -> Bytes32 {
        let mut b = [0u8; 32];
        b[31] = byte;
        Bytes32::from(b)
    }

    #[test]
    fn evicts_oldest_entry_past_capacity() {
        let mut cache = BalancesCache::default();
        for i in 0..(CACHE_SIZE as u8 + 2) {
            cache.insert(root(i), vec![Gwei::new(i as u64)]);
        }
        assert!(cache.get(&root(0)).is_none());
        assert!(cache.get(&root(CACHE_SIZE as u8 + 1)).is_some());
    }

    #[test]
    fn reinserting_refreshes_recency() {
        let mut cache = BalancesCache::default();
        cache.insert(root(1), vec![Gwei::new(1)]);
        cache.insert(root(2), vec![Gwei::new(2)]);
        cache.insert(root(1), vec![Gwei::new(11)]);
        for i in 3..(CACHE_SIZE as u8 + 2) {
            cache.insert(root(i), vec![Gwei::new(i as u64)]);
        }
        assert_eq!(cache.get(&root(1)), Some(&[Gwei::new(11)][..]));
    }
}
