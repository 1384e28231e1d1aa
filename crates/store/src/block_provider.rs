//! `BlockProvider` (spec.md §6.3): the sole collaborator state regeneration needs for block
//! bodies it does not itself hold hot. `WithKnownBlocks` layers an in-memory override map over a
//! fallback provider, the way the teacher's own reader types compose (`beacon_state_reader.rs`'s
//! file-backed `BeaconStateReader` with a thin wrapper substituting already-known values before
//! falling back to disk).

use std::collections::HashMap;

use phase0_ssz::Bytes32;
use phase0_types::SignedBeaconBlock;

/// Looks up a full signed block by its root. Implementations may be backed by the hot store, the
/// cold archive, gossip, or (in tests) a fixed in-memory map.
pub trait BlockProvider {
    fn get(&self, block_root: &Bytes32) -> Option<SignedBeaconBlock>;
}

impl<F> BlockProvider for F
where
    F: Fn(&Bytes32) -> Option<SignedBeaconBlock>,
{
    fn get(&self, block_root: &Bytes32) -> Option<SignedBeaconBlock> {
        (self)(block_root)
    }
}

/// Returns `known[root]` first; falls back to `fallback.get(root)` only on a miss. Used during
/// state regeneration to splice in blocks that are only held in a transaction's pending set and
/// not yet committed to the store proper.
pub struct WithKnownBlocks<'a, P> {
    fallback: &'a P,
    known: &'a HashMap<Bytes32, SignedBeaconBlock>,
}

impl<'a, P> WithKnownBlocks<'a, P> {
    pub fn new(fallback: &'a P, known: &'a HashMap<Bytes32, SignedBeaconBlock>) -> Self {
        Self { fallback, known }
    }
}

impl<'a, P: BlockProvider> BlockProvider for WithKnownBlocks<'a, P> {
    fn get(&self, block_root: &Bytes32) -> Option<SignedBeaconBlock> {
        self.known
            .get(block_root)
            .cloned()
            .or_else(|| self.fallback.get(block_root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_provider() -> impl BlockProvider {
        |_: &Bytes32| None
    }

    #[test]
    fn known_blocks_are_preferred_over_the_fallback() {
        let fallback = empty_provider();
        let root = Bytes32::from([7u8; 32]);
        let mut known = HashMap::new();
        known.insert(root, sample_block());

        let layered = WithKnownBlocks::new(&fallback, &known);
        assert!(layered.get(&root).is_some());
    }

    #[test]
    fn misses_fall_through_to_the_fallback() {
        let root = Bytes32::from([9u8; 32]);
        let fallback = move |r: &Bytes32| if *r == root { Some(sample_block()) } else { None };
        let known = HashMap::new();
        let layered = WithKnownBlocks::new(&fallback, &known);
        assert!(layered.get(&root).is_some());
        assert!(layered.get(&Bytes32::from([1u8; 32])).is_none());
    }

    fn sample_block() -> SignedBeaconBlock {
        use phase0_types::containers::*;
        use ssz_types::VariableList;
        SignedBeaconBlock {
            message: BeaconBlock {
                slot: phase0_ssz::Slot::new(1),
                proposer_index: phase0_ssz::ValidatorIndex::new(0),
                parent_root: Bytes32::zero(),
                state_root: Bytes32::zero(),
                body: BeaconBlockBody {
                    randao_reveal: Default::default(),
                    eth1_data: Eth1Data {
                        deposit_root: Bytes32::zero(),
                        deposit_count: 0,
                        block_hash: Bytes32::zero(),
                    },
                    graffiti: Bytes32::zero(),
                    proposer_slashings: VariableList::empty(),
                    attester_slashings: VariableList::empty(),
                    attestations: VariableList::empty(),
                    deposits: VariableList::empty(),
                    voluntary_exits: VariableList::empty(),
                },
            },
            signature: Default::default(),
        }
    }
}
