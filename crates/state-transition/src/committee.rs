//! Validator-set bookkeeping: active-index queries, seed derivation, swap-or-not shuffling,
//! committee assignment and proposer selection.
//!
//! Grounded on the retrieval pack's `ream` `misc.rs` (`compute_shuffled_index`,
//! `compute_committee`, `compute_epoch_at_slot`), reimplemented against this crate's own
//! `BeaconState`/`SpecConfig`/newtype primitives instead of `ream`'s `alloy_primitives::B256`
//! and global constants.

use ethereum_hashing::hash;

use phase0_ssz::{Bytes32, Epoch, Gwei, Slot, ValidatorIndex};
use phase0_types::{BeaconState, SpecConfig};

use crate::error::{Result, StateTransitionError};

pub fn compute_epoch_at_slot(slot: Slot, config: &SpecConfig) -> Epoch {
    Epoch::new(slot.as_u64() / config.slots_per_epoch)
}

pub fn compute_start_slot_at_epoch(epoch: Epoch, config: &SpecConfig) -> Slot {
    Slot::new(epoch.as_u64() * config.slots_per_epoch)
}

pub fn compute_activation_exit_epoch(epoch: Epoch, config: &SpecConfig) -> Epoch {
    Epoch::new(epoch.as_u64() + 1 + config.max_seed_lookahead)
}

pub fn get_current_epoch(state: &BeaconState, config: &SpecConfig) -> Epoch {
    compute_epoch_at_slot(state.slot, config)
}

pub fn get_previous_epoch(state: &BeaconState, config: &SpecConfig) -> Epoch {
    let current = get_current_epoch(state, config);
    if current.as_u64() == config.genesis_epoch {
        current
    } else {
        Epoch::new(current.as_u64() - 1)
    }
}

pub fn is_active_validator(validator: &phase0_types::Validator, epoch: Epoch) -> bool {
    validator.activation_epoch.as_u64() <= epoch.as_u64()
        && epoch.as_u64() < validator.exit_epoch.as_u64()
}

pub fn is_slashable_validator(validator: &phase0_types::Validator, epoch: Epoch) -> bool {
    !validator.slashed
        && validator.activation_epoch.as_u64() <= epoch.as_u64()
        && epoch.as_u64() < validator.withdrawable_epoch.as_u64()
}

pub fn get_active_validator_indices(state: &BeaconState, epoch: Epoch) -> Vec<ValidatorIndex> {
    state
        .validators
        .iter()
        .enumerate()
        .filter(|(_, v)| is_active_validator(v, epoch))
        .map(|(i, _)| ValidatorIndex::new(i as u64))
        .collect()
}

/// Sum of effective balances, floored at `EFFECTIVE_BALANCE_INCREMENT` so a committee of zero
/// weight never causes a later division by zero.
pub fn get_total_balance(state: &BeaconState, indices: &[ValidatorIndex], config: &SpecConfig) -> Gwei {
    let sum: u64 = indices
        .iter()
        .map(|&i| state.validators[i.as_u64() as usize].effective_balance.as_u64())
        .sum();
    Gwei::new(sum.max(config.effective_balance_increment.as_u64()))
}

pub fn get_total_active_balance(state: &BeaconState, config: &SpecConfig) -> Gwei {
    let epoch = get_current_epoch(state, config);
    let indices = get_active_validator_indices(state, epoch);
    get_total_balance(state, &indices, config)
}

pub fn get_randao_mix(state: &BeaconState, epoch: Epoch, config: &SpecConfig) -> Bytes32 {
    state.randao_mixes[(epoch.as_u64() % config.epochs_per_historical_vector) as usize]
}

/// `get_seed`: domain-separated hash of a randao mix from `MIN_SEED_LOOKAHEAD + 1` epochs back,
/// so that no validator can bias their own committee assignment at proposal time.
pub fn get_seed(state: &BeaconState, epoch: Epoch, domain_type: u32, config: &SpecConfig) -> Bytes32 {
    let mix_epoch = Epoch::new(
        epoch.as_u64() + config.epochs_per_historical_vector - config.min_seed_lookahead - 1,
    );
    let mix = get_randao_mix(state, mix_epoch, config);

    let mut input = Vec::with_capacity(4 + 8 + 32);
    input.extend_from_slice(&domain_type.to_le_bytes());
    input.extend_from_slice(&epoch.as_u64().to_le_bytes());
    input.extend_from_slice(mix.as_bytes());
    Bytes32::from_slice(&hash(&input)).expect("sha256 output is 32 bytes")
}

fn bytes_to_u64(slice: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    let len = slice.len().min(8);
    bytes[..len].copy_from_slice(&slice[..len]);
    u64::from_le_bytes(bytes)
}

/// The "swap-or-not" shuffle: deterministic permutation of `0..index_count` driven by `seed`,
/// run for `round_count` rounds (a compile-time spec constant made an explicit `SpecConfig`
/// field here per spec.md §9's "global singletons become explicit configuration").
pub fn compute_shuffled_index(
    mut index: u64,
    index_count: u64,
    seed: Bytes32,
    round_count: u64,
) -> Result<u64> {
    if index >= index_count {
        return Err(StateTransitionError::InvalidHeader(
            "shuffle index out of bounds",
        ));
    }

    for round in 0..round_count {
        let mut seed_with_round = Vec::with_capacity(33);
        seed_with_round.extend_from_slice(seed.as_bytes());
        seed_with_round.push(round as u8);

        let pivot = bytes_to_u64(&hash(&seed_with_round)[..8]) % index_count;
        let flip = (pivot + (index_count - index)) % index_count;
        let position = index.max(flip);

        let mut seed_with_position = seed_with_round.clone();
        seed_with_position.extend_from_slice(&((position / 256) as u32).to_le_bytes());
        let source = hash(&seed_with_position);
        let byte = source[((position % 256) / 8) as usize];
        let bit = (byte >> (position % 8)) & 1;

        index = if bit == 1 { flip } else { index };
    }

    Ok(index)
}

pub fn compute_committee(
    indices: &[ValidatorIndex],
    seed: Bytes32,
    index: u64,
    count: u64,
    round_count: u64,
) -> Result<Vec<ValidatorIndex>> {
    let len = indices.len() as u64;
    let start = (len * index) / count;
    let end = (len * (index + 1)) / count;
    (start..end)
        .map(|i| {
            let shuffled = compute_shuffled_index(i, len, seed, round_count)?;
            Ok(indices[shuffled as usize])
        })
        .collect()
}

pub fn get_committee_count_per_slot(state: &BeaconState, epoch: Epoch, config: &SpecConfig) -> u64 {
    let active_count = get_active_validator_indices(state, epoch).len() as u64;
    (active_count / config.slots_per_epoch / config.target_committee_size)
        .clamp(1, config.max_committees_per_slot)
}

pub fn get_beacon_committee(
    state: &BeaconState,
    slot: Slot,
    committee_index: u64,
    config: &SpecConfig,
) -> Result<Vec<ValidatorIndex>> {
    let epoch = compute_epoch_at_slot(slot, config);
    let committees_per_slot = get_committee_count_per_slot(state, epoch, config);
    let indices = get_active_validator_indices(state, epoch);
    let seed = get_seed(state, epoch, config.domain_beacon_attester, config);

    let slot_offset = slot.as_u64() % config.slots_per_epoch;
    let committee_position = slot_offset * committees_per_slot + committee_index;
    let total_committees = committees_per_slot * config.slots_per_epoch;

    compute_committee(
        &indices,
        seed,
        committee_position,
        total_committees,
        config.shuffle_round_count,
    )
}

const MAX_RANDOM_BYTE: u64 = 255;

/// `compute_proposer_index`: random-byte rejection sampling weighted by effective balance, so a
/// validator at `MAX_EFFECTIVE_BALANCE` is proportionally more likely to be picked than one just
/// above the activation threshold.
pub fn compute_proposer_index(
    state: &BeaconState,
    indices: &[ValidatorIndex],
    seed: Bytes32,
    config: &SpecConfig,
) -> Result<ValidatorIndex> {
    if indices.is_empty() {
        return Err(StateTransitionError::InvalidHeader(
            "no active validators to select a proposer from",
        ));
    }

    let total = indices.len() as u64;
    let mut i: u64 = 0;
    loop {
        let shuffled = compute_shuffled_index(i % total, total, seed, config.shuffle_round_count)?;
        let candidate_index = indices[shuffled as usize];

        let mut hash_input = Vec::with_capacity(40);
        hash_input.extend_from_slice(seed.as_bytes());
        hash_input.extend_from_slice(&(i / 32).to_le_bytes());
        let random_byte = hash(&hash_input)[(i % 32) as usize] as u64;

        let effective_balance = state.validators[candidate_index.as_u64() as usize]
            .effective_balance
            .as_u64();
        if effective_balance * MAX_RANDOM_BYTE
            >= config.max_effective_balance.as_u64() * random_byte
        {
            return Ok(candidate_index);
        }
        i += 1;
    }
}

pub fn get_beacon_proposer_index(
    state: &BeaconState,
    config: &SpecConfig,
) -> Result<ValidatorIndex> {
    let epoch = get_current_epoch(state, config);
    let mut seed_input = get_seed(state, epoch, config.domain_beacon_proposer, config)
        .as_bytes()
        .to_vec();
    seed_input.extend_from_slice(&state.slot.as_u64().to_le_bytes());
    let seed = Bytes32::from_slice(&hash(&seed_input)).expect("sha256 output is 32 bytes");

    let indices = get_active_validator_indices(state, epoch);
    compute_proposer_index(state, &indices, seed, config)
}

pub fn get_validator_churn_limit(state: &BeaconState, config: &SpecConfig) -> u64 {
    let epoch = get_current_epoch(state, config);
    let active_count = get_active_validator_indices(state, epoch).len() as u64;
    (active_count / config.churn_limit_quotient).max(config.min_per_epoch_churn_limit)
}

/// `get_block_root_at_slot`: the historical root cached for `slot`, which must lie in the
/// `[state.slot - SLOTS_PER_HISTORICAL_ROOT, state.slot)` window the ring buffer still holds.
pub fn get_block_root_at_slot(state: &BeaconState, slot: Slot, config: &SpecConfig) -> Result<Bytes32> {
    if slot.as_u64() >= state.slot.as_u64()
        || state.slot.as_u64() > slot.as_u64() + config.slots_per_historical_root
    {
        return Err(StateTransitionError::InvalidHeader(
            "slot outside the block_roots ring buffer window",
        ));
    }
    Ok(state.block_roots[(slot.as_u64() % config.slots_per_historical_root) as usize])
}

/// `get_block_root`: the root of the first slot of `epoch`.
pub fn get_block_root(state: &BeaconState, epoch: Epoch, config: &SpecConfig) -> Result<Bytes32> {
    get_block_root_at_slot(state, compute_start_slot_at_epoch(epoch, config), config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shuffle_is_a_permutation() {
        let seed = Bytes32([7u8; 32]);
        let n = 32u64;
        let mut seen = std::collections::HashSet::new();
        for i in 0..n {
            let shuffled = compute_shuffled_index(i, n, seed, 10).unwrap();
            assert!(shuffled < n);
            assert!(seen.insert(shuffled));
        }
    }

    #[test]
    fn shuffle_is_deterministic() {
        let seed = Bytes32([3u8; 32]);
        let a = compute_shuffled_index(5, 20, seed, 10).unwrap();
        let b = compute_shuffled_index(5, 20, seed, 10).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn epoch_arithmetic_round_trips() {
        let config = SpecConfig::mainnet();
        let slot = Slot::new(config.slots_per_epoch * 3 + 5);
        let epoch = compute_epoch_at_slot(slot, &config);
        assert_eq!(epoch.as_u64(), 3);
        assert_eq!(
            compute_start_slot_at_epoch(epoch, &config).as_u64(),
            config.slots_per_epoch * 3
        );
    }
}
