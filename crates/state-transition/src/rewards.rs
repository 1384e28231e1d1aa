//! Reward/penalty accounting (spec.md §4.E epoch-processing step 2): base rewards, the
//! source/target/head micro-incentive pipeline, inclusion-delay and proposer rewards, and the
//! inactivity-leak penalty.
//!
//! Grounded on the consensus-spec phase0 `get_attestation_deltas` algorithm (no single teacher
//! file covers this — the teacher only reads finalized states); reimplemented here against this
//! crate's own `BeaconState`/`SpecConfig`/newtype primitives. DESIGN.md records the Open
//! Question decision on base-reward rounding order.

use std::collections::HashSet;

use phase0_ssz::{Gwei, ValidatorIndex};
use phase0_types::{BeaconState, PendingAttestation, SpecConfig};

use crate::committee::{
    get_beacon_committee, get_block_root, get_block_root_at_slot, get_current_epoch,
    get_previous_epoch, get_total_active_balance, get_total_balance, is_active_validator,
};
use crate::error::Result;

/// `integer_squareroot`: largest `x` such that `x*x <= n`.
pub fn integer_squareroot(n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

pub fn get_base_reward(state: &BeaconState, index: ValidatorIndex, config: &SpecConfig) -> Gwei {
    let total_balance = get_total_active_balance(state, config).as_u64();
    let effective_balance = state.validators[index.as_u64() as usize].effective_balance.as_u64();
    Gwei::new(
        effective_balance * config.base_reward_factor
            / integer_squareroot(total_balance)
            / config.base_rewards_per_epoch,
    )
}

pub fn get_proposer_reward(state: &BeaconState, index: ValidatorIndex, config: &SpecConfig) -> Gwei {
    Gwei::new(get_base_reward(state, index, config).as_u64() / config.proposer_reward_quotient)
}

pub fn get_finality_delay(state: &BeaconState, config: &SpecConfig) -> u64 {
    get_previous_epoch(state, config).as_u64() - state.finalized_checkpoint.epoch.as_u64()
}

pub fn is_in_inactivity_leak(state: &BeaconState, config: &SpecConfig) -> bool {
    get_finality_delay(state, config) > config.min_epochs_to_inactivity_penalty
}

fn get_attesting_indices(
    state: &BeaconState,
    attestation: &PendingAttestation,
    config: &SpecConfig,
) -> Result<Vec<ValidatorIndex>> {
    let committee = get_beacon_committee(
        state,
        attestation.data.slot,
        attestation.data.index.as_u64(),
        config,
    )?;
    Ok(committee
        .into_iter()
        .enumerate()
        .filter(|(i, _)| attestation.aggregation_bits.get(*i).unwrap_or(false))
        .map(|(_, index)| index)
        .collect())
}

/// Attestations in `previous_epoch_attestations`/`current_epoch_attestations` whose target epoch
/// is `epoch` (the only valid value given which rolling list holds attestations for which epoch).
fn matching_source_attestations<'a>(
    state: &'a BeaconState,
    epoch: phase0_ssz::Epoch,
    config: &SpecConfig,
) -> Result<&'a [PendingAttestation]> {
    if epoch == get_current_epoch(state, config) {
        Ok(&state.current_epoch_attestations)
    } else if epoch == get_previous_epoch(state, config) {
        Ok(&state.previous_epoch_attestations)
    } else {
        Err(crate::error::StateTransitionError::InvalidHeader(
            "epoch is neither the previous nor the current epoch",
        ))
    }
}

pub(crate) fn matching_target_attestations(
    state: &BeaconState,
    epoch: phase0_ssz::Epoch,
    config: &SpecConfig,
) -> Result<Vec<PendingAttestation>> {
    let target_root = get_block_root(state, epoch, config)?;
    Ok(matching_source_attestations(state, epoch, config)?
        .iter()
        .filter(|a| a.data.target.root == target_root)
        .cloned()
        .collect())
}

fn matching_head_attestations(
    state: &BeaconState,
    epoch: phase0_ssz::Epoch,
    config: &SpecConfig,
) -> Result<Vec<PendingAttestation>> {
    let mut out = Vec::new();
    for attestation in matching_target_attestations(state, epoch, config)? {
        let slot_root = get_block_root_at_slot(state, attestation.data.slot, config)?;
        if attestation.data.beacon_block_root == slot_root {
            out.push(attestation);
        }
    }
    Ok(out)
}

pub(crate) fn unslashed_attesting_indices(
    state: &BeaconState,
    attestations: &[PendingAttestation],
    config: &SpecConfig,
) -> Result<HashSet<ValidatorIndex>> {
    let mut out = HashSet::new();
    for attestation in attestations {
        for index in get_attesting_indices(state, attestation, config)? {
            if !state.validators[index.as_u64() as usize].slashed {
                out.insert(index);
            }
        }
    }
    Ok(out)
}

/// Sum of effective balances of the unslashed validators attesting in `attestations`.
pub(crate) fn get_attesting_balance(
    state: &BeaconState,
    attestations: &[PendingAttestation],
    config: &SpecConfig,
) -> Result<Gwei> {
    let indices = unslashed_attesting_indices(state, attestations, config)?;
    Ok(get_total_balance(
        state,
        &indices.into_iter().collect::<Vec<_>>(),
        config,
    ))
}

/// The validators eligible for a reward/penalty this epoch: active in the previous epoch, or
/// slashed but not yet past their withdrawable epoch.
fn eligible_validator_indices(state: &BeaconState, config: &SpecConfig) -> Vec<ValidatorIndex> {
    let previous_epoch = get_previous_epoch(state, config);
    state
        .validators
        .iter()
        .enumerate()
        .filter(|(_, v)| {
            is_active_validator(v, previous_epoch)
                || (v.slashed && previous_epoch.as_u64() + 1 < v.withdrawable_epoch.as_u64())
        })
        .map(|(i, _)| ValidatorIndex::new(i as u64))
        .collect()
}

/// `get_attestation_deltas`: per-validator `(rewards, penalties)` for every validator index, in
/// `BeaconState.validators` order.
pub fn get_attestation_deltas(state: &BeaconState, config: &SpecConfig) -> Result<(Vec<Gwei>, Vec<Gwei>)> {
    let previous_epoch = get_previous_epoch(state, config);
    let total_balance = get_total_active_balance(state, config).as_u64();
    let increment = config.effective_balance_increment.as_u64();
    let validator_count = state.validators.len();

    let mut rewards = vec![0u64; validator_count];
    let mut penalties = vec![0u64; validator_count];
    let eligible = eligible_validator_indices(state, config);

    let source_attestations = matching_source_attestations(state, previous_epoch, config)?.to_vec();
    let target_attestations = matching_target_attestations(state, previous_epoch, config)?;
    let head_attestations = matching_head_attestations(state, previous_epoch, config)?;

    for attestations in [&source_attestations, &target_attestations, &head_attestations] {
        let attesting = unslashed_attesting_indices(state, attestations, config)?;
        let attesting_balance = get_total_balance(
            state,
            &attesting.iter().copied().collect::<Vec<_>>(),
            config,
        )
        .as_u64();

        for &index in &eligible {
            let base_reward = get_base_reward(state, index, config).as_u64();
            let i = index.as_u64() as usize;
            if attesting.contains(&index) {
                if is_in_inactivity_leak(state, config) {
                    rewards[i] += base_reward;
                } else {
                    let reward_numerator = base_reward * (attesting_balance / increment);
                    rewards[i] += reward_numerator / (total_balance / increment);
                }
            } else {
                penalties[i] += base_reward;
            }
        }
    }

    let source_attesting = unslashed_attesting_indices(state, &source_attestations, config)?;
    for &index in &source_attesting {
        let best = source_attestations
            .iter()
            .filter(|a| {
                get_attesting_indices(state, a, config)
                    .map(|indices| indices.contains(&index))
                    .unwrap_or(false)
            })
            .min_by_key(|a| a.inclusion_delay.as_u64())
            .ok_or(crate::error::StateTransitionError::InvalidHeader(
                "attesting index has no matching source attestation",
            ))?;

        let proposer_reward = get_proposer_reward(state, index, config).as_u64();
        rewards[best.proposer_index.as_u64() as usize] += proposer_reward;

        let base_reward = get_base_reward(state, index, config).as_u64();
        let max_attester_reward = base_reward.saturating_sub(proposer_reward);
        rewards[index.as_u64() as usize] += max_attester_reward / best.inclusion_delay.as_u64();
    }

    let finality_delay = get_finality_delay(state, config);
    if finality_delay > config.min_epochs_to_inactivity_penalty {
        let target_attesting = unslashed_attesting_indices(state, &target_attestations, config)?;
        for &index in &eligible {
            let i = index.as_u64() as usize;
            let base_reward = get_base_reward(state, index, config).as_u64();
            penalties[i] += config.base_rewards_per_epoch * base_reward;
            if !target_attesting.contains(&index) {
                let effective_balance =
                    state.validators[i].effective_balance.as_u64();
                penalties[i] += effective_balance * finality_delay / config.inactivity_penalty_quotient;
            }
        }
    }

    Ok((
        rewards.into_iter().map(Gwei::new).collect(),
        penalties.into_iter().map(Gwei::new).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_squareroot_matches_known_values() {
        assert_eq!(integer_squareroot(0), 0);
        assert_eq!(integer_squareroot(1), 1);
        assert_eq!(integer_squareroot(3), 1);
        assert_eq!(integer_squareroot(4), 2);
        assert_eq!(integer_squareroot(999), 31);
    }
}
