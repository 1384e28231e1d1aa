//! `process_epoch` (spec.md §4.E): the six ordered sub-steps run at every epoch boundary —
//! justification/finalization, rewards and penalties, registry updates, slashings, effective
//! balance updates, and final bookkeeping.
//!
//! Grounded on the consensus-spec phase0 epoch-processing pseudocode; no teacher file covers
//! this (the teacher only ever reads an already-finalized `BeaconState`), so this module is
//! built directly against this crate's `BeaconState`/`SpecConfig`/newtype primitives, in the
//! style the rest of this crate already establishes.

use ssz_types::{FixedVector, VariableList};

use phase0_ssz::{Bytes32, Epoch, Gwei, ValidatorIndex, FAR_FUTURE_EPOCH};
use phase0_types::{BeaconStateBuilder, Checkpoint, JustificationBits, SpecConfig, Validator};

use crate::committee::{
    compute_activation_exit_epoch, get_block_root, get_current_epoch, get_previous_epoch,
    get_total_active_balance, get_validator_churn_limit, is_active_validator,
};
use crate::error::{Result, StateTransitionError};
use crate::rewards::{get_attestation_deltas, get_attesting_balance, matching_target_attestations};

pub fn process_epoch(builder: &mut BeaconStateBuilder, config: &SpecConfig) -> Result<()> {
    process_justification_and_finalization(builder, config)?;
    process_rewards_and_penalties(builder, config)?;
    process_registry_updates(builder, config)?;
    process_slashings(builder, config)?;
    process_effective_balance_updates(builder, config);
    process_final_updates(builder, config)?;
    Ok(())
}

fn bit(bits: &JustificationBits, i: usize) -> bool {
    bits.get(i).unwrap_or(false)
}

/// `process_justification_and_finalization`: rotates the justification-bits window, justifies
/// the previous/current epoch if 2/3 of active balance attests to it, then finalizes any
/// checkpoint one of the four standard bit patterns covers.
fn process_justification_and_finalization(
    builder: &mut BeaconStateBuilder,
    config: &SpecConfig,
) -> Result<()> {
    let current_epoch = get_current_epoch(builder.state(), config);
    if current_epoch.as_u64() <= config.genesis_epoch + 1 {
        return Ok(());
    }

    let previous_epoch = get_previous_epoch(builder.state(), config);
    let old_previous_justified = builder.state().previous_justified_checkpoint;
    let old_current_justified = builder.state().current_justified_checkpoint;

    builder.state_mut().previous_justified_checkpoint = old_current_justified;

    let mut bits = [false; 4];
    for (i, slot) in bits.iter_mut().enumerate().skip(1) {
        *slot = bit(&builder.state().justification_bits, i - 1);
    }

    let total_active_balance = get_total_active_balance(builder.state(), config).as_u64();

    let previous_target_attestations = matching_target_attestations(builder.state(), previous_epoch, config)?;
    let previous_attesting_balance =
        get_attesting_balance(builder.state(), &previous_target_attestations, config)?.as_u64();
    if previous_attesting_balance * 3 >= total_active_balance * 2 {
        let root = get_block_root(builder.state(), previous_epoch, config)?;
        builder.state_mut().current_justified_checkpoint = Checkpoint {
            epoch: previous_epoch,
            root,
        };
        bits[1] = true;
    }

    let current_target_attestations = matching_target_attestations(builder.state(), current_epoch, config)?;
    let current_attesting_balance =
        get_attesting_balance(builder.state(), &current_target_attestations, config)?.as_u64();
    if current_attesting_balance * 3 >= total_active_balance * 2 {
        let root = get_block_root(builder.state(), current_epoch, config)?;
        builder.state_mut().current_justified_checkpoint = Checkpoint {
            epoch: current_epoch,
            root,
        };
        bits[0] = true;
    }

    let mut new_bits = JustificationBits::default();
    for (i, &value) in bits.iter().enumerate() {
        new_bits
            .set(i, value)
            .map_err(|_| StateTransitionError::InvalidHeader("justification bitvector index out of range"))?;
    }
    builder.state_mut().justification_bits = new_bits;

    let ce = current_epoch.as_u64();
    if bits[1] && bits[2] && bits[3] && old_previous_justified.epoch.as_u64() + 3 == ce {
        builder.state_mut().finalized_checkpoint = old_previous_justified;
    }
    if bits[1] && bits[2] && old_previous_justified.epoch.as_u64() + 2 == ce {
        builder.state_mut().finalized_checkpoint = old_previous_justified;
    }
    if bits[0] && bits[1] && bits[2] && old_current_justified.epoch.as_u64() + 2 == ce {
        builder.state_mut().finalized_checkpoint = old_current_justified;
    }
    if bits[0] && bits[1] && old_current_justified.epoch.as_u64() + 1 == ce {
        builder.state_mut().finalized_checkpoint = old_current_justified;
    }

    Ok(())
}

/// `process_rewards_and_penalties`: applies every validator's attestation-derived delta in one
/// pass. A no-op at genesis (`get_previous_epoch` would otherwise look at the same epoch).
fn process_rewards_and_penalties(builder: &mut BeaconStateBuilder, config: &SpecConfig) -> Result<()> {
    if get_current_epoch(builder.state(), config).as_u64() == config.genesis_epoch {
        return Ok(());
    }

    let (rewards, penalties) = get_attestation_deltas(builder.state(), config)?;
    for i in 0..builder.state().validators.len() {
        let index = ValidatorIndex::new(i as u64);
        builder.increase_balance(index, rewards[i])?;
        builder.decrease_balance(index, penalties[i])?;
    }
    Ok(())
}

/// `process_registry_updates`: advances activation eligibility, ejects under-balance validators,
/// and activates queued validators up to the per-epoch churn limit.
fn process_registry_updates(builder: &mut BeaconStateBuilder, config: &SpecConfig) -> Result<()> {
    let current_epoch = get_current_epoch(builder.state(), config);
    let validator_count = builder.state().validators.len();

    for i in 0..validator_count {
        let index = ValidatorIndex::new(i as u64);
        let validator = builder.state().validators[i].clone();

        if is_eligible_for_activation_queue(&validator, config) {
            builder.patch_validator(index, |v| {
                v.activation_eligibility_epoch = Epoch::new(current_epoch.as_u64() + 1);
            })?;
        }

        if is_active_validator(&validator, current_epoch)
            && validator.effective_balance.as_u64() <= config.ejection_balance.as_u64()
        {
            crate::validator_registry::initiate_validator_exit(builder, index, config)?;
        }
    }

    let activation_exit_epoch = compute_activation_exit_epoch(current_epoch, config);
    let mut activation_queue: Vec<ValidatorIndex> = (0..builder.state().validators.len())
        .map(ValidatorIndex::new)
        .filter(|&index| {
            let v = &builder.state().validators[index.as_u64() as usize];
            v.activation_eligibility_epoch.as_u64() != FAR_FUTURE_EPOCH.as_u64()
                && v.activation_epoch.as_u64() == FAR_FUTURE_EPOCH.as_u64()
        })
        .collect();
    activation_queue.sort_by_key(|&index| {
        (
            builder.state().validators[index.as_u64() as usize]
                .activation_eligibility_epoch
                .as_u64(),
            index.as_u64(),
        )
    });

    let churn_limit = get_validator_churn_limit(builder.state(), config) as usize;
    for &index in activation_queue.iter().take(churn_limit) {
        builder.patch_validator(index, |v| {
            v.activation_epoch = activation_exit_epoch;
        })?;
    }

    Ok(())
}

fn is_eligible_for_activation_queue(validator: &Validator, config: &SpecConfig) -> bool {
    validator.activation_eligibility_epoch.as_u64() == FAR_FUTURE_EPOCH.as_u64()
        && validator.effective_balance.as_u64() >= config.max_effective_balance.as_u64()
}

/// `process_slashings`: burns a proportional slice of every currently-slashed validator's
/// effective balance, scaled by the total slashed weight this slashings epoch window holds.
fn process_slashings(builder: &mut BeaconStateBuilder, config: &SpecConfig) -> Result<()> {
    let current_epoch = get_current_epoch(builder.state(), config);
    let total_balance = get_total_active_balance(builder.state(), config).as_u64();

    let total_slashings: u64 = builder
        .state()
        .slashings
        .iter()
        .map(|s| s.as_u64())
        .sum();
    let adjusted_total_slashing_balance = total_slashings
        .saturating_mul(config.proportional_slashing_multiplier)
        .min(total_balance);

    let increment = config.effective_balance_increment.as_u64();
    let validator_count = builder.state().validators.len();
    for i in 0..validator_count {
        let validator = builder.state().validators[i].clone();
        let withdrawable_at_half_window =
            current_epoch.as_u64() + config.epochs_per_slashings_vector / 2 == validator.withdrawable_epoch.as_u64();
        if validator.slashed && withdrawable_at_half_window {
            let effective_balance = validator.effective_balance.as_u64();
            let penalty_numerator =
                (effective_balance / increment) * adjusted_total_slashing_balance;
            let penalty = (penalty_numerator / total_balance) * increment;
            builder.decrease_balance(ValidatorIndex::new(i as u64), Gwei::new(penalty))?;
        }
    }
    Ok(())
}

/// `process_effective_balance_updates`: re-derives each validator's effective balance from its
/// raw balance, with hysteresis so a balance oscillating near a threshold doesn't flip the
/// effective balance back and forth every epoch.
fn process_effective_balance_updates(builder: &mut BeaconStateBuilder, config: &SpecConfig) {
    let increment = config.effective_balance_increment.as_u64();
    let hysteresis_increment = increment / config.hysteresis_quotient;
    let downward_threshold = hysteresis_increment * config.hysteresis_downward_multiplier;
    let upward_threshold = hysteresis_increment * config.hysteresis_upward_multiplier;

    let validator_count = builder.state().validators.len();
    for i in 0..validator_count {
        let balance = builder.state().balances[i].as_u64();
        let effective_balance = builder.state().validators[i].effective_balance.as_u64();

        if balance + downward_threshold < effective_balance
            || effective_balance + upward_threshold < balance
        {
            let new_effective_balance = (balance - balance % increment)
                .min(config.max_effective_balance.as_u64());
            builder.state_mut().validators[i].effective_balance = Gwei::new(new_effective_balance);
        }
    }
}

/// `process_final_updates`: the per-epoch rotations unrelated to reward accounting — eth1 vote
/// reset, slashings-ring reset, randao mix carry-forward, historical-root accumulation, and
/// swapping the current/previous pending-attestation lists.
fn process_final_updates(builder: &mut BeaconStateBuilder, config: &SpecConfig) -> Result<()> {
    let current_epoch = get_current_epoch(builder.state(), config);
    let next_epoch = Epoch::new(current_epoch.as_u64() + 1);

    if (builder.state().eth1_data_votes.len() as u64) == config.epochs_per_eth1_voting_period {
        builder.state_mut().eth1_data_votes = VariableList::empty();
    }

    let slashings_index = (next_epoch.as_u64() % config.epochs_per_slashings_vector) as usize;
    builder.state_mut().slashings[slashings_index] = Gwei::new(0);

    let mix_index = (next_epoch.as_u64() % config.epochs_per_historical_vector) as usize;
    let current_mix_index = (current_epoch.as_u64() % config.epochs_per_historical_vector) as usize;
    let carried_mix = builder.state().randao_mixes[current_mix_index];
    builder.state_mut().randao_mixes[mix_index] = carried_mix;

    if (next_epoch.as_u64() % (config.slots_per_historical_root / config.slots_per_epoch)) == 0 {
        let block_roots_root = hash_tree_root_fixed_vector(&builder.state().block_roots);
        let state_roots_root = hash_tree_root_fixed_vector(&builder.state().state_roots);
        builder
            .state_mut()
            .historical_roots
            .push(mix_historical_summary(block_roots_root, state_roots_root))
            .map_err(|_| phase0_types::TypesError::MaxLengthExceeded {
                field: "historical_roots",
                max: config.historical_roots_limit as usize,
            })?;
    }

    let state = builder.state_mut();
    state.previous_epoch_attestations =
        std::mem::replace(&mut state.current_epoch_attestations, VariableList::empty());

    Ok(())
}

fn hash_tree_root_fixed_vector(
    vector: &FixedVector<Bytes32, phase0_types::eth_spec::SlotsPerHistoricalRoot>,
) -> Bytes32 {
    use tree_hash::TreeHash;
    Bytes32::from_slice(vector.tree_hash_root().as_bytes()).expect("sha256-derived root is 32 bytes")
}

fn mix_historical_summary(block_roots_root: Bytes32, state_roots_root: Bytes32) -> Bytes32 {
    let mut input = Vec::with_capacity(64);
    input.extend_from_slice(block_roots_root.as_bytes());
    input.extend_from_slice(state_roots_root.as_bytes());
    Bytes32::from_slice(&ethereum_hashing::hash(&input)).expect("sha256 output is 32 bytes")
}
