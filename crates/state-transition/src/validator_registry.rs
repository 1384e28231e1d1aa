//! Registry mutations shared by genesis construction, the `Deposit` operation and epoch
//! processing: adding a new validator, exit-queue placement, and slashing.

use phase0_ssz::{Gwei, ValidatorIndex, FAR_FUTURE_EPOCH};
use phase0_types::{BeaconStateBuilder, SpecConfig, Validator};

use crate::committee::{get_beacon_proposer_index, get_current_epoch, get_validator_churn_limit};
use crate::error::Result;

pub fn get_validator_index_by_pubkey(
    builder: &BeaconStateBuilder,
    pubkey: &phase0_types::containers::BlsPublicKey,
) -> Option<ValidatorIndex> {
    builder
        .state()
        .validators
        .iter()
        .position(|v| &v.pubkey == pubkey)
        .map(|i| ValidatorIndex::new(i as u64))
}

/// Appends a brand-new validator (and matching balance entry) for a first-time pubkey, with
/// effective balance rounded down to the nearest increment and capped at the maximum.
pub fn add_validator_to_registry(
    builder: &mut BeaconStateBuilder,
    pubkey: phase0_types::containers::BlsPublicKey,
    withdrawal_credentials: phase0_types::containers::WithdrawalCredentials,
    amount: Gwei,
    config: &SpecConfig,
) -> Result<()> {
    let effective_balance = Gwei::new(
        (amount.as_u64() - amount.as_u64() % config.effective_balance_increment.as_u64())
            .min(config.max_effective_balance.as_u64()),
    );

    let validator = Validator {
        pubkey,
        withdrawal_credentials,
        effective_balance,
        slashed: false,
        activation_eligibility_epoch: FAR_FUTURE_EPOCH,
        activation_epoch: FAR_FUTURE_EPOCH,
        exit_epoch: FAR_FUTURE_EPOCH,
        withdrawable_epoch: FAR_FUTURE_EPOCH,
    };

    use phase0_types::eth_spec::{Unsigned, ValidatorRegistryLimit};

    let state = builder.state_mut();
    state
        .validators
        .push(validator)
        .map_err(|_| phase0_types::TypesError::MaxLengthExceeded {
            field: "validators",
            max: ValidatorRegistryLimit::to_usize(),
        })?;
    state
        .balances
        .push(amount)
        .map_err(|_| phase0_types::TypesError::MaxLengthExceeded {
            field: "balances",
            max: ValidatorRegistryLimit::to_usize(),
        })?;
    Ok(())
}

/// Places a validator in the exit queue, enforcing the per-epoch churn limit (spec.md §4.E
/// registry-updates step / `VoluntaryExit` operation).
pub fn initiate_validator_exit(
    builder: &mut BeaconStateBuilder,
    index: ValidatorIndex,
    config: &SpecConfig,
) -> Result<()> {
    if builder.state().validators[index.as_u64() as usize]
        .exit_epoch
        .as_u64()
        != FAR_FUTURE_EPOCH.as_u64()
    {
        return Ok(());
    }

    let current_epoch = get_current_epoch(builder.state(), config);
    let churn_limit = get_validator_churn_limit(builder.state(), config);

    let activation_exit_epoch = crate::committee::compute_activation_exit_epoch(current_epoch, config);
    let mut exit_queue_epoch = builder
        .state()
        .validators
        .iter()
        .map(|v| v.exit_epoch.as_u64())
        .filter(|&e| e != FAR_FUTURE_EPOCH.as_u64())
        .max()
        .map(|max_epoch| max_epoch.max(activation_exit_epoch.as_u64()))
        .unwrap_or(activation_exit_epoch.as_u64());

    let exit_queue_churn = builder
        .state()
        .validators
        .iter()
        .filter(|v| v.exit_epoch.as_u64() == exit_queue_epoch)
        .count() as u64;
    if exit_queue_churn >= churn_limit {
        exit_queue_epoch += 1;
    }

    builder.patch_validator(index, |v| {
        v.exit_epoch = phase0_ssz::Epoch::new(exit_queue_epoch);
        v.withdrawable_epoch =
            phase0_ssz::Epoch::new(exit_queue_epoch + config.min_validator_withdrawability_delay);
    })?;
    Ok(())
}

/// Slashes a validator: queues their exit, burns a slice of their effective balance, and
/// rewards the whistleblower (defaulting to the current proposer) per spec.md §4.E.
pub fn slash_validator(
    builder: &mut BeaconStateBuilder,
    slashed_index: ValidatorIndex,
    whistleblower_index: Option<ValidatorIndex>,
    config: &SpecConfig,
) -> Result<()> {
    let current_epoch = get_current_epoch(builder.state(), config);
    initiate_validator_exit(builder, slashed_index, config)?;

    let effective_balance = builder.state().validators[slashed_index.as_u64() as usize]
        .effective_balance
        .as_u64();

    builder.patch_validator(slashed_index, |v| {
        v.slashed = true;
        v.withdrawable_epoch = phase0_ssz::Epoch::new(
            v.withdrawable_epoch
                .as_u64()
                .max(current_epoch.as_u64() + config.epochs_per_slashings_vector),
        );
    })?;

    let slashings_index = (current_epoch.as_u64() % config.epochs_per_slashings_vector) as usize;
    let updated_slashing = builder.state().slashings[slashings_index].as_u64() + effective_balance;
    builder.state_mut().slashings[slashings_index] = Gwei::new(updated_slashing);

    builder.decrease_balance(
        slashed_index,
        Gwei::new(effective_balance / config.min_slashing_penalty_quotient),
    )?;

    let proposer_index = get_beacon_proposer_index(builder.state(), config)?;
    let whistleblower_index = whistleblower_index.unwrap_or(proposer_index);
    let whistleblower_reward = Gwei::new(effective_balance / config.whistleblower_reward_quotient);
    let proposer_reward =
        Gwei::new(whistleblower_reward.as_u64() / config.proposer_reward_quotient);

    builder.increase_balance(proposer_index, proposer_reward)?;
    builder.increase_balance(
        whistleblower_index,
        Gwei::new(whistleblower_reward.as_u64() - proposer_reward.as_u64()),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use phase0_types::containers::*;
    use ssz_types::VariableList;

    fn validator(effective_balance: u64) -> Validator {
        Validator {
            pubkey: BlsPublicKey::default(),
            withdrawal_credentials: WithdrawalCredentials::default(),
            effective_balance: Gwei::new(effective_balance),
            slashed: false,
            activation_eligibility_epoch: phase0_ssz::Epoch::new(0),
            activation_epoch: phase0_ssz::Epoch::new(0),
            exit_epoch: FAR_FUTURE_EPOCH,
            withdrawable_epoch: FAR_FUTURE_EPOCH,
        }
    }

    fn minimal_state(num_validators: usize) -> phase0_types::BeaconState {
        let validators: Vec<_> = (0..num_validators)
            .map(|_| validator(32_000_000_000))
            .collect();
        let balances: Vec<_> = (0..num_validators).map(|_| Gwei::new(32_000_000_000)).collect();
        phase0_types::BeaconState {
            genesis_time: 0,
            genesis_validators_root: Root::zero(),
            slot: phase0_ssz::Slot::new(0),
            fork: Fork {
                previous_version: Version::zero(),
                current_version: Version::zero(),
                epoch: phase0_ssz::Epoch::new(0),
            },
            latest_block_header: BeaconBlockHeader {
                slot: phase0_ssz::Slot::new(0),
                proposer_index: ValidatorIndex::new(0),
                parent_root: Root::zero(),
                state_root: Root::zero(),
                body_root: Root::zero(),
            },
            block_roots: Default::default(),
            state_roots: Default::default(),
            historical_roots: VariableList::empty(),
            eth1_data: Eth1Data {
                deposit_root: Root::zero(),
                deposit_count: 0,
                block_hash: Root::zero(),
            },
            eth1_data_votes: VariableList::empty(),
            eth1_deposit_index: 0,
            validators: VariableList::new(validators).unwrap(),
            balances: VariableList::new(balances).unwrap(),
            randao_mixes: Default::default(),
            slashings: Default::default(),
            previous_epoch_attestations: VariableList::empty(),
            current_epoch_attestations: VariableList::empty(),
            justification_bits: Default::default(),
            previous_justified_checkpoint: Checkpoint {
                epoch: phase0_ssz::Epoch::new(0),
                root: Root::zero(),
            },
            current_justified_checkpoint: Checkpoint {
                epoch: phase0_ssz::Epoch::new(0),
                root: Root::zero(),
            },
            finalized_checkpoint: Checkpoint {
                epoch: phase0_ssz::Epoch::new(0),
                root: Root::zero(),
            },
        }
    }

    #[test]
    fn slash_validator_burns_balance_and_sets_flag() {
        let config = SpecConfig::mainnet();
        let mut builder = minimal_state(4).to_builder();
        slash_validator(&mut builder, ValidatorIndex::new(1), None, &config).unwrap();

        let state = builder.state();
        assert!(state.validators[1].slashed);
        assert_eq!(
            state.balances[1].as_u64(),
            32_000_000_000 - 32_000_000_000 / config.min_slashing_penalty_quotient
        );
        assert_ne!(state.validators[1].exit_epoch, FAR_FUTURE_EPOCH);
    }

    #[test]
    fn initiate_exit_is_idempotent() {
        let config = SpecConfig::mainnet();
        let mut builder = minimal_state(4).to_builder();
        initiate_validator_exit(&mut builder, ValidatorIndex::new(0), &config).unwrap();
        let first = builder.state().validators[0].exit_epoch;
        initiate_validator_exit(&mut builder, ValidatorIndex::new(0), &config).unwrap();
        assert_eq!(builder.state().validators[0].exit_epoch, first);
    }
}
