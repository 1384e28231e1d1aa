//! Chain configuration, threaded explicitly through every operation instead of living as a
//! global constant — spec.md §9's "global singletons become an explicit configuration value".
//!
//! Grounded on the teacher's `consts.rs` `Network`/`NetworkInfo::get_config()` pattern: a small
//! enum of named presets, each producing a fully-populated config value by construction. Here
//! the presets are consensus-parameter sets (`mainnet`, `minimal`) rather than L1 network IDs,
//! since this crate has no deposit-contract/chain-id concept of its own.

use phase0_ssz::{Epoch, Gwei};

/// All tunable phase-0 consensus parameters. Every quantity spec.md names as a constant
/// (`MAX_EFFECTIVE_BALANCE`, `SLOTS_PER_EPOCH`, …) lives here instead of being hardcoded at the
/// use site, so a `minimal` testnet preset can swap every value by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecConfig {
    // Time parameters
    pub seconds_per_slot: u64,
    pub slots_per_epoch: u64,
    pub min_seed_lookahead: u64,
    pub max_seed_lookahead: u64,
    pub min_epochs_to_inactivity_penalty: u64,
    pub epochs_per_eth1_voting_period: u64,
    pub slots_per_historical_root: u64,
    pub min_validator_withdrawability_delay: u64,
    pub shard_committee_period: u64,
    pub min_attestation_inclusion_delay: u64,

    // Validator cycle
    pub min_per_epoch_churn_limit: u64,
    pub churn_limit_quotient: u64,
    pub ejection_balance: Gwei,
    pub min_genesis_active_validator_count: u64,

    // Gwei values
    pub min_deposit_amount: Gwei,
    pub max_effective_balance: Gwei,
    pub effective_balance_increment: Gwei,

    // Hysteresis
    pub hysteresis_quotient: u64,
    pub hysteresis_downward_multiplier: u64,
    pub hysteresis_upward_multiplier: u64,

    // Rewards and penalties
    pub base_reward_factor: u64,
    pub whistleblower_reward_quotient: u64,
    pub proposer_reward_quotient: u64,
    pub inactivity_penalty_quotient: u64,
    pub min_slashing_penalty_quotient: u64,
    pub proportional_slashing_multiplier: u64,
    pub base_rewards_per_epoch: u64,

    // Max operations per block
    pub max_proposer_slashings: u64,
    pub max_attester_slashings: u64,
    pub max_attestations: u64,
    pub max_deposits: u64,
    pub max_voluntary_exits: u64,

    // Misc
    pub shuffle_round_count: u64,
    pub target_committee_size: u64,
    pub max_committees_per_slot: u64,
    pub max_validators_per_committee: u64,
    pub epochs_per_historical_vector: u64,
    pub epochs_per_slashings_vector: u64,
    pub historical_roots_limit: u64,
    pub validator_registry_limit: u64,

    // Domain types (4-byte, stored widened for convenience)
    pub domain_beacon_proposer: u32,
    pub domain_beacon_attester: u32,
    pub domain_randao: u32,
    pub domain_deposit: u32,
    pub domain_voluntary_exit: u32,

    pub far_future_epoch: Epoch,
    pub genesis_slot: u64,
    pub genesis_epoch: u64,
}

impl SpecConfig {
    /// Mainnet phase-0 parameters.
    pub fn mainnet() -> Self {
        Self {
            seconds_per_slot: 12,
            slots_per_epoch: 32,
            min_seed_lookahead: 1,
            max_seed_lookahead: 4,
            min_epochs_to_inactivity_penalty: 4,
            epochs_per_eth1_voting_period: 64,
            slots_per_historical_root: 8192,
            min_validator_withdrawability_delay: 256,
            shard_committee_period: 2048,
            min_attestation_inclusion_delay: 1,

            min_per_epoch_churn_limit: 4,
            churn_limit_quotient: 65536,
            ejection_balance: Gwei::new(16_000_000_000),
            min_genesis_active_validator_count: 16384,

            min_deposit_amount: Gwei::new(1_000_000_000),
            max_effective_balance: Gwei::new(32_000_000_000),
            effective_balance_increment: Gwei::new(1_000_000_000),

            hysteresis_quotient: 4,
            hysteresis_downward_multiplier: 1,
            hysteresis_upward_multiplier: 5,

            base_reward_factor: 64,
            whistleblower_reward_quotient: 512,
            proposer_reward_quotient: 8,
            inactivity_penalty_quotient: 33_554_432,
            min_slashing_penalty_quotient: 128,
            proportional_slashing_multiplier: 1,
            base_rewards_per_epoch: 4,

            max_proposer_slashings: 16,
            max_attester_slashings: 2,
            max_attestations: 128,
            max_deposits: 16,
            max_voluntary_exits: 16,

            shuffle_round_count: 90,
            target_committee_size: 128,
            max_committees_per_slot: 64,
            max_validators_per_committee: 2048,
            epochs_per_historical_vector: 65536,
            epochs_per_slashings_vector: 8192,
            historical_roots_limit: 16_777_216,
            validator_registry_limit: 1_099_511_627_776,

            domain_beacon_proposer: 0x0000_0000,
            domain_beacon_attester: 0x0100_0000,
            domain_randao: 0x0200_0000,
            domain_deposit: 0x0300_0000,
            domain_voluntary_exit: 0x0400_0000,

            far_future_epoch: phase0_ssz::FAR_FUTURE_EPOCH,
            genesis_slot: 0,
            genesis_epoch: 0,
        }
    }

    /// A small preset for fast-running tests: shrinks every capacity/time constant so a full
    /// epoch (and genesis with a handful of validators) is cheap to simulate, while leaving the
    /// reward/penalty formulas and operation ordering identical to mainnet.
    pub fn minimal() -> Self {
        Self {
            slots_per_epoch: 8,
            min_seed_lookahead: 1,
            max_seed_lookahead: 4,
            min_epochs_to_inactivity_penalty: 4,
            epochs_per_eth1_voting_period: 4,
            slots_per_historical_root: 64,
            min_validator_withdrawability_delay: 256,
            shard_committee_period: 64,
            min_genesis_active_validator_count: 64,
            shuffle_round_count: 10,
            target_committee_size: 4,
            max_committees_per_slot: 4,
            epochs_per_historical_vector: 64,
            epochs_per_slashings_vector: 64,
            ..Self::mainnet()
        }
    }

    pub fn epochs_per_slot_wraparound(&self) -> u64 {
        self.slots_per_epoch
    }
}

impl Default for SpecConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_preserves_reward_formula_constants() {
        let mainnet = SpecConfig::mainnet();
        let minimal = SpecConfig::minimal();
        assert_eq!(mainnet.base_reward_factor, minimal.base_reward_factor);
        assert_eq!(
            mainnet.min_slashing_penalty_quotient,
            minimal.min_slashing_penalty_quotient
        );
    }

    #[test]
    fn minimal_shrinks_epoch_length() {
        assert!(SpecConfig::minimal().slots_per_epoch < SpecConfig::mainnet().slots_per_epoch);
    }
}
