use crate::ids::{AssetId, ChainId, Hash, PLATFORM_CHAIN_ID};
use serde::{Deserialize, Serialize};

/// Activation point of a protocol fork, expressed as a chain timestamp in unix seconds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkActivation(u64);

impl ForkActivation {
    const NEVER: u64 = u64::MAX;
    const ALWAYS: u64 = 0;

    pub const fn new(timestamp: u64) -> Self {
        Self(timestamp)
    }

    pub const fn never() -> Self {
        Self(Self::NEVER)
    }

    pub const fn always() -> Self {
        Self(Self::ALWAYS)
    }

    /// Returns the activation timestamp. Activation checks should go through `self.is_active(..)`.
    pub fn timestamp(self) -> u64 {
        self.0
    }

    pub fn is_active(self, chain_time: u64) -> bool {
        chain_time >= self.0
    }
}

/// Minting schedule of the primary network: `mint_amount` units are minted every
/// `mint_period` seconds between `mint_since` and `mint_until`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintConfig {
    pub mint_amount: u64,
    pub mint_period: u64,
    pub mint_since: u64,
    pub mint_until: u64,
}

/// Consensus parameters. Changing any of them on a live network is a fork.
#[derive(Clone, Debug)]
pub struct Params {
    pub network_id: u32,
    pub network_name: &'static str,
    /// Id of this chain, checked against `BaseTx::blockchain_id`
    pub chain_id: ChainId,
    /// Asset paying fees and staked on the primary network
    pub fee_asset_id: AssetId,

    pub tx_fee: u64,
    pub create_subnet_tx_fee: u64,
    pub create_chain_tx_fee: u64,
    pub transform_subnet_tx_fee: u64,
    pub add_primary_network_validator_fee: u64,
    pub add_primary_network_delegator_fee: u64,
    pub add_subnet_validator_fee: u64,
    pub add_subnet_delegator_fee: u64,

    pub min_validator_stake: u64,
    pub max_validator_stake: u64,
    pub min_delegator_stake: u64,
    /// Minimum delegation shares, over `PERCENT_DENOMINATOR`
    pub min_delegation_fee: u32,
    pub min_stake_duration: u64,
    pub max_stake_duration: u64,
    /// How far ahead of the chain time a staker may start
    pub max_future_start_time: u64,
    /// A validator's weight including its delegations may not exceed this factor times its own stake
    pub max_validator_weight_factor: u64,
    /// Fraction of its staking period a primary network validator must be online to be rewarded
    pub uptime_requirement: f64,

    pub mint: MintConfig,
    pub banff_activation: ForkActivation,
}

impl Params {
    pub fn default_local() -> Self {
        LOCAL_PARAMS
    }

    pub fn is_banff_active(&self, chain_time: u64) -> bool {
        self.banff_activation.is_active(chain_time)
    }
}

const UNITS: u64 = 1_000_000_000;
const DAY: u64 = 24 * 60 * 60;
const YEAR: u64 = 365 * DAY;

/// Id of the native asset
pub const OMEGA_ASSET_ID: AssetId = Hash::from_u64_word(0x6f6d656761);

pub const MAINNET_PARAMS: Params = Params {
    network_id: 1,
    network_name: "omega-mainnet",
    chain_id: PLATFORM_CHAIN_ID,
    fee_asset_id: OMEGA_ASSET_ID,

    tx_fee: UNITS / 1000,
    create_subnet_tx_fee: UNITS,
    create_chain_tx_fee: UNITS,
    transform_subnet_tx_fee: 10 * UNITS,
    add_primary_network_validator_fee: 0,
    add_primary_network_delegator_fee: 0,
    add_subnet_validator_fee: UNITS / 1000,
    add_subnet_delegator_fee: UNITS / 1000,

    min_validator_stake: 2000 * UNITS,
    max_validator_stake: 3_000_000 * UNITS,
    min_delegator_stake: 25 * UNITS,
    min_delegation_fee: 20_000,
    min_stake_duration: 14 * DAY,
    max_stake_duration: YEAR,
    max_future_start_time: 14 * DAY,
    max_validator_weight_factor: 5,
    uptime_requirement: 0.8,

    mint: MintConfig { mint_amount: 36_000_000 * UNITS, mint_period: YEAR, mint_since: 1_700_000_000, mint_until: 1_700_000_000 + 10 * YEAR },
    banff_activation: ForkActivation::new(1_700_000_000),
};

/// Small stakes and short durations, Banff active from genesis
pub const LOCAL_PARAMS: Params = Params {
    network_id: 12345,
    network_name: "omega-local",
    chain_id: PLATFORM_CHAIN_ID,
    fee_asset_id: OMEGA_ASSET_ID,

    tx_fee: 1000,
    create_subnet_tx_fee: 10_000,
    create_chain_tx_fee: 10_000,
    transform_subnet_tx_fee: 100_000,
    add_primary_network_validator_fee: 0,
    add_primary_network_delegator_fee: 0,
    add_subnet_validator_fee: 1000,
    add_subnet_delegator_fee: 1000,

    min_validator_stake: 2000,
    max_validator_stake: 3_000_000,
    min_delegator_stake: 25,
    min_delegation_fee: 20_000,
    min_stake_duration: 24 * 60 * 60,
    max_stake_duration: YEAR,
    max_future_start_time: 14 * DAY,
    max_validator_weight_factor: 5,
    uptime_requirement: 0.8,

    mint: MintConfig { mint_amount: 360_000 * UNITS, mint_period: YEAR, mint_since: 0, mint_until: u64::MAX },
    banff_activation: ForkActivation::always(),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fork_activation() {
        let fork = ForkActivation::new(100);
        assert!(!fork.is_active(99));
        assert!(fork.is_active(100));
        assert!(ForkActivation::always().is_active(0));
        assert!(!ForkActivation::never().is_active(u64::MAX - 1));
    }

    #[test]
    fn test_presets_are_sane() {
        for params in [&MAINNET_PARAMS, &LOCAL_PARAMS] {
            assert!(params.min_validator_stake <= params.max_validator_stake);
            assert!(0 < params.min_stake_duration && params.min_stake_duration <= params.max_stake_duration);
            assert!(params.mint.mint_since < params.mint.mint_until);
            assert!(params.mint.mint_period > 0);
        }
    }
}
