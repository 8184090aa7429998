use omega_math::BigUint;
use omega_platformvm_core::{constants::PERCENT_DENOMINATOR, tx::subnet::TransformSubnetTx};

/// Rewards of permissionless subnet stakers. The reward is fixed when the staker is added and is
/// taken from the supply the subnet has left to mint: the longer the stake, the closer the
/// consumption rate gets to its maximum.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsumptionRewardCalculator {
    max_sub_min_consumption_rate: u64,
    min_consumption_rate: u64,
    minting_period: u64,
    supply_cap: u64,
}

impl ConsumptionRewardCalculator {
    pub fn new(min_consumption_rate: u64, max_consumption_rate: u64, minting_period: u64, supply_cap: u64) -> Self {
        Self {
            max_sub_min_consumption_rate: max_consumption_rate.saturating_sub(min_consumption_rate),
            min_consumption_rate,
            minting_period,
            supply_cap,
        }
    }

    pub fn from_transformation(tx: &TransformSubnetTx, minting_period: u64) -> Self {
        Self::new(tx.min_consumption_rate, tx.max_consumption_rate, minting_period, tx.maximum_supply)
    }

    /// Reward of `staked_amount` locked for `staked_duration` seconds while the subnet supply is
    /// `current_supply`. Never exceeds what is left to mint.
    pub fn calculate(&self, staked_duration: u64, staked_amount: u64, current_supply: u64) -> u64 {
        let remaining = self.supply_cap.saturating_sub(current_supply);
        if remaining == 0 || current_supply == 0 || self.minting_period == 0 {
            return 0;
        }

        let rate_numerator = BigUint::from_u128(
            self.max_sub_min_consumption_rate as u128 * staked_duration as u128 + self.min_consumption_rate as u128 * self.minting_period as u128,
        );
        let rate_denominator = BigUint::from_u128(self.minting_period as u128 * PERCENT_DENOMINATOR as u128);

        let reward = (&(&BigUint::from_u64(remaining) * staked_amount) * staked_duration) * rate_numerator;
        let denominator = rate_denominator * BigUint::from_u128(current_supply as u128 * self.minting_period as u128);
        match reward.checked_div(&denominator).and_then(|reward| reward.to_u64()) {
            Some(reward) => reward.min(remaining),
            None => remaining,
        }
    }
}
