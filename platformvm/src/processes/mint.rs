use omega_math::BigUint;
use omega_platformvm_core::{config::params::MintConfig, constants::MINT_RATE_SHIFT};

/// Splits the primary network minting schedule between stakers. The schedule is turned into an
/// accumulated mint rate per unit of weight, a staker is owed the growth of that rate between
/// the moment it became current and the moment it expires, times its weight.
#[derive(Clone, Debug)]
pub struct MintCalculator {
    config: MintConfig,
}

impl MintCalculator {
    pub fn new(config: MintConfig) -> Self {
        Self { config }
    }

    /// Returns the mint rate accrued per unit of weight over `[last_sync, now]`, clipped to the
    /// minting window and shifted by `MINT_RATE_SHIFT`
    pub fn calculate_mint_rate(&self, total_weight: u64, last_sync: u64, now: u64) -> BigUint {
        let start = last_sync.max(self.config.mint_since);
        let end = now.min(self.config.mint_until);
        if total_weight == 0 || end <= start || self.config.mint_period == 0 {
            return BigUint::ZERO;
        }

        let minted = BigUint::from_u128((end - start) as u128 * self.config.mint_amount as u128);
        let denominator = BigUint::from_u128(self.config.mint_period as u128 * total_weight as u128);
        (minted << MINT_RATE_SHIFT).checked_div(&denominator).unwrap_or_default()
    }

    pub fn calculate_mint_reward(&self, weight: u64, entry_rate: &BigUint, current_rate: &BigUint) -> u64 {
        ((&current_rate.saturating_sub(entry_rate) * weight) >> MINT_RATE_SHIFT).saturating_to_u64()
    }
}
