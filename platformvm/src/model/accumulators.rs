use omega_math::BigUint;
use serde::{Deserialize, Serialize};

/// Chain wide reward accumulators. Stakers snapshot `accumulated_mint_rate` and
/// `fee_per_weight_stored` when they become current, their reward is the growth of both
/// values until they expire, times their weight.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardAccumulators {
    /// Fees distributed per unit of primary network weight, shifted by `FEE_PER_WEIGHT_SHIFT`
    pub fee_per_weight_stored: BigUint,
    /// Value of `current_accumulated_fee` when `fee_per_weight_stored` was last refreshed
    pub last_accumulated_fee: u64,
    /// Total fees burned since genesis
    pub current_accumulated_fee: u64,
    /// Minted amount per unit of primary network weight, shifted by `MINT_RATE_SHIFT`
    pub accumulated_mint_rate: BigUint,
    /// Chain time up to which `accumulated_mint_rate` was computed
    pub stake_sync_timestamp: u64,
}

impl RewardAccumulators {
    pub fn new(genesis_timestamp: u64) -> Self {
        Self { stake_sync_timestamp: genesis_timestamp, ..Default::default() }
    }
}
