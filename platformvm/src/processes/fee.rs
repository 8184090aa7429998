//! Redistribution of burned tx fees to primary network stakers

use crate::model::accumulators::RewardAccumulators;
use omega_math::BigUint;
use omega_platformvm_core::constants::FEE_PER_WEIGHT_SHIFT;

/// Folds the fees burned since the last refresh into `fee_per_weight_stored`. A no-op when no fee
/// was burned or when nobody stakes.
pub fn update_fee_per_weight(accumulators: &mut RewardAccumulators, total_weight: u64) {
    if accumulators.current_accumulated_fee == accumulators.last_accumulated_fee || total_weight == 0 {
        return;
    }
    let burned = accumulators.current_accumulated_fee.saturating_sub(accumulators.last_accumulated_fee);
    let increment = (BigUint::from_u64(burned) << FEE_PER_WEIGHT_SHIFT).checked_div(&BigUint::from_u64(total_weight)).unwrap_or_default();
    accumulators.fee_per_weight_stored += &increment;
    accumulators.last_accumulated_fee = accumulators.current_accumulated_fee;
}

/// Share of the redistributed fees owed to `weight` since it paid `fee_per_weight_paid`
pub fn calculate_fee_reward(weight: u64, fee_per_weight_stored: &BigUint, fee_per_weight_paid: &BigUint) -> u64 {
    ((&fee_per_weight_stored.saturating_sub(fee_per_weight_paid) * weight) >> FEE_PER_WEIGHT_SHIFT).saturating_to_u64()
}
