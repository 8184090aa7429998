use super::{fee, mint::MintCalculator};
use crate::{
    errors::StateResult,
    model::accumulators::RewardAccumulators,
    state::{Chain, ChainReader},
};
use omega_core::trace;
use omega_platformvm_core::{ids::PRIMARY_NETWORK_ID, staker::Staker};

/// Staker set changes caused by moving the chain time forward. Computed against a read-only
/// view of the chain and applied separately, so that callers may inspect or drop them.
#[derive(Clone, Debug)]
pub struct StateChanges {
    pub new_time: u64,
    pub accumulators: RewardAccumulators,
    /// `(pending, current)` forms of every promoted staker
    pub promoted: Vec<(Staker, Staker)>,
    /// Permissioned subnet validators reaching their end time
    pub expired: Vec<Staker>,
    /// `(before, after)` forms of primary network stakers reaching their end time, `after`
    /// carrying the final potential reward
    pub rewarded: Vec<(Staker, Staker)>,
    /// Primary network supply after minting the rewards, when any was minted
    pub primary_supply: Option<u64>,
}

impl StateChanges {
    pub fn is_empty(&self) -> bool {
        self.promoted.is_empty() && self.expired.is_empty() && self.rewarded.is_empty()
    }

    pub fn apply(&self, chain: &mut dyn Chain) {
        chain.set_timestamp(self.new_time);
        chain.set_accumulators(self.accumulators.clone());

        for (pending, current) in self.promoted.iter() {
            if pending.is_validator() {
                chain.delete_pending_validator(pending);
                chain.put_current_validator(current.clone());
            } else {
                chain.delete_pending_delegator(pending);
                chain.put_current_delegator(current.clone());
            }
        }
        for staker in self.expired.iter() {
            chain.delete_current_validator(staker);
        }
        for (before, after) in self.rewarded.iter() {
            if before.is_validator() {
                chain.delete_current_validator(before);
                chain.put_current_validator(after.clone());
            } else {
                chain.delete_current_delegator(before);
                chain.put_current_delegator(after.clone());
            }
        }
        if let Some(supply) = self.primary_supply {
            chain.set_current_supply(PRIMARY_NETWORK_ID, supply);
        }
    }
}

/// Computes the changes of moving the chain time of `chain` to `new_time`. The caller is
/// expected to have checked `new_time` with `verify_new_chain_time`.
pub fn advance_time_to(mint: &MintCalculator, chain: &dyn ChainReader, new_time: u64) -> StateResult<StateChanges> {
    let chain_time = chain.timestamp();

    // Refresh the accumulators over the elapsed interval with the weight that was staking during it
    let mut accumulators = chain.accumulators();
    let active_weight = chain
        .current_stakers()?
        .filter(|staker| staker.priority.is_primary_network() && staker.next_time > chain_time)
        .fold(0u64, |acc, staker| acc.saturating_add(staker.weight));
    fee::update_fee_per_weight(&mut accumulators, active_weight);
    if new_time > accumulators.stake_sync_timestamp {
        let rate = mint.calculate_mint_rate(active_weight, accumulators.stake_sync_timestamp, new_time);
        accumulators.accumulated_mint_rate += &rate;
        accumulators.stake_sync_timestamp = new_time;
    }

    let mut promoted = Vec::new();
    for pending in chain.pending_stakers()? {
        if pending.next_time > new_time {
            break;
        }
        let mut current = pending.promoted();
        if !current.priority.is_permissioned() {
            current.mint_rate = accumulators.accumulated_mint_rate.clone();
            current.fee_per_weight_paid = accumulators.fee_per_weight_stored.clone();
        }
        promoted.push((pending, current));
    }

    let mut expired = Vec::new();
    let mut rewarded = Vec::new();
    let mut minted = 0u64;
    for current in chain.current_stakers()? {
        if current.next_time > new_time {
            break;
        }
        if current.priority.is_permissioned() {
            expired.push(current);
            continue;
        }
        // Stakers which already reached their end time await their reward tx. Skipping rather than
        // stopping lets primary stakers ending at the same time, which sort after permissionless
        // subnet stakers, get their reward. Time never moves past a staker awaiting its reward
        // since it bounds `next_staker_change_time`.
        if !current.priority.is_primary_network() || current.next_time <= chain_time {
            continue;
        }
        let reward = mint
            .calculate_mint_reward(current.weight, &current.mint_rate, &accumulators.accumulated_mint_rate)
            .saturating_add(fee::calculate_fee_reward(current.weight, &accumulators.fee_per_weight_stored, &current.fee_per_weight_paid));
        minted = minted.saturating_add(reward);
        let after = Staker { potential_reward: current.potential_reward.saturating_add(reward), ..current.clone() };
        rewarded.push((current, after));
    }

    let primary_supply = match minted {
        0 => None,
        minted => Some(chain.current_supply(PRIMARY_NETWORK_ID)?.saturating_add(minted)),
    };

    trace!(
        "Advancing chain time {} -> {}: {} promoted, {} expired, {} rewarded, {} minted",
        chain_time,
        new_time,
        promoted.len(),
        expired.len(),
        rewarded.len(),
        minted
    );
    Ok(StateChanges { new_time, accumulators, promoted, expired, rewarded, primary_supply })
}
