use super::{
    TxExecutor, next_staker_change_time,
    staking::transformation,
    utxos::refund_stake,
    verify_new_chain_time,
};
use crate::{
    errors::BlockProcessResult,
    processes::state_changes::advance_time_to,
    state::{Chain, ChainReader},
};
use omega_core::{debug, warn};
use omega_database::prelude::StoreResultExt;
use omega_platformvm_core::{
    constants::{PERCENT_DENOMINATOR, SYNC_BOUND},
    errors::tx::TxError,
    ids::{AssetId, PRIMARY_NETWORK_ID},
    staker::Staker,
    status::TxStatus,
    tx::{AdvanceTimeTx, RewardValidatorTx, Tx, UnsignedTx, staking::ScheduledStaker},
    utxo::{OutputOwners, TransferableOutput, Utxo, UtxoId},
};

/// Local preference of a proposal, used as the initial vote of consensus
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProposalOutcome {
    pub prefers_commit: bool,
}

impl TxExecutor {
    /// Executes a proposal tx. `on_commit` and `on_abort` are two views of the same parent
    /// state and receive the effects of the respective decision.
    pub fn execute_proposal_tx(&self, on_commit: &mut dyn Chain, on_abort: &mut dyn Chain, tx: &Tx) -> BlockProcessResult<ProposalOutcome> {
        let unsigned = tx.unsigned();
        unsigned.verify_syntax(&self.config.params)?;
        tx.verify_credentials()?;

        let outcome = match unsigned {
            UnsignedTx::AddValidator(_) | UnsignedTx::AddSubnetValidator(_) | UnsignedTx::AddDelegator(_) => {
                self.propose_staker(on_commit, on_abort, tx)?
            }
            UnsignedTx::AdvanceTime(advance) => self.propose_advance_time(on_commit, advance)?,
            UnsignedTx::RewardValidator(reward) => self.propose_reward(on_commit, on_abort, tx, reward)?,
            _ => return Err(TxError::WrongBlockKind(unsigned.name(), "proposal").into()),
        };

        on_commit.add_tx(tx.clone(), TxStatus::Committed);
        on_abort.add_tx(tx.clone(), TxStatus::Aborted);
        Ok(outcome)
    }

    fn propose_staker(&self, on_commit: &mut dyn Chain, on_abort: &mut dyn Chain, tx: &Tx) -> BlockProcessResult<ProposalOutcome> {
        let unsigned = tx.unsigned();
        if self.config.is_banff_active(on_commit.timestamp()) {
            return Err(TxError::WrongBlockKind(unsigned.name(), "proposal").into());
        }
        let (Some(scheduled), Some(base)) = (unsigned.scheduled_staker(), unsigned.base()) else {
            return Err(TxError::NotAStakerTx(tx.id()).into());
        };

        self.add_staker(on_commit, tx)?;
        // Aborting still pays the fee, the stake goes back to its owner
        self.spend(on_abort, tx, base, &[], scheduled.stake())?;
        refund_stake(on_abort, tx, scheduled.stake());

        Ok(ProposalOutcome { prefers_commit: scheduled.start_time() > self.clock.unix_time() })
    }

    fn propose_advance_time(&self, on_commit: &mut dyn Chain, advance: &AdvanceTimeTx) -> BlockProcessResult<ProposalOutcome> {
        let new_time = advance.time;
        if self.config.is_banff_active(new_time) {
            return Err(TxError::NotAllowedAfterBanff("AdvanceTimeTx").into());
        }
        let chain_time = on_commit.timestamp();
        if new_time <= chain_time {
            return Err(TxError::TimestampNotAfterChainTime(new_time, chain_time).into());
        }
        let now = self.clock.unix_time();
        verify_new_chain_time(new_time, next_staker_change_time(&*on_commit)?, now)?;

        let changes = advance_time_to(&self.mint, &*on_commit, new_time)?;
        changes.apply(on_commit);
        Ok(ProposalOutcome { prefers_commit: new_time <= now.saturating_add(SYNC_BOUND) })
    }

    fn propose_reward(
        &self,
        on_commit: &mut dyn Chain,
        on_abort: &mut dyn Chain,
        tx: &Tx,
        reward: &RewardValidatorTx,
    ) -> BlockProcessResult<ProposalOutcome> {
        let chain_time = on_commit.timestamp();
        let staker = on_commit.current_stakers()?.next().ok_or(TxError::NoStakerToRemove)?;
        if staker.tx_id != reward.tx_id {
            return Err(TxError::RemoveWrongStaker(staker.tx_id, reward.tx_id).into());
        }
        if staker.end_time != chain_time {
            return Err(TxError::RemoveStakerTooEarly(chain_time, staker.end_time).into());
        }

        let (staker_tx, _) = on_commit.tx(staker.tx_id).optional()?.ok_or(TxError::TxNotFound(staker.tx_id))?;
        let scheduled = staker_tx.unsigned().scheduled_staker().ok_or(TxError::NotAStakerTx(staker.tx_id))?;

        let chains: [&mut dyn Chain; 2] = [&mut *on_commit, &mut *on_abort];
        for chain in chains {
            if staker.is_validator() {
                chain.delete_current_validator(&staker);
            } else {
                chain.delete_current_delegator(&staker);
            }
            refund_stake(chain, &staker_tx, scheduled.stake());
        }

        if staker.potential_reward > 0 {
            let asset_id = self.reward_asset(&*on_commit, &staker)?;
            let payouts = self.reward_payouts(&*on_commit, &staker, scheduled)?;
            for (index, (owners, amount)) in payouts.into_iter().filter(|(_, amount)| *amount > 0).enumerate() {
                let utxo = Utxo::new(UtxoId::new(tx.id(), index as u32), &TransferableOutput::new(asset_id, amount, owners));
                on_commit.add_utxo(utxo.clone());
                on_commit.add_reward_utxo(staker.tx_id, utxo);
            }
            // The reward was counted in the supply when it was computed
            let supply = on_abort.current_supply(staker.subnet_id)?;
            on_abort.set_current_supply(staker.subnet_id, supply.saturating_sub(staker.potential_reward));
        }

        let prefers_commit = self.meets_uptime_requirement(&*on_commit, &staker)?;
        debug!("Proposing to remove staker {} of node {}, prefers commit: {}", staker.tx_id, staker.node_id, prefers_commit);
        Ok(ProposalOutcome { prefers_commit })
    }

    fn reward_asset(&self, chain: &dyn ChainReader, staker: &Staker) -> BlockProcessResult<AssetId> {
        if staker.subnet_id == PRIMARY_NETWORK_ID {
            return Ok(self.config.fee_asset_id);
        }
        let transform = transformation(chain, staker.subnet_id)?.ok_or(TxError::SubnetNotTransformed(staker.subnet_id))?;
        Ok(transform.asset_id)
    }

    /// Splits the reward of `staker` between its owners. Delegators share theirs with the
    /// validator they delegate to.
    fn reward_payouts(
        &self,
        chain: &dyn ChainReader,
        staker: &Staker,
        scheduled: &dyn ScheduledStaker,
    ) -> BlockProcessResult<Vec<(OutputOwners, u64)>> {
        let rewards_owner = scheduled.rewards_owner().cloned().ok_or(TxError::NotAStakerTx(staker.tx_id))?;
        if staker.is_validator() {
            return Ok(vec![(rewards_owner, staker.potential_reward)]);
        }

        let validator = chain.current_validator(staker.subnet_id, staker.node_id)?;
        let (validator_tx, _) = chain.tx(validator.tx_id).optional()?.ok_or(TxError::TxNotFound(validator.tx_id))?;
        let validator_scheduled = validator_tx.unsigned().scheduled_staker().ok_or(TxError::NotAStakerTx(validator.tx_id))?;
        let shares = validator_scheduled.delegation_shares().unwrap_or_default() as u128;
        let validator_owner = validator_scheduled
            .delegation_rewards_owner()
            .or(validator_scheduled.rewards_owner())
            .cloned()
            .ok_or(TxError::NotAStakerTx(validator.tx_id))?;

        let validator_cut = (staker.potential_reward as u128 * shares / PERCENT_DENOMINATOR as u128) as u64;
        Ok(vec![(rewards_owner, staker.potential_reward - validator_cut), (validator_owner, validator_cut)])
    }

    fn meets_uptime_requirement(&self, chain: &dyn ChainReader, staker: &Staker) -> BlockProcessResult<bool> {
        let rules = self.staking_rules(chain, staker.subnet_id)?;
        match self.uptimes.calculate_uptime_percent_from(staker.node_id, staker.subnet_id, staker.start_time) {
            Ok(uptime) => Ok(uptime >= rules.uptime_requirement),
            Err(err) => {
                warn!("Could not measure the uptime of node {} on subnet {}: {}", staker.node_id, staker.subnet_id, err);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::BlockError,
        processes::tx_executor::tests::executor,
        state::diff::Diff,
        test_helpers::{DAY, GENESIS_VALIDATOR_END, TestState, funded_delegator_tx, funded_validator_tx, node, owner, test_config},
    };
    use omega_platformvm_core::{
        config::{ConfigBuilder, params::ForkActivation},
        ids::TxId,
    };

    fn apricot() -> TestState {
        TestState::with_config(ConfigBuilder::new(test_config().params).edit_consensus_params(|p| p.banff_activation = ForkActivation::never()).build())
    }

    fn branches(ts: &TestState) -> (Diff, Diff) {
        (Diff::new_on(ts.state.clone()), Diff::new_on(ts.state.clone()))
    }

    fn reward_tx(tx_id: TxId) -> Tx {
        Tx::new(UnsignedTx::RewardValidator(RewardValidatorTx { tx_id }), vec![])
    }

    /// Moves both branches to the end of the genesis validators
    fn at_genesis_end(ts: &TestState, executor: &TxExecutor) -> (Diff, Diff) {
        let (mut on_commit, mut on_abort) = branches(ts);
        let changes = advance_time_to(executor.mint(), &on_commit, GENESIS_VALIDATOR_END).unwrap();
        changes.apply(&mut on_commit);
        changes.apply(&mut on_abort);
        (on_commit, on_abort)
    }

    #[test]
    fn test_staker_proposal_branches() {
        let ts = apricot();
        let (executor, _, _) = executor(&ts, ts.genesis_timestamp());
        let funds = ts.genesis_utxo(0);
        let start = ts.genesis_timestamp() + 100;
        let tx = funded_validator_tx(&funds, 9, start, start + DAY, 2000);

        let (mut on_commit, mut on_abort) = branches(&ts);
        let outcome = executor.execute_proposal_tx(&mut on_commit, &mut on_abort, &tx).unwrap();
        assert!(outcome.prefers_commit);

        assert!(on_commit.pending_validator(PRIMARY_NETWORK_ID, node(9)).is_ok());
        assert!(on_abort.pending_validator(PRIMARY_NETWORK_ID, node(9)).optional().unwrap().is_none());
        for chain in [&on_commit, &on_abort] {
            assert!(chain.utxo(funds.utxo_id).optional().unwrap().is_none());
            assert!(chain.utxo(tx.utxo_id(0)).is_ok());
        }
        // Only the abort branch gives the stake back right away
        assert!(on_commit.utxo(tx.utxo_id(1)).optional().unwrap().is_none());
        assert_eq!(on_abort.utxo(tx.utxo_id(1)).unwrap().amount(), 2000);
        assert_eq!(on_commit.tx(tx.id()).unwrap().1, TxStatus::Committed);
        assert_eq!(on_abort.tx(tx.id()).unwrap().1, TxStatus::Aborted);
    }

    #[test]
    fn test_staker_proposals_end_with_banff() {
        let ts = TestState::new();
        let (executor, _, _) = executor(&ts, ts.genesis_timestamp());
        let start = ts.genesis_timestamp() + 100;
        let tx = funded_validator_tx(&ts.genesis_utxo(0), 9, start, start + DAY, 2000);
        let (mut on_commit, mut on_abort) = branches(&ts);
        assert!(matches!(
            executor.execute_proposal_tx(&mut on_commit, &mut on_abort, &tx),
            Err(BlockError::Tx(TxError::WrongBlockKind("AddValidatorTx", "proposal")))
        ));
    }

    #[test]
    fn test_advance_time_proposal() {
        let ts = apricot();
        let now = ts.genesis_timestamp() + 1000;
        let (executor, clock, _) = executor(&ts, now);
        let advance = |time| Tx::new(UnsignedTx::AdvanceTime(AdvanceTimeTx { time }), vec![]);

        let (mut on_commit, mut on_abort) = branches(&ts);
        let outcome = executor.execute_proposal_tx(&mut on_commit, &mut on_abort, &advance(now)).unwrap();
        assert!(outcome.prefers_commit);
        assert_eq!(on_commit.timestamp(), now);
        assert_eq!(on_abort.timestamp(), ts.genesis_timestamp());

        let (mut on_commit, mut on_abort) = branches(&ts);
        assert!(matches!(
            executor.execute_proposal_tx(&mut on_commit, &mut on_abort, &advance(now + SYNC_BOUND + 1)),
            Err(BlockError::Tx(TxError::ChainTimeBeyondSyncBound(..)))
        ));
        assert!(matches!(
            executor.execute_proposal_tx(&mut on_commit, &mut on_abort, &advance(ts.genesis_timestamp())),
            Err(BlockError::Tx(TxError::TimestampNotAfterChainTime(..)))
        ));

        // The bound follows the local clock
        clock.set(now - SYNC_BOUND - 1);
        let (mut on_commit, mut on_abort) = branches(&ts);
        assert!(matches!(
            executor.execute_proposal_tx(&mut on_commit, &mut on_abort, &advance(now)),
            Err(BlockError::Tx(TxError::ChainTimeBeyondSyncBound(..)))
        ));
        clock.set(now - SYNC_BOUND);
        let outcome = executor.execute_proposal_tx(&mut on_commit, &mut on_abort, &advance(now)).unwrap();
        assert!(outcome.prefers_commit);
    }

    #[test]
    fn test_advance_time_is_replaced_by_banff_timestamps() {
        let ts = TestState::new();
        let (executor, _, _) = executor(&ts, ts.genesis_timestamp() + 5);
        let tx = Tx::new(UnsignedTx::AdvanceTime(AdvanceTimeTx { time: ts.genesis_timestamp() + 5 }), vec![]);
        let (mut on_commit, mut on_abort) = branches(&ts);
        assert!(matches!(
            executor.execute_proposal_tx(&mut on_commit, &mut on_abort, &tx),
            Err(BlockError::Tx(TxError::NotAllowedAfterBanff("AdvanceTimeTx")))
        ));
    }

    #[test]
    fn test_reward_removes_only_the_next_staker_at_its_end() {
        let ts = TestState::new();
        let (executor, _, _) = executor(&ts, GENESIS_VALIDATOR_END);
        let first = first_staker(&ts);
        let second = if first == ts.genesis_validator_tx_id(1) { ts.genesis_validator_tx_id(2) } else { ts.genesis_validator_tx_id(1) };

        let (mut on_commit, mut on_abort) = branches(&ts);
        assert!(matches!(
            executor.execute_proposal_tx(&mut on_commit, &mut on_abort, &reward_tx(first)),
            Err(BlockError::Tx(TxError::RemoveStakerTooEarly(t, end))) if t == ts.genesis_timestamp() && end == GENESIS_VALIDATOR_END
        ));

        let (mut on_commit, mut on_abort) = at_genesis_end(&ts, &executor);
        assert!(matches!(
            executor.execute_proposal_tx(&mut on_commit, &mut on_abort, &reward_tx(second)),
            Err(BlockError::Tx(TxError::RemoveWrongStaker(next, requested))) if next == first && requested == second
        ));
        executor.execute_proposal_tx(&mut on_commit, &mut on_abort, &reward_tx(first)).unwrap();
        executor.execute_proposal_tx(&mut on_commit, &mut on_abort, &reward_tx(second)).unwrap();
        assert!(matches!(
            executor.execute_proposal_tx(&mut on_commit, &mut on_abort, &reward_tx(second)),
            Err(BlockError::Tx(TxError::NoStakerToRemove))
        ));
    }

    fn first_staker(ts: &TestState) -> TxId {
        ts.state.current_stakers().unwrap().next().unwrap().tx_id
    }

    #[test]
    fn test_reward_commit_and_abort_branches() {
        let ts = TestState::new();
        let (executor, _, _) = executor(&ts, GENESIS_VALIDATOR_END);
        let (mut on_commit, mut on_abort) = at_genesis_end(&ts, &executor);
        let supply = on_commit.current_supply(PRIMARY_NETWORK_ID).unwrap();
        let staker = on_commit.current_stakers().unwrap().next().unwrap();
        assert!(staker.potential_reward > 0);

        let tx = reward_tx(staker.tx_id);
        let outcome = executor.execute_proposal_tx(&mut on_commit, &mut on_abort, &tx).unwrap();
        // Uptime is not tracked yet, so the node counts as up all along
        assert!(outcome.prefers_commit);

        for chain in [&on_commit, &on_abort] {
            assert!(chain.current_validator(PRIMARY_NETWORK_ID, staker.node_id).optional().unwrap().is_none());
            assert_eq!(chain.utxo(UtxoId::new(staker.tx_id, 0)).unwrap().amount(), staker.weight);
        }
        let reward = on_commit.utxo(UtxoId::new(tx.id(), 0)).unwrap();
        assert_eq!(reward.amount(), staker.potential_reward);
        assert_eq!(reward.output.owners, owner());
        assert_eq!(on_commit.reward_utxos(staker.tx_id).unwrap(), vec![reward]);
        assert!(on_abort.utxo(UtxoId::new(tx.id(), 0)).optional().unwrap().is_none());

        assert_eq!(on_commit.current_supply(PRIMARY_NETWORK_ID).unwrap(), supply);
        assert_eq!(on_abort.current_supply(PRIMARY_NETWORK_ID).unwrap(), supply - staker.potential_reward);
    }

    #[test]
    fn test_delegator_reward_is_shared_with_the_validator() {
        let ts = TestState::new();
        let (executor, _, _) = executor(&ts, ts.genesis_timestamp());
        let start = ts.genesis_timestamp() + 100;
        let end = start + 30 * DAY;
        let delegator = funded_delegator_tx(&ts.genesis_utxo(0), 1, start, end, 10_000);

        let (mut on_commit, mut on_abort) = branches(&ts);
        for chain in [&mut on_commit, &mut on_abort] {
            executor.execute_standard_tx(&mut *chain, &delegator).unwrap();
            advance_time_to(executor.mint(), &*chain, start).unwrap().apply(&mut *chain);
            advance_time_to(executor.mint(), &*chain, end).unwrap().apply(chain);
        }
        let staker = on_commit.current_stakers().unwrap().next().unwrap();
        assert_eq!(staker.tx_id, delegator.id());
        assert!(staker.potential_reward > 0);
        // The genesis validator keeps 2% of the delegation rewards
        let validator_cut = staker.potential_reward * 20_000 / PERCENT_DENOMINATOR;
        assert!(validator_cut > 0);

        let tx = reward_tx(delegator.id());
        executor.execute_proposal_tx(&mut on_commit, &mut on_abort, &tx).unwrap();
        assert!(on_commit.current_delegators(PRIMARY_NETWORK_ID, node(1)).unwrap().is_empty());
        assert_eq!(on_commit.utxo(UtxoId::new(tx.id(), 0)).unwrap().amount(), staker.potential_reward - validator_cut);
        assert_eq!(on_commit.utxo(UtxoId::new(tx.id(), 1)).unwrap().amount(), validator_cut);
        // Stake outputs follow the change output of the delegator tx
        assert_eq!(on_abort.utxo(delegator.utxo_id(1)).unwrap().amount(), 10_000);
        assert!(on_abort.utxo(UtxoId::new(tx.id(), 0)).optional().unwrap().is_none());
    }
}
