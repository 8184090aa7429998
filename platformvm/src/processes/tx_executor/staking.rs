//! Admission rules of new stakers, checked against the chain state the staker is added to

use super::TxExecutor;
use crate::{
    errors::{BlockProcessResult, StateError},
    state::ChainReader,
};
use omega_database::prelude::StoreResultExt;
use omega_platformvm_core::{
    constants::PERCENT_DENOMINATOR,
    errors::tx::TxError,
    ids::{AssetId, NodeId, PRIMARY_NETWORK_ID, SubnetId},
    staker::Staker,
    tx::{Tx, UnsignedTx, staking::ScheduledStaker, subnet::TransformSubnetTx},
};

/// Staking bounds of one subnet: the consensus params for the primary network, the
/// transformation params for permissionless subnets
#[derive(Clone, Debug, PartialEq)]
pub struct StakingRules {
    pub asset_id: AssetId,
    pub min_validator_stake: u64,
    pub max_validator_stake: u64,
    pub min_delegator_stake: u64,
    pub min_delegation_fee: u32,
    pub min_stake_duration: u64,
    pub max_stake_duration: u64,
    pub max_validator_weight_factor: u64,
    pub uptime_requirement: f64,
}

impl StakingRules {
    fn from_transformation(tx: &TransformSubnetTx) -> Self {
        Self {
            asset_id: tx.asset_id,
            min_validator_stake: tx.min_validator_stake,
            max_validator_stake: tx.max_validator_stake,
            min_delegator_stake: tx.min_delegator_stake,
            min_delegation_fee: tx.min_delegation_fee,
            min_stake_duration: tx.min_stake_duration as u64,
            max_stake_duration: tx.max_stake_duration as u64,
            max_validator_weight_factor: tx.max_validator_weight_factor as u64,
            uptime_requirement: tx.uptime_requirement as f64 / PERCENT_DENOMINATOR as f64,
        }
    }
}

/// The `TransformSubnetTx` of a permissionless subnet
pub fn transformation(chain: &dyn ChainReader, subnet_id: SubnetId) -> BlockProcessResult<Option<TransformSubnetTx>> {
    match chain.subnet_transformation(subnet_id).optional()? {
        Some(tx) => match tx.unsigned() {
            UnsignedTx::TransformSubnet(transform) => Ok(Some(transform.clone())),
            _ => Err(StateError::DataInconsistency(format!("tx {} is not a subnet transformation", tx.id())).into()),
        },
        None => Ok(None),
    }
}

impl TxExecutor {
    pub fn staking_rules(&self, chain: &dyn ChainReader, subnet_id: SubnetId) -> BlockProcessResult<StakingRules> {
        if subnet_id == PRIMARY_NETWORK_ID {
            let params = &self.config.params;
            return Ok(StakingRules {
                asset_id: params.fee_asset_id,
                min_validator_stake: params.min_validator_stake,
                max_validator_stake: params.max_validator_stake,
                min_delegator_stake: params.min_delegator_stake,
                min_delegation_fee: params.min_delegation_fee,
                min_stake_duration: params.min_stake_duration,
                max_stake_duration: params.max_stake_duration,
                max_validator_weight_factor: params.max_validator_weight_factor,
                uptime_requirement: params.uptime_requirement,
            });
        }
        let transform = transformation(chain, subnet_id)?.ok_or(TxError::SubnetNotTransformed(subnet_id))?;
        Ok(StakingRules::from_transformation(&transform))
    }

    /// Checks that the staker scheduled by `tx` may join the staker sets of `chain`
    pub(super) fn verify_new_staker(&self, chain: &dyn ChainReader, tx: &Tx) -> BlockProcessResult<()> {
        let unsigned = tx.unsigned();
        let staker = unsigned.scheduled_staker().ok_or(TxError::NotAStakerTx(tx.id()))?;
        self.verify_schedule(chain, staker)?;

        match unsigned {
            UnsignedTx::AddSubnetValidator(_) => self.verify_permissioned_validator(chain, staker),
            _ if staker.pending_priority().is_validator() => self.verify_validator(chain, staker),
            _ => self.verify_delegator(chain, staker),
        }
    }

    fn verify_schedule(&self, chain: &dyn ChainReader, staker: &dyn ScheduledStaker) -> BlockProcessResult<()> {
        let chain_time = chain.timestamp();
        if staker.start_time() <= chain_time {
            return Err(TxError::StartTimeTooEarly(staker.start_time(), chain_time).into());
        }
        if staker.start_time() > chain_time.saturating_add(self.config.max_future_start_time) {
            return Err(TxError::StartTimeTooLate(staker.start_time(), chain_time).into());
        }
        Ok(())
    }

    fn verify_duration(&self, min: u64, max: u64, staker: &dyn ScheduledStaker) -> BlockProcessResult<()> {
        let duration = staker.duration();
        if duration < min {
            return Err(TxError::StakeTooShort(duration, min).into());
        }
        if duration > max {
            return Err(TxError::StakeTooLong(duration, max).into());
        }
        Ok(())
    }

    fn verify_stake_asset(&self, rules: &StakingRules, staker: &dyn ScheduledStaker) -> BlockProcessResult<()> {
        match staker.stake().iter().find(|out| out.asset_id != rules.asset_id) {
            Some(out) => Err(TxError::WrongStakingAsset(out.asset_id, staker.subnet_id()).into()),
            None => Ok(()),
        }
    }

    fn verify_validator(&self, chain: &dyn ChainReader, staker: &dyn ScheduledStaker) -> BlockProcessResult<()> {
        let subnet_id = staker.subnet_id();
        let rules = self.staking_rules(chain, subnet_id)?;
        self.verify_stake_asset(&rules, staker)?;

        let weight = staker.weight();
        if weight < rules.min_validator_stake {
            return Err(TxError::WeightTooSmall(weight, rules.min_validator_stake).into());
        }
        if weight > rules.max_validator_stake {
            return Err(TxError::WeightTooLarge(weight, rules.max_validator_stake).into());
        }
        self.verify_duration(rules.min_stake_duration, rules.max_stake_duration, staker)?;
        let shares = staker.delegation_shares().unwrap_or_default();
        if shares < rules.min_delegation_fee {
            return Err(TxError::InsufficientDelegationFee(shares, rules.min_delegation_fee).into());
        }

        self.verify_not_validating(chain, staker)?;
        if subnet_id != PRIMARY_NETWORK_ID {
            self.verify_primary_network_period(chain, staker)?;
        }
        Ok(())
    }

    fn verify_permissioned_validator(&self, chain: &dyn ChainReader, staker: &dyn ScheduledStaker) -> BlockProcessResult<()> {
        let subnet_id = staker.subnet_id();
        if chain.subnet_owner(subnet_id).optional()?.is_none() {
            return Err(TxError::SubnetNotFound(subnet_id).into());
        }
        if chain.subnet_transformation(subnet_id).optional()?.is_some() {
            return Err(TxError::SubnetAlreadyTransformed(subnet_id).into());
        }
        self.verify_duration(self.config.min_stake_duration, self.config.max_stake_duration, staker)?;
        self.verify_not_validating(chain, staker)?;
        self.verify_primary_network_period(chain, staker)
    }

    fn verify_delegator(&self, chain: &dyn ChainReader, staker: &dyn ScheduledStaker) -> BlockProcessResult<()> {
        let (subnet_id, node_id) = (staker.subnet_id(), staker.node_id());
        let rules = self.staking_rules(chain, subnet_id)?;
        self.verify_stake_asset(&rules, staker)?;

        let weight = staker.weight();
        if weight < rules.min_delegator_stake {
            return Err(TxError::WeightTooSmall(weight, rules.min_delegator_stake).into());
        }
        self.verify_duration(rules.min_stake_duration, rules.max_stake_duration, staker)?;

        let validator = validator_of(chain, subnet_id, node_id)?.ok_or(TxError::ValidatorNotFound(node_id, subnet_id))?;
        if staker.start_time() < validator.start_time || staker.end_time() > validator.end_time {
            return Err(TxError::PeriodNotSubset(staker.start_time(), staker.end_time(), validator.start_time, validator.end_time).into());
        }

        // Every delegation overlapping the new one is counted, which bounds the peak weight from above
        let max_weight = validator.weight.saturating_mul(rules.max_validator_weight_factor).min(rules.max_validator_stake);
        let delegated = chain
            .current_delegators(subnet_id, node_id)?
            .into_iter()
            .chain(chain.pending_delegators(subnet_id, node_id)?)
            .filter(|delegator| delegator.start_time < staker.end_time() && staker.start_time() < delegator.end_time)
            .fold(0u64, |acc, delegator| acc.saturating_add(delegator.weight));
        let total = validator.weight.saturating_add(delegated).saturating_add(weight);
        if total > max_weight {
            return Err(TxError::OverDelegated(node_id, max_weight).into());
        }
        Ok(())
    }

    fn verify_not_validating(&self, chain: &dyn ChainReader, staker: &dyn ScheduledStaker) -> BlockProcessResult<()> {
        let (subnet_id, node_id) = (staker.subnet_id(), staker.node_id());
        if validator_of(chain, subnet_id, node_id)?.is_some() {
            return Err(TxError::DuplicateValidator(node_id, subnet_id).into());
        }
        Ok(())
    }

    /// Subnet validators must validate the primary network for their whole period
    fn verify_primary_network_period(&self, chain: &dyn ChainReader, staker: &dyn ScheduledStaker) -> BlockProcessResult<()> {
        let node_id = staker.node_id();
        let primary = validator_of(chain, PRIMARY_NETWORK_ID, node_id)?.ok_or(TxError::ValidatorNotFound(node_id, PRIMARY_NETWORK_ID))?;
        if staker.start_time() < primary.start_time || staker.end_time() > primary.end_time {
            return Err(TxError::PeriodNotSubset(staker.start_time(), staker.end_time(), primary.start_time, primary.end_time).into());
        }
        Ok(())
    }
}

/// The current validator of `(subnet_id, node_id)`, or the pending one
pub fn validator_of(chain: &dyn ChainReader, subnet_id: SubnetId, node_id: NodeId) -> BlockProcessResult<Option<Staker>> {
    if let Some(validator) = chain.current_validator(subnet_id, node_id).optional()? {
        return Ok(Some(validator));
    }
    Ok(chain.pending_validator(subnet_id, node_id).optional()?)
}
