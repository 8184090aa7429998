use super::{BaseTx, staking::SubnetAuth};
use crate::{
    constants::{MAX_CHAIN_NAME_LEN, MAX_GENESIS_DATA_LEN, PERCENT_DENOMINATOR},
    errors::tx::{TxError, TxResult},
    ids::{AssetId, Hash, NodeId, SubnetId, VmId},
    utxo::OutputOwners,
};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct CreateSubnetTx {
    pub base: BaseTx,
    /// Controls who may add validators and chains to the new subnet
    pub owner: OutputOwners,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct CreateChainTx {
    pub base: BaseTx,
    pub subnet_id: SubnetId,
    pub chain_name: String,
    pub vm_id: VmId,
    pub fx_ids: Vec<Hash>,
    pub genesis_data: Vec<u8>,
    pub subnet_auth: SubnetAuth,
}

impl CreateChainTx {
    pub fn verify_fields(&self) -> TxResult<()> {
        if self.chain_name.is_empty()
            || self.chain_name.len() > MAX_CHAIN_NAME_LEN
            || !self.chain_name.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ')
        {
            return Err(TxError::InvalidChainName(self.chain_name.clone()));
        }
        if self.genesis_data.len() > MAX_GENESIS_DATA_LEN {
            return Err(TxError::GenesisDataTooLarge(self.genesis_data.len(), MAX_GENESIS_DATA_LEN));
        }
        Ok(())
    }
}

/// Removes a permissioned subnet validator before its end time
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct RemoveSubnetValidatorTx {
    pub base: BaseTx,
    pub node_id: NodeId,
    pub subnet_id: SubnetId,
    pub subnet_auth: SubnetAuth,
}

/// Turns a permissioned subnet into a permissionless one with its own staking asset
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct TransformSubnetTx {
    pub base: BaseTx,
    pub subnet_id: SubnetId,
    pub asset_id: AssetId,
    pub initial_supply: u64,
    pub maximum_supply: u64,
    pub min_consumption_rate: u64,
    pub max_consumption_rate: u64,
    pub min_validator_stake: u64,
    pub max_validator_stake: u64,
    pub min_stake_duration: u32,
    pub max_stake_duration: u32,
    pub min_delegation_fee: u32,
    pub min_delegator_stake: u64,
    pub max_validator_weight_factor: u8,
    pub uptime_requirement: u32,
    pub subnet_auth: SubnetAuth,
}

impl TransformSubnetTx {
    pub fn verify_fields(&self, fee_asset_id: AssetId) -> TxResult<()> {
        let fail = |reason: &str| Err(TxError::InvalidTransformation(reason.to_string()));
        if self.asset_id == fee_asset_id {
            return fail("the fee asset cannot be used for staking");
        }
        if self.initial_supply == 0 || self.initial_supply > self.maximum_supply {
            return fail("initial supply must be positive and at most the maximum supply");
        }
        if self.min_consumption_rate > self.max_consumption_rate || self.max_consumption_rate > PERCENT_DENOMINATOR {
            return fail("invalid consumption rates");
        }
        if self.min_validator_stake == 0
            || self.min_validator_stake > self.initial_supply
            || self.min_validator_stake > self.max_validator_stake
            || self.max_validator_stake > self.maximum_supply
        {
            return fail("invalid validator stake bounds");
        }
        if self.min_stake_duration == 0 || self.min_stake_duration > self.max_stake_duration {
            return fail("invalid stake duration bounds");
        }
        if self.min_delegation_fee as u64 > PERCENT_DENOMINATOR || self.uptime_requirement as u64 > PERCENT_DENOMINATOR {
            return fail("fees and uptime are over the denominator");
        }
        if self.min_delegator_stake == 0 || self.max_validator_weight_factor == 0 {
            return fail("delegation bounds must be positive");
        }
        Ok(())
    }
}
