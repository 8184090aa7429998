use super::BaseTx;
use crate::{
    ids::{NodeId, PRIMARY_NETWORK_ID, SubnetId},
    staker::Priority,
    utxo::{OutputOwners, TransferableOutput},
};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// A compressed BLS public key. Signature verification happens outside of this crate.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PublicKey(pub Vec<u8>);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Validator {
    pub node_id: NodeId,
    pub start: u64,
    pub end: u64,
    pub weight: u64,
}

impl Validator {
    pub fn duration(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Whether `[start, end]` is contained in the period of `other`
    pub fn is_subset_of(&self, other_start: u64, other_end: u64) -> bool {
        self.start >= other_start && self.end <= other_end
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct SubnetValidator {
    pub validator: Validator,
    pub subnet_id: SubnetId,
}

/// Indices of the subnet owner addresses signing the subnet credential
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct SubnetAuth {
    pub sig_indices: Vec<u32>,
}

/// Common view of txs scheduling a staker
pub trait ScheduledStaker {
    fn node_id(&self) -> NodeId;
    fn subnet_id(&self) -> SubnetId;
    fn weight(&self) -> u64;
    fn start_time(&self) -> u64;
    fn end_time(&self) -> u64;
    fn pending_priority(&self) -> Priority;

    fn public_key(&self) -> Option<&PublicKey> {
        None
    }

    /// Locked stake returned when the staker is removed
    fn stake(&self) -> &[TransferableOutput] {
        &[]
    }

    /// Owner of the staking reward, `None` for stakers which are never rewarded
    fn rewards_owner(&self) -> Option<&OutputOwners> {
        None
    }

    /// Owner of the validator's share of delegation rewards
    fn delegation_rewards_owner(&self) -> Option<&OutputOwners> {
        None
    }

    /// Share of delegator rewards kept by the validator, over `PERCENT_DENOMINATOR`
    fn delegation_shares(&self) -> Option<u32> {
        None
    }

    fn duration(&self) -> u64 {
        self.end_time().saturating_sub(self.start_time())
    }
}

/// Adds a primary network validator. Issued as a proposal before Banff.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct AddValidatorTx {
    pub base: BaseTx,
    pub validator: Validator,
    pub stake_outs: Vec<TransferableOutput>,
    pub rewards_owner: OutputOwners,
    pub delegation_shares: u32,
}

impl ScheduledStaker for AddValidatorTx {
    fn node_id(&self) -> NodeId {
        self.validator.node_id
    }
    fn subnet_id(&self) -> SubnetId {
        PRIMARY_NETWORK_ID
    }
    fn weight(&self) -> u64 {
        self.validator.weight
    }
    fn start_time(&self) -> u64 {
        self.validator.start
    }
    fn end_time(&self) -> u64 {
        self.validator.end
    }
    fn pending_priority(&self) -> Priority {
        Priority::PrimaryNetworkValidatorPending
    }
    fn stake(&self) -> &[TransferableOutput] {
        &self.stake_outs
    }
    fn rewards_owner(&self) -> Option<&OutputOwners> {
        Some(&self.rewards_owner)
    }
    fn delegation_rewards_owner(&self) -> Option<&OutputOwners> {
        Some(&self.rewards_owner)
    }
    fn delegation_shares(&self) -> Option<u32> {
        Some(self.delegation_shares)
    }
}

/// Adds a validator to a permissioned subnet
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct AddSubnetValidatorTx {
    pub base: BaseTx,
    pub validator: SubnetValidator,
    pub subnet_auth: SubnetAuth,
}

impl ScheduledStaker for AddSubnetValidatorTx {
    fn node_id(&self) -> NodeId {
        self.validator.validator.node_id
    }
    fn subnet_id(&self) -> SubnetId {
        self.validator.subnet_id
    }
    fn weight(&self) -> u64 {
        self.validator.validator.weight
    }
    fn start_time(&self) -> u64 {
        self.validator.validator.start
    }
    fn end_time(&self) -> u64 {
        self.validator.validator.end
    }
    fn pending_priority(&self) -> Priority {
        Priority::SubnetPermissionedValidatorPending
    }
}

/// Delegates stake to a primary network validator
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct AddDelegatorTx {
    pub base: BaseTx,
    pub validator: Validator,
    pub stake_outs: Vec<TransferableOutput>,
    pub rewards_owner: OutputOwners,
}

impl ScheduledStaker for AddDelegatorTx {
    fn node_id(&self) -> NodeId {
        self.validator.node_id
    }
    fn subnet_id(&self) -> SubnetId {
        PRIMARY_NETWORK_ID
    }
    fn weight(&self) -> u64 {
        self.validator.weight
    }
    fn start_time(&self) -> u64 {
        self.validator.start
    }
    fn end_time(&self) -> u64 {
        self.validator.end
    }
    fn pending_priority(&self) -> Priority {
        Priority::PrimaryNetworkDelegatorPending
    }
    fn stake(&self) -> &[TransferableOutput] {
        &self.stake_outs
    }
    fn rewards_owner(&self) -> Option<&OutputOwners> {
        Some(&self.rewards_owner)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct AddPermissionlessValidatorTx {
    pub base: BaseTx,
    pub validator: Validator,
    pub subnet_id: SubnetId,
    /// Only primary network validators register a key
    pub signer: Option<PublicKey>,
    pub stake_outs: Vec<TransferableOutput>,
    pub validator_rewards_owner: OutputOwners,
    pub delegator_rewards_owner: OutputOwners,
    pub delegation_shares: u32,
}

impl ScheduledStaker for AddPermissionlessValidatorTx {
    fn node_id(&self) -> NodeId {
        self.validator.node_id
    }
    fn subnet_id(&self) -> SubnetId {
        self.subnet_id
    }
    fn weight(&self) -> u64 {
        self.validator.weight
    }
    fn start_time(&self) -> u64 {
        self.validator.start
    }
    fn end_time(&self) -> u64 {
        self.validator.end
    }
    fn pending_priority(&self) -> Priority {
        if self.subnet_id == PRIMARY_NETWORK_ID {
            Priority::PrimaryNetworkValidatorPending
        } else {
            Priority::SubnetPermissionlessValidatorPending
        }
    }
    fn public_key(&self) -> Option<&PublicKey> {
        self.signer.as_ref()
    }
    fn stake(&self) -> &[TransferableOutput] {
        &self.stake_outs
    }
    fn rewards_owner(&self) -> Option<&OutputOwners> {
        Some(&self.validator_rewards_owner)
    }
    fn delegation_rewards_owner(&self) -> Option<&OutputOwners> {
        Some(&self.delegator_rewards_owner)
    }
    fn delegation_shares(&self) -> Option<u32> {
        Some(self.delegation_shares)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct AddPermissionlessDelegatorTx {
    pub base: BaseTx,
    pub validator: Validator,
    pub subnet_id: SubnetId,
    pub stake_outs: Vec<TransferableOutput>,
    pub rewards_owner: OutputOwners,
}

impl ScheduledStaker for AddPermissionlessDelegatorTx {
    fn node_id(&self) -> NodeId {
        self.validator.node_id
    }
    fn subnet_id(&self) -> SubnetId {
        self.subnet_id
    }
    fn weight(&self) -> u64 {
        self.validator.weight
    }
    fn start_time(&self) -> u64 {
        self.validator.start
    }
    fn end_time(&self) -> u64 {
        self.validator.end
    }
    fn pending_priority(&self) -> Priority {
        if self.subnet_id == PRIMARY_NETWORK_ID {
            Priority::PrimaryNetworkDelegatorPending
        } else {
            Priority::SubnetPermissionlessDelegatorPending
        }
    }
    fn stake(&self) -> &[TransferableOutput] {
        &self.stake_outs
    }
    fn rewards_owner(&self) -> Option<&OutputOwners> {
        Some(&self.rewards_owner)
    }
}

#[cfg(test)]
impl AddValidatorTx {
    pub(crate) fn new_for_test(validator: Validator) -> Self {
        Self {
            base: BaseTx::default(),
            validator,
            stake_outs: vec![],
            rewards_owner: OutputOwners::default(),
            delegation_shares: crate::constants::PERCENT_DENOMINATOR as u32,
        }
    }
}

#[cfg(test)]
impl AddSubnetValidatorTx {
    pub(crate) fn new_for_test(validator: SubnetValidator) -> Self {
        Self { base: BaseTx::default(), validator, subnet_auth: SubnetAuth::default() }
    }
}
