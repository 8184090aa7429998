use crate::{
    ids::{NodeId, PRIMARY_NETWORK_ID, SubnetId, TxId},
    tx::staking::{PublicKey, ScheduledStaker},
};
use omega_math::BigUint;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Orders stakers sharing the same next event time. Pending tiers come first so that
/// a staker can never be promoted and expired within the same chain time tick.
/// Among current tiers, permissioned subnet validators are expired first since their
/// removal does not depend on a reward decision, and delegators precede the validator
/// they delegate to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Priority {
    PrimaryNetworkValidatorPending = 1,
    PrimaryNetworkDelegatorPending,
    SubnetPermissionlessValidatorPending,
    SubnetPermissionlessDelegatorPending,
    SubnetPermissionedValidatorPending,
    SubnetPermissionedValidatorCurrent,
    SubnetPermissionlessDelegatorCurrent,
    SubnetPermissionlessValidatorCurrent,
    PrimaryNetworkDelegatorCurrent,
    PrimaryNetworkValidatorCurrent,
}

impl Priority {
    pub fn is_current(self) -> bool {
        matches!(
            self,
            Priority::SubnetPermissionedValidatorCurrent
                | Priority::SubnetPermissionlessDelegatorCurrent
                | Priority::SubnetPermissionlessValidatorCurrent
                | Priority::PrimaryNetworkDelegatorCurrent
                | Priority::PrimaryNetworkValidatorCurrent
        )
    }

    pub fn is_pending(self) -> bool {
        !self.is_current()
    }

    pub fn is_validator(self) -> bool {
        matches!(
            self,
            Priority::PrimaryNetworkValidatorPending
                | Priority::SubnetPermissionlessValidatorPending
                | Priority::SubnetPermissionedValidatorPending
                | Priority::SubnetPermissionedValidatorCurrent
                | Priority::SubnetPermissionlessValidatorCurrent
                | Priority::PrimaryNetworkValidatorCurrent
        )
    }

    pub fn is_delegator(self) -> bool {
        !self.is_validator()
    }

    pub fn is_permissioned(self) -> bool {
        matches!(self, Priority::SubnetPermissionedValidatorPending | Priority::SubnetPermissionedValidatorCurrent)
    }

    pub fn is_primary_network(self) -> bool {
        matches!(
            self,
            Priority::PrimaryNetworkValidatorPending
                | Priority::PrimaryNetworkDelegatorPending
                | Priority::PrimaryNetworkDelegatorCurrent
                | Priority::PrimaryNetworkValidatorCurrent
        )
    }

    /// Maps a pending tier to its current counterpart. Current tiers map to themselves.
    pub fn to_current(self) -> Priority {
        match self {
            Priority::PrimaryNetworkValidatorPending => Priority::PrimaryNetworkValidatorCurrent,
            Priority::PrimaryNetworkDelegatorPending => Priority::PrimaryNetworkDelegatorCurrent,
            Priority::SubnetPermissionlessValidatorPending => Priority::SubnetPermissionlessValidatorCurrent,
            Priority::SubnetPermissionlessDelegatorPending => Priority::SubnetPermissionlessDelegatorCurrent,
            Priority::SubnetPermissionedValidatorPending => Priority::SubnetPermissionedValidatorCurrent,
            current => current,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakerError {
    #[error("staker {0} has start time {1} not before its end time {2}")]
    InvalidPeriod(TxId, u64, u64),

    #[error("staker {0} has a current priority {1:?} while being created as pending")]
    NotPending(TxId, Priority),
}

/// A validator or delegator stake record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staker {
    pub tx_id: TxId,
    pub node_id: NodeId,
    pub public_key: Option<PublicKey>,
    pub subnet_id: SubnetId,
    pub weight: u64,
    pub start_time: u64,
    pub end_time: u64,
    pub potential_reward: u64,
    /// Accumulated mint rate at the time the staker became current
    pub mint_rate: BigUint,
    /// Accumulated fee per weight at the time the staker became current
    pub fee_per_weight_paid: BigUint,
    /// `start_time` while pending, `end_time` once current
    pub next_time: u64,
    pub priority: Priority,
}

impl Staker {
    pub fn new_pending<S: ScheduledStaker + ?Sized>(tx_id: TxId, staker: &S) -> Result<Self, StakerError> {
        let priority = staker.pending_priority();
        if priority.is_current() {
            return Err(StakerError::NotPending(tx_id, priority));
        }
        Self::new(tx_id, staker, staker.start_time(), priority, 0)
    }

    /// Creates a current staker directly, as done for genesis validators and for stakers
    /// added after the pending set was retired
    pub fn new_current<S: ScheduledStaker + ?Sized>(tx_id: TxId, staker: &S, potential_reward: u64) -> Result<Self, StakerError> {
        Self::new(tx_id, staker, staker.end_time(), staker.pending_priority().to_current(), potential_reward)
    }

    fn new<S: ScheduledStaker + ?Sized>(
        tx_id: TxId,
        staker: &S,
        next_time: u64,
        priority: Priority,
        potential_reward: u64,
    ) -> Result<Self, StakerError> {
        let (start_time, end_time) = (staker.start_time(), staker.end_time());
        if start_time >= end_time {
            return Err(StakerError::InvalidPeriod(tx_id, start_time, end_time));
        }
        Ok(Self {
            tx_id,
            node_id: staker.node_id(),
            public_key: staker.public_key().cloned(),
            subnet_id: staker.subnet_id(),
            weight: staker.weight(),
            start_time,
            end_time,
            potential_reward,
            mint_rate: BigUint::ZERO,
            fee_per_weight_paid: BigUint::ZERO,
            next_time,
            priority,
        })
    }

    /// Returns the current form of this pending staker
    pub fn promoted(&self) -> Staker {
        Staker { next_time: self.end_time, priority: self.priority.to_current(), ..self.clone() }
    }

    pub fn key(&self) -> StakerKey {
        StakerKey { next_time: self.next_time, priority: self.priority, tx_id: self.tx_id }
    }

    pub fn is_validator(&self) -> bool {
        self.priority.is_validator()
    }

    pub fn is_delegator(&self) -> bool {
        self.priority.is_delegator()
    }

    pub fn is_current(&self) -> bool {
        self.priority.is_current()
    }

    pub fn is_primary_network(&self) -> bool {
        self.subnet_id == PRIMARY_NETWORK_ID
    }

    pub fn duration(&self) -> u64 {
        self.end_time - self.start_time
    }
}

/// Sort key of the staker sets: ascending next time, then priority, then tx id
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StakerKey {
    pub next_time: u64,
    pub priority: Priority,
    pub tx_id: TxId,
}

impl Ord for StakerKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.next_time.cmp(&other.next_time).then(self.priority.cmp(&other.priority)).then(self.tx_id.cmp(&other.tx_id))
    }
}

impl PartialOrd for StakerKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
