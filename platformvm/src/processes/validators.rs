//! Weighted validator sets used for consensus sampling. Must always reflect the current stakers
//! of the last accepted state: populated from them on startup and updated on every accept.

use crate::state::base::ValidatorWeightChange;
use indexmap::IndexMap;
use omega_core::trace;
use omega_platformvm_core::{
    ids::{NodeId, SubnetId},
    tx::staking::PublicKey,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidatorsError {
    #[error("node {0} is already in the validator set of subnet {1}")]
    Duplicate(NodeId, SubnetId),

    #[error("node {0} is not in the validator set of subnet {1}")]
    NotFound(NodeId, SubnetId),

    #[error("cannot remove weight {2} from node {0} of subnet {1}, which only has {3}")]
    InsufficientWeight(NodeId, SubnetId, u64, u64),

    #[error("validator weight overflow")]
    Overflow,
}

pub type ValidatorsResult<T> = std::result::Result<T, ValidatorsError>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorWeight {
    pub node_id: NodeId,
    pub public_key: Option<PublicKey>,
    pub weight: u64,
}

#[derive(Default)]
pub struct ValidatorsManager {
    sets: RwLock<HashMap<SubnetId, IndexMap<NodeId, ValidatorWeight>>>,
}

impl ValidatorsManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_staker(&self, subnet_id: SubnetId, node_id: NodeId, public_key: Option<PublicKey>, weight: u64) -> ValidatorsResult<()> {
        let mut sets = self.sets.write();
        let set = sets.entry(subnet_id).or_default();
        if set.contains_key(&node_id) {
            return Err(ValidatorsError::Duplicate(node_id, subnet_id));
        }
        set.insert(node_id, ValidatorWeight { node_id, public_key, weight });
        Ok(())
    }

    pub fn add_weight(&self, subnet_id: SubnetId, node_id: NodeId, weight: u64) -> ValidatorsResult<()> {
        let mut sets = self.sets.write();
        let validator =
            sets.get_mut(&subnet_id).and_then(|set| set.get_mut(&node_id)).ok_or(ValidatorsError::NotFound(node_id, subnet_id))?;
        validator.weight = validator.weight.checked_add(weight).ok_or(ValidatorsError::Overflow)?;
        Ok(())
    }

    /// Removes `weight` from the validator, dropping it from the set once its weight reaches zero
    pub fn remove_weight(&self, subnet_id: SubnetId, node_id: NodeId, weight: u64) -> ValidatorsResult<()> {
        let mut sets = self.sets.write();
        let set = sets.get_mut(&subnet_id).ok_or(ValidatorsError::NotFound(node_id, subnet_id))?;
        let validator = set.get_mut(&node_id).ok_or(ValidatorsError::NotFound(node_id, subnet_id))?;
        if validator.weight < weight {
            return Err(ValidatorsError::InsufficientWeight(node_id, subnet_id, weight, validator.weight));
        }
        validator.weight -= weight;
        if validator.weight == 0 {
            set.shift_remove(&node_id);
            if set.is_empty() {
                sets.remove(&subnet_id);
            }
        }
        Ok(())
    }

    pub fn get_weight(&self, subnet_id: SubnetId, node_id: NodeId) -> u64 {
        self.sets.read().get(&subnet_id).and_then(|set| set.get(&node_id)).map_or(0, |v| v.weight)
    }

    pub fn get_validator(&self, subnet_id: SubnetId, node_id: NodeId) -> Option<ValidatorWeight> {
        self.sets.read().get(&subnet_id).and_then(|set| set.get(&node_id)).cloned()
    }

    pub fn total_weight(&self, subnet_id: SubnetId) -> ValidatorsResult<u64> {
        self.sets
            .read()
            .get(&subnet_id)
            .map_or(Some(0), |set| set.values().try_fold(0u64, |acc, v| acc.checked_add(v.weight)))
            .ok_or(ValidatorsError::Overflow)
    }

    pub fn count(&self, subnet_id: SubnetId) -> usize {
        self.sets.read().get(&subnet_id).map_or(0, |set| set.len())
    }

    /// The validators of `subnet_id` in insertion order
    pub fn get_validators(&self, subnet_id: SubnetId) -> Vec<ValidatorWeight> {
        self.sets.read().get(&subnet_id).map(|set| set.values().cloned().collect()).unwrap_or_default()
    }

    pub fn apply_changes(&self, changes: &[ValidatorWeightChange]) -> ValidatorsResult<()> {
        for change in changes {
            trace!(
                "Validator {} of subnet {}: +{} -{}",
                change.node_id, change.subnet_id, change.increase, change.decrease
            );
            if change.increase > 0 {
                if self.get_validator(change.subnet_id, change.node_id).is_some() {
                    self.add_weight(change.subnet_id, change.node_id, change.increase)?;
                } else {
                    self.add_staker(change.subnet_id, change.node_id, change.public_key.clone(), change.increase)?;
                }
            }
            if change.decrease > 0 {
                self.remove_weight(change.subnet_id, change.node_id, change.decrease)?;
            }
        }
        Ok(())
    }
}
