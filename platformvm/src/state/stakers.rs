//! In-memory staker sets. [`BaseStakers`] mirrors the persisted sets and records what must be
//! written on the next commit, [`DiffStakers`] records the changes a diff makes on top of its parent.

use super::Chain;
use itertools::Itertools;
use omega_platformvm_core::{
    ids::{NodeId, SubnetId, TxId},
    staker::{Staker, StakerKey},
};
use std::collections::{BTreeMap, HashMap};

#[derive(Default)]
struct BaseValidator {
    validator: Option<Staker>,
    delegators: BTreeMap<StakerKey, Staker>,
}

impl BaseValidator {
    fn is_empty(&self) -> bool {
        self.validator.is_none() && self.delegators.is_empty()
    }
}

/// A staker write waiting for the next commit
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StakerWrite {
    Put(Staker),
    Delete(Staker),
}

/// One staker set (current or pending) of the persisted state
#[derive(Default)]
pub struct BaseStakers {
    validators: HashMap<SubnetId, HashMap<NodeId, BaseValidator>>,
    stakers: BTreeMap<StakerKey, Staker>,
    writes: HashMap<TxId, StakerWrite>,
}

impl BaseStakers {
    /// Builds the set out of stored stakers. Nothing is marked for writing.
    pub fn from_stakers(stakers: impl IntoIterator<Item = Staker>) -> Self {
        let mut set = Self::default();
        for staker in stakers {
            if staker.is_validator() {
                set.put_validator(staker);
            } else {
                set.put_delegator(staker);
            }
        }
        set.writes.clear();
        set
    }

    pub fn validator(&self, subnet_id: SubnetId, node_id: NodeId) -> Option<&Staker> {
        self.validators.get(&subnet_id)?.get(&node_id)?.validator.as_ref()
    }

    pub fn delegators(&self, subnet_id: SubnetId, node_id: NodeId) -> Vec<Staker> {
        self.validators
            .get(&subnet_id)
            .and_then(|nodes| nodes.get(&node_id))
            .map(|entry| entry.delegators.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn put_validator(&mut self, staker: Staker) {
        let entry = self.validators.entry(staker.subnet_id).or_default().entry(staker.node_id).or_default();
        if let Some(replaced) = entry.validator.replace(staker.clone()) {
            self.stakers.remove(&replaced.key());
        }
        self.stakers.insert(staker.key(), staker.clone());
        self.writes.insert(staker.tx_id, StakerWrite::Put(staker));
    }

    pub fn delete_validator(&mut self, staker: &Staker) {
        if let Some(nodes) = self.validators.get_mut(&staker.subnet_id) {
            if let Some(entry) = nodes.get_mut(&staker.node_id) {
                entry.validator = None;
                if entry.is_empty() {
                    nodes.remove(&staker.node_id);
                }
            }
            if nodes.is_empty() {
                self.validators.remove(&staker.subnet_id);
            }
        }
        self.stakers.remove(&staker.key());
        self.writes.insert(staker.tx_id, StakerWrite::Delete(staker.clone()));
    }

    pub fn put_delegator(&mut self, staker: Staker) {
        let entry = self.validators.entry(staker.subnet_id).or_default().entry(staker.node_id).or_default();
        entry.delegators.insert(staker.key(), staker.clone());
        self.stakers.insert(staker.key(), staker.clone());
        self.writes.insert(staker.tx_id, StakerWrite::Put(staker));
    }

    pub fn delete_delegator(&mut self, staker: &Staker) {
        if let Some(nodes) = self.validators.get_mut(&staker.subnet_id) {
            if let Some(entry) = nodes.get_mut(&staker.node_id) {
                entry.delegators.remove(&staker.key());
                if entry.is_empty() {
                    nodes.remove(&staker.node_id);
                }
            }
            if nodes.is_empty() {
                self.validators.remove(&staker.subnet_id);
            }
        }
        self.stakers.remove(&staker.key());
        self.writes.insert(staker.tx_id, StakerWrite::Delete(staker.clone()));
    }

    /// Stakers in ascending `(next_time, priority, tx_id)` order
    pub fn iter(&self) -> impl Iterator<Item = &Staker> {
        self.stakers.values()
    }

    pub fn len(&self) -> usize {
        self.stakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stakers.is_empty()
    }

    /// Hands over the writes accumulated since the last call
    pub fn take_writes(&mut self) -> Vec<StakerWrite> {
        self.writes.drain().map(|(_, write)| write).collect()
    }
}

/// How a diff sees a validator slot
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidatorStatus {
    Added(Staker),
    Deleted,
    Unmodified,
}

#[derive(Default, Clone)]
struct DiffValidator {
    /// Validator put by this diff
    added: Option<Staker>,
    /// Parent validator deleted by this diff
    deleted: Option<Staker>,
    added_delegators: BTreeMap<StakerKey, Staker>,
    deleted_delegators: HashMap<TxId, Staker>,
}

impl DiffValidator {
    fn status(&self) -> ValidatorStatus {
        match (&self.added, &self.deleted) {
            (Some(added), _) => ValidatorStatus::Added(added.clone()),
            (None, Some(_)) => ValidatorStatus::Deleted,
            (None, None) => ValidatorStatus::Unmodified,
        }
    }
}

/// Changes made by a diff to one staker set of its parent. A staker added and then deleted
/// within the same diff leaves no trace.
#[derive(Default, Clone)]
pub struct DiffStakers {
    validators: HashMap<SubnetId, HashMap<NodeId, DiffValidator>>,
    added: BTreeMap<StakerKey, Staker>,
    deleted: HashMap<TxId, Staker>,
}

impl DiffStakers {
    pub fn validator(&self, subnet_id: SubnetId, node_id: NodeId) -> ValidatorStatus {
        self.validators.get(&subnet_id).and_then(|nodes| nodes.get(&node_id)).map_or(ValidatorStatus::Unmodified, |v| v.status())
    }

    pub fn put_validator(&mut self, staker: Staker) {
        let entry = self.validators.entry(staker.subnet_id).or_default().entry(staker.node_id).or_default();
        if let Some(replaced) = entry.added.replace(staker.clone()) {
            self.added.remove(&replaced.key());
        }
        self.added.insert(staker.key(), staker);
    }

    pub fn delete_validator(&mut self, staker: &Staker) {
        let entry = self.validators.entry(staker.subnet_id).or_default().entry(staker.node_id).or_default();
        match entry.added.take() {
            Some(added) if added.tx_id == staker.tx_id => {
                self.added.remove(&added.key());
            }
            other => {
                entry.added = other;
                entry.deleted = Some(staker.clone());
                self.deleted.insert(staker.tx_id, staker.clone());
            }
        }
    }

    pub fn put_delegator(&mut self, staker: Staker) {
        let entry = self.validators.entry(staker.subnet_id).or_default().entry(staker.node_id).or_default();
        entry.added_delegators.insert(staker.key(), staker.clone());
        self.added.insert(staker.key(), staker);
    }

    pub fn delete_delegator(&mut self, staker: &Staker) {
        let entry = self.validators.entry(staker.subnet_id).or_default().entry(staker.node_id).or_default();
        if entry.added_delegators.remove(&staker.key()).is_some() {
            self.added.remove(&staker.key());
        } else {
            entry.deleted_delegators.insert(staker.tx_id, staker.clone());
            self.deleted.insert(staker.tx_id, staker.clone());
        }
    }

    /// Applies this diff to the delegators the parent holds for `(subnet_id, node_id)`
    pub fn delegators(&self, subnet_id: SubnetId, node_id: NodeId, parent: Vec<Staker>) -> Vec<Staker> {
        let Some(entry) = self.validators.get(&subnet_id).and_then(|nodes| nodes.get(&node_id)) else {
            return parent;
        };
        parent
            .into_iter()
            .filter(|staker| !entry.deleted_delegators.contains_key(&staker.tx_id))
            .merge_by(entry.added_delegators.values().cloned(), |a, b| a.key() <= b.key())
            .collect()
    }

    /// Merges the parent iteration with this diff, keeping the `(next_time, priority, tx_id)` order
    pub fn merge<'a>(&'a self, parent: impl Iterator<Item = Staker> + 'a) -> impl Iterator<Item = Staker> + 'a {
        parent.filter(|staker| !self.deleted.contains_key(&staker.tx_id)).merge_by(self.added.values().cloned(), |a, b| a.key() <= b.key())
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty()
    }

    /// Pushes the recorded changes into `chain`, deletions first so that replaced stakers
    /// end up with their latest version
    pub fn apply(&self, chain: &mut dyn Chain, current: bool) {
        for staker in self.deleted.values().sorted_by_key(|staker| staker.key()) {
            match (current, staker.is_validator()) {
                (true, true) => chain.delete_current_validator(staker),
                (true, false) => chain.delete_current_delegator(staker),
                (false, true) => chain.delete_pending_validator(staker),
                (false, false) => chain.delete_pending_delegator(staker),
            }
        }
        for staker in self.added.values() {
            match (current, staker.is_validator()) {
                (true, true) => chain.put_current_validator(staker.clone()),
                (true, false) => chain.put_current_delegator(staker.clone()),
                (false, true) => chain.put_pending_validator(staker.clone()),
                (false, false) => chain.put_pending_delegator(staker.clone()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{delegator_tx, pending_staker, subnet_validator_tx, validator_tx};
    use omega_platformvm_core::ids::PRIMARY_NETWORK_ID;

    #[test]
    fn test_base_stakers_order_and_lookup() {
        let v1 = pending_staker(&validator_tx(1, 300, 1000, 2000));
        let v2 = pending_staker(&validator_tx(2, 100, 1000, 2000));
        let d1 = pending_staker(&delegator_tx(2, 150, 900, 30));
        let mut set = BaseStakers::from_stakers([v1.clone(), v2.clone(), d1.clone()]);

        let order: Vec<TxId> = set.iter().map(|s| s.tx_id).collect();
        assert_eq!(order, vec![v2.tx_id, d1.tx_id, v1.tx_id]);
        assert_eq!(set.validator(PRIMARY_NETWORK_ID, v1.node_id), Some(&v1));
        assert_eq!(set.delegators(PRIMARY_NETWORK_ID, v2.node_id), vec![d1.clone()]);
        assert!(set.take_writes().is_empty());

        set.delete_delegator(&d1);
        set.delete_validator(&v2);
        assert_eq!(set.len(), 1);
        assert!(set.validator(PRIMARY_NETWORK_ID, v2.node_id).is_none());
        assert_eq!(set.take_writes().len(), 2);
    }

    #[test]
    fn test_ties_are_broken_by_priority() {
        // A permissioned subnet validator and a primary validator expiring at the same time
        let primary = validator_tx(1, 100, 500, 2000);
        let subnet = subnet_validator_tx(1, SubnetId::from_u64_word(5), 100, 500, 10);
        let current = |tx| pending_staker(tx).promoted();
        let set = BaseStakers::from_stakers([current(&primary), current(&subnet)]);
        let first = set.iter().next().unwrap();
        assert!(first.priority.is_permissioned());
    }

    #[test]
    fn test_diff_added_then_deleted_collapses() {
        let staker = pending_staker(&validator_tx(1, 100, 1000, 2000));
        let mut diff = DiffStakers::default();
        diff.put_validator(staker.clone());
        assert_eq!(diff.validator(PRIMARY_NETWORK_ID, staker.node_id), ValidatorStatus::Added(staker.clone()));
        diff.delete_validator(&staker);
        assert_eq!(diff.validator(PRIMARY_NETWORK_ID, staker.node_id), ValidatorStatus::Unmodified);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_diff_replacing_a_parent_validator() {
        let staker = pending_staker(&validator_tx(1, 100, 1000, 2000)).promoted();
        let parent = vec![staker.clone()];

        let mut diff = DiffStakers::default();
        diff.delete_validator(&staker);
        assert_eq!(diff.validator(PRIMARY_NETWORK_ID, staker.node_id), ValidatorStatus::Deleted);
        assert_eq!(diff.merge(parent.clone().into_iter()).count(), 0);

        let rewarded = Staker { potential_reward: 77, ..staker.clone() };
        diff.put_validator(rewarded.clone());
        let merged: Vec<Staker> = diff.merge(parent.into_iter()).collect();
        assert_eq!(merged, vec![rewarded.clone()]);

        // Deleting the replacement keeps the parent deletion
        diff.delete_validator(&rewarded);
        assert_eq!(diff.validator(PRIMARY_NETWORK_ID, staker.node_id), ValidatorStatus::Deleted);
    }

    #[test]
    fn test_diff_merge_keeps_order() {
        let parent: Vec<Staker> = [(1, 100), (2, 300), (3, 500)].iter().map(|&(n, s)| pending_staker(&validator_tx(n, s, 2000, 2000))).collect();
        let mut diff = DiffStakers::default();
        let added = pending_staker(&validator_tx(4, 200, 2000, 2000));
        diff.put_validator(added.clone());
        diff.delete_validator(&parent[2]);

        let times: Vec<u64> = diff.merge(parent.into_iter()).map(|s| s.next_time).collect();
        assert_eq!(times, vec![100, 200, 300]);
    }

    #[test]
    fn test_diff_delegators() {
        let d1 = pending_staker(&delegator_tx(1, 100, 500, 30));
        let d2 = pending_staker(&delegator_tx(1, 120, 500, 40));
        let mut diff = DiffStakers::default();
        diff.delete_delegator(&d1);
        diff.put_delegator(d2.clone());
        assert_eq!(diff.delegators(PRIMARY_NETWORK_ID, d1.node_id, vec![d1.clone()]), vec![d2]);
    }
}
