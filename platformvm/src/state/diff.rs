use super::{Chain, ChainReader, StakerIter, Versions, stakers::DiffStakers, stakers::ValidatorStatus};
use crate::{
    errors::{StateError, StateResult},
    model::accumulators::RewardAccumulators,
};
use indexmap::IndexMap;
use omega_platformvm_core::{
    ids::{BlockId, NodeId, SubnetId, TxId},
    staker::Staker,
    status::TxStatus,
    tx::Tx,
    utxo::{OutputOwners, Utxo, UtxoId},
};
use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

enum ParentState {
    /// Resolved by block id on every read, so that an evicted parent surfaces as an error
    /// instead of being kept alive
    Version { id: BlockId, versions: Weak<dyn Versions> },
    Direct(Arc<dyn ChainReader>),
}

impl ParentState {
    fn resolve(&self) -> StateResult<Arc<dyn ChainReader>> {
        match self {
            ParentState::Version { id, versions } => {
                versions.upgrade().and_then(|versions| versions.get_state(*id)).ok_or(StateError::MissingParentState(*id))
            }
            ParentState::Direct(state) => Ok(state.clone()),
        }
    }
}

/// A copy-on-write overlay on top of a parent chain state. Reads fall through to the parent
/// for anything this diff did not touch; nothing reaches the parent before [`Diff::apply`].
pub struct Diff {
    parent: ParentState,

    timestamp: u64,
    accumulators: RewardAccumulators,
    current_supply: HashMap<SubnetId, u64>,

    current_stakers: DiffStakers,
    pending_stakers: DiffStakers,

    added_subnets: IndexMap<SubnetId, OutputOwners>,
    transformed_subnets: HashMap<SubnetId, Tx>,
    added_chains: HashMap<SubnetId, Vec<Tx>>,
    added_txs: IndexMap<TxId, (Tx, TxStatus)>,
    added_reward_utxos: HashMap<TxId, Vec<Utxo>>,
    /// `None` marks a consumed UTXO
    modified_utxos: HashMap<UtxoId, Option<Utxo>>,
}

impl Diff {
    /// Creates a diff on top of the state resulting from block `parent_id`
    pub fn new(parent_id: BlockId, versions: Weak<dyn Versions>) -> StateResult<Self> {
        let parent = ParentState::Version { id: parent_id, versions };
        let state = parent.resolve()?;
        Ok(Self::with_parent(parent, state.as_ref()))
    }

    /// Creates a diff directly on top of `parent`, which is kept alive by the diff
    pub fn new_on(parent: Arc<dyn ChainReader>) -> Self {
        let state = parent.clone();
        Self::with_parent(ParentState::Direct(parent), state.as_ref())
    }

    fn with_parent(parent: ParentState, state: &dyn ChainReader) -> Self {
        Self {
            parent,
            timestamp: state.timestamp(),
            accumulators: state.accumulators(),
            current_supply: Default::default(),
            current_stakers: Default::default(),
            pending_stakers: Default::default(),
            added_subnets: Default::default(),
            transformed_subnets: Default::default(),
            added_chains: Default::default(),
            added_txs: Default::default(),
            added_reward_utxos: Default::default(),
            modified_utxos: Default::default(),
        }
    }

    fn parent(&self) -> StateResult<Arc<dyn ChainReader>> {
        self.parent.resolve()
    }

    /// Txs added by this diff, in insertion order
    pub fn added_txs(&self) -> impl Iterator<Item = &(Tx, TxStatus)> {
        self.added_txs.values()
    }

    /// Pushes every recorded change into `chain`. Must not read the parent: when applied to the
    /// base state the caller already holds its write lock.
    pub fn apply(&self, chain: &mut dyn Chain) {
        chain.set_timestamp(self.timestamp);
        chain.set_accumulators(self.accumulators.clone());
        for (&subnet_id, &supply) in self.current_supply.iter() {
            chain.set_current_supply(subnet_id, supply);
        }
        self.current_stakers.apply(chain, true);
        self.pending_stakers.apply(chain, false);
        for (&subnet_id, owner) in self.added_subnets.iter() {
            chain.add_subnet(subnet_id, owner.clone());
        }
        for (&subnet_id, tx) in self.transformed_subnets.iter() {
            chain.add_subnet_transformation(subnet_id, tx.clone());
        }
        for (&subnet_id, txs) in self.added_chains.iter() {
            for tx in txs {
                chain.add_chain(subnet_id, tx.clone());
            }
        }
        for (tx, status) in self.added_txs.values() {
            chain.add_tx(tx.clone(), *status);
        }
        for (&tx_id, utxos) in self.added_reward_utxos.iter() {
            for utxo in utxos {
                chain.add_reward_utxo(tx_id, utxo.clone());
            }
        }
        for (&utxo_id, utxo) in self.modified_utxos.iter() {
            match utxo {
                Some(utxo) => chain.add_utxo(utxo.clone()),
                None => chain.delete_utxo(utxo_id),
            }
        }
    }
}

fn validator_lookup(
    status: ValidatorStatus,
    subnet_id: SubnetId,
    node_id: NodeId,
    kind: &str,
    fallback: impl FnOnce() -> StateResult<Staker>,
) -> StateResult<Staker> {
    match status {
        ValidatorStatus::Added(staker) => Ok(staker),
        ValidatorStatus::Deleted => Err(StateError::NotFound(format!("{kind} validator {node_id} of subnet {subnet_id}"))),
        ValidatorStatus::Unmodified => fallback(),
    }
}

impl ChainReader for Diff {
    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn accumulators(&self) -> RewardAccumulators {
        self.accumulators.clone()
    }

    fn current_supply(&self, subnet_id: SubnetId) -> StateResult<u64> {
        match self.current_supply.get(&subnet_id) {
            Some(&supply) => Ok(supply),
            None => self.parent()?.current_supply(subnet_id),
        }
    }

    fn current_validator(&self, subnet_id: SubnetId, node_id: NodeId) -> StateResult<Staker> {
        validator_lookup(self.current_stakers.validator(subnet_id, node_id), subnet_id, node_id, "current", || {
            self.parent()?.current_validator(subnet_id, node_id)
        })
    }

    fn current_delegators(&self, subnet_id: SubnetId, node_id: NodeId) -> StateResult<Vec<Staker>> {
        let parent = self.parent()?.current_delegators(subnet_id, node_id)?;
        Ok(self.current_stakers.delegators(subnet_id, node_id, parent))
    }

    fn current_stakers(&self) -> StateResult<StakerIter> {
        let parent = self.parent()?.current_stakers()?;
        let merged: Vec<Staker> = self.current_stakers.merge(parent).collect();
        Ok(Box::new(merged.into_iter()))
    }

    fn pending_validator(&self, subnet_id: SubnetId, node_id: NodeId) -> StateResult<Staker> {
        validator_lookup(self.pending_stakers.validator(subnet_id, node_id), subnet_id, node_id, "pending", || {
            self.parent()?.pending_validator(subnet_id, node_id)
        })
    }

    fn pending_delegators(&self, subnet_id: SubnetId, node_id: NodeId) -> StateResult<Vec<Staker>> {
        let parent = self.parent()?.pending_delegators(subnet_id, node_id)?;
        Ok(self.pending_stakers.delegators(subnet_id, node_id, parent))
    }

    fn pending_stakers(&self) -> StateResult<StakerIter> {
        let parent = self.parent()?.pending_stakers()?;
        let merged: Vec<Staker> = self.pending_stakers.merge(parent).collect();
        Ok(Box::new(merged.into_iter()))
    }

    fn utxo(&self, utxo_id: UtxoId) -> StateResult<Utxo> {
        match self.modified_utxos.get(&utxo_id) {
            Some(Some(utxo)) => Ok(utxo.clone()),
            Some(None) => Err(StateError::NotFound(format!("utxo {utxo_id}"))),
            None => self.parent()?.utxo(utxo_id),
        }
    }

    fn tx(&self, tx_id: TxId) -> StateResult<(Tx, TxStatus)> {
        match self.added_txs.get(&tx_id) {
            Some(entry) => Ok(entry.clone()),
            None => self.parent()?.tx(tx_id),
        }
    }

    fn subnet_owner(&self, subnet_id: SubnetId) -> StateResult<OutputOwners> {
        match self.added_subnets.get(&subnet_id) {
            Some(owner) => Ok(owner.clone()),
            None => self.parent()?.subnet_owner(subnet_id),
        }
    }

    fn subnet_transformation(&self, subnet_id: SubnetId) -> StateResult<Tx> {
        match self.transformed_subnets.get(&subnet_id) {
            Some(tx) => Ok(tx.clone()),
            None => self.parent()?.subnet_transformation(subnet_id),
        }
    }

    fn chains(&self, subnet_id: SubnetId) -> StateResult<Vec<Tx>> {
        let mut chains = self.parent()?.chains(subnet_id)?;
        if let Some(added) = self.added_chains.get(&subnet_id) {
            chains.extend(added.iter().cloned());
        }
        Ok(chains)
    }

    fn reward_utxos(&self, tx_id: TxId) -> StateResult<Vec<Utxo>> {
        let mut utxos = self.parent()?.reward_utxos(tx_id)?;
        if let Some(added) = self.added_reward_utxos.get(&tx_id) {
            utxos.extend(added.iter().cloned());
        }
        Ok(utxos)
    }
}

impl Chain for Diff {
    fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    fn set_accumulators(&mut self, accumulators: RewardAccumulators) {
        self.accumulators = accumulators;
    }

    fn set_current_supply(&mut self, subnet_id: SubnetId, supply: u64) {
        self.current_supply.insert(subnet_id, supply);
    }

    fn put_current_validator(&mut self, staker: Staker) {
        self.current_stakers.put_validator(staker);
    }

    fn delete_current_validator(&mut self, staker: &Staker) {
        self.current_stakers.delete_validator(staker);
    }

    fn put_current_delegator(&mut self, staker: Staker) {
        self.current_stakers.put_delegator(staker);
    }

    fn delete_current_delegator(&mut self, staker: &Staker) {
        self.current_stakers.delete_delegator(staker);
    }

    fn put_pending_validator(&mut self, staker: Staker) {
        self.pending_stakers.put_validator(staker);
    }

    fn delete_pending_validator(&mut self, staker: &Staker) {
        self.pending_stakers.delete_validator(staker);
    }

    fn put_pending_delegator(&mut self, staker: Staker) {
        self.pending_stakers.put_delegator(staker);
    }

    fn delete_pending_delegator(&mut self, staker: &Staker) {
        self.pending_stakers.delete_delegator(staker);
    }

    fn add_subnet(&mut self, subnet_id: SubnetId, owner: OutputOwners) {
        self.added_subnets.insert(subnet_id, owner);
    }

    fn add_subnet_transformation(&mut self, subnet_id: SubnetId, tx: Tx) {
        self.transformed_subnets.insert(subnet_id, tx);
    }

    fn add_chain(&mut self, subnet_id: SubnetId, tx: Tx) {
        self.added_chains.entry(subnet_id).or_default().push(tx);
    }

    fn add_tx(&mut self, tx: Tx, status: TxStatus) {
        self.added_txs.insert(tx.id(), (tx, status));
    }

    fn add_reward_utxo(&mut self, tx_id: TxId, utxo: Utxo) {
        self.added_reward_utxos.entry(tx_id).or_default().push(utxo);
    }

    fn add_utxo(&mut self, utxo: Utxo) {
        self.modified_utxos.insert(utxo.utxo_id, Some(utxo));
    }

    fn delete_utxo(&mut self, utxo_id: UtxoId) {
        self.modified_utxos.insert(utxo_id, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{TestState, owner, pending_staker, validator_tx};
    use omega_database::prelude::StoreResultExt;
    use omega_platformvm_core::{
        config::params::OMEGA_ASSET_ID,
        ids::PRIMARY_NETWORK_ID,
        utxo::TransferableOutput,
    };
    use parking_lot::RwLock;

    struct MapVersions(RwLock<HashMap<BlockId, Arc<dyn ChainReader>>>);

    impl Versions for MapVersions {
        fn get_state(&self, block_id: BlockId) -> Option<Arc<dyn ChainReader>> {
            self.0.read().get(&block_id).cloned()
        }
    }

    fn utxo(index: u32, amount: u64) -> Utxo {
        Utxo::new(UtxoId::new(TxId::from_u64_word(500), index), &TransferableOutput::new(OMEGA_ASSET_ID, amount, owner()))
    }

    #[test]
    fn test_child_does_not_leak_into_parent() {
        let ts = TestState::new();
        let parent: Arc<dyn ChainReader> = ts.state.clone();
        let genesis_time = parent.timestamp();
        let supply = parent.current_supply(PRIMARY_NETWORK_ID).unwrap();

        let mut diff = Diff::new_on(parent.clone());
        let staker = pending_staker(&validator_tx(9, genesis_time + 10, genesis_time + 100_000, 2000));
        diff.put_pending_validator(staker.clone());
        diff.set_timestamp(genesis_time + 5);
        diff.set_current_supply(PRIMARY_NETWORK_ID, supply + 1);
        diff.add_utxo(utxo(0, 10));

        assert_eq!(diff.pending_validator(PRIMARY_NETWORK_ID, staker.node_id).unwrap(), staker);
        assert!(parent.pending_validator(PRIMARY_NETWORK_ID, staker.node_id).optional().unwrap().is_none());
        assert_eq!(parent.timestamp(), genesis_time);
        assert_eq!(parent.current_supply(PRIMARY_NETWORK_ID).unwrap(), supply);
        assert!(parent.utxo(utxo(0, 10).utxo_id).optional().unwrap().is_none());
        assert_eq!(diff.utxo(utxo(0, 10).utxo_id).unwrap(), utxo(0, 10));
    }

    #[test]
    fn test_chained_diffs_fall_through() {
        let ts = TestState::new();
        let mut first = Diff::new_on(ts.state.clone());
        first.add_utxo(utxo(1, 10));
        first.add_utxo(utxo(2, 20));
        let first: Arc<dyn ChainReader> = Arc::new(first);

        let mut second = Diff::new_on(first.clone());
        second.delete_utxo(utxo(1, 10).utxo_id);

        assert!(second.utxo(utxo(1, 10).utxo_id).optional().unwrap().is_none());
        assert_eq!(second.utxo(utxo(2, 20).utxo_id).unwrap(), utxo(2, 20));
        assert_eq!(first.utxo(utxo(1, 10).utxo_id).unwrap(), utxo(1, 10));
    }

    #[test]
    fn test_missing_parent_state() {
        let ts = TestState::new();
        let parent_id = BlockId::from_u64_word(3);
        let versions = Arc::new(MapVersions(RwLock::new(HashMap::new())));
        versions.0.write().insert(parent_id, ts.state.clone());
        let weak: Weak<dyn Versions> = Arc::downgrade(&versions) as Weak<dyn Versions>;

        let diff = Diff::new(parent_id, weak.clone()).unwrap();
        assert!(Diff::new(BlockId::from_u64_word(4), weak).is_err());

        // Evicting the parent makes the diff unusable for reads which need it
        versions.0.write().remove(&parent_id);
        assert!(matches!(diff.current_supply(PRIMARY_NETWORK_ID), Err(StateError::MissingParentState(id)) if id == parent_id));
        // Values copied at creation remain readable
        assert_eq!(diff.timestamp(), ts.genesis_timestamp());
    }

    #[test]
    fn test_apply_pushes_exactly_the_recorded_changes() {
        let ts = TestState::new();
        let parent: Arc<dyn ChainReader> = ts.state.clone();
        let genesis_time = parent.timestamp();
        let before_current: Vec<Staker> = parent.current_stakers().unwrap().collect();

        let mut diff = Diff::new_on(parent.clone());
        let staker = pending_staker(&validator_tx(9, genesis_time + 10, genesis_time + 100_000, 2000));
        diff.put_pending_validator(staker.clone());
        diff.add_utxo(utxo(3, 30));
        diff.set_timestamp(genesis_time + 1);

        diff.apply(&mut *ts.state.write());

        assert_eq!(parent.timestamp(), genesis_time + 1);
        assert_eq!(parent.pending_validator(PRIMARY_NETWORK_ID, staker.node_id).unwrap(), staker);
        assert_eq!(parent.utxo(utxo(3, 30).utxo_id).unwrap(), utxo(3, 30));
        assert_eq!(parent.current_stakers().unwrap().collect::<Vec<_>>(), before_current);
    }
}
