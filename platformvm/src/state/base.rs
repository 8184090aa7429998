use super::{
    Chain, ChainReader, StakerIter,
    stakers::{BaseStakers, StakerWrite},
    storage::StateStorage,
};
use crate::{
    errors::{StateError, StateResult},
    model::{
        accumulators::RewardAccumulators,
        stores::{
            block_heights::{BlockHeightsStore, BlockHeightsStoreReader},
            blocks::{BlockRecord, BlocksStore, BlocksStoreReader},
            chains::{ChainsStore, ChainsStoreReader},
            reward_utxos::{RewardUtxosStore, RewardUtxosStoreReader},
            singletons::{DbSingletonsStore, PruneCheckpoint, SingletonsStore, SingletonsStoreReader},
            stakers::StakersStore,
            subnets::{SubnetsStore, SubnetsStoreReader},
            txs::{TxRecord, TxsStore, TxsStoreReader},
            uptimes::{UptimeRecord, UptimesStore, UptimesStoreReader},
            utxos::{UtxosStore, UtxosStoreReader},
        },
    },
};
use indexmap::IndexMap;
use omega_core::{debug, info};
use omega_database::prelude::{DB, StoreError, StoreResultExt};
use omega_platformvm_core::{
    block::Block,
    config::{Config, genesis::Genesis},
    ids::{BlockId, NodeId, PRIMARY_NETWORK_ID, SubnetId, TxId},
    staker::Staker,
    status::{BlockStatus, TxStatus},
    tx::{Tx, staking::PublicKey},
    utxo::{OutputOwners, Utxo, UtxoId},
};
use parking_lot::RwLock;
use rocksdb::WriteBatch;
use std::{
    collections::{HashMap, HashSet, hash_map::Entry},
    sync::Arc,
};

/// Net change of a validator's weight produced by one commit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorWeightChange {
    pub subnet_id: SubnetId,
    pub node_id: NodeId,
    pub public_key: Option<PublicKey>,
    pub increase: u64,
    pub decrease: u64,
}

#[derive(Default)]
struct WeightDiff {
    increase: u64,
    decrease: u64,
    public_key: Option<PublicKey>,
}

type NodeSubnet = (NodeId, SubnetId);

/// The persisted chain state. Every mutation is buffered in memory and reaches the database
/// in a single batch on [`State::commit`].
pub struct State {
    storage: StateStorage,
    singletons: DbSingletonsStore,

    timestamp: u64,
    accumulators: RewardAccumulators,
    last_accepted: BlockId,
    height: u64,

    current_stakers: BaseStakers,
    pending_stakers: BaseStakers,
    uptimes: HashMap<NodeSubnet, UptimeRecord>,

    // Buffered writes
    modified_supplies: HashMap<SubnetId, u64>,
    added_subnets: IndexMap<SubnetId, OutputOwners>,
    added_transformations: HashMap<SubnetId, Tx>,
    added_chains: HashMap<SubnetId, Vec<Tx>>,
    added_txs: IndexMap<TxId, (Tx, TxStatus)>,
    added_reward_utxos: HashMap<TxId, Vec<Utxo>>,
    modified_utxos: HashMap<UtxoId, Option<Utxo>>,
    added_blocks: IndexMap<BlockId, Block>,
    dirty_uptimes: HashSet<NodeSubnet>,
    /// Records of validators deleted since the last commit, restored if the validator is put back
    removed_uptimes: HashMap<NodeSubnet, UptimeRecord>,
    weight_diffs: HashMap<(SubnetId, NodeId), WeightDiff>,
}

impl State {
    /// Opens the state stored in `db`, writing `genesis` first if the database is empty
    pub fn new(db: Arc<DB>, config: &Config, genesis: &Genesis) -> StateResult<Self> {
        let storage = StateStorage::new(db.clone(), &config.perf);
        let singletons = DbSingletonsStore::new(db);
        let mut state = Self {
            storage,
            singletons,
            timestamp: 0,
            accumulators: Default::default(),
            last_accepted: Default::default(),
            height: 0,
            current_stakers: Default::default(),
            pending_stakers: Default::default(),
            uptimes: Default::default(),
            modified_supplies: Default::default(),
            added_subnets: Default::default(),
            added_transformations: Default::default(),
            added_chains: Default::default(),
            added_txs: Default::default(),
            added_reward_utxos: Default::default(),
            modified_utxos: Default::default(),
            added_blocks: Default::default(),
            dirty_uptimes: Default::default(),
            removed_uptimes: Default::default(),
            weight_diffs: Default::default(),
        };

        if state.singletons.is_initialized()? {
            state.load()?;
        } else {
            state.init_genesis(config, genesis)?;
        }
        Ok(state)
    }

    fn init_genesis(&mut self, config: &Config, genesis: &Genesis) -> StateResult<()> {
        let genesis = genesis.build(&config.params)?;
        info!("Initializing the platform chain state from genesis {}", genesis.genesis_id);

        self.timestamp = genesis.timestamp;
        self.accumulators = RewardAccumulators::new(genesis.timestamp);
        for utxo in genesis.utxos {
            self.add_utxo(utxo);
        }
        for tx in genesis.validators {
            let scheduled = tx
                .unsigned()
                .scheduled_staker()
                .ok_or_else(|| StateError::DataInconsistency(format!("genesis tx {} is not a staker tx", tx.id())))?;
            let staker = Staker::new_current(tx.id(), scheduled, 0)?;
            self.put_current_validator(staker);
            self.add_tx(tx, TxStatus::Committed);
        }
        for tx in genesis.chains {
            self.add_chain(PRIMARY_NETWORK_ID, tx.clone());
            self.add_tx(tx, TxStatus::Committed);
        }
        self.set_current_supply(PRIMARY_NETWORK_ID, genesis.initial_supply);

        let block = Block::new_apricot_commit(genesis.genesis_id, 0)?;
        self.last_accepted = block.id();
        self.height = 0;
        self.add_block(block);

        let mut batch = WriteBatch::default();
        self.singletons.set_initialized_batch(&mut batch)?;
        self.write(&mut batch)?;
        self.storage.db.write(batch).map_err(StoreError::from)?;
        Ok(())
    }

    fn load(&mut self) -> StateResult<()> {
        self.timestamp = self.singletons.timestamp()?;
        self.accumulators = self.singletons.accumulators()?;
        self.last_accepted = self.singletons.last_accepted()?;
        self.height = self.singletons.height()?;
        self.current_stakers = BaseStakers::from_stakers(self.storage.stakers.all_current()?);
        self.pending_stakers = BaseStakers::from_stakers(self.storage.stakers.all_pending()?);
        self.uptimes = self.storage.uptimes.get_all()?.into_iter().map(|record| ((record.node_id, record.subnet_id), record)).collect();
        debug!(
            "Loaded the platform chain state at height {} with {} current and {} pending stakers",
            self.height,
            self.current_stakers.len(),
            self.pending_stakers.len()
        );
        Ok(())
    }

    pub fn storage(&self) -> &StateStorage {
        &self.storage
    }

    pub fn last_accepted(&self) -> BlockId {
        self.last_accepted
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn set_last_accepted(&mut self, block_id: BlockId) {
        self.last_accepted = block_id;
    }

    pub fn set_height(&mut self, height: u64) {
        self.height = height;
    }

    /// Buffers an accepted block along with its height index entry
    pub fn add_block(&mut self, block: Block) {
        self.added_blocks.insert(block.id(), block);
    }

    pub fn get_block(&self, block_id: BlockId) -> StateResult<(Block, BlockStatus)> {
        if let Some(block) = self.added_blocks.get(&block_id) {
            return Ok((block.clone(), BlockStatus::Accepted));
        }
        let record = self.storage.blocks.get(block_id)?;
        Ok((Block::parse(&record.bytes)?, record.status))
    }

    pub fn block_id_at_height(&self, height: u64) -> StateResult<BlockId> {
        Ok(self.storage.block_heights.get(height)?)
    }

    /// Keeps a rejected block on disk. Written right away since it is not part of any state batch.
    pub fn persist_rejected_block(&self, block: &Block) -> StateResult<()> {
        Ok(self.storage.blocks.insert(block.id(), BlockRecord { bytes: block.bytes().to_vec(), status: BlockStatus::Rejected })?)
    }

    pub fn prune_checkpoint(&self) -> StateResult<PruneCheckpoint> {
        Ok(self.singletons.prune_checkpoint().optional()?.unwrap_or_default())
    }

    pub fn set_prune_checkpoint_batch(&mut self, batch: &mut WriteBatch, checkpoint: PruneCheckpoint) -> StateResult<()> {
        Ok(self.singletons.set_prune_checkpoint_batch(batch, checkpoint)?)
    }

    /// Returns `(up_duration, last_updated)` of a current validator
    pub fn uptime(&self, node_id: NodeId, subnet_id: SubnetId) -> StateResult<(u64, u64)> {
        self.uptimes
            .get(&(node_id, subnet_id))
            .map(|record| (record.up_duration, record.last_updated))
            .ok_or_else(|| StateError::NotFound(format!("uptime of {node_id} on subnet {subnet_id}")))
    }

    pub fn set_uptime(&mut self, node_id: NodeId, subnet_id: SubnetId, up_duration: u64, last_updated: u64) -> StateResult<()> {
        let record = self
            .uptimes
            .get_mut(&(node_id, subnet_id))
            .ok_or_else(|| StateError::NotFound(format!("uptime of {node_id} on subnet {subnet_id}")))?;
        record.up_duration = up_duration;
        record.last_updated = last_updated;
        self.dirty_uptimes.insert((node_id, subnet_id));
        Ok(())
    }

    pub fn uptime_start_time(&self, node_id: NodeId, subnet_id: SubnetId) -> StateResult<u64> {
        self.uptimes
            .get(&(node_id, subnet_id))
            .map(|record| record.start_time)
            .ok_or_else(|| StateError::NotFound(format!("uptime of {node_id} on subnet {subnet_id}")))
    }

    /// Total weight of every current validator, delegations included, as a list of increases
    pub fn current_validator_weights(&self) -> Vec<ValidatorWeightChange> {
        let mut weights: IndexMap<(SubnetId, NodeId), ValidatorWeightChange> = IndexMap::new();
        for staker in self.current_stakers.iter() {
            let entry = weights.entry((staker.subnet_id, staker.node_id)).or_insert_with(|| ValidatorWeightChange {
                subnet_id: staker.subnet_id,
                node_id: staker.node_id,
                public_key: None,
                increase: 0,
                decrease: 0,
            });
            entry.increase += staker.weight;
            if staker.is_validator() {
                entry.public_key = staker.public_key.clone();
            }
        }
        weights.into_values().collect()
    }

    fn track_weight(&mut self, staker: &Staker, increase: bool) {
        let diff = self.weight_diffs.entry((staker.subnet_id, staker.node_id)).or_default();
        if increase {
            diff.increase += staker.weight;
        } else {
            diff.decrease += staker.weight;
        }
        if staker.is_validator() && staker.public_key.is_some() {
            diff.public_key = staker.public_key.clone();
        }
    }

    /// Writes every buffered change into `batch` and returns the net validator weight changes
    pub fn write(&mut self, batch: &mut WriteBatch) -> StateResult<Vec<ValidatorWeightChange>> {
        for (block_id, block) in self.added_blocks.drain(..) {
            self.storage.blocks.insert_batch(batch, block_id, BlockRecord { bytes: block.bytes().to_vec(), status: BlockStatus::Accepted })?;
            self.storage.block_heights.insert_batch(batch, block.height(), block_id)?;
        }

        for write in self.current_stakers.take_writes().into_iter().chain(self.pending_stakers.take_writes()) {
            match write {
                StakerWrite::Put(staker) => self.storage.stakers.store_of(&staker).insert_batch(batch, &staker)?,
                StakerWrite::Delete(staker) => self.storage.stakers.store_of(&staker).delete_batch(batch, staker.tx_id)?,
            }
        }

        for (subnet_id, supply) in self.modified_supplies.drain() {
            self.storage.subnets.set_supply_batch(batch, subnet_id, supply)?;
        }
        for (subnet_id, owner) in self.added_subnets.drain(..) {
            self.storage.subnets.insert_subnet_batch(batch, subnet_id)?;
            self.storage.subnets.set_owner_batch(batch, subnet_id, owner)?;
        }
        for (subnet_id, tx) in self.added_transformations.drain() {
            self.storage.subnets.insert_transformation_batch(batch, subnet_id, tx.id())?;
        }
        for (subnet_id, txs) in self.added_chains.drain() {
            for tx in txs {
                self.storage.chains.insert_batch(batch, subnet_id, tx.id())?;
            }
        }
        for (tx_id, (tx, status)) in self.added_txs.drain(..) {
            self.storage.txs.insert_batch(batch, tx_id, TxRecord { bytes: tx.to_bytes()?, status })?;
        }
        for (tx_id, utxos) in self.added_reward_utxos.drain() {
            for utxo in utxos {
                self.storage.reward_utxos.insert_batch(batch, tx_id, &utxo)?;
            }
        }
        for (utxo_id, utxo) in self.modified_utxos.drain() {
            match utxo {
                Some(utxo) => self.storage.utxos.insert_batch(batch, &utxo)?,
                None => self.storage.utxos.delete_batch(batch, utxo_id)?,
            }
        }
        for (node_id, subnet_id) in self.dirty_uptimes.drain() {
            match self.uptimes.get(&(node_id, subnet_id)) {
                Some(record) => self.storage.uptimes.insert_batch(batch, record)?,
                None => self.storage.uptimes.delete_batch(batch, node_id, subnet_id)?,
            }
        }
        self.removed_uptimes.clear();

        self.singletons.set_timestamp_batch(batch, self.timestamp)?;
        self.singletons.set_accumulators_batch(batch, &self.accumulators)?;
        self.singletons.set_last_accepted_batch(batch, self.last_accepted)?;
        self.singletons.set_height_batch(batch, self.height)?;

        Ok(self
            .weight_diffs
            .drain()
            .filter(|(_, diff)| diff.increase != diff.decrease)
            .map(|((subnet_id, node_id), diff)| ValidatorWeightChange {
                subnet_id,
                node_id,
                public_key: diff.public_key,
                increase: diff.increase.saturating_sub(diff.decrease),
                decrease: diff.decrease.saturating_sub(diff.increase),
            })
            .collect())
    }

    pub fn commit(&mut self) -> StateResult<Vec<ValidatorWeightChange>> {
        self.commit_with(|_| Ok(()))
    }

    /// Commits the buffered changes along with whatever `extra` adds to the same batch
    pub fn commit_with(&mut self, extra: impl FnOnce(&mut WriteBatch) -> StateResult<()>) -> StateResult<Vec<ValidatorWeightChange>> {
        let mut batch = WriteBatch::default();
        let changes = self.write(&mut batch)?;
        extra(&mut batch)?;
        self.storage.db.write(batch).map_err(StoreError::from)?;
        Ok(changes)
    }
}

impl ChainReader for State {
    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn accumulators(&self) -> RewardAccumulators {
        self.accumulators.clone()
    }

    fn current_supply(&self, subnet_id: SubnetId) -> StateResult<u64> {
        match self.modified_supplies.get(&subnet_id) {
            Some(&supply) => Ok(supply),
            None => Ok(self.storage.subnets.supply(subnet_id)?),
        }
    }

    fn current_validator(&self, subnet_id: SubnetId, node_id: NodeId) -> StateResult<Staker> {
        self.current_stakers
            .validator(subnet_id, node_id)
            .cloned()
            .ok_or_else(|| StateError::NotFound(format!("current validator {node_id} of subnet {subnet_id}")))
    }

    fn current_delegators(&self, subnet_id: SubnetId, node_id: NodeId) -> StateResult<Vec<Staker>> {
        Ok(self.current_stakers.delegators(subnet_id, node_id))
    }

    fn current_stakers(&self) -> StateResult<StakerIter> {
        let stakers: Vec<Staker> = self.current_stakers.iter().cloned().collect();
        Ok(Box::new(stakers.into_iter()))
    }

    fn pending_validator(&self, subnet_id: SubnetId, node_id: NodeId) -> StateResult<Staker> {
        self.pending_stakers
            .validator(subnet_id, node_id)
            .cloned()
            .ok_or_else(|| StateError::NotFound(format!("pending validator {node_id} of subnet {subnet_id}")))
    }

    fn pending_delegators(&self, subnet_id: SubnetId, node_id: NodeId) -> StateResult<Vec<Staker>> {
        Ok(self.pending_stakers.delegators(subnet_id, node_id))
    }

    fn pending_stakers(&self) -> StateResult<StakerIter> {
        let stakers: Vec<Staker> = self.pending_stakers.iter().cloned().collect();
        Ok(Box::new(stakers.into_iter()))
    }

    fn utxo(&self, utxo_id: UtxoId) -> StateResult<Utxo> {
        match self.modified_utxos.get(&utxo_id) {
            Some(Some(utxo)) => Ok(utxo.clone()),
            Some(None) => Err(StateError::NotFound(format!("utxo {utxo_id}"))),
            None => Ok(self.storage.utxos.get(utxo_id)?),
        }
    }

    fn tx(&self, tx_id: TxId) -> StateResult<(Tx, TxStatus)> {
        if let Some(entry) = self.added_txs.get(&tx_id) {
            return Ok(entry.clone());
        }
        let record = self.storage.txs.get(tx_id)?;
        Ok((Tx::from_bytes(&record.bytes)?, record.status))
    }

    fn subnet_owner(&self, subnet_id: SubnetId) -> StateResult<OutputOwners> {
        match self.added_subnets.get(&subnet_id) {
            Some(owner) => Ok(owner.clone()),
            None => Ok(self.storage.subnets.owner(subnet_id)?),
        }
    }

    fn subnet_transformation(&self, subnet_id: SubnetId) -> StateResult<Tx> {
        if let Some(tx) = self.added_transformations.get(&subnet_id) {
            return Ok(tx.clone());
        }
        let tx_id = self.storage.subnets.transformation(subnet_id)?;
        Ok(self.tx(tx_id)?.0)
    }

    fn chains(&self, subnet_id: SubnetId) -> StateResult<Vec<Tx>> {
        let mut chains = Vec::new();
        for tx_id in self.storage.chains.get(subnet_id)? {
            chains.push(self.tx(tx_id)?.0);
        }
        if let Some(added) = self.added_chains.get(&subnet_id) {
            chains.extend(added.iter().cloned());
        }
        Ok(chains)
    }

    fn reward_utxos(&self, tx_id: TxId) -> StateResult<Vec<Utxo>> {
        let mut utxos = self.storage.reward_utxos.get(tx_id)?;
        if let Some(added) = self.added_reward_utxos.get(&tx_id) {
            utxos.extend(added.iter().cloned());
        }
        Ok(utxos)
    }
}

impl Chain for State {
    fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    fn set_accumulators(&mut self, accumulators: RewardAccumulators) {
        self.accumulators = accumulators;
    }

    fn set_current_supply(&mut self, subnet_id: SubnetId, supply: u64) {
        self.modified_supplies.insert(subnet_id, supply);
    }

    fn put_current_validator(&mut self, staker: Staker) {
        let key = (staker.node_id, staker.subnet_id);
        let record = match self.removed_uptimes.remove(&key) {
            Some(record) if record.tx_id == staker.tx_id => record,
            _ => UptimeRecord::new(staker.node_id, staker.subnet_id, staker.tx_id, staker.start_time),
        };
        if let Entry::Vacant(entry) = self.uptimes.entry(key) {
            entry.insert(record);
            self.dirty_uptimes.insert(key);
        }
        self.track_weight(&staker, true);
        self.current_stakers.put_validator(staker);
    }

    fn delete_current_validator(&mut self, staker: &Staker) {
        let key = (staker.node_id, staker.subnet_id);
        if let Some(record) = self.uptimes.remove(&key) {
            self.removed_uptimes.insert(key, record);
            self.dirty_uptimes.insert(key);
        }
        self.track_weight(staker, false);
        self.current_stakers.delete_validator(staker);
    }

    fn put_current_delegator(&mut self, staker: Staker) {
        self.track_weight(&staker, true);
        self.current_stakers.put_delegator(staker);
    }

    fn delete_current_delegator(&mut self, staker: &Staker) {
        self.track_weight(staker, false);
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
        self.added_transformations.insert(subnet_id, tx);
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

/// Readers of the shared state go through the read lock
impl ChainReader for RwLock<State> {
    fn timestamp(&self) -> u64 {
        self.read().timestamp()
    }

    fn accumulators(&self) -> RewardAccumulators {
        self.read().accumulators()
    }

    fn current_supply(&self, subnet_id: SubnetId) -> StateResult<u64> {
        self.read().current_supply(subnet_id)
    }

    fn current_validator(&self, subnet_id: SubnetId, node_id: NodeId) -> StateResult<Staker> {
        self.read().current_validator(subnet_id, node_id)
    }

    fn current_delegators(&self, subnet_id: SubnetId, node_id: NodeId) -> StateResult<Vec<Staker>> {
        self.read().current_delegators(subnet_id, node_id)
    }

    fn current_stakers(&self) -> StateResult<StakerIter> {
        self.read().current_stakers()
    }

    fn pending_validator(&self, subnet_id: SubnetId, node_id: NodeId) -> StateResult<Staker> {
        self.read().pending_validator(subnet_id, node_id)
    }

    fn pending_delegators(&self, subnet_id: SubnetId, node_id: NodeId) -> StateResult<Vec<Staker>> {
        self.read().pending_delegators(subnet_id, node_id)
    }

    fn pending_stakers(&self) -> StateResult<StakerIter> {
        self.read().pending_stakers()
    }

    fn utxo(&self, utxo_id: UtxoId) -> StateResult<Utxo> {
        self.read().utxo(utxo_id)
    }

    fn tx(&self, tx_id: TxId) -> StateResult<(Tx, TxStatus)> {
        self.read().tx(tx_id)
    }

    fn subnet_owner(&self, subnet_id: SubnetId) -> StateResult<OutputOwners> {
        self.read().subnet_owner(subnet_id)
    }

    fn subnet_transformation(&self, subnet_id: SubnetId) -> StateResult<Tx> {
        self.read().subnet_transformation(subnet_id)
    }

    fn chains(&self, subnet_id: SubnetId) -> StateResult<Vec<Tx>> {
        self.read().chains(subnet_id)
    }

    fn reward_utxos(&self, tx_id: TxId) -> StateResult<Vec<Utxo>> {
        self.read().reward_utxos(tx_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{TestState, owner, pending_staker, validator_tx};
    use omega_platformvm_core::{config::params::OMEGA_ASSET_ID, utxo::TransferableOutput};

    #[test]
    fn test_genesis_is_written_once() {
        let ts = TestState::new();
        let genesis_time = ts.genesis_timestamp();
        {
            let state = ts.state.read();
            assert_eq!(state.timestamp(), genesis_time);
            assert_eq!(state.height(), 0);
            assert_eq!(state.block_id_at_height(0).unwrap(), state.last_accepted());
            let (block, status) = state.get_block(state.last_accepted()).unwrap();
            assert_eq!(status, BlockStatus::Accepted);
            assert_eq!(block.height(), 0);
            assert_eq!(state.current_stakers().unwrap().count(), 2);
            assert!(state.current_supply(PRIMARY_NETWORK_ID).unwrap() > 0);
            assert_eq!(state.chains(PRIMARY_NETWORK_ID).unwrap().len(), 1);
        }

        let last_accepted = ts.state.read().last_accepted();
        let ts = ts.reopen();
        let state = ts.state.read();
        assert_eq!(state.last_accepted(), last_accepted);
        assert_eq!(state.timestamp(), genesis_time);
        assert_eq!(state.current_stakers().unwrap().count(), 2);
        assert_eq!(state.current_validator_weights().len(), 2);
    }

    #[test]
    fn test_commit_persists_stakers_and_utxos() {
        let ts = TestState::new();
        let genesis_time = ts.genesis_timestamp();
        let staker = pending_staker(&validator_tx(9, genesis_time + 10, genesis_time + 100_000, 2000));
        let utxo = Utxo::new(UtxoId::new(TxId::from_u64_word(77), 0), &TransferableOutput::new(OMEGA_ASSET_ID, 5, owner()));
        {
            let mut state = ts.state.write();
            state.put_pending_validator(staker.clone());
            state.add_utxo(utxo.clone());
            state.set_timestamp(genesis_time + 3);
            let changes = state.commit().unwrap();
            // Pending stakers carry no weight
            assert!(changes.is_empty());
        }

        let ts = ts.reopen();
        let state = ts.state.read();
        assert_eq!(state.pending_validator(PRIMARY_NETWORK_ID, staker.node_id).unwrap(), staker);
        assert_eq!(state.utxo(utxo.utxo_id).unwrap(), utxo);
        assert_eq!(state.timestamp(), genesis_time + 3);
    }

    #[test]
    fn test_weight_changes_are_netted() {
        let ts = TestState::new();
        let mut state = ts.state.write();
        let validator = state.current_stakers().unwrap().next().unwrap();

        // Replacing a staker by an updated version of itself is not a weight change
        state.delete_current_validator(&validator);
        state.put_current_validator(Staker { potential_reward: 10, ..validator.clone() });
        assert!(state.commit().unwrap().is_empty());
        assert!(state.uptime(validator.node_id, validator.subnet_id).is_ok());

        state.delete_current_validator(&Staker { potential_reward: 10, ..validator.clone() });
        let changes = state.commit().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].decrease, validator.weight);
        assert_eq!(changes[0].increase, 0);
        assert!(state.uptime(validator.node_id, validator.subnet_id).is_err());
    }

    #[test]
    fn test_uptime_survives_restart() {
        let ts = TestState::new();
        let validator = ts.state.read().current_stakers().unwrap().next().unwrap();
        {
            let mut state = ts.state.write();
            state.set_uptime(validator.node_id, validator.subnet_id, 42, validator.start_time + 50).unwrap();
            state.commit().unwrap();
        }
        let ts = ts.reopen();
        assert_eq!(ts.state.read().uptime(validator.node_id, validator.subnet_id).unwrap(), (42, validator.start_time + 50));
        assert_eq!(ts.state.read().uptime_start_time(validator.node_id, validator.subnet_id).unwrap(), validator.start_time);
    }

    #[test]
    fn test_rejected_block_is_kept() {
        let ts = TestState::new();
        let state = ts.state.read();
        let block = Block::new_banff_standard(ts.genesis_timestamp() + 1, state.last_accepted(), 1, vec![]).unwrap();
        state.persist_rejected_block(&block).unwrap();
        assert_eq!(state.get_block(block.id()).unwrap().1, BlockStatus::Rejected);
    }
}
