use crate::model::stores::{
    block_heights::DbBlockHeightsStore, blocks::DbBlocksStore, chains::DbChainsStore, reward_utxos::DbRewardUtxosStore,
    stakers::DbStakerSets, subnets::DbSubnetsStore, txs::DbTxsStore, uptimes::DbUptimesStore, utxos::DbUtxosStore,
};
use omega_database::prelude::DB;
use omega_platformvm_core::config::constants::perf::PerfParams;
use std::sync::Arc;

/// The persistent stores backing a [`super::base::State`]
#[derive(Clone)]
pub struct StateStorage {
    pub db: Arc<DB>,
    pub stakers: DbStakerSets,
    pub utxos: DbUtxosStore,
    pub txs: DbTxsStore,
    pub blocks: DbBlocksStore,
    pub block_heights: DbBlockHeightsStore,
    pub subnets: DbSubnetsStore,
    pub chains: DbChainsStore,
    pub reward_utxos: DbRewardUtxosStore,
    pub uptimes: DbUptimesStore,
}

impl StateStorage {
    pub fn new(db: Arc<DB>, perf: &PerfParams) -> Self {
        Self {
            stakers: DbStakerSets::new(db.clone()),
            utxos: DbUtxosStore::new(db.clone(), perf.utxo_cache_size),
            txs: DbTxsStore::new(db.clone(), perf.tx_cache_size),
            blocks: DbBlocksStore::new(db.clone(), perf.block_cache_size),
            block_heights: DbBlockHeightsStore::new(db.clone(), perf.block_id_cache_size),
            subnets: DbSubnetsStore::new(db.clone(), perf.block_id_cache_size),
            chains: DbChainsStore::new(db.clone()),
            reward_utxos: DbRewardUtxosStore::new(db.clone()),
            uptimes: DbUptimesStore::new(db.clone()),
            db,
        }
    }
}
