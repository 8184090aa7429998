use omega_database::{
    prelude::{BatchDbWriter, CachePolicy, CachedDbAccess, DB, StoreResult},
    registry::DatabaseStorePrefixes,
};
use omega_platformvm_core::{ids::TxId, utxo::Utxo};
use rocksdb::WriteBatch;
use std::sync::Arc;

/// Reader API for `RewardUtxosStore`.
pub trait RewardUtxosStoreReader {
    /// Reward UTXOs paid when removing the staker created by `tx_id`
    fn get(&self, tx_id: TxId) -> StoreResult<Vec<Utxo>>;
}

pub trait RewardUtxosStore: RewardUtxosStoreReader {
    fn insert_batch(&self, batch: &mut WriteBatch, tx_id: TxId, utxo: &Utxo) -> StoreResult<()>;
}

/// Reward UTXOs bucketed by staker tx: `[RewardUtxos, staker tx id, utxo key]`
#[derive(Clone)]
pub struct DbRewardUtxosStore {
    access: CachedDbAccess<Vec<u8>, Utxo>,
}

impl DbRewardUtxosStore {
    pub fn new(db: Arc<DB>) -> Self {
        Self { access: CachedDbAccess::new(db, CachePolicy::Empty, DatabaseStorePrefixes::RewardUtxos.into()) }
    }
}

impl RewardUtxosStoreReader for DbRewardUtxosStore {
    fn get(&self, tx_id: TxId) -> StoreResult<Vec<Utxo>> {
        self.access.bucket_iterator(tx_id).map(|res| res.map(|(_, utxo)| utxo)).collect()
    }
}

impl RewardUtxosStore for DbRewardUtxosStore {
    fn insert_batch(&self, batch: &mut WriteBatch, tx_id: TxId, utxo: &Utxo) -> StoreResult<()> {
        let key = tx_id.as_bytes().iter().chain(utxo.utxo_id.key().as_ref()).copied().collect();
        self.access.write(BatchDbWriter::new(batch), key, utxo.clone())
    }
}
