use omega_database::{
    prelude::{BatchDbWriter, CachePolicy, CachedDbAccess, DB, StoreResult},
    registry::DatabaseStorePrefixes,
};
use omega_platformvm_core::{ids::TxId, status::TxStatus};
use rocksdb::WriteBatch;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An accepted tx in its wire encoding, along with its final status
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub bytes: Vec<u8>,
    pub status: TxStatus,
}

/// Reader API for `TxsStore`.
pub trait TxsStoreReader {
    fn get(&self, tx_id: TxId) -> StoreResult<TxRecord>;
    fn has(&self, tx_id: TxId) -> StoreResult<bool>;
}

pub trait TxsStore: TxsStoreReader {
    fn insert_batch(&self, batch: &mut WriteBatch, tx_id: TxId, record: TxRecord) -> StoreResult<()>;
}

/// A DB + cache implementation of `TxsStore` trait, with concurrent readers support.
#[derive(Clone)]
pub struct DbTxsStore {
    access: CachedDbAccess<TxId, TxRecord>,
}

impl DbTxsStore {
    pub fn new(db: Arc<DB>, cache_size: usize) -> Self {
        Self { access: CachedDbAccess::new(db, CachePolicy::Count(cache_size), DatabaseStorePrefixes::Txs.into()) }
    }
}

impl TxsStoreReader for DbTxsStore {
    fn get(&self, tx_id: TxId) -> StoreResult<TxRecord> {
        self.access.read(tx_id)
    }

    fn has(&self, tx_id: TxId) -> StoreResult<bool> {
        self.access.has(tx_id)
    }
}

impl TxsStore for DbTxsStore {
    fn insert_batch(&self, batch: &mut WriteBatch, tx_id: TxId, record: TxRecord) -> StoreResult<()> {
        self.access.write(BatchDbWriter::new(batch), tx_id, record)
    }
}
