use omega_database::{
    prelude::{BatchDbWriter, CachePolicy, CachedDbAccess, DB, StoreResult},
    registry::DatabaseStorePrefixes,
};
use omega_platformvm_core::ids::{NodeId, SubnetId, TxId, node_subnet_key};
use rocksdb::WriteBatch;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

type NodeSubnetKey = [u8; 52];

/// Measured uptime of a current validator. Durations and times are in seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UptimeRecord {
    pub node_id: NodeId,
    pub subnet_id: SubnetId,
    /// Tx which created the validator
    pub tx_id: TxId,
    pub start_time: u64,
    pub up_duration: u64,
    pub last_updated: u64,
}

impl UptimeRecord {
    pub fn new(node_id: NodeId, subnet_id: SubnetId, tx_id: TxId, start_time: u64) -> Self {
        Self { node_id, subnet_id, tx_id, start_time, up_duration: 0, last_updated: start_time }
    }
}

/// Reader API for `UptimesStore`.
pub trait UptimesStoreReader {
    fn get_all(&self) -> StoreResult<Vec<UptimeRecord>>;
}

pub trait UptimesStore: UptimesStoreReader {
    fn insert_batch(&self, batch: &mut WriteBatch, record: &UptimeRecord) -> StoreResult<()>;
    fn delete_batch(&self, batch: &mut WriteBatch, node_id: NodeId, subnet_id: SubnetId) -> StoreResult<()>;
}

/// Uptime records keyed by `node id || subnet id`
#[derive(Clone)]
pub struct DbUptimesStore {
    access: CachedDbAccess<NodeSubnetKey, UptimeRecord>,
}

impl DbUptimesStore {
    pub fn new(db: Arc<DB>) -> Self {
        Self { access: CachedDbAccess::new(db, CachePolicy::Empty, DatabaseStorePrefixes::Uptimes.into()) }
    }
}

impl UptimesStoreReader for DbUptimesStore {
    fn get_all(&self) -> StoreResult<Vec<UptimeRecord>> {
        self.access.iterator().map(|res| res.map(|(_, record)| record)).collect()
    }
}

impl UptimesStore for DbUptimesStore {
    fn insert_batch(&self, batch: &mut WriteBatch, record: &UptimeRecord) -> StoreResult<()> {
        self.access.write(BatchDbWriter::new(batch), node_subnet_key(&record.node_id, &record.subnet_id), record.clone())
    }

    fn delete_batch(&self, batch: &mut WriteBatch, node_id: NodeId, subnet_id: SubnetId) -> StoreResult<()> {
        self.access.delete(BatchDbWriter::new(batch), node_subnet_key(&node_id, &subnet_id))
    }
}
