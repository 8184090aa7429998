use omega_database::{
    prelude::{BatchDbWriter, CachePolicy, CachedDbAccess, DB, StoreResult},
    registry::DatabaseStorePrefixes,
};
use omega_platformvm_core::ids::{SubnetId, TxId};
use rocksdb::WriteBatch;
use std::sync::Arc;

/// Reader API for `ChainsStore`.
pub trait ChainsStoreReader {
    /// Ids of the `CreateChainTx`s of the subnet, in key order
    fn get(&self, subnet_id: SubnetId) -> StoreResult<Vec<TxId>>;
}

pub trait ChainsStore: ChainsStoreReader {
    fn insert_batch(&self, batch: &mut WriteBatch, subnet_id: SubnetId, chain_tx_id: TxId) -> StoreResult<()>;
}

/// Chains bucketed by subnet: `[Chains, subnet id, chain tx id]`
#[derive(Clone)]
pub struct DbChainsStore {
    access: CachedDbAccess<Vec<u8>, TxId>,
}

impl DbChainsStore {
    pub fn new(db: Arc<DB>) -> Self {
        Self { access: CachedDbAccess::new(db, CachePolicy::Empty, DatabaseStorePrefixes::Chains.into()) }
    }
}

impl ChainsStoreReader for DbChainsStore {
    fn get(&self, subnet_id: SubnetId) -> StoreResult<Vec<TxId>> {
        self.access.bucket_iterator(subnet_id).map(|res| res.map(|(_, tx_id)| tx_id)).collect()
    }
}

impl ChainsStore for DbChainsStore {
    fn insert_batch(&self, batch: &mut WriteBatch, subnet_id: SubnetId, chain_tx_id: TxId) -> StoreResult<()> {
        let key = subnet_id.as_bytes().into_iter().chain(chain_tx_id.as_bytes()).collect();
        self.access.write(BatchDbWriter::new(batch), key, chain_tx_id)
    }
}
