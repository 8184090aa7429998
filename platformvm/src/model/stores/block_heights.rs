use omega_database::{
    prelude::{BatchDbWriter, CachePolicy, CachedDbAccess, DB, StoreResult},
    registry::DatabaseStorePrefixes,
};
use omega_platformvm_core::ids::BlockId;
use rocksdb::WriteBatch;
use std::sync::Arc;

type HeightKey = [u8; 8];

/// Reader API for `BlockHeightsStore`.
pub trait BlockHeightsStoreReader {
    fn get(&self, height: u64) -> StoreResult<BlockId>;
    fn has(&self, height: u64) -> StoreResult<bool>;
}

pub trait BlockHeightsStore: BlockHeightsStoreReader {
    fn insert_batch(&self, batch: &mut WriteBatch, height: u64, block_id: BlockId) -> StoreResult<()>;
}

/// Index of accepted blocks by height. Keys are big endian so that iteration follows height order.
#[derive(Clone)]
pub struct DbBlockHeightsStore {
    access: CachedDbAccess<HeightKey, BlockId>,
}

impl DbBlockHeightsStore {
    pub fn new(db: Arc<DB>, cache_size: usize) -> Self {
        Self { access: CachedDbAccess::new(db, CachePolicy::Count(cache_size), DatabaseStorePrefixes::BlockIdByHeight.into()) }
    }
}

impl BlockHeightsStoreReader for DbBlockHeightsStore {
    fn get(&self, height: u64) -> StoreResult<BlockId> {
        self.access.read(height.to_be_bytes())
    }

    fn has(&self, height: u64) -> StoreResult<bool> {
        self.access.has(height.to_be_bytes())
    }
}

impl BlockHeightsStore for DbBlockHeightsStore {
    fn insert_batch(&self, batch: &mut WriteBatch, height: u64, block_id: BlockId) -> StoreResult<()> {
        self.access.write(BatchDbWriter::new(batch), height.to_be_bytes(), block_id)
    }
}
