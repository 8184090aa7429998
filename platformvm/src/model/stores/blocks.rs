use omega_database::{
    prelude::{BatchDbWriter, CachePolicy, CachedDbAccess, DB, DirectDbWriter, StoreError, StoreResult},
    registry::DatabaseStorePrefixes,
};
use omega_platformvm_core::{ids::BlockId, status::BlockStatus};
use rocksdb::WriteBatch;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A decided block in its wire encoding
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub bytes: Vec<u8>,
    pub status: BlockStatus,
}

/// Reader API for `BlocksStore`.
pub trait BlocksStoreReader {
    fn get(&self, block_id: BlockId) -> StoreResult<BlockRecord>;
    fn has(&self, block_id: BlockId) -> StoreResult<bool>;
}

pub trait BlocksStore: BlocksStoreReader {
    fn insert_batch(&self, batch: &mut WriteBatch, block_id: BlockId, record: BlockRecord) -> StoreResult<()>;
    fn delete_batch(&self, batch: &mut WriteBatch, block_id: BlockId) -> StoreResult<()>;
    /// Writes the record right away. Used for rejected blocks which are not part of any state batch.
    fn insert(&self, block_id: BlockId, record: BlockRecord) -> StoreResult<()>;
}

/// A DB + cache implementation of `BlocksStore` trait, with concurrent readers support.
#[derive(Clone)]
pub struct DbBlocksStore {
    db: Arc<DB>,
    access: CachedDbAccess<BlockId, BlockRecord>,
}

impl DbBlocksStore {
    pub fn new(db: Arc<DB>, cache_size: usize) -> Self {
        Self { db: Arc::clone(&db), access: CachedDbAccess::new(db, CachePolicy::Count(cache_size), DatabaseStorePrefixes::Blocks.into()) }
    }

    /// Reads up to `limit` records in key order, resuming right after `from` when given.
    /// `from` itself may have been deleted meanwhile.
    pub fn seek(&self, from: Option<BlockId>, limit: usize) -> StoreResult<Vec<(BlockId, BlockRecord)>> {
        self.access
            .seek_iterator(None, from, limit + 1, false)
            .map(|res| {
                let (key, record) = res?;
                let block_id = BlockId::try_from_slice(&key).map_err(|_| StoreError::DataInconsistency(format!("bad block key {key:?}")))?;
                Ok((block_id, record))
            })
            .filter(|res| !matches!(res, Ok((block_id, _)) if Some(*block_id) == from))
            .take(limit)
            .collect()
    }
}

impl BlocksStoreReader for DbBlocksStore {
    fn get(&self, block_id: BlockId) -> StoreResult<BlockRecord> {
        self.access.read(block_id)
    }

    fn has(&self, block_id: BlockId) -> StoreResult<bool> {
        self.access.has(block_id)
    }
}

impl BlocksStore for DbBlocksStore {
    fn insert_batch(&self, batch: &mut WriteBatch, block_id: BlockId, record: BlockRecord) -> StoreResult<()> {
        self.access.write(BatchDbWriter::new(batch), block_id, record)
    }

    fn delete_batch(&self, batch: &mut WriteBatch, block_id: BlockId) -> StoreResult<()> {
        self.access.delete(BatchDbWriter::new(batch), block_id)
    }

    fn insert(&self, block_id: BlockId, record: BlockRecord) -> StoreResult<()> {
        self.access.write(DirectDbWriter::new(&self.db), block_id, record)
    }
}
