use crate::model::accumulators::RewardAccumulators;
use omega_database::{
    prelude::{BatchDbWriter, CachedDbItem, DB, StoreResult, StoreResultExt},
    registry::DatabaseStorePrefixes,
};
use omega_platformvm_core::ids::BlockId;
use rocksdb::WriteBatch;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const INITIALIZED_KEY: u8 = 0;
const TIMESTAMP_KEY: u8 = 1;
const LAST_ACCEPTED_KEY: u8 = 2;
const HEIGHT_KEY: u8 = 3;
const ACCUMULATORS_KEY: u8 = 4;
const PRUNE_CHECKPOINT_KEY: u8 = 5;

/// Progress of the block pruner
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneCheckpoint {
    /// Last block key handled, the next run resumes right after it
    pub last_processed: Option<BlockId>,
    pub completed: bool,
}

/// Reader API for `SingletonsStore`.
pub trait SingletonsStoreReader {
    fn is_initialized(&self) -> StoreResult<bool>;
    fn timestamp(&self) -> StoreResult<u64>;
    fn last_accepted(&self) -> StoreResult<BlockId>;
    fn height(&self) -> StoreResult<u64>;
    fn accumulators(&self) -> StoreResult<RewardAccumulators>;
    fn prune_checkpoint(&self) -> StoreResult<PruneCheckpoint>;
}

pub trait SingletonsStore: SingletonsStoreReader {
    fn set_initialized_batch(&mut self, batch: &mut WriteBatch) -> StoreResult<()>;
    fn set_timestamp_batch(&mut self, batch: &mut WriteBatch, timestamp: u64) -> StoreResult<()>;
    fn set_last_accepted_batch(&mut self, batch: &mut WriteBatch, block_id: BlockId) -> StoreResult<()>;
    fn set_height_batch(&mut self, batch: &mut WriteBatch, height: u64) -> StoreResult<()>;
    fn set_accumulators_batch(&mut self, batch: &mut WriteBatch, accumulators: &RewardAccumulators) -> StoreResult<()>;
    fn set_prune_checkpoint_batch(&mut self, batch: &mut WriteBatch, checkpoint: PruneCheckpoint) -> StoreResult<()>;
}

/// Scalar chain values, each under `[Singletons, key]`
#[derive(Clone)]
pub struct DbSingletonsStore {
    initialized: CachedDbItem<bool>,
    timestamp: CachedDbItem<u64>,
    last_accepted: CachedDbItem<BlockId>,
    height: CachedDbItem<u64>,
    accumulators: CachedDbItem<RewardAccumulators>,
    prune_checkpoint: CachedDbItem<PruneCheckpoint>,
}

impl DbSingletonsStore {
    pub fn new(db: Arc<DB>) -> Self {
        let key = |k: u8| vec![DatabaseStorePrefixes::Singletons.into(), k];
        Self {
            initialized: CachedDbItem::new(db.clone(), key(INITIALIZED_KEY)),
            timestamp: CachedDbItem::new(db.clone(), key(TIMESTAMP_KEY)),
            last_accepted: CachedDbItem::new(db.clone(), key(LAST_ACCEPTED_KEY)),
            height: CachedDbItem::new(db.clone(), key(HEIGHT_KEY)),
            accumulators: CachedDbItem::new(db.clone(), key(ACCUMULATORS_KEY)),
            prune_checkpoint: CachedDbItem::new(db, key(PRUNE_CHECKPOINT_KEY)),
        }
    }
}

impl SingletonsStoreReader for DbSingletonsStore {
    fn is_initialized(&self) -> StoreResult<bool> {
        Ok(self.initialized.read().optional()?.unwrap_or(false))
    }

    fn timestamp(&self) -> StoreResult<u64> {
        self.timestamp.read()
    }

    fn last_accepted(&self) -> StoreResult<BlockId> {
        self.last_accepted.read()
    }

    fn height(&self) -> StoreResult<u64> {
        self.height.read()
    }

    fn accumulators(&self) -> StoreResult<RewardAccumulators> {
        self.accumulators.read()
    }

    fn prune_checkpoint(&self) -> StoreResult<PruneCheckpoint> {
        self.prune_checkpoint.read()
    }
}

impl SingletonsStore for DbSingletonsStore {
    fn set_initialized_batch(&mut self, batch: &mut WriteBatch) -> StoreResult<()> {
        self.initialized.write(BatchDbWriter::new(batch), &true)
    }

    fn set_timestamp_batch(&mut self, batch: &mut WriteBatch, timestamp: u64) -> StoreResult<()> {
        self.timestamp.write(BatchDbWriter::new(batch), &timestamp)
    }

    fn set_last_accepted_batch(&mut self, batch: &mut WriteBatch, block_id: BlockId) -> StoreResult<()> {
        self.last_accepted.write(BatchDbWriter::new(batch), &block_id)
    }

    fn set_height_batch(&mut self, batch: &mut WriteBatch, height: u64) -> StoreResult<()> {
        self.height.write(BatchDbWriter::new(batch), &height)
    }

    fn set_accumulators_batch(&mut self, batch: &mut WriteBatch, accumulators: &RewardAccumulators) -> StoreResult<()> {
        self.accumulators.write(BatchDbWriter::new(batch), accumulators)
    }

    fn set_prune_checkpoint_batch(&mut self, batch: &mut WriteBatch, checkpoint: PruneCheckpoint) -> StoreResult<()> {
        self.prune_checkpoint.write(BatchDbWriter::new(batch), &checkpoint)
    }
}
