use crate::{
    errors::StateResult,
    model::stores::{block_heights::BlockHeightsStore, blocks::BlocksStore, singletons::PruneCheckpoint},
    state::base::State,
};
use omega_core::{debug, info, time::Stopwatch};
use omega_database::prelude::StoreError;
use omega_platformvm_core::{block::Block, config::Config, status::BlockStatus};
use parking_lot::RwLock;
use rocksdb::WriteBatch;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PruneStats {
    pub deleted: u64,
    pub indexed: u64,
}

/// Walks every stored block once, deleting rejected blocks and rebuilding the height index of
/// accepted ones. Progress is checkpointed with each batch so an interrupted run resumes where
/// it stopped.
pub struct Pruner {
    state: Arc<RwLock<State>>,
    batch_size: usize,
    prune_rejected: bool,
}

impl Pruner {
    pub fn new(config: &Config, state: Arc<RwLock<State>>) -> Self {
        Self { state, batch_size: config.perf.pruner_batch_size.max(1), prune_rejected: config.prune_rejected_blocks }
    }

    pub fn run(&self) -> StateResult<PruneStats> {
        let mut stats = PruneStats::default();
        if self.state.read().prune_checkpoint()?.completed {
            debug!("Block pruning already completed");
            return Ok(stats);
        }
        info!("Pruning blocks in batches of {}", self.batch_size);
        while !self.run_batch(&mut stats)? {}
        info!("Block pruning completed: {} rejected blocks deleted, {} heights indexed", stats.deleted, stats.indexed);
        Ok(stats)
    }

    /// Handles one batch under the state write lock. Returns whether the walk is complete.
    fn run_batch(&self, stats: &mut PruneStats) -> StateResult<bool> {
        let _sw = Stopwatch::<1000>::with_threshold("prune batch");
        let mut state = self.state.write();
        let checkpoint = state.prune_checkpoint()?;
        let records = state.storage().blocks.seek(checkpoint.last_processed, self.batch_size)?;

        let mut batch = WriteBatch::default();
        for (block_id, record) in records.iter() {
            match record.status {
                BlockStatus::Rejected if self.prune_rejected => {
                    state.storage().blocks.delete_batch(&mut batch, *block_id)?;
                    stats.deleted += 1;
                }
                BlockStatus::Accepted => {
                    let block = Block::parse(&record.bytes)?;
                    state.storage().block_heights.insert_batch(&mut batch, block.height(), *block_id)?;
                    stats.indexed += 1;
                }
                _ => {}
            }
        }

        let completed = records.len() < self.batch_size;
        let last_processed = records.last().map(|(block_id, _)| *block_id).or(checkpoint.last_processed);
        state.set_prune_checkpoint_batch(&mut batch, PruneCheckpoint { last_processed, completed })?;
        state.storage().db.write(batch).map_err(StoreError::from)?;
        debug!("Pruned a batch of {} blocks, resuming after {:?}", records.len(), last_processed);
        Ok(completed)
    }
}
