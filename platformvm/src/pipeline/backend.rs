use super::block_state::BlockState;
use crate::{
    atomic::SharedMemory,
    counters::ProcessingCounters,
    errors::{BlockError, BlockProcessResult},
    mempool::Mempool,
    processes::{tx_executor::TxExecutor, validators::ValidatorsManager},
    state::{ChainReader, Versions, base::State},
};
use omega_database::prelude::StoreResultExt;
use omega_platformvm_core::{
    block::{Block, BlockKind},
    config::Config,
    ids::BlockId,
    status::BlockStatus,
    utxo::UtxoId,
};
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};

/// What a child block needs to know about its parent
#[derive(Clone, Copy, Debug)]
pub struct ParentInfo {
    pub height: u64,
    /// Chain time resulting from the parent
    pub timestamp: u64,
    pub kind: BlockKind,
}

/// Shared by the block processors: the persisted state, the processing blocks and the
/// services blocks act upon
pub struct Backend {
    pub config: Arc<Config>,
    pub state: Arc<RwLock<State>>,
    pub executor: TxExecutor,
    pub mempool: Arc<RwLock<Mempool>>,
    pub validators: Arc<ValidatorsManager>,
    pub shared_memory: Arc<dyn SharedMemory>,
    pub counters: Arc<ProcessingCounters>,
    /// Verified blocks awaiting a decision
    pub(super) blocks: RwLock<HashMap<BlockId, BlockState>>,
}

impl Backend {
    pub fn new(
        config: Arc<Config>,
        state: Arc<RwLock<State>>,
        executor: TxExecutor,
        mempool: Arc<RwLock<Mempool>>,
        validators: Arc<ValidatorsManager>,
        shared_memory: Arc<dyn SharedMemory>,
        counters: Arc<ProcessingCounters>,
    ) -> Self {
        Self { config, state, executor, mempool, validators, shared_memory, counters, blocks: Default::default() }
    }

    pub fn is_processing(&self, block_id: BlockId) -> bool {
        self.blocks.read().contains_key(&block_id)
    }

    /// A processing block, or a decided one from the database
    pub fn get_block(&self, block_id: BlockId) -> BlockProcessResult<(Block, BlockStatus)> {
        if let Some(block_state) = self.blocks.read().get(&block_id) {
            let status = if block_state.accepted { BlockStatus::Accepted } else { BlockStatus::Processing };
            return Ok((block_state.block.clone(), status));
        }
        self.state.read().get_block(block_id).optional()?.ok_or(BlockError::BlockNotFound(block_id))
    }

    pub fn parent_info(&self, parent_id: BlockId) -> BlockProcessResult<ParentInfo> {
        if let Some(parent) = self.blocks.read().get(&parent_id) {
            return Ok(ParentInfo { height: parent.block.height(), timestamp: parent.timestamp, kind: parent.block.kind() });
        }
        let state = self.state.read();
        if state.last_accepted() != parent_id {
            return Err(BlockError::MissingParentState(parent_id));
        }
        let (block, _) = state.get_block(parent_id)?;
        Ok(ParentInfo { height: state.height(), timestamp: state.timestamp(), kind: block.kind() })
    }

    /// The first processing ancestor of `block_id` (itself included) which imported `utxo_id`
    pub fn imported_by_ancestor(&self, block_id: BlockId, utxo_id: &UtxoId) -> Option<BlockId> {
        let blocks = self.blocks.read();
        let mut current = block_id;
        while let Some(block_state) = blocks.get(&current) {
            if block_state.imported.contains(utxo_id) {
                return Some(current);
            }
            current = block_state.block.parent_id();
        }
        None
    }
}

impl Versions for Backend {
    fn get_state(&self, block_id: BlockId) -> Option<Arc<dyn ChainReader>> {
        if let Some(block_state) = self.blocks.read().get(&block_id) {
            return block_state.on_accept_state();
        }
        if self.state.read().last_accepted() == block_id {
            return Some(self.state.clone());
        }
        None
    }
}
