use super::backend::Backend;
use crate::{
    atomic::AtomicRequests,
    errors::{BlockError, BlockProcessResult},
    mempool::TxRemovalReason,
    state::diff::Diff,
};
use omega_core::{debug, info, time::Stopwatch};
use omega_platformvm_core::{
    block::{Block, BlockKind},
    ids::BlockId,
    tx::Tx,
};
use std::sync::{Arc, atomic::Ordering};

pub struct Acceptor {
    backend: Arc<Backend>,
}

/// A decided branch of the chain, written to the state at once
struct Decision {
    blocks: Vec<Block>,
    on_accept: Arc<Diff>,
    atomic_requests: AtomicRequests,
}

impl Acceptor {
    pub fn new(backend: Arc<Backend>) -> Self {
        Self { backend }
    }

    /// Accepts a verified block. Accepting a proposal block is deferred until one of its options
    /// is accepted, both are then written together.
    pub fn accept(&self, block: &Block) -> BlockProcessResult<()> {
        let block_id = block.id();
        match block.kind() {
            BlockKind::Proposal => {
                let mut blocks = self.backend.blocks.write();
                let block_state = blocks.get_mut(&block_id).ok_or(BlockError::MissingBlockState(block_id))?;
                block_state.accepted = true;
                debug!("Accepted proposal block {} at height {}, awaiting its option", block_id, block.height());
                Ok(())
            }
            BlockKind::Commit | BlockKind::Abort => {
                let decision = self.option_decision(block)?;
                self.commit(decision)
            }
            BlockKind::Standard | BlockKind::Atomic => {
                let decision = {
                    let blocks = self.backend.blocks.read();
                    let block_state = blocks.get(&block_id).ok_or(BlockError::MissingBlockState(block_id))?;
                    let on_accept = block_state.on_accept.clone().ok_or(BlockError::MissingBlockState(block_id))?;
                    Decision { blocks: vec![block.clone()], on_accept, atomic_requests: block_state.atomic_requests.clone() }
                };
                self.commit(decision)
            }
        }
    }

    fn option_decision(&self, block: &Block) -> BlockProcessResult<Decision> {
        let block_id = block.id();
        let parent_id = block.parent_id();
        let blocks = self.backend.blocks.read();
        let option = blocks.get(&block_id).ok_or(BlockError::MissingBlockState(block_id))?;
        let proposal = blocks.get(&parent_id).ok_or(BlockError::MissingBlockState(parent_id))?;
        if !proposal.accepted {
            debug!("Accepting proposal block {} implicitly with its option {}", parent_id, block_id);
        }
        let on_accept = option.on_accept.clone().ok_or(BlockError::MissingBlockState(block_id))?;
        Ok(Decision { blocks: vec![proposal.block.clone(), block.clone()], on_accept, atomic_requests: Default::default() })
    }

    fn commit(&self, decision: Decision) -> BlockProcessResult<()> {
        let (Some(first), Some(last)) = (decision.blocks.first(), decision.blocks.last()) else {
            return Ok(());
        };
        let (last_id, height) = (last.id(), last.height());
        let _sw = Stopwatch::<500>::with_threshold("commit accepted blocks");

        let changes = {
            let mut state = self.backend.state.write();
            if first.parent_id() != state.last_accepted() {
                return Err(BlockError::NotOnLastAccepted(first.id(), state.last_accepted()));
            }
            for block in decision.blocks.iter() {
                state.add_block(block.clone());
            }
            state.set_last_accepted(last_id);
            state.set_height(height);
            decision.on_accept.apply(&mut *state);
            state.commit_with(|batch| self.backend.shared_memory.apply(&decision.atomic_requests, batch))?
        };
        self.backend.validators.apply_changes(&changes)?;
        self.backend.executor.uptimes().track_new_subnets(&changes)?;

        let txs: Vec<Tx> = decision.blocks.iter().flat_map(|block| block.txs().iter().cloned()).collect();
        self.backend.mempool.write().remove(&txs, TxRemovalReason::Accepted);
        for block in decision.blocks.iter() {
            self.evict(block.id());
        }

        let counters = &self.backend.counters;
        counters.blocks_accepted.fetch_add(decision.blocks.len() as u64, Ordering::Relaxed);
        counters.txs_accepted.fetch_add(txs.len() as u64, Ordering::Relaxed);
        info!("Accepted block {} at height {} with {} txs, {} validator weight changes", last_id, height, txs.len(), changes.len());
        Ok(())
    }

    /// Drops the processing state of `block_id` and of its siblings, which can no longer be accepted
    fn evict(&self, block_id: BlockId) {
        let mut blocks = self.backend.blocks.write();
        if let Some(block_state) = blocks.remove(&block_id) {
            let parent_id = block_state.block.parent_id();
            blocks.retain(|_, sibling| sibling.block.parent_id() != parent_id);
        }
    }
}
