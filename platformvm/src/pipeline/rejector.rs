use super::backend::Backend;
use crate::errors::BlockProcessResult;
use omega_core::{debug, warn};
use omega_platformvm_core::block::Block;
use std::sync::{Arc, atomic::Ordering};

pub struct Rejector {
    backend: Arc<Backend>,
}

impl Rejector {
    pub fn new(backend: Arc<Backend>) -> Self {
        Self { backend }
    }

    /// Rejects `block`, giving its txs another chance through the mempool. The block may already
    /// have been evicted by the acceptance of a sibling.
    pub fn reject(&self, block: &Block) -> BlockProcessResult<()> {
        let block_id = block.id();
        self.backend.blocks.write().remove(&block_id);

        let mut readded = 0;
        {
            let mut mempool = self.backend.mempool.write();
            for tx in block.txs().iter().filter(|tx| !tx.unsigned().is_proposal_only()) {
                match mempool.add(tx.clone()) {
                    Ok(()) => readded += 1,
                    Err(err) => debug!("Tx {} of rejected block {} not re-added to the mempool: {}", tx.id(), block_id, err),
                }
            }
        }
        self.backend.state.read().persist_rejected_block(block)?;

        let counters = &self.backend.counters;
        counters.blocks_rejected.fetch_add(1, Ordering::Relaxed);
        counters.txs_rejected.fetch_add(block.txs().len() as u64, Ordering::Relaxed);
        warn!("Rejected {} block {} at height {}, {} txs back in the mempool", block.kind(), block_id, block.height(), readded);
        Ok(())
    }
}
