use crate::{
    atomic::AtomicRequests,
    state::{ChainReader, diff::Diff},
};
use omega_platformvm_core::{block::Block, utxo::UtxoId};
use std::{collections::HashSet, sync::Arc};

/// The two outcomes of a verified proposal block
pub struct ProposalState {
    pub on_commit: Arc<Diff>,
    pub on_abort: Arc<Diff>,
    pub prefers_commit: bool,
}

/// Everything learned while verifying a block, kept until the block is decided
pub struct BlockState {
    pub block: Block,
    /// State resulting from accepting the block. Proposal blocks have none, their options do.
    pub on_accept: Option<Arc<Diff>>,
    pub proposal: Option<ProposalState>,
    pub atomic_requests: AtomicRequests,
    /// Shared memory UTXOs consumed by the block
    pub imported: HashSet<UtxoId>,
    pub timestamp: u64,
    /// Set when a proposal block is accepted, its state being written along with its option
    pub accepted: bool,
}

impl BlockState {
    pub fn new(block: Block, timestamp: u64) -> Self {
        Self {
            block,
            on_accept: None,
            proposal: None,
            atomic_requests: Default::default(),
            imported: Default::default(),
            timestamp,
            accepted: false,
        }
    }

    pub fn on_accept_state(&self) -> Option<Arc<dyn ChainReader>> {
        self.on_accept.clone().map(|diff| diff as Arc<dyn ChainReader>)
    }
}
