use super::{acceptor::Acceptor, backend::Backend, builder::Builder, rejector::Rejector, verifier::Verifier};
use crate::{
    errors::{BlockError, BlockProcessResult, MempoolError},
    state::{ChainReader, Versions, diff::Diff},
};
use omega_core::{debug, trace};
use omega_platformvm_core::{
    block::Block,
    ids::BlockId,
    status::BlockStatus,
    tx::{Tx, UnsignedTx},
};
use parking_lot::RwLock;
use std::sync::{Arc, atomic::Ordering};

/// Entry point of the consensus engine into the chain: parses, verifies, decides and builds
/// blocks, and takes txs issued to the chain.
pub struct Manager {
    backend: Arc<Backend>,
    verifier: Verifier,
    acceptor: Acceptor,
    rejector: Rejector,
    builder: Builder,
    preferred: RwLock<BlockId>,
}

impl Manager {
    /// Loads the weights of the current validators into the validators manager, starts measuring
    /// their uptime and prefers the last accepted block
    pub fn new(backend: Arc<Backend>) -> BlockProcessResult<Self> {
        let (last_accepted, weights) = {
            let state = backend.state.read();
            (state.last_accepted(), state.current_validator_weights())
        };
        backend.validators.apply_changes(&weights)?;
        backend.executor.uptimes().track_new_subnets(&weights)?;
        debug!("Block manager starting at block {} with {} validators", last_accepted, weights.len());
        Ok(Self {
            verifier: Verifier::new(backend.clone()),
            acceptor: Acceptor::new(backend.clone()),
            rejector: Rejector::new(backend.clone()),
            builder: Builder::new(backend.clone()),
            preferred: RwLock::new(last_accepted),
            backend,
        })
    }

    /// Stops measuring uptimes and persists the measured durations
    pub fn shutdown(&self) -> BlockProcessResult<()> {
        let weights = self.backend.state.read().current_validator_weights();
        self.backend.executor.uptimes().stop_tracking_all(&weights)?;
        self.backend.state.write().commit()?;
        debug!("Block manager stopped at block {}", self.last_accepted());
        Ok(())
    }

    pub fn backend(&self) -> &Arc<Backend> {
        &self.backend
    }

    pub fn parse_block(&self, bytes: &[u8]) -> BlockProcessResult<Block> {
        Ok(Block::parse(bytes)?)
    }

    pub fn get_block(&self, block_id: BlockId) -> BlockProcessResult<(Block, BlockStatus)> {
        self.backend.get_block(block_id)
    }

    pub fn verify_block(&self, block: &Block) -> BlockProcessResult<()> {
        self.verifier.verify(block)
    }

    pub fn accept_block(&self, block: &Block) -> BlockProcessResult<()> {
        self.acceptor.accept(block)?;
        let mut preferred = self.preferred.write();
        if !self.backend.is_processing(*preferred) {
            *preferred = self.backend.state.read().last_accepted();
        }
        Ok(())
    }

    pub fn reject_block(&self, block: &Block) -> BlockProcessResult<()> {
        self.rejector.reject(block)
    }

    /// Returns whether the preference changed
    pub fn set_preference(&self, block_id: BlockId) -> bool {
        let mut preferred = self.preferred.write();
        if *preferred == block_id {
            return false;
        }
        trace!("Preference moved from {} to {}", *preferred, block_id);
        *preferred = block_id;
        true
    }

    pub fn preferred(&self) -> BlockId {
        *self.preferred.read()
    }

    pub fn last_accepted(&self) -> BlockId {
        self.backend.state.read().last_accepted()
    }

    pub fn get_state(&self, block_id: BlockId) -> Option<Arc<dyn ChainReader>> {
        self.backend.get_state(block_id)
    }

    /// State resulting from the preferred block. A preferred proposal block resolves to the
    /// option it prefers.
    pub fn preferred_state(&self) -> BlockProcessResult<Arc<dyn ChainReader>> {
        let preferred = self.preferred();
        if let Some(state) = self.backend.get_state(preferred) {
            return Ok(state);
        }
        let blocks = self.backend.blocks.read();
        let proposal = blocks.get(&preferred).and_then(|block_state| block_state.proposal.as_ref());
        proposal
            .map(|proposal| if proposal.prefers_commit { proposal.on_commit.clone() } else { proposal.on_abort.clone() })
            .map(|diff| diff as Arc<dyn ChainReader>)
            .ok_or(BlockError::MissingParentState(preferred))
    }

    /// Executes `tx` on top of the preferred state without keeping the outcome
    pub fn verify_tx(&self, tx: &Tx) -> BlockProcessResult<()> {
        let state = self.preferred_state()?;
        let executor = &self.backend.executor;
        let next_time = executor.clock().unix_time().max(state.timestamp());
        let legacy_staker = matches!(tx.unsigned(), UnsignedTx::AddValidator(_) | UnsignedTx::AddSubnetValidator(_) | UnsignedTx::AddDelegator(_));
        if legacy_staker && !self.backend.config.is_banff_active(next_time) {
            let mut on_commit = Diff::new_on(state.clone());
            let mut on_abort = Diff::new_on(state);
            executor.execute_proposal_tx(&mut on_commit, &mut on_abort, tx)?;
        } else {
            executor.execute_standard_tx(&mut Diff::new_on(state), tx)?;
        }
        Ok(())
    }

    /// Verifies `tx` and adds it to the mempool. A tx failing verification is remembered as dropped.
    pub fn issue_tx(&self, tx: Tx) -> BlockProcessResult<()> {
        let tx_id = tx.id();
        if self.backend.mempool.read().has(&tx_id) {
            return Err(MempoolError::Duplicate(tx_id).into());
        }
        if let Err(err) = self.verify_tx(&tx) {
            debug!("Issued tx {} failed verification: {}", tx_id, err);
            self.backend.mempool.write().mark_dropped(tx_id, err.to_string());
            return Err(err);
        }
        self.backend.mempool.write().add(tx)?;
        self.backend.counters.txs_issued.fetch_add(1, Ordering::Relaxed);
        debug!("Tx {} added to the mempool", tx_id);
        Ok(())
    }

    /// Builds a block on top of the preferred block
    pub fn build_block(&self) -> BlockProcessResult<Block> {
        self.builder.build(self.preferred())
    }

    /// The two options of a verified proposal block, the preferred one first
    pub fn build_options(&self, proposal: &Block) -> BlockProcessResult<[Block; 2]> {
        self.builder.build_options(proposal)
    }
}
