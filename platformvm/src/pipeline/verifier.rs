use super::{
    backend::{Backend, ParentInfo},
    block_state::{BlockState, ProposalState},
};
use crate::{
    atomic::merge_requests,
    errors::{BlockError, BlockProcessResult},
    processes::{
        state_changes::{StateChanges, advance_time_to},
        tx_executor::{next_staker_change_time, verify_new_chain_time},
    },
    state::{ChainReader, Versions, diff::Diff},
};
use omega_core::debug;
use omega_database::prelude::StoreResultExt;
use omega_platformvm_core::{
    block::{Block, BlockKind, BlockVisitor},
    errors::tx::TxError,
    tx::{Tx, UnsignedTx},
};
use std::sync::{Arc, Weak, atomic::Ordering};

pub struct Verifier {
    backend: Arc<Backend>,
}

impl Verifier {
    pub fn new(backend: Arc<Backend>) -> Self {
        Self { backend }
    }

    /// Executes `block` on top of the state of its parent and keeps the outcome until the block
    /// is decided. Verifying a processing block again is a no-op.
    pub fn verify(&self, block: &Block) -> BlockProcessResult<()> {
        let block_id = block.id();
        if self.backend.is_processing(block_id) {
            return Ok(());
        }
        if let Some((_, status)) = self.backend.state.read().get_block(block_id).optional()? {
            return Err(BlockError::AlreadyDecided(block_id, status));
        }

        let parent = self.backend.parent_info(block.parent_id())?;
        if block.height() != parent.height + 1 {
            return Err(BlockError::WrongHeight(parent.height + 1, block.height()));
        }
        let expects_proposal_parent = block.kind().is_option();
        if expects_proposal_parent != (parent.kind == BlockKind::Proposal) {
            return Err(BlockError::WrongParentType(block.parent_id(), parent.kind));
        }

        let block_state = block.visit(&mut VerifyVisitor { backend: &self.backend, parent })?;
        debug!(
            "Verified {} block {} at height {} with {} txs, chain time {}",
            block.kind(),
            block_id,
            block.height(),
            block.txs().len(),
            block_state.timestamp
        );
        self.backend.counters.blocks_verified.fetch_add(1, Ordering::Relaxed);
        self.backend.blocks.write().insert(block_id, block_state);
        Ok(())
    }
}

struct VerifyVisitor<'a> {
    backend: &'a Arc<Backend>,
    parent: ParentInfo,
}

impl VerifyVisitor<'_> {
    fn apricot_rules(&self) -> BlockProcessResult<()> {
        if self.backend.config.is_banff_active(self.parent.timestamp) {
            return Err(BlockError::ApricotBlockAfterBanff(self.parent.timestamp));
        }
        Ok(())
    }

    fn banff_rules(&self, timestamp: u64) -> BlockProcessResult<()> {
        if !self.backend.config.is_banff_active(timestamp) {
            return Err(BlockError::BanffBlockBeforeBanff(timestamp));
        }
        Ok(())
    }

    fn child_diff(&self, block: &Block) -> BlockProcessResult<Diff> {
        let versions: Weak<dyn Versions> = Arc::downgrade(self.backend) as Weak<dyn Versions>;
        Ok(Diff::new(block.parent_id(), versions)?)
    }

    /// Moves the chain time of `diff` to the timestamp of a Banff block
    fn advance_to(&self, diff: &Diff, timestamp: u64) -> BlockProcessResult<StateChanges> {
        if timestamp < self.parent.timestamp {
            return Err(BlockError::TimestampEarlierThanParent(timestamp, self.parent.timestamp));
        }
        let now = self.backend.executor.clock().unix_time();
        verify_new_chain_time(timestamp, next_staker_change_time(diff)?, now)?;
        Ok(advance_time_to(self.backend.executor.mint(), diff, timestamp)?)
    }

    fn proposal(&self, block: &Block, tx: &Tx, timestamp: Option<u64>) -> BlockProcessResult<BlockState> {
        let mut on_commit = self.child_diff(block)?;
        let mut on_abort = self.child_diff(block)?;
        if let Some(timestamp) = timestamp {
            let changes = self.advance_to(&on_commit, timestamp)?;
            changes.apply(&mut on_commit);
            changes.apply(&mut on_abort);
        }
        let outcome = self.backend.executor.execute_proposal_tx(&mut on_commit, &mut on_abort, tx)?;

        let mut block_state = BlockState::new(block.clone(), timestamp.unwrap_or(self.parent.timestamp));
        block_state.proposal =
            Some(ProposalState { on_commit: Arc::new(on_commit), on_abort: Arc::new(on_abort), prefers_commit: outcome.prefers_commit });
        Ok(block_state)
    }

    fn standard(&self, block: &Block, txs: &[Tx], timestamp: Option<u64>) -> BlockProcessResult<BlockState> {
        let mut diff = self.child_diff(block)?;
        let mut changed = false;
        if let Some(timestamp) = timestamp {
            let changes = self.advance_to(&diff, timestamp)?;
            changed = !changes.is_empty();
            changes.apply(&mut diff);
        }
        if txs.is_empty() && !changed {
            return Err(BlockError::EmptyBlock(block.id()));
        }

        let mut block_state = BlockState::new(block.clone(), diff.timestamp());
        for tx in txs {
            let outcome = self.backend.executor.execute_standard_tx(&mut diff, tx)?;
            for utxo_id in outcome.imported {
                // Shared memory is not part of the diffs, so imports are checked against every processing ancestor
                if !block_state.imported.insert(utxo_id) || self.backend.imported_by_ancestor(block.parent_id(), &utxo_id).is_some() {
                    return Err(BlockError::ConflictingInputs(utxo_id));
                }
            }
            merge_requests(&mut block_state.atomic_requests, outcome.atomic_requests);
        }
        block_state.on_accept = Some(Arc::new(diff));
        Ok(block_state)
    }

    fn option(&self, block: &Block, commit: bool, timestamp: Option<u64>) -> BlockProcessResult<BlockState> {
        if let Some(timestamp) = timestamp {
            if timestamp != self.parent.timestamp {
                return Err(BlockError::OptionTimestampMismatch(timestamp, self.parent.timestamp));
            }
        }
        let blocks = self.backend.blocks.read();
        let parent_id = block.parent_id();
        let parent = blocks.get(&parent_id).ok_or(BlockError::MissingParentState(parent_id))?;
        let proposal = parent.proposal.as_ref().ok_or(BlockError::WrongParentType(parent_id, parent.block.kind()))?;
        let on_accept = if commit { proposal.on_commit.clone() } else { proposal.on_abort.clone() };

        let mut block_state = BlockState::new(block.clone(), on_accept.timestamp());
        block_state.on_accept = Some(on_accept);
        Ok(block_state)
    }
}

impl BlockVisitor for VerifyVisitor<'_> {
    type Output = BlockProcessResult<BlockState>;

    fn apricot_proposal_block(&mut self, block: &Block, tx: &Tx) -> Self::Output {
        self.apricot_rules()?;
        self.proposal(block, tx, None)
    }

    fn apricot_standard_block(&mut self, block: &Block, txs: &[Tx]) -> Self::Output {
        self.apricot_rules()?;
        self.standard(block, txs, None)
    }

    fn apricot_atomic_block(&mut self, block: &Block, tx: &Tx) -> Self::Output {
        self.apricot_rules()?;
        if !matches!(tx.unsigned(), UnsignedTx::Import(_) | UnsignedTx::Export(_)) {
            return Err(TxError::WrongBlockKind(tx.unsigned().name(), "atomic").into());
        }
        self.standard(block, std::slice::from_ref(tx), None)
    }

    fn apricot_commit_block(&mut self, block: &Block) -> Self::Output {
        self.apricot_rules()?;
        self.option(block, true, None)
    }

    fn apricot_abort_block(&mut self, block: &Block) -> Self::Output {
        self.apricot_rules()?;
        self.option(block, false, None)
    }

    fn banff_proposal_block(&mut self, block: &Block, timestamp: u64, tx: &Tx) -> Self::Output {
        self.banff_rules(timestamp)?;
        self.proposal(block, tx, Some(timestamp))
    }

    fn banff_standard_block(&mut self, block: &Block, timestamp: u64, txs: &[Tx]) -> Self::Output {
        self.banff_rules(timestamp)?;
        self.standard(block, txs, Some(timestamp))
    }

    fn banff_commit_block(&mut self, block: &Block, timestamp: u64) -> Self::Output {
        self.banff_rules(timestamp)?;
        self.option(block, true, Some(timestamp))
    }

    fn banff_abort_block(&mut self, block: &Block, timestamp: u64) -> Self::Output {
        self.banff_rules(timestamp)?;
        self.option(block, false, Some(timestamp))
    }
}
