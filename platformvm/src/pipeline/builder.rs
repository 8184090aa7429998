use super::backend::{Backend, ParentInfo};
use crate::{
    errors::{BlockError, BlockProcessResult},
    processes::{state_changes::advance_time_to, tx_executor::next_staker_change_time},
    state::{ChainReader, Versions, diff::Diff},
};
use omega_core::{debug, trace};
use omega_platformvm_core::{
    block::{Block, BlockKind},
    ids::BlockId,
    staker::Staker,
    tx::{AdvanceTimeTx, RewardValidatorTx, Tx, UnsignedTx},
};
use std::{
    collections::HashSet,
    sync::{Arc, Weak},
};

/// Upper bound on the txs packed in a standard block
pub const MAX_BLOCK_TXS: usize = 256;

pub struct Builder {
    backend: Arc<Backend>,
}

impl Builder {
    pub fn new(backend: Arc<Backend>) -> Self {
        Self { backend }
    }

    /// Builds the next block on top of `parent_id`. Staker rewards come first, then time
    /// advancement and mempool txs.
    pub fn build(&self, parent_id: BlockId) -> BlockProcessResult<Block> {
        let parent = self.backend.parent_info(parent_id)?;
        if parent.kind == BlockKind::Proposal {
            return Err(BlockError::WrongParentType(parent_id, parent.kind));
        }
        let chain = self.child_diff(parent_id)?;
        let now = self.backend.executor.clock().unix_time();
        let block = if self.backend.config.is_banff_active(now.max(parent.timestamp)) {
            self.build_banff(parent_id, parent, chain, now)?
        } else {
            self.build_apricot(parent_id, parent, chain, now)?
        };
        debug!("Built {} block {} at height {} with {} txs", block.kind(), block.id(), block.height(), block.txs().len());
        Ok(block)
    }

    /// The commit and abort options of `proposal`, the preferred one first
    pub fn build_options(&self, proposal: &Block) -> BlockProcessResult<[Block; 2]> {
        let (parent_id, height) = (proposal.id(), proposal.height() + 1);
        let (commit, abort) = match proposal.timestamp() {
            Some(timestamp) => {
                (Block::new_banff_commit(timestamp, parent_id, height)?, Block::new_banff_abort(timestamp, parent_id, height)?)
            }
            None => (Block::new_apricot_commit(parent_id, height)?, Block::new_apricot_abort(parent_id, height)?),
        };
        let prefers_commit = self
            .backend
            .blocks
            .read()
            .get(&parent_id)
            .and_then(|block_state| block_state.proposal.as_ref())
            .map(|proposal| proposal.prefers_commit)
            .ok_or(BlockError::MissingBlockState(parent_id))?;
        Ok(if prefers_commit { [commit, abort] } else { [abort, commit] })
    }

    fn build_banff(&self, parent_id: BlockId, parent: ParentInfo, chain: Diff, now: u64) -> BlockProcessResult<Block> {
        let height = parent.height + 1;
        let chain_time = chain.timestamp();
        if let Some(staker) = staker_to_reward(&chain)? {
            return Ok(Block::new_banff_proposal(chain_time, parent_id, height, reward_tx(&staker))?);
        }

        let next_change = next_staker_change_time(&chain)?;
        let timestamp = now.max(chain_time).min(next_change);
        let changes = advance_time_to(self.backend.executor.mint(), &chain, timestamp)?;
        let mut advanced = chain;
        changes.apply(&mut advanced);

        let txs = self.pick_decision_txs(parent_id, advanced, |_| true);
        if txs.is_empty() && changes.is_empty() {
            return Err(BlockError::NothingToBuild);
        }
        Ok(Block::new_banff_standard(timestamp, parent_id, height, txs)?)
    }

    fn build_apricot(&self, parent_id: BlockId, parent: ParentInfo, chain: Diff, now: u64) -> BlockProcessResult<Block> {
        let height = parent.height + 1;
        if let Some(staker) = staker_to_reward(&chain)? {
            return Ok(Block::new_apricot_proposal(parent_id, height, reward_tx(&staker))?);
        }
        let next_change = next_staker_change_time(&chain)?;
        if next_change <= now {
            let tx = Tx::new(UnsignedTx::AdvanceTime(AdvanceTimeTx { time: next_change }), vec![]);
            return Ok(Block::new_apricot_proposal(parent_id, height, tx)?);
        }

        let txs = self.pick_decision_txs(parent_id, chain, |tx| !is_legacy_staker(tx));
        if let [tx] = txs.as_slice() {
            if matches!(tx.unsigned(), UnsignedTx::Import(_) | UnsignedTx::Export(_)) {
                return Ok(Block::new_apricot_atomic(parent_id, height, tx.clone())?);
            }
        }
        if !txs.is_empty() {
            return Ok(Block::new_apricot_standard(parent_id, height, txs)?);
        }

        let stakers: Vec<Tx> = self.backend.mempool.read().iter().filter(|tx| is_legacy_staker(tx)).cloned().collect();
        for tx in stakers {
            let mut on_commit = self.child_diff(parent_id)?;
            let mut on_abort = self.child_diff(parent_id)?;
            match self.backend.executor.execute_proposal_tx(&mut on_commit, &mut on_abort, &tx) {
                Ok(_) => return Ok(Block::new_apricot_proposal(parent_id, height, tx)?),
                Err(err) => self.drop_tx(&tx, &err),
            }
        }
        Err(BlockError::NothingToBuild)
    }

    /// Mempool txs which execute in sequence on top of `chain`. Invalid txs are dropped from the
    /// mempool, txs importing UTXOs a processing ancestor imports are left for later.
    fn pick_decision_txs(&self, parent_id: BlockId, chain: Diff, filter: impl Fn(&Tx) -> bool) -> Vec<Tx> {
        let candidates: Vec<Tx> = self.backend.mempool.read().iter().filter(|tx| filter(tx)).cloned().collect();
        let mut current: Arc<dyn ChainReader> = Arc::new(chain);
        let mut imported = HashSet::new();
        let mut picked = Vec::new();
        for tx in candidates {
            if picked.len() >= MAX_BLOCK_TXS {
                break;
            }
            let mut attempt = Diff::new_on(current.clone());
            let outcome = match self.backend.executor.execute_standard_tx(&mut attempt, &tx) {
                Ok(outcome) => outcome,
                Err(err) => {
                    self.drop_tx(&tx, &err);
                    continue;
                }
            };
            if outcome.imported.iter().any(|utxo_id| imported.contains(utxo_id) || self.backend.imported_by_ancestor(parent_id, utxo_id).is_some()) {
                trace!("Tx {} imports utxos consumed by a processing block, leaving it in the mempool", tx.id());
                continue;
            }
            imported.extend(outcome.imported);
            current = Arc::new(attempt);
            picked.push(tx);
        }
        picked
    }

    fn child_diff(&self, parent_id: BlockId) -> BlockProcessResult<Diff> {
        let versions: Weak<dyn Versions> = Arc::downgrade(&self.backend) as Weak<dyn Versions>;
        Ok(Diff::new(parent_id, versions)?)
    }

    fn drop_tx(&self, tx: &Tx, err: &BlockError) {
        debug!("Dropping tx {} from the mempool: {}", tx.id(), err);
        self.backend.mempool.write().mark_dropped(tx.id(), err.to_string());
    }
}

/// The current staker whose staking period ends at the chain time, if any
fn staker_to_reward(chain: &dyn ChainReader) -> BlockProcessResult<Option<Staker>> {
    let chain_time = chain.timestamp();
    Ok(chain.current_stakers()?.next().filter(|staker| staker.end_time == chain_time && !staker.priority.is_permissioned()))
}

fn reward_tx(staker: &Staker) -> Tx {
    Tx::new(UnsignedTx::RewardValidator(RewardValidatorTx { tx_id: staker.tx_id }), vec![])
}

/// Staker txs which are proposals before Banff
fn is_legacy_staker(tx: &Tx) -> bool {
    matches!(tx.unsigned(), UnsignedTx::AddValidator(_) | UnsignedTx::AddSubnetValidator(_) | UnsignedTx::AddDelegator(_))
}
