pub mod proposal;
pub mod staking;
pub mod standard;
mod utxos;

use super::{mint::MintCalculator, uptime::UptimeManager};
use crate::{atomic::SharedMemory, errors::StateResult, state::ChainReader};
use omega_core::time::Clock;
use omega_platformvm_core::{
    config::{Config, params::Params},
    constants::SYNC_BOUND,
    errors::tx::{TxError, TxResult},
    ids::PRIMARY_NETWORK_ID,
    tx::UnsignedTx,
};
use std::sync::Arc;

pub use proposal::ProposalOutcome;
pub use standard::StandardOutcome;

/// Executes txs against a chain state. Everything the state does not hold (consensus params,
/// local clock, measured uptimes, memory shared with other chains) is provided here.
#[derive(Clone)]
pub struct TxExecutor {
    config: Arc<Config>,
    clock: Arc<dyn Clock>,
    uptimes: Arc<UptimeManager>,
    shared_memory: Arc<dyn SharedMemory>,
    mint: MintCalculator,
}

impl TxExecutor {
    pub fn new(config: Arc<Config>, clock: Arc<dyn Clock>, uptimes: Arc<UptimeManager>, shared_memory: Arc<dyn SharedMemory>) -> Self {
        let mint = MintCalculator::new(config.mint);
        Self { config, clock, uptimes, shared_memory, mint }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn mint(&self) -> &MintCalculator {
        &self.mint
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn uptimes(&self) -> &Arc<UptimeManager> {
        &self.uptimes
    }
}

/// Chain time at which the staker sets change next, `u64::MAX` when no staker is left
pub fn next_staker_change_time(chain: &dyn ChainReader) -> StateResult<u64> {
    let next_current = chain.current_stakers()?.next().map_or(u64::MAX, |staker| staker.next_time);
    let next_pending = chain.pending_stakers()?.next().map_or(u64::MAX, |staker| staker.next_time);
    Ok(next_current.min(next_pending))
}

/// A new chain time may neither skip a staker set change nor run ahead of the local clock
pub fn verify_new_chain_time(new_chain_time: u64, next_staker_change_time: u64, now: u64) -> TxResult<()> {
    if new_chain_time > next_staker_change_time {
        return Err(TxError::ChainTimeBeyondNextStakerChange(new_chain_time, next_staker_change_time));
    }
    let upper_bound = now.saturating_add(SYNC_BOUND);
    if new_chain_time > upper_bound {
        return Err(TxError::ChainTimeBeyondSyncBound(new_chain_time, now));
    }
    Ok(())
}

/// Fee burned by a tx, in the fee asset
pub fn tx_fee(params: &Params, tx: &UnsignedTx) -> u64 {
    match tx {
        UnsignedTx::AddValidator(_) => params.add_primary_network_validator_fee,
        UnsignedTx::AddDelegator(_) => params.add_primary_network_delegator_fee,
        UnsignedTx::AddSubnetValidator(_) => params.add_subnet_validator_fee,
        UnsignedTx::AddPermissionlessValidator(tx) if tx.subnet_id == PRIMARY_NETWORK_ID => params.add_primary_network_validator_fee,
        UnsignedTx::AddPermissionlessValidator(_) => params.add_subnet_validator_fee,
        UnsignedTx::AddPermissionlessDelegator(tx) if tx.subnet_id == PRIMARY_NETWORK_ID => params.add_primary_network_delegator_fee,
        UnsignedTx::AddPermissionlessDelegator(_) => params.add_subnet_delegator_fee,
        UnsignedTx::CreateSubnet(_) => params.create_subnet_tx_fee,
        UnsignedTx::CreateChain(_) => params.create_chain_tx_fee,
        UnsignedTx::TransformSubnet(_) => params.transform_subnet_tx_fee,
        UnsignedTx::RemoveSubnetValidator(_) | UnsignedTx::Import(_) | UnsignedTx::Export(_) => params.tx_fee,
        UnsignedTx::AdvanceTime(_) | UnsignedTx::RewardValidator(_) => 0,
    }
}
