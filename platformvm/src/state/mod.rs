//! Chain state: the persisted [`base::State`], the copy-on-write [`diff::Diff`] layered on top
//! of it, and the traits both expose.

pub mod base;
pub mod diff;
pub mod stakers;
pub mod storage;

use crate::{errors::StateResult, model::accumulators::RewardAccumulators};
use omega_platformvm_core::{
    ids::{BlockId, NodeId, SubnetId, TxId},
    staker::Staker,
    status::TxStatus,
    tx::Tx,
    utxo::{OutputOwners, Utxo, UtxoId},
};
use std::sync::Arc;

/// Single pass iteration over a staker set in `(next_time, priority, tx_id)` order
pub type StakerIter = Box<dyn Iterator<Item = Staker> + Send>;

/// Read access to a chain state. Lookups of absent entries fail with a not found error,
/// see `StoreResultExt::optional` for turning those into options.
pub trait ChainReader: Send + Sync {
    fn timestamp(&self) -> u64;
    fn accumulators(&self) -> RewardAccumulators;
    fn current_supply(&self, subnet_id: SubnetId) -> StateResult<u64>;

    fn current_validator(&self, subnet_id: SubnetId, node_id: NodeId) -> StateResult<Staker>;
    fn current_delegators(&self, subnet_id: SubnetId, node_id: NodeId) -> StateResult<Vec<Staker>>;
    fn current_stakers(&self) -> StateResult<StakerIter>;

    fn pending_validator(&self, subnet_id: SubnetId, node_id: NodeId) -> StateResult<Staker>;
    fn pending_delegators(&self, subnet_id: SubnetId, node_id: NodeId) -> StateResult<Vec<Staker>>;
    fn pending_stakers(&self) -> StateResult<StakerIter>;

    fn utxo(&self, utxo_id: UtxoId) -> StateResult<Utxo>;
    fn tx(&self, tx_id: TxId) -> StateResult<(Tx, TxStatus)>;
    fn subnet_owner(&self, subnet_id: SubnetId) -> StateResult<OutputOwners>;
    /// The `TransformSubnetTx` which made the subnet permissionless
    fn subnet_transformation(&self, subnet_id: SubnetId) -> StateResult<Tx>;
    fn chains(&self, subnet_id: SubnetId) -> StateResult<Vec<Tx>>;
    fn reward_utxos(&self, tx_id: TxId) -> StateResult<Vec<Utxo>>;
}

/// Write access to a chain state. Writes only touch memory, persisting is up to the owner.
pub trait Chain: ChainReader {
    fn set_timestamp(&mut self, timestamp: u64);
    fn set_accumulators(&mut self, accumulators: RewardAccumulators);
    fn set_current_supply(&mut self, subnet_id: SubnetId, supply: u64);

    fn put_current_validator(&mut self, staker: Staker);
    fn delete_current_validator(&mut self, staker: &Staker);
    fn put_current_delegator(&mut self, staker: Staker);
    fn delete_current_delegator(&mut self, staker: &Staker);

    fn put_pending_validator(&mut self, staker: Staker);
    fn delete_pending_validator(&mut self, staker: &Staker);
    fn put_pending_delegator(&mut self, staker: Staker);
    fn delete_pending_delegator(&mut self, staker: &Staker);

    fn add_subnet(&mut self, subnet_id: SubnetId, owner: OutputOwners);
    fn add_subnet_transformation(&mut self, subnet_id: SubnetId, tx: Tx);
    fn add_chain(&mut self, subnet_id: SubnetId, tx: Tx);
    fn add_tx(&mut self, tx: Tx, status: TxStatus);
    fn add_reward_utxo(&mut self, tx_id: TxId, utxo: Utxo);
    fn add_utxo(&mut self, utxo: Utxo);
    fn delete_utxo(&mut self, utxo_id: UtxoId);
}

/// Resolves the state resulting from a block, either a processing block or the last accepted one
pub trait Versions: Send + Sync {
    fn get_state(&self, block_id: BlockId) -> Option<Arc<dyn ChainReader>>;
}
