use crate::processes::{uptime::UptimeError, validators::ValidatorsError};
use omega_database::prelude::{StoreError, StoreErrorPredicates};
use omega_platformvm_core::{
    block::BlockKind,
    codec::CodecError,
    errors::tx::TxError,
    ids::{BlockId, TxId},
    staker::StakerError,
    status::BlockStatus,
    utxo::UtxoId,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("missing state of parent block {0}")]
    MissingParentState(BlockId),

    #[error("state was never initialized with a genesis")]
    NotInitialized,

    #[error("staker of tx {0} is already in the set")]
    DuplicateStaker(TxId),

    #[error("data inconsistency: {0}")]
    DataInconsistency(String),

    #[error(transparent)]
    Staker(#[from] StakerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl StoreErrorPredicates for StateError {
    fn is_key_not_found(&self) -> bool {
        match self {
            StateError::NotFound(_) => true,
            StateError::Store(err) => err.is_key_not_found(),
            _ => false,
        }
    }
}

pub type StateResult<T> = std::result::Result<T, StateError>;

#[derive(Error, Debug)]
pub enum BlockError {
    #[error("missing state of parent block {0}")]
    MissingParentState(BlockId),

    #[error("block {0} was accepted without being verified")]
    MissingBlockState(BlockId),

    #[error("block {0} not found")]
    BlockNotFound(BlockId),

    #[error("block {0} does not build on the last accepted block {1}")]
    NotOnLastAccepted(BlockId, BlockId),

    #[error("block {0} is already {1:?}")]
    AlreadyDecided(BlockId, BlockStatus),

    #[error("expected block height {0}, got {1}")]
    WrongHeight(u64, u64),

    #[error("apricot block issued at chain time {0} after the banff activation")]
    ApricotBlockAfterBanff(u64),

    #[error("banff block with timestamp {0} issued before the banff activation")]
    BanffBlockBeforeBanff(u64),

    #[error("block timestamp {0} is earlier than the parent timestamp {1}")]
    TimestampEarlierThanParent(u64, u64),

    #[error("option block timestamp {0} differs from the proposal timestamp {1}")]
    OptionTimestampMismatch(u64, u64),

    #[error("block {0} carries no txs and does not advance the chain time")]
    EmptyBlock(BlockId),

    #[error("utxo {0} is consumed twice within the processing chain")]
    ConflictingInputs(UtxoId),

    #[error("parent block {0} of an option block is a {1} block")]
    WrongParentType(BlockId, BlockKind),

    #[error("no block to build: the mempool is empty and no staker changes are due")]
    NothingToBuild,

    #[error(transparent)]
    Tx(#[from] TxError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Validators(#[from] ValidatorsError),

    #[error(transparent)]
    Mempool(#[from] MempoolError),

    #[error(transparent)]
    Uptime(#[from] UptimeError),
}

pub type BlockProcessResult<T> = std::result::Result<T, BlockError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MempoolError {
    #[error("tx {0} is already in the mempool")]
    Duplicate(TxId),

    #[error("tx {0} spends utxo {1} which tx {2} in the mempool already spends")]
    Conflict(TxId, UtxoId, TxId),

    #[error("mempool is full with {0} txs")]
    Full(usize),

    #[error("{0} txs are issued by block builders only")]
    NotAllowed(&'static str),

    #[error("tx {0} was dropped: {1}")]
    Dropped(TxId, String),
}

pub type MempoolResult<T> = std::result::Result<T, MempoolError>;
