use crate::{
    ids::{AssetId, ChainId, NodeId, SubnetId, TxId},
    staker::StakerError,
    utxo::UtxoId,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxError {
    #[error("wrong network id: expected {0}, got {1}")]
    WrongNetworkId(u32, u32),

    #[error("wrong chain id: expected {0}, got {1}")]
    WrongChainId(ChainId, ChainId),

    #[error("memo of {0} bytes exceeds the maximum of {1}")]
    MemoTooLarge(usize, usize),

    #[error("output with zero amount")]
    ZeroAmountOutput,

    #[error("input {0} has zero amount")]
    ZeroAmountInput(UtxoId),

    #[error("invalid owners: {0}")]
    InvalidOwners(String),

    #[error("utxo {0} is consumed more than once")]
    DuplicateInput(UtxoId),

    #[error("staker weight must be positive")]
    ZeroWeight,

    #[error("delegation shares {0} exceed the denominator {1}")]
    TooManyShares(u32, u64),

    #[error("invalid chain name: {0}")]
    InvalidChainName(String),

    #[error("genesis data of {0} bytes exceeds the maximum of {1}")]
    GenesisDataTooLarge(usize, usize),

    #[error("{0} cannot target the primary network")]
    PrimaryNetworkNotAllowed(&'static str),

    #[error("stake outputs sum to {0} while the staker weight is {1}")]
    StakeWeightMismatch(u64, u64),

    #[error("invalid subnet transformation: {0}")]
    InvalidTransformation(String),

    #[error("atomic tx moves no funds")]
    EmptyAtomicTx,

    #[error("atomic tx targets its own chain {0}")]
    SameChainAtomicTx(ChainId),

    #[error("expected {0} credentials, got {1}")]
    WrongNumberOfCredentials(usize, usize),

    #[error("utxo {0} not found")]
    UtxoNotFound(UtxoId),

    #[error("shared memory utxo {0} from chain {1} not found")]
    SharedUtxoNotFound(UtxoId, ChainId),

    #[error("input {0} declares amount {1} but the utxo holds {2}")]
    InputAmountMismatch(UtxoId, u64, u64),

    #[error("input {0} declares asset {1} but the utxo holds {2}")]
    AssetIdMismatch(UtxoId, AssetId, AssetId),

    #[error("utxo {0} is locked until {1}")]
    UtxoLocked(UtxoId, u64),

    #[error("insufficient funds of asset {0}: {1} consumed, {2} required")]
    InsufficientFunds(AssetId, u64, u64),

    #[error("value overflow")]
    Overflow,

    #[error("weight {0} is below the minimum of {1}")]
    WeightTooSmall(u64, u64),

    #[error("weight {0} is above the maximum of {1}")]
    WeightTooLarge(u64, u64),

    #[error("staking duration of {0}s is below the minimum of {1}s")]
    StakeTooShort(u64, u64),

    #[error("staking duration of {0}s is above the maximum of {1}s")]
    StakeTooLong(u64, u64),

    #[error("delegation shares {0} are below the minimum of {1}")]
    InsufficientDelegationFee(u32, u32),

    #[error("staker start time {0} is not after the chain time {1}")]
    StartTimeTooEarly(u64, u64),

    #[error("staker start time {0} is too far ahead of the chain time {1}")]
    StartTimeTooLate(u64, u64),

    #[error("node {0} already validates subnet {1}")]
    DuplicateValidator(NodeId, SubnetId),

    #[error("node {0} does not validate subnet {1}")]
    ValidatorNotFound(NodeId, SubnetId),

    #[error("staking period [{0}, {1}] is not within the validator period [{2}, {3}]")]
    PeriodNotSubset(u64, u64, u64, u64),

    #[error("delegation would bring the weight of validator {0} above {1}")]
    OverDelegated(NodeId, u64),

    #[error("subnet {0} not found")]
    SubnetNotFound(SubnetId),

    #[error("subnet {0} is already permissionless")]
    SubnetAlreadyTransformed(SubnetId),

    #[error("subnet {0} is not permissionless")]
    SubnetNotTransformed(SubnetId),

    #[error("asset {0} cannot be staked on subnet {1}")]
    WrongStakingAsset(AssetId, SubnetId),

    #[error("validator {0} of subnet {1} is permissionless and cannot be removed directly")]
    RemovePermissionlessValidator(NodeId, SubnetId),

    #[error("subnet validators cannot register a public key")]
    PublicKeyNotAllowed,

    #[error("{0} is not allowed after the banff activation")]
    NotAllowedAfterBanff(&'static str),

    #[error("{0} is not allowed before the banff activation")]
    NotAllowedBeforeBanff(&'static str),

    #[error("{0} cannot be issued inside a {1} block")]
    WrongBlockKind(&'static str, &'static str),

    #[error("proposed time {0} is not after the chain time {1}")]
    TimestampNotAfterChainTime(u64, u64),

    #[error("proposed chain time {0} is beyond the next staker change time {1}")]
    ChainTimeBeyondNextStakerChange(u64, u64),

    #[error("proposed chain time {0} is beyond the local time {1} plus the sync bound")]
    ChainTimeBeyondSyncBound(u64, u64),

    #[error("attempting to remove staker {1} while the next staker to remove is {0}")]
    RemoveWrongStaker(TxId, TxId),

    #[error("attempting to remove a staker at chain time {0} before its end time {1}")]
    RemoveStakerTooEarly(u64, u64),

    #[error("there are no current stakers to remove")]
    NoStakerToRemove,

    #[error("tx {0} not found")]
    TxNotFound(TxId),

    #[error("tx {0} did not create a staker")]
    NotAStakerTx(TxId),

    #[error(transparent)]
    Staker(#[from] StakerError),
}

pub type TxResult<T> = std::result::Result<T, TxError>;
