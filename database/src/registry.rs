use enum_primitive_derive::Primitive;

/// Reserved byte which is never used as a store prefix
pub const SEPARATOR: u8 = u8::MAX;

/// Top level prefixes of the platform chain stores. Staker stores nest several of these, e.g.
/// `[Validators, Current, SubnetDelegator]`.
#[derive(Primitive, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DatabaseStorePrefixes {
    // ---- Stakers ----
    Validators = 1,
    Current = 2,
    Pending = 3,
    Validator = 4,
    Delegator = 5,
    SubnetValidator = 6,
    SubnetDelegator = 7,

    // ---- Blocks ----
    BlockIdByHeight = 16,
    Blocks = 17,

    // ---- Transactions ----
    Txs = 32,
    RewardUtxos = 33,
    Utxos = 34,

    // ---- Subnets and chains ----
    Subnets = 48,
    SubnetOwners = 49,
    TransformedSubnets = 50,
    Supplies = 51,
    Chains = 52,

    // ---- Metadata ----
    Singletons = 64,
    Uptimes = 65,

    // ---- Cross chain ----
    SharedMemory = 128,

    // ---- Separator ----
    /// Reserved as a separator
    Separator = SEPARATOR,
}

impl From<DatabaseStorePrefixes> for Vec<u8> {
    fn from(value: DatabaseStorePrefixes) -> Self {
        [value as u8].to_vec()
    }
}

impl From<DatabaseStorePrefixes> for u8 {
    fn from(value: DatabaseStorePrefixes) -> Self {
        value as u8
    }
}

/// Builds a nested prefix path out of several store prefixes
pub fn nested_prefix(parts: &[DatabaseStorePrefixes]) -> Vec<u8> {
    parts.iter().map(|p| *p as u8).collect()
}
