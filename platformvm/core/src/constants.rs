/// Maximum number of seconds a proposed chain time may run ahead of the local clock
pub const SYNC_BOUND: u64 = 10;

/// Denominator of delegation shares and consumption rates, i.e. 100%
pub const PERCENT_DENOMINATOR: u64 = 1_000_000;

/// Fixed point shift of the accumulated mint rate. Leaves headroom for a 32 bit
/// duration multiplied by a 64 bit weight.
pub const MINT_RATE_SHIFT: u32 = 96;

/// Fixed point shift of the accumulated fee per weight
pub const FEE_PER_WEIGHT_SHIFT: u32 = 64;

pub const MAX_MEMO_SIZE: usize = 256;

pub const MAX_CHAIN_NAME_LEN: usize = 128;

pub const MAX_GENESIS_DATA_LEN: usize = 1024 * 1024;

/// Size of a compressed BLS public key
pub const PUBLIC_KEY_SIZE: usize = 48;
