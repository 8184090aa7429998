pub mod block_heights;
pub mod blocks;
pub mod chains;
pub mod reward_utxos;
pub mod singletons;
pub mod stakers;
pub mod subnets;
pub mod txs;
pub mod uptimes;
pub mod utxos;
