//! Core types of the omega platform chain: identifiers, stakers, transactions, blocks,
//! the wire codec and the consensus parameters.

pub mod block;
pub mod codec;
pub mod config;
pub mod constants;
pub mod errors;
pub mod ids;
pub mod staker;
pub mod status;
pub mod tx;
pub mod utxo;
