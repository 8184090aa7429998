//! Block processing: verified blocks are kept along with the state they result in until
//! consensus decides them, accepted ones are then written to the persisted state.

pub mod acceptor;
pub mod backend;
pub mod block_state;
pub mod builder;
pub mod manager;
pub mod pruner;
pub mod rejector;
pub mod verifier;

pub use backend::Backend;
pub use manager::Manager;
pub use pruner::{PruneStats, Pruner};
