pub mod atomic;
pub mod counters;
pub mod errors;
pub mod mempool;
pub mod model;
pub mod pipeline;
pub mod processes;
pub mod state;

#[cfg(test)]
pub(crate) mod test_helpers;
