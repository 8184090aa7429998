pub mod accumulators;
pub mod stores;
