pub mod fee;
pub mod mint;
pub mod reward;
pub mod state_changes;
pub mod tx_executor;
pub mod uptime;
pub mod validators;
