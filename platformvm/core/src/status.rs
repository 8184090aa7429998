use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockStatus {
    /// Verified and waiting for a consensus decision
    Processing,
    Accepted,
    Rejected,
}

impl BlockStatus {
    pub fn is_decided(self) -> bool {
        matches!(self, BlockStatus::Accepted | BlockStatus::Rejected)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    /// Included in an accepted block
    Committed,
    /// Proposed in an accepted proposal block whose abort option was accepted
    Aborted,
    Processing,
    Dropped,
}
