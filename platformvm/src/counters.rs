use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct ProcessingCounters {
    pub blocks_verified: AtomicU64,
    pub blocks_accepted: AtomicU64,
    pub blocks_rejected: AtomicU64,
    pub txs_accepted: AtomicU64,
    pub txs_rejected: AtomicU64,
    pub txs_issued: AtomicU64,
}

impl ProcessingCounters {
    pub fn snapshot(&self) -> ProcessingCountersSnapshot {
        ProcessingCountersSnapshot {
            blocks_verified: self.blocks_verified.load(Ordering::Relaxed),
            blocks_accepted: self.blocks_accepted.load(Ordering::Relaxed),
            blocks_rejected: self.blocks_rejected.load(Ordering::Relaxed),
            txs_accepted: self.txs_accepted.load(Ordering::Relaxed),
            txs_rejected: self.txs_rejected.load(Ordering::Relaxed),
            txs_issued: self.txs_issued.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProcessingCountersSnapshot {
    pub blocks_verified: u64,
    pub blocks_accepted: u64,
    pub blocks_rejected: u64,
    pub txs_accepted: u64,
    pub txs_rejected: u64,
    pub txs_issued: u64,
}

impl core::ops::Sub for &ProcessingCountersSnapshot {
    type Output = ProcessingCountersSnapshot;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::Output {
            blocks_verified: self.blocks_verified.saturating_sub(rhs.blocks_verified),
            blocks_accepted: self.blocks_accepted.saturating_sub(rhs.blocks_accepted),
            blocks_rejected: self.blocks_rejected.saturating_sub(rhs.blocks_rejected),
            txs_accepted: self.txs_accepted.saturating_sub(rhs.txs_accepted),
            txs_rejected: self.txs_rejected.saturating_sub(rhs.txs_rejected),
            txs_issued: self.txs_issued.saturating_sub(rhs.txs_issued),
        }
    }
}
