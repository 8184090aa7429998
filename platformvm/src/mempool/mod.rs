//! Txs waiting to be included in a block. Txs are kept in arrival order and no two txs of the
//! pool spend the same UTXO.

use crate::errors::{MempoolError, MempoolResult};
use indexmap::IndexMap;
use omega_core::debug;
use omega_platformvm_core::{ids::TxId, tx::Tx, utxo::UtxoId};
use std::{
    collections::HashMap,
    fmt::{Display, Formatter},
};

/// Number of dropped tx ids remembered with their reason
const MAX_DROPPED: usize = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxRemovalReason {
    Accepted,
    Conflict,
    Invalid,
}

impl TxRemovalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxRemovalReason::Accepted => "accepted",
            TxRemovalReason::Conflict => "conflicts with an accepted tx",
            TxRemovalReason::Invalid => "invalid",
        }
    }
}

impl Display for TxRemovalReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct Mempool {
    txs: IndexMap<TxId, Tx>,
    /// Spender of every UTXO consumed by a tx of the pool
    spenders: HashMap<UtxoId, TxId>,
    dropped: IndexMap<TxId, String>,
    max_txs: usize,
}

impl Mempool {
    pub fn new(max_txs: usize) -> Self {
        Self { txs: IndexMap::new(), spenders: HashMap::new(), dropped: IndexMap::new(), max_txs }
    }

    pub fn add(&mut self, tx: Tx) -> MempoolResult<()> {
        let tx_id = tx.id();
        if tx.unsigned().is_proposal_only() {
            return Err(MempoolError::NotAllowed(tx.unsigned().name()));
        }
        if self.txs.contains_key(&tx_id) {
            return Err(MempoolError::Duplicate(tx_id));
        }
        if self.txs.len() >= self.max_txs {
            return Err(MempoolError::Full(self.txs.len()));
        }
        let consumed = tx.unsigned().consumed_utxos();
        if let Some((&utxo_id, &spender)) = consumed.iter().find_map(|utxo_id| self.spenders.get_key_value(utxo_id)) {
            return Err(MempoolError::Conflict(tx_id, utxo_id, spender));
        }

        self.spenders.extend(consumed.into_iter().map(|utxo_id| (utxo_id, tx_id)));
        self.dropped.shift_remove(&tx_id);
        self.txs.insert(tx_id, tx);
        Ok(())
    }

    pub fn has(&self, tx_id: &TxId) -> bool {
        self.txs.contains_key(tx_id)
    }

    pub fn get(&self, tx_id: &TxId) -> Option<&Tx> {
        self.txs.get(tx_id)
    }

    pub fn len(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    /// Txs in arrival order
    pub fn iter(&self) -> impl Iterator<Item = &Tx> {
        self.txs.values()
    }

    /// Removes `txs` along with every pooled tx spending one of their inputs
    pub fn remove(&mut self, txs: &[Tx], reason: TxRemovalReason) {
        for tx in txs {
            self.remove_one(&tx.id(), reason);
            for utxo_id in tx.unsigned().consumed_utxos() {
                if let Some(spender) = self.spenders.get(&utxo_id).copied() {
                    self.remove_one(&spender, TxRemovalReason::Conflict);
                }
            }
        }
    }

    fn remove_one(&mut self, tx_id: &TxId, reason: TxRemovalReason) {
        let Some(tx) = self.txs.shift_remove(tx_id) else {
            return;
        };
        for utxo_id in tx.unsigned().consumed_utxos() {
            self.spenders.remove(&utxo_id);
        }
        if reason != TxRemovalReason::Accepted {
            debug!("Removed tx {} from the mempool ({})", tx_id, reason);
        }
    }

    /// Removes `tx_id` and remembers why it was dropped
    pub fn mark_dropped(&mut self, tx_id: TxId, reason: String) {
        self.remove_one(&tx_id, TxRemovalReason::Invalid);
        if self.dropped.len() >= MAX_DROPPED {
            self.dropped.shift_remove_index(0);
        }
        self.dropped.insert(tx_id, reason);
    }

    pub fn dropped_reason(&self, tx_id: &TxId) -> Option<&str> {
        self.dropped.get(tx_id).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{DAY, base_tx, funded_delegator_tx, funded_validator_tx, output, owner, spend};
    use omega_platformvm_core::{
        tx::{AdvanceTimeTx, Credential, UnsignedTx, subnet::CreateSubnetTx},
        utxo::Utxo,
    };

    fn funds(n: u64) -> Utxo {
        Utxo::new(UtxoId::new(TxId::from_u64_word(n), 0), &output(1_000_000))
    }

    fn create_subnet(funds: &Utxo, change: u64) -> Tx {
        Tx::new(
            UnsignedTx::CreateSubnet(CreateSubnetTx {
                base: base_tx(vec![spend(funds)], vec![output(change)]),
                owner: owner(),
            }),
            vec![Credential::default()],
        )
    }

    #[test]
    fn test_add_keeps_arrival_order() {
        let mut mempool = Mempool::new(10);
        let txs = [create_subnet(&funds(1), 10), funded_validator_tx(&funds(2), 9, 100, 100 + DAY, 2000), create_subnet(&funds(3), 10)];
        for tx in txs.iter() {
            mempool.add(tx.clone()).unwrap();
        }
        assert_eq!(mempool.iter().map(Tx::id).collect::<Vec<_>>(), txs.iter().map(Tx::id).collect::<Vec<_>>());
        assert_eq!(mempool.add(txs[0].clone()), Err(MempoolError::Duplicate(txs[0].id())));
    }

    #[test]
    fn test_rejected_txs() {
        let mut mempool = Mempool::new(1);
        let first = create_subnet(&funds(1), 10);
        mempool.add(first.clone()).unwrap();

        let conflicting = create_subnet(&funds(1), 20);
        assert_eq!(mempool.add(conflicting.clone()), Err(MempoolError::Full(1)));
        let mut mempool = Mempool::new(10);
        mempool.add(first.clone()).unwrap();
        assert_eq!(mempool.add(conflicting.clone()), Err(MempoolError::Conflict(conflicting.id(), funds(1).utxo_id, first.id())));

        let advance = Tx::new(UnsignedTx::AdvanceTime(AdvanceTimeTx { time: 5 }), vec![]);
        assert_eq!(mempool.add(advance), Err(MempoolError::NotAllowed("AdvanceTimeTx")));
    }

    #[test]
    fn test_remove_accepted_and_conflicting() {
        let mut mempool = Mempool::new(10);
        let pooled = create_subnet(&funds(1), 10);
        let unrelated = funded_delegator_tx(&funds(2), 1, 100, 100 + DAY, 25);
        mempool.add(pooled.clone()).unwrap();
        mempool.add(unrelated.clone()).unwrap();

        // A block accepted another tx spending the same funds
        let accepted = create_subnet(&funds(1), 20);
        mempool.remove(&[accepted], TxRemovalReason::Accepted);
        assert!(!mempool.has(&pooled.id()));
        assert!(mempool.has(&unrelated.id()));
        // The funds are free again as far as the pool knows
        mempool.add(create_subnet(&funds(1), 30)).unwrap();

        mempool.remove(std::slice::from_ref(&unrelated), TxRemovalReason::Accepted);
        assert_eq!(mempool.len(), 1);
    }

    #[test]
    fn test_dropped_reasons() {
        let mut mempool = Mempool::new(10);
        let tx = create_subnet(&funds(1), 10);
        mempool.add(tx.clone()).unwrap();
        mempool.mark_dropped(tx.id(), "insufficient funds".to_string());
        assert!(mempool.is_empty());
        assert_eq!(mempool.dropped_reason(&tx.id()), Some("insufficient funds"));

        mempool.add(tx.clone()).unwrap();
        assert_eq!(mempool.dropped_reason(&tx.id()), None);
        assert!(mempool.get(&tx.id()).is_some());
    }
}
