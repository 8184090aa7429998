//! Memory shared with the other chains of the primary network. Exports put UTXOs into the
//! memory shared with the destination chain, imports consume UTXOs the source chain put there.
//! Requests are written in the same batch as the block which issued them.

use crate::errors::{StateError, StateResult};
use omega_database::{
    prelude::{BatchDbWriter, CachePolicy, CachedDbAccess, DB, DirectDbWriter, StoreResultExt},
    registry::DatabaseStorePrefixes,
};
use omega_platformvm_core::{
    ids::ChainId,
    utxo::{Utxo, UtxoId},
};
use rocksdb::WriteBatch;
use std::{collections::HashMap, sync::Arc};

/// Changes to the memory shared with one peer chain
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AtomicRequest {
    /// Inbound UTXOs consumed by imports
    pub remove_requests: Vec<UtxoId>,
    /// Outbound UTXOs created by exports
    pub put_requests: Vec<Utxo>,
}

pub type AtomicRequests = HashMap<ChainId, AtomicRequest>;

/// Merges `other` into `requests`
pub fn merge_requests(requests: &mut AtomicRequests, other: AtomicRequests) {
    for (chain_id, request) in other {
        let entry = requests.entry(chain_id).or_default();
        entry.remove_requests.extend(request.remove_requests);
        entry.put_requests.extend(request.put_requests);
    }
}

pub trait SharedMemory: Send + Sync {
    /// An inbound UTXO put by `peer_chain`
    fn get(&self, peer_chain: ChainId, utxo_id: UtxoId) -> StateResult<Utxo>;

    /// Writes `requests` into `batch`
    fn apply(&self, requests: &AtomicRequests, batch: &mut WriteBatch) -> StateResult<()>;
}

#[derive(Clone, Copy)]
#[repr(u8)]
enum Direction {
    Inbound = 0,
    Outbound = 1,
}

fn bucket(peer_chain: ChainId, direction: Direction) -> Vec<u8> {
    peer_chain.as_bytes().into_iter().chain(std::iter::once(direction as u8)).collect()
}

fn key(peer_chain: ChainId, direction: Direction, utxo_id: UtxoId) -> Vec<u8> {
    let mut key = bucket(peer_chain, direction);
    key.extend_from_slice(utxo_id.key().as_ref());
    key
}

/// Shared memory stored under `[SharedMemory, peer chain, direction, utxo key]`
#[derive(Clone)]
pub struct DbSharedMemory {
    db: Arc<DB>,
    access: CachedDbAccess<Vec<u8>, Utxo>,
}

impl DbSharedMemory {
    pub fn new(db: Arc<DB>) -> Self {
        Self { db: db.clone(), access: CachedDbAccess::new(db, CachePolicy::Empty, DatabaseStorePrefixes::SharedMemory.into()) }
    }

    /// Makes `utxos` importable from `peer_chain`, as the peer chain does when exporting
    pub fn receive(&self, peer_chain: ChainId, utxos: &[Utxo]) -> StateResult<()> {
        for utxo in utxos {
            self.access.write(DirectDbWriter::new(&self.db), key(peer_chain, Direction::Inbound, utxo.utxo_id), utxo.clone())?;
        }
        Ok(())
    }

    /// UTXOs exported to `peer_chain` so far
    pub fn exported(&self, peer_chain: ChainId) -> StateResult<Vec<Utxo>> {
        Ok(self.access.bucket_iterator(bucket(peer_chain, Direction::Outbound)).map(|res| res.map(|(_, utxo)| utxo)).collect::<Result<_, _>>()?)
    }
}

impl SharedMemory for DbSharedMemory {
    fn get(&self, peer_chain: ChainId, utxo_id: UtxoId) -> StateResult<Utxo> {
        self.access
            .read(key(peer_chain, Direction::Inbound, utxo_id))
            .optional()?
            .ok_or_else(|| StateError::NotFound(format!("shared utxo {utxo_id} of chain {peer_chain}")))
    }

    fn apply(&self, requests: &AtomicRequests, batch: &mut WriteBatch) -> StateResult<()> {
        for (&peer_chain, request) in requests.iter() {
            for &utxo_id in request.remove_requests.iter() {
                self.access.delete(BatchDbWriter::new(batch), key(peer_chain, Direction::Inbound, utxo_id))?;
            }
            for utxo in request.put_requests.iter() {
                self.access.write(BatchDbWriter::new(batch), key(peer_chain, Direction::Outbound, utxo.utxo_id), utxo.clone())?;
            }
        }
        Ok(())
    }
}
