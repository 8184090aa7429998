use omega_database::{
    prelude::{BatchDbWriter, CachePolicy, CachedDbAccess, DB, StoreResult},
    registry::DatabaseStorePrefixes,
};
use omega_platformvm_core::utxo::{Utxo, UtxoId, UtxoKey};
use rocksdb::WriteBatch;
use std::sync::Arc;

/// Reader API for `UtxosStore`.
pub trait UtxosStoreReader {
    fn get(&self, utxo_id: UtxoId) -> StoreResult<Utxo>;
    fn has(&self, utxo_id: UtxoId) -> StoreResult<bool>;
}

pub trait UtxosStore: UtxosStoreReader {
    fn insert_batch(&self, batch: &mut WriteBatch, utxo: &Utxo) -> StoreResult<()>;
    fn delete_batch(&self, batch: &mut WriteBatch, utxo_id: UtxoId) -> StoreResult<()>;
}

/// A DB + cache implementation of `UtxosStore` trait, with concurrent readers support.
#[derive(Clone)]
pub struct DbUtxosStore {
    access: CachedDbAccess<UtxoKey, Utxo>,
}

impl DbUtxosStore {
    pub fn new(db: Arc<DB>, cache_size: usize) -> Self {
        Self { access: CachedDbAccess::new(db, CachePolicy::Count(cache_size), DatabaseStorePrefixes::Utxos.into()) }
    }

    /// Iterates every unspent output. Meant for tests and tooling.
    pub fn iter_all(&self) -> impl Iterator<Item = StoreResult<Utxo>> + '_ {
        self.access.iterator().map(|res| res.map(|(_, utxo)| utxo))
    }
}

impl UtxosStoreReader for DbUtxosStore {
    fn get(&self, utxo_id: UtxoId) -> StoreResult<Utxo> {
        self.access.read(utxo_id.key())
    }

    fn has(&self, utxo_id: UtxoId) -> StoreResult<bool> {
        self.access.has(utxo_id.key())
    }
}

impl UtxosStore for DbUtxosStore {
    fn insert_batch(&self, batch: &mut WriteBatch, utxo: &Utxo) -> StoreResult<()> {
        self.access.write(BatchDbWriter::new(batch), utxo.utxo_id.key(), utxo.clone())
    }

    fn delete_batch(&self, batch: &mut WriteBatch, utxo_id: UtxoId) -> StoreResult<()> {
        self.access.delete(BatchDbWriter::new(batch), utxo_id.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omega_database::{
        create_temp_db,
        prelude::{ConnBuilder, StoreResultExt},
    };
    use omega_platformvm_core::{
        ids::{Hash, ShortId},
        utxo::{OutputOwners, TransferableOutput},
    };

    #[test]
    fn test_utxo_lifecycle() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let store = DbUtxosStore::new(db.clone(), 16);
        let out = TransferableOutput::new(Hash::from_u64_word(1), 500, OutputOwners::single(ShortId::from_u64_word(3)));
        let utxos: Vec<Utxo> = (0..3).map(|i| Utxo::new(UtxoId::new(Hash::from_u64_word(7), i), &out)).collect();

        let mut batch = WriteBatch::default();
        for utxo in utxos.iter() {
            store.insert_batch(&mut batch, utxo).unwrap();
        }
        db.write(batch).unwrap();
        assert_eq!(store.iter_all().count(), 3);
        assert_eq!(store.get(utxos[1].utxo_id).unwrap(), utxos[1]);

        let mut batch = WriteBatch::default();
        store.delete_batch(&mut batch, utxos[1].utxo_id).unwrap();
        db.write(batch).unwrap();
        assert!(!store.has(utxos[1].utxo_id).unwrap());
        assert_eq!(store.get(utxos[1].utxo_id).optional().unwrap(), None);
    }
}
