use omega_database::{
    prelude::{BatchDbWriter, CachePolicy, CachedDbAccess, DB, StoreError, StoreResult},
    registry::DatabaseStorePrefixes,
};
use omega_platformvm_core::{
    ids::{SubnetId, TxId},
    utxo::OutputOwners,
};
use rocksdb::WriteBatch;
use std::sync::Arc;

/// Reader API for `SubnetsStore`.
pub trait SubnetsStoreReader {
    fn subnet_ids(&self) -> StoreResult<Vec<SubnetId>>;
    fn owner(&self, subnet_id: SubnetId) -> StoreResult<OutputOwners>;
    /// Id of the `TransformSubnetTx` which made the subnet permissionless
    fn transformation(&self, subnet_id: SubnetId) -> StoreResult<TxId>;
    fn supply(&self, subnet_id: SubnetId) -> StoreResult<u64>;
}

pub trait SubnetsStore: SubnetsStoreReader {
    fn insert_subnet_batch(&self, batch: &mut WriteBatch, subnet_id: SubnetId) -> StoreResult<()>;
    fn set_owner_batch(&self, batch: &mut WriteBatch, subnet_id: SubnetId, owner: OutputOwners) -> StoreResult<()>;
    fn insert_transformation_batch(&self, batch: &mut WriteBatch, subnet_id: SubnetId, tx_id: TxId) -> StoreResult<()>;
    fn set_supply_batch(&self, batch: &mut WriteBatch, subnet_id: SubnetId, supply: u64) -> StoreResult<()>;
}

/// Subnet registry: created subnets, their owners, their transformations and per subnet supply
#[derive(Clone)]
pub struct DbSubnetsStore {
    subnets: CachedDbAccess<SubnetId, ()>,
    owners: CachedDbAccess<SubnetId, OutputOwners>,
    transformations: CachedDbAccess<SubnetId, TxId>,
    supplies: CachedDbAccess<SubnetId, u64>,
}

impl DbSubnetsStore {
    pub fn new(db: Arc<DB>, cache_size: usize) -> Self {
        let policy = CachePolicy::Count(cache_size);
        Self {
            subnets: CachedDbAccess::new(db.clone(), CachePolicy::Empty, DatabaseStorePrefixes::Subnets.into()),
            owners: CachedDbAccess::new(db.clone(), policy, DatabaseStorePrefixes::SubnetOwners.into()),
            transformations: CachedDbAccess::new(db.clone(), policy, DatabaseStorePrefixes::TransformedSubnets.into()),
            supplies: CachedDbAccess::new(db, policy, DatabaseStorePrefixes::Supplies.into()),
        }
    }
}

impl SubnetsStoreReader for DbSubnetsStore {
    fn subnet_ids(&self) -> StoreResult<Vec<SubnetId>> {
        self.subnets
            .iterator()
            .map(|res| {
                let (key, _) = res?;
                SubnetId::try_from_slice(&key).map_err(|_| StoreError::DataInconsistency(format!("bad subnet key {key:?}")))
            })
            .collect()
    }

    fn owner(&self, subnet_id: SubnetId) -> StoreResult<OutputOwners> {
        self.owners.read(subnet_id)
    }

    fn transformation(&self, subnet_id: SubnetId) -> StoreResult<TxId> {
        self.transformations.read(subnet_id)
    }

    fn supply(&self, subnet_id: SubnetId) -> StoreResult<u64> {
        self.supplies.read(subnet_id)
    }
}

impl SubnetsStore for DbSubnetsStore {
    fn insert_subnet_batch(&self, batch: &mut WriteBatch, subnet_id: SubnetId) -> StoreResult<()> {
        self.subnets.write(BatchDbWriter::new(batch), subnet_id, ())
    }

    fn set_owner_batch(&self, batch: &mut WriteBatch, subnet_id: SubnetId, owner: OutputOwners) -> StoreResult<()> {
        self.owners.write(BatchDbWriter::new(batch), subnet_id, owner)
    }

    fn insert_transformation_batch(&self, batch: &mut WriteBatch, subnet_id: SubnetId, tx_id: TxId) -> StoreResult<()> {
        self.transformations.write(BatchDbWriter::new(batch), subnet_id, tx_id)
    }

    fn set_supply_batch(&self, batch: &mut WriteBatch, subnet_id: SubnetId, supply: u64) -> StoreResult<()> {
        self.supplies.write(BatchDbWriter::new(batch), subnet_id, supply)
    }
}
