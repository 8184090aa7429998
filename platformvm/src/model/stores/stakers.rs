use omega_database::{
    prelude::{BatchDbWriter, CachePolicy, CachedDbAccess, DB, StoreResult},
    registry::{DatabaseStorePrefixes, nested_prefix},
};
use omega_platformvm_core::{ids::TxId, staker::Staker};
use rocksdb::WriteBatch;
use std::sync::Arc;

/// Reader API for `StakersStore`.
pub trait StakersStoreReader {
    fn get(&self, tx_id: TxId) -> StoreResult<Staker>;
    fn get_all(&self) -> StoreResult<Vec<Staker>>;
}

pub trait StakersStore: StakersStoreReader {
    fn insert_batch(&self, batch: &mut WriteBatch, staker: &Staker) -> StoreResult<()>;
    fn delete_batch(&self, batch: &mut WriteBatch, tx_id: TxId) -> StoreResult<()>;
}

/// A DB implementation of `StakersStore` for one of the eight staker sets. Stakers are loaded
/// into memory on startup so nothing is cached here.
#[derive(Clone)]
pub struct DbStakersStore {
    access: CachedDbAccess<TxId, Staker>,
}

impl DbStakersStore {
    pub fn new(db: Arc<DB>, prefix: Vec<u8>) -> Self {
        Self { access: CachedDbAccess::new(db, CachePolicy::Empty, prefix) }
    }
}

impl StakersStoreReader for DbStakersStore {
    fn get(&self, tx_id: TxId) -> StoreResult<Staker> {
        self.access.read(tx_id)
    }

    fn get_all(&self) -> StoreResult<Vec<Staker>> {
        self.access.iterator().map(|res| res.map(|(_, staker)| staker)).collect()
    }
}

impl StakersStore for DbStakersStore {
    fn insert_batch(&self, batch: &mut WriteBatch, staker: &Staker) -> StoreResult<()> {
        self.access.write(BatchDbWriter::new(batch), staker.tx_id, staker.clone())
    }

    fn delete_batch(&self, batch: &mut WriteBatch, tx_id: TxId) -> StoreResult<()> {
        self.access.delete(BatchDbWriter::new(batch), tx_id)
    }
}

/// The staker sets, laid out as `[Validators, Current | Pending, <kind>]`
#[derive(Clone)]
pub struct DbStakerSets {
    current_validators: DbStakersStore,
    current_delegators: DbStakersStore,
    current_subnet_validators: DbStakersStore,
    current_subnet_delegators: DbStakersStore,
    pending_validators: DbStakersStore,
    pending_delegators: DbStakersStore,
    pending_subnet_validators: DbStakersStore,
    pending_subnet_delegators: DbStakersStore,
}

impl DbStakerSets {
    pub fn new(db: Arc<DB>) -> Self {
        use DatabaseStorePrefixes::{Current, Delegator, Pending, SubnetDelegator, SubnetValidator, Validator, Validators};
        let store = |set, kind| DbStakersStore::new(db.clone(), nested_prefix(&[Validators, set, kind]));
        Self {
            current_validators: store(Current, Validator),
            current_delegators: store(Current, Delegator),
            current_subnet_validators: store(Current, SubnetValidator),
            current_subnet_delegators: store(Current, SubnetDelegator),
            pending_validators: store(Pending, Validator),
            pending_delegators: store(Pending, Delegator),
            pending_subnet_validators: store(Pending, SubnetValidator),
            pending_subnet_delegators: store(Pending, SubnetDelegator),
        }
    }

    /// Returns the store holding `staker`, picked by its priority and subnet
    pub fn store_of(&self, staker: &Staker) -> &DbStakersStore {
        match (staker.is_current(), staker.is_validator(), staker.is_primary_network()) {
            (true, true, true) => &self.current_validators,
            (true, false, true) => &self.current_delegators,
            (true, true, false) => &self.current_subnet_validators,
            (true, false, false) => &self.current_subnet_delegators,
            (false, true, true) => &self.pending_validators,
            (false, false, true) => &self.pending_delegators,
            (false, true, false) => &self.pending_subnet_validators,
            (false, false, false) => &self.pending_subnet_delegators,
        }
    }

    pub fn all_current(&self) -> StoreResult<Vec<Staker>> {
        Self::load(&[&self.current_validators, &self.current_delegators, &self.current_subnet_validators, &self.current_subnet_delegators])
    }

    pub fn all_pending(&self) -> StoreResult<Vec<Staker>> {
        Self::load(&[&self.pending_validators, &self.pending_delegators, &self.pending_subnet_validators, &self.pending_subnet_delegators])
    }

    fn load(stores: &[&DbStakersStore]) -> StoreResult<Vec<Staker>> {
        let mut stakers = Vec::new();
        for store in stores {
            stakers.extend(store.get_all()?);
        }
        Ok(stakers)
    }
}
