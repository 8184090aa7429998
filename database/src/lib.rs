mod access;
mod cache;
mod db;
mod errors;
mod item;
mod key;
mod writer;

pub mod registry;
pub mod utils;

pub mod prelude {
    use crate::{db, errors};

    pub use super::access::{CachedDbAccess, KeyDataResult};
    pub use super::cache::{Cache, CachePolicy};
    pub use super::item::CachedDbItem;
    pub use super::key::DbKey;
    pub use super::writer::{BatchDbWriter, DbWriter, DirectDbWriter, MemoryWriter};
    pub use db::{ConnBuilder, DB, delete_db};
    pub use errors::{StoreError, StoreErrorPredicates, StoreResult, StoreResultExt};
}
