use crate::registry::{DatabaseStorePrefixes, SEPARATOR};
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt::{Debug, Display};

/// A store key made of a prefix path (store prefix plus optional buckets) followed by the item key
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct DbKey {
    path: SmallVec<[u8; 40]>,
    prefix_len: usize,
}

impl DbKey {
    pub fn new<TKey>(prefix: &[u8], key: TKey) -> Self
    where
        TKey: AsRef<[u8]>,
    {
        Self { path: prefix.iter().chain(key.as_ref().iter()).copied().collect(), prefix_len: prefix.len() }
    }

    pub fn new_with_bucket<TBucket, TKey>(prefix: &[u8], bucket: TBucket, key: TKey) -> Self
    where
        TBucket: AsRef<[u8]>,
        TKey: AsRef<[u8]>,
    {
        let mut db_key = Self::prefix_only(prefix);
        db_key.add_bucket(bucket);
        db_key.add_key(key);
        db_key
    }

    pub fn prefix_only(prefix: &[u8]) -> Self {
        Self::new(prefix, [])
    }

    /// Appends a bucket to the prefix path
    pub fn add_bucket<TBucket>(&mut self, bucket: TBucket)
    where
        TBucket: AsRef<[u8]>,
    {
        self.path.extend(bucket.as_ref().iter().copied());
        self.prefix_len += bucket.as_ref().len();
    }

    pub fn add_key<TKey>(&mut self, key: TKey)
    where
        TKey: AsRef<[u8]>,
    {
        self.path.extend(key.as_ref().iter().copied());
    }

    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }
}

impl AsRef<[u8]> for DbKey {
    fn as_ref(&self) -> &[u8] {
        &self.path
    }
}

impl Display for DbKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut pos = 0;
        // Store prefixes may be nested (e.g. validators/current/delegator), print every named byte
        while pos < self.prefix_len {
            let byte = self.path[pos];
            match DatabaseStorePrefixes::from_u8(byte) {
                Some(prefix) if byte != SEPARATOR => {
                    if pos > 0 {
                        f.write_str("/")?;
                    }
                    f.write_str(&format!("{:?}", prefix))?;
                    pos += 1;
                }
                _ => break,
            }
        }
        if pos < self.path.len() {
            f.write_str("/")?;
            f.write_str(&faster_hex::hex_string(&self.path[pos..]))?;
        }
        Ok(())
    }
}

impl Debug for DbKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DatabaseStorePrefixes::*;
    use omega_hashes::Hash;

    #[test]
    fn test_key_display() {
        let key = DbKey::new(&[Validators as u8, Current as u8, Delegator as u8], Hash::from_u64_word(1));
        let shown = key.to_string();
        assert!(shown.starts_with("Validators/Current/Delegator/"));
        assert!(shown.ends_with("01"));

        let key = DbKey::new(&[Singletons as u8], [7u8]);
        assert_eq!(key.to_string(), "Singletons/07");
    }

    #[test]
    fn test_buckets() {
        let subnet = Hash::from_u64_word(3);
        let key = DbKey::new_with_bucket(&[Chains as u8], subnet, [0xaa, 0xbb]);
        assert_eq!(key.prefix_len(), 1 + 32);
        assert_eq!(key.as_ref().len(), 1 + 32 + 2);
        assert_eq!(&key.as_ref()[key.prefix_len()..], &[0xaa, 0xbb]);
    }
}
