use crate::Hash;
use sha2::{Digest, Sha256};

pub trait Hasher {
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self;

    fn finalize(&mut self) -> Hash;

    fn hash<A: AsRef<[u8]>>(data: A) -> Hash
    where
        Self: Default,
    {
        let mut hasher = Self::default();
        hasher.update(data);
        hasher.finalize()
    }
}

/// SHA-256 hasher producing content identifiers.
#[derive(Clone, Default)]
pub struct Sha256Hasher(Sha256);

impl Sha256Hasher {
    #[inline]
    pub fn new() -> Self {
        Self(Sha256::new())
    }

    #[inline]
    pub fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
        self.0.update(data.as_ref());
        self
    }

    #[inline]
    pub fn finalize(&mut self) -> Hash {
        let digest = std::mem::take(&mut self.0).finalize();
        let mut bytes = [0u8; crate::HASH_SIZE];
        bytes.copy_from_slice(&digest);
        Hash::from_bytes(bytes)
    }
}

impl Hasher for Sha256Hasher {
    #[inline(always)]
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
        Sha256Hasher::update(self, data)
    }

    #[inline(always)]
    fn finalize(&mut self) -> Hash {
        Sha256Hasher::finalize(self)
    }
}

/// Hashes `data` with SHA-256.
#[inline]
pub fn sha256(data: impl AsRef<[u8]>) -> Hash {
    Sha256Hasher::hash(data)
}
