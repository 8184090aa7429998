use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Debug, Display, Formatter},
    str::FromStr,
};

pub use omega_hashes::{Hash, ZERO_HASH};

pub type BlockId = Hash;
pub type TxId = Hash;
pub type SubnetId = Hash;
pub type ChainId = Hash;
pub type AssetId = Hash;
pub type VmId = Hash;

/// The primary network is the subnet every validator must validate
pub const PRIMARY_NETWORK_ID: SubnetId = ZERO_HASH;

/// The platform chain itself
pub const PLATFORM_CHAIN_ID: ChainId = ZERO_HASH;

pub const SHORT_ID_SIZE: usize = 20;

/// A 20-byte identifier used for node IDs and owner addresses
#[derive(PartialEq, Eq, Clone, Copy, Hash, Default, PartialOrd, Ord, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ShortId([u8; SHORT_ID_SIZE]);

pub type NodeId = ShortId;
pub type Address = ShortId;

impl ShortId {
    pub const fn from_bytes(bytes: [u8; SHORT_ID_SIZE]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> [u8; SHORT_ID_SIZE] {
        self.0
    }

    /// Builds an ID whose last 8 bytes are `word` in big endian. Mostly useful in tests.
    pub const fn from_u64_word(word: u64) -> Self {
        let mut bytes = [0u8; SHORT_ID_SIZE];
        let word = word.to_be_bytes();
        let mut i = 0;
        while i < 8 {
            bytes[SHORT_ID_SIZE - 8 + i] = word[i];
            i += 1;
        }
        Self(bytes)
    }
}

impl AsRef<[u8]> for ShortId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for ShortId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut hex = [0u8; SHORT_ID_SIZE * 2];
        faster_hex::hex_encode(&self.0, &mut hex).map_err(|_| std::fmt::Error)?;
        f.write_str(std::str::from_utf8(&hex).map_err(|_| std::fmt::Error)?)
    }
}

impl Debug for ShortId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl FromStr for ShortId {
    type Err = faster_hex::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; SHORT_ID_SIZE];
        faster_hex::hex_decode(s.as_bytes(), &mut bytes)?;
        Ok(Self(bytes))
    }
}

/// Key of a (node, subnet) pair, used by stores tracking per-validator data
pub fn node_subnet_key(node_id: &NodeId, subnet_id: &SubnetId) -> [u8; SHORT_ID_SIZE + 32] {
    let mut key = [0u8; SHORT_ID_SIZE + 32];
    key[..SHORT_ID_SIZE].copy_from_slice(node_id.as_ref());
    key[SHORT_ID_SIZE..].copy_from_slice(subnet_id.as_ref());
    key
}
