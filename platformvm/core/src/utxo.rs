use crate::{
    errors::tx::{TxError, TxResult},
    ids::{Address, AssetId, TxId},
};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Size of the storage key of a [`UtxoId`]: tx id followed by the big endian output index
pub const UTXO_KEY_SIZE: usize = 32 + 4;

/// Points at a specific output of a transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct UtxoId {
    pub tx_id: TxId,
    pub output_index: u32,
}

impl UtxoId {
    pub fn new(tx_id: TxId, output_index: u32) -> Self {
        Self { tx_id, output_index }
    }

    pub fn key(&self) -> UtxoKey {
        UtxoKey::from(*self)
    }
}

impl Display for UtxoId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.tx_id, self.output_index)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UtxoKey([u8; UTXO_KEY_SIZE]);

impl From<UtxoId> for UtxoKey {
    fn from(id: UtxoId) -> Self {
        let mut bytes = [0u8; UTXO_KEY_SIZE];
        bytes[..32].copy_from_slice(id.tx_id.as_ref());
        bytes[32..].copy_from_slice(&id.output_index.to_be_bytes());
        Self(bytes)
    }
}

impl AsRef<[u8]> for UtxoKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Spending conditions of an output: a `threshold` out of `addresses` after `locktime`
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct OutputOwners {
    pub locktime: u64,
    pub threshold: u32,
    pub addresses: Vec<Address>,
}

impl OutputOwners {
    pub fn new(locktime: u64, threshold: u32, addresses: Vec<Address>) -> Self {
        Self { locktime, threshold, addresses }
    }

    /// A single-address owner without a locktime
    pub fn single(address: Address) -> Self {
        Self { locktime: 0, threshold: 1, addresses: vec![address] }
    }

    pub fn verify(&self) -> TxResult<()> {
        if self.threshold as usize > self.addresses.len() {
            return Err(TxError::InvalidOwners(format!("threshold {} exceeds {} addresses", self.threshold, self.addresses.len())));
        }
        if self.threshold == 0 && !self.addresses.is_empty() {
            return Err(TxError::InvalidOwners("zero threshold with non-empty addresses".to_string()));
        }
        if !self.addresses.windows(2).all(|w| w[0] < w[1]) {
            return Err(TxError::InvalidOwners("addresses are not sorted and unique".to_string()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct TransferOutput {
    pub amount: u64,
    pub owners: OutputOwners,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct TransferableOutput {
    pub asset_id: AssetId,
    pub output: TransferOutput,
}

impl TransferableOutput {
    pub fn new(asset_id: AssetId, amount: u64, owners: OutputOwners) -> Self {
        Self { asset_id, output: TransferOutput { amount, owners } }
    }

    pub fn amount(&self) -> u64 {
        self.output.amount
    }
}

/// Consumes a UTXO. Signatures over it are carried by the matching credential.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct TransferableInput {
    pub utxo_id: UtxoId,
    pub asset_id: AssetId,
    pub amount: u64,
}

impl TransferableInput {
    pub fn new(utxo_id: UtxoId, asset_id: AssetId, amount: u64) -> Self {
        Self { utxo_id, asset_id, amount }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Utxo {
    pub utxo_id: UtxoId,
    pub asset_id: AssetId,
    pub output: TransferOutput,
}

impl Utxo {
    pub fn new(utxo_id: UtxoId, output: &TransferableOutput) -> Self {
        Self { utxo_id, asset_id: output.asset_id, output: output.output.clone() }
    }

    pub fn amount(&self) -> u64 {
        self.output.amount
    }

    pub fn is_locked(&self, now: u64) -> bool {
        self.output.owners.locktime > now
    }
}
