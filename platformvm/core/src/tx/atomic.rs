use super::BaseTx;
use crate::{
    ids::ChainId,
    utxo::{TransferableInput, TransferableOutput},
};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Consumes UTXOs exported to this chain by `source_chain`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ImportTx {
    pub base: BaseTx,
    pub source_chain: ChainId,
    pub imported_inputs: Vec<TransferableInput>,
}

/// Moves funds into the shared memory of `destination_chain`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ExportTx {
    pub base: BaseTx,
    pub destination_chain: ChainId,
    pub exported_outputs: Vec<TransferableOutput>,
}
