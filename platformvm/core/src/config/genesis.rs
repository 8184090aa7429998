use super::params::Params;
use crate::{
    codec::{self, CodecError},
    ids::{Hash, NodeId, PRIMARY_NETWORK_ID, VmId},
    tx::{
        BaseTx, Tx, UnsignedTx,
        staking::{AddPermissionlessValidatorTx, AddValidatorTx, PublicKey, Validator},
        subnet::CreateChainTx,
    },
    utxo::{OutputOwners, TransferableOutput, Utxo, UtxoId},
};
use borsh::{BorshDeserialize, BorshSerialize};
use omega_hashes::sha256;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct GenesisAllocation {
    pub owners: OutputOwners,
    pub amount: u64,
}

/// A primary network validator which is current from the genesis timestamp on
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct GenesisValidator {
    pub node_id: NodeId,
    pub weight: u64,
    pub end_time: u64,
    pub rewards_owner: OutputOwners,
    pub delegation_shares: u32,
    pub public_key: Option<PublicKey>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct GenesisChain {
    pub chain_name: String,
    pub vm_id: VmId,
    pub genesis_data: Vec<u8>,
}

/// Initial content of the chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Genesis {
    pub timestamp: u64,
    pub allocations: Vec<GenesisAllocation>,
    pub validators: Vec<GenesisValidator>,
    pub chains: Vec<GenesisChain>,
    pub message: String,
}

/// The genesis expanded into UTXOs and txs, ready to be written to an empty state
#[derive(Clone, Debug)]
pub struct GenesisState {
    pub genesis_id: Hash,
    pub timestamp: u64,
    pub initial_supply: u64,
    pub utxos: Vec<Utxo>,
    pub validators: Vec<Tx>,
    pub chains: Vec<Tx>,
}

impl Genesis {
    pub fn id(&self) -> Result<Hash, CodecError> {
        Ok(sha256(codec::encode(self)?))
    }

    pub fn build(&self, params: &Params) -> Result<GenesisState, CodecError> {
        let genesis_id = self.id()?;
        let base = || BaseTx { network_id: params.network_id, blockchain_id: params.chain_id, ..Default::default() };

        let utxos: Vec<Utxo> = self
            .allocations
            .iter()
            .enumerate()
            .map(|(i, alloc)| {
                Utxo::new(UtxoId::new(genesis_id, i as u32), &TransferableOutput::new(params.fee_asset_id, alloc.amount, alloc.owners.clone()))
            })
            .collect();

        let validators: Vec<Tx> = self
            .validators
            .iter()
            .map(|v| {
                let validator = Validator { node_id: v.node_id, start: self.timestamp, end: v.end_time, weight: v.weight };
                let stake_outs = vec![TransferableOutput::new(params.fee_asset_id, v.weight, v.rewards_owner.clone())];
                let unsigned = match &v.public_key {
                    Some(key) => UnsignedTx::AddPermissionlessValidator(AddPermissionlessValidatorTx {
                        base: base(),
                        validator,
                        subnet_id: PRIMARY_NETWORK_ID,
                        signer: Some(key.clone()),
                        stake_outs,
                        validator_rewards_owner: v.rewards_owner.clone(),
                        delegator_rewards_owner: v.rewards_owner.clone(),
                        delegation_shares: v.delegation_shares,
                    }),
                    None => UnsignedTx::AddValidator(AddValidatorTx {
                        base: base(),
                        validator,
                        stake_outs,
                        rewards_owner: v.rewards_owner.clone(),
                        delegation_shares: v.delegation_shares,
                    }),
                };
                Tx::new(unsigned, vec![])
            })
            .collect();

        let chains = self
            .chains
            .iter()
            .map(|chain| {
                Tx::new(
                    UnsignedTx::CreateChain(CreateChainTx {
                        base: base(),
                        subnet_id: PRIMARY_NETWORK_ID,
                        chain_name: chain.chain_name.clone(),
                        vm_id: chain.vm_id,
                        fx_ids: vec![],
                        genesis_data: chain.genesis_data.clone(),
                        subnet_auth: Default::default(),
                    }),
                    vec![],
                )
            })
            .collect();

        let initial_supply = self
            .allocations
            .iter()
            .map(|a| a.amount)
            .chain(self.validators.iter().map(|v| v.weight))
            .fold(0u64, |acc, amount| acc.saturating_add(amount));

        Ok(GenesisState { genesis_id, timestamp: self.timestamp, initial_supply, utxos, validators, chains })
    }
}
