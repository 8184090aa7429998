pub mod atomic;
pub mod staking;
pub mod subnet;

use crate::{
    codec::{self, CodecError},
    config::params::Params,
    constants::{MAX_MEMO_SIZE, PERCENT_DENOMINATOR},
    errors::tx::{TxError, TxResult},
    ids::{ChainId, PRIMARY_NETWORK_ID, TxId},
    utxo::{TransferableInput, TransferableOutput, UtxoId},
};
use atomic::{ExportTx, ImportTx};
use borsh::{BorshDeserialize, BorshSerialize};
use omega_hashes::Sha256Hasher;
use serde::{Deserialize, Serialize};
use staking::{
    AddDelegatorTx, AddPermissionlessDelegatorTx, AddPermissionlessValidatorTx, AddSubnetValidatorTx, AddValidatorTx, ScheduledStaker,
};
use std::{
    collections::HashSet,
    io::{Read, Write},
};
use subnet::{CreateChainTx, CreateSubnetTx, RemoveSubnetValidatorTx, TransformSubnetTx};

/// Fields shared by every value-moving tx
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct BaseTx {
    pub network_id: u32,
    pub blockchain_id: ChainId,
    pub outs: Vec<TransferableOutput>,
    pub ins: Vec<TransferableInput>,
    pub memo: Vec<u8>,
}

/// Signatures authorizing one input. Verified before txs reach this crate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Credential {
    pub signatures: Vec<Vec<u8>>,
}

/// Proposes moving the chain time forward. Only valid before Banff.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct AdvanceTimeTx {
    pub time: u64,
}

/// Removes the current staker created by `tx_id`, rewarding it on commit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct RewardValidatorTx {
    pub tx_id: TxId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum UnsignedTx {
    AddValidator(AddValidatorTx),
    AddSubnetValidator(AddSubnetValidatorTx),
    AddDelegator(AddDelegatorTx),
    AddPermissionlessValidator(AddPermissionlessValidatorTx),
    AddPermissionlessDelegator(AddPermissionlessDelegatorTx),
    RemoveSubnetValidator(RemoveSubnetValidatorTx),
    CreateSubnet(CreateSubnetTx),
    CreateChain(CreateChainTx),
    TransformSubnet(TransformSubnetTx),
    Import(ImportTx),
    Export(ExportTx),
    AdvanceTime(AdvanceTimeTx),
    RewardValidator(RewardValidatorTx),
}

impl UnsignedTx {
    pub fn name(&self) -> &'static str {
        match self {
            UnsignedTx::AddValidator(_) => "AddValidatorTx",
            UnsignedTx::AddSubnetValidator(_) => "AddSubnetValidatorTx",
            UnsignedTx::AddDelegator(_) => "AddDelegatorTx",
            UnsignedTx::AddPermissionlessValidator(_) => "AddPermissionlessValidatorTx",
            UnsignedTx::AddPermissionlessDelegator(_) => "AddPermissionlessDelegatorTx",
            UnsignedTx::RemoveSubnetValidator(_) => "RemoveSubnetValidatorTx",
            UnsignedTx::CreateSubnet(_) => "CreateSubnetTx",
            UnsignedTx::CreateChain(_) => "CreateChainTx",
            UnsignedTx::TransformSubnet(_) => "TransformSubnetTx",
            UnsignedTx::Import(_) => "ImportTx",
            UnsignedTx::Export(_) => "ExportTx",
            UnsignedTx::AdvanceTime(_) => "AdvanceTimeTx",
            UnsignedTx::RewardValidator(_) => "RewardValidatorTx",
        }
    }

    pub fn base(&self) -> Option<&BaseTx> {
        match self {
            UnsignedTx::AddValidator(tx) => Some(&tx.base),
            UnsignedTx::AddSubnetValidator(tx) => Some(&tx.base),
            UnsignedTx::AddDelegator(tx) => Some(&tx.base),
            UnsignedTx::AddPermissionlessValidator(tx) => Some(&tx.base),
            UnsignedTx::AddPermissionlessDelegator(tx) => Some(&tx.base),
            UnsignedTx::RemoveSubnetValidator(tx) => Some(&tx.base),
            UnsignedTx::CreateSubnet(tx) => Some(&tx.base),
            UnsignedTx::CreateChain(tx) => Some(&tx.base),
            UnsignedTx::TransformSubnet(tx) => Some(&tx.base),
            UnsignedTx::Import(tx) => Some(&tx.base),
            UnsignedTx::Export(tx) => Some(&tx.base),
            UnsignedTx::AdvanceTime(_) | UnsignedTx::RewardValidator(_) => None,
        }
    }

    pub fn scheduled_staker(&self) -> Option<&dyn ScheduledStaker> {
        match self {
            UnsignedTx::AddValidator(tx) => Some(tx),
            UnsignedTx::AddSubnetValidator(tx) => Some(tx),
            UnsignedTx::AddDelegator(tx) => Some(tx),
            UnsignedTx::AddPermissionlessValidator(tx) => Some(tx),
            UnsignedTx::AddPermissionlessDelegator(tx) => Some(tx),
            _ => None,
        }
    }

    /// Whether the tx carries a subnet owner credential after the input credentials
    pub fn has_subnet_auth(&self) -> bool {
        matches!(
            self,
            UnsignedTx::AddSubnetValidator(_)
                | UnsignedTx::RemoveSubnetValidator(_)
                | UnsignedTx::CreateChain(_)
                | UnsignedTx::TransformSubnet(_)
        )
    }

    /// Whether the tx only exists in proposal blocks
    pub fn is_proposal_only(&self) -> bool {
        matches!(self, UnsignedTx::AdvanceTime(_) | UnsignedTx::RewardValidator(_))
    }

    /// Every UTXO consumed by the tx, including imported ones
    pub fn consumed_utxos(&self) -> Vec<UtxoId> {
        let mut consumed: Vec<UtxoId> = self.base().map(|base| base.ins.iter().map(|input| input.utxo_id).collect()).unwrap_or_default();
        if let UnsignedTx::Import(tx) = self {
            consumed.extend(tx.imported_inputs.iter().map(|input| input.utxo_id));
        }
        consumed
    }

    pub fn num_expected_credentials(&self) -> usize {
        self.consumed_utxos().len() + self.has_subnet_auth() as usize
    }

    /// Checks everything that can be checked without chain state
    pub fn verify_syntax(&self, params: &Params) -> TxResult<()> {
        if let Some(base) = self.base() {
            verify_base(base, params)?;
        }

        let mut seen = HashSet::new();
        for utxo_id in self.consumed_utxos() {
            if !seen.insert(utxo_id) {
                return Err(TxError::DuplicateInput(utxo_id));
            }
        }

        if let Some(staker) = self.scheduled_staker() {
            if staker.weight() == 0 {
                return Err(TxError::ZeroWeight);
            }
            if let Some(shares) = staker.delegation_shares() {
                if shares as u64 > PERCENT_DENOMINATOR {
                    return Err(TxError::TooManyShares(shares, PERCENT_DENOMINATOR));
                }
            }
            verify_outputs(staker.stake())?;
            if !staker.stake().is_empty() {
                let staked = staker.stake().iter().try_fold(0u64, |acc, out| acc.checked_add(out.amount())).ok_or(TxError::Overflow)?;
                if staked != staker.weight() {
                    return Err(TxError::StakeWeightMismatch(staked, staker.weight()));
                }
            }
            for owners in [staker.rewards_owner(), staker.delegation_rewards_owner()].into_iter().flatten() {
                owners.verify()?;
            }
            if staker.public_key().is_some() && staker.subnet_id() != PRIMARY_NETWORK_ID {
                return Err(TxError::PublicKeyNotAllowed);
            }
        }

        match self {
            UnsignedTx::AddSubnetValidator(tx) if tx.validator.subnet_id == PRIMARY_NETWORK_ID => {
                Err(TxError::PrimaryNetworkNotAllowed(self.name()))
            }
            UnsignedTx::RemoveSubnetValidator(tx) if tx.subnet_id == PRIMARY_NETWORK_ID => Err(TxError::PrimaryNetworkNotAllowed(self.name())),
            UnsignedTx::TransformSubnet(tx) if tx.subnet_id == PRIMARY_NETWORK_ID => Err(TxError::PrimaryNetworkNotAllowed(self.name())),
            UnsignedTx::TransformSubnet(tx) => tx.verify_fields(params.fee_asset_id),
            UnsignedTx::CreateChain(tx) if tx.subnet_id == PRIMARY_NETWORK_ID => Err(TxError::PrimaryNetworkNotAllowed(self.name())),
            UnsignedTx::CreateChain(tx) => tx.verify_fields(),
            UnsignedTx::CreateSubnet(tx) => tx.owner.verify(),
            UnsignedTx::Import(tx) => {
                if tx.imported_inputs.is_empty() {
                    return Err(TxError::EmptyAtomicTx);
                }
                if tx.source_chain == params.chain_id {
                    return Err(TxError::SameChainAtomicTx(tx.source_chain));
                }
                tx.imported_inputs.iter().try_for_each(verify_input)
            }
            UnsignedTx::Export(tx) => {
                if tx.exported_outputs.is_empty() {
                    return Err(TxError::EmptyAtomicTx);
                }
                if tx.destination_chain == params.chain_id {
                    return Err(TxError::SameChainAtomicTx(tx.destination_chain));
                }
                verify_outputs(&tx.exported_outputs)
            }
            _ => Ok(()),
        }
    }
}

fn verify_base(base: &BaseTx, params: &Params) -> TxResult<()> {
    if base.network_id != params.network_id {
        return Err(TxError::WrongNetworkId(params.network_id, base.network_id));
    }
    if base.blockchain_id != params.chain_id {
        return Err(TxError::WrongChainId(params.chain_id, base.blockchain_id));
    }
    if base.memo.len() > MAX_MEMO_SIZE {
        return Err(TxError::MemoTooLarge(base.memo.len(), MAX_MEMO_SIZE));
    }
    verify_outputs(&base.outs)?;
    base.ins.iter().try_for_each(verify_input)
}

fn verify_outputs(outputs: &[TransferableOutput]) -> TxResult<()> {
    for output in outputs {
        if output.amount() == 0 {
            return Err(TxError::ZeroAmountOutput);
        }
        output.output.owners.verify()?;
    }
    Ok(())
}

fn verify_input(input: &TransferableInput) -> TxResult<()> {
    if input.amount == 0 {
        return Err(TxError::ZeroAmountInput(input.utxo_id));
    }
    Ok(())
}

/// A signed tx. The id is the hash of the signed bytes and is computed on construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tx {
    id: TxId,
    unsigned: UnsignedTx,
    creds: Vec<Credential>,
}

impl Tx {
    pub fn new(unsigned: UnsignedTx, creds: Vec<Credential>) -> Self {
        let id = compute_tx_id(&unsigned, &creds);
        Self { id, unsigned, creds }
    }

    pub fn id(&self) -> TxId {
        self.id
    }

    pub fn unsigned(&self) -> &UnsignedTx {
        &self.unsigned
    }

    pub fn creds(&self) -> &[Credential] {
        &self.creds
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        codec::encode(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        codec::decode(bytes)
    }

    /// Id of the `index`-th output created by this tx, counting `base.outs` first
    pub fn utxo_id(&self, index: u32) -> UtxoId {
        UtxoId::new(self.id, index)
    }

    pub fn verify_credentials(&self) -> TxResult<()> {
        let expected = self.unsigned.num_expected_credentials();
        if self.creds.len() != expected {
            return Err(TxError::WrongNumberOfCredentials(expected, self.creds.len()));
        }
        Ok(())
    }
}

struct HashWriter(Sha256Hasher);

impl Write for HashWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn compute_tx_id(unsigned: &UnsignedTx, creds: &[Credential]) -> TxId {
    let mut writer = HashWriter(Sha256Hasher::new());
    // Writing into a hasher cannot fail
    let _ = BorshSerialize::serialize(&codec::CODEC_VERSION.to_be_bytes(), &mut writer)
        .and_then(|_| BorshSerialize::serialize(unsigned, &mut writer))
        .and_then(|_| BorshSerialize::serialize(creds, &mut writer));
    writer.0.finalize()
}

impl BorshSerialize for Tx {
    fn serialize<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        BorshSerialize::serialize(&self.unsigned, writer)?;
        BorshSerialize::serialize(&self.creds, writer)
    }
}

impl BorshDeserialize for Tx {
    fn deserialize_reader<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let unsigned = UnsignedTx::deserialize_reader(reader)?;
        let creds = Vec::<Credential>::deserialize_reader(reader)?;
        Ok(Self::new(unsigned, creds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::params::LOCAL_PARAMS,
        ids::{AssetId, ShortId, SubnetId},
        tx::staking::{SubnetAuth, SubnetValidator, Validator},
        utxo::OutputOwners,
    };

    fn base(ins: Vec<TransferableInput>, outs: Vec<TransferableOutput>) -> BaseTx {
        BaseTx { network_id: LOCAL_PARAMS.network_id, blockchain_id: LOCAL_PARAMS.chain_id, outs, ins, memo: vec![] }
    }

    fn input(index: u32, amount: u64) -> TransferableInput {
        TransferableInput::new(UtxoId::new(TxId::from_u64_word(100), index), LOCAL_PARAMS.fee_asset_id, amount)
    }

    fn output(amount: u64) -> TransferableOutput {
        TransferableOutput::new(LOCAL_PARAMS.fee_asset_id, amount, OutputOwners::single(ShortId::from_u64_word(1)))
    }

    #[test]
    fn test_tx_id_covers_credentials() {
        let unsigned = UnsignedTx::CreateSubnet(CreateSubnetTx { base: base(vec![input(0, 10)], vec![]), owner: OutputOwners::default() });
        let a = Tx::new(unsigned.clone(), vec![Credential { signatures: vec![vec![1]] }]);
        let b = Tx::new(unsigned.clone(), vec![Credential { signatures: vec![vec![2]] }]);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id(), Tx::new(unsigned, vec![Credential { signatures: vec![vec![1]] }]).id());

        let parsed = Tx::from_bytes(&a.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, a);
        assert_eq!(parsed.id(), a.id());
    }

    #[test]
    fn test_credential_count() {
        let unsigned = UnsignedTx::AddSubnetValidator(AddSubnetValidatorTx {
            base: base(vec![input(0, 10), input(1, 10)], vec![]),
            validator: SubnetValidator {
                validator: Validator { node_id: ShortId::from_u64_word(1), start: 1, end: 2, weight: 1 },
                subnet_id: SubnetId::from_u64_word(5),
            },
            subnet_auth: SubnetAuth { sig_indices: vec![0] },
        });
        assert_eq!(unsigned.num_expected_credentials(), 3);
        let tx = Tx::new(unsigned.clone(), vec![Credential::default(); 2]);
        assert_eq!(tx.verify_credentials(), Err(TxError::WrongNumberOfCredentials(3, 2)));
        assert!(Tx::new(unsigned, vec![Credential::default(); 3]).verify_credentials().is_ok());
    }

    #[test]
    fn test_syntax_rules() {
        let params = &LOCAL_PARAMS;
        let tx = UnsignedTx::Export(ExportTx {
            base: base(vec![input(0, 10), input(0, 10)], vec![]),
            destination_chain: ChainId::from_u64_word(9),
            exported_outputs: vec![output(5)],
        });
        assert_eq!(tx.verify_syntax(params), Err(TxError::DuplicateInput(UtxoId::new(TxId::from_u64_word(100), 0))));

        let tx = UnsignedTx::Export(ExportTx {
            base: base(vec![input(0, 10)], vec![]),
            destination_chain: params.chain_id,
            exported_outputs: vec![output(5)],
        });
        assert_eq!(tx.verify_syntax(params), Err(TxError::SameChainAtomicTx(params.chain_id)));

        let mut wrong_network = base(vec![], vec![output(1)]);
        wrong_network.network_id += 1;
        let tx = UnsignedTx::CreateSubnet(CreateSubnetTx { base: wrong_network, owner: OutputOwners::default() });
        assert!(matches!(tx.verify_syntax(params), Err(TxError::WrongNetworkId(..))));

        let tx = UnsignedTx::CreateSubnet(CreateSubnetTx { base: base(vec![], vec![output(0)]), owner: OutputOwners::default() });
        assert_eq!(tx.verify_syntax(params), Err(TxError::ZeroAmountOutput));
    }

    #[test]
    fn test_stake_must_match_weight() {
        let params = &LOCAL_PARAMS;
        let mut tx = AddValidatorTx {
            base: base(vec![input(0, 100)], vec![]),
            validator: Validator { node_id: ShortId::from_u64_word(1), start: 1, end: 2, weight: 50 },
            stake_outs: vec![output(20), output(30)],
            rewards_owner: OutputOwners::single(ShortId::from_u64_word(1)),
            delegation_shares: 20_000,
        };
        assert!(UnsignedTx::AddValidator(tx.clone()).verify_syntax(params).is_ok());
        tx.stake_outs.pop();
        assert_eq!(UnsignedTx::AddValidator(tx.clone()).verify_syntax(params), Err(TxError::StakeWeightMismatch(20, 50)));
        tx.stake_outs.push(output(30));
        tx.delegation_shares = 2_000_000;
        assert!(matches!(UnsignedTx::AddValidator(tx).verify_syntax(params), Err(TxError::TooManyShares(..))));
    }

    #[test]
    fn test_permissionless_key_only_on_primary() {
        let params = &LOCAL_PARAMS;
        let tx = AddPermissionlessValidatorTx {
            base: base(vec![], vec![]),
            validator: Validator { node_id: ShortId::from_u64_word(1), start: 1, end: 2, weight: 5 },
            subnet_id: SubnetId::from_u64_word(3),
            signer: Some(staking::PublicKey(vec![0; 48])),
            stake_outs: vec![TransferableOutput::new(AssetId::from_u64_word(4), 5, OutputOwners::default())],
            validator_rewards_owner: OutputOwners::default(),
            delegator_rewards_owner: OutputOwners::default(),
            delegation_shares: 0,
        };
        assert_eq!(UnsignedTx::AddPermissionlessValidator(tx).verify_syntax(params), Err(TxError::PublicKeyNotAllowed));
    }
}
