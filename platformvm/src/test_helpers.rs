//! Fixtures shared by the unit tests of this crate

use crate::state::{ChainReader, base::State};
use omega_database::{
    create_temp_db,
    prelude::{ConnBuilder, DB},
    utils::DbLifetime,
};
use omega_platformvm_core::{
    config::{
        Config, ConfigBuilder,
        genesis::{Genesis, GenesisAllocation, GenesisChain, GenesisValidator},
        params::{LOCAL_PARAMS, MintConfig, OMEGA_ASSET_ID},
    },
    ids::{Address, NodeId, PRIMARY_NETWORK_ID, SubnetId, TxId, VmId},
    staker::Staker,
    tx::{
        BaseTx, Credential, Tx, UnsignedTx,
        staking::{AddDelegatorTx, AddSubnetValidatorTx, AddValidatorTx, PublicKey, SubnetAuth, SubnetValidator, Validator},
    },
    utxo::{OutputOwners, TransferableInput, TransferableOutput, Utxo, UtxoId},
};
use parking_lot::RwLock;
use std::sync::Arc;

pub const DAY: u64 = 24 * 60 * 60;
pub const YEAR: u64 = 365 * DAY;
pub const GENESIS_TIME: u64 = 1_700_000_000;
pub const GENESIS_VALIDATOR_WEIGHT: u64 = 1_000_000;
pub const GENESIS_VALIDATOR_END: u64 = GENESIS_TIME + YEAR;
pub const ALLOCATION_AMOUNT: u64 = 10_000_000;
pub const ALLOCATIONS: u32 = 8;
/// Minted units per second over the whole primary network
pub const MINT_PER_SECOND: u64 = 100;

pub fn node(n: u64) -> NodeId {
    NodeId::from_u64_word(n)
}

pub fn owner() -> OutputOwners {
    OutputOwners::single(Address::from_u64_word(0xabc))
}

pub fn base_tx(ins: Vec<TransferableInput>, outs: Vec<TransferableOutput>) -> BaseTx {
    BaseTx { network_id: LOCAL_PARAMS.network_id, blockchain_id: LOCAL_PARAMS.chain_id, outs, ins, memo: vec![] }
}

pub fn output(amount: u64) -> TransferableOutput {
    TransferableOutput::new(OMEGA_ASSET_ID, amount, owner())
}

pub fn spend(utxo: &Utxo) -> TransferableInput {
    TransferableInput::new(utxo.utxo_id, utxo.asset_id, utxo.amount())
}

pub fn test_config() -> Config {
    ConfigBuilder::new(LOCAL_PARAMS)
        .edit_consensus_params(|p| {
            p.mint = MintConfig { mint_amount: MINT_PER_SECOND * YEAR, mint_period: YEAR, mint_since: 0, mint_until: u64::MAX }
        })
        .build()
}

pub fn test_genesis() -> Genesis {
    let validator = |n: u64, public_key: Option<PublicKey>| GenesisValidator {
        node_id: node(n),
        weight: GENESIS_VALIDATOR_WEIGHT,
        end_time: GENESIS_VALIDATOR_END,
        rewards_owner: owner(),
        delegation_shares: 20_000,
        public_key,
    };
    Genesis {
        timestamp: GENESIS_TIME,
        allocations: (0..ALLOCATIONS).map(|_| GenesisAllocation { owners: owner(), amount: ALLOCATION_AMOUNT }).collect(),
        validators: vec![validator(1, None), validator(2, Some(PublicKey(vec![2; 48])))],
        chains: vec![GenesisChain { chain_name: "x chain".to_string(), vm_id: VmId::from_u64_word(1), genesis_data: vec![] }],
        message: "test".to_string(),
    }
}

fn scheduled_validator(n: u64, start: u64, end: u64, weight: u64) -> Validator {
    Validator { node_id: node(n), start, end, weight }
}

/// An unfunded primary network validator tx
pub fn validator_tx(n: u64, start: u64, end: u64, weight: u64) -> Tx {
    Tx::new(
        UnsignedTx::AddValidator(AddValidatorTx {
            base: base_tx(vec![], vec![]),
            validator: scheduled_validator(n, start, end, weight),
            stake_outs: vec![output(weight)],
            rewards_owner: owner(),
            delegation_shares: 20_000,
        }),
        vec![],
    )
}

pub fn subnet_validator_tx(n: u64, subnet_id: SubnetId, start: u64, end: u64, weight: u64) -> Tx {
    Tx::new(
        UnsignedTx::AddSubnetValidator(AddSubnetValidatorTx {
            base: base_tx(vec![], vec![]),
            validator: SubnetValidator { validator: scheduled_validator(n, start, end, weight), subnet_id },
            subnet_auth: SubnetAuth { sig_indices: vec![0] },
        }),
        vec![],
    )
}

pub fn delegator_tx(n: u64, start: u64, end: u64, weight: u64) -> Tx {
    Tx::new(
        UnsignedTx::AddDelegator(AddDelegatorTx {
            base: base_tx(vec![], vec![]),
            validator: scheduled_validator(n, start, end, weight),
            stake_outs: vec![output(weight)],
            rewards_owner: owner(),
        }),
        vec![],
    )
}

/// A primary network validator tx paying its stake out of `funds`
pub fn funded_validator_tx(funds: &Utxo, n: u64, start: u64, end: u64, weight: u64) -> Tx {
    Tx::new(
        UnsignedTx::AddValidator(AddValidatorTx {
            base: base_tx(vec![spend(funds)], vec![output(funds.amount() - weight)]),
            validator: scheduled_validator(n, start, end, weight),
            stake_outs: vec![output(weight)],
            rewards_owner: owner(),
            delegation_shares: 20_000,
        }),
        vec![Credential::default()],
    )
}

pub fn funded_delegator_tx(funds: &Utxo, n: u64, start: u64, end: u64, weight: u64) -> Tx {
    Tx::new(
        UnsignedTx::AddDelegator(AddDelegatorTx {
            base: base_tx(vec![spend(funds)], vec![output(funds.amount() - weight)]),
            validator: scheduled_validator(n, start, end, weight),
            stake_outs: vec![output(weight)],
            rewards_owner: owner(),
        }),
        vec![Credential::default()],
    )
}

pub fn pending_staker(tx: &Tx) -> Staker {
    Staker::new_pending(tx.id(), tx.unsigned().scheduled_staker().unwrap()).unwrap()
}

pub fn current_staker(tx: &Tx) -> Staker {
    Staker::new_current(tx.id(), tx.unsigned().scheduled_staker().unwrap(), 0).unwrap()
}

/// A genesis initialized state over a temporary database
pub struct TestState {
    pub config: Arc<Config>,
    pub genesis: Genesis,
    pub db: Arc<DB>,
    pub state: Arc<RwLock<State>>,
    // Dropped last so that every db reference is gone by then
    lifetime: DbLifetime,
}

impl TestState {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let (lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let genesis = test_genesis();
        let state = State::new(db.clone(), &config, &genesis).unwrap();
        Self { config: Arc::new(config), genesis, db, state: Arc::new(RwLock::new(state)), lifetime }
    }

    pub fn genesis_timestamp(&self) -> u64 {
        self.genesis.timestamp
    }

    /// Drops the in-memory state and loads it back from the database
    pub fn reopen(self) -> Self {
        let Self { config, genesis, db, state, lifetime } = self;
        drop(state);
        let state = State::new(db.clone(), &config, &genesis).unwrap();
        Self { config, genesis, db, state: Arc::new(RwLock::new(state)), lifetime }
    }

    /// The `index`-th genesis allocation
    pub fn genesis_utxo(&self, index: u32) -> Utxo {
        let genesis_id = self.genesis.id().unwrap();
        Utxo::new(UtxoId::new(genesis_id, index), &output(ALLOCATION_AMOUNT))
    }

    pub fn genesis_validator_tx_id(&self, n: u64) -> TxId {
        self.state.read().current_validator(PRIMARY_NETWORK_ID, node(n)).unwrap().tx_id
    }
}
