use omega_core::{log::try_init_logger, time::MockClock};
use omega_database::{
    create_temp_db,
    prelude::{ConnBuilder, DB},
    utils::DbLifetime,
};
use omega_platformvm::{
    atomic::DbSharedMemory,
    mempool::Mempool,
    pipeline::{Backend, Manager},
    processes::{tx_executor::TxExecutor, uptime::UptimeManager, validators::ValidatorsManager},
    state::base::State,
};
use omega_platformvm_core::{
    block::{Block, BlockKind},
    config::{
        Config, ConfigBuilder,
        genesis::{Genesis, GenesisAllocation, GenesisValidator},
        params::{LOCAL_PARAMS, MintConfig, OMEGA_ASSET_ID},
    },
    ids::{Address, NodeId},
    tx::{
        BaseTx, Credential, Tx, UnsignedTx,
        staking::{AddValidatorTx, Validator},
    },
    utxo::{OutputOwners, TransferableInput, TransferableOutput, Utxo, UtxoId},
};
use parking_lot::RwLock;
use std::sync::Arc;

pub const DAY: u64 = 24 * 60 * 60;
pub const YEAR: u64 = 365 * DAY;
pub const GENESIS_TIME: u64 = 1_650_000_000;
pub const ALLOCATION_AMOUNT: u64 = 50_000_000;

pub fn owner() -> OutputOwners {
    OutputOwners::single(Address::from_u64_word(0x0e0e))
}

pub fn output(amount: u64) -> TransferableOutput {
    TransferableOutput::new(OMEGA_ASSET_ID, amount, owner())
}

pub fn config() -> Config {
    ConfigBuilder::new(LOCAL_PARAMS)
        .edit_consensus_params(|p| p.mint = MintConfig { mint_amount: 1000 * YEAR, mint_period: YEAR, mint_since: 0, mint_until: u64::MAX })
        .build()
}

pub fn genesis() -> Genesis {
    Genesis {
        timestamp: GENESIS_TIME,
        allocations: (0..4).map(|_| GenesisAllocation { owners: owner(), amount: ALLOCATION_AMOUNT }).collect(),
        validators: (1..=3)
            .map(|n| GenesisValidator {
                node_id: NodeId::from_u64_word(n),
                weight: 2_000_000,
                end_time: GENESIS_TIME + YEAR,
                rewards_owner: owner(),
                delegation_shares: 50_000,
                public_key: None,
            })
            .collect(),
        chains: vec![],
        message: "integration".to_string(),
    }
}

/// A primary network validator of `node` staking `weight` out of `funds`
pub fn validator_tx(funds: &Utxo, node: u64, start: u64, end: u64, weight: u64) -> Tx {
    let unsigned = UnsignedTx::AddValidator(AddValidatorTx {
        base: BaseTx {
            network_id: LOCAL_PARAMS.network_id,
            blockchain_id: LOCAL_PARAMS.chain_id,
            outs: vec![output(funds.amount() - weight)],
            ins: vec![TransferableInput::new(funds.utxo_id, funds.asset_id, funds.amount())],
            memo: vec![],
        },
        validator: Validator { node_id: NodeId::from_u64_word(node), start, end, weight },
        stake_outs: vec![output(weight)],
        rewards_owner: owner(),
        delegation_shares: 50_000,
    });
    Tx::new(unsigned, vec![Credential::default()])
}

/// A chain over a temporary database, driven through its block manager with a mock clock
pub struct Harness {
    pub config: Arc<Config>,
    pub genesis: Genesis,
    pub db: Arc<DB>,
    pub state: Arc<RwLock<State>>,
    pub clock: Arc<MockClock>,
    pub manager: Manager,
    pub lifetime: DbLifetime,
}

impl Harness {
    pub fn new(now: u64) -> Self {
        try_init_logger("info");
        let (lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let config = Arc::new(config());
        let genesis = genesis();
        let state = Arc::new(RwLock::new(State::new(db.clone(), &config, &genesis).unwrap()));
        let clock = Arc::new(MockClock::new(now));
        let manager = manager(&config, &db, &state, &clock);
        Self { config, genesis, db, state, clock, manager, lifetime }
    }

    /// The `index`-th genesis allocation
    pub fn funds(&self, index: u32) -> Utxo {
        Utxo::new(UtxoId::new(self.genesis.id().unwrap(), index), &output(ALLOCATION_AMOUNT))
    }

    /// Builds, verifies and accepts the next block, along with the preferred option of a proposal
    pub fn build_and_accept(&self) -> Vec<Block> {
        let block = self.manager.build_block().unwrap();
        self.manager.verify_block(&block).unwrap();
        self.manager.set_preference(block.id());
        self.manager.accept_block(&block).unwrap();
        if block.kind() != BlockKind::Proposal {
            return vec![block];
        }
        let [preferred, other] = self.manager.build_options(&block).unwrap();
        self.manager.verify_block(&preferred).unwrap();
        self.manager.verify_block(&other).unwrap();
        self.manager.accept_block(&preferred).unwrap();
        self.manager.reject_block(&other).unwrap();
        vec![block, preferred, other]
    }
}

pub fn manager(config: &Arc<Config>, db: &Arc<DB>, state: &Arc<RwLock<State>>, clock: &Arc<MockClock>) -> Manager {
    let shared_memory = Arc::new(DbSharedMemory::new(db.clone()));
    let uptimes = Arc::new(UptimeManager::new(clock.clone(), state.clone()));
    let executor = TxExecutor::new(config.clone(), clock.clone(), uptimes, shared_memory.clone());
    let backend = Backend::new(
        config.clone(),
        state.clone(),
        executor,
        Arc::new(RwLock::new(Mempool::new(config.mempool_max_txs))),
        Arc::new(ValidatorsManager::new()),
        shared_memory,
        Default::default(),
    );
    Manager::new(Arc::new(backend)).unwrap()
}
