mod common;

use common::{DAY, GENESIS_TIME, Harness, manager, validator_tx};
use omega_database::prelude::StoreResultExt;
use omega_platformvm::{
    errors::BlockError,
    pipeline::Pruner,
    state::{ChainReader, base::State},
};
use omega_platformvm_core::{
    block::{Block, BlockKind},
    ids::{NodeId, PRIMARY_NETWORK_ID},
    status::BlockStatus,
    tx::UnsignedTx,
};
use parking_lot::RwLock;
use std::sync::Arc;

#[test]
fn test_validator_is_scheduled_promoted_and_rewarded() {
    let h = Harness::new(GENESIS_TIME);
    let node = NodeId::from_u64_word(7);
    let (start, end) = (GENESIS_TIME + 60, GENESIS_TIME + 60 + 14 * DAY);
    let tx = validator_tx(&h.funds(0), 7, start, end, 100_000);
    h.manager.issue_tx(tx.clone()).unwrap();
    h.manager.backend().executor.uptimes().connect(node, PRIMARY_NETWORK_ID);

    let blocks = h.build_and_accept();
    assert_eq!(blocks[0].txs(), std::slice::from_ref(&tx));
    assert_eq!(h.manager.parse_block(blocks[0].bytes()).unwrap().id(), blocks[0].id());
    assert_eq!(h.state.pending_validator(PRIMARY_NETWORK_ID, node).unwrap().tx_id, tx.id());
    let validators = &h.manager.backend().validators;
    assert_eq!(validators.count(PRIMARY_NETWORK_ID), 3);

    // Promotion happens with the first block at the start time
    h.clock.set(start);
    let blocks = h.build_and_accept();
    assert_eq!((blocks[0].kind(), blocks[0].timestamp()), (BlockKind::Standard, Some(start)));
    assert!(blocks[0].txs().is_empty());
    assert_eq!(h.state.current_validator(PRIMARY_NETWORK_ID, node).unwrap().end_time, end);
    assert_eq!(validators.get_weight(PRIMARY_NETWORK_ID, node), 100_000);

    // Nothing happens between staker set changes, and the chain time stops at the next one
    h.clock.set(end - DAY);
    assert!(matches!(h.manager.build_block(), Err(BlockError::NothingToBuild)));
    h.clock.set(end + DAY);
    let blocks = h.build_and_accept();
    assert_eq!(blocks[0].timestamp(), Some(end));
    let potential_reward = h.state.current_validator(PRIMARY_NETWORK_ID, node).unwrap().potential_reward;
    assert!(potential_reward > 0);

    let blocks = h.build_and_accept();
    let [proposal, commit, abort] = blocks.as_slice() else {
        panic!("expected a proposal and its options, got {} blocks", blocks.len());
    };
    assert!(matches!(proposal.txs()[0].unsigned(), UnsignedTx::RewardValidator(reward) if reward.tx_id == tx.id()));
    assert_eq!((commit.kind(), abort.kind()), (BlockKind::Commit, BlockKind::Abort));
    assert_eq!(h.manager.last_accepted(), commit.id());
    assert_eq!(h.manager.get_block(abort.id()).unwrap().1, BlockStatus::Rejected);

    assert!(h.state.current_validator(PRIMARY_NETWORK_ID, node).optional().unwrap().is_none());
    let rewards = h.state.reward_utxos(tx.id()).unwrap();
    assert_eq!(rewards.iter().map(|utxo| utxo.amount()).sum::<u64>(), potential_reward);
    assert_eq!(validators.get_weight(PRIMARY_NETWORK_ID, node), 0);
    assert_eq!(validators.count(PRIMARY_NETWORK_ID), 3);

    let counters = h.manager.backend().counters.snapshot();
    assert_eq!((counters.blocks_accepted, counters.blocks_rejected, counters.txs_issued), (5, 1, 1));
}

#[test]
fn test_disconnected_validator_is_not_rewarded() {
    let h = Harness::new(GENESIS_TIME);
    let node = NodeId::from_u64_word(7);
    let (start, end) = (GENESIS_TIME + 60, GENESIS_TIME + 60 + 14 * DAY);
    let tx = validator_tx(&h.funds(0), 7, start, end, 100_000);
    h.manager.issue_tx(tx.clone()).unwrap();
    h.build_and_accept();
    h.clock.set(start);
    h.build_and_accept();
    h.clock.set(end + DAY);
    h.build_and_accept();

    let uptimes = h.manager.backend().executor.uptimes();
    assert!(uptimes.started_tracking(PRIMARY_NETWORK_ID));
    assert_eq!(uptimes.calculate_uptime_percent(node, PRIMARY_NETWORK_ID).unwrap(), 0.0);
    let potential_reward = h.state.current_validator(PRIMARY_NETWORK_ID, node).unwrap().potential_reward;
    let supply = h.state.current_supply(PRIMARY_NETWORK_ID).unwrap();

    let blocks = h.build_and_accept();
    let [proposal, abort, commit] = blocks.as_slice() else {
        panic!("expected a proposal and its options, got {} blocks", blocks.len());
    };
    assert!(matches!(proposal.txs()[0].unsigned(), UnsignedTx::RewardValidator(reward) if reward.tx_id == tx.id()));
    assert_eq!((abort.kind(), commit.kind()), (BlockKind::Abort, BlockKind::Commit));
    assert_eq!(h.manager.last_accepted(), abort.id());

    assert!(h.state.current_validator(PRIMARY_NETWORK_ID, node).optional().unwrap().is_none());
    assert!(h.state.reward_utxos(tx.id()).unwrap().is_empty());
    assert_eq!(h.state.current_supply(PRIMARY_NETWORK_ID).unwrap(), supply - potential_reward);
}

#[test]
fn test_shutdown_persists_uptimes() {
    let h = Harness::new(GENESIS_TIME);
    let node = NodeId::from_u64_word(1);
    let uptimes = h.manager.backend().executor.uptimes();
    uptimes.connect(node, PRIMARY_NETWORK_ID);
    h.clock.set(GENESIS_TIME + DAY);
    let (up_duration, _) = uptimes.calculate_uptime(node, PRIMARY_NETWORK_ID).unwrap();
    assert_eq!(up_duration, DAY);

    h.manager.shutdown().unwrap();
    assert!(!uptimes.started_tracking(PRIMARY_NETWORK_ID));
    let reopened = State::new(h.db.clone(), &h.config, &h.genesis).unwrap();
    assert_eq!(reopened.uptime(node, PRIMARY_NETWORK_ID).unwrap(), (DAY, GENESIS_TIME + DAY));
}

#[test]
fn test_state_survives_a_restart() {
    let h = Harness::new(GENESIS_TIME);
    let start = GENESIS_TIME + 60;
    let tx = validator_tx(&h.funds(1), 8, start, start + 14 * DAY, 100_000);
    h.manager.issue_tx(tx.clone()).unwrap();
    let block = h.build_and_accept().remove(0);

    let reopened = Arc::new(RwLock::new(State::new(h.db.clone(), &h.config, &h.genesis).unwrap()));
    {
        let state = reopened.read();
        assert_eq!((state.last_accepted(), state.height()), (block.id(), 1));
        assert_eq!(state.block_id_at_height(1).unwrap(), block.id());
    }
    assert_eq!(reopened.pending_validator(PRIMARY_NETWORK_ID, NodeId::from_u64_word(8)).unwrap().tx_id, tx.id());
    assert!(reopened.utxo(h.funds(1).utxo_id).optional().unwrap().is_none());

    // A manager over the reopened state builds on top of the last accepted block
    let restarted = manager(&h.config, &h.db, &reopened, &h.clock);
    assert_eq!(restarted.preferred(), block.id());
    assert_eq!(restarted.backend().validators.count(PRIMARY_NETWORK_ID), 3);
    h.clock.set(start);
    let next = restarted.build_block().unwrap();
    assert_eq!((next.parent_id(), next.height()), (block.id(), 2));
}

#[test]
fn test_pruner_drops_rejected_blocks() {
    let h = Harness::new(GENESIS_TIME);
    let genesis_id = h.manager.last_accepted();
    let first = validator_tx(&h.funds(0), 9, GENESIS_TIME + 60, GENESIS_TIME + 60 + 14 * DAY, 100_000);
    let second = validator_tx(&h.funds(1), 10, GENESIS_TIME + 60, GENESIS_TIME + 60 + 14 * DAY, 100_000);
    let accepted = Block::new_banff_standard(GENESIS_TIME, genesis_id, 1, vec![first]).unwrap();
    let rejected = Block::new_banff_standard(GENESIS_TIME, genesis_id, 1, vec![second]).unwrap();
    h.manager.verify_block(&accepted).unwrap();
    h.manager.verify_block(&rejected).unwrap();
    h.manager.accept_block(&accepted).unwrap();
    h.manager.reject_block(&rejected).unwrap();
    assert_eq!(h.manager.get_block(rejected.id()).unwrap().1, BlockStatus::Rejected);

    let stats = Pruner::new(&h.config, h.state.clone()).run().unwrap();
    assert_eq!((stats.deleted, stats.indexed), (1, 2));
    assert!(h.manager.get_block(rejected.id()).is_err());
    assert_eq!(h.manager.get_block(accepted.id()).unwrap().1, BlockStatus::Accepted);
}
