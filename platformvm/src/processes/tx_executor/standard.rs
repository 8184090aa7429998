use super::{
    TxExecutor,
    staking::transformation,
    tx_fee,
    utxos::{burn, consume_and_produce},
};
use crate::{
    atomic::{AtomicRequest, AtomicRequests},
    errors::BlockProcessResult,
    processes::reward::ConsumptionRewardCalculator,
    state::Chain,
};
use omega_database::prelude::StoreResultExt;
use omega_platformvm_core::{
    errors::tx::TxError,
    staker::Staker,
    status::TxStatus,
    tx::{
        BaseTx, Tx, UnsignedTx,
        atomic::{ExportTx, ImportTx},
        subnet::{CreateChainTx, RemoveSubnetValidatorTx, TransformSubnetTx},
    },
    utxo::{TransferableOutput, Utxo, UtxoId},
};

/// Side effects of a decision tx which do not live in the chain state
#[derive(Clone, Debug, Default)]
pub struct StandardOutcome {
    pub atomic_requests: AtomicRequests,
    /// UTXOs consumed from shared memory
    pub imported: Vec<UtxoId>,
}

impl TxExecutor {
    /// Executes a decision tx on top of `chain`. The tx is recorded as committed in `chain`.
    pub fn execute_standard_tx(&self, chain: &mut dyn Chain, tx: &Tx) -> BlockProcessResult<StandardOutcome> {
        let unsigned = tx.unsigned();
        let name = unsigned.name();
        unsigned.verify_syntax(&self.config.params)?;
        tx.verify_credentials()?;
        let banff = self.config.is_banff_active(chain.timestamp());
        let mut outcome = StandardOutcome::default();

        match unsigned {
            UnsignedTx::AdvanceTime(_) | UnsignedTx::RewardValidator(_) => return Err(TxError::WrongBlockKind(name, "standard").into()),
            // Before Banff these are proposals
            UnsignedTx::AddValidator(_) | UnsignedTx::AddSubnetValidator(_) | UnsignedTx::AddDelegator(_) if !banff => {
                return Err(TxError::WrongBlockKind(name, "standard").into());
            }
            UnsignedTx::AddPermissionlessValidator(_)
            | UnsignedTx::AddPermissionlessDelegator(_)
            | UnsignedTx::RemoveSubnetValidator(_)
            | UnsignedTx::TransformSubnet(_)
                if !banff =>
            {
                return Err(TxError::NotAllowedBeforeBanff(name).into());
            }
            UnsignedTx::AddValidator(_)
            | UnsignedTx::AddSubnetValidator(_)
            | UnsignedTx::AddDelegator(_)
            | UnsignedTx::AddPermissionlessValidator(_)
            | UnsignedTx::AddPermissionlessDelegator(_) => self.add_staker(chain, tx)?,
            UnsignedTx::RemoveSubnetValidator(remove) => self.remove_subnet_validator(chain, tx, remove)?,
            UnsignedTx::CreateSubnet(create) => {
                self.spend(chain, tx, &create.base, &[], &[])?;
                chain.add_subnet(tx.id(), create.owner.clone());
            }
            UnsignedTx::CreateChain(create) => self.create_chain(chain, tx, create)?,
            UnsignedTx::TransformSubnet(transform) => self.transform_subnet(chain, tx, transform)?,
            UnsignedTx::Import(import) => outcome = self.import(chain, tx, import)?,
            UnsignedTx::Export(export) => outcome = self.export(chain, tx, export)?,
        }

        chain.add_tx(tx.clone(), TxStatus::Committed);
        Ok(outcome)
    }

    /// Verifies the UTXO flow of `tx` and applies it: inputs consumed, base outputs created and
    /// the fee burned. `locked` outputs are paid for but not created.
    pub(super) fn spend(
        &self,
        chain: &mut dyn Chain,
        tx: &Tx,
        base: &BaseTx,
        imported: &[Utxo],
        locked: &[TransferableOutput],
    ) -> BlockProcessResult<()> {
        let mut consumed = self.resolve_inputs(&*chain, &base.ins)?;
        consumed.extend_from_slice(imported);
        let fee = tx_fee(&self.config.params, tx.unsigned());
        let burned = self.verify_flow(&consumed, base.outs.iter().chain(locked), fee)?;
        consume_and_produce(chain, tx);
        burn(chain, burned)
    }

    /// Schedules the staker of `tx` as pending
    pub(super) fn add_staker(&self, chain: &mut dyn Chain, tx: &Tx) -> BlockProcessResult<()> {
        self.verify_new_staker(&*chain, tx)?;
        let unsigned = tx.unsigned();
        let (Some(scheduled), Some(base)) = (unsigned.scheduled_staker(), unsigned.base()) else {
            return Err(TxError::NotAStakerTx(tx.id()).into());
        };
        self.spend(chain, tx, base, &[], scheduled.stake())?;

        let mut staker = Staker::new_pending(tx.id(), scheduled).map_err(TxError::from)?;
        if !staker.is_primary_network() && !staker.priority.is_permissioned() {
            staker.potential_reward = self.reserve_consumption_reward(chain, &staker)?;
        }
        if staker.is_validator() {
            chain.put_pending_validator(staker);
        } else {
            chain.put_pending_delegator(staker);
        }
        Ok(())
    }

    /// Permissionless subnet rewards are fixed when the staker is added and minted right away
    fn reserve_consumption_reward(&self, chain: &mut dyn Chain, staker: &Staker) -> BlockProcessResult<u64> {
        let subnet_id = staker.subnet_id;
        let transform = transformation(&*chain, subnet_id)?.ok_or(TxError::SubnetNotTransformed(subnet_id))?;
        let calculator = ConsumptionRewardCalculator::from_transformation(&transform, transform.max_stake_duration as u64);
        let supply = chain.current_supply(subnet_id)?;
        let reward = calculator.calculate(staker.duration(), staker.weight, supply);
        chain.set_current_supply(subnet_id, supply.saturating_add(reward));
        Ok(reward)
    }

    fn remove_subnet_validator(&self, chain: &mut dyn Chain, tx: &Tx, remove: &RemoveSubnetValidatorTx) -> BlockProcessResult<()> {
        let (subnet_id, node_id) = (remove.subnet_id, remove.node_id);
        if chain.subnet_owner(subnet_id).optional()?.is_none() {
            return Err(TxError::SubnetNotFound(subnet_id).into());
        }
        let (staker, is_current) = match chain.current_validator(subnet_id, node_id).optional()? {
            Some(staker) => (staker, true),
            None => match chain.pending_validator(subnet_id, node_id).optional()? {
                Some(staker) => (staker, false),
                None => return Err(TxError::ValidatorNotFound(node_id, subnet_id).into()),
            },
        };
        if !staker.priority.is_permissioned() {
            return Err(TxError::RemovePermissionlessValidator(node_id, subnet_id).into());
        }

        self.spend(chain, tx, &remove.base, &[], &[])?;
        if is_current {
            chain.delete_current_validator(&staker);
        } else {
            chain.delete_pending_validator(&staker);
        }
        Ok(())
    }

    fn create_chain(&self, chain: &mut dyn Chain, tx: &Tx, create: &CreateChainTx) -> BlockProcessResult<()> {
        if chain.subnet_owner(create.subnet_id).optional()?.is_none() {
            return Err(TxError::SubnetNotFound(create.subnet_id).into());
        }
        self.spend(chain, tx, &create.base, &[], &[])?;
        chain.add_chain(create.subnet_id, tx.clone());
        Ok(())
    }

    fn transform_subnet(&self, chain: &mut dyn Chain, tx: &Tx, transform: &TransformSubnetTx) -> BlockProcessResult<()> {
        let subnet_id = transform.subnet_id;
        if chain.subnet_owner(subnet_id).optional()?.is_none() {
            return Err(TxError::SubnetNotFound(subnet_id).into());
        }
        if chain.subnet_transformation(subnet_id).optional()?.is_some() {
            return Err(TxError::SubnetAlreadyTransformed(subnet_id).into());
        }
        self.spend(chain, tx, &transform.base, &[], &[])?;
        chain.add_subnet_transformation(subnet_id, tx.clone());
        chain.set_current_supply(subnet_id, transform.initial_supply);
        Ok(())
    }

    fn import(&self, chain: &mut dyn Chain, tx: &Tx, import: &ImportTx) -> BlockProcessResult<StandardOutcome> {
        let imported = self.resolve_imported(chain.timestamp(), import.source_chain, &import.imported_inputs)?;
        self.spend(chain, tx, &import.base, &imported, &[])?;

        let imported: Vec<UtxoId> = import.imported_inputs.iter().map(|input| input.utxo_id).collect();
        let request = AtomicRequest { remove_requests: imported.clone(), put_requests: vec![] };
        Ok(StandardOutcome { atomic_requests: AtomicRequests::from([(import.source_chain, request)]), imported })
    }

    fn export(&self, chain: &mut dyn Chain, tx: &Tx, export: &ExportTx) -> BlockProcessResult<StandardOutcome> {
        self.spend(chain, tx, &export.base, &[], &export.exported_outputs)?;

        // Exported outputs are numbered after the base outputs
        let offset = export.base.outs.len();
        let put_requests =
            export.exported_outputs.iter().enumerate().map(|(index, output)| Utxo::new(tx.utxo_id((offset + index) as u32), output)).collect();
        let request = AtomicRequest { remove_requests: vec![], put_requests };
        Ok(StandardOutcome { atomic_requests: AtomicRequests::from([(export.destination_chain, request)]), imported: vec![] })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::BlockError,
        processes::tx_executor::tests::executor,
        state::{ChainReader, diff::Diff},
        test_helpers::{ALLOCATION_AMOUNT, DAY, TestState, base_tx, funded_validator_tx, node, output, owner, spend, test_config},
    };
    use omega_platformvm_core::{
        config::{ConfigBuilder, params::ForkActivation},
        ids::{AssetId, ChainId, PRIMARY_NETWORK_ID, SubnetId, TxId},
        tx::{
            AdvanceTimeTx, Credential,
            staking::{AddPermissionlessValidatorTx, SubnetAuth, Validator},
            subnet::CreateSubnetTx,
        },
        utxo::TransferableInput,
    };

    fn signed(unsigned: UnsignedTx) -> Tx {
        let creds = unsigned.num_expected_credentials();
        Tx::new(unsigned, vec![Credential::default(); creds])
    }

    fn create_subnet_tx(funds: &Utxo) -> Tx {
        signed(UnsignedTx::CreateSubnet(CreateSubnetTx {
            base: base_tx(vec![spend(funds)], vec![output(funds.amount() - 10_000)]),
            owner: owner(),
        }))
    }

    fn transform_tx(funds: &Utxo, subnet_id: SubnetId, asset_id: AssetId) -> Tx {
        signed(UnsignedTx::TransformSubnet(TransformSubnetTx {
            base: base_tx(vec![spend(funds)], vec![output(funds.amount() - 100_000)]),
            subnet_id,
            asset_id,
            initial_supply: 1_000_000,
            maximum_supply: 2_000_000,
            min_consumption_rate: 100_000,
            max_consumption_rate: 100_000,
            min_validator_stake: 10,
            max_validator_stake: 500_000,
            min_stake_duration: DAY as u32,
            max_stake_duration: 365 * DAY as u32,
            min_delegation_fee: 20_000,
            min_delegator_stake: 1,
            max_validator_weight_factor: 5,
            uptime_requirement: 800_000,
            subnet_auth: SubnetAuth { sig_indices: vec![0] },
        }))
    }

    #[test]
    fn test_add_validator_spends_and_schedules() {
        let ts = TestState::new();
        let (executor, _, _) = executor(&ts, ts.genesis_timestamp());
        let funds = ts.genesis_utxo(0);
        let start = ts.genesis_timestamp() + 10;
        let tx = funded_validator_tx(&funds, 9, start, start + DAY, 2000);
        let supply = ts.state.current_supply(PRIMARY_NETWORK_ID).unwrap();

        let mut diff = Diff::new_on(ts.state.clone());
        let outcome = executor.execute_standard_tx(&mut diff, &tx).unwrap();
        assert!(outcome.atomic_requests.is_empty());

        let staker = diff.pending_validator(PRIMARY_NETWORK_ID, node(9)).unwrap();
        assert_eq!((staker.tx_id, staker.weight, staker.next_time), (tx.id(), 2000, start));
        assert!(diff.utxo(funds.utxo_id).optional().unwrap().is_none());
        assert_eq!(diff.utxo(tx.utxo_id(0)).unwrap().amount(), ALLOCATION_AMOUNT - 2000);
        // The stake is locked, not spendable
        assert!(diff.utxo(tx.utxo_id(1)).optional().unwrap().is_none());
        assert_eq!(diff.tx(tx.id()).unwrap().1, TxStatus::Committed);
        assert_eq!(diff.current_supply(PRIMARY_NETWORK_ID).unwrap(), supply);

        // Spending the same funds twice fails
        let again = funded_validator_tx(&funds, 10, start, start + DAY, 2000);
        assert!(matches!(executor.execute_standard_tx(&mut diff, &again), Err(BlockError::Tx(TxError::UtxoNotFound(_)))));
    }

    #[test]
    fn test_proposal_only_txs_are_rejected() {
        let ts = TestState::new();
        let (executor, _, _) = executor(&ts, ts.genesis_timestamp());
        let tx = Tx::new(UnsignedTx::AdvanceTime(AdvanceTimeTx { time: ts.genesis_timestamp() + 1 }), vec![]);
        let mut diff = Diff::new_on(ts.state.clone());
        assert!(matches!(
            executor.execute_standard_tx(&mut diff, &tx),
            Err(BlockError::Tx(TxError::WrongBlockKind("AdvanceTimeTx", "standard")))
        ));
    }

    #[test]
    fn test_stakers_are_proposals_before_banff() {
        let config = ConfigBuilder::new(test_config().params).edit_consensus_params(|p| p.banff_activation = ForkActivation::never()).build();
        let ts = TestState::with_config(config);
        let (executor, _, _) = executor(&ts, ts.genesis_timestamp());
        let start = ts.genesis_timestamp() + 10;
        let tx = funded_validator_tx(&ts.genesis_utxo(0), 9, start, start + DAY, 2000);
        let mut diff = Diff::new_on(ts.state.clone());
        assert!(matches!(
            executor.execute_standard_tx(&mut diff, &tx),
            Err(BlockError::Tx(TxError::WrongBlockKind("AddValidatorTx", "standard")))
        ));
    }

    #[test]
    fn test_create_subnet_burns_the_fee() {
        let ts = TestState::new();
        let (executor, _, _) = executor(&ts, ts.genesis_timestamp());
        let supply = ts.state.current_supply(PRIMARY_NETWORK_ID).unwrap();
        let tx = create_subnet_tx(&ts.genesis_utxo(1));

        let mut diff = Diff::new_on(ts.state.clone());
        executor.execute_standard_tx(&mut diff, &tx).unwrap();
        assert_eq!(diff.subnet_owner(tx.id()).unwrap(), owner());
        assert_eq!(diff.accumulators().current_accumulated_fee, 10_000);
        assert_eq!(diff.current_supply(PRIMARY_NETWORK_ID).unwrap(), supply - 10_000);

        let missing_creds = Tx::new(create_subnet_tx(&ts.genesis_utxo(2)).unsigned().clone(), vec![]);
        assert!(matches!(
            executor.execute_standard_tx(&mut diff, &missing_creds),
            Err(BlockError::Tx(TxError::WrongNumberOfCredentials(1, 0)))
        ));
    }

    #[test]
    fn test_permissionless_subnet_staker_gets_its_reward_upfront() {
        let ts = TestState::new();
        let (executor, _, _) = executor(&ts, ts.genesis_timestamp());
        let mut diff = Diff::new_on(ts.state.clone());

        let create = create_subnet_tx(&ts.genesis_utxo(0));
        executor.execute_standard_tx(&mut diff, &create).unwrap();
        let subnet_id = create.id();
        let asset_id = AssetId::from_u64_word(0x5ab);
        let transform = transform_tx(&ts.genesis_utxo(1), subnet_id, asset_id);
        executor.execute_standard_tx(&mut diff, &transform).unwrap();
        assert_eq!(diff.current_supply(subnet_id).unwrap(), 1_000_000);
        assert!(matches!(
            executor.execute_standard_tx(&mut diff, &transform_tx(&ts.genesis_utxo(2), subnet_id, asset_id)),
            Err(BlockError::Tx(TxError::SubnetAlreadyTransformed(_)))
        ));

        let subnet_funds = Utxo::new(UtxoId::new(TxId::from_u64_word(0x5ab), 0), &TransferableOutput::new(asset_id, 100_000, owner()));
        diff.add_utxo(subnet_funds.clone());
        let fee_funds = ts.genesis_utxo(3);
        let start = ts.genesis_timestamp() + 10;
        let tx = signed(UnsignedTx::AddPermissionlessValidator(AddPermissionlessValidatorTx {
            base: base_tx(vec![spend(&fee_funds), spend(&subnet_funds)], vec![output(fee_funds.amount() - 1000)]),
            validator: Validator { node_id: node(1), start, end: start + DAY, weight: 100_000 },
            subnet_id,
            signer: None,
            stake_outs: vec![TransferableOutput::new(asset_id, 100_000, owner())],
            validator_rewards_owner: owner(),
            delegator_rewards_owner: owner(),
            delegation_shares: 20_000,
        }));
        executor.execute_standard_tx(&mut diff, &tx).unwrap();

        let expected = ConsumptionRewardCalculator::new(100_000, 100_000, 365 * DAY, 2_000_000).calculate(DAY, 100_000, 1_000_000);
        assert!(expected > 0);
        let staker = diff.pending_validator(subnet_id, node(1)).unwrap();
        assert_eq!(staker.potential_reward, expected);
        assert_eq!(diff.current_supply(subnet_id).unwrap(), 1_000_000 + expected);
    }

    #[test]
    fn test_import_and_export_requests() {
        let ts = TestState::new();
        let (executor, _, shared_memory) = executor(&ts, ts.genesis_timestamp());
        let x_chain = ChainId::from_u64_word(0x78);
        let inbound = Utxo::new(UtxoId::new(TxId::from_u64_word(0x78), 3), &output(50_000));
        let import = |input: TransferableInput| {
            signed(UnsignedTx::Import(ImportTx {
                base: base_tx(vec![], vec![output(49_000)]),
                source_chain: x_chain,
                imported_inputs: vec![input],
            }))
        };

        let mut diff = Diff::new_on(ts.state.clone());
        assert!(matches!(
            executor.execute_standard_tx(&mut diff, &import(spend(&inbound))),
            Err(BlockError::Tx(TxError::SharedUtxoNotFound(..)))
        ));

        shared_memory.receive(x_chain, std::slice::from_ref(&inbound)).unwrap();
        let tx = import(spend(&inbound));
        let outcome = executor.execute_standard_tx(&mut diff, &tx).unwrap();
        assert_eq!(outcome.imported, vec![inbound.utxo_id]);
        assert_eq!(outcome.atomic_requests[&x_chain].remove_requests, vec![inbound.utxo_id]);
        assert_eq!(diff.utxo(tx.utxo_id(0)).unwrap().amount(), 49_000);

        let funds = ts.genesis_utxo(0);
        let export = signed(UnsignedTx::Export(ExportTx {
            base: base_tx(vec![spend(&funds)], vec![output(funds.amount() - 6000)]),
            destination_chain: x_chain,
            exported_outputs: vec![output(5000)],
        }));
        let outcome = executor.execute_standard_tx(&mut diff, &export).unwrap();
        assert!(outcome.imported.is_empty());
        assert_eq!(outcome.atomic_requests[&x_chain].put_requests, vec![Utxo::new(export.utxo_id(1), &output(5000))]);
        // Exported funds never exist locally
        assert!(diff.utxo(export.utxo_id(1)).optional().unwrap().is_none());
    }
}
