use super::TxExecutor;
use crate::{
    errors::{BlockProcessResult, StateError},
    state::{Chain, ChainReader},
};
use omega_database::prelude::StoreResultExt;
use omega_platformvm_core::{
    errors::tx::{TxError, TxResult},
    ids::{AssetId, ChainId, PRIMARY_NETWORK_ID},
    tx::Tx,
    utxo::{TransferableInput, TransferableOutput, Utxo},
};
use std::collections::HashMap;

impl TxExecutor {
    /// Resolves the local UTXOs consumed by `ins` and checks they can be spent at the chain time
    pub(super) fn resolve_inputs(&self, chain: &dyn ChainReader, ins: &[TransferableInput]) -> BlockProcessResult<Vec<Utxo>> {
        let chain_time = chain.timestamp();
        let mut utxos = Vec::with_capacity(ins.len());
        for input in ins {
            let utxo = chain.utxo(input.utxo_id).optional()?.ok_or(TxError::UtxoNotFound(input.utxo_id))?;
            check_input(input, &utxo, chain_time)?;
            utxos.push(utxo);
        }
        Ok(utxos)
    }

    /// Resolves UTXOs exported to this chain by `source_chain`
    pub(super) fn resolve_imported(&self, chain_time: u64, source_chain: ChainId, ins: &[TransferableInput]) -> BlockProcessResult<Vec<Utxo>> {
        let mut utxos = Vec::with_capacity(ins.len());
        for input in ins {
            let utxo = match self.shared_memory.get(source_chain, input.utxo_id) {
                Ok(utxo) => utxo,
                Err(StateError::NotFound(_)) => return Err(TxError::SharedUtxoNotFound(input.utxo_id, source_chain).into()),
                Err(err) => return Err(err.into()),
            };
            check_input(input, &utxo, chain_time)?;
            utxos.push(utxo);
        }
        Ok(utxos)
    }

    /// Checks that `consumed` covers `produced` plus `fee` for every asset. Returns the amount of
    /// fee asset burned, which may exceed `fee` when the tx leaves change behind.
    pub(super) fn verify_flow<'a>(
        &self,
        consumed: &[Utxo],
        produced: impl IntoIterator<Item = &'a TransferableOutput>,
        fee: u64,
    ) -> TxResult<u64> {
        let fee_asset = self.config.fee_asset_id;
        let mut consumed_by_asset: HashMap<AssetId, u64> = HashMap::new();
        for utxo in consumed {
            let entry = consumed_by_asset.entry(utxo.asset_id).or_default();
            *entry = entry.checked_add(utxo.amount()).ok_or(TxError::Overflow)?;
        }
        let mut produced_by_asset: HashMap<AssetId, u64> = HashMap::new();
        if fee > 0 {
            produced_by_asset.insert(fee_asset, fee);
        }
        for output in produced {
            let entry = produced_by_asset.entry(output.asset_id).or_default();
            *entry = entry.checked_add(output.amount()).ok_or(TxError::Overflow)?;
        }

        for (&asset_id, &required) in produced_by_asset.iter() {
            let available = consumed_by_asset.get(&asset_id).copied().unwrap_or_default();
            if available < required {
                return Err(TxError::InsufficientFunds(asset_id, available, required));
            }
        }

        let consumed_fee_asset = consumed_by_asset.get(&fee_asset).copied().unwrap_or_default();
        let produced_fee_asset = produced_by_asset.get(&fee_asset).copied().unwrap_or_default();
        Ok(fee + (consumed_fee_asset - produced_fee_asset))
    }
}

fn check_input(input: &TransferableInput, utxo: &Utxo, chain_time: u64) -> TxResult<()> {
    if utxo.asset_id != input.asset_id {
        return Err(TxError::AssetIdMismatch(input.utxo_id, input.asset_id, utxo.asset_id));
    }
    if utxo.amount() != input.amount {
        return Err(TxError::InputAmountMismatch(input.utxo_id, input.amount, utxo.amount()));
    }
    if utxo.is_locked(chain_time) {
        return Err(TxError::UtxoLocked(input.utxo_id, utxo.output.owners.locktime));
    }
    Ok(())
}

/// Consumes the local inputs of `tx` and creates its base outputs
pub(super) fn consume_and_produce(chain: &mut dyn Chain, tx: &Tx) {
    let Some(base) = tx.unsigned().base() else {
        return;
    };
    for input in base.ins.iter() {
        chain.delete_utxo(input.utxo_id);
    }
    for (index, output) in base.outs.iter().enumerate() {
        chain.add_utxo(Utxo::new(tx.utxo_id(index as u32), output));
    }
}

/// Makes the stake of `tx` spendable again. Stake outputs are numbered after the base outputs.
pub(super) fn refund_stake(chain: &mut dyn Chain, tx: &Tx, stake: &[TransferableOutput]) {
    let offset = tx.unsigned().base().map_or(0, |base| base.outs.len());
    for (index, output) in stake.iter().enumerate() {
        chain.add_utxo(Utxo::new(tx.utxo_id((offset + index) as u32), output));
    }
}

/// Moves the burned fee into the fee pool, to be redistributed to primary network stakers
pub(super) fn burn(chain: &mut dyn Chain, burned: u64) -> BlockProcessResult<()> {
    if burned == 0 {
        return Ok(());
    }
    let mut accumulators = chain.accumulators();
    accumulators.current_accumulated_fee = accumulators.current_accumulated_fee.saturating_add(burned);
    chain.set_accumulators(accumulators);
    let supply = chain.current_supply(PRIMARY_NETWORK_ID)?;
    chain.set_current_supply(PRIMARY_NETWORK_ID, supply.saturating_sub(burned));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        processes::tx_executor::tests::executor,
        state::diff::Diff,
        test_helpers::{TestState, output, owner, spend},
    };
    use omega_platformvm_core::{
        ids::TxId,
        utxo::{OutputOwners, UtxoId},
    };

    #[test]
    fn test_inputs_must_match_their_utxo() {
        let ts = TestState::new();
        let (executor, _, _) = executor(&ts, ts.genesis_timestamp());
        let utxo = ts.genesis_utxo(0);

        assert_eq!(executor.resolve_inputs(&*ts.state, &[spend(&utxo)]).unwrap(), vec![utxo.clone()]);

        let mut input = spend(&utxo);
        input.amount += 1;
        assert!(matches!(executor.resolve_inputs(&*ts.state, &[input]), Err(crate::errors::BlockError::Tx(TxError::InputAmountMismatch(..)))));

        let missing = TransferableInput::new(UtxoId::new(TxId::from_u64_word(404), 0), utxo.asset_id, 1);
        assert!(matches!(executor.resolve_inputs(&*ts.state, &[missing]), Err(crate::errors::BlockError::Tx(TxError::UtxoNotFound(_)))));
    }

    #[test]
    fn test_locked_utxos_cannot_be_spent() {
        let ts = TestState::new();
        let (executor, _, _) = executor(&ts, ts.genesis_timestamp());
        let locktime = ts.genesis_timestamp() + 100;
        let locked = Utxo::new(
            UtxoId::new(TxId::from_u64_word(5), 0),
            &TransferableOutput::new(ts.config.fee_asset_id, 10, OutputOwners { locktime, ..owner() }),
        );
        let mut diff = Diff::new_on(ts.state.clone());
        diff.add_utxo(locked.clone());

        let err = executor.resolve_inputs(&diff, &[spend(&locked)]).unwrap_err();
        assert!(matches!(err, crate::errors::BlockError::Tx(TxError::UtxoLocked(_, t)) if t == locktime));
        diff.set_timestamp(locktime);
        assert!(executor.resolve_inputs(&diff, &[spend(&locked)]).is_ok());
    }

    #[test]
    fn test_flow_check_and_burned_amount() {
        let ts = TestState::new();
        let (executor, _, _) = executor(&ts, ts.genesis_timestamp());
        let utxo = ts.genesis_utxo(0);
        let funds = utxo.amount();

        assert_eq!(executor.verify_flow(std::slice::from_ref(&utxo), [&output(funds - 1000)], 1000).unwrap(), 1000);
        // Whatever is not spent is burned too
        assert_eq!(executor.verify_flow(std::slice::from_ref(&utxo), [&output(funds - 5000)], 1000).unwrap(), 5000);
        assert_eq!(
            executor.verify_flow(std::slice::from_ref(&utxo), [&output(funds)], 1000),
            Err(TxError::InsufficientFunds(ts.config.fee_asset_id, funds, funds + 1000))
        );
    }

    #[test]
    fn test_burn_feeds_the_fee_pool() {
        let ts = TestState::new();
        let supply = ts.state.current_supply(PRIMARY_NETWORK_ID).unwrap();
        let mut diff = Diff::new_on(ts.state.clone());
        burn(&mut diff, 700).unwrap();
        assert_eq!(diff.accumulators().current_accumulated_fee, 700);
        assert_eq!(diff.current_supply(PRIMARY_NETWORK_ID).unwrap(), supply - 700);
    }
}
