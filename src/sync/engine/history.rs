//! Wallet transaction history.
//!
//! Applied blocks append entries in block order: the miner payout entry
//! first, then every relevant transaction. Reverted blocks unwind the exact
//! mirror of that, so an entry is always the tail of the log when its block
//! is reverted.

use crate::sync::domain::AddressBook;
use crate::sync::engine::state::EngineState;
use crate::sync::engine::types::{
    InputKind, OutputKind, ProcessedInput, ProcessedOutput, ProcessedTransaction,
};
use crate::sync::error::SyncError;
use crate::sync::types::{
    Block, BlockHeight, ConsensusChange, Currency, OutputId, Timestamp, Transaction,
    TransactionId, UNCONFIRMED_HEIGHT, UNCONFIRMED_TIMESTAMP,
};

/// Where in the chain a processed transaction sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub height: BlockHeight,
    pub timestamp: Timestamp,
}

impl Confirmation {
    pub fn at(height: BlockHeight, timestamp: Timestamp) -> Self {
        Self { height, timestamp }
    }

    pub fn unconfirmed() -> Self {
        Self {
            height: UNCONFIRMED_HEIGHT,
            timestamp: UNCONFIRMED_TIMESTAMP,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.height != UNCONFIRMED_HEIGHT
    }

    /// Height at which an output created here becomes spendable after `delay`.
    fn matures_at(&self, delay: BlockHeight) -> BlockHeight {
        if !self.is_confirmed() {
            UNCONFIRMED_HEIGHT
        } else {
            self.height.saturating_add(delay)
        }
    }
}

/// Removes the history entries of every reverted block.
///
/// Blocks arrive newest first; each block's transactions are unwound last to
/// first, followed by its miner payout entry. The tracked height drops once
/// per block whether or not it touched the wallet.
pub fn revert_history(state: &mut EngineState, cc: &ConsensusChange) -> Result<(), SyncError> {
    for block in &cc.reverted_blocks {
        let mut removed = 0usize;
        for txn in block.transactions.iter().rev() {
            if state.confirmed.pop_if_tail(&txn.id).is_some() {
                removed += 1;
            }
        }
        if state.confirmed.pop_if_tail(&TransactionId::from(block.id)).is_some() {
            removed += 1;
        }

        state.height = state
            .height
            .checked_sub(1)
            .ok_or(SyncError::HeightUnderflow)?;
        log::debug!(
            "[HISTORY] reverted block {} ({} entries), height now {}",
            block.id,
            removed,
            state.height
        );
    }
    Ok(())
}

/// Fails if `cc` reverts more blocks than the wallet has applied.
pub fn check_revert(state: &EngineState, cc: &ConsensusChange) -> Result<(), SyncError> {
    let reverted = cc.reverted_blocks.len() as BlockHeight;
    if reverted > state.height {
        return Err(SyncError::HeightUnderflow);
    }
    Ok(())
}

/// Appends the history entries of every applied block.
pub fn apply_history(
    state: &mut EngineState,
    cc: &ConsensusChange,
    addresses: &dyn AddressBook,
    maturity_delay: BlockHeight,
) {
    for block in &cc.applied_blocks {
        state.height += 1;
        let confirmation = Confirmation::at(state.height, block.timestamp);
        let before = state.confirmed.len();

        let miner_entry =
            process_miner_payouts(state, block, confirmation, addresses, maturity_delay);
        if miner_entry.is_relevant() {
            state.confirmed.push(miner_entry);
        }

        for txn in &block.transactions {
            let pt = process_transaction(state, txn, confirmation, addresses, maturity_delay);
            if pt.is_relevant() {
                log::trace!("[HISTORY] logging txn {}", pt.transaction_id);
                state.confirmed.push(pt);
            }
        }

        log::debug!(
            "[HISTORY] applied block {} at height {} ({} entries)",
            block.id,
            state.height,
            state.confirmed.len() - before
        );
    }
}

fn process_miner_payouts(
    state: &mut EngineState,
    block: &Block,
    confirmation: Confirmation,
    addresses: &dyn AddressBook,
    maturity_delay: BlockHeight,
) -> ProcessedTransaction {
    let mut outputs = Vec::with_capacity(block.miner_payouts.len());
    for (i, payout) in block.miner_payouts.iter().enumerate() {
        outputs.push(ProcessedOutput {
            kind: OutputKind::MinerPayout,
            maturity_height: confirmation.matures_at(maturity_delay),
            owned: addresses.contains(&payout.address),
            related_address: Some(payout.address),
            value: payout.value,
        });
        state
            .historic
            .record_value(block.miner_payout_id(i as u64), payout.value);
    }

    ProcessedTransaction {
        transaction: None,
        transaction_id: TransactionId::from(block.id),
        confirmation_height: confirmation.height,
        confirmation_timestamp: confirmation.timestamp,
        inputs: Vec::new(),
        outputs,
    }
}

/// Builds the history entry of one transaction and records the values of the
/// outputs it creates. Fund outputs of unconfirmed transactions are not
/// recorded.
///
/// Relevance is not checked here; callers decide what to keep.
pub fn process_transaction(
    state: &mut EngineState,
    txn: &Transaction,
    confirmation: Confirmation,
    addresses: &dyn AddressBook,
    maturity_delay: BlockHeight,
) -> ProcessedTransaction {
    let mut inputs = Vec::with_capacity(txn.coin_inputs.len() + txn.fund_inputs.len());
    let mut outputs = Vec::with_capacity(
        txn.coin_outputs.len()
            + txn.fund_inputs.len()
            + txn.fund_outputs.len()
            + txn.miner_fees.len(),
    );

    for input in &txn.coin_inputs {
        inputs.push(ProcessedInput {
            kind: InputKind::Coin,
            owned: addresses.contains(&input.unlock_address),
            related_address: input.unlock_address,
            value: resolve_value(state, &input.parent_id),
        });
    }

    for (i, output) in txn.coin_outputs.iter().enumerate() {
        outputs.push(ProcessedOutput {
            kind: OutputKind::Coin,
            maturity_height: confirmation.matures_at(0),
            owned: addresses.contains(&output.address),
            related_address: Some(output.address),
            value: output.value,
        });
        state
            .historic
            .record_value(txn.coin_output_id(i as u64), output.value);
    }

    for input in &txn.fund_inputs {
        let owned = addresses.contains(&input.unlock_address);
        let value = resolve_value(state, &input.parent_id);
        inputs.push(ProcessedInput {
            kind: InputKind::Fund,
            owned,
            related_address: input.unlock_address,
            value,
        });

        let claim_start = state.historic.claim_start(&input.parent_id).unwrap_or(0);
        outputs.push(ProcessedOutput {
            kind: OutputKind::Claim,
            maturity_height: confirmation.matures_at(maturity_delay),
            owned,
            related_address: Some(input.claim_address),
            value: claim_value(state.fund_pool, claim_start, value),
        });
    }

    for (i, output) in txn.fund_outputs.iter().enumerate() {
        let id = txn.fund_output_id(i as u64);
        outputs.push(ProcessedOutput {
            kind: OutputKind::Fund,
            maturity_height: confirmation.matures_at(0),
            owned: addresses.contains(&output.address),
            related_address: Some(output.address),
            value: output.value,
        });
        // claim start is assigned at mining time
        if confirmation.is_confirmed() {
            state.historic.record_value(id, output.value);
            state.historic.record_claim_start(id, output.claim_start);
        }
    }

    for fee in &txn.miner_fees {
        outputs.push(ProcessedOutput {
            kind: OutputKind::MinerFee,
            maturity_height: 0,
            owned: false,
            related_address: None,
            value: *fee,
        });
    }

    ProcessedTransaction {
        transaction: Some(txn.clone()),
        transaction_id: txn.id,
        confirmation_height: confirmation.height,
        confirmation_timestamp: confirmation.timestamp,
        inputs,
        outputs,
    }
}

/// Coins released by spending `quantity` funds created at pool level
/// `claim_start` while the pool stands at `pool`.
pub fn claim_value(pool: Currency, claim_start: Currency, quantity: Currency) -> Currency {
    pool.saturating_sub(claim_start).saturating_mul(quantity)
}

fn resolve_value(state: &EngineState, id: &OutputId) -> Currency {
    state.historic.value(id).unwrap_or_else(|| {
        log::trace!("[HISTORY] no recorded value for output {}", id);
        0
    })
}
