//! Consensus synchronization engine.
//!
//! This module is the functional core of the wallet:
//! - **Input**: `ConsensusChange` values and transaction pool snapshots.
//! - **Output**: an updated `EngineState` (confirmed outputs, history, height,
//!   fund pool) or a fatal `SyncError`.
//!
//! # Guarantees
//! * **No IO and no locking**: the caller serializes access.
//! * **Exact reversal**: reverting a block restores the state it replaced,
//!   it is never recomputed.
//! * **All or nothing**: a change that would violate an invariant is rejected
//!   before any part of it is applied.
//! * **Halting**: after the first invariant violation every further update is
//!   refused, since the ledger no longer matches the chain.

pub mod defrag;
mod diff;
pub mod history;
pub mod ledger;
pub mod state;
pub mod transaction_log;
pub mod types;
mod unconfirmed;


pub use defrag::DefragPlan;
pub use state::EngineState;
pub use types::{
    ConfirmedBalance, InputKind, OutputKind, ProcessedInput, ProcessedOutput,
    ProcessedTransaction,
};

use crate::config::WalletConfig;
use crate::sync::domain::AddressBook;
use crate::sync::error::SyncError;
use crate::sync::types::{
    Address, BlockHeight, CoinOutput, ConsensusChange, Currency, FundOutput, OutputId,
    Transaction, TransactionId,
};

use history::claim_value;

/// Owns the wallet's view of the chain and applies consensus updates to it.
#[derive(Debug)]
pub struct WalletEngine {
    state: EngineState,
    config: WalletConfig,
    /// Reason the engine stopped accepting updates.
    halted: Option<String>,
}

impl WalletEngine {
    pub fn new(config: WalletConfig) -> Self {
        Self::from_state(config, EngineState::default())
    }

    /// Resumes from a previously saved state.
    pub fn from_state(config: WalletConfig, state: EngineState) -> Self {
        Self {
            state,
            config,
            halted: None,
        }
    }

    /// Applies one consensus change: output and pool diffs first, then the
    /// history of reverted blocks, then the history of applied blocks.
    ///
    /// The change is checked in full first. On error the state is left as it
    /// was and the engine halts.
    pub fn process_consensus_change(
        &mut self,
        cc: &ConsensusChange,
        addresses: &dyn AddressBook,
    ) -> Result<(), SyncError> {
        self.ensure_running()?;
        log::debug!(
            "[ENGINE] consensus change: -{} +{} blocks, {} coin / {} fund / {} pool diffs",
            cc.reverted_blocks.len(),
            cc.applied_blocks.len(),
            cc.coin_output_diffs.len(),
            cc.fund_output_diffs.len(),
            cc.fund_pool_diffs.len()
        );

        let owned = diff::OwnedDiffs::select(cc, addresses);
        let checked = owned
            .check(&self.state.ledger)
            .and_then(|()| history::check_revert(&self.state, cc));
        if let Err(err) = checked {
            return Err(self.halt(err));
        }

        let result = diff::update_confirmed_set(&mut self.state, cc, &owned)
            .and_then(|()| history::revert_history(&mut self.state, cc));
        if let Err(err) = result {
            return Err(self.halt(err));
        }
        history::apply_history(&mut self.state, cc, addresses, self.config.maturity_delay);
        Ok(())
    }

    /// Replaces the unconfirmed view with the relevant subset of `txns`.
    pub fn receive_unconfirmed(
        &mut self,
        txns: &[Transaction],
        addresses: &dyn AddressBook,
    ) -> Result<(), SyncError> {
        self.ensure_running()?;
        unconfirmed::rebuild_unconfirmed(
            &mut self.state,
            txns,
            addresses,
            self.config.maturity_delay,
        );
        Ok(())
    }

    /// Selects coin outputs worth consolidating, if any.
    pub fn plan_defrag(&self) -> Option<DefragPlan> {
        defrag::plan_defrag(&self.state, &self.config.defrag)
    }

    fn ensure_running(&self) -> Result<(), SyncError> {
        match &self.halted {
            Some(reason) => Err(SyncError::Halted(reason.clone())),
            None => Ok(()),
        }
    }

    fn halt(&mut self, err: SyncError) -> SyncError {
        log::error!("[ENGINE] wallet desynchronized from consensus: {}", err);
        self.halted = Some(err.to_string());
        err
    }

    // ================================
    // Read accessors
    // ================================

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    pub fn height(&self) -> BlockHeight {
        self.state.height
    }

    pub fn fund_pool(&self) -> Currency {
        self.state.fund_pool
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn confirmed_transactions(&self) -> &[ProcessedTransaction] {
        self.state.confirmed.entries()
    }

    pub fn unconfirmed_transactions(&self) -> &[ProcessedTransaction] {
        &self.state.unconfirmed
    }

    /// Looks an entry up in the confirmed log, then in the unconfirmed view.
    pub fn transaction(&self, id: &TransactionId) -> Option<&ProcessedTransaction> {
        self.state
            .confirmed
            .get(id)
            .or_else(|| self.state.unconfirmed.iter().find(|pt| pt.transaction_id == *id))
    }

    pub fn address_transactions(&self, address: &Address) -> Vec<&ProcessedTransaction> {
        self.confirmed_transactions()
            .iter()
            .filter(|pt| pt.involves(address))
            .collect()
    }

    pub fn address_unconfirmed_transactions(
        &self,
        address: &Address,
    ) -> Vec<&ProcessedTransaction> {
        self.state
            .unconfirmed
            .iter()
            .filter(|pt| pt.involves(address))
            .collect()
    }

    pub fn coin_outputs(&self) -> impl Iterator<Item = (&OutputId, &CoinOutput)> {
        self.state.ledger.coin_outputs()
    }

    pub fn fund_outputs(&self) -> impl Iterator<Item = (&OutputId, &FundOutput)> {
        self.state.ledger.fund_outputs()
    }

    pub fn confirmed_balance(&self) -> ConfirmedBalance {
        let mut balance = ConfirmedBalance::default();
        for (_, output) in self.coin_outputs() {
            balance.coins = balance.coins.saturating_add(output.value);
        }
        for (_, output) in self.fund_outputs() {
            balance.funds = balance.funds.saturating_add(output.value);
            balance.claims = balance.claims.saturating_add(claim_value(
                self.state.fund_pool,
                output.claim_start,
                output.value,
            ));
        }
        balance
    }
}
