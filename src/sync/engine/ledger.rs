//! Confirmed output set and the append-only value history behind it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::sync::error::SyncError;
use crate::sync::types::{AssetKind, CoinOutput, Currency, FundOutput, OutputId};

/// Every output value the wallet has ever seen.
///
/// Inputs only carry the identifier of the output they spend, and by the time
/// an input is processed its output is usually already gone from the
/// [`OutputLedger`]. Entries are written once and never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricValues {
    values: HashMap<OutputId, Currency>,
    claim_starts: HashMap<OutputId, Currency>,
}

impl HistoricValues {
    /// Records the value of `id`. The first write wins.
    pub fn record_value(&mut self, id: OutputId, value: Currency) {
        self.values.entry(id).or_insert(value);
    }

    /// Records the claim start of the fund output `id`. The first write wins.
    pub fn record_claim_start(&mut self, id: OutputId, claim_start: Currency) {
        self.claim_starts.entry(id).or_insert(claim_start);
    }

    pub fn value(&self, id: &OutputId) -> Option<Currency> {
        self.values.get(id).copied()
    }

    pub fn claim_start(&self, id: &OutputId) -> Option<Currency> {
        self.claim_starts.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Outputs currently spendable by the wallet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLedger {
    coin_outputs: HashMap<OutputId, CoinOutput>,
    fund_outputs: HashMap<OutputId, FundOutput>,
}

impl OutputLedger {
    /// Adds a coin output and records its value in `history`.
    ///
    /// Fails if the identifier is already live.
    pub fn apply_coin_output(
        &mut self,
        history: &mut HistoricValues,
        id: OutputId,
        output: CoinOutput,
    ) -> Result<(), SyncError> {
        if self.coin_outputs.contains_key(&id) {
            return Err(SyncError::OutputAlreadyPresent {
                kind: AssetKind::Coin,
                id,
            });
        }
        history.record_value(id, output.value);
        self.coin_outputs.insert(id, output);
        Ok(())
    }

    pub fn remove_coin_output(&mut self, id: &OutputId) -> Result<CoinOutput, SyncError> {
        self.coin_outputs.remove(id).ok_or(SyncError::OutputMissing {
            kind: AssetKind::Coin,
            id: *id,
        })
    }

    /// Adds a fund output and records its value and claim start in `history`.
    ///
    /// The claim start is the `claim_start` carried by the output, which the
    /// consensus layer sets to the pool level at the time it was created.
    pub fn apply_fund_output(
        &mut self,
        history: &mut HistoricValues,
        id: OutputId,
        output: FundOutput,
    ) -> Result<(), SyncError> {
        if self.fund_outputs.contains_key(&id) {
            return Err(SyncError::OutputAlreadyPresent {
                kind: AssetKind::Fund,
                id,
            });
        }
        history.record_value(id, output.value);
        history.record_claim_start(id, output.claim_start);
        self.fund_outputs.insert(id, output);
        Ok(())
    }

    pub fn remove_fund_output(&mut self, id: &OutputId) -> Result<FundOutput, SyncError> {
        self.fund_outputs.remove(id).ok_or(SyncError::OutputMissing {
            kind: AssetKind::Fund,
            id: *id,
        })
    }

    pub fn coin_output(&self, id: &OutputId) -> Option<&CoinOutput> {
        self.coin_outputs.get(id)
    }

    pub fn fund_output(&self, id: &OutputId) -> Option<&FundOutput> {
        self.fund_outputs.get(id)
    }

    pub fn coin_outputs(&self) -> impl Iterator<Item = (&OutputId, &CoinOutput)> {
        self.coin_outputs.iter()
    }

    pub fn fund_outputs(&self) -> impl Iterator<Item = (&OutputId, &FundOutput)> {
        self.fund_outputs.iter()
    }
}
