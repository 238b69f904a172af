use std::collections::HashMap;

use crate::sync::domain::AddressBook;
use crate::sync::engine::ledger::OutputLedger;
use crate::sync::engine::state::EngineState;
use crate::sync::error::SyncError;
use crate::sync::types::{
    AssetKind, CoinOutputDiff, ConsensusChange, DiffDirection, FundOutputDiff, OutputId,
};

/// Output diffs of one consensus change that touch the wallet's addresses.
///
/// Selected once so that checking and applying see the same set even if the
/// address book grows in between.
pub struct OwnedDiffs<'a> {
    coins: Vec<&'a CoinOutputDiff>,
    funds: Vec<&'a FundOutputDiff>,
}

impl<'a> OwnedDiffs<'a> {
    pub fn select(cc: &'a ConsensusChange, addresses: &dyn AddressBook) -> Self {
        Self {
            coins: cc
                .coin_output_diffs
                .iter()
                .filter(|diff| addresses.contains(&diff.output.address))
                .collect(),
            funds: cc
                .fund_output_diffs
                .iter()
                .filter(|diff| addresses.contains(&diff.output.address))
                .collect(),
        }
    }

    /// Replays the diffs against the ledger's presence sets without touching
    /// it, returning the first error applying them would hit.
    pub fn check(&self, ledger: &OutputLedger) -> Result<(), SyncError> {
        let mut coins: HashMap<OutputId, bool> = HashMap::new();
        for diff in &self.coins {
            let live = *coins
                .entry(diff.id)
                .or_insert_with(|| ledger.coin_output(&diff.id).is_some());
            check_presence(AssetKind::Coin, diff.direction, diff.id, live)?;
            coins.insert(diff.id, diff.direction == DiffDirection::Apply);
        }

        let mut funds: HashMap<OutputId, bool> = HashMap::new();
        for diff in &self.funds {
            let live = *funds
                .entry(diff.id)
                .or_insert_with(|| ledger.fund_output(&diff.id).is_some());
            check_presence(AssetKind::Fund, diff.direction, diff.id, live)?;
            funds.insert(diff.id, diff.direction == DiffDirection::Apply);
        }
        Ok(())
    }
}

fn check_presence(
    kind: AssetKind,
    direction: DiffDirection,
    id: OutputId,
    live: bool,
) -> Result<(), SyncError> {
    match (direction, live) {
        (DiffDirection::Apply, true) => Err(SyncError::OutputAlreadyPresent { kind, id }),
        (DiffDirection::Revert, false) => Err(SyncError::OutputMissing { kind, id }),
        _ => Ok(()),
    }
}

/// Applies the owned output diffs and the fund pool diffs of `cc` to the
/// confirmed set, in the order the consensus layer produced them.
pub fn update_confirmed_set(
    state: &mut EngineState,
    cc: &ConsensusChange,
    owned: &OwnedDiffs<'_>,
) -> Result<(), SyncError> {
    for diff in &owned.coins {
        log::trace!("[ENGINE] coin diff {:?} {}", diff.direction, diff.id);
        match diff.direction {
            DiffDirection::Apply => {
                state
                    .ledger
                    .apply_coin_output(&mut state.historic, diff.id, diff.output.clone())?;
            }
            DiffDirection::Revert => {
                state.ledger.remove_coin_output(&diff.id)?;
            }
        }
    }

    for diff in &owned.funds {
        log::trace!("[ENGINE] fund diff {:?} {}", diff.direction, diff.id);
        match diff.direction {
            DiffDirection::Apply => {
                state
                    .ledger
                    .apply_fund_output(&mut state.historic, diff.id, diff.output.clone())?;
            }
            DiffDirection::Revert => {
                state.ledger.remove_fund_output(&diff.id)?;
            }
        }
    }

    for diff in &cc.fund_pool_diffs {
        state.fund_pool = match diff.direction {
            DiffDirection::Apply => diff.adjusted,
            DiffDirection::Revert => diff.previous,
        };
    }

    Ok(())
}
