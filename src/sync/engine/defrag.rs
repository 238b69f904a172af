use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::DefragConfig;
use crate::sync::engine::state::EngineState;
use crate::sync::types::{Currency, OutputId};

/// Coin outputs selected for consolidation into a single output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefragPlan {
    pub outputs: Vec<OutputId>,
    pub total: Currency,
}

/// Picks the coin outputs to merge, or `None` if the wallet is not fragmented
/// enough.
///
/// Outputs already spent by an unconfirmed transaction are not candidates.
/// The `start_index` largest candidates are left alone and the next
/// `batch_size` are selected.
pub fn plan_defrag(state: &EngineState, config: &DefragConfig) -> Option<DefragPlan> {
    let pending: HashSet<&OutputId> = state
        .unconfirmed
        .iter()
        .filter_map(|pt| pt.transaction.as_ref())
        .flat_map(|txn| txn.coin_inputs.iter().map(|input| &input.parent_id))
        .collect();

    let mut candidates: Vec<(OutputId, Currency)> = state
        .ledger
        .coin_outputs()
        .filter(|(id, _)| !pending.contains(id))
        .map(|(id, output)| (*id, output.value))
        .collect();

    if candidates.len() < config.threshold {
        log::trace!(
            "[DEFRAG] {} spendable outputs, below threshold {}",
            candidates.len(),
            config.threshold
        );
        return None;
    }

    // value descending, id as tie-break so the plan is deterministic
    candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let selected: Vec<(OutputId, Currency)> = candidates
        .into_iter()
        .skip(config.start_index)
        .take(config.batch_size)
        .collect();
    if selected.is_empty() {
        return None;
    }

    Some(DefragPlan {
        total: selected
            .iter()
            .fold(0, |acc: Currency, (_, value)| acc.saturating_add(*value)),
        outputs: selected.into_iter().map(|(id, _)| id).collect(),
    })
}
