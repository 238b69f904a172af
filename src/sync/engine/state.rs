use serde::{Deserialize, Serialize};

use crate::sync::engine::ledger::{HistoricValues, OutputLedger};
use crate::sync::engine::transaction_log::TransactionLog;
use crate::sync::engine::types::ProcessedTransaction;
use crate::sync::types::{BlockHeight, Currency};

/// Everything the wallet knows about the chain.
///
/// These fields change together under one lock; none of them is meaningful
/// on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    pub ledger: OutputLedger,

    /// output id -> value (and claim start), never pruned
    pub historic: HistoricValues,

    pub confirmed: TransactionLog,

    /// Rebuilt from scratch on every transaction pool update.
    #[serde(skip)]
    pub unconfirmed: Vec<ProcessedTransaction>,

    /// Number of blocks applied minus number of blocks reverted.
    pub height: BlockHeight,

    pub fund_pool: Currency,
}
