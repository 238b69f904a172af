use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::sync::engine::types::ProcessedTransaction;
use crate::sync::types::TransactionId;

/// Confirmed transaction history.
///
/// Entries are only ever pushed to or popped from the tail. The index maps a
/// transaction id to its position in `entries` and is kept in lockstep with
/// every push and pop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ProcessedTransaction>", into = "Vec<ProcessedTransaction>")]
pub struct TransactionLog {
    entries: Vec<ProcessedTransaction>,
    index: HashMap<TransactionId, usize>,
}

impl TransactionLog {
    pub fn push(&mut self, entry: ProcessedTransaction) {
        self.index.insert(entry.transaction_id, self.entries.len());
        self.entries.push(entry);
    }

    /// Pops the tail entry if it was logged under `id`.
    pub fn pop_if_tail(&mut self, id: &TransactionId) -> Option<ProcessedTransaction> {
        if self.entries.last()?.transaction_id != *id {
            return None;
        }
        let entry = self.entries.pop()?;
        self.index.remove(&entry.transaction_id);
        Some(entry)
    }

    pub fn get(&self, id: &TransactionId) -> Option<&ProcessedTransaction> {
        self.index.get(id).and_then(|&pos| self.entries.get(pos))
    }

    pub fn contains(&self, id: &TransactionId) -> bool {
        self.index.contains_key(id)
    }

    pub fn last(&self) -> Option<&ProcessedTransaction> {
        self.entries.last()
    }

    pub fn entries(&self) -> &[ProcessedTransaction] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<ProcessedTransaction>> for TransactionLog {
    fn from(entries: Vec<ProcessedTransaction>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| (entry.transaction_id, pos))
            .collect();
        Self { entries, index }
    }
}

impl From<TransactionLog> for Vec<ProcessedTransaction> {
    fn from(log: TransactionLog) -> Self {
        log.entries
    }
}
