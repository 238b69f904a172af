use crate::sync::types::{AssetKind, OutputId};

/// Errors returned by the mutating wallet entry points.
///
/// Everything except [`SyncError::LockPoisoned`] means the consensus diff
/// stream disagrees with the wallet's ledger. The engine halts on the first
/// one and refuses further updates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("adding an existing {kind} output {id} to the wallet")]
    OutputAlreadyPresent { kind: AssetKind, id: OutputId },

    #[error("deleting nonexisting {kind} output {id} from the wallet")]
    OutputMissing { kind: AssetKind, id: OutputId },

    #[error("reverted a block while the tracked height was already zero")]
    HeightUnderflow,

    #[error("wallet halted after an earlier desynchronization: {0}")]
    Halted(String),

    #[error("wallet state lock poisoned")]
    LockPoisoned,
}

impl SyncError {
    /// True for invariant violations caused by a desynchronized diff stream.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SyncError::LockPoisoned)
    }
}

/// Returned by [`ThreadGroup::add`](crate::sync::runtime::ThreadGroup::add)
/// once shutdown has begun.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("thread group already stopped")]
    Stopped,
}
