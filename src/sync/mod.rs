pub mod domain;
pub mod engine;
pub mod error;
pub mod runtime;
pub mod types;

#[cfg(test)]
pub mod mock;

pub use domain::{AddressBook, SharedAddressBook};
pub use engine::{EngineState, ProcessedTransaction, WalletEngine};
pub use error::{GateError, SyncError};
pub use runtime::{DefragSink, LoggingDefragSink, Wallet};
pub use types::{ConsensusChange, Transaction};
