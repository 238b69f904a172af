//! Keeps a wallet's view of its outputs and transaction history in step with
//! the consensus layer.
//!
//! [`sync::engine`] holds the pure state transitions, [`sync::runtime`] wraps
//! them with the shutdown gate, the wallet lock and background maintenance.

pub mod config;
pub mod persistence;
pub mod sync;

pub use config::{DefragConfig, WalletConfig};
pub use sync::{
    AddressBook, ConsensusChange, EngineState, SharedAddressBook, SyncError, Transaction, Wallet,
    WalletEngine,
};
