use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use tokio::sync::mpsc;

use crate::config::WalletConfig;
use crate::sync::domain::AddressBook;
use crate::sync::engine::{ConfirmedBalance, EngineState, ProcessedTransaction, WalletEngine};
use crate::sync::error::{GateError, SyncError};
use crate::sync::runtime::gate::ThreadGroup;
use crate::sync::runtime::maintenance::{DefragSink, MaintenanceTask, MaintenanceWorker};
use crate::sync::types::{
    Address, BlockHeight, CoinOutput, ConsensusChange, Currency, FundOutput, OutputId,
    Transaction, TransactionId,
};

/// **Wallet**
///
/// The imperative shell around [`WalletEngine`]. It has three jobs:
/// 1. **Admit** updates through the shutdown gate, silently dropping the ones
///    that arrive after [`close`](Self::close).
/// 2. **Serialize** every mutation and every read behind one lock, so readers
///    never observe a half-applied consensus change.
/// 3. **Dispatch** maintenance to a background worker once the consensus
///    layer reports it is synced, without waiting for it.
pub struct Wallet<A> {
    gate: Arc<ThreadGroup>,
    engine: Arc<Mutex<WalletEngine>>,
    addresses: A,
    maintenance: Mutex<Option<mpsc::UnboundedSender<MaintenanceTask>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<A: AddressBook> Wallet<A> {
    /// Creates an empty wallet and starts its maintenance worker.
    pub fn new(
        config: WalletConfig,
        addresses: A,
        sink: Arc<dyn DefragSink>,
    ) -> std::io::Result<Self> {
        Self::from_state(config, EngineState::default(), addresses, sink)
    }

    /// Resumes a wallet from a saved state.
    pub fn from_state(
        config: WalletConfig,
        state: EngineState,
        addresses: A,
        sink: Arc<dyn DefragSink>,
    ) -> std::io::Result<Self> {
        let gate = Arc::new(ThreadGroup::new());
        let engine = Arc::new(Mutex::new(WalletEngine::from_state(config, state)));
        let (tx, rx) = mpsc::unbounded_channel();

        let worker = MaintenanceWorker::new(gate.clone(), engine.clone(), sink, rx).spawn()?;

        Ok(Self {
            gate,
            engine,
            addresses,
            maintenance: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Applies a consensus change to the confirmed outputs and history.
    ///
    /// Returns `Ok(())` without doing anything once the wallet is closing.
    /// An `Err` means the wallet no longer matches the chain and has stopped
    /// accepting updates.
    pub fn process_consensus_change(&self, cc: &ConsensusChange) -> Result<(), SyncError> {
        let Ok(_registration) = self.gate.add() else {
            log::trace!("[WALLET] closing, consensus change dropped");
            return Ok(());
        };

        self.engine()?.process_consensus_change(cc, &self.addresses)?;

        if cc.synced {
            self.schedule(MaintenanceTask::Defrag);
        }
        Ok(())
    }

    /// Replaces the unconfirmed view with the relevant subset of the
    /// transaction pool.
    pub fn receive_unconfirmed_transactions(&self, txns: &[Transaction]) -> Result<(), SyncError> {
        let Ok(_registration) = self.gate.add() else {
            log::trace!("[WALLET] closing, transaction pool update dropped");
            return Ok(());
        };

        self.engine()?.receive_unconfirmed(txns, &self.addresses)
    }

    /// Stops admitting updates, waits for in-flight ones and shuts the
    /// maintenance worker down.
    pub fn close(&self) -> Result<(), GateError> {
        self.gate.stop()?;

        // dropping the sender ends the worker loop
        self.maintenance
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = worker {
            if handle.join().is_err() {
                log::error!("[WALLET] maintenance worker panicked");
            }
        }
        log::info!("[WALLET] closed");
        Ok(())
    }

    fn schedule(&self, task: MaintenanceTask) {
        let sender = self
            .maintenance
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref().map(|tx| tx.send(task)) {
            Some(Ok(())) => log::debug!("[WALLET] scheduled {:?}", task),
            _ => log::warn!("[WALLET] maintenance worker gone, {:?} dropped", task),
        }
    }

    fn engine(&self) -> Result<MutexGuard<'_, WalletEngine>, SyncError> {
        self.engine.lock().map_err(|_| SyncError::LockPoisoned)
    }

    /// Runs `f` against a consistent view of the wallet.
    pub fn with_engine<R>(&self, f: impl FnOnce(&WalletEngine) -> R) -> Result<R, SyncError> {
        let engine = self.engine()?;
        Ok(f(&engine))
    }

    // ================================
    // Read accessors
    // ================================

    pub fn addresses(&self) -> &A {
        &self.addresses
    }

    pub fn is_closed(&self) -> bool {
        self.gate.is_stopped()
    }

    pub fn is_halted(&self) -> Result<bool, SyncError> {
        self.with_engine(|e| e.is_halted())
    }

    pub fn height(&self) -> Result<BlockHeight, SyncError> {
        self.with_engine(|e| e.height())
    }

    pub fn fund_pool(&self) -> Result<Currency, SyncError> {
        self.with_engine(|e| e.fund_pool())
    }

    pub fn transactions(&self) -> Result<Vec<ProcessedTransaction>, SyncError> {
        self.with_engine(|e| e.confirmed_transactions().to_vec())
    }

    pub fn transaction(&self, id: &TransactionId) -> Result<Option<ProcessedTransaction>, SyncError> {
        self.with_engine(|e| e.transaction(id).cloned())
    }

    pub fn unconfirmed_transactions(&self) -> Result<Vec<ProcessedTransaction>, SyncError> {
        self.with_engine(|e| e.unconfirmed_transactions().to_vec())
    }

    pub fn address_transactions(
        &self,
        address: &Address,
    ) -> Result<Vec<ProcessedTransaction>, SyncError> {
        self.with_engine(|e| e.address_transactions(address).into_iter().cloned().collect())
    }

    pub fn address_unconfirmed_transactions(
        &self,
        address: &Address,
    ) -> Result<Vec<ProcessedTransaction>, SyncError> {
        self.with_engine(|e| {
            e.address_unconfirmed_transactions(address)
                .into_iter()
                .cloned()
                .collect()
        })
    }

    pub fn coin_outputs(&self) -> Result<Vec<(OutputId, CoinOutput)>, SyncError> {
        self.with_engine(|e| e.coin_outputs().map(|(id, o)| (*id, o.clone())).collect())
    }

    pub fn fund_outputs(&self) -> Result<Vec<(OutputId, FundOutput)>, SyncError> {
        self.with_engine(|e| e.fund_outputs().map(|(id, o)| (*id, o.clone())).collect())
    }

    pub fn confirmed_balance(&self) -> Result<ConfirmedBalance, SyncError> {
        self.with_engine(|e| e.confirmed_balance())
    }

    /// Copy of the persistent part of the wallet state.
    pub fn snapshot(&self) -> Result<EngineState, SyncError> {
        self.with_engine(|e| e.state().clone())
    }
}

impl<A> Drop for Wallet<A> {
    fn drop(&mut self) {
        // let the worker finish on its own
        self.maintenance
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}
