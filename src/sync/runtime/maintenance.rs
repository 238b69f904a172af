//! Background wallet maintenance.
//!
//! Consensus updates must return quickly, so follow-up work (currently only
//! output defragmentation) is queued here and executed by a worker with its
//! own tokio runtime. The worker takes the wallet lock on its own, after the
//! update that queued the task has already released it.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tokio::sync::mpsc;

use crate::sync::engine::{DefragPlan, WalletEngine};
use crate::sync::runtime::gate::ThreadGroup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceTask {
    /// Consolidate small coin outputs if the wallet is fragmented.
    Defrag,
}

/// Receives defrag plans and turns them into transactions.
pub trait DefragSink: Send + Sync {
    fn submit(&self, plan: DefragPlan) -> anyhow::Result<()>;
}

/// Sink that only reports the plans it receives.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingDefragSink;

impl DefragSink for LoggingDefragSink {
    fn submit(&self, plan: DefragPlan) -> anyhow::Result<()> {
        log::info!(
            "[MAINTENANCE] defrag would merge {} outputs worth {}",
            plan.outputs.len(),
            plan.total
        );
        Ok(())
    }
}

pub(crate) struct MaintenanceWorker {
    gate: Arc<ThreadGroup>,
    engine: Arc<Mutex<WalletEngine>>,
    sink: Arc<dyn DefragSink>,
    tasks: mpsc::UnboundedReceiver<MaintenanceTask>,
}

impl MaintenanceWorker {
    pub(crate) fn new(
        gate: Arc<ThreadGroup>,
        engine: Arc<Mutex<WalletEngine>>,
        sink: Arc<dyn DefragSink>,
        tasks: mpsc::UnboundedReceiver<MaintenanceTask>,
    ) -> Self {
        Self {
            gate,
            engine,
            sink,
            tasks,
        }
    }

    /// Runs the worker on a dedicated thread until the task channel closes or
    /// the gate stops.
    pub(crate) fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("wallet-maintenance".into())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(err) => {
                        log::error!("[MAINTENANCE] cannot start runtime: {}", err);
                        return;
                    }
                };
                rt.block_on(self.run());
            })
    }

    async fn run(mut self) {
        log::debug!("[MAINTENANCE] worker started");
        while let Some(task) = self.tasks.recv().await {
            // a burst of synced notifications collapses into one run
            while let Ok(next) = self.tasks.try_recv() {
                if next != task {
                    log::warn!("[MAINTENANCE] dropping queued {:?}", next);
                }
            }
            if !self.handle(task) {
                break;
            }
        }
        log::debug!("[MAINTENANCE] worker exiting");
    }

    /// Returns `false` once the worker should stop.
    fn handle(&self, task: MaintenanceTask) -> bool {
        let Ok(_registration) = self.gate.add() else {
            log::trace!("[MAINTENANCE] shutting down, {:?} skipped", task);
            return false;
        };

        match task {
            MaintenanceTask::Defrag => {
                let plan = match self.engine.lock() {
                    Ok(engine) if engine.is_halted() => None,
                    Ok(engine) => engine.plan_defrag(),
                    Err(_) => {
                        log::error!("[MAINTENANCE] wallet lock poisoned");
                        return false;
                    }
                };
                if let Some(plan) = plan {
                    log::info!(
                        "[MAINTENANCE] submitting defrag of {} outputs",
                        plan.outputs.len()
                    );
                    if let Err(err) = self.sink.submit(plan) {
                        log::warn!("[MAINTENANCE] defrag failed: {:#}", err);
                    }
                }
            }
        }
        true
    }
}
