use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::sync::error::GateError;

#[derive(Debug, Default)]
struct GateState {
    stopped: bool,
    active: usize,
}

/// Shutdown-aware admission for units of work.
///
/// Every unit registers with [`add`](Self::add) and deregisters when the
/// returned guard drops. Once [`stop`](Self::stop) is called no new unit is
/// admitted, and `stop` itself returns only after every admitted unit has
/// finished.
#[derive(Debug, Default)]
pub struct ThreadGroup {
    state: Mutex<GateState>,
    idle: Condvar,
}

/// Registration of one unit of work. Deregisters on drop.
#[must_use = "the unit of work is deregistered as soon as the guard drops"]
#[derive(Debug)]
pub struct GateGuard<'a> {
    group: &'a ThreadGroup,
}

impl ThreadGroup {
    pub fn new() -> Self {
        Self::default()
    }

    // the counters stay consistent even if a holder panicked
    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self) -> Result<GateGuard<'_>, GateError> {
        let mut state = self.lock();
        if state.stopped {
            return Err(GateError::Stopped);
        }
        state.active += 1;
        Ok(GateGuard { group: self })
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// Refuses new work and blocks until in-flight work is done.
    ///
    /// Must not be called while holding a [`GateGuard`] of the same group.
    pub fn stop(&self) -> Result<(), GateError> {
        let mut state = self.lock();
        if state.stopped {
            return Err(GateError::Stopped);
        }
        state.stopped = true;
        log::info!("[GATE] stopping, {} units in flight", state.active);
        while state.active > 0 {
            state = self
                .idle
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        log::debug!("[GATE] stopped");
        Ok(())
    }

    fn done(&self) {
        let mut state = self.lock();
        state.active -= 1;
        if state.active == 0 {
            self.idle.notify_all();
        }
    }
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.group.done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn add_fails_after_stop() {
        let group = ThreadGroup::new();
        drop(group.add().unwrap());

        group.stop().unwrap();

        assert!(group.is_stopped());
        assert_eq!(group.add().unwrap_err(), GateError::Stopped);
        assert_eq!(group.stop(), Err(GateError::Stopped));
    }

    #[test]
    fn stop_waits_for_in_flight_work() {
        let group = Arc::new(ThreadGroup::new());
        let (registered_tx, registered_rx) = mpsc::channel();
        let (finished_tx, finished_rx) = mpsc::channel();

        let worker = {
            let group = group.clone();
            thread::spawn(move || {
                let _guard = group.add().unwrap();
                registered_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(50));
                finished_tx.send(()).unwrap();
            })
        };

        registered_rx.recv().unwrap();
        group.stop().unwrap();

        // stop only returned once the worker had finished
        assert!(finished_rx.try_recv().is_ok());
        worker.join().unwrap();
    }
}
