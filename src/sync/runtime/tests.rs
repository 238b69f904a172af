#![cfg(test)]
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::config::{DefragConfig, WalletConfig};
use crate::sync::domain::SharedAddressBook;
use crate::sync::engine::DefragPlan;
use crate::sync::error::{GateError, SyncError};
use crate::sync::mock::{address, MockConsensus};
use crate::sync::runtime::{DefragSink, LoggingDefragSink, Wallet};

// --- Mocks ---

struct ChannelSink {
    plans: Mutex<Sender<DefragPlan>>,
}

impl DefragSink for ChannelSink {
    fn submit(&self, plan: DefragPlan) -> anyhow::Result<()> {
        self.plans.lock().unwrap().send(plan)?;
        Ok(())
    }
}

fn channel_sink() -> (Arc<dyn DefragSink>, Receiver<DefragPlan>) {
    let (tx, rx) = mpsc::channel();
    (
        Arc::new(ChannelSink {
            plans: Mutex::new(tx),
        }),
        rx,
    )
}

fn eager_defrag() -> WalletConfig {
    WalletConfig {
        defrag: DefragConfig {
            threshold: 2,
            batch_size: 2,
            start_index: 0,
        },
        ..WalletConfig::default()
    }
}

fn wallet_for(names: &[&str]) -> Wallet<SharedAddressBook> {
    let book: SharedAddressBook = names.iter().map(|n| address(n)).collect();
    Wallet::new(WalletConfig::default(), book, Arc::new(LoggingDefragSink)).unwrap()
}

// --- Tests ---

#[test]
fn wallet_applies_changes_and_exposes_them() {
    let wallet = wallet_for(&["alice"]);
    let mut chain = MockConsensus::new();
    let alice = address("alice");

    let txn = chain.coin_payment(alice, 100);
    wallet
        .process_consensus_change(&chain.mine(vec![txn.clone()], vec![], 5))
        .unwrap();

    assert_eq!(wallet.height().unwrap(), 1);
    assert_eq!(wallet.fund_pool().unwrap(), 5);
    assert_eq!(wallet.transactions().unwrap().len(), 1);
    assert!(wallet.transaction(&txn.id).unwrap().is_some());
    assert_eq!(wallet.coin_outputs().unwrap().len(), 1);
    assert_eq!(wallet.confirmed_balance().unwrap().coins, 100);
    assert_eq!(wallet.address_transactions(&alice).unwrap().len(), 1);

    wallet.close().unwrap();
}

#[test]
fn updates_after_close_are_silently_dropped() {
    let wallet = wallet_for(&["alice"]);
    let mut chain = MockConsensus::new();
    let txn = chain.coin_payment(address("alice"), 1);
    let cc = chain.mine(vec![txn.clone()], vec![], 0);

    wallet.close().unwrap();
    assert!(wallet.is_closed());

    assert_eq!(wallet.process_consensus_change(&cc), Ok(()));
    assert_eq!(wallet.receive_unconfirmed_transactions(&[txn]), Ok(()));

    // readers still work, nothing changed
    assert_eq!(wallet.height().unwrap(), 0);
    assert!(wallet.transactions().unwrap().is_empty());
    assert!(wallet.unconfirmed_transactions().unwrap().is_empty());
    assert_eq!(wallet.close(), Err(GateError::Stopped));
}

#[test]
fn synced_change_schedules_defrag() {
    let (sink, plans) = channel_sink();
    let book: SharedAddressBook = [address("alice")].into_iter().collect();
    let wallet = Wallet::new(eager_defrag(), book, sink).unwrap();
    let mut chain = MockConsensus::new();

    let txns: Vec<_> = (1..=3)
        .map(|v| chain.coin_payment(address("alice"), v))
        .collect();
    let mut cc = chain.mine(txns, vec![], 0);
    cc.synced = true;
    wallet.process_consensus_change(&cc).unwrap();

    let plan = plans.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(plan.outputs.len(), 2);
    assert_eq!(plan.total, 3 + 2);

    wallet.close().unwrap();
}

#[test]
fn unsynced_change_does_not_defrag() {
    let (sink, plans) = channel_sink();
    let book: SharedAddressBook = [address("alice")].into_iter().collect();
    let wallet = Wallet::new(eager_defrag(), book, sink).unwrap();
    let mut chain = MockConsensus::new();

    let txns: Vec<_> = (1..=3)
        .map(|v| chain.coin_payment(address("alice"), v))
        .collect();
    wallet
        .process_consensus_change(&chain.mine(txns, vec![], 0))
        .unwrap();

    assert!(plans.recv_timeout(Duration::from_millis(200)).is_err());
    wallet.close().unwrap();
}

#[test]
fn desync_is_reported_and_halts_the_wallet() {
    let wallet = wallet_for(&["alice"]);
    let mut chain = MockConsensus::new();
    let txn = chain.coin_payment(address("alice"), 10);
    let cc = chain.mine(vec![txn], vec![], 0);

    wallet.process_consensus_change(&cc).unwrap();
    let before = wallet.snapshot().unwrap();
    let err = wallet.process_consensus_change(&cc).unwrap_err();
    assert!(err.is_fatal());
    assert!(wallet.is_halted().unwrap());
    // readers never see the rejected change
    assert_eq!(wallet.snapshot().unwrap(), before);

    assert!(matches!(
        wallet.receive_unconfirmed_transactions(&[]),
        Err(SyncError::Halted(_))
    ));
    // close still succeeds on a halted wallet
    wallet.close().unwrap();
}

#[test]
fn addresses_added_later_are_tracked() {
    let book = SharedAddressBook::new();
    let wallet = Wallet::new(
        WalletConfig::default(),
        book.clone(),
        Arc::new(LoggingDefragSink),
    )
    .unwrap();
    let mut chain = MockConsensus::new();
    let bob = address("bob");

    let early = chain.coin_payment(bob, 1);
    wallet
        .process_consensus_change(&chain.mine(vec![early], vec![], 0))
        .unwrap();
    assert!(wallet.transactions().unwrap().is_empty());

    book.insert(bob);
    let late = chain.coin_payment(bob, 2);
    wallet
        .process_consensus_change(&chain.mine(vec![late.clone()], vec![], 0))
        .unwrap();

    let log = wallet.transactions().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].transaction_id, late.id);
    wallet.close().unwrap();
}

#[test]
fn concurrent_pool_updates_do_not_disturb_block_processing() {
    let wallet = Arc::new(wallet_for(&["alice"]));
    let mut chain = MockConsensus::new();

    let pending = chain.coin_payment(address("alice"), 1);
    let changes: Vec<_> = (0..20)
        .map(|i| {
            let txn = chain.coin_payment(address("alice"), i + 1);
            chain.mine(vec![txn], vec![], 1)
        })
        .collect();

    let pool_threads: Vec<_> = (0..4)
        .map(|_| {
            let wallet = wallet.clone();
            let pending = pending.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    wallet
                        .receive_unconfirmed_transactions(std::slice::from_ref(&pending))
                        .unwrap();
                }
            })
        })
        .collect();

    for cc in &changes {
        wallet.process_consensus_change(cc).unwrap();
        // every read sees whole blocks only
        let (height, logged) = wallet
            .with_engine(|e| (e.height(), e.confirmed_transactions().len()))
            .unwrap();
        assert_eq!(height as usize, logged);
    }
    for t in pool_threads {
        t.join().unwrap();
    }

    assert_eq!(wallet.height().unwrap(), 20);
    assert_eq!(wallet.fund_pool().unwrap(), 20);
    assert_eq!(wallet.unconfirmed_transactions().unwrap().len(), 1);
    wallet.close().unwrap();
}
