use crate::sync::domain::AddressBook;
use crate::sync::engine::history::{process_transaction, Confirmation};
use crate::sync::engine::state::EngineState;
use crate::sync::types::{BlockHeight, Transaction};

/// Replaces the unconfirmed view with the relevant subset of `txns`.
///
/// The previous view is dropped entirely. Inputs spending outputs that the
/// wallet has never seen resolve to zero.
pub fn rebuild_unconfirmed(
    state: &mut EngineState,
    txns: &[Transaction],
    addresses: &dyn AddressBook,
    maturity_delay: BlockHeight,
) {
    state.unconfirmed.clear();
    for txn in txns {
        let pt = process_transaction(
            state,
            txn,
            Confirmation::unconfirmed(),
            addresses,
            maturity_delay,
        );
        if pt.is_relevant() {
            state.unconfirmed.push(pt);
        }
    }
    log::debug!(
        "[ENGINE] unconfirmed view rebuilt: {} of {} txns relevant",
        state.unconfirmed.len(),
        txns.len()
    );
}
