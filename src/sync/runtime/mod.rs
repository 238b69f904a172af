pub mod gate;
pub mod maintenance;
pub mod wallet;

#[cfg(test)]
mod tests;

pub use gate::{GateGuard, ThreadGroup};
pub use maintenance::{DefragSink, LoggingDefragSink, MaintenanceTask};
pub use wallet::Wallet;
