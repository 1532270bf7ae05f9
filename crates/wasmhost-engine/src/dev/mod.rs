//! Development mode: file watching and live reconciliation

mod reconcile;
mod watch;

pub use reconcile::{ChangeEvent, Reconciled, Reconciler};
pub use watch::FileWatcher;
