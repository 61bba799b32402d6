// Sync pipeline: fetch, reconcile against the ledger, format, dispatch.

pub mod reconcile;
pub mod sync;
