//! Reconciliation: converging local billing rows to device-reported state.

pub mod engine;
pub mod store;

pub use engine::{ISOLATION_PROFILE_CANDIDATES, SyncEngine, SyncError, SyncMode, SyncReport};
pub use store::{ActivitySink, BillingStore, CustomerSyncUpdate, OrmStore, StoreError};
