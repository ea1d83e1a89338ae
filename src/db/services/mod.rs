//! High-level API over the billing tables. Encapsulates the query logic so
//! the engine, the job runner and the web handlers never touch SQL shapes
//! directly. One sub-module per domain entity; everything re-exported here.

pub mod activity_service;
pub mod customer_service;
pub mod package_service;
pub mod router_service;

pub use activity_service::*;
pub use customer_service::*;
pub use package_service::*;
pub use router_service::*;
