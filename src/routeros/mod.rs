//! RouterOS API client: wire codec, session state machine and the
//! enforcement operations built on top of them.

pub mod error;
pub mod ops;
pub mod proto;
pub mod query;
pub mod record;
pub mod session;
pub mod transport;

pub use error::DeviceError;
pub use ops::HealthSnapshot;
pub use query::Query;
pub use record::DeviceRecord;
pub use session::{DeviceSession, SessionBudget};
pub use transport::{ApiConnector, DeviceEndpoint, DeviceTransport, TransportConnector};
