//! Device session lifecycle.
//!
//! A [`DeviceSession`] owns at most one live transport and is an explicit
//! state machine: `Closed` or `Open`. Operations on a closed session fail
//! with `DeviceError::NotConnected` instead of silently doing nothing, and
//! `close` is idempotent no matter how the session ended. Sessions are
//! created per reconciliation run or per enforcement job and never reused.

use std::time::Duration;

use tracing::{debug, warn};

use super::error::DeviceError;
use super::proto::ReplyKind;
use super::query::Query;
use super::record::DeviceRecord;
use super::transport::{DeviceEndpoint, DeviceTransport, TransportConnector};

/// Timeout/attempt budget for one logical operation.
///
/// Interactive callers (the live-status endpoint) use [`SessionBudget::INTERACTIVE`]
/// to keep the UI responsive; scheduled scans and enforcement jobs use
/// [`SessionBudget::DEFAULT`]. The two budgets are intentionally different.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionBudget {
    /// Bound for each individual connect/read/write on the wire.
    pub timeout: Duration,
    /// How many times `open` may try to establish the connection.
    pub attempts: u32,
}

impl SessionBudget {
    pub const DEFAULT: Self = Self {
        timeout: Duration::from_secs(10),
        attempts: 3,
    };

    /// Sub-5-second budget for request-scoped calls.
    pub const INTERACTIVE: Self = Self {
        timeout: Duration::from_secs(4),
        attempts: 1,
    };

    pub fn new(timeout: Duration, attempts: u32) -> Self {
        Self {
            timeout,
            attempts: attempts.max(1),
        }
    }
}

enum SessionState {
    Closed,
    Open(Box<dyn DeviceTransport>),
}

pub struct DeviceSession {
    state: SessionState,
}

impl DeviceSession {
    /// Connects and authenticates, retrying up to `budget.attempts` times.
    /// Each attempt is individually bounded by `budget.timeout`.
    pub async fn open(
        connector: &dyn TransportConnector,
        endpoint: &DeviceEndpoint,
        budget: SessionBudget,
    ) -> Result<Self, DeviceError> {
        let attempts = budget.attempts.max(1);
        let mut last_err = DeviceError::Connection("no connection attempt made".to_string());
        for attempt in 1..=attempts {
            match connector.connect(endpoint, budget.timeout).await {
                Ok(transport) => {
                    debug!(host = %endpoint.host, attempt, "device session open");
                    return Ok(Self {
                        state: SessionState::Open(transport),
                    });
                }
                Err(e) => {
                    warn!(host = %endpoint.host, attempt, error = %e, "device connect failed");
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open(_))
    }

    /// Sends one query and returns its data rows in device order.
    ///
    /// A `!trap` in the reply becomes `DeviceError::Protocol` carrying the
    /// device's message; a dropped connection surfaces as
    /// `DeviceError::Connection` from the transport.
    pub async fn execute(&mut self, query: &Query) -> Result<Vec<DeviceRecord>, DeviceError> {
        let transport = match &mut self.state {
            SessionState::Open(t) => t,
            SessionState::Closed => return Err(DeviceError::NotConnected),
        };
        let replies = transport.talk(&query.to_words()).await?;
        let mut records = Vec::new();
        for reply in &replies {
            match reply.kind {
                ReplyKind::Re => records.push(DeviceRecord::from_reply(reply)),
                ReplyKind::Trap => {
                    return Err(DeviceError::Protocol(format!(
                        "{}: {}",
                        query.command_word(),
                        reply.message().unwrap_or("command failed")
                    )));
                }
                ReplyKind::Done | ReplyKind::Fatal => {}
            }
        }
        Ok(records)
    }

    /// Releases the connection. Safe to call any number of times and after
    /// a failed exchange; the transport is dropped on the first call.
    pub async fn close(&mut self) {
        if let SessionState::Open(mut transport) =
            std::mem::replace(&mut self.state, SessionState::Closed)
        {
            transport.close().await;
            debug!("device session closed");
        }
    }
}
