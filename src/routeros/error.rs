use thiserror::Error;

/// Failure taxonomy for talking to a router.
///
/// `Connection` covers unreachable hosts, rejected credentials and timeouts;
/// `Protocol` covers replies the codec cannot make sense of. "Account not
/// found on device" is deliberately NOT an error: the enforcement operations
/// report it as `Ok(false)`.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("session is not connected")]
    NotConnected,
}

impl From<std::io::Error> for DeviceError {
    fn from(err: std::io::Error) -> Self {
        DeviceError::Connection(err.to_string())
    }
}

impl DeviceError {
    /// True for errors that indicate the underlying connection is gone,
    /// as opposed to a single malformed exchange.
    pub fn is_connection(&self) -> bool {
        matches!(self, DeviceError::Connection(_))
    }
}
