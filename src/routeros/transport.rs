//! Connection plumbing for the RouterOS API.
//!
//! [`DeviceTransport`] is the seam the session talks through; the production
//! implementation is [`ApiTransport`] over a plain TCP socket (API port 8728).
//! Every read and write on the socket is bounded by the per-call timeout the
//! caller supplied, and timeout expiry surfaces as a recoverable
//! `DeviceError::Connection`, never a hang.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use super::error::DeviceError;
use super::proto::{self, ReplyKind, ReplySentence};

/// Where and how to reach one device. The password is plaintext here: it is
/// decrypted at the store boundary and only ever lives in memory for the
/// duration of a session.
#[derive(Debug, Clone)]
pub struct DeviceEndpoint {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl DeviceEndpoint {
    fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// One open wire to one device.
#[async_trait]
pub trait DeviceTransport: Send {
    /// Sends one sentence and collects the reply sentences up to and
    /// including the terminating `!done`.
    async fn talk(&mut self, words: &[String]) -> Result<Vec<ReplySentence>, DeviceError>;

    /// Releases the underlying connection. Must be safe to call once on any
    /// transport, including one whose last `talk` failed.
    async fn close(&mut self);
}

/// Opens transports; the session layer drives the attempt/timeout budget.
#[async_trait]
pub trait TransportConnector: Send + Sync {
    async fn connect(
        &self,
        endpoint: &DeviceEndpoint,
        timeout: Duration,
    ) -> Result<Box<dyn DeviceTransport>, DeviceError>;
}

/// TCP implementation of the API protocol, including the post-6.43 plaintext
/// `/login` exchange.
pub struct ApiTransport {
    stream: TcpStream,
    timeout: Duration,
}

impl ApiTransport {
    pub async fn connect(
        endpoint: &DeviceEndpoint,
        timeout: Duration,
    ) -> Result<Self, DeviceError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(endpoint.address()))
            .await
            .map_err(|_| {
                DeviceError::Connection(format!("connect to {} timed out", endpoint.address()))
            })??;
        let mut transport = Self { stream, timeout };
        transport.login(endpoint).await?;
        Ok(transport)
    }

    async fn login(&mut self, endpoint: &DeviceEndpoint) -> Result<(), DeviceError> {
        let words = vec![
            "/login".to_string(),
            format!("=name={}", endpoint.username),
            format!("=password={}", endpoint.password),
        ];
        let replies = self.talk_inner(&words).await?;
        for reply in &replies {
            match reply.kind {
                ReplyKind::Trap | ReplyKind::Fatal => {
                    return Err(DeviceError::Connection(format!(
                        "login rejected: {}",
                        reply.message().unwrap_or("no message")
                    )));
                }
                ReplyKind::Done => {
                    // Devices older than 6.43 answer with a `=ret=` MD5
                    // challenge instead of accepting the plain login.
                    if reply.attribute("ret").is_some() {
                        return Err(DeviceError::Connection(
                            "device requested challenge login; RouterOS >= 6.43 is required"
                                .to_string(),
                        ));
                    }
                }
                ReplyKind::Re => {}
            }
        }
        debug!(host = %endpoint.host, "api login ok");
        Ok(())
    }

    async fn write_sentence(&mut self, words: &[String]) -> Result<(), DeviceError> {
        let buf = proto::encode_sentence(words);
        tokio::time::timeout(self.timeout, self.stream.write_all(&buf))
            .await
            .map_err(|_| DeviceError::Connection("write timed out".to_string()))??;
        Ok(())
    }

    async fn read_exact_bounded(&mut self, buf: &mut [u8]) -> Result<(), DeviceError> {
        tokio::time::timeout(self.timeout, self.stream.read_exact(buf))
            .await
            .map_err(|_| DeviceError::Connection("read timed out".to_string()))??;
        Ok(())
    }

    async fn read_word_length(&mut self) -> Result<u32, DeviceError> {
        let mut first = [0u8; 1];
        self.read_exact_bounded(&mut first).await?;
        let tail_size = proto::length_tail_size(first[0])?;
        let mut tail = vec![0u8; tail_size];
        if tail_size > 0 {
            self.read_exact_bounded(&mut tail).await?;
        }
        proto::decode_length(first[0], &tail)
    }

    async fn read_sentence(&mut self) -> Result<Vec<String>, DeviceError> {
        let mut words = Vec::new();
        loop {
            let len = self.read_word_length().await?;
            if len == 0 {
                return Ok(words);
            }
            let mut buf = vec![0u8; len as usize];
            self.read_exact_bounded(&mut buf).await?;
            let word = String::from_utf8(buf)
                .map_err(|e| DeviceError::Protocol(format!("non-utf8 word: {e}")))?;
            words.push(word);
        }
    }

    async fn talk_inner(&mut self, words: &[String]) -> Result<Vec<ReplySentence>, DeviceError> {
        self.write_sentence(words).await?;
        let mut replies = Vec::new();
        loop {
            let sentence = self.read_sentence().await?;
            if sentence.is_empty() {
                // Keepalive; nothing meaningful.
                continue;
            }
            let reply = proto::parse_reply(&sentence)?;
            let kind = reply.kind;
            replies.push(reply);
            match kind {
                ReplyKind::Done => return Ok(replies),
                ReplyKind::Fatal => {
                    let message = replies
                        .last()
                        .and_then(|r| r.attributes.first())
                        .map(|(_, v)| v.clone())
                        .unwrap_or_else(|| "connection closed by device".to_string());
                    return Err(DeviceError::Connection(message));
                }
                ReplyKind::Re | ReplyKind::Trap => {}
            }
        }
    }
}

#[async_trait]
impl DeviceTransport for ApiTransport {
    async fn talk(&mut self, words: &[String]) -> Result<Vec<ReplySentence>, DeviceError> {
        self.talk_inner(words).await
    }

    async fn close(&mut self) {
        // Best effort; the peer may already be gone.
        let _ = self.stream.shutdown().await;
    }
}

/// Default connector used outside of tests.
pub struct ApiConnector;

#[async_trait]
impl TransportConnector for ApiConnector {
    async fn connect(
        &self,
        endpoint: &DeviceEndpoint,
        timeout: Duration,
    ) -> Result<Box<dyn DeviceTransport>, DeviceError> {
        let transport = ApiTransport::connect(endpoint, timeout).await?;
        Ok(Box::new(transport))
    }
}
