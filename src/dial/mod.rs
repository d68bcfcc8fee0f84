//! Dial collaborator
//!
//! The pool never talks to the network itself. It asks a [`Dialer`] for a
//! fresh transport handle and classifies the outcome through [`DialError`].
//! Dial options (socket flags, TLS, credentials...) belong to the dialer
//! value and are passed through untouched.

mod tcp;

pub use tcp::TcpDialer;

use async_trait::async_trait;
use thiserror::Error;

/// Classified dial failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DialError {
    /// The endpoint actively refused or is unreachable.
    #[error("connection refused: {0}")]
    Refused(String),

    /// The dial did not complete before the caller's deadline.
    #[error("deadline exceeded")]
    Timeout,

    #[error("{0}")]
    Other(String),
}

/// Produces transport handles for one endpoint.
///
/// Closing a handle is dropping it, so any type that releases its session
/// on drop works as `Conn`.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    type Conn: Send + 'static;

    async fn dial(&self, endpoint: &str) -> Result<Self::Conn, DialError>;
}

impl From<std::io::Error> for DialError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::NotConnected
            | ErrorKind::AddrNotAvailable => DialError::Refused(err.to_string()),
            ErrorKind::TimedOut => DialError::Timeout,
            _ => DialError::Other(err.to_string()),
        }
    }
}
