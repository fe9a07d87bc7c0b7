//! Error types for the tonearm-rpc crate.
//!
//! This module provides a unified error type for connecting to the daemon,
//! exchanging lines with it, and interpreting its replies.

use std::time::Duration;

use crate::protocol::{AckError, Column};
use crate::transport::CodecError;

/// Unified error type for client operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not connect to {address}: {source}")]
    Connection {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Write failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("Read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Connection closed before the response was terminated")]
    UnexpectedEof,

    #[error(
        "Unsupported column {0:?}. Supported columns: {supported}",
        supported = Column::supported()
    )]
    Validation(String),

    #[error("Timed out after {}ms waiting to {operation}", .after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

/// Violations of the line protocol, including errors reported by the daemon
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("daemon replied ACK {0}")]
    Ack(AckError),

    #[error("response line exceeds {0} bytes")]
    LineTooLong(usize),

    #[error("response line is not valid UTF-8: {0}")]
    InvalidUtf8(#[source] std::str::Utf8Error),
}

impl Error {
    /// Map a codec failure raised while writing a command.
    #[must_use]
    pub fn from_write(err: CodecError) -> Self {
        match err {
            CodecError::Io(e) => Self::Write(e),
            other => other.into(),
        }
    }

    /// The daemon's error, if this is an `ACK` reply
    #[must_use]
    pub fn ack(&self) -> Option<&AckError> {
        match self {
            Self::Protocol(ProtocolError::Ack(ack)) => Some(ack),
            _ => None,
        }
    }
}

impl From<AckError> for Error {
    fn from(e: AckError) -> Self {
        Self::Protocol(ProtocolError::Ack(e))
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::Io(e) => Self::Read(e),
            CodecError::Utf8(e) => Self::Protocol(ProtocolError::InvalidUtf8(e)),
            CodecError::LineTooLong(max) => Self::Protocol(ProtocolError::LineTooLong(max)),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
