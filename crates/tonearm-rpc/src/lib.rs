//! Client for the MPD line protocol.
//!
//! This crate provides the line codec, response parser and client used to
//! remote-control an MPD daemon over TCP.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`protocol`]: Line classification, `ACK` errors, commands and tag columns
//! - [`transport`]: Newline codec for message framing
//! - [`parser`]: Response parser and the list / status extractors
//! - [`client`]: Connection manager and the command surface
//! - [`config`]: Host, port and timeout settings
//! - [`status`]: Typed view over the `status` reply
//! - [`error`]: Unified error type and `Result` alias
//!
//! # Example
//!
//! ```no_run
//! use tonearm_rpc::{ClientConfig, MpdClient};
//!
//! # async fn example() -> Result<(), tonearm_rpc::Error> {
//! let mut client = MpdClient::connect(ClientConfig::default()).await?;
//!
//! client.play(0).await?;
//! client.volume_down().await?;
//!
//! let status = client.status().await?;
//! println!("volume: {:?}", status.get("volume"));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod parser;
pub mod protocol;
pub mod status;
pub mod transport;

// Re-export main client types
pub use client::{ClientState, Connection, MpdClient, ROOT_PATH};

// Re-export configuration
pub use config::{ClientConfig, ConfigError};

// Re-export error types
pub use error::{Error, ProtocolError, Result};

// Re-export parser types
pub use parser::{Extractor, ListExtractor, ResponseParser, StatusExtractor, Step, parse_lines};

// Re-export protocol types
pub use protocol::{
    ACK_PREFIX, AckCode, AckError, Column, Command, DEFAULT_HOST, DEFAULT_PORT, FILE_FIELD,
    GREETING_PREFIX, ResponseLine, SUCCESS,
};

// Re-export status types
pub use status::{PlayState, PlaybackStatus, StatusMap};

// Re-export transport types
pub use transport::{CodecError, MpdLineCodec};
