//! Connection manager and command surface for the MPD daemon.
//!
//! [`MpdClient`] keeps one long-lived primary connection for commands whose
//! reply is not needed (`play`, `stop`, `setvol`, ...). Commands that return data
//! (`listall`, `list`, `status`) each open a secondary connection, read the full
//! framed reply and close it again, on success and on error.
//!
//! The primary connection's replies are never awaited. Before each write, any
//! reply lines that have already arrived are discarded without blocking, and
//! `ACK` lines among them are logged. Discarding is best effort: a reply still in
//! flight when the next command is written is picked up by the following drain.

use std::time::Duration;

use futures_util::{FutureExt, SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, trace, warn};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::parser::{Extractor, ListExtractor, ResponseParser, StatusExtractor, Step};
use crate::protocol::{self, Column, Command, FILE_FIELD, ResponseLine};
use crate::status::{PlaybackStatus, StatusMap};
use crate::transport::MpdLineCodec;

/// Path listed by [`MpdClient::list_all`] when none is given
pub const ROOT_PATH: &str = "/";

/// Volume change applied by [`MpdClient::volume_up`] and [`MpdClient::volume_down`]
pub const VOLUME_STEP: u8 = 5;

/// Upper bound for stepped volume changes
pub const MAX_VOLUME: u8 = 100;

/// A framed TCP connection to the daemon
#[derive(Debug)]
pub struct Connection {
    framed: Framed<TcpStream, MpdLineCodec>,
    address: String,
    read_timeout: Duration,
}

impl Connection {
    /// Open a connection to `config.host:config.port`. No retry is attempted.
    ///
    /// # Errors
    ///
    /// Returns `Error::Connection` with the OS error if the connect fails, or
    /// `Error::Timeout` if it does not complete within the connect timeout.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let address = config.address();
        let after = config.connect_timeout();

        let stream = tokio::time::timeout(after, TcpStream::connect(&address))
            .await
            .map_err(|_| Error::Timeout {
                operation: "connect",
                after,
            })?
            .map_err(|source| Error::Connection {
                address: address.clone(),
                source,
            })?;

        debug!("Connected to {address}");

        Ok(Self {
            framed: Framed::new(stream, MpdLineCodec::with_max_length(config.max_line_length)),
            address,
            read_timeout: config.read_timeout(),
        })
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Write one command line and flush it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Write` if the connection is broken.
    pub async fn write_line(&mut self, command: Command) -> Result<()> {
        debug!("{} > {command}", self.address);
        self.framed.send(command).await.map_err(Error::from_write)
    }

    /// Read the next line. `Ok(None)` means the daemon closed the connection.
    ///
    /// # Errors
    ///
    /// Returns `Error::Timeout` if no line arrives within the read timeout, a
    /// protocol error for over-long or non UTF-8 lines, or `Error::Read`.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        let next = tokio::time::timeout(self.read_timeout, self.framed.next())
            .await
            .map_err(|_| Error::Timeout {
                operation: "read a response line",
                after: self.read_timeout,
            })?;

        let line = next.transpose()?;
        if let Some(line) = &line {
            trace!("{} < {line}", self.address);
        }
        Ok(line)
    }

    /// Read lines until the response terminator, feeding data lines to `extractor`.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for `ACK` replies and `Error::UnexpectedEof` if
    /// the connection closes first. Partially extracted data is discarded.
    pub async fn read_response<E: Extractor>(&mut self, extractor: E) -> Result<E::Output> {
        let mut parser = ResponseParser::new(extractor);
        while let Some(line) = self.read_line().await? {
            if parser.feed(&line)? == Step::Done {
                break;
            }
        }
        parser.finish()
    }

    /// Send a command and read its full response.
    ///
    /// # Errors
    ///
    /// See [`Connection::write_line`] and [`Connection::read_response`].
    pub async fn request<E: Extractor>(
        &mut self,
        command: Command,
        extractor: E,
    ) -> Result<E::Output> {
        self.write_line(command).await?;
        self.read_response(extractor).await
    }

    /// Discard reply lines that are already buffered or readable, without waiting.
    ///
    /// Returns the number of lines discarded.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnexpectedEof` if the daemon has closed the connection, or
    /// the read error encountered.
    pub fn drain(&mut self) -> Result<usize> {
        let mut discarded = 0;

        while let Some(next) = self.framed.next().now_or_never() {
            let Some(line) = next.transpose()? else {
                return Err(Error::UnexpectedEof);
            };

            match protocol::classify(&line) {
                ResponseLine::Ack(ack) => warn!("{} rejected a command: {ack}", self.address),
                _ => trace!("{} < {line} (discarded)", self.address),
            }
            discarded += 1;
        }

        Ok(discarded)
    }

    /// Shut down the write side and release the socket.
    pub async fn close(self) {
        let address = self.address;
        let mut stream = self.framed.into_inner();
        // The socket is released on drop regardless
        if let Err(e) = stream.shutdown().await {
            debug!("Shutdown of {address} failed: {e}");
        }
    }
}

/// Locally cached playback state.
///
/// Only updated by the client's own commands, so it goes stale when another
/// client changes the daemon. [`MpdClient::sync_state`] refreshes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientState {
    pub volume: u8,
    pub paused: bool,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            volume: MAX_VOLUME,
            paused: false,
        }
    }
}

impl ClientState {
    /// Next volume for a step up, or `None` when already at the maximum
    #[must_use]
    pub fn volume_up_target(&self) -> Option<u8> {
        (self.volume < MAX_VOLUME).then(|| (self.volume + VOLUME_STEP).min(MAX_VOLUME))
    }

    /// Next volume for a step down, or `None` when already muted
    #[must_use]
    pub fn volume_down_target(&self) -> Option<u8> {
        (self.volume > 0).then(|| self.volume.saturating_sub(VOLUME_STEP))
    }
}

/// Client for the MPD daemon.
///
/// Methods that use the primary connection or the cached state take
/// `&mut self`; share a client between tasks through a `tokio::sync::Mutex`.
#[derive(Debug)]
pub struct MpdClient {
    config: ClientConfig,
    primary: Connection,
    state: ClientState,
}

impl MpdClient {
    /// Connect the primary connection.
    ///
    /// # Errors
    ///
    /// Fails if the daemon cannot be reached; no client is created.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let primary = Connection::connect(&config).await?;

        Ok(Self {
            config,
            primary,
            state: ClientState::default(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.config.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.config.port
    }

    /// Change the daemon host.
    ///
    /// Secondary connections opened afterwards use the new host. The primary
    /// connection keeps its address until [`MpdClient::reconnect`].
    pub fn set_host(&mut self, host: impl Into<String>) {
        self.config.host = host.into();
    }

    /// Change the daemon port. Same rules as [`MpdClient::set_host`].
    pub fn set_port(&mut self, port: u16) {
        self.config.port = port;
    }

    /// Replace the primary connection with a new one to the current host and port.
    ///
    /// # Errors
    ///
    /// Fails if the new connection cannot be opened; the old one is kept.
    pub async fn reconnect(&mut self) -> Result<()> {
        let fresh = Connection::connect(&self.config).await?;
        let old = std::mem::replace(&mut self.primary, fresh);
        old.close().await;
        Ok(())
    }

    #[must_use]
    pub fn state(&self) -> ClientState {
        self.state
    }

    #[must_use]
    pub fn volume(&self) -> u8 {
        self.state.volume
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    /// Write a command on the primary connection without waiting for its reply.
    async fn send(&mut self, command: Command) -> Result<()> {
        let discarded = self.primary.drain()?;
        if discarded > 0 {
            trace!("Discarded {discarded} stale lines before {}", command.name());
        }
        self.primary.write_line(command).await
    }

    /// Run a command on a fresh connection and parse its reply.
    async fn query<E: Extractor>(&self, command: Command, extractor: E) -> Result<E::Output> {
        let mut conn = Connection::connect(&self.config).await?;
        let result = conn.request(command, extractor).await;
        conn.close().await;
        result
    }

    /// Start playback at the given queue position.
    ///
    /// # Errors
    ///
    /// Returns an error if the primary connection is broken.
    pub async fn play(&mut self, index: u32) -> Result<()> {
        self.send(Command::play(index)).await
    }

    /// # Errors
    ///
    /// Returns an error if the primary connection is broken.
    pub async fn stop(&mut self) -> Result<()> {
        self.send(Command::stop()).await
    }

    /// # Errors
    ///
    /// Returns an error if the primary connection is broken.
    pub async fn next(&mut self) -> Result<()> {
        self.send(Command::next()).await
    }

    /// Toggle pause based on the cached paused flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the primary connection is broken; the flag is left
    /// unchanged in that case.
    pub async fn pause(&mut self) -> Result<()> {
        let paused = !self.state.paused;
        self.send(Command::pause(paused)).await?;
        self.state.paused = paused;
        Ok(())
    }

    /// List all files below `path` (the library root when `None`).
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon is unreachable, rejects the command, or
    /// closes the connection before the reply is complete.
    pub async fn list_all(&self, path: Option<&str>) -> Result<Vec<String>> {
        let path = path.unwrap_or(ROOT_PATH);
        self.query(Command::list_all(path), ListExtractor::new(FILE_FIELD))
            .await
    }

    /// List the distinct values of a database tag.
    ///
    /// `column` is checked against the supported tags ignoring case and spaces,
    /// then sent as given.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for unsupported columns before any I/O, and
    /// the same errors as [`MpdClient::list_all`] otherwise.
    pub async fn list_column(&self, column: &str) -> Result<Vec<String>> {
        let tag: Column = column.parse()?;
        self.query(Command::list(column), ListExtractor::new(tag.tag()))
            .await
    }

    /// Fetch the daemon's status fields.
    ///
    /// # Errors
    ///
    /// Same as [`MpdClient::list_all`].
    pub async fn status(&self) -> Result<StatusMap> {
        self.query(Command::status(), StatusExtractor::new()).await
    }

    /// Refresh the cached volume and paused flag from the daemon's status.
    ///
    /// A status without a usable volume (no mixer) leaves the cached volume as is.
    ///
    /// # Errors
    ///
    /// Same as [`MpdClient::status`].
    pub async fn sync_state(&mut self) -> Result<PlaybackStatus> {
        let status = PlaybackStatus::from_map(&self.status().await?);
        if let Some(volume) = status.volume {
            self.state.volume = volume;
        }
        self.state.paused = status.is_paused();
        Ok(status)
    }

    /// Add songs whose file name matches exactly to the queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the primary connection is broken.
    pub async fn add(&mut self, file: &str) -> Result<()> {
        self.send(Command::find_add_file(file)).await
    }

    /// Ask the daemon to rescan its music directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the primary connection is broken.
    pub async fn update(&mut self) -> Result<()> {
        self.send(Command::update()).await
    }

    /// Set the volume. The value is not clamped.
    ///
    /// # Errors
    ///
    /// Returns an error if the primary connection is broken; the cached volume
    /// is left unchanged in that case.
    pub async fn set_volume(&mut self, volume: u8) -> Result<()> {
        self.send(Command::set_volume(volume)).await?;
        self.state.volume = volume;
        Ok(())
    }

    /// Raise the volume by one step, stopping at 100. Nothing is sent at 100.
    ///
    /// # Errors
    ///
    /// Same as [`MpdClient::set_volume`].
    pub async fn volume_up(&mut self) -> Result<()> {
        match self.state.volume_up_target() {
            Some(volume) => self.set_volume(volume).await,
            None => Ok(()),
        }
    }

    /// Lower the volume by one step, stopping at 0. Nothing is sent at 0.
    ///
    /// # Errors
    ///
    /// Same as [`MpdClient::set_volume`].
    pub async fn volume_down(&mut self) -> Result<()> {
        match self.state.volume_down_target() {
            Some(volume) => self.set_volume(volume).await,
            None => Ok(()),
        }
    }
}
