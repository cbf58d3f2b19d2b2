//! Socket lifetime and the reconnect loop.
//!
//! The manager is either `Connected`, holding exactly one socket, or
//! `Reconnecting`, holding none. Any transport fault during an exchange drops
//! the socket before the state changes, so no descriptor survives into the
//! next attempt. Reconnecting retries forever with a fixed pause; only the
//! user leaving the menu ends the session.

use std::{io, net::SocketAddr, time::Duration};

use clap::ValueEnum;
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
};
use tracing::{debug, info, warn};

use crate::{
    codec::CodecError,
    display::write_line,
    protocol::{Request, Response},
};

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);
pub const RECONNECT_NOTICE: &str = "Lost connection to server. Trying to reconnect...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Reconnecting,
}

/// Fixed pause between connection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    delay: Duration,
}

impl ReconnectPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self { delay }
    }

    /// No pause at all; for tests.
    pub fn immediate() -> Self {
        Self::fixed(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RECONNECT_DELAY)
    }
}

/// What to do when a response cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DecodeFaultPolicy {
    /// Report the fault and end the session.
    #[default]
    Fatal,
    /// Drop the connection and reconnect as for a transport fault.
    Reconnect,
}

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("connection lost: {0}")]
    Transport(#[source] io::Error),
    #[error("server closed the connection")]
    Closed,
    #[error("not connected")]
    NotConnected,
    #[error("request could not be encoded: {0}")]
    Encode(#[source] CodecError),
    #[error("malformed response: {0}")]
    Decode(#[source] CodecError),
}

impl ExchangeError {
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ExchangeError::Transport(_) | ExchangeError::Closed | ExchangeError::NotConnected
        )
    }
}

impl From<CodecError> for ExchangeError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(err) => ExchangeError::Transport(err),
            other => ExchangeError::Decode(other),
        }
    }
}

/// One open socket, split for buffered reads.
pub struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    peer: SocketAddr,
}

impl Connection {
    pub async fn open(endpoint: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(endpoint).await?;
        let peer = stream.peer_addr()?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(reader),
            writer,
            peer,
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Sends one request and reads its whole response before returning.
    pub async fn exchange(&mut self, request: &Request) -> Result<Response, ExchangeError> {
        let frame = request.encode().map_err(ExchangeError::Encode)?;
        self.writer
            .write_all(&frame)
            .await
            .map_err(ExchangeError::Transport)?;
        self.writer.flush().await.map_err(ExchangeError::Transport)?;

        // A peer that hangs up before answering is a dropped connection, not
        // a malformed response.
        let pending = self.reader.fill_buf().await.map_err(ExchangeError::Transport)?;
        if pending.is_empty() {
            return Err(ExchangeError::Closed);
        }

        request
            .read_response(&mut self.reader)
            .await
            .map_err(ExchangeError::from)
    }
}

pub struct ConnectionManager {
    endpoint: String,
    policy: ReconnectPolicy,
    connection: Option<Connection>,
    reconnects: u64,
}

impl ConnectionManager {
    pub fn new(endpoint: impl Into<String>, policy: ReconnectPolicy) -> Self {
        Self {
            endpoint: endpoint.into(),
            policy,
            connection: None,
            reconnects: 0,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        if self.connection.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Reconnecting
        }
    }

    /// Number of live connections that have been lost so far.
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    /// Tries to connect until it succeeds, printing the reconnect notice to
    /// `notices` after every failed attempt. Errors only if `notices` does.
    pub async fn connect<W>(&mut self, notices: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let mut attempt: u64 = 0;
        while self.connection.is_none() {
            attempt += 1;
            match Connection::open(&self.endpoint).await {
                Ok(connection) => {
                    info!(peer = %connection.peer(), attempt, "connected");
                    self.connection = Some(connection);
                }
                Err(err) => {
                    warn!(endpoint = %self.endpoint, attempt, error = %err, "connect failed");
                    self.pause(notices).await?;
                }
            }
        }
        Ok(())
    }

    /// Drops the current socket, then runs the connect loop again.
    pub async fn reconnect<W>(&mut self, notices: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        self.disconnect();
        self.pause(notices).await?;
        self.connect(notices).await
    }

    pub fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            self.reconnects += 1;
            debug!(peer = %connection.peer(), reconnects = self.reconnects, "connection dropped");
        }
    }

    /// Exchanges one request on the current socket. Transport faults leave the
    /// manager in `Reconnecting`; the caller decides when to reconnect.
    pub async fn exchange(&mut self, request: &Request) -> Result<Response, ExchangeError> {
        let Some(connection) = self.connection.as_mut() else {
            return Err(ExchangeError::NotConnected);
        };

        debug!(command = request.command_name(), "sending request");
        let result = connection.exchange(request).await;
        if let Err(err) = &result {
            if err.is_transport() {
                warn!(command = request.command_name(), error = %err, "transport fault");
                self.disconnect();
            }
        }
        result
    }

    async fn pause<W>(&self, notices: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        write_line(notices, RECONNECT_NOTICE).await?;
        tokio::time::sleep(self.policy.delay()).await;
        Ok(())
    }
}
