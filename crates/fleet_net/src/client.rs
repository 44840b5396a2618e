//! `MachineMap` RPC client.
//!
//! Each call opens its own connection to the server. Dropping a
//! [`MachineStream`] closes its connection, which the server observes as
//! cancellation of the stream call.

use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::error::NetError;
use crate::messages::{MachineRef, MachineState, Request, Response, StreamRequest};
use crate::transport::{self, FrameReader, FrameWriter};

/// Client for the machine server's `Stream`, `Pause` and `Unpause` calls.
#[derive(Debug, Clone)]
pub struct MachineMapClient {
    addr: String,
}

impl MachineMapClient {
    /// Create a client for the server at `addr`, verifying once that the
    /// server accepts connections.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Io`] if the server cannot be reached.
    pub async fn connect(addr: impl Into<String>) -> Result<Self, NetError> {
        let addr = addr.into();
        info!(addr = %addr, "connecting to machine server");
        let probe = TcpStream::connect(&addr).await?;
        drop(probe);
        info!(addr = %addr, "machine server reachable");
        Ok(Self { addr })
    }

    /// Returns the server address this client dials.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn open(&self, request: &Request) -> Result<(FrameReader, FrameWriter), NetError> {
        let socket = TcpStream::connect(&self.addr).await?;
        socket.set_nodelay(true)?;
        let (reader, mut writer) = transport::split(socket);
        debug!(method = request.method(), "opening call");
        writer.send(request).await?;
        Ok((reader, writer))
    }

    async fn unary(&self, request: Request) -> Result<MachineState, NetError> {
        let (mut reader, _writer) = self.open(&request).await?;
        match reader.recv::<Response>().await? {
            Some(Response::State(state)) => Ok(state),
            Some(Response::Status(status)) => Err(NetError::Status(status)),
            None => Err(NetError::Closed),
        }
    }

    /// Open a live stream. The server creates a new machine for it.
    ///
    /// # Errors
    ///
    /// Returns [`NetError`] if the call cannot be opened.
    pub async fn stream(&self) -> Result<MachineStream, NetError> {
        let (reader, writer) = self.open(&Request::Stream(StreamRequest {})).await?;
        Ok(MachineStream {
            reader,
            _writer: writer,
        })
    }

    /// Freeze machine `id`.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Status`] with `NotFound` if the machine does not
    /// exist, or a transport error.
    pub async fn pause(&self, id: u32) -> Result<MachineState, NetError> {
        self.unary(Request::Pause(MachineRef { id })).await
    }

    /// Let machine `id` move again.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Status`] with `NotFound` if the machine does not
    /// exist, or a transport error.
    pub async fn unpause(&self, id: u32) -> Result<MachineState, NetError> {
        self.unary(Request::Unpause(MachineRef { id })).await
    }
}

/// The receiving end of an open `Stream` call.
#[derive(Debug)]
pub struct MachineStream {
    reader: FrameReader,
    // Held so the write direction stays open for the life of the call.
    _writer: FrameWriter,
}

impl MachineStream {
    /// Wait for the next state.
    ///
    /// Returns `Ok(None)` when the server ended the stream. Cancel-safe.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Status`] if the server ended the stream with an
    /// error status, or a transport error.
    pub async fn message(&mut self) -> Result<Option<MachineState>, NetError> {
        match self.reader.recv::<Response>().await? {
            Some(Response::State(state)) => Ok(Some(state)),
            Some(Response::Status(status)) => Err(NetError::Status(status)),
            None => Ok(None),
        }
    }
}
