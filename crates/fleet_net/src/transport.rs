//! Length-delimited framing over TCP.
//!
//! A call connection is split into a [`FrameReader`] and a [`FrameWriter`]
//! so one task can watch for the peer hanging up while another writes.
//! Each frame is a 4-byte big-endian length followed by a MessagePack body.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

use crate::codec;
use crate::error::NetError;

/// Largest frame either side will accept.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

fn frame_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .max_frame_length(MAX_FRAME_LEN)
        .new_codec()
}

/// Split a connected socket into typed frame halves.
#[must_use]
pub fn split(stream: TcpStream) -> (FrameReader, FrameWriter) {
    let (read, write) = stream.into_split();
    (
        FrameReader {
            inner: FramedRead::new(read, frame_codec()),
        },
        FrameWriter {
            inner: FramedWrite::new(write, frame_codec()),
        },
    )
}

/// The receiving half of a call connection.
#[derive(Debug)]
pub struct FrameReader {
    inner: FramedRead<OwnedReadHalf, LengthDelimitedCodec>,
}

impl FrameReader {
    /// Wait for the next frame and decode it.
    ///
    /// Returns `Ok(None)` when the peer closed the connection cleanly. This
    /// method is cancel-safe: a partially received frame stays buffered.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Io`] on socket or framing errors and
    /// [`NetError::Decode`] if the body is not a valid `T`.
    pub async fn recv<T: DeserializeOwned>(&mut self) -> Result<Option<T>, NetError> {
        match self.inner.next().await {
            Some(Ok(frame)) => codec::decode(&frame).map(Some),
            Some(Err(e)) => Err(NetError::Io(e)),
            None => Ok(None),
        }
    }
}

/// The sending half of a call connection.
#[derive(Debug)]
pub struct FrameWriter {
    inner: FramedWrite<OwnedWriteHalf, LengthDelimitedCodec>,
}

impl FrameWriter {
    /// Encode and write one frame, flushing it to the socket.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Encode`] or [`NetError::Io`].
    pub async fn send<T: Serialize>(&mut self, message: &T) -> Result<(), NetError> {
        self.inner.send(codec::encode(message)?).await?;
        Ok(())
    }

    /// Flush and shut down the write direction.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Io`] if the shutdown fails.
    pub async fn close(&mut self) -> Result<(), NetError> {
        SinkExt::<Bytes>::close(&mut self.inner).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;
    use crate::messages::{MachineRef, Request};

    #[tokio::test]
    async fn test_frames_cross_a_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (mut reader, _writer) = split(socket);
            let first: Option<Request> = reader.recv().await.unwrap();
            let second: Option<Request> = reader.recv().await.unwrap();
            (first, second)
        });

        let (_reader, mut writer) = split(TcpStream::connect(addr).await.unwrap());
        writer.send(&Request::Pause(MachineRef { id: 11 })).await.unwrap();
        writer.close().await.unwrap();

        let (first, second) = server.await.unwrap();
        assert_eq!(first, Some(Request::Pause(MachineRef { id: 11 })));
        assert_eq!(second, None);
    }
}
