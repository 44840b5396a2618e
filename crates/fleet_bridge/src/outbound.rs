//! Write side of a client WebSocket.
//!
//! Both the state pump and the command loop write to the same socket. All
//! writes go through one mutex so frames never interleave, and the sink is
//! taken out on close so the socket is closed exactly once.

use futures_util::SinkExt;
use futures_util::stream::SplitSink;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use crate::error::BridgeError;

type Sink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Serialised, close-once writer for one client socket.
pub struct Outbound {
    sink: Mutex<Option<Sink>>,
}

impl Outbound {
    /// Wrap the write half of an accepted socket.
    #[must_use]
    pub fn new(sink: Sink) -> Self {
        Self {
            sink: Mutex::new(Some(sink)),
        }
    }

    /// Send one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Closed`] after [`close`](Self::close), or the
    /// WebSocket error if the write fails.
    pub async fn send_text(&self, text: String) -> Result<(), BridgeError> {
        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(BridgeError::Closed)?;
        sink.send(Message::text(text)).await?;
        Ok(())
    }

    /// Send a close frame and release the socket. Later calls do nothing.
    pub async fn close(&self) {
        let taken = self.sink.lock().await.take();
        if let Some(mut sink) = taken
            && let Err(e) = sink.close().await
        {
            debug!(error = %e, "websocket close did not complete cleanly");
        }
    }
}
