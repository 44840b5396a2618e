//! Bridge error types.

use tokio_tungstenite::tungstenite;

/// Errors writing to a client socket.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// WebSocket handshake, read or write failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// The outbound side of the WebSocket has already been closed.
    #[error("websocket already closed")]
    Closed,
}
