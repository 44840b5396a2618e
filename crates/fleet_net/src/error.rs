//! Network-layer error types.

use crate::messages::RpcStatus;

/// Errors that can occur during network operations.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// Failed to encode a message to MessagePack.
    #[error("failed to encode message: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Failed to decode a message from MessagePack.
    #[error("failed to decode message: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// Socket or framing error.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the connection before a complete response arrived.
    #[error("connection closed by peer")]
    Closed,

    /// The server answered with an error status.
    #[error("remote status: {0}")]
    Status(RpcStatus),
}

impl NetError {
    /// Returns the remote status if this error carries one.
    #[must_use]
    pub fn status(&self) -> Option<&RpcStatus> {
        match self {
            Self::Status(status) => Some(status),
            _ => None,
        }
    }
}
