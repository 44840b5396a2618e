//! Frame body encoding.
//!
//! A call frame carries exactly one [`Request`](crate::messages::Request) or
//! [`Response`](crate::messages::Response) as a MessagePack value; the
//! length prefix is added by [`transport`](crate::transport).

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::NetError;

/// Encode one message into a frame body.
///
/// Struct fields are written by name so both ends tolerate field reordering.
///
/// # Errors
///
/// Returns [`NetError::Encode`] if the message cannot be represented.
pub fn encode<T: Serialize>(message: &T) -> Result<Bytes, NetError> {
    let body = rmp_serde::to_vec_named(message)?;
    Ok(Bytes::from(body))
}

/// Decode one frame body.
///
/// # Errors
///
/// Returns [`NetError::Decode`] if the body is not a valid `T`.
pub fn decode<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T, NetError> {
    Ok(rmp_serde::from_slice(body)?)
}
