//! Message types exchanged between the bridge and the machine server.
//!
//! All message types derive `Serialize` and `Deserialize` for MessagePack
//! transport. A call is a single [`Request`] followed by one or more
//! [`Response`] frames.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Machine state ───────────────────────────────────────────────────────────

/// A geodetic position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gps {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Altitude in meters.
    pub alt: f32,
}

/// Snapshot of one machine, as sent on every tick and in reply to control
/// calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineState {
    /// The machine identifier.
    pub id: u32,
    /// Current position.
    pub location: Gps,
    /// Remaining fuel, in percent.
    pub fuel_level: f32,
    /// Whether the machine is currently frozen.
    pub is_paused: bool,
}

/// Addresses a single machine in a control call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineRef {
    /// The machine identifier.
    pub id: u32,
}

/// Opens a live stream for a newly created machine. Carries no parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRequest {}

// ── Call envelopes ──────────────────────────────────────────────────────────

/// The first and only frame a client writes on a call connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    /// Server-streaming: create a machine and receive its state every tick.
    Stream(StreamRequest),
    /// Unary: freeze a machine.
    Pause(MachineRef),
    /// Unary: let a machine move again.
    Unpause(MachineRef),
}

impl Request {
    /// Short name used in log fields.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::Stream(_) => "Stream",
            Self::Pause(_) => "Pause",
            Self::Unpause(_) => "Unpause",
        }
    }
}

/// A frame written by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    /// A machine snapshot.
    State(MachineState),
    /// The call failed. No further frames follow.
    Status(RpcStatus),
}

// ── Status ──────────────────────────────────────────────────────────────────

/// Failure categories a server can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    /// The addressed machine does not exist.
    NotFound,
    /// The request frame could not be understood.
    InvalidArgument,
    /// The server is shutting down or the call was aborted.
    Cancelled,
    /// Anything else.
    Internal,
}

/// An error status returned in place of a state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcStatus {
    /// The failure category.
    pub code: StatusCode,
    /// Human-readable detail.
    pub message: String,
}

impl RpcStatus {
    /// Build a status with the given code and message.
    #[must_use]
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Shorthand for a [`StatusCode::NotFound`] status.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NotFound, message)
    }
}

impl fmt::Display for RpcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_method_names() {
        assert_eq!(Request::Stream(StreamRequest {}).method(), "Stream");
        assert_eq!(Request::Pause(MachineRef { id: 1 }).method(), "Pause");
        assert_eq!(Request::Unpause(MachineRef { id: 1 }).method(), "Unpause");
    }

    #[test]
    fn test_status_display() {
        let status = RpcStatus::not_found("machine 4 not found");
        assert_eq!(status.to_string(), "NotFound: machine 4 not found");
    }
}
