//! JSON text protocol spoken with browser clients.
//!
//! Server → client: a [`MachineView`] per tick, and one after every applied
//! control command. Client → server: `{"type": "pause" | "unpause", "id": n}`.

use fleet_net::messages::MachineState;
use serde::{Deserialize, Serialize};

/// Position as shown to clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationView {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Altitude in metres.
    pub alt: f32,
}

/// A machine state push or control confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineView {
    /// Machine identifier.
    pub id: u32,
    /// Current position.
    pub location: LocationView,
    /// Remaining fuel, `0..=100`.
    pub fuel_level: f32,
    /// Whether the machine is frozen in place.
    pub is_paused: bool,
}

impl From<MachineState> for MachineView {
    fn from(state: MachineState) -> Self {
        Self {
            id: state.id,
            location: LocationView {
                lat: state.location.lat,
                lon: state.location.lon,
                alt: state.location.alt,
            },
            fuel_level: state.fuel_level,
            is_paused: state.is_paused,
        }
    }
}

impl MachineView {
    /// Serialise to the JSON text sent on the socket.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json` error if serialisation fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A control command sent by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Freeze the machine.
    Pause { id: u32 },
    /// Let the machine move again.
    Unpause { id: u32 },
}

/// Why an inbound text message was not a usable command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Not JSON, or missing/ill-typed fields.
    #[error("malformed command: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Well-formed, but the `type` is not one we handle.
    #[error("unknown command type {0:?}")]
    UnknownType(String),
}

#[derive(Deserialize)]
struct RawCommand {
    #[serde(rename = "type")]
    kind: String,
    id: u32,
}

impl ControlCommand {
    /// Decode one inbound text message.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Malformed`] for undecodable text and
    /// [`CommandError::UnknownType`] for a `type` other than `pause` or
    /// `unpause`.
    pub fn decode(text: &str) -> Result<Self, CommandError> {
        let raw: RawCommand = serde_json::from_str(text)?;
        match raw.kind.as_str() {
            "pause" => Ok(Self::Pause { id: raw.id }),
            "unpause" => Ok(Self::Unpause { id: raw.id }),
            _ => Err(CommandError::UnknownType(raw.kind)),
        }
    }

    /// The machine the command addresses.
    #[must_use]
    pub fn id(&self) -> u32 {
        match *self {
            Self::Pause { id } | Self::Unpause { id } => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use fleet_net::messages::Gps;
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn test_view_json_shape() {
        let view = MachineView::from(MachineState {
            id: 0,
            location: Gps {
                lat: 47.5,
                lon: -122.25,
                alt: 3.0,
            },
            fuel_level: 0.0,
            is_paused: false,
        });
        let value: Value = serde_json::from_str(&view.to_json().unwrap()).unwrap();
        // Zero values are still present.
        assert_eq!(
            value,
            json!({
                "id": 0,
                "location": { "lat": 47.5, "lon": -122.25, "alt": 3.0 },
                "fuelLevel": 0.0,
                "isPaused": false,
            })
        );
    }

    #[test]
    fn test_decode_pause_and_unpause() {
        assert_eq!(
            ControlCommand::decode(r#"{"type":"pause","id":3}"#).unwrap(),
            ControlCommand::Pause { id: 3 }
        );
        assert_eq!(
            ControlCommand::decode(r#"{"id":8,"type":"unpause"}"#).unwrap(),
            ControlCommand::Unpause { id: 8 }
        );
        assert_eq!(ControlCommand::Unpause { id: 8 }.id(), 8);
    }

    #[test]
    fn test_decode_unknown_type_keeps_tag() {
        match ControlCommand::decode(r#"{"type":"refuel","id":1}"#) {
            Err(CommandError::UnknownType(kind)) => assert_eq!(kind, "refuel"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_decode_malformed() {
        for text in ["not json", r#"{"type":"pause"}"#, r#"{"type":"pause","id":-1}"#] {
            assert!(matches!(
                ControlCommand::decode(text),
                Err(CommandError::Malformed(_))
            ));
        }
    }
}
