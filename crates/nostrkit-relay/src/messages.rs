//! Relay wire messages.
//!
//! Every frame is a JSON array whose first element names the message type.
//! Outbound frames are [`ClientMessage`]s, inbound frames [`RelayMessage`]s.

use serde_json::Value;

use nostrkit_core::Event;

use crate::error::{Result, SessionError};

/// Generate a fresh subscription id: 128 random bits, lowercase hex.
pub fn new_subscription_id() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

/// Messages a client sends to a relay.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// `["REQ", subscription_id, filter]`
    Req {
        /// Identifies the subscription in later frames.
        subscription_id: String,
        /// Filter in wire form.
        filter: Value,
    },

    /// `["EVENT", event]`
    Event(Event),

    /// `["CLOSE", subscription_id]`
    Close(String),
}

impl ClientMessage {
    /// Whether this request ends the session.
    pub fn is_close(&self) -> bool {
        matches!(self, ClientMessage::Close(_))
    }

    /// Serialize to a wire frame.
    pub fn to_json(&self) -> Result<String> {
        let json = match self {
            ClientMessage::Req {
                subscription_id,
                filter,
            } => serde_json::to_string(&("REQ", subscription_id, filter))?,
            ClientMessage::Event(event) => serde_json::to_string(&("EVENT", event))?,
            ClientMessage::Close(subscription_id) => {
                serde_json::to_string(&("CLOSE", subscription_id))?
            }
        };
        Ok(json)
    }

    /// Parse a wire frame (the relay side of the conversation).
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let (kind, rest) = split_frame(&value)
            .ok_or_else(|| SessionError::InvalidFrame("expected a JSON array".into()))?;

        match kind {
            "REQ" => {
                let subscription_id = string_value(rest, 0, "REQ subscription id")?;
                let filter = rest
                    .get(1)
                    .cloned()
                    .ok_or_else(|| SessionError::InvalidFrame("REQ without filter".into()))?;
                Ok(ClientMessage::Req {
                    subscription_id,
                    filter,
                })
            }
            "EVENT" => {
                let event = rest
                    .first()
                    .cloned()
                    .ok_or_else(|| SessionError::InvalidFrame("EVENT without event".into()))?;
                Ok(ClientMessage::Event(serde_json::from_value(event)?))
            }
            "CLOSE" => Ok(ClientMessage::Close(string_value(
                rest,
                0,
                "CLOSE subscription id",
            )?)),
            other => Err(SessionError::InvalidFrame(format!(
                "unknown client message type {other:?}"
            ))),
        }
    }
}

/// Messages a relay sends to a client.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayMessage {
    /// `["EVENT", subscription_id, event]`
    Event {
        /// Subscription the event answers.
        subscription_id: String,
        /// The event as received, not yet verified.
        event: Event,
    },

    /// `["OK", event_id, accepted, message]`
    Ok {
        /// Hex id of the published event.
        event_id: String,
        /// Whether the relay stored it.
        accepted: bool,
        /// Reason, usually empty on success.
        message: String,
    },

    /// `["EOSE", subscription_id]`: stored events have all been sent.
    EndOfStoredEvents(String),

    /// `["NOTICE", message]`
    Notice(String),

    /// Any other frame, passed through untouched.
    Other(Value),
}

impl RelayMessage {
    /// Parse a wire frame.
    pub fn parse(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Interpret an already-decoded frame.
    ///
    /// Known message types with the wrong shape are errors; unknown types and
    /// non-array values become [`RelayMessage::Other`].
    pub fn from_value(value: Value) -> Result<Self> {
        let Some((kind, rest)) = split_frame(&value) else {
            return Ok(RelayMessage::Other(value));
        };

        match kind {
            "EVENT" => {
                let subscription_id = string_value(rest, 0, "EVENT subscription id")?;
                let event = rest
                    .get(1)
                    .cloned()
                    .ok_or_else(|| SessionError::InvalidFrame("EVENT without event".into()))?;
                let event = serde_json::from_value(event)
                    .map_err(|e| SessionError::InvalidFrame(format!("EVENT payload: {e}")))?;
                Ok(RelayMessage::Event {
                    subscription_id,
                    event,
                })
            }
            "OK" => {
                let event_id = string_value(rest, 0, "OK event id")?;
                let accepted = rest.get(1).and_then(Value::as_bool).ok_or_else(|| {
                    SessionError::InvalidFrame("OK accepted flag must be a boolean".into())
                })?;
                let message = rest
                    .get(2)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Ok(RelayMessage::Ok {
                    event_id,
                    accepted,
                    message,
                })
            }
            "EOSE" => Ok(RelayMessage::EndOfStoredEvents(string_value(
                rest,
                0,
                "EOSE subscription id",
            )?)),
            "NOTICE" => Ok(RelayMessage::Notice(string_value(
                rest,
                0,
                "NOTICE message",
            )?)),
            _ => Ok(RelayMessage::Other(value)),
        }
    }
}

/// Split `["TYPE", ...]` into its type and remaining elements.
fn split_frame(value: &Value) -> Option<(&str, &[Value])> {
    let (kind, rest) = value.as_array()?.split_first()?;
    Some((kind.as_str()?, rest))
}

fn string_value(items: &[Value], index: usize, what: &str) -> Result<String> {
    items
        .get(index)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SessionError::InvalidFrame(format!("{what} must be a string")))
}
