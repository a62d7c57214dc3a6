//! Identifiers shared across the engine and server.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the owner prefix and the sequence suffix of an order id.
const ORDER_ID_SEP: char = '#';

/// Unique identifier for a trading participant (human or bot).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order identifier encoding its owner.
///
/// The text form is `<participant>#<seq>`. The owner prefix is the routing
/// key for fills: the book wrapper recovers the participant from the id
/// alone. The suffix is a per-room monotonic sequence, which stays unique
/// even when one participant submits several orders inside one tick.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(owner: &ParticipantId, seq: u64) -> Self {
        OrderId(format!("{}{}{}", owner.0, ORDER_ID_SEP, seq))
    }

    /// The participant that owns this order.
    pub fn owner(&self) -> ParticipantId {
        match self.0.rfind(ORDER_ID_SEP) {
            Some(pos) => ParticipantId::new(&self.0[..pos]),
            None => ParticipantId::new(self.0.as_str()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        OrderId(s)
    }
}
