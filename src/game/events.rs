//! Broadcast events and who receives them.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Audience {
    /// Every session in the room, minus the actor when set.
    Room {
        room_id: String,
        exclude: Option<String>,
    },
    Session { session_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Arrival,
    Departure,
    Unlock,
    Speech,
    Emote,
    Interaction,
    Coins,
    Ghost,
    Status,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorldEvent {
    pub audience: Audience,
    pub kind: EventKind,
    pub text: String,
}

impl WorldEvent {
    pub fn to_room(room_id: &str, exclude: Option<&str>, kind: EventKind, text: String) -> Self {
        Self {
            audience: Audience::Room {
                room_id: room_id.to_string(),
                exclude: exclude.map(str::to_string),
            },
            kind,
            text,
        }
    }

    pub fn to_session(session_id: &str, kind: EventKind, text: String) -> Self {
        Self {
            audience: Audience::Session {
                session_id: session_id.to_string(),
            },
            kind,
            text,
        }
    }
}

/// One event resolved to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub session_id: String,
    pub kind: EventKind,
    pub text: String,
}

/// Successful outcome of a player operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    /// Text for the acting player.
    pub message: String,
    /// Side effects for everyone else.
    pub events: Vec<WorldEvent>,
}

impl Reply {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            events: Vec::new(),
        }
    }

    pub fn with_event(mut self, event: WorldEvent) -> Self {
        self.events.push(event);
        self
    }
}
