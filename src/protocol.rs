use serde::{Deserialize, Serialize};

use crate::ecs::components::ComponentSet;
use crate::game::level::Elements;
use crate::game::tile::Tile;

// ── Core type aliases ──────────────────────────────────────────────

pub type EntityId = u64;
pub type SessionId = u64;
pub type LevelId = String;

// ── Snapshots ──────────────────────────────────────────────────────

/// Replicated view of one entity: identity, lifecycle and every component
/// it currently carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub active: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    pub components: ComponentSet,
}

/// Full view of a level sent when a session asks for its present level.
/// Inactive entities are stripped before this is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSnapshot {
    pub id: LevelId,
    pub title: String,
    pub width: i32,
    pub height: i32,
    pub tiles: Vec<Tile>,
    pub elements: Elements,
    pub entities: Vec<EntitySnapshot>,
}

// ── Client → Server messages ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerAction {
    /// Numeric keypad compass code: 1-4 and 6-9, 5 is the centre.
    Move { direction: u8 },
    StairsDown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    Login { username: String },
    RequestPresentLevel,
    Action(PlayerAction),
}

/// Events the transport hands to the game loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connect(SessionId),
    Disconnect(SessionId),
    Message(SessionId, ClientMessage),
}

// ── Server → Client messages ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    LoginSuccess,
    Msg { text: String },
    PresentLevel(LevelSnapshot),
    EntityUpdates(Vec<EntitySnapshot>),
    DestroyEntity { id: EntityId },
    LevelChange { level: LevelId },
}

impl ServerMessage {
    pub fn msg(text: impl Into<String>) -> Self {
        ServerMessage::Msg { text: text.into() }
    }
}

/// A server message addressed to one session.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: SessionId,
    pub message: ServerMessage,
}

impl Outbound {
    pub fn new(to: SessionId, message: ServerMessage) -> Self {
        Self { to, message }
    }
}

// ── Direction decoding ─────────────────────────────────────────────

/// Decode a numeric keypad direction into a grid delta. `y` grows
/// downwards, so 8 is north and 2 is south. Anything unrecognised
/// (including the centre key) decodes to no movement.
pub fn keypad_delta(code: u8) -> (i32, i32) {
    match code {
        1 => (-1, 1),
        2 => (0, 1),
        3 => (1, 1),
        4 => (-1, 0),
        6 => (1, 0),
        7 => (-1, -1),
        8 => (0, -1),
        9 => (1, -1),
        _ => (0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypad_codes_cover_all_eight_directions() {
        let mut deltas: Vec<(i32, i32)> = [1, 2, 3, 4, 6, 7, 8, 9]
            .iter()
            .map(|&c| keypad_delta(c))
            .collect();
        deltas.sort();
        deltas.dedup();
        assert_eq!(deltas.len(), 8);
        assert!(!deltas.contains(&(0, 0)));
    }

    #[test]
    fn centre_and_unknown_codes_do_not_move() {
        assert_eq!(keypad_delta(5), (0, 0));
        assert_eq!(keypad_delta(0), (0, 0));
        assert_eq!(keypad_delta(42), (0, 0));
    }

    #[test]
    fn north_is_up() {
        assert_eq!(keypad_delta(8), (0, -1));
        assert_eq!(keypad_delta(2), (0, 1));
    }

    #[test]
    fn client_message_survives_msgpack() {
        let msg = ClientMessage::Action(PlayerAction::Move { direction: 7 });
        let bytes = rmp_serde::to_vec_named(&msg).unwrap();
        let back: ClientMessage = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(back, msg);
    }
}
