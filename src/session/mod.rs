pub mod broadcast;
pub mod links;

use std::collections::HashMap;

use tracing::{info, warn};

use crate::ecs::world::{GameWorld, StairsOutcome, NO_STAIRS, STAIRS_NOWHERE};
use crate::error::GameError;
use crate::protocol::{
    keypad_delta, ClientMessage, EntityId, LevelId, Outbound, PlayerAction, ServerMessage,
    SessionEvent, SessionId,
};
use broadcast::{broadcast_pass, DestroyNotice};
use links::LinkTable;

pub const PLEASE_LOG_IN: &str = "Please log in first";
pub const ALREADY_LOGGED_IN: &str = "You are already logged in";
pub const WORLD_UNAVAILABLE: &str = "The world is not available right now";

/// A logged-in player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSession {
    pub username: String,
    pub level: LevelId,
    pub entity: EntityId,
}

/// Maps transport sessions onto player entities and turns session events
/// into world mutations and outbound messages.
///
/// Every call runs to completion and ends with a broadcast pass, so the
/// returned messages always reflect committed state.
pub struct SessionCoordinator {
    pub world: GameWorld,
    /// Connected sessions; `None` until the session logs in.
    sessions: HashMap<SessionId, Option<PlayerSession>>,
    links: LinkTable,
    destroy_queue: Vec<DestroyNotice>,
}

impl SessionCoordinator {
    pub fn new(world: GameWorld) -> Self {
        Self {
            world,
            sessions: HashMap::new(),
            links: LinkTable::new(),
            destroy_queue: Vec::new(),
        }
    }

    pub fn session(&self, id: SessionId) -> Option<&PlayerSession> {
        self.sessions.get(&id).and_then(Option::as_ref)
    }

    pub fn links(&self) -> &LinkTable {
        &self.links
    }

    pub fn connected(&self) -> usize {
        self.sessions.len()
    }

    // ── Entry points ─────────────────────────────────────────────────

    pub fn handle(&mut self, event: SessionEvent) -> Vec<Outbound> {
        let mut out = match event {
            SessionEvent::Connect(sid) => {
                info!("Session {} connected", sid);
                self.sessions.insert(sid, None);
                Vec::new()
            }
            SessionEvent::Disconnect(sid) => {
                self.disconnect(sid);
                Vec::new()
            }
            SessionEvent::Message(sid, message) => self.handle_message(sid, message),
        };
        out.extend(self.broadcast());
        out
    }

    /// Periodic world tick followed by a broadcast pass.
    pub fn tick(&mut self) -> Vec<Outbound> {
        self.world.tick();
        self.broadcast()
    }

    fn broadcast(&mut self) -> Vec<Outbound> {
        broadcast_pass(
            &mut self.world.store,
            &mut self.world.levels,
            &self.links,
            &mut self.destroy_queue,
        )
    }

    fn handle_message(&mut self, sid: SessionId, message: ClientMessage) -> Vec<Outbound> {
        let Some(slot) = self.sessions.get(&sid) else {
            warn!("Dropping message: {}", GameError::UnknownSession(sid));
            return Vec::new();
        };

        match (message, slot.clone()) {
            (ClientMessage::Login { username }, None) => self.login(sid, username),
            (ClientMessage::Login { .. }, Some(_)) => reply(sid, ALREADY_LOGGED_IN),
            (_, None) => reply(sid, PLEASE_LOG_IN),
            (ClientMessage::RequestPresentLevel, Some(player)) => {
                self.present_level(sid, &player)
            }
            (ClientMessage::Action(PlayerAction::Move { direction }), Some(player)) => {
                self.move_player(sid, &player, direction)
            }
            (ClientMessage::Action(PlayerAction::StairsDown), Some(player)) => {
                self.stairs_down(sid, player)
            }
        }
    }

    // ── Handlers ─────────────────────────────────────────────────────

    fn login(&mut self, sid: SessionId, username: String) -> Vec<Outbound> {
        let level = self.world.default_level.clone();
        if !self.world.load_level(&level) {
            return reply(sid, WORLD_UNAVAILABLE);
        }

        let entity = match self.world.spawn_player(&level, sid, &username) {
            Ok(entity) => entity,
            Err(e) => {
                warn!("Login of {} on session {} failed: {}", username, sid, e);
                return reply(sid, WORLD_UNAVAILABLE);
            }
        };

        info!("{} logged in on session {} as entity {}", username, sid, entity);
        self.sessions.insert(
            sid,
            Some(PlayerSession {
                username,
                level,
                entity,
            }),
        );
        vec![Outbound::new(sid, ServerMessage::LoginSuccess)]
    }

    fn present_level(&mut self, sid: SessionId, player: &PlayerSession) -> Vec<Outbound> {
        let Some(level) = self.world.levels.get(&player.level) else {
            return reply(sid, WORLD_UNAVAILABLE);
        };
        let snapshot = level.snapshot(&self.world.store);
        self.links.subscribe(&player.level, sid);
        vec![Outbound::new(sid, ServerMessage::PresentLevel(snapshot))]
    }

    fn move_player(
        &mut self,
        sid: SessionId,
        player: &PlayerSession,
        direction: u8,
    ) -> Vec<Outbound> {
        let delta = keypad_delta(direction);
        match self
            .world
            .move_player(&player.level, player.entity, sid, delta)
        {
            Ok(messages) => messages
                .into_iter()
                .map(|text| Outbound::new(sid, ServerMessage::msg(text)))
                .collect(),
            Err(e) => {
                warn!("Move by session {} failed: {}", sid, e);
                Vec::new()
            }
        }
    }

    fn stairs_down(&mut self, sid: SessionId, player: PlayerSession) -> Vec<Outbound> {
        match self.world.descend_stairs(&player.level, player.entity, sid) {
            Ok(StairsOutcome::Descended { from, to }) => {
                self.destroy_queue.push(DestroyNotice {
                    level: from.clone(),
                    id: player.entity,
                });
                self.links.unsubscribe(&from, sid);
                self.links.subscribe(&to, sid);
                self.sessions.insert(
                    sid,
                    Some(PlayerSession {
                        level: to.clone(),
                        ..player
                    }),
                );
                vec![Outbound::new(sid, ServerMessage::LevelChange { level: to })]
            }
            Ok(StairsOutcome::NotOnStairs) => reply(sid, NO_STAIRS),
            Ok(StairsOutcome::Unreachable) => reply(sid, STAIRS_NOWHERE),
            Err(e) => {
                warn!("Stairs by session {} failed: {}", sid, e);
                Vec::new()
            }
        }
    }

    fn disconnect(&mut self, sid: SessionId) {
        let Some(slot) = self.sessions.remove(&sid) else {
            warn!("Ignoring disconnect: {}", GameError::UnknownSession(sid));
            return;
        };
        self.links.unsubscribe_all(sid);

        if let Some(player) = slot {
            self.world.remove_player(&player.level, player.entity, sid);
            info!("{} left (session {})", player.username, sid);
        } else {
            info!("Session {} disconnected", sid);
        }
    }
}

fn reply(sid: SessionId, text: &str) -> Vec<Outbound> {
    vec![Outbound::new(sid, ServerMessage::msg(text))]
}
