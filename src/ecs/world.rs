use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, warn};

use super::components::{Combat, ComponentSet, Name, Position, Sid, Sprite, Stats, TemplateRef};
use super::store::EntityStore;
use super::systems::aggro::{check_for_combat, hunters_of, in_combat, release_target, set_combat};
use super::systems::combat::resolve_attack;
use super::systems::monster_ai::{react_to_player_move, update_monsters};
use super::systems::spawn::spawn_monsters;
use super::templates::TemplateCatalog;
use crate::config::ServerConfig;
use crate::error::GameError;
use crate::game::cave::generate_cave;
use crate::game::level::{Generator, Level};
use crate::game::levels::LevelStore;
use crate::game::movement::{resolve_move, MoveOutcome};
use crate::game::tile::Tile;
use crate::protocol::{EntityId, LevelId, SessionId};

pub const NO_STAIRS: &str = "There are no stairs here";
pub const STAIRS_NOWHERE: &str = "The stairs lead nowhere";
pub const CANNOT_ATTACK: &str = "You can't attack that";

/// What a descend attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StairsOutcome {
    Descended { from: LevelId, to: LevelId },
    NotOnStairs,
    /// The stairs exist but their target could not be loaded or has no
    /// room; the player stays where they are.
    Unreachable,
}

/// Single owner of all mutable simulation state: entities, levels, the
/// template catalog and the world RNG.
pub struct GameWorld {
    pub store: EntityStore,
    pub levels: LevelStore,
    pub templates: TemplateCatalog,
    pub rng: StdRng,
    pub default_level: LevelId,
    pub player_stats: Stats,
}

impl GameWorld {
    /// Load the level registry and the template catalog from the data
    /// directory. Both are fatal when missing or malformed.
    pub fn new(config: &ServerConfig) -> Result<Self, GameError> {
        let levels = LevelStore::load_registry(&config.data_dir)?;
        let templates = TemplateCatalog::load_dir(&config.data_dir.join("entities"))?;
        let rng = match config.world_seed {
            Some(seed) => {
                info!("Using fixed world seed {}", seed);
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_entropy(),
        };

        let mut world = Self::from_parts(levels, templates, rng, config.default_level.clone());
        world.player_stats = config.player_stats;
        Ok(world)
    }

    pub fn from_parts(
        levels: LevelStore,
        templates: TemplateCatalog,
        rng: StdRng,
        default_level: impl Into<LevelId>,
    ) -> Self {
        Self {
            store: EntityStore::new(),
            levels,
            templates,
            rng,
            default_level: default_level.into(),
            player_stats: ServerConfig::default().player_stats,
        }
    }

    // ── Level loading ────────────────────────────────────────────────

    /// Make sure a level is loaded. Returns `false` (and logs) when it
    /// cannot be; nothing of a failed level is left behind in the cache.
    pub fn load_level(&mut self, id: &str) -> bool {
        if self.levels.is_loaded(id) {
            return true;
        }

        info!("Loading level {}", id);
        match self.build_level(id) {
            Ok(level) => {
                info!(
                    "Level {} loaded ({}x{}, {} entities)",
                    level.title,
                    level.width,
                    level.height,
                    level.entities.len()
                );
                self.levels.insert(level);
                true
            }
            Err(e) => {
                error!("Failed to load level {}: {}", id, e);
                false
            }
        }
    }

    /// Parse, generate and hydrate a level without publishing it.
    fn build_level(&mut self, id: &str) -> Result<Level, GameError> {
        let definition = self.levels.definition(id)?;
        let mut level = Level::from_definition(id, &definition)?;

        if definition.level.generator == Some(Generator::Cave) {
            generate_cave(&mut level, &mut self.rng);
        }

        for entity in &definition.entities {
            let template = match entity.template.as_deref() {
                Some(raw) => {
                    let parsed = TemplateRef::parse(raw);
                    if parsed.is_none() {
                        warn!("Level {} lists an entity with bad type '{}'", id, raw);
                    }
                    parsed
                }
                None => None,
            };
            let entity_id = self
                .store
                .create_from(template, entity.components.clone(), false);
            level.add_entity(entity_id);
        }
        self.store
            .load_level_entities(&level.entities, &self.templates);

        Ok(level)
    }

    /// Where a player arriving on `level_id` is placed: the level's
    /// `spawn` element, or any free walkable tile when it has none.
    pub fn spawn_point(&mut self, level_id: &str) -> Result<Position, GameError> {
        let level = self
            .levels
            .get(level_id)
            .ok_or_else(|| GameError::LevelNotLoaded(level_id.to_string()))?;
        if let Some(spawn) = level.elements.spawn {
            return Ok(spawn);
        }
        level.random_spawn(&self.store, &mut self.rng).map_err(|e| {
            warn!("Level {} has no spawn element and no fallback tile: {}", level_id, e);
            GameError::NoSpawnPoint(level_id.to_string())
        })
    }

    // ── Players ──────────────────────────────────────────────────────

    /// Create a player entity on a loaded level at its spawn point.
    pub fn spawn_player(
        &mut self,
        level_id: &str,
        session: SessionId,
        username: &str,
    ) -> Result<EntityId, GameError> {
        let position = self.spawn_point(level_id)?;
        let id = self.store.create_from(
            None,
            ComponentSet {
                sprite: Some(Sprite {
                    sprite: "player".to_string(),
                }),
                position: Some(position),
                sid: Some(Sid(session)),
                stats: Some(self.player_stats),
                name: Some(Name(username.to_string())),
                ..Default::default()
            },
            false,
        );
        self.levels
            .get_mut(level_id)
            .ok_or_else(|| GameError::LevelNotLoaded(level_id.to_string()))?
            .add_entity(id);
        Ok(id)
    }

    /// Soft-delete a player and free the monsters that were hunting it.
    pub fn remove_player(&mut self, level_id: &str, entity: EntityId, session: SessionId) {
        self.store.deactivate(entity);
        if let Some(level) = self.levels.get(level_id) {
            release_target(level, &mut self.store, session);
        }
    }

    /// Move a player by `delta`. Returns the chat messages the player
    /// should see.
    pub fn move_player(
        &mut self,
        level_id: &str,
        mover: EntityId,
        session: SessionId,
        delta: (i32, i32),
    ) -> Result<Vec<String>, GameError> {
        let level = self
            .levels
            .get(level_id)
            .ok_or_else(|| GameError::LevelNotLoaded(level_id.to_string()))?;
        let from = self
            .store
            .position(mover)
            .ok_or(GameError::MissingComponent {
                entity: mover,
                component: "position",
            })?;
        let target = from.offset(delta.0, delta.1);

        let mut messages = Vec::new();
        match resolve_move(level, &self.store, mover, target) {
            MoveOutcome::Accepted { flavor } => {
                self.store.set_position(mover, target)?;
                self.store.mark_updated(mover);
                messages.extend(flavor);
                after_player_action(level, &mut self.store, &mut self.rng, mover, session);
            }
            MoveOutcome::Monster(defender) => {
                let defeated = match resolve_attack(&mut self.store, mover, defender) {
                    Ok(outcome) => {
                        messages.push(outcome.message);
                        outcome.defender_died
                    }
                    Err(e) => {
                        warn!("Entity {} cannot attack {}: {}", mover, defender, e);
                        messages.push(CANNOT_ATTACK.to_string());
                        false
                    }
                };
                after_player_action(level, &mut self.store, &mut self.rng, mover, session);

                if defeated && hunters_of(level, &self.store, session).is_empty() {
                    set_combat(&mut self.store, mover, Combat::default());
                }
            }
            MoveOutcome::Player(other) => {
                messages.push(format!("{} is in the way", self.store.display_name(other)));
            }
            MoveOutcome::Blocked { message } => messages.push(message),
        }
        Ok(messages)
    }

    /// Take a player down the stairs they stand on.
    pub fn descend_stairs(
        &mut self,
        level_id: &str,
        mover: EntityId,
        session: SessionId,
    ) -> Result<StairsOutcome, GameError> {
        let level = self
            .levels
            .get(level_id)
            .ok_or_else(|| GameError::LevelNotLoaded(level_id.to_string()))?;

        let stairs = level.tile_pos(&Tile::StairsDown);
        if stairs.is_none() || self.store.position(mover) != stairs {
            return Ok(StairsOutcome::NotOnStairs);
        }
        let Some(target) = level.elements.stairs_down.as_ref().map(|s| s.target.clone()) else {
            warn!("Level {} has stairs down without a target", level_id);
            return Ok(StairsOutcome::Unreachable);
        };

        if !self.load_level(&target) {
            return Ok(StairsOutcome::Unreachable);
        }
        let arrival = match self.spawn_point(&target) {
            Ok(pos) => pos,
            Err(e) => {
                warn!("Cannot place entity {} on {}: {}", mover, target, e);
                return Ok(StairsOutcome::Unreachable);
            }
        };

        if let Some(source) = self.levels.get_mut(level_id) {
            source.remove_entity(mover);
        }
        if let Some(source) = self.levels.get(level_id) {
            release_target(source, &mut self.store, session);
        }
        set_combat(&mut self.store, mover, Combat::default());

        self.store.set_position(mover, arrival)?;
        self.store.mark_updated(mover);
        self.levels
            .get_mut(&target)
            .ok_or_else(|| GameError::LevelNotLoaded(target.clone()))?
            .add_entity(mover);

        info!("Entity {} descended from {} to {}", mover, level_id, target);
        Ok(StairsOutcome::Descended {
            from: level_id.to_string(),
            to: target,
        })
    }

    // ── Periodic tick ────────────────────────────────────────────────

    /// Spawner pass over every loaded level.
    pub fn spawn_tick(&mut self) -> Vec<EntityId> {
        let mut spawned = Vec::new();
        for id in self.levels.ids() {
            if let Some(level) = self.levels.get_mut(&id) {
                spawned.extend(spawn_monsters(
                    level,
                    &mut self.store,
                    &self.templates,
                    &mut self.rng,
                ));
            }
        }
        spawned
    }

    /// One world tick: spawn, then let the monsters of every loaded level
    /// wander and look for players.
    pub fn tick(&mut self) {
        self.spawn_tick();
        for id in self.levels.ids() {
            if let Some(level) = self.levels.get(&id) {
                update_monsters(level, &mut self.store, &mut self.rng);
            }
        }
    }
}

/// Aggro check targeted at the player that just acted, then the monsters
/// hunting them react if the player is now in combat.
fn after_player_action(
    level: &Level,
    store: &mut EntityStore,
    rng: &mut StdRng,
    mover: EntityId,
    session: SessionId,
) {
    check_for_combat(level, store, Some(mover));
    if in_combat(store, mover) {
        react_to_player_move(level, store, rng, session);
    }
}
