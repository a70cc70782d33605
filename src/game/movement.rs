use super::level::Level;
use super::tile::{Passability, Tile};
use crate::ecs::components::Position;
use crate::ecs::store::EntityStore;
use crate::protocol::EntityId;

pub const CANNOT_MOVE: &str = "You cannot move there";
pub const WALL_BUMP: &str = "You bump into the wall";
pub const GRASS_RUSTLE: &str = "You rustle through the tall grass";

/// Result of asking whether an entity may step onto a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// The step is legal. The caller commits the position.
    Accepted { flavor: Option<String> },
    /// Terrain or bounds refused the step.
    Blocked { message: String },
    /// A monster stands there; the caller resolves combat instead.
    Monster(EntityId),
    /// Another player stands there.
    Player(EntityId),
}

impl MoveOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, MoveOutcome::Accepted { .. })
    }

    fn blocked(message: &str) -> Self {
        MoveOutcome::Blocked {
            message: message.to_string(),
        }
    }
}

/// Decide whether `mover` may step onto `target` on `level`.
///
/// Terrain is checked first, so walls reject regardless of who stands on
/// them. Only active monsters and players occupy a cell; the mover never
/// blocks itself.
pub fn resolve_move(
    level: &Level,
    store: &EntityStore,
    mover: EntityId,
    target: Position,
) -> MoveOutcome {
    let Some(tile) = level.tile_at(target) else {
        return MoveOutcome::blocked(CANNOT_MOVE);
    };

    match tile.passability() {
        Passability::Wall => return MoveOutcome::blocked(WALL_BUMP),
        Passability::Blocked => return MoveOutcome::blocked(CANNOT_MOVE),
        Passability::Walkable => {}
    }

    let occupant = level
        .active_entities(store)
        .filter(|&id| id != mover)
        .filter(|&id| store.position(id) == Some(target))
        .find(|&id| store.is_monster(id) || store.is_player(id));

    match occupant {
        Some(id) if store.is_monster(id) => MoveOutcome::Monster(id),
        Some(id) => MoveOutcome::Player(id),
        None => MoveOutcome::Accepted {
            flavor: (*tile == Tile::TallGrass).then(|| GRASS_RUSTLE.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::{Component, ComponentSet, Sid, TemplateRef};

    fn setup() -> (Level, EntityStore, EntityId) {
        let mut level = Level::filled("l", 5, 5, Tile::Ground);
        level.set_tile(Position { x: 0, y: 0 }, Tile::Wall);
        level.set_tile(Position { x: 1, y: 0 }, Tile::Empty);
        level.set_tile(Position { x: 2, y: 0 }, Tile::TallGrass);
        let mut store = EntityStore::new();
        let mover = spawn_player(&mut store, &mut level, 2, 2, 1);
        (level, store, mover)
    }

    fn spawn_player(
        store: &mut EntityStore,
        level: &mut Level,
        x: i32,
        y: i32,
        sid: u64,
    ) -> EntityId {
        let id = store.create_entity();
        store
            .add_component(id, Component::Position(Position { x, y }))
            .unwrap();
        store.add_component(id, Component::Sid(Sid(sid))).unwrap();
        level.add_entity(id);
        id
    }

    fn spawn_monster(store: &mut EntityStore, level: &mut Level, x: i32, y: i32) -> EntityId {
        let id = store.create_from(
            Some(TemplateRef::monster("slime")),
            ComponentSet {
                position: Some(Position { x, y }),
                ..Default::default()
            },
            false,
        );
        level.add_entity(id);
        id
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let (level, store, mover) = setup();
        assert_eq!(
            resolve_move(&level, &store, mover, Position { x: -1, y: 2 }),
            MoveOutcome::Blocked {
                message: CANNOT_MOVE.to_string()
            }
        );
        assert!(!resolve_move(&level, &store, mover, Position { x: 5, y: 2 }).is_accepted());
    }

    #[test]
    fn wall_rejects_even_when_occupied() {
        let (mut level, mut store, mover) = setup();
        spawn_monster(&mut store, &mut level, 0, 0);
        assert_eq!(
            resolve_move(&level, &store, mover, Position { x: 0, y: 0 }),
            MoveOutcome::Blocked {
                message: WALL_BUMP.to_string()
            }
        );
    }

    #[test]
    fn unpainted_cell_is_generic_block() {
        let (level, store, mover) = setup();
        assert_eq!(
            resolve_move(&level, &store, mover, Position { x: 1, y: 0 }),
            MoveOutcome::Blocked {
                message: CANNOT_MOVE.to_string()
            }
        );
    }

    #[test]
    fn tall_grass_rustles_but_accepts() {
        let (level, store, mover) = setup();
        assert_eq!(
            resolve_move(&level, &store, mover, Position { x: 2, y: 0 }),
            MoveOutcome::Accepted {
                flavor: Some(GRASS_RUSTLE.to_string())
            }
        );
    }

    #[test]
    fn monster_occupant_signals_combat() {
        let (mut level, mut store, mover) = setup();
        let slime = spawn_monster(&mut store, &mut level, 3, 3);
        assert_eq!(
            resolve_move(&level, &store, mover, Position { x: 3, y: 3 }),
            MoveOutcome::Monster(slime)
        );
    }

    #[test]
    fn player_occupant_blocks() {
        let (mut level, mut store, mover) = setup();
        let other = spawn_player(&mut store, &mut level, 2, 3, 2);
        assert_eq!(
            resolve_move(&level, &store, mover, Position { x: 2, y: 3 }),
            MoveOutcome::Player(other)
        );
    }

    #[test]
    fn inactive_occupant_is_ignored() {
        let (mut level, mut store, mover) = setup();
        let slime = spawn_monster(&mut store, &mut level, 3, 3);
        store.deactivate(slime);
        assert!(resolve_move(&level, &store, mover, Position { x: 3, y: 3 }).is_accepted());
    }

    #[test]
    fn mover_does_not_block_itself() {
        let (level, store, mover) = setup();
        assert!(resolve_move(&level, &store, mover, Position { x: 2, y: 2 }).is_accepted());
    }
}
