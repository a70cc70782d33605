use rand::seq::SliceRandom;
use rand::Rng;

use super::aggro::{check_for_combat, hunters_of, in_combat};
use crate::ecs::components::{Movement, Position};
use crate::ecs::store::EntityStore;
use crate::game::level::Level;
use crate::game::movement::resolve_move;
use crate::protocol::{EntityId, SessionId};

/// 8-connected neighbourhood offsets.
const MOORE: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Move a random-walking entity one step to a uniformly chosen legal
/// neighbour. Returns the new position, or `None` when the entity is not a
/// random walker or is boxed in and holds position.
///
/// This does not look at combat state; callers decide whether in-combat
/// entities may step.
pub fn step_ai<R: Rng + ?Sized>(
    level: &Level,
    store: &mut EntityStore,
    rng: &mut R,
    id: EntityId,
) -> Option<Position> {
    if !store.is_active(id) || store.component::<Movement>(id) != Some(Movement::Random) {
        return None;
    }
    let from = store.position(id)?;

    let view: &EntityStore = store;
    let options: Vec<Position> = MOORE
        .iter()
        .map(|&(dx, dy)| from.offset(dx, dy))
        .filter(|&to| resolve_move(level, view, id, to).is_accepted())
        .collect();

    let to = *options.choose(rng)?;
    store.set_position(id, to).ok()?;
    store.mark_updated(id);
    Some(to)
}

/// A player in combat just acted: every monster on the level locked onto
/// that player's session steps immediately, in combat or not.
pub fn react_to_player_move<R: Rng + ?Sized>(
    level: &Level,
    store: &mut EntityStore,
    rng: &mut R,
    session: SessionId,
) -> Vec<EntityId> {
    hunters_of(level, store, session)
        .into_iter()
        .filter(|&id| step_ai(level, store, rng, id).is_some())
        .collect()
}

/// Periodic monster update for one level: random walkers that are not in
/// combat take a step, then aggro is checked against every player.
pub fn update_monsters<R: Rng + ?Sized>(level: &Level, store: &mut EntityStore, rng: &mut R) {
    let walkers: Vec<EntityId> = level
        .active_entities(store)
        .filter(|&id| store.component::<Movement>(id) == Some(Movement::Random))
        .filter(|&id| !in_combat(store, id))
        .collect();

    for id in walkers {
        step_ai(level, store, rng, id);
    }

    check_for_combat(level, store, None);
}
