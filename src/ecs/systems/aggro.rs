use crate::ecs::components::{Combat, Component, Position, Range, Sid};
use crate::ecs::store::EntityStore;
use crate::game::level::Level;
use crate::protocol::{EntityId, SessionId};

/// Range-triggered aggro for one level.
///
/// Every active monster with a `range` checks its straight-line distance to
/// the players on the level (or only to `trigger`, when given). Within
/// range, the monster locks onto that player's session and the player is
/// flagged in combat; the player side does not record the monster.
///
/// Monsters already in combat are skipped unless a `trigger` is given, so a
/// fighting monster can still switch to the player who just moved.
///
/// Returns the `(monster, player)` pairs that engaged.
pub fn check_for_combat(
    level: &Level,
    store: &mut EntityStore,
    trigger: Option<EntityId>,
) -> Vec<(EntityId, EntityId)> {
    let monsters: Vec<(EntityId, Position, f64)> = level
        .active_entities(store)
        .filter(|&id| store.is_monster(id))
        .filter(|&id| {
            trigger.is_some() || !store.component::<Combat>(id).map_or(false, |c| c.in_combat)
        })
        .filter_map(|id| {
            let pos = store.position(id)?;
            let Range(range) = store.component::<Range>(id)?;
            Some((id, pos, range))
        })
        .collect();

    let players: Vec<(EntityId, Position, Sid)> = match trigger {
        Some(id) => vec![id],
        None => level.active_entities(store).collect(),
    }
    .into_iter()
    .filter(|&id| store.is_active(id))
    .filter_map(|id| Some((id, store.position(id)?, store.component::<Sid>(id)?)))
    .collect();

    let mut engaged = Vec::new();
    for &(monster, monster_pos, range) in &monsters {
        for &(player, player_pos, Sid(session)) in &players {
            if monster_pos.distance(player_pos) > range {
                continue;
            }
            set_combat(
                store,
                monster,
                Combat {
                    in_combat: true,
                    opponent: Some(session),
                },
            );
            set_combat(
                store,
                player,
                Combat {
                    in_combat: true,
                    opponent: None,
                },
            );
            engaged.push((monster, player));
        }
    }
    engaged
}

/// Overwrite an entity's combat state, marking it dirty only on change.
pub fn set_combat(store: &mut EntityStore, id: EntityId, combat: Combat) {
    if store.component::<Combat>(id) == Some(combat) {
        return;
    }
    let _ = store.add_component(id, Component::Combat(combat));
    store.mark_updated(id);
}

pub fn in_combat(store: &EntityStore, id: EntityId) -> bool {
    store.component::<Combat>(id).map_or(false, |c| c.in_combat)
}

/// Active monsters on the level locked onto `session`.
pub fn hunters_of(level: &Level, store: &EntityStore, session: SessionId) -> Vec<EntityId> {
    level
        .active_entities(store)
        .filter(|&id| store.is_monster(id))
        .filter(|&id| {
            store
                .component::<Combat>(id)
                .map_or(false, |c| c.opponent == Some(session))
        })
        .collect()
}

/// Drop every monster's lock on `session`. Used when the player leaves the
/// level or disconnects.
pub fn release_target(level: &Level, store: &mut EntityStore, session: SessionId) -> usize {
    let hunters = hunters_of(level, store, session);
    for &id in &hunters {
        set_combat(store, id, Combat::default());
    }
    hunters.len()
}
