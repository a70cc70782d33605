use tracing::debug;

use super::links::LinkTable;
use crate::ecs::store::EntityStore;
use crate::game::levels::LevelStore;
use crate::protocol::{EntityId, EntitySnapshot, LevelId, Outbound, ServerMessage};

/// An entity that left a level and must disappear from its viewers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestroyNotice {
    pub level: LevelId,
    pub id: EntityId,
}

/// Diff pass run after every action and tick.
///
/// 1. Inactive entities are taken off their level and queued for a
///    destroy notice.
/// 2. The destroy queue is flushed to each level's current subscribers.
/// 3. Every watched level with dirty entities sends one batch to each
///    subscriber.
/// 4. Dirty flags of every batched entity are cleared, and reaped
///    entities are dropped from the store.
pub fn broadcast_pass(
    store: &mut EntityStore,
    levels: &mut LevelStore,
    links: &LinkTable,
    destroy_queue: &mut Vec<DestroyNotice>,
) -> Vec<Outbound> {
    let reaped = reap_inactive(store, levels, destroy_queue);

    let mut out = Vec::new();
    for notice in destroy_queue.drain(..) {
        for session in links.subscribers(&notice.level) {
            out.push(Outbound::new(
                session,
                ServerMessage::DestroyEntity { id: notice.id },
            ));
        }
    }

    let mut sent: Vec<EntityId> = Vec::new();
    for level_id in links.watched_levels() {
        let Some(level) = levels.get(&level_id) else {
            continue;
        };
        let batch: Vec<EntitySnapshot> = level
            .active_entities(store)
            .filter(|&id| store.is_updated(id))
            .filter_map(|id| store.get(id))
            .collect();
        if batch.is_empty() {
            continue;
        }

        sent.extend(batch.iter().map(|e| e.id));
        for session in links.subscribers(&level_id) {
            out.push(Outbound::new(
                session,
                ServerMessage::EntityUpdates(batch.clone()),
            ));
        }
    }

    for id in sent {
        store.clear_updated(id);
    }
    for id in reaped {
        store.remove(id);
    }
    out
}

fn reap_inactive(
    store: &EntityStore,
    levels: &mut LevelStore,
    destroy_queue: &mut Vec<DestroyNotice>,
) -> Vec<EntityId> {
    let mut reaped = Vec::new();
    for level_id in levels.ids() {
        let Some(level) = levels.get_mut(&level_id) else {
            continue;
        };
        let gone: Vec<EntityId> = level
            .entities
            .iter()
            .copied()
            .filter(|&id| !store.is_active(id))
            .collect();
        for id in gone {
            level.remove_entity(id);
            debug!("Reaping entity {} from {}", id, level_id);
            destroy_queue.push(DestroyNotice {
                level: level_id.clone(),
                id,
            });
            reaped.push(id);
        }
    }
    reaped
}
