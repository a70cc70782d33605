use rand::Rng;
use tracing::{debug, warn};

use crate::ecs::components::{ComponentSet, TemplateRef};
use crate::ecs::store::EntityStore;
use crate::ecs::templates::TemplateCatalog;
use crate::game::level::Level;
use crate::protocol::EntityId;

/// Runs the spawner for one level.
///
/// For each `{type, max_n}` entry, counts the active monsters of that type
/// on the level and, when short, adds one new monster on a free walkable
/// tile. New monsters are flagged fresh and hydrated from the catalog.
/// A level with no free tile simply gets nothing this tick.
pub fn spawn_monsters<R: Rng + ?Sized>(
    level: &mut Level,
    store: &mut EntityStore,
    catalog: &TemplateCatalog,
    rng: &mut R,
) -> Vec<EntityId> {
    let mut spawned = Vec::new();

    for entry in level.monsters.clone() {
        let template = TemplateRef::monster(entry.kind.as_str());
        let current = level
            .active_entities(store)
            .filter(|&id| store.template(id).as_ref() == Some(&template))
            .count();

        if current >= entry.max_n {
            continue;
        }

        let position = match level.random_spawn(store, rng) {
            Ok(pos) => pos,
            Err(e) => {
                warn!("Cannot spawn {} on '{}': {}", template, level.id, e);
                continue;
            }
        };

        let id = store.create_from(
            Some(template.clone()),
            ComponentSet {
                position: Some(position),
                ..Default::default()
            },
            true,
        );
        level.add_entity(id);
        store.load_new_entities(&level.entities, catalog);

        debug!("Spawned a {} to level {}", template, level.title);
        spawned.push(id);
    }

    spawned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::{Movement, Position, Stats};
    use crate::game::level::MonsterSpawn;
    use crate::game::tile::Tile;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn catalog() -> TemplateCatalog {
        let mut catalog = TemplateCatalog::new();
        catalog.insert(
            &TemplateRef::monster("slime"),
            ComponentSet {
                stats: Some(Stats {
                    health: 3,
                    strength: 1,
                }),
                movement: Some(Movement::Random),
                ..Default::default()
            },
        );
        catalog
    }

    fn level_with(kind: &str, max_n: usize) -> Level {
        let mut level = Level::filled("lair", 6, 6, Tile::Ground);
        level.monsters.push(MonsterSpawn {
            kind: kind.to_string(),
            max_n,
        });
        level
    }

    fn count_active(level: &Level, store: &EntityStore) -> usize {
        level.active_entities(store).count()
    }

    #[test]
    fn one_spawn_per_entry_per_tick() {
        let mut level = level_with("slime", 3);
        let mut store = EntityStore::new();
        let mut rng = StdRng::seed_from_u64(1);

        let spawned = spawn_monsters(&mut level, &mut store, &catalog(), &mut rng);
        assert_eq!(spawned.len(), 1);
        assert_eq!(level.entities, spawned);
    }

    #[test]
    fn never_exceeds_max_n() {
        let mut level = level_with("slime", 3);
        let mut store = EntityStore::new();
        let catalog = catalog();
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..10 {
            spawn_monsters(&mut level, &mut store, &catalog, &mut rng);
            assert!(count_active(&level, &store) <= 3);
        }
        assert_eq!(count_active(&level, &store), 3);
    }

    #[test]
    fn replaces_defeated_monsters() {
        let mut level = level_with("slime", 2);
        let mut store = EntityStore::new();
        let catalog = catalog();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..2 {
            spawn_monsters(&mut level, &mut store, &catalog, &mut rng);
        }
        store.deactivate(level.entities[0]);
        assert_eq!(count_active(&level, &store), 1);

        let spawned = spawn_monsters(&mut level, &mut store, &catalog, &mut rng);
        assert_eq!(spawned.len(), 1);
        assert_eq!(count_active(&level, &store), 2);
    }

    #[test]
    fn spawned_monsters_are_hydrated_on_free_tiles() {
        let mut level = level_with("slime", 5);
        let mut store = EntityStore::new();
        let catalog = catalog();
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..5 {
            spawn_monsters(&mut level, &mut store, &catalog, &mut rng);
        }

        let mut seen: Vec<Position> = Vec::new();
        for &id in &level.entities {
            assert_eq!(store.component::<Movement>(id), Some(Movement::Random));
            assert!(store.is_monster(id));
            let pos = store.position(id).unwrap();
            assert!(!seen.contains(&pos));
            seen.push(pos);
        }
    }

    #[test]
    fn full_level_spawns_nothing() {
        let mut level = level_with("slime", 5);
        level.tiles = vec![Tile::Wall; level.tiles.len()];
        let mut store = EntityStore::new();
        let mut rng = StdRng::seed_from_u64(8);
        assert!(spawn_monsters(&mut level, &mut store, &catalog(), &mut rng).is_empty());
        assert!(level.entities.is_empty());
    }

    #[test]
    fn existing_entities_are_not_rehydrated() {
        let mut level = level_with("slime", 2);
        let mut store = EntityStore::new();
        let catalog = catalog();
        let mut rng = StdRng::seed_from_u64(3);
        let first = spawn_monsters(&mut level, &mut store, &catalog, &mut rng)[0];
        store.with_mut::<Stats, _>(first, |s| s.health = 1);

        spawn_monsters(&mut level, &mut store, &catalog, &mut rng);
        assert_eq!(store.component::<Stats>(first).unwrap().health, 1);
    }
}
