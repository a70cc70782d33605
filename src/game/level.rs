use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::tile::Tile;
use crate::ecs::components::{ComponentSet, Position};
use crate::ecs::store::EntityStore;
use crate::error::GameError;
use crate::protocol::{EntityId, LevelId, LevelSnapshot};

// ── On-disk level definition ────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct LevelDefinition {
    #[serde(default)]
    pub title: String,
    pub level: GridDefinition,
    #[serde(default)]
    pub elements: Elements,
    #[serde(default)]
    pub entities: Vec<EntityDefinition>,
    #[serde(default)]
    pub monsters: Vec<MonsterSpawn>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GridDefinition {
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub tiles: Vec<Tile>,
    #[serde(default)]
    pub generator: Option<Generator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generator {
    Cave,
}

/// An entity listed in a level file. Hydrated from its template at load.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityDefinition {
    #[serde(rename = "type", default)]
    pub template: Option<String>,
    #[serde(default)]
    pub components: ComponentSet,
}

/// Spawner entry: keep up to `max_n` active monsters of `kind` alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterSpawn {
    #[serde(rename = "type")]
    pub kind: String,
    pub max_n: usize,
}

/// Named special elements of a level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Elements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn: Option<Position>,
    #[serde(
        rename = "stairs down",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub stairs_down: Option<StairsDown>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StairsDown {
    pub target: LevelId,
}

// ── Runtime level ───────────────────────────────────────────────────

/// Largest grid a level file may declare.
pub const MAX_CELLS: usize = 1 << 20;

/// A loaded level. Entities are referenced by id only; the
/// [`EntityStore`] owns them.
#[derive(Debug, Clone)]
pub struct Level {
    pub id: LevelId,
    pub title: String,
    pub width: i32,
    pub height: i32,
    /// Row-major, `width * height` cells.
    pub tiles: Vec<Tile>,
    pub elements: Elements,
    pub entities: Vec<EntityId>,
    pub monsters: Vec<MonsterSpawn>,
}

impl Level {
    /// A level whose every cell is `fill`.
    pub fn filled(id: impl Into<LevelId>, width: i32, height: i32, fill: Tile) -> Self {
        let cells = width.max(0) as usize * height.max(0) as usize;
        Self {
            id: id.into(),
            title: String::new(),
            width,
            height,
            tiles: vec![fill; cells],
            elements: Elements::default(),
            entities: Vec::new(),
            monsters: Vec::new(),
        }
    }

    /// Build the grid part of a definition. Generated levels start out
    /// all `empty`; hand-made ones must supply exactly `width * height`
    /// tiles.
    pub fn from_definition(id: &str, def: &LevelDefinition) -> Result<Self, GameError> {
        let grid = &def.level;
        if grid.width <= 0 || grid.height <= 0 {
            return Err(GameError::LevelParse {
                level: id.to_string(),
                details: format!("invalid size {}x{}", grid.width, grid.height),
            });
        }
        let cells = grid.width.checked_mul(grid.height).map(|n| n as usize);
        if cells.map_or(true, |n| n > MAX_CELLS) {
            return Err(GameError::LevelParse {
                level: id.to_string(),
                details: format!(
                    "size {}x{} exceeds {} cells",
                    grid.width,
                    grid.height,
                    MAX_CELLS
                ),
            });
        }

        let mut level = Level::filled(id, grid.width, grid.height, Tile::Empty);
        if grid.generator.is_none() {
            if grid.tiles.len() != level.tiles.len() {
                return Err(GameError::LevelParse {
                    level: id.to_string(),
                    details: format!(
                        "expected {} tiles, found {}",
                        level.tiles.len(),
                        grid.tiles.len()
                    ),
                });
            }
            level.tiles = grid.tiles.clone();
        }
        level.title = if def.title.is_empty() {
            id.to_string()
        } else {
            def.title.clone()
        };
        level.elements = def.elements.clone();
        level.monsters = def.monsters.clone();
        Ok(level)
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    fn index(&self, pos: Position) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| pos.y as usize * self.width as usize + pos.x as usize)
    }

    /// Bounds-checked lookup.
    pub fn tile_at(&self, pos: Position) -> Option<&Tile> {
        self.index(pos).and_then(|i| self.tiles.get(i))
    }

    pub fn set_tile(&mut self, pos: Position, tile: Tile) -> bool {
        match self.index(pos) {
            Some(i) => {
                self.tiles[i] = tile;
                true
            }
            None => false,
        }
    }

    /// First cell of the given type in row-major order.
    pub fn tile_pos(&self, tile: &Tile) -> Option<Position> {
        let i = self.tiles.iter().position(|t| t == tile)? as i32;
        Some(Position {
            x: i % self.width,
            y: i / self.width,
        })
    }

    // ── Entities ────────────────────────────────────────────────────

    pub fn add_entity(&mut self, id: EntityId) {
        if !self.entities.contains(&id) {
            self.entities.push(id);
        }
    }

    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        let before = self.entities.len();
        self.entities.retain(|&e| e != id);
        self.entities.len() != before
    }

    /// Active entities listed on this level.
    pub fn active_entities<'a>(
        &'a self,
        store: &'a EntityStore,
    ) -> impl Iterator<Item = EntityId> + 'a {
        self.entities
            .iter()
            .copied()
            .filter(move |&id| store.is_active(id))
    }

    /// Uniformly pick a walkable tile no active entity stands on.
    pub fn random_spawn<R: Rng + ?Sized>(
        &self,
        store: &EntityStore,
        rng: &mut R,
    ) -> Result<Position, GameError> {
        let occupied: Vec<Position> = self
            .active_entities(store)
            .filter_map(|id| store.position(id))
            .collect();

        let candidates: Vec<Position> = (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| Position { x, y }))
            .filter(|&pos| self.tile_at(pos).map_or(false, Tile::is_walkable))
            .filter(|pos| !occupied.contains(pos))
            .collect();

        candidates
            .choose(rng)
            .copied()
            .ok_or_else(|| GameError::NoFreeTile(self.id.clone()))
    }

    /// Full level view with inactive entities stripped.
    pub fn snapshot(&self, store: &EntityStore) -> LevelSnapshot {
        LevelSnapshot {
            id: self.id.clone(),
            title: self.title.clone(),
            width: self.width,
            height: self.height,
            tiles: self.tiles.clone(),
            elements: self.elements.clone(),
            entities: self
                .active_entities(store)
                .filter_map(|id| store.get(id))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::Component;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn place(store: &mut EntityStore, level: &mut Level, x: i32, y: i32) -> EntityId {
        let id = store.create_entity();
        store
            .add_component(id, Component::Position(Position { x, y }))
            .unwrap();
        level.add_entity(id);
        id
    }

    #[test]
    fn parses_hand_made_level() {
        let json = r#"{
            "title": "Test Level",
            "level": {"width": 2, "height": 2,
                      "tiles": ["wall", "ground", "tall grass", "stairs down"]},
            "elements": {"spawn": {"x": 1, "y": 0}, "stairs down": {"target": "cave"}},
            "monsters": [{"type": "slime", "max_n": 2}]
        }"#;
        let def: LevelDefinition = serde_json::from_str(json).unwrap();
        let level = Level::from_definition("test", &def).unwrap();
        assert_eq!(level.title, "Test Level");
        assert_eq!(level.tile_at(Position { x: 0, y: 1 }), Some(&Tile::TallGrass));
        assert_eq!(level.elements.spawn, Some(Position { x: 1, y: 0 }));
        assert_eq!(level.elements.stairs_down.as_ref().unwrap().target, "cave");
        assert_eq!(level.monsters[0].max_n, 2);
    }

    #[test]
    fn tile_count_mismatch_is_rejected() {
        let json = r#"{"level": {"width": 3, "height": 3, "tiles": ["wall"]}}"#;
        let def: LevelDefinition = serde_json::from_str(json).unwrap();
        assert!(matches!(
            Level::from_definition("bad", &def),
            Err(GameError::LevelParse { .. })
        ));
    }

    #[test]
    fn generated_level_starts_empty() {
        let json = r#"{"level": {"width": 4, "height": 3, "generator": "cave"}}"#;
        let def: LevelDefinition = serde_json::from_str(json).unwrap();
        let level = Level::from_definition("cave", &def).unwrap();
        assert_eq!(level.tiles.len(), 12);
        assert!(level.tiles.iter().all(|t| *t == Tile::Empty));
    }

    #[test]
    fn oversized_level_is_rejected() {
        let json = r#"{"level": {"width": 70000, "height": 70000, "generator": "cave"}}"#;
        let def: LevelDefinition = serde_json::from_str(json).unwrap();
        assert!(matches!(
            Level::from_definition("huge", &def),
            Err(GameError::LevelParse { .. })
        ));

        let json = r#"{"level": {"width": 2000, "height": 2000, "generator": "cave"}}"#;
        let def: LevelDefinition = serde_json::from_str(json).unwrap();
        assert!(Level::from_definition("big", &def).is_err());
    }

    #[test]
    fn tile_at_is_bounds_checked() {
        let level = Level::filled("l", 3, 2, Tile::Ground);
        assert!(level.tile_at(Position { x: 2, y: 1 }).is_some());
        assert!(level.tile_at(Position { x: 3, y: 0 }).is_none());
        assert!(level.tile_at(Position { x: 0, y: -1 }).is_none());
    }

    #[test]
    fn tile_pos_scans_row_major() {
        let mut level = Level::filled("l", 4, 4, Tile::Ground);
        level.set_tile(Position { x: 0, y: 2 }, Tile::StairsDown);
        level.set_tile(Position { x: 3, y: 1 }, Tile::StairsDown);
        assert_eq!(
            level.tile_pos(&Tile::StairsDown),
            Some(Position { x: 3, y: 1 })
        );
        assert_eq!(level.tile_pos(&Tile::Wall), None);
    }

    #[test]
    fn random_spawn_avoids_occupied_and_blocking_tiles() {
        let mut store = EntityStore::new();
        let mut level = Level::filled("l", 3, 1, Tile::Ground);
        level.set_tile(Position { x: 0, y: 0 }, Tile::Wall);
        place(&mut store, &mut level, 1, 0);

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let pos = level.random_spawn(&store, &mut rng).unwrap();
            assert_eq!(pos, Position { x: 2, y: 0 });
        }
    }

    #[test]
    fn random_spawn_considers_last_row_and_column() {
        let mut level = Level::filled("l", 2, 2, Tile::Wall);
        level.set_tile(Position { x: 1, y: 1 }, Tile::Ground);
        let store = EntityStore::new();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            level.random_spawn(&store, &mut rng).unwrap(),
            Position { x: 1, y: 1 }
        );
    }

    #[test]
    fn random_spawn_fails_on_fully_occupied_level() {
        let mut store = EntityStore::new();
        let mut level = Level::filled("full", 2, 1, Tile::Ground);
        place(&mut store, &mut level, 0, 0);
        place(&mut store, &mut level, 1, 0);
        let mut rng = StdRng::seed_from_u64(3);
        assert!(matches!(
            level.random_spawn(&store, &mut rng),
            Err(GameError::NoFreeTile(_))
        ));
    }

    #[test]
    fn random_spawn_fails_on_fully_blocked_level() {
        let store = EntityStore::new();
        let level = Level::filled("walls", 3, 3, Tile::Wall);
        let mut rng = StdRng::seed_from_u64(3);
        assert!(level.random_spawn(&store, &mut rng).is_err());
    }

    #[test]
    fn inactive_entities_do_not_occupy() {
        let mut store = EntityStore::new();
        let mut level = Level::filled("l", 1, 1, Tile::Ground);
        let ghost = place(&mut store, &mut level, 0, 0);
        store.deactivate(ghost);
        assert_eq!(level.active_entities(&store).count(), 0);
        let mut rng = StdRng::seed_from_u64(3);
        assert!(level.random_spawn(&store, &mut rng).is_ok());
        assert!(level.snapshot(&store).entities.is_empty());
    }
}
