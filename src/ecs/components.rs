use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol::SessionId;

// ── Replicated Components ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprite {
    pub sprite: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Position {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn distance(self, other: Position) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Player-controller capability: the session that drives this entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sid(pub SessionId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub health: i32,
    pub strength: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Movement {
    Random,
    Stationary,
}

/// Aggro radius in tiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Range(pub f64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Combat {
    pub in_combat: bool,
    /// Only monsters record who they are fighting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opponent: Option<SessionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Name(pub String);

// ── Bookkeeping Components ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifecycle {
    /// `false` is a soft delete: the entity is logically gone but kept
    /// around until observers have been told.
    pub active: bool,
    /// Dirty flag: state not yet delivered to the level's subscribers.
    pub updated: bool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            active: true,
            updated: true,
        }
    }
}

/// Dotted archetype reference, e.g. `monsters.slime`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateRef {
    pub namespace: String,
    pub key: String,
}

impl TemplateRef {
    pub const MONSTERS: &'static str = "monsters";

    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
        }
    }

    pub fn monster(key: impl Into<String>) -> Self {
        Self::new(Self::MONSTERS, key)
    }

    /// Split on the first `.`. References without a namespace separator
    /// are rejected.
    pub fn parse(reference: &str) -> Option<Self> {
        let (namespace, key) = reference.split_once('.')?;
        if namespace.is_empty() || key.is_empty() {
            return None;
        }
        Some(Self::new(namespace, key))
    }

    pub fn is_monster(&self) -> bool {
        self.namespace == Self::MONSTERS
    }
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.key)
    }
}

/// Marks an entity that has not been through template hydration yet.
#[derive(Debug, Clone, Copy)]
pub struct Fresh;

// ── Closed component enumeration ─────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    Sprite(Sprite),
    Position(Position),
    Sid(Sid),
    Stats(Stats),
    Movement(Movement),
    Range(Range),
    Combat(Combat),
    Name(Name),
}

impl Component {
    pub fn kind(&self) -> &'static str {
        match self {
            Component::Sprite(_) => "sprite",
            Component::Position(_) => "position",
            Component::Sid(_) => "sid",
            Component::Stats(_) => "stats",
            Component::Movement(_) => "movement",
            Component::Range(_) => "range",
            Component::Combat(_) => "combat",
            Component::Name(_) => "name",
        }
    }

    /// Whether the entity already carries a component of this kind.
    pub fn present_on(&self, entity: hecs::EntityRef<'_>) -> bool {
        match self {
            Component::Sprite(_) => entity.has::<Sprite>(),
            Component::Position(_) => entity.has::<Position>(),
            Component::Sid(_) => entity.has::<Sid>(),
            Component::Stats(_) => entity.has::<Stats>(),
            Component::Movement(_) => entity.has::<Movement>(),
            Component::Range(_) => entity.has::<Range>(),
            Component::Combat(_) => entity.has::<Combat>(),
            Component::Name(_) => entity.has::<Name>(),
        }
    }

    /// Insert-or-overwrite on the given hecs entity.
    pub fn insert_into(
        self,
        world: &mut hecs::World,
        handle: hecs::Entity,
    ) -> Result<(), hecs::NoSuchEntity> {
        match self {
            Component::Sprite(c) => world.insert_one(handle, c),
            Component::Position(c) => world.insert_one(handle, c),
            Component::Sid(c) => world.insert_one(handle, c),
            Component::Stats(c) => world.insert_one(handle, c),
            Component::Movement(c) => world.insert_one(handle, c),
            Component::Range(c) => world.insert_one(handle, c),
            Component::Combat(c) => world.insert_one(handle, c),
            Component::Name(c) => world.insert_one(handle, c),
        }
    }
}

/// Serializable bag of replicated components. Used for template files,
/// level file entities and outbound snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprite: Option<Sprite>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<Sid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<Stats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movement: Option<Movement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combat: Option<Combat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Name>,
}

impl ComponentSet {
    pub fn into_components(self) -> Vec<Component> {
        let mut out = Vec::new();
        if let Some(c) = self.sprite {
            out.push(Component::Sprite(c));
        }
        if let Some(c) = self.position {
            out.push(Component::Position(c));
        }
        if let Some(c) = self.sid {
            out.push(Component::Sid(c));
        }
        if let Some(c) = self.stats {
            out.push(Component::Stats(c));
        }
        if let Some(c) = self.movement {
            out.push(Component::Movement(c));
        }
        if let Some(c) = self.range {
            out.push(Component::Range(c));
        }
        if let Some(c) = self.combat {
            out.push(Component::Combat(c));
        }
        if let Some(c) = self.name {
            out.push(Component::Name(c));
        }
        out
    }

    /// Copy every replicated component off a live entity.
    pub fn capture(entity: hecs::EntityRef<'_>) -> Self {
        Self {
            sprite: entity.get::<&Sprite>().map(|c| (*c).clone()),
            position: entity.get::<&Position>().map(|c| *c),
            sid: entity.get::<&Sid>().map(|c| *c),
            stats: entity.get::<&Stats>().map(|c| *c),
            movement: entity.get::<&Movement>().map(|c| *c),
            range: entity.get::<&Range>().map(|c| *c),
            combat: entity.get::<&Combat>().map(|c| *c),
            name: entity.get::<&Name>().map(|c| (*c).clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_ref_splits_on_first_dot() {
        let t = TemplateRef::parse("monsters.slime").unwrap();
        assert_eq!(t.namespace, "monsters");
        assert_eq!(t.key, "slime");
        assert!(t.is_monster());
        assert_eq!(t.to_string(), "monsters.slime");
    }

    #[test]
    fn template_ref_rejects_missing_separator() {
        assert!(TemplateRef::parse("slime").is_none());
        assert!(TemplateRef::parse(".slime").is_none());
        assert!(TemplateRef::parse("monsters.").is_none());
    }

    #[test]
    fn position_distance_is_euclidean() {
        let a = Position { x: 0, y: 0 };
        let b = Position { x: 3, y: 4 };
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn component_set_parses_template_json() {
        let json = r#"{
            "sprite": {"sprite": "slime"},
            "stats": {"health": 4, "strength": 1},
            "movement": "random",
            "range": 2,
            "name": "Slime",
            "unknown": 7
        }"#;
        let set: ComponentSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.movement, Some(Movement::Random));
        assert_eq!(set.range, Some(Range(2.0)));
        assert_eq!(set.name, Some(Name("Slime".to_string())));
        assert!(set.position.is_none());
        assert_eq!(set.into_components().len(), 5);
    }

    #[test]
    fn capture_reads_back_inserted_components() {
        let mut world = hecs::World::new();
        let e = world.spawn((Position { x: 1, y: 2 }, Sid(9)));
        let set = ComponentSet::capture(world.entity(e).unwrap());
        assert_eq!(set.position, Some(Position { x: 1, y: 2 }));
        assert_eq!(set.sid, Some(Sid(9)));
        assert!(set.stats.is_none());
    }
}
