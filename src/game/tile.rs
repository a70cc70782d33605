use serde::{Deserialize, Serialize};

/// One cell of a level grid. Names match the level files (`"tall grass"`,
/// `"stairs down"`); anything unrecognised is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Tile {
    Empty,
    Wall,
    Ground,
    TallGrass,
    StairsDown,
    Other(String),
}

/// How a tile reacts to something trying to step on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Passability {
    Walkable,
    /// Blocks with the "bump into the wall" message.
    Wall,
    /// Blocks with the generic message. Unpainted `empty` cells land here.
    Blocked,
}

impl Tile {
    pub fn name(&self) -> &str {
        match self {
            Tile::Empty => "empty",
            Tile::Wall => "wall",
            Tile::Ground => "ground",
            Tile::TallGrass => "tall grass",
            Tile::StairsDown => "stairs down",
            Tile::Other(name) => name,
        }
    }

    pub fn passability(&self) -> Passability {
        match self {
            Tile::Ground | Tile::TallGrass | Tile::StairsDown => Passability::Walkable,
            Tile::Wall => Passability::Wall,
            Tile::Empty | Tile::Other(_) => Passability::Blocked,
        }
    }

    pub fn is_walkable(&self) -> bool {
        self.passability() == Passability::Walkable
    }
}

impl From<String> for Tile {
    fn from(name: String) -> Self {
        match name.as_str() {
            "empty" => Tile::Empty,
            "wall" => Tile::Wall,
            "ground" => Tile::Ground,
            "tall grass" => Tile::TallGrass,
            "stairs down" => Tile::StairsDown,
            _ => Tile::Other(name),
        }
    }
}

impl From<Tile> for String {
    fn from(tile: Tile) -> Self {
        match tile {
            Tile::Other(name) => name,
            other => other.name().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walkable_set() {
        assert!(Tile::Ground.is_walkable());
        assert!(Tile::TallGrass.is_walkable());
        assert!(Tile::StairsDown.is_walkable());
        assert_eq!(Tile::Wall.passability(), Passability::Wall);
        assert_eq!(Tile::Empty.passability(), Passability::Blocked);
        assert_eq!(
            Tile::Other("lava".to_string()).passability(),
            Passability::Blocked
        );
    }

    #[test]
    fn names_round_trip_through_json() {
        let tiles: Vec<Tile> =
            serde_json::from_str(r#"["wall", "tall grass", "stairs down", "lava"]"#).unwrap();
        assert_eq!(
            tiles,
            vec![
                Tile::Wall,
                Tile::TallGrass,
                Tile::StairsDown,
                Tile::Other("lava".to_string())
            ]
        );
        let json = serde_json::to_string(&tiles).unwrap();
        assert_eq!(json, r#"["wall","tall grass","stairs down","lava"]"#);
    }
}
