use rand::Rng;
use tracing::debug;

use super::level::Level;
use super::tile::Tile;
use crate::ecs::components::Position;

/// Weighted floor palette: ground is twice as likely as tall grass.
const CAVE_TILES: [Tile; 3] = [Tile::Ground, Tile::Ground, Tile::TallGrass];

/// Carve a cave into `level` with a random walk.
///
/// A third of the grid (rounded down) is painted. The cursor starts in the
/// centre; after each paint it wanders one axis-aligned step at a time,
/// snapping back to the centre whenever it leaves the grid, until it lands
/// on a cell that is still `empty`. One painted cell is then picked as the
/// level's `spawn` element.
///
/// Returns the painted cells in paint order.
pub fn generate_cave<R: Rng + ?Sized>(level: &mut Level, rng: &mut R) -> Vec<Position> {
    let width = level.width;
    let height = level.height;
    let cells = width.max(0) as usize * height.max(0) as usize;
    let fill_count = cells / 3;
    let centre = Position {
        x: width / 2,
        y: height / 2,
    };

    level.tiles = vec![Tile::Empty; cells];

    let mut painted: Vec<Position> = Vec::with_capacity(fill_count);
    let mut cursor = centre;

    for _ in 0..fill_count {
        let tile = CAVE_TILES[rng.gen_range(0..CAVE_TILES.len())].clone();
        level.set_tile(cursor, tile);
        painted.push(cursor);

        // Wander until an unpainted cell turns up.
        loop {
            let horizontal = rng.gen_bool(0.5);
            let step = if rng.gen_bool(0.5) { 1 } else { -1 };
            cursor = if horizontal {
                cursor.offset(step, 0)
            } else {
                cursor.offset(0, step)
            };

            if !level.in_bounds(cursor) {
                cursor = centre;
            }

            if level.tile_at(cursor) == Some(&Tile::Empty) {
                break;
            }
        }
    }

    if !painted.is_empty() {
        let spawn = painted[rng.gen_range(0..painted.len())];
        level.elements.spawn = Some(spawn);
    }

    debug!(
        "Generated cave '{}' ({}x{}, {} tiles painted)",
        level.id,
        width,
        height,
        painted.len()
    );

    painted
}
