pub mod cave;
pub mod level;
pub mod levels;
pub mod movement;
pub mod tile;
