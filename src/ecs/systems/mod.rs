pub mod aggro;
pub mod combat;
pub mod monster_ai;
pub mod spawn;
