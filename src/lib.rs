pub mod config;
pub mod ecs;
pub mod error;
pub mod game;
pub mod network;
pub mod protocol;
pub mod session;
