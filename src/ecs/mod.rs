pub mod components;
pub mod store;
pub mod systems;
pub mod templates;
pub mod world;
