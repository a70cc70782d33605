use std::path::PathBuf;

use crate::protocol::{EntityId, LevelId, SessionId};

/// Errors produced while loading static data or resolving lookups inside
/// the world. Game-logic failures are turned into chat messages by the
/// session layer; only startup paths let these escape to `main`.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The level registry could not be read or parsed. Fatal at startup.
    #[error("failed to load level registry {path}: {details}")]
    Registry { path: PathBuf, details: String },

    /// A template catalog namespace file could not be read or parsed.
    #[error("failed to load template namespace '{namespace}' from {path}: {details}")]
    Templates {
        namespace: String,
        path: PathBuf,
        details: String,
    },

    /// A level file could not be opened.
    #[error("failed to open level file {path}: {source}")]
    LevelFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A level file was opened but its contents are malformed.
    #[error("failed to parse level '{level}': {details}")]
    LevelParse { level: LevelId, details: String },

    #[error("level '{0}' is not defined in the registry")]
    UnknownLevel(LevelId),

    #[error("level '{0}' is not loaded")]
    LevelNotLoaded(LevelId),

    #[error("session {0} is not known")]
    UnknownSession(SessionId),

    #[error("entity {0} does not exist")]
    UnknownEntity(EntityId),

    #[error("entity {entity} has no '{component}' component")]
    MissingComponent {
        entity: EntityId,
        component: &'static str,
    },

    /// The level has no `spawn` element to place a player on.
    #[error("level '{0}' has no spawn point")]
    NoSpawnPoint(LevelId),

    /// Every walkable tile of the level is occupied (or none is walkable).
    #[error("level '{0}' has no free walkable tile")]
    NoFreeTile(LevelId),

    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    #[error("invalid configuration value for {key}: {details}")]
    Config { key: &'static str, details: String },
}
