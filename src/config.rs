use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use crate::ecs::components::Stats;
use crate::error::GameError;
use crate::protocol::LevelId;

/// Process configuration, read from the environment (and an optional
/// `.env` file) once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub tick: Duration,
    pub default_level: LevelId,
    pub world_seed: Option<u64>,
    pub player_stats: Stats,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            data_dir: PathBuf::from("data"),
            tick: Duration::from_millis(1000),
            default_level: "test".to_string(),
            world_seed: None,
            player_stats: Stats {
                health: 10,
                strength: 2,
            },
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, GameError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) => debug!("No .env file loaded: {}", e),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Unset keys take their default;
    /// set but malformed keys are an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, GameError> {
        let defaults = Self::default();

        let tick_ms: u64 = parse_or(&lookup, "TICK_MS", 1000)?;
        if tick_ms == 0 {
            return Err(GameError::Config {
                key: "TICK_MS",
                details: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port)?,
            data_dir: lookup("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            tick: Duration::from_millis(tick_ms),
            default_level: lookup("DEFAULT_LEVEL").unwrap_or(defaults.default_level),
            world_seed: match lookup("WORLD_SEED") {
                Some(raw) => Some(parse("WORLD_SEED", &raw)?),
                None => None,
            },
            player_stats: Stats {
                health: parse_or(&lookup, "PLAYER_HEALTH", defaults.player_stats.health)?,
                strength: parse_or(&lookup, "PLAYER_STRENGTH", defaults.player_stats.strength)?,
            },
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, GameError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| GameError::Config {
                key: "HOST",
                details: e.to_string(),
            })
    }
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, GameError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| GameError::Config {
        key,
        details: format!("'{}': {}", raw, e),
    })
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, GameError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => parse(key, &raw),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = ServerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr().unwrap().port(), 3000);
    }

    #[test]
    fn values_override_defaults() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "4000"),
            ("TICK_MS", "250"),
            ("DEFAULT_LEVEL", "cave"),
            ("WORLD_SEED", "42"),
            ("PLAYER_STRENGTH", "5"),
        ]))
        .unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.tick, Duration::from_millis(250));
        assert_eq!(config.default_level, "cave");
        assert_eq!(config.world_seed, Some(42));
        assert_eq!(config.player_stats.strength, 5);
        assert_eq!(config.player_stats.health, 10);
        assert_eq!(config.bind_addr().unwrap().to_string(), "0.0.0.0:4000");
    }

    #[test]
    fn malformed_numbers_are_config_errors() {
        let err = ServerConfig::from_lookup(lookup_from(&[("PORT", "lots")])).unwrap_err();
        assert!(matches!(err, GameError::Config { key: "PORT", .. }));

        let err = ServerConfig::from_lookup(lookup_from(&[("TICK_MS", "0")])).unwrap_err();
        assert!(matches!(err, GameError::Config { key: "TICK_MS", .. }));
    }
}
