//! Server configuration.
//!
//! Every field has a working default. [`ServerConfig::from_env`] overlays
//! the `KORERO_*` environment variables on top of those defaults.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use korero_room::RoomConfig;
use korero_session::SessionConfig;
use korero_timer::TickConfig;

pub const ENV_BIND: &str = "KORERO_BIND";
pub const ENV_TURN_SECS: &str = "KORERO_TURN_SECS";
pub const ENV_IDLE_SECS: &str = "KORERO_IDLE_SECS";
pub const ENV_GRACE_SECS: &str = "KORERO_GRACE_SECS";
pub const ENV_LEADERBOARD: &str = "KORERO_LEADERBOARD";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind: String,

    /// Where the leaderboard is persisted. `None` keeps it in memory.
    pub leaderboard_path: Option<PathBuf>,

    /// A connection that sends nothing for this long is closed.
    /// Clients keep the link alive with `PING`.
    pub connection_idle_timeout: Duration,

    pub room: RoomConfig,
    pub session: SessionConfig,
    pub tick: TickConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            leaderboard_path: None,
            connection_idle_timeout: Duration::from_secs(60),
            room: RoomConfig::default(),
            session: SessionConfig::default(),
            tick: TickConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Unset keys keep
    /// their defaults; set but malformed keys are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(bind) = lookup(ENV_BIND) {
            let bind = bind.trim();
            if bind.is_empty() {
                return Err(ConfigError::Invalid {
                    key: ENV_BIND,
                    value: bind.to_string(),
                    expected: "a host:port address",
                });
            }
            config.bind = bind.to_string();
        }
        if let Some(secs) = parse_secs(&lookup, ENV_TURN_SECS)? {
            config.room.turn_time_limit = secs;
        }
        if let Some(secs) = parse_secs(&lookup, ENV_IDLE_SECS)? {
            config.room.idle_timeout = secs;
        }
        if let Some(secs) = parse_secs(&lookup, ENV_GRACE_SECS)? {
            config.session.reconnect_grace = secs;
        }
        if let Some(path) = lookup(ENV_LEADERBOARD) {
            if !path.trim().is_empty() {
                config.leaderboard_path = Some(PathBuf::from(path.trim()));
            }
        }

        Ok(config)
    }
}

fn parse_secs<F>(lookup: &F, key: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match u64::from_str(raw.trim()) {
        Ok(secs) if secs > 0 => Ok(Some(Duration::from_secs(secs))),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw,
            expected: "a positive number of seconds",
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_empty_keeps_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(config.room.turn_time_limit, Duration::from_secs(30));
        assert_eq!(config.session.reconnect_grace, Duration::from_secs(60));
        assert!(config.leaderboard_path.is_none());
    }

    #[test]
    fn test_from_lookup_overrides_apply() {
        let config = ServerConfig::from_lookup(lookup(&[
            (ENV_BIND, "0.0.0.0:9000"),
            (ENV_TURN_SECS, "45"),
            (ENV_IDLE_SECS, "600"),
            (ENV_GRACE_SECS, "90"),
            (ENV_LEADERBOARD, "/var/lib/korero/scores.json"),
        ]))
        .unwrap();

        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.room.turn_time_limit, Duration::from_secs(45));
        assert_eq!(config.room.idle_timeout, Duration::from_secs(600));
        assert_eq!(config.session.reconnect_grace, Duration::from_secs(90));
        assert_eq!(
            config.leaderboard_path,
            Some(PathBuf::from("/var/lib/korero/scores.json"))
        );
    }

    #[test]
    fn test_from_lookup_malformed_secs_is_error() {
        let err = ServerConfig::from_lookup(lookup(&[(ENV_TURN_SECS, "soon")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: ENV_TURN_SECS,
                value: "soon".to_string(),
                expected: "a positive number of seconds",
            }
        );
    }

    #[test]
    fn test_from_lookup_zero_grace_is_error() {
        let err = ServerConfig::from_lookup(lookup(&[(ENV_GRACE_SECS, "0")])).unwrap_err();
        assert!(err.to_string().contains(ENV_GRACE_SECS));
    }

    #[test]
    fn test_from_lookup_blank_bind_is_error() {
        assert!(ServerConfig::from_lookup(lookup(&[(ENV_BIND, "  ")])).is_err());
    }
}
