//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::game::SessionSettings;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log line format
    pub log_format: LogFormat,
    /// Allowed client origins for CORS, comma separated or `*`
    pub client_origin: String,

    /// Player cap per session
    pub session_max_players: usize,
    /// Delay before a collected pickup reappears
    pub pickup_respawn: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let session_max_players: usize = parse_var("SESSION_MAX_PLAYERS", 16)?;
        if session_max_players == 0 {
            return Err(ConfigError::Invalid("SESSION_MAX_PLAYERS"));
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: parse_var("LOG_FORMAT", LogFormat::Text)?,
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),

            session_max_players,
            pickup_respawn: Duration::from_secs(parse_var("PICKUP_RESPAWN_SECS", 30)?),
        })
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            max_players: self.session_max_players,
            respawn_delay: self.pickup_respawn,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            client_origin: "*".to_string(),
            session_max_players: 16,
            pickup_respawn: Duration::from_secs(30),
        }
    }
}

/// How log lines are rendered
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines
    Text,
    /// One JSON object per line, for log shippers
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(()),
        }
    }
}

/// Read an optional variable, falling back to `default` when unset
fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_lobby_rules() {
        let settings = Config::default().session_settings();
        assert_eq!(settings.max_players, 16);
        assert_eq!(settings.respawn_delay, Duration::from_secs(30));
    }

    #[test]
    fn unparsable_values_are_reported() {
        // Unique name so parallel tests don't race on the environment
        let name = "FPS_ARENA_TEST_UNPARSABLE";
        env::set_var(name, "lots");
        assert!(matches!(parse_var::<usize>(name, 1), Err(ConfigError::Invalid(_))));
        env::remove_var(name);
        assert_eq!(parse_var::<usize>(name, 1).unwrap(), 1);
    }

    #[test]
    fn log_format_accepts_text_or_json() {
        assert_eq!(Config::default().log_format, LogFormat::Text);
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Text));

        let name = "FPS_ARENA_TEST_LOG_FORMAT";
        env::set_var(name, "xml");
        assert!(matches!(
            parse_var(name, LogFormat::Text),
            Err(ConfigError::Invalid(_))
        ));
        env::set_var(name, "json");
        assert_eq!(parse_var(name, LogFormat::Text).unwrap(), LogFormat::Json);
        env::remove_var(name);
    }
}
