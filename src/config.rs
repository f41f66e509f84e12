//! Environment-driven configuration.
//!
//! The whole surface is four variables: the Docker socket path, the
//! Telegram credentials, and a master toggle for whether notifications
//! are sent at all. There are no flags and no config files.

const DEFAULT_DOCKER_SOCKET: &str = "/var/run/docker.sock";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value {value:?} for {var} (expected true or false)")]
    InvalidToggle { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub docker_socket_path: String,
    /// Present when notifications are enabled; `None` means the toggle
    /// is off and no Telegram client is constructed at all.
    pub telegram: Option<TelegramConfig>,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let docker_socket_path =
            lookup("DOCKER_SOCKET_PATH").unwrap_or_else(|| DEFAULT_DOCKER_SOCKET.to_string());

        let enabled = match lookup("ENABLE_TELEGRAM") {
            None => true,
            Some(raw) => parse_toggle(&raw).ok_or(ConfigError::InvalidToggle {
                var: "ENABLE_TELEGRAM",
                value: raw,
            })?,
        };

        let telegram = if enabled {
            Some(TelegramConfig {
                bot_token: lookup("TELEGRAM_BOT_TOKEN")
                    .ok_or(ConfigError::MissingVar("TELEGRAM_BOT_TOKEN"))?,
                chat_id: lookup("TELEGRAM_CHAT_ID")
                    .ok_or(ConfigError::MissingVar("TELEGRAM_CHAT_ID"))?,
            })
        } else {
            None
        };

        Ok(Self {
            docker_socket_path,
            telegram,
        })
    }
}

fn parse_toggle(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &'static [(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_defaults_with_credentials_present() {
        let config = Config::from_lookup(lookup_from(&[
            ("TELEGRAM_BOT_TOKEN", "tok"),
            ("TELEGRAM_CHAT_ID", "42"),
        ]))
        .expect("config should parse");

        assert_eq!(config.docker_socket_path, "/var/run/docker.sock");
        let telegram = config.telegram.expect("notifications default to enabled");
        assert_eq!(telegram.bot_token, "tok");
        assert_eq!(telegram.chat_id, "42");
    }

    #[test]
    fn test_explicit_socket_path() {
        let config = Config::from_lookup(lookup_from(&[
            ("DOCKER_SOCKET_PATH", "/tmp/docker.sock"),
            ("ENABLE_TELEGRAM", "false"),
        ]))
        .expect("config should parse");

        assert_eq!(config.docker_socket_path, "/tmp/docker.sock");
    }

    #[test]
    fn test_disabled_toggle_requires_no_credentials() {
        for pairs in [
            &[("ENABLE_TELEGRAM", "false")],
            &[("ENABLE_TELEGRAM", "FALSE")],
            &[("ENABLE_TELEGRAM", "0")],
        ] {
            let config = Config::from_lookup(lookup_from(pairs)).expect("config should parse");
            assert!(config.telegram.is_none());
        }
    }

    #[test]
    fn test_enabled_toggle_without_credentials_fails() {
        let result = Config::from_lookup(lookup_from(&[("ENABLE_TELEGRAM", "TRUE")]));
        assert!(matches!(result, Err(ConfigError::MissingVar(_))));
    }

    #[test]
    fn test_invalid_toggle_value_fails() {
        let result = Config::from_lookup(lookup_from(&[("ENABLE_TELEGRAM", "yes")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidToggle {
                var: "ENABLE_TELEGRAM",
                ..
            })
        ));
    }
}
