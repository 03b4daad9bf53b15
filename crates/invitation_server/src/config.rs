//! Runtime settings loaded from the environment.
//!
//! Every variable is optional. Missing values fall back to a logged
//! default; present but unparsable values are rejected.

use chrono::FixedOffset;
use invitation_core::{default_log_level, offset_from_minutes, DEFAULT_EVENT_CAPACITY};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const PORT_VAR: &str = "INVITATION_PORT";
pub const DB_PATH_VAR: &str = "INVITATION_DB_PATH";
pub const LOG_LEVEL_VAR: &str = "INVITATION_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "INVITATION_LOG_DIR";
pub const DAY_OFFSET_VAR: &str = "INVITATION_DAY_OFFSET_MINUTES";
pub const EVENT_CAPACITY_VAR: &str = "INVITATION_EVENT_CAPACITY";
pub const STATIC_DIR_VAR: &str = "INVITATION_STATIC_DIR";
pub const INSERT_POLL_VAR: &str = "INVITATION_INSERT_POLL_MS";

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_FILE_NAME: &str = "invitation.sqlite3";
const DEFAULT_INSERT_POLL_MS: u64 = 1000;

#[derive(Debug)]
pub enum ConfigError {
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    CurrentDir(std::io::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid { key, value, reason } => {
                write!(f, "invalid {key} value `{value}`: {reason}")
            }
            Self::CurrentDir(err) => write!(f, "cannot resolve current directory: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid { .. } => None,
            Self::CurrentDir(err) => Some(err),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub db_path: PathBuf,
    pub log_level: String,
    /// Always absolute.
    pub log_dir: PathBuf,
    /// Zone in which guestbook messages are grouped into days.
    pub day_offset: FixedOffset,
    pub event_capacity: usize,
    /// Prebuilt invitation page served at `/`, if any.
    pub static_dir: Option<PathBuf>,
    /// How often to look for greetings written by other processes.
    /// `None` turns the watcher off.
    pub insert_poll: Option<Duration>,
}

impl Settings {
    /// Reads settings from process environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let current_dir = std::env::current_dir().map_err(ConfigError::CurrentDir)?;
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let port = parse_or(PORT_VAR, var(PORT_VAR), DEFAULT_PORT)?;

        let db_path = var(DB_PATH_VAR).map(PathBuf::from).unwrap_or_else(|| {
            let fallback = std::env::temp_dir().join(DEFAULT_DB_FILE_NAME);
            info!("{DB_PATH_VAR} not set, using default: {}", fallback.display());
            fallback
        });

        let log_level = var(LOG_LEVEL_VAR).unwrap_or_else(|| default_log_level().to_string());

        let log_dir = var(LOG_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("logs"));
        let log_dir = absolutize(&current_dir, &log_dir);

        let offset_minutes: i32 = parse_or(DAY_OFFSET_VAR, var(DAY_OFFSET_VAR), 0)?;
        let day_offset = offset_from_minutes(offset_minutes).ok_or_else(|| ConfigError::Invalid {
            key: DAY_OFFSET_VAR,
            value: offset_minutes.to_string(),
            reason: "must be within -1439..=1439".to_string(),
        })?;

        let event_capacity: usize = parse_or(
            EVENT_CAPACITY_VAR,
            var(EVENT_CAPACITY_VAR),
            DEFAULT_EVENT_CAPACITY,
        )?;
        if event_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: EVENT_CAPACITY_VAR,
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let static_dir = var(STATIC_DIR_VAR).map(|dir| absolutize(&current_dir, Path::new(&dir)));

        let insert_poll_ms: u64 =
            parse_or(INSERT_POLL_VAR, var(INSERT_POLL_VAR), DEFAULT_INSERT_POLL_MS)?;
        let insert_poll = (insert_poll_ms > 0).then(|| Duration::from_millis(insert_poll_ms));

        Ok(Self {
            port,
            db_path,
            log_level,
            log_dir,
            day_offset,
            event_capacity,
            static_dir,
            insert_poll,
        })
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match raw {
        Some(value) => value.parse().map_err(|err: T::Err| ConfigError::Invalid {
            key,
            reason: err.to_string(),
            value,
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ConfigError, Settings, DAY_OFFSET_VAR, EVENT_CAPACITY_VAR, INSERT_POLL_VAR, PORT_VAR,
    };
    use std::collections::HashMap;
    use std::time::Duration;

    fn settings_from(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings = settings_from(&[]).unwrap();
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.event_capacity, 64);
        assert_eq!(settings.day_offset.local_minus_utc(), 0);
        assert!(settings.log_dir.is_absolute());
        assert!(settings.static_dir.is_none());
        assert_eq!(settings.insert_poll, Some(Duration::from_secs(1)));
    }

    #[test]
    fn zero_insert_poll_disables_watcher() {
        let settings = settings_from(&[(INSERT_POLL_VAR, "0")]).unwrap();
        assert!(settings.insert_poll.is_none());

        let settings = settings_from(&[(INSERT_POLL_VAR, "250")]).unwrap();
        assert_eq!(settings.insert_poll, Some(Duration::from_millis(250)));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let settings = settings_from(&[
            (PORT_VAR, "8080"),
            (DAY_OFFSET_VAR, "420"),
            ("INVITATION_DB_PATH", "/srv/invitation/db.sqlite3"),
            ("INVITATION_STATIC_DIR", "site"),
        ])
        .unwrap();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.day_offset.local_minus_utc(), 420 * 60);
        assert_eq!(
            settings.db_path.to_str(),
            Some("/srv/invitation/db.sqlite3")
        );
        assert!(settings.static_dir.unwrap().is_absolute());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let settings = settings_from(&[(PORT_VAR, "   ")]).unwrap();
        assert_eq!(settings.port, 3000);
    }

    #[test]
    fn unparsable_or_out_of_range_values_are_rejected() {
        let err = settings_from(&[(PORT_VAR, "http")]).unwrap_err();
        assert!(err.to_string().contains(PORT_VAR));

        let err = settings_from(&[(DAY_OFFSET_VAR, "1440")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == DAY_OFFSET_VAR));

        let err = settings_from(&[(EVENT_CAPACITY_VAR, "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == EVENT_CAPACITY_VAR));
    }
}
