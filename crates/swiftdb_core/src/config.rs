//! Application configuration.
//!
//! # Responsibility
//! - Resolve database location, admin secret, session secret and logging
//!   settings from an optional TOML file overlaid by environment variables.
//!
//! # Invariants
//! - Environment values win over file values.
//! - Secrets are never printed by `Debug`.

use crate::logging::LogLevel;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "SWIFTDB_CONFIG";
pub const ENV_DATABASE: &str = "SWIFTDB_DATABASE";
pub const ENV_ADMIN_PASSWORD: &str = "SWIFTDB_ADMIN_PWD";
pub const ENV_SECRET_KEY: &str = "SWIFTDB_SECRET_KEY";
pub const ENV_LOG_LEVEL: &str = "SWIFTDB_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "SWIFTDB_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting was found in neither the file nor the environment.
    Missing(&'static str),
    Invalid { key: &'static str, message: String },
    Read { path: PathBuf, message: String },
    Parse { path: PathBuf, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "missing required setting `{key}`"),
            Self::Invalid { key, message } => write!(f, "invalid setting `{key}`: {message}"),
            Self::Read { path, message } => {
                write!(f, "failed to read config at {}: {message}", path.display())
            }
            Self::Parse { path, message } => {
                write!(f, "failed to parse config at {}: {message}", path.display())
            }
        }
    }
}

impl Error for ConfigError {}

/// On-disk settings; every key is optional so the environment can fill gaps.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub database_path: Option<PathBuf>,
    pub admin_password: Option<String>,
    pub session_secret: Option<String>,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
}

impl FileConfig {
    pub fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::parse(&contents, path)
    }
}

/// Resolved settings for one process.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub admin_password: String,
    /// Cookie-signing key handed to the web layer.
    pub session_secret: String,
    pub log_level: LogLevel,
    /// Absolute directory for rolling log files.
    pub log_dir: PathBuf,
}

impl Debug for AppConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_path", &self.database_path)
            .field("admin_password", &"<redacted>")
            .field("session_secret", &"<redacted>")
            .field("log_level", &self.log_level)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

impl AppConfig {
    /// Loads settings from the process environment.
    ///
    /// When `SWIFTDB_CONFIG` names a file, its values are used as the base layer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let lookup = |key: &str| std::env::var(key).ok();
        let file = match lookup(ENV_CONFIG_PATH) {
            Some(path) => FileConfig::load(Path::new(&path))?,
            None => FileConfig::default(),
        };
        Self::resolve(file, lookup)
    }

    /// Merges `file` with values returned by `lookup` for each environment key.
    pub fn resolve(
        file: FileConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let env = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_path = env(ENV_DATABASE)
            .map(PathBuf::from)
            .or(file.database_path)
            .ok_or(ConfigError::Missing(ENV_DATABASE))?;
        let admin_password = env(ENV_ADMIN_PASSWORD)
            .or(file.admin_password)
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::Missing(ENV_ADMIN_PASSWORD))?;
        let session_secret = env(ENV_SECRET_KEY)
            .or(file.session_secret)
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::Missing(ENV_SECRET_KEY))?;

        let log_level = match env(ENV_LOG_LEVEL).or(file.log_level) {
            Some(value) => LogLevel::parse(&value).map_err(|err| ConfigError::Invalid {
                key: ENV_LOG_LEVEL,
                message: err.to_string(),
            })?,
            None => LogLevel::build_default(),
        };
        let log_dir = env(ENV_LOG_DIR)
            .map(PathBuf::from)
            .or(file.log_dir)
            .unwrap_or_else(default_log_dir);
        if !log_dir.is_absolute() {
            return Err(ConfigError::Invalid {
                key: ENV_LOG_DIR,
                message: format!("`{}` is not an absolute path", log_dir.display()),
            });
        }

        Ok(Self {
            database_path,
            admin_password,
            session_secret,
            log_level,
            log_dir,
        })
    }
}

fn default_log_dir() -> PathBuf {
    std::env::temp_dir().join("swiftdb").join("logs")
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, FileConfig, ENV_ADMIN_PASSWORD, ENV_DATABASE};
    use crate::logging::LogLevel;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| values.get(key).cloned()
    }

    #[test]
    fn environment_overrides_file_values() {
        let file = FileConfig::parse(
            r#"
database_path = "/srv/swift/file.db"
admin_password = "from-file"
session_secret = "file-secret"
log_level = "warn"
"#,
            Path::new("swiftdb.toml"),
        )
        .unwrap();
        let config = AppConfig::resolve(
            file,
            env(&[
                ("SWIFTDB_DATABASE", "/srv/swift/env.db"),
                ("SWIFTDB_LOG_DIR", "/var/log/swiftdb"),
            ]),
        )
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/srv/swift/env.db"));
        assert_eq!(config.admin_password, "from-file");
        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.log_dir, PathBuf::from("/var/log/swiftdb"));
    }

    #[test]
    fn missing_required_values_are_reported() {
        let err = AppConfig::resolve(FileConfig::default(), env(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing(ENV_DATABASE));

        let err = AppConfig::resolve(
            FileConfig::default(),
            env(&[("SWIFTDB_DATABASE", "swift.db")]),
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing(ENV_ADMIN_PASSWORD));

        let err = AppConfig::resolve(
            FileConfig::default(),
            env(&[
                ("SWIFTDB_DATABASE", "swift.db"),
                ("SWIFTDB_ADMIN_PWD", "adminpass"),
                ("SWIFTDB_SECRET_KEY", "   "),
            ]),
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("SWIFTDB_SECRET_KEY"));
    }

    #[test]
    fn relative_log_dir_and_bad_level_are_invalid() {
        let base = [
            ("SWIFTDB_DATABASE", "swift.db"),
            ("SWIFTDB_ADMIN_PWD", "adminpass"),
            ("SWIFTDB_SECRET_KEY", "secret"),
        ];

        let mut pairs = base.to_vec();
        pairs.push(("SWIFTDB_LOG_DIR", "logs"));
        let err = AppConfig::resolve(FileConfig::default(), env(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SWIFTDB_LOG_DIR", .. }));

        let mut pairs = base.to_vec();
        pairs.push(("SWIFTDB_LOG_LEVEL", "loud"));
        let err = AppConfig::resolve(FileConfig::default(), env(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SWIFTDB_LOG_LEVEL", .. }));
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let err = FileConfig::parse("databse_path = \"x.db\"", Path::new("swiftdb.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = AppConfig::resolve(
            FileConfig::default(),
            env(&[
                ("SWIFTDB_DATABASE", "swift.db"),
                ("SWIFTDB_ADMIN_PWD", "adminpass"),
                ("SWIFTDB_SECRET_KEY", "cookie-secret"),
            ]),
        )
        .unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("adminpass"));
        assert!(!rendered.contains("cookie-secret"));
    }
}
