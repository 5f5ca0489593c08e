use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DB_FILENAME: &str = "todos.db";
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Cannot locate a home directory; set STANDUP_HOME or HOME")]
    NoHome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandupConfig {
    /// Database file; relative paths resolve against the standup home.
    pub db_path: Option<String>,
    /// Default tracing filter, e.g. "standup=debug".
    pub log_filter: Option<String>,
    /// Show every task in `ls`, not just pending and completed today.
    pub list_all: Option<bool>,
}

pub fn resolve_user_home_dir() -> Option<PathBuf> {
    for var in ["HOME", "USERPROFILE"] {
        if let Ok(value) = std::env::var(var) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
    }
    None
}

pub fn resolve_standup_home_dir() -> Option<PathBuf> {
    if let Ok(value) = std::env::var("STANDUP_HOME") {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    resolve_user_home_dir().map(|home| home.join(".standup"))
}

pub fn standup_home() -> Result<PathBuf, ConfigError> {
    resolve_standup_home_dir().ok_or(ConfigError::NoHome)
}

pub fn config_path(home: &Path) -> PathBuf {
    home.join(CONFIG_FILENAME)
}

/// Typed read of a config file; a missing file is the default config.
pub fn read_config(path: &Path) -> Result<StandupConfig, ConfigError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(toml::from_str(&text)?),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(StandupConfig::default()),
        Err(err) => Err(err.into()),
    }
}

/// Lenient variant used at startup: unreadable or invalid config is ignored.
pub fn load_config(home: &Path) -> Option<StandupConfig> {
    let path = config_path(home);
    if !path.is_file() {
        return None;
    }
    read_config(&path).ok()
}

pub fn write_config(home: &Path, config: &StandupConfig) -> Result<PathBuf, ConfigError> {
    fs::create_dir_all(home)?;
    let path = config_path(home);
    let body = toml::to_string_pretty(config)?;
    fs::write(&path, body)?;
    Ok(path)
}

/// Database location: explicit override, then `db_path` from config, then
/// `<home>/todos.db`.
pub fn resolve_db_path(
    home: &Path,
    config: Option<&StandupConfig>,
    explicit: Option<&Path>,
) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let configured = config
        .and_then(|config| config.db_path.as_deref())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    match configured {
        Some(value) => home.join(value),
        None => home.join(DB_FILENAME),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use tempfile::TempDir;

    fn with_env_lock<T>(f: impl FnOnce() -> T) -> T {
        let _guard = crate::test_env::lock();
        f()
    }

    struct EnvGuard {
        standup_home: Option<OsString>,
        home: Option<OsString>,
    }

    impl EnvGuard {
        fn capture() -> Self {
            Self {
                standup_home: std::env::var_os("STANDUP_HOME"),
                home: std::env::var_os("HOME"),
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match self.standup_home.as_ref() {
                Some(value) => std::env::set_var("STANDUP_HOME", value),
                None => std::env::remove_var("STANDUP_HOME"),
            }
            match self.home.as_ref() {
                Some(value) => std::env::set_var("HOME", value),
                None => std::env::remove_var("HOME"),
            }
        }
    }

    #[test]
    fn write_and_read_config() {
        let temp = TempDir::new().expect("tempdir");
        let config = StandupConfig {
            db_path: Some("work.db".to_string()),
            log_filter: Some("standup=debug".to_string()),
            list_all: Some(true),
        };
        let path = write_config(temp.path(), &config).expect("write config");
        assert_eq!(read_config(&path).expect("read"), config);
        assert_eq!(load_config(temp.path()), Some(config));
    }

    #[test]
    fn missing_config_reads_as_default() {
        let temp = TempDir::new().expect("tempdir");
        let config = read_config(&config_path(temp.path())).expect("read");
        assert_eq!(config, StandupConfig::default());
        assert_eq!(load_config(temp.path()), None);
    }

    #[test]
    fn invalid_config_is_typed_error_but_ignored_by_loader() {
        let temp = TempDir::new().expect("tempdir");
        std::fs::write(config_path(temp.path()), "db_path = [").expect("write");
        assert!(matches!(
            read_config(&config_path(temp.path())),
            Err(ConfigError::Parse(_))
        ));
        assert_eq!(load_config(temp.path()), None);
    }

    #[test]
    fn db_path_prefers_flag_then_config_then_default() {
        let home = Path::new("/tmp/standup-home");
        assert_eq!(resolve_db_path(home, None, None), home.join("todos.db"));

        let config = StandupConfig {
            db_path: Some("other.db".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_db_path(home, Some(&config), None), home.join("other.db"));

        let absolute = StandupConfig {
            db_path: Some("/var/lib/todos.db".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolve_db_path(home, Some(&absolute), None),
            PathBuf::from("/var/lib/todos.db")
        );

        let flag = Path::new("/elsewhere/flag.db");
        assert_eq!(resolve_db_path(home, Some(&config), Some(flag)), flag);
    }

    #[test]
    fn standup_home_prefers_env_override_then_user_home() {
        with_env_lock(|| {
            let _env = EnvGuard::capture();
            let home = TempDir::new().expect("home");

            std::env::set_var("STANDUP_HOME", "  ");
            std::env::set_var("HOME", home.path());
            assert_eq!(resolve_standup_home_dir(), Some(home.path().join(".standup")));

            std::env::set_var("STANDUP_HOME", home.path().join("custom"));
            assert_eq!(resolve_standup_home_dir(), Some(home.path().join("custom")));
        });
    }
}
