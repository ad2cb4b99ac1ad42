use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{NotekeeperError, Result};
use crate::storage::DEFAULT_DB;

const DEFAULT_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_LOG_LEVEL: &str = "info";
// two weeks, same as a typical web framework session cookie
const DEFAULT_SESSION_TTL_HOURS: i64 = 14 * 24;

/// Server configuration. Missing keys in the YAML file fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Address the HTTP server binds to
    pub addr: String,
    /// SQLite database file
    pub database: PathBuf,
    /// Default tracing filter when RUST_LOG is unset
    pub log_level: String,
    /// Lifetime of a login session
    pub session_ttl_hours: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            database: PathBuf::from(DEFAULT_DB),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
        }
    }
}

impl Config {
    /// Load from a YAML file, or return defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_yaml(&fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Apply command-line overrides on top of file values.
    pub fn with_overrides(mut self, addr: Option<String>, database: Option<PathBuf>) -> Result<Self> {
        if let Some(addr) = addr {
            self.addr = addr;
        }
        if let Some(database) = database {
            self.database = database;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.addr
            .parse()
            .map_err(|e| NotekeeperError::Config(format!("invalid addr '{}': {}", self.addr, e)))
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::hours(self.session_ttl_hours)
    }

    fn validate(&self) -> Result<()> {
        self.socket_addr()?;
        if self.session_ttl_hours <= 0 {
            return Err(NotekeeperError::Config(format!(
                "session_ttl_hours must be positive, got {}",
                self.session_ttl_hours
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.addr, "127.0.0.1:8000");
        assert_eq!(config.database, PathBuf::from("notekeeper.db"));
        assert_eq!(config.session_ttl(), Duration::days(14));
        assert!(Config::load(None).is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = Config::from_yaml("addr: 0.0.0.0:9000\n").unwrap();
        assert_eq!(config.addr, "0.0.0.0:9000");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Config::from_yaml("adress: 0.0.0.0:9000\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notekeeper.yaml");
        fs::write(&path, "database: /tmp/x.db\nsession_ttl_hours: 2\n").unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.database, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.session_ttl(), Duration::hours(2));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.yaml");
        fs::write(&path, "session_ttl_hours: 0\n").unwrap();
        assert!(matches!(
            Config::load(Some(path.as_path())),
            Err(NotekeeperError::Config(_))
        ));

        let err = Config::default()
            .with_overrides(Some("not-an-addr".to_string()), None)
            .unwrap_err();
        assert!(err.to_string().contains("not-an-addr"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::default()
            .with_overrides(Some("127.0.0.1:0".to_string()), Some(PathBuf::from("o.db")))
            .unwrap();
        assert_eq!(config.addr, "127.0.0.1:0");
        assert_eq!(config.database, PathBuf::from("o.db"));
    }
}
