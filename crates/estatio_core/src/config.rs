//! Core runtime configuration.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::logging::{LogLevel, LoggingOptions};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite file; `None` keeps the store in memory.
    pub db_path: Option<PathBuf>,
    pub log_level: LogLevel,
    /// Directory for rotated log files; `None` disables file logging.
    pub log_dir: Option<PathBuf>,
}

impl CoreConfig {
    /// Opens and migrates the configured store.
    pub fn open_db(&self) -> DbResult<Connection> {
        match self.db_path.as_deref() {
            Some(path) => open_db(path),
            None => open_db_in_memory(),
        }
    }

    /// Logging options, when a log directory is configured.
    pub fn logging_options(&self) -> Option<LoggingOptions> {
        self.log_dir
            .as_ref()
            .map(|log_dir| LoggingOptions::new(self.log_level, log_dir.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::CoreConfig;
    use crate::db::migrations::{current_user_version, latest_version};
    use crate::logging::LogLevel;

    #[test]
    fn default_config_opens_migrated_in_memory_store() {
        let config = CoreConfig::default();
        assert!(config.logging_options().is_none());

        let conn = config.open_db().expect("open in-memory db");
        assert_eq!(
            current_user_version(&conn).expect("read user_version"),
            latest_version()
        );
    }

    #[test]
    fn config_deserializes_with_missing_fields() {
        let config: CoreConfig =
            serde_json::from_str(r#"{"log_level":"warn","log_dir":"/var/log/estatio"}"#)
                .expect("config json");
        assert_eq!(config.db_path, None);
        assert_eq!(config.log_level, LogLevel::Warn);
        let options = config.logging_options().expect("logging options");
        assert_eq!(options.log_dir.to_str(), Some("/var/log/estatio"));
    }
}
