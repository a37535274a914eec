//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `scripthub.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use scripthub_adapter_scripts_fs::{DEFAULT_INTERPRETER, FsScriptCatalog};
use scripthub_adapter_virtual::VirtualConfig;
use scripthub_app::scheduler::SchedulerConfig;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Script directory and interpreter.
    pub scripts: ScriptsConfig,
    /// Device controller settings.
    pub controller: ControllerConfig,
    /// Scheduler loop settings.
    pub scheduler: SchedulerSection,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    /// Directory holding the scripts.
    pub dir: PathBuf,
    /// Command line prepended to the script path. Empty runs the script
    /// file directly.
    pub interpreter: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Enable the virtual controller and its simulated devices.
    pub virtual_enabled: bool,
    pub ready_delay_secs: u64,
    pub update_interval_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    pub tick_interval_secs: u64,
}

impl Config {
    /// Load configuration from `scripthub.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("scripthub.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("SCRIPTHUB_HOST") {
            self.server.host = val;
        }
        if let Some(port) = var("SCRIPTHUB_PORT").and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
        if let Some(val) = var("SCRIPTHUB_BIND")
            && let Some((host, port)) = val.rsplit_once(':')
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = var("SCRIPTHUB_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = var("SCRIPTHUB_SCRIPT_DIR") {
            self.scripts.dir = PathBuf::from(val);
        }
        if let Some(val) = var("SCRIPTHUB_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.scripts.interpreter.iter().any(|arg| arg.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "interpreter arguments must not be blank".to_string(),
            ));
        }
        if self.scheduler.tick_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "tick interval must be non-zero".to_string(),
            ));
        }
        if self.controller.update_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "controller update interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    #[must_use]
    pub fn script_catalog(&self) -> FsScriptCatalog {
        FsScriptCatalog::new(self.scripts.dir.clone())
            .with_interpreter(self.scripts.interpreter.clone())
    }

    #[must_use]
    pub fn virtual_config(&self) -> VirtualConfig {
        VirtualConfig {
            enabled: self.controller.virtual_enabled,
            ready_delay: Duration::from_secs(self.controller.ready_delay_secs),
            update_interval: Duration::from_secs(self.controller.update_interval_secs),
        }
    }

    #[must_use]
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            tick_interval: Duration::from_secs(self.scheduler.tick_interval_secs),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:scripthub.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "scripthubd=info,scripthub=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("scripts"),
            interpreter: DEFAULT_INTERPRETER.map(String::from).to_vec(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            virtual_enabled: true,
            ready_delay_secs: 2,
            update_interval_secs: 30,
        }
    }
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn overridden(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).cloned());
        config
    }

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.url, "sqlite:scripthub.db?mode=rwc");
        assert_eq!(config.scripts.dir, PathBuf::from("scripts"));
        assert_eq!(config.scripts.interpreter, vec!["/usr/bin/env", "python3", "-u"]);
        assert!(config.controller.virtual_enabled);
        assert_eq!(config.scheduler.tick_interval_secs, 60);
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [server]
            host = '127.0.0.1'
            port = 9090

            [database]
            url = 'sqlite:test.db'

            [logging]
            filter = 'debug'

            [scripts]
            dir = '/srv/scripts'
            interpreter = ['/usr/bin/python3']

            [controller]
            virtual_enabled = false
            ready_delay_secs = 0
            update_interval_secs = 5

            [scheduler]
            tick_interval_secs = 30
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.database.url, "sqlite:test.db");
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.scripts.dir, PathBuf::from("/srv/scripts"));
        assert_eq!(config.scripts.interpreter, vec!["/usr/bin/python3"]);
        assert!(!config.controller.virtual_enabled);
        assert_eq!(config.controller.update_interval_secs, 5);
        assert_eq!(config.scheduler.tick_interval_secs, 30);
    }

    #[test]
    fn should_parse_partial_toml_with_defaults() {
        let toml = "
            [server]
            port = 8080
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.controller.ready_delay_secs, 2);
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }

    #[test]
    fn should_let_environment_override_file_values() {
        let config = overridden(&[
            ("SCRIPTHUB_BIND", "127.0.0.1:8123"),
            ("SCRIPTHUB_DATABASE_URL", "sqlite::memory:"),
            ("SCRIPTHUB_SCRIPT_DIR", "/opt/scripts"),
            ("SCRIPTHUB_LOG", "warn"),
        ]);
        assert_eq!(config.bind_addr(), "127.0.0.1:8123");
        assert_eq!(config.database_url(), "sqlite::memory:");
        assert_eq!(config.scripts.dir, PathBuf::from("/opt/scripts"));
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn should_prefer_rust_log_over_scripthub_log() {
        let config = overridden(&[("SCRIPTHUB_LOG", "warn"), ("RUST_LOG", "trace")]);
        assert_eq!(config.logging.filter, "trace");
    }

    #[test]
    fn should_ignore_unparsable_port_override() {
        let config = overridden(&[("SCRIPTHUB_PORT", "http")]);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn should_reject_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_blank_interpreter_argument() {
        let mut config = Config::default();
        config.scripts.interpreter = vec![" ".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_accept_empty_interpreter() {
        let mut config = Config::default();
        config.scripts.interpreter = Vec::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_reject_zero_intervals() {
        let mut config = Config::default();
        config.scheduler.tick_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.controller.update_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_convert_sections_into_runtime_configs() {
        let config = Config::default();
        assert_eq!(config.scheduler_config().tick_interval, Duration::from_secs(60));
        let controller = config.virtual_config();
        assert!(controller.enabled);
        assert_eq!(controller.ready_delay, Duration::from_secs(2));
        assert_eq!(
            config.script_catalog().dir(),
            std::env::current_dir().unwrap().join("scripts")
        );
    }
}
