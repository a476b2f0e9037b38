//! Configuration management.
//!
//! A TOML file with a `[graph]` table (the flat backend map consumed by
//! [`GraphBackendFactory::from_config`](crate::GraphBackendFactory::from_config))
//! and a `[logging]` table, plus `INTELGRAPH_*` environment overrides.
//!
//! ```toml
//! [graph]
//! type = "postgres_cte"
//! url = "postgresql://localhost/intel"
//! schema = "intelligence"
//!
//! [logging]
//! format = "pretty"
//! filter = "info"
//! ```

use crate::{Error, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

/// Environment variable selecting the backend type.
pub const ENV_BACKEND: &str = "INTELGRAPH_BACKEND";
/// Environment variable with the `PostgreSQL` URL.
pub const ENV_POSTGRES_URL: &str = "INTELGRAPH_POSTGRES_URL";
/// Environment variable with the Memgraph URI.
pub const ENV_MEMGRAPH_URI: &str = "INTELGRAPH_MEMGRAPH_URI";
/// Environment variable with the Memgraph username.
pub const ENV_MEMGRAPH_USER: &str = "INTELGRAPH_MEMGRAPH_USER";
/// Environment variable with the Memgraph password.
pub const ENV_MEMGRAPH_PASSWORD: &str = "INTELGRAPH_MEMGRAPH_PASSWORD";
/// Environment variable with the log filter.
pub const ENV_LOG: &str = "INTELGRAPH_LOG";
/// Environment variable with the log format.
pub const ENV_LOG_FORMAT: &str = "INTELGRAPH_LOG_FORMAT";

/// Main configuration for intelgraph.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Backend map with a `type` discriminator.
    pub graph: Map<String, Value>,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format string, `None` when unknown.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive, e.g. `info` or `intelgraph=debug`.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "info".to_string(),
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Backend table.
    pub graph: Option<toml::Table>,
    /// Logging table.
    pub logging: Option<ConfigFileLogging>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// Output format.
    pub format: Option<String>,
    /// Filter directive.
    pub filter: Option<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        let mut graph = Map::new();
        graph.insert("type".to_string(), Value::String("memory".to_string()));
        Self {
            graph,
            logging: LoggingConfig::default(),
        }
    }
}

impl GraphConfig {
    /// Creates a configuration with the in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        Self::parse_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] on malformed TOML or invalid values.
    pub fn parse_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents)
            .map_err(|e| Error::InvalidInput(format!("invalid config file: {e}")))?;
        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/intelgraph/` on macOS)
    /// 2. XDG config dir (`~/.config/intelgraph/` for Unix compatibility)
    ///
    /// Returns default configuration if no readable config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("intelgraph").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("intelgraph")
                .join("config.toml"),
        ];
        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                },
            }
        }

        Self::default()
    }

    /// Applies `INTELGRAPH_*` environment overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from a key lookup.
    ///
    /// Setting a backend connection variable also switches the backend type
    /// unless `INTELGRAPH_BACKEND` names one explicitly.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut set = |key: &str, value: String| {
            self.graph.insert(key.to_string(), Value::String(value));
        };
        let explicit = lookup(ENV_BACKEND);
        if let Some(url) = lookup(ENV_POSTGRES_URL) {
            set("url", url);
            set("type", "postgres_cte".to_string());
        }
        if let Some(uri) = lookup(ENV_MEMGRAPH_URI) {
            set("uri", uri);
            set("type", "memgraph".to_string());
        }
        if let Some(user) = lookup(ENV_MEMGRAPH_USER) {
            set("username", user);
        }
        if let Some(password) = lookup(ENV_MEMGRAPH_PASSWORD) {
            set("password", password);
        }
        if let Some(backend) = explicit {
            set("type", backend);
        }

        if let Some(filter) = lookup(ENV_LOG) {
            self.logging.filter = filter;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT).as_deref().and_then(LogFormat::parse) {
            self.logging.format = format;
        }
        self
    }

    /// Returns the configured backend type string.
    #[must_use]
    pub fn backend_type(&self) -> Option<&str> {
        self.graph.get("type").and_then(Value::as_str)
    }

    /// Converts a `ConfigFile` to `GraphConfig`.
    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(graph) = file.graph {
            match serde_json::to_value(graph)
                .map_err(|e| Error::InvalidInput(format!("invalid [graph] table: {e}")))?
            {
                Value::Object(map) => config.graph = map,
                _ => return Err(Error::InvalidInput("[graph] must be a table".to_string())),
            }
        }
        if let Some(logging) = file.logging {
            if let Some(format) = logging.format {
                config.logging.format = LogFormat::parse(&format).ok_or_else(|| {
                    Error::InvalidInput(format!("unknown log format: {format}"))
                })?;
            }
            if let Some(filter) = logging.filter {
                config.logging.filter = filter;
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_is_memory() {
        let config = GraphConfig::new();
        assert_eq!(config.backend_type(), Some("memory"));
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_parse_full_file() {
        let config = GraphConfig::parse_toml(
            r#"
            [graph]
            type = "postgres_cte"
            url = "postgresql://localhost/intel"
            schema = "intelligence"
            pool_max_size = 8
            auto_migrate = false

            [logging]
            format = "json"
            filter = "intelgraph=debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend_type(), Some("postgres_cte"));
        assert_eq!(config.graph["pool_max_size"], json!(8));
        assert_eq!(config.graph["auto_migrate"], json!(false));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.filter, "intelgraph=debug");
    }

    #[test]
    fn test_parse_rejects_unknown_log_format() {
        let err = GraphConfig::parse_toml("[logging]\nformat = \"xml\"\n").unwrap_err();
        assert!(err.is_validation());
        assert!(GraphConfig::parse_toml("[graph\n").unwrap_err().is_validation());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[graph]\ntype = \"memgraph\"\nuri = \"bolt://localhost:7687\"").unwrap();
        let config = GraphConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.backend_type(), Some("memgraph"));
        assert_eq!(config.graph["uri"], json!("bolt://localhost:7687"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = GraphConfig::load_from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::OperationFailed { .. }));
    }

    #[test]
    fn test_overrides_switch_backend() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_MEMGRAPH_URI, "bolt://graph:7687"),
            (ENV_MEMGRAPH_USER, "analyst"),
            (ENV_LOG_FORMAT, "json"),
        ]);
        let config = GraphConfig::new().with_overrides(|k| env.get(k).map(ToString::to_string));
        assert_eq!(config.backend_type(), Some("memgraph"));
        assert_eq!(config.graph["username"], json!("analyst"));
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_explicit_backend_wins() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_POSTGRES_URL, "postgresql://db/intel"),
            (ENV_BACKEND, "memory"),
        ]);
        let config = GraphConfig::new().with_overrides(|k| env.get(k).map(ToString::to_string));
        assert_eq!(config.backend_type(), Some("memory"));
        assert_eq!(config.graph["url"], json!("postgresql://db/intel"));
    }
}
