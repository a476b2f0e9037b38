//! Backend factory for graph storage initialization.
//!
//! Centralizes backend creation so callers can switch engines through
//! configuration alone.
//!
//! # Architecture
//!
//! ```text
//! GraphBackendFactory
//!   ├── create(BackendType, BackendParams) → Arc<dyn GraphBackend>
//!   └── from_config(&Map)                  → create(...)
//! ```
//!
//! Required parameters are checked here, before any backend is constructed,
//! so a misconfigured backend fails with [`Error::MissingParameter`] instead
//! of on first use.

use crate::storage::InMemoryGraphBackend;
use crate::storage::traits::GraphBackend;
use crate::{Error, Result};
use secrecy::SecretString;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Supported graph engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendType {
    /// `PostgreSQL` with recursive CTEs.
    PostgresCte,
    /// Memgraph over Bolt.
    Memgraph,
    /// Process-local maps.
    InMemory,
}

impl BackendType {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PostgresCte => "postgres_cte",
            Self::Memgraph => "memgraph",
            Self::InMemory => "memory",
        }
    }

    /// Parses a backend name (case-insensitive, a few aliases accepted).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "postgres_cte" | "postgres" | "postgresql" => Some(Self::PostgresCte),
            "memgraph" => Some(Self::Memgraph),
            "memory" | "in_memory" | "inmemory" => Some(Self::InMemory),
            _ => None,
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BackendType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::InvalidInput(format!("unknown backend type: {s}")))
    }
}

/// Parameters for every backend; each backend reads the ones it needs.
#[derive(Default)]
pub struct BackendParams {
    /// Externally managed `PostgreSQL` pool.
    #[cfg(feature = "postgres")]
    pub pool: Option<deadpool_postgres::Pool>,
    /// `PostgreSQL` connection URL.
    pub url: Option<String>,
    /// `PostgreSQL` schema.
    pub schema: Option<String>,
    /// Entities table name.
    pub entities_table: Option<String>,
    /// Relationships table name.
    pub relationships_table: Option<String>,
    /// Owned pool size.
    pub pool_max_size: Option<usize>,
    /// Apply migrations on connect.
    pub auto_migrate: Option<bool>,
    /// Memgraph Bolt URI.
    pub uri: Option<String>,
    /// Memgraph username.
    pub username: Option<String>,
    /// Memgraph password.
    pub password: Option<SecretString>,
    /// Memgraph database.
    pub database: Option<String>,
    /// Memgraph connection limit.
    pub max_connections: Option<usize>,
}

impl fmt::Debug for BackendParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendParams")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("schema", &self.schema)
            .field("entities_table", &self.entities_table)
            .field("relationships_table", &self.relationships_table)
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl BackendParams {
    /// Creates empty parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an existing `PostgreSQL` pool.
    #[cfg(feature = "postgres")]
    #[must_use]
    pub fn with_pool(mut self, pool: deadpool_postgres::Pool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Sets the `PostgreSQL` URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the `PostgreSQL` schema.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Sets both table names.
    #[must_use]
    pub fn with_tables(
        mut self,
        entities_table: impl Into<String>,
        relationships_table: impl Into<String>,
    ) -> Self {
        self.entities_table = Some(entities_table.into());
        self.relationships_table = Some(relationships_table.into());
        self
    }

    /// Enables or disables migrations on connect.
    #[must_use]
    pub const fn with_auto_migrate(mut self, enabled: bool) -> Self {
        self.auto_migrate = Some(enabled);
        self
    }

    /// Sets the Memgraph URI.
    #[must_use]
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Sets Memgraph credentials.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: SecretString) -> Self {
        self.username = Some(username.into());
        self.password = Some(password);
        self
    }

    /// Sets the Memgraph database.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Reads parameters from a flat map; the `type` key is ignored here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when a known key has the wrong type.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        Ok(Self {
            #[cfg(feature = "postgres")]
            pool: None,
            url: string_field(map, "url")?,
            schema: string_field(map, "schema")?,
            entities_table: string_field(map, "entities_table")?,
            relationships_table: string_field(map, "relationships_table")?,
            pool_max_size: usize_field(map, "pool_max_size")?,
            auto_migrate: bool_field(map, "auto_migrate")?,
            uri: string_field(map, "uri")?,
            username: string_field(map, "username")?,
            password: string_field(map, "password")?.map(SecretString::from),
            database: string_field(map, "database")?,
            max_connections: usize_field(map, "max_connections")?,
        })
    }
}

fn field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

fn string_field(map: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    field(map, key)
        .map(|v| {
            v.as_str()
                .map(String::from)
                .ok_or_else(|| Error::InvalidInput(format!("'{key}' must be a string, got {v}")))
        })
        .transpose()
}

fn usize_field(map: &Map<String, Value>, key: &str) -> Result<Option<usize>> {
    field(map, key)
        .map(|v| {
            v.as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    Error::InvalidInput(format!("'{key}' must be a positive integer, got {v}"))
                })
        })
        .transpose()
}

fn bool_field(map: &Map<String, Value>, key: &str) -> Result<Option<bool>> {
    field(map, key)
        .map(|v| {
            v.as_bool()
                .ok_or_else(|| Error::InvalidInput(format!("'{key}' must be a boolean, got {v}")))
        })
        .transpose()
}

/// Factory for graph backends.
///
/// # Example
///
/// ```rust,ignore
/// use intelgraph::{BackendParams, BackendType, GraphBackendFactory};
///
/// let backend = GraphBackendFactory::create(
///     BackendType::PostgresCte,
///     BackendParams::new().with_url("postgresql://localhost/intel"),
/// )?;
/// backend.connect().await?;
/// ```
pub struct GraphBackendFactory;

impl GraphBackendFactory {
    /// Creates a disconnected backend of the given type.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingParameter`] when a required parameter is absent
    /// - [`Error::FeatureNotEnabled`] when the backend is compiled out
    /// - [`Error::InvalidInput`] on invalid identifiers
    pub fn create(backend_type: BackendType, params: BackendParams) -> Result<Arc<dyn GraphBackend>> {
        let backend: Arc<dyn GraphBackend> = match backend_type {
            BackendType::PostgresCte => Self::create_postgres(params)?,
            BackendType::Memgraph => Self::create_memgraph(params)?,
            BackendType::InMemory => Arc::new(InMemoryGraphBackend::new()),
        };
        tracing::debug!(backend = backend_type.as_str(), "Created graph backend");
        Ok(backend)
    }

    /// Creates a backend from a flat map with a `type` discriminator.
    ///
    /// ```json
    /// {"type": "memgraph", "uri": "bolt://localhost:7687"}
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when `type` is missing or unknown or a
    /// field has the wrong type, plus everything [`Self::create`] returns.
    pub fn from_config(config: &Map<String, Value>) -> Result<Arc<dyn GraphBackend>> {
        let backend_type = config
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidInput("backend config requires a string 'type'".to_string()))?
            .parse::<BackendType>()?;
        Self::create(backend_type, BackendParams::from_map(config)?)
    }

    #[cfg(feature = "postgres")]
    fn create_postgres(params: BackendParams) -> Result<Arc<dyn GraphBackend>> {
        use crate::storage::{PostgresGraphBackend, PostgresGraphConfig};

        let mut config = match (params.pool, params.url) {
            (Some(pool), _) => PostgresGraphConfig::with_pool(pool),
            (None, Some(url)) if !url.trim().is_empty() => PostgresGraphConfig::with_url(url),
            _ => {
                return Err(Error::MissingParameter {
                    backend: BackendType::PostgresCte.as_str(),
                    parameter: "connection_pool",
                });
            },
        };
        if let Some(schema) = params.schema {
            config = config.schema(schema);
        }
        let entities = params
            .entities_table
            .unwrap_or_else(|| PostgresGraphConfig::DEFAULT_ENTITIES_TABLE.to_string());
        let relationships = params
            .relationships_table
            .unwrap_or_else(|| PostgresGraphConfig::DEFAULT_RELATIONSHIPS_TABLE.to_string());
        config = config.tables(entities, relationships);
        if let Some(size) = params.pool_max_size {
            config = config.pool_max_size(size);
        }
        if let Some(enabled) = params.auto_migrate {
            config = config.auto_migrate(enabled);
        }
        Ok(Arc::new(PostgresGraphBackend::new(config)?))
    }

    #[cfg(not(feature = "postgres"))]
    fn create_postgres(_params: BackendParams) -> Result<Arc<dyn GraphBackend>> {
        Err(Error::FeatureNotEnabled("postgres".to_string()))
    }

    #[cfg(feature = "memgraph")]
    fn create_memgraph(params: BackendParams) -> Result<Arc<dyn GraphBackend>> {
        use crate::storage::{MemgraphGraphBackend, MemgraphGraphConfig};

        let Some(uri) = params.uri.filter(|u| !u.trim().is_empty()) else {
            return Err(Error::MissingParameter {
                backend: BackendType::Memgraph.as_str(),
                parameter: "uri",
            });
        };
        let mut config = MemgraphGraphConfig::with_uri(uri);
        if let Some(username) = params.username {
            config.username = username;
        }
        config.password = params.password;
        config.database = params.database;
        if let Some(max) = params.max_connections {
            config = config.max_connections(max);
        }
        Ok(Arc::new(MemgraphGraphBackend::new(config)?))
    }

    #[cfg(not(feature = "memgraph"))]
    fn create_memgraph(_params: BackendParams) -> Result<Arc<dyn GraphBackend>> {
        Err(Error::FeatureNotEnabled("memgraph".to_string()))
    }
}
