//! `PostgreSQL` migration system for the relational graph schema.
//!
//! Migrations are embedded at compile time and applied when the backend
//! connects with `auto_migrate` enabled. Each migration runs in its own
//! transaction together with its version record.
//!
//! # Usage
//!
//! ```rust,ignore
//! use intelgraph::storage::migrations::{GRAPH_MIGRATIONS, MigrationRunner};
//!
//! let runner = MigrationRunner::new(pool, tables);
//! runner.run(GRAPH_MIGRATIONS).await?;
//! ```

use crate::storage::graph::sql::SqlTables;
use crate::{Error, Result};
use deadpool_postgres::Pool;

/// A single migration with version and SQL.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Migration version (sequential, starting at 1).
    pub version: i32,
    /// Human-readable description.
    pub description: &'static str,
    /// SQL to apply (statements separated by semicolons).
    /// `{schema}`, `{entities}` and `{relationships}` are substituted.
    pub sql: &'static str,
}

/// Embedded migrations for the entities/relationships layout.
pub const GRAPH_MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Create entities and relationships tables",
        sql: r#"
            CREATE TABLE IF NOT EXISTS "{schema}"."{entities}" (
                entity_id TEXT PRIMARY KEY,
                entity_type TEXT NOT NULL,
                name TEXT,
                description TEXT,
                metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
                tags TEXT[] NOT NULL DEFAULT '{}'::text[],
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                deleted_at TIMESTAMPTZ
            );
            CREATE TABLE IF NOT EXISTS "{schema}"."{relationships}" (
                relationship_id TEXT PRIMARY KEY,
                from_entity_id TEXT NOT NULL REFERENCES "{schema}"."{entities}"(entity_id) ON DELETE CASCADE,
                to_entity_id TEXT NOT NULL REFERENCES "{schema}"."{entities}"(entity_id) ON DELETE CASCADE,
                relationship_type TEXT NOT NULL,
                weight DOUBLE PRECISION NOT NULL DEFAULT 1.0 CHECK (weight >= 0.0 AND weight <= 1.0),
                confidence DOUBLE PRECISION NOT NULL DEFAULT 1.0 CHECK (confidence >= 0.0 AND confidence <= 1.0),
                properties JSONB NOT NULL DEFAULT '{}'::jsonb,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                deleted_at TIMESTAMPTZ
            )
        "#,
    },
    Migration {
        version: 2,
        description: "Add traversal and filter indexes",
        sql: r#"
            CREATE INDEX IF NOT EXISTS "idx_{entities}_type" ON "{schema}"."{entities}" (entity_type) WHERE deleted_at IS NULL;
            CREATE INDEX IF NOT EXISTS "idx_{entities}_tags" ON "{schema}"."{entities}" USING GIN (tags);
            CREATE INDEX IF NOT EXISTS "idx_{entities}_metadata" ON "{schema}"."{entities}" USING GIN (metadata);
            CREATE INDEX IF NOT EXISTS "idx_{relationships}_from" ON "{schema}"."{relationships}" (from_entity_id) WHERE deleted_at IS NULL;
            CREATE INDEX IF NOT EXISTS "idx_{relationships}_to" ON "{schema}"."{relationships}" (to_entity_id) WHERE deleted_at IS NULL;
            CREATE INDEX IF NOT EXISTS "idx_{relationships}_type" ON "{schema}"."{relationships}" (relationship_type) WHERE deleted_at IS NULL
        "#,
    },
];

/// Runs migrations for the graph tables.
pub struct MigrationRunner {
    pool: Pool,
    tables: SqlTables,
}

impl MigrationRunner {
    /// Creates a new migration runner.
    #[must_use]
    pub const fn new(pool: Pool, tables: SqlTables) -> Self {
        Self { pool, tables }
    }

    /// Runs all pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn run(&self, migrations: &[Migration]) -> Result<()> {
        let mut client = self.pool.get().await.map_err(|e| Error::OperationFailed {
            operation: "migration_get_connection".to_string(),
            cause: e.to_string(),
        })?;

        self.ensure_migrations_table(&client).await?;
        let current_version = self.get_current_version(&client).await?;

        for migration in migrations {
            if migration.version > current_version {
                self.apply_migration(&mut client, migration).await?;
            }
        }

        Ok(())
    }

    /// Returns the current schema version (0 when never migrated).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub async fn current_version(&self) -> Result<i32> {
        let client = self.pool.get().await.map_err(|e| Error::OperationFailed {
            operation: "migration_get_connection".to_string(),
            cause: e.to_string(),
        })?;

        let exists: bool = client
            .query_one(
                "SELECT EXISTS (SELECT FROM information_schema.tables WHERE table_schema = $1 AND table_name = $2)",
                &[&self.tables.schema(), &self.migrations_table_name()],
            )
            .await
            .map(|row| row.get(0))
            .map_err(|e| Error::operation("migration_table_exists", e))?;

        if !exists {
            return Ok(0);
        }

        self.get_current_version(&client).await
    }

    /// Name of the tracking table, scoped to the entities table.
    fn migrations_table_name(&self) -> String {
        format!("{}_schema_migrations", self.tables.entities_name())
    }

    fn qualified_migrations_table(&self) -> String {
        format!(
            "\"{}\".\"{}\"",
            self.tables.schema(),
            self.migrations_table_name()
        )
    }

    /// Ensures the schema and the tracking table exist.
    async fn ensure_migrations_table(&self, client: &deadpool_postgres::Object) -> Result<()> {
        let schema_sql = format!("CREATE SCHEMA IF NOT EXISTS \"{}\"", self.tables.schema());
        client
            .execute(&schema_sql, &[])
            .await
            .map_err(|e| Error::operation("create_schema", e))?;

        let sql = format!(
            r"
            CREATE TABLE IF NOT EXISTS {} (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            ",
            self.qualified_migrations_table()
        );
        client
            .execute(&sql, &[])
            .await
            .map_err(|e| Error::operation("create_migrations_table", e))?;

        Ok(())
    }

    async fn get_current_version(&self, client: &deadpool_postgres::Object) -> Result<i32> {
        let sql = format!(
            "SELECT COALESCE(MAX(version), 0) FROM {}",
            self.qualified_migrations_table()
        );
        client
            .query_one(&sql, &[])
            .await
            .map(|row| row.get(0))
            .map_err(|e| Error::operation("migration_current_version", e))
    }

    /// Applies a single migration and its version record in one transaction.
    async fn apply_migration(
        &self,
        client: &mut deadpool_postgres::Object,
        migration: &Migration,
    ) -> Result<()> {
        let sql = self.tables.render(migration.sql);

        let tx = client
            .transaction()
            .await
            .map_err(|e| Error::operation(format!("migration_v{}_begin_tx", migration.version), e))?;

        for statement in sql.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }

            tx.execute(statement, &[]).await.map_err(|e| {
                Error::operation(
                    format!("migration_v{}: {}", migration.version, migration.description),
                    e,
                )
            })?;
        }

        let record_sql = format!(
            "INSERT INTO {} (version, description) VALUES ($1, $2)",
            self.qualified_migrations_table()
        );
        tx.execute(&record_sql, &[&migration.version, &migration.description])
            .await
            .map_err(|e| Error::operation("record_migration", e))?;

        tx.commit()
            .await
            .map_err(|e| Error::operation(format!("migration_v{}_commit", migration.version), e))?;

        tracing::info!(
            version = migration.version,
            description = migration.description,
            schema = self.tables.schema(),
            "Applied migration"
        );

        Ok(())
    }
}

/// Maximum version across a set of migrations.
#[must_use]
pub fn max_version(migrations: &[Migration]) -> i32 {
    migrations.iter().map(|m| m.version).max().unwrap_or(0)
}
