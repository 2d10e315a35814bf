//! PostgreSQL client implementation
//!
//! Pooled connections to the PostgreSQL document store, with TLS driven by
//! the configured `ssl_mode`.

use crate::config::schema::DocumentStoreConfig;
use crate::domain::{DocumentStoreError, Result, SyncError};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use postgres_native_tls::MakeTlsConnector;
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::config::SslMode;
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};

/// PostgreSQL client for catalogue-sync
///
/// Owns the connection pool and runs the schema migration.
pub struct PostgreSQLClient {
    pool: Pool,
    config: DocumentStoreConfig,
}

impl PostgreSQLClient {
    /// Create a new PostgreSQL client
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is missing or invalid, the
    /// TLS connector cannot be built, or the pool cannot be created.
    pub async fn new(config: DocumentStoreConfig) -> Result<Self> {
        let conn_str = config.connection_string.as_ref().ok_or_else(|| {
            SyncError::Configuration("document_store.connection_string is not set".to_string())
        })?;

        let mut pg_config: tokio_postgres::Config =
            conn_str.expose_secret().as_ref().parse().map_err(|e| {
                SyncError::Configuration(format!("Invalid PostgreSQL connection string: {e}"))
            })?;

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let manager = match config.ssl_mode.as_str() {
            "disable" => {
                pg_config.ssl_mode(SslMode::Disable);
                Manager::from_config(pg_config, NoTls, manager_config)
            }
            mode => {
                pg_config.ssl_mode(if mode == "prefer" {
                    SslMode::Prefer
                } else {
                    SslMode::Require
                });
                let connector = tls_connector(mode)?;
                Manager::from_config(pg_config, connector, manager_config)
            }
        };

        let timeout = Duration::from_secs(config.connection_timeout_seconds);
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .wait_timeout(Some(timeout))
            .create_timeout(Some(timeout))
            .recycle_timeout(Some(timeout))
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .map_err(|e| {
                DocumentStoreError::ConnectionFailed(format!(
                    "Failed to create connection pool: {e}"
                ))
            })?;

        Ok(Self { pool, config })
    }

    /// Test the connection to PostgreSQL
    ///
    /// # Errors
    ///
    /// Returns an error if no connection can be obtained or `SELECT 1` fails.
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.get_connection().await?;

        client.query_one("SELECT 1", &[]).await.map_err(|e| {
            DocumentStoreError::ConnectionFailed(format!("Connection test failed: {e}"))
        })?;

        tracing::info!(
            database = %self.connection_string_safe(),
            "PostgreSQL connection test successful"
        );
        Ok(())
    }

    /// Create tables and indexes if they don't exist
    ///
    /// # Errors
    ///
    /// Returns an error if the migration fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.get_connection().await?;

        let migration_sql = include_str!("../../../migrations/001_initial_schema.sql");

        client
            .batch_execute(migration_sql)
            .await
            .map_err(|e| DocumentStoreError::MigrationFailed(e.to_string()))?;

        tracing::info!("PostgreSQL schema initialized successfully");
        Ok(())
    }

    /// Get a connection from the pool with the statement timeout applied
    ///
    /// # Errors
    ///
    /// Returns an error if a connection cannot be obtained.
    pub async fn get_connection(&self) -> Result<deadpool_postgres::Object> {
        let client = self.pool.get().await.map_err(|e| {
            DocumentStoreError::ConnectionFailed(format!(
                "Failed to get connection from pool: {e}"
            ))
        })?;

        let timeout_query = format!(
            "SET statement_timeout = {}",
            self.config.statement_timeout_seconds * 1000
        );
        client.batch_execute(&timeout_query).await.map_err(|e| {
            DocumentStoreError::ConnectionFailed(format!("Failed to set statement timeout: {e}"))
        })?;

        Ok(client)
    }

    /// Execute a query and return rows
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn query(&self, query: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        let client = self.get_connection().await?;

        client
            .query(query, params)
            .await
            .map_err(|e| DocumentStoreError::QueryFailed(e.to_string()).into())
    }

    /// Execute a statement and return the number of affected rows
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    pub async fn execute(&self, statement: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64> {
        let client = self.get_connection().await?;

        client
            .execute(statement, params)
            .await
            .map_err(|e| DocumentStoreError::QueryFailed(e.to_string()).into())
    }

    /// Connection target with credentials redacted
    pub fn connection_string_safe(&self) -> String {
        redact_connection_string(
            self.config
                .connection_string
                .as_ref()
                .map(|s| s.expose_secret().as_ref())
                .unwrap_or_default(),
        )
    }
}

/// Build the TLS connector for a libpq-style `ssl_mode`
///
/// `prefer` and `require` encrypt without verifying the certificate,
/// `verify-ca` skips the hostname check and `verify-full` checks both.
fn tls_connector(ssl_mode: &str) -> Result<MakeTlsConnector> {
    let mut builder = native_tls::TlsConnector::builder();
    match ssl_mode {
        "prefer" | "require" => {
            builder.danger_accept_invalid_certs(true);
        }
        "verify-ca" => {
            builder.danger_accept_invalid_hostnames(true);
        }
        _ => {}
    }

    let connector = builder.build().map_err(|e| {
        DocumentStoreError::ConnectionFailed(format!("Failed to build TLS connector: {e}"))
    })?;
    Ok(MakeTlsConnector::new(connector))
}

fn redact_connection_string(conn_str: &str) -> String {
    conn_str
        .rsplit_once('@')
        .map(|(_, host)| format!("postgresql://***@{host}"))
        .unwrap_or_else(|| "postgresql://***".to_string())
}
