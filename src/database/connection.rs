// Database Connection Management
//
// Handles PostgreSQL connection pooling using tokio-postgres and deadpool, and
// implements the credential store on top of it.
//
// Expected tables (owned by the marketplace schema, not migrated here):
//   users(id, email UNIQUE, password_hash, user_type, first_name, last_name,
//         company_name, phone, is_active, is_verified, created_at, last_login)
//   vendors(user_id, company_description, verification_status)
//   distributors(user_id, verification_status, onboarding_status)
//   activity_logs(user_id, action, entity_type, entity_id, description, created_at)
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use std::str::FromStr;
use std::time::Duration;
use tokio_postgres::error::SqlState;
use uuid::Uuid;

use super::models::{ActivityLogEntry, FromRow, Identity, NewIdentity, ProfileShell};
use super::{CredentialStore, StoreError};
use crate::auth::models::UserType;

const USER_COLUMNS: &str = "id, email, password_hash, user_type, first_name, last_name, \
     company_name, phone, is_active, is_verified, created_at, last_login";

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub pg_config: tokio_postgres::Config,
    pub max_size: usize,
    pub timeouts: deadpool_postgres::Timeouts,
}

impl DatabaseConfig {
    /// Create configuration from database URL
    pub fn from_url(url: &str, max_size: usize) -> Result<Self> {
        let pg_config =
            tokio_postgres::Config::from_str(url).context("Failed to parse DATABASE_URL")?;

        Ok(Self {
            pg_config,
            max_size,
            timeouts: deadpool_postgres::Timeouts {
                wait: Some(Duration::from_secs(30)),
                create: Some(Duration::from_secs(30)),
                recycle: Some(Duration::from_secs(30)),
            },
        })
    }

    fn describe(&self) -> String {
        let host = self
            .pg_config
            .get_hosts()
            .first()
            .map(|h| match h {
                tokio_postgres::config::Host::Tcp(s) => s.clone(),
                tokio_postgres::config::Host::Unix(s) => s.to_string_lossy().to_string(),
            })
            .unwrap_or_default();
        let port = self.pg_config.get_ports().first().copied().unwrap_or(5432);
        let dbname = self.pg_config.get_dbname().unwrap_or_default();
        format!("{host}:{port}/{dbname}")
    }
}

/// Database connection wrapper
#[derive(Clone)]
pub struct DatabaseConnection {
    pool: Pool,
}

impl DatabaseConnection {
    /// Create a new database connection with the provided configuration
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        tracing::info!("🔌 Connecting to database: {}", config.describe());

        // Enable SSL using native-tls
        let tls_connector = TlsConnector::builder()
            .build()
            .context("Failed to build TLS connector")?;
        let tls = MakeTlsConnector::new(tls_connector);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = Manager::from_config(config.pg_config, tls, mgr_config);

        let pool = Pool::builder(mgr)
            .max_size(config.max_size)
            .wait_timeout(config.timeouts.wait)
            .create_timeout(config.timeouts.create)
            .recycle_timeout(config.timeouts.recycle)
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .context("Failed to create database pool")?;

        let connection = Self { pool };
        connection
            .health_check()
            .await
            .context("Failed to test database connection")?;

        tracing::info!("✅ Database connection established successfully");
        Ok(connection)
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<()> {
        let client = self
            .pool
            .get()
            .await
            .context("Failed to get connection for health check")?;

        client
            .query("SELECT 1", &[])
            .await
            .context("Database health check failed")?;
        Ok(())
    }

    async fn client(&self) -> Result<Object, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))
    }
}

fn map_insert_error(e: tokio_postgres::Error) -> StoreError {
    if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        StoreError::DuplicateEmail
    } else {
        StoreError::Query(e)
    }
}

#[async_trait]
impl CredentialStore for DatabaseConnection {
    async fn find_by_email_and_type(
        &self,
        email: &str,
        user_type: UserType,
    ) -> Result<Option<Identity>, StoreError> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                &format!(
                    "SELECT {USER_COLUMNS} FROM users \
                     WHERE email = $1 AND user_type = $2 AND is_active = TRUE"
                ),
                &[&email, &user_type.as_str()],
            )
            .await?;
        Ok(row.map(|r| Identity::from_row(&r)).transpose()?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"),
                &[&email],
            )
            .await?;
        Ok(row.map(|r| Identity::from_row(&r)).transpose()?)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"),
                &[&id],
            )
            .await?;
        Ok(row.map(|r| Identity::from_row(&r)).transpose()?)
    }

    async fn create_identity(
        &self,
        identity: NewIdentity,
        profile: ProfileShell,
    ) -> Result<Identity, StoreError> {
        let identity = identity.into_identity(Utc::now());
        let mut client = self.client().await?;
        // Rolled back on drop unless committed.
        let tx = client.transaction().await?;

        tx.execute(
            &format!(
                "INSERT INTO users ({USER_COLUMNS}) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
            ),
            &[
                &identity.id,
                &identity.email,
                &identity.password_hash,
                &identity.user_type.as_str(),
                &identity.first_name,
                &identity.last_name,
                &identity.company_name,
                &identity.phone,
                &identity.is_active,
                &identity.is_verified,
                &identity.created_at,
                &identity.last_login,
            ],
        )
        .await
        .map_err(map_insert_error)?;

        match &profile {
            ProfileShell::Vendor {
                company_description,
                verification_status,
            } => {
                tx.execute(
                    "INSERT INTO vendors (user_id, company_description, verification_status) \
                     VALUES ($1, $2, $3)",
                    &[&identity.id, company_description, &verification_status.as_str()],
                )
                .await?;
            }
            ProfileShell::Distributor {
                verification_status,
                onboarding_status,
            } => {
                tx.execute(
                    "INSERT INTO distributors (user_id, verification_status, onboarding_status) \
                     VALUES ($1, $2, $3)",
                    &[
                        &identity.id,
                        &verification_status.as_str(),
                        &onboarding_status.as_str(),
                    ],
                )
                .await?;
            }
        }

        tx.commit().await?;
        Ok(identity)
    }

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let client = self.client().await?;
        client
            .execute("UPDATE users SET last_login = $1 WHERE id = $2", &[&at, &id])
            .await?;
        Ok(())
    }

    async fn append_activity_log(&self, entry: ActivityLogEntry) -> Result<(), StoreError> {
        let client = self.client().await?;
        client
            .execute(
                "INSERT INTO activity_logs \
                 (user_id, action, entity_type, entity_id, description, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
                &[
                    &entry.user_id,
                    &entry.action.as_str(),
                    &entry.entity_type,
                    &entry.entity_id,
                    &entry.description,
                    &entry.created_at,
                ],
            )
            .await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_url() {
        let config =
            DatabaseConfig::from_url("postgres://app:pw@db.internal:6543/marketplace", 8).unwrap();
        assert_eq!(config.max_size, 8);
        assert_eq!(config.describe(), "db.internal:6543/marketplace");
        assert_eq!(config.pg_config.get_user(), Some("app"));
    }

    #[test]
    fn config_rejects_garbage() {
        assert!(DatabaseConfig::from_url("postgres://user@host:notaport/db", 8).is_err());
    }
}
