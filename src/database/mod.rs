//! # Database Module
//!
//! The credential store: identity lookup, registration, last-login tracking
//! and the activity log. PostgreSQL via tokio-postgres/deadpool in
//! production, an in-memory map for local runs and tests.

pub mod connection;
pub mod memory;
pub mod models;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::models::UserType;

pub use connection::{DatabaseConfig, DatabaseConnection};
pub use memory::InMemoryCredentialStore;
pub use models::*;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to get database connection: {0}")]
    Pool(String),

    #[error("database query failed: {0}")]
    Query(#[from] tokio_postgres::Error),

    #[error("email already registered")]
    DuplicateEmail,

    #[error("corrupt record: {0}")]
    Corrupt(#[from] RowError),
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Active identity with this email and user type, if any.
    async fn find_by_email_and_type(
        &self,
        email: &str,
        user_type: UserType,
    ) -> Result<Option<Identity>, StoreError>;

    /// Identity with this email regardless of type or active flag.
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, StoreError>;

    /// Inserts the identity and its profile shell as one unit. Fails with
    /// `DuplicateEmail` if the email is taken; on any failure neither row remains.
    async fn create_identity(
        &self,
        identity: NewIdentity,
        profile: ProfileShell,
    ) -> Result<Identity, StoreError>;

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn append_activity_log(&self, entry: ActivityLogEntry) -> Result<(), StoreError>;

    fn backend(&self) -> &'static str;
}
