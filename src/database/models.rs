// Database Models
//
// Tokio-postgres compatible models for identities, profile shells and the activity log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::auth::models::UserType;

/// Trait for converting from tokio-postgres Row
pub trait FromRow {
    fn from_row(row: &Row) -> Result<Self, RowError>
    where
        Self: Sized;
}

#[derive(Debug, thiserror::Error)]
pub enum RowError {
    #[error(transparent)]
    Column(#[from] tokio_postgres::Error),

    #[error("unexpected column value: {0}")]
    Value(String),
}

/// User account information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub user_type: UserType,
    pub first_name: String,
    pub last_name: String,
    pub company_name: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl FromRow for Identity {
    fn from_row(row: &Row) -> Result<Self, RowError> {
        let user_type: String = row.try_get("user_type")?;
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            user_type: user_type.parse().map_err(RowError::Value)?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            company_name: row.try_get("company_name")?,
            phone: row.try_get("phone")?,
            is_active: row.try_get("is_active")?,
            is_verified: row.try_get("is_verified")?,
            created_at: row.try_get("created_at")?,
            last_login: row.try_get("last_login")?,
        })
    }
}

/// Fields supplied at registration. Everything else is defaulted by the store.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub email: String,
    pub password_hash: String,
    pub user_type: UserType,
    pub first_name: String,
    pub last_name: String,
    pub company_name: Option<String>,
    pub phone: Option<String>,
}

impl NewIdentity {
    /// Materializes the row a store would insert: unverified, active, fresh id.
    pub fn into_identity(self, now: DateTime<Utc>) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: self.email,
            password_hash: self.password_hash,
            user_type: self.user_type,
            first_name: self.first_name,
            last_name: self.last_name,
            company_name: self.company_name,
            phone: self.phone,
            is_active: true,
            is_verified: false,
            created_at: now,
            last_login: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl OnboardingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnboardingStatus::NotStarted => "not_started",
            OnboardingStatus::InProgress => "in_progress",
            OnboardingStatus::Completed => "completed",
        }
    }
}

/// Type-specific profile row created alongside a new identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProfileShell {
    Vendor {
        company_description: String,
        verification_status: VerificationStatus,
    },
    Distributor {
        verification_status: VerificationStatus,
        onboarding_status: OnboardingStatus,
    },
}

impl ProfileShell {
    /// The pending profile every new account starts with.
    pub fn pending_for(user_type: UserType) -> Self {
        match user_type {
            UserType::Vendor => ProfileShell::Vendor {
                company_description: String::new(),
                verification_status: VerificationStatus::Pending,
            },
            UserType::Distributor => ProfileShell::Distributor {
                verification_status: VerificationStatus::Pending,
                onboarding_status: OnboardingStatus::NotStarted,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityAction {
    Login,
    Register,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Login => "LOGIN",
            ActivityAction::Register => "REGISTER",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub user_id: Uuid,
    pub action: ActivityAction,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl ActivityLogEntry {
    /// An entry about the user's own account, e.g. "vendor login successful".
    pub fn for_user(user_id: Uuid, user_type: UserType, action: ActivityAction) -> Self {
        let verb = match action {
            ActivityAction::Login => "login",
            ActivityAction::Register => "registration",
        };
        Self {
            user_id,
            action,
            entity_type: "USER".to_string(),
            entity_id: user_id,
            description: format!("{user_type} {verb} successful"),
            created_at: Utc::now(),
        }
    }
}
