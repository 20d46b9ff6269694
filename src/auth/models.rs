//! Authentication Models
//!
//! Data structures for authentication requests, responses, and user information.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::error::AuthError;
use crate::database::Identity;

/// The two kinds of marketplace account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Vendor,
    Distributor,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Vendor => "vendor",
            UserType::Distributor => "distributor",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vendor" => Ok(UserType::Vendor),
            "distributor" => Ok(UserType::Distributor),
            other => Err(format!("unknown user type: {other}")),
        }
    }
}

/// Authenticated user information extracted from JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub user_type: UserType,
    pub first_name: String,
    pub last_name: String,
}

/// Non-sensitive view of an identity returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub user_type: UserType,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

impl From<&Identity> for UserSummary {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            email: identity.email.clone(),
            user_type: identity.user_type,
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            company_name: identity.company_name.clone(),
        }
    }
}

/// Login request payload
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: UserSummary,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl RegisterRequest {
    /// Field checks applied before anything touches the credential store.
    pub fn validate(&self) -> Result<(), AuthError> {
        if !looks_like_email(self.email.trim()) {
            return Err(AuthError::Validation("email must be a valid email address".into()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters long"
            )));
        }
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(AuthError::Validation("first and last name are required".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserSummary,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    #[serde(rename = "sessionId", alias = "session_id")]
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub const MIN_PASSWORD_LEN: usize = 6;

/// Minimal structural check: one `@`, a non-empty local part and a dotted domain.
pub fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split('.')
            .filter(|label| !label.is_empty())
            .count()
            >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Emails are matched case-insensitively and without surrounding whitespace.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            company_name: None,
            phone: None,
        }
    }

    #[test]
    fn user_type_round_trips_through_text() {
        assert_eq!("vendor".parse::<UserType>().unwrap(), UserType::Vendor);
        assert_eq!(UserType::Distributor.to_string(), "distributor");
        assert!("admin".parse::<UserType>().is_err());
        assert_eq!(
            serde_json::to_string(&UserType::Distributor).unwrap(),
            "\"distributor\""
        );
    }

    #[test]
    fn email_shape_checks() {
        assert!(looks_like_email("a@x.com"));
        assert!(looks_like_email("first.last@sub.example.org"));
        assert!(!looks_like_email("a@x"));
        assert!(!looks_like_email("@x.com"));
        assert!(!looks_like_email("a@@x.com"));
        assert!(!looks_like_email("a b@x.com"));
        assert!(!looks_like_email("a@x.com."));
    }

    #[test]
    fn register_validation() {
        assert!(register_request("a@x.com", "secret1").validate().is_ok());
        assert!(matches!(
            register_request("a@x.com", "short").validate(),
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            register_request("not-an-email", "secret1").validate(),
            Err(AuthError::Validation(_))
        ));

        let mut nameless = register_request("a@x.com", "secret1");
        nameless.last_name = " ".into();
        assert!(nameless.validate().is_err());
    }

    #[test]
    fn logout_accepts_both_spellings() {
        let camel: LogoutRequest = serde_json::from_str(r#"{"sessionId":"abc"}"#).unwrap();
        let snake: LogoutRequest = serde_json::from_str(r#"{"session_id":"abc"}"#).unwrap();
        assert_eq!(camel.session_id, "abc");
        assert_eq!(snake.session_id, "abc");
    }

    #[test]
    fn summary_omits_missing_company() {
        let summary = UserSummary {
            id: Uuid::nil(),
            email: "a@x.com".into(),
            user_type: UserType::Vendor,
            first_name: "A".into(),
            last_name: "B".into(),
            company_name: None,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("companyName").is_none());
        assert_eq!(json["userType"], "vendor");
        assert_eq!(json["firstName"], "A");
    }
}
