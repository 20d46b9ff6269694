//! JWT Token Service
//!
//! Handles JWT creation, validation, and claims management for user authentication.
//! Verification is pure computation: a signature check plus a clock comparison.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::models::{AuthUser, UserType};
use crate::config::JwtConfig;

/// JWT Claims structure containing user information and token metadata
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// User unique identifier
    pub sub: Uuid,
    /// User email
    pub email: String,
    pub user_type: UserType,
    pub first_name: String,
    pub last_name: String,
    /// Token issued at timestamp
    pub iat: i64,
    /// Token expiration timestamp
    pub exp: i64,
}

/// Identity attributes to embed in a new token.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub id: Uuid,
    pub email: String,
    pub user_type: UserType,
    pub first_name: String,
    pub last_name: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            user_type: claims.user_type,
            first_name: claims.first_name,
            last_name: claims.last_name,
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

/// JWT Service for token operations
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtService {
    /// Create a new JWT service from the startup configuration
    pub fn new(config: &JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        // Expiry is compared against an explicit clock in `verify_at`, so the
        // library check is off and the boundary stays exact.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key,
            decoding_key,
            validation,
            ttl: config.ttl,
        }
    }

    /// Generate a JWT token for a user
    pub fn issue(&self, subject: &TokenSubject) -> Result<String> {
        self.issue_at(subject, Utc::now())
    }

    pub fn issue_at(&self, subject: &TokenSubject, now: DateTime<Utc>) -> Result<String> {
        let iat = now.timestamp();
        let claims = Claims {
            sub: subject.id,
            email: subject.email.clone(),
            user_type: subject.user_type,
            first_name: subject.first_name.clone(),
            last_name: subject.last_name.clone(),
            iat,
            exp: iat.saturating_add(i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX)),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("Failed to encode JWT token")
    }

    /// Validate and decode a JWT token
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Rejects at or after `exp`, accepts strictly before it.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        if now.timestamp() >= data.claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn service(secret: &str, ttl_secs: u64) -> JwtService {
        JwtService::new(&JwtConfig {
            secret: secret.to_string(),
            ttl: Duration::from_secs(ttl_secs),
        })
    }

    fn subject() -> TokenSubject {
        TokenSubject {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            user_type: UserType::Vendor,
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
        }
    }

    #[test]
    fn test_jwt_roundtrip() {
        let jwt_service = service("test_secret", 3600);
        let subject = subject();

        let token = jwt_service.issue(&subject).unwrap();
        let claims = jwt_service.verify(&token).unwrap();

        assert_eq!(claims.sub, subject.id);
        assert_eq!(claims.email, subject.email);
        assert_eq!(claims.user_type, UserType::Vendor);
        assert_eq!(claims.first_name, "Test");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn accepted_until_expiry_then_rejected() {
        let jwt_service = service("test_secret", 60);
        let issued = Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap();
        let token = jwt_service.issue_at(&subject(), issued).unwrap();

        for offset in [0, 1, 30, 59] {
            let now = issued + chrono::Duration::seconds(offset);
            assert!(jwt_service.verify_at(&token, now).is_ok(), "offset {offset}");
        }
        for offset in [60, 61, 3600] {
            let now = issued + chrono::Duration::seconds(offset);
            assert!(
                matches!(jwt_service.verify_at(&token, now), Err(TokenError::Expired)),
                "offset {offset}"
            );
        }
    }

    #[test]
    fn issuing_is_deterministic_for_same_instant() {
        let jwt_service = service("test_secret", 60);
        let subject = subject();
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            jwt_service.issue_at(&subject, now).unwrap(),
            jwt_service.issue_at(&subject, now).unwrap()
        );
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = service("secret-a", 60).issue(&subject()).unwrap();
        assert!(matches!(
            service("secret-b", 60).verify(&token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn malformed_and_tampered_tokens_are_rejected() {
        let jwt_service = service("test_secret", 60);
        assert!(jwt_service.verify("not-a-jwt").is_err());
        assert!(jwt_service.verify("").is_err());

        let token = jwt_service.issue(&subject()).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = service("other", 60).issue(&subject()).unwrap();
        let forged_payload = forged.split('.').nth(1).unwrap().to_string();
        parts[1] = &forged_payload;
        assert!(jwt_service.verify(&parts.join(".")).is_err());
    }

    #[test]
    fn huge_ttl_saturates_instead_of_wrapping() {
        let jwt_service = service("secret", u64::MAX);
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();

        let token = jwt_service.issue_at(&subject(), now).unwrap();
        let claims = jwt_service.verify_at(&token, now).unwrap();
        assert_eq!(claims.exp, i64::MAX);
    }
}
