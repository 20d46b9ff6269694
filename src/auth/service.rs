//! Auth Service
//!
//! Login, logout, registration and session bookkeeping. The credential store
//! is authoritative and its faults fail the request; the session store is
//! advisory and its faults never do.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::auth::error::AuthError;
use crate::auth::jwt::{Claims, JwtService, TokenSubject};
use crate::auth::models::{
    LoginResponse, MessageResponse, RegisterRequest, RegisterResponse, UserSummary, UserType,
    normalize_email,
};
use crate::auth::password::PasswordHasher;
use crate::database::{
    ActivityAction, ActivityLogEntry, CredentialStore, NewIdentity, ProfileShell, StoreError,
};
use crate::session::{CacheOutcome, SessionRecord, SessionStore};

#[derive(Clone)]
pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    sessions: SessionStore,
    tokens: Arc<JwtService>,
    passwords: PasswordHasher,
    session_ttl_secs: u64,
}

impl AuthService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        sessions: SessionStore,
        tokens: Arc<JwtService>,
        passwords: PasswordHasher,
        session_ttl_secs: u64,
    ) -> Self {
        Self {
            credentials,
            sessions,
            tokens,
            passwords,
            session_ttl_secs,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn credential_backend(&self) -> &'static str {
        self.credentials.backend()
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        user_type: UserType,
    ) -> Result<LoginResponse, AuthError> {
        let email = normalize_email(email);

        // Unknown, inactive and wrong-type accounts all end here, after the
        // same amount of hashing work as a real comparison.
        let Some(user) = self
            .credentials
            .find_by_email_and_type(&email, user_type)
            .await?
        else {
            self.passwords.verify_dummy(password).await;
            tracing::info!("Rejected {} login: no matching active account", user_type);
            return Err(AuthError::InvalidCredentials);
        };

        if !self.passwords.verify(password, &user.password_hash).await? {
            tracing::info!("Rejected {} login for {}: bad password", user_type, user.id);
            return Err(AuthError::InvalidCredentials);
        }

        let token = self
            .tokens
            .issue(&TokenSubject {
                id: user.id,
                email: user.email.clone(),
                user_type: user.user_type,
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
            })
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let session_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let record = SessionRecord {
            session_id: session_id.clone(),
            user_id: user.id,
            email: user.email.clone(),
            user_type: user.user_type,
            token: token.clone(),
            login_time: now,
        };
        if let CacheOutcome::Unavailable = self.sessions.put(&record, self.session_ttl_secs).await
        {
            tracing::warn!(
                "Session for user {} not cached, token authentication still works",
                user.id
            );
        }

        if let Err(e) = self.credentials.update_last_login(user.id, now).await {
            tracing::warn!("Failed to update last login for {}: {}", user.id, e);
        }
        self.record_activity(ActivityLogEntry::for_user(
            user.id,
            user_type,
            ActivityAction::Login,
        ))
        .await;

        tracing::info!("{} {} logged in", user_type, user.id);
        Ok(LoginResponse {
            message: "Login successful".to_string(),
            token,
            user: UserSummary::from(&user),
            session_id,
        })
    }

    /// Always succeeds, whether or not the session existed or the cache answered.
    pub async fn logout(&self, session_id: &str) -> MessageResponse {
        match self.sessions.remove(session_id).await {
            CacheOutcome::Available(true) => tracing::info!("Session {} removed", session_id),
            CacheOutcome::Available(false) => {
                tracing::debug!("Logout for unknown session {}", session_id)
            }
            CacheOutcome::Unavailable => {
                tracing::warn!("Failed to remove session {}, but logout completed", session_id)
            }
        }
        MessageResponse::new("Logout successful")
    }

    /// Extends an existing session's TTL. Missing sessions and cache faults are ignored.
    pub async fn refresh_session(&self, session_id: &str) {
        match self.sessions.touch(session_id, self.session_ttl_secs).await {
            CacheOutcome::Available(true) => tracing::debug!("Session {} refreshed", session_id),
            CacheOutcome::Available(false) => {
                tracing::debug!("Refresh for unknown session {}", session_id)
            }
            CacheOutcome::Unavailable => {
                tracing::warn!("Failed to refresh session {} in cache", session_id)
            }
        }
    }

    /// Fails closed: a cache fault is reported as an invalid session.
    pub async fn validate_session(&self, session_id: &str) -> Result<SessionRecord, AuthError> {
        match self.sessions.fetch(session_id).await {
            CacheOutcome::Available(Some(record)) => Ok(record),
            CacheOutcome::Available(None) => Err(AuthError::SessionInvalid),
            CacheOutcome::Unavailable => {
                tracing::warn!("Session validation unavailable, falling back to token-only auth");
                Err(AuthError::SessionInvalid)
            }
        }
    }

    pub async fn register(
        &self,
        request: RegisterRequest,
        user_type: UserType,
    ) -> Result<RegisterResponse, AuthError> {
        request.validate()?;
        let email = normalize_email(&request.email);

        if self.credentials.find_by_email(&email).await?.is_some() {
            return Err(AuthError::DuplicateIdentity);
        }

        let password_hash = self.passwords.hash(&request.password).await?;
        let new_identity = NewIdentity {
            email,
            password_hash,
            user_type,
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            company_name: non_blank(request.company_name),
            phone: non_blank(request.phone),
        };

        let user = self
            .credentials
            .create_identity(new_identity, ProfileShell::pending_for(user_type))
            .await
            .map_err(|e| match e {
                StoreError::DuplicateEmail => AuthError::DuplicateIdentity,
                other => AuthError::Store(other),
            })?;

        self.record_activity(ActivityLogEntry::for_user(
            user.id,
            user_type,
            ActivityAction::Register,
        ))
        .await;

        tracing::info!("Registered {} {}", user_type, user.id);
        Ok(RegisterResponse {
            message: "Registration successful".to_string(),
            user: UserSummary::from(&user),
        })
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.tokens.verify(token).map_err(|e| {
            tracing::debug!("Token rejected: {}", e);
            AuthError::Unauthenticated
        })
    }

    async fn record_activity(&self, entry: ActivityLogEntry) {
        let user_id = entry.user_id;
        if let Err(e) = self.credentials.append_activity_log(entry).await {
            tracing::warn!("Failed to write activity log for {}: {}", user_id, e);
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
