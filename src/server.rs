//! # Server Module
//!
//! HTTP server setup and route configuration for the marketplace auth server.

use anyhow::{Context, Result};
use axum::{Router, http::HeaderValue, routing::get};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::auth::{jwt::JwtService, password::PasswordHasher, service::AuthService};
use crate::config::{Config, SessionConfig};
use crate::database::{CredentialStore, DatabaseConfig, DatabaseConnection, InMemoryCredentialStore};
use crate::routes::health::ping;
use crate::session::{DisabledSessionCache, RedisSessionCache, SessionCache, SessionStore};

/// Application state shared across all route handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub jwt_service: Arc<JwtService>,
}

impl AppState {
    /// Wires the auth core from already-built collaborators.
    pub fn new(
        config: &Config,
        credentials: Arc<dyn CredentialStore>,
        session_cache: Arc<dyn SessionCache>,
    ) -> Result<Self> {
        let jwt_service = Arc::new(JwtService::new(&config.jwt));
        let passwords =
            PasswordHasher::new(&config.password).context("Failed to set up password hashing")?;
        let auth = AuthService::new(
            credentials,
            SessionStore::new(session_cache),
            jwt_service.clone(),
            passwords,
            config.session.ttl_secs,
        );

        Ok(Self {
            auth: Arc::new(auth),
            jwt_service,
        })
    }

    /// Connects the configured credential store and session cache.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let credentials: Arc<dyn CredentialStore> = match &config.database_url {
            Some(url) => {
                let db_config = DatabaseConfig::from_url(url, config.database_max_connections)?;
                Arc::new(
                    DatabaseConnection::new(db_config)
                        .await
                        .context("Failed to connect to DB")?,
                )
            }
            None => {
                tracing::warn!("⚠️  DATABASE_URL not set, using in-memory credential store");
                Arc::new(InMemoryCredentialStore::new())
            }
        };

        Self::new(config, credentials, session_cache(&config.session))
    }
}

fn session_cache(config: &SessionConfig) -> Arc<dyn SessionCache> {
    let Some(url) = &config.redis_url else {
        tracing::info!(
            "🟡 Redis URL not provided - session caching disabled (JWT auth will still work)"
        );
        return Arc::new(DisabledSessionCache);
    };
    match RedisSessionCache::new(url, config.timeout) {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            tracing::warn!("Failed to initialize Redis client ({}), session caching disabled", e);
            Arc::new(DisabledSessionCache)
        }
    }
}

/// Builds the full router without CORS or a listener.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping)) // Health check endpoint
        .merge(crate::routes::auth::create_auth_routes(&state))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::ORIGIN,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
            axum::http::header::AUTHORIZATION,
        ])
}

/// Starts the HTTP server and runs until Ctrl+C.
pub async fn start(config: Config) -> Result<()> {
    let state = AppState::from_config(&config).await?;
    let app = app_router(state)
        .layer(ServiceBuilder::new().layer(cors_layer(&config.server.allowed_origins)));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr} - port may already be in use"))?;

    tracing::info!("🚀 Marketplace auth server starting...");
    tracing::info!("📡 Listening on http://{}", addr);
    tracing::info!("🏥 Health check available at http://{}/ping", addr);
    tracing::info!(
        "🔐 Auth endpoints available at http://{}/auth/{{vendor,distributor}}/*",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
