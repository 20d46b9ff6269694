//! Auth routes for vendor and distributor login, registration and sessions

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::auth::{
    error::AuthError,
    middleware::protect,
    models::{
        AuthUser, LoginRequest, LoginResponse, LogoutRequest, MessageResponse, RegisterRequest,
        RegisterResponse, UserType,
    },
};
use crate::server::AppState;
use crate::session::SessionRecord;

async fn login(
    state: &AppState,
    user_type: UserType,
    payload: LoginRequest,
) -> Result<(StatusCode, Json<LoginResponse>), AuthError> {
    let response = state
        .auth
        .login(&payload.email, &payload.password, user_type)
        .await?;
    Ok((StatusCode::OK, Json(response)))
}

async fn register(
    state: &AppState,
    user_type: UserType,
    payload: RegisterRequest,
) -> Result<(StatusCode, Json<RegisterResponse>), AuthError> {
    let response = state.auth.register(payload, user_type).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn vendor_login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    login(&state, UserType::Vendor, payload).await
}

pub async fn distributor_login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    login(&state, UserType::Distributor, payload).await
}

pub async fn vendor_register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    register(&state, UserType::Vendor, payload).await
}

pub async fn distributor_register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    register(&state, UserType::Distributor, payload).await
}

/// Always 200: logout never depends on the session cache.
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<LogoutRequest>,
) -> Json<MessageResponse> {
    Json(state.auth.logout(&payload.session_id).await)
}

/// Always 200: a missing session or unavailable cache is not the caller's problem.
pub async fn refresh(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<MessageResponse> {
    state.auth.refresh_session(&session_id).await;
    Json(MessageResponse::new("Session refreshed successfully"))
}

/// Current caller, as carried by the token.
pub async fn me(Extension(user): Extension<AuthUser>) -> Json<AuthUser> {
    Json(user)
}

/// Returns the caller's own session record.
pub async fn session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionRecord>, AuthError> {
    let record = state.auth.validate_session(&session_id).await?;
    if record.user_id != user.id {
        tracing::warn!(
            "User {} asked for session {} owned by someone else",
            user.id,
            session_id
        );
        return Err(AuthError::SessionInvalid);
    }
    Ok(Json(record))
}

pub fn create_auth_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/auth/vendor/login", post(vendor_login))
        .route("/auth/vendor/register", post(vendor_register))
        .route("/auth/vendor/logout", post(logout))
        .route("/auth/vendor/refresh/{session_id}", post(refresh))
        .route("/auth/distributor/login", post(distributor_login))
        .route("/auth/distributor/register", post(distributor_register))
        .route("/auth/distributor/logout", post(logout))
        .route("/auth/distributor/refresh/{session_id}", post(refresh));

    let authenticated = protect(
        Router::new()
            .route("/auth/me", get(me))
            .route("/auth/session/{session_id}", get(session)),
        state.jwt_service.clone(),
        None,
    );
    let vendor_only = protect(
        Router::new().route("/auth/vendor/me", get(me)),
        state.jwt_service.clone(),
        Some(UserType::Vendor),
    );
    let distributor_only = protect(
        Router::new().route("/auth/distributor/me", get(me)),
        state.jwt_service.clone(),
        Some(UserType::Distributor),
    );

    public
        .merge(authenticated)
        .merge(vendor_only)
        .merge(distributor_only)
}
