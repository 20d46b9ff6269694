//! Authentication Middleware
//!
//! Axum middleware for JWT token validation and user-type gating. Routes are
//! protected by stacking two stages: [`AuthMiddleware::validate_token`]
//! resolves the caller from the bearer token, then
//! [`AuthMiddleware::require_user_type`] checks the route's required type.

use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::{self, Next},
    response::Response,
};
use std::sync::Arc;

use crate::auth::{
    error::AuthError,
    jwt::JwtService,
    models::{AuthUser, UserType},
};

/// Authentication middleware that validates JWT tokens and injects user info
pub struct AuthMiddleware;

impl AuthMiddleware {
    /// Authentication stage: rejects with 401 unless a valid bearer token is present.
    pub async fn validate_token(
        State(jwt_service): State<Arc<JwtService>>,
        mut req: Request,
        next: Next,
    ) -> Result<Response, AuthError> {
        let auth_user = authenticate(&jwt_service, req.headers())?;
        tracing::debug!(
            "[AuthMiddleware] {} {} authenticated as {} {}",
            req.method(),
            req.uri().path(),
            auth_user.user_type,
            auth_user.id
        );

        // Insert the user into request extensions for downstream handlers
        req.extensions_mut().insert(auth_user);
        Ok(next.run(req).await)
    }

    /// Capability stage: must run after [`AuthMiddleware::validate_token`].
    pub async fn require_user_type(
        State(required): State<UserType>,
        req: Request,
        next: Next,
    ) -> Result<Response, AuthError> {
        let auth_user = req.require_auth()?;
        authorize(auth_user, required)?;
        Ok(next.run(req).await)
    }
}

/// Resolves the caller from the `Authorization: Bearer` header.
pub fn authenticate(jwt_service: &JwtService, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
    let Some(token) = bearer_token(headers) else {
        tracing::debug!("[AuthMiddleware] Missing or malformed Authorization header");
        return Err(AuthError::Unauthenticated);
    };

    jwt_service
        .verify(token)
        .map(AuthUser::from)
        .map_err(|e| {
            tracing::debug!("[AuthMiddleware] JWT validation failed: {}", e);
            AuthError::Unauthenticated
        })
}

/// A mismatched type is a 403, never a request to re-authenticate.
pub fn authorize(auth_user: &AuthUser, required: UserType) -> Result<(), AuthError> {
    if auth_user.user_type == required {
        Ok(())
    } else {
        tracing::debug!(
            "[AuthMiddleware] {} {} denied on {}-only route",
            auth_user.user_type,
            auth_user.id,
            required
        );
        Err(AuthError::Forbidden(required))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Wraps every route of `router` in the authentication stage and, when
/// `required` is set, the capability stage after it.
pub fn protect<S>(
    router: Router<S>,
    jwt_service: Arc<JwtService>,
    required: Option<UserType>,
) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    // Later layers run first.
    let router = match required {
        Some(user_type) => router.route_layer(middleware::from_fn_with_state(
            user_type,
            AuthMiddleware::require_user_type,
        )),
        None => router,
    };
    router.route_layer(middleware::from_fn_with_state(
        jwt_service,
        AuthMiddleware::validate_token,
    ))
}

/// Extension trait for extracting AuthUser from request
pub trait RequestAuthExt {
    fn auth_user(&self) -> Option<&AuthUser>;
    fn require_auth(&self) -> Result<&AuthUser, AuthError>;
}

impl RequestAuthExt for Request {
    fn auth_user(&self) -> Option<&AuthUser> {
        self.extensions().get::<AuthUser>()
    }

    fn require_auth(&self) -> Result<&AuthUser, AuthError> {
        self.auth_user().ok_or(AuthError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::TokenSubject;
    use crate::config::JwtConfig;
    use axum::{
        Extension,
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        routing::get,
    };
    use chrono::Utc;
    use std::time::Duration;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn jwt() -> Arc<JwtService> {
        Arc::new(JwtService::new(&JwtConfig {
            secret: "guard-secret".into(),
            ttl: Duration::from_secs(60),
        }))
    }

    fn token_for(jwt: &JwtService, user_type: UserType) -> String {
        jwt.issue(&TokenSubject {
            id: Uuid::new_v4(),
            email: "u@x.com".into(),
            user_type,
            first_name: "U".into(),
            last_name: "X".into(),
        })
        .unwrap()
    }

    async fn whoami(Extension(user): Extension<AuthUser>) -> String {
        user.user_type.to_string()
    }

    fn app(jwt: Arc<JwtService>) -> Router {
        let any = protect(Router::new().route("/any", get(whoami)), jwt.clone(), None);
        let vendor_only = protect(
            Router::new().route("/vendor", get(whoami)),
            jwt.clone(),
            Some(UserType::Vendor),
        );
        let distributor_only = protect(
            Router::new().route("/distributor", get(whoami)),
            jwt,
            Some(UserType::Distributor),
        );
        Router::new()
            .merge(any)
            .merge(vendor_only)
            .merge(distributor_only)
    }

    async fn status(app: &Router, path: &str, auth: Option<String>) -> StatusCode {
        let mut builder = HttpRequest::builder().uri(path);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        app.clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn vendor_token_is_forbidden_on_distributor_route() {
        let jwt = jwt();
        let app = app(jwt.clone());
        let token = format!("Bearer {}", token_for(&jwt, UserType::Vendor));

        assert_eq!(status(&app, "/vendor", Some(token.clone())).await, StatusCode::OK);
        assert_eq!(status(&app, "/any", Some(token.clone())).await, StatusCode::OK);
        assert_eq!(
            status(&app, "/distributor", Some(token)).await,
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn expired_token_is_unauthenticated_everywhere() {
        let jwt = jwt();
        let app = app(jwt.clone());
        let stale = jwt
            .issue_at(
                &TokenSubject {
                    id: Uuid::new_v4(),
                    email: "u@x.com".into(),
                    user_type: UserType::Distributor,
                    first_name: "U".into(),
                    last_name: "X".into(),
                },
                Utc::now() - chrono::Duration::seconds(120),
            )
            .unwrap();

        for path in ["/any", "/vendor", "/distributor"] {
            assert_eq!(
                status(&app, path, Some(format!("Bearer {stale}"))).await,
                StatusCode::UNAUTHORIZED,
                "{path}"
            );
        }
    }

    #[tokio::test]
    async fn missing_or_malformed_header_is_unauthenticated() {
        let jwt = jwt();
        let app = app(jwt.clone());
        let token = token_for(&jwt, UserType::Vendor);

        assert_eq!(status(&app, "/vendor", None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(&app, "/vendor", Some(token.clone())).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(&app, "/vendor", Some(format!("Basic {token}"))).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(&app, "/vendor", Some("Bearer garbage".into())).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn claims_reach_the_handler() {
        let jwt = jwt();
        let app = app(jwt.clone());
        let token = token_for(&jwt, UserType::Distributor);

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/any")
                    .header(header::AUTHORIZATION, format!("bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"distributor");
    }

    #[test]
    fn authorize_compares_user_type() {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: "u@x.com".into(),
            user_type: UserType::Vendor,
            first_name: "U".into(),
            last_name: "X".into(),
        };
        assert!(authorize(&user, UserType::Vendor).is_ok());
        assert!(matches!(
            authorize(&user, UserType::Distributor),
            Err(AuthError::Forbidden(UserType::Distributor))
        ));
    }
}
