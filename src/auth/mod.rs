//! # Authentication Module
//!
//! Handles JWT token issuance and validation, password hashing, the login /
//! logout / registration flows and the middleware that gates routes by user
//! type.

pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;

pub use error::AuthError;
pub use jwt::{Claims, JwtService};
pub use middleware::AuthMiddleware;
pub use models::{AuthUser, UserType};
pub use service::AuthService;
