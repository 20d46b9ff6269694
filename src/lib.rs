//! # Vendorlink Server
//!
//! Authentication backend for a vendor/distributor partnership marketplace,
//! built with Rust, Axum, and Tokio.
//!
//! ## Architecture
//! - `config`: Environment variable configuration, read once at startup
//! - `auth`: Token service, password hashing, login/registration flows and
//!   the route-gating middleware
//! - `session`: Best-effort session cache (Redis, in-memory or disabled)
//! - `database`: Credential store (PostgreSQL or in-memory)
//! - `routes`: HTTP route handlers organized by functionality
//! - `server`: Application state, router assembly and server lifecycle

pub mod auth;
pub mod config;
pub mod database;
pub mod routes;
pub mod server;
pub mod session;
