// # Routes Module
//
// - HTTP route handlers for the marketplace auth server.
// - Routes are organized by functionality into separate submodules.
//
// ## Available Route Modules
// - `health`: Health check and monitoring endpoints
// - `auth`: Vendor/distributor login, registration and session endpoints

/// Health check and monitoring endpoints
pub mod health;

/// Vendor and distributor authentication endpoints
pub mod auth;
