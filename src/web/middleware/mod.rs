//! Middleware for the HTTP surface.

pub mod security;

pub use security::security_headers;
