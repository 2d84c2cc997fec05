//! HTTP surface for flatstore.
//!
//! Maps `GET`, `POST` and `DELETE` on `/<name>` onto the file store and
//! turns store failures into status codes.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::create_router;
pub use server::WebServer;
