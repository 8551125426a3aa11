//! HTTP adapter for flowsmith.
//!
//! Exposes workflow generation, validation and the node type catalog over
//! a small JSON API. Configuration comes from the environment; see
//! [`config::ServerConfig`].

pub mod config;
pub mod error;
pub mod routes;

pub use config::ServerConfig;
pub use error::{ApiError, ServerError};
pub use routes::{AppState, router};
