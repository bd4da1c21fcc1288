//! HTTP adapter for the conference backend.
//!
//! # Responsibility
//! - Expose rooms, timeslots and talks as REST resources over axum.
//! - Keep transport concerns (status codes, headers, content types) out of
//!   `conference_core`.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, Problem};
pub use routes::router;
pub use state::{AppState, Database, EntityCaches, Resource};
