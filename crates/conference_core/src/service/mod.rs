//! Core use-case services.
//!
//! # Responsibility
//! - Enforce identity invariants before delegating to repositories.
//! - Combine partial updates with persisted state.
//! - Keep the HTTP adapter decoupled from storage details.

pub mod crud_service;
pub mod merge;
