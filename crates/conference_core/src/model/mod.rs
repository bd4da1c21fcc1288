//! Domain model for the conference schedule.
//!
//! # Responsibility
//! - Define the room, timeslot and talk records used by core logic.
//! - Define identity (`Stored`) and relationship (`Reference`) wrappers.
//!
//! # Invariants
//! - Every persisted record is identified by a store-assigned `EntityId`.
//! - Deletion removes the row; there are no tombstones.

pub mod entity;
pub mod room;
pub mod talk;
pub mod timeslot;
