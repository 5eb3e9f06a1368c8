//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle the slug derivation, the duplicate-submission guard, at-rest
//! field encryption, the submission pipeline, and statistics.

pub mod bootstrap;
pub mod checkin_service;
pub mod crypto;
pub mod guard;
pub mod slug;
pub mod stats;
