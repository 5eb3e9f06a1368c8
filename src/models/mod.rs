//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables.

/// API key authentication model
pub mod api_key;
/// Check-in submission model
pub mod checkin;
/// Event model
pub mod event;
