//! Event data models and API request/response types.
//!
//! This module defines:
//! - `Event`: Database entity representing an event
//! - `EventStatus`: Lifecycle state of an event
//! - `CreateEventRequest` / `UpdateEventRequest`: Request bodies
//! - `EventResponse`: Response body returned to clients
//! - `EventStats`: Aggregated check-in statistics for dashboards

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Lifecycle state of an event.
///
/// Events are never physically deleted; cancelled ones are kept for their
/// check-in history. Stored as the PostgreSQL enum type `event_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Active,
    Completed,
    Cancelled,
}

/// Represents an event record from the database.
///
/// # Database Table
///
/// Maps to the `events` table. The `slug` is derived from
/// (`event_name`, `event_date`) once at creation time by
/// [`crate::services::slug::event_slug`] and is never regenerated, so
/// check-in links and printed QR codes stay valid across renames.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Event {
    /// Unique identifier for this event (store-assigned)
    pub id: i64,

    /// Display name, free text, may contain Vietnamese diacritics
    pub event_name: String,

    /// Calendar date the event takes place
    pub event_date: NaiveDate,

    /// URL-safe identifier used in check-in links and QR codes
    ///
    /// Unique per event. Generated once at creation time.
    pub slug: String,

    /// Organizer's check-in goal, always positive
    pub target_checkins: i32,

    /// Optional free-text description shown on the check-in page
    pub description: Option<String>,

    /// Lifecycle status; only active events accept check-ins
    pub status: EventStatus,

    /// Cap on publicly displayed check-in counts; NULL means unlimited
    ///
    /// Affects dashboards only, never the stored data.
    pub display_limit: Option<i32>,

    /// Timestamp when the event was created
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last administrative update
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a new event.
///
/// # JSON Example
///
/// ```json
/// {
///   "event_name": "Grand Opening 2024",
///   "event_date": "2024-03-05",
///   "target_checkins": 500,
///   "description": "Ribbon cutting at 9am"
/// }
/// ```
#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    /// Display name for the new event
    #[validate(length(min = 3, max = 200, message = "Event name must be 3-200 characters"))]
    pub event_name: String,

    /// Calendar date, ISO format (YYYY-MM-DD)
    pub event_date: NaiveDate,

    /// Check-in goal (defaults to 500 if not provided)
    #[serde(default = "default_target")]
    #[validate(range(min = 1, max = 100_000, message = "Target must be between 1 and 100,000"))]
    pub target_checkins: i32,

    /// Optional description
    pub description: Option<String>,
}

/// Default check-in target when not specified in request.
fn default_target() -> i32 {
    500
}

/// Request body for updating an event.
///
/// All fields optional; omitted fields are left unchanged. The slug is
/// deliberately not updatable.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateEventRequest {
    #[validate(length(min = 3, max = 200, message = "Event name must be 3-200 characters"))]
    pub event_name: Option<String>,

    pub event_date: Option<NaiveDate>,

    #[validate(range(min = 1, max = 100_000, message = "Target must be between 1 and 100,000"))]
    pub target_checkins: Option<i32>,

    pub description: Option<String>,

    pub status: Option<EventStatus>,
}

/// Request body for setting an event's public display limit.
///
/// `null` clears the limit (unlimited).
#[derive(Debug, Deserialize, Validate)]
pub struct SetDisplayLimitRequest {
    #[validate(range(min = 0, message = "Display limit must be zero or greater"))]
    pub display_limit: Option<i32>,
}

/// Aggregated check-in statistics for one event (or all events combined).
///
/// `displayed_checkins` is the public figure: the true total capped at the
/// event's display limit. Admin dashboards use `total_checkins` directly.
#[derive(Debug, Serialize)]
pub struct EventStats {
    pub event_id: i64,
    pub event_name: String,
    pub total_checkins: i64,
    pub target_checkins: i64,
    pub completion_percentage: f64,
    pub today_checkins: i64,
    pub displayed_checkins: i64,
}
