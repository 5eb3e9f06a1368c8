//! Event management HTTP handlers.
//!
//! This module implements the event-related API endpoints:
//! - POST /api/v1/events - Create new event (admin)
//! - GET /api/v1/events - List all events (staff)
//! - GET /api/v1/events/by-slug/{slug} - Resolve an active event by slug (public)
//! - PATCH /api/v1/events/{id} - Update an event (admin)
//! - PUT /api/v1/events/{id}/display-limit - Set the public display cap (admin)
//! - GET /api/v1/stats - Combined statistics (staff)
//! - GET /api/v1/events/{id}/stats - Per-event statistics (staff)

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::event::{
        CreateEventRequest, Event, EventStats, SetDisplayLimitRequest, UpdateEventRequest,
    },
    services::{slug, stats},
    state::AppState,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use validator::Validate;

/// Name of the unique constraint on `events.slug`. Must match the migration.
const SLUG_CONSTRAINT: &str = "events_slug_key";

/// Create a new event.
///
/// # Endpoint
///
/// `POST /api/v1/events`
///
/// The slug is derived from the submitted name and date here, exactly once;
/// later renames never regenerate it, so printed QR codes stay valid.
/// Because the slug is a pure function of (name, date), creating two events
/// with the same name on the same date collides - the second creation is
/// rejected with 409 `slug_taken`.
///
/// # Response
///
/// - **Success (201 Created)**: Returns the created event, slug included
/// - **Error (401/403)**: Missing key or not an admin
/// - **Error (409)**: Slug already taken
/// - **Error (422)**: Validation failure
pub async fn create_event(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    auth.require_admin()?;

    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let event_slug = slug::event_slug(&request.event_name, request.event_date);

    let result = sqlx::query_as::<_, Event>(
        r#"
        INSERT INTO events (event_name, event_date, slug, target_checkins, description)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&request.event_name)
    .bind(request.event_date)
    .bind(&event_slug)
    .bind(request.target_checkins)
    .bind(&request.description)
    .fetch_one(&state.pool)
    .await;

    let event = match result {
        Ok(event) => event,
        Err(err) if AppError::is_unique_violation(&err, SLUG_CONSTRAINT) => {
            return Err(AppError::SlugTaken);
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!(event_id = event.id, slug = %event.slug, "event created");

    Ok((StatusCode::CREATED, Json(event)))
}

/// List all events, newest event date first.
///
/// `GET /api/v1/events` - any authenticated key.
pub async fn list_events(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
) -> Result<Json<Vec<Event>>, AppError> {
    let events =
        sqlx::query_as::<_, Event>("SELECT * FROM events ORDER BY event_date DESC, id DESC")
            .fetch_all(&state.pool)
            .await?;

    Ok(Json(events))
}

/// Resolve an active event by its check-in slug.
///
/// `GET /api/v1/events/by-slug/{slug}` - public; this is what the check-in page
/// loads after scanning a QR code. Inactive events answer 404 so completed
/// or cancelled events stop accepting traffic without being deleted.
pub async fn get_event_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Event>, AppError> {
    let event = sqlx::query_as::<_, Event>(
        "SELECT * FROM events WHERE slug = $1 AND status = 'active'",
    )
    .bind(&slug)
    .fetch_optional(&state.pool)
    .await?;

    let event = match event {
        Some(event) => event,
        None => {
            // Distinguish a malformed slug from an unknown or inactive event
            match slug::parse_event_slug(&slug) {
                Some(parsed) => {
                    tracing::debug!(%slug, date = %parsed.date, "no active event for slug")
                }
                None => tracing::debug!(%slug, "slug does not match the expected shape"),
            }
            return Err(AppError::EventNotFound);
        }
    };

    Ok(Json(event))
}

/// Update an event's mutable attributes.
///
/// `PATCH /api/v1/events/{id}` - admin only. Omitted fields stay unchanged.
/// The slug is deliberately not touched even when the name or date changes.
pub async fn update_event(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(event_id): Path<i64>,
    Json(request): Json<UpdateEventRequest>,
) -> Result<Json<Event>, AppError> {
    auth.require_admin()?;

    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let event = sqlx::query_as::<_, Event>(
        r#"
        UPDATE events
        SET event_name = COALESCE($1, event_name),
            event_date = COALESCE($2, event_date),
            target_checkins = COALESCE($3, target_checkins),
            description = COALESCE($4, description),
            status = COALESCE($5, status),
            updated_at = NOW()
        WHERE id = $6
        RETURNING *
        "#,
    )
    .bind(&request.event_name)
    .bind(request.event_date)
    .bind(request.target_checkins)
    .bind(&request.description)
    .bind(request.status)
    .bind(event_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::EventNotFound)?;

    Ok(Json(event))
}

/// Set or clear an event's public display limit.
///
/// `PUT /api/v1/events/{id}/display-limit` - admin only. A `null` limit
/// means unlimited. The limit only caps what dashboards show; the stored
/// check-ins are unaffected.
pub async fn set_display_limit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(event_id): Path<i64>,
    Json(request): Json<SetDisplayLimitRequest>,
) -> Result<Json<Event>, AppError> {
    auth.require_admin()?;

    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let event = sqlx::query_as::<_, Event>(
        r#"
        UPDATE events
        SET display_limit = $1,
            updated_at = NOW()
        WHERE id = $2
        RETURNING *
        "#,
    )
    .bind(request.display_limit)
    .bind(event_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::EventNotFound)?;

    Ok(Json(event))
}

/// Per-event check-in statistics.
///
/// `GET /api/v1/events/{id}/stats` - any authenticated key.
pub async fn get_event_stats(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
    Path(event_id): Path<i64>,
) -> Result<Json<EventStats>, AppError> {
    let stats = stats::event_stats(&state.pool, event_id).await?;
    Ok(Json(stats))
}

/// Combined statistics across all events.
///
/// `GET /api/v1/stats` - any authenticated key.
pub async fn get_overall_stats(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
) -> Result<Json<EventStats>, AppError> {
    let stats = stats::overall_stats(&state.pool).await?;
    Ok(Json(stats))
}
