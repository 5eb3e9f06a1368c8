//! Check-in HTTP handlers.
//!
//! This module implements the check-in API endpoints:
//! - POST /api/v1/events/by-slug/{slug}/checkins - Public event-scoped submission
//! - POST /api/v1/checkins - Public legacy submission (no event)
//! - GET /api/v1/checkins - Full plaintext listing (admin)
//! - GET /api/v1/checkins/masked - Masked listing for viewer dashboards
//! - PATCH /api/v1/checkins/{id} - Administrative correction
//! - DELETE /api/v1/checkins/{id} - Administrative deletion

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        checkin::{
            Checkin, CheckinRequest, CheckinResponse, MaskedCheckin, UpdateCheckinRequest,
        },
        event::Event,
    },
    services::{checkin_service, crypto, guard},
    state::AppState,
};
use axum::{
    Extension, Json,
    extract::{ConnectInfo, Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;
use std::net::SocketAddr;
use validator::Validate;

/// Optional event filter for listing endpoints.
#[derive(Debug, Deserialize)]
pub struct CheckinListQuery {
    pub event_id: Option<i64>,
}

/// Submit a check-in for an event.
///
/// # Endpoint
///
/// `POST /api/v1/events/by-slug/{slug}/checkins` - public, no authentication; this
/// is the form behind the QR code.
///
/// # Request Body
///
/// ```json
/// {
///   "full_name": "Nguyễn Văn A",
///   "phone_number": "0901234567",
///   "terms_accepted": true
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: Returns the recorded check-in
/// - **Error (404)**: No active event for this slug
/// - **Error (409)**: This device already checked in for the event
/// - **Error (422)**: Validation failure
pub async fn submit_event_checkin(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Json(request): Json<CheckinRequest>,
) -> Result<(StatusCode, Json<CheckinResponse>), AppError> {
    // Only active events accept check-ins
    let event = sqlx::query_as::<_, Event>(
        "SELECT * FROM events WHERE slug = $1 AND status = 'active'",
    )
    .bind(&slug)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::EventNotFound)?;

    let ip_address = guard::resolve_client_address(&headers, Some(peer));
    let user_agent = headers
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .map(String::from);

    let checkin =
        checkin_service::submit_checkin(&state, Some(&event), ip_address, user_agent, request)
            .await?;

    Ok((StatusCode::CREATED, Json(checkin.into())))
}

/// Submit a check-in with no owning event.
///
/// `POST /api/v1/checkins` - public. Legacy flow kept for the plain
/// check-in page; records carry a NULL event id and skip the duplicate
/// guard, which is keyed by event.
pub async fn submit_legacy_checkin(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<CheckinRequest>,
) -> Result<(StatusCode, Json<CheckinResponse>), AppError> {
    let ip_address = guard::resolve_client_address(&headers, Some(peer));
    let user_agent = headers
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .map(String::from);

    let checkin =
        checkin_service::submit_checkin(&state, None, ip_address, user_agent, request).await?;

    Ok((StatusCode::CREATED, Json(checkin.into())))
}

/// List check-ins with plaintext attendee data.
///
/// `GET /api/v1/checkins?event_id=7` - admin only. Newest first, capped at
/// 1000 rows like the original dashboard.
pub async fn list_checkins(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<CheckinListQuery>,
) -> Result<Json<Vec<CheckinResponse>>, AppError> {
    auth.require_admin()?;

    let checkins = sqlx::query_as::<_, Checkin>(
        r#"
        SELECT * FROM event_checkins
        WHERE ($1::BIGINT IS NULL OR event_id = $1)
        ORDER BY checked_in_at DESC
        LIMIT 1000
        "#,
    )
    .bind(query.event_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(checkins.into_iter().map(Into::into).collect()))
}

/// List check-ins with masked attendee data.
///
/// `GET /api/v1/checkins/masked?event_id=7` - any authenticated key. Rows
/// are decrypted from the at-rest copies and masked before leaving the
/// server; a record that fails to decrypt renders as `***` rather than
/// failing the whole listing.
pub async fn list_masked_checkins(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
    Query(query): Query<CheckinListQuery>,
) -> Result<Json<Vec<MaskedCheckin>>, AppError> {
    let checkins = sqlx::query_as::<_, Checkin>(
        r#"
        SELECT * FROM event_checkins
        WHERE ($1::BIGINT IS NULL OR event_id = $1)
        ORDER BY checked_in_at DESC
        LIMIT 1000
        "#,
    )
    .bind(query.event_id)
    .fetch_all(&state.pool)
    .await?;

    let masked = checkins
        .into_iter()
        .map(|checkin| {
            let (masked_name, masked_phone) = match (
                state.cipher.decrypt(&checkin.encrypted_name),
                state.cipher.decrypt(&checkin.encrypted_phone),
            ) {
                (Ok(name), Ok(phone)) => {
                    (crypto::mask_name(&name), crypto::mask_phone_number(&phone))
                }
                // Undecryptable rows (key rotation, tampering) stay opaque
                _ => ("***".to_string(), "***".to_string()),
            };

            MaskedCheckin {
                id: checkin.id,
                masked_name,
                masked_phone,
                terms_accepted: checkin.terms_accepted,
                event_id: checkin.event_id,
                checked_in_at: checkin.checked_in_at,
            }
        })
        .collect();

    Ok(Json(masked))
}

/// Correct a check-in's name and/or phone number.
///
/// `PATCH /api/v1/checkins/{id}` - admin only. Updated fields get freshly
/// derived encrypted copies so the at-rest data never drifts from the
/// plaintext.
pub async fn update_checkin(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(checkin_id): Path<i64>,
    Json(request): Json<UpdateCheckinRequest>,
) -> Result<Json<CheckinResponse>, AppError> {
    auth.require_admin()?;

    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    // Re-derive the encrypted copies for whichever fields change
    let encrypted_name = request
        .full_name
        .as_deref()
        .map(|name| state.cipher.encrypt(name))
        .transpose()?;
    let encrypted_phone = request
        .phone_number
        .as_deref()
        .map(|phone| state.cipher.encrypt(phone))
        .transpose()?;

    let checkin = sqlx::query_as::<_, Checkin>(
        r#"
        UPDATE event_checkins
        SET full_name = COALESCE($1, full_name),
            encrypted_name = COALESCE($2, encrypted_name),
            phone_number = COALESCE($3, phone_number),
            encrypted_phone = COALESCE($4, encrypted_phone)
        WHERE id = $5
        RETURNING *
        "#,
    )
    .bind(&request.full_name)
    .bind(&encrypted_name)
    .bind(&request.phone_number)
    .bind(&encrypted_phone)
    .bind(checkin_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::CheckinNotFound)?;

    Ok(Json(checkin.into()))
}

/// Delete a check-in record.
///
/// `DELETE /api/v1/checkins/{id}` - admin only.
pub async fn delete_checkin(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(checkin_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    auth.require_admin()?;

    let result = sqlx::query("DELETE FROM event_checkins WHERE id = $1")
        .bind(checkin_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::CheckinNotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}
