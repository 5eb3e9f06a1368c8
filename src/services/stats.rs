//! Check-in statistics for dashboards.
//!
//! The original aggregation lived in a stored database function; here it is
//! one grouped query plus pure arithmetic, so the display rules can be unit
//! tested without a database.

use crate::{db::DbPool, error::AppError, models::event::EventStats};

/// Raw per-event aggregate row.
#[derive(Debug, sqlx::FromRow)]
struct StatsRow {
    event_id: i64,
    event_name: String,
    target_checkins: i32,
    display_limit: Option<i32>,
    total_checkins: i64,
    today_checkins: i64,
}

/// Completion percentage against the organizer's target.
///
/// A zero target reads as 0% rather than dividing by zero. Values above
/// 100% are reported as-is; over-target events are a real outcome.
pub fn completion_percentage(total_checkins: i64, target_checkins: i64) -> f64 {
    if target_checkins <= 0 {
        return 0.0;
    }
    (total_checkins as f64 / target_checkins as f64) * 100.0
}

/// The publicly displayed check-in count: the true total capped at the
/// event's display limit. No limit means the true total.
pub fn displayed_checkins(total_checkins: i64, display_limit: Option<i32>) -> i64 {
    match display_limit {
        Some(limit) => total_checkins.min(i64::from(limit)),
        None => total_checkins,
    }
}

fn stats_from_row(row: StatsRow) -> EventStats {
    EventStats {
        event_id: row.event_id,
        event_name: row.event_name,
        total_checkins: row.total_checkins,
        target_checkins: i64::from(row.target_checkins),
        completion_percentage: completion_percentage(
            row.total_checkins,
            i64::from(row.target_checkins),
        ),
        today_checkins: row.today_checkins,
        displayed_checkins: displayed_checkins(row.total_checkins, row.display_limit),
    }
}

const STATS_QUERY: &str = r#"
    SELECT
        e.id AS event_id,
        e.event_name,
        e.target_checkins,
        e.display_limit,
        COUNT(c.id) AS total_checkins,
        COUNT(c.id) FILTER (WHERE c.checked_in_at >= date_trunc('day', now())) AS today_checkins
    FROM events e
    LEFT JOIN event_checkins c ON c.event_id = e.id
"#;

/// Statistics for a single event.
pub async fn event_stats(pool: &DbPool, event_id: i64) -> Result<EventStats, AppError> {
    let row = sqlx::query_as::<_, StatsRow>(&format!(
        "{STATS_QUERY} WHERE e.id = $1 GROUP BY e.id, e.event_name, e.target_checkins, e.display_limit"
    ))
    .bind(event_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::EventNotFound)?;

    Ok(stats_from_row(row))
}

/// Combined statistics across all events.
///
/// Sums per-event totals and targets the way the dashboard did; the
/// combined figure ignores display limits, which are per-event.
pub async fn overall_stats(pool: &DbPool) -> Result<EventStats, AppError> {
    let rows = sqlx::query_as::<_, StatsRow>(&format!(
        "{STATS_QUERY} GROUP BY e.id, e.event_name, e.target_checkins, e.display_limit"
    ))
    .fetch_all(pool)
    .await?;

    let total_checkins: i64 = rows.iter().map(|r| r.total_checkins).sum();
    let target_checkins: i64 = rows.iter().map(|r| i64::from(r.target_checkins)).sum();
    let today_checkins: i64 = rows.iter().map(|r| r.today_checkins).sum();

    Ok(EventStats {
        event_id: 0,
        event_name: "All events".to_string(),
        total_checkins,
        target_checkins,
        completion_percentage: completion_percentage(total_checkins, target_checkins),
        today_checkins,
        displayed_checkins: total_checkins,
    })
}
