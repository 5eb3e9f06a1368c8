//! Live check-in stream over Server-Sent Events.

use std::convert::Infallible;

use axum::{
    Extension,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};

use crate::{middleware::auth::AuthContext, state::AppState};

/// Stream check-in notices as they happen.
///
/// `GET /api/v1/checkins/stream` - any authenticated key. Each accepted
/// submission arrives as an SSE `checkin` event carrying the masked name,
/// so dashboards update without polling. Subscribers that fall behind the
/// channel capacity lose the oldest notices; dashboards recover on the
/// next stats poll.
pub async fn checkin_stream(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.notifier.subscribe();
    tracing::debug!(
        subscribers = state.notifier.subscriber_count(),
        "dashboard stream opened"
    );

    let stream = BroadcastStream::new(receiver).filter_map(|notice| match notice {
        Ok(notice) => Event::default()
            .event("checkin")
            .json_data(&notice)
            .ok()
            .map(Ok),
        // Lagged receivers skip the dropped notices and keep streaming
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
