//! Live check-in notification channel.
//!
//! Dashboards want to see new check-ins as they happen. Instead of letting
//! handlers poke at subscriber state directly, inserts publish a
//! [`CheckinNotice`] onto a broadcast channel and any number of SSE
//! connections subscribe to it. Receivers that disconnect simply drop their
//! end; slow receivers that lag behind miss notices rather than block the
//! submission path.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

/// Capacity of the broadcast channel. Lagging dashboard connections drop
/// notices beyond this backlog instead of applying backpressure to inserts.
const CHANNEL_CAPACITY: usize = 256;

/// A single new-check-in notification pushed to live dashboards.
///
/// Carries only what the feed needs to render a row; viewers re-query for
/// full data on demand.
#[derive(Debug, Clone, Serialize)]
pub struct CheckinNotice {
    /// Check-in record id
    pub id: i64,

    /// Owning event, if the submission was event-scoped
    pub event_id: Option<i64>,

    /// Masked submitter name (e.g., "Nguyen V** A*")
    pub masked_name: String,

    /// Submission timestamp
    pub checked_in_at: DateTime<Utc>,
}

/// Handle for publishing and subscribing to check-in notices.
///
/// Cheap to clone; all clones share one underlying channel.
#[derive(Debug, Clone)]
pub struct CheckinNotifier {
    sender: broadcast::Sender<CheckinNotice>,
}

impl CheckinNotifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish a notice to all current subscribers.
    ///
    /// A send error only means nobody is listening, which is normal when no
    /// dashboard is open, so it is ignored.
    pub fn publish(&self, notice: CheckinNotice) {
        let _ = self.sender.send(notice);
    }

    /// Subscribe to the ordered stream of insert notices.
    ///
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<CheckinNotice> {
        self.sender.subscribe()
    }

    /// Number of live subscribers, for logging.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for CheckinNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(id: i64) -> CheckinNotice {
        CheckinNotice {
            id,
            event_id: Some(1),
            masked_name: "Nguyen V** A*".to_string(),
            checked_in_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn subscribers_receive_notices_in_order() {
        let notifier = CheckinNotifier::new();
        let mut rx = notifier.subscribe();

        notifier.publish(notice(1));
        notifier.publish(notice(2));

        assert_eq!(rx.recv().await.unwrap().id, 1);
        assert_eq!(rx.recv().await.unwrap().id, 2);
    }

    #[test]
    fn publish_without_subscribers_is_a_noop() {
        let notifier = CheckinNotifier::new();
        assert_eq!(notifier.subscriber_count(), 0);
        notifier.publish(notice(1));
    }

    #[tokio::test]
    async fn dropped_receiver_unsubscribes() {
        let notifier = CheckinNotifier::new();
        let rx = notifier.subscribe();
        assert_eq!(notifier.subscriber_count(), 1);
        drop(rx);
        assert_eq!(notifier.subscriber_count(), 0);
    }
}
