//! Live update events. Mutating operations publish fire-and-forget
//! notifications; connected clients refetch whatever they display.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// A notification that league state changed. Events carry ids, never
/// payloads; they tell clients what to refetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    /// A user replaced one of their picks.
    PicksUpdated { season_id: String, user_id: String },
    /// Scores were recomputed for a season.
    ScoresUpdated { season_id: String },
    /// An episode outcome was recorded.
    EpisodeCompleted { season_id: String, episode_id: String },
}

/// Sink for live events. Publishing never blocks and never fails the
/// operation that triggered it.
pub trait Publisher: Send + Sync {
    fn publish(&self, event: LiveEvent);
}

/// Publisher for contexts with no live listeners (batch jobs, tests).
pub struct NoopPublisher;

impl Publisher for NoopPublisher {
    fn publish(&self, _event: LiveEvent) {}
}

/// Fan-out publisher backed by a tokio broadcast channel. Slow subscribers
/// lag and drop events rather than backpressuring the writer.
pub struct BroadcastPublisher {
    tx: broadcast::Sender<LiveEvent>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Publisher for BroadcastPublisher {
    fn publish(&self, event: LiveEvent) {
        // Err means no subscribers are connected right now, which is fine.
        if self.tx.send(event).is_err() {
            debug!("live event dropped: no subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = LiveEvent::ScoresUpdated {
            season_id: "season_1".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"scores_updated\""));
        assert!(json.contains("\"season_id\":\"season_1\""));

        let back: LiveEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let publisher = BroadcastPublisher::default();
        publisher.publish(LiveEvent::PicksUpdated {
            season_id: "season_1".into(),
            user_id: "u1".into(),
        });
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let publisher = BroadcastPublisher::default();
        let mut rx = publisher.subscribe();

        publisher.publish(LiveEvent::EpisodeCompleted {
            season_id: "season_1".into(),
            episode_id: "e1".into(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            LiveEvent::EpisodeCompleted {
                season_id: "season_1".into(),
                episode_id: "e1".into(),
            }
        );
    }
}
