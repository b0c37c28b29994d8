//! Event types for the ClaimGuard event system
//!
//! Provides the `ClaimEvent` enum and the broadcast `EventBus` used by a
//! session to report staging and submission progress to a presentation layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// ClaimGuard event types
///
/// Events are broadcast via `EventBus` and can be serialized for transport
/// to a UI collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClaimEvent {
    /// Files were appended to a staging category
    FilesStaged {
        category: String,
        count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A staged file was removed
    FileRemoved {
        category: String,
        index: usize,
        timestamp: DateTime<Utc>,
    },

    /// A batch was handed to the scoring service
    SubmissionStarted {
        file_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// The scoring service returned a result
    AnalysisCompleted {
        probability: f64,
        risk_level: String,
        timestamp: DateTime<Utc>,
    },

    /// Submission or archival failed
    SubmissionFailed {
        message: String,
        retryable: bool,
        timestamp: DateTime<Utc>,
    },

    /// Staged files were archived to object storage
    AssetsUploaded {
        count: usize,
        timestamp: DateTime<Utc>,
    },

    /// An archived asset was deleted
    AssetDeleted {
        url: String,
        timestamp: DateTime<Utc>,
    },
}

impl ClaimEvent {
    /// Event name as it appears in the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            ClaimEvent::FilesStaged { .. } => "FilesStaged",
            ClaimEvent::FileRemoved { .. } => "FileRemoved",
            ClaimEvent::SubmissionStarted { .. } => "SubmissionStarted",
            ClaimEvent::AnalysisCompleted { .. } => "AnalysisCompleted",
            ClaimEvent::SubmissionFailed { .. } => "SubmissionFailed",
            ClaimEvent::AssetsUploaded { .. } => "AssetsUploaded",
            ClaimEvent::AssetDeleted { .. } => "AssetDeleted",
        }
    }
}

/// Broadcast channel for `ClaimEvent`s
///
/// Cloning the bus shares the same underlying channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ClaimEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before lagging receivers drop old events
    ///
    /// # Examples
    ///
    /// ```
    /// use claimguard_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// let _rx = event_bus.subscribe();
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ClaimEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ClaimEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_emitted_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        bus.emit_lossy(ClaimEvent::AssetsUploaded {
            count: 3,
            timestamp: Utc::now(),
        });

        match rx.recv().await.unwrap() {
            ClaimEvent::AssetsUploaded { count, .. } => assert_eq!(count, 3),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_events_before_subscribe_are_dropped() {
        let bus = EventBus::new(10);
        let event = ClaimEvent::AssetDeleted {
            url: "https://store/image/1-a.jpg".to_string(),
            timestamp: Utc::now(),
        };

        // Nobody listening yet; the event is dropped
        bus.emit_lossy(event.clone());

        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
        bus.emit_lossy(event.clone());
        assert_eq!(rx.try_recv().unwrap(), event);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = ClaimEvent::SubmissionFailed {
            message: "Network error: connection refused".to_string(),
            retryable: true,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "SubmissionFailed");
        assert_eq!(json["retryable"], true);
        assert_eq!(event.event_type(), "SubmissionFailed");
    }
}
