//! Event types for the Ambia engine
//!
//! One-to-many diagnostic events broadcast over `tokio::sync::broadcast`.
//! Hosts subscribe to observe loop lifecycle and crossfade completion;
//! emission is lossy and never blocks the engine.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Engine playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Stopped,
    Loading,
    Playing,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Stopped => write!(f, "stopped"),
            PlaybackState::Loading => write!(f, "loading"),
            PlaybackState::Playing => write!(f, "playing"),
        }
    }
}

/// Ambia event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AmbiaEvent {
    /// A soundscape loop started playing
    LoopStarted {
        theme_id: String,
        duration_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A crossfade began (the active slot entered its end-of-track window)
    CrossfadeStarted {
        theme_id: String,
        position_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A crossfade completed and the slot roles swapped
    CrossfadeCompleted {
        theme_id: String,
        loop_count: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The loop was stopped and both slots released
    LoopStopped {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A non-recoverable engine error; the engine has returned to Stopped
    EngineError {
        kind: String,
        detail: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Event broadcaster
///
/// Thin wrapper over `tokio::sync::broadcast` so emission sites never have
/// to care whether anyone is listening.
pub struct EventBus {
    tx: broadcast::Sender<AmbiaEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity.
    ///
    /// Old events are dropped once the buffer fills; subscribers that fall
    /// behind observe a `Lagged` error rather than blocking the engine.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<AmbiaEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring the no-subscribers case.
    pub fn emit_lossy(&self, event: AmbiaEvent) {
        let _ = self.tx.send(event);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
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

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_eventbus_subscribe() {
        let bus = EventBus::new(100);
        let _rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_emit_lossy_without_subscribers() {
        let bus = EventBus::new(10);
        // Must not panic when nobody is listening
        bus.emit_lossy(AmbiaEvent::LoopStopped {
            timestamp: chrono::Utc::now(),
        });
    }

    #[tokio::test]
    async fn test_emit_and_receive() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        bus.emit_lossy(AmbiaEvent::CrossfadeCompleted {
            theme_id: "rain".to_string(),
            loop_count: 3,
            timestamp: chrono::Utc::now(),
        });

        match rx.recv().await.unwrap() {
            AmbiaEvent::CrossfadeCompleted {
                theme_id,
                loop_count,
                ..
            } => {
                assert_eq!(theme_id, "rain");
                assert_eq!(loop_count, 3);
            }
            other => panic!("Wrong event type received: {:?}", other),
        }
    }

    #[test]
    fn test_event_serialization_tag() {
        let event = AmbiaEvent::LoopStarted {
            theme_id: "ocean".to_string(),
            duration_ms: 60_000,
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"LoopStarted\""));
        assert!(json.contains("\"theme_id\":\"ocean\""));
    }

    #[test]
    fn test_playback_state_display() {
        assert_eq!(format!("{}", PlaybackState::Stopped), "stopped");
        assert_eq!(format!("{}", PlaybackState::Loading), "loading");
        assert_eq!(format!("{}", PlaybackState::Playing), "playing");
    }
}
