//! Event types for the XAT event system
//!
//! Provides shared event definitions and the EventBus used by the scanner,
//! the tagging operations and the mediator service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// XAT event types
///
/// Events are broadcast via EventBus and serialize to JSON for external
/// observers (menu surfaces, logs).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum XatEvent {
    /// One scan pass finished
    ScanCompleted {
        /// Monotonic scan counter
        generation: u64,
        /// Identity-bearing nodes visited
        nodes_seen: usize,
        /// Nodes newly marked in this pass
        nodes_annotated: usize,
        /// Badges inserted in this pass
        badges_rendered: usize,
        timestamp: DateTime<Utc>,
    },

    /// A judgment was written (put semantics)
    JudgmentSaved {
        identity: String,
        sentiment: String,
        suggested_by_ai: bool,
        timestamp: DateTime<Utc>,
    },

    /// A judgment was removed by the user
    JudgmentDeleted {
        identity: String,
        timestamp: DateTime<Utc>,
    },

    /// An interaction event was appended
    InteractionRecorded {
        identity: String,
        kind: String,
        timestamp: DateTime<Utc>,
    },

    /// A suggestion computation finished (successfully or with no data)
    SuggestionReady {
        identity: String,
        /// Fused sentiment, None when neither analyzer produced a hypothesis
        sentiment: Option<String>,
        confidence: Option<f64>,
        sources: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// The settings blob was replaced
    ConfigChanged {
        enabled: bool,
        model: String,
        timestamp: DateTime<Utc>,
    },
}

impl XatEvent {
    /// Event type name (matches the serde tag)
    pub fn event_type(&self) -> &str {
        match self {
            XatEvent::ScanCompleted { .. } => "ScanCompleted",
            XatEvent::JudgmentSaved { .. } => "JudgmentSaved",
            XatEvent::JudgmentDeleted { .. } => "JudgmentDeleted",
            XatEvent::InteractionRecorded { .. } => "InteractionRecorded",
            XatEvent::SuggestionReady { .. } => "SuggestionReady",
            XatEvent::ConfigChanged { .. } => "ConfigChanged",
        }
    }
}

/// Central event distribution bus
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// ```
/// use xat_common::events::{EventBus, XatEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(XatEvent::JudgmentDeleted {
///     identity: "alice".to_string(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert_eq!(rx.try_recv().unwrap().event_type(), "JudgmentDeleted");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<XatEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<XatEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: XatEvent) -> Result<usize, broadcast::error::SendError<XatEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: XatEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
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
    fn test_eventbus_emit_without_subscribers_errors() {
        let bus = EventBus::new(10);
        let event = XatEvent::JudgmentDeleted {
            identity: "alice".to_string(),
            timestamp: Utc::now(),
        };
        assert!(bus.emit(event).is_err());
    }

    #[test]
    fn test_eventbus_multiple_subscribers() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit(XatEvent::InteractionRecorded {
            identity: "bob".to_string(),
            kind: "like".to_string(),
            timestamp: Utc::now(),
        })
        .expect("emit should succeed");

        assert_eq!(rx1.try_recv().unwrap().event_type(), "InteractionRecorded");
        assert_eq!(rx2.try_recv().unwrap().event_type(), "InteractionRecorded");
    }

    #[test]
    fn test_emit_lossy_on_full_channel() {
        let bus = EventBus::new(2);
        let _rx = bus.subscribe();
        for generation in 0..10 {
            bus.emit_lossy(XatEvent::ScanCompleted {
                generation,
                nodes_seen: 0,
                nodes_annotated: 0,
                badges_rendered: 0,
                timestamp: Utc::now(),
            });
        }
        assert_eq!(bus.capacity(), 2);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = XatEvent::SuggestionReady {
            identity: "bob".to_string(),
            sentiment: Some("agree".to_string()),
            confidence: Some(0.95),
            sources: vec!["content".to_string(), "patterns".to_string()],
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "SuggestionReady");
        assert_eq!(json["sources"][1], "patterns");
    }
}
