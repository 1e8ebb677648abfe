//! Topic-based event bus implementation.

use std::collections::HashMap;
use std::sync::Arc;

use game_core::GameEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::types::{SessionEvent, topic_of};

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Effects applied, expired, blocked or resolved
    Effects,
    /// Click outcomes and combo changes
    Input,
    /// Ledger movements
    Economy,
    /// Target relocations and layout rolls
    Layout,
    /// Session lifecycle
    Session,
}

impl Topic {
    pub const ALL: [Topic; 5] = [
        Topic::Effects,
        Topic::Input,
        Topic::Economy,
        Topic::Layout,
        Topic::Session,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Engine event stamped with the session clock it was drained at.
    Game { at_ms: u64, event: GameEvent },
    Session(SessionEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Game { event, .. } => topic_of(event),
            Event::Session(_) => Topic::Session,
        }
    }

    pub fn game(&self) -> Option<&GameEvent> {
        match self {
            Event::Game { event, .. } => Some(event),
            Event::Session(_) => None,
        }
    }
}

/// Topic-based event bus
///
/// Allows consumers to subscribe to specific topics and only receive
/// events they care about. Every topic channel exists from construction.
pub struct EventBus {
    channels: Arc<[broadcast::Sender<Event>; 5]>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let channels = Topic::ALL.map(|_| broadcast::channel(capacity.max(1)).0);
        Self {
            channels: Arc::new(channels),
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        if self.channels[topic.index()].send(event).is_err() {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!("No subscribers for topic {:?}", topic);
        }
    }

    /// Subscribe to a specific topic
    ///
    /// Returns a receiver that will only receive events for that topic.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.channels[topic.index()].subscribe()
    }

    /// Subscribe to multiple topics
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> HashMap<Topic, broadcast::Receiver<Event>> {
        topics
            .iter()
            .map(|&topic| (topic, self.subscribe(topic)))
            .collect()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            channels: Arc::clone(&self.channels),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::{EffectId, ExpiryReason};

    #[tokio::test]
    async fn events_reach_only_their_topic() {
        let bus = EventBus::with_capacity(8);
        let mut effects = bus.subscribe(Topic::Effects);
        let mut input = bus.subscribe(Topic::Input);

        let expired = Event::Game {
            at_ms: 10,
            event: GameEvent::EffectExpired {
                id: EffectId::Lock,
                reason: ExpiryReason::Timer,
            },
        };
        bus.publish(expired.clone());

        assert_eq!(effects.recv().await.unwrap(), expired);
        assert!(matches!(
            input.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.publish(Event::Session(SessionEvent::Reset));
    }
}
