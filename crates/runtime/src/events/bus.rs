//! Topic-based event bus implementation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::types::{BroadcastEvent, LifecycleEvent, PurchaseEvent};

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Market opened or closed
    Lifecycle,
    /// Broadcast lines and timed announcements
    Broadcast,
    /// Completed purchases
    Purchase,
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Lifecycle(LifecycleEvent),
    Broadcast(BroadcastEvent),
    Purchase(PurchaseEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Lifecycle(_) => Topic::Lifecycle,
            Event::Broadcast(_) => Topic::Broadcast,
            Event::Purchase(_) => Topic::Purchase,
        }
    }
}

/// Topic-based event bus
///
/// One broadcast channel per topic, created up front. Publishing never
/// blocks; events sent while nobody listens are dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    lifecycle: broadcast::Sender<Event>,
    broadcast: broadcast::Sender<Event>,
    purchase: broadcast::Sender<Event>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lifecycle: broadcast::channel(capacity).0,
            broadcast: broadcast::channel(capacity).0,
            purchase: broadcast::channel(capacity).0,
        }
    }

    fn sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Lifecycle => &self.lifecycle,
            Topic::Broadcast => &self.broadcast,
            Topic::Purchase => &self.purchase,
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        if self.sender(topic).send(event).is_err() {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!("No subscribers for topic {:?}", topic);
        }
    }

    /// Subscribe to a specific topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.sender(topic).subscribe()
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

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
