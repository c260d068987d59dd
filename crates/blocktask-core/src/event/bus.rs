//! Broadcast channel carrying [`GraphEvent`]s from edit sessions to adapters.
//!
//! Every edit session holds a clone of the same bus; the HTTP server keeps
//! one subscriber that logs, and tests subscribe to assert on mutations.
//! Nobody listening is the common case for the CLI, so sends never fail.

use blocktask_types::event::GraphEvent;
use tokio::sync::broadcast;

/// Events buffered per subscriber before it starts lagging.
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GraphEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<GraphEvent> {
        self.sender.subscribe()
    }

    /// Send to all current subscribers; returns how many there were.
    pub fn publish(&self, event: GraphEvent) -> usize {
        match self.sender.send(event) {
            Ok(listeners) => listeners,
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!(?event, "graph event with no subscribers");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
