//! Event system for session and surface notifications.
//!
//! Events are values broadcast over `tokio::sync::broadcast`. A sender
//! with no receivers is fine; a lagging receiver drops old events instead
//! of blocking the emitter.

use tokio::sync::broadcast;

/// Changes to the session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A tab was created
    TabAdded(String),
    /// A tab was removed
    TabClosed(String),
    /// The active tab changed
    TabSelected(String),
    /// A tab's content was replaced through the edit path
    ContentChanged { tab: String, cost: u64 },
    /// Remaining quota changed
    QuotaChanged { remaining: u64 },
    /// Quota reached zero; the surface should go read-only
    QuotaExhausted,
    /// A snapshot could not be written
    PersistFailed(String),
}

/// Notifications emitted by an editing surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// The content model changed; carries the full new text
    ContentChanged(String),
    /// The surface switched theme
    ThemeChanged(String),
    /// The surface was made read-only or writable
    ReadOnlyChanged(bool),
}

/// Broadcast bus for events of type `E`.
pub struct EventBus<E> {
    sender: broadcast::Sender<E>,
}

impl<E: Clone> EventBus<E> {
    /// Creates a new event bus.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    /// Emits an event to all subscribers.
    pub fn emit(&self, event: E) {
        // No receivers is not an error.
        let _ = self.sender.send(event);
    }

    /// Subscribes to events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

/// Drains every event currently queued on `rx` without waiting.
///
/// Lagged receivers log the gap and keep draining.
pub fn drain<E: Clone>(rx: &mut broadcast::Receiver<E>) -> Vec<E> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                tracing::warn!("Event receiver lagged, missed {} events", n);
            }
            Err(_) => break,
        }
    }
    events
}
