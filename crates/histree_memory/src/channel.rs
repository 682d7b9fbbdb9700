//! In-memory subscription channel.

use histree_core::SubscriptionChannel;
use parking_lot::Mutex;
use std::collections::BTreeSet;

/// A registration made against a [`RecordingChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A path was subscribed.
    Subscribe(String),
    /// A path was unsubscribed.
    Unsubscribe(String),
}

/// A [`SubscriptionChannel`] that records every registration call.
///
/// Tracks the active subscription set and the full event log, so tests
/// can assert both the end state and how many calls it took to get there.
#[derive(Default)]
pub struct RecordingChannel {
    active: Mutex<BTreeSet<String>>,
    events: Mutex<Vec<ChannelEvent>>,
}

impl RecordingChannel {
    /// Creates an empty channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `path` is currently subscribed.
    pub fn is_subscribed(&self, path: &str) -> bool {
        self.active.lock().contains(path)
    }

    /// Currently subscribed paths, in order.
    pub fn subscriptions(&self) -> Vec<String> {
        self.active.lock().iter().cloned().collect()
    }

    /// The full registration log.
    pub fn events(&self) -> Vec<ChannelEvent> {
        self.events.lock().clone()
    }

    /// How many subscribe calls were made for `path`.
    pub fn subscribe_count(&self, path: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, ChannelEvent::Subscribe(p) if p == path))
            .count()
    }
}

impl SubscriptionChannel for RecordingChannel {
    fn subscribe(&self, path: &str) {
        self.active.lock().insert(path.to_string());
        self.events
            .lock()
            .push(ChannelEvent::Subscribe(path.to_string()));
    }

    fn unsubscribe(&self, path: &str) {
        self.active.lock().remove(path);
        self.events
            .lock()
            .push(ChannelEvent::Unsubscribe(path.to_string()));
    }
}
