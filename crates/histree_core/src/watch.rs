//! Watch groups: the unit of subscription.

use crate::action::Permission;
use crate::channel::SubscriptionChannel;
use crate::database::Database;
use crate::node::Node;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Watch group lifecycle state.
///
/// `Unsubscribed` is terminal: a deleted group never re-registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Constructed, settings not yet applied.
    Created,
    /// Settings applied, not yet registered with the channel.
    SettingsInitialized,
    /// Registered with the subscription channel.
    Subscribed,
    /// Deregistered; terminal.
    Unsubscribed,
}

/// Binds one `wg`-marked node to its owning database and manages the
/// node's registration with the subscription channel.
///
/// `subscribe` and `unsubscribe` are both idempotent; the state mutex
/// makes each transition-plus-channel-call atomic, so concurrent callers
/// cannot double-register or double-deregister.
pub struct WatchGroup {
    permission: Permission,
    node: Arc<Node>,
    db: Arc<dyn Database>,
    channel: Arc<dyn SubscriptionChannel>,
    state: Mutex<WatchState>,
}

impl WatchGroup {
    /// Creates a watch group in the `Created` state.
    pub fn new(
        permission: Permission,
        node: &Arc<Node>,
        db: &Arc<dyn Database>,
        channel: &Arc<dyn SubscriptionChannel>,
    ) -> Self {
        Self {
            permission,
            node: Arc::clone(node),
            db: Arc::clone(db),
            channel: Arc::clone(channel),
            state: Mutex::new(WatchState::Created),
        }
    }

    /// The watched node.
    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }

    /// The owning database.
    pub fn database(&self) -> &Arc<dyn Database> {
        &self.db
    }

    /// Permission required to modify this group.
    pub fn permission(&self) -> Permission {
        self.permission
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WatchState {
        *self.state.lock()
    }

    /// Applies initial settings: `Created` to `SettingsInitialized`.
    /// No-op in any other state.
    pub fn init_settings(&self) {
        let mut state = self.state.lock();
        if *state == WatchState::Created {
            *state = WatchState::SettingsInitialized;
        }
    }

    /// Registers the watched node's path with the subscription channel.
    ///
    /// No-op when already subscribed or after `unsubscribe`.
    pub fn subscribe(&self) {
        let mut state = self.state.lock();
        match *state {
            WatchState::Subscribed | WatchState::Unsubscribed => {}
            _ => {
                *state = WatchState::Subscribed;
                let path = self.node.path();
                debug!(path = %path, "watch group subscribing");
                self.channel.subscribe(&path);
            }
        }
    }

    /// Deregisters and moves to the terminal state.
    ///
    /// Permitted from any state, including before any subscribe; the
    /// channel is only told if a registration actually happened.
    pub fn unsubscribe(&self) {
        let mut state = self.state.lock();
        if *state == WatchState::Subscribed {
            self.channel.unsubscribe(&self.node.path());
        }
        *state = WatchState::Unsubscribed;
    }
}
