//! In-memory database backend.

use histree_core::{BackendError, ConnectCallback, Database, Node, Value};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Connection state of a [`MemoryDatabase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbState {
    /// Constructed, connect not yet started.
    Created,
    /// Connect started, completion not yet signaled.
    Connecting,
    /// Connected; extensions may be initialized.
    Connected,
    /// Closed.
    Closed,
}

/// An in-memory recording destination.
///
/// Suitable for unit tests, integration tests, and ephemeral deployments
/// that do not need persistence. Connect completion is synchronous by
/// default; with `deferred` set, the completion callback is held until
/// [`fire_connect`](Self::fire_connect), which tests use to drive the
/// connect signal by hand (including firing it more than once to model a
/// misbehaving backend).
pub struct MemoryDatabase {
    deferred: bool,
    fail_on_close: bool,
    state: Mutex<DbState>,
    pending: Mutex<Option<ConnectCallback>>,
    records: Mutex<Vec<(String, Value)>>,
    init_nodes: Mutex<Vec<String>>,
}

impl MemoryDatabase {
    /// Creates a database that completes its connect synchronously.
    #[must_use]
    pub fn new() -> Self {
        Self::with_behavior(false, false)
    }

    /// Creates a database with explicit connect/close behavior.
    #[must_use]
    pub fn with_behavior(deferred: bool, fail_on_close: bool) -> Self {
        Self {
            deferred,
            fail_on_close,
            state: Mutex::new(DbState::Created),
            pending: Mutex::new(None),
            records: Mutex::new(Vec::new()),
            init_nodes: Mutex::new(Vec::new()),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> DbState {
        *self.state.lock()
    }

    /// Signals connect completion for a deferred database.
    ///
    /// May be called repeatedly; the provider's one-shot guard is what
    /// keeps extension initialization single-fire, not this backend.
    pub fn fire_connect(&self) {
        let pending = self.pending.lock();
        if let Some(callback) = pending.as_ref() {
            *self.state.lock() = DbState::Connected;
            callback();
        }
    }

    /// Appends a value sample for a watched path.
    pub fn write(&self, path: impl Into<String>, value: Value) {
        self.records.lock().push((path.into(), value));
    }

    /// All samples written so far.
    pub fn records(&self) -> Vec<(String, Value)> {
        self.records.lock().clone()
    }

    /// Paths of the nodes this database initialized extensions under.
    pub fn initialized_under(&self) -> Vec<String> {
        self.init_nodes.lock().clone()
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl Database for MemoryDatabase {
    fn connect(&self, on_connected: ConnectCallback) {
        {
            let mut state = self.state.lock();
            if *state == DbState::Created {
                *state = DbState::Connecting;
            }
        }
        if self.deferred {
            *self.pending.lock() = Some(on_connected);
        } else {
            *self.state.lock() = DbState::Connected;
            on_connected();
        }
    }

    fn init_extensions(&self, node: &Arc<Node>) {
        debug!(path = %node.path(), "initializing extensions");
        node.set_config("extensions", Value::Bool(true));
        self.init_nodes.lock().push(node.path());
    }

    fn close(&self) -> Result<(), BackendError> {
        if self.fail_on_close {
            return Err(BackendError::new("memory database configured to fail close"));
        }
        *self.state.lock() = DbState::Closed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use histree_core::NodeTree;

    #[test]
    fn synchronous_connect() {
        let db = MemoryDatabase::new();
        assert_eq!(db.state(), DbState::Created);
        db.connect(Box::new(|| {}));
        assert_eq!(db.state(), DbState::Connected);
    }

    #[test]
    fn deferred_connect_waits_for_fire() {
        let db = MemoryDatabase::with_behavior(true, false);
        db.connect(Box::new(|| {}));
        assert_eq!(db.state(), DbState::Connecting);
        db.fire_connect();
        assert_eq!(db.state(), DbState::Connected);
    }

    #[test]
    fn close_failure_mode() {
        let db = MemoryDatabase::with_behavior(false, true);
        assert!(db.close().is_err());
        let db = MemoryDatabase::new();
        assert!(db.close().is_ok());
        assert_eq!(db.state(), DbState::Closed);
    }

    #[test]
    fn extensions_mark_the_node() {
        let tree = NodeTree::default();
        let node = tree.resolve("/history/db1", true).unwrap().into_node();
        let db = MemoryDatabase::new();
        db.init_extensions(&node);
        assert_eq!(node.config("extensions"), Some(Value::Bool(true)));
        assert_eq!(db.initialized_under(), vec!["/history/db1"]);
    }

    #[test]
    fn records_accumulate() {
        let db = MemoryDatabase::new();
        db.write("/a/b", Value::Int(1));
        db.write("/a/b", Value::Int(2));
        assert_eq!(db.records().len(), 2);
    }
}
