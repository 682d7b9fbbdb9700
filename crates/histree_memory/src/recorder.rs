//! In-memory implementation of the recording backend extension points.

use crate::database::MemoryDatabase;
use histree_core::{
    Action, Database, Node, Parameter, Permission, Provider, RecordingBackend,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// A [`RecordingBackend`] that mints [`MemoryDatabase`] instances.
///
/// Every database it creates shares the recorder's configured connect and
/// close behavior, and is retained so tests can reach the concrete
/// handles behind the provider's `Arc<dyn Database>` view.
pub struct MemoryRecorder {
    deferred_connect: bool,
    fail_on_close: bool,
    databases: Mutex<Vec<Arc<MemoryDatabase>>>,
}

impl MemoryRecorder {
    /// Creates a recorder whose databases connect synchronously and close
    /// cleanly.
    #[must_use]
    pub fn new() -> Self {
        Self {
            deferred_connect: false,
            fail_on_close: false,
            databases: Mutex::new(Vec::new()),
        }
    }

    /// Defers connect completion until `MemoryDatabase::fire_connect`.
    #[must_use]
    pub fn with_deferred_connect(mut self, deferred: bool) -> Self {
        self.deferred_connect = deferred;
        self
    }

    /// Makes every created database fail its close.
    #[must_use]
    pub fn with_fail_on_close(mut self, fail: bool) -> Self {
        self.fail_on_close = fail;
        self
    }

    /// Concrete handles of all databases created so far.
    pub fn databases(&self) -> Vec<Arc<MemoryDatabase>> {
        self.databases.lock().clone()
    }
}

impl Default for MemoryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend for MemoryRecorder {
    fn create_db_action(&self, provider: &Provider) -> Action {
        let provider = provider.clone();
        Action::new(
            self.permission(),
            Box::new(move |inv| {
                let name = inv.require_str("Name")?;
                let node = provider.create_db_node(name, inv)?.build();
                provider.create_and_init_db(&node)?;
                Ok(())
            }),
        )
        .with_parameter(Parameter::new("Name").with_description("Name of the database to create"))
    }

    fn create_db(&self, _node: &Arc<Node>) -> Arc<dyn Database> {
        let db = Arc::new(MemoryDatabase::with_behavior(
            self.deferred_connect,
            self.fail_on_close,
        ));
        self.databases.lock().push(Arc::clone(&db));
        db
    }

    fn permission(&self) -> Permission {
        Permission::Config
    }
}
