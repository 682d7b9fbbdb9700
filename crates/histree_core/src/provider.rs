//! The recording provider: pluggable-backend lifecycle management.
//!
//! A [`Provider`] pairs a [`RecordingBackend`] (the backend-specific
//! extension points) with the external [`SubscriptionChannel`] and drives
//! the database node lifecycle: creation, asynchronous connect with a
//! one-shot extension hook, action registration, watch-group rehydration,
//! subscription fan-out, and best-effort teardown.

use crate::action::{Action, Invocation, Parameter, Permission};
use crate::channel::SubscriptionChannel;
use crate::database::Database;
use crate::error::{CoreError, CoreResult};
use crate::node::{Node, NodeBuilder, NodeMetadata};
use crate::value::Value;
use crate::watch::WatchGroup;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Read-only marker set on nodes hosting a recording backend.
pub const DB_MARKER: &str = "db";

/// Read-only marker set on nodes hosting a watch group.
pub const WG_MARKER: &str = "wg";

/// Name of the per-database "create watch group" action node.
pub const CREATE_WATCH_GROUP_ACTION: &str = "createWatchGroup";

/// Name of the per-database "delete database" action node.
pub const DELETE_DB_ACTION: &str = "deleteDb";

/// Name of the "create database" action node.
pub const CREATE_DB_ACTION: &str = "createDb";

/// Backend-specific extension points a storage implementation supplies.
///
/// The fourth extension point of the lifecycle, post-connect
/// initialization, lives on [`Database::init_extensions`].
pub trait RecordingBackend: Send + Sync {
    /// Builds the "create database" action descriptor.
    ///
    /// The handler is expected to read its settings parameters, call
    /// [`Provider::create_db_node`], finish configuring the returned
    /// builder, and commit it through [`Provider::create_and_init_db`].
    fn create_db_action(&self, provider: &Provider) -> Action;

    /// Produces a backend handle for a node carrying initialized
    /// connection settings.
    fn create_db(&self, node: &Arc<Node>) -> Arc<dyn Database>;

    /// Permission level required for all database and watch-group
    /// mutations.
    fn permission(&self) -> Permission;
}

/// Lifecycle manager binding a [`RecordingBackend`] to the subscription
/// channel.
///
/// Cloning is cheap (shared handles) and is how action closures capture
/// the provider.
#[derive(Clone)]
pub struct Provider {
    backend: Arc<dyn RecordingBackend>,
    channel: Arc<dyn SubscriptionChannel>,
}

impl Provider {
    /// Creates a provider.
    pub fn new(backend: Arc<dyn RecordingBackend>, channel: Arc<dyn SubscriptionChannel>) -> Self {
        Self { backend, channel }
    }

    /// The backend extension points.
    pub fn backend(&self) -> &Arc<dyn RecordingBackend> {
        &self.backend
    }

    /// The subscription channel.
    pub fn channel(&self) -> &Arc<dyn SubscriptionChannel> {
        &self.channel
    }

    /// Registers the backend's "create database" action under `node`.
    ///
    /// # Errors
    ///
    /// Propagates name validation failure from the builder.
    pub fn register_create_db_action(&self, node: &Arc<Node>) -> CoreResult<()> {
        let action = self.backend.create_db_action(self);
        node.build_child(CREATE_DB_ACTION)?
            .serializable(false)
            .action(action)
            .build();
        Ok(())
    }

    /// Prepares an unbuilt database node.
    ///
    /// The parent is the invoking action node's parent. The caller
    /// finishes configuring the builder (connection settings onto the
    /// node configurations) before committing it via
    /// [`create_and_init_db`](Self::create_and_init_db).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyExists`] if a child of that name
    /// already exists; nothing is mutated in that case.
    pub fn create_db_node(&self, name: &str, invocation: &Invocation) -> CoreResult<NodeBuilder> {
        let parent = invocation
            .node()
            .parent()
            .ok_or_else(|| CoreError::no_such_path(invocation.node().path()))?;
        if parent.has_child(name) {
            return Err(CoreError::already_exists(name));
        }
        NodeBuilder::new(&parent, name)
    }

    /// Marks `node` as a database node, connects a backend to it, and
    /// wires up its lifecycle.
    ///
    /// Sets the `db` marker, attaches the backend handle as node
    /// metadata, starts the fire-and-forget connect (the extension hook
    /// is guarded to run exactly once even if the backend signals
    /// completion repeatedly), registers the per-database actions, and
    /// rehydrates every existing `wg`-marked child into a live watch
    /// group — which is what resumes a previously configured recording
    /// subtree across a restart without re-issuing creation calls.
    ///
    /// # Errors
    ///
    /// Propagates name validation failure from action registration.
    pub fn create_and_init_db(&self, node: &Arc<Node>) -> CoreResult<Arc<dyn Database>> {
        node.set_ro_config(DB_MARKER, Value::Bool(true));
        let db = self.backend.create_db(node);
        node.set_metadata(NodeMetadata::Database(Arc::clone(&db)));

        let fired = AtomicBool::new(false);
        let hook_db = Arc::clone(&db);
        let hook_node = Arc::clone(node);
        db.connect(Box::new(move || {
            // Backends may (incorrectly) signal completion more than once.
            if !fired.swap(true, Ordering::SeqCst) {
                hook_db.init_extensions(&hook_node);
            }
        }));

        self.register_create_watch_group_action(node)?;
        self.register_delete_action(node)?;

        for child in node.children() {
            if child.has_marker(WG_MARKER) {
                debug!(path = %child.path(), "rehydrating watch group");
                self.init_watch_group(&child, &db);
            }
        }
        debug!(path = %node.path(), "database created");
        Ok(db)
    }

    /// Creates a `wg`-marked child of `db_node` and binds a live watch
    /// group to the node's attached database.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoDatabase`] if `db_node` carries no database
    /// metadata, or [`CoreError::InvalidName`] for a bad name.
    pub fn create_watch_group(
        &self,
        db_node: &Arc<Node>,
        name: &str,
    ) -> CoreResult<Arc<WatchGroup>> {
        let db = db_node
            .metadata()
            .database()
            .ok_or_else(|| CoreError::no_database(db_node.path()))?;
        let node = NodeBuilder::new(db_node, name)?
            .ro_config(WG_MARKER, Value::Bool(true))
            .build();
        Ok(self.init_watch_group(&node, &db))
    }

    /// Subscription fan-out over a subtree root.
    ///
    /// Walks every child of `node` carrying the `db` marker, then every
    /// grandchild of those carrying the `wg` marker, and subscribes each
    /// attached watch group. Invoked once the external channel becomes
    /// ready; mutates nothing and is safe to call repeatedly. A removal
    /// racing the walk is tolerated: that group simply misses (or has
    /// already terminally refused) the subscribe.
    pub fn subscribe_all(&self, node: &Arc<Node>) {
        debug!(path = %node.path(), "fanning out subscriptions");
        for child in node.children() {
            if !child.has_marker(DB_MARKER) {
                continue;
            }
            for grandchild in child.children() {
                if !grandchild.has_marker(WG_MARKER) {
                    continue;
                }
                if let Some(group) = grandchild.metadata().watch() {
                    group.subscribe();
                }
            }
        }
    }

    /// Tears down a database node: best-effort backend close, detach from
    /// the parent, and unsubscription of every contained watch group.
    ///
    /// A close failure is logged and swallowed; removal and
    /// unsubscription always complete.
    pub fn delete_db(&self, node: &Arc<Node>) {
        let path = node.path();
        if let Some(db) = node.metadata().database() {
            if let Err(err) = db.close() {
                warn!(path = %path, error = %err, "backend close failed; continuing teardown");
            }
        }
        if let Some(parent) = node.parent() {
            parent.remove_child(node.name());
        }
        for child in node.children() {
            if let Some(group) = child.metadata().watch() {
                group.unsubscribe();
            }
        }
        debug!(path = %path, "database deleted");
    }

    fn init_watch_group(&self, node: &Arc<Node>, db: &Arc<dyn Database>) -> Arc<WatchGroup> {
        let group = Arc::new(WatchGroup::new(
            self.backend.permission(),
            node,
            db,
            &self.channel,
        ));
        node.set_metadata(NodeMetadata::Watch(Arc::clone(&group)));
        group.init_settings();
        group
    }

    fn register_create_watch_group_action(&self, node: &Arc<Node>) -> CoreResult<()> {
        let provider = self.clone();
        let action = Action::new(
            self.backend.permission(),
            Box::new(move |inv| {
                let name = inv.require_str("Name")?;
                let db_node = inv
                    .node()
                    .parent()
                    .ok_or_else(|| CoreError::no_such_path(inv.node().path()))?;
                provider.create_watch_group(&db_node, name)?;
                Ok(())
            }),
        )
        .with_parameter(
            Parameter::new("Name").with_description("The path to start watching and recording"),
        );
        node.build_child(CREATE_WATCH_GROUP_ACTION)?
            .serializable(false)
            .action(action)
            .build();
        Ok(())
    }

    fn register_delete_action(&self, node: &Arc<Node>) -> CoreResult<()> {
        let provider = self.clone();
        let action = Action::new(
            self.backend.permission(),
            Box::new(move |inv| {
                let db_node = inv
                    .node()
                    .parent()
                    .ok_or_else(|| CoreError::no_such_path(inv.node().path()))?;
                provider.delete_db(&db_node);
                Ok(())
            }),
        );
        node.build_child(DELETE_DB_ACTION)?
            .serializable(false)
            .action(action)
            .build();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{BackendError, ConnectCallback};
    use crate::tree::NodeTree;
    use crate::watch::WatchState;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    /// Connect behavior for the test backend.
    #[derive(Clone, Copy)]
    enum Connect {
        /// Signal completion once, synchronously.
        Once,
        /// Misbehave: signal completion three times.
        Thrice,
        /// Never signal completion.
        Never,
    }

    struct TestDb {
        connect: Connect,
        fail_close: bool,
        init_count: AtomicUsize,
        close_count: AtomicUsize,
    }

    impl TestDb {
        fn new(connect: Connect, fail_close: bool) -> Self {
            Self {
                connect,
                fail_close,
                init_count: AtomicUsize::new(0),
                close_count: AtomicUsize::new(0),
            }
        }
    }

    impl Database for TestDb {
        fn connect(&self, on_connected: ConnectCallback) {
            match self.connect {
                Connect::Once => on_connected(),
                Connect::Thrice => {
                    on_connected();
                    on_connected();
                    on_connected();
                }
                Connect::Never => {}
            }
        }

        fn init_extensions(&self, _node: &Arc<Node>) {
            self.init_count.fetch_add(1, Ordering::SeqCst);
        }

        fn close(&self) -> Result<(), BackendError> {
            self.close_count.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                Err(BackendError::new("simulated close failure"))
            } else {
                Ok(())
            }
        }
    }

    struct TestBackend {
        connect: Connect,
        fail_close: bool,
        databases: Mutex<Vec<Arc<TestDb>>>,
    }

    impl TestBackend {
        fn new(connect: Connect, fail_close: bool) -> Self {
            Self {
                connect,
                fail_close,
                databases: Mutex::new(Vec::new()),
            }
        }

        fn last_db(&self) -> Arc<TestDb> {
            Arc::clone(self.databases.lock().last().unwrap())
        }
    }

    impl RecordingBackend for TestBackend {
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
            .with_parameter(Parameter::new("Name").with_description("Database name"))
        }

        fn create_db(&self, _node: &Arc<Node>) -> Arc<dyn Database> {
            let db = Arc::new(TestDb::new(self.connect, self.fail_close));
            self.databases.lock().push(Arc::clone(&db));
            db
        }

        fn permission(&self) -> Permission {
            Permission::Config
        }
    }

    #[derive(Default)]
    struct TestChannel {
        subscribed: Mutex<Vec<String>>,
        unsubscribed: Mutex<Vec<String>>,
    }

    impl SubscriptionChannel for TestChannel {
        fn subscribe(&self, path: &str) {
            self.subscribed.lock().push(path.to_string());
        }
        fn unsubscribe(&self, path: &str) {
            self.unsubscribed.lock().push(path.to_string());
        }
    }

    struct Fixture {
        tree: NodeTree,
        provider: Provider,
        backend: Arc<TestBackend>,
        channel: Arc<TestChannel>,
    }

    fn fixture(connect: Connect, fail_close: bool) -> Fixture {
        let backend = Arc::new(TestBackend::new(connect, fail_close));
        let channel = Arc::new(TestChannel::default());
        let provider = Provider::new(
            Arc::clone(&backend) as Arc<dyn RecordingBackend>,
            Arc::clone(&channel) as Arc<dyn SubscriptionChannel>,
        );
        Fixture {
            tree: NodeTree::default(),
            provider,
            backend,
            channel,
        }
    }

    fn db_node(f: &Fixture, path: &str) -> Arc<Node> {
        f.tree.resolve(path, true).unwrap().into_node()
    }

    #[test]
    fn create_and_init_registers_actions_and_metadata() {
        let f = fixture(Connect::Once, false);
        let node = db_node(&f, "/history/db1");
        let db = f.provider.create_and_init_db(&node).unwrap();

        assert!(node.has_marker(DB_MARKER));
        assert!(node.metadata().database().is_some());
        assert!(Arc::ptr_eq(
            &db,
            &node.metadata().database().unwrap()
        ));
        let cwg = node.child(CREATE_WATCH_GROUP_ACTION).unwrap();
        assert!(!cwg.is_serializable());
        assert!(cwg.action().is_some());
        assert!(node.child(DELETE_DB_ACTION).unwrap().action().is_some());
        assert_eq!(f.backend.last_db().init_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn extension_hook_runs_exactly_once_despite_repeated_completion() {
        let f = fixture(Connect::Thrice, false);
        let node = db_node(&f, "/history/db1");
        f.provider.create_and_init_db(&node).unwrap();
        assert_eq!(f.backend.last_db().init_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn connect_that_never_completes_skips_extensions() {
        let f = fixture(Connect::Never, false);
        let node = db_node(&f, "/history/db1");
        f.provider.create_and_init_db(&node).unwrap();
        assert_eq!(f.backend.last_db().init_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn create_db_node_rejects_duplicates() {
        let f = fixture(Connect::Once, false);
        let root = db_node(&f, "/history");
        f.provider.register_create_db_action(&root).unwrap();
        let action_node = root.child(CREATE_DB_ACTION).unwrap();
        let inv = Invocation::new(&action_node);

        let builder = f.provider.create_db_node("db1", &inv).unwrap();
        builder.build();
        let before = root.child_count();
        assert!(matches!(
            f.provider.create_db_node("db1", &inv),
            Err(CoreError::AlreadyExists { .. })
        ));
        assert_eq!(root.child_count(), before);
    }

    #[test]
    fn create_db_action_drives_full_flow() {
        let f = fixture(Connect::Once, false);
        let root = db_node(&f, "/history");
        f.provider.register_create_db_action(&root).unwrap();
        let action_node = root.child(CREATE_DB_ACTION).unwrap();
        let action = action_node.action().unwrap();

        let inv = Invocation::new(&action_node).with_param("Name", Value::Str("db1".into()));
        action.invoke(&inv).unwrap();

        let db1 = root.child("db1").unwrap();
        assert!(db1.has_marker(DB_MARKER));
        assert!(db1.metadata().database().is_some());

        // Second invocation collides.
        assert!(matches!(
            action.invoke(&inv),
            Err(CoreError::AlreadyExists { .. })
        ));
        // Missing parameter fails loudly.
        assert!(matches!(
            action.invoke(&Invocation::new(&action_node)),
            Err(CoreError::MissingParameter { .. })
        ));
    }

    #[test]
    fn watch_group_creation_via_action() {
        let f = fixture(Connect::Once, false);
        let node = db_node(&f, "/history/db1");
        f.provider.create_and_init_db(&node).unwrap();

        let action_node = node.child(CREATE_WATCH_GROUP_ACTION).unwrap();
        let action = action_node.action().unwrap();
        let inv = Invocation::new(&action_node).with_param("Name", Value::Str("floor1".into()));
        action.invoke(&inv).unwrap();

        let wg_node = node.child("floor1").unwrap();
        assert!(wg_node.has_marker(WG_MARKER));
        let group = wg_node.metadata().watch().unwrap();
        assert_eq!(group.state(), WatchState::SettingsInitialized);
    }

    #[test]
    fn create_watch_group_without_database_fails() {
        let f = fixture(Connect::Once, false);
        let node = db_node(&f, "/history/plain");
        assert!(matches!(
            f.provider.create_watch_group(&node, "g"),
            Err(CoreError::NoDatabase { .. })
        ));
    }

    #[test]
    fn rehydration_from_persisted_markers() {
        let f = fixture(Connect::Once, false);
        let node = db_node(&f, "/history/db1");
        // Simulate children restored from persisted state before init.
        for name in ["g1", "g2"] {
            let child = node.create_child(name, "node").unwrap();
            child.set_ro_config(WG_MARKER, Value::Bool(true));
        }
        node.create_child("unrelated", "node").unwrap();

        f.provider.create_and_init_db(&node).unwrap();

        for name in ["g1", "g2"] {
            let group = node.child(name).unwrap().metadata().watch().unwrap();
            assert_eq!(group.state(), WatchState::SettingsInitialized);
        }
        assert!(node.child("unrelated").unwrap().metadata().is_none());
    }

    #[test]
    fn subscribe_all_fans_out_once_per_group() {
        let f = fixture(Connect::Once, false);
        let root = db_node(&f, "/history");
        for db_name in ["db1", "db2"] {
            let node = root.create_child(db_name, "node").unwrap();
            f.provider.create_and_init_db(&node).unwrap();
            for wg_name in ["g1", "g2"] {
                f.provider.create_watch_group(&node, wg_name).unwrap();
            }
        }

        f.provider.subscribe_all(&root);
        let mut paths = f.channel.subscribed.lock().clone();
        paths.sort();
        assert_eq!(
            paths,
            vec![
                "/history/db1/g1",
                "/history/db1/g2",
                "/history/db2/g1",
                "/history/db2/g2",
            ]
        );

        // Repeat fan-out: idempotent, no further channel calls.
        f.provider.subscribe_all(&root);
        assert_eq!(f.channel.subscribed.lock().len(), 4);
    }

    #[test]
    fn delete_unsubscribes_all_groups_even_when_close_fails() {
        let f = fixture(Connect::Once, true);
        let root = db_node(&f, "/history");
        let node = root.create_child("db1", "node").unwrap();
        f.provider.create_and_init_db(&node).unwrap();
        let groups: Vec<_> = (0..3)
            .map(|i| {
                f.provider
                    .create_watch_group(&node, &format!("g{i}"))
                    .unwrap()
            })
            .collect();
        f.provider.subscribe_all(&root);
        assert_eq!(f.channel.subscribed.lock().len(), 3);

        let action_node = node.child(DELETE_DB_ACTION).unwrap();
        let action = action_node.action().unwrap();
        action.invoke(&Invocation::new(&action_node)).unwrap();

        assert_eq!(f.backend.last_db().close_count.load(Ordering::SeqCst), 1);
        assert!(root.child("db1").is_none());
        for group in &groups {
            assert_eq!(group.state(), WatchState::Unsubscribed);
        }
        assert_eq!(f.channel.unsubscribed.lock().len(), 3);

        // Terminal: a later fan-out re-subscribes nothing.
        f.provider.subscribe_all(&root);
        assert_eq!(f.channel.subscribed.lock().len(), 3);
    }
}
