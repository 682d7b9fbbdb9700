//! Namespace nodes and the child builder.
//!
//! The tree is a rooted, acyclic, single-parent structure. Forward edges
//! (parent to child) are owning `Arc`s keyed by child name; the back edge
//! is a non-owning `Weak` so subtrees drop cleanly on removal.

use crate::action::Action;
use crate::database::Database;
use crate::error::{CoreError, CoreResult};
use crate::path::{self, SEPARATOR};
use crate::value::Value;
use crate::watch::WatchGroup;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Profile assigned to nodes when the caller supplies none.
pub const DEFAULT_PROFILE: &str = "node";

/// The resource attached to a node's metadata slot.
///
/// A node hosts at most one of a database handle or a watch group; the
/// `db`/`wg` read-only configuration markers must agree with the variant.
#[derive(Default, Clone)]
pub enum NodeMetadata {
    /// Plain namespace node, nothing attached.
    #[default]
    None,
    /// The node hosts a recording backend.
    Database(Arc<dyn Database>),
    /// The node hosts a watch group.
    Watch(Arc<WatchGroup>),
}

impl NodeMetadata {
    /// Returns the attached database handle, if any.
    pub fn database(&self) -> Option<Arc<dyn Database>> {
        match self {
            Self::Database(db) => Some(Arc::clone(db)),
            _ => None,
        }
    }

    /// Returns the attached watch group, if any.
    pub fn watch(&self) -> Option<Arc<WatchGroup>> {
        match self {
            Self::Watch(group) => Some(Arc::clone(group)),
            _ => None,
        }
    }

    /// Whether the slot is empty.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// A named vertex in the hierarchical namespace.
///
/// Nodes are shared (`Arc`) and internally locked; lookups, listings, and
/// mutations of the child mapping are safe under concurrent access. There
/// is no global tree lock: creation under a parent is serialized by that
/// parent's own child-map lock, so create-on-access is exactly-once per
/// (parent, name) pair.
pub struct Node {
    name: String,
    profile: String,
    parent: Weak<Node>,
    children: RwLock<BTreeMap<String, Arc<Node>>>,
    config: RwLock<BTreeMap<String, Value>>,
    ro_config: RwLock<BTreeMap<String, Value>>,
    value: RwLock<Option<Value>>,
    metadata: RwLock<NodeMetadata>,
    action: RwLock<Option<Arc<Action>>>,
    serializable: AtomicBool,
}

impl Node {
    /// Creates the super-root: the unnamed, parentless node whose children
    /// are the first-level namespace roots.
    pub(crate) fn super_root() -> Arc<Self> {
        Arc::new(Self::bare(String::new(), DEFAULT_PROFILE.to_string(), Weak::new()))
    }

    fn bare(name: String, profile: String, parent: Weak<Node>) -> Self {
        Self {
            name,
            profile,
            parent,
            children: RwLock::new(BTreeMap::new()),
            config: RwLock::new(BTreeMap::new()),
            ro_config: RwLock::new(BTreeMap::new()),
            value: RwLock::new(None),
            metadata: RwLock::new(NodeMetadata::None),
            action: RwLock::new(None),
            serializable: AtomicBool::new(true),
        }
    }

    /// Validates a prospective node name.
    ///
    /// Names must be non-empty, contain no `/`, and not begin with the
    /// reserved `$`/`@` reference prefixes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidName`] for a rejected name.
    pub fn check_name(name: &str) -> CoreResult<&str> {
        if path::is_valid_name(name) {
            Ok(name)
        } else {
            Err(CoreError::invalid_name(name))
        }
    }

    /// The node's name. Empty only on the super-root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The node's profile tag.
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// The parent node, if this is not the super-root and the parent is
    /// still alive.
    pub fn parent(&self) -> Option<Arc<Node>> {
        self.parent.upgrade()
    }

    /// Whether this node is the super-root.
    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }

    /// The node's resolved absolute path, `/` for the super-root.
    pub fn path(&self) -> String {
        if self.is_root() {
            return SEPARATOR.to_string();
        }
        let mut segments = vec![self.name.clone()];
        let mut cursor = self.parent();
        while let Some(node) = cursor {
            if !node.is_root() {
                segments.push(node.name.clone());
            }
            cursor = node.parent();
        }
        segments.reverse();
        let mut out = String::new();
        for segment in segments {
            out.push(SEPARATOR);
            out.push_str(&segment);
        }
        out
    }

    /// Looks up a direct child by name.
    pub fn child(&self, name: &str) -> Option<Arc<Node>> {
        self.children.read().get(name).cloned()
    }

    /// Whether a direct child of that name exists.
    pub fn has_child(&self, name: &str) -> bool {
        self.children.read().contains_key(name)
    }

    /// Snapshot of the current children.
    ///
    /// The returned list is consistent at the time of the call; concurrent
    /// removals may race with whatever the caller does with it afterwards.
    pub fn children(&self) -> Vec<Arc<Node>> {
        self.children.read().values().cloned().collect()
    }

    /// Number of direct children.
    pub fn child_count(&self) -> usize {
        self.children.read().len()
    }

    /// Creates a child, or returns the existing one of the same name.
    ///
    /// The check-and-create is atomic under the parent's child-map lock:
    /// of two concurrent callers racing on the same name, exactly one
    /// creates the node and the other observes and reuses it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidName`] if the name fails validation.
    pub fn create_child(self: &Arc<Self>, name: &str, profile: &str) -> CoreResult<Arc<Node>> {
        Self::check_name(name)?;
        Ok(self.insert_child(name, profile))
    }

    /// Inserts a pre-validated child name. Reuses an existing child.
    fn insert_child(self: &Arc<Self>, name: &str, profile: &str) -> Arc<Node> {
        let mut children = self.children.write();
        Arc::clone(children.entry(name.to_string()).or_insert_with(|| {
            Arc::new(Self::bare(
                name.to_string(),
                profile.to_string(),
                Arc::downgrade(self),
            ))
        }))
    }

    /// Starts building a child of this node.
    ///
    /// Nothing is committed to the tree until [`NodeBuilder::build`] runs.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidName`] if the name fails validation.
    pub fn build_child(self: &Arc<Self>, name: &str) -> CoreResult<NodeBuilder> {
        NodeBuilder::new(self, name)
    }

    /// Removes a direct child, detaching both directions.
    ///
    /// Returns the removed node, which the caller is expected to have
    /// already released resources for (or to do so with the returned
    /// handle).
    pub fn remove_child(&self, name: &str) -> Option<Arc<Node>> {
        self.children.write().remove(name)
    }

    /// Reads a configuration entry.
    pub fn config(&self, key: &str) -> Option<Value> {
        self.config.read().get(key).cloned()
    }

    /// Writes a configuration entry.
    pub fn set_config(&self, key: impl Into<String>, value: Value) {
        self.config.write().insert(key.into(), value);
    }

    /// Reads a read-only configuration entry (`db`, `wg`, ...).
    pub fn ro_config(&self, key: &str) -> Option<Value> {
        self.ro_config.read().get(key).cloned()
    }

    /// Writes a read-only configuration entry.
    ///
    /// "Read-only" means internal: these entries are set by the system,
    /// not by remote callers, and are persisted alongside ordinary
    /// configuration.
    pub fn set_ro_config(&self, key: impl Into<String>, value: Value) {
        self.ro_config.write().insert(key.into(), value);
    }

    /// Whether a read-only boolean marker is set true on this node.
    pub fn has_marker(&self, key: &str) -> bool {
        self.ro_config(key).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    /// The node's current value.
    pub fn value(&self) -> Option<Value> {
        self.value.read().clone()
    }

    /// Sets or clears the node's current value.
    pub fn set_value(&self, value: Option<Value>) {
        *self.value.write() = value;
    }

    /// The attached metadata resource.
    pub fn metadata(&self) -> NodeMetadata {
        self.metadata.read().clone()
    }

    /// Attaches a metadata resource.
    ///
    /// Callers must keep the `db`/`wg` marker in agreement with the
    /// variant they attach.
    pub fn set_metadata(&self, metadata: NodeMetadata) {
        *self.metadata.write() = metadata;
    }

    /// Clears the metadata slot.
    pub fn clear_metadata(&self) {
        *self.metadata.write() = NodeMetadata::None;
    }

    /// The action registered on this node, if any.
    pub fn action(&self) -> Option<Arc<Action>> {
        self.action.read().clone()
    }

    /// Registers an action on this node.
    pub fn set_action(&self, action: Action) {
        *self.action.write() = Some(Arc::new(action));
    }

    /// Whether the node participates in persistence snapshots.
    pub fn is_serializable(&self) -> bool {
        self.serializable.load(Ordering::Relaxed)
    }

    /// Marks the node as included in or excluded from snapshots.
    /// Action nodes are excluded.
    pub fn set_serializable(&self, serializable: bool) {
        self.serializable.store(serializable, Ordering::Relaxed);
    }

    /// Copies of this node's configuration maps, for snapshotting.
    pub(crate) fn config_maps(&self) -> (BTreeMap<String, Value>, BTreeMap<String, Value>) {
        (self.config.read().clone(), self.ro_config.read().clone())
    }
}

/// An incomplete child node.
///
/// Accumulates settings for a child that does not exist in the tree yet;
/// [`build`](Self::build) commits it. If a concurrent caller raced the
/// same name in, the existing child is reused and the settings applied to
/// it.
#[must_use]
pub struct NodeBuilder {
    parent: Arc<Node>,
    name: String,
    profile: Option<String>,
    config: Vec<(String, Value)>,
    ro_config: Vec<(String, Value)>,
    value: Option<Value>,
    serializable: Option<bool>,
    action: Option<Action>,
}

impl NodeBuilder {
    /// Starts a builder for a child of `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidName`] if the name fails validation.
    pub fn new(parent: &Arc<Node>, name: &str) -> CoreResult<Self> {
        Node::check_name(name)?;
        Ok(Self {
            parent: Arc::clone(parent),
            name: name.to_string(),
            profile: None,
            config: Vec::new(),
            ro_config: Vec::new(),
            value: None,
            serializable: None,
            action: None,
        })
    }

    /// Sets the profile tag.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Adds a configuration entry.
    pub fn config(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.push((key.into(), value));
        self
    }

    /// Adds a read-only configuration entry.
    pub fn ro_config(mut self, key: impl Into<String>, value: Value) -> Self {
        self.ro_config.push((key.into(), value));
        self
    }

    /// Sets the initial value.
    pub fn value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Marks the node as excluded from persistence snapshots.
    pub fn serializable(mut self, serializable: bool) -> Self {
        self.serializable = Some(serializable);
        self
    }

    /// Registers an action on the built node.
    pub fn action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    /// Commits the child to the tree and applies the accumulated settings.
    pub fn build(self) -> Arc<Node> {
        let profile = self.profile.as_deref().unwrap_or(DEFAULT_PROFILE);
        let node = self.parent.insert_child(&self.name, profile);
        for (key, value) in self.config {
            node.set_config(key, value);
        }
        for (key, value) in self.ro_config {
            node.set_ro_config(key, value);
        }
        if let Some(value) = self.value {
            node.set_value(Some(value));
        }
        if let Some(serializable) = self.serializable {
            node.set_serializable(serializable);
        }
        if let Some(action) = self.action {
            node.set_action(action);
        }
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_validation() {
        assert!(Node::check_name("a").is_ok());
        assert!(matches!(
            Node::check_name(""),
            Err(CoreError::InvalidName { .. })
        ));
        assert!(Node::check_name("$cfg").is_err());
        assert!(Node::check_name("@attr").is_err());
        assert!(Node::check_name("a/b").is_err());
    }

    #[test]
    fn create_child_is_exactly_once() {
        let root = Node::super_root();
        let a = root.create_child("a", "node").unwrap();
        let again = root.create_child("a", "other").unwrap();
        assert!(Arc::ptr_eq(&a, &again));
        assert_eq!(again.profile(), "node");
        assert_eq!(root.child_count(), 1);
    }

    #[test]
    fn parent_back_reference() {
        let root = Node::super_root();
        let a = root.create_child("a", "node").unwrap();
        let b = a.create_child("b", "node").unwrap();
        assert!(Arc::ptr_eq(&b.parent().unwrap(), &a));
        assert!(root.parent().is_none());
        assert_eq!(b.path(), "/a/b");
        assert_eq!(root.path(), "/");
    }

    #[test]
    fn remove_child_detaches() {
        let root = Node::super_root();
        root.create_child("a", "node").unwrap();
        let removed = root.remove_child("a").unwrap();
        assert_eq!(removed.name(), "a");
        assert!(root.child("a").is_none());
        assert!(root.remove_child("a").is_none());
    }

    #[test]
    fn markers() {
        let root = Node::super_root();
        let node = root.create_child("db1", "node").unwrap();
        assert!(!node.has_marker("db"));
        node.set_ro_config("db", Value::Bool(true));
        assert!(node.has_marker("db"));
        node.set_ro_config("db", Value::Bool(false));
        assert!(!node.has_marker("db"));
    }

    #[test]
    fn builder_applies_settings() {
        let root = Node::super_root();
        let node = root
            .build_child("sensor")
            .unwrap()
            .profile("point")
            .ro_config("wg", Value::Bool(true))
            .value(Value::Int(3))
            .serializable(false)
            .build();
        assert_eq!(node.profile(), "point");
        assert!(node.has_marker("wg"));
        assert_eq!(node.value(), Some(Value::Int(3)));
        assert!(!node.is_serializable());
        assert!(root.has_child("sensor"));
    }

    #[test]
    fn builder_reuses_raced_child() {
        let root = Node::super_root();
        let builder = root.build_child("x").unwrap();
        let raced = root.create_child("x", "node").unwrap();
        let built = builder.build();
        assert!(Arc::ptr_eq(&raced, &built));
    }
}
