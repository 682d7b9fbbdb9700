//! The namespace tree and path resolver.
//!
//! Create-on-access lets remote callers materialize namespace structure
//! purely by naming a path; the `$`/`@` reference escape lets the same
//! addressing scheme reach node-level properties without a second
//! protocol. Reference detection applies only to the final segment.

use crate::error::{CoreError, CoreResult};
use crate::node::Node;
use crate::path;
use std::sync::Arc;

/// The resolver's result: a concrete node plus an optional pending
/// reference name.
///
/// The reference is the final, unresolved `$`/`@` path segment: a property
/// access on the paired node, not a tree member. It is never created as a
/// child.
pub struct NodePair {
    node: Arc<Node>,
    reference: Option<String>,
}

impl NodePair {
    fn new(node: Arc<Node>, reference: Option<String>) -> Self {
        Self { node, reference }
    }

    /// The resolved node.
    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }

    /// The pending reference name, if the path ended in one.
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    /// Consumes the pair, returning the node.
    pub fn into_node(self) -> Arc<Node> {
        self.node
    }
}

/// Owns the super-root singleton and resolves paths against it.
///
/// One `NodeTree` exists per process, constructed at startup; every
/// resolution entry point takes it explicitly rather than reaching a
/// hidden global.
pub struct NodeTree {
    super_root: Arc<Node>,
    default_profile: String,
}

impl NodeTree {
    /// Creates a tree with the profile assigned to create-on-access nodes.
    pub fn new(default_profile: impl Into<String>) -> Self {
        Self {
            super_root: Node::super_root(),
            default_profile: default_profile.into(),
        }
    }

    /// The super-root node.
    pub fn root(&self) -> &Arc<Node> {
        &self.super_root
    }

    /// Creates a first-level namespace root.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidName`] if the name fails validation.
    pub fn create_root(&self, name: &str, profile: &str) -> CoreResult<Arc<Node>> {
        self.super_root.create_child(name, profile)
    }

    /// Lists the children of the node at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoSuchPath`] if the path does not resolve.
    pub fn children_of(&self, path: &str) -> CoreResult<Vec<Arc<Node>>> {
        Ok(self.resolve(path, false)?.node().children())
    }

    /// Resolves a path to a node, optionally creating missing segments.
    ///
    /// The literal root path resolves to the super-root. A sole reference
    /// segment resolves to `(super-root, reference)` without touching the
    /// tree. Otherwise the tree is walked segment by segment; in create
    /// mode each missing segment is created atomically under its parent
    /// (exactly-once per name under concurrency). A final `$`/`@` segment
    /// is returned as the pending reference, never created. An interior
    /// segment that happens to start with `$`/`@` is treated as an
    /// ordinary child name.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidPath`] for malformed path text.
    /// - [`CoreError::NoSuchPath`] when no node can be located and
    ///   `create` is false.
    /// - [`CoreError::InvalidName`] when create mode reaches a segment
    ///   that cannot be a node name (e.g. an interior reference).
    pub fn resolve(&self, path: &str, create: bool) -> CoreResult<NodePair> {
        if path == "/" {
            return Ok(NodePair::new(Arc::clone(&self.super_root), None));
        }
        let parts = path::split(path)?;
        if parts.len() == 1 && path::is_reference(&parts[0]) {
            let reference = parts.into_iter().next();
            return Ok(NodePair::new(Arc::clone(&self.super_root), reference));
        }

        let mut current = self.super_root.child(&parts[0]);
        if create && current.is_none() {
            current = Some(
                self.super_root
                    .create_child(&parts[0], &self.default_profile)?,
            );
        }
        for i in 1..parts.len() {
            let Some(node) = current.take() else {
                break;
            };
            if i + 1 == parts.len() && path::is_reference(&parts[i]) {
                return Ok(NodePair::new(node, Some(parts[i].clone())));
            }
            let mut next = node.child(&parts[i]);
            if create && next.is_none() {
                next = Some(node.create_child(&parts[i], &self.default_profile)?);
            }
            current = next;
        }
        match current {
            Some(node) => Ok(NodePair::new(node, None)),
            None => Err(CoreError::no_such_path(path)),
        }
    }
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new(crate::node::DEFAULT_PROFILE)
    }
}
