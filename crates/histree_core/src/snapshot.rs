//! Subtree persistence snapshots.
//!
//! A snapshot mirrors a subtree's structure and configuration so the
//! surrounding system can round-trip it through its own serialization.
//! The read-only `db`/`wg` markers ride along, which is what lets
//! [`Provider::create_and_init_db`](crate::Provider::create_and_init_db)
//! rehydrate previously configured watch groups after a restart without
//! replaying creation calls. Live resources (metadata, actions) are not
//! part of a snapshot; nodes marked non-serializable (action nodes) are
//! skipped entirely.

use crate::error::CoreResult;
use crate::node::Node;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A serializable mirror of one node and its serializable descendants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Node name. Empty only when snapshotting the super-root.
    pub name: String,
    /// Profile tag.
    pub profile: String,
    /// Configuration entries.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, Value>,
    /// Read-only configuration entries (`db`, `wg`, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ro_config: BTreeMap<String, Value>,
    /// Current value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Serializable children, in name order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

impl Node {
    /// Captures this node and its serializable descendants.
    pub fn snapshot(&self) -> NodeSnapshot {
        let (config, ro_config) = self.config_maps();
        let children = self
            .children()
            .into_iter()
            .filter(|child| child.is_serializable())
            .map(|child| child.snapshot())
            .collect();
        NodeSnapshot {
            name: self.name().to_string(),
            profile: self.profile().to_string(),
            config,
            ro_config,
            value: self.value(),
            children,
        }
    }

    /// Recreates a snapshot as a child subtree of this node.
    ///
    /// Existing nodes of the same names are reused and their settings
    /// overwritten, so restoring over a partially built tree converges.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidName`](crate::CoreError::InvalidName)
    /// if a snapshot carries a name the name-check rule rejects.
    pub fn restore_child(self: &Arc<Self>, snapshot: &NodeSnapshot) -> CoreResult<Arc<Node>> {
        let node = self.create_child(&snapshot.name, &snapshot.profile)?;
        for (key, value) in &snapshot.config {
            node.set_config(key.clone(), value.clone());
        }
        for (key, value) in &snapshot.ro_config {
            node.set_ro_config(key.clone(), value.clone());
        }
        node.set_value(snapshot.value.clone());
        for child in &snapshot.children {
            node.restore_child(child)?;
        }
        Ok(node)
    }
}
