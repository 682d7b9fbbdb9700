//! # HisTree Core
//!
//! A hierarchical, addressable namespace of nodes with a historian
//! subsystem layered on top: pluggable recording backends attach to
//! subtree roots, and watch groups fan subscriptions out to an external
//! monitoring channel so value changes are recorded durably.
//!
//! This crate provides:
//! - Path normalization and splitting ([`path`])
//! - The namespace tree: nodes, configuration, metadata slots ([`Node`])
//! - Path resolution with create-on-access and the `$`/`@` reference
//!   escape ([`NodeTree`])
//! - The backend lifecycle manager ([`Provider`]) and its extension
//!   seams ([`RecordingBackend`], [`Database`], [`SubscriptionChannel`])
//! - Watch groups and their subscription state machine ([`WatchGroup`])
//! - Subtree persistence snapshots ([`NodeSnapshot`])
//!
//! Out of scope, consumed as interfaces only: the wire protocol and
//! action-dispatch framework, permission checking, and the subscription
//! transport itself.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod action;
mod channel;
mod database;
mod error;
mod node;
pub mod path;
mod provider;
mod snapshot;
mod tree;
mod value;
mod watch;

pub use action::{Action, ActionHandler, Invocation, Parameter, Permission};
pub use channel::SubscriptionChannel;
pub use database::{BackendError, ConnectCallback, Database};
pub use error::{CoreError, CoreResult};
pub use node::{Node, NodeBuilder, NodeMetadata, DEFAULT_PROFILE};
pub use provider::{
    Provider, RecordingBackend, CREATE_DB_ACTION, CREATE_WATCH_GROUP_ACTION, DB_MARKER,
    DELETE_DB_ACTION, WG_MARKER,
};
pub use snapshot::NodeSnapshot;
pub use tree::{NodePair, NodeTree};
pub use value::Value;
pub use watch::{WatchGroup, WatchState};
