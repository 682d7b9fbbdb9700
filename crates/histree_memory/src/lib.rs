//! # HisTree Memory
//!
//! In-memory implementations of HisTree's pluggable seams.
//!
//! This crate provides:
//! - [`MemoryDatabase`] - an in-memory recording destination
//! - [`MemoryRecorder`] - the backend extension points minting them
//! - [`RecordingChannel`] - a subscription channel that logs registrations
//!
//! Suitable for unit and integration tests and for ephemeral deployments
//! that do not need persistence.
//!
//! ## Example
//!
//! ```rust
//! use histree_core::{NodeTree, Provider};
//! use histree_memory::{MemoryRecorder, RecordingChannel};
//! use std::sync::Arc;
//!
//! let tree = NodeTree::default();
//! let provider = Provider::new(
//!     Arc::new(MemoryRecorder::new()),
//!     Arc::new(RecordingChannel::new()),
//! );
//! let node = tree.resolve("/history/db1", true).unwrap().into_node();
//! provider.create_and_init_db(&node).unwrap();
//! provider.create_watch_group(&node, "floor1").unwrap();
//! provider.subscribe_all(tree.resolve("/history", false).unwrap().node());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod channel;
mod database;
mod recorder;

pub use channel::{ChannelEvent, RecordingChannel};
pub use database::{DbState, MemoryDatabase};
pub use recorder::MemoryRecorder;
