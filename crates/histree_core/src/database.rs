//! The opaque storage backend handle.

use crate::node::Node;
use std::sync::Arc;
use thiserror::Error;

/// Completion callback handed to [`Database::connect`].
///
/// Backends are expected to signal completion exactly once, but the
/// provider does not trust that: the callback it supplies carries its own
/// one-shot guard, so a backend that (incorrectly) fires repeatedly still
/// triggers extension initialization only once.
pub type ConnectCallback = Box<dyn Fn() + Send + Sync>;

/// A backend lifecycle failure.
///
/// Surfaced by [`Database::close`]; during database deletion it is logged
/// and swallowed so teardown always completes.
#[derive(Debug, Error)]
#[error("backend error: {message}")]
pub struct BackendError {
    /// Description of the failure.
    pub message: String,
}

impl BackendError {
    /// Creates a backend error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// An opaque, caller-supplied storage backend bound 1:1 to a `db`-marked
/// node.
///
/// Lifecycle: constructed, asynchronously connecting, connected (with
/// extensions initialized), closed. The handle lives in the node's
/// metadata slot for as long as the node exists.
pub trait Database: Send + Sync {
    /// Begins an asynchronous connect.
    ///
    /// Fire-and-forget: this layer applies no timeout or retry. The
    /// backend invokes `on_connected` when the connection is ready; a
    /// backend that never calls back leaves the node in the connecting
    /// state indefinitely.
    fn connect(&self, on_connected: ConnectCallback);

    /// Initializes backend-specific sub-resources under the database node.
    ///
    /// Runs exactly once per creation, after the connect completes.
    fn init_extensions(&self, node: &Arc<Node>);

    /// Closes the backend.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the backend cannot shut down cleanly.
    fn close(&self) -> Result<(), BackendError>;
}
