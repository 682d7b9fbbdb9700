//! The consumed subscription-delivery interface.

/// The external channel that delivers value-change notifications.
///
/// Only the registration contract is consumed here; delivery itself is
/// the transport's concern. Calls are fire-and-forget and assumed
/// non-blocking; idempotence of repeated registration is the watch
/// group's responsibility, not the channel's.
pub trait SubscriptionChannel: Send + Sync {
    /// Registers interest in value changes under `path`.
    fn subscribe(&self, path: &str);

    /// Deregisters interest in `path`.
    fn unsubscribe(&self, path: &str);
}
