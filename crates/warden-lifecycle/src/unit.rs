//! The managed unit contract.

use async_trait::async_trait;

/// A component whose startup, reload and shutdown are orchestrated by a
/// [`Coordinator`](crate::Coordinator).
///
/// Both methods are called at most once at a time: the coordinator never
/// overlaps two invocations. Neither returns an error. A unit that can fail
/// is expected to log and recover on its own, since the coordinator has no
/// domain knowledge to act on a failure and does not retry.
#[async_trait]
pub trait ManagedUnit: Send + Sync {
    /// Build up runtime state.
    ///
    /// `startup` is `true` for the initial build performed by `begin()` and
    /// `false` for the rebuild half of a reload. Must not block indefinitely.
    async fn build_up(&self, startup: bool);

    /// Tear down runtime state.
    ///
    /// `stopping` is `true` for the final teardown and `false` for the
    /// teardown half of a reload.
    async fn tear_down(&self, stopping: bool);
}
