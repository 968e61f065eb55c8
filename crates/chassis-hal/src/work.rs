//! Deferred-work scheduling.
//!
//! Callbacks run off the caller's context on the tokio executor after a
//! delay, so interrupt-like sample paths can enqueue work without blocking.
//! Handles are cancellable; cancelling an already-fired or already-cancelled
//! handle is a no-op.

use std::time::Duration;

use tokio::task::JoinHandle;

/// Handle to a scheduled callback.
///
/// Dropping the handle detaches the callback (it still runs); only
/// [`WorkHandle::cancel`] prevents it.
#[derive(Debug)]
pub struct WorkHandle {
    task: JoinHandle<()>,
}

impl WorkHandle {
    /// Cancels the callback if it has not run yet. Idempotent.
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// True once the callback has run or been cancelled.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Schedules `f` to run after `delay`.
///
/// Must be called from within a tokio runtime. The callback may block
/// briefly (e.g. on a rail driver) but must not wait unboundedly.
pub fn schedule<F>(delay: Duration, f: F) -> WorkHandle
where
    F: FnOnce() + Send + 'static,
{
    let task = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        f();
    });
    WorkHandle { task }
}
