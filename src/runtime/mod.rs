//! Thin async runtime layer.
//!
//! Every timer, task and monotonic clock reading in the driver goes through this
//! module so the engine runs against tokio's clock. Tests pause that clock
//! (`#[tokio::test(start_paused = true)]`) to drive debounce and registration
//! timing deterministically.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A measurement of monotonically increasing time.
pub use tokio::time::Instant;

// Async mutex re-export, for state held across awaits
pub use tokio::sync::Mutex as AsyncMutex;

/// Sleep for the specified duration.
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await
}

/// Sleep until the given instant; returns immediately if it already passed.
pub async fn sleep_until(deadline: Instant) {
    tokio::time::sleep_until(deadline).await
}

/// Run a future with a timeout.
///
/// Returns `Err(TimedOut)` if the timeout expires before the future completes.
pub async fn timeout<F, T>(duration: Duration, future: F) -> Result<T, TimedOut>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| TimedOut)
}

/// Error returned when a timeout expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedOut;

impl std::fmt::Display for TimedOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "operation timed out")
    }
}

impl std::error::Error for TimedOut {}

/// Spawn a background task that is aborted when the returned guard drops.
pub fn spawn<F>(future: F) -> TaskGuard
where
    F: Future<Output = ()> + Send + 'static,
{
    TaskGuard(tokio::spawn(future))
}

/// Spawn a background task that runs to completion on its own.
pub fn spawn_detached<F>(future: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    drop(tokio::spawn(future));
}

/// Owns a background task and aborts it on drop.
#[derive(Debug)]
pub struct TaskGuard(tokio::task::JoinHandle<()>);

impl TaskGuard {
    /// Abort the task.
    pub fn abort(&self) {
        self.0.abort();
    }

    /// Whether the task has completed (or was aborted).
    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Lock a std mutex, recovering the data if a previous holder panicked.
///
/// Critical sections in the driver never await, so a poisoned lock only means a
/// panic elsewhere; the guarded maps stay structurally valid.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
