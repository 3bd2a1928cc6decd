//! Bounded backend calls.
//!
//! Every backend call runs as its own future raced against a timer and the
//! run's [`CancellationToken`]. Whichever finishes first decides the
//! outcome; the losers are dropped, which cancels an in-flight request.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{BackendCall, ReportError, ReportResult};

/// Per-call deadline used when none is configured.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Run `fut` until it completes, `timeout` elapses, or `cancel` fires.
pub async fn race<F, T>(
    call: BackendCall,
    timeout: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> ReportResult<T>
where
    F: Future<Output = T>,
{
    tokio::select! {
        // Cancellation is checked first so an already-cancelled run never
        // issues the call.
        biased;
        _ = cancel.cancelled() => Err(ReportError::Cancelled { call }),
        out = fut => Ok(out),
        _ = tokio::time::sleep(timeout) => Err(ReportError::Timeout { call, after: timeout }),
    }
}

/// Run `fut` until it completes or `cancel` fires.
pub async fn until_cancelled<F, T>(
    call: BackendCall,
    cancel: &CancellationToken,
    fut: F,
) -> ReportResult<T>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ReportError::Cancelled { call }),
        out = fut => Ok(out),
    }
}
