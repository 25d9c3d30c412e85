//! Wall-clock bounded polling
//!
//! Bridges the control plane's asynchronous reconciliation to callers that
//! need to block until a resource reaches some state.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::Error;

/// Poll until `poll_fn` reports a value or `timeout` expires.
///
/// `poll_fn` returns `Ok(Some(T))` when ready, `Ok(None)` to keep waiting, or
/// `Err` to abort the wait. The check always runs at least once; between
/// checks the task sleeps `poll_interval`, cut short so the final check lands
/// on the deadline. On expiry `on_timeout` builds the error from the elapsed
/// time.
pub async fn wait_for_resource<T, F, Fut, E>(
    description: &str,
    timeout: Duration,
    poll_interval: Duration,
    mut poll_fn: F,
    on_timeout: E,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, Error>>,
    E: FnOnce(Duration) -> Error,
{
    let start = Instant::now();

    loop {
        if let Some(value) = poll_fn().await? {
            return Ok(value);
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(on_timeout(elapsed));
        }

        trace!(description = %description, elapsed_ms = elapsed.as_millis() as u64, "Not ready yet");
        tokio::time::sleep(poll_interval.min(timeout - elapsed)).await;
    }
}
