//! Retry scheduling.

use core::time::Duration;

/// Wait before re-entering the build step of a retried request.
///
/// A zero delay only yields to the scheduler, so the retry runs on the next
/// tick; any other delay sleeps for that long.
pub async fn pause(delay: Duration) {
    if delay.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(delay).await;
    }
}
