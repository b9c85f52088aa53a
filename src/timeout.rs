//! Response deadlines.
//!
//! A [`Deadline`] is armed when a request is built and disarmed when the
//! response head arrives. The engine races it against the transport.

use core::time::Duration;

use tokio::time::{Instant, sleep_until};

/// Deadline for the arrival of a response.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    /// Arm a deadline `limit` from now; `None` never expires.
    #[must_use]
    pub fn arm(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    /// Time since the deadline was armed.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Resolve once the deadline passes; pending forever when unset.
    pub async fn expired(&self) {
        match self.limit {
            Some(limit) => sleep_until(self.started + limit).await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{future::Either, pin_mut};

    async fn slow(delay: Duration) -> &'static str {
        tokio::time::sleep(delay).await;
        "done"
    }

    #[tokio::test]
    async fn completes_before_deadline() {
        let deadline = Deadline::arm(Some(Duration::from_millis(50)));
        let work = slow(Duration::from_millis(5));
        let expired = deadline.expired();
        pin_mut!(work);
        pin_mut!(expired);
        match futures_util::future::select(work, expired).await {
            Either::Left((value, _)) => assert_eq!(value, "done"),
            Either::Right(((), _)) => panic!("deadline fired first"),
        }
    }

    #[tokio::test]
    async fn fires_after_limit() {
        let deadline = Deadline::arm(Some(Duration::from_millis(5)));
        let work = slow(Duration::from_millis(200));
        let expired = deadline.expired();
        pin_mut!(work);
        pin_mut!(expired);
        assert!(matches!(
            futures_util::future::select(work, expired).await,
            Either::Right(_)
        ));
        assert!(deadline.elapsed() >= Duration::from_millis(5));
    }

    #[tokio::test]
    async fn unset_deadline_never_fires() {
        let deadline = Deadline::arm(None);
        let work = slow(Duration::from_millis(5));
        let expired = deadline.expired();
        pin_mut!(work);
        pin_mut!(expired);
        assert!(matches!(
            futures_util::future::select(work, expired).await,
            Either::Left(_)
        ));
    }
}
