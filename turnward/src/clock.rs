//! Monotonic time source.
//!
//! Every timeout comparison in the runtime reads the time through a
//! [`Clock`]. [`TokioClock`] follows tokio's clock, so a paused test
//! runtime controls it with `tokio::time::advance`.

use tokio::time::Instant;

/// Monotonic time source.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// [`Clock`] backed by `tokio::time::Instant::now`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn tokio_clock_follows_paused_time() {
        let clock = TokioClock;
        let before = clock.now();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(clock.now().duration_since(before), Duration::from_secs(3));
    }
}
