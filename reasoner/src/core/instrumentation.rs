//! Wall-clock measurement of completion calls.

use std::time::{Duration, Instant};

/// Running total of measured call spans.
///
/// One span covers a whole call including its retries and backoff sleeps,
/// never a single attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatencyMeter {
    total: Duration,
    spans: u32,
}

impl LatencyMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f`, add its elapsed time to the total, and return both.
    pub fn measure<T>(&mut self, f: impl FnOnce() -> T) -> (T, Duration) {
        let start = Instant::now();
        let value = f();
        let elapsed = start.elapsed();
        self.record(elapsed);
        (value, elapsed)
    }

    pub fn record(&mut self, elapsed: Duration) {
        self.total += elapsed;
        self.spans += 1;
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    /// Number of spans recorded so far.
    pub fn spans(&self) -> u32 {
        self.spans
    }
}
