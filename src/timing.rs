//! Phase timing for the rebuild log.

use std::time::{Duration, Instant};

/// Measures one phase of a run and logs its duration when finished.
pub struct Timer {
    name: String,
    start: Instant,
}

impl Timer {
    pub fn start(name: &str) -> Self {
        tracing::debug!(phase = name, "phase started");
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }

    /// Log the elapsed time and return it.
    pub fn finish(self) -> Duration {
        let elapsed = self.start.elapsed();
        tracing::info!(phase = %self.name, elapsed = %format_duration(elapsed), "phase finished");
        elapsed
    }
}

/// Seconds below a minute, fractional minutes above.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs >= 60.0 {
        format!("{:.1}m", secs / 60.0)
    } else {
        format!("{:.1}s", secs)
    }
}
