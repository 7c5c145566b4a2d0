/// Performance measurement utilities
/// Stages are timed through `tracing` so the subscriber decides what is shown
pub mod profiling;

pub use profiling::{CounterSnapshot, FunctionCounters, FUNCTION_COUNTERS};

use std::time::{Duration, Instant};

/// Scope timer: logs its lifetime at `debug` level when dropped.
pub struct PerfTimer {
    name: &'static str,
    start: Instant,
}

impl PerfTimer {
    #[inline]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for PerfTimer {
    fn drop(&mut self) {
        tracing::debug!(
            stage = self.name,
            elapsed_us = self.elapsed().as_micros() as u64,
            "stage finished"
        );
    }
}

/// Rolling frame-time statistics for the interactive loop.
#[derive(Debug, Default, Clone)]
pub struct FrameStats {
    frames: u64,
    total: Duration,
    worst: Duration,
}

impl FrameStats {
    pub fn record(&mut self, frame_time: Duration) {
        self.frames += 1;
        self.total += frame_time;
        self.worst = self.worst.max(frame_time);
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn average(&self) -> Duration {
        if self.frames == 0 {
            Duration::ZERO
        } else {
            self.total / self.frames as u32
        }
    }

    pub fn fps(&self) -> f64 {
        let avg = self.average().as_secs_f64();
        if avg > 0.0 {
            1.0 / avg
        } else {
            0.0
        }
    }

    /// Log the window and start a new one.
    pub fn flush(&mut self) {
        if self.frames > 0 {
            tracing::info!(
                frames = self.frames,
                avg_ms = self.average().as_secs_f64() * 1000.0,
                worst_ms = self.worst.as_secs_f64() * 1000.0,
                fps = self.fps(),
                "frame timing"
            );
        }
        *self = Self::default();
    }
}

/// Time the rest of the enclosing scope.
#[macro_export]
macro_rules! perf_scope {
    ($name:expr) => {
        let _timer = $crate::perf::PerfTimer::new($name);
    };
}
