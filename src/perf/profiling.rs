/// Call and fragment counters for the raster pipeline.
///
/// Increments go through [`count_call!`](crate::count_call) and
/// [`count_add!`](crate::count_add), which compile to nothing unless the
/// `profiling` feature is enabled.
use std::sync::atomic::{AtomicU64, Ordering};

/// Global pipeline counters, relaxed atomics updated from every worker.
pub struct FunctionCounters {
    // Triangle stage
    pub triangles_submitted: AtomicU64,
    pub triangles_culled: AtomicU64,
    pub triangles_clipped: AtomicU64,
    pub triangles_rejected_coarse: AtomicU64,
    pub triangles_rasterized: AtomicU64,

    // Fragment stage
    pub fragments_tested: AtomicU64,
    pub fragments_passed: AtomicU64,

    pub frame_clears: AtomicU64,
}

impl FunctionCounters {
    pub const fn new() -> Self {
        Self {
            triangles_submitted: AtomicU64::new(0),
            triangles_culled: AtomicU64::new(0),
            triangles_clipped: AtomicU64::new(0),
            triangles_rejected_coarse: AtomicU64::new(0),
            triangles_rasterized: AtomicU64::new(0),
            fragments_tested: AtomicU64::new(0),
            fragments_passed: AtomicU64::new(0),
            frame_clears: AtomicU64::new(0),
        }
    }

    fn all(&self) -> [&AtomicU64; 8] {
        [
            &self.triangles_submitted,
            &self.triangles_culled,
            &self.triangles_clipped,
            &self.triangles_rejected_coarse,
            &self.triangles_rasterized,
            &self.fragments_tested,
            &self.fragments_passed,
            &self.frame_clears,
        ]
    }

    pub fn reset(&self) {
        for counter in self.all() {
            counter.store(0, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        let [submitted, culled, clipped, coarse, rasterized, tested, passed, clears] =
            self.all().map(|c| c.load(Ordering::Relaxed));
        CounterSnapshot {
            triangles_submitted: submitted,
            triangles_culled: culled,
            triangles_clipped: clipped,
            triangles_rejected_coarse: coarse,
            triangles_rasterized: rasterized,
            fragments_tested: tested,
            fragments_passed: passed,
            frame_clears: clears,
        }
    }
}

impl Default for FunctionCounters {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub triangles_submitted: u64,
    pub triangles_culled: u64,
    pub triangles_clipped: u64,
    pub triangles_rejected_coarse: u64,
    pub triangles_rasterized: u64,
    pub fragments_tested: u64,
    pub fragments_passed: u64,
    pub frame_clears: u64,
}

impl CounterSnapshot {
    /// Share of depth-tested fragments that were written, in percent.
    pub fn depth_pass_rate(&self) -> Option<f64> {
        (self.fragments_tested > 0)
            .then(|| self.fragments_passed as f64 / self.fragments_tested as f64 * 100.0)
    }

    /// Emit the snapshot as one structured `info` event.
    pub fn log(&self) {
        tracing::info!(
            submitted = self.triangles_submitted,
            culled = self.triangles_culled,
            clipped = self.triangles_clipped,
            coarse_rejected = self.triangles_rejected_coarse,
            rasterized = self.triangles_rasterized,
            fragments_tested = self.fragments_tested,
            fragments_passed = self.fragments_passed,
            depth_pass_rate = self.depth_pass_rate().unwrap_or(0.0),
            clears = self.frame_clears,
            "pipeline counters"
        );
    }
}

pub static FUNCTION_COUNTERS: FunctionCounters = FunctionCounters::new();

/// Increment a [`FUNCTION_COUNTERS`] field (only when the `profiling`
/// feature is enabled), e.g. `count_call!(frame_clears)`.
#[macro_export]
macro_rules! count_call {
    ($counter:ident) => {
        #[cfg(feature = "profiling")]
        {
            $crate::perf::FUNCTION_COUNTERS
                .$counter
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    };
}

/// Add to a [`FUNCTION_COUNTERS`] field (only when the `profiling` feature
/// is enabled).
#[macro_export]
macro_rules! count_add {
    ($counter:ident, $value:expr) => {
        #[cfg(feature = "profiling")]
        {
            $crate::perf::FUNCTION_COUNTERS
                .$counter
                .fetch_add($value, std::sync::atomic::Ordering::Relaxed);
        }
    };
}
