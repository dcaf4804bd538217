use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use thousands::*;

/// How many work units pass between two progress lines
const REPORT_STEP: usize = 100_000;

/// Shared progress reporter with cooperative cancellation
///
/// One instance is shared by reference across all workers of a build. The
/// counter is advanced with `increment` as work units complete; `abort` may
/// be called from any thread (e.g. a UI thread) and is polled by workers
/// through `check_abort`, which makes them exit promptly. An aborted build
/// returns an empty matrix rather than partial state.
///
/// ### Fields
///
/// * `total` - Expected number of work units for the whole build
/// * `counter` - Units completed so far
/// * `aborted` - Cooperative cancellation flag
/// * `verbose` - Print progress lines while counting
pub struct Progress {
    total: usize,
    counter: AtomicUsize,
    aborted: AtomicBool,
    verbose: bool,
}

impl Progress {
    /// Create a new reporter
    ///
    /// ### Params
    ///
    /// * `total` - Expected number of work units
    /// * `verbose` - Controls whether progress lines are printed
    pub fn new(total: usize, verbose: bool) -> Self {
        Progress {
            total,
            counter: AtomicUsize::new(0),
            aborted: AtomicBool::new(false),
            verbose,
        }
    }

    /// Advance the counter by `n` completed units
    ///
    /// Prints a progress line whenever the counter crosses a reporting
    /// boundary and `verbose` is set.
    pub fn increment(&self, n: usize) {
        let before = self.counter.fetch_add(n, Ordering::Relaxed);
        let after = before + n;

        if self.verbose && before / REPORT_STEP != after / REPORT_STEP {
            println!(
                "  Processed {} / {} units.",
                after.separate_with_underscores(),
                self.total.separate_with_underscores()
            );
        }
    }

    /// Has an abort been requested?
    #[inline]
    pub fn check_abort(&self) -> bool {
        self.aborted.load(Ordering::Relaxed)
    }

    /// Request a cooperative abort
    ///
    /// Safe to call from any thread; workers poll the flag and exit early.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Relaxed);
    }

    /// Units completed so far
    pub fn count(&self) -> usize {
        self.counter.load(Ordering::Relaxed)
    }

    /// Expected number of work units
    pub fn total(&self) -> usize {
        self.total
    }
}

///////////
// Tests //
///////////
