//! Completion latches for joining independently-finishing operations.
//!
//! Voices complete asynchronously and in any order. The primitives here turn
//! a number of such completions into a single notification:
//!
//! - [`CountdownLatch`] - counts outstanding operations and reports the one
//!   completion that brought the count to zero.
//! - [`OnceFlag`] - a one-shot flag that lets exactly one caller through.
//!
//! # Example
//!
//! ```
//! use earcon_core::latch::CountdownLatch;
//!
//! // One guard count for the launch phase.
//! let latch = CountdownLatch::new(1);
//! latch.arm(2); // two operations launched
//!
//! assert!(!latch.count_down()); // first operation finished
//! assert!(!latch.release());    // launch phase finished
//! assert!(latch.count_down());  // last operation: fires
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// A countdown latch that fires exactly once when its count reaches zero.
///
/// The latch starts with an initial count. Additional outstanding operations
/// can be registered with [`arm`](Self::arm) as long as the latch has not
/// fired yet. Each finished operation calls [`count_down`](Self::count_down);
/// the call that observes the transition to zero receives `true`, every other
/// call receives `false`.
///
/// Counting down an already-fired latch is a no-op that returns `false`,
/// which absorbs duplicate completion reports.
#[derive(Debug)]
pub struct CountdownLatch {
    remaining: AtomicUsize,
    fired: AtomicBool,
}

impl CountdownLatch {
    /// Create a latch with the given initial count.
    ///
    /// A latch created with a count of zero never fires on its own; use
    /// [`arm`](Self::arm) first.
    pub fn new(initial: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(initial),
            fired: AtomicBool::new(false),
        }
    }

    /// Register `count` additional outstanding operations.
    ///
    /// Returns `false` if the latch has already fired, in which case the
    /// count is left untouched.
    pub fn arm(&self, count: usize) -> bool {
        if self.fired.load(Ordering::Acquire) {
            return false;
        }
        self.remaining.fetch_add(count, Ordering::AcqRel);
        true
    }

    /// Record one finished operation.
    ///
    /// Returns `true` for exactly one call: the one that brings the count to
    /// zero.
    pub fn count_down(&self) -> bool {
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));

        match previous {
            Ok(1) => !self.fired.swap(true, Ordering::AcqRel),
            _ => false,
        }
    }

    /// Release a guard count taken at construction.
    ///
    /// Identical to [`count_down`](Self::count_down); the separate name reads
    /// better at the end of a launch phase.
    pub fn release(&self) -> bool {
        self.count_down()
    }

    /// Number of outstanding operations.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Whether the latch has fired.
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

/// A flag that can be claimed exactly once.
#[derive(Debug, Default)]
pub struct OnceFlag {
    claimed: AtomicBool,
}

impl OnceFlag {
    /// Create an unclaimed flag.
    pub const fn new() -> Self {
        Self {
            claimed: AtomicBool::new(false),
        }
    }

    /// Claim the flag. Returns `true` only for the first caller.
    pub fn claim(&self) -> bool {
        !self.claimed.swap(true, Ordering::AcqRel)
    }

    /// Whether the flag has been claimed.
    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }
}

static_assertions::assert_impl_all!(CountdownLatch: Send, Sync);
