//! Time provider abstraction
//!
//! The form engine reads time only to schedule and fire debounce timers. This
//! module provides a [`Clock`] trait so that production code uses real system
//! time while tests and headless hosts drive time by hand.
//!
//! # Example
//!
//! ```
//! use formsync::{Clock, FixedClock};
//!
//! let clock = FixedClock::new(1000);
//! assert_eq!(clock.now_millis(), 1000);
//! clock.advance(250);
//! assert_eq!(clock.now_millis(), 1250);
//! ```

use std::cell::Cell;
use std::fmt::Debug;
use std::time::{SystemTime, UNIX_EPOCH};

/// A time provider for the scheduler.
///
/// A form never leaves the thread that owns it, so clocks need not be `Send`
/// or `Sync`.
pub trait Clock: Debug {
    /// Returns the current time as milliseconds since Unix epoch.
    fn now_millis(&self) -> u64;
}

/// Production clock using real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Manually driven clock.
///
/// Time only moves through [`FixedClock::advance`] and [`FixedClock::set`], so
/// debounce windows can be stepped through exactly.
pub struct FixedClock {
    millis: Cell<u64>,
}

impl FixedClock {
    /// Create a new fixed clock with the given initial time in milliseconds.
    pub fn new(millis: u64) -> Self {
        Self {
            millis: Cell::new(millis),
        }
    }

    /// Advance the clock by the given number of milliseconds.
    pub fn advance(&self, ms: u64) {
        self.millis.set(self.millis.get() + ms);
    }

    /// Set the clock to a specific time in milliseconds.
    pub fn set(&self, ms: u64) {
        self.millis.set(ms);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.millis.get()
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        // 2024-01-01 00:00:00 UTC
        Self::new(1704067200000)
    }
}

impl Clone for FixedClock {
    fn clone(&self) -> Self {
        Self::new(self.now_millis())
    }
}

impl Debug for FixedClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedClock")
            .field("millis", &self.now_millis())
            .finish()
    }
}
