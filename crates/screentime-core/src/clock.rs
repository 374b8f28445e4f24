//! Time sources for the tracker.
//!
//! Interval math runs on the monotonic reading; the wall reading is what
//! gets persisted, displayed, and compared against range cutoffs.

use chrono::{DateTime, Local};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A paired reading of both clocks taken at the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moment {
    /// Time elapsed since the clock's origin. Never goes backwards.
    pub monotonic: Duration,
    pub wall: DateTime<Local>,
}

pub trait Clock: Send + Sync {
    fn now(&self) -> Moment;
}

/// Production clock backed by `Instant` and the local system time.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Moment {
        Moment {
            monotonic: self.origin.elapsed(),
            wall: Local::now(),
        }
    }
}

/// A clock that only moves when told to. Both readings advance together.
pub struct ManualClock {
    current: Mutex<Moment>,
}

impl ManualClock {
    pub fn new(wall: DateTime<Local>) -> Self {
        Self {
            current: Mutex::new(Moment {
                monotonic: Duration::ZERO,
                wall,
            }),
        }
    }

    pub fn starting_now() -> Self {
        Self::new(Local::now())
    }

    pub fn advance(&self, by: Duration) {
        let mut current = match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        current.monotonic += by;
        if let Ok(delta) = chrono::Duration::from_std(by) {
            current.wall += delta;
        }
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Moment {
        match self.current.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
