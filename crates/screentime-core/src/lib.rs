//! Tracking core for ScreenTime.
//!
//! A background [`Sampler`] resolves the foreground application once per
//! tick and credits elapsed time to it in a shared [`TrackerState`]. Totals
//! are persisted to a JSON snapshot and read back through range queries.

pub mod accumulator;
pub mod clock;
pub mod error;
pub mod format;
pub mod identity;
pub mod persistence;
pub mod platform;
pub mod range;
pub mod sampler;
pub mod tracker;

#[cfg(test)]
mod test_support;

pub use accumulator::{AppUsageRecord, Snapshot, TickOutcome, TrackerState};
pub use clock::{Clock, ManualClock, Moment, SystemClock};
pub use error::{Result, TrackerError};
pub use format::format_duration;
pub use identity::{AppIdentity, IdentityResolver, NullResolver, UNKNOWN_APP};
pub use persistence::{LoadReport, DEFAULT_DATA_PATH, TIMESTAMP_FORMAT};
pub use range::{RangeReport, TimeRange, UsageRow};
pub use sampler::{Sampler, SamplerHandle, SamplerState, TICK_INTERVAL};
pub use tracker::Tracker;
