//! Per-application active-time accumulator.
//!
//! [`TrackerState`] is the only owner of the usage map. Every read and write
//! goes through one mutex, and no method does I/O or OS calls while holding
//! it. Callers get [`Snapshot`] copies, never the live map.

use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::clock::Moment;
use crate::error::{Result, TrackerError};
use crate::identity::AppIdentity;

/// Accumulated usage for one application identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppUsageRecord {
    pub identity: String,
    pub path: String,
    pub active_seconds: u64,
    /// When accrual for the current tracking session began. Also the
    /// recency key for range queries.
    pub last_start: DateTime<Local>,
}

impl AppUsageRecord {
    pub fn new(identity: impl Into<String>, path: impl Into<String>, last_start: DateTime<Local>) -> Self {
        Self {
            identity: identity.into(),
            path: path.into(),
            active_seconds: 0,
            last_start,
        }
    }

    pub fn with_seconds(mut self, active_seconds: u64) -> Self {
        self.active_seconds = active_seconds;
        self
    }
}

/// What a single sampler step did to the accumulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Accrual suspended; nothing changed.
    Paused,
    /// No foreground application this tick; the interval was dropped.
    Unavailable,
    /// First identity observed since start or since the state was emptied.
    Started { identity: String },
    /// Foreground moved to another application; `finalized_secs` were
    /// credited to the one that lost it.
    Switched {
        from: String,
        to: String,
        finalized_secs: u64,
    },
    /// Same application kept the foreground.
    Accrued { identity: String, secs: u64 },
}

/// Immutable point-in-time copy of the accumulator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Ordered by descending active time, then by identity.
    pub records: Vec<AppUsageRecord>,
    pub current: Option<String>,
    pub paused: bool,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn get(&self, identity: &str) -> Option<&AppUsageRecord> {
        self.records.iter().find(|record| record.identity == identity)
    }

    pub fn seconds_for(&self, identity: &str) -> u64 {
        self.get(identity).map(|record| record.active_seconds).unwrap_or(0)
    }

    pub fn total_seconds(&self) -> u64 {
        self.records
            .iter()
            .fold(0u64, |acc, record| acc.saturating_add(record.active_seconds))
    }
}

#[derive(Debug, Clone)]
struct Session {
    identity: String,
    path: String,
    /// Monotonic reading up to which time has already been credited.
    mark: Duration,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, AppUsageRecord>,
    current: Option<Session>,
    paused: bool,
}

impl Inner {
    /// Credits whole elapsed seconds of the running session. The sub-second
    /// remainder stays in the mark so repeated ticks don't truncate time away.
    fn credit_current(&mut self, now: Duration) -> Option<(String, u64)> {
        let session = self.current.as_mut()?;
        let elapsed = now.saturating_sub(session.mark);
        let secs = elapsed.as_secs();
        session.mark += Duration::from_secs(secs);

        let record = self.records.get_mut(&session.identity)?;
        record.active_seconds = record.active_seconds.saturating_add(secs);
        record.path.clone_from(&session.path);
        Some((session.identity.clone(), secs))
    }

    fn begin(&mut self, app: &AppIdentity, now: Moment) {
        let record = self
            .records
            .entry(app.name.clone())
            .or_insert_with(|| AppUsageRecord::new(app.name.clone(), app.path.clone(), now.wall));
        record.path.clone_from(&app.path);
        record.last_start = now.wall;

        self.current = Some(Session {
            identity: app.name.clone(),
            path: app.path.clone(),
            mark: now.monotonic,
        });
    }
}

/// Thread-safe owner of all tracking state.
#[derive(Debug, Default)]
pub struct TrackerState {
    inner: Mutex<Inner>,
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the map with previously persisted records. Nothing is current.
    pub fn with_records(records: impl IntoIterator<Item = AppUsageRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.identity.clone(), record))
            .collect();
        Self {
            inner: Mutex::new(Inner {
                records,
                current: None,
                paused: false,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| TrackerError::LockPoisoned)
    }

    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = self.inner.lock();
            panic!("tracker state poisoned on purpose");
        }));
    }

    /// Applies one observation of the foreground application.
    pub fn tick(&self, app: &AppIdentity, now: Moment) -> Result<TickOutcome> {
        let mut inner = self.lock()?;
        if inner.paused {
            return Ok(TickOutcome::Paused);
        }

        let previous = inner.current.as_ref().map(|session| session.identity.clone());
        match previous {
            Some(identity) if identity == app.name => {
                let secs = inner
                    .credit_current(now.monotonic)
                    .map(|(_, secs)| secs)
                    .unwrap_or(0);
                if let Some(session) = inner.current.as_mut() {
                    session.path.clone_from(&app.path);
                }
                if let Some(record) = inner.records.get_mut(&app.name) {
                    record.path.clone_from(&app.path);
                    record.last_start = now.wall;
                }
                Ok(TickOutcome::Accrued { identity, secs })
            }
            Some(from) => {
                let finalized_secs = inner
                    .credit_current(now.monotonic)
                    .map(|(_, secs)| secs)
                    .unwrap_or(0);
                inner.begin(app, now);
                Ok(TickOutcome::Switched {
                    from,
                    to: app.name.clone(),
                    finalized_secs,
                })
            }
            None => {
                inner.begin(app, now);
                Ok(TickOutcome::Started {
                    identity: app.name.clone(),
                })
            }
        }
    }

    /// Drops the interval since the last tick without crediting anyone.
    /// The current identity and every record stay as they are.
    pub fn forfeit(&self, now: Moment) -> Result<TickOutcome> {
        let mut inner = self.lock()?;
        if inner.paused {
            return Ok(TickOutcome::Paused);
        }
        if let Some(session) = inner.current.as_mut() {
            session.mark = session.mark.max(now.monotonic);
        }
        Ok(TickOutcome::Unavailable)
    }

    /// Credits the running session up to `now` without ending it.
    pub fn settle(&self, now: Moment) -> Result<u64> {
        let mut inner = self.lock()?;
        if inner.paused {
            return Ok(0);
        }
        Ok(inner
            .credit_current(now.monotonic)
            .map(|(_, secs)| secs)
            .unwrap_or(0))
    }

    /// Suspends or resumes accrual. Returns the previous flag.
    ///
    /// Pausing settles the running session first; resuming restarts its
    /// mark, so time spent paused is never credited.
    pub fn set_paused(&self, paused: bool, now: Moment) -> Result<bool> {
        let mut inner = self.lock()?;
        let was_paused = inner.paused;
        if paused == was_paused {
            return Ok(was_paused);
        }

        if paused {
            inner.credit_current(now.monotonic);
        } else if let Some(session) = inner.current.as_mut() {
            session.mark = now.monotonic;
        }
        inner.paused = paused;
        Ok(was_paused)
    }

    pub fn is_paused(&self) -> Result<bool> {
        Ok(self.lock()?.paused)
    }

    pub fn current_identity(&self) -> Result<Option<String>> {
        Ok(self
            .lock()?
            .current
            .as_ref()
            .map(|session| session.identity.clone()))
    }

    /// Empties every record, then reseeds a zero record for the current
    /// identity starting at `now`.
    pub fn clear(&self, now: Moment) -> Result<()> {
        let mut inner = self.lock()?;
        inner.records.clear();

        let session = inner.current.as_mut().map(|session| {
            session.mark = now.monotonic;
            (session.identity.clone(), session.path.clone())
        });
        if let Some((identity, path)) = session {
            inner
                .records
                .insert(identity.clone(), AppUsageRecord::new(identity, path, now.wall));
        }
        Ok(())
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        let inner = self.lock()?;
        let mut records: Vec<AppUsageRecord> = inner.records.values().cloned().collect();
        let current = inner.current.as_ref().map(|session| session.identity.clone());
        let paused = inner.paused;
        drop(inner);

        sort_by_active_time(&mut records);
        Ok(Snapshot {
            records,
            current,
            paused,
        })
    }
}

pub(crate) fn sort_by_active_time(records: &mut [AppUsageRecord]) {
    records.sort_by(|a, b| {
        b.active_seconds
            .cmp(&a.active_seconds)
            .then_with(|| a.identity.cmp(&b.identity))
    });
}
