//! Command surface for the presentation layer.
//!
//! The shell never touches [`TrackerState`] directly; it pauses, clears,
//! queries, and shuts down through [`Tracker`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::accumulator::{Snapshot, TrackerState};
use crate::clock::Clock;
use crate::error::Result;
use crate::identity::IdentityResolver;
use crate::persistence;
use crate::range::{self, RangeReport, TimeRange};
use crate::sampler::{Sampler, SamplerHandle};

pub struct Tracker {
    state: Arc<TrackerState>,
    clock: Arc<dyn Clock>,
    data_path: PathBuf,
    sampler: Option<SamplerHandle>,
}

impl Tracker {
    /// Restores state from `data_path`. An unreadable document is moved
    /// aside so later saves can't overwrite it, and tracking starts from an
    /// empty registry.
    pub fn open(data_path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        let data_path = data_path.into();
        let state = match persistence::load(&data_path) {
            Ok(report) => {
                log::info!(
                    "loaded {} app records from {} ({} skipped)",
                    report.records.len(),
                    data_path.display(),
                    report.skipped.len()
                );
                TrackerState::with_records(report.records)
            }
            Err(err) => {
                log::error!("usage data not loaded, starting empty: {err}");
                match persistence::set_aside(&data_path) {
                    Ok(aside) => log::warn!("unreadable usage data kept at {}", aside.display()),
                    Err(err) => log::error!("unreadable usage data may be overwritten: {err}"),
                }
                TrackerState::new()
            }
        };
        Self::new(Arc::new(state), clock, data_path)
    }

    pub fn new(state: Arc<TrackerState>, clock: Arc<dyn Clock>, data_path: PathBuf) -> Self {
        Self {
            state,
            clock,
            data_path,
            sampler: None,
        }
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// A sampler wired to this tracker's state and clock, not yet running.
    pub fn sampler<R: IdentityResolver + 'static>(&self, resolver: R) -> Sampler<R> {
        Sampler::new(Arc::clone(&self.state), resolver, Arc::clone(&self.clock))
    }

    /// Starts `sampler` on its own thread, replacing any running one.
    pub fn run<R: IdentityResolver + 'static>(&mut self, sampler: Sampler<R>) -> Result<()> {
        if let Some(previous) = self.sampler.take() {
            previous.stop()?;
        }
        self.sampler = Some(sampler.spawn()?);
        Ok(())
    }

    pub fn is_sampling(&self) -> bool {
        self.sampler
            .as_ref()
            .map(SamplerHandle::is_running)
            .unwrap_or(false)
    }

    pub fn pause(&self) -> Result<()> {
        if !self.state.set_paused(true, self.clock.now())? {
            log::info!("tracking paused");
        }
        Ok(())
    }

    pub fn resume(&self) -> Result<()> {
        if self.state.set_paused(false, self.clock.now())? {
            log::info!("tracking resumed");
        }
        Ok(())
    }

    /// Flips the pause flag and returns the new value.
    pub fn toggle_pause(&self) -> Result<bool> {
        if self.state.is_paused()? {
            self.resume()?;
            Ok(false)
        } else {
            self.pause()?;
            Ok(true)
        }
    }

    pub fn is_paused(&self) -> Result<bool> {
        self.state.is_paused()
    }

    /// Wipes all usage and persists the empty registry right away so a
    /// crash can't bring the old totals back.
    pub fn clear(&self) -> Result<()> {
        self.state.clear(self.clock.now())?;
        log::info!("usage data cleared");
        self.save()
    }

    /// Writes the current totals. The lock is released before any I/O.
    pub fn save(&self) -> Result<()> {
        let snapshot = self.state.snapshot()?;
        persistence::save(&self.data_path, &snapshot)?;
        log::debug!(
            "saved {} app records to {}",
            snapshot.len(),
            self.data_path.display()
        );
        Ok(())
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        self.state.snapshot()
    }

    pub fn query(&self, range: TimeRange) -> Result<RangeReport> {
        let snapshot = self.state.snapshot()?;
        Ok(range::query(&snapshot, range, self.clock.now().wall))
    }

    /// Stops the sampler, credits the running session, and performs the
    /// final save. Returns once the data is on disk.
    ///
    /// The save runs even if the sampler thread panicked; the join error is
    /// returned afterwards.
    pub fn shutdown(mut self) -> Result<()> {
        let stopped = match self.sampler.take() {
            Some(sampler) => sampler.stop(),
            None => Ok(()),
        };
        if let Err(err) = &stopped {
            log::error!("sampler did not stop cleanly: {err}");
        }

        self.state.settle(self.clock.now())?;
        self.save()?;
        log::info!("final save written to {}", self.data_path.display());
        stopped
    }
}
