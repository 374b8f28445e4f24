//! Background sampler.
//!
//! Each tick resolves the foreground application and feeds the result to
//! [`TrackerState`]. The state machine is `Idle -> Tracking(id)`; a tick
//! either switches, accrues, or forfeits its interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::accumulator::{TickOutcome, TrackerState};
use crate::clock::Clock;
use crate::error::{Result, TrackerError};
use crate::identity::IdentityResolver;

/// Nominal sampling period.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Observable sampler state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SamplerState {
    Idle,
    Tracking(String),
}

impl SamplerState {
    pub fn of(state: &TrackerState) -> Result<Self> {
        Ok(match state.current_identity()? {
            Some(identity) => Self::Tracking(identity),
            None => Self::Idle,
        })
    }
}

/// Called after every tick with what the tick did.
pub type RefreshHook = Box<dyn FnMut(&TickOutcome) + Send>;

pub struct Sampler<R> {
    state: Arc<TrackerState>,
    resolver: R,
    clock: Arc<dyn Clock>,
    interval: Duration,
    on_tick: Option<RefreshHook>,
}

impl<R: IdentityResolver + 'static> Sampler<R> {
    pub fn new(state: Arc<TrackerState>, resolver: R, clock: Arc<dyn Clock>) -> Self {
        Self {
            state,
            resolver,
            clock,
            interval: TICK_INTERVAL,
            on_tick: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn on_tick(mut self, hook: impl FnMut(&TickOutcome) + Send + 'static) -> Self {
        self.on_tick = Some(Box::new(hook));
        self
    }

    /// Runs one sampling step without sleeping.
    pub fn step(&mut self) -> Result<TickOutcome> {
        if self.state.is_paused()? {
            return Ok(TickOutcome::Paused);
        }

        let resolved = self.resolver.resolve();
        let now = self.clock.now();
        match resolved {
            Ok(Some(app)) => self.state.tick(&app, now),
            Ok(None) => self.state.forfeit(now),
            Err(err) => {
                log::debug!("tick forfeited: {err}");
                self.state.forfeit(now)
            }
        }
    }

    /// Moves the sampler onto its own thread.
    pub fn spawn(self) -> Result<SamplerHandle> {
        let running = Arc::new(AtomicBool::new(true));
        let running_flag = Arc::clone(&running);

        let thread = thread::Builder::new()
            .name("screentime-sampler".to_owned())
            .spawn(move || self.run(&running_flag))
            .map_err(|err| TrackerError::io("failed to spawn sampler thread", err))?;

        Ok(SamplerHandle {
            running,
            thread: Some(thread),
        })
    }

    fn run(mut self, running: &AtomicBool) {
        let mut next_tick = Instant::now();
        while running.load(Ordering::SeqCst) {
            let outcome = match self.step() {
                Ok(outcome) => outcome,
                Err(err) => {
                    log::error!("sampler tick failed: {err}");
                    TickOutcome::Unavailable
                }
            };
            if let TickOutcome::Switched {
                from,
                to,
                finalized_secs,
            } = &outcome
            {
                log::debug!("foreground {from} -> {to} ({finalized_secs}s finalized)");
            }
            if let Some(hook) = self.on_tick.as_mut() {
                hook(&outcome);
            }

            next_tick += self.interval;
            let now = Instant::now();
            if next_tick <= now {
                next_tick = now;
            } else {
                thread::sleep(next_tick - now);
            }
        }
        log::debug!("sampler stopped");
    }
}

/// Owns the sampler thread. Stopping takes effect at the top of the next
/// iteration; the in-flight tick always completes.
pub struct SamplerHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SamplerHandle {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Signals the loop to end and waits for the thread to exit.
    pub fn stop(mut self) -> Result<()> {
        self.join()
    }

    fn join(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| TrackerError::SamplerPanicked),
            None => Ok(()),
        }
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        if let Err(err) = self.join() {
            log::error!("sampler shutdown: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::identity::AppIdentity;
    use crate::test_support::{Scripted, ScriptedResolver};

    fn sampler(
        script: Vec<Scripted>,
    ) -> (Sampler<ScriptedResolver>, Arc<TrackerState>, Arc<ManualClock>) {
        let state = Arc::new(TrackerState::new());
        let clock = Arc::new(ManualClock::starting_now());
        let clock_dyn: Arc<dyn Clock> = clock.clone();
        let sampler = Sampler::new(Arc::clone(&state), ScriptedResolver::new(script), clock_dyn);
        (sampler, state, clock)
    }

    fn drive(sampler: &mut Sampler<ScriptedResolver>, clock: &ManualClock, ticks: usize) {
        for _ in 0..ticks {
            sampler.step().expect("step");
            clock.advance_secs(1);
        }
    }

    #[test]
    fn starts_idle_then_tracks() {
        let (mut sampler, state, _clock) = sampler(vec![Scripted::app("a.exe")]);
        assert_eq!(SamplerState::of(&state).expect("state"), SamplerState::Idle);

        sampler.step().expect("step");
        assert_eq!(
            SamplerState::of(&state).expect("state"),
            SamplerState::Tracking("a.exe".to_owned())
        );
    }

    #[test]
    fn five_ticks_of_a_then_three_of_b() {
        let mut script = vec![Scripted::app("a.exe"); 6];
        script.extend(vec![Scripted::app("b.exe"); 3]);
        let (mut sampler, state, clock) = sampler(script);

        drive(&mut sampler, &clock, 9);

        let snapshot = state.snapshot().expect("snapshot");
        assert_eq!(snapshot.seconds_for("a.exe"), 6);
        assert_eq!(snapshot.seconds_for("b.exe"), 2);
        assert!(snapshot.total_seconds() <= 9);
    }

    #[test]
    fn resolution_failures_forfeit_time_and_keep_identity() {
        let mut script = vec![Scripted::app("a.exe")];
        script.extend(vec![Scripted::NoWindow; 3]);
        script.extend(vec![Scripted::Fail; 2]);
        let (mut sampler, state, clock) = sampler(script);

        sampler.step().expect("step");
        for _ in 0..5 {
            clock.advance_secs(1);
            assert_eq!(sampler.step().expect("step"), TickOutcome::Unavailable);
        }

        let snapshot = state.snapshot().expect("snapshot");
        assert_eq!(snapshot.seconds_for("a.exe"), 0);
        assert_eq!(snapshot.current.as_deref(), Some("a.exe"));
    }

    #[test]
    fn paused_sampler_does_not_consult_resolver() {
        let (mut sampler, state, clock) = sampler(vec![Scripted::app("a.exe"); 2]);
        sampler.step().expect("step");

        state.set_paused(true, clock.now()).expect("pause");
        clock.advance_secs(1);
        assert_eq!(sampler.step().expect("step"), TickOutcome::Paused);
        assert_eq!(sampler.resolver.remaining(), 1);
    }

    #[test]
    fn spawned_sampler_ticks_and_stops() {
        let state = Arc::new(TrackerState::new());
        let clock: Arc<dyn Clock> = Arc::new(crate::clock::SystemClock::new());
        let (tx, rx) = std::sync::mpsc::channel();

        let handle = Sampler::new(
            Arc::clone(&state),
            ScriptedResolver::repeating(AppIdentity::new("a.exe", "/bin/a.exe")),
            clock,
        )
        .with_interval(Duration::from_millis(5))
        .on_tick(move |outcome| {
            let _ = tx.send(outcome.clone());
        })
        .spawn()
        .expect("spawn");

        let first = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("first tick signalled");
        assert_eq!(
            first,
            TickOutcome::Started {
                identity: "a.exe".to_owned()
            }
        );
        assert!(handle.is_running());
        handle.stop().expect("stop");

        assert_eq!(
            state.current_identity().expect("current").as_deref(),
            Some("a.exe")
        );
    }

    #[test]
    fn failed_tick_still_refreshes_display() {
        let state = Arc::new(TrackerState::new());
        state.poison();
        let clock: Arc<dyn Clock> = Arc::new(crate::clock::SystemClock::new());
        let (tx, rx) = std::sync::mpsc::channel();

        let handle = Sampler::new(
            Arc::clone(&state),
            ScriptedResolver::repeating(AppIdentity::new("a.exe", "/bin/a.exe")),
            clock,
        )
        .with_interval(Duration::from_millis(5))
        .on_tick(move |outcome| {
            let _ = tx.send(outcome.clone());
        })
        .spawn()
        .expect("spawn");

        for _ in 0..2 {
            let outcome = rx
                .recv_timeout(Duration::from_secs(5))
                .expect("tick signalled");
            assert_eq!(outcome, TickOutcome::Unavailable);
        }
        handle.stop().expect("stop");
        assert!(matches!(state.snapshot(), Err(TrackerError::LockPoisoned)));
    }
}
