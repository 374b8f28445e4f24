use chrono::Duration as ChronoDuration;
use screentime_core::{
    AppIdentity, AppUsageRecord, Clock, IdentityResolver, ManualClock, RangeReport, Result,
    Sampler, SystemClock, TickOutcome, TimeRange, Tracker, TrackerError, TrackerState,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

/// Answers from a queue; `None` entries mean "no foreground window".
struct QueueResolver(VecDeque<Option<AppIdentity>>);

impl QueueResolver {
    fn new() -> Self {
        Self(VecDeque::new())
    }

    fn then(mut self, name: &str, ticks: usize) -> Self {
        let app = AppIdentity::new(name, format!("C:\\{name}"));
        self.0.extend(std::iter::repeat(Some(app)).take(ticks));
        self
    }

    fn then_nothing(mut self, ticks: usize) -> Self {
        self.0.extend(std::iter::repeat(None).take(ticks));
        self
    }
}

impl IdentityResolver for QueueResolver {
    fn resolve(&mut self) -> Result<Option<AppIdentity>> {
        Ok(self.0.pop_front().flatten())
    }
}

/// Reports "A" for `healthy` calls, then panics.
struct CrashingResolver {
    healthy: usize,
}

impl IdentityResolver for CrashingResolver {
    fn resolve(&mut self) -> Result<Option<AppIdentity>> {
        if self.healthy == 0 {
            panic!("resolver crashed");
        }
        self.healthy -= 1;
        Ok(Some(AppIdentity::new("A", "C:\\A")))
    }
}

fn setup(path: std::path::PathBuf) -> (Tracker, Arc<ManualClock>) {
    let _ = env_logger::try_init();
    let clock = Arc::new(ManualClock::starting_now());
    let clock_dyn: Arc<dyn Clock> = clock.clone();
    (Tracker::open(path, clock_dyn), clock)
}

fn drive(sampler: &mut Sampler<QueueResolver>, clock: &ManualClock, ticks: usize) {
    for _ in 0..ticks {
        clock.advance_secs(1);
        sampler.step().expect("step");
    }
}

#[test]
fn a_for_five_ticks_then_b_for_three() {
    let dir = tempdir().expect("tempdir");
    let (tracker, clock) = setup(dir.path().join("usage.json"));
    let mut sampler = tracker.sampler(QueueResolver::new().then("A", 5).then("B", 3));

    drive(&mut sampler, &clock, 8);

    let snapshot = tracker.snapshot().expect("snapshot");
    let a = snapshot.seconds_for("A");
    let b = snapshot.seconds_for("B");
    assert!((4..=6).contains(&a), "A accrued {a}s");
    assert!((2..=4).contains(&b), "B accrued {b}s");
    assert!(snapshot.total_seconds() <= 8);
}

#[test]
fn paused_interval_is_excluded() {
    let dir = tempdir().expect("tempdir");
    let (tracker, clock) = setup(dir.path().join("usage.json"));
    let mut sampler = tracker.sampler(QueueResolver::new().then("A", 26));

    drive(&mut sampler, &clock, 11);
    tracker.pause().expect("pause");
    drive(&mut sampler, &clock, 10);
    tracker.resume().expect("resume");
    drive(&mut sampler, &clock, 5);

    let a = tracker.snapshot().expect("snapshot").seconds_for("A");
    assert!((14..=16).contains(&a), "A accrued {a}s");
}

#[test]
fn saved_totals_survive_a_restart() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("usage.json");
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::starting_now());

    let state = TrackerState::with_records([
        AppUsageRecord::new("A", "C:\\a.exe", clock.now().wall).with_seconds(7920),
    ]);
    let tracker = Tracker::new(Arc::new(state), Arc::clone(&clock), path.clone());
    tracker.shutdown().expect("shutdown");

    let restarted = Tracker::open(path, clock);
    let snapshot = restarted.snapshot().expect("snapshot");
    assert_eq!(snapshot.len(), 1);
    let record = snapshot.get("A").expect("record");
    assert_eq!(record.active_seconds, 7920);
    assert_eq!(record.path, "C:\\a.exe");
}

#[test]
fn two_day_old_record_only_shows_in_wider_ranges() {
    let dir = tempdir().expect("tempdir");
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::starting_now());
    let old = clock.now().wall - ChronoDuration::hours(48);
    let state = TrackerState::with_records([AppUsageRecord::new("A", "", old).with_seconds(60)]);
    let tracker = Tracker::new(Arc::new(state), clock, dir.path().join("usage.json"));

    assert_eq!(
        tracker.query(TimeRange::Today).expect("query"),
        RangeReport::Rows(Vec::new())
    );
    let week = tracker.query(TimeRange::LastWeek).expect("query");
    assert_eq!(week.rows().len(), 1);
    assert_eq!(week.rows()[0].identity, "A");
}

#[test]
fn failed_resolution_never_credits_time() {
    let dir = tempdir().expect("tempdir");
    let (tracker, clock) = setup(dir.path().join("usage.json"));
    let mut sampler = tracker.sampler(QueueResolver::new().then("A", 1).then_nothing(5));

    drive(&mut sampler, &clock, 6);

    let snapshot = tracker.snapshot().expect("snapshot");
    assert_eq!(snapshot.total_seconds(), 0);
    assert_eq!(snapshot.current.as_deref(), Some("A"));
}

#[test]
fn time_is_conserved_across_rapid_switches() {
    let dir = tempdir().expect("tempdir");
    let (tracker, clock) = setup(dir.path().join("usage.json"));
    let mut resolver = QueueResolver::new();
    for i in 0..60 {
        resolver = resolver.then(["A", "B", "C"][i % 3], 1 + i % 4);
    }
    let ticks = resolver.0.len();
    let mut sampler = tracker.sampler(resolver);

    drive(&mut sampler, &clock, ticks);

    let total = tracker.snapshot().expect("snapshot").total_seconds();
    assert!(total as usize + 1 >= ticks, "{total}s for {ticks} ticks");
    assert!(total as usize <= ticks);
}

#[test]
fn clear_leaves_only_a_fresh_current_record() {
    let dir = tempdir().expect("tempdir");
    let (tracker, clock) = setup(dir.path().join("usage.json"));
    let mut sampler = tracker.sampler(QueueResolver::new().then("A", 3).then("B", 3));
    drive(&mut sampler, &clock, 6);

    tracker.clear().expect("clear");
    let snapshot = tracker.snapshot().expect("snapshot");
    assert!(snapshot.len() <= 1);
    for record in &snapshot.records {
        assert_eq!(record.identity, "B");
        assert_eq!(record.active_seconds, 0);
    }
}

#[test]
fn real_sampler_thread_reports_every_tick() {
    let dir = tempdir().expect("tempdir");
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let mut tracker = Tracker::open(dir.path().join("usage.json"), clock);
    let (tx, rx) = std::sync::mpsc::channel();

    let sampler = tracker
        .sampler(QueueResolver::new().then("A", 2))
        .with_interval(Duration::from_millis(10))
        .on_tick(move |outcome| {
            let _ = tx.send(outcome.clone());
        });
    tracker.run(sampler).expect("run");
    assert!(tracker.is_sampling());

    let outcomes: Vec<TickOutcome> = (0..3)
        .map(|_| rx.recv_timeout(Duration::from_secs(5)).expect("tick"))
        .collect();
    assert!(matches!(outcomes[0], TickOutcome::Started { .. }));
    assert!(matches!(outcomes[1], TickOutcome::Accrued { .. }));
    assert_eq!(outcomes[2], TickOutcome::Unavailable);

    tracker.shutdown().expect("shutdown");
    assert!(dir.path().join("usage.json").exists());
}

#[test]
fn crashed_sampler_still_gets_a_final_save() {
    let _ = env_logger::try_init();
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("usage.json");
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());

    let state = TrackerState::with_records([
        AppUsageRecord::new("B", "C:\\b.exe", clock.now().wall).with_seconds(7920),
    ]);
    let mut tracker = Tracker::new(Arc::new(state), clock, path.clone());
    let (tx, rx) = std::sync::mpsc::channel();
    let sampler = tracker
        .sampler(CrashingResolver { healthy: 2 })
        .with_interval(Duration::from_millis(10))
        .on_tick(move |outcome| {
            let _ = tx.send(outcome.clone());
        });
    tracker.run(sampler).expect("run");

    // The hook's sender is dropped when the sampler thread unwinds.
    let mut ticks = 0;
    while rx.recv_timeout(Duration::from_secs(5)).is_ok() {
        ticks += 1;
    }
    assert_eq!(ticks, 2);

    assert!(matches!(
        tracker.shutdown(),
        Err(TrackerError::SamplerPanicked)
    ));

    let restarted = Tracker::open(path, Arc::new(SystemClock::new()));
    let snapshot = restarted.snapshot().expect("snapshot");
    assert_eq!(snapshot.seconds_for("B"), 7920);
    assert!(snapshot.get("A").is_some());
}
