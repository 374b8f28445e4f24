mod commands;
mod config;
mod report;

use anyhow::{Context, Result};
use screentime_core::platform;
use screentime_core::{Clock, SystemClock, TickOutcome, TimeRange, Tracker, TICK_INTERVAL};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::commands::{spawn_input_reader, Command};
use crate::config::{print_help, Config};

const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Everything the shell loop reacts to arrives on one channel.
pub enum ShellEvent {
    Tick(TickOutcome),
    Command(Command),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct Shell {
    range: TimeRange,
    reporting: bool,
    report_every: Duration,
    last_report: Instant,
}

impl Shell {
    fn print_report(&mut self, tracker: &Tracker) {
        let report = tracker.query(self.range);
        let paused = tracker.is_paused().unwrap_or(false);
        match report {
            Ok(report) => print!("{}", report::render(self.range, &report, paused)),
            Err(err) => log::error!("range query failed: {err}"),
        }
        self.last_report = Instant::now();
    }

    fn on_tick(&mut self, tracker: &Tracker) {
        if self.reporting
            && !self.report_every.is_zero()
            && self.last_report.elapsed() >= self.report_every
        {
            self.print_report(tracker);
        }
    }

    fn handle(&mut self, command: Command, tracker: &Tracker) -> Flow {
        let result = match command {
            Command::Show(range) => {
                if let Some(range) = range {
                    self.range = range;
                }
                self.reporting = true;
                self.print_report(tracker);
                Ok(())
            }
            Command::Hide => {
                self.reporting = false;
                Ok(())
            }
            Command::Pause => tracker.pause(),
            Command::Resume => tracker.resume(),
            Command::TogglePause => tracker.toggle_pause().map(|_| ()),
            Command::Clear => tracker.clear(),
            Command::Save => tracker.save(),
            Command::Status => tracker.snapshot().map(|snapshot| {
                println!("{}", report::render_status(&snapshot));
            }),
            Command::Help => {
                print_help();
                Ok(())
            }
            Command::Quit => return Flow::Quit,
        };

        if let Err(err) = result {
            log::error!("{command:?} failed: {err}");
        }
        Flow::Continue
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(config) = Config::from_args()? else {
        print_help();
        return Ok(());
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let mut tracker = Tracker::open(config.data_path.clone(), clock);

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_signal = Arc::clone(&shutdown);
    if let Err(err) = ctrlc::set_handler(move || {
        shutdown_signal.store(true, Ordering::SeqCst);
    }) {
        log::warn!("ctrlc handler registration warning: {err}");
    }

    let (tx, rx) = mpsc::channel::<ShellEvent>();
    let tick_tx = tx.clone();
    let sampler = tracker
        .sampler(platform::native_or_null())
        .on_tick(move |outcome| {
            let _ = tick_tx.send(ShellEvent::Tick(outcome.clone()));
        });
    tracker.run(sampler).context("failed to start sampler")?;

    if config.read_stdin {
        spawn_input_reader(tx);
    } else {
        drop(tx);
    }

    log::info!(
        "ScreenTime started | data={} | tick={}ms | autosave={}s",
        tracker.data_path().display(),
        TICK_INTERVAL.as_millis(),
        config.autosave_every.as_secs()
    );

    let mut shell = Shell {
        range: config.initial_range,
        reporting: true,
        report_every: config.report_every,
        last_report: Instant::now(),
    };
    let mut last_save = Instant::now();

    while !shutdown.load(Ordering::Relaxed) {
        match rx.recv_timeout(EVENT_POLL_INTERVAL) {
            Ok(ShellEvent::Tick(_)) => shell.on_tick(&tracker),
            Ok(ShellEvent::Command(command)) => {
                if shell.handle(command, &tracker) == Flow::Quit {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if last_save.elapsed() >= config.autosave_every {
            if let Err(err) = tracker.save() {
                log::error!("autosave failed: {err}");
            }
            last_save = Instant::now();
        }
    }

    tracker.shutdown().context("final save failed")?;
    log::info!("ScreenTime stopped");
    Ok(())
}
