use anyhow::{bail, Context, Result};
use screentime_core::{TimeRange, DEFAULT_DATA_PATH};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_path: PathBuf,
    pub autosave_every: Duration,
    /// Zero disables the periodic report.
    pub report_every: Duration,
    pub initial_range: TimeRange,
    pub read_stdin: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            autosave_every: Duration::from_secs(60),
            report_every: Duration::from_secs(60),
            initial_range: TimeRange::Today,
            read_stdin: true,
        }
    }
}

impl Config {
    /// `Ok(None)` means help was requested.
    pub fn from_args() -> Result<Option<Self>> {
        Self::parse(env::args().skip(1))
    }

    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Option<Self>> {
        let mut config = Self::default();
        let mut autosave_secs: u64 = config.autosave_every.as_secs();
        let mut report_secs: u64 = config.report_every.as_secs();

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--data" => {
                    let value = args.next().context("missing value for --data")?;
                    config.data_path = PathBuf::from(value);
                }
                "--autosave-secs" => {
                    let value = args.next().context("missing value for --autosave-secs")?;
                    autosave_secs = value
                        .parse::<u64>()
                        .with_context(|| format!("invalid --autosave-secs value: {value}"))?;
                }
                "--report-secs" => {
                    let value = args.next().context("missing value for --report-secs")?;
                    report_secs = value
                        .parse::<u64>()
                        .with_context(|| format!("invalid --report-secs value: {value}"))?;
                }
                "--range" => {
                    let value = args.next().context("missing value for --range")?;
                    config.initial_range = TimeRange::from_code(&value)
                        .with_context(|| format!("invalid --range value: {value}"))?;
                }
                "--no-input" => config.read_stdin = false,
                "--help" | "-h" => return Ok(None),
                _ => bail!("unknown argument: {arg}"),
            }
        }

        if autosave_secs == 0 {
            bail!("--autosave-secs must be greater than zero");
        }

        config.autosave_every = Duration::from_secs(autosave_secs);
        config.report_every = Duration::from_secs(report_secs);
        Ok(Some(config))
    }
}

pub fn print_help() {
    println!(
        "\
ScreenTime

Usage:
  screentime [--data <path>] [--autosave-secs <s>] [--report-secs <s>] [--range <r>] [--no-input]

Options:
  --data           Usage file path (default: {DEFAULT_DATA_PATH})
  --autosave-secs  Periodic save interval in seconds (default: 60)
  --report-secs    Periodic report interval in seconds, 0 to disable (default: 60)
  --range          Initial report range: today, 3d, week, month (default: today)
  --no-input       Don't read commands from stdin
  -h, --help       Print this help

Commands (stdin):
  show [range]  print a report and keep printing it periodically
  hide          stop periodic reports
  pause | resume | toggle
  clear         wipe all usage and save
  save          write the usage file now
  status        current application and pause state
  quit          save and exit"
    );
}
