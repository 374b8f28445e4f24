//! JSON snapshot file.
//!
//! ```json
//! {
//!   "app_data": {
//!     "code.exe": {
//!       "time_in_seconds": 7920,
//!       "app_path": "C:\\Tools\\code.exe",
//!       "start_time": "2024-03-01 09:15:00"
//!     }
//!   }
//! }
//! ```

use chrono::{DateTime, Local, LocalResult, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::accumulator::{AppUsageRecord, Snapshot};
use crate::error::{Result, TrackerError};

/// Local time, second resolution.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Where the snapshot lives, relative to the working directory.
pub const DEFAULT_DATA_PATH: &str = "data/screentime.json";

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    time_in_seconds: u64,
    app_path: String,
    start_time: String,
}

#[derive(Serialize)]
struct DocumentOut<'a> {
    app_data: BTreeMap<&'a str, StoredEntry>,
}

#[derive(Deserialize)]
struct DocumentIn {
    app_data: serde_json::Map<String, serde_json::Value>,
}

/// Records recovered from disk plus the identities that had to be dropped.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub records: Vec<AppUsageRecord>,
    pub skipped: Vec<String>,
}

pub fn format_timestamp(ts: &DateTime<Local>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).ok()?;
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(a, b) => Some(a.min(b)),
        LocalResult::None => None,
    }
}

/// Writes `snapshot` to `path`, replacing the previous file atomically.
///
/// The document goes to a temp file in the same directory which is then
/// renamed over the target, so a failed write leaves the old file intact.
pub fn save(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let app_data = snapshot
        .records
        .iter()
        .map(|record| {
            (
                record.identity.as_str(),
                StoredEntry {
                    time_in_seconds: record.active_seconds,
                    app_path: record.path.clone(),
                    start_time: format_timestamp(&record.last_start),
                },
            )
        })
        .collect();
    let content = serde_json::to_string_pretty(&DocumentOut { app_data })
        .map_err(|e| TrackerError::json("failed to serialize usage data", e))?;

    write_atomic(path, |tmp| tmp.write_all(content.as_bytes()))
}

/// Runs `write` against a temp file next to `path`, then renames the temp
/// file over `path`. If `write` fails the target is never touched.
fn write_atomic(
    path: &Path,
    write: impl FnOnce(&mut tempfile::NamedTempFile) -> std::io::Result<()>,
) -> Result<()> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| {
        TrackerError::io(format!("failed to create data directory: {}", dir.display()), e)
    })?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| TrackerError::io("failed to create temp file", e))?;
    write(&mut tmp).map_err(|e| TrackerError::io("failed to write temp file", e))?;
    tmp.flush()
        .map_err(|e| TrackerError::io("failed to flush temp file", e))?;
    tmp.persist(path).map_err(|e| {
        TrackerError::io(format!("failed to replace {}", path.display()), e.error)
    })?;

    Ok(())
}

/// Renames the file at `path` to `<name>.unreadable-<timestamp>` so a
/// document that failed to load survives the next save.
pub fn set_aside(path: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "usage".to_owned());
    let aside = path.with_file_name(format!(
        "{name}.unreadable-{}",
        Local::now().format("%Y%m%d-%H%M%S")
    ));
    fs::rename(path, &aside).map_err(|e| {
        TrackerError::io(format!("failed to move {} aside", path.display()), e)
    })?;
    Ok(aside)
}

/// Reads the snapshot at `path`.
///
/// A missing file is a fresh start. A document that doesn't parse aborts
/// the whole load. Entries with missing fields or unreadable timestamps are
/// skipped individually.
pub fn load(path: &Path) -> Result<LoadReport> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(LoadReport::default()),
        Err(err) => {
            return Err(TrackerError::io(
                format!("failed to read usage data: {}", path.display()),
                err,
            ))
        }
    };

    let document: DocumentIn = serde_json::from_str(&content)
        .map_err(|e| TrackerError::MalformedDocument(format!("{}: {e}", path.display())))?;

    let mut report = LoadReport::default();
    for (identity, value) in document.app_data {
        match decode_entry(&identity, value) {
            Some(record) => report.records.push(record),
            None => {
                log::warn!("skipping malformed usage entry: {identity}");
                report.skipped.push(identity);
            }
        }
    }
    Ok(report)
}

fn decode_entry(identity: &str, value: serde_json::Value) -> Option<AppUsageRecord> {
    let entry: StoredEntry = serde_json::from_value(value).ok()?;
    let last_start = parse_timestamp(&entry.start_time)?;
    Some(
        AppUsageRecord::new(identity, entry.app_path, last_start)
            .with_seconds(entry.time_in_seconds),
    )
}
