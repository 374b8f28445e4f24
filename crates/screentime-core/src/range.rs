use chrono::{DateTime, Duration, Local};

use crate::accumulator::{sort_by_active_time, Snapshot};

/// Named recency window applied to each record's `last_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeRange {
    Today,
    Last3Days,
    LastWeek,
    LastMonth,
}

impl TimeRange {
    pub const ALL: [TimeRange; 4] = [
        Self::Today,
        Self::Last3Days,
        Self::LastWeek,
        Self::LastMonth,
    ];

    pub fn duration(self) -> Duration {
        match self {
            Self::Today => Duration::hours(24),
            Self::Last3Days => Duration::hours(72),
            Self::LastWeek => Duration::hours(168),
            Self::LastMonth => Duration::hours(720),
        }
    }

    pub fn cutoff(self, now: DateTime<Local>) -> DateTime<Local> {
        now - self.duration()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Last3Days => "Last 3 Days",
            Self::LastWeek => "Last Week",
            Self::LastMonth => "Last Month",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Last3Days => "3d",
            Self::LastWeek => "week",
            Self::LastMonth => "month",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "today" | "day" | "1d" => Some(Self::Today),
            "3d" | "3days" => Some(Self::Last3Days),
            "week" | "7d" => Some(Self::LastWeek),
            "month" | "30d" => Some(Self::LastMonth),
            _ => None,
        }
    }
}

/// One ranked line of a range report.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRow {
    pub identity: String,
    pub path: String,
    pub active_seconds: u64,
    /// Fraction of the total across every record, not just the filtered ones.
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RangeReport {
    /// Nothing has ever been tracked.
    NoData,
    /// Records inside the window, most used first. May be empty.
    Rows(Vec<UsageRow>),
}

impl RangeReport {
    pub fn rows(&self) -> &[UsageRow] {
        match self {
            Self::NoData => &[],
            Self::Rows(rows) => rows,
        }
    }
}

/// Filters `snapshot` to records whose `last_start` falls inside `range`
/// ending at `now`, ranked by active time.
pub fn query(snapshot: &Snapshot, range: TimeRange, now: DateTime<Local>) -> RangeReport {
    if snapshot.is_empty() {
        return RangeReport::NoData;
    }

    let total = snapshot.total_seconds().max(1);
    let cutoff = range.cutoff(now);

    let mut included: Vec<_> = snapshot
        .records
        .iter()
        .filter(|record| record.last_start >= cutoff)
        .cloned()
        .collect();
    sort_by_active_time(&mut included);

    let rows = included
        .into_iter()
        .map(|record| UsageRow {
            share: record.active_seconds as f64 / total as f64,
            identity: record.identity,
            path: record.path,
            active_seconds: record.active_seconds,
        })
        .collect();
    RangeReport::Rows(rows)
}
