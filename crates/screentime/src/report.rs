use screentime_core::{format_duration, RangeReport, Snapshot, TimeRange};
use std::fmt::Write;

const BAR_WIDTH: usize = 30;
const NAME_WIDTH: usize = 28;

/// Text rendering of a range report: one row per application with a bar
/// sized by its share of all tracked time.
pub fn render(range: TimeRange, report: &RangeReport, paused: bool) -> String {
    let mut out = String::new();
    let marker = if paused { " [paused]" } else { "" };
    let _ = writeln!(out, "== {}{marker} ==", range.label());

    let rows = match report {
        RangeReport::NoData => {
            out.push_str("  no data yet\n");
            return out;
        }
        RangeReport::Rows(rows) if rows.is_empty() => {
            out.push_str("  nothing used in this range\n");
            return out;
        }
        RangeReport::Rows(rows) => rows,
    };

    for row in rows {
        let filled = bar_cells(row.share);
        let _ = writeln!(
            out,
            "  {:<name_w$} {}{} {}",
            clip(&row.identity, NAME_WIDTH),
            "#".repeat(filled),
            ".".repeat(BAR_WIDTH - filled),
            format_duration(row.active_seconds),
            name_w = NAME_WIDTH,
        );
    }
    out
}

pub fn render_status(snapshot: &Snapshot) -> String {
    let current = snapshot.current.as_deref().unwrap_or("(none)");
    let state = if snapshot.paused { "paused" } else { "tracking" };
    format!(
        "{state} | current: {current} | apps: {} | total: {}",
        snapshot.len(),
        format_duration(snapshot.total_seconds())
    )
}

fn bar_cells(share: f64) -> usize {
    let cells = (share.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    cells.min(BAR_WIDTH)
}

fn clip(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_owned();
    }
    let mut clipped: String = name.chars().take(width.saturating_sub(1)).collect();
    clipped.push('~');
    clipped
}
