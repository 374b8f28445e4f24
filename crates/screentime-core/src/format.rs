/// Formats accumulated seconds for display: `"2h 12m"`, `"45m"`, or `"0m"`
/// for anything under a minute.
pub fn format_duration(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    if h > 0 {
        format!("{h}h {m}m")
    } else {
        format!("{m}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_hours_and_minutes() {
        assert_eq!(format_duration(7920), "2h 12m");
        assert_eq!(format_duration(3600), "1h 0m");
        assert_eq!(format_duration(2700), "45m");
        assert_eq!(format_duration(59), "0m");
        assert_eq!(format_duration(0), "0m");
    }
}
