use chrono::{DateTime, Duration, Utc};

/// Returns the current UTC time in RFC 3339 format.
///
/// Used for the `started_at`/`finished_at` fields of the install report.
///
/// # Examples
/// ```ignore
/// let timestamp = current_timestamp();
/// println!("Started: {}", timestamp); // e.g., "2026-10-19T10:30:45.123456789+00:00"
/// ```
pub fn current_timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// Elapsed time between two RFC 3339 timestamps, or `None` if either does not parse.
pub fn elapsed_between(start: &str, end: &str) -> Option<Duration> {
    let start = DateTime::parse_from_rfc3339(start).ok()?;
    let end = DateTime::parse_from_rfc3339(end).ok()?;
    Some(end.signed_duration_since(start))
}

/// Formats a duration for the install summary, choosing the coarsest sensible unit.
///
/// - minutes and seconds for anything a minute or longer (`"3m 07s"`)
/// - seconds with one decimal otherwise (`"4.2s"`)
pub fn format_elapsed(duration: &Duration) -> String {
    if duration.num_minutes() > 0 {
        format!(
            "{}m {:02}s",
            duration.num_minutes(),
            duration.num_seconds() - duration.num_minutes() * 60
        )
    } else {
        let millis = duration.num_milliseconds().max(0);
        format!("{:.1}s", millis as f64 / 1000.0)
    }
}
