use chrono::{DateTime, Utc};

/// Prefix of every generated report file name.
pub const REPORT_FILE_PREFIX: &str = "course_clip_progress_monthly";

/// Format a duration in seconds as zero-padded `HH:MM:SS`.
///
/// Hours are not wrapped at 24 and widen past two digits when needed.
/// Zero and negative durations render as `00:00:00`.
///
/// # Examples
///
/// ```
/// use clip_core::formatting::seconds_to_hms;
///
/// assert_eq!(seconds_to_hms(0),      "00:00:00");
/// assert_eq!(seconds_to_hms(3661),   "01:01:01");
/// assert_eq!(seconds_to_hms(-5),     "00:00:00");
/// assert_eq!(seconds_to_hms(360000), "100:00:00");
/// ```
pub fn seconds_to_hms(total_seconds: i64) -> String {
    if total_seconds <= 0 {
        return "00:00:00".to_string();
    }
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Watched share of a content as `"NN.NN%"`, capped at 100.
///
/// Returns an empty string when the content duration is not positive.
///
/// # Examples
///
/// ```
/// use clip_core::formatting::progress_percent;
///
/// assert_eq!(progress_percent(50, 100),  "50.00%");
/// assert_eq!(progress_percent(250, 100), "100.00%");
/// assert_eq!(progress_percent(10, 0),    "");
/// ```
pub fn progress_percent(played_secs: i64, content_secs: i64) -> String {
    if content_secs <= 0 {
        return String::new();
    }
    let ratio = (played_secs as f64 / content_secs as f64) * 100.0;
    format!("{:.2}%", ratio.min(100.0))
}

/// Report file name stamped with `now`.
///
/// The ISO-8601 timestamp is truncated to seconds and `:`/`.` are replaced by
/// `-` so the name is valid on every filesystem.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use clip_core::formatting::report_file_name;
///
/// let now = Utc.with_ymd_and_hms(2024, 3, 5, 9, 7, 1).unwrap();
/// assert_eq!(
///     report_file_name(now),
///     "course_clip_progress_monthly_2024-03-05T09-07-01.csv"
/// );
/// ```
pub fn report_file_name(now: DateTime<Utc>) -> String {
    let stamp = now
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
        .replace(|c: char| c == ':' || c == '.', "-");
    format!("{}_{}.csv", REPORT_FILE_PREFIX, stamp)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
