/// Toggl stores the duration of a running entry as the negative unix
/// timestamp of its start, so `now + raw` is the elapsed time.
pub fn elapsed_seconds(raw_duration: i64, now: i64) -> i64 {
    if raw_duration < 0 {
        now.saturating_add(raw_duration).max(0)
    } else {
        raw_duration
    }
}

pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < 60 {
        return format!("{} seconds", seconds);
    }
    format!("{} minutes, {} seconds", seconds / 60, seconds % 60)
}

pub fn format_elapsed(raw_duration: i64, now: i64) -> String {
    format_duration(elapsed_seconds(raw_duration, now))
}
