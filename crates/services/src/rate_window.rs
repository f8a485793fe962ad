//! # Rate Window Store
//!
//! Sliding-window timestamp helpers shared by every limiter. A timestamp
//! survives while `now - t < window_ms`; anything older is dropped in place.
//! Limiters must prune before counting so stale entries never take part in
//! a decision.

/// Removes every timestamp that has left the window.
pub fn prune(bucket: &mut Vec<i64>, now: i64, window_ms: i64) {
    bucket.retain(|&t| now - t < window_ms);
}

/// Prunes, then returns how many timestamps are still inside the window.
pub fn count(bucket: &mut Vec<i64>, now: i64, window_ms: i64) -> usize {
    prune(bucket, now, window_ms);
    bucket.len()
}

/// Milliseconds until the oldest of `timestamps` leaves the window.
pub fn remaining_ms<'a>(timestamps: impl IntoIterator<Item = &'a i64>, now: i64, window_ms: i64) -> i64 {
    timestamps
        .into_iter()
        .min()
        .map(|earliest| (earliest + window_ms - now).max(0))
        .unwrap_or(0)
}

const SECOND: i64 = 1_000;
const MINUTE: i64 = 60 * SECOND;
const HOUR: i64 = 60 * MINUTE;

/// Short countdown text: `"1h 5m"`, `"4m 10s"` or `"12s"`.
/// Seconds are rounded up and never shown as zero.
pub fn humanize_duration(ms: i64) -> String {
    let total_secs = ((ms.max(0) + SECOND - 1) / SECOND).max(1);
    let hours = total_secs / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Window length in words for quota messages: `"hour"`, `"3 hours"`,
/// `"10 minutes"`.
pub fn describe_window(window_ms: i64) -> String {
    let (amount, unit) = if window_ms % HOUR == 0 {
        (window_ms / HOUR, "hour")
    } else if window_ms % MINUTE == 0 {
        (window_ms / MINUTE, "minute")
    } else {
        ((window_ms + SECOND - 1) / SECOND, "second")
    };

    if amount == 1 {
        unit.to_string()
    } else {
        format!("{amount} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prune_drops_entries_at_or_past_the_window_edge() {
        let mut bucket = vec![0, 500, 999, 1_000];
        prune(&mut bucket, 1_000, 1_000);
        assert_eq!(bucket, vec![500, 999, 1_000]);

        assert_eq!(count(&mut bucket, 1_500, 1_000), 2);
        assert_eq!(bucket, vec![999, 1_000]);
    }

    #[test]
    fn remaining_uses_the_earliest_timestamp() {
        let timestamps = [4_000, 2_000, 3_000];
        assert_eq!(remaining_ms(&timestamps, 5_000, 10_000), 7_000);
        assert_eq!(remaining_ms(&Vec::<i64>::new(), 5_000, 10_000), 0);
        assert_eq!(remaining_ms(&[0], 50_000, 10_000), 0);
    }

    #[test]
    fn humanize_rounds_up_to_whole_seconds() {
        assert_eq!(humanize_duration(0), "1s");
        assert_eq!(humanize_duration(1), "1s");
        assert_eq!(humanize_duration(59_001), "1m 0s");
        assert_eq!(humanize_duration(5 * MINUTE), "5m 0s");
        assert_eq!(humanize_duration(2 * HOUR + 30 * MINUTE + 10), "2h 30m");
    }

    #[test]
    fn describe_window_pluralizes() {
        assert_eq!(describe_window(HOUR), "hour");
        assert_eq!(describe_window(3 * HOUR), "3 hours");
        assert_eq!(describe_window(10 * MINUTE), "10 minutes");
        assert_eq!(describe_window(1_500), "2 seconds");
    }
}
