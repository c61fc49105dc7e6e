//! Human-readable rendering of durations and timestamps.

use chrono::{FixedOffset, TimeZone};

use crate::types::Timestamp;

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;

/// Split milliseconds into whole `(hours, minutes, seconds)`. Negative
/// input is treated as zero.
fn split_ms(ms: i64) -> (i64, i64, i64) {
    let ms = ms.max(0);
    (
        ms / MS_PER_HOUR,
        (ms % MS_PER_HOUR) / MS_PER_MINUTE,
        (ms % MS_PER_MINUTE) / MS_PER_SECOND,
    )
}

/// Compact duration: `"2h 5m"` past the hour, `"5m 30s"` below it.
pub fn format_duration(ms: i64) -> String {
    let (hours, minutes, seconds) = split_ms(ms);
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m {seconds}s")
    }
}

/// Like [`format_duration`] but keeps seconds past the hour:
/// `"2h 5m 7s"`.
pub fn format_duration_long(ms: i64) -> String {
    let (hours, minutes, seconds) = split_ms(ms);
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else {
        format!("{minutes}m {seconds}s")
    }
}

/// `"dd/mm, HH:MM:SS"` in the given offset, `"-"` when unset.
pub fn format_timestamp(ts: Option<Timestamp>, offset: &FixedOffset) -> String {
    match ts {
        Some(ts) => offset
            .from_utc_datetime(&ts.naive_utc())
            .format("%d/%m, %H:%M:%S")
            .to_string(),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn short_durations_show_seconds() {
        assert_eq!(format_duration(0), "0m 0s");
        assert_eq!(format_duration(90_000), "1m 30s");
        assert_eq!(format_duration(59 * MS_PER_MINUTE + 59_999), "59m 59s");
    }

    #[test]
    fn long_durations_drop_seconds() {
        assert_eq!(format_duration(MS_PER_HOUR), "1h 0m");
        assert_eq!(format_duration(2 * MS_PER_HOUR + 5 * MS_PER_MINUTE + 7_000), "2h 5m");
        assert_eq!(
            format_duration_long(2 * MS_PER_HOUR + 5 * MS_PER_MINUTE + 7_000),
            "2h 5m 7s"
        );
    }

    #[test]
    fn negative_durations_clamp_to_zero() {
        assert_eq!(format_duration(-5_000), "0m 0s");
    }

    #[test]
    fn timestamps_render_in_offset() {
        let ts = Utc.with_ymd_and_hms(2023, 12, 21, 8, 0, 0).unwrap();
        let brt = FixedOffset::west_opt(3 * 3600).unwrap();

        assert_eq!(format_timestamp(Some(ts), &brt), "21/12, 05:00:00");
        assert_eq!(format_timestamp(None, &brt), "-");
    }
}
