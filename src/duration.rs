//! Poll duration strings such as `30s`, `1h`, `3d` or `2w`.

use crate::error::{Error, Result};
use regex::Regex;
use std::time::Duration;
use tracing::warn;

const SECOND: u64 = 1;
const HOUR: u64 = 60 * 60;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;

/// Duration used when none is configured or parsing fails
pub const DEFAULT_DURATION: Duration = Duration::from_secs(HOUR);

/// Longest poll Discord accepts, in hours (32 days)
pub const MAX_POLL_HOURS: u32 = 768;

/// Parse a duration string of the form `<n><unit>` where unit is one of
/// `s`, `h`, `d`, `w`. Surrounding whitespace and case are ignored.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let normalized = input.trim().to_lowercase();
    let pattern = Regex::new(r"^(\d+)([shdw])$")?;

    let captures = pattern
        .captures(&normalized)
        .ok_or_else(|| Error::InvalidDuration(input.to_string()))?;

    let value: u64 = captures[1]
        .parse()
        .map_err(|_| Error::InvalidDuration(input.to_string()))?;

    let unit = match &captures[2] {
        "s" => SECOND,
        "h" => HOUR,
        "d" => DAY,
        "w" => WEEK,
        _ => return Err(Error::InvalidDuration(input.to_string())),
    };

    value
        .checked_mul(unit)
        .map(Duration::from_secs)
        .ok_or_else(|| Error::InvalidDuration(input.to_string()))
}

/// Lenient variant used by the runner: missing or empty input means one hour,
/// and an unparsable value is logged and replaced by one hour.
pub fn parse_duration_or_default(input: Option<&str>) -> Duration {
    match input.map(str::trim) {
        None | Some("") => DEFAULT_DURATION,
        Some(raw) => parse_duration(raw).unwrap_or_else(|e| {
            warn!(duration = raw, error = %e, "failed to parse poll.duration, using 1h");
            DEFAULT_DURATION
        }),
    }
}

/// Convert a wait duration into the whole-hour duration the poll API takes.
/// Rounds up, never returns less than one hour and caps at [`MAX_POLL_HOURS`].
pub fn poll_hours(duration: Duration) -> u32 {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    let hours = secs.div_ceil(HOUR).max(1);

    if hours > u64::from(MAX_POLL_HOURS) {
        warn!(
            requested_hours = hours,
            max_hours = MAX_POLL_HOURS,
            "poll duration exceeds the Discord maximum, clamping"
        );
        return MAX_POLL_HOURS;
    }

    hours as u32
}
