//! Parsing of relative ages and absolute instants from the command line

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Duration, Utc};

/// Parse an age such as `90s`, `15m`, `1h`, `30d` or `2w`
pub fn parse_age(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| anyhow!("age {raw:?} needs a unit (s, m, h, d, w)"))?;
    let (digits, unit) = raw.split_at(split);
    if digits.is_empty() {
        bail!("age {raw:?} must start with a number");
    }
    let count: i64 = digits
        .parse()
        .with_context(|| format!("invalid number in age {raw:?}"))?;

    let unit_secs = match unit {
        "s" | "sec" | "secs" => 1,
        "m" | "min" | "mins" => 60,
        "h" | "hour" | "hours" => 3_600,
        "d" | "day" | "days" => 86_400,
        "w" | "week" | "weeks" => 604_800,
        other => bail!("unknown unit {other:?} in age {raw:?}"),
    };

    count
        .checked_mul(unit_secs)
        .and_then(Duration::try_seconds)
        .ok_or_else(|| anyhow!("age {raw:?} is too large"))
}

/// Parse `--since`: an RFC 3339 instant, or an age counted back from `now`
pub fn parse_since(raw: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw.trim()) {
        return Ok(instant.with_timezone(&Utc));
    }
    let age = parse_age(raw).with_context(|| format!("{raw:?} is neither an age nor an RFC 3339 time"))?;
    now.checked_sub_signed(age)
        .ok_or_else(|| anyhow!("age {raw:?} reaches before the supported time range"))
}
