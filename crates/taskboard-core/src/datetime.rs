use std::sync::OnceLock;

use anyhow::{Context, anyhow};
use chrono::{Days, Local, NaiveDate, Utc};
use chrono_tz::Tz;
use regex::Regex;
use tracing::{debug, warn};

fn relative_re() -> anyhow::Result<&'static Regex> {
    static RELATIVE: OnceLock<Regex> = OnceLock::new();
    if let Some(re) = RELATIVE.get() {
        return Ok(re);
    }
    let re = Regex::new(r"^(?:in\s+)?(?P<sign>[+-])?(?P<num>\d+)\s*(?P<unit>d|w|days?|weeks?)$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;
    Ok(RELATIVE.get_or_init(|| re))
}

/// Resolves the calendar date "today" is in. An empty or absent zone means the
/// local clock; an unknown zone name is an error.
pub fn today_in(timezone: Option<&str>) -> anyhow::Result<NaiveDate> {
    match timezone.map(str::trim) {
        None | Some("") => Ok(Local::now().date_naive()),
        Some(name) => {
            let tz: Tz = name
                .parse()
                .map_err(|e| anyhow!("invalid timezone {name}: {e}"))?;
            let today = Utc::now().with_timezone(&tz).date_naive();
            debug!(timezone = %name, %today, "resolved today");
            Ok(today)
        }
    }
}

/// Parses a deadline expression relative to `today`.
///
/// Accepts `YYYY-MM-DD`, `YYYYMMDD`, `today`, `tomorrow`, `yesterday`, and
/// relative offsets such as `+3d`, `2w`, `in 5 days`.
pub fn parse_deadline(expr: &str, today: NaiveDate) -> anyhow::Result<NaiveDate> {
    let token = expr.trim().to_ascii_lowercase();
    if token.is_empty() {
        return Err(anyhow!("deadline cannot be empty"));
    }

    match token.as_str() {
        "today" | "now" => return Ok(today),
        "tomorrow" => return shift(today, 1),
        "yesterday" => return shift(today, -1),
        _ => {}
    }

    if let Ok(date) = NaiveDate::parse_from_str(&token, "%Y-%m-%d") {
        return Ok(date);
    }
    if token.len() == 8
        && let Ok(date) = NaiveDate::parse_from_str(&token, "%Y%m%d")
    {
        return Ok(date);
    }

    if let Some(caps) = relative_re()?.captures(&token) {
        let num: i64 = caps
            .name("num")
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("missing relative amount"))?
            .parse()
            .context("invalid relative number")?;
        let negative = caps.name("sign").map(|m| m.as_str()) == Some("-");
        let unit = caps.name("unit").map(|m| m.as_str()).unwrap_or("d");
        let days = if unit.starts_with('w') { num * 7 } else { num };
        return shift(today, if negative { -days } else { days });
    }

    warn!(expr = %expr, "unrecognised deadline expression");
    Err(anyhow!("unrecognised deadline: {expr}"))
}

fn shift(today: NaiveDate, days: i64) -> anyhow::Result<NaiveDate> {
    let magnitude = Days::new(days.unsigned_abs());
    let shifted = if days < 0 {
        today.checked_sub_days(magnitude)
    } else {
        today.checked_add_days(magnitude)
    };
    shifted.ok_or_else(|| anyhow!("deadline offset {days}d out of range"))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{parse_deadline, today_in};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn absolute_and_named_dates() {
        let today = date(2026, 10, 17);
        assert_eq!(parse_deadline("2026-12-01", today).expect("iso"), date(2026, 12, 1));
        assert_eq!(parse_deadline("20261201", today).expect("compact"), date(2026, 12, 1));
        assert_eq!(parse_deadline("Today", today).expect("today"), today);
        assert_eq!(parse_deadline("tomorrow", today).expect("tomorrow"), date(2026, 10, 18));
        assert_eq!(parse_deadline("yesterday", today).expect("yesterday"), date(2026, 10, 16));
    }

    #[test]
    fn relative_offsets() {
        let today = date(2026, 10, 30);
        assert_eq!(parse_deadline("+3d", today).expect("+3d"), date(2026, 11, 2));
        assert_eq!(parse_deadline("-2d", today).expect("-2d"), date(2026, 10, 28));
        assert_eq!(parse_deadline("2w", today).expect("2w"), date(2026, 11, 13));
        assert_eq!(parse_deadline("in 5 days", today).expect("in 5 days"), date(2026, 11, 4));
    }

    #[test]
    fn garbage_is_rejected() {
        let today = date(2026, 10, 17);
        assert!(parse_deadline("", today).is_err());
        assert!(parse_deadline("someday", today).is_err());
        assert!(parse_deadline("2026-13-01", today).is_err());
    }

    #[test]
    fn unknown_timezone_is_an_error() {
        assert!(today_in(Some("Mars/Olympus_Mons")).is_err());
        assert!(today_in(Some("America/Mexico_City")).is_ok());
        assert!(today_in(None).is_ok());
    }
}
