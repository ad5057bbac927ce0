use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};

const NANOS_PER_UNIT: [(&str, f64); 8] = [
    ("ns", 1.0),
    ("us", 1e3),
    ("\u{b5}s", 1e3),
    ("\u{3bc}s", 1e3),
    ("ms", 1e6),
    ("s", 1e9),
    ("m", 60e9),
    ("h", 3600e9),
];

fn unit_nanos(unit: &str) -> Option<f64> {
    NANOS_PER_UNIT
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, nanos)| *nanos)
}

/// Parses a duration such as "90s", "1h30m", "1.5h" or "-2m".
///
/// The grammar is an optional sign followed by one or more
/// `<decimal><unit>` segments; "0" alone is accepted without a unit.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let (negative, mut rest) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };
    if rest == "0" {
        return Some(Duration::zero());
    }
    if rest.is_empty() {
        return None;
    }

    let mut total = 0f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        if number.is_empty() || number == "." || number.matches('.').count() > 1 {
            return None;
        }
        let value: f64 = number.parse().ok()?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        total += value * unit_nanos(unit)?;
        rest = tail;
    }

    if total > i64::MAX as f64 {
        return None;
    }
    let nanos = total.round() as i64;
    Some(Duration::nanoseconds(if negative { -nanos } else { nanos }))
}

/// Resolves one `--start-time`/`--end-time` value. A relative duration is
/// measured backward from `now`; anything else must be an RFC 3339
/// timestamp. An empty value means no bound.
pub fn parse_time_bound(flag: &str, input: &str, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    if let Some(duration) = parse_duration(input) {
        return Ok(Some(now - duration));
    }
    match DateTime::parse_from_rfc3339(input) {
        Ok(at) => Ok(Some(at.with_timezone(&Utc))),
        Err(e) => Err(Error::Validation(format!("invalid {} {:?}: {}", flag, input, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("2h"), Some(Duration::hours(2)));
        assert_eq!(parse_duration("1h30m"), Some(Duration::minutes(90)));
        assert_eq!(parse_duration("1.5h"), Some(Duration::minutes(90)));
        assert_eq!(parse_duration("300ms"), Some(Duration::milliseconds(300)));
        assert_eq!(parse_duration("10\u{b5}s"), Some(Duration::microseconds(10)));
        assert_eq!(parse_duration("-1m"), Some(Duration::minutes(-1)));
        assert_eq!(parse_duration("+45s"), Some(Duration::seconds(45)));
        assert_eq!(parse_duration("0"), Some(Duration::zero()));
    }

    #[test]
    fn malformed_durations() {
        for input in ["", "h", "5", "2d", "1..5h", ".h", "-", "2h junk"] {
            assert_eq!(parse_duration(input), None, "{:?}", input);
        }
    }

    #[test]
    fn relative_bound_counts_back_from_now() {
        let bound = parse_time_bound("--start-time", "2h", now()).unwrap();
        assert_eq!(bound, Some(Utc.with_ymd_and_hms(2024, 3, 10, 10, 0, 0).unwrap()));
    }

    #[test]
    fn absolute_bound_is_rfc3339() {
        let bound = parse_time_bound("--end-time", "2024-03-09T18:30:00+09:00", now()).unwrap();
        assert_eq!(bound, Some(Utc.with_ymd_and_hms(2024, 3, 9, 9, 30, 0).unwrap()));
    }

    #[test]
    fn empty_bound_is_unbounded() {
        assert_eq!(parse_time_bound("--start-time", "", now()).unwrap(), None);
    }

    #[test]
    fn unparsable_bound_names_the_flag() {
        let err = parse_time_bound("--end-time", "yesterday", now()).unwrap_err();
        assert!(matches!(&err, Error::Validation(_)));
        assert!(err.to_string().starts_with("invalid --end-time \"yesterday\""));

        // Dates without a time or offset are ambiguous and rejected.
        assert!(parse_time_bound("--start-time", "2024-03-09", now()).is_err());
    }
}
