use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::{Error, Result};

/// The calendar date of `instant` in the reference timezone. Day
/// boundaries are a product decision, independent of server-local time
/// and of UTC.
pub fn reference_date(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

/// "Today" in the reference timezone.
pub fn reference_today(offset: FixedOffset) -> NaiveDate {
    reference_date(Utc::now(), offset)
}

/// The next instant at which the daily job should fire: the first
/// occurrence of `run_time` (reference wall clock) strictly after `now`.
pub fn next_run_instant(
    now: DateTime<Utc>,
    offset: FixedOffset,
    run_time: NaiveTime,
) -> DateTime<Utc> {
    let today = reference_date(now, offset);

    for day_offset in 0..=2 {
        let candidate_date = today + chrono::Duration::days(day_offset);
        if let Some(candidate) = offset
            .from_local_datetime(&candidate_date.and_time(run_time))
            .single()
        {
            let candidate = candidate.with_timezone(&Utc);
            if candidate > now {
                return candidate;
            }
        }
    }

    // Unreachable with a fixed offset; fall back one day out.
    now + chrono::Duration::days(1)
}

/// Parse a caller-supplied `YYYY-MM-DD` date. Failures are client-input
/// errors, not system faults.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| Error::InvalidInput(format!("expected YYYY-MM-DD date, got '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eastern() -> FixedOffset {
        FixedOffset::east_opt(-5 * 3600).unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_reference_date_lags_utc_after_midnight() {
        // 02:00 UTC on Jan 2 is still Jan 1 in UTC-5
        let instant = utc(2026, 1, 2, 2, 0);
        assert_eq!(
            reference_date(instant, eastern()),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_reference_date_matches_utc_during_day() {
        let instant = utc(2026, 1, 2, 15, 0);
        assert_eq!(
            reference_date(instant, eastern()),
            NaiveDate::from_ymd_opt(2026, 1, 2).unwrap()
        );
    }

    #[test]
    fn test_next_run_later_today() {
        // 01:00 reference time, run at 03:00 -> 03:00 same reference day
        let now = utc(2026, 1, 2, 6, 0); // 01:00 in UTC-5
        let run_time = NaiveTime::from_hms_opt(3, 0, 0).unwrap();

        let next = next_run_instant(now, eastern(), run_time);
        assert_eq!(next, utc(2026, 1, 2, 8, 0)); // 03:00 UTC-5 = 08:00 UTC
    }

    #[test]
    fn test_next_run_rolls_to_tomorrow() {
        // 04:00 reference time, run at 03:00 -> tomorrow
        let now = utc(2026, 1, 2, 9, 0); // 04:00 in UTC-5
        let run_time = NaiveTime::from_hms_opt(3, 0, 0).unwrap();

        let next = next_run_instant(now, eastern(), run_time);
        assert_eq!(next, utc(2026, 1, 3, 8, 0));
    }

    #[test]
    fn test_next_run_exactly_at_fire_time_rolls_over() {
        let now = utc(2026, 1, 2, 8, 0);
        let run_time = NaiveTime::from_hms_opt(3, 0, 0).unwrap();

        let next = next_run_instant(now, eastern(), run_time);
        assert_eq!(next, utc(2026, 1, 3, 8, 0));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("2026-01-01").is_ok());
        let err = parse_date("01/02/2026").unwrap_err();
        assert!(err.is_invalid_input());
    }
}
