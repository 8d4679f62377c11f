//! Next-occurrence calculation for recurring schedules
//!
//! All arithmetic is in UTC. The deployment is single-timezone; `time_of_day`
//! is interpreted on the UTC clock.

use chrono::{DateTime, Datelike, Duration, Months, Utc};

use crate::db::models::Frequency;
use crate::{Error, Result};

/// Parse a "HH:MM" 24h clock string
pub fn parse_time_of_day(s: &str) -> Result<(u32, u32)> {
    let (h, m) = s
        .split_once(':')
        .ok_or_else(|| Error::InvalidInput(format!("invalid time of day: {}", s)))?;
    let hour: u32 = h
        .parse()
        .map_err(|_| Error::InvalidInput(format!("invalid time of day: {}", s)))?;
    let minute: u32 = m
        .parse()
        .map_err(|_| Error::InvalidInput(format!("invalid time of day: {}", s)))?;
    if hour > 23 || minute > 59 {
        return Err(Error::InvalidInput(format!("invalid time of day: {}", s)));
    }
    Ok((hour, minute))
}

/// Compute the next occurrence of a recurring slot strictly after `reference`.
///
/// - Find the next calendar date whose weekday equals `day_of_week`
///   (0 = Sunday .. 6 = Saturday); for MONTHLY, advance one month from
///   `reference` first, then adjust forward to the matching weekday.
/// - Set the time-of-day component to `time_of_day`.
/// - If the result is not strictly after `reference` (same day, time already
///   passed), advance by 7 days.
/// - For BIWEEKLY, if the gap from `reference` is under 7 days, add another
///   7 days; this keeps a minimum two-week cadence across the weekday
///   rollover edge case.
pub fn next_occurrence(
    day_of_week: i64,
    time_of_day: &str,
    frequency: Frequency,
    reference: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    if !(0..=6).contains(&day_of_week) {
        return Err(Error::InvalidInput(format!(
            "day_of_week must be 0-6, got {}",
            day_of_week
        )));
    }
    let (hour, minute) = parse_time_of_day(time_of_day)?;

    let base = match frequency {
        Frequency::Monthly => reference
            .checked_add_months(Months::new(1))
            .ok_or_else(|| Error::Internal("date overflow".to_string()))?,
        _ => reference,
    };

    let base_dow = base.weekday().num_days_from_sunday() as i64;
    let days_ahead = (day_of_week - base_dow).rem_euclid(7);
    let date = base.date_naive() + Duration::days(days_ahead);

    let mut candidate = date
        .and_hms_opt(hour, minute, 0)
        .ok_or_else(|| Error::Internal("invalid time".to_string()))?
        .and_utc();

    if candidate <= reference {
        candidate += Duration::days(7);
    }

    if frequency == Frequency::Biweekly && candidate - reference < Duration::days(7) {
        candidate += Duration::days(7);
    }

    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn weekly_same_day_time_passed_rolls_a_week() {
        // Wed 2025-06-04 15:00, slot Wed 14:00 -> following Wed 14:00
        let reference = utc(2025, 6, 4, 15, 0);
        let next = next_occurrence(3, "14:00", Frequency::Weekly, reference).unwrap();
        assert_eq!(next, utc(2025, 6, 11, 14, 0));
    }

    #[test]
    fn weekly_same_day_time_not_passed_stays() {
        // Wed 10:00, slot Wed 14:00 -> same day
        let reference = utc(2025, 6, 4, 10, 0);
        let next = next_occurrence(3, "14:00", Frequency::Weekly, reference).unwrap();
        assert_eq!(next, utc(2025, 6, 4, 14, 0));
    }

    #[test]
    fn biweekly_short_gap_adds_seven_days() {
        // Monday 2025-06-02, slot Wed (2 days out): gap < 7 so push to Wed + 7
        let reference = utc(2025, 6, 2, 9, 0);
        let next = next_occurrence(3, "11:00", Frequency::Biweekly, reference).unwrap();
        assert_eq!(next, utc(2025, 6, 11, 11, 0));
    }

    #[test]
    fn biweekly_gap_is_at_least_seven_days() {
        let refs = [
            utc(2025, 1, 1, 0, 0),
            utc(2025, 3, 15, 23, 59),
            utc(2025, 12, 31, 12, 0),
        ];
        for reference in refs {
            for dow in 0..7 {
                let next =
                    next_occurrence(dow, "09:30", Frequency::Biweekly, reference).unwrap();
                assert!(next - reference >= Duration::days(7));
            }
        }
    }

    #[test]
    fn monthly_advances_one_month_then_matches_weekday() {
        // Sunday 2025-06-01 -> base 2025-07-01 (Tue); next Friday is 2025-07-04
        let reference = utc(2025, 6, 1, 8, 0);
        let next = next_occurrence(5, "16:00", Frequency::Monthly, reference).unwrap();
        assert_eq!(next, utc(2025, 7, 4, 16, 0));
    }

    #[test]
    fn result_is_strictly_after_reference() {
        let refs = [
            utc(2025, 6, 4, 14, 0), // exactly at slot time
            utc(2025, 2, 28, 23, 59),
            utc(2024, 12, 31, 0, 0),
        ];
        for reference in refs {
            for freq in [Frequency::Weekly, Frequency::Biweekly, Frequency::Monthly] {
                for dow in 0..7 {
                    let next = next_occurrence(dow, "14:00", freq, reference).unwrap();
                    assert!(next > reference, "{:?} {:?} dow={}", reference, freq, dow);
                }
            }
        }
    }

    #[test]
    fn rejects_bad_inputs() {
        let reference = utc(2025, 6, 4, 10, 0);
        assert!(next_occurrence(7, "14:00", Frequency::Weekly, reference).is_err());
        assert!(next_occurrence(-1, "14:00", Frequency::Weekly, reference).is_err());
        assert!(next_occurrence(3, "25:00", Frequency::Weekly, reference).is_err());
        assert!(next_occurrence(3, "noon", Frequency::Weekly, reference).is_err());
        assert!(parse_time_of_day("12:60").is_err());
        assert!(parse_time_of_day("09:30").is_ok());
    }
}
