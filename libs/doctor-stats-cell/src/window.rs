//! Day and month boundaries used to bucket bookings.
//!
//! Boundaries are computed in the time zone of the reference instant and
//! returned as UTC instants so they can be compared against stored slots.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::models::StatsError;

/// Longest DST gap we step over when a local midnight does not exist.
const MAX_GAP_MINUTES: i64 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsWindow {
    /// 00:00:00.000 local, today.
    pub day_start: DateTime<Utc>,
    /// 23:59:59.999 local, today.
    pub day_end: DateTime<Utc>,
    /// 00:00:00.000 local on the 1st of the month.
    pub month_start: DateTime<Utc>,
    /// 23:59:59.999 local on the last day of the month.
    pub month_end: DateTime<Utc>,
}

impl StatsWindow {
    pub fn containing<Tz: TimeZone>(now: &DateTime<Tz>) -> Result<Self, StatsError> {
        let tz = now.timezone();
        let today = now.date_naive();

        let first_of_month = NaiveDate::from_ymd_opt(today.year(), today.month(), 1)
            .ok_or_else(|| StatsError::Window(format!("no first day for {}", today)))?;
        let last_of_month = last_day_of_month(today.year(), today.month())
            .ok_or_else(|| StatsError::Window(format!("no last day for {}", today)))?;

        Ok(Self {
            day_start: start_of(&tz, today)?,
            day_end: end_of(&tz, today)?,
            month_start: start_of(&tz, first_of_month)?,
            month_end: end_of(&tz, last_of_month)?,
        })
    }
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

fn start_of<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Result<DateTime<Utc>, StatsError> {
    let naive = date.and_time(NaiveTime::MIN);
    resolve_local(tz, naive, Duration::minutes(1))
}

fn end_of<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Result<DateTime<Utc>, StatsError> {
    let naive = date
        .and_hms_milli_opt(23, 59, 59, 999)
        .ok_or_else(|| StatsError::Window(format!("no end of day for {}", date)))?;
    resolve_local(tz, naive, -Duration::minutes(1))
}

/// Maps a local wall-clock time to UTC. Ambiguous times pick the earlier
/// instant when stepping forward (starts) and the later one when stepping
/// back (ends); times inside a gap move by `step` until they exist.
fn resolve_local<Tz: TimeZone>(
    tz: &Tz,
    naive: NaiveDateTime,
    step: Duration,
) -> Result<DateTime<Utc>, StatsError> {
    let mut candidate = naive;
    for _ in 0..=MAX_GAP_MINUTES {
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(dt) => return Ok(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, latest) => {
                let chosen = if step > Duration::zero() { earliest } else { latest };
                return Ok(chosen.with_timezone(&Utc));
            }
            LocalResult::None => candidate += step,
        }
    }

    Err(StatsError::Window(format!("local time {} does not exist", naive)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Timelike};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn days_in_month(year: i32, month: u32) -> u32 {
        last_day_of_month(year, month).unwrap().day()
    }

    /// São Paulo's 2018/19 summer time: clocks jumped from 00:00 to 01:00 on
    /// 2018-11-04 (UTC-3 to UTC-2) and fell back from 00:00 to 23:00 on
    /// 2019-02-16 (UTC-2 to UTC-3).
    #[derive(Debug, Clone, Copy)]
    struct SaoPauloSummer2018;

    impl SaoPauloSummer2018 {
        fn standard() -> FixedOffset {
            FixedOffset::west_opt(3 * 3600).unwrap()
        }

        fn summer() -> FixedOffset {
            FixedOffset::west_opt(2 * 3600).unwrap()
        }

        fn offset_at_utc(utc: &NaiveDateTime) -> FixedOffset {
            let spring_forward = NaiveDate::from_ymd_opt(2018, 11, 4).unwrap().and_hms_opt(3, 0, 0).unwrap();
            let fall_back = NaiveDate::from_ymd_opt(2019, 2, 17).unwrap().and_hms_opt(2, 0, 0).unwrap();
            if spring_forward <= *utc && *utc < fall_back {
                Self::summer()
            } else {
                Self::standard()
            }
        }
    }

    impl TimeZone for SaoPauloSummer2018 {
        type Offset = FixedOffset;

        fn from_offset(_offset: &FixedOffset) -> Self {
            SaoPauloSummer2018
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            // Candidates in ascending UTC order: summer time maps to the earlier instant.
            let valid: Vec<FixedOffset> = [Self::summer(), Self::standard()]
                .into_iter()
                .filter(|offset| {
                    let utc = *local - Duration::seconds(offset.local_minus_utc() as i64);
                    Self::offset_at_utc(&utc) == *offset
                })
                .collect();

            match valid.as_slice() {
                [] => LocalResult::None,
                [only] => LocalResult::Single(*only),
                [earliest, latest, ..] => LocalResult::Ambiguous(*earliest, *latest),
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            Self::offset_at_utc(&utc.and_time(NaiveTime::MIN))
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            Self::offset_at_utc(utc)
        }
    }

    #[test]
    fn day_bounds_cover_whole_day_inclusive() {
        let window = StatsWindow::containing(&utc(2026, 10, 18, 14, 30, 0)).unwrap();

        assert_eq!(window.day_start, utc(2026, 10, 18, 0, 0, 0));
        assert_eq!(window.day_end, utc(2026, 10, 18, 23, 59, 59) + Duration::milliseconds(999));
    }

    #[test]
    fn month_bounds_follow_calendar_length() {
        let cases = [
            ((2026, 2, 10), 28),
            ((2024, 2, 29), 29),
            ((2026, 4, 1), 30),
            ((2026, 1, 31), 31),
        ];

        for ((y, m, d), days) in cases {
            let window = StatsWindow::containing(&utc(y, m, d, 12, 0, 0)).unwrap();
            assert_eq!(window.month_start, utc(y, m, 1, 0, 0, 0));
            assert_eq!(window.month_end.day(), days, "{}-{}", y, m);
            assert_eq!(window.month_end.hour(), 23);
            assert_eq!(window.month_end.nanosecond(), 999_000_000);
        }
    }

    #[test]
    fn december_rolls_into_next_year() {
        assert_eq!(days_in_month(2026, 12), 31);

        let window = StatsWindow::containing(&utc(2026, 12, 31, 23, 59, 59)).unwrap();
        assert_eq!(window.month_start, utc(2026, 12, 1, 0, 0, 0));
        assert_eq!(window.month_end, utc(2026, 12, 31, 23, 59, 59) + Duration::milliseconds(999));
        assert_eq!(window.day_start, utc(2026, 12, 31, 0, 0, 0));
    }

    #[test]
    fn century_leap_rules() {
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
    }

    #[test]
    fn bounds_are_local_to_the_reference_offset() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        // 00:30 local on Nov 1 is still Oct 31 in UTC.
        let now = tz.with_ymd_and_hms(2026, 11, 1, 0, 30, 0).unwrap();
        let window = StatsWindow::containing(&now).unwrap();

        assert_eq!(window.day_start, utc(2026, 10, 31, 22, 0, 0));
        assert_eq!(window.month_start, utc(2026, 10, 31, 22, 0, 0));
        assert_eq!(window.month_end, utc(2026, 11, 30, 21, 59, 59) + Duration::milliseconds(999));
    }

    #[test]
    fn missing_midnight_starts_at_first_instant_after_gap() {
        // Noon on the spring-forward day, UTC-2.
        let now = utc(2018, 11, 4, 14, 0, 0).with_timezone(&SaoPauloSummer2018);
        let window = StatsWindow::containing(&now).unwrap();

        // 00:00-00:59 local never happened; the day starts at 01:00 UTC-2.
        assert_eq!(window.day_start, utc(2018, 11, 4, 3, 0, 0));
        assert_eq!(window.day_end, utc(2018, 11, 5, 1, 59, 59) + Duration::milliseconds(999));
        // The 1st of the month was still standard time.
        assert_eq!(window.month_start, utc(2018, 11, 1, 3, 0, 0));
        assert_eq!(window.month_end, utc(2018, 12, 1, 1, 59, 59) + Duration::milliseconds(999));
    }

    #[test]
    fn repeated_end_of_day_takes_the_latest_instant() {
        // Noon on the fall-back day, UTC-2. 23:00-23:59 local happens twice.
        let now = utc(2019, 2, 16, 14, 0, 0).with_timezone(&SaoPauloSummer2018);
        let window = StatsWindow::containing(&now).unwrap();

        assert_eq!(window.day_start, utc(2019, 2, 16, 2, 0, 0));
        assert_eq!(window.day_end, utc(2019, 2, 17, 2, 59, 59) + Duration::milliseconds(999));
        assert_eq!(window.month_end, utc(2019, 3, 1, 2, 59, 59) + Duration::milliseconds(999));
    }

    #[test]
    fn repeated_start_takes_the_earliest_instant() {
        let local = NaiveDate::from_ymd_opt(2019, 2, 16).unwrap().and_hms_opt(23, 30, 0).unwrap();

        let start = resolve_local(&SaoPauloSummer2018, local, Duration::minutes(1)).unwrap();
        let end = resolve_local(&SaoPauloSummer2018, local, -Duration::minutes(1)).unwrap();

        assert_eq!(start, utc(2019, 2, 17, 1, 30, 0));
        assert_eq!(end, utc(2019, 2, 17, 2, 30, 0));
    }
}
