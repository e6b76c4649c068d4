//! Broken-down wall-clock time used while expanding recurrences.
//!
//! Recurrence sets are computed on calendar fields rather than on instants,
//! so that "the 31st of every month" or "every Monday at 09:00" keep their
//! wall-clock meaning across month lengths and DST changes. Values may be
//! transiently invalid (the 31st of April) until the generator clamps them.

use std::cmp::Ordering;
use std::fmt;

use almanac_core::constants::SECONDS_PER_DAY;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike, Utc};
use chrono_tz::Tz;

use super::error::ExpansionError;
use super::timezone::convert_to_utc_lenient;

/// Field at which a [`TimePoint::compare`] stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

/// A calendar date and time of day, as separate fields.
///
/// `month` counts from 0 (January) to 11. `second` may reach 61 for range
/// bounds. `flag` is contextual: on literal RDATEs it marks an explicit end
/// or duration, on literal EXDATEs it marks a DATE value that excludes the
/// whole day. Ordering and equality ignore `flag`.
#[derive(Debug, Clone, Copy)]
pub struct TimePoint {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub hour: i32,
    pub minute: i32,
    pub second: i32,
    pub flag: bool,
}

#[must_use]
pub const fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Number of days in `month` (0-11) of `year`.
#[must_use]
pub const fn days_in_month(year: i32, month: i32) -> i32 {
    match month {
        1 if is_leap_year(year) => 29,
        1 => 28,
        3 | 5 | 8 | 10 => 30,
        _ => 31,
    }
}

#[must_use]
pub const fn days_in_year(year: i32) -> i32 {
    if is_leap_year(year) { 366 } else { 365 }
}

impl TimePoint {
    #[must_use]
    pub const fn new(year: i32, month: i32, day: i32, hour: i32, minute: i32, second: i32) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            flag: false,
        }
    }

    /// Midnight at the start of the given day.
    #[must_use]
    pub const fn date(year: i32, month: i32, day: i32) -> Self {
        Self::new(year, month, day, 0, 0, 0)
    }

    #[must_use]
    pub const fn with_flag(mut self, flag: bool) -> Self {
        self.flag = flag;
        self
    }

    #[must_use]
    #[expect(
        clippy::cast_possible_wrap,
        reason = "chrono calendar fields are at most 60"
    )]
    pub fn from_naive(naive: NaiveDateTime) -> Self {
        Self::new(
            naive.year(),
            naive.month0() as i32,
            naive.day() as i32,
            naive.hour() as i32,
            naive.minute() as i32,
            naive.second() as i32,
        )
    }

    /// Wall-clock time of `instant` in `zone`.
    #[must_use]
    pub fn from_instant(instant: DateTime<Utc>, zone: Tz) -> Self {
        Self::from_naive(instant.with_timezone(&zone).naive_local())
    }

    /// ## Summary
    /// Returns the wall-clock value, carrying seconds past 59 into the next minute.
    ///
    /// ## Errors
    /// Returns `ExpansionError::OutOfRange` if the date is not a real day.
    pub fn to_naive(&self) -> Result<NaiveDateTime, ExpansionError> {
        let date = u32::try_from(self.month + 1)
            .ok()
            .zip(u32::try_from(self.day).ok())
            .and_then(|(month, day)| NaiveDate::from_ymd_opt(self.year, month, day))
            .ok_or_else(|| ExpansionError::OutOfRange(self.to_string()))?;

        let seconds = i64::from(self.hour) * 3600 + i64::from(self.minute) * 60 + i64::from(self.second);
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| ExpansionError::OutOfRange(self.to_string()))?;

        midnight
            .checked_add_signed(TimeDelta::seconds(seconds))
            .ok_or_else(|| ExpansionError::OutOfRange(self.to_string()))
    }

    /// ## Summary
    /// Converts the wall-clock value in `zone` to an instant.
    ///
    /// Times in a DST gap move forward by an hour; ambiguous times take the
    /// earlier offset.
    ///
    /// ## Errors
    /// Returns `ExpansionError::OutOfRange` if the value cannot be represented.
    pub fn to_instant(&self, zone: Tz) -> Result<DateTime<Utc>, ExpansionError> {
        let naive = self.to_naive()?;
        convert_to_utc_lenient(naive, zone)
            .map_err(|e| ExpansionError::OutOfRange(format!("{self} in {zone}: {e}")))
    }

    /// Adds months, carrying into the year. The day is left as is and may be invalid.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "month offsets stay within the calendar range handled here"
    )]
    pub fn add_months(&mut self, months: i64) {
        let total = i64::from(self.month) + months;
        self.year += total.div_euclid(12) as i32;
        self.month = total.rem_euclid(12) as i32;
    }

    /// Adds days, walking month by month so the result is always a valid date.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "after normalisation the day is within 1..=31"
    )]
    pub fn add_days(&mut self, days: i64) {
        let mut day = i64::from(self.day) + days;

        if days >= 0 {
            loop {
                let month_len = i64::from(days_in_month(self.year, self.month));
                if day <= month_len {
                    break;
                }
                day -= month_len;
                self.month += 1;
                if self.month >= 12 {
                    self.year += 1;
                    self.month = 0;
                }
            }
        } else {
            while day <= 0 {
                if self.month == 0 {
                    self.year -= 1;
                    self.month = 11;
                } else {
                    self.month -= 1;
                }
                day += i64::from(days_in_month(self.year, self.month));
            }
        }

        self.day = day as i32;
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "remainder of a division by 24 fits in i32"
    )]
    pub fn add_hours(&mut self, hours: i64) {
        let total = i64::from(self.hour) + hours;
        self.hour = total.rem_euclid(24) as i32;
        let days = total.div_euclid(24);
        if days != 0 {
            self.add_days(days);
        }
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "remainder of a division by 60 fits in i32"
    )]
    pub fn add_minutes(&mut self, minutes: i64) {
        let total = i64::from(self.minute) + minutes;
        self.minute = total.rem_euclid(60) as i32;
        let hours = total.div_euclid(60);
        if hours != 0 {
            self.add_hours(hours);
        }
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "remainder of a division by 60 fits in i32"
    )]
    pub fn add_seconds(&mut self, seconds: i64) {
        let total = i64::from(self.second) + seconds;
        self.second = total.rem_euclid(60) as i32;
        let minutes = total.div_euclid(60);
        if minutes != 0 {
            self.add_minutes(minutes);
        }
    }

    /// Compares field by field, stopping after `granularity`.
    #[must_use]
    pub fn compare(&self, other: &Self, granularity: Granularity) -> Ordering {
        let fields = [
            (self.year, other.year, Granularity::Year),
            (self.month, other.month, Granularity::Month),
            (self.day, other.day, Granularity::Day),
            (self.hour, other.hour, Granularity::Hour),
            (self.minute, other.minute, Granularity::Minute),
            (self.second, other.second, Granularity::Second),
        ];

        for (ours, theirs, level) in fields {
            match ours.cmp(&theirs) {
                Ordering::Equal if level == granularity => return Ordering::Equal,
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }

    /// Days since 1970-01-01 (proleptic Gregorian). Linear in `day`, so a
    /// transiently invalid day still yields a usable number.
    #[must_use]
    pub fn day_number(&self) -> i64 {
        let month = i64::from(self.month) + 1;
        let year = i64::from(self.year) - i64::from(month <= 2);
        let era = year.div_euclid(400);
        let year_of_era = year - era * 400;
        let shifted_month = (month + 9) % 12;
        let day_of_year = (153 * shifted_month + 2) / 5 + i64::from(self.day) - 1;
        let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
        era * 146_097 + day_of_era - 719_468
    }

    /// Day of the week, Monday = 0 to Sunday = 6.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "remainder of a division by 7 fits in i32"
    )]
    pub fn weekday(&self) -> i32 {
        // 1970-01-01 was a Thursday.
        (self.day_number() + 3).rem_euclid(7) as i32
    }

    /// Days since the most recent `week_start` (0 = Monday).
    #[must_use]
    pub fn weekday_offset(&self, week_start: i32) -> i32 {
        (self.weekday() + 7 - week_start).rem_euclid(7)
    }

    /// Day of the year, 1-366.
    #[must_use]
    pub fn day_of_year(&self) -> i32 {
        (0..self.month)
            .map(|month| days_in_month(self.year, month))
            .sum::<i32>()
            + self.day
    }

    /// ## Summary
    /// Returns the day of week 1 of this point's year, shifted by
    /// `weekday_offset` days, keeping the time of day.
    ///
    /// Week 1 is the first `week_start`-anchored week with at least four days
    /// in the year, so its start may fall in the previous December.
    #[must_use]
    pub fn find_first_week_start(&self, week_start: i32, weekday_offset: i32) -> Self {
        let mut first = *self;
        first.month = 0;
        first.day = 1;

        let mut offset = (week_start + 7 - first.weekday()).rem_euclid(7);
        if offset >= 4 {
            offset -= 7;
        }

        first.add_days(i64::from(offset + weekday_offset));
        first
    }

    /// Caps the day at the real length of the month.
    pub fn clamp_day(&mut self) {
        let month_len = days_in_month(self.year, self.month);
        if self.day > month_len {
            self.day = month_len;
        }
    }

    /// Whole days plus remaining seconds from `self` to `later`, measured on
    /// the wall clock so DST transitions do not change the result.
    #[must_use]
    pub fn duration_until(&self, later: &Self) -> (i64, i64) {
        let mut days = later.day_number() - self.day_number();
        let mut seconds = later.seconds_of_day() - self.seconds_of_day();
        if seconds < 0 {
            days -= 1;
            seconds += SECONDS_PER_DAY;
        }
        (days, seconds)
    }

    fn seconds_of_day(&self) -> i64 {
        i64::from(self.hour) * 3600 + i64::from(self.minute) * 60 + i64::from(self.second)
    }
}

impl PartialEq for TimePoint {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TimePoint {}

impl PartialOrd for TimePoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimePoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other, Granularity::Second)
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year,
            self.month + 1,
            self.day,
            self.hour,
            self.minute,
            self.second
        )
    }
}
