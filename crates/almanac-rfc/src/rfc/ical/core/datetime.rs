//! iCalendar DATE and DATE-TIME value types (RFC 5545 §3.3.4, §3.3.5).

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};

use crate::error::{RfcError, RfcResult};

/// DATE value (RFC 5545 §3.3.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    /// Year (e.g., 2026).
    pub year: u16,
    /// Month (1-12).
    pub month: u8,
    /// Day of month (1-31).
    pub day: u8,
}

impl Date {
    /// Creates a new date.
    #[must_use]
    pub const fn new(year: u16, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    /// Returns the calendar date, or `None` if the fields do not name a real day.
    #[must_use]
    pub fn naive(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(
            i32::from(self.year),
            u32::from(self.month),
            u32::from(self.day),
        )
    }

    /// ## Summary
    /// Parses a basic-format DATE (`YYYYMMDD`).
    ///
    /// ## Errors
    /// Returns an error if the text is not eight digits or does not name a real day.
    pub fn parse(text: &str) -> RfcResult<Self> {
        if text.len() != 8 || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RfcError::ParseError(format!("invalid DATE value '{text}'")));
        }

        let date = Self {
            year: digits(text, 0..4, "year")?,
            month: digits(text, 4..6, "month")?,
            day: digits(text, 6..8, "day")?,
        };

        if date.naive().is_none() {
            return Err(RfcError::ValidationError(format!(
                "DATE value '{text}' is not a calendar day"
            )));
        }

        Ok(date)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}{:02}", self.year, self.month, self.day)
    }
}

impl From<NaiveDate> for Date {
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "chrono month and day are 1-31; calendar years handled here are 0-9999"
    )]
    fn from(date: NaiveDate) -> Self {
        use chrono::Datelike;

        Self {
            year: date.year() as u16,
            month: date.month() as u8,
            day: date.day() as u8,
        }
    }
}

/// Form of DATE-TIME value (RFC 5545 §3.3.5).
///
/// iCalendar DATE-TIME values come in three mutually exclusive forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateTimeForm {
    /// Floating time - same wall-clock time in any timezone.
    ///
    /// Example: `19980118T230000`
    Floating,

    /// UTC time - absolute instant, indicated by 'Z' suffix.
    ///
    /// Example: `19980119T070000Z`
    Utc,

    /// Zoned time - local time with TZID reference.
    ///
    /// Example: `TZID=America/New_York:19980119T020000`
    Zoned {
        /// The timezone identifier as written in the TZID parameter.
        tzid: String,
    },
}

/// DATE-TIME value (RFC 5545 §3.3.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTime {
    /// Year (e.g., 2026).
    pub year: u16,
    /// Month (1-12).
    pub month: u8,
    /// Day of month (1-31).
    pub day: u8,
    /// Hour (0-23).
    pub hour: u8,
    /// Minute (0-59).
    pub minute: u8,
    /// Second (0-60, allowing for leap seconds).
    pub second: u8,
    /// The form of this DATE-TIME (floating, UTC, or zoned).
    pub form: DateTimeForm,
}

impl DateTime {
    /// Creates a floating DATE-TIME.
    #[must_use]
    pub fn floating(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            form: DateTimeForm::Floating,
        }
    }

    /// Creates a UTC DATE-TIME.
    #[must_use]
    pub fn utc(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            form: DateTimeForm::Utc,
            ..Self::floating(year, month, day, hour, minute, second)
        }
    }

    /// Creates a UTC DATE-TIME for an instant, dropping sub-second precision.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "chrono time-of-day fields are below 60"
    )]
    pub fn from_instant(instant: chrono::DateTime<Utc>) -> Self {
        let naive = instant.naive_utc();
        let date = Date::from(naive.date());
        Self::utc(
            date.year,
            date.month,
            date.day,
            naive.hour() as u8,
            naive.minute() as u8,
            naive.second() as u8,
        )
    }

    /// Creates a zoned DATE-TIME.
    #[must_use]
    pub fn zoned(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        tzid: impl Into<String>,
    ) -> Self {
        Self {
            form: DateTimeForm::Zoned { tzid: tzid.into() },
            ..Self::floating(year, month, day, hour, minute, second)
        }
    }

    /// Returns whether this is a UTC time.
    #[must_use]
    pub fn is_utc(&self) -> bool {
        matches!(self.form, DateTimeForm::Utc)
    }

    /// Returns whether this is a floating time.
    #[must_use]
    pub fn is_floating(&self) -> bool {
        matches!(self.form, DateTimeForm::Floating)
    }

    /// Returns the timezone ID if this is a zoned time.
    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        match &self.form {
            DateTimeForm::Zoned { tzid } => Some(tzid),
            _ => None,
        }
    }

    /// Returns the date part.
    #[must_use]
    pub const fn date(&self) -> Date {
        Date::new(self.year, self.month, self.day)
    }

    /// Returns the wall-clock value, or `None` if the fields are out of range.
    ///
    /// A leap second (60) is folded onto the last representable second.
    #[must_use]
    pub fn naive(&self) -> Option<NaiveDateTime> {
        let time = NaiveTime::from_hms_opt(
            u32::from(self.hour),
            u32::from(self.minute),
            u32::from(self.second.min(59)),
        )?;
        Some(self.date().naive()?.and_time(time))
    }

    /// ## Summary
    /// Parses a basic-format DATE-TIME (`YYYYMMDDTHHMMSS` with optional `Z`).
    ///
    /// A trailing `Z` yields a UTC value; otherwise the value is zoned when
    /// `tzid` is given and floating when it is not.
    ///
    /// ## Errors
    /// Returns an error if the text is malformed or names an impossible time.
    pub fn parse(text: &str, tzid: Option<&str>) -> RfcResult<Self> {
        let (body, utc) = match text.strip_suffix('Z') {
            Some(body) => (body, true),
            None => (text, false),
        };

        let (date_part, time_part) = body
            .split_once('T')
            .ok_or_else(|| RfcError::ParseError(format!("invalid DATE-TIME value '{text}'")))?;

        if time_part.len() != 6 || !time_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RfcError::ParseError(format!(
                "invalid DATE-TIME value '{text}'"
            )));
        }

        let date = Date::parse(date_part)?;
        let hour: u8 = digits(time_part, 0..2, "hour")?;
        let minute: u8 = digits(time_part, 2..4, "minute")?;
        let second: u8 = digits(time_part, 4..6, "second")?;

        if hour > 23 || minute > 59 || second > 60 {
            return Err(RfcError::ValidationError(format!(
                "DATE-TIME value '{text}' has an out of range time"
            )));
        }

        let form = match (utc, tzid) {
            (true, _) => DateTimeForm::Utc,
            (false, Some(tzid)) => DateTimeForm::Zoned {
                tzid: tzid.to_string(),
            },
            (false, None) => DateTimeForm::Floating,
        };

        Ok(Self {
            year: date.year,
            month: date.month,
            day: date.day,
            hour,
            minute,
            second,
            form,
        })
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}T{:02}{:02}{:02}",
            self.date(),
            self.hour,
            self.minute,
            self.second
        )?;
        if self.is_utc() {
            write!(f, "Z")?;
        }
        Ok(())
    }
}

/// A property value that may be either a DATE or a DATE-TIME, such as
/// DTSTART, DTEND, RDATE or EXDATE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateOrDateTime {
    Date(Date),
    DateTime(DateTime),
}

impl DateOrDateTime {
    /// Returns whether this is a DATE value.
    #[must_use]
    pub const fn is_date(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// Returns the date part.
    #[must_use]
    pub const fn date(&self) -> Date {
        match self {
            Self::Date(date) => *date,
            Self::DateTime(dt) => dt.date(),
        }
    }

    /// Returns the TZID of a zoned DATE-TIME.
    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        match self {
            Self::Date(_) => None,
            Self::DateTime(dt) => dt.tzid(),
        }
    }

    /// Returns whether this is a UTC DATE-TIME.
    #[must_use]
    pub fn is_utc(&self) -> bool {
        matches!(self, Self::DateTime(dt) if dt.is_utc())
    }

    /// Returns the wall-clock value; a DATE starts at midnight.
    #[must_use]
    pub fn naive(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Date(date) => Some(date.naive()?.and_time(NaiveTime::MIN)),
            Self::DateTime(dt) => dt.naive(),
        }
    }

    /// ## Summary
    /// Parses either a DATE (`YYYYMMDD`) or a DATE-TIME.
    ///
    /// ## Errors
    /// Returns an error if the text is neither.
    pub fn parse(text: &str, tzid: Option<&str>) -> RfcResult<Self> {
        if text.contains('T') {
            DateTime::parse(text, tzid).map(Self::DateTime)
        } else {
            Date::parse(text).map(Self::Date)
        }
    }
}

impl From<Date> for DateOrDateTime {
    fn from(date: Date) -> Self {
        Self::Date(date)
    }
}

impl From<DateTime> for DateOrDateTime {
    fn from(dt: DateTime) -> Self {
        Self::DateTime(dt)
    }
}

impl fmt::Display for DateOrDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(date) => write!(f, "{date}"),
            Self::DateTime(dt) => write!(f, "{dt}"),
        }
    }
}

fn digits<T: FromStr>(text: &str, range: std::ops::Range<usize>, what: &str) -> RfcResult<T> {
    text.get(range)
        .and_then(|part| part.parse().ok())
        .ok_or_else(|| RfcError::ParseError(format!("invalid {what} in '{text}'")))
}
