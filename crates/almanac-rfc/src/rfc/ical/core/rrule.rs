//! iCalendar RRULE (Recurrence Rule) value type (RFC 5545 §3.3.10, §3.8.5.3).

use std::fmt;
use std::str::FromStr;

use super::{Date, DateTime};
use crate::error::{RfcError, RfcResult};

/// Recurrence frequency (RFC 5545 §3.3.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Secondly => "SECONDLY",
            Self::Minutely => "MINUTELY",
            Self::Hourly => "HOURLY",
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }

    /// Parses a frequency from a string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.to_ascii_uppercase().as_str() {
            "SECONDLY" => Self::Secondly,
            "MINUTELY" => Self::Minutely,
            "HOURLY" => Self::Hourly,
            "DAILY" => Self::Daily,
            "WEEKLY" => Self::Weekly,
            "MONTHLY" => Self::Monthly,
            "YEARLY" => Self::Yearly,
            _ => return None,
        })
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    /// Returns the two-letter abbreviation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sunday => "SU",
            Self::Monday => "MO",
            Self::Tuesday => "TU",
            Self::Wednesday => "WE",
            Self::Thursday => "TH",
            Self::Friday => "FR",
            Self::Saturday => "SA",
        }
    }

    /// Parses a weekday from a two-letter abbreviation (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.to_ascii_uppercase().as_str() {
            "SU" => Self::Sunday,
            "MO" => Self::Monday,
            "TU" => Self::Tuesday,
            "WE" => Self::Wednesday,
            "TH" => Self::Thursday,
            "FR" => Self::Friday,
            "SA" => Self::Saturday,
            _ => return None,
        })
    }

    /// Returns the day number counted from Monday (Monday = 0, Sunday = 6).
    #[must_use]
    pub const fn days_from_monday(self) -> i32 {
        match self {
            Self::Monday => 0,
            Self::Tuesday => 1,
            Self::Wednesday => 2,
            Self::Thursday => 3,
            Self::Friday => 4,
            Self::Saturday => 5,
            Self::Sunday => 6,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Weekday with optional occurrence number.
///
/// Used in BYDAY rule part. Examples:
/// - `MO` - every Monday
/// - `1MO` - first Monday of the month/year
/// - `-1FR` - last Friday of the month/year
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekdayNum {
    /// Optional occurrence number (-53 to 53, excluding 0).
    pub ordinal: Option<i8>,
    /// The day of the week.
    pub weekday: Weekday,
}

impl WeekdayNum {
    /// Creates a weekday occurrence without an ordinal.
    #[must_use]
    pub const fn every(weekday: Weekday) -> Self {
        Self {
            ordinal: None,
            weekday,
        }
    }

    /// ## Summary
    /// Creates a weekday occurrence with an ordinal, such as `-1FR`.
    ///
    /// ## Errors
    /// Returns `RfcError::ValidationError` if `ordinal` is 0 or outside
    /// -53..=53.
    pub fn try_nth(ordinal: i8, weekday: Weekday) -> RfcResult<Self> {
        if ordinal == 0 || !(-53..=53).contains(&ordinal) {
            return Err(RfcError::ValidationError(format!(
                "BYDAY ordinal {ordinal} out of range"
            )));
        }
        Ok(Self {
            ordinal: Some(ordinal),
            weekday,
        })
    }
}

impl fmt::Display for WeekdayNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(n) = self.ordinal {
            write!(f, "{n}")?;
        }
        write!(f, "{}", self.weekday)
    }
}

impl FromStr for WeekdayNum {
    type Err = RfcError;

    fn from_str(s: &str) -> RfcResult<Self> {
        let split = s.len().checked_sub(2).filter(|at| s.is_char_boundary(*at));
        let (prefix, day) = split
            .map(|at| s.split_at(at))
            .ok_or_else(|| RfcError::ParseError(format!("invalid BYDAY value '{s}'")))?;

        let weekday = Weekday::parse(day)
            .ok_or_else(|| RfcError::ParseError(format!("invalid weekday in '{s}'")))?;

        if prefix.is_empty() {
            return Ok(Self::every(weekday));
        }

        let ordinal: i8 = prefix
            .parse()
            .map_err(|e| RfcError::ParseError(format!("invalid BYDAY ordinal in '{s}': {e}")))?;

        Self::try_nth(ordinal, weekday)
    }
}

/// UNTIL value for RRULE - can be either DATE or DATE-TIME.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RRuleUntil {
    /// Date-only boundary (inclusive).
    Date(Date),
    /// Date-time boundary (inclusive, UTC when DTSTART has TZID or is UTC).
    DateTime(DateTime),
}

impl fmt::Display for RRuleUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(d) => write!(f, "{d}"),
            Self::DateTime(dt) => write!(f, "{dt}"),
        }
    }
}

/// Recurrence rule (RFC 5545 §3.3.10, §3.8.5.3).
///
/// This is the value of an RRULE or EXRULE property as written. The
/// expansion engine normalizes it into its own working form before use.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RRule {
    /// Recurrence frequency (required).
    pub freq: Option<Frequency>,

    /// Recurrence interval (default: 1).
    pub interval: Option<u32>,

    /// End date/time of the recurrence (mutually exclusive with count).
    pub until: Option<RRuleUntil>,

    /// Number of occurrences (mutually exclusive with until).
    pub count: Option<u32>,

    /// Week start day (default: Monday).
    pub wkst: Option<Weekday>,

    /// By-second list (0-60, 60 for leap second).
    pub by_second: Vec<u8>,

    /// By-minute list (0-59).
    pub by_minute: Vec<u8>,

    /// By-hour list (0-23).
    pub by_hour: Vec<u8>,

    /// By-day list with optional occurrence numbers.
    pub by_day: Vec<WeekdayNum>,

    /// By-monthday list (-31 to 31, excluding 0).
    pub by_monthday: Vec<i8>,

    /// By-yearday list (-366 to 366, excluding 0).
    pub by_yearday: Vec<i16>,

    /// By-weekno list (-53 to 53, excluding 0).
    pub by_weekno: Vec<i8>,

    /// By-month list (1-12).
    pub by_month: Vec<u8>,

    /// By-setpos list (-366 to 366, excluding 0).
    pub by_setpos: Vec<i16>,
}

impl RRule {
    /// Creates a rule with the given frequency and nothing else set.
    #[must_use]
    pub fn with_frequency(freq: Frequency) -> Self {
        Self {
            freq: Some(freq),
            ..Self::default()
        }
    }

    /// Creates a daily recurrence rule.
    #[must_use]
    pub fn daily() -> Self {
        Self::with_frequency(Frequency::Daily)
    }

    /// Creates a weekly recurrence rule.
    #[must_use]
    pub fn weekly() -> Self {
        Self::with_frequency(Frequency::Weekly)
    }

    /// Creates a monthly recurrence rule.
    #[must_use]
    pub fn monthly() -> Self {
        Self::with_frequency(Frequency::Monthly)
    }

    /// Creates a yearly recurrence rule.
    #[must_use]
    pub fn yearly() -> Self {
        Self::with_frequency(Frequency::Yearly)
    }

    /// Sets the interval.
    #[must_use]
    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Sets the count.
    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self.until = None;
        self
    }

    /// Sets the until date.
    #[must_use]
    pub fn with_until_date(mut self, date: Date) -> Self {
        self.until = Some(RRuleUntil::Date(date));
        self.count = None;
        self
    }

    /// Sets the until date-time.
    #[must_use]
    pub fn with_until_datetime(mut self, datetime: DateTime) -> Self {
        self.until = Some(RRuleUntil::DateTime(datetime));
        self.count = None;
        self
    }

    /// Sets the by-day list.
    #[must_use]
    pub fn with_by_day(mut self, days: Vec<WeekdayNum>) -> Self {
        self.by_day = days;
        self
    }

    /// Sets the by-month list.
    #[must_use]
    pub fn with_by_month(mut self, months: Vec<u8>) -> Self {
        self.by_month = months;
        self
    }

    /// Sets the by-monthday list.
    #[must_use]
    pub fn with_by_monthday(mut self, days: Vec<i8>) -> Self {
        self.by_monthday = days;
        self
    }

    /// Sets the by-setpos list.
    #[must_use]
    pub fn with_by_setpos(mut self, positions: Vec<i16>) -> Self {
        self.by_setpos = positions;
        self
    }

    /// Sets the week start day.
    #[must_use]
    pub fn with_wkst(mut self, wkst: Weekday) -> Self {
        self.wkst = Some(wkst);
        self
    }
}

fn push_list<T: fmt::Display>(parts: &mut Vec<String>, name: &str, values: &[T]) {
    if values.is_empty() {
        return;
    }
    let joined: Vec<_> = values.iter().map(ToString::to_string).collect();
    parts.push(format!("{name}={}", joined.join(",")));
}

impl fmt::Display for RRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        if let Some(ref freq) = self.freq {
            parts.push(format!("FREQ={freq}"));
        }

        if let Some(interval) = self.interval
            && interval != 1
        {
            parts.push(format!("INTERVAL={interval}"));
        }

        if let Some(ref until) = self.until {
            parts.push(format!("UNTIL={until}"));
        }

        if let Some(count) = self.count {
            parts.push(format!("COUNT={count}"));
        }

        if let Some(wkst) = self.wkst {
            parts.push(format!("WKST={wkst}"));
        }

        push_list(&mut parts, "BYSECOND", &self.by_second);
        push_list(&mut parts, "BYMINUTE", &self.by_minute);
        push_list(&mut parts, "BYHOUR", &self.by_hour);
        push_list(&mut parts, "BYDAY", &self.by_day);
        push_list(&mut parts, "BYMONTHDAY", &self.by_monthday);
        push_list(&mut parts, "BYYEARDAY", &self.by_yearday);
        push_list(&mut parts, "BYWEEKNO", &self.by_weekno);
        push_list(&mut parts, "BYMONTH", &self.by_month);
        push_list(&mut parts, "BYSETPOS", &self.by_setpos);

        write!(f, "{}", parts.join(";"))
    }
}

/// Parses a comma separated list, checking each value against `valid`.
fn parse_list<T>(name: &str, value: &str, valid: impl Fn(&T) -> bool) -> RfcResult<Vec<T>>
where
    T: FromStr + fmt::Display,
    T::Err: fmt::Display,
{
    value
        .split(',')
        .map(|item| {
            let parsed: T = item.trim().parse().map_err(|e| {
                RfcError::ParseError(format!("invalid {name} value '{item}': {e}"))
            })?;
            if valid(&parsed) {
                Ok(parsed)
            } else {
                Err(RfcError::ValidationError(format!(
                    "{name} value {parsed} out of range"
                )))
            }
        })
        .collect()
}

fn parse_number<T>(name: &str, value: &str) -> RfcResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| RfcError::ParseError(format!("invalid {name} value '{value}': {e}")))
}

impl FromStr for RRule {
    type Err = RfcError;

    /// Parses an RRULE/EXRULE value such as `FREQ=WEEKLY;BYDAY=MO,WE`.
    ///
    /// A leading `RRULE:` or `EXRULE:` property name is accepted. Unknown
    /// rule parts are ignored.
    fn from_str(s: &str) -> RfcResult<Self> {
        let text = s.trim();
        let text = text
            .strip_prefix("RRULE:")
            .or_else(|| text.strip_prefix("EXRULE:"))
            .unwrap_or(text);

        let mut rule = Self::default();

        for part in text.split(';').filter(|part| !part.is_empty()) {
            let (name, value) = part
                .split_once('=')
                .ok_or_else(|| RfcError::ParseError(format!("rule part '{part}' has no value")))?;

            match name.trim().to_ascii_uppercase().as_str() {
                "FREQ" => {
                    rule.freq = Some(Frequency::parse(value.trim()).ok_or_else(|| {
                        RfcError::ParseError(format!("unknown frequency '{value}'"))
                    })?);
                }
                "INTERVAL" => rule.interval = Some(parse_number("INTERVAL", value)?),
                "COUNT" => rule.count = Some(parse_number("COUNT", value)?),
                "UNTIL" => {
                    let value = value.trim();
                    rule.until = Some(if value.contains('T') {
                        RRuleUntil::DateTime(DateTime::parse(value, None)?)
                    } else {
                        RRuleUntil::Date(Date::parse(value)?)
                    });
                }
                "WKST" => {
                    rule.wkst = Some(Weekday::parse(value.trim()).ok_or_else(|| {
                        RfcError::ParseError(format!("unknown week start '{value}'"))
                    })?);
                }
                "BYSECOND" => rule.by_second = parse_list("BYSECOND", value, |v: &u8| *v <= 60)?,
                "BYMINUTE" => rule.by_minute = parse_list("BYMINUTE", value, |v: &u8| *v <= 59)?,
                "BYHOUR" => rule.by_hour = parse_list("BYHOUR", value, |v: &u8| *v <= 23)?,
                "BYDAY" => rule.by_day = parse_list("BYDAY", value, |_: &WeekdayNum| true)?,
                "BYMONTHDAY" => {
                    rule.by_monthday =
                        parse_list("BYMONTHDAY", value, |v: &i8| *v != 0 && (-31..=31).contains(v))?;
                }
                "BYYEARDAY" => {
                    rule.by_yearday = parse_list("BYYEARDAY", value, |v: &i16| {
                        *v != 0 && (-366..=366).contains(v)
                    })?;
                }
                "BYWEEKNO" => {
                    rule.by_weekno =
                        parse_list("BYWEEKNO", value, |v: &i8| *v != 0 && (-53..=53).contains(v))?;
                }
                "BYMONTH" => {
                    rule.by_month = parse_list("BYMONTH", value, |v: &u8| (1..=12).contains(v))?;
                }
                "BYSETPOS" => {
                    rule.by_setpos = parse_list("BYSETPOS", value, |v: &i16| {
                        *v != 0 && (-366..=366).contains(v)
                    })?;
                }
                other => {
                    tracing::trace!(part = other, "Ignoring unknown rule part");
                }
            }
        }

        if rule.freq.is_none() {
            return Err(RfcError::ValidationError(format!(
                "rule '{text}' has no FREQ"
            )));
        }
        if rule.count.is_some() && rule.until.is_some() {
            return Err(RfcError::ValidationError(format!(
                "rule '{text}' sets both COUNT and UNTIL"
            )));
        }

        Ok(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_ordinal_out_of_range_is_an_error() {
        assert!(matches!(
            WeekdayNum::try_nth(0, Weekday::Monday),
            Err(RfcError::ValidationError(_))
        ));
        assert!(WeekdayNum::try_nth(54, Weekday::Monday).is_err());
        assert!(WeekdayNum::try_nth(-54, Weekday::Monday).is_err());
        assert!("60MO".parse::<WeekdayNum>().is_err());
        assert_eq!(
            WeekdayNum::try_nth(-53, Weekday::Monday).unwrap().ordinal,
            Some(-53)
        );
    }

    #[test]
    fn rrule_display_basic() {
        let rrule = RRule::daily().with_count(10);
        assert_eq!(rrule.to_string(), "FREQ=DAILY;COUNT=10");
    }

    #[test]
    fn rrule_display_weekly_byday() {
        let rrule = RRule::weekly().with_by_day(vec![
            WeekdayNum::every(Weekday::Monday),
            WeekdayNum::every(Weekday::Wednesday),
            WeekdayNum::every(Weekday::Friday),
        ]);
        assert_eq!(rrule.to_string(), "FREQ=WEEKLY;BYDAY=MO,WE,FR");
    }

    #[test]
    fn rrule_display_monthly_nth() {
        let rrule = RRule::monthly().with_by_day(vec![WeekdayNum::try_nth(-1, Weekday::Friday).unwrap()]);
        assert_eq!(rrule.to_string(), "FREQ=MONTHLY;BYDAY=-1FR");
    }

    #[test]
    fn rrule_parse_full() {
        let rule: RRule = "FREQ=YEARLY;INTERVAL=2;BYMONTH=3;BYDAY=-1SU;WKST=SU;UNTIL=20300101T000000Z"
            .parse()
            .unwrap();

        assert_eq!(rule.freq, Some(Frequency::Yearly));
        assert_eq!(rule.interval, Some(2));
        assert_eq!(rule.by_month, vec![3]);
        assert_eq!(rule.by_day, vec![WeekdayNum::try_nth(-1, Weekday::Sunday).unwrap()]);
        assert_eq!(rule.wkst, Some(Weekday::Sunday));
        assert!(matches!(rule.until, Some(RRuleUntil::DateTime(ref dt)) if dt.is_utc()));
    }

    #[test]
    fn rrule_parse_round_trips_display() {
        let text = "FREQ=MONTHLY;COUNT=3;BYMONTHDAY=1,-1;BYSETPOS=-1";
        let rule: RRule = text.parse().unwrap();
        assert_eq!(rule.to_string(), text);
    }

    #[test]
    fn rrule_parse_accepts_property_prefix_and_date_until() {
        let rule: RRule = "RRULE:FREQ=DAILY;UNTIL=20240110".parse().unwrap();
        assert_eq!(
            rule.until,
            Some(RRuleUntil::Date(Date::new(2024, 1, 10)))
        );
    }

    #[test]
    fn rrule_parse_rejects_invalid() {
        assert!("INTERVAL=2".parse::<RRule>().is_err());
        assert!("FREQ=FORTNIGHTLY".parse::<RRule>().is_err());
        assert!("FREQ=DAILY;COUNT=2;UNTIL=20240101".parse::<RRule>().is_err());
        assert!("FREQ=MONTHLY;BYMONTHDAY=0".parse::<RRule>().is_err());
        assert!("FREQ=MONTHLY;BYDAY=0MO".parse::<RRule>().is_err());
        assert!("FREQ=YEARLY;BYMONTH=13".parse::<RRule>().is_err());
    }

    #[test]
    fn weekday_num_parse() {
        assert_eq!("MO".parse::<WeekdayNum>().unwrap(), WeekdayNum::every(Weekday::Monday));
        assert_eq!("+2TU".parse::<WeekdayNum>().unwrap(), WeekdayNum::try_nth(2, Weekday::Tuesday).unwrap());
        assert_eq!("-1fr".parse::<WeekdayNum>().unwrap(), WeekdayNum::try_nth(-1, Weekday::Friday).unwrap());
        assert!("X".parse::<WeekdayNum>().is_err());
    }

    #[test]
    fn weekday_days_from_monday() {
        assert_eq!(Weekday::Monday.days_from_monday(), 0);
        assert_eq!(Weekday::Sunday.days_from_monday(), 6);
    }

    #[test]
    fn frequency_parse() {
        assert_eq!(Frequency::parse("DAILY"), Some(Frequency::Daily));
        assert_eq!(Frequency::parse("weekly"), Some(Frequency::Weekly));
        assert_eq!(Frequency::parse("INVALID"), None);
    }
}
