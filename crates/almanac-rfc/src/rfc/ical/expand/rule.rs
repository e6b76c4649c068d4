//! Normalized recurrence rules and the per-expansion lookup tables built from them.

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;

use super::time::{TimePoint, days_in_month, days_in_year};
use super::timezone::convert_to_utc_lenient;
use crate::rfc::ical::core::{Frequency, RRule, RRuleUntil, RuleProperty};

/// One BYDAY entry. `weekday` counts from Monday = 0; `week_num` is 0 for
/// "every such weekday", otherwise the nth (negative: from the end).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByDay {
    pub weekday: i32,
    pub week_num: i32,
}

/// A recurrence rule in the form the generator works on.
///
/// Months count from 0; weekdays from Monday = 0. `end` is the inclusive
/// end instant, `None` meaning the rule never ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: i32,
    pub end: Option<DateTime<Utc>>,
    pub week_start: i32,
    pub by_month: Vec<i32>,
    pub by_week_no: Vec<i32>,
    pub by_year_day: Vec<i32>,
    pub by_month_day: Vec<i32>,
    pub by_day: Vec<ByDay>,
    pub by_hour: Vec<i32>,
    pub by_minute: Vec<i32>,
    pub by_second: Vec<i32>,
    pub by_set_pos: Vec<i32>,
}

impl RecurrenceRule {
    /// ## Summary
    /// Normalizes a parsed RRULE/EXRULE value.
    ///
    /// `end` is the already resolved end instant (see [`resolve_rule_end`]).
    /// Returns `None` for a rule without FREQ, which cannot be expanded.
    #[must_use]
    pub fn from_rrule(rule: &RRule, end: Option<DateTime<Utc>>) -> Option<Self> {
        let Some(frequency) = rule.freq else {
            tracing::warn!(rule = %rule, "Recurrence rule has no FREQ, ignoring it");
            return None;
        };

        let interval = match rule.interval {
            None => 1,
            Some(0) => {
                tracing::warn!(rule = %rule, "INTERVAL below 1, using 1");
                1
            }
            Some(n) => i32::try_from(n).unwrap_or(i32::MAX),
        };

        Some(Self {
            frequency,
            interval,
            end,
            week_start: rule.wkst.map_or(0, |day| day.days_from_monday()),
            by_month: rule.by_month.iter().map(|m| i32::from(*m) - 1).collect(),
            by_week_no: rule.by_weekno.iter().copied().map(i32::from).collect(),
            by_year_day: rule.by_yearday.iter().copied().map(i32::from).collect(),
            by_month_day: rule.by_monthday.iter().copied().map(i32::from).collect(),
            by_day: rule
                .by_day
                .iter()
                .map(|day| ByDay {
                    weekday: day.weekday.days_from_monday(),
                    week_num: day.ordinal.map_or(0, i32::from),
                })
                .collect(),
            by_hour: rule.by_hour.iter().copied().map(i32::from).collect(),
            by_minute: rule.by_minute.iter().copied().map(i32::from).collect(),
            by_second: rule.by_second.iter().copied().map(i32::from).collect(),
            by_set_pos: rule.by_setpos.iter().copied().map(i32::from).collect(),
        })
    }
}

/// ## Summary
/// Resolves the inclusive end instant of an RRULE/EXRULE property.
///
/// - COUNT: the cached end date. With `convert_end_date` (DATE or floating
///   DTSTART) its wall-clock value is read in `zone`, otherwise as UTC.
///   Without a cached value the rule is treated as unbounded.
/// - UNTIL as DATE: 23:59:59 of that day in `zone`.
/// - UNTIL as UTC DATE-TIME: that instant. Floating or zoned values are
///   read in `zone`.
/// - Neither: unbounded.
#[must_use]
pub fn resolve_rule_end(
    property: &RuleProperty,
    zone: Tz,
    convert_end_date: bool,
) -> Option<DateTime<Utc>> {
    let rule = &property.rule;

    if rule.count.is_some() {
        let cached = property.cached_end_date()?;
        let naive = cached.naive()?;
        return if convert_end_date {
            local_end(naive, zone)
        } else {
            Some(naive.and_utc())
        };
    }

    match rule.until.as_ref()? {
        RRuleUntil::Date(date) => local_end(date.naive()?.and_hms_opt(23, 59, 59)?, zone),
        RRuleUntil::DateTime(until) if until.is_utc() => Some(until.naive()?.and_utc()),
        RRuleUntil::DateTime(until) => local_end(until.naive()?, zone),
    }
}

fn local_end(naive: NaiveDateTime, zone: Tz) -> Option<DateTime<Utc>> {
    convert_to_utc_lenient(naive, zone)
        .inspect_err(|e| tracing::warn!(error = %e, "Cannot place rule end in timezone"))
        .ok()
}

fn mark(table: &mut [bool], index: i32) {
    if let Some(slot) = usize::try_from(index).ok().and_then(|i| table.get_mut(i)) {
        *slot = true;
    }
}

fn marked(table: &[bool], index: i32) -> bool {
    usize::try_from(index)
        .ok()
        .and_then(|i| table.get(i))
        .copied()
        .unwrap_or(false)
}

/// A rule together with presence tables for its BYxxx lists, built once per
/// expansion so filters are constant-time lookups.
#[derive(Debug, Clone)]
pub struct RecurData<'a> {
    pub rule: &'a RecurrenceRule,
    /// Days from the rule's week start to DTSTART's weekday.
    pub weekday_offset: i32,
    months: [bool; 12],
    yeardays: [bool; 367],
    neg_yeardays: [bool; 367],
    monthdays: [bool; 32],
    neg_monthdays: [bool; 32],
    weekdays: [bool; 7],
    hours: [bool; 24],
    minutes: [bool; 60],
    seconds: [bool; 62],
}

impl<'a> RecurData<'a> {
    #[must_use]
    pub fn new(rule: &'a RecurrenceRule, event_start: &TimePoint) -> Self {
        let mut data = Self {
            rule,
            weekday_offset: event_start.weekday_offset(rule.week_start),
            months: [false; 12],
            yeardays: [false; 367],
            neg_yeardays: [false; 367],
            monthdays: [false; 32],
            neg_monthdays: [false; 32],
            weekdays: [false; 7],
            hours: [false; 24],
            minutes: [false; 60],
            seconds: [false; 62],
        };

        for &month in &rule.by_month {
            mark(&mut data.months, month);
        }
        for &day in &rule.by_year_day {
            if day > 0 {
                mark(&mut data.yeardays, day);
            } else {
                mark(&mut data.neg_yeardays, -day);
            }
        }
        for &day in &rule.by_month_day {
            if day > 0 {
                mark(&mut data.monthdays, day);
            } else {
                mark(&mut data.neg_monthdays, -day);
            }
        }
        for by_day in &rule.by_day {
            mark(&mut data.weekdays, by_day.weekday);
        }
        for &hour in &rule.by_hour {
            mark(&mut data.hours, hour);
        }
        for &minute in &rule.by_minute {
            mark(&mut data.minutes, minute);
        }
        for &second in &rule.by_second {
            mark(&mut data.seconds, second);
        }

        data
    }

    #[must_use]
    pub fn has_month(&self, month: i32) -> bool {
        marked(&self.months, month)
    }

    /// Matches the day of year counted from either end of the year.
    #[must_use]
    pub fn has_year_day(&self, point: &TimePoint) -> bool {
        let day = point.day_of_year();
        marked(&self.yeardays, day)
            || marked(&self.neg_yeardays, days_in_year(point.year) + 1 - day)
    }

    /// Matches the day of month counted from either end of the month.
    #[must_use]
    pub fn has_month_day(&self, point: &TimePoint) -> bool {
        marked(&self.monthdays, point.day)
            || marked(
                &self.neg_monthdays,
                days_in_month(point.year, point.month) + 1 - point.day,
            )
    }

    #[must_use]
    pub fn has_weekday(&self, weekday: i32) -> bool {
        marked(&self.weekdays, weekday)
    }

    #[must_use]
    pub fn has_hour(&self, hour: i32) -> bool {
        marked(&self.hours, hour)
    }

    #[must_use]
    pub fn has_minute(&self, minute: i32) -> bool {
        marked(&self.minutes, minute)
    }

    #[must_use]
    pub fn has_second(&self, second: i32) -> bool {
        marked(&self.seconds, second)
    }
}
