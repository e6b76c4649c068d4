//! Per-frequency period stepping.
//!
//! `find_start` jumps to the first period of the rule that can intersect a
//! range, `advance` moves to the next one. Both stop once the period lies
//! after the rule's end or the range's end.

use std::cmp::Ordering;

use almanac_core::constants::SECONDS_PER_DAY;

use super::rule::RecurData;
use super::time::{Granularity, TimePoint};
use crate::rfc::ical::core::Frequency;

/// Rounds `periods` up to a whole number of intervals.
fn round_up(periods: i64, interval: i32) -> i64 {
    let interval = i64::from(interval);
    let periods = periods + interval - 1;
    periods - periods % interval
}

fn after(point: &TimePoint, limit: Option<&TimePoint>, granularity: Granularity) -> bool {
    limit.is_some_and(|limit| point.compare(limit, granularity) == Ordering::Greater)
}

fn granularity(frequency: Frequency) -> Granularity {
    match frequency {
        Frequency::Yearly => Granularity::Year,
        Frequency::Monthly => Granularity::Month,
        Frequency::Weekly | Frequency::Daily => Granularity::Day,
        Frequency::Hourly => Granularity::Hour,
        Frequency::Minutely => Granularity::Minute,
        Frequency::Secondly => Granularity::Second,
    }
}

/// Point compared against the limits: the period anchor, or for weekly
/// rules the first day of its week.
fn period_start(data: &RecurData<'_>, cotime: &TimePoint) -> TimePoint {
    let mut start = *cotime;
    if data.rule.frequency == Frequency::Weekly {
        start.add_days(-i64::from(data.weekday_offset));
    }
    start
}

fn within_limits(
    data: &RecurData<'_>,
    cotime: &TimePoint,
    event_end: Option<&TimePoint>,
    interval_end: &TimePoint,
) -> bool {
    let level = granularity(data.rule.frequency);
    let start = period_start(data, cotime);
    !after(&start, event_end, level) && !after(&start, Some(interval_end), level)
}

/// Differences between two points in whole days and remaining wall-clock fields.
fn field_deltas(from: &TimePoint, to: &TimePoint) -> (i64, i64, i64, i64) {
    (
        to.day_number() - from.day_number(),
        i64::from(to.hour - from.hour),
        i64::from(to.minute - from.minute),
        i64::from(to.second - from.second),
    )
}

/// Upper bound on the number of whole periods from `from` to `to`. Moving
/// `from` on by more periods than this always lands after `to`.
fn periods_between(frequency: Frequency, from: &TimePoint, to: &TimePoint) -> i64 {
    let days = (to.day_number() - from.day_number()).max(0) + 1;
    let years = i64::from(to.year) - i64::from(from.year);

    match frequency {
        Frequency::Yearly => years + 1,
        Frequency::Monthly => years * 12 + i64::from(to.month) - i64::from(from.month) + 1,
        Frequency::Weekly => days / 7 + 2,
        Frequency::Daily => days,
        Frequency::Hourly => days * 24,
        Frequency::Minutely => days * 1440,
        Frequency::Secondly => days * SECONDS_PER_DAY,
    }
}

/// Moves `cotime` on by `periods` periods of `frequency`.
fn step(frequency: Frequency, cotime: &mut TimePoint, periods: i64) {
    match frequency {
        Frequency::Yearly => cotime.add_months(periods * 12),
        Frequency::Monthly => cotime.add_months(periods),
        Frequency::Weekly => cotime.add_days(periods * 7),
        Frequency::Daily => cotime.add_days(periods),
        Frequency::Hourly => cotime.add_hours(periods),
        Frequency::Minutely => cotime.add_minutes(periods),
        Frequency::Secondly => cotime.add_seconds(periods),
    }
}

/// ## Summary
/// Returns the anchor of the first period that may intersect
/// `[interval_start, interval_end]`, or `None` when no period can.
#[must_use]
pub fn find_start(
    data: &RecurData<'_>,
    event_start: &TimePoint,
    event_end: Option<&TimePoint>,
    interval_start: &TimePoint,
    interval_end: &TimePoint,
) -> Option<TimePoint> {
    let interval = data.rule.interval;
    let frequency = data.rule.frequency;

    let periods = match frequency {
        Frequency::Yearly => {
            let years = i64::from(interval_start.year) - i64::from(event_start.year);
            if years > 0 { round_up(years, interval) } else { 0 }
        }
        Frequency::Monthly => {
            if event_start.compare(interval_start, Granularity::Month) == Ordering::Less {
                let months = (i64::from(interval_start.year) - i64::from(event_start.year)) * 12
                    + i64::from(interval_start.month - event_start.month);
                round_up(months, interval)
            } else {
                0
            }
        }
        Frequency::Weekly => {
            if after(interval_start, event_end, Granularity::Day)
                || after(event_start, Some(interval_end), Granularity::Day)
            {
                return None;
            }

            let event_week = event_start.day_number() - i64::from(data.weekday_offset);
            let interval_week = interval_start.day_number()
                - i64::from(interval_start.weekday_offset(data.rule.week_start));
            if event_week < interval_week {
                round_up((interval_week - event_week) / 7, interval)
            } else {
                0
            }
        }
        Frequency::Daily => {
            let days = interval_start.day_number() - event_start.day_number();
            if days > 0 { round_up(days, interval) } else { 0 }
        }
        Frequency::Hourly => {
            if event_start.compare(interval_start, Granularity::Hour) == Ordering::Less {
                let (days, hours, _, _) = field_deltas(event_start, interval_start);
                round_up(days * 24 + hours, interval)
            } else {
                0
            }
        }
        Frequency::Minutely => {
            if event_start.compare(interval_start, Granularity::Minute) == Ordering::Less {
                let (days, hours, minutes, _) = field_deltas(event_start, interval_start);
                round_up(days * 1440 + hours * 60 + minutes, interval)
            } else {
                0
            }
        }
        Frequency::Secondly => {
            if event_start.compare(interval_start, Granularity::Second) == Ordering::Less {
                let (days, hours, minutes, seconds) = field_deltas(event_start, interval_start);
                round_up(
                    days * SECONDS_PER_DAY + hours * 3600 + minutes * 60 + seconds,
                    interval,
                )
            } else {
                0
            }
        }
    };

    if periods > periods_between(frequency, event_start, interval_end) {
        return None;
    }

    let mut cotime = *event_start;
    step(frequency, &mut cotime, periods);
    within_limits(data, &cotime, event_end, interval_end).then_some(cotime)
}

/// Moves `cotime` to the next period anchor. Returns `false` once that
/// period lies after either limit.
pub fn advance(
    data: &RecurData<'_>,
    cotime: &mut TimePoint,
    event_end: Option<&TimePoint>,
    interval_end: &TimePoint,
) -> bool {
    let frequency = data.rule.frequency;
    let interval = i64::from(data.rule.interval);

    if interval > periods_between(frequency, cotime, interval_end) {
        return false;
    }

    step(frequency, cotime, interval);
    within_limits(data, cotime, event_end, interval_end)
}
