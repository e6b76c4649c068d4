//! BYxxx rule parts applied to the candidate set of one period.
//!
//! An expand function replaces each candidate with one candidate per listed
//! value; a filter drops candidates whose field is not listed. Both leave
//! the set untouched when the rule part is absent. Which of the two a part
//! uses depends on the frequency, see `generator`.

use super::rule::RecurData;
use super::time::{TimePoint, days_in_month};

/// Replaces each candidate by `apply(candidate, value)` for every value,
/// skipping `None` results.
fn expand_each<T: Copy>(
    occs: Vec<TimePoint>,
    values: &[T],
    apply: impl Fn(&TimePoint, T) -> Option<TimePoint>,
) -> Vec<TimePoint> {
    if values.is_empty() || occs.is_empty() {
        return occs;
    }

    occs.iter()
        .flat_map(|occ| values.iter().filter_map(|value| apply(occ, *value)))
        .collect()
}

fn filter_if(
    mut occs: Vec<TimePoint>,
    active: bool,
    keep: impl Fn(&TimePoint) -> bool,
) -> Vec<TimePoint> {
    if active {
        occs.retain(keep);
    }
    occs
}

/// 1 January of `occ`'s year, keeping the time of day.
fn year_start(occ: &TimePoint) -> TimePoint {
    TimePoint {
        month: 0,
        day: 1,
        ..*occ
    }
}

/// Day 1 of `occ`'s month, keeping the time of day.
fn month_start(occ: &TimePoint) -> TimePoint {
    TimePoint { day: 1, ..*occ }
}

/// Days forward from `weekday` to `target`, both Monday = 0.
fn days_until_weekday(weekday: i32, target: i32) -> i32 {
    (target + 7 - weekday).rem_euclid(7)
}

pub fn bymonth_expand(occs: Vec<TimePoint>, data: &RecurData<'_>) -> Vec<TimePoint> {
    expand_each(occs, &data.rule.by_month, |occ, month| {
        Some(TimePoint { month, ..*occ })
    })
}

pub fn bymonth_filter(occs: Vec<TimePoint>, data: &RecurData<'_>) -> Vec<TimePoint> {
    filter_if(occs, !data.rule.by_month.is_empty(), |occ| {
        data.has_month(occ.month)
    })
}

/// Places each candidate on DTSTART's weekday within every listed week number.
pub fn byweekno_expand(occs: Vec<TimePoint>, data: &RecurData<'_>) -> Vec<TimePoint> {
    let week_start = data.rule.week_start;
    let offset = data.weekday_offset;

    expand_each(occs, &data.rule.by_week_no, |occ, week| {
        let point = if week > 0 {
            let mut first = occ.find_first_week_start(week_start, offset);
            first.add_days(i64::from(week - 1) * 7);
            first
        } else {
            let next_year = TimePoint {
                year: occ.year + 1,
                ..*occ
            };
            let mut first = next_year.find_first_week_start(week_start, offset);
            first.add_days(i64::from(week) * 7);
            first
        };
        (point.year == occ.year).then_some(point)
    })
}

pub fn byyearday_expand(occs: Vec<TimePoint>, data: &RecurData<'_>) -> Vec<TimePoint> {
    expand_each(occs, &data.rule.by_year_day, |occ, day| {
        let mut point = year_start(occ);
        if day > 0 {
            point.add_days(i64::from(day - 1));
        } else {
            point.year += 1;
            point.add_days(i64::from(day));
        }
        (point.year == occ.year).then_some(point)
    })
}

pub fn byyearday_filter(occs: Vec<TimePoint>, data: &RecurData<'_>) -> Vec<TimePoint> {
    filter_if(occs, !data.rule.by_year_day.is_empty(), |occ| {
        data.has_year_day(occ)
    })
}

/// Days past the end of the month land on its last day.
pub fn bymonthday_expand(occs: Vec<TimePoint>, data: &RecurData<'_>) -> Vec<TimePoint> {
    expand_each(occs, &data.rule.by_month_day, |occ, day| {
        let mut point = month_start(occ);
        if day > 0 {
            point.add_days(i64::from(day - 1));
        } else {
            point.add_months(1);
            point.add_days(i64::from(day));
        }

        if point.year != occ.year || point.month != occ.month {
            point = TimePoint {
                day: days_in_month(occ.year, occ.month),
                ..*occ
            };
        }
        Some(point)
    })
}

pub fn bymonthday_filter(occs: Vec<TimePoint>, data: &RecurData<'_>) -> Vec<TimePoint> {
    filter_if(occs, !data.rule.by_month_day.is_empty(), |occ| {
        data.has_month_day(occ)
    })
}

/// Generates the BYDAY days of the span around each occurrence, keeping its
/// time of day. `first_of` and `last_of` give the span's first and last
/// day; `inside` tells whether a point still lies in the span.
fn byday_in_span(
    occs: Vec<TimePoint>,
    data: &RecurData<'_>,
    first_of: impl Fn(&TimePoint) -> TimePoint,
    last_of: impl Fn(&TimePoint) -> TimePoint,
    inside: impl Fn(&TimePoint, &TimePoint) -> bool,
) -> Vec<TimePoint> {
    if data.rule.by_day.is_empty() || occs.is_empty() {
        return occs;
    }

    let mut expanded = Vec::new();
    for occ in &occs {
        for by_day in &data.rule.by_day {
            if by_day.week_num == 0 {
                let mut point = first_of(occ);
                point.add_days(i64::from(days_until_weekday(point.weekday(), by_day.weekday)));
                while inside(&point, occ) {
                    expanded.push(point);
                    point.add_days(7);
                }
            } else if by_day.week_num > 0 {
                let mut point = first_of(occ);
                let offset = days_until_weekday(point.weekday(), by_day.weekday)
                    + (by_day.week_num - 1) * 7;
                point.add_days(i64::from(offset));
                if inside(&point, occ) {
                    expanded.push(point);
                }
            } else {
                let mut point = last_of(occ);
                let offset = days_until_weekday(by_day.weekday, point.weekday())
                    + (-by_day.week_num - 1) * 7;
                point.add_days(-i64::from(offset));
                if inside(&point, occ) {
                    expanded.push(point);
                }
            }
        }
    }
    expanded
}

pub fn byday_expand_yearly(occs: Vec<TimePoint>, data: &RecurData<'_>) -> Vec<TimePoint> {
    byday_in_span(
        occs,
        data,
        year_start,
        |occ| TimePoint {
            month: 11,
            day: 31,
            ..*occ
        },
        |point, occ| point.year == occ.year,
    )
}

pub fn byday_expand_monthly(occs: Vec<TimePoint>, data: &RecurData<'_>) -> Vec<TimePoint> {
    byday_in_span(
        occs,
        data,
        month_start,
        |occ| TimePoint {
            day: days_in_month(occ.year, occ.month),
            ..*occ
        },
        |point, occ| point.year == occ.year && point.month == occ.month,
    )
}

/// Moves each candidate (sitting on DTSTART's weekday) to every listed
/// weekday of the same week. Ordinals are ignored.
pub fn byday_expand_weekly(occs: Vec<TimePoint>, data: &RecurData<'_>) -> Vec<TimePoint> {
    let week_start = data.rule.week_start;
    let offset = data.weekday_offset;

    expand_each(occs, &data.rule.by_day, |occ, by_day| {
        let mut point = *occ;
        point.add_days(i64::from(
            days_until_weekday(week_start, by_day.weekday) - offset,
        ));
        Some(point)
    })
}

pub fn byday_filter(occs: Vec<TimePoint>, data: &RecurData<'_>) -> Vec<TimePoint> {
    filter_if(occs, !data.rule.by_day.is_empty(), |occ| {
        data.has_weekday(occ.weekday())
    })
}

pub fn byhour_expand(occs: Vec<TimePoint>, data: &RecurData<'_>) -> Vec<TimePoint> {
    expand_each(occs, &data.rule.by_hour, |occ, hour| {
        Some(TimePoint { hour, ..*occ })
    })
}

pub fn byhour_filter(occs: Vec<TimePoint>, data: &RecurData<'_>) -> Vec<TimePoint> {
    filter_if(occs, !data.rule.by_hour.is_empty(), |occ| {
        data.has_hour(occ.hour)
    })
}

pub fn byminute_expand(occs: Vec<TimePoint>, data: &RecurData<'_>) -> Vec<TimePoint> {
    expand_each(occs, &data.rule.by_minute, |occ, minute| {
        Some(TimePoint { minute, ..*occ })
    })
}

pub fn byminute_filter(occs: Vec<TimePoint>, data: &RecurData<'_>) -> Vec<TimePoint> {
    filter_if(occs, !data.rule.by_minute.is_empty(), |occ| {
        data.has_minute(occ.minute)
    })
}

pub fn bysecond_expand(occs: Vec<TimePoint>, data: &RecurData<'_>) -> Vec<TimePoint> {
    expand_each(occs, &data.rule.by_second, |occ, second| {
        Some(TimePoint { second, ..*occ })
    })
}

pub fn bysecond_filter(occs: Vec<TimePoint>, data: &RecurData<'_>) -> Vec<TimePoint> {
    filter_if(occs, !data.rule.by_second.is_empty(), |occ| {
        data.has_second(occ.second)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rfc::ical::core::{Frequency, RRule};
    use crate::rfc::ical::expand::rule::{ByDay, RecurrenceRule};

    fn rule(frequency: Frequency) -> RecurrenceRule {
        RecurrenceRule::from_rrule(&RRule::with_frequency(frequency), None).unwrap()
    }

    fn day(weekday: i32, week_num: i32) -> ByDay {
        ByDay { weekday, week_num }
    }

    #[test]
    fn absent_parts_leave_candidates_alone() {
        let rule = rule(Frequency::Yearly);
        let start = TimePoint::date(2024, 4, 17);
        let data = RecurData::new(&rule, &start);

        assert_eq!(bymonth_expand(vec![start], &data), vec![start]);
        assert_eq!(byday_expand_yearly(vec![start], &data), vec![start]);
        assert_eq!(bysecond_filter(vec![start], &data), vec![start]);
    }

    #[test]
    fn bymonth_expand_keeps_day() {
        let mut rule = rule(Frequency::Yearly);
        rule.by_month = vec![1, 3];
        let start = TimePoint::date(2023, 0, 31);
        let data = RecurData::new(&rule, &start);

        let out = bymonth_expand(vec![start], &data);
        assert_eq!(out.len(), 2);
        assert_eq!((out[0].month, out[0].day), (1, 31));
        assert_eq!((out[1].month, out[1].day), (3, 31));
    }

    #[test]
    fn bymonthday_expand_handles_negative_and_overflow() {
        let mut rule = rule(Frequency::Monthly);
        rule.by_month_day = vec![1, -1, 31];
        let start = TimePoint::new(2024, 1, 10, 9, 0, 0);
        let data = RecurData::new(&rule, &start);

        let out = bymonthday_expand(vec![start], &data);
        assert_eq!(
            out,
            vec![
                TimePoint::new(2024, 1, 1, 9, 0, 0),
                TimePoint::new(2024, 1, 29, 9, 0, 0),
                TimePoint::new(2024, 1, 29, 9, 0, 0),
            ]
        );
    }

    #[test]
    fn byday_expand_monthly_every_and_nth() {
        let mut rule = rule(Frequency::Monthly);
        rule.by_day = vec![day(4, -1), day(1, 2)];
        let start = TimePoint::date(2024, 4, 1);
        let data = RecurData::new(&rule, &start);

        // May 2024: last Friday is the 31st, second Tuesday the 14th.
        let out = byday_expand_monthly(vec![start], &data);
        assert_eq!(out, vec![TimePoint::date(2024, 4, 31), TimePoint::date(2024, 4, 14)]);

        rule.by_day = vec![day(0, 0)];
        let data = RecurData::new(&rule, &start);
        let mondays = byday_expand_monthly(vec![start], &data);
        assert_eq!(mondays.len(), 4);
        assert_eq!(mondays[0], TimePoint::date(2024, 4, 6));
        assert_eq!(mondays[3], TimePoint::date(2024, 4, 27));
    }

    #[test]
    fn byday_expand_monthly_drops_missing_fifth() {
        let mut rule = rule(Frequency::Monthly);
        rule.by_day = vec![day(0, 5)];
        let start = TimePoint::date(2024, 1, 1);
        let data = RecurData::new(&rule, &start);

        assert!(byday_expand_monthly(vec![start], &data).is_empty());
    }

    #[test]
    fn byday_expand_yearly_first_and_last() {
        let mut rule = rule(Frequency::Yearly);
        rule.by_day = vec![day(0, 1), day(6, -1), day(4, 20)];
        let start = TimePoint::date(2024, 0, 1);
        let data = RecurData::new(&rule, &start);

        let out = byday_expand_yearly(vec![start], &data);
        assert_eq!(
            out,
            vec![
                TimePoint::date(2024, 0, 1),
                TimePoint::date(2024, 11, 29),
                TimePoint::date(2024, 4, 17),
            ]
        );
    }

    #[test]
    fn byday_expand_weekly_uses_week_start() {
        let mut rule = rule(Frequency::Weekly);
        rule.by_day = vec![day(0, 0), day(2, 0), day(4, 0)];
        // Wednesday 2024-01-03.
        let start = TimePoint::new(2024, 0, 3, 10, 0, 0);
        let data = RecurData::new(&rule, &start);

        let out = byday_expand_weekly(vec![start], &data);
        assert_eq!(
            out,
            vec![
                TimePoint::new(2024, 0, 1, 10, 0, 0),
                TimePoint::new(2024, 0, 3, 10, 0, 0),
                TimePoint::new(2024, 0, 5, 10, 0, 0),
            ]
        );
    }

    #[test]
    fn byweekno_expand_places_on_start_weekday() {
        let mut rule = rule(Frequency::Yearly);
        rule.by_week_no = vec![1, -1];
        // Monday 2024-01-01; ISO week 1 of 2024 starts that day.
        let start = TimePoint::date(2024, 0, 1);
        let data = RecurData::new(&rule, &start);

        let out = byweekno_expand(vec![start], &data);
        assert_eq!(out, vec![TimePoint::date(2024, 0, 1), TimePoint::date(2024, 11, 23)]);
    }

    #[test]
    fn byyearday_expand_both_ends() {
        let mut rule = rule(Frequency::Yearly);
        rule.by_year_day = vec![1, 100, -1, 366];
        let start = TimePoint::date(2023, 0, 1);
        let data = RecurData::new(&rule, &start);

        let out = byyearday_expand(vec![start], &data);
        assert_eq!(
            out,
            vec![
                TimePoint::date(2023, 0, 1),
                TimePoint::date(2023, 3, 10),
                TimePoint::date(2023, 11, 31),
            ]
        );
    }

    #[test]
    fn time_parts_expand_and_filter() {
        let mut rule = rule(Frequency::Daily);
        rule.by_hour = vec![9, 17];
        rule.by_minute = vec![0, 30];
        let start = TimePoint::new(2024, 0, 1, 8, 15, 0);
        let data = RecurData::new(&rule, &start);

        let out = byminute_expand(byhour_expand(vec![start], &data), &data);
        assert_eq!(out.len(), 4);
        assert_eq!(out[1], TimePoint::new(2024, 0, 1, 9, 30, 0));

        assert!(byhour_filter(vec![start], &data).is_empty());
        assert_eq!(byminute_filter(out.clone(), &data).len(), 4);
    }

    #[test]
    fn day_filters() {
        let mut rule = rule(Frequency::Daily);
        rule.by_day = vec![day(5, 0)];
        rule.by_month_day = vec![-1];
        let start = TimePoint::date(2024, 0, 1);
        let data = RecurData::new(&rule, &start);

        let saturday = TimePoint::date(2024, 7, 31);
        assert_eq!(byday_filter(vec![saturday, start], &data), vec![saturday]);
        assert_eq!(bymonthday_filter(vec![saturday, start], &data), vec![saturday]);
    }
}
