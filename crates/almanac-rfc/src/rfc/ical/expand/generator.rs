//! Expansion of one rule over one range.
//!
//! Each period (a year for YEARLY, a month for MONTHLY, and so on) is turned
//! into a candidate set by the frequency's BYxxx pipeline, cleaned up, cut
//! by BYSETPOS and truncated at the rule's end.

use chrono_tz::Tz;

use super::byrule::{
    byday_expand_monthly, byday_expand_weekly, byday_expand_yearly, byday_filter,
    byhour_expand, byhour_filter, byminute_expand, byminute_filter, bymonth_expand,
    bymonth_filter, bymonthday_expand, bymonthday_filter, bysecond_expand, bysecond_filter,
    byweekno_expand, byyearday_expand, byyearday_filter,
};
use super::frequency::{advance, find_start};
use super::rule::{RecurData, RecurrenceRule};
use super::time::TimePoint;
use crate::rfc::ical::core::Frequency;

fn generate_set(data: &RecurData<'_>, anchor: &TimePoint) -> Vec<TimePoint> {
    match data.rule.frequency {
        Frequency::Yearly => generate_set_yearly(data, anchor),
        Frequency::Monthly => generate_set_monthly(data, anchor),
        Frequency::Weekly
        | Frequency::Daily
        | Frequency::Hourly
        | Frequency::Minutely
        | Frequency::Secondly => generate_set_default(data, anchor),
    }
}

/// BYMONTH, BYWEEKNO, BYYEARDAY, BYMONTHDAY and BYDAY each expand the anchor
/// independently and the results are joined. BYMONTHDAY and BYDAY combine
/// with BYMONTH, where listing both keeps only days satisfying each.
fn generate_set_yearly(data: &RecurData<'_>, anchor: &TimePoint) -> Vec<TimePoint> {
    let rule = data.rule;
    let has_month = !rule.by_month.is_empty();
    let has_week_no = !rule.by_week_no.is_empty();
    let has_year_day = !rule.by_year_day.is_empty();
    let has_month_day = !rule.by_month_day.is_empty();
    let has_day = !rule.by_day.is_empty();

    let mut occs = Vec::new();

    if has_month {
        let months = bymonth_expand(vec![*anchor], data);
        if has_month_day && has_day {
            occs.extend(intersect(
                bymonthday_expand(months.clone(), data),
                byday_expand_monthly(months, data),
            ));
        } else {
            occs.extend(byday_expand_monthly(bymonthday_expand(months, data), data));
        }
    }

    if has_week_no {
        occs.extend(byday_expand_weekly(byweekno_expand(vec![*anchor], data), data));
    }

    if has_year_day {
        occs.extend(byyearday_expand(vec![*anchor], data));
    }

    if !has_month && has_month_day {
        occs.extend(bymonthday_expand(vec![*anchor], data));
    }

    if !has_month && !has_week_no && has_day {
        occs.extend(byday_expand_yearly(vec![*anchor], data));
    }

    if !(has_month || has_week_no || has_year_day || has_month_day || has_day) {
        occs.push(*anchor);
    }

    let occs = byhour_expand(occs, data);
    let occs = byminute_expand(occs, data);
    bysecond_expand(occs, data)
}

fn generate_set_monthly(data: &RecurData<'_>, anchor: &TimePoint) -> Vec<TimePoint> {
    let rule = data.rule;
    let occs = bymonth_filter(vec![*anchor], data);

    let occs = if !rule.by_month_day.is_empty() && !rule.by_day.is_empty() {
        bymonthday_filter(byday_expand_monthly(occs, data), data)
    } else {
        byday_expand_monthly(bymonthday_expand(occs, data), data)
    };

    let occs = byhour_expand(occs, data);
    let occs = byminute_expand(occs, data);
    bysecond_expand(occs, data)
}

/// WEEKLY and finer: everything coarser than the frequency filters, BYDAY
/// expands within the week for WEEKLY, and finer time parts expand.
fn generate_set_default(data: &RecurData<'_>, anchor: &TimePoint) -> Vec<TimePoint> {
    let frequency = data.rule.frequency;
    let mut occs = bymonth_filter(vec![*anchor], data);

    if frequency == Frequency::Weekly {
        occs = byday_expand_weekly(occs, data);
    } else {
        occs = byyearday_filter(occs, data);
        occs = bymonthday_filter(occs, data);
        occs = byday_filter(occs, data);
    }

    occs = match frequency {
        Frequency::Weekly | Frequency::Daily => byhour_expand(occs, data),
        _ => byhour_filter(occs, data),
    };
    occs = match frequency {
        Frequency::Minutely | Frequency::Secondly => byminute_filter(occs, data),
        _ => byminute_expand(occs, data),
    };
    match frequency {
        Frequency::Secondly => bysecond_filter(occs, data),
        _ => bysecond_expand(occs, data),
    }
}

fn intersect(mut left: Vec<TimePoint>, mut right: Vec<TimePoint>) -> Vec<TimePoint> {
    left.sort_unstable();
    left.dedup();
    right.sort_unstable();
    right.dedup();
    left.retain(|occ| right.binary_search(occ).is_ok());
    left
}

/// Moves days past the end of their month onto its last day, then sorts and
/// drops duplicates.
fn tidy_period(mut occs: Vec<TimePoint>) -> Vec<TimePoint> {
    for occ in &mut occs {
        occ.clamp_day();
    }
    occs.sort_unstable();
    occs.dedup();
    occs
}

/// Keeps the listed 1-based positions (negative counts from the end), in
/// list order. Positions outside the set are ignored.
fn apply_setpos(occs: Vec<TimePoint>, positions: &[i32]) -> Vec<TimePoint> {
    if positions.is_empty() {
        return occs;
    }

    let len = i64::try_from(occs.len()).unwrap_or(i64::MAX);
    positions
        .iter()
        .filter_map(|&pos| {
            let index = if pos < 0 {
                len + i64::from(pos)
            } else {
                i64::from(pos) - 1
            };
            usize::try_from(index).ok().and_then(|i| occs.get(i)).copied()
        })
        .collect()
}

/// ## Summary
/// Expands `rule` anchored at `event_start` over
/// `[interval_start, interval_end]`, all as wall-clock times in `zone`.
///
/// Returns the occurrences and whether the rule's end falls within the
/// range, so later ranges cannot produce more. Occurrences are sorted within
/// each period; candidates before `event_start` are not removed here.
#[must_use]
pub fn expand_recurrence(
    event_start: &TimePoint,
    zone: Tz,
    rule: &RecurrenceRule,
    interval_start: &TimePoint,
    interval_end: &TimePoint,
) -> (Vec<TimePoint>, bool) {
    let data = RecurData::new(rule, event_start);
    let event_end = rule.end.map(|end| TimePoint::from_instant(end, zone));

    if event_end.as_ref().is_some_and(|end| end < interval_start) {
        return (Vec::new(), true);
    }
    let finished = event_end.as_ref().is_some_and(|end| end <= interval_end);

    let Some(mut cotime) = find_start(
        &data,
        event_start,
        event_end.as_ref(),
        interval_start,
        interval_end,
    ) else {
        return (Vec::new(), finished);
    };

    let mut all_occs = Vec::new();
    loop {
        let mut occs = apply_setpos(tidy_period(generate_set(&data, &cotime)), &rule.by_set_pos);
        if let Some(end) = &event_end {
            occs.retain(|occ| occ <= end);
        }
        all_occs.extend(occs);

        if !advance(&data, &mut cotime, event_end.as_ref(), interval_end) {
            break;
        }
    }

    tracing::trace!(
        frequency = %rule.frequency,
        count = all_occs.len(),
        finished,
        "Expanded rule over range"
    );
    (all_occs, finished)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rfc::ical::core::{RRule, Weekday, WeekdayNum};
    use chrono::{TimeZone, Utc};

    fn expand(
        rrule: &RRule,
        end: Option<chrono::DateTime<Utc>>,
        event_start: TimePoint,
        interval_start: TimePoint,
        interval_end: TimePoint,
    ) -> (Vec<TimePoint>, bool) {
        let rule = RecurrenceRule::from_rrule(rrule, end).unwrap();
        expand_recurrence(&event_start, Tz::UTC, &rule, &interval_start, &interval_end)
    }

    fn year_end(year: i32) -> TimePoint {
        TimePoint::new(year, 11, 31, 23, 59, 61)
    }

    #[test_log::test]
    fn monthly_on_the_31st_clamps_short_months() {
        let start = TimePoint::new(2024, 0, 31, 10, 0, 0);
        let (occs, finished) = expand(
            &RRule::monthly(),
            None,
            start,
            TimePoint::date(2024, 0, 1),
            TimePoint::new(2024, 3, 30, 23, 59, 59),
        );

        assert!(!finished);
        assert_eq!(
            occs,
            vec![
                TimePoint::new(2024, 0, 31, 10, 0, 0),
                TimePoint::new(2024, 1, 29, 10, 0, 0),
                TimePoint::new(2024, 2, 31, 10, 0, 0),
                TimePoint::new(2024, 3, 30, 10, 0, 0),
            ]
        );
    }

    #[test_log::test]
    fn yearly_on_leap_day_clamps() {
        let start = TimePoint::new(2024, 1, 29, 8, 0, 0);
        let (occs, _) = expand(
            &RRule::yearly(),
            None,
            start,
            TimePoint::date(2024, 0, 1),
            year_end(2026),
        );

        assert_eq!(
            occs,
            vec![
                TimePoint::new(2024, 1, 29, 8, 0, 0),
                TimePoint::new(2025, 1, 28, 8, 0, 0),
                TimePoint::new(2026, 1, 28, 8, 0, 0),
            ]
        );
    }

    #[test_log::test]
    fn last_weekday_of_month_with_setpos() {
        let rrule = RRule::monthly()
            .with_by_day(
                [Weekday::Monday, Weekday::Tuesday, Weekday::Wednesday, Weekday::Thursday, Weekday::Friday]
                    .into_iter()
                    .map(WeekdayNum::every)
                    .collect(),
            )
            .with_by_setpos(vec![-1]);
        let start = TimePoint::new(2024, 4, 1, 9, 0, 0);

        let (occs, _) = expand(
            &rrule,
            None,
            start,
            TimePoint::date(2024, 4, 1),
            TimePoint::new(2024, 5, 30, 23, 59, 59),
        );
        assert_eq!(
            occs,
            vec![TimePoint::new(2024, 4, 31, 9, 0, 0), TimePoint::new(2024, 5, 28, 9, 0, 0)]
        );
    }

    #[test_log::test]
    fn yearly_month_day_and_weekday_intersect() {
        let rrule = RRule::yearly()
            .with_by_month(vec![9, 10])
            .with_by_monthday(vec![13])
            .with_by_day(vec![WeekdayNum::every(Weekday::Friday)]);
        let start = TimePoint::new(2024, 0, 1, 12, 0, 0);

        let (occs, _) = expand(&rrule, None, start, TimePoint::date(2024, 0, 1), year_end(2024));
        assert_eq!(occs, vec![TimePoint::new(2024, 8, 13, 12, 0, 0)]);
    }

    #[test_log::test]
    fn yearly_by_week_number() {
        let rrule: RRule = "FREQ=YEARLY;BYWEEKNO=20;BYDAY=MO".parse().unwrap();
        let start = TimePoint::date(2024, 0, 1);

        let (occs, _) = expand(&rrule, None, start, TimePoint::date(2024, 0, 1), year_end(2024));
        assert_eq!(occs, vec![TimePoint::date(2024, 4, 13)]);
    }

    #[test_log::test]
    fn daily_until_finishes_within_range() {
        let start = TimePoint::new(2024, 0, 1, 9, 0, 0);
        let until = Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap();

        let (occs, finished) = expand(
            &RRule::daily(),
            Some(until),
            start,
            TimePoint::date(2024, 0, 1),
            year_end(2024),
        );
        assert!(finished);
        assert_eq!(occs.len(), 3);
        assert_eq!(occs[2], TimePoint::new(2024, 0, 3, 9, 0, 0));
    }

    #[test_log::test]
    fn rule_ended_before_range_is_empty_and_finished() {
        let start = TimePoint::new(2020, 0, 1, 9, 0, 0);
        let until = Utc.with_ymd_and_hms(2020, 1, 3, 9, 0, 0).unwrap();

        let (occs, finished) = expand(
            &RRule::daily(),
            Some(until),
            start,
            TimePoint::date(2024, 0, 1),
            year_end(2024),
        );
        assert!(occs.is_empty());
        assert!(finished);
    }

    #[test_log::test]
    fn daily_with_hours_expands_each_day() {
        let rrule: RRule = "FREQ=DAILY;BYHOUR=9,17;BYDAY=SA,SU".parse().unwrap();
        // Monday.
        let start = TimePoint::date(2024, 0, 1);

        let (occs, _) = expand(
            &rrule,
            None,
            start,
            TimePoint::date(2024, 0, 1),
            TimePoint::new(2024, 0, 7, 23, 59, 59),
        );
        assert_eq!(
            occs,
            vec![
                TimePoint::new(2024, 0, 6, 9, 0, 0),
                TimePoint::new(2024, 0, 6, 17, 0, 0),
                TimePoint::new(2024, 0, 7, 9, 0, 0),
                TimePoint::new(2024, 0, 7, 17, 0, 0),
            ]
        );
    }

    #[test]
    fn setpos_ignores_out_of_range_positions() {
        let occs = vec![TimePoint::date(2024, 0, 1), TimePoint::date(2024, 0, 2)];
        assert_eq!(apply_setpos(occs.clone(), &[3, -3]), Vec::new());
        assert_eq!(apply_setpos(occs.clone(), &[-1, 1]), vec![occs[1], occs[0]]);
        assert_eq!(apply_setpos(occs.clone(), &[]), occs);
    }

    #[test]
    fn tidy_period_clamps_then_dedups() {
        let occs = vec![
            TimePoint::date(2023, 1, 30),
            TimePoint::date(2023, 1, 28),
            TimePoint::date(2023, 1, 31),
            TimePoint::date(2023, 1, 1),
        ];
        assert_eq!(
            tidy_period(occs),
            vec![TimePoint::date(2023, 1, 1), TimePoint::date(2023, 1, 28)]
        );
    }
}
