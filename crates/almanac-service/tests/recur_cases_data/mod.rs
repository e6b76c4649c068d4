use almanac_rfc::rfc::ical::core::{DateOrDateTime, RRule, RecurringComponent};
use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use rrule::RRuleSet;

use crate::recurrence::RecurrenceService;

pub struct RecurCase {
    pub name: &'static str,
    /// `20240101T090000Z`, `20240101T090000` or `TZID=Europe/Berlin:20240101T090000`.
    pub dtstart: &'static str,
    pub rules: &'static [&'static str],
    pub expected: Option<&'static [&'static str]>,
    pub expected_len: Option<usize>,
    pub limit: u16,
    /// Also expand with the `rrule` crate and require the same instants.
    pub oracle: bool,
}

#[expect(clippy::too_many_lines)]
pub fn recur_cases() -> Vec<RecurCase> {
    vec![
        RecurCase {
            name: "daily_basic",
            dtstart: "20120201T093000Z",
            rules: &["FREQ=DAILY;COUNT=3"],
            expected: Some(&[
                "2012-02-01T09:30:00+00:00",
                "2012-02-02T09:30:00+00:00",
                "2012-02-03T09:30:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            oracle: true,
        },
        RecurCase {
            name: "weekly_tuesday_thursday",
            dtstart: "19970902T090000Z",
            rules: &["FREQ=WEEKLY;COUNT=3;BYDAY=TU,TH"],
            expected: Some(&[
                "1997-09-02T09:00:00+00:00",
                "1997-09-04T09:00:00+00:00",
                "1997-09-09T09:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            oracle: true,
        },
        RecurCase {
            name: "weekly_mon_wed_fri_count",
            dtstart: "20240101T090000Z",
            rules: &["FREQ=WEEKLY;BYDAY=MO,WE,FR;COUNT=6"],
            expected: Some(&[
                "2024-01-01T09:00:00+00:00",
                "2024-01-03T09:00:00+00:00",
                "2024-01-05T09:00:00+00:00",
                "2024-01-08T09:00:00+00:00",
                "2024-01-10T09:00:00+00:00",
                "2024-01-12T09:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            oracle: true,
        },
        RecurCase {
            name: "every_other_monday",
            dtstart: "20240101T090000Z",
            rules: &["FREQ=WEEKLY;INTERVAL=2;BYDAY=MO;COUNT=3"],
            expected: Some(&[
                "2024-01-01T09:00:00+00:00",
                "2024-01-15T09:00:00+00:00",
                "2024-01-29T09:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            oracle: true,
        },
        RecurCase {
            name: "monthly_last_friday",
            dtstart: "20240126T100000Z",
            rules: &["FREQ=MONTHLY;COUNT=4;BYDAY=-1FR"],
            expected: Some(&[
                "2024-01-26T10:00:00+00:00",
                "2024-02-23T10:00:00+00:00",
                "2024-03-29T10:00:00+00:00",
                "2024-04-26T10:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            oracle: true,
        },
        RecurCase {
            name: "monthly_last_workday",
            dtstart: "20240531T090000Z",
            rules: &["FREQ=MONTHLY;BYDAY=MO,TU,WE,TH,FR;BYSETPOS=-1;COUNT=3"],
            expected: Some(&[
                "2024-05-31T09:00:00+00:00",
                "2024-06-28T09:00:00+00:00",
                "2024-07-31T09:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            oracle: true,
        },
        RecurCase {
            name: "yearly_last_sunday_of_march",
            dtstart: "20240331T010000Z",
            rules: &["FREQ=YEARLY;COUNT=3;BYMONTH=3;BYDAY=-1SU"],
            expected: Some(&[
                "2024-03-31T01:00:00+00:00",
                "2025-03-30T01:00:00+00:00",
                "2026-03-29T01:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            oracle: true,
        },
        RecurCase {
            // DTSTART is not itself a last Sunday but is still the first instance.
            name: "yearly_last_sunday_of_march_from_month_start",
            dtstart: "20240301T090000Z",
            rules: &["FREQ=YEARLY;BYMONTH=3;BYDAY=-1SU"],
            expected: Some(&[
                "2024-03-01T09:00:00+00:00",
                "2024-03-31T09:00:00+00:00",
                "2025-03-30T09:00:00+00:00",
            ]),
            expected_len: None,
            limit: 3,
            oracle: false,
        },
        RecurCase {
            name: "yearly_first_and_last_day",
            dtstart: "20240101T120000Z",
            rules: &["FREQ=YEARLY;BYYEARDAY=1,-1;COUNT=3"],
            expected: Some(&[
                "2024-01-01T12:00:00+00:00",
                "2024-12-31T12:00:00+00:00",
                "2025-01-01T12:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            oracle: true,
        },
        RecurCase {
            name: "hourly_every_six",
            dtstart: "20240101T000000Z",
            rules: &["FREQ=HOURLY;INTERVAL=6;COUNT=4"],
            expected: Some(&[
                "2024-01-01T00:00:00+00:00",
                "2024-01-01T06:00:00+00:00",
                "2024-01-01T12:00:00+00:00",
                "2024-01-01T18:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            oracle: true,
        },
        RecurCase {
            name: "two_rules_union",
            dtstart: "20240101T090000Z",
            rules: &["FREQ=DAILY;COUNT=2", "FREQ=WEEKLY;BYDAY=FR;COUNT=2"],
            expected: Some(&[
                "2024-01-01T09:00:00+00:00",
                "2024-01-02T09:00:00+00:00",
                "2024-01-05T09:00:00+00:00",
                "2024-01-12T09:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            oracle: true,
        },
        RecurCase {
            name: "dst_new_york",
            dtstart: "TZID=America/New_York:20210313T090000",
            rules: &["FREQ=DAILY;COUNT=3"],
            expected: Some(&[
                "2021-03-13T09:00:00-05:00",
                "2021-03-14T09:00:00-04:00",
                "2021-03-15T09:00:00-04:00",
            ]),
            expected_len: None,
            limit: 100,
            oracle: true,
        },
        RecurCase {
            name: "rfc_every_day_in_january",
            dtstart: "TZID=America/New_York:19980101T090000",
            rules: &[
                "FREQ=YEARLY;UNTIL=20000131T140000Z;BYMONTH=1;BYDAY=SU,MO,TU,WE,TH,FR,SA",
            ],
            expected: None,
            expected_len: Some(93),
            limit: 200,
            oracle: true,
        },
        RecurCase {
            name: "monthly_31st_clamps_to_month_end",
            dtstart: "20240131T100000Z",
            rules: &["FREQ=MONTHLY;COUNT=4"],
            expected: Some(&[
                "2024-01-31T10:00:00+00:00",
                "2024-02-29T10:00:00+00:00",
                "2024-03-31T10:00:00+00:00",
                "2024-04-30T10:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            oracle: false,
        },
        RecurCase {
            name: "monthly_bymonthday_31_keeps_february",
            dtstart: "20240131T100000Z",
            rules: &["FREQ=MONTHLY;BYMONTHDAY=31;COUNT=3"],
            expected: Some(&[
                "2024-01-31T10:00:00+00:00",
                "2024-02-29T10:00:00+00:00",
                "2024-03-31T10:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            oracle: false,
        },
        RecurCase {
            name: "leap_day_yearly_clamps",
            dtstart: "20240229T080000Z",
            rules: &["FREQ=YEARLY;COUNT=3"],
            expected: Some(&[
                "2024-02-29T08:00:00+00:00",
                "2025-02-28T08:00:00+00:00",
                "2026-02-28T08:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            oracle: false,
        },
        RecurCase {
            name: "unbounded_stops_after_2037",
            dtstart: "20370101T000000Z",
            rules: &["FREQ=MONTHLY"],
            expected: None,
            expected_len: Some(12),
            limit: 100,
            oracle: false,
        },
    ]
}

pub fn assert_case(case: &RecurCase) {
    let component = case_component(case);
    let instances = RecurrenceService::with_default_timezone(Tz::UTC)
        .expand_limited(&component, None, None, usize::from(case.limit))
        .unwrap_or_else(|err| panic!("Failed to expand {}: {}", case.name, err));
    let actual_timestamps: Vec<i64> = instances
        .iter()
        .map(|instance| instance.start.timestamp())
        .collect();

    if let Some(expected) = case.expected {
        let expected_timestamps: Vec<i64> = expected
            .iter()
            .map(|value| parse_rfc3339(value).timestamp())
            .collect();
        assert_eq!(
            actual_timestamps, expected_timestamps,
            "Case {} did not match",
            case.name
        );
    }

    if let Some(expected_len) = case.expected_len {
        assert_eq!(
            instances.len(),
            expected_len,
            "Case {} expected {} occurrences",
            case.name,
            expected_len
        );
    }

    if case.oracle {
        assert_eq!(
            actual_timestamps,
            oracle_timestamps(case),
            "Case {} disagrees with the rrule crate",
            case.name
        );
    }
}

fn case_component(case: &RecurCase) -> RecurringComponent {
    let (tzid, value) = match case
        .dtstart
        .strip_prefix("TZID=")
        .and_then(|rest| rest.split_once(':'))
    {
        Some((tzid, value)) => (Some(tzid), value),
        None => (None, case.dtstart),
    };
    let dtstart = DateOrDateTime::parse(value, tzid)
        .unwrap_or_else(|err| panic!("Failed to parse DTSTART of {}: {}", case.name, err));

    case.rules
        .iter()
        .fold(RecurringComponent::event(dtstart), |component, rule| {
            let rule: RRule = rule
                .parse()
                .unwrap_or_else(|err| panic!("Failed to parse rule of {}: {}", case.name, err));
            component.with_rrule(rule)
        })
}

fn oracle_timestamps(case: &RecurCase) -> Vec<i64> {
    let dtstart = match case.dtstart.strip_prefix("TZID=") {
        Some(rest) => format!("DTSTART;TZID={rest}"),
        None => format!("DTSTART:{}", case.dtstart),
    };
    let text = std::iter::once(dtstart)
        .chain(case.rules.iter().map(|rule| format!("RRULE:{rule}")))
        .collect::<Vec<_>>()
        .join("\n");

    let rrule_set: RRuleSet = text
        .parse()
        .unwrap_or_else(|err| panic!("rrule crate failed to parse {}: {}", case.name, err));

    rrule_set
        .all(case.limit)
        .dates
        .iter()
        .map(chrono::DateTime::timestamp)
        .collect()
}

fn parse_rfc3339(value: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(value).unwrap_or_else(|err| {
        panic!("Failed to parse rfc3339 value {value}: {err}")
    })
}
