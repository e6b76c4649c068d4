//! Entry point of recurrence expansion: zone and duration resolution, the
//! non-recurring shortcut and the year-by-year chunk loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use almanac_core::constants::MAX_EXPANSION_YEAR;
use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;

use super::assembler::{ChunkStatus, Expansion, LiteralDate};
use super::count::count_end_date;
use super::error::ExpansionError;
use super::rule::{RecurrenceRule, resolve_rule_end};
use super::time::TimePoint;
use super::timezone::{ResolveTimezone, convert_to_utc_lenient, resolve_or_default};
use crate::rfc::ical::core::{
    ComponentKind, DateOrDateTime, DateTime as IcalDateTime, DateTimeForm, PeriodEnd,
    RecurringComponent, RuleProperty,
};

/// Cooperative cancellation for a running expansion.
///
/// Clones share the same flag. The expansion polls it before each year
/// chunk and before each callback.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Lookups shared by every stage of one expansion.
#[derive(Clone, Copy)]
pub(crate) struct Environment<'a> {
    pub resolver: &'a dyn ResolveTimezone,
    pub default_tz: Tz,
    pub cancel: &'a CancelFlag,
}

/// Which recurrence properties an expansion uses.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Selection<'a> {
    /// DTSTART, every RRULE and RDATE, minus EXRULEs and EXDATEs.
    Component,
    /// This rule alone, unbounded, for COUNT resolution.
    SingleRule(&'a RuleProperty),
}

/// ## Summary
/// Calls `callback(component, start, end)` for every instance of
/// `component` that overlaps `[start, end)`, in ascending start order.
///
/// `None` for `start` means from DTSTART on, `None` for `end` means no
/// upper bound (expansion still stops after 2037). DATE and floating values
/// are placed in `default_tz`; unknown TZIDs fall back to it as well.
/// Returning `false` from the callback stops the expansion without error.
/// COUNT rules without a cached end date are resolved on the fly; see
/// [`ensure_end_dates`](super::ensure_end_dates) to cache them.
///
/// ## Errors
/// Returns `ExpansionError::Cancelled` when `cancel` is raised, or
/// `ExpansionError::OutOfRange` when an instance cannot be placed in time.
pub fn generate_instances<F>(
    component: &RecurringComponent,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    mut callback: F,
    resolver: &dyn ResolveTimezone,
    default_tz: Tz,
    cancel: &CancelFlag,
) -> Result<(), ExpansionError>
where
    F: FnMut(&RecurringComponent, DateTime<Utc>, DateTime<Utc>) -> bool,
{
    let env = Environment {
        resolver,
        default_tz,
        cancel,
    };
    run(component, Selection::Component, &env, start, end, &mut callback)
}

pub(crate) fn run<F>(
    component: &RecurringComponent,
    selection: Selection<'_>,
    env: &Environment<'_>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    callback: &mut F,
) -> Result<(), ExpansionError>
where
    F: FnMut(&RecurringComponent, DateTime<Utc>, DateTime<Utc>) -> bool,
{
    let dtstart_value = match (&component.dtstart, &component.due) {
        (Some(dtstart), _) => dtstart,
        (None, Some(due)) if component.kind == ComponentKind::Todo => due,
        _ => {
            tracing::debug!(uid = ?component.uid, kind = %component.kind, "Component has no DTSTART, skipping");
            return Ok(());
        }
    };

    let (zone, convert_end_date) = start_zone(dtstart_value, env);
    let event_start = wall_time(dtstart_value, zone, env)?;
    let dtstart = event_start.to_instant(zone)?;
    let dtend = end_instant(component, dtstart_value, &event_start, zone, env)?;

    if matches!(selection, Selection::Component)
        && !component.has_recurrences()
        && !component.has_exceptions()
    {
        return report_single(component, dtstart_value, dtstart, dtend, start, end, env, callback);
    }

    let mut expansion = Expansion {
        component,
        zone,
        event_start,
        dtstart,
        range_start: start,
        duration: event_start.duration_until(&TimePoint::from_instant(dtend, zone)),
        rules: Vec::new(),
        exrules: Vec::new(),
        rdates: Vec::new(),
        exdates: Vec::new(),
        single_rule: false,
        cancel: env.cancel,
    };

    match selection {
        Selection::SingleRule(property) => {
            expansion.single_rule = true;
            expansion
                .rules
                .extend(RecurrenceRule::from_rrule(&property.rule, None));
        }
        Selection::Component if component.is_detached_instance() => {
            tracing::trace!(uid = ?component.uid, "Detached instance, ignoring its recurrence properties");
        }
        Selection::Component => {
            for property in &component.rrules {
                let end = rule_end(component, property, zone, convert_end_date, env)?;
                expansion.rules.extend(RecurrenceRule::from_rrule(&property.rule, end));
            }
            for property in &component.exrules {
                let end = rule_end(component, property, zone, convert_end_date, env)?;
                expansion.exrules.extend(RecurrenceRule::from_rrule(&property.rule, end));
            }
            for rdate in &component.rdates {
                let start = wall_time(&rdate.start, zone, env)?;
                let end = match &rdate.end {
                    None => None,
                    Some(PeriodEnd::End(end)) => Some(wall_time_of(end, zone, env)?),
                    Some(PeriodEnd::Duration(duration)) => {
                        let mut end = start;
                        end.add_days(duration.signed_days());
                        end.add_seconds(duration.signed_time_seconds());
                        Some(end)
                    }
                };
                expansion.rdates.push(LiteralDate { start, end });
            }
            for exdate in &component.exdates {
                let point = wall_time(exdate, zone, env)?;
                expansion.exdates.push(point.with_flag(exdate.is_date()));
            }
        }
    }

    let range_start = start.unwrap_or(dtstart);
    let mut interval_start = TimePoint::from_instant(range_start, zone);
    let interval_end = end.map(|end| TimePoint::from_instant(end - TimeDelta::seconds(1), zone));

    // An instance starting before the range may still overlap it, and an
    // RDATE period may last longer than the default duration.
    if range_start > dtstart {
        let (days, seconds) = expansion
            .rdates
            .iter()
            .filter_map(|rdate| rdate.end.map(|end| rdate.start.duration_until(&end)))
            .fold(expansion.duration, Ord::max);
        interval_start.add_days(-days);
        interval_start.add_seconds(-seconds);
    }

    let last_year = interval_end.map_or(MAX_EXPANSION_YEAR, |end| end.year.min(MAX_EXPANSION_YEAR));

    tracing::debug!(
        uid = ?component.uid,
        zone = %zone,
        rules = expansion.rules.len(),
        exrules = expansion.exrules.len(),
        rdates = expansion.rdates.len(),
        exdates = expansion.exdates.len(),
        first_year = interval_start.year,
        last_year,
        "Expanding recurrences"
    );

    for year in interval_start.year..=last_year {
        if env.cancel.is_cancelled() {
            return Err(ExpansionError::Cancelled);
        }

        let chunk_start = if year == interval_start.year {
            interval_start
        } else {
            TimePoint::date(year, 0, 1)
        };
        let chunk_end = match interval_end {
            Some(end) if end.year == year => end,
            _ => TimePoint::new(year, 11, 31, 23, 59, 61),
        };

        match expansion.assemble_chunk(&chunk_start, &chunk_end, callback)? {
            ChunkStatus::More => {}
            ChunkStatus::Finished => {
                tracing::trace!(year, "All recurrence sources ended");
                break;
            }
            ChunkStatus::Stopped => {
                tracing::trace!(year, "Callback stopped the expansion");
                break;
            }
        }
    }

    Ok(())
}

/// Zone recurrences are computed in, and whether cached COUNT end dates
/// need their wall-clock value reinterpreted in it.
fn start_zone(dtstart: &DateOrDateTime, env: &Environment<'_>) -> (Tz, bool) {
    match dtstart {
        DateOrDateTime::DateTime(dt) => match &dt.form {
            DateTimeForm::Zoned { tzid } => (resolve_or_default(tzid, env.resolver, env.default_tz), false),
            DateTimeForm::Utc => (Tz::UTC, false),
            DateTimeForm::Floating => (env.default_tz, true),
        },
        DateOrDateTime::Date(_) => (env.default_tz, true),
    }
}

/// Wall-clock time of `value` in `zone`. DATE and floating values are taken
/// as already being in `zone`.
pub(crate) fn wall_time(
    value: &DateOrDateTime,
    zone: Tz,
    env: &Environment<'_>,
) -> Result<TimePoint, ExpansionError> {
    match value {
        DateOrDateTime::Date(date) => date
            .naive()
            .map(|day| TimePoint::from_naive(day.and_time(chrono::NaiveTime::MIN)))
            .ok_or_else(|| ExpansionError::OutOfRange(date.to_string())),
        DateOrDateTime::DateTime(dt) => wall_time_of(dt, zone, env),
    }
}

fn wall_time_of(
    value: &IcalDateTime,
    zone: Tz,
    env: &Environment<'_>,
) -> Result<TimePoint, ExpansionError> {
    let naive = value
        .naive()
        .ok_or_else(|| ExpansionError::OutOfRange(value.to_string()))?;

    let instant = match &value.form {
        DateTimeForm::Floating => return Ok(TimePoint::from_naive(naive)),
        DateTimeForm::Utc => naive.and_utc(),
        DateTimeForm::Zoned { tzid } => {
            let source = resolve_or_default(tzid, env.resolver, env.default_tz);
            convert_to_utc_lenient(naive, source)
                .map_err(|e| ExpansionError::OutOfRange(e.to_string()))?
        }
    };

    Ok(TimePoint::from_instant(instant, zone))
}

/// ## Summary
/// End of the first instance: DTEND, else DUE for a to-do, else DTSTART
/// plus DURATION, else DTSTART (one day later for a DATE).
///
/// A DATE DTEND on the same day as a DATE DTSTART is moved one day on.
fn end_instant(
    component: &RecurringComponent,
    dtstart_value: &DateOrDateTime,
    event_start: &TimePoint,
    zone: Tz,
    env: &Environment<'_>,
) -> Result<DateTime<Utc>, ExpansionError> {
    let explicit_end = component.dtend.as_ref().or(match component.kind {
        ComponentKind::Todo => component.due.as_ref(),
        ComponentKind::Event | ComponentKind::Journal => None,
    });

    if let Some(end_value) = explicit_end {
        let end_zone = match end_value {
            DateOrDateTime::DateTime(dt) => match &dt.form {
                DateTimeForm::Zoned { tzid } => resolve_or_default(tzid, env.resolver, env.default_tz),
                DateTimeForm::Utc => Tz::UTC,
                DateTimeForm::Floating => env.default_tz,
            },
            DateOrDateTime::Date(_) => env.default_tz,
        };

        let mut end_point = wall_time(end_value, end_zone, env)?;
        if end_value.is_date() && dtstart_value.is_date() && end_value.date() == dtstart_value.date() {
            end_point.add_days(1);
        }
        return end_point.to_instant(end_zone);
    }

    let mut end_point = *event_start;
    if let Some(duration) = component.duration {
        end_point.add_days(duration.signed_days());
        end_point.add_seconds(duration.signed_time_seconds());
    } else if dtstart_value.is_date() {
        end_point.add_days(1);
    } else {
        // Zero-length instance.
    }
    end_point.to_instant(zone)
}

/// End instant of an RRULE or EXRULE, resolving an uncached COUNT by
/// expanding the rule once.
fn rule_end(
    component: &RecurringComponent,
    property: &RuleProperty,
    zone: Tz,
    convert_end_date: bool,
    env: &Environment<'_>,
) -> Result<Option<DateTime<Utc>>, ExpansionError> {
    if property.rule.count.is_none() || property.cached_end_date().is_some() {
        return Ok(resolve_rule_end(property, zone, convert_end_date));
    }

    let mut resolved = property.clone();
    resolved.set_cached_end_date(count_end_date(component, property, env)?);
    Ok(resolve_rule_end(&resolved, zone, convert_end_date))
}

/// A component without recurrence properties has exactly one instance.
#[expect(
    clippy::too_many_arguments,
    reason = "the single instance needs both its own bounds and the query bounds"
)]
fn report_single<F>(
    component: &RecurringComponent,
    dtstart_value: &DateOrDateTime,
    dtstart: DateTime<Utc>,
    dtend: DateTime<Utc>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    env: &Environment<'_>,
    callback: &mut F,
) -> Result<(), ExpansionError>
where
    F: FnMut(&RecurringComponent, DateTime<Utc>, DateTime<Utc>) -> bool,
{
    let overlaps = if component.kind == ComponentKind::Journal {
        // Journals are dated, so only the calendar day counts.
        let day = dtstart_value.date().naive();
        let local_day = |instant: DateTime<Utc>| instant.with_timezone(&env.default_tz).date_naive();
        day.is_some_and(|day| {
            start.is_none_or(|start| local_day(start) <= day) && end.is_none_or(|end| day < local_day(end))
        })
    } else {
        end.is_none_or(|end| dtstart < end) && start.is_none_or(|start| dtend > start)
    };

    if !overlaps {
        return Ok(());
    }
    if env.cancel.is_cancelled() {
        return Err(ExpansionError::Cancelled);
    }
    callback(component, dtstart, dtend);
    Ok(())
}
