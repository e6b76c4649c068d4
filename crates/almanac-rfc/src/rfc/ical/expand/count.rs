//! Resolution of COUNT-limited rules to an end date.
//!
//! A COUNT rule's end is the start of its COUNT-th instance. Finding it
//! means expanding the rule once from DTSTART; the result is cached on the
//! rule property so later expansions can treat the rule like an UNTIL rule.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use super::driver::{CancelFlag, Environment, Selection, run};
use super::error::ExpansionError;
use super::timezone::ResolveTimezone;
use crate::rfc::ical::core::{DateTime as IcalDateTime, RecurringComponent, RuleProperty};

/// ## Summary
/// Expands `property` alone and returns the UTC start of its COUNT-th
/// instance, or the epoch when the rule yields fewer instances (so the rule
/// then ends at once).
///
/// Floating and DATE start times are expanded as if they were UTC; the
/// stored wall-clock value is reinterpreted in the real zone when used.
///
/// ## Errors
/// Propagates cancellation and range errors from the expansion.
pub(crate) fn count_end_date(
    component: &RecurringComponent,
    property: &RuleProperty,
    env: &Environment<'_>,
) -> Result<IcalDateTime, ExpansionError> {
    let count = property.rule.count.unwrap_or(0);
    let mut end = None;

    if count > 0 {
        let mut unbounded = property.clone();
        unbounded.clear_cached_end_date();

        let count_env = Environment {
            default_tz: Tz::UTC,
            ..*env
        };

        let mut seen = 0_u32;
        run(
            component,
            Selection::SingleRule(&unbounded),
            &count_env,
            None,
            None,
            &mut |_: &RecurringComponent, start: DateTime<Utc>, _: DateTime<Utc>| {
                seen += 1;
                if seen >= count {
                    end = Some(start);
                    false
                } else {
                    true
                }
            },
        )?;
    }

    let end = end.unwrap_or(DateTime::UNIX_EPOCH);
    tracing::trace!(uid = ?component.uid, count, %end, "Resolved COUNT end date");
    Ok(IcalDateTime::from_instant(end))
}

#[derive(Debug, Clone, Copy)]
enum RuleList {
    Recurrence,
    Exception,
}

impl RuleList {
    fn of(self, component: &RecurringComponent) -> &[RuleProperty] {
        match self {
            Self::Recurrence => &component.rrules,
            Self::Exception => &component.exrules,
        }
    }

    fn of_mut(self, component: &mut RecurringComponent) -> &mut [RuleProperty] {
        match self {
            Self::Recurrence => &mut component.rrules,
            Self::Exception => &mut component.exrules,
        }
    }
}

/// ## Summary
/// Caches the end date of every COUNT rule (RRULE and EXRULE) on `component`.
///
/// Rules that already carry a cached value are skipped unless `refresh` is
/// set. Returns whether any cached value changed, so the caller knows to
/// persist the component.
///
/// ## Side Effects
/// Stops early, keeping the values resolved so far, when `cancel` is raised
/// or a rule cannot be expanded.
pub fn ensure_end_dates(
    component: &mut RecurringComponent,
    refresh: bool,
    resolver: &dyn ResolveTimezone,
    default_tz: Tz,
    cancel: &CancelFlag,
) -> bool {
    let env = Environment {
        resolver,
        default_tz,
        cancel,
    };
    let mut changed = false;

    for list in [RuleList::Recurrence, RuleList::Exception] {
        for index in 0..list.of(component).len() {
            let Some(property) = list.of(component).get(index) else {
                continue;
            };
            if property.rule.count.is_none() || (!refresh && property.cached_end_date().is_some()) {
                continue;
            }

            let end = match count_end_date(component, property, &env) {
                Ok(end) => end,
                Err(e) => {
                    tracing::warn!(uid = ?component.uid, error = %e, "Could not resolve COUNT end date");
                    return changed;
                }
            };

            if let Some(property) = list.of_mut(component).get_mut(index)
                && property.cached_end_date() != Some(&end)
            {
                property.set_cached_end_date(end);
                changed = true;
            }
        }
    }

    changed
}
