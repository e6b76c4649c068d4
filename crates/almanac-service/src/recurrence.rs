//! Recurrence expansion for callers that want instance lists rather than
//! callbacks.

use almanac_core::config::Settings;
use almanac_rfc::rfc::ical::core::RecurringComponent;
use almanac_rfc::rfc::ical::expand::{
    CancelFlag, TimeZoneResolver, ensure_end_dates, generate_instances,
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::{ServiceError, ServiceResult};

/// One concrete occurrence of a recurring component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instance {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Expands recurring components with a shared timezone cache and the
/// configured default zone.
#[derive(Debug)]
pub struct RecurrenceService {
    resolver: TimeZoneResolver,
    default_tz: Tz,
    cancel: CancelFlag,
}

impl RecurrenceService {
    /// ## Summary
    /// Builds the service from `settings`, resolving
    /// `recurrence.default_timezone` the same way TZID parameters are.
    ///
    /// ## Errors
    /// Returns `ServiceError::CoreError` for blank settings and
    /// `ServiceError::InvalidConfiguration` if the default timezone is
    /// unknown.
    pub fn new(settings: &Settings) -> ServiceResult<Self> {
        settings.validate()?;
        let resolver = TimeZoneResolver::new();
        let configured = settings.recurrence.default_timezone.as_str();
        let default_tz = resolver.resolve_tzid(configured).map_err(|e| {
            ServiceError::InvalidConfiguration(format!("recurrence.default_timezone: {e}"))
        })?;

        tracing::debug!(configured, %default_tz, "Recurrence service ready");

        Ok(Self {
            resolver,
            default_tz,
            cancel: CancelFlag::new(),
        })
    }

    /// Creates a service that places DATE and floating values in `default_tz`.
    #[must_use]
    pub fn with_default_timezone(default_tz: Tz) -> Self {
        Self {
            resolver: TimeZoneResolver::new(),
            default_tz,
            cancel: CancelFlag::new(),
        }
    }

    /// Shares `cancel` with the caller; raising it aborts running and later
    /// expansions.
    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub const fn default_timezone(&self) -> Tz {
        self.default_tz
    }

    #[must_use]
    pub const fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// ## Summary
    /// Returns every instance of `component` overlapping `[start, end)`.
    ///
    /// `None` bounds mean from DTSTART on and no upper bound; unbounded
    /// rules stop at the end of 2037.
    ///
    /// ## Errors
    /// Returns `ServiceError::ExpansionError` if the expansion is cancelled
    /// or an instance falls outside the representable range.
    pub fn expand(
        &self,
        component: &RecurringComponent,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> ServiceResult<Vec<Instance>> {
        self.collect(component, start, end, None)
    }

    /// ## Summary
    /// Like [`Self::expand`], but stops after `limit` instances.
    ///
    /// ## Errors
    /// Same as [`Self::expand`].
    pub fn expand_limited(
        &self,
        component: &RecurringComponent,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: usize,
    ) -> ServiceResult<Vec<Instance>> {
        self.collect(component, start, end, Some(limit))
    }

    /// ## Summary
    /// Caches the end date of every COUNT rule on `component`.
    ///
    /// With `refresh` set, cached values are recomputed. Returns whether
    /// anything changed and the component needs saving.
    pub fn refresh_count_end_dates(&self, component: &mut RecurringComponent, refresh: bool) -> bool {
        ensure_end_dates(
            component,
            refresh,
            &self.resolver,
            self.default_tz,
            &self.cancel,
        )
    }

    fn collect(
        &self,
        component: &RecurringComponent,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> ServiceResult<Vec<Instance>> {
        let mut instances = Vec::new();
        if limit == Some(0) {
            return Ok(instances);
        }

        generate_instances(
            component,
            start,
            end,
            |_, start, end| {
                instances.push(Instance { start, end });
                limit.is_none_or(|limit| instances.len() < limit)
            },
            &self.resolver,
            self.default_tz,
            &self.cancel,
        )?;

        tracing::trace!(uid = ?component.uid, count = instances.len(), "Expanded component");
        Ok(instances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use almanac_core::config::{LoggingConfig, RecurrenceConfig};
    use almanac_rfc::rfc::ical::core::{Date, DateTime as IcalDateTime, RRule};
    use almanac_rfc::rfc::ical::expand::ExpansionError;
    use chrono::TimeZone;

    fn settings(default_timezone: &str) -> Settings {
        Settings {
            recurrence: RecurrenceConfig {
                default_timezone: default_timezone.to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    fn utc(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
    }

    #[test_log::test]
    fn resolves_configured_default_timezone() {
        let service = RecurrenceService::new(&settings("W. Europe Standard Time")).unwrap();
        assert_eq!(service.default_timezone(), Tz::Europe__Berlin);
    }

    #[test_log::test]
    fn unknown_default_timezone_is_a_configuration_error() {
        let result = RecurrenceService::new(&settings("Mars/Olympus_Mons"));
        assert!(matches!(result, Err(ServiceError::InvalidConfiguration(_))));
    }

    #[test_log::test]
    fn blank_default_timezone_fails_validation() {
        let result = RecurrenceService::new(&settings(""));
        assert!(matches!(result, Err(ServiceError::CoreError(_))));
    }

    #[test_log::test]
    fn weekly_count_with_exdate() {
        let event = RecurringComponent::event(IcalDateTime::utc(2024, 1, 1, 9, 0, 0))
            .with_dtend(IcalDateTime::utc(2024, 1, 1, 10, 0, 0))
            .with_rrule(RRule::weekly().with_count(4))
            .with_exdate(IcalDateTime::utc(2024, 1, 8, 9, 0, 0));

        let instances = RecurrenceService::with_default_timezone(Tz::UTC)
            .expand(&event, None, None)
            .unwrap();

        assert_eq!(
            instances,
            vec![
                Instance {
                    start: utc(2024, 1, 1, 9),
                    end: utc(2024, 1, 1, 10),
                },
                Instance {
                    start: utc(2024, 1, 15, 9),
                    end: utc(2024, 1, 15, 10),
                },
                Instance {
                    start: utc(2024, 1, 22, 9),
                    end: utc(2024, 1, 22, 10),
                },
            ]
        );
    }

    #[test_log::test]
    fn window_selects_overlapping_instances() {
        let event = RecurringComponent::event(IcalDateTime::utc(2024, 1, 1, 9, 0, 0))
            .with_dtend(IcalDateTime::utc(2024, 1, 1, 10, 0, 0))
            .with_rrule(RRule::daily());

        let instances = RecurrenceService::with_default_timezone(Tz::UTC)
            .expand(&event, Some(utc(2024, 3, 10, 0)), Some(utc(2024, 3, 13, 0)))
            .unwrap();

        let starts: Vec<_> = instances.iter().map(|instance| instance.start).collect();
        assert_eq!(
            starts,
            vec![utc(2024, 3, 10, 9), utc(2024, 3, 11, 9), utc(2024, 3, 12, 9)]
        );
    }

    #[test_log::test]
    fn all_day_events_use_the_default_timezone() {
        let event = RecurringComponent::event(Date::new(2024, 7, 1))
            .with_rrule(RRule::daily().with_count(2));

        let instances = RecurrenceService::with_default_timezone(Tz::Europe__Berlin)
            .expand(&event, None, None)
            .unwrap();

        assert_eq!(
            instances,
            vec![
                Instance {
                    start: utc(2024, 6, 30, 22),
                    end: utc(2024, 7, 1, 22),
                },
                Instance {
                    start: utc(2024, 7, 1, 22),
                    end: utc(2024, 7, 2, 22),
                },
            ]
        );
    }

    #[test_log::test]
    fn limit_stops_unbounded_rules() {
        let event = RecurringComponent::event(IcalDateTime::utc(2024, 1, 1, 9, 0, 0))
            .with_rrule(RRule::daily());
        let service = RecurrenceService::with_default_timezone(Tz::UTC);

        let instances = service.expand_limited(&event, None, None, 5).unwrap();
        assert_eq!(instances.len(), 5);
        assert_eq!(instances[4].start, utc(2024, 1, 5, 9));

        assert!(service.expand_limited(&event, None, None, 0).unwrap().is_empty());
    }

    #[test_log::test]
    fn cancelled_expansion_is_an_error() {
        let cancel = CancelFlag::new();
        let service = RecurrenceService::with_default_timezone(Tz::UTC).with_cancel_flag(cancel.clone());
        let event = RecurringComponent::event(IcalDateTime::utc(2024, 1, 1, 9, 0, 0))
            .with_rrule(RRule::daily());

        cancel.cancel();
        assert!(service.cancel_flag().is_cancelled());
        assert!(matches!(
            service.expand(&event, None, None),
            Err(ServiceError::ExpansionError(ExpansionError::Cancelled))
        ));
    }

    #[test_log::test]
    fn count_end_dates_are_stored_as_parameters() {
        let service = RecurrenceService::with_default_timezone(Tz::UTC);
        let mut event = RecurringComponent::event(IcalDateTime::utc(2024, 1, 1, 9, 0, 0))
            .with_rrule(RRule::daily().with_count(3));

        assert!(service.refresh_count_end_dates(&mut event, false));
        assert_eq!(
            event.rrules[0].end_date_parameter(),
            Some(("X-ALMANAC-ENDDATE", "20240103T090000Z".to_string()))
        );
        assert!(!service.refresh_count_end_dates(&mut event, true));

        let instances = service.expand(&event, None, None).unwrap();
        assert_eq!(instances.len(), 3);
    }
}
