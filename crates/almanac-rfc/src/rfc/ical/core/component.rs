//! The recurring component model: the subset of a VEVENT, VTODO or VJOURNAL
//! that recurrence expansion reads.

use std::fmt;

use almanac_core::constants::END_DATE_PARAMETER;

use super::{DateOrDateTime, DateTime, Duration, RRule};
use crate::error::{RfcError, RfcResult};

/// Kind of calendar component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Event,
    Todo,
    Journal,
}

impl ComponentKind {
    /// Returns the component name as written in iCalendar.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Event => "VEVENT",
            Self::Todo => "VTODO",
            Self::Journal => "VJOURNAL",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An RRULE or EXRULE property: the rule value plus the cached end date
/// resolved for COUNT-based rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleProperty {
    pub rule: RRule,
    /// UTC start of the COUNT-th instance, or the epoch when the rule never
    /// produces that many.
    end_date: Option<DateTime>,
}

impl RuleProperty {
    #[must_use]
    pub const fn new(rule: RRule) -> Self {
        Self {
            rule,
            end_date: None,
        }
    }

    /// Returns the cached end date, if one has been resolved.
    #[must_use]
    pub const fn cached_end_date(&self) -> Option<&DateTime> {
        self.end_date.as_ref()
    }

    pub fn set_cached_end_date(&mut self, end_date: DateTime) {
        self.end_date = Some(end_date);
    }

    pub fn clear_cached_end_date(&mut self) {
        self.end_date = None;
    }

    /// ## Summary
    /// Returns the cached end date as an extension parameter `(name, value)`
    /// so a property store can persist it alongside the rule.
    #[must_use]
    pub fn end_date_parameter(&self) -> Option<(&'static str, String)> {
        self.end_date
            .as_ref()
            .map(|end| (END_DATE_PARAMETER, end.to_string()))
    }

    /// ## Summary
    /// Restores a cached end date from its persisted parameter value.
    ///
    /// ## Errors
    /// Returns an error if the value is not a UTC DATE-TIME.
    pub fn set_end_date_parameter(&mut self, value: &str) -> RfcResult<()> {
        let end = DateTime::parse(value, None)?;
        if !end.is_utc() {
            return Err(RfcError::ValidationError(format!(
                "{END_DATE_PARAMETER} value '{value}' is not UTC"
            )));
        }
        self.end_date = Some(end);
        Ok(())
    }
}

impl From<RRule> for RuleProperty {
    fn from(rule: RRule) -> Self {
        Self::new(rule)
    }
}

/// Explicit end of an RDATE period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodEnd {
    End(DateTime),
    Duration(Duration),
}

/// One RDATE value: a start with an optional explicit end or duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceDate {
    pub start: DateOrDateTime,
    pub end: Option<PeriodEnd>,
}

impl RecurrenceDate {
    /// An RDATE that takes the component's own duration.
    #[must_use]
    pub fn at(start: impl Into<DateOrDateTime>) -> Self {
        Self {
            start: start.into(),
            end: None,
        }
    }

    /// An RDATE period with an explicit end.
    #[must_use]
    pub fn until(start: impl Into<DateOrDateTime>, end: DateTime) -> Self {
        Self {
            start: start.into(),
            end: Some(PeriodEnd::End(end)),
        }
    }

    /// An RDATE period with an explicit duration.
    #[must_use]
    pub fn lasting(start: impl Into<DateOrDateTime>, duration: Duration) -> Self {
        Self {
            start: start.into(),
            end: Some(PeriodEnd::Duration(duration)),
        }
    }
}

/// A calendar component as seen by recurrence expansion.
///
/// Fields are assumed already parsed from iCalendar text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringComponent {
    pub kind: ComponentKind,
    pub uid: Option<String>,
    pub dtstart: Option<DateOrDateTime>,
    pub dtend: Option<DateOrDateTime>,
    pub due: Option<DateOrDateTime>,
    pub duration: Option<Duration>,
    /// Set on a detached instance of a recurring series.
    pub recurrence_id: Option<DateOrDateTime>,
    pub rrules: Vec<RuleProperty>,
    pub exrules: Vec<RuleProperty>,
    pub rdates: Vec<RecurrenceDate>,
    pub exdates: Vec<DateOrDateTime>,
}

impl RecurringComponent {
    /// Creates an empty component of the given kind.
    #[must_use]
    pub const fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            uid: None,
            dtstart: None,
            dtend: None,
            due: None,
            duration: None,
            recurrence_id: None,
            rrules: Vec::new(),
            exrules: Vec::new(),
            rdates: Vec::new(),
            exdates: Vec::new(),
        }
    }

    /// Creates an event starting at `dtstart`.
    #[must_use]
    pub fn event(dtstart: impl Into<DateOrDateTime>) -> Self {
        Self::new(ComponentKind::Event).with_dtstart(dtstart)
    }

    /// Creates a journal entry dated `dtstart`.
    #[must_use]
    pub fn journal(dtstart: impl Into<DateOrDateTime>) -> Self {
        Self::new(ComponentKind::Journal).with_dtstart(dtstart)
    }

    #[must_use]
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    #[must_use]
    pub fn with_dtstart(mut self, dtstart: impl Into<DateOrDateTime>) -> Self {
        self.dtstart = Some(dtstart.into());
        self
    }

    #[must_use]
    pub fn with_dtend(mut self, dtend: impl Into<DateOrDateTime>) -> Self {
        self.dtend = Some(dtend.into());
        self
    }

    #[must_use]
    pub fn with_due(mut self, due: impl Into<DateOrDateTime>) -> Self {
        self.due = Some(due.into());
        self
    }

    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    #[must_use]
    pub fn with_recurrence_id(mut self, recurrence_id: impl Into<DateOrDateTime>) -> Self {
        self.recurrence_id = Some(recurrence_id.into());
        self
    }

    #[must_use]
    pub fn with_rrule(mut self, rule: RRule) -> Self {
        self.rrules.push(RuleProperty::new(rule));
        self
    }

    #[must_use]
    pub fn with_exrule(mut self, rule: RRule) -> Self {
        self.exrules.push(RuleProperty::new(rule));
        self
    }

    #[must_use]
    pub fn with_rdate(mut self, rdate: RecurrenceDate) -> Self {
        self.rdates.push(rdate);
        self
    }

    #[must_use]
    pub fn with_exdate(mut self, exdate: impl Into<DateOrDateTime>) -> Self {
        self.exdates.push(exdate.into());
        self
    }

    /// Returns whether the component has RRULE or RDATE properties.
    #[must_use]
    pub fn has_recurrences(&self) -> bool {
        !self.rrules.is_empty() || !self.rdates.is_empty()
    }

    /// Returns whether the component has EXRULE or EXDATE properties.
    #[must_use]
    pub fn has_exceptions(&self) -> bool {
        !self.exrules.is_empty() || !self.exdates.is_empty()
    }

    /// Returns whether this is a detached instance (it carries RECURRENCE-ID).
    #[must_use]
    pub const fn is_detached_instance(&self) -> bool {
        self.recurrence_id.is_some()
    }
}
