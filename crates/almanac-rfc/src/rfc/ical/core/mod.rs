//! iCalendar core models (RFC 5545).
//!
//! Only the values a recurring component needs are modelled here: date and
//! date-time values with their timezone form, durations, recurrence rules and
//! the component that groups them. Parsing full VCALENDAR text is left to the
//! caller.

mod component;
mod datetime;
mod duration;
mod rrule;

pub use component::{
    ComponentKind, PeriodEnd, RecurrenceDate, RecurringComponent, RuleProperty,
};
pub use datetime::{Date, DateOrDateTime, DateTime, DateTimeForm};
pub use duration::Duration;
pub use rrule::{Frequency, RRule, RRuleUntil, Weekday, WeekdayNum};
