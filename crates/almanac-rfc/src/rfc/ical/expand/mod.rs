//! Recurrence expansion (RFC 5545 §3.3.10, §3.8.5).
//!
//! Turns a recurring component (DTSTART plus RRULE, RDATE, EXRULE and
//! EXDATE) into concrete `(start, end)` instances within a time range.
//! Work is done on wall-clock fields in the component's timezone, one
//! calendar year at a time, and converted to UTC instants only when
//! reported.

mod assembler;
mod byrule;
mod count;
mod driver;
mod error;
mod frequency;
mod generator;
mod rule;
mod time;
mod timezone;

pub use count::ensure_end_dates;
pub use driver::{CancelFlag, generate_instances};
pub use error::ExpansionError;
pub use generator::expand_recurrence;
pub use rule::{ByDay, RecurData, RecurrenceRule, resolve_rule_end};
pub use time::{Granularity, TimePoint, days_in_month, days_in_year, is_leap_year};
pub use timezone::{
    ConversionError, ResolveTimezone, TimeZoneResolver, convert_to_utc, convert_to_utc_lenient,
    normalize_tzid,
};
