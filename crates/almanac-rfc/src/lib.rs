//! iCalendar value model and the recurrence expansion engine.

pub mod error;
pub mod rfc;
