//! iCalendar (RFC 5545) support: the recurring component model and the
//! engine that expands it into concrete instances.

pub mod core;
pub mod expand;
