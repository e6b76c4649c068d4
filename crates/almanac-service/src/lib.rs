//! Consumer-facing recurrence expansion: instance collection over the
//! engine in `almanac-rfc`, configured from `almanac-core` settings.

pub mod error;
pub mod recurrence;
pub mod telemetry;
