//! Timezone resolution and UTC conversion for recurrence expansion.
//!
//! Uses ICU4X for Windows timezone ID to IANA mapping and timezone canonicalization.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use icu::time::zone::WindowsParser;
use icu::time::zone::iana::IanaParserExtended;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

/// Error during timezone conversion.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// Unknown or invalid timezone identifier.
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    /// Non-existent time during DST gap.
    #[error("Non-existent time (DST gap): {0}")]
    NonExistentTime(String),

    /// Instant outside the representable range.
    #[error("Invalid datetime: {0}")]
    InvalidDateTime(String),
}

/// Maps a TZID string to a zone.
///
/// Expansion only ever needs to look zones up, so any source of zones
/// (a fixed table, a calendar store, a closure in tests) can stand in for
/// [`TimeZoneResolver`].
pub trait ResolveTimezone {
    /// Returns the zone named by `tzid`, or `None` if it is unknown.
    fn resolve(&self, tzid: &str) -> Option<Tz>;
}

impl<F> ResolveTimezone for F
where
    F: Fn(&str) -> Option<Tz>,
{
    fn resolve(&self, tzid: &str) -> Option<Tz> {
        self(tzid)
    }
}

/// Resolver for timezone identifiers.
///
/// Maintains a cache of resolved timezones, shared across threads.
#[derive(Debug, Default)]
pub struct TimeZoneResolver {
    /// Cache of resolved IANA timezones by TZID.
    cache: Mutex<HashMap<String, Tz>>,
}

impl TimeZoneResolver {
    /// Creates a new timezone resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ## Summary
    /// Resolves a timezone identifier to a `chrono_tz::Tz`.
    ///
    /// Common CalDAV/iCalendar TZIDs are mapped to their IANA equivalents.
    ///
    /// ## Errors
    ///
    /// Returns `ConversionError::UnknownTimezone` if the TZID cannot be resolved.
    ///
    /// ## Side Effects
    ///
    /// Caches successful resolutions to avoid repeated parsing.
    pub fn resolve_tzid(&self, tzid: &str) -> Result<Tz, ConversionError> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(tz) = cache.get(tzid) {
            return Ok(*tz);
        }

        let normalized = normalize_tzid(tzid);
        let tz = Tz::from_str(&normalized)
            .map_err(|_e| ConversionError::UnknownTimezone(tzid.to_string()))?;

        cache.insert(tzid.to_string(), tz);
        Ok(tz)
    }

    #[cfg(test)]
    fn is_cached(&self, tzid: &str) -> bool {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(tzid)
    }
}

impl ResolveTimezone for TimeZoneResolver {
    fn resolve(&self, tzid: &str) -> Option<Tz> {
        match self.resolve_tzid(tzid) {
            Ok(tz) => Some(tz),
            Err(e) => {
                tracing::debug!(error = %e, "Timezone lookup failed");
                None
            }
        }
    }
}

/// Normalizes common CalDAV/iCalendar timezone identifiers to IANA names.
///
/// Uses ICU4X for Windows timezone ID mapping and IANA canonicalization.
#[must_use]
pub fn normalize_tzid(tzid: &str) -> String {
    let stripped = tzid
        .strip_prefix("/mozilla.org/")
        .or_else(|| tzid.strip_prefix("/softwarestudio.org/"))
        .unwrap_or(tzid);

    let windows_parser = WindowsParser::new();
    if let Some(tz) = windows_parser.parse(stripped, None) {
        let iana_parser = IanaParserExtended::new();
        for entry in iana_parser.iter() {
            if entry.time_zone == tz {
                return entry.canonical.to_string();
            }
        }
    }

    // Handles aliases like Europe/Kiev -> Europe/Kyiv
    let iana_parser = IanaParserExtended::new();
    let parsed = iana_parser.parse(stripped);
    if parsed.time_zone != icu::time::TimeZone::UNKNOWN {
        return parsed.canonical.to_string();
    }

    stripped.to_string()
}

/// ## Summary
/// Converts a local datetime in `tz` to UTC.
///
/// Ambiguous times (DST fold) resolve to the first occurrence.
///
/// ## Errors
///
/// Returns `ConversionError::NonExistentTime` if the time falls in a DST gap.
pub fn convert_to_utc(local_time: NaiveDateTime, tz: Tz) -> Result<DateTime<Utc>, ConversionError> {
    match tz.from_local_datetime(&local_time) {
        LocalResult::None => Err(ConversionError::NonExistentTime(format!(
            "{local_time} in timezone {tz}"
        ))),
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Ok(dt.with_timezone(&Utc)),
    }
}

/// ## Summary
/// Converts a local datetime to UTC, with fallback handling for DST gaps.
///
/// This is a lenient version of `convert_to_utc` that shifts non-existent
/// times forward by one hour instead of returning an error.
///
/// ## Errors
///
/// Returns an error if the shifted time is still not representable.
pub fn convert_to_utc_lenient(
    local_time: NaiveDateTime,
    tz: Tz,
) -> Result<DateTime<Utc>, ConversionError> {
    match convert_to_utc(local_time, tz) {
        Err(ConversionError::NonExistentTime(_)) => {
            let shifted = local_time
                .checked_add_signed(chrono::TimeDelta::hours(1))
                .ok_or_else(|| ConversionError::InvalidDateTime(local_time.to_string()))?;
            convert_to_utc(shifted, tz)
        }
        other => other,
    }
}

/// Resolves `tzid` through `resolver`, falling back to `default_tz` when the
/// identifier is unknown.
pub(crate) fn resolve_or_default(
    tzid: &str,
    resolver: &dyn ResolveTimezone,
    default_tz: Tz,
) -> Tz {
    resolver.resolve(tzid).unwrap_or_else(|| {
        tracing::warn!(tzid, fallback = %default_tz, "Unknown TZID, using default timezone");
        default_tz
    })
}
