/// Last calendar year (inclusive) the recurrence driver will expand into.
///
/// Instants are historically stored as signed 32-bit seconds, which run out
/// in January 2038.
pub const MAX_EXPANSION_YEAR: i32 = 2037;

/// Vendor token used for extension parameters written by this workspace.
pub const VENDOR_TOKEN: &str = "ALMANAC";

/// Parameter name under which a resolved COUNT end date is cached on an
/// RRULE or EXRULE property.
pub const END_DATE_PARAMETER: &str = const_str::concat!("X-", VENDOR_TOKEN, "-ENDDATE");

/// Timezone used when none is configured.
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Seconds in a civil day, ignoring leap seconds.
pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;
