/// Mean Earth radius used by the geofence, in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Fallback zone when neither the location nor `DEFAULT_TIMEZONE` names one
pub const DEFAULT_TIMEZONE: &str = "Asia/Jakarta";

/// Standard workdays used for periods that are not a whole calendar month
pub const DEFAULT_STANDARD_WORKDAYS: i32 = 22;

/// Widest `start..=end` gap, in days, a workday count will walk
pub const MAX_CALENDAR_SPAN_DAYS: i64 = 5 * 366;

/// Local (hour, minute) on the 1st of the month when the scheduled batch runs
pub const BATCH_RUN_AT: (u32, u32) = (0, 5);

/// Token lifetime in weeks
pub const TOKEN_TTL_WEEKS: i64 = 1;
