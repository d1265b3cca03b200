//! Form-submission timestamps.
//!
//! The sheet writes `day/month/year hour.minute.second` (some locales use
//! `:` between time parts). Only the ordering matters, so values are parsed
//! into a naive local date-time.

use chrono::NaiveDateTime;

const FORMAT: &str = "%d/%m/%Y %H.%M.%S";

/// Parse a sheet timestamp. Returns `None` for anything that is not a real
/// calendar date and time.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
  let normalized = raw.trim().replace(':', ".");
  NaiveDateTime::parse_from_str(&normalized, FORMAT).ok()
}
