//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Extract the four-digit year from a catalog release date
///
/// Catalog release dates come in `YYYY`, `YYYY-MM` or `YYYY-MM-DD` precision.
pub fn release_year(release_date: &str) -> Option<u16> {
    release_date.get(..4)?.parse().ok()
}
