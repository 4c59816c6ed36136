//! Stock Duration Math
//!
//! Pure helpers deriving how long a medication supply lasts from its
//! free-text intake frequency (e.g. "2x ao dia") and current stock.

use once_cell::sync::Lazy;
use regex::Regex;

/// A supply projected to last this many days or fewer is low
pub const LOW_STOCK_DAYS: i32 = 7;

/// A raw unit count at or below this is low regardless of projection
pub const LOW_STOCK_UNITS: i32 = 7;

/// Matches the doses-per-day count: an integer immediately followed by "x",
/// anywhere in the text ("2x ao dia", "tomar 3x", "1X por dia")
static FREQUENCY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)x").expect("Invalid frequency regex"));

/// Extract the doses-per-day count from a frequency description.
///
/// Returns `None` when the text carries no parsable "<n>x" marker, when the
/// number overflows, or when it is zero (a zero-dose frequency has no
/// meaningful supply projection).
pub fn doses_per_day(frequency: &str) -> Option<u32> {
    let captures = FREQUENCY_REGEX.captures(frequency)?;
    let count: u32 = captures.get(1)?.as_str().parse().ok()?;
    if count == 0 {
        return None;
    }
    Some(count)
}

/// Project how many whole days the current stock lasts.
///
/// Returns `None` when the frequency is unparseable; `Some(0)` when stock is
/// already depleted; otherwise integer-divides stock by doses per day.
pub fn days_until_empty(frequency: &str, stock: i32) -> Option<i32> {
    let per_day = doses_per_day(frequency)?;
    if stock <= 0 {
        return Some(0);
    }
    Some(stock / per_day as i32)
}

/// Whether a supply counts as low.
///
/// Low when the projected duration is at most [`LOW_STOCK_DAYS`], or when the
/// raw stock is at most one container. An unknown duration (`None`) never
/// satisfies the duration clause; the raw-stock clause still applies.
pub fn is_low_stock(stock: i32, pills_per_container: i32, days_until_empty: Option<i32>) -> bool {
    days_until_empty.map_or(false, |days| days <= LOW_STOCK_DAYS) || stock <= pills_per_container
}
