//! Field conversions shared by the sentence and source-table decoders.
//!
//! Receivers and casters routinely send empty or garbled fields. Rather than failing, each
//! call site names the value to fall back to.
use std::str::FromStr;

/// Parse `field`, returning `default` if it is absent or does not parse.
pub fn parse_or<T: FromStr>(field: Option<&str>, default: T) -> T {
    field
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Convert an NMEA `(d)ddmm.mmmm` value to signed decimal degrees.
///
/// The hemisphere decides how many leading digits are degrees: 2 for `N`/`S` and 3 for
/// `E`/`W`. Southern and western values are negative. Anything that cannot be converted,
/// including an unknown hemisphere or a value shorter than 4 characters, yields 0.0.
#[must_use]
pub fn degmin_to_degrees(dm: &str, hemisphere: &str) -> f64 {
    let (width, negate) = match hemisphere.trim() {
        "N" => (2, false),
        "S" => (2, true),
        "E" => (3, false),
        "W" => (3, true),
        _ => return 0.0,
    };
    let dm = dm.trim();
    if dm.len() < 4 {
        return 0.0;
    }
    let (Some(degrees), Some(minutes)) = (dm.get(..width), dm.get(width..)) else {
        return 0.0;
    };
    match (degrees.parse::<f64>(), minutes.parse::<f64>()) {
        (Ok(degrees), Ok(minutes)) => {
            let value = degrees + minutes / 60.0;
            if negate {
                -value
            } else {
                value
            }
        }
        _ => 0.0,
    }
}
