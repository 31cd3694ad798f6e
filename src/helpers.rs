//! Shared helpers for provider attribute coercion and rounding.
//!
//! Provider documents carry every value as an attribute string. Coercion is
//! field-local: a value that does not parse becomes `None` for that field only.

/// Parse an integer attribute. Accepts surrounding whitespace, rejects
/// fractional values ("3.5").
pub(crate) fn parse_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
}

/// Parse a float attribute. Non-finite results are treated as missing.
pub(crate) fn parse_float(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Round to 1 decimal place.
///
/// Non-finite input is passed through unchanged so callers can decide
/// how to treat it.
pub(crate) fn round_1dp(v: f64) -> f64 {
    if !v.is_finite() {
        tracing::warn!("round_1dp received non-finite value {}", v);
        return v;
    }
    (v * 10.0).round() / 10.0
}
