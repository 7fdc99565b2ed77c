//! Bearer token expiry checks.
//!
//! Tokens are three dot-separated segments (`header.payload.signature`).
//! Only the payload is inspected: it is decoded as base64 JSON and its `exp`
//! claim (seconds since the Unix epoch) is compared against the clock. The
//! signature is never verified here; that is the backend's job.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::Value;

const PAD_INDIFFERENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);

/// Payloads may arrive in either alphabet, with or without padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, PAD_INDIFFERENT);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, PAD_INDIFFERENT);

/// Check whether `token` is still usable right now.
pub fn is_valid(token: &str) -> bool {
    is_valid_at(token, Utc::now())
}

/// Check whether `token` is usable at `now`.
///
/// Fails closed: anything that cannot be decoded is treated as expired.
/// The comparison is strict, so a token expiring exactly at `now` is invalid.
pub fn is_valid_at(token: &str, now: DateTime<Utc>) -> bool {
    match expiry_seconds(token) {
        Some(exp) => exp * 1000.0 > now.timestamp_millis() as f64,
        None => false,
    }
}

/// Extract the `exp` claim from a token payload, if it has one.
pub fn expiry_seconds(token: &str) -> Option<f64> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return None;
    }

    let bytes = decode_segment(segments[1])?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    claims.get("exp")?.as_f64()
}

/// Expiry as a timestamp, for display.
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    let exp = expiry_seconds(token)?;
    DateTime::from_timestamp_millis((exp * 1000.0) as i64)
}

fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    if segment.is_empty() {
        return None;
    }
    URL_SAFE_LENIENT
        .decode(segment)
        .or_else(|_| STANDARD_LENIENT.decode(segment))
        .ok()
}
