//! # Expiration Policy
//!
//! Pure functions over expiry windows and post renewal. All arithmetic runs
//! in milliseconds so repeated renewals never accumulate drift, and every
//! function takes `now` as a parameter so callers (and tests) control the
//! clock.

use chrono::{DateTime, Duration, Utc};
use em_core::error::{AppError, Result};
use em_core::models::Post;

/// Longest validity window a caller may request, in hours (one week).
pub const MAX_EXPIRATION_HOURS: i64 = 168;

/// Window applied when the caller does not request one.
pub const DEFAULT_EXPIRATION_HOURS: i64 = 24;

/// A post may be renewed at most this many times.
pub const MAX_RENEWALS: i32 = 3;

/// Normalizes a requested expiration window. `None` falls back to
/// `default_hours` without error; explicit values must land in
/// `1..=MAX_EXPIRATION_HOURS`.
pub fn validate_expiration_time(requested: Option<i64>, default_hours: i64) -> Result<i64> {
    let hours = match requested {
        None => return Ok(default_hours),
        Some(h) => h,
    };
    if hours <= 0 {
        return Err(AppError::InvalidInput(format!(
            "expiration must be a positive number of hours, got {hours}"
        )));
    }
    if hours > MAX_EXPIRATION_HOURS {
        return Err(AppError::InvalidInput(format!(
            "expiration cannot exceed {MAX_EXPIRATION_HOURS} hours, got {hours}"
        )));
    }
    Ok(hours)
}

/// `now + hours`, computed in milliseconds.
pub fn calculate_expiration_date(now: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
    now + Duration::milliseconds(hours * 3_600_000)
}

/// An entity is expired strictly after its deadline passes.
pub fn is_expired(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now > expires_at
}

/// Time left in the validity window, clamped at zero.
pub fn remaining_time(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (expires_at - now).max(Duration::zero())
}

/// Applies one renewal to a post: the new window **replaces** the old one,
/// counted from `now`, rather than extending whatever was left. Fails with
/// `RenewalLimitExceeded` once the post has used all `MAX_RENEWALS`.
pub fn renew_post(post: &mut Post, requested: Option<i64>, now: DateTime<Utc>) -> Result<()> {
    if post.renewal_count >= MAX_RENEWALS {
        return Err(AppError::RenewalLimitExceeded);
    }
    let hours = validate_expiration_time(requested, DEFAULT_EXPIRATION_HOURS)?;
    post.expires_at = Some(calculate_expiration_date(now, hours));
    post.renewal_count += 1;
    post.renewed_at = Some(now);
    Ok(())
}
