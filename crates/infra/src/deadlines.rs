//! Pure deadline math for split payments, invite links and capacity holds.
//!
//! `grace_until` on a pairing is not computed here: the payment callback
//! stamps it while an intent is mid-flight, and this crate only honors it
//! through `COALESCE(grace_until, deadline_at)` in the sweep scan and the
//! split-window checks.

use chrono::{DateTime, Duration, Utc};

use crate::error::EngineError;

/// Bounds for the configurable split-payment window.
pub const MIN_DEADLINE_HOURS: i64 = 2;
pub const MAX_DEADLINE_HOURS: i64 = 168;
pub const DEFAULT_DEADLINE_HOURS: i64 = 48;

/// Partner invite links default to 48h and are always re-minted on reopen.
pub const DEFAULT_INVITE_EXPIRY_MINUTES: i64 = 48 * 60;
pub const MIN_INVITE_EXPIRY_MINUTES: i64 = 15;
pub const MAX_INVITE_EXPIRY_MINUTES: i64 = 14 * 24 * 60;

/// Soft capacity reservation while a split payment is pending. Shorter than
/// the payment deadline; expiry is advisory for display, capacity correctness
/// stays with the slot/payment invariants.
pub const HOLD_TTL_MINUTES: i64 = 30;

pub fn clamp_deadline_hours(configured: Option<i64>) -> i64 {
    configured
        .unwrap_or(DEFAULT_DEADLINE_HOURS)
        .clamp(MIN_DEADLINE_HOURS, MAX_DEADLINE_HOURS)
}

/// Split-payment deadline: `now + hours`, never later than the event start.
/// Fails when the capped window does not leave any time before the event.
pub fn compute_split_deadline(
    now: DateTime<Utc>,
    event_start: Option<DateTime<Utc>>,
    configured_hours: Option<i64>,
) -> Result<DateTime<Utc>, EngineError> {
    let hours = clamp_deadline_hours(configured_hours);
    let mut deadline = now + Duration::hours(hours);
    if let Some(start) = event_start {
        if start < deadline {
            deadline = start;
        }
    }
    if deadline <= now {
        return Err(EngineError::SplitDeadlinePassed);
    }
    Ok(deadline)
}

/// Invite-link expiry, independent of the payment deadline.
pub fn compute_partner_link_expiry(
    now: DateTime<Utc>,
    configured_minutes: Option<i64>,
) -> DateTime<Utc> {
    let minutes = configured_minutes
        .unwrap_or(DEFAULT_INVITE_EXPIRY_MINUTES)
        .clamp(MIN_INVITE_EXPIRY_MINUTES, MAX_INVITE_EXPIRY_MINUTES);
    now + Duration::minutes(minutes)
}

pub fn hold_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::minutes(HOLD_TTL_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn clamps_configured_hours_to_bounds() {
        assert_eq!(clamp_deadline_hours(None), DEFAULT_DEADLINE_HOURS);
        assert_eq!(clamp_deadline_hours(Some(0)), MIN_DEADLINE_HOURS);
        assert_eq!(clamp_deadline_hours(Some(-5)), MIN_DEADLINE_HOURS);
        assert_eq!(clamp_deadline_hours(Some(10_000)), MAX_DEADLINE_HOURS);
        assert_eq!(clamp_deadline_hours(Some(24)), 24);
    }

    #[test]
    fn deadline_is_now_plus_window() {
        let now = t(10);
        let deadline = compute_split_deadline(now, None, Some(24)).unwrap();
        assert_eq!(deadline, now + Duration::hours(24));
    }

    #[test]
    fn deadline_is_capped_at_event_start() {
        let now = t(10);
        let start = t(16);
        let deadline = compute_split_deadline(now, Some(start), Some(48)).unwrap();
        assert_eq!(deadline, start);
    }

    #[test]
    fn deadline_fails_when_event_already_started() {
        let now = t(10);
        let start = t(9);
        assert_eq!(
            compute_split_deadline(now, Some(start), Some(48)),
            Err(EngineError::SplitDeadlinePassed)
        );
    }

    #[test]
    fn deadline_fails_when_event_starts_now() {
        let now = t(10);
        assert_eq!(
            compute_split_deadline(now, Some(now), None),
            Err(EngineError::SplitDeadlinePassed)
        );
    }

    #[test]
    fn invite_expiry_defaults_to_48h_and_clamps() {
        let now = t(10);
        assert_eq!(
            compute_partner_link_expiry(now, None),
            now + Duration::hours(48)
        );
        assert_eq!(
            compute_partner_link_expiry(now, Some(1)),
            now + Duration::minutes(MIN_INVITE_EXPIRY_MINUTES)
        );
        assert_eq!(
            compute_partner_link_expiry(now, Some(i64::MAX / 2)),
            now + Duration::minutes(MAX_INVITE_EXPIRY_MINUTES)
        );
    }

    #[test]
    fn hold_ttl_is_shorter_than_min_deadline() {
        let now = t(10);
        assert!(hold_expiry(now) < now + Duration::hours(MIN_DEADLINE_HOURS));
    }
}
