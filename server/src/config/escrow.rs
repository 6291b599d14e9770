//! Escrow policy configuration
//!
//! Hold periods and the platform fee are configurable via environment
//! variables, with bounded defaults. Per-transaction overrides at creation
//! time take precedence over the platform default.

use std::env;

use ledger::ReinstatePolicy;

/// Default hold period before automatic release: 7 days.
///
/// Override via HOLD_PERIOD_SECS environment variable. Individual payments
/// can be created with a different hold (promotional 2-day holds exist).
pub const DEFAULT_HOLD_PERIOD_SECS: i64 = 7 * 86_400;

/// Shortest hold the platform accepts (1 hour). Below this, the client has
/// no realistic window to confirm or dispute.
pub const MIN_HOLD_PERIOD_SECS: i64 = 3_600;

/// Longest hold the platform accepts (90 days).
pub const MAX_HOLD_PERIOD_SECS: i64 = 90 * 86_400;

/// Default platform commission on release: 10%.
///
/// Override via PLATFORM_FEE_BPS environment variable.
pub const DEFAULT_PLATFORM_FEE_BPS: u32 = 1_000;

/// Get the configured default hold period in seconds.
///
/// Reads HOLD_PERIOD_SECS, falling back to the default. Out-of-bounds values
/// are clamped with a warning rather than rejected.
pub fn get_default_hold_period_secs() -> i64 {
    env::var("HOLD_PERIOD_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(|secs: i64| {
            if secs < MIN_HOLD_PERIOD_SECS {
                tracing::warn!(
                    secs = secs,
                    min = MIN_HOLD_PERIOD_SECS,
                    "HOLD_PERIOD_SECS below minimum, using minimum"
                );
                MIN_HOLD_PERIOD_SECS
            } else if secs > MAX_HOLD_PERIOD_SECS {
                tracing::warn!(
                    secs = secs,
                    max = MAX_HOLD_PERIOD_SECS,
                    "HOLD_PERIOD_SECS above maximum, using maximum"
                );
                MAX_HOLD_PERIOD_SECS
            } else {
                secs
            }
        })
        .unwrap_or(DEFAULT_HOLD_PERIOD_SECS)
}

/// Get the configured default platform fee in basis points.
///
/// Reads PLATFORM_FEE_BPS, falling back to the default. Values above 100%
/// are clamped with a warning.
pub fn get_default_platform_fee_bps() -> u32 {
    env::var("PLATFORM_FEE_BPS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(|bps: u32| {
            if bps > 10_000 {
                tracing::warn!(bps = bps, "PLATFORM_FEE_BPS above 100%, clamping to 10000");
                10_000
            } else {
                bps
            }
        })
        .unwrap_or(DEFAULT_PLATFORM_FEE_BPS)
}

/// How a hold reinstated after a dispute recomputes its deadline.
///
/// Reads REINSTATE_POLICY ("restart" or "resume"), defaulting to restart.
pub fn get_reinstate_policy() -> ReinstatePolicy {
    match env::var("REINSTATE_POLICY").as_deref() {
        Ok("resume") => ReinstatePolicy::Resume,
        Ok("restart") | Err(_) => ReinstatePolicy::Restart,
        Ok(other) => {
            tracing::warn!(
                policy = other,
                "Unknown REINSTATE_POLICY, using restart"
            );
            ReinstatePolicy::Restart
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        assert_eq!(DEFAULT_HOLD_PERIOD_SECS, 604_800);
        assert_eq!(DEFAULT_PLATFORM_FEE_BPS, 1_000);
    }

    #[test]
    fn test_hold_period_bounds() {
        assert!(MIN_HOLD_PERIOD_SECS < DEFAULT_HOLD_PERIOD_SECS);
        assert!(DEFAULT_HOLD_PERIOD_SECS < MAX_HOLD_PERIOD_SECS);
    }
}
