//! Configuration modules for the BookYourShoot escrow service

pub mod escrow;
pub mod monitor;

pub use escrow::{
    get_default_hold_period_secs, get_default_platform_fee_bps, get_reinstate_policy,
    DEFAULT_HOLD_PERIOD_SECS, DEFAULT_PLATFORM_FEE_BPS, MAX_HOLD_PERIOD_SECS,
    MIN_HOLD_PERIOD_SECS,
};
pub use monitor::MonitorConfig;
