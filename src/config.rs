//! Per-device configuration.
//!
//! All tunable timing parameters for buttons and encoders. Values are
//! validated at device construction time — invalid ranges are rejected,
//! never clamped.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Push-button debounce and gesture timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ButtonConfig {
    /// Consecutive consistent samples required to commit a transition.
    pub debounce_ticks: u32,
    /// Period of the debounce sampler (milliseconds).
    pub sample_period_ms: u32,
    /// Hold duration after which a committed press emits
    /// `ButtonLongPress` (milliseconds).
    pub long_press_ms: u32,
    /// When set, a press committed within this many milliseconds of the
    /// previous committed release additionally emits `ButtonDoubleTap`.
    /// `None` disables double-tap detection.
    pub double_tap_window_ms: Option<u32>,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            debounce_ticks: 5,
            sample_period_ms: 1,
            long_press_ms: 1500,
            double_tap_window_ms: None,
        }
    }
}

impl ButtonConfig {
    pub fn validate(&self) -> Result<()> {
        if self.debounce_ticks == 0 {
            return Err(Error::Config("debounce_ticks must be >= 1"));
        }
        if self.sample_period_ms == 0 {
            return Err(Error::Config("sample_period_ms must be >= 1"));
        }
        if self.long_press_ms == 0 {
            return Err(Error::Config("long_press_ms must be > 0"));
        }
        if self.double_tap_window_ms == Some(0) {
            return Err(Error::Config("double_tap_window_ms must be > 0 when set"));
        }
        Ok(())
    }
}

/// Rotary-encoder click-rate policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Pause (milliseconds) after which the click history is reset to
    /// cold before the next click is recorded.
    pub idle_reset_ms: u64,
    /// Interval written to every history slot on a cold reset
    /// (milliseconds). Large enough that a freshly reset history maps to
    /// the minimum step multiplier.
    pub cold_interval_ms: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            idle_reset_ms: 1100,
            cold_interval_ms: 15_000,
        }
    }
}

impl EncoderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.idle_reset_ms == 0 {
            return Err(Error::Config("idle_reset_ms must be > 0"));
        }
        if self.cold_interval_ms == 0 {
            return Err(Error::Config("cold_interval_ms must be > 0"));
        }
        Ok(())
    }
}
