// Haptic patterns - intensity envelopes over a command's lifetime
//
// Every envelope is a pure function of elapsed time, so the dispatcher can
// tick at any rate (or a test can jump the clock) and get the same output.

use serde::{Deserialize, Serialize};

use crate::config::HapticConfig;

/// Vibration envelope shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HapticPattern {
    SinglePulse,
    DoublePulse,
    TriplePulse,
    Continuous,
    /// Ramp from `ramp_base` up to the command intensity
    Increasing,
    /// Ramp from the command intensity down to `ramp_base`
    Decreasing,
    /// Square wave bouncing between the two zones of an alternating target
    Alternating,
    Wave,
}

impl HapticPattern {
    /// Envelope intensity `elapsed_ms` into a command
    ///
    /// Returns 0 outside `[0, duration_ms)`. Alternating returns the full
    /// intensity; which zone of the pair is lit is decided by
    /// [`alternating_first_half`].
    pub fn intensity_at(
        &self,
        elapsed_ms: u64,
        duration_ms: u64,
        intensity: u8,
        config: &HapticConfig,
    ) -> u8 {
        if elapsed_ms >= duration_ms {
            return 0;
        }
        let progress = elapsed_ms as f64 / duration_ms as f64;
        let full = intensity as f64;
        let base = config.ramp_base as f64;

        let level = match self {
            HapticPattern::SinglePulse | HapticPattern::Continuous | HapticPattern::Alternating => {
                full
            }
            HapticPattern::DoublePulse => pulse_train(progress, 2, full),
            HapticPattern::TriplePulse => pulse_train(progress, 3, full),
            HapticPattern::Increasing => base + (full - base) * progress,
            HapticPattern::Decreasing => full + (base - full) * progress,
            HapticPattern::Wave => {
                let t = elapsed_ms as f64 / 1000.0;
                full * (2.0 * std::f64::consts::PI * config.wave_frequency_hz * t)
                    .sin()
                    .abs()
            }
        };
        level.round().clamp(0.0, 255.0) as u8
    }
}

/// `pulses` equal slots, each on for its first half
fn pulse_train(progress: f64, pulses: u32, full: f64) -> f64 {
    let slot_position = (progress * pulses as f64).fract();
    if slot_position < 0.5 {
        full
    } else {
        0.0
    }
}

/// True while the first zone of an alternating pair should be driven
pub fn alternating_first_half(elapsed_ms: u64, period_ms: u64) -> bool {
    if period_ms == 0 {
        return true;
    }
    (elapsed_ms % period_ms) * 2 < period_ms
}
