// Feedback table - dominant form fault to corrective haptic cue
//
// | Fault                   | Target             | Pattern     | Level  | ms  | Prio |
// |-------------------------|--------------------|-------------|--------|-----|------|
// | Acceleration +          | UpperArm           | SinglePulse | STRONG | 300 | 3    |
// | Acceleration -          | UpperArm           | Increasing  | STRONG | 400 | 3    |
// | Duration + (too slow)   | LowerArm           | TriplePulse | MEDIUM | 450 | 2    |
// | Duration - (too fast)   | LowerArm           | Decreasing  | MEDIUM | 300 | 2    |
// | Trajectory              | LowerArm <-> Wrist | Alternating | MEDIUM | 400 | 2    |
// | None (good form)        | all zones          | DoublePulse | LIGHT  | 200 | 1    |
//
// Calibration uses two extra cues: a short tap per accepted shot and a wave
// across all zones once the baseline is ready. A recorded make/miss gets a
// light forearm tap.

use super::{HapticCommand, HapticPattern, HapticTarget, Intensity, Zone};
use crate::analysis::{ErrorVector, FormFault};

fn command(
    target: HapticTarget,
    pattern: HapticPattern,
    intensity: u8,
    duration_ms: u64,
    priority: u8,
    now_ms: u64,
) -> HapticCommand {
    // Table durations are non-zero
    HapticCommand {
        target,
        pattern,
        intensity,
        duration_ms,
        issued_at_ms: now_ms,
        priority,
    }
}

/// Corrective commands for one scored shot, in submission order
pub fn commands_for(errors: &ErrorVector, now_ms: u64) -> Vec<HapticCommand> {
    let cue = match errors.dominant_fault {
        Some(FormFault::Acceleration) if errors.acceleration >= 0.0 => command(
            HapticTarget::Single(Zone::UpperArm),
            HapticPattern::SinglePulse,
            Intensity::STRONG,
            300,
            3,
            now_ms,
        ),
        Some(FormFault::Acceleration) => command(
            HapticTarget::Single(Zone::UpperArm),
            HapticPattern::Increasing,
            Intensity::STRONG,
            400,
            3,
            now_ms,
        ),
        Some(FormFault::Duration) if errors.duration >= 0.0 => command(
            HapticTarget::Single(Zone::LowerArm),
            HapticPattern::TriplePulse,
            Intensity::MEDIUM,
            450,
            2,
            now_ms,
        ),
        Some(FormFault::Duration) => command(
            HapticTarget::Single(Zone::LowerArm),
            HapticPattern::Decreasing,
            Intensity::MEDIUM,
            300,
            2,
            now_ms,
        ),
        Some(FormFault::Trajectory) => command(
            HapticTarget::Alternating(Zone::LowerArm, Zone::Wrist),
            HapticPattern::Alternating,
            Intensity::MEDIUM,
            400,
            2,
            now_ms,
        ),
        None => command(
            HapticTarget::AllZones,
            HapticPattern::DoublePulse,
            Intensity::LIGHT,
            200,
            1,
            now_ms,
        ),
    };
    vec![cue]
}

/// Short tap acknowledging an accepted calibration shot
pub fn calibration_ack(now_ms: u64) -> HapticCommand {
    command(
        HapticTarget::Single(Zone::UpperArm),
        HapticPattern::SinglePulse,
        Intensity::STRONG,
        100,
        1,
        now_ms,
    )
}

/// Wave across all zones when the baseline is complete
pub fn calibration_complete(now_ms: u64) -> HapticCommand {
    command(
        HapticTarget::AllZones,
        HapticPattern::Wave,
        Intensity::MEDIUM,
        1000,
        3,
        now_ms,
    )
}

/// Light forearm tap confirming a recorded shot outcome
pub fn shot_outcome_ack(now_ms: u64) -> HapticCommand {
    command(
        HapticTarget::Single(Zone::LowerArm),
        HapticPattern::SinglePulse,
        Intensity::LIGHT,
        100,
        1,
        now_ms,
    )
}
