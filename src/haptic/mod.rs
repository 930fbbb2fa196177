// Haptic module - corrective vibration feedback
//
// This module turns form errors into timed per-zone motor activity:
// 1. feedback: fixed table mapping the dominant fault to HapticCommands
// 2. HapticDispatcher: per-zone scheduling with priority preemption
// 3. HapticPattern: intensity envelopes evaluated from elapsed time
// 4. MotorDriver: seam to the actuator hardware
//
// Zones are worn on the shooting arm: upper arm, forearm and wrist.

use serde::{Deserialize, Serialize};

use crate::error::HapticError;

pub mod dispatcher;
pub mod driver;
pub mod feedback;
pub mod pattern;

pub use dispatcher::{HapticDispatcher, SubmitOutcome, ZoneOutput};
pub use driver::{MotorDriver, RecordingDriver};
pub use feedback::commands_for;
pub use pattern::HapticPattern;

/// Actuator location on the arm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    UpperArm,
    LowerArm,
    Wrist,
}

impl Zone {
    pub const ALL: [Zone; 3] = [Zone::UpperArm, Zone::LowerArm, Zone::Wrist];

    pub fn index(&self) -> usize {
        match self {
            Zone::UpperArm => 0,
            Zone::LowerArm => 1,
            Zone::Wrist => 2,
        }
    }
}

/// Zones a command is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HapticTarget {
    Single(Zone),
    AllZones,
    /// Pair driven in turn by the Alternating pattern
    Alternating(Zone, Zone),
}

impl HapticTarget {
    pub fn zones(&self) -> Vec<Zone> {
        match self {
            HapticTarget::Single(zone) => vec![*zone],
            HapticTarget::AllZones => Zone::ALL.to_vec(),
            HapticTarget::Alternating(first, second) if first == second => vec![*first],
            HapticTarget::Alternating(first, second) => vec![*first, *second],
        }
    }

    pub fn includes(&self, zone: Zone) -> bool {
        self.zones().contains(&zone)
    }
}

/// Named intensity levels (0-255 PWM duty)
pub struct Intensity {}

impl Intensity {
    pub const LIGHT: u8 = 64;
    pub const MEDIUM: u8 = 128;
    pub const STRONG: u8 = 255;
}

/// One scheduled vibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HapticCommand {
    pub target: HapticTarget,
    pub pattern: HapticPattern,
    pub intensity: u8,
    /// Always > 0
    pub duration_ms: u64,
    pub issued_at_ms: u64,
    /// Higher preempts lower; equal preempts too
    pub priority: u8,
}

impl HapticCommand {
    /// Build a validated command
    ///
    /// # Errors
    /// `HapticError::InvalidCommand` when `duration_ms` is zero
    pub fn new(
        target: HapticTarget,
        pattern: HapticPattern,
        intensity: u8,
        duration_ms: u64,
        issued_at_ms: u64,
        priority: u8,
    ) -> Result<Self, HapticError> {
        if duration_ms == 0 {
            return Err(HapticError::InvalidCommand {
                reason: "duration must be greater than zero".to_string(),
            });
        }
        Ok(Self {
            target,
            pattern,
            intensity,
            duration_ms,
            issued_at_ms,
            priority,
        })
    }
}
