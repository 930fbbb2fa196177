//! Telemetry event types describing pipeline activity for diagnostics
//! consumers (CLI output, log shippers, tests).

use serde::{Deserialize, Serialize};

use crate::analysis::FormFault;
use crate::haptic::{HapticPattern, Zone};
use crate::session::SessionMode;

/// Pipeline metric events, one per notable occurrence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    ShotSegmented {
        start_ms: u64,
        duration_ms: u64,
        peak_magnitude: f64,
        dropped_points: usize,
    },
    CalibrationProgress {
        accepted: usize,
        required: usize,
    },
    ShotRejected {
        code: i32,
        reason: String,
    },
    FormScored {
        score: f64,
        fault: Option<FormFault>,
    },
    HapticIssued {
        pattern: HapticPattern,
        priority: u8,
    },
    SampleDropped {
        code: i32,
    },
    MotorFault {
        zone: Zone,
    },
    MotorFaultCleared {
        zone: Zone,
    },
    HapticsToggled {
        enabled: bool,
    },
    OutcomeRecorded {
        made: bool,
    },
    ModeChanged {
        from: SessionMode,
        to: SessionMode,
    },
}
