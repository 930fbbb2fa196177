// Session mode state machine
//
// Standby ──Cycle──▶ Training ──Cycle──▶ Review ──Cycle──▶ Standby
//    │                                                        ▲
//    └──StartCalibration──▶ Calibrating ──complete/cancel─────┘
//
// Calibrating is only left by completing or cancelling; Cycle is ignored.
// Entering Training requires a valid calibration profile.

use serde::{Deserialize, Serialize};

/// Top-level operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    Standby,
    Calibrating,
    Training,
    Review,
}

/// Requests from the mode-cycling collaborator (button, CLI, UI)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeCommand {
    StartCalibration,
    CancelCalibration,
    StartTraining,
    Review,
    Standby,
    /// Advance Standby → Training → Review → Standby
    Cycle,
}

/// Side effects of a transition for the session to act on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModeEvent {
    Changed { from: SessionMode, to: SessionMode },
    /// Training was requested without a valid profile
    NotCalibrated,
    Ignored { mode: SessionMode, command: ModeCommand },
}

fn enter_training(mode: SessionMode, calibrated: bool) -> (SessionMode, Vec<ModeEvent>) {
    if calibrated {
        changed(mode, SessionMode::Training)
    } else {
        let mut events = vec![ModeEvent::NotCalibrated];
        if mode != SessionMode::Standby {
            events.insert(
                0,
                ModeEvent::Changed {
                    from: mode,
                    to: SessionMode::Standby,
                },
            );
        }
        (SessionMode::Standby, events)
    }
}

fn changed(from: SessionMode, to: SessionMode) -> (SessionMode, Vec<ModeEvent>) {
    if from == to {
        (to, Vec::new())
    } else {
        (to, vec![ModeEvent::Changed { from, to }])
    }
}

fn ignored(mode: SessionMode, command: ModeCommand) -> (SessionMode, Vec<ModeEvent>) {
    (mode, vec![ModeEvent::Ignored { mode, command }])
}

/// Pure mode transition
///
/// # Arguments
/// * `mode` - Current mode
/// * `command` - Requested change
/// * `calibrated` - Whether the profile currently holds a valid baseline
pub fn transition(
    mode: SessionMode,
    command: ModeCommand,
    calibrated: bool,
) -> (SessionMode, Vec<ModeEvent>) {
    use SessionMode::*;

    match (mode, command) {
        (Calibrating, ModeCommand::StartCalibration) => ignored(mode, command),
        (_, ModeCommand::StartCalibration) => changed(mode, Calibrating),

        (Calibrating, ModeCommand::CancelCalibration) => changed(mode, Standby),
        (_, ModeCommand::CancelCalibration) => ignored(mode, command),

        (Calibrating, ModeCommand::StartTraining) => ignored(mode, command),
        (_, ModeCommand::StartTraining) => enter_training(mode, calibrated),

        (Calibrating, ModeCommand::Review) => ignored(mode, command),
        (_, ModeCommand::Review) => changed(mode, Review),

        (_, ModeCommand::Standby) => changed(mode, Standby),

        (Standby, ModeCommand::Cycle) => enter_training(mode, calibrated),
        (Training, ModeCommand::Cycle) => changed(mode, Review),
        (Review, ModeCommand::Cycle) => changed(mode, Standby),
        (Calibrating, ModeCommand::Cycle) => ignored(mode, command),
    }
}
