// HapticDispatcher - per-zone motor scheduling
//
// Each zone holds at most one active command and one queued command:
// - idle zone: the command starts immediately
// - busy zone, priority >= active: the command preempts and restarts the clock
// - busy zone, lower priority: queued if the slot is free, otherwise dropped
// - faulted zone: rejected until clear_fault()
// - disabled dispatcher: every command is discarded and all zones read 0
//
// Output intensities are derived from (now - start) only, so the dispatcher
// can be ticked at any rate without drifting.

use serde::{Deserialize, Serialize};

use super::pattern::alternating_first_half;
use super::{commands_for, HapticCommand, HapticPattern, HapticTarget, MotorDriver, Zone};
use crate::analysis::ErrorVector;
use crate::config::HapticConfig;
use crate::error::{log_haptic_error, HapticError};

/// What happened to a command on one of its target zones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Zone was idle
    Started,
    /// Replaced an active command of lower or equal priority
    Preempted,
    /// Waiting for the active command to finish
    Queued,
    /// Queue slot already taken by an earlier lower-priority command
    Dropped,
}

/// Intensity for one zone on one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneOutput {
    pub zone: Zone,
    pub intensity: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ActiveCommand {
    command: HapticCommand,
    started_ms: u64,
}

#[derive(Debug, Clone, Default)]
struct MotorState {
    active: Option<ActiveCommand>,
    queued: Option<HapticCommand>,
    faulted: bool,
}

/// Schedules haptic commands across the three arm zones
#[derive(Debug, Clone)]
pub struct HapticDispatcher {
    config: HapticConfig,
    motors: [MotorState; 3],
    enabled: bool,
}

impl HapticDispatcher {
    pub fn new(config: HapticConfig) -> Self {
        Self {
            enabled: config.enabled,
            config,
            motors: Default::default(),
        }
    }

    /// Turn the whole haptic system on or off
    ///
    /// Disabling idles every zone; fault flags are kept.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        log::info!(
            "[HapticDispatcher] Haptics {}",
            if enabled { "enabled" } else { "disabled" }
        );
        if !enabled {
            self.stop_all();
        }
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Build the feedback-table commands for a scored shot and submit them
    ///
    /// # Returns
    /// The commands started, preempting or queued on at least one zone, in
    /// submission order
    pub fn dispatch(&mut self, errors: &ErrorVector, now_ms: u64) -> Vec<HapticCommand> {
        commands_for(errors, now_ms)
            .into_iter()
            .filter(|command| match self.submit(*command, now_ms) {
                Ok(outcomes) => outcomes
                    .iter()
                    .any(|(_, outcome)| *outcome != SubmitOutcome::Dropped),
                Err(err) => {
                    log_haptic_error(&err, "dispatch");
                    false
                }
            })
            .collect()
    }

    /// Schedule a command on every zone of its target
    ///
    /// A command addressed to a faulted zone is rejected as a whole. While
    /// disabled, every target zone reports `Dropped`.
    pub fn submit(
        &mut self,
        command: HapticCommand,
        now_ms: u64,
    ) -> Result<Vec<(Zone, SubmitOutcome)>, HapticError> {
        if command.duration_ms == 0 {
            return Err(HapticError::InvalidCommand {
                reason: "duration must be greater than zero".to_string(),
            });
        }
        if !self.enabled {
            log::debug!(
                "[HapticDispatcher] Haptics disabled, discarding {:?}",
                command.pattern
            );
            return Ok(command
                .target
                .zones()
                .into_iter()
                .map(|zone| (zone, SubmitOutcome::Dropped))
                .collect());
        }
        let zones = command.target.zones();
        if let Some(zone) = zones.iter().find(|zone| self.motors[zone.index()].faulted) {
            return Err(HapticError::MotorFault { zone: *zone });
        }

        self.update(now_ms);

        let outcomes = zones
            .into_iter()
            .map(|zone| {
                let motor = &mut self.motors[zone.index()];
                let outcome = match motor.active {
                    None => {
                        motor.active = Some(ActiveCommand {
                            command,
                            started_ms: now_ms,
                        });
                        SubmitOutcome::Started
                    }
                    Some(active) if command.priority >= active.command.priority => {
                        motor.active = Some(ActiveCommand {
                            command,
                            started_ms: now_ms,
                        });
                        SubmitOutcome::Preempted
                    }
                    Some(_) if motor.queued.is_none() => {
                        motor.queued = Some(command);
                        SubmitOutcome::Queued
                    }
                    Some(_) => SubmitOutcome::Dropped,
                };
                log::debug!(
                    "[HapticDispatcher] {:?} {:?} on {:?} (priority {})",
                    outcome,
                    command.pattern,
                    zone,
                    command.priority
                );
                (zone, outcome)
            })
            .collect();
        Ok(outcomes)
    }

    /// Retire finished commands and promote queued ones
    pub fn update(&mut self, now_ms: u64) {
        for motor in self.motors.iter_mut() {
            let expired = motor.active.map_or(false, |active| {
                now_ms.saturating_sub(active.started_ms) >= active.command.duration_ms
            });
            if expired {
                motor.active = motor.queued.take().map(|command| ActiveCommand {
                    command,
                    started_ms: now_ms,
                });
            }
        }
    }

    /// Advance to `now_ms` and compute every zone's intensity
    pub fn tick(&mut self, now_ms: u64) -> [ZoneOutput; 3] {
        self.update(now_ms);
        Zone::ALL.map(|zone| ZoneOutput {
            zone,
            intensity: self.intensity(zone, now_ms),
        })
    }

    fn intensity(&self, zone: Zone, now_ms: u64) -> u8 {
        let motor = &self.motors[zone.index()];
        if motor.faulted || !self.enabled {
            return 0;
        }
        let Some(active) = motor.active else {
            return 0;
        };

        let command = active.command;
        let elapsed = now_ms.saturating_sub(active.started_ms);
        let level = command.pattern.intensity_at(
            elapsed,
            command.duration_ms,
            command.intensity,
            &self.config,
        );

        if command.pattern != HapticPattern::Alternating {
            return level;
        }
        let first_half = alternating_first_half(elapsed, self.config.alternating_period_ms);
        let lit = match command.target {
            HapticTarget::Alternating(first, second) if first != second => {
                if first_half {
                    zone == first
                } else {
                    zone == second
                }
            }
            _ => first_half,
        };
        if lit {
            level
        } else {
            0
        }
    }

    /// Tick and push the intensities to a driver
    ///
    /// A driver-reported fault marks the zone faulted.
    pub fn drive(&mut self, now_ms: u64, driver: &mut dyn MotorDriver) -> [ZoneOutput; 3] {
        let outputs = self.tick(now_ms);
        for output in outputs {
            match driver.set_intensity(output.zone, output.intensity) {
                Ok(()) => {}
                Err(HapticError::MotorFault { zone }) => self.report_fault(zone),
                Err(err) => log_haptic_error(&err, "drive"),
            }
        }
        outputs
    }

    /// Force a zone idle and reject commands for it until cleared
    pub fn report_fault(&mut self, zone: Zone) {
        let motor = &mut self.motors[zone.index()];
        if !motor.faulted {
            log_haptic_error(&HapticError::MotorFault { zone }, "report_fault");
        }
        motor.active = None;
        motor.queued = None;
        motor.faulted = true;
    }

    pub fn clear_fault(&mut self, zone: Zone) {
        let motor = &mut self.motors[zone.index()];
        if motor.faulted {
            log::info!("[HapticDispatcher] Fault cleared on {:?}", zone);
        }
        motor.faulted = false;
    }

    pub fn is_faulted(&self, zone: Zone) -> bool {
        self.motors[zone.index()].faulted
    }

    /// Idle every zone and drop queued commands (fault flags are kept)
    pub fn stop_all(&mut self) {
        for motor in self.motors.iter_mut() {
            motor.active = None;
            motor.queued = None;
        }
    }

    pub fn active_command(&self, zone: Zone) -> Option<&HapticCommand> {
        self.motors[zone.index()]
            .active
            .as_ref()
            .map(|active| &active.command)
    }

    pub fn queued_command(&self, zone: Zone) -> Option<&HapticCommand> {
        self.motors[zone.index()].queued.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        self.motors.iter().all(|motor| motor.active.is_none())
    }
}
