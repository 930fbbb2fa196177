// Motor driver seam
//
// The dispatcher computes per-zone intensities; a MotorDriver writes them to
// hardware (PWM channels on the real device). RecordingDriver keeps the
// timeline in memory for the CLI and tests.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use super::Zone;
use crate::error::HapticError;

/// Actuator output collaborator
pub trait MotorDriver: Send {
    /// Drive one zone at the given duty (0 = off)
    ///
    /// Returning `HapticError::MotorFault` marks the zone faulted in the
    /// dispatcher until it is cleared.
    fn set_intensity(&mut self, zone: Zone, intensity: u8) -> Result<(), HapticError>;

    /// Silence every zone
    fn stop_all(&mut self) {
        for zone in Zone::ALL {
            if let Err(err) = self.set_intensity(zone, 0) {
                log::warn!("[MotorDriver] Failed to stop {:?}: {}", zone, err);
            }
        }
    }
}

/// One intensity change written to a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverWrite {
    pub zone: Zone,
    pub intensity: u8,
}

/// In-memory driver that records intensity changes
///
/// Only changes are recorded, so a steady output produces one entry.
#[derive(Debug, Clone, Default)]
pub struct RecordingDriver {
    writes: Arc<Mutex<Vec<DriverWrite>>>,
    last: [u8; 3],
    failing: Arc<Mutex<Option<Zone>>>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver whose `zone` reports a fault on every non-zero write
    pub fn with_failing_zone(zone: Zone) -> Self {
        Self {
            failing: Arc::new(Mutex::new(Some(zone))),
            ..Self::default()
        }
    }

    /// Change the failing zone; clones share the setting
    pub fn set_failing_zone(&self, zone: Option<Zone>) {
        match self.failing.lock() {
            Ok(mut failing) => *failing = zone,
            Err(poisoned) => *poisoned.into_inner() = zone,
        }
    }

    fn failing_zone(&self) -> Option<Zone> {
        match self.failing.lock() {
            Ok(failing) => *failing,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Shared view of the recorded writes (survives moving the driver to a thread)
    pub fn handle(&self) -> Arc<Mutex<Vec<DriverWrite>>> {
        Arc::clone(&self.writes)
    }

    pub fn writes(&self) -> Vec<DriverWrite> {
        match self.writes.lock() {
            Ok(writes) => writes.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl MotorDriver for RecordingDriver {
    fn set_intensity(&mut self, zone: Zone, intensity: u8) -> Result<(), HapticError> {
        if intensity > 0 && self.failing_zone() == Some(zone) {
            return Err(HapticError::MotorFault { zone });
        }
        if self.last[zone.index()] == intensity {
            return Ok(());
        }
        self.last[zone.index()] = intensity;

        let write = DriverWrite { zone, intensity };
        match self.writes.lock() {
            Ok(mut writes) => writes.push(write),
            Err(poisoned) => poisoned.into_inner().push(write),
        }
        Ok(())
    }
}
