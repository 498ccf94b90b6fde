//! Session context: owns all mutable session state, applies user commands
//! and tracks the capture state machine.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::distance::DistanceUnit;
use crate::error::Result;
use crate::frame::{process_frame, FrameReport, SessionState};
use crate::types::{Detection, Laterality};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureState {
    #[default]
    Idle,
    /// Waiting for the capture device (camera permission, device open).
    Requesting,
    Running,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureState::Idle => f.write_str("idle"),
            CaptureState::Requesting => f.write_str("requesting"),
            CaptureState::Running => f.write_str("running"),
        }
    }
}

/// A user action from the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SwitchLaterality,
    RequestCalibration,
    SetReferenceDistance { text: String, unit: DistanceUnit },
    SetWarningThreshold { text: String, unit: DistanceUnit },
}

impl Command {
    pub fn reference_cm(text: impl Into<String>) -> Self {
        Command::SetReferenceDistance {
            text: text.into(),
            unit: DistanceUnit::Centimeters,
        }
    }

    pub fn warning_cm(text: impl Into<String>) -> Self {
        Command::SetWarningThreshold {
            text: text.into(),
            unit: DistanceUnit::Centimeters,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    state: SessionState,
    capture: CaptureState,
}

impl Session {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            state: SessionState::new(config),
            capture: CaptureState::Idle,
        }
    }

    /// Apply one user command.
    ///
    /// Rejected commands return the error to surface as a notice. A rejected
    /// calibration request leaves every piece of state as it was; a rejected
    /// distance edit keeps the previous value but flags the field invalid.
    pub fn handle(&mut self, command: Command) -> Result<()> {
        debug!(?command, "handling command");
        match command {
            Command::SwitchLaterality => {
                let eye = self.state.switch_laterality();
                info!(eye = %eye, "tracking eye switched, recalibration required");
            }
            Command::RequestCalibration => {
                self.state.request_calibration(self.is_running())?;
            }
            Command::SetReferenceDistance { text, unit } => {
                self.state.set_reference_distance(&text, unit)?;
            }
            Command::SetWarningThreshold { text, unit } => {
                let mm = self.state.set_warning_threshold(&text, unit).inspect_err(|e| {
                    warn!("{e}");
                })?;
                info!(warning_mm = mm, "warning distance updated");
            }
        }
        Ok(())
    }

    /// `Idle -> Requesting`. Returns `false` if capture was not idle.
    pub fn begin_capture(&mut self) -> bool {
        if self.capture != CaptureState::Idle {
            debug!(state = %self.capture, "capture already active");
            return false;
        }
        self.transition(CaptureState::Requesting);
        true
    }

    /// `Requesting -> Running`.
    pub fn capture_started(&mut self) {
        if self.capture != CaptureState::Requesting {
            warn!(state = %self.capture, "capture started without a pending request");
            return;
        }
        self.state.restart_frame_rate();
        self.transition(CaptureState::Running);
    }

    /// `Requesting -> Idle` after the device refused or was unavailable.
    pub fn capture_failed(&mut self) {
        if self.capture == CaptureState::Requesting {
            self.transition(CaptureState::Idle);
        }
    }

    /// Back to `Idle`. Returns `true` if capture was active.
    pub fn stop_capture(&mut self) -> bool {
        if self.capture == CaptureState::Idle {
            return false;
        }
        self.transition(CaptureState::Idle);
        true
    }

    fn transition(&mut self, next: CaptureState) {
        info!(from = %self.capture, to = %next, "capture state changed");
        self.capture = next;
    }

    /// Run the per-frame pipeline on one detection result.
    pub fn process_frame(&mut self, detection: &Detection, now: Duration) -> Option<FrameReport> {
        let (next, report) = process_frame(self.state.clone(), detection, now);
        self.state = next;
        report
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture
    }

    pub fn is_running(&self) -> bool {
        self.capture == CaptureState::Running
    }

    pub fn laterality(&self) -> Laterality {
        self.state.laterality()
    }

    pub fn focal_length_px(&self) -> Option<f64> {
        self.state.calibration().focal_length_px()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }
}
