//! The per-frame pipeline as a pure state transition.
//!
//! [`process_frame`] takes the session state, one frame's detection result
//! and the frame timestamp, and returns the next state together with what
//! the presentation layer should show. Steps always run in the same order:
//! measure, consume a pending calibration, estimate depth, tick the frame
//! rate monitor. A calibration therefore uses the same frame's measurement
//! as the first depth reading derived from it.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, trace};

use crate::calibration::{CalibrationFailure, CalibrationOutcome, CalibrationState};
use crate::config::SessionConfig;
use crate::depth::{check_proximity, estimate_depth_mm, DepthReading, Proximity};
use crate::distance::{DistanceSetting, DistanceUnit};
use crate::error::Result;
use crate::fps::FrameRateMonitor;
use crate::geometry::measure_iris;
use crate::types::{Detection, Laterality, Resolution};

/// Everything that persists between frames of one capture session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    laterality: Laterality,
    calibration: CalibrationState,
    warning: DistanceSetting,
    fps: FrameRateMonitor,
}

impl SessionState {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            laterality: config.laterality,
            calibration: CalibrationState::new(config.reference_distance_mm()),
            warning: DistanceSetting::new("warning distance", config.warning_distance_mm()),
            fps: FrameRateMonitor::new(config.fps_window()),
        }
    }

    /// Toggle the tracked eye. Always invalidates the focal length.
    pub fn switch_laterality(&mut self) -> Laterality {
        self.laterality = self.laterality.toggled();
        self.calibration.invalidate();
        self.laterality
    }

    pub fn request_calibration(&mut self, capture_running: bool) -> Result<()> {
        self.calibration.request(capture_running)
    }

    pub fn set_reference_distance(&mut self, text: &str, unit: DistanceUnit) -> Result<f64> {
        self.calibration.set_reference_distance(text, unit)
    }

    pub fn set_warning_threshold(&mut self, text: &str, unit: DistanceUnit) -> Result<f64> {
        self.warning.set_from_text(text, unit)
    }

    pub(crate) fn restart_frame_rate(&mut self) {
        self.fps.reset();
    }

    pub fn laterality(&self) -> Laterality {
        self.laterality
    }

    pub fn calibration(&self) -> &CalibrationState {
        &self.calibration
    }

    pub fn warning(&self) -> &DistanceSetting {
        &self.warning
    }

    pub fn frame_rate(&self) -> &FrameRateMonitor {
        &self.fps
    }
}

/// Per-frame output for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    pub timestamp_ms: f64,
    pub resolution: Resolution,
    pub laterality: Laterality,
    /// Apparent size of the active eye's iris.
    pub iris_px: f64,
    /// Apparent size of the other eye's iris, when measurable.
    pub other_iris_px: Option<f64>,
    pub focal_length_px: Option<f64>,
    pub depth: DepthReading,
    pub proximity: Proximity,
    /// Iris size measured when the current calibration was taken.
    pub calibration_baseline_px: Option<f64>,
    /// Set on the frame that completed a calibration.
    pub calibrated: bool,
    pub calibration_failure: Option<CalibrationFailure>,
    /// Emitted once per frame-rate window.
    pub average_fps: Option<f64>,
}

impl FrameReport {
    pub fn too_close(&self) -> bool {
        self.proximity == Proximity::TooClose
    }
}

/// Advance the session by one frame.
///
/// Frames without a face, or whose face lacks iris landmarks, are skipped:
/// the state comes back unchanged and there is no report.
pub fn process_frame(
    mut state: SessionState,
    detection: &Detection,
    now: Duration,
) -> (SessionState, Option<FrameReport>) {
    let Some(face) = detection.primary_face() else {
        trace!("no face detected");
        return (state, None);
    };
    let resolution = detection.resolution;
    let Some(iris_px) = measure_iris(face, resolution, state.laterality) else {
        debug!(
            landmarks = face.num_landmarks(),
            "face has no iris landmarks, skipping frame"
        );
        return (state, None);
    };
    let other_iris_px = measure_iris(face, resolution, state.laterality.toggled());

    let (calibrated, calibration_failure) = match state.calibration.consume_pending(iris_px) {
        CalibrationOutcome::Idle => (false, None),
        CalibrationOutcome::Calibrated(_) => (true, None),
        CalibrationOutcome::Failed(reason) => (false, Some(reason)),
    };

    let focal_length_px = state.calibration.focal_length_px();
    let depth = estimate_depth_mm(focal_length_px, iris_px);
    let proximity = check_proximity(depth, state.warning.effective_mm());
    let average_fps = state.fps.tick(now);

    trace!(iris_px, ?depth, ?proximity, "frame processed");

    let report = FrameReport {
        timestamp_ms: now.as_secs_f64() * 1000.0,
        resolution,
        laterality: state.laterality,
        iris_px,
        other_iris_px,
        focal_length_px,
        depth,
        proximity,
        calibration_baseline_px: state.calibration.calibration().map(|c| c.baseline_iris_px),
        calibrated,
        calibration_failure,
        average_fps,
    };
    (state, Some(report))
}
