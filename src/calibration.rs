//! One-shot focal length calibration.
//!
//! The user holds their eye at a known reference distance and requests a
//! calibration. The next processed frame's iris measurement is turned into a
//! focal length via the pinhole relation
//! `focal_px = iris_px * distance_mm / IRIS_REFERENCE_DIAMETER_MM`.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::distance::{DistanceSetting, DistanceUnit};
use crate::error::{Error, Result};

/// Average human iris diameter in millimetres.
pub const IRIS_REFERENCE_DIAMETER_MM: f64 = 11.7;

/// Iris sizes at or below this are treated as no measurement.
pub const MIN_IRIS_PX: f64 = 1e-6;

/// A completed calibration event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Calibration {
    pub focal_length_px: f64,
    /// Reference distance in effect when the calibration frame was taken.
    pub reference_distance_mm: f64,
    /// Iris size measured on the calibration frame.
    pub baseline_iris_px: f64,
}

/// Outcome of consuming a pending calibration request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationOutcome {
    /// Nothing was pending.
    Idle,
    Calibrated(Calibration),
    /// The request was consumed but produced no usable focal length.
    Failed(CalibrationFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationFailure {
    InvalidReferenceDistance,
    DegenerateMeasurement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationState {
    calibration: Option<Calibration>,
    reference: DistanceSetting,
    pending: bool,
}

impl CalibrationState {
    pub fn new(reference_distance_mm: f64) -> Self {
        Self {
            calibration: None,
            reference: DistanceSetting::new("reference distance", reference_distance_mm),
            pending: false,
        }
    }

    /// Arm calibration for the next processed frame.
    ///
    /// Fails with [`Error::NotRunning`] without touching any state when
    /// capture is not running. An accepted request discards the previous
    /// focal length.
    pub fn request(&mut self, capture_running: bool) -> Result<()> {
        if !capture_running {
            warn!("calibration requested while capture is not running");
            return Err(Error::NotRunning);
        }
        self.calibration = None;
        self.pending = true;
        debug!("calibration armed");
        Ok(())
    }

    pub fn set_reference_distance(&mut self, text: &str, unit: DistanceUnit) -> Result<f64> {
        let result = self.reference.set_from_text(text, unit);
        match &result {
            Ok(mm) => info!(reference_mm = mm, "reference distance updated"),
            Err(e) => warn!("{e}"),
        }
        result
    }

    /// Use `measured_iris_px` for calibration if a request is pending.
    ///
    /// Exactly one measurement is consumed per request: the pending flag is
    /// cleared whether or not a focal length could be derived.
    pub fn consume_pending(&mut self, measured_iris_px: f64) -> CalibrationOutcome {
        if !self.pending {
            return CalibrationOutcome::Idle;
        }
        self.pending = false;

        let Some(reference_distance_mm) = self.reference.effective_mm() else {
            warn!("calibration skipped: reference distance is invalid");
            return CalibrationOutcome::Failed(CalibrationFailure::InvalidReferenceDistance);
        };
        if !measured_iris_px.is_finite() || measured_iris_px <= MIN_IRIS_PX {
            warn!(measured_iris_px, "calibration skipped: degenerate iris measurement");
            return CalibrationOutcome::Failed(CalibrationFailure::DegenerateMeasurement);
        }

        let calibration = Calibration {
            focal_length_px: measured_iris_px * reference_distance_mm / IRIS_REFERENCE_DIAMETER_MM,
            reference_distance_mm,
            baseline_iris_px: measured_iris_px,
        };
        info!(
            focal_length_px = calibration.focal_length_px,
            reference_distance_mm,
            iris_px = measured_iris_px,
            "calibrated"
        );
        self.calibration = Some(calibration);
        CalibrationOutcome::Calibrated(calibration)
    }

    /// Drop the current focal length, forcing recalibration.
    pub fn invalidate(&mut self) {
        self.calibration = None;
    }

    pub fn focal_length_px(&self) -> Option<f64> {
        self.calibration.map(|c| c.focal_length_px)
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn reference(&self) -> &DistanceSetting {
        &self.reference
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_while_stopped_changes_nothing() {
        let mut state = CalibrationState::new(400.0);
        state.request(true).unwrap();
        state.consume_pending(30.0);
        let before = state.clone();

        assert!(matches!(state.request(false), Err(Error::NotRunning)));
        assert_eq!(state, before);
    }

    #[test]
    fn consumes_exactly_one_measurement_per_request() {
        let mut state = CalibrationState::new(400.0);
        state.request(true).unwrap();
        assert!(state.is_pending());

        let outcome = state.consume_pending(23.4);
        let CalibrationOutcome::Calibrated(cal) = outcome else {
            panic!("expected calibration, got {outcome:?}");
        };
        assert_eq!(cal.focal_length_px, 23.4 * 400.0 / IRIS_REFERENCE_DIAMETER_MM);
        assert!(!state.is_pending());

        assert_eq!(state.consume_pending(50.0), CalibrationOutcome::Idle);
        assert_eq!(state.focal_length_px(), Some(cal.focal_length_px));
    }

    #[test]
    fn invalid_reference_leaves_focal_length_unset() {
        let mut state = CalibrationState::new(400.0);
        assert!(state.set_reference_distance("", DistanceUnit::Centimeters).is_err());
        assert_eq!(state.reference().stored_mm(), 400.0);
        assert!(state.reference().is_invalid());

        state.request(true).unwrap();
        assert_eq!(
            state.consume_pending(30.0),
            CalibrationOutcome::Failed(CalibrationFailure::InvalidReferenceDistance)
        );
        assert_eq!(state.focal_length_px(), None);
        assert!(!state.is_pending());
    }

    #[test]
    fn degenerate_measurement_is_never_stored() {
        let mut state = CalibrationState::new(400.0);
        state.request(true).unwrap();
        assert_eq!(
            state.consume_pending(0.0),
            CalibrationOutcome::Failed(CalibrationFailure::DegenerateMeasurement)
        );
        assert_eq!(state.focal_length_px(), None);
    }

    #[test]
    fn baseline_is_snapshotted_at_calibration_time() {
        let mut state = CalibrationState::new(400.0);
        state.request(true).unwrap();
        state.consume_pending(25.0);
        state
            .set_reference_distance("80", DistanceUnit::Centimeters)
            .unwrap();

        let cal = state.calibration().unwrap();
        assert_eq!(cal.reference_distance_mm, 400.0);
        assert_eq!(cal.baseline_iris_px, 25.0);
    }

    #[test]
    fn accepted_request_discards_previous_focal_length() {
        let mut state = CalibrationState::new(400.0);
        state.request(true).unwrap();
        state.consume_pending(25.0);
        assert!(state.focal_length_px().is_some());

        state.request(true).unwrap();
        assert_eq!(state.focal_length_px(), None);
    }
}
