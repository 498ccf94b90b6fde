//! Live distance estimation and the proximity warning.

use serde::Serialize;

use crate::calibration::{IRIS_REFERENCE_DIAMETER_MM, MIN_IRIS_PX};

/// Why no distance could be produced for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unavailable {
    /// No focal length has been calibrated for the active eye.
    Uncalibrated,
    /// The iris measurement was zero, near zero, or not finite.
    DegenerateMeasurement,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DepthReading {
    Estimated { depth_mm: f64 },
    Unavailable { reason: Unavailable },
}

impl DepthReading {
    pub fn mm(&self) -> Option<f64> {
        match *self {
            DepthReading::Estimated { depth_mm } => Some(depth_mm),
            DepthReading::Unavailable { .. } => None,
        }
    }

    pub fn cm(&self) -> Option<f64> {
        self.mm().map(|mm| mm / 10.0)
    }
}

/// Proximity status shown by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Proximity {
    /// No estimate to compare; show nothing.
    Neutral,
    Ok,
    TooClose,
}

/// Pinhole-camera distance estimate:
/// `depth_mm = focal_px * IRIS_REFERENCE_DIAMETER_MM / iris_px`.
pub fn estimate_depth_mm(focal_length_px: Option<f64>, measured_iris_px: f64) -> DepthReading {
    let Some(focal_length_px) = focal_length_px else {
        return DepthReading::Unavailable {
            reason: Unavailable::Uncalibrated,
        };
    };
    if !measured_iris_px.is_finite() || measured_iris_px <= MIN_IRIS_PX {
        return DepthReading::Unavailable {
            reason: Unavailable::DegenerateMeasurement,
        };
    }

    let depth_mm = focal_length_px * IRIS_REFERENCE_DIAMETER_MM / measured_iris_px;
    if depth_mm.is_finite() {
        DepthReading::Estimated { depth_mm }
    } else {
        DepthReading::Unavailable {
            reason: Unavailable::DegenerateMeasurement,
        }
    }
}

/// Compare a reading against the warning threshold.
///
/// Without an estimate or a valid threshold the status is always neutral.
pub fn check_proximity(reading: DepthReading, warning_threshold_mm: Option<f64>) -> Proximity {
    match (reading.mm(), warning_threshold_mm) {
        (Some(depth), Some(threshold)) if depth < threshold => Proximity::TooClose,
        (Some(_), Some(_)) => Proximity::Ok,
        _ => Proximity::Neutral,
    }
}
