//! Iris size measurement from face-mesh landmarks.
//!
//! The face mesh places five landmarks on each iris: the center and four
//! boundary points. The apparent iris diameter in pixels is the mean of the
//! horizontal (medial/lateral) and vertical (superior/inferior) chords.

use crate::types::{FaceLandmarks, Laterality, Point, Resolution};

/// Landmark indices of one iris in the 478-point face mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrisLandmarkSet {
    pub center: usize,
    pub lateral: usize,
    pub superior: usize,
    pub medial: usize,
    pub inferior: usize,
}

impl IrisLandmarkSet {
    pub const LEFT: Self = Self {
        center: 473,
        lateral: 474,
        superior: 475,
        medial: 476,
        inferior: 477,
    };

    pub const RIGHT: Self = Self {
        center: 468,
        lateral: 469,
        superior: 470,
        medial: 471,
        inferior: 472,
    };

    pub const fn for_eye(laterality: Laterality) -> Self {
        match laterality {
            Laterality::Left => Self::LEFT,
            Laterality::Right => Self::RIGHT,
        }
    }

    /// Boundary points in drawing order (lateral, superior, medial, inferior).
    pub const fn contour(&self) -> [usize; 4] {
        [self.lateral, self.superior, self.medial, self.inferior]
    }
}

/// Minimum number of landmarks a face must carry for iris measurement.
pub const IRIS_MESH_LANDMARKS: usize = 478;

/// Apparent iris diameter in pixels.
///
/// Normalized deltas are scaled by the frame width and height before taking
/// each chord length, so non-square frames are handled correctly. Coincident
/// points yield `0.0`; callers decide what a degenerate size means.
pub fn iris_apparent_size_px(
    frame_width: u32,
    frame_height: u32,
    medial: Point,
    lateral: Point,
    superior: Point,
    inferior: Point,
) -> f64 {
    let horizontal = chord_px(frame_width, frame_height, medial, lateral);
    let vertical = chord_px(frame_width, frame_height, superior, inferior);
    (horizontal + vertical) / 2.0
}

fn chord_px(frame_width: u32, frame_height: u32, a: Point, b: Point) -> f64 {
    let delta = a - b;
    let dx = delta.x as f64 * frame_width as f64;
    let dy = delta.y as f64 * frame_height as f64;
    (dx * dx + dy * dy).sqrt()
}

/// Measure one eye's iris on a detected face.
///
/// Returns `None` when the face does not carry iris landmarks (e.g. a
/// 468-point mesh without refinement).
pub fn measure_iris(
    face: &FaceLandmarks,
    resolution: Resolution,
    laterality: Laterality,
) -> Option<f64> {
    let set = IrisLandmarkSet::for_eye(laterality);
    Some(iris_apparent_size_px(
        resolution.width,
        resolution.height,
        face.get(set.medial)?,
        face.get(set.lateral)?,
        face.get(set.superior)?,
        face.get(set.inferior)?,
    ))
}
