use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A normalized landmark coordinate.
///
/// `x` and `y` are in `[0,1]` relative to the frame width and height. `z` is
/// the detector's relative depth and is carried along but never used for
/// measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub const fn with_depth(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Convert to pixel coordinates within a frame of the given resolution.
    pub fn to_pixels(&self, resolution: Resolution) -> (f32, f32) {
        (
            self.x * resolution.width as f32,
            self.y * resolution.height as f32,
        )
    }
}

impl std::ops::Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

/// Pixel dimensions of a video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// All landmarks the detector produced for one face in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceLandmarks {
    pub points: Vec<Point>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn num_landmarks(&self) -> usize {
        self.points.len()
    }

    pub fn get(&self, idx: usize) -> Option<Point> {
        self.points.get(idx).copied()
    }
}

impl std::ops::Index<usize> for FaceLandmarks {
    type Output = Point;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.points[idx]
    }
}

/// One frame's worth of detector output.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub resolution: Resolution,
    pub faces: Vec<FaceLandmarks>,
}

impl Detection {
    pub fn new(resolution: Resolution, faces: Vec<FaceLandmarks>) -> Self {
        Self { resolution, faces }
    }

    /// The face used for measurement. Only one face is ever tracked.
    pub fn primary_face(&self) -> Option<&FaceLandmarks> {
        self.faces.first()
    }
}

/// Which eye is the active measurement reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Laterality {
    /// Oculus sinister.
    #[default]
    #[serde(alias = "os")]
    Left,
    /// Oculus dexter.
    #[serde(alias = "od")]
    Right,
}

impl Laterality {
    pub fn toggled(self) -> Self {
        match self {
            Laterality::Left => Laterality::Right,
            Laterality::Right => Laterality::Left,
        }
    }

    /// Clinical abbreviation ("OS" / "OD").
    pub fn abbreviation(self) -> &'static str {
        match self {
            Laterality::Left => "OS",
            Laterality::Right => "OD",
        }
    }
}

impl fmt::Display for Laterality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Laterality::Left => f.write_str("left"),
            Laterality::Right => f.write_str("right"),
        }
    }
}

impl FromStr for Laterality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "l" | "os" => Ok(Laterality::Left),
            "right" | "r" | "od" => Ok(Laterality::Right),
            other => Err(format!("unknown eye {other:?}, expected left or right")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn laterality_toggles_back_and_forth() {
        assert_eq!(Laterality::Left.toggled(), Laterality::Right);
        assert_eq!(Laterality::Right.toggled(), Laterality::Left);
        assert_eq!(Laterality::default(), Laterality::Left);
    }

    #[test]
    fn laterality_parses_clinical_names() {
        assert_eq!("OS".parse::<Laterality>().unwrap(), Laterality::Left);
        assert_eq!(" od ".parse::<Laterality>().unwrap(), Laterality::Right);
        assert_eq!("right".parse::<Laterality>().unwrap(), Laterality::Right);
        assert!("both".parse::<Laterality>().is_err());
    }

    #[test]
    fn point_to_pixels_scales_each_axis() {
        let p = Point::new(0.5, 0.25);
        let (x, y) = p.to_pixels(Resolution::new(640, 480));
        assert_eq!(x, 320.0);
        assert_eq!(y, 120.0);
    }

    #[test]
    fn landmarks_deserialize_with_optional_depth() {
        let face: FaceLandmarks =
            serde_json::from_str(r#"[{"x":0.1,"y":0.2},{"x":0.3,"y":0.4,"z":-0.01}]"#).unwrap();
        assert_eq!(face.num_landmarks(), 2);
        assert_eq!(face[0].z, 0.0);
        assert!((face[1].z + 0.01).abs() < 1e-6);
        assert!(face.get(2).is_none());
    }
}
