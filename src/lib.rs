//! # iris-depth
//!
//! Eye-to-camera distance estimation from face-mesh iris landmarks.
//!
//! This crate provides:
//! - **Iris Measurement**: apparent iris diameter in pixels from the five
//!   iris landmarks of a 478-point face mesh
//! - **Calibration**: one-shot focal length calibration at a known distance
//! - **Distance & Proximity**: live depth estimates and a too-close warning
//! - **Session Control**: capture state machine, eye selection, frame rate
//!
//! The human iris is close to 11.7 mm across for almost everyone, so under a
//! pinhole camera model its apparent size is inversely proportional to its
//! distance from the camera.
//!
//! ## Pipeline Overview
//!
//! 1. A capture device delivers a frame; an external detector returns face
//!    landmarks normalized to `[0, 1]`
//! 2. The active eye's iris is measured in pixels
//! 3. A pending calibration turns that measurement into a focal length:
//!    `focal_px = iris_px * reference_mm / 11.7`
//! 4. Depth is estimated: `depth_mm = focal_px * 11.7 / iris_px`
//! 5. Depth is compared against the warning threshold
//! 6. The frame rate monitor ticks, emitting an average every two seconds
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use iris_depth::geometry::{IrisLandmarkSet, IRIS_MESH_LANDMARKS};
//! use iris_depth::{Command, Detection, FaceLandmarks, Point, Resolution, Session, SessionConfig};
//!
//! // A face whose left iris spans 30 px on a 1000x1000 frame
//! let mut points = vec![Point::new(0.5, 0.5); IRIS_MESH_LANDMARKS];
//! let iris = IrisLandmarkSet::LEFT;
//! points[iris.lateral] = Point::new(0.515, 0.5);
//! points[iris.medial] = Point::new(0.485, 0.5);
//! points[iris.superior] = Point::new(0.5, 0.485);
//! points[iris.inferior] = Point::new(0.5, 0.515);
//! let detection = Detection::new(Resolution::new(1000, 1000), vec![FaceLandmarks::new(points)]);
//!
//! let mut session = Session::new(&SessionConfig::default());
//! session.begin_capture();
//! session.capture_started();
//!
//! // Eye held at the default 40 cm reference distance
//! session.handle(Command::RequestCalibration)?;
//! let report = session.process_frame(&detection, Duration::ZERO).unwrap();
//! assert!(report.calibrated);
//! println!("Distance: {:.1} cm", report.depth.cm().unwrap());
//! # Ok::<(), iris_depth::Error>(())
//! ```
//!
//! ## Custom Capture Sources
//!
//! Implement [`CaptureDevice`] and [`LandmarkDetector`] for your camera and
//! face-mesh model, then drive them with a [`FrameDriver`]:
//!
//! ```rust
//! use std::time::Duration;
//! use iris_depth::{CaptureDevice, FaceLandmarks, LandmarkDetector, Resolution, Result, VideoFrame};
//!
//! struct MyFrame { /* ... */ }
//!
//! impl VideoFrame for MyFrame {
//!     fn resolution(&self) -> Resolution { Resolution::new(1280, 720) }
//!     fn timestamp(&self) -> Duration { Duration::ZERO }
//! }
//!
//! struct MyCamera;
//!
//! impl CaptureDevice for MyCamera {
//!     type Frame = MyFrame;
//!     fn open(&mut self, _preferred: Resolution) -> Result<()> { Ok(()) }
//!     fn read_frame(&mut self) -> Result<Option<MyFrame>> { Ok(None) }
//! }
//!
//! struct MyMesh;
//!
//! impl LandmarkDetector<MyFrame> for MyMesh {
//!     fn detect(&mut self, _frame: &MyFrame) -> Result<Vec<FaceLandmarks>> {
//!         Ok(Vec::new())
//!     }
//! }
//! ```

pub mod calibration;
pub mod config;
pub mod depth;
pub mod distance;
pub mod driver;
mod error;
pub mod fps;
pub mod frame;
pub mod geometry;
pub mod logging;
pub mod overlay;
pub mod recording;
pub mod session;
mod types;

pub use calibration::{Calibration, CalibrationState, IRIS_REFERENCE_DIAMETER_MM};
pub use config::{AppConfig, CaptureConfig, SessionConfig};
pub use depth::{DepthReading, Proximity};
pub use distance::DistanceUnit;
pub use driver::{
    CaptureDevice, FrameDriver, LandmarkDetector, PresentationSink, RunSummary, Step, VideoFrame,
};
pub use error::{Error, Result};
pub use frame::{process_frame, FrameReport, SessionState};
pub use logging::{init_tracing, LogConfig};
pub use recording::{RecordedFrame, RecordedLandmarks, Recording};
pub use session::{CaptureState, Command, Session};
pub use types::{Detection, FaceLandmarks, Laterality, Point, Resolution};
