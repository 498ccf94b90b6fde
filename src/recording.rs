//! Recorded landmark streams.
//!
//! A recording stands in for the webcam and detector pair: each line of a
//! JSON Lines file holds one frame's timestamp, resolution and detected
//! faces. Files ending in `.bz2` are read and written bzip2-compressed.
//!
//! ```text
//! {"timestamp_ms": 0.0, "width": 1280, "height": 720, "faces": [[{"x": 0.41, "y": 0.52}, ...]]}
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use bzip2::Compression;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::driver::{CaptureDevice, LandmarkDetector, VideoFrame};
use crate::error::{Error, Result};
use crate::types::{FaceLandmarks, Resolution};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub timestamp_ms: f64,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub faces: Vec<FaceLandmarks>,
}

impl VideoFrame for RecordedFrame {
    fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    fn timestamp(&self) -> Duration {
        timestamp_duration(self.timestamp_ms).unwrap_or(if self.timestamp_ms > 0.0 {
            Duration::MAX
        } else {
            Duration::ZERO
        })
    }
}

/// Normalized landmarks outside this range are rejected on load.
pub const LANDMARK_RANGE: std::ops::RangeInclusive<f32> = -1.0..=2.0;

fn timestamp_duration(timestamp_ms: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(timestamp_ms / 1000.0).ok()
}

/// A replayable landmark stream.
#[derive(Debug, Clone, Default)]
pub struct Recording {
    frames: Vec<RecordedFrame>,
    cursor: usize,
    open: bool,
}

fn is_bz2(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "bz2")
}

impl Recording {
    pub fn new(frames: Vec<RecordedFrame>) -> Self {
        Self {
            frames,
            cursor: 0,
            open: false,
        }
    }

    /// Load a recording, decompressing `.bz2` files.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let recording = if is_bz2(path) {
            Self::from_reader(BufReader::new(BzDecoder::new(file)))?
        } else {
            Self::from_reader(BufReader::new(file))?
        };
        info!(
            frames = recording.len(),
            "loaded recording {}",
            path.display()
        );
        Ok(recording)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut frames: Vec<RecordedFrame> = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let frame: RecordedFrame =
                serde_json::from_str(trimmed).map_err(|e| Error::InvalidRecording {
                    line: line_no,
                    reason: e.to_string(),
                })?;
            validate_frame(&frame, frames.last(), line_no)?;
            frames.push(frame);
        }

        debug!(frames = frames.len(), "parsed recording");
        Ok(Self::new(frames))
    }

    /// Write as JSON Lines, compressing when the path ends in `.bz2`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        if is_bz2(path) {
            let mut encoder = BzEncoder::new(BufWriter::new(file), Compression::default());
            self.write_to(&mut encoder)?;
            encoder.finish()?.flush()?;
        } else {
            let mut writer = BufWriter::new(file);
            self.write_to(&mut writer)?;
            writer.flush()?;
        }
        Ok(())
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        for frame in &self.frames {
            serde_json::to_writer(&mut *writer, frame)?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }

    pub fn frames(&self) -> &[RecordedFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames not yet delivered.
    pub fn remaining(&self) -> usize {
        self.frames.len() - self.cursor
    }
}

fn validate_frame(frame: &RecordedFrame, previous: Option<&RecordedFrame>, line: usize) -> Result<()> {
    let invalid = |reason: String| Error::InvalidRecording { line, reason };

    if !frame.timestamp_ms.is_finite() || frame.timestamp_ms < 0.0 {
        return Err(invalid(format!(
            "timestamp_ms must be a non-negative number, got {}",
            frame.timestamp_ms
        )));
    }
    if timestamp_duration(frame.timestamp_ms).is_none() {
        return Err(invalid(format!(
            "timestamp_ms {} is out of range",
            frame.timestamp_ms
        )));
    }
    if frame.width == 0 || frame.height == 0 {
        return Err(invalid(format!(
            "frame resolution {}x{} is empty",
            frame.width, frame.height
        )));
    }
    for (face_idx, face) in frame.faces.iter().enumerate() {
        let bad = face
            .points
            .iter()
            .position(|p| !LANDMARK_RANGE.contains(&p.x) || !LANDMARK_RANGE.contains(&p.y));
        if let Some(point_idx) = bad {
            let p = face.points[point_idx];
            return Err(invalid(format!(
                "face {face_idx} landmark {point_idx} at ({}, {}) is not a normalized coordinate",
                p.x, p.y
            )));
        }
    }
    if let Some(prev) = previous {
        if frame.timestamp_ms < prev.timestamp_ms {
            return Err(invalid(format!(
                "timestamp {} ms precedes previous frame at {} ms",
                frame.timestamp_ms, prev.timestamp_ms
            )));
        }
    }
    Ok(())
}

impl CaptureDevice for Recording {
    type Frame = RecordedFrame;

    fn open(&mut self, preferred: Resolution) -> Result<()> {
        if self.frames.is_empty() {
            return Err(Error::CaptureUnavailable("recording has no frames".to_string()));
        }
        debug!(%preferred, "replaying recording, preferred resolution ignored");
        self.open = true;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<RecordedFrame>> {
        if !self.open {
            return Err(Error::CaptureUnavailable("recording is not open".to_string()));
        }
        let frame = self.frames.get(self.cursor).cloned();
        if frame.is_some() {
            self.cursor += 1;
        }
        Ok(frame)
    }

    fn close(&mut self) {
        self.open = false;
    }
}

/// Detector that returns the faces stored with each recorded frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordedLandmarks;

impl LandmarkDetector<RecordedFrame> for RecordedLandmarks {
    fn detect(&mut self, frame: &RecordedFrame) -> Result<Vec<FaceLandmarks>> {
        Ok(frame.faces.clone())
    }
}
