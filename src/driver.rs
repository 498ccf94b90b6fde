//! Frame scheduling.
//!
//! The capture device, the landmark detector and the presentation layer are
//! external collaborators behind the traits below. [`FrameDriver`] runs one
//! frame per [`FrameDriver::step`]; callers invoke it from whatever periodic
//! driver they have (a display refresh, a replay loop). A step always
//! finishes before the next one starts, and disabling capture only prevents
//! further steps.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::frame::FrameReport;
use crate::session::{Command, Session};
use crate::types::{Detection, FaceLandmarks, Laterality, Resolution};

/// A frame produced by a capture device.
pub trait VideoFrame {
    fn resolution(&self) -> Resolution;
    /// Monotonic capture time.
    fn timestamp(&self) -> Duration;
}

/// A live frame source such as a webcam.
pub trait CaptureDevice {
    type Frame: VideoFrame;

    /// Acquire the device. `preferred` is a hint; the device may deliver
    /// another resolution. Permission or availability failures are reported
    /// as [`Error::CaptureUnavailable`].
    fn open(&mut self, preferred: Resolution) -> Result<()>;

    /// Next frame, or `None` when the stream has ended.
    fn read_frame(&mut self) -> Result<Option<Self::Frame>>;

    fn close(&mut self) {}
}

/// Face landmark detection on captured frames.
pub trait LandmarkDetector<F: VideoFrame> {
    /// Zero or more faces, each an ordered landmark sequence.
    fn detect(&mut self, frame: &F) -> Result<Vec<FaceLandmarks>>;
}

/// Receives everything the presentation layer shows.
pub trait PresentationSink {
    fn frame(&mut self, report: &FrameReport);

    /// Landmarks of the tracked face, for mesh rendering.
    fn landmarks(&mut self, _face: &FaceLandmarks, _resolution: Resolution, _active: Laterality) {}

    /// A user-facing, non-fatal notice.
    fn notice(&mut self, _error: &Error) {}
}

/// Result of one [`FrameDriver::step`].
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Processed(FrameReport),
    /// A frame was read but had no usable face.
    Skipped,
    /// Capture is not running; nothing was read.
    Stopped,
    EndOfStream,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub frames_read: usize,
    pub frames_processed: usize,
    pub frames_skipped: usize,
    pub too_close_frames: usize,
}

pub struct FrameDriver<C, D> {
    session: Session,
    capture: C,
    detector: D,
    preferred: Resolution,
    scheduled: VecDeque<(Duration, Command)>,
}

impl<C, D> FrameDriver<C, D>
where
    C: CaptureDevice,
    D: LandmarkDetector<C::Frame>,
{
    pub fn new(session: Session, capture: C, detector: D, preferred: Resolution) -> Self {
        Self {
            session,
            capture,
            detector,
            preferred,
            scheduled: VecDeque::new(),
        }
    }

    /// Request the capture device and start running.
    ///
    /// On failure the session returns to idle and the error is returned for
    /// display; nothing else changes.
    pub fn enable_capture(&mut self) -> Result<()> {
        if !self.session.begin_capture() {
            return Ok(());
        }
        match self.capture.open(self.preferred) {
            Ok(()) => {
                self.session.capture_started();
                Ok(())
            }
            Err(e) => {
                warn!("capture could not start: {e}");
                self.session.capture_failed();
                Err(e)
            }
        }
    }

    pub fn disable_capture(&mut self) {
        if self.session.stop_capture() {
            self.capture.close();
        }
    }

    /// Enable when idle, disable otherwise.
    pub fn toggle_capture(&mut self) -> Result<()> {
        if self.session.is_running() {
            self.disable_capture();
            Ok(())
        } else {
            self.enable_capture()
        }
    }

    /// Apply a command immediately.
    pub fn submit(&mut self, command: Command) -> Result<()> {
        self.session.handle(command)
    }

    /// Queue a command to be applied before the first frame captured at or
    /// after `at`.
    pub fn schedule(&mut self, at: Duration, command: Command) {
        let idx = self.scheduled.partition_point(|(t, _)| *t <= at);
        self.scheduled.insert(idx, (at, command));
    }

    /// Process one frame.
    pub fn step<S: PresentationSink>(&mut self, sink: &mut S) -> Result<Step> {
        if !self.session.is_running() {
            return Ok(Step::Stopped);
        }
        let Some(frame) = self.capture.read_frame()? else {
            info!("capture stream ended");
            self.disable_capture();
            return Ok(Step::EndOfStream);
        };
        let now = frame.timestamp();
        self.apply_due(now, sink);

        let faces = self.detector.detect(&frame)?;
        let detection = Detection::new(frame.resolution(), faces);
        if let Some(face) = detection.primary_face() {
            sink.landmarks(face, detection.resolution, self.session.laterality());
        }

        match self.session.process_frame(&detection, now) {
            Some(report) => {
                sink.frame(&report);
                Ok(Step::Processed(report))
            }
            None => Ok(Step::Skipped),
        }
    }

    /// Step until capture stops or the stream ends.
    pub fn run<S: PresentationSink>(&mut self, sink: &mut S) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        loop {
            match self.step(sink)? {
                Step::Processed(report) => {
                    summary.frames_read += 1;
                    summary.frames_processed += 1;
                    if report.too_close() {
                        summary.too_close_frames += 1;
                    }
                }
                Step::Skipped => {
                    summary.frames_read += 1;
                    summary.frames_skipped += 1;
                }
                Step::Stopped | Step::EndOfStream => break,
            }
        }
        debug!(?summary, "run finished");
        Ok(summary)
    }

    fn apply_due<S: PresentationSink>(&mut self, now: Duration, sink: &mut S) {
        while self.scheduled.front().is_some_and(|(at, _)| *at <= now) {
            let Some((_, command)) = self.scheduled.pop_front() else {
                break;
            };
            if let Err(e) = self.session.handle(command) {
                sink.notice(&e);
            }
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn capture(&self) -> &C {
        &self.capture
    }

    pub fn pending_commands(&self) -> usize {
        self.scheduled.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::types::Point;

    struct Frame(u64);

    impl VideoFrame for Frame {
        fn resolution(&self) -> Resolution {
            Resolution::new(640, 480)
        }

        fn timestamp(&self) -> Duration {
            Duration::from_millis(self.0)
        }
    }

    struct Ticker {
        next: u64,
        frames: u64,
        refuse: bool,
        closed: bool,
    }

    impl Ticker {
        fn new(frames: u64) -> Self {
            Self {
                next: 0,
                frames,
                refuse: false,
                closed: false,
            }
        }
    }

    impl CaptureDevice for Ticker {
        type Frame = Frame;

        fn open(&mut self, _preferred: Resolution) -> Result<()> {
            if self.refuse {
                return Err(Error::CaptureUnavailable("permission denied".into()));
            }
            self.closed = false;
            Ok(())
        }

        fn read_frame(&mut self) -> Result<Option<Frame>> {
            if self.next >= self.frames {
                return Ok(None);
            }
            self.next += 1;
            Ok(Some(Frame((self.next - 1) * 100)))
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    /// Detects a face on every other frame.
    struct Alternating;

    impl LandmarkDetector<Frame> for Alternating {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceLandmarks>> {
            if (frame.0 / 100) % 2 == 1 {
                return Ok(vec![]);
            }
            let mut points = vec![Point::new(0.5, 0.5); 478];
            for (i, p) in points.iter_mut().enumerate().skip(468) {
                *p = Point::new(0.4 + (i as f32) * 1e-3, 0.5 + (i as f32 % 3.0) * 1e-2);
            }
            Ok(vec![FaceLandmarks::new(points)])
        }
    }

    #[derive(Default)]
    struct Collect {
        reports: Vec<FrameReport>,
        notices: Vec<String>,
        meshes: usize,
    }

    impl PresentationSink for Collect {
        fn frame(&mut self, report: &FrameReport) {
            self.reports.push(report.clone());
        }

        fn landmarks(&mut self, _face: &FaceLandmarks, _res: Resolution, _active: Laterality) {
            self.meshes += 1;
        }

        fn notice(&mut self, error: &Error) {
            self.notices.push(error.to_string());
        }
    }

    fn driver(frames: u64) -> FrameDriver<Ticker, Alternating> {
        FrameDriver::new(
            Session::new(&SessionConfig::default()),
            Ticker::new(frames),
            Alternating,
            Resolution::new(1280, 720),
        )
    }

    #[test]
    fn idle_driver_reads_nothing() {
        let mut d = driver(4);
        let mut sink = Collect::default();
        assert_eq!(d.step(&mut sink).unwrap(), Step::Stopped);
        assert_eq!(d.capture().next, 0);
    }

    #[test]
    fn refused_capture_returns_to_idle() {
        let mut d = driver(4);
        d.capture.refuse = true;
        assert!(matches!(d.enable_capture(), Err(Error::CaptureUnavailable(_))));
        assert!(!d.session().is_running());
    }

    #[test]
    fn run_skips_frames_without_faces() {
        let mut d = driver(5);
        d.enable_capture().unwrap();
        let mut sink = Collect::default();
        let summary = d.run(&mut sink).unwrap();

        assert_eq!(summary.frames_read, 5);
        assert_eq!(summary.frames_processed, 3);
        assert_eq!(summary.frames_skipped, 2);
        assert_eq!(sink.reports.len(), 3);
        assert_eq!(sink.meshes, 3);
        assert!(!d.session().is_running());
        assert!(d.capture().closed);
    }

    #[test]
    fn scheduled_commands_apply_before_their_frame() {
        let mut d = driver(5);
        d.schedule(Duration::from_millis(200), Command::RequestCalibration);
        d.schedule(Duration::from_millis(0), Command::warning_cm("oops"));
        d.enable_capture().unwrap();

        let mut sink = Collect::default();
        d.run(&mut sink).unwrap();

        assert_eq!(d.pending_commands(), 0);
        assert_eq!(sink.notices.len(), 1);
        assert!(sink.reports[0].focal_length_px.is_none());
        // frame at 200 ms has a face and consumes the calibration
        assert!(sink.reports[1].calibrated);
        assert!(sink.reports[2].focal_length_px.is_some());
    }

    #[test]
    fn calibration_rejected_while_stopped() {
        let mut d = driver(1);
        assert!(matches!(d.submit(Command::RequestCalibration), Err(Error::NotRunning)));
    }

    #[test]
    fn disabling_stops_further_frames() {
        let mut d = driver(10);
        d.enable_capture().unwrap();
        let mut sink = Collect::default();
        assert!(matches!(d.step(&mut sink).unwrap(), Step::Processed(_)));

        d.toggle_capture().unwrap();
        assert_eq!(d.step(&mut sink).unwrap(), Step::Stopped);
        assert_eq!(d.capture().next, 1);

        d.toggle_capture().unwrap();
        assert_eq!(d.step(&mut sink).unwrap(), Step::Skipped);
    }
}
