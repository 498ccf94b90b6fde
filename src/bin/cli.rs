//! CLI application for replaying recorded landmark streams.
//!
//! Usage:
//!   iris-depth <recording>                          # Human-readable output
//!   iris-depth <recording> --calibrate-at-ms 500    # Calibrate on the first frame at/after 500 ms
//!   iris-depth <recording> --json                   # JSON Lines output
//!   iris-depth <recording> -o report.jsonl --json   # Save to file

use clap::Parser;
use iris_depth::{
    init_tracing, AppConfig, Command, DepthReading, Error, FrameDriver, FrameReport, Laterality,
    PresentationSink, RecordedLandmarks, Recording, RunSummary, Session,
};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "iris-depth")]
#[command(author, version, about = "Eye-to-camera distance from recorded iris landmarks", long_about = None)]
struct Args {
    /// Recorded landmark stream (.jsonl or .jsonl.bz2)
    #[arg(required = true)]
    recording: PathBuf,

    /// Configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Calibration reference distance in cm
    #[arg(long)]
    reference_cm: Option<f64>,

    /// Proximity warning distance in cm
    #[arg(long)]
    warning_cm: Option<f64>,

    /// Eye to track at start (left/os or right/od)
    #[arg(long)]
    eye: Option<Laterality>,

    /// Request calibration at this recording time (repeatable)
    #[arg(long = "calibrate-at-ms", value_name = "MS")]
    calibrate_at_ms: Vec<f64>,

    /// Switch the tracked eye at this recording time (repeatable)
    #[arg(long = "switch-eye-at-ms", value_name = "MS")]
    switch_eye_at_ms: Vec<f64>,

    /// Output as JSON Lines
    #[arg(short, long)]
    json: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Final line of a replay
#[derive(Serialize)]
struct SummaryOutput {
    recording: String,
    frames_in_recording: usize,
    #[serde(flatten)]
    run: RunSummary,
    final_eye: Laterality,
    final_focal_length_px: Option<f64>,
    notices: usize,
}

#[derive(Serialize)]
struct SummaryLine<'a> {
    summary: &'a SummaryOutput,
}

/// Writes each processed frame as it arrives.
struct ReportWriter<W: Write> {
    out: W,
    json: bool,
    notices: usize,
    error: Option<Box<dyn std::error::Error>>,
}

impl<W: Write> ReportWriter<W> {
    fn new(out: W, json: bool) -> Self {
        Self {
            out,
            json,
            notices: 0,
            error: None,
        }
    }

    fn write_frame(&mut self, report: &FrameReport) -> Result<(), Box<dyn std::error::Error>> {
        if self.json {
            serde_json::to_writer(&mut self.out, report)?;
            writeln!(self.out)?;
        } else {
            writeln!(self.out, "{}", format_frame(report))?;
        }
        Ok(())
    }
}

impl<W: Write> PresentationSink for ReportWriter<W> {
    fn frame(&mut self, report: &FrameReport) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.write_frame(report) {
            self.error = Some(e);
        }
    }

    fn notice(&mut self, error: &Error) {
        self.notices += 1;
        eprintln!("Notice: {}", error);
    }
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match args.config {
        Some(ref path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(cm) = args.reference_cm {
        config.session.reference_distance_cm = cm;
    }
    if let Some(cm) = args.warning_cm {
        config.session.warning_distance_cm = cm;
    }
    if let Some(eye) = args.eye {
        config.session.laterality = eye;
    }
    if args.verbose {
        config.logging.level = "debug".to_string();
    }
    config.validate()?;
    init_tracing(&config.logging);

    let recording = Recording::load(&args.recording)?;
    let frames_in_recording = recording.len();

    let mut driver = FrameDriver::new(
        Session::new(&config.session),
        recording,
        RecordedLandmarks,
        config.capture.preferred_resolution(),
    );
    for &ms in &args.calibrate_at_ms {
        driver.schedule(event_time(ms)?, Command::RequestCalibration);
    }
    for &ms in &args.switch_eye_at_ms {
        driver.schedule(event_time(ms)?, Command::SwitchLaterality);
    }
    if args.calibrate_at_ms.is_empty() {
        warn!("no --calibrate-at-ms given, distances will stay unavailable");
    }

    let out: Box<dyn Write> = match args.output {
        Some(ref path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    let mut sink = ReportWriter::new(out, args.json);

    driver.enable_capture()?;
    let run = driver.run(&mut sink)?;
    if let Some(e) = sink.error.take() {
        return Err(e);
    }
    if driver.pending_commands() > 0 {
        warn!(
            pending = driver.pending_commands(),
            "scheduled events after the end of the recording were not applied"
        );
    }

    let summary = SummaryOutput {
        recording: args.recording.display().to_string(),
        frames_in_recording,
        run,
        final_eye: driver.session().laterality(),
        final_focal_length_px: driver.session().focal_length_px(),
        notices: sink.notices,
    };

    if args.json {
        serde_json::to_writer(&mut sink.out, &SummaryLine { summary: &summary })?;
        writeln!(sink.out)?;
    } else {
        write!(sink.out, "{}", format_human_readable(&summary))?;
    }
    sink.out.flush()?;

    if let Some(ref path) = args.output {
        info!("output written to {}", path.display());
    }

    Ok(())
}

fn event_time(ms: f64) -> Result<Duration, Box<dyn std::error::Error>> {
    Duration::try_from_secs_f64(ms / 1000.0)
        .map_err(|_| format!("event time must be a non-negative number of ms, got {}", ms).into())
}

fn format_frame(report: &FrameReport) -> String {
    let mut s = format!(
        "[{:>9.1} ms] {} eye | Iris: {:.2} px | Video: {} px",
        report.timestamp_ms, report.laterality, report.iris_px, report.resolution
    );

    match report.focal_length_px {
        Some(f) => s.push_str(&format!(" | Focal: {:.1} px", f)),
        None => s.push_str(" | Focal: unset"),
    }
    match report.depth {
        DepthReading::Estimated { depth_mm } => {
            s.push_str(&format!(" | Depth: {:.1} cm", depth_mm / 10.0))
        }
        DepthReading::Unavailable { .. } => s.push_str(" | Depth: --"),
    }
    if let Some(baseline) = report.calibration_baseline_px {
        s.push_str(&format!(" | Baseline: {:.2} px", baseline));
    }
    if report.calibrated {
        s.push_str(" | calibrated");
    }
    if let Some(reason) = report.calibration_failure {
        s.push_str(&format!(" | calibration failed ({:?})", reason));
    }
    if report.too_close() {
        s.push_str(" | TOO CLOSE");
    }
    if let Some(fps) = report.average_fps {
        s.push_str(&format!(" | FPS: {:.1}", fps));
    }
    s
}

fn format_human_readable(summary: &SummaryOutput) -> String {
    let mut s = String::new();

    s.push_str(&format!(
        "\nRecording: {} ({} frames)\n",
        summary.recording, summary.frames_in_recording
    ));
    s.push_str(&format!("Frames read:      {}\n", summary.run.frames_read));
    s.push_str(&format!("Frames processed: {}\n", summary.run.frames_processed));
    s.push_str(&format!("Frames skipped:   {} (no face)\n", summary.run.frames_skipped));
    s.push_str(&format!("Too close:        {}\n", summary.run.too_close_frames));
    s.push_str(&format!("Tracked eye:      {}\n", summary.final_eye));
    match summary.final_focal_length_px {
        Some(f) => s.push_str(&format!("Focal length:     {:.1} px\n", f)),
        None => s.push_str("Focal length:     unset\n"),
    }
    if summary.notices > 0 {
        s.push_str(&format!("Notices:          {}\n", summary.notices));
    }

    s
}
