//! GUI application for live distance readouts from a recorded landmark stream.
//!
//! Run with: cargo run --features gui --bin iris-depth-gui

use eframe::egui;
use image::RgbaImage;
use iris_depth::overlay::render_overlay;
use iris_depth::{
    init_tracing, AppConfig, Command, DepthReading, Error, FaceLandmarks, FrameDriver,
    FrameReport, Laterality, PresentationSink, RecordedLandmarks, Recording, Resolution, Session,
    Step,
};
use std::path::PathBuf;

/// Overlay previews are rendered at most this wide.
const PREVIEW_WIDTH: u32 = 960;

const INVALID_FIELD: egui::Color32 = egui::Color32::from_rgb(0xff, 0xcc, 0xcc);
const TOO_CLOSE: egui::Color32 = egui::Color32::from_rgb(0xff, 0xaa, 0xaa);

fn main() -> eframe::Result<()> {
    let config = AppConfig::default();
    init_tracing(&config.logging);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1024.0, 768.0]),
        ..Default::default()
    };

    eframe::run_native(
        "iris-depth - Eye Distance",
        options,
        Box::new(|cc| Ok(Box::new(IrisApp::new(cc, config)))),
    )
}

/// Collects what one step produced for display.
#[derive(Default)]
struct FrameCapture {
    report: Option<FrameReport>,
    overlay: Option<RgbaImage>,
    notices: Vec<String>,
}

impl PresentationSink for FrameCapture {
    fn frame(&mut self, report: &FrameReport) {
        self.report = Some(report.clone());
    }

    fn landmarks(&mut self, face: &FaceLandmarks, resolution: Resolution, active: Laterality) {
        self.overlay = Some(render_overlay(face, preview_size(resolution), active));
    }

    fn notice(&mut self, error: &Error) {
        self.notices.push(error.to_string());
    }
}

struct IrisApp {
    config: AppConfig,
    driver: Option<FrameDriver<Recording, RecordedLandmarks>>,
    recording_path: Option<PathBuf>,

    // Display state
    overlay_texture: Option<egui::TextureHandle>,
    report: Option<FrameReport>,
    average_fps: Option<f64>,
    status: String,

    // User inputs, in cm
    reference_text: String,
    warning_text: String,
}

impl IrisApp {
    fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let reference_text = config.session.reference_distance_cm.to_string();
        let warning_text = config.session.warning_distance_cm.to_string();
        Self {
            config,
            driver: None,
            recording_path: None,
            overlay_texture: None,
            report: None,
            average_fps: None,
            status: "Open a recording to begin".to_string(),
            reference_text,
            warning_text,
        }
    }

    fn load_recording(&mut self, path: PathBuf) {
        match Recording::load(&path) {
            Ok(recording) => {
                let frames = recording.len();
                let mut driver = FrameDriver::new(
                    Session::new(&self.config.session),
                    recording,
                    RecordedLandmarks,
                    self.config.capture.preferred_resolution(),
                );
                let rejected = carry_over_fields(&mut driver, &self.reference_text, &self.warning_text);

                self.driver = Some(driver);
                self.recording_path = Some(path.clone());
                self.overlay_texture = None;
                self.report = None;
                self.average_fps = None;
                self.status = format!("Loaded: {} ({} frames)", path.display(), frames);
                if !rejected.is_empty() {
                    self.status.push_str(&format!("; {}", rejected.join("; ")));
                }
            }
            Err(e) => {
                self.status = format!("Failed to load recording: {}", e);
            }
        }
    }

    fn toggle_capture(&mut self) {
        let Some(ref mut driver) = self.driver else {
            self.status = "No recording loaded".to_string();
            return;
        };
        match driver.toggle_capture() {
            Ok(()) if driver.session().is_running() => {
                self.average_fps = None;
                self.status = "Capture running".to_string();
            }
            Ok(()) => self.status = "Capture stopped".to_string(),
            Err(e) => self.status = e.to_string(),
        }
    }

    fn submit(&mut self, command: Command) {
        let Some(ref mut driver) = self.driver else {
            self.status = "No recording loaded".to_string();
            return;
        };
        if let Err(e) = driver.submit(command) {
            self.status = e.to_string();
        }
    }

    /// Process one frame if capture is running.
    fn advance(&mut self, ctx: &egui::Context) {
        let Some(ref mut driver) = self.driver else {
            return;
        };
        if !driver.session().is_running() {
            return;
        }

        let mut capture = FrameCapture::default();
        match driver.step(&mut capture) {
            Ok(Step::EndOfStream) => self.status = "Recording finished".to_string(),
            Ok(_) => {}
            Err(e) => {
                driver.disable_capture();
                self.status = format!("Capture error: {}", e);
            }
        }

        if let Some(notice) = capture.notices.pop() {
            self.status = notice;
        }
        if let Some(report) = capture.report {
            if report.average_fps.is_some() {
                self.average_fps = report.average_fps;
            }
            self.report = Some(report);
        }
        if let Some(overlay) = capture.overlay {
            let size = [overlay.width() as usize, overlay.height() as usize];
            let color_image = egui::ColorImage::from_rgba_unmultiplied(size, overlay.as_raw());
            self.overlay_texture = Some(ctx.load_texture("overlay", color_image, Default::default()));
        }

        ctx.request_repaint();
    }

    fn is_running(&self) -> bool {
        self.driver.as_ref().is_some_and(|d| d.session().is_running())
    }

    fn field_invalid(&self, reference: bool) -> bool {
        self.driver.as_ref().is_some_and(|d| {
            let state = d.session().state();
            if reference {
                state.calibration().reference().is_invalid()
            } else {
                state.warning().is_invalid()
            }
        })
    }

    fn too_close(&self) -> bool {
        self.is_running() && self.report.as_ref().is_some_and(|r| r.too_close())
    }

    fn readouts(&self, ui: &mut egui::Ui) {
        let eye = self
            .driver
            .as_ref()
            .map(|d| d.session().laterality())
            .unwrap_or(self.config.session.laterality);
        ui.label(format!("Eye: {} ({})", eye, eye.abbreviation()));

        let Some(ref r) = self.report else {
            ui.label("No frames processed yet");
            return;
        };

        ui.label(format!("Iris size: {:.2} px", r.iris_px));
        if let Some(other) = r.other_iris_px {
            ui.label(format!("Other iris: {:.2} px", other));
        }
        ui.label(format!("Video resolution: {} px", r.resolution));
        match r.focal_length_px {
            Some(f) => ui.label(format!("Focal length: {:.1} px", f)),
            None => ui.label("Focal length: not calibrated"),
        };
        match r.depth {
            DepthReading::Estimated { depth_mm } => {
                ui.label(format!("Distance: {:.1} cm", depth_mm / 10.0))
            }
            DepthReading::Unavailable { .. } => ui.label("Distance: --"),
        };
        if let Some(baseline) = r.calibration_baseline_px {
            ui.label(format!("Calibration iris size: {:.2} px", baseline));
        }
        if let Some(fps) = self.average_fps {
            ui.label(format!("Average FPS: {:.1}", fps));
        }
        if r.too_close() {
            ui.colored_label(egui::Color32::DARK_RED, "TOO CLOSE");
        }
    }
}

impl eframe::App for IrisApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.advance(ctx);

        egui::TopBottomPanel::top("menu").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Recording...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("Landmark recordings", &["jsonl", "bz2"])
                            .pick_file()
                        {
                            self.load_recording(path);
                        }
                        ui.close_menu();
                    }
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
            });
        });

        egui::SidePanel::left("controls").min_width(250.0).show(ctx, |ui| {
            ui.heading("Capture");
            ui.separator();

            let label = if self.is_running() { "Disable Webcam" } else { "Enable Webcam" };
            if ui.button(label).clicked() {
                self.toggle_capture();
            }
            ui.horizontal(|ui| {
                if ui.button("Switch eye").clicked() {
                    self.submit(Command::SwitchLaterality);
                }
                if ui.button("Calibrate").clicked() {
                    self.submit(Command::RequestCalibration);
                }
            });
            ui.add_space(16.0);

            ui.heading("Distances (cm)");
            ui.separator();

            let reference_bg = self.field_invalid(true).then_some(INVALID_FIELD);
            ui.label("Reference distance:");
            let mut edit = egui::TextEdit::singleline(&mut self.reference_text);
            if let Some(color) = reference_bg {
                edit = edit.background_color(color);
            }
            if ui.add(edit).changed() {
                self.submit(Command::reference_cm(self.reference_text.clone()));
            }

            let warning_bg = self.field_invalid(false).then_some(INVALID_FIELD);
            ui.label("Warning distance:");
            let mut edit = egui::TextEdit::singleline(&mut self.warning_text);
            if let Some(color) = warning_bg {
                edit = edit.background_color(color);
            }
            if ui.add(edit).changed() {
                self.submit(Command::warning_cm(self.warning_text.clone()));
            }
            ui.add_space(16.0);

            ui.heading("Measurements");
            ui.separator();
            self.readouts(ui);
            ui.add_space(16.0);

            ui.heading("Status");
            ui.separator();
            ui.label(&self.status);
            if let Some(ref path) = self.recording_path {
                ui.small(path.display().to_string());
            }
        });

        let mut panel = egui::Frame::central_panel(&ctx.style());
        if self.too_close() {
            panel = panel.fill(TOO_CLOSE);
        }
        egui::CentralPanel::default().frame(panel).show(ctx, |ui| {
            if let Some(ref texture) = self.overlay_texture {
                let available_size = ui.available_size();
                let texture_size = texture.size_vec2();

                // Scale to fit
                let scale = (available_size.x / texture_size.x)
                    .min(available_size.y / texture_size.y)
                    .min(1.0);
                let display_size = texture_size * scale;

                ui.centered_and_justified(|ui| {
                    ui.image((texture.id(), display_size));
                });
            } else {
                ui.centered_and_justified(|ui| {
                    ui.heading("Drag and drop a recording or use File > Open");
                });
            }
        });

        // Handle drag and drop
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|file| file.path.clone())
                .collect()
        });
        if let Some(path) = dropped.into_iter().last() {
            self.load_recording(path);
        }
    }
}

/// Apply the typed distance fields to a fresh driver, returning the
/// messages of any rejected values.
fn carry_over_fields(
    driver: &mut FrameDriver<Recording, RecordedLandmarks>,
    reference_text: &str,
    warning_text: &str,
) -> Vec<String> {
    [
        Command::reference_cm(reference_text),
        Command::warning_cm(warning_text),
    ]
    .into_iter()
    .filter_map(|command| driver.submit(command).err())
    .map(|e| e.to_string())
    .collect()
}

fn preview_size(resolution: Resolution) -> Resolution {
    if resolution.width <= PREVIEW_WIDTH {
        return resolution;
    }
    let height = (resolution.height as u64 * PREVIEW_WIDTH as u64 / resolution.width as u64).max(1);
    Resolution::new(PREVIEW_WIDTH, height as u32)
}
