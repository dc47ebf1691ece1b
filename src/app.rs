// src/app.rs
use crate::ui::{UIComponents, VideoWidget};

use air_canvas::analysis::AnalysisTrigger;
use air_canvas::config::DrawConfig;
use air_canvas::gemini::GeminiClient;
use air_canvas::gesture::Gesture;
use air_canvas::mediapipe_bridge::{HandDetector, MediaPipeDetector, ScriptedDetector};
use air_canvas::session::{Session, Tick};
use air_canvas::tracking::FrameMetrics;
use air_canvas::video::{CameraSource, FrameSequence, FrameSource};

use eframe::egui;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, warn};

pub struct AirCanvasApp {
    session: Session,

    // Shown in place of the analysis panel when there is no trigger
    analysis_disabled: Option<String>,

    // UI State
    gesture: Gesture,
    camera_name: String,
    show_settings: bool,
    show_about: bool,
    metrics: FrameMetrics,

    // UI Components
    ui_components: UIComponents,
    video: VideoWidget,

    // Settings
    config: DrawConfig,
    config_path: PathBuf,
}

impl AirCanvasApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: DrawConfig, config_path: PathBuf) -> Self {
        let (detector, detector_error) = match MediaPipeDetector::spawn(
            &config.detector_python,
            &config.detector_script,
            config.min_detection_confidence,
            Duration::from_millis(config.detector_timeout_ms),
        ) {
            Ok(detector) => (Box::new(detector) as Box<dyn HandDetector>, None),
            Err(e) => {
                warn!("{}. Running without hand detection.", e);
                (Box::new(ScriptedDetector::default()) as Box<dyn HandDetector>, Some(e))
            }
        };

        let (source, camera_name, capture_error) =
            match CameraSource::open(&config) {
                Ok(camera) => {
                    let name = camera.name();
                    (Box::new(camera) as Box<dyn FrameSource>, name, None)
                }
                Err(e) => {
                    error!("{}", e);
                    (
                        Box::new(FrameSequence::default()) as Box<dyn FrameSource>,
                        String::new(),
                        Some(e),
                    )
                }
            };

        let mut session = Session::new(&config, source, detector);
        if let Some(e) = detector_error {
            session.disable_detector(format!("No hand detection: {}", e));
        }
        if let Some(e) = capture_error {
            session.stop(e.to_string());
        }

        let analysis_disabled = match Self::build_trigger(&config) {
            Ok(trigger) => {
                session = session.with_trigger(trigger);
                None
            }
            Err(e) => {
                warn!("Analysis disabled: {}", e);
                Some(format!("Analysis disabled: {}", e))
            }
        };

        Self {
            session,
            analysis_disabled,
            gesture: Gesture::None,
            camera_name,
            show_settings: false,
            show_about: false,
            metrics: FrameMetrics::new(),
            ui_components: UIComponents::new(),
            video: VideoWidget::new(),
            config,
            config_path,
        }
    }

    fn build_trigger(config: &DrawConfig) -> air_canvas::Result<AnalysisTrigger> {
        let client = GeminiClient::from_config(config)?;
        AnalysisTrigger::new(
            Arc::new(client),
            Duration::from_secs(config.analysis_timeout_secs),
        )
    }

    /// Advance the drawing loop by one frame and show the result.
    fn process_frame(&mut self, ctx: &egui::Context) {
        match self.session.tick() {
            Tick::Frame(output) => {
                self.metrics.tick();
                self.gesture = output.gesture;
                self.video.update_frame(ctx, &output.display);
            }
            Tick::Skipped => {}
            Tick::Stopped => self.gesture = Gesture::None,
        }
    }

    fn render_header(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(10.0);
            egui::menu::bar(ui, |ui| {
                ui.heading("Air Canvas");

                ui.separator();

                if let Some(warning) = self.session.detector_warning() {
                    ui.colored_label(self.ui_components.theme.warning, warning);
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("⚙ Settings").clicked() {
                        self.show_settings = !self.show_settings;
                    }

                    if ui.button("ℹ About").clicked() {
                        self.show_about = !self.show_about;
                    }
                });
            });
            ui.add_space(10.0);
        });
    }

    fn render_side_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("side_panel")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                ui.add_space(10.0);
                ui.heading("Gestures");
                ui.add_space(6.0);
                self.ui_components.draw_gesture_legend(ui, self.gesture);

                ui.separator();

                ui.heading("Analysis");
                ui.add_space(6.0);
                let (latest, busy) = match self.session.trigger() {
                    Some(trigger) => (trigger.latest(), trigger.is_busy()),
                    None => (None, false),
                };
                self.ui_components.draw_analysis_panel(
                    ui,
                    latest,
                    busy,
                    self.analysis_disabled.as_deref(),
                );
            });
    }

    fn render_control_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("controls").show(ctx, |ui| {
            ui.add_space(10.0);
            ui.horizontal(|ui| {
                let clear_btn = ui.add_sized(
                    [120.0, 32.0],
                    egui::Button::new("🗑 Clear Canvas").fill(self.ui_components.theme.primary_bg),
                );
                if clear_btn.clicked() {
                    self.session.state.reset();
                }

                let can_analyze = self.session.trigger().map_or(false, |t| !t.is_busy());
                let analyze_btn = ui.add_enabled(
                    can_analyze,
                    egui::Button::new("🔍 Analyze").min_size(egui::vec2(120.0, 32.0)),
                );
                if analyze_btn.clicked() {
                    if let Err(e) = self.session.request_analysis() {
                        warn!("Analysis request rejected: {}", e);
                    }
                }

                ui.separator();

                let mut show_landmarks = self.session.state.show_landmarks();
                if ui.checkbox(&mut show_landmarks, "Hand skeleton").changed() {
                    self.session.state.set_show_landmarks(show_landmarks);
                    self.config.show_landmarks = show_landmarks;
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if !self.camera_name.is_empty() {
                        ui.label(
                            egui::RichText::new(&self.camera_name)
                                .color(self.ui_components.theme.text_secondary),
                        );
                        ui.separator();
                    }
                    self.ui_components.draw_status(ui, self.gesture, &self.metrics);
                });
            });
            ui.add_space(10.0);
        });
    }

    fn render_main_content(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            self.video.show(ui, self.session.stop_reason());
        });
    }
}

impl eframe::App for AirCanvasApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let started = Instant::now();
        self.process_frame(ctx);

        self.session.poll_analysis();

        // Render UI components
        self.render_header(ctx);
        self.render_control_panel(ctx);
        self.render_side_panel(ctx);

        if self.show_settings {
            self.render_settings_window(ctx);
        }

        if self.show_about {
            self.render_about_window(ctx);
        }

        self.render_main_content(ctx);

        if self.session.is_running() {
            let budget = Duration::from_secs_f32(1.0 / self.config.target_fps.max(1) as f32);
            ctx.request_repaint_after(budget.saturating_sub(started.elapsed()));
        } else if self.session.trigger().map_or(false, AnalysisTrigger::is_busy) {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

impl AirCanvasApp {
    fn render_settings_window(&mut self, ctx: &egui::Context) {
        let config = &self.config;
        let config_path = &self.config_path;
        egui::Window::new("Settings")
            .open(&mut self.show_settings)
            .resizable(true)
            .default_size([400.0, 400.0])
            .show(ctx, |ui| {
                ui.heading("Drawing");
                ui.add_space(10.0);

                egui::Grid::new("settings_grid")
                    .num_columns(2)
                    .spacing([20.0, 6.0])
                    .show(ui, |ui| {
                        ui.label("Frame size:");
                        ui.label(format!("{} x {}", config.width, config.height));
                        ui.end_row();

                        ui.label("Ink:");
                        let [r, g, b] = config.ink_color;
                        ui.colored_label(
                            egui::Color32::from_rgb(r, g, b),
                            format!("● {} px", config.ink_thickness),
                        );
                        ui.end_row();

                        ui.label("Eraser:");
                        ui.label(format!("{} px", config.eraser_thickness));
                        ui.end_row();

                        ui.label("Ink threshold:");
                        ui.label(config.ink_threshold.to_string());
                        ui.end_row();

                        ui.label("Analysis model:");
                        ui.label(config.gemini_model.as_str());
                        ui.end_row();

                        ui.label("Analysis timeout:");
                        ui.label(format!("{} s", config.analysis_timeout_secs));
                        ui.end_row();
                    });

                ui.separator();

                ui.label("Config file:");
                ui.label(config_path.display().to_string());
                if ui.button("Save").clicked() {
                    if let Err(e) = config.save(config_path) {
                        error!("Failed to save config: {}", e);
                    }
                }
            });
    }

    fn render_about_window(&mut self, ctx: &egui::Context) {
        egui::Window::new("About")
            .open(&mut self.show_about)
            .resizable(false)
            .default_size([400.0, 300.0])
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.heading("Air Canvas");
                    ui.label(format!("Version {}", env!("CARGO_PKG_VERSION")));
                    ui.add_space(20.0);
                    ui.label("Draw in the air with your index finger,");
                    ui.label("then ask Gemini what you drew.");
                });
            });
    }
}
