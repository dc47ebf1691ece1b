// src/ui.rs - Panels and widgets for the drawing window
use eframe::egui::{self, Color32, Pos2, Rect, Vec2};
use image::RgbImage;

use air_canvas::analysis::AnalysisOutcome;
use air_canvas::gesture::{Gesture, GESTURE_LEGEND};
use air_canvas::tracking::FrameMetrics;

#[derive(Debug, Clone)]
pub struct Theme {
    pub primary: Color32,
    pub primary_bg: Color32,
    pub error: Color32,
    pub warning: Color32,
    pub success: Color32,
    pub text_primary: Color32,
    pub text_secondary: Color32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: Color32::from_rgb(99, 102, 241),
            primary_bg: Color32::from_rgb(30, 41, 59),
            error: Color32::from_rgb(244, 67, 54),
            warning: Color32::from_rgb(255, 152, 0),
            success: Color32::from_rgb(76, 175, 80),
            text_primary: Color32::WHITE,
            text_secondary: Color32::from_rgb(200, 200, 200),
        }
    }
}

pub struct UIComponents {
    pub theme: Theme,
}

impl UIComponents {
    pub fn new() -> Self {
        Self {
            theme: Theme::default(),
        }
    }

    /// Gesture controls, with the active one highlighted.
    pub fn draw_gesture_legend(&self, ui: &mut egui::Ui, active: Gesture) {
        for (gesture, badge, desc) in GESTURE_LEGEND {
            let is_active = gesture == active;
            let fill = if is_active { self.theme.primary } else { self.theme.primary_bg };

            egui::Frame::none()
                .fill(fill)
                .rounding(egui::Rounding::same(8.0))
                .inner_margin(egui::Margin::same(8.0))
                .show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    ui.horizontal(|ui| {
                        ui.label(
                            egui::RichText::new(badge)
                                .strong()
                                .color(self.theme.text_primary),
                        );
                        ui.label(egui::RichText::new(desc).color(self.theme.text_secondary));
                    });
                });
            ui.add_space(4.0);
        }
    }

    pub fn draw_analysis_panel(
        &self,
        ui: &mut egui::Ui,
        latest: Option<&AnalysisOutcome>,
        busy: bool,
        disabled_reason: Option<&str>,
    ) {
        if let Some(reason) = disabled_reason {
            ui.colored_label(self.theme.warning, reason);
            return;
        }

        if busy {
            ui.horizontal(|ui| {
                ui.add(egui::Spinner::new());
                ui.label("Analyzing drawing...");
            });
        }

        match latest {
            Some(AnalysisOutcome::Completed { text, at }) => {
                ui.label(
                    egui::RichText::new(format!("Analysis Result ({})", at.format("%H:%M:%S")))
                        .color(self.theme.success),
                );
                egui::ScrollArea::vertical().max_height(300.0).show(ui, |ui| {
                    ui.label(egui::RichText::new(text).size(18.0));
                });
            }
            Some(AnalysisOutcome::Failed { message, at }) => {
                ui.colored_label(
                    self.theme.error,
                    format!("Analysis failed at {}: {}", at.format("%H:%M:%S"), message),
                );
            }
            None if !busy => {
                ui.colored_label(
                    self.theme.text_secondary,
                    "Raise index + middle finger to analyze the drawing",
                );
            }
            None => {}
        }
    }

    pub fn draw_status(&self, ui: &mut egui::Ui, gesture: Gesture, metrics: &FrameMetrics) {
        let color = match gesture {
            Gesture::Draw => self.theme.success,
            Gesture::Erase | Gesture::Clear => self.theme.warning,
            Gesture::Analyze => self.theme.primary,
            Gesture::Pan | Gesture::None => self.theme.text_secondary,
        };
        ui.colored_label(color, gesture.label());
        ui.separator();
        ui.label(format!("FPS: {:.1}", metrics.avg_fps));
    }
}

// Custom widget for video display
pub struct VideoWidget {
    texture: Option<egui::TextureHandle>,
    aspect_ratio: f32,
}

impl VideoWidget {
    pub fn new() -> Self {
        Self {
            texture: None,
            aspect_ratio: 950.0 / 550.0,
        }
    }

    pub fn update_frame(&mut self, ctx: &egui::Context, frame: &RgbImage) {
        let size = [frame.width() as usize, frame.height() as usize];
        let color_image = egui::ColorImage::from_rgb(size, frame.as_raw());
        self.aspect_ratio = frame.width() as f32 / frame.height().max(1) as f32;

        match &mut self.texture {
            Some(texture) => texture.set(color_image, egui::TextureOptions::default()),
            None => {
                self.texture = Some(ctx.load_texture(
                    "video_frame",
                    color_image,
                    egui::TextureOptions::default(),
                ))
            }
        }
    }

    pub fn show(&self, ui: &mut egui::Ui, message: Option<&str>) {
        let available_size = ui.available_size();
        let widget_width = available_size.x;
        let widget_height = widget_width / self.aspect_ratio;

        let size = Vec2::new(widget_width, widget_height);
        let (rect, _response) = ui.allocate_exact_size(size, egui::Sense::hover());

        match (&self.texture, message) {
            (Some(texture), None) => {
                ui.painter().image(
                    texture.id(),
                    rect,
                    Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                    Color32::WHITE,
                );
            }
            _ => {
                ui.painter().rect_filled(
                    rect,
                    egui::Rounding::same(4.0),
                    Color32::from_rgb(50, 50, 55),
                );
                ui.painter().text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    message.unwrap_or("No Video Signal"),
                    egui::FontId::proportional(16.0),
                    Color32::from_rgb(255, 165, 0),
                );
            }
        }
    }
}
