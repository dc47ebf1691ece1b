// src/config.rs - Drawing session settings, persisted as JSON
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

pub const DEFAULT_PROMPT: &str = "Analyze the image and provide the following:\n\
* If a mathematical equation is present:\n\
   - The equation represented in the image.\n\
   - The solution to the equation.\n\
   - A short explanation of the steps taken to arrive at the solution. \
Also it might present a triangle which may have any side not given, assume mostly a right angle triangle.\n\
* If a drawing is present and no equation is detected:\n\
   - A brief description of the drawn image in simple terms.\n\
If only a single piece of text is present in the image, return that text only.";

/// RGB triple, stored as a plain array so the JSON stays readable.
pub type Rgb8 = [u8; 3];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawConfig {
    // Frame
    pub width: u32,
    pub height: u32,
    pub mirror: bool,
    pub camera_index: u32,
    pub target_fps: u32,

    // Ink
    pub ink_color: Rgb8,
    pub ink_thickness: u32,
    pub eraser_thickness: u32,

    // Compositor
    pub live_weight: f32,
    pub overlay_weight: f32,
    pub ink_threshold: u8,

    // Annotation of the live frame
    pub show_landmarks: bool,
    pub marker_radius: u32,
    pub marker_color: Rgb8,

    // Hand detector
    pub detector_python: PathBuf,
    pub detector_script: PathBuf,
    pub min_detection_confidence: f32,
    pub detector_timeout_ms: u64,

    // Analysis
    pub gemini_model: String,
    pub api_key: Option<String>,
    pub analysis_timeout_secs: u64,
    pub prompt: String,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            width: 950,
            height: 550,
            mirror: true,
            camera_index: 0,
            target_fps: 30,
            ink_color: [255, 0, 255],
            ink_thickness: 5,
            eraser_thickness: 15,
            live_weight: 0.7,
            overlay_weight: 1.0,
            ink_threshold: 50,
            show_landmarks: true,
            marker_radius: 5,
            marker_color: [255, 0, 255],
            detector_python: PathBuf::from(".venv/bin/python"),
            detector_script: PathBuf::from("scripts/hand_detect.py"),
            min_detection_confidence: 0.75,
            detector_timeout_ms: 2000,
            gemini_model: DEFAULT_GEMINI_MODEL.into(),
            api_key: None,
            analysis_timeout_secs: 30,
            prompt: DEFAULT_PROMPT.into(),
        }
    }
}

impl DrawConfig {
    /// `<config dir>/air_canvas/config.json`, or `./config.json` when the
    /// platform has no config directory.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "aircanvas", "air_canvas")
            .map(|dirs| dirs.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    }

    /// Load from file, falling back to defaults and then to env vars for the API key.
    /// A missing or malformed file is not an error; it is logged and ignored.
    pub fn load(path: &Path) -> Self {
        let mut config = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<DrawConfig>(&raw) {
                Ok(c) => {
                    info!("Loaded config from {}", path.display());
                    c
                }
                Err(e) => {
                    warn!("Ignoring malformed config {}: {}", path.display(), e);
                    DrawConfig::default()
                }
            },
            Err(e) => {
                info!("No config at {} ({}), using defaults", path.display(), e);
                DrawConfig::default()
            }
        };

        if config.api_key.as_deref().map_or(true, str::is_empty) {
            config.api_key = std::env::var("GEMINI_API_KEY")
                .or_else(|_| std::env::var("GOOGLE_API_KEY"))
                .ok()
                .filter(|k| !k.is_empty());
        }

        config
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::Config(format!(
                "frame size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.ink_thickness == 0 || self.eraser_thickness == 0 {
            return Err(Error::Config("stroke thickness must be at least 1".into()));
        }
        for (name, w) in [("live_weight", self.live_weight), ("overlay_weight", self.overlay_weight)] {
            if !(0.0..=2.0).contains(&w) {
                return Err(Error::Config(format!("{name} must be within [0, 2], got {w}")));
            }
        }
        if self.detector_timeout_ms == 0 {
            return Err(Error::Config("detector_timeout_ms must be at least 1".into()));
        }
        if self.analysis_timeout_secs == 0 {
            return Err(Error::Config("analysis_timeout_secs must be at least 1".into()));
        }
        Ok(())
    }
}
