//! Air Canvas: draw in the air with one hand in front of a camera.
//!
//! Each camera frame goes through the same pipeline:
//!
//! 1. a [`mediapipe_bridge::HandDetector`] finds the 21 hand landmarks,
//! 2. [`tracking::classify`] turns them into five finger up/down flags,
//! 3. [`gesture::Gesture::resolve`] maps the flags to a drawing action,
//! 4. [`stroke::StrokeTracker`] paints the action onto the [`canvas::OverlayCanvas`],
//! 5. [`compositor::composite`] blends the overlay over the live frame.
//!
//! [`session::step`] runs steps 2 to 5 for one frame. The analyze gesture
//! additionally hands a snapshot of the overlay to an
//! [`analysis::AnalysisTrigger`], which asks Gemini what was drawn without
//! blocking the frame loop.

pub mod analysis;
pub mod canvas;
pub mod compositor;
pub mod config;
pub mod error;
pub mod gemini;
pub mod gesture;
pub mod mediapipe_bridge;
pub mod session;
pub mod stroke;
pub mod tracking;
pub mod video;

pub use analysis::{AnalysisOutcome, AnalysisService, AnalysisTrigger};
pub use canvas::{OverlayCanvas, Point};
pub use config::DrawConfig;
pub use error::{Error, Result};
pub use gesture::Gesture;
pub use session::{step, FrameOutput, SessionState};
pub use tracking::{FingerState, HandLandmarks, HandPose, Landmark};
