//! The per-frame drawing state machine.
//!
//! [`SessionState`] owns everything that survives between frames (the overlay
//! canvas and the pen cursor). [`step`] advances it by one frame:
//! classify -> resolve -> stroke -> composite. It knows nothing about
//! cameras, detectors or windows, so it can be driven directly from tests.
//!
//! [`Session`] is the loop around it: it pulls a frame from a
//! [`FrameSource`], asks the [`HandDetector`] for landmarks, calls [`step`]
//! and feeds the resulting gesture to the [`AnalysisTrigger`]. Failures of
//! those collaborators are contained here; only a lost camera ends the loop.

use image::RgbImage;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::analysis::{AnalysisOutcome, AnalysisTrigger};
use crate::canvas::OverlayCanvas;
use crate::compositor::{annotate_hand, composite, BlendParams};
use crate::config::DrawConfig;
use crate::error::{Error, Result};
use crate::gesture::Gesture;
use crate::mediapipe_bridge::{HandDetector, ScriptedDetector};
use crate::stroke::{PenCursor, StrokeTracker};
use crate::tracking::{classify, HandLandmarks, HandPose};
use crate::video::FrameSource;

/// Consecutive unreadable frames after which the camera is given up on.
pub const MAX_FRAME_FAILURES: u32 = 30;

pub struct SessionState {
    pub canvas: OverlayCanvas,
    strokes: StrokeTracker,
    blend: BlendParams,
    config: DrawConfig,
    last_gesture: Gesture,
}

/// What one frame produced.
#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub display: RgbImage,
    pub gesture: Gesture,
    pub pose: Option<HandPose>,
}

impl SessionState {
    pub fn new(config: &DrawConfig) -> Self {
        Self {
            canvas: OverlayCanvas::new(config.width, config.height),
            strokes: StrokeTracker::from_config(config),
            blend: BlendParams::from(config),
            config: config.clone(),
            last_gesture: Gesture::None,
        }
    }

    pub fn cursor(&self) -> PenCursor {
        self.strokes.cursor()
    }

    pub fn show_landmarks(&self) -> bool {
        self.config.show_landmarks
    }

    pub fn set_show_landmarks(&mut self, show: bool) {
        self.config.show_landmarks = show;
    }

    /// Start over with a blank canvas, as the clear gesture does.
    pub fn reset(&mut self) {
        self.canvas.clear();
        self.strokes.lift();
        self.last_gesture = Gesture::None;
    }
}

/// Advance the session by one frame.
///
/// `hand` is empty when nothing was detected; then no gesture fires and the
/// canvas is left as it is.
pub fn step(state: &mut SessionState, mut live: RgbImage, hand: &HandLandmarks) -> FrameOutput {
    let pose = classify(hand);
    let gesture = Gesture::from_pose(pose.map(|p| p.fingers));

    if gesture != state.last_gesture {
        debug!("Gesture {:?} -> {:?}", state.last_gesture, gesture);
        state.last_gesture = gesture;
    }

    state.strokes.apply(gesture, pose.as_ref(), &mut state.canvas);

    if state.config.show_landmarks {
        annotate_hand(&mut live, hand, pose.as_ref(), &state.config);
    }
    let display = composite(&live, &state.canvas, state.blend);

    FrameOutput {
        display,
        gesture,
        pose,
    }
}

/// Result of one [`Session::tick`].
#[derive(Debug)]
pub enum Tick {
    Frame(FrameOutput),
    /// The frame could not be read; the loop carries on.
    Skipped,
    /// The loop has ended; see [`Session::stop_reason`].
    Stopped,
}

pub struct Session {
    pub state: SessionState,
    source: Option<Box<dyn FrameSource>>,
    detector: Box<dyn HandDetector>,
    trigger: Option<AnalysisTrigger>,
    frame_failures: u32,
    stop_reason: Option<String>,
    detector_warning: Option<String>,
}

impl Session {
    pub fn new(
        config: &DrawConfig,
        source: Box<dyn FrameSource>,
        detector: Box<dyn HandDetector>,
    ) -> Self {
        Self {
            state: SessionState::new(config),
            source: Some(source),
            detector,
            trigger: None,
            frame_failures: 0,
            stop_reason: None,
            detector_warning: None,
        }
    }

    pub fn with_trigger(mut self, trigger: AnalysisTrigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn trigger(&self) -> Option<&AnalysisTrigger> {
        self.trigger.as_ref()
    }

    /// Analyze the canvas now, as the analyze gesture would.
    pub fn request_analysis(&mut self) -> Result<Uuid> {
        match self.trigger.as_mut() {
            Some(trigger) => trigger.request(&self.state.canvas),
            None => Err(Error::Config("analysis is not configured".into())),
        }
    }

    pub fn is_running(&self) -> bool {
        self.source.is_some()
    }

    /// Why the loop ended, once it has.
    pub fn stop_reason(&self) -> Option<&str> {
        self.stop_reason.as_deref()
    }

    /// Set when hand detection is unavailable and no hand will be reported.
    pub fn detector_warning(&self) -> Option<&str> {
        self.detector_warning.as_deref()
    }

    /// End the loop and drop the frame source.
    pub fn stop(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        debug!("Stopping frame loop: {}", reason);
        self.source = None;
        self.stop_reason = Some(reason);
    }

    /// Carry on without hand detection.
    pub fn disable_detector(&mut self, reason: impl Into<String>) {
        self.detector = Box::new(ScriptedDetector::default());
        self.detector_warning = Some(reason.into());
    }

    /// Pick up a finished analysis, if any.
    pub fn poll_analysis(&mut self) -> Option<&AnalysisOutcome> {
        self.trigger.as_mut()?.poll()
    }

    /// Run one iteration of the frame loop.
    pub fn tick(&mut self) -> Tick {
        let Some(source) = self.source.as_mut() else {
            return Tick::Stopped;
        };

        let frame = match source.next_frame() {
            Ok(Some(frame)) => {
                self.frame_failures = 0;
                frame
            }
            Ok(None) => {
                self.stop("Camera stream ended");
                return Tick::Stopped;
            }
            Err(e) if e.is_fatal() => {
                error!("{}", e);
                self.stop(e.to_string());
                return Tick::Stopped;
            }
            Err(e) => {
                self.frame_failures += 1;
                if self.frame_failures >= MAX_FRAME_FAILURES {
                    let reason = format!("{} ({} frames in a row)", e, self.frame_failures);
                    error!("{}", reason);
                    self.stop(reason);
                    return Tick::Stopped;
                }
                warn!("Dropping frame: {}", e);
                return Tick::Skipped;
            }
        };

        let hand = self.detect(&frame);
        let output = step(&mut self.state, frame, &hand);

        if let Some(trigger) = self.trigger.as_mut() {
            trigger.on_gesture(output.gesture, &self.state.canvas);
        }
        Tick::Frame(output)
    }

    /// Detector errors never reach the caller: a bad answer counts as no
    /// hand, a dead detector is replaced for the rest of the session.
    fn detect(&mut self, frame: &RgbImage) -> HandLandmarks {
        match self.detector.detect(frame) {
            Ok(hand) => hand,
            Err(Error::DetectorLost(reason)) => {
                error!("Hand detector lost: {}", reason);
                self.disable_detector(format!("No hand detection: {}", reason));
                HandLandmarks::empty()
            }
            Err(e) => {
                warn!("Hand detection failed: {}", e);
                HandLandmarks::empty()
            }
        }
    }
}
