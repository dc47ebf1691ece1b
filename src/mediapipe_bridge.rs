// src/mediapipe_bridge.rs - Hand landmark detection via a MediaPipe subprocess
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use image::RgbImage;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::tracking::{landmarks, HandLandmarks, Landmark};

/// Anything that turns a frame into the landmarks of at most one hand.
pub trait HandDetector {
    /// Landmarks in pixel coordinates of `frame`, or an empty set when no hand is visible.
    fn detect(&mut self, frame: &RgbImage) -> Result<HandLandmarks>;
}

#[derive(Deserialize, Debug)]
struct LandmarkJson {
    x: f32,
    y: f32,
}

#[derive(Deserialize, Debug)]
struct HandJson {
    #[serde(default)]
    score: f32,
    landmarks: Vec<LandmarkJson>,
}

#[derive(Deserialize, Debug)]
struct DetectionJson {
    #[serde(default)]
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

/// How long the detector may take to load its model and print `READY`.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Talks to `scripts/hand_detect.py` over stdin/stdout.
///
/// Request: width, height, channels as little-endian u32, then raw RGB bytes.
/// Response: one JSON line `{"hands": [{"score": f, "landmarks": [{"x": f, "y": f}, ...]}]}`
/// with coordinates normalised to [0, 1].
///
/// Responses are read on a helper thread so a hung process costs at most
/// `timeout` per frame. Once the process dies or times out every call fails
/// with [`Error::DetectorLost`].
pub struct MediaPipeDetector {
    process: Child,
    stdin: ChildStdin,
    lines: Receiver<String>,
    min_confidence: f32,
    timeout: Duration,
}

impl MediaPipeDetector {
    pub fn spawn(python: &Path, script: &Path, min_confidence: f32, timeout: Duration) -> Result<Self> {
        if !script.exists() {
            return Err(Error::Detector(format!(
                "detector script not found at {}",
                script.display()
            )));
        }

        info!("Starting MediaPipe hand detector: {} {}", python.display(), script.display());
        let mut process = Command::new(python)
            .arg(script)
            .arg(min_confidence.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::Detector(format!("failed to start {}: {}", python.display(), e)))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| Error::Detector("detector stdin unavailable".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| Error::Detector("detector stdout unavailable".into()))?;
        let lines = spawn_reader(stdout)?;

        let ready = match lines.recv_timeout(STARTUP_TIMEOUT) {
            Ok(line) => line,
            Err(e) => {
                let _ = process.kill();
                return Err(Error::Detector(format!("detector did not start: {}", e)));
            }
        };
        if ready.trim() != "READY" {
            let _ = process.kill();
            return Err(Error::Detector(format!(
                "detector did not signal ready, got: {:?}",
                ready.trim()
            )));
        }
        info!("MediaPipe hand detector ready");

        Ok(Self {
            process,
            stdin,
            lines,
            min_confidence,
            timeout,
        })
    }

    fn send(&mut self, frame: &RgbImage) -> std::io::Result<()> {
        let (width, height) = frame.dimensions();
        self.stdin.write_all(&width.to_le_bytes())?;
        self.stdin.write_all(&height.to_le_bytes())?;
        self.stdin.write_all(&3u32.to_le_bytes())?;
        self.stdin.write_all(frame.as_raw())?;
        self.stdin.flush()
    }
}

/// Forward stdout lines to a channel until the process closes the pipe.
fn spawn_reader(stdout: ChildStdout) -> Result<Receiver<String>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("hand-detector-reader".into())
        .spawn(move || {
            let mut reader = BufReader::new(stdout);
            loop {
                let mut line = String::new();
                match reader.read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("Hand detector output closed");
        })?;
    Ok(rx)
}

impl HandDetector for MediaPipeDetector {
    fn detect(&mut self, frame: &RgbImage) -> Result<HandLandmarks> {
        self.send(frame)
            .map_err(|e| Error::DetectorLost(format!("failed to send frame: {}", e)))?;

        let line = match self.lines.recv_timeout(self.timeout) {
            Ok(line) => line,
            Err(RecvTimeoutError::Timeout) => {
                return Err(Error::DetectorLost(format!(
                    "no response within {} ms",
                    self.timeout.as_millis()
                )))
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(Error::DetectorLost("detector exited".into()))
            }
        };
        let (width, height) = frame.dimensions();
        parse_detection(&line, width, height, self.min_confidence)
    }
}

impl Drop for MediaPipeDetector {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

/// Decode one response line into pixel landmarks for the best hand above `min_confidence`.
fn parse_detection(line: &str, width: u32, height: u32, min_confidence: f32) -> Result<HandLandmarks> {
    let result: DetectionJson = serde_json::from_str(line.trim())?;
    if let Some(error) = result.error {
        return Err(Error::Detector(error));
    }

    let Some(hand) = result
        .hands
        .into_iter()
        .filter(|h| h.score >= min_confidence)
        .max_by(|a, b| a.score.total_cmp(&b.score))
    else {
        return Ok(HandLandmarks::empty());
    };

    if hand.landmarks.len() > landmarks::COUNT {
        warn!("Expected at most {} landmarks, got {}", landmarks::COUNT, hand.landmarks.len());
    }

    let lms = hand
        .landmarks
        .iter()
        .take(landmarks::COUNT)
        .enumerate()
        .map(|(id, lm)| {
            Landmark::new(
                id as u8,
                (lm.x * width as f32) as i32,
                (lm.y * height as f32) as i32,
            )
        })
        .collect();
    debug!("Hand detected (score {:.2})", hand.score);
    Ok(HandLandmarks::new(lms))
}

/// Replays a fixed sequence of detections, then reports no hand.
/// Stands in for the real detector when MediaPipe is unavailable.
#[derive(Debug, Default)]
pub struct ScriptedDetector {
    frames: VecDeque<HandLandmarks>,
}

impl ScriptedDetector {
    pub fn new(frames: impl IntoIterator<Item = HandLandmarks>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl HandDetector for ScriptedDetector {
    fn detect(&mut self, _frame: &RgbImage) -> Result<HandLandmarks> {
        Ok(self.frames.pop_front().unwrap_or_default())
    }
}
