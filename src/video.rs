// src/video.rs - Frame sources: live camera and in-memory sequences
use std::collections::VecDeque;

use image::{imageops, RgbImage};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;
use tracing::{debug, info};

use crate::config::DrawConfig;
use crate::error::{Error, Result};

pub trait FrameSource {
    /// Next frame at the session resolution, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

/// Resize to the session resolution and optionally mirror, so the picture
/// behaves like a mirror for the person drawing.
pub fn prepare_frame(frame: RgbImage, width: u32, height: u32, mirror: bool) -> RgbImage {
    let frame = if frame.dimensions() == (width, height) {
        frame
    } else {
        imageops::resize(&frame, width, height, imageops::FilterType::Triangle)
    };
    if mirror {
        imageops::flip_horizontal(&frame)
    } else {
        frame
    }
}

pub struct CameraSource {
    camera: Camera,
    width: u32,
    height: u32,
    mirror: bool,
}

impl CameraSource {
    pub fn open(config: &DrawConfig) -> Result<Self> {
        info!("Opening camera {} at {}x{}", config.camera_index, config.width, config.height);

        let format = CameraFormat::new(
            Resolution::new(config.width, config.height),
            FrameFormat::MJPEG,
            config.target_fps,
        );
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

        let mut camera = Camera::new(CameraIndex::Index(config.camera_index), requested)
            .map_err(|e| Error::CaptureUnavailable(format!("Failed to open camera: {}", e)))?;
        camera
            .open_stream()
            .map_err(|e| Error::CaptureUnavailable(format!("Failed to open camera stream: {}", e)))?;

        let actual = camera.resolution();
        info!("Camera delivering {}x{}", actual.width(), actual.height());

        Ok(Self {
            camera,
            width: config.width,
            height: config.height,
            mirror: config.mirror,
        })
    }

    pub fn name(&self) -> String {
        self.camera.info().human_name()
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        if !self.camera.is_stream_open() {
            return Err(Error::CaptureUnavailable("camera stream closed".into()));
        }

        let frame = self
            .camera
            .frame()
            .map_err(|e| Error::CaptureFrame(format!("Failed to capture frame: {}", e)))?;
        let decoded = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::CaptureFrame(format!("Failed to decode frame: {}", e)))?;

        Ok(Some(prepare_frame(decoded, self.width, self.height, self.mirror)))
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            debug!("Stopping camera stream: {}", e);
        }
    }
}

/// Plays back frames held in memory, then reports end of stream.
#[derive(Debug, Default)]
pub struct FrameSequence {
    frames: VecDeque<RgbImage>,
}

impl FrameSequence {
    pub fn new(frames: impl IntoIterator<Item = RgbImage>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl FrameSource for FrameSequence {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        Ok(self.frames.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn frames_are_resized_and_mirrored() {
        let mut src = RgbImage::new(4, 2);
        src.put_pixel(0, 0, Rgb([255, 0, 0]));

        let same = prepare_frame(src.clone(), 4, 2, true);
        assert_eq!(*same.get_pixel(3, 0), Rgb([255, 0, 0]));
        assert_eq!(*same.get_pixel(0, 0), Rgb([0, 0, 0]));

        let resized = prepare_frame(src, 8, 4, false);
        assert_eq!(resized.dimensions(), (8, 4));
    }

    #[test]
    fn sequence_ends() {
        let mut seq = FrameSequence::new([RgbImage::new(2, 2)]);
        assert!(seq.next_frame().unwrap().is_some());
        assert!(seq.next_frame().unwrap().is_none());
    }
}
