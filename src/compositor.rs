// src/compositor.rs - Overlay + live feed blending and hand annotation
use image::{imageops, Rgb, RgbImage};

use crate::canvas::{draw_circle, draw_line, fill_disc, OverlayCanvas, Point};
use crate::config::DrawConfig;
use crate::tracking::{landmarks, HandLandmarks, HandPose};

const SKELETON_BONE: Rgb<u8> = Rgb([224, 224, 224]);
const SKELETON_JOINT: Rgb<u8> = Rgb([255, 0, 0]);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendParams {
    pub live_weight: f32,
    pub overlay_weight: f32,
    /// Overlay pixels whose intensity is above this are ink.
    pub ink_threshold: u8,
}

impl Default for BlendParams {
    fn default() -> Self {
        Self {
            live_weight: 0.7,
            overlay_weight: 1.0,
            ink_threshold: 50,
        }
    }
}

impl From<&DrawConfig> for BlendParams {
    fn from(config: &DrawConfig) -> Self {
        Self {
            live_weight: config.live_weight,
            overlay_weight: config.overlay_weight,
            ink_threshold: config.ink_threshold,
        }
    }
}

/// Luma with the fixed-point BT.601 weights (14-bit, rounded).
#[inline]
pub fn intensity(p: &Rgb<u8>) -> u8 {
    let [r, g, b] = p.0;
    ((r as u32 * 4899 + g as u32 * 9617 + b as u32 * 1868 + 8192) >> 14) as u8
}

#[inline]
fn weighted(a: u8, wa: f32, b: u8, wb: f32) -> u8 {
    (a as f32 * wa + b as f32 * wb).round().clamp(0.0, 255.0) as u8
}

/// Build the displayed frame.
///
/// 1. blend = live * live_weight + overlay * overlay_weight (saturating)
/// 2. mask  = 0 where the overlay has ink, 255 elsewhere
/// 3. out   = (blend & mask) | overlay
///
/// Ink therefore shows at its true colour and the rest is the dimmed feed.
pub fn composite(live: &RgbImage, overlay: &OverlayCanvas, params: BlendParams) -> RgbImage {
    let (w, h) = overlay.dimensions();
    let resized;
    let live = if live.dimensions() == (w, h) {
        live
    } else {
        resized = imageops::resize(live, w, h, imageops::FilterType::Triangle);
        &resized
    };

    let mut out = RgbImage::new(w, h);
    for ((dst, l), o) in out
        .pixels_mut()
        .zip(live.pixels())
        .zip(overlay.image().pixels())
    {
        let mask: u8 = if intensity(o) > params.ink_threshold { 0 } else { 255 };
        for c in 0..3 {
            let blended = weighted(l[c], params.live_weight, o[c], params.overlay_weight);
            dst[c] = (blended & mask) | o[c];
        }
    }
    out
}

/// Draw the hand skeleton and a hollow marker on each extended fingertip.
/// Display only; the overlay canvas is never touched.
pub fn annotate_hand(
    frame: &mut RgbImage,
    hand: &HandLandmarks,
    pose: Option<&HandPose>,
    config: &DrawConfig,
) {
    if hand.is_empty() {
        return;
    }

    for (a, b) in landmarks::CONNECTIONS {
        if let (Some(a), Some(b)) = (hand.get(a), hand.get(b)) {
            draw_line(frame, a.point(), b.point(), SKELETON_BONE, 2);
        }
    }
    for lm in &hand.landmarks {
        fill_disc(frame, lm.point(), 2.0, SKELETON_JOINT);
    }

    if let Some(pose) = pose {
        let marker = Rgb(config.marker_color);
        for tip in pose.tips.iter().flatten() {
            draw_circle(frame, Point::new(tip.x, tip.y), config.marker_radius as i32, marker);
        }
    }
}
