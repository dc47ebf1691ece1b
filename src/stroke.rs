// src/stroke.rs - Pen cursor and stroke accumulation on the overlay canvas
use image::Rgb;
use tracing::{debug, trace};

use crate::canvas::{OverlayCanvas, Point, BACKGROUND};
use crate::config::DrawConfig;
use crate::gesture::Gesture;
use crate::tracking::{Finger, HandPose};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Brush {
    pub color: Rgb<u8>,
    pub thickness: u32,
}

/// Last pen-down position of the current stroke; `None` between strokes.
pub type PenCursor = Option<Point>;

#[derive(Debug, Clone)]
pub struct StrokeTracker {
    cursor: PenCursor,
    ink: Brush,
    eraser: Brush,
}

impl StrokeTracker {
    pub fn new(ink: Brush, eraser: Brush) -> Self {
        Self {
            cursor: None,
            ink,
            eraser,
        }
    }

    pub fn from_config(config: &DrawConfig) -> Self {
        Self::new(
            Brush {
                color: Rgb(config.ink_color),
                thickness: config.ink_thickness,
            },
            Brush {
                color: BACKGROUND,
                thickness: config.eraser_thickness,
            },
        )
    }

    pub fn cursor(&self) -> PenCursor {
        self.cursor
    }

    pub fn lift(&mut self) {
        self.cursor = None;
    }

    /// Apply one frame's gesture to the canvas.
    ///
    /// Draw and Erase connect the previous cursor to the current fingertip,
    /// seeding the cursor first when no stroke is in progress. Every other
    /// gesture, including no hand at all, lifts the pen. A stroke fingertip
    /// that is unexpectedly missing skips the frame and leaves the cursor alone.
    pub fn apply(&mut self, gesture: Gesture, pose: Option<&HandPose>, canvas: &mut OverlayCanvas) {
        let (finger, brush) = match gesture {
            Gesture::Draw => (Finger::Index, self.ink),
            Gesture::Erase => (Finger::Middle, self.eraser),
            Gesture::Clear => {
                canvas.clear();
                self.lift();
                debug!("Canvas cleared");
                return;
            }
            Gesture::Pan | Gesture::Analyze | Gesture::None => {
                self.lift();
                return;
            }
        };

        let Some(tip) = pose.and_then(|p| p.tip(finger)) else {
            debug!("{:?} without a {:?} fingertip, skipping frame", gesture, finger);
            return;
        };

        let from = *self.cursor.get_or_insert(tip);
        canvas.draw_line(from, tip, brush.color, brush.thickness);
        trace!("{:?} segment {:?} -> {:?}", gesture, from, tip);
        self.cursor = Some(tip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::FingerState;

    const INK: Rgb<u8> = Rgb([255, 0, 255]);

    fn tracker() -> StrokeTracker {
        StrokeTracker::new(
            Brush { color: INK, thickness: 1 },
            Brush { color: BACKGROUND, thickness: 5 },
        )
    }

    fn pose(finger: Finger, x: i32, y: i32) -> HandPose {
        let mut p = HandPose {
            fingers: FingerState::default(),
            tips: [None; 5],
        };
        p.fingers.0[finger.index()] = true;
        p.tips[finger.index()] = Some(Point::new(x, y));
        p
    }

    #[test]
    fn first_draw_frame_seeds_the_cursor() {
        let mut canvas = OverlayCanvas::new(50, 50);
        let mut t = tracker();
        t.apply(Gesture::Draw, Some(&pose(Finger::Index, 30, 30)), &mut canvas);

        assert_eq!(t.cursor(), Some(Point::new(30, 30)));
        assert_eq!(canvas.pixel(30, 30), INK);
        assert_eq!(canvas.pixel(0, 0), BACKGROUND);
    }

    #[test]
    fn erase_uses_middle_finger_and_background() {
        let mut canvas = OverlayCanvas::new(50, 50);
        canvas.draw_line(Point::new(0, 20), Point::new(49, 20), INK, 3);

        let mut t = tracker();
        t.apply(Gesture::Erase, Some(&pose(Finger::Middle, 10, 20)), &mut canvas);
        t.apply(Gesture::Erase, Some(&pose(Finger::Middle, 30, 20)), &mut canvas);

        assert_eq!(canvas.pixel(20, 20), BACKGROUND);
        assert_eq!(canvas.pixel(40, 20), INK);
    }

    #[test]
    fn switching_draw_to_erase_keeps_the_cursor() {
        let mut canvas = OverlayCanvas::new(50, 50);
        canvas.draw_line(Point::new(0, 40), Point::new(49, 40), INK, 1);

        let mut t = tracker();
        t.apply(Gesture::Draw, Some(&pose(Finger::Index, 10, 10)), &mut canvas);
        t.apply(Gesture::Erase, Some(&pose(Finger::Middle, 10, 40)), &mut canvas);

        // The eraser's first segment starts at the last ink point.
        assert_eq!(canvas.pixel(10, 10), BACKGROUND);
        assert_eq!(canvas.pixel(10, 25), BACKGROUND);
        assert_eq!(canvas.pixel(10, 40), BACKGROUND);
        assert_eq!(canvas.pixel(30, 40), INK);
        assert_eq!(t.cursor(), Some(Point::new(10, 40)));
    }

    #[test]
    fn non_stroke_gestures_lift_the_pen() {
        for g in [Gesture::Pan, Gesture::Analyze, Gesture::None] {
            let mut canvas = OverlayCanvas::new(50, 50);
            let mut t = tracker();
            t.apply(Gesture::Draw, Some(&pose(Finger::Index, 5, 5)), &mut canvas);
            t.apply(g, None, &mut canvas);
            assert_eq!(t.cursor(), None, "{g:?} should lift the pen");
        }
    }

    #[test]
    fn clear_wipes_and_lifts() {
        let mut canvas = OverlayCanvas::new(50, 50);
        let mut t = tracker();
        t.apply(Gesture::Draw, Some(&pose(Finger::Index, 5, 5)), &mut canvas);
        t.apply(Gesture::Draw, Some(&pose(Finger::Index, 40, 40)), &mut canvas);
        t.apply(Gesture::Clear, None, &mut canvas);

        assert!(canvas.is_blank());
        assert_eq!(t.cursor(), None);
    }

    #[test]
    fn missing_fingertip_skips_without_touching_state() {
        let mut canvas = OverlayCanvas::new(50, 50);
        let mut t = tracker();
        t.apply(Gesture::Draw, Some(&pose(Finger::Index, 5, 5)), &mut canvas);
        let before = canvas.clone();

        t.apply(Gesture::Draw, Some(&pose(Finger::Ring, 40, 40)), &mut canvas);
        t.apply(Gesture::Draw, None, &mut canvas);

        assert_eq!(canvas, before);
        assert_eq!(t.cursor(), Some(Point::new(5, 5)));
    }

    #[test]
    fn config_brushes() {
        let t = StrokeTracker::from_config(&DrawConfig::default());
        assert_eq!(t.ink, Brush { color: Rgb([255, 0, 255]), thickness: 5 });
        assert_eq!(t.eraser, Brush { color: BACKGROUND, thickness: 15 });
    }
}
