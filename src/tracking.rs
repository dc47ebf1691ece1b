// src/tracking.rs - Hand landmarks and finger extension classification
use std::collections::VecDeque;
use std::time::Instant;

use crate::canvas::Point;

/// Hand landmark ids (MediaPipe 21-point hand model).
#[allow(dead_code)]
pub mod landmarks {
    pub const WRIST: u8 = 0;
    pub const THUMB_CMC: u8 = 1;
    pub const THUMB_MCP: u8 = 2;
    pub const THUMB_IP: u8 = 3;
    pub const THUMB_TIP: u8 = 4;
    pub const INDEX_FINGER_MCP: u8 = 5;
    pub const INDEX_FINGER_PIP: u8 = 6;
    pub const INDEX_FINGER_DIP: u8 = 7;
    pub const INDEX_FINGER_TIP: u8 = 8;
    pub const MIDDLE_FINGER_MCP: u8 = 9;
    pub const MIDDLE_FINGER_PIP: u8 = 10;
    pub const MIDDLE_FINGER_DIP: u8 = 11;
    pub const MIDDLE_FINGER_TIP: u8 = 12;
    pub const RING_FINGER_MCP: u8 = 13;
    pub const RING_FINGER_PIP: u8 = 14;
    pub const RING_FINGER_DIP: u8 = 15;
    pub const RING_FINGER_TIP: u8 = 16;
    pub const PINKY_MCP: u8 = 17;
    pub const PINKY_PIP: u8 = 18;
    pub const PINKY_DIP: u8 = 19;
    pub const PINKY_TIP: u8 = 20;

    pub const COUNT: usize = 21;

    /// Bone connections of the hand skeleton, for display.
    pub const CONNECTIONS: [(u8, u8); 21] = [
        (0, 1), (1, 2), (2, 3), (3, 4),
        (0, 5), (5, 6), (6, 7), (7, 8),
        (5, 9), (9, 10), (10, 11), (11, 12),
        (9, 13), (13, 14), (14, 15), (15, 16),
        (13, 17), (17, 18), (18, 19), (19, 20),
        (0, 17),
    ];
}

/// One detected keypoint in pixel coordinates of the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Landmark {
    pub id: u8,
    pub x: i32,
    pub y: i32,
}

impl Landmark {
    pub fn new(id: u8, x: i32, y: i32) -> Self {
        Self { id, x, y }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Landmarks of the single tracked hand for one frame. Empty when no hand was found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandLandmarks {
    pub landmarks: Vec<Landmark>,
}

impl HandLandmarks {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// Look a landmark up by id. Detectors emit them in id order, so try the
    /// positional slot first and fall back to a scan.
    pub fn get(&self, id: u8) -> Option<&Landmark> {
        match self.landmarks.get(id as usize) {
            Some(lm) if lm.id == id => Some(lm),
            _ => self.landmarks.iter().find(|lm| lm.id == id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    pub fn tip(self) -> u8 {
        match self {
            Finger::Thumb => landmarks::THUMB_TIP,
            Finger::Index => landmarks::INDEX_FINGER_TIP,
            Finger::Middle => landmarks::MIDDLE_FINGER_TIP,
            Finger::Ring => landmarks::RING_FINGER_TIP,
            Finger::Pinky => landmarks::PINKY_TIP,
        }
    }

    /// The joint two steps closer to the palm than the tip.
    pub fn reference_joint(self) -> u8 {
        self.tip() - 2
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Which digits are extended, in thumb..pinky order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct FingerState(pub [bool; 5]);

impl FingerState {
    pub fn from_bits(bits: u8) -> Self {
        let mut fingers = [false; 5];
        for (i, f) in fingers.iter_mut().enumerate() {
            *f = bits & (1 << i) != 0;
        }
        Self(fingers)
    }

    pub fn is_extended(&self, finger: Finger) -> bool {
        self.0[finger.index()]
    }
}

impl From<[u8; 5]> for FingerState {
    fn from(v: [u8; 5]) -> Self {
        Self(v.map(|f| f != 0))
    }
}

/// Classifier output for a frame in which a hand was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HandPose {
    pub fingers: FingerState,
    /// Pixel position of each extended fingertip, `None` for curled digits.
    pub tips: [Option<Point>; 5],
}

impl HandPose {
    pub fn tip(&self, finger: Finger) -> Option<Point> {
        self.tips[finger.index()]
    }
}

/// Classify finger extension. Returns `None` when no hand was detected.
///
/// The thumb is extended when its tip lies left of its MCP joint (the frame
/// is mirrored); the other digits are extended when the tip is above the PIP
/// joint in image space. A digit whose tip or reference joint is missing is
/// treated as curled.
pub fn classify(hand: &HandLandmarks) -> Option<HandPose> {
    if hand.is_empty() {
        return None;
    }

    let mut pose = HandPose::default();
    for finger in Finger::ALL {
        let (Some(tip), Some(joint)) = (hand.get(finger.tip()), hand.get(finger.reference_joint()))
        else {
            continue;
        };

        let extended = match finger {
            Finger::Thumb => tip.x < joint.x,
            _ => tip.y < joint.y,
        };
        if extended {
            pose.fingers.0[finger.index()] = true;
            pose.tips[finger.index()] = Some(tip.point());
        }
    }
    Some(pose)
}

/// Rolling frame timing, averaged over the last 30 frames.
#[derive(Debug, Clone)]
pub struct FrameMetrics {
    pub avg_fps: f32,
    pub avg_processing_time: f32,
    frame_times: VecDeque<f32>,
    last_frame: Option<Instant>,
}

impl Default for FrameMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameMetrics {
    const WINDOW: usize = 30;

    pub fn new() -> Self {
        Self {
            avg_fps: 0.0,
            avg_processing_time: 0.0,
            frame_times: VecDeque::with_capacity(Self::WINDOW),
            last_frame: None,
        }
    }

    /// Mark the start of a frame; the interval since the previous mark feeds the FPS average.
    pub fn tick(&mut self) {
        let now = Instant::now();
        if let Some(prev) = self.last_frame.replace(now) {
            self.record(now.duration_since(prev).as_secs_f32());
        }
    }

    pub fn record(&mut self, elapsed: f32) {
        self.frame_times.push_front(elapsed);
        if self.frame_times.len() > Self::WINDOW {
            self.frame_times.pop_back();
        }

        self.avg_processing_time =
            self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;
        self.avg_fps = if self.avg_processing_time > 0.0 {
            1.0 / self.avg_processing_time
        } else {
            0.0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A relaxed hand: every tip sits below its reference joint and the thumb
    /// tip is right of its MCP, so nothing counts as extended.
    fn curled_hand() -> Vec<Landmark> {
        (0..landmarks::COUNT as u8)
            .map(|id| Landmark::new(id, 200 + id as i32, 300 + id as i32 * 5))
            .collect()
    }

    fn extend(hand: &mut [Landmark], finger: Finger) {
        let joint = hand[finger.reference_joint() as usize];
        let tip = &mut hand[finger.tip() as usize];
        match finger {
            Finger::Thumb => tip.x = joint.x - 30,
            _ => tip.y = joint.y - 40,
        }
    }

    #[test]
    fn no_hand_means_no_pose() {
        assert_eq!(classify(&HandLandmarks::empty()), None);
    }

    #[test]
    fn curled_hand_has_no_extended_fingers() {
        let pose = classify(&HandLandmarks::new(curled_hand())).unwrap();
        assert_eq!(pose.fingers, FingerState([false; 5]));
        assert!(pose.tips.iter().all(Option::is_none));
    }

    #[test]
    fn thumb_uses_x_and_others_use_y() {
        let mut hand = curled_hand();
        extend(&mut hand, Finger::Thumb);
        extend(&mut hand, Finger::Index);

        let pose = classify(&HandLandmarks::new(hand.clone())).unwrap();
        assert_eq!(pose.fingers, FingerState::from([1, 1, 0, 0, 0]));
        assert_eq!(pose.tip(Finger::Index), Some(hand[8].point()));
        assert_eq!(pose.tip(Finger::Thumb), Some(hand[4].point()));
        assert_eq!(pose.tip(Finger::Middle), None);
    }

    #[test]
    fn thumb_raised_vertically_is_not_extended() {
        let mut hand = curled_hand();
        hand[4].y = hand[2].y - 100;
        let pose = classify(&HandLandmarks::new(hand)).unwrap();
        assert!(!pose.fingers.is_extended(Finger::Thumb));
    }

    #[test]
    fn equal_coordinates_are_not_extended() {
        let mut hand = curled_hand();
        hand[8].y = hand[6].y;
        let pose = classify(&HandLandmarks::new(hand)).unwrap();
        assert!(!pose.fingers.is_extended(Finger::Index));
    }

    #[test]
    fn missing_landmarks_count_as_curled() {
        let mut hand = curled_hand();
        extend(&mut hand, Finger::Index);
        extend(&mut hand, Finger::Pinky);
        hand.retain(|lm| lm.id != landmarks::PINKY_PIP);

        let pose = classify(&HandLandmarks::new(hand)).unwrap();
        assert!(pose.fingers.is_extended(Finger::Index));
        assert!(!pose.fingers.is_extended(Finger::Pinky));
    }

    #[test]
    fn lookup_by_id_tolerates_gaps() {
        let hand = HandLandmarks::new(vec![Landmark::new(4, 1, 1), Landmark::new(8, 2, 2)]);
        assert_eq!(hand.get(8), Some(&Landmark::new(8, 2, 2)));
        assert_eq!(hand.get(0), None);
    }

    #[test]
    fn finger_state_bits() {
        let s = FingerState::from_bits(0b00011);
        assert_eq!(s, FingerState::from([1, 1, 0, 0, 0]));
    }

    #[test]
    fn metrics_average() {
        let mut m = FrameMetrics::new();
        m.record(0.02);
        m.record(0.04);
        assert!((m.avg_processing_time - 0.03).abs() < 1e-6);
        assert!((m.avg_fps - 33.333).abs() < 0.01);
    }
}
