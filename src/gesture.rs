// src/gesture.rs - Finger pattern to drawing action
use crate::tracking::FingerState;

/// The action selected for a frame. At most one is active per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    /// Thumb + index: ink follows the index fingertip.
    Draw,
    /// Thumb + middle: background-coloured brush follows the middle fingertip.
    Erase,
    /// Thumb + index + middle: move without drawing.
    Pan,
    /// Thumb + pinky: wipe the canvas.
    Clear,
    /// Index + middle: send the canvas for analysis.
    Analyze,
    None,
}

impl Gesture {
    pub const ACTIONS: [Gesture; 5] = [
        Gesture::Draw,
        Gesture::Pan,
        Gesture::Erase,
        Gesture::Clear,
        Gesture::Analyze,
    ];

    /// Exact-set match on the extended fingers; subsets never match, so
    /// thumb + index + middle is Pan and never Draw.
    pub fn resolve(fingers: FingerState) -> Gesture {
        match fingers.0 {
            [true, true, false, false, false] => Gesture::Draw,
            [true, true, true, false, false] => Gesture::Pan,
            [true, false, true, false, false] => Gesture::Erase,
            [true, false, false, false, true] => Gesture::Clear,
            [false, true, true, false, false] => Gesture::Analyze,
            _ => Gesture::None,
        }
    }

    /// Resolve for a frame that may have no hand at all.
    pub fn from_pose(fingers: Option<FingerState>) -> Gesture {
        fingers.map_or(Gesture::None, Gesture::resolve)
    }

    pub fn label(self) -> &'static str {
        match self {
            Gesture::Draw => "Drawing",
            Gesture::Erase => "Erasing",
            Gesture::Pan => "Moving",
            Gesture::Clear => "Clearing",
            Gesture::Analyze => "Analyzing",
            Gesture::None => "Idle",
        }
    }
}

/// Finger combination and description for each gesture, as shown to the user.
pub const GESTURE_LEGEND: [(Gesture, &str, &str); 5] = [
    (Gesture::Draw, "Thumb + Index", "Start drawing"),
    (Gesture::Erase, "Thumb + Middle", "Erase drawing"),
    (Gesture::Pan, "Thumb + Index + Middle", "Move without drawing"),
    (Gesture::Clear, "Thumb + Pinky", "Clear canvas"),
    (Gesture::Analyze, "Index + Middle", "Analyze/Calculate"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_table() {
        assert_eq!(Gesture::resolve([1, 1, 0, 0, 0].into()), Gesture::Draw);
        assert_eq!(Gesture::resolve([1, 1, 1, 0, 0].into()), Gesture::Pan);
        assert_eq!(Gesture::resolve([1, 0, 1, 0, 0].into()), Gesture::Erase);
        assert_eq!(Gesture::resolve([1, 0, 0, 0, 1].into()), Gesture::Clear);
        assert_eq!(Gesture::resolve([0, 1, 1, 0, 0].into()), Gesture::Analyze);
    }

    #[test]
    fn every_combination_maps_to_at_most_one_action() {
        let mut hits = std::collections::HashMap::new();
        for bits in 0u8..32 {
            let fingers = FingerState::from_bits(bits);
            let g = Gesture::resolve(fingers);
            if g != Gesture::None {
                assert!(
                    hits.insert(g, bits).is_none(),
                    "{g:?} matched more than one finger pattern"
                );
            }
        }
        assert_eq!(hits.len(), Gesture::ACTIONS.len());
    }

    #[test]
    fn supersets_do_not_match() {
        assert_eq!(Gesture::resolve([1, 1, 0, 0, 1].into()), Gesture::None);
        assert_eq!(Gesture::resolve([1, 1, 1, 1, 0].into()), Gesture::None);
        assert_eq!(Gesture::resolve([1, 1, 1, 1, 1].into()), Gesture::None);
        assert_eq!(Gesture::resolve([0, 1, 1, 1, 0].into()), Gesture::None);
    }

    #[test]
    fn no_hand_is_none() {
        assert_eq!(Gesture::from_pose(None), Gesture::None);
        assert_eq!(Gesture::from_pose(Some(FingerState::default())), Gesture::None);
    }

    #[test]
    fn legend_lists_every_action_once() {
        for g in Gesture::ACTIONS {
            assert_eq!(GESTURE_LEGEND.iter().filter(|(lg, _, _)| *lg == g).count(), 1);
        }
    }
}
