use glam::Vec2;

use crate::types::Gesture;

pub const NUM_LANDMARKS: usize = 21;

const WRIST: usize = 0;
const THUMB_TIP: usize = 4;
const INDEX_TIP: usize = 8;
const MIDDLE_BASE: usize = 9;
const MIDDLE_TIP: usize = 12;
const RING_TIP: usize = 16;
const PINKY_TIP: usize = 20;

const FINGER_TIPS: [usize; 5] = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];
const FOLD_THRESHOLDS: [f32; 5] = [0.3, 0.25, 0.25, 0.25, 0.25];

const PINCH_THRESHOLD: f32 = 0.08;
/// Weight of the newest raw palm sample in the exponential smoothing.
const PALM_SMOOTHING: f32 = 0.3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureSample {
    pub gesture: Gesture,
    pub palm: Vec2,
}

/// Turns 21 normalized hand landmarks into a gesture plus a smoothed palm position.
///
/// The only state carried between frames is the smoothed palm.
pub struct GestureClassifier {
    palm: Vec2,
}

impl GestureClassifier {
    pub fn new() -> Self {
        Self {
            palm: Vec2::new(0.5, 0.5),
        }
    }

    pub fn classify(&mut self, landmarks: &[Vec2]) -> Option<GestureSample> {
        if landmarks.len() < NUM_LANDMARKS {
            return None;
        }

        let raw = raw_palm_position(landmarks);
        self.palm = raw * PALM_SMOOTHING + self.palm * (1.0 - PALM_SMOOTHING);

        Some(GestureSample {
            gesture: classify_pose(landmarks),
            palm: self.palm,
        })
    }
}

impl Default for GestureClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Mirrored average of the wrist and the middle-finger base.
fn raw_palm_position(landmarks: &[Vec2]) -> Vec2 {
    let wrist = landmarks[WRIST];
    let base = landmarks[MIDDLE_BASE];
    Vec2::new(1.0 - (wrist.x + base.x) * 0.5, (wrist.y + base.y) * 0.5)
}

/// Folded flags in thumb, index, middle, ring, pinky order.
fn folded_fingers(landmarks: &[Vec2]) -> [bool; 5] {
    let wrist = landmarks[WRIST];
    let mut folded = [false; 5];
    for (slot, (&tip, &threshold)) in folded
        .iter_mut()
        .zip(FINGER_TIPS.iter().zip(FOLD_THRESHOLDS.iter()))
    {
        *slot = landmarks[tip].distance(wrist) < threshold;
    }
    folded
}

/// Stateless pose classification, first match wins: pinch, peace, fist, open.
pub fn classify_pose(landmarks: &[Vec2]) -> Gesture {
    let folded = folded_fingers(landmarks);
    let [_thumb, index, middle, ring, pinky] = folded;

    let pinch = landmarks[THUMB_TIP].distance(landmarks[INDEX_TIP]) < PINCH_THRESHOLD;
    let peace = !index && !middle && ring && pinky && !pinch;
    let fist = index && middle && ring && pinky;

    match (pinch, peace, fist) {
        (true, _, _) => Gesture::Pinch,
        (_, true, _) => Gesture::Peace,
        (_, _, true) => Gesture::Fist,
        _ => Gesture::Open,
    }
}

/// Detects the pinch rising edge so a held pinch fires only once.
#[derive(Debug, Default)]
pub struct PinchLatch {
    was_pinching: bool,
}

impl PinchLatch {
    /// Returns true only on the frame the pinch starts.
    pub fn update(&mut self, gesture: Gesture) -> bool {
        let pinching = gesture == Gesture::Pinch;
        let rising = pinching && !self.was_pinching;
        self.was_pinching = pinching;
        rising
    }
}
