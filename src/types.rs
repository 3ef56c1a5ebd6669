use std::time::Instant;

use glam::Vec2;

#[derive(Clone, Debug)]
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

impl Frame {
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            rgba: vec![0; width as usize * height as usize * 4],
            width,
            height,
            timestamp: Instant::now(),
        }
    }
}

/// Discrete hand gesture for one inference frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gesture {
    Pinch,
    Fist,
    Peace,
    Open,
    NoHand,
}

impl Gesture {
    pub fn label(&self) -> &'static str {
        match self {
            Gesture::Pinch => "pinch",
            Gesture::Fist => "fist",
            Gesture::Peace => "peace",
            Gesture::Open => "open palm",
            Gesture::NoHand => "no hand",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Gesture::Pinch => "🤏 ",
            Gesture::Fist => "✊ ",
            Gesture::Peace => "✌️ ",
            Gesture::Open => "🖐 ",
            Gesture::NoHand => "⋯ ",
        }
    }
}

#[derive(Clone, Debug)]
pub struct HandReading {
    pub gesture: Gesture,
    /// Smoothed, mirrored palm position in normalized frame units.
    pub palm: Vec2,
    pub confidence: f32,
    /// Landmarks in frame pixels, used for the preview overlay.
    pub landmarks: Vec<(f32, f32)>,
}

#[derive(Clone, Debug)]
pub struct RecognizedFrame {
    pub frame: Frame,
    pub hand: Option<HandReading>,
}

impl RecognizedFrame {
    pub fn gesture(&self) -> Gesture {
        self.hand
            .as_ref()
            .map(|hand| hand.gesture)
            .unwrap_or(Gesture::NoHand)
    }
}

#[derive(Clone, Debug)]
pub struct PalmRegion {
    pub bbox: [f32; 4],
    pub landmarks: Vec<(f32, f32)>,
    pub score: f32,
}
