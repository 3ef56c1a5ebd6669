pub mod camera;
pub mod recognizer;
pub mod rgba_converter;
pub mod skeleton;

pub use camera::{CameraStream, start_camera_stream};
pub use recognizer::{RecognizerBackend, RecognizerMessage, start_recognizer};

/// Startup failures that switch hand tracking off for the rest of the session.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InitError {
    #[error("no camera detected")]
    NoCamera,
    #[error("camera {index} could not be opened: {reason}")]
    CameraOpen { index: u32, reason: String },
    #[error("hand model unavailable: {0}")]
    ModelUnavailable(String),
}

impl InitError {
    /// Short fixed text for the status line.
    pub fn status_message(&self) -> &'static str {
        match self {
            InitError::NoCamera => "No camera found. Gestures are off.",
            InitError::CameraOpen { .. } => "Camera could not be opened. Gestures are off.",
            InitError::ModelUnavailable(_) => "Hand model failed to load. Gestures are off.",
        }
    }
}
