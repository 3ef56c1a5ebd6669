use std::time::{Duration, Instant};

use crate::{
    model_download::{ModelDownloadEvent, ModelKind},
    pipeline::InitError,
    scene::{Notice, VisualState},
    types::Gesture,
};

/// How long a transition notice stays up before live readings replace it.
const NOTICE_HOLD: Duration = Duration::from_millis(2500);
const BAR_LEN: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusLevel {
    Loading,
    Ready,
    Warning,
    Error,
}

impl StatusLevel {
    /// Indicator dot color.
    pub fn color(self) -> u32 {
        match self {
            StatusLevel::Loading => 0x60a5fa,
            StatusLevel::Ready => 0x22c55e,
            StatusLevel::Warning => 0xf59e0b,
            StatusLevel::Error => 0xef4444,
        }
    }
}

/// The one-line status under the scene.
#[derive(Clone, Debug)]
pub struct StatusLine {
    level: StatusLevel,
    text: String,
    hold_until: Option<Instant>,
    /// Startup failure; its color stays on the dot and its text returns after notices.
    error: Option<&'static str>,
}

impl StatusLine {
    pub fn new(level: StatusLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            hold_until: None,
            error: None,
        }
    }

    pub fn level(&self) -> StatusLevel {
        self.level
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn set(&mut self, level: StatusLevel, text: impl Into<String>) {
        if self.error.is_some() {
            return;
        }
        self.level = level;
        self.text = text.into();
    }

    fn hold(&mut self, level: StatusLevel, text: impl Into<String>, now: Instant) {
        self.set(level, text);
        self.hold_until = Some(now + NOTICE_HOLD);
    }

    pub fn on_download(&mut self, event: &ModelDownloadEvent) {
        let model = event.model();
        let step = model_step(model);
        let text = match event {
            ModelDownloadEvent::Started { total, .. } => {
                format!("Downloading {} model {step} {}", model.label(), progress_text(0, *total))
            }
            ModelDownloadEvent::Progress {
                downloaded, total, ..
            } => format!(
                "Downloading {} model {step} {}",
                model.label(),
                progress_text(*downloaded, *total)
            ),
            ModelDownloadEvent::AlreadyPresent { .. } | ModelDownloadEvent::Finished { .. } => {
                format!("Loading {} model {step}", model.label())
            }
        };
        self.set(StatusLevel::Loading, text);
    }

    pub fn on_ready(&mut self) {
        self.set(StatusLevel::Ready, "Hand tracking ready, show your hand");
    }

    pub fn on_error(&mut self, err: &InitError) {
        let message = err.status_message();
        self.error = Some(message);
        self.level = StatusLevel::Error;
        self.text = message.to_string();
        self.hold_until = None;
    }

    pub fn on_notice(&mut self, notice: &Notice, now: Instant) {
        let level = if notice.is_warning() {
            StatusLevel::Warning
        } else {
            StatusLevel::Ready
        };
        self.hold(level, notice.message(), now);
    }

    /// Shown even after a startup failure; `tick` brings the error text back.
    pub fn on_photo_added(&mut self, name: &str, total: usize, now: Instant) {
        let text = format!("Added {name} ({total} photo{})", if total == 1 { "" } else { "s" });
        if self.error.is_some() {
            self.text = text;
            self.hold_until = Some(now + NOTICE_HOLD);
        } else {
            self.hold(StatusLevel::Ready, text, now);
        }
    }

    /// Restores the error text once a notice shown over it has expired.
    pub fn tick(&mut self, now: Instant) {
        let Some(error) = self.error else {
            return;
        };
        if self.hold_until.is_some_and(|until| now >= until) {
            self.hold_until = None;
            self.text = error.to_string();
        }
    }

    /// Live gesture readout; ignored while a notice is still held.
    pub fn on_reading(&mut self, gesture: Gesture, state: VisualState, now: Instant) {
        if self.hold_until.is_some_and(|until| now < until) {
            return;
        }
        self.hold_until = None;
        match gesture {
            Gesture::NoHand => self.set(
                StatusLevel::Warning,
                format!("No hand detected · {}", state.label()),
            ),
            _ => self.set(
                StatusLevel::Ready,
                format!("{}{} · {}", gesture.emoji(), gesture.label(), state.label()),
            ),
        }
    }
}

fn model_step(model: ModelKind) -> String {
    let index = ModelKind::ALL
        .iter()
        .position(|kind| *kind == model)
        .unwrap_or(0);
    format!("({}/{})", index + 1, ModelKind::ALL.len())
}

/// Text progress bar; falls back to a byte count when the size is unknown.
pub fn progress_text(downloaded: u64, total: Option<u64>) -> String {
    match total {
        Some(total) if total > 0 => {
            let pct = (downloaded as f64 / total as f64).clamp(0.0, 1.0);
            let filled = ((pct * BAR_LEN as f64).round() as usize).min(BAR_LEN);
            format!(
                "[{}{}] {:>5.1}%",
                "=".repeat(filled),
                " ".repeat(BAR_LEN - filled),
                pct * 100.0
            )
        }
        _ => format!("{} KB", downloaded / 1024),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_bar_fills_proportionally() {
        assert_eq!(progress_text(50, Some(100)), format!("[{}{}]  50.0%", "=".repeat(10), " ".repeat(10)));
        assert_eq!(progress_text(500, Some(100)), format!("[{}] 100.0%", "=".repeat(20)));
        assert_eq!(progress_text(4096, None), "4 KB");
    }

    #[test]
    fn download_events_report_loading() {
        let mut status = StatusLine::new(StatusLevel::Loading, "starting");
        status.on_download(&ModelDownloadEvent::Progress {
            model: ModelKind::HandLandmarks,
            downloaded: 1,
            total: Some(4),
        });
        assert_eq!(status.level(), StatusLevel::Loading);
        assert!(status.text().starts_with("Downloading hand landmark model (2/2) ["));

        status.on_ready();
        assert_eq!(status.level(), StatusLevel::Ready);
    }

    #[test]
    fn errors_are_sticky() {
        let mut status = StatusLine::new(StatusLevel::Loading, "starting");
        status.on_error(&InitError::NoCamera);
        status.on_ready();
        status.on_reading(Gesture::Open, VisualState::Tree, Instant::now());
        assert_eq!(status.level(), StatusLevel::Error);
        assert_eq!(status.text(), InitError::NoCamera.status_message());
    }

    #[test]
    fn photos_are_acknowledged_after_an_error() {
        let mut status = StatusLine::new(StatusLevel::Warning, "Camera disabled");
        let t0 = Instant::now();
        status.on_error(&InitError::NoCamera);
        status.on_photo_added("tree.png", 1, t0);
        assert_eq!(status.level(), StatusLevel::Error);
        assert_eq!(status.text(), "Added tree.png (1 photo)");

        status.tick(t0 + Duration::from_millis(100));
        assert_eq!(status.text(), "Added tree.png (1 photo)");
        status.tick(t0 + NOTICE_HOLD);
        assert_eq!(status.text(), InitError::NoCamera.status_message());
        assert_eq!(status.level(), StatusLevel::Error);
    }

    #[test]
    fn notices_hold_before_live_readings_resume() {
        let mut status = StatusLine::new(StatusLevel::Ready, "ready");
        let t0 = Instant::now();
        status.on_notice(&Notice::NoPhotosToZoom, t0);
        assert_eq!(status.level(), StatusLevel::Warning);

        status.on_reading(Gesture::Pinch, VisualState::Tree, t0 + Duration::from_millis(100));
        assert_eq!(status.text(), Notice::NoPhotosToZoom.message());

        status.on_reading(Gesture::NoHand, VisualState::Tree, t0 + NOTICE_HOLD);
        assert_eq!(status.level(), StatusLevel::Warning);
        assert_eq!(status.text(), "No hand detected · tree");

        status.on_reading(Gesture::Fist, VisualState::Tree, t0 + NOTICE_HOLD);
        assert_eq!(status.level(), StatusLevel::Ready);
        assert!(status.text().ends_with("fist · tree"));
    }
}
