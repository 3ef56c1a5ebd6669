mod common;
mod ort;
mod palm;

use std::{
    path::{Path, PathBuf},
    thread,
    time::Instant,
};

use crossbeam_channel::{Receiver, Sender};
use glam::Vec2;

use crate::{
    gesture::{GestureClassifier, NUM_LANDMARKS},
    model_download::ModelDownloadEvent,
    pipeline::InitError,
    types::{Frame, HandReading, RecognizedFrame},
};

use self::common::HandposeOutput;
pub use self::palm::PalmDetectorConfig;

/// Below this the landmarks are treated as noise and the frame reports no hand.
const MIN_HAND_CONFIDENCE: f32 = 0.2;

pub(crate) trait HandposeEngine: Send + 'static {
    fn infer(&mut self, frame: &Frame) -> anyhow::Result<HandposeOutput>;
}

/// What the worker reports back to the UI thread, in order.
#[derive(Debug)]
pub enum RecognizerMessage {
    Download(ModelDownloadEvent),
    Ready,
    Recognized(RecognizedFrame),
    Failed(InitError),
}

#[derive(Clone, Debug)]
pub struct RecognizerBackend {
    model_dir: PathBuf,
    palm: PalmDetectorConfig,
}

impl RecognizerBackend {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            palm: PalmDetectorConfig::default(),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn palm_config(&self) -> &PalmDetectorConfig {
        &self.palm
    }
}

pub fn start_recognizer(
    backend: RecognizerBackend,
    frame_rx: Receiver<Frame>,
    msg_tx: Sender<RecognizerMessage>,
) -> thread::JoinHandle<()> {
    log::info!(
        "starting hand tracking with models in {}",
        backend.model_dir().display()
    );
    ort::start_worker(backend, frame_rx, msg_tx)
}

/// Admits a frame only when its capture time moved past the last one seen.
#[derive(Debug, Default)]
struct FrameGate {
    last: Option<Instant>,
}

impl FrameGate {
    fn admit(&mut self, timestamp: Instant) -> bool {
        if self.last.is_some_and(|last| timestamp <= last) {
            return false;
        }
        self.last = Some(timestamp);
        true
    }
}

fn run_worker_loop<E: HandposeEngine>(
    mut engine: E,
    frame_rx: Receiver<Frame>,
    msg_tx: Sender<RecognizerMessage>,
) {
    let mut classifier = GestureClassifier::new();
    let mut gate = FrameGate::default();

    while let Some(frame) = recv_latest_frame(&frame_rx) {
        if !gate.admit(frame.timestamp) {
            continue;
        }
        let output = match engine.infer(&frame) {
            Ok(output) => output,
            Err(err) => {
                log::warn!("hand inference failed: {err:?}");
                continue;
            }
        };
        let hand = read_hand(output, &frame, &mut classifier);
        // blocking send keeps every reading, so no pinch edge is lost
        if msg_tx
            .send(RecognizerMessage::Recognized(RecognizedFrame { frame, hand }))
            .is_err()
        {
            break;
        }
    }
    log::debug!("recognizer worker stopped");
}

fn recv_latest_frame(frame_rx: &Receiver<Frame>) -> Option<Frame> {
    let mut frame = frame_rx.recv().ok()?;
    while let Ok(newer) = frame_rx.try_recv() {
        frame = newer;
    }
    Some(frame)
}

/// Normalizes pixel landmarks by the frame size and classifies them.
fn read_hand(
    output: HandposeOutput,
    frame: &Frame,
    classifier: &mut GestureClassifier,
) -> Option<HandReading> {
    if output.confidence < MIN_HAND_CONFIDENCE
        || output.landmarks.len() < NUM_LANDMARKS
        || frame.width == 0
        || frame.height == 0
    {
        return None;
    }
    let size = Vec2::new(frame.width as f32, frame.height as f32);
    let normalized: Vec<Vec2> = output
        .landmarks
        .iter()
        .map(|&(x, y)| Vec2::new(x, y) / size)
        .collect();
    let sample = classifier.classify(&normalized)?;
    Some(HandReading {
        gesture: sample.gesture,
        palm: sample.palm,
        confidence: output.confidence,
        landmarks: output.landmarks,
    })
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, time::Duration};

    use crossbeam_channel::unbounded;

    use super::*;
    use crate::{gesture::tests as hands, types::Gesture};

    struct ScriptedEngine {
        outputs: VecDeque<anyhow::Result<HandposeOutput>>,
    }

    impl HandposeEngine for ScriptedEngine {
        fn infer(&mut self, _frame: &Frame) -> anyhow::Result<HandposeOutput> {
            self.outputs
                .pop_front()
                .unwrap_or_else(|| Ok(HandposeOutput::default()))
        }
    }

    fn in_pixels(points: Vec<Vec2>, frame: &Frame) -> HandposeOutput {
        HandposeOutput {
            landmarks: points
                .into_iter()
                .map(|p| (p.x * frame.width as f32, p.y * frame.height as f32))
                .collect(),
            confidence: 0.9,
        }
    }

    #[test]
    fn gate_skips_stale_timestamps() {
        let mut gate = FrameGate::default();
        let t0 = Instant::now();
        assert!(gate.admit(t0));
        assert!(!gate.admit(t0));
        assert!(gate.admit(t0 + Duration::from_millis(16)));
        assert!(!gate.admit(t0 + Duration::from_millis(8)));
    }

    #[test]
    fn landmarks_are_normalized_before_classifying() {
        let frame = Frame::blank(640, 480);
        let mut classifier = GestureClassifier::new();
        let hand = read_hand(in_pixels(hands::fist_hand(), &frame), &frame, &mut classifier)
            .expect("hand found");
        assert_eq!(hand.gesture, Gesture::Fist);
        assert_eq!(hand.landmarks.len(), NUM_LANDMARKS);

        let mut weak = in_pixels(hands::open_hand(), &frame);
        weak.confidence = 0.1;
        assert!(read_hand(weak, &frame, &mut classifier).is_none());
        assert!(read_hand(HandposeOutput::default(), &frame, &mut classifier).is_none());
    }

    #[test]
    fn worker_reports_the_newest_frame_and_survives_errors() {
        let (frame_tx, frame_rx) = unbounded();
        let (msg_tx, msg_rx) = unbounded();

        let old = Frame::blank(64, 48);
        let mut newest = Frame::blank(64, 48);
        newest.timestamp = old.timestamp + Duration::from_millis(33);
        let engine = ScriptedEngine {
            outputs: VecDeque::from([Ok(in_pixels(hands::pinch_hand(), &newest))]),
        };
        frame_tx.send(old).expect("queue frame");
        frame_tx.send(newest).expect("queue frame");
        drop(frame_tx);

        run_worker_loop(engine, frame_rx, msg_tx);

        let messages: Vec<RecognizerMessage> = msg_rx.try_iter().collect();
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            RecognizerMessage::Recognized(recognized) => {
                assert_eq!(recognized.gesture(), Gesture::Pinch);
                assert_eq!(recognized.frame.width, 64);
            }
            other => panic!("unexpected message {other:?}"),
        }

        let (frame_tx, frame_rx) = unbounded();
        let (msg_tx, msg_rx) = unbounded();
        let engine = ScriptedEngine {
            outputs: VecDeque::from([Err(anyhow::anyhow!("boom"))]),
        };
        frame_tx.send(Frame::blank(8, 8)).expect("queue frame");
        drop(frame_tx);
        run_worker_loop(engine, frame_rx, msg_tx);
        assert_eq!(msg_rx.try_iter().count(), 0);
    }

    #[test]
    fn backend_points_at_its_model_dir() {
        let backend = RecognizerBackend::new("cache/models");
        assert_eq!(backend.model_dir(), Path::new("cache/models"));
        assert!(backend.palm_config().score_threshold > 0.0);
    }
}
