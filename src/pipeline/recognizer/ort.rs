use std::{path::Path, thread};

use anyhow::{Context, Result, ensure};
use crossbeam_channel::{Receiver, Sender};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::{
    HandposeEngine, RecognizerBackend, RecognizerMessage,
    common::{self, HandposeOutput},
    palm::{PalmDetector, PalmDetectorConfig, crop_from_palm},
    run_worker_loop,
};
use crate::{
    model_download::{ModelKind, ensure_model_ready},
    pipeline::InitError,
    types::Frame,
};

pub fn start_worker(
    backend: RecognizerBackend,
    frame_rx: Receiver<Frame>,
    msg_tx: Sender<RecognizerMessage>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let engine = match prepare_engine(&backend, &msg_tx) {
            Ok(engine) => engine,
            Err(err) => {
                log::error!("hand tracking disabled: {err:?}");
                let _ = msg_tx.send(RecognizerMessage::Failed(InitError::ModelUnavailable(
                    format!("{err:#}"),
                )));
                return;
            }
        };
        if msg_tx.send(RecognizerMessage::Ready).is_err() {
            return;
        }
        run_worker_loop(engine, frame_rx, msg_tx);
    })
}

fn prepare_engine(
    backend: &RecognizerBackend,
    msg_tx: &Sender<RecognizerMessage>,
) -> Result<OrtEngine> {
    let fetch = |kind| {
        ensure_model_ready(kind, backend.model_dir(), |event| {
            let _ = msg_tx.send(RecognizerMessage::Download(event));
        })
    };
    let palm_path = fetch(ModelKind::PalmDetector)?;
    let landmark_path = fetch(ModelKind::HandLandmarks)?;

    let engine = OrtEngine::new(&landmark_path, &palm_path, backend.palm_config().clone())?;
    log::info!(
        "hand tracking ready with {} and {}",
        palm_path.display(),
        landmark_path.display()
    );
    Ok(engine)
}

struct OrtEngine {
    landmarks: Session,
    palm_detector: PalmDetector,
}

impl OrtEngine {
    fn new(landmark_path: &Path, palm_path: &Path, palm_cfg: PalmDetectorConfig) -> Result<Self> {
        let landmarks = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(landmark_path)
            .with_context(|| {
                format!(
                    "failed to load landmark model from {}",
                    landmark_path.display()
                )
            })?;
        Ok(Self {
            landmarks,
            palm_detector: PalmDetector::new(palm_path, palm_cfg)?,
        })
    }
}

impl HandposeEngine for OrtEngine {
    fn infer(&mut self, frame: &Frame) -> Result<HandposeOutput> {
        let palms = self.palm_detector.detect(frame)?;
        // sorted best first; only one hand drives the scene
        let Some(palm) = palms.first() else {
            return Ok(HandposeOutput::default());
        };

        let (center, side, angle) = crop_from_palm(palm);
        let (input, transform) =
            common::rotated_crop(frame, center, side, angle, common::LANDMARK_INPUT_SIZE)?;
        let outputs = self
            .landmarks
            .run(ort::inputs![Tensor::from_array(input)?])
            .context("failed to run landmark session")?;
        ensure!(outputs.len() >= 2, "landmark model returned too few outputs");

        let coords = outputs[0].try_extract_array::<f32>()?;
        let flat: Vec<f32> = coords.iter().copied().collect();
        let raw = common::decode_landmarks(&flat)?;
        let presence = outputs[1]
            .try_extract_array::<f32>()?
            .iter()
            .next()
            .copied()
            .unwrap_or(0.0);

        Ok(HandposeOutput {
            landmarks: raw.iter().map(|[x, y, _]| transform.project(*x, *y)).collect(),
            confidence: (presence * palm.score).clamp(0.0, 1.0),
        })
    }
}
