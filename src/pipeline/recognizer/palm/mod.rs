mod anchors;

use std::{f32::consts::PI, path::Path};

use anyhow::{Context, Result, anyhow, ensure};
use glam::Vec2;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use anchors::{ANCHORS, NUM_ANCHORS};

use super::common::{Letterbox, PALM_INPUT_SIZE, letterbox_frame};
use crate::types::{Frame, PalmRegion};

const PALM_KEYPOINTS: usize = 7;
const FEATURES_PER_ANCHOR: usize = 4 + PALM_KEYPOINTS * 2;
/// Palm keypoints used to orient the crop.
const WRIST_KEYPOINT: usize = 0;
const MIDDLE_BASE_KEYPOINT: usize = 2;
/// The landmark crop is this many palm boxes wide.
const CROP_SCALE: f32 = 2.6;
/// Fraction of the palm box the crop center moves toward the fingers.
const CROP_SHIFT: f32 = 0.5;

#[derive(Clone, Debug)]
pub struct PalmDetectorConfig {
    pub score_threshold: f32,
    pub nms_threshold: f32,
    pub top_k: usize,
}

impl Default for PalmDetectorConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.5,
            nms_threshold: 0.3,
            top_k: 4,
        }
    }
}

pub struct PalmDetector {
    session: Session,
    cfg: PalmDetectorConfig,
}

impl PalmDetector {
    pub fn new(model_path: &Path, cfg: PalmDetectorConfig) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(model_path)
            .with_context(|| {
                format!("failed to load palm detector from {}", model_path.display())
            })?;
        Ok(Self { session, cfg })
    }

    /// Palm regions in frame pixels, best first.
    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<PalmRegion>> {
        let (input, letterbox) = letterbox_frame(frame, PALM_INPUT_SIZE)?;
        let outputs = self
            .session
            .run(ort::inputs![Tensor::from_array(input)?])
            .context("failed to run palm detector session")?;
        ensure!(
            outputs.len() >= 2,
            "palm detector returned {} outputs, expected 2",
            outputs.len()
        );

        let boxes = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let boxes = boxes
            .as_slice()
            .ok_or_else(|| anyhow!("palm boxes not contiguous"))?;
        let scores = scores
            .as_slice()
            .ok_or_else(|| anyhow!("palm scores not contiguous"))?;

        decode_palms(boxes, scores, &letterbox, &self.cfg)
    }
}

/// Turns raw SSD regressions into frame-space palm regions and applies NMS.
fn decode_palms(
    boxes: &[f32],
    scores: &[f32],
    letterbox: &Letterbox,
    cfg: &PalmDetectorConfig,
) -> Result<Vec<PalmRegion>> {
    ensure!(
        boxes.len() >= NUM_ANCHORS * FEATURES_PER_ANCHOR && scores.len() >= NUM_ANCHORS,
        "palm outputs too short: {} box values, {} scores",
        boxes.len(),
        scores.len()
    );

    let input = PALM_INPUT_SIZE as f32;
    // normalized letterbox coordinates to frame pixels
    let to_frame = |p: Vec2| (p * input - letterbox.pad) / letterbox.scale;
    let max = Vec2::new(
        letterbox.frame_size.0.saturating_sub(1) as f32,
        letterbox.frame_size.1.saturating_sub(1) as f32,
    );

    let mut candidates = Vec::new();
    for (i, (&raw_score, anchor)) in scores.iter().zip(ANCHORS.iter()).enumerate() {
        let score = sigmoid(raw_score);
        if score < cfg.score_threshold {
            continue;
        }
        let f = &boxes[i * FEATURES_PER_ANCHOR..(i + 1) * FEATURES_PER_ANCHOR];
        let anchor = Vec2::from_array(*anchor);
        let center = Vec2::new(f[0], f[1]) / input + anchor;
        let half = Vec2::new(f[2], f[3]) / input * 0.5;
        if half.x <= 0.0 || half.y <= 0.0 {
            continue;
        }

        let lo = to_frame(center - half).clamp(Vec2::ZERO, max);
        let hi = to_frame(center + half).clamp(Vec2::ZERO, max);
        let landmarks = f[4..]
            .chunks_exact(2)
            .map(|k| {
                let p = to_frame(Vec2::new(k[0], k[1]) / input + anchor);
                (p.x, p.y)
            })
            .collect();

        candidates.push(PalmRegion {
            bbox: [lo.x, lo.y, hi.x, hi.y],
            landmarks,
            score,
        });
    }

    Ok(non_max_suppression(candidates, cfg.nms_threshold, cfg.top_k))
}

fn non_max_suppression(
    mut candidates: Vec<PalmRegion>,
    threshold: f32,
    top_k: usize,
) -> Vec<PalmRegion> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<PalmRegion> = Vec::new();
    for candidate in candidates {
        if kept.len() >= top_k {
            break;
        }
        if kept.iter().all(|k| iou(&k.bbox, &candidate.bbox) < threshold) {
            kept.push(candidate);
        }
    }
    kept
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let inter_w = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let inter_h = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let inter = inter_w * inter_h;
    if inter <= 0.0 {
        return 0.0;
    }
    let area = |r: &[f32; 4]| (r[2] - r[0]).max(0.0) * (r[3] - r[1]).max(0.0);
    let union = area(a) + area(b) - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Rotation that turns the wrist-to-fingers direction upright, or 0 without keypoints.
pub fn palm_rotation(region: &PalmRegion) -> f32 {
    let (Some(&wrist), Some(&middle)) = (
        region.landmarks.get(WRIST_KEYPOINT),
        region.landmarks.get(MIDDLE_BASE_KEYPOINT),
    ) else {
        return 0.0;
    };
    let angle = 0.5 * PI - (-(middle.1 - wrist.1)).atan2(middle.0 - wrist.0);
    // wrap into (-PI, PI]
    angle - 2.0 * PI * ((angle + PI) / (2.0 * PI)).floor()
}

/// Square crop (center, side, rotation) for the landmark model around a palm box,
/// pushed toward the fingers so the whole hand fits.
pub fn crop_from_palm(region: &PalmRegion) -> (Vec2, f32, f32) {
    let [x1, y1, x2, y2] = region.bbox;
    let size = (x2 - x1).abs().max((y2 - y1).abs());
    let rotation = palm_rotation(region);
    let up = Vec2::from_angle(rotation).rotate(Vec2::NEG_Y);
    let center = Vec2::new(x1 + x2, y1 + y2) * 0.5 + up * size * CROP_SHIFT;
    (center, size * CROP_SCALE, rotation)
}
