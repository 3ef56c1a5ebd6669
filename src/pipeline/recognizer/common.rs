use anyhow::{Context, Result, anyhow, ensure};
use fast_image_resize as fir;
use glam::Vec2;
use ndarray::Array4;
use rayon::prelude::*;

use crate::{gesture::NUM_LANDMARKS, types::Frame};

/// Side of the square crop fed to the landmark model.
pub const LANDMARK_INPUT_SIZE: u32 = 224;
/// Side of the letterboxed frame fed to the palm detector.
pub const PALM_INPUT_SIZE: u32 = 192;

/// What one inference pass found in a frame.
#[derive(Clone, Debug, Default)]
pub struct HandposeOutput {
    /// Landmarks in frame pixels; empty when no palm was found.
    pub landmarks: Vec<(f32, f32)>,
    pub confidence: f32,
}

/// How a frame was scaled and padded into the square detector input.
#[derive(Clone, Debug)]
pub struct Letterbox {
    pub scale: f32,
    pub pad: Vec2,
    pub frame_size: (u32, u32),
}

/// Maps landmark-model pixels back into the camera frame.
#[derive(Clone, Debug)]
pub struct CropTransform {
    pub center: Vec2,
    pub side: f32,
    pub angle: f32,
    pub output_size: u32,
    pub frame_size: (u32, u32),
}

impl CropTransform {
    fn units_per_pixel(&self) -> f32 {
        self.side / self.output_size as f32
    }

    /// Crop pixel offset from the crop center, rotated into frame space.
    fn to_frame(&self, offset: Vec2) -> Vec2 {
        self.center + Vec2::from_angle(self.angle).rotate(offset * self.units_per_pixel())
    }

    pub fn project(&self, x: f32, y: f32) -> (f32, f32) {
        let half = self.output_size as f32 * 0.5;
        let p = self.to_frame(Vec2::new(x - half, y - half));
        (
            p.x.clamp(0.0, self.frame_size.0.saturating_sub(1) as f32),
            p.y.clamp(0.0, self.frame_size.1.saturating_sub(1) as f32),
        )
    }
}

fn check_frame(frame: &Frame) -> Result<()> {
    let expected = frame.width as usize * frame.height as usize * 4;
    ensure!(
        frame.rgba.len() == expected,
        "frame buffer size mismatch: got {}, expected {expected}",
        frame.rgba.len()
    );
    Ok(())
}

/// Resizes the frame to fit `target` on its long side and centers it on a black square,
/// returning an NHWC tensor in 0..=1.
pub fn letterbox_frame(frame: &Frame, target: u32) -> Result<(Array4<f32>, Letterbox)> {
    check_frame(frame)?;

    let scale = target as f32 / frame.width.max(frame.height) as f32;
    let new_w = ((frame.width as f32 * scale).round() as u32).clamp(1, target);
    let new_h = ((frame.height as f32 * scale).round() as u32).clamp(1, target);

    let src = fir::images::Image::from_vec_u8(
        frame.width,
        frame.height,
        frame.rgba.clone(),
        fir::PixelType::U8x4,
    )?;
    let mut dst = fir::images::Image::new(new_w, new_h, fir::PixelType::U8x4);
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    fir::Resizer::new()
        .resize(&src, &mut dst, Some(&options))
        .context("fast resize failed")?;
    let resized = dst.into_vec();

    let side = target as usize;
    let pad_x = (side - new_w as usize) / 2;
    let pad_y = (side - new_h as usize) / 2;
    let row_len = new_w as usize * 4;

    let mut data = vec![0.0f32; side * side * 3];
    data.par_chunks_mut(side * 3)
        .enumerate()
        .skip(pad_y)
        .take(new_h as usize)
        .for_each(|(y, row)| {
            let src_row = &resized[(y - pad_y) * row_len..(y - pad_y + 1) * row_len];
            for (x, px) in src_row.chunks_exact(4).enumerate() {
                let dst = &mut row[(pad_x + x) * 3..(pad_x + x) * 3 + 3];
                dst[0] = px[0] as f32 / 255.0;
                dst[1] = px[1] as f32 / 255.0;
                dst[2] = px[2] as f32 / 255.0;
            }
        });

    let tensor = Array4::from_shape_vec((1, side, side, 3), data)
        .map_err(|err| anyhow!("failed to build palm input tensor: {err}"))?;
    let letterbox = Letterbox {
        scale,
        pad: Vec2::new(pad_x as f32, pad_y as f32),
        frame_size: (frame.width, frame.height),
    };
    Ok((tensor, letterbox))
}

/// Samples a rotated square of `side` frame pixels around `center` into an
/// `output_size` NHWC tensor.
pub fn rotated_crop(
    frame: &Frame,
    center: Vec2,
    side: f32,
    angle: f32,
    output_size: u32,
) -> Result<(Array4<f32>, CropTransform)> {
    check_frame(frame)?;
    let transform = CropTransform {
        center,
        side,
        angle,
        output_size,
        frame_size: (frame.width, frame.height),
    };

    let size = output_size as usize;
    let half = output_size as f32 * 0.5;
    let mut data = vec![0.0f32; size * size * 3];
    data.par_chunks_mut(size * 3)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, dst) in row.chunks_exact_mut(3).enumerate() {
                let offset = Vec2::new(x as f32 + 0.5 - half, y as f32 + 0.5 - half);
                dst.copy_from_slice(&sample_bilinear(frame, transform.to_frame(offset)));
            }
        });

    let tensor = Array4::from_shape_vec((1, size, size, 3), data)
        .map_err(|err| anyhow!("failed to build landmark input tensor: {err}"))?;
    Ok((tensor, transform))
}

/// First 21 (x, y, z) triples of the flat landmark output.
pub fn decode_landmarks(flat: &[f32]) -> Result<Vec<[f32; 3]>> {
    ensure!(
        flat.len() >= NUM_LANDMARKS * 3,
        "unexpected landmarks length: got {}, need {}",
        flat.len(),
        NUM_LANDMARKS * 3
    );
    Ok(flat
        .chunks_exact(3)
        .take(NUM_LANDMARKS)
        .map(|c| [c[0], c[1], c[2]])
        .collect())
}

fn sample_bilinear(frame: &Frame, p: Vec2) -> [f32; 3] {
    if !p.is_finite() {
        return [0.0; 3];
    }
    let fetch = |x: i32, y: i32| -> [f32; 3] {
        if x < 0 || y < 0 || x >= frame.width as i32 || y >= frame.height as i32 {
            return [0.0; 3];
        }
        let idx = (y as usize * frame.width as usize + x as usize) * 4;
        match frame.rgba.get(idx..idx + 3) {
            Some(px) => [
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
            ],
            None => [0.0; 3],
        }
    };

    let base = p.floor();
    let t = p - base;
    let (x0, y0) = (base.x as i32, base.y as i32);
    let (c00, c10) = (fetch(x0, y0), fetch(x0 + 1, y0));
    let (c01, c11) = (fetch(x0, y0 + 1), fetch(x0 + 1, y0 + 1));

    let mut out = [0.0; 3];
    for c in 0..3 {
        let top = c00[c] + (c10[c] - c00[c]) * t.x;
        let bottom = c01[c] + (c11[c] - c01[c]) * t.x;
        out[c] = top + (bottom - top) * t.y;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(width: u32, height: u32) -> Frame {
        let mut frame = Frame::blank(width, height);
        for (i, px) in frame.rgba.chunks_exact_mut(4).enumerate() {
            let x = (i as u32 % width) as u8;
            px.copy_from_slice(&[x, 0, 255, 255]);
        }
        frame
    }

    #[test]
    fn letterbox_pads_the_short_side() {
        let frame = gradient_frame(64, 32);
        let (tensor, letterbox) = letterbox_frame(&frame, 16).expect("letterbox");
        assert_eq!(tensor.shape(), &[1, 16, 16, 3]);
        assert_eq!(letterbox.scale, 0.25);
        assert_eq!(letterbox.pad, Vec2::new(0.0, 4.0));
        // padding rows stay black, image rows carry the blue channel
        assert_eq!(tensor[[0, 0, 8, 2]], 0.0);
        assert!((tensor[[0, 8, 8, 2]] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn mismatched_buffers_are_rejected() {
        let mut frame = Frame::blank(8, 8);
        frame.rgba.truncate(10);
        assert!(letterbox_frame(&frame, 16).is_err());
        assert!(rotated_crop(&frame, Vec2::splat(4.0), 8.0, 0.0, 8).is_err());
    }

    #[test]
    fn crop_center_projects_back_to_the_palm() {
        let frame = gradient_frame(100, 80);
        let (tensor, transform) =
            rotated_crop(&frame, Vec2::new(50.0, 40.0), 40.0, 0.7, 20).expect("crop");
        assert_eq!(tensor.shape(), &[1, 20, 20, 3]);

        let (x, y) = transform.project(10.0, 10.0);
        assert!((x - 50.0).abs() < 1e-3 && (y - 40.0).abs() < 1e-3);

        let (x, y) = transform.project(-1000.0, 10.0);
        assert!((0.0..=99.0).contains(&x) && (0.0..=79.0).contains(&y));
    }

    #[test]
    fn unrotated_crop_samples_the_source() {
        let frame = gradient_frame(40, 40);
        let (tensor, _) = rotated_crop(&frame, Vec2::new(20.0, 20.0), 20.0, 0.0, 20).expect("crop");
        // crop pixel (x=0) centers on frame x = 10.5
        let red = tensor[[0, 5, 0, 0]] * 255.0;
        assert!((red - 10.5).abs() < 0.05, "red was {red}");
        assert!((tensor[[0, 5, 0, 2]] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn landmark_decoding_needs_all_points() {
        assert!(decode_landmarks(&[0.0; 62]).is_err());
        let flat: Vec<f32> = (0..70).map(|v| v as f32).collect();
        let points = decode_landmarks(&flat).expect("decodes");
        assert_eq!(points.len(), NUM_LANDMARKS);
        assert_eq!(points[1], [3.0, 4.0, 5.0]);
    }
}
