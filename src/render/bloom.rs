use glam::Vec3;
use rayon::prelude::*;

use super::raster::HdrBuffer;

const BLUR_PASSES: usize = 2;

/// Extracts pixels above `threshold`, blurs them at half resolution and adds
/// the glow back onto `buf`.
pub fn apply_bloom(buf: &mut HdrBuffer, threshold: f32, strength: f32, radius: usize) {
    if strength <= 0.0 || buf.width < 2 || buf.height < 2 {
        return;
    }

    let mut bright = downsample_bright(buf, threshold);
    let (hw, hh) = (buf.width / 2, buf.height / 2);
    let mut scratch = vec![Vec3::ZERO; bright.len()];
    for _ in 0..BLUR_PASSES {
        blur_horizontal(&bright, &mut scratch, hw, radius);
        blur_vertical(&scratch, &mut bright, hw, hh, radius);
    }

    let width = buf.width;
    buf.pixels
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let src_row = (y / 2).min(hh - 1) * hw;
            for (x, px) in row.iter_mut().enumerate() {
                *px += bright[src_row + (x / 2).min(hw - 1)] * strength;
            }
        });
}

fn luminance(c: Vec3) -> f32 {
    c.dot(Vec3::new(0.2126, 0.7152, 0.0722))
}

fn downsample_bright(buf: &HdrBuffer, threshold: f32) -> Vec<Vec3> {
    let (hw, hh) = (buf.width / 2, buf.height / 2);
    let mut out = vec![Vec3::ZERO; hw * hh];
    out.par_chunks_mut(hw).enumerate().for_each(|(y, row)| {
        let top = 2 * y * buf.width;
        let bottom = top + buf.width;
        for (x, dst) in row.iter_mut().enumerate() {
            let sx = 2 * x;
            let avg = (buf.pixels[top + sx]
                + buf.pixels[top + sx + 1]
                + buf.pixels[bottom + sx]
                + buf.pixels[bottom + sx + 1])
                * 0.25;
            let lum = luminance(avg);
            if lum > threshold {
                *dst = avg * ((lum - threshold) / lum);
            }
        }
    });
    out
}

fn blur_horizontal(src: &[Vec3], dst: &mut [Vec3], width: usize, radius: usize) {
    dst.par_chunks_mut(width)
        .zip(src.par_chunks(width))
        .for_each(|(out, row)| {
            for (x, px) in out.iter_mut().enumerate() {
                let lo = x.saturating_sub(radius);
                let hi = (x + radius).min(width - 1);
                let sum: Vec3 = row[lo..=hi].iter().copied().sum();
                *px = sum / (hi - lo + 1) as f32;
            }
        });
}

fn blur_vertical(src: &[Vec3], dst: &mut [Vec3], width: usize, height: usize, radius: usize) {
    dst.par_chunks_mut(width).enumerate().for_each(|(y, out)| {
        let lo = y.saturating_sub(radius);
        let hi = (y + radius).min(height - 1);
        let count = (hi - lo + 1) as f32;
        for (x, px) in out.iter_mut().enumerate() {
            let mut sum = Vec3::ZERO;
            for sy in lo..=hi {
                sum += src[sy * width + x];
            }
            *px = sum / count;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_frames_are_untouched() {
        let mut buf = HdrBuffer::new(8, 8);
        buf.pixels.fill(Vec3::splat(0.2));
        apply_bloom(&mut buf, 0.55, 1.0, 2);
        assert!(buf.pixels.iter().all(|p| *p == Vec3::splat(0.2)));
    }

    #[test]
    fn bright_spot_spreads_to_neighbours() {
        let mut buf = HdrBuffer::new(32, 32);
        for (x, y) in [(16, 16), (17, 16), (16, 17), (17, 17)] {
            buf.pixels[y * 32 + x] = Vec3::splat(3.0);
        }
        apply_bloom(&mut buf, 0.5, 1.0, 2);

        let near = buf.pixels[16 * 32 + 20];
        let far = buf.pixels[0];
        assert!(near.x > 0.0);
        assert_eq!(far, Vec3::ZERO);
        assert!(buf.pixels[16 * 32 + 16].x > 3.0);
    }

    #[test]
    fn zero_strength_is_a_no_op() {
        let mut buf = HdrBuffer::new(4, 4);
        buf.pixels.fill(Vec3::splat(5.0));
        apply_bloom(&mut buf, 0.1, 0.0, 3);
        assert!(buf.pixels.iter().all(|p| *p == Vec3::splat(5.0)));
    }
}
