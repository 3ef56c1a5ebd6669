use glam::{Vec2, Vec3};
use rayon::prelude::*;

/// Exposure used when mapping HDR values down to 8 bits.
const EXPOSURE: f32 = 1.6;

/// Linear float color buffer the scene is drawn into before bloom.
pub struct HdrBuffer {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Vec3>,
}

impl HdrBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Vec3::ZERO; width * height],
        }
    }

    pub fn clear_gradient(&mut self, top: Vec3, bottom: Vec3) {
        let height = self.height.max(2) as f32;
        self.pixels
            .par_chunks_mut(self.width)
            .enumerate()
            .for_each(|(y, row)| {
                let color = top.lerp(bottom, y as f32 / (height - 1.0));
                row.fill(color);
            });
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    fn blend(&mut self, x: i32, y: i32, color: Vec3, alpha: f32, additive: bool) {
        if let Some(idx) = self.index(x, y) {
            let px = &mut self.pixels[idx];
            if additive {
                *px += color * alpha;
            } else {
                *px = px.lerp(color, alpha);
            }
        }
    }

    /// Soft round sprite; pixels fade toward the rim.
    pub fn draw_disc(&mut self, center: Vec2, radius: f32, color: Vec3, additive: bool) {
        if radius < 0.75 {
            let coverage = (radius / 0.75).powi(2);
            self.blend(center.x as i32, center.y as i32, color, coverage, additive);
            return;
        }

        let r2 = radius * radius;
        let (x0, x1) = ((center.x - radius).floor() as i32, (center.x + radius).ceil() as i32);
        let (y0, y1) = ((center.y - radius).floor() as i32, (center.y + radius).ceil() as i32);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let d = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - center;
                let falloff = 1.0 - d.length_squared() / r2;
                if falloff <= 0.0 {
                    continue;
                }
                // brighter core, soft edge
                let shaded = color * (0.6 + 0.4 * falloff);
                self.blend(x, y, shaded, falloff.min(0.5) * 2.0, additive);
            }
        }
    }

    /// Solid square rotated by `angle` around its center.
    pub fn draw_square(&mut self, center: Vec2, half: f32, angle: f32, color: Vec3) {
        if half < 0.5 {
            self.blend(center.x as i32, center.y as i32, color, 1.0, false);
            return;
        }
        let reach = half * std::f32::consts::SQRT_2;
        let (sin, cos) = (-angle).sin_cos();
        let (x0, x1) = ((center.x - reach).floor() as i32, (center.x + reach).ceil() as i32);
        let (y0, y1) = ((center.y - reach).floor() as i32, (center.y + reach).ceil() as i32);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let d = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - center;
                let local = Vec2::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos);
                if local.x.abs() <= half && local.y.abs() <= half {
                    self.blend(x, y, color, 1.0, false);
                }
            }
        }
    }

    /// Opaque quad with corners in top-left, top-right, bottom-right, bottom-left order.
    /// `shade` receives texture coordinates in 0..=1.
    pub fn draw_quad<F>(&mut self, corners: [Vec2; 4], shade: F)
    where
        F: Fn(f32, f32) -> Vec3,
    {
        let uv = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        self.draw_triangle(
            [corners[0], corners[1], corners[2]],
            [uv[0], uv[1], uv[2]],
            &shade,
        );
        self.draw_triangle(
            [corners[0], corners[2], corners[3]],
            [uv[0], uv[2], uv[3]],
            &shade,
        );
    }

    fn draw_triangle<F>(&mut self, v: [Vec2; 3], uv: [Vec2; 3], shade: &F)
    where
        F: Fn(f32, f32) -> Vec3,
    {
        let area = edge_function(v[0], v[1], v[2]);
        if area.abs() < 1e-6 {
            return;
        }

        let min_x = v[0].x.min(v[1].x).min(v[2].x).floor().max(0.0) as i32;
        let max_x = v[0].x.max(v[1].x).max(v[2].x).ceil().min(self.width as f32 - 1.0) as i32;
        let min_y = v[0].y.min(v[1].y).min(v[2].y).floor().max(0.0) as i32;
        let max_y = v[0].y.max(v[1].y).max(v[2].y).ceil().min(self.height as f32 - 1.0) as i32;

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let w0 = edge_function(v[1], v[2], p) / area;
                let w1 = edge_function(v[2], v[0], p) / area;
                let w2 = edge_function(v[0], v[1], p) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let t = uv[0] * w0 + uv[1] * w1 + uv[2] * w2;
                if let Some(idx) = self.index(x, y) {
                    self.pixels[idx] = shade(t.x, t.y);
                }
            }
        }
    }

    /// Tone-map to 8-bit RGBA.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.pixels.len() * 4];
        out.par_chunks_exact_mut(4)
            .zip(self.pixels.par_iter())
            .for_each(|(dst, px)| {
                let mapped = Vec3::ONE - (-*px * EXPOSURE).exp();
                dst[0] = to_u8(mapped.x);
                dst[1] = to_u8(mapped.y);
                dst[2] = to_u8(mapped.z);
                dst[3] = 255;
            });
        out
    }
}

fn to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Signed parallelogram area of (a, b, c); the sign tells which side of ab `c` lies on.
pub fn edge_function(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (c.x - a.x) * (b.y - a.y) - (c.y - a.y) * (b.x - a.x)
}
