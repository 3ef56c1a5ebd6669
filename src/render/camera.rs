use glam::Vec3;

use crate::config::RenderConfig;

const NEAR_PLANE: f32 = 0.5;

#[derive(Clone, Copy, Debug)]
pub struct Projected {
    pub x: f32,
    pub y: f32,
    pub depth: f32,
    /// Screen pixels covered by one world unit at this depth.
    pub pixels_per_unit: f32,
}

/// Pinhole camera on the +Z axis looking at the origin.
#[derive(Clone, Debug)]
pub struct PerspectiveCamera {
    eye_z: f32,
    focal: f32,
    center: (f32, f32),
}

impl PerspectiveCamera {
    pub fn new(cfg: &RenderConfig) -> Self {
        let half_fov = cfg.fov_y_degrees.to_radians() * 0.5;
        Self {
            eye_z: cfg.camera_distance,
            focal: cfg.height as f32 * 0.5 / half_fov.tan(),
            center: (cfg.width as f32 * 0.5, cfg.height as f32 * 0.5),
        }
    }

    pub fn project(&self, world: Vec3) -> Option<Projected> {
        let depth = self.eye_z - world.z;
        if depth < NEAR_PLANE {
            return None;
        }
        let pixels_per_unit = self.focal / depth;
        Some(Projected {
            x: self.center.0 + world.x * pixels_per_unit,
            y: self.center.1 - world.y * pixels_per_unit,
            depth,
            pixels_per_unit,
        })
    }
}
