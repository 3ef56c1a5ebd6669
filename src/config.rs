use std::path::PathBuf;

use clap::Parser;

/// Gesture-controlled particle Christmas tree.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Args {
    /// Index of the camera to open
    #[arg(long, default_value_t = 0)]
    pub camera: u32,

    /// Run without a camera; the scene stays in its resting state
    #[arg(long)]
    pub no_camera: bool,

    /// Photo to mount at startup (repeatable)
    #[arg(long = "photo", value_name = "PATH")]
    pub photos: Vec<PathBuf>,

    /// Number of ornament particles
    #[arg(long, default_value_t = 1800)]
    pub ornaments: usize,

    /// Number of rising dust motes
    #[arg(long, default_value_t = 600)]
    pub dust: usize,

    /// Render width in pixels
    #[arg(long, default_value_t = 960)]
    pub width: u32,

    /// Render height in pixels
    #[arg(long, default_value_t = 600)]
    pub height: u32,

    /// Seed for particle placement
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory where the ONNX models are cached
    #[arg(long, default_value = "models")]
    pub model_dir: PathBuf,
}

/// Layout and choreography constants for the scene.
#[derive(Clone, Debug)]
pub struct SceneConfig {
    pub ornament_count: usize,
    pub dust_count: usize,
    pub tree_height: f32,
    pub tree_radius: f32,
    pub scatter_min_radius: f32,
    pub scatter_max_radius: f32,
    /// Fraction of the remaining distance closed per frame toward positions.
    pub position_blend: f32,
    /// Fraction closed per frame toward photo tints.
    pub color_blend: f32,
    pub bob_amplitude: f32,
    pub bob_speed: f32,
    pub dust_min_speed: f32,
    pub dust_max_speed: f32,
    /// Lateral scale applied to dust drifting outside the cone.
    pub dust_pull: f32,
    /// Yaw added per frame in orbit.
    pub orbit_yaw_rate: f32,
    pub orbit_radius: f32,
    pub orbit_ring_spacing: f32,
    pub photos_per_ring: usize,
    /// Radians of rotation per unit of palm travel.
    pub palm_rotation_gain: f32,
    pub momentum_decay: f32,
    pub tilt_decay: f32,
    /// World z of the point a focused photo settles on, in front of the camera.
    pub zoom_focus_z: f32,
    pub zoom_scale: f32,
    pub photo_texture_size: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            ornament_count: 1800,
            dust_count: 600,
            tree_height: 12.0,
            tree_radius: 4.8,
            scatter_min_radius: 8.0,
            scatter_max_radius: 14.0,
            position_blend: 0.08,
            color_blend: 0.1,
            bob_amplitude: 0.12,
            bob_speed: 1.6,
            dust_min_speed: 0.01,
            dust_max_speed: 0.035,
            dust_pull: 0.92,
            orbit_yaw_rate: 0.005,
            orbit_radius: 7.5,
            orbit_ring_spacing: 2.6,
            photos_per_ring: 6,
            palm_rotation_gain: 0.6,
            momentum_decay: 0.95,
            tilt_decay: 0.98,
            zoom_focus_z: 17.0,
            zoom_scale: 4.0,
            photo_texture_size: 256,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub camera_distance: f32,
    pub fov_y_degrees: f32,
    pub bloom_threshold: f32,
    pub bloom_strength: f32,
    pub bloom_radius: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 960,
            height: 600,
            camera_distance: 26.0,
            fov_y_degrees: 45.0,
            bloom_threshold: 0.55,
            bloom_strength: 0.9,
            bloom_radius: 4,
        }
    }
}

impl Args {
    pub fn scene_config(&self) -> SceneConfig {
        SceneConfig {
            ornament_count: self.ornaments,
            dust_count: self.dust,
            ..SceneConfig::default()
        }
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            width: self.width.max(64),
            height: self.height.max(64),
            ..RenderConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse() {
        let args = Args::parse_from(["gesture-tree"]);
        assert_eq!(args.camera, 0);
        assert!(args.photos.is_empty());
        assert_eq!(args.scene_config().ornament_count, 1800);
        assert_eq!(args.model_dir, PathBuf::from("models"));
    }

    #[test]
    fn repeated_photos_and_clamped_size() {
        let args = Args::parse_from([
            "gesture-tree",
            "--photo",
            "a.jpg",
            "--photo",
            "b.png",
            "--width",
            "10",
            "--dust",
            "5",
        ]);
        assert_eq!(args.photos.len(), 2);
        assert_eq!(args.render_config().width, 64);
        assert_eq!(args.scene_config().dust_count, 5);
    }
}
