use std::{
    path::{Path, PathBuf},
    sync::Arc,
    thread,
};

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::Sender;
use fast_image_resize as fir;
use glam::{Quat, Vec3};
use image::ImageReader;
use rand::Rng;

use super::layout;
use crate::config::SceneConfig;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

const LIT_TINT: Vec3 = Vec3::splat(1.0);
const LIT_EMISSIVE: f32 = 0.45;
const DIM_TINT: Vec3 = Vec3::splat(0.55);
const DIM_EMISSIVE: f32 = 0.02;

/// Downscaled RGBA pixels of an uploaded photo.
#[derive(Debug)]
pub struct PhotoTexture {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl PhotoTexture {
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Nearest-neighbour lookup, `u`/`v` in 0..=1 with v pointing down.
    pub fn sample(&self, u: f32, v: f32) -> [u8; 3] {
        let x = ((u.clamp(0.0, 1.0) * self.width as f32) as u32).min(self.width.saturating_sub(1));
        let y =
            ((v.clamp(0.0, 1.0) * self.height as f32) as u32).min(self.height.saturating_sub(1));
        let idx = ((y * self.width + x) as usize) * 4;
        match self.rgba.get(idx..idx + 3) {
            Some(px) => [px[0], px[1], px[2]],
            None => [0, 0, 0],
        }
    }
}

#[derive(Debug)]
pub struct LoadedPhoto {
    pub name: String,
    pub texture: Arc<PhotoTexture>,
}

/// A Polaroid plane floating in the scene.
#[derive(Clone, Debug)]
pub struct PhotoPlane {
    name: String,
    texture: Arc<PhotoTexture>,
    tree_pos: Vec3,
    scatter_pos: Vec3,
    base_yaw: f32,
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: f32,
    pub tint: Vec3,
    pub emissive: f32,
}

impl PhotoPlane {
    pub fn new<R: Rng + ?Sized>(photo: LoadedPhoto, rng: &mut R, cfg: &SceneConfig) -> Self {
        let tree_pos = layout::photo_tree_position(rng, cfg);
        let scatter_radius = rng.random_range(cfg.scatter_min_radius..cfg.scatter_max_radius);
        let scatter_pos = layout::sphere_direction(rng) * scatter_radius;
        let base_yaw = layout::azimuth(tree_pos);

        Self {
            name: photo.name,
            texture: photo.texture,
            tree_pos,
            scatter_pos,
            base_yaw,
            position: tree_pos,
            orientation: Quat::from_rotation_y(base_yaw),
            scale: 0.0,
            tint: DIM_TINT,
            emissive: DIM_EMISSIVE,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn texture(&self) -> &PhotoTexture {
        &self.texture
    }

    pub fn tree_position(&self) -> Vec3 {
        self.tree_pos
    }

    pub fn scatter_position(&self) -> Vec3 {
        self.scatter_pos
    }

    pub fn base_yaw(&self) -> f32 {
        self.base_yaw
    }

    pub fn blend_toward(&mut self, target: Vec3, orientation: Quat, scale: f32, factor: f32) {
        self.position = self.position.lerp(target, factor);
        self.orientation = self.orientation.slerp(orientation, factor).normalize();
        self.scale += (scale - self.scale) * factor;
    }

    pub fn blend_highlight(&mut self, lit: bool, factor: f32) {
        let (tint, emissive) = if lit {
            (LIT_TINT, LIT_EMISSIVE)
        } else {
            (DIM_TINT, DIM_EMISSIVE)
        };
        self.tint = self.tint.lerp(tint, factor);
        self.emissive += (emissive - self.emissive) * factor;
    }
}

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Decodes photos off the UI thread; undecodable files are logged and skipped.
pub fn spawn_photo_loader(
    paths: Vec<PathBuf>,
    max_side: u32,
    tx: Sender<LoadedPhoto>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for path in paths {
            if !is_supported_image(&path) {
                log::debug!("ignoring non-image file {}", path.display());
                continue;
            }
            match load_photo(&path, max_side) {
                Ok(photo) => {
                    log::info!(
                        "loaded photo {} ({}x{})",
                        photo.name,
                        photo.texture.width,
                        photo.texture.height
                    );
                    if tx.send(photo).is_err() {
                        return;
                    }
                }
                Err(err) => log::warn!("skipping photo {}: {err:#}", path.display()),
            }
        }
    })
}

pub fn load_photo(path: &Path, max_side: u32) -> Result<LoadedPhoto> {
    let decoded = ImageReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .with_guessed_format()
        .context("failed to sniff image format")?
        .decode()
        .with_context(|| format!("failed to decode {}", path.display()))?
        .to_rgba8();

    let (width, height) = decoded.dimensions();
    let texture = texture_from_rgba(decoded.into_raw(), width, height, max_side)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "photo".to_string());

    Ok(LoadedPhoto {
        name,
        texture: Arc::new(texture),
    })
}

pub fn texture_from_rgba(
    rgba: Vec<u8>,
    width: u32,
    height: u32,
    max_side: u32,
) -> Result<PhotoTexture> {
    if width == 0 || height == 0 {
        return Err(anyhow!("photo has no pixels"));
    }
    if rgba.len() != width as usize * height as usize * 4 {
        return Err(anyhow!(
            "photo buffer size mismatch: got {}, expected {}",
            rgba.len(),
            width as usize * height as usize * 4
        ));
    }

    let longest = width.max(height);
    if longest <= max_side {
        return Ok(PhotoTexture {
            rgba,
            width,
            height,
        });
    }

    let scale = max_side as f32 / longest as f32;
    let new_w = ((width as f32 * scale).round() as u32).max(1);
    let new_h = ((height as f32 * scale).round() as u32).max(1);

    let src = fir::images::Image::from_vec_u8(width, height, rgba, fir::PixelType::U8x4)?;
    let mut dst = fir::images::Image::new(new_w, new_h, fir::PixelType::U8x4);
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Bilinear));
    fir::Resizer::new()
        .resize(&src, &mut dst, Some(&options))
        .context("photo resize failed")?;

    Ok(PhotoTexture {
        rgba: dst.into_vec(),
        width: new_w,
        height: new_h,
    })
}
