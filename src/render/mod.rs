//! CPU renderer: projects the scene, splats particles, draws photo quads and
//! runs a bloom pass into an RGBA frame the UI can show.

mod bloom;
mod camera;
mod raster;

use std::time::Instant;

use glam::{Quat, Vec2, Vec3};

use crate::{
    config::RenderConfig,
    scene::{OrnamentKind, PhotoPlane, Scene},
    types::Frame,
};

use camera::PerspectiveCamera;
use raster::HdrBuffer;

const SKY_TOP: Vec3 = Vec3::new(0.008, 0.012, 0.035);
const SKY_BOTTOM: Vec3 = Vec3::new(0.03, 0.02, 0.055);
const DUST_COLOR: Vec3 = Vec3::new(1.1, 0.95, 0.6);
const DUST_SIZE: f32 = 0.035;
const PAPER: Vec3 = Vec3::new(0.95, 0.94, 0.9);

/// Width of a photo plane at scale 1, in world units.
const PHOTO_WIDTH: f32 = 1.2;
const PHOTO_BORDER: f32 = 0.06;
const PHOTO_CHIN: f32 = 0.22;

const AMBIENT: f32 = 0.55;
const DIFFUSE: f32 = 0.6;

#[derive(Clone, Copy)]
enum Shape {
    Disc { additive: bool },
    Square { angle: f32 },
}

#[derive(Clone, Copy)]
enum Drawable {
    Sprite {
        center: Vec2,
        radius: f32,
        color: Vec3,
        shape: Shape,
        depth: f32,
    },
    Photo {
        index: usize,
        depth: f32,
    },
}

impl Drawable {
    fn depth(&self) -> f32 {
        match self {
            Drawable::Sprite { depth, .. } | Drawable::Photo { depth, .. } => *depth,
        }
    }
}

pub struct Renderer {
    config: RenderConfig,
    camera: PerspectiveCamera,
    buffer: HdrBuffer,
    light_dir: Vec3,
    drawables: Vec<Drawable>,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        log::debug!(
            "renderer {}x{}, camera at z={}",
            config.width,
            config.height,
            config.camera_distance
        );
        Self {
            camera: PerspectiveCamera::new(&config),
            buffer: HdrBuffer::new(config.width as usize, config.height as usize),
            light_dir: Vec3::new(0.4, 0.6, 0.7).normalize(),
            drawables: Vec::new(),
            config,
        }
    }

    pub fn render(&mut self, scene: &Scene) -> Frame {
        let rotation = scene.assembly_rotation();
        self.buffer.clear_gradient(SKY_TOP, SKY_BOTTOM);
        self.collect(scene, rotation);

        // painter's order: farthest first
        let mut drawables = std::mem::take(&mut self.drawables);
        drawables.sort_unstable_by(|a, b| b.depth().total_cmp(&a.depth()));
        for drawable in &drawables {
            match *drawable {
                Drawable::Sprite {
                    center,
                    radius,
                    color,
                    shape,
                    ..
                } => match shape {
                    Shape::Disc { additive } => {
                        self.buffer.draw_disc(center, radius, color, additive)
                    }
                    Shape::Square { angle } => {
                        self.buffer.draw_square(center, radius, angle, color)
                    }
                },
                Drawable::Photo { index, .. } => {
                    if let Some(photo) = scene.photos().get(index) {
                        self.draw_photo(photo, rotation);
                    }
                }
            }
        }
        drawables.clear();
        self.drawables = drawables;

        bloom::apply_bloom(
            &mut self.buffer,
            self.config.bloom_threshold,
            self.config.bloom_strength,
            self.config.bloom_radius,
        );

        Frame {
            rgba: self.buffer.to_rgba8(),
            width: self.config.width,
            height: self.config.height,
            timestamp: Instant::now(),
        }
    }

    fn collect(&mut self, scene: &Scene, rotation: Quat) {
        self.drawables.clear();

        for ornament in scene.ornaments() {
            let world = rotation * ornament.position;
            let Some(p) = self.camera.project(world) else {
                continue;
            };
            let kind = ornament.kind();
            let radius = kind.size() * ornament.scale * p.pixels_per_unit;
            let (color, shape) = match kind {
                OrnamentKind::Light | OrnamentKind::Star => {
                    (ornament.color(), Shape::Disc { additive: true })
                }
                OrnamentKind::Gift => (
                    ornament.color() * self.shade(world),
                    Shape::Square {
                        angle: ornament.rotation.y + ornament.rotation.z,
                    },
                ),
                OrnamentKind::Needle | OrnamentKind::Bauble => (
                    ornament.color() * self.shade(world),
                    Shape::Disc { additive: false },
                ),
            };
            self.drawables.push(Drawable::Sprite {
                center: Vec2::new(p.x, p.y),
                radius,
                color,
                shape,
                depth: p.depth,
            });
        }

        for mote in scene.dust() {
            let Some(p) = self.camera.project(rotation * mote.position) else {
                continue;
            };
            self.drawables.push(Drawable::Sprite {
                center: Vec2::new(p.x, p.y),
                radius: DUST_SIZE * mote.scale * p.pixels_per_unit,
                color: DUST_COLOR,
                shape: Shape::Disc { additive: true },
                depth: p.depth,
            });
        }

        for (index, photo) in scene.photos().iter().enumerate() {
            if let Some(p) = self.camera.project(rotation * photo.position) {
                self.drawables.push(Drawable::Photo {
                    index,
                    depth: p.depth,
                });
            }
        }
    }

    /// Lambert term against the key light, with normals pointing away from the trunk.
    fn shade(&self, world: Vec3) -> f32 {
        let normal = Vec3::new(world.x, 0.25, world.z).normalize_or_zero();
        AMBIENT + DIFFUSE * normal.dot(self.light_dir).max(0.0)
    }

    fn draw_photo(&mut self, photo: &PhotoPlane, rotation: Quat) {
        if photo.scale <= 1e-3 {
            return;
        }
        let texture = photo.texture();
        let half_w = PHOTO_WIDTH * photo.scale * 0.5;
        let half_h = half_w / texture.aspect();
        let border = PHOTO_WIDTH * photo.scale * PHOTO_BORDER;
        let chin = PHOTO_WIDTH * photo.scale * PHOTO_CHIN;

        let to_world = |x: f32, y: f32| {
            rotation * (photo.position + photo.orientation * Vec3::new(x, y, 0.0))
        };
        let facing = (rotation * photo.orientation * Vec3::Z).z >= 0.0;

        let Some(outer) = self.quad_corners([
            to_world(-half_w - border, half_h + border),
            to_world(half_w + border, half_h + border),
            to_world(half_w + border, -half_h - chin),
            to_world(-half_w - border, -half_h - chin),
        ]) else {
            return;
        };
        let paper = PAPER * photo.tint + Vec3::splat(photo.emissive);
        self.buffer.draw_quad(outer, |_, _| paper);

        // the back of a print is blank
        if !facing {
            return;
        }
        let Some(inner) = self.quad_corners([
            to_world(-half_w, half_h),
            to_world(half_w, half_h),
            to_world(half_w, -half_h),
            to_world(-half_w, -half_h),
        ]) else {
            return;
        };
        let (tint, emissive) = (photo.tint, photo.emissive);
        self.buffer.draw_quad(inner, |u, v| {
            let [r, g, b] = texture.sample(u, v);
            let texel = Vec3::new(r as f32, g as f32, b as f32) / 255.0;
            texel * tint + texel * emissive
        });
    }

    fn quad_corners(&self, world: [Vec3; 4]) -> Option<[Vec2; 4]> {
        let mut out = [Vec2::ZERO; 4];
        for (dst, corner) in out.iter_mut().zip(world) {
            let p = self.camera.project(corner)?;
            *dst = Vec2::new(p.x, p.y);
        }
        Some(out)
    }
}
