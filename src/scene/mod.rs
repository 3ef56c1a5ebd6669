//! Particle tree, photo planes and the per-frame choreography between formations.

pub mod choreographer;
pub mod layout;
pub mod particles;
pub mod photo;

use glam::{Quat, Vec2, Vec3};
use rand::{SeedableRng, rngs::StdRng};

use crate::{config::SceneConfig, types::Gesture};

pub use choreographer::{Notice, VisualState};
pub use particles::{DustMote, Ornament, OrnamentKind};
pub use photo::{LoadedPhoto, PhotoPlane};

/// Yaw per second added to photos resting on the tree.
const PHOTO_DRIFT_RATE: f32 = 0.25;

/// Everything the two per-frame entry points (`handle_gesture`, `update`) work on.
pub struct Scene {
    config: SceneConfig,
    rng: StdRng,
    ornaments: Vec<Ornament>,
    dust: Vec<DustMote>,
    photos: Vec<PhotoPlane>,
    choreographer: choreographer::Choreographer,
    motion: choreographer::AssemblyMotion,
    elapsed: f32,
}

impl Scene {
    pub fn new(config: SceneConfig, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut ornaments = Vec::with_capacity(config.ornament_count + 1);
        ornaments.push(Ornament::star(&mut rng, &config));
        ornaments.extend((0..config.ornament_count).map(|_| Ornament::random(&mut rng, &config)));
        let dust = (0..config.dust_count)
            .map(|_| DustMote::random(&mut rng, &config))
            .collect();

        log::info!(
            "scene built with {} ornaments and {} dust motes",
            ornaments.len(),
            config.dust_count
        );

        Self {
            config,
            rng,
            ornaments,
            dust,
            photos: Vec::new(),
            choreographer: choreographer::Choreographer::default(),
            motion: choreographer::AssemblyMotion::default(),
            elapsed: 0.0,
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn state(&self) -> VisualState {
        self.choreographer.state()
    }

    pub fn zoom_index(&self) -> usize {
        self.choreographer.zoom_index()
    }

    pub fn ornaments(&self) -> &[Ornament] {
        &self.ornaments
    }

    pub fn dust(&self) -> &[DustMote] {
        &self.dust
    }

    pub fn photos(&self) -> &[PhotoPlane] {
        &self.photos
    }

    /// Rotation applied to the whole assembly before projection.
    pub fn assembly_rotation(&self) -> Quat {
        self.motion.rotation()
    }

    /// Index of the highlighted photo, if any.
    pub fn active_photo(&self) -> Option<usize> {
        (self.state() == VisualState::Zoom && !self.photos.is_empty())
            .then(|| self.zoom_index() % self.photos.len())
    }

    pub fn add_photo(&mut self, photo: LoadedPhoto) {
        let plane = PhotoPlane::new(photo, &mut self.rng, &self.config);
        log::debug!("mounted photo {} as #{}", plane.name(), self.photos.len());
        self.photos.push(plane);
    }

    pub fn handle_gesture(&mut self, gesture: Gesture, palm: Option<Vec2>) -> Option<Notice> {
        let names: Vec<&str> = self.photos.iter().map(|p| p.name()).collect();
        self.choreographer.handle(gesture, palm, &names)
    }

    /// Advance one frame. `elapsed` is seconds since start and only drives periodic motion.
    pub fn update(&mut self, elapsed: f32) {
        self.elapsed = elapsed;
        let cfg = &self.config;
        let factor = cfg.position_blend;
        let palm = self.choreographer.palm();

        match self.choreographer.state() {
            VisualState::Tree => {
                self.motion.coast(palm, cfg);
                for ornament in &mut self.ornaments {
                    ornament.blend_toward(ornament.tree_position(), 1.0, factor);
                    ornament.spin();
                }
                for mote in &mut self.dust {
                    mote.rise(cfg);
                }
            }
            VisualState::Scatter => {
                self.motion.steer(palm, cfg);
                for (i, ornament) in self.ornaments.iter_mut().enumerate() {
                    let target = ornament.scatter_position() + bob(cfg, elapsed, i);
                    ornament.blend_toward(target, 1.0, factor);
                    ornament.spin();
                }
                for (i, mote) in self.dust.iter_mut().enumerate() {
                    let target = mote.scatter_position() + bob(cfg, elapsed, i);
                    mote.blend_toward(target, 1.0, factor);
                }
            }
            VisualState::Zoom => {
                self.motion.coast(palm, cfg);
                for ornament in &mut self.ornaments {
                    ornament.blend_toward(ornament.scatter_position(), 0.5, factor);
                    ornament.spin();
                }
                for mote in &mut self.dust {
                    mote.blend_toward(mote.scatter_position(), 0.5, factor);
                }
            }
            VisualState::Orbit => {
                self.motion.auto_orbit(palm, cfg);
                for ornament in &mut self.ornaments {
                    ornament.blend_toward(ornament.tree_position(), 1.0, factor);
                    ornament.spin();
                }
                for mote in &mut self.dust {
                    mote.rise(cfg);
                }
            }
        }

        self.update_photos();
    }

    fn update_photos(&mut self) {
        let cfg = &self.config;
        let factor = cfg.position_blend;
        let state = self.choreographer.state();
        let active = self.active_photo();
        let count = self.photos.len();
        // Undo the assembly rotation so a focused photo sits still in front of the camera.
        let to_local = self.motion.rotation().inverse();

        for (i, photo) in self.photos.iter_mut().enumerate() {
            let (target, orientation, scale) = match state {
                VisualState::Tree => (
                    photo.tree_position(),
                    Quat::from_rotation_y(photo.base_yaw() + self.elapsed * PHOTO_DRIFT_RATE),
                    1.0,
                ),
                VisualState::Scatter => (
                    photo.scatter_position() + bob(cfg, self.elapsed, i),
                    to_local,
                    1.0,
                ),
                VisualState::Zoom if active == Some(i) => (
                    to_local * Vec3::new(0.0, 0.0, cfg.zoom_focus_z),
                    to_local,
                    cfg.zoom_scale,
                ),
                VisualState::Zoom => (photo.scatter_position(), to_local, 0.5),
                VisualState::Orbit => {
                    let (slot, yaw) = layout::ring_slot(i, count, cfg);
                    (slot, Quat::from_rotation_y(yaw), 1.0)
                }
            };
            photo.blend_toward(target, orientation, scale, factor);
            photo.blend_highlight(active == Some(i), cfg.color_blend);
        }
    }
}

fn bob(cfg: &SceneConfig, elapsed: f32, index: usize) -> Vec3 {
    Vec3::Y * (elapsed * cfg.bob_speed + index as f32).sin() * cfg.bob_amplitude
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::photo::tests::solid_photo;

    fn small_scene() -> Scene {
        let cfg = SceneConfig {
            ornament_count: 120,
            dust_count: 80,
            ..SceneConfig::default()
        };
        Scene::new(cfg, Some(42))
    }

    fn run(scene: &mut Scene, frames: usize) {
        let start = scene.elapsed;
        for f in 0..frames {
            scene.update(start + f as f32 / 60.0);
        }
    }

    #[test]
    fn starts_as_a_tree() {
        let scene = small_scene();
        assert_eq!(scene.state(), VisualState::Tree);
        assert_eq!(scene.ornaments().len(), 121);
        assert_eq!(scene.ornaments()[0].kind(), OrnamentKind::Star);
        assert!(scene.photos().is_empty());
        assert_eq!(scene.active_photo(), None);
    }

    #[test]
    fn seeded_scenes_are_identical() {
        let a = small_scene();
        let b = small_scene();
        for (x, y) in a.ornaments().iter().zip(b.ornaments()) {
            assert_eq!(x.tree_position(), y.tree_position());
            assert_eq!(x.scatter_position(), y.scatter_position());
        }
    }

    #[test]
    fn open_palm_scatters_and_fist_rebuilds() {
        let mut scene = small_scene();
        assert_eq!(
            scene.handle_gesture(Gesture::Open, Some(Vec2::splat(0.5))),
            Some(Notice::Entered(VisualState::Scatter))
        );
        run(&mut scene, 120);
        let ornament = &scene.ornaments()[10];
        assert!(ornament.position.distance(ornament.scatter_position()) < 0.3);

        scene.handle_gesture(Gesture::Fist, Some(Vec2::splat(0.5)));
        assert_eq!(scene.state(), VisualState::Tree);
        run(&mut scene, 200);
        let ornament = &scene.ornaments()[10];
        assert!(ornament.position.distance(ornament.tree_position()) < 1e-3);
    }

    #[test]
    fn targets_never_move() {
        let mut scene = small_scene();
        scene.add_photo(solid_photo("p.png"));
        let before: Vec<(Vec3, Vec3)> = scene
            .ornaments()
            .iter()
            .map(|o| (o.tree_position(), o.scatter_position()))
            .collect();
        let photo_before = (scene.photos()[0].tree_position(), scene.photos()[0].scatter_position());

        for gesture in [Gesture::Open, Gesture::Pinch, Gesture::Peace, Gesture::Fist] {
            scene.handle_gesture(gesture, Some(Vec2::splat(0.4)));
            run(&mut scene, 30);
        }

        for (o, (tree, scatter)) in scene.ornaments().iter().zip(before) {
            assert_eq!(o.tree_position(), tree);
            assert_eq!(o.scatter_position(), scatter);
        }
        assert_eq!(
            (scene.photos()[0].tree_position(), scene.photos()[0].scatter_position()),
            photo_before
        );
    }

    #[test]
    fn dust_stays_within_the_tree_while_resting() {
        let mut scene = small_scene();
        scene.handle_gesture(Gesture::Open, None);
        run(&mut scene, 90);
        scene.handle_gesture(Gesture::Fist, None);

        let half = scene.config().tree_height * 0.5;
        for f in 0..600 {
            scene.update(f as f32 / 60.0);
            for mote in scene.dust() {
                assert!((-half..=half).contains(&mote.position.y));
            }
        }
    }

    #[test]
    fn zoom_brings_the_target_forward_and_lights_it() {
        let mut scene = small_scene();
        scene.add_photo(solid_photo("a.png"));
        scene.add_photo(solid_photo("b.png"));

        let notice = scene.handle_gesture(Gesture::Pinch, Some(Vec2::splat(0.5)));
        assert_eq!(notice, Some(Notice::Entered(VisualState::Zoom)));
        assert_eq!(scene.active_photo(), Some(1));
        run(&mut scene, 240);

        let focus = scene.assembly_rotation() * scene.photos()[1].position;
        assert!(focus.distance(Vec3::new(0.0, 0.0, scene.config().zoom_focus_z)) < 0.05);
        assert!((scene.photos()[1].scale - scene.config().zoom_scale).abs() < 0.01);
        assert!(scene.photos()[1].emissive > scene.photos()[0].emissive);
        assert!(scene.photos()[1].tint.x > scene.photos()[0].tint.x);
        assert!((scene.photos()[0].scale - 0.5).abs() < 0.01);
        assert!((scene.ornaments()[5].scale - 0.5).abs() < 0.01);
    }

    #[test]
    fn orbit_lays_photos_in_rings() {
        let mut scene = small_scene();
        for i in 0..8 {
            scene.add_photo(solid_photo(&format!("{i}.png")));
        }
        scene.handle_gesture(Gesture::Peace, None);
        assert_eq!(scene.state(), VisualState::Orbit);
        let yaw_before = scene.motion.angles().y;
        run(&mut scene, 300);

        let cfg = scene.config().clone();
        for (i, photo) in scene.photos().iter().enumerate() {
            let (slot, _) = layout::ring_slot(i, 8, &cfg);
            assert!(photo.position.distance(slot) < 0.01);
        }
        assert!(scene.motion.angles().y > yaw_before);
    }

    #[test]
    fn scatter_targets_bob_with_time_and_index() {
        let mut scene = small_scene();
        scene.handle_gesture(Gesture::Open, None);
        let cfg = scene.config().clone();
        let i = 7;

        for elapsed in [0.25_f32, 1.1] {
            let before = scene.ornaments()[i].position;
            scene.update(elapsed);
            let target = scene.ornaments()[i].scatter_position() + bob(&cfg, elapsed, i);
            let expected = before + (target - before) * cfg.position_blend;
            assert!(scene.ornaments()[i].position.distance(expected) < 1e-4);
        }

        let delta = bob(&cfg, 1.1, i).y - bob(&cfg, 0.25, i).y;
        let expected = ((1.1 * cfg.bob_speed + 7.0).sin() - (0.25 * cfg.bob_speed + 7.0).sin())
            * cfg.bob_amplitude;
        assert!((delta - expected).abs() < 1e-6);
        assert!(delta.abs() > 1e-3);
        // neighbours are out of phase
        assert!((bob(&cfg, 0.25, i).y - bob(&cfg, 0.25, i + 1).y).abs() > 1e-3);
    }

    #[test]
    fn resting_photos_drift_from_their_azimuth_until_orbit() {
        let mut scene = small_scene();
        scene.add_photo(solid_photo("a.png"));
        let base_yaw = scene.photos()[0].base_yaw();

        let elapsed = 3.0;
        for _ in 0..300 {
            scene.update(elapsed);
        }
        let resting = Quat::from_rotation_y(base_yaw + elapsed * PHOTO_DRIFT_RATE);
        assert!(scene.photos()[0].orientation.angle_between(resting) < 1e-2);

        scene.handle_gesture(Gesture::Peace, None);
        assert_eq!(scene.state(), VisualState::Orbit);
        let (_, ring_yaw) = layout::ring_slot(0, 1, scene.config());
        let ring = Quat::from_rotation_y(ring_yaw);
        // time keeps running, but only the ring yaw matters now
        for f in 0..300 {
            scene.update(elapsed + f as f32 / 60.0);
        }
        assert!(scene.photos()[0].orientation.angle_between(ring) < 1e-2);
    }

    #[test]
    fn scatter_spin_follows_the_palm() {
        let mut scene = small_scene();
        scene.handle_gesture(Gesture::Open, Some(Vec2::new(0.3, 0.5)));
        scene.update(0.0);
        scene.handle_gesture(Gesture::Open, Some(Vec2::new(0.5, 0.5)));
        scene.update(0.016);
        let spinning = scene.motion.velocity().y;
        assert!(spinning > 0.0);

        scene.handle_gesture(Gesture::NoHand, None);
        for f in 0..60 {
            scene.update(f as f32 / 60.0);
        }
        assert!(scene.motion.velocity().y < spinning * 0.1);
    }
}
