//! Procedural placement of tree, scatter and orbit formations.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::Rng;

use crate::config::SceneConfig;

/// 0 at the bottom of the tree, 1 at the top.
pub fn normalized_height(y: f32, tree_height: f32) -> f32 {
    ((y + tree_height * 0.5) / tree_height).clamp(0.0, 1.0)
}

/// Cone radius at height `y`, shrinking linearly toward the top.
pub fn radius_profile(y: f32, cfg: &SceneConfig) -> f32 {
    cfg.tree_radius * (1.0 - normalized_height(y, cfg.tree_height))
}

pub fn tree_position<R: Rng + ?Sized>(rng: &mut R, cfg: &SceneConfig) -> Vec3 {
    let half = cfg.tree_height * 0.5;
    let y = rng.random_range(-half..half);
    let radius = radius_profile(y, cfg) * rng.random_range(0.35..1.0_f32);
    let angle = rng.random_range(0.0..TAU);
    Vec3::new(radius * angle.cos(), y, radius * angle.sin())
}

/// Tree slot for a photo: on the cone surface, kept off the very top and bottom.
pub fn photo_tree_position<R: Rng + ?Sized>(rng: &mut R, cfg: &SceneConfig) -> Vec3 {
    let half = cfg.tree_height * 0.5;
    let y = rng.random_range(-half * 0.8..half * 0.55);
    let radius = radius_profile(y, cfg) + 0.9;
    let angle = rng.random_range(0.0..TAU);
    Vec3::new(radius * angle.cos(), y, radius * angle.sin())
}

/// Uniform direction on the unit sphere.
pub fn sphere_direction<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let z = rng.random_range(-1.0..1.0_f32);
    let theta = rng.random_range(0.0..TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * theta.cos(), r * theta.sin(), z)
}

pub fn scatter_position<R: Rng + ?Sized>(rng: &mut R, cfg: &SceneConfig) -> Vec3 {
    sphere_direction(rng) * rng.random_range(cfg.scatter_min_radius..cfg.scatter_max_radius)
}

/// Yaw that turns a +Z facing plane outward from the tree axis.
pub fn azimuth(position: Vec3) -> f32 {
    position.x.atan2(position.z)
}

/// Position and outward yaw of photo `index` in the orbit rings.
pub fn ring_slot(index: usize, count: usize, cfg: &SceneConfig) -> (Vec3, f32) {
    let per_ring = cfg.photos_per_ring.max(1);
    let rings = count.div_ceil(per_ring).max(1);
    let ring = index / per_ring;
    let slot = index % per_ring;
    let in_ring = (count - ring * per_ring).min(per_ring).max(1);

    let angle = slot as f32 / in_ring as f32 * TAU + ring as f32 * 0.5;
    let y = (ring as f32 - (rings - 1) as f32 * 0.5) * cfg.orbit_ring_spacing;
    let position = Vec3::new(
        cfg.orbit_radius * angle.sin(),
        y,
        cfg.orbit_radius * angle.cos(),
    );
    (position, angle)
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn tree_positions_stay_inside_the_cone() {
        let cfg = SceneConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2_000 {
            let p = tree_position(&mut rng, &cfg);
            assert!(p.y.abs() <= cfg.tree_height * 0.5);
            let lateral = (p.x * p.x + p.z * p.z).sqrt();
            assert!(lateral <= radius_profile(p.y, &cfg) + 1e-4);
        }
    }

    #[test]
    fn scatter_positions_lie_in_the_shell() {
        let cfg = SceneConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1_000 {
            let len = scatter_position(&mut rng, &cfg).length();
            assert!(len >= cfg.scatter_min_radius - 1e-3);
            assert!(len <= cfg.scatter_max_radius + 1e-3);
        }
    }

    #[test]
    fn profile_shrinks_with_height() {
        let cfg = SceneConfig::default();
        let half = cfg.tree_height * 0.5;
        assert!((radius_profile(-half, &cfg) - cfg.tree_radius).abs() < 1e-6);
        assert!(radius_profile(half, &cfg).abs() < 1e-6);
        assert!(radius_profile(0.0, &cfg) < radius_profile(-1.0, &cfg));
    }

    #[test]
    fn ring_slots_are_evenly_spaced_and_face_outward() {
        let cfg = SceneConfig {
            photos_per_ring: 4,
            ..SceneConfig::default()
        };
        let slots: Vec<_> = (0..8).map(|i| ring_slot(i, 8, &cfg)).collect();

        for (pos, yaw) in &slots {
            assert!((pos.x.hypot(pos.z) - cfg.orbit_radius).abs() < 1e-4);
            assert!((azimuth(*pos) - yaw.sin().atan2(yaw.cos())).abs() < 1e-4);
        }
        // two rings, symmetric around the origin
        assert!((slots[0].0.y + slots[4].0.y).abs() < 1e-5);
        assert!((slots[1].1 - slots[0].1 - TAU / 4.0).abs() < 1e-5);
    }
}
