use glam::{Vec2, Vec3};
use rand::Rng;

use super::layout;
use crate::config::SceneConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrnamentKind {
    Needle,
    Bauble,
    Light,
    Gift,
    Star,
}

impl OrnamentKind {
    fn pick<R: Rng + ?Sized>(rng: &mut R) -> Self {
        match rng.random_range(0..100) {
            0..60 => OrnamentKind::Needle,
            60..80 => OrnamentKind::Bauble,
            80..92 => OrnamentKind::Light,
            _ => OrnamentKind::Gift,
        }
    }

    /// World-space radius at scale 1.
    pub fn size(&self) -> f32 {
        match self {
            OrnamentKind::Needle => 0.09,
            OrnamentKind::Bauble => 0.17,
            OrnamentKind::Light => 0.07,
            OrnamentKind::Gift => 0.2,
            OrnamentKind::Star => 0.45,
        }
    }

    fn color<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        const BAUBLE_COLORS: [Vec3; 2] = [Vec3::new(0.85, 0.08, 0.12), Vec3::new(0.95, 0.72, 0.2)];
        match self {
            OrnamentKind::Needle => {
                let g = rng.random_range(0.35..0.7_f32);
                Vec3::new(0.05, g, 0.12 + g * 0.2)
            }
            OrnamentKind::Bauble => BAUBLE_COLORS[rng.random_range(0..BAUBLE_COLORS.len())],
            // above 1.0 so the bloom pass picks them up
            OrnamentKind::Light => Vec3::new(1.6, 1.4, 0.9),
            OrnamentKind::Gift => match rng.random_range(0..3) {
                0 => Vec3::new(0.8, 0.1, 0.1),
                1 => Vec3::new(0.1, 0.55, 0.2),
                _ => Vec3::new(0.95, 0.8, 0.3),
            },
            OrnamentKind::Star => Vec3::new(2.2, 1.9, 0.8),
        }
    }
}

/// One instanced ornament. Tree and scatter targets are fixed at creation.
#[derive(Clone, Debug)]
pub struct Ornament {
    kind: OrnamentKind,
    color: Vec3,
    tree_pos: Vec3,
    scatter_pos: Vec3,
    spin_rate: Vec3,
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: f32,
}

impl Ornament {
    pub fn random<R: Rng + ?Sized>(rng: &mut R, cfg: &SceneConfig) -> Self {
        let kind = OrnamentKind::pick(rng);
        let tree_pos = layout::tree_position(rng, cfg);
        let spin_rate = Vec3::new(
            rng.random_range(-0.03..0.03),
            rng.random_range(-0.05..0.05),
            rng.random_range(-0.03..0.03),
        );
        Self {
            kind,
            color: kind.color(rng),
            tree_pos,
            scatter_pos: layout::scatter_position(rng, cfg),
            spin_rate,
            position: tree_pos,
            rotation: Vec3::ZERO,
            scale: 1.0,
        }
    }

    pub fn star<R: Rng + ?Sized>(rng: &mut R, cfg: &SceneConfig) -> Self {
        let kind = OrnamentKind::Star;
        let tree_pos = Vec3::new(0.0, cfg.tree_height * 0.5 + 0.3, 0.0);
        Self {
            kind,
            color: kind.color(rng),
            tree_pos,
            scatter_pos: Vec3::new(0.0, cfg.scatter_max_radius, 0.0),
            spin_rate: Vec3::new(0.0, 0.02, 0.0),
            position: tree_pos,
            rotation: Vec3::ZERO,
            scale: 1.0,
        }
    }

    pub fn kind(&self) -> OrnamentKind {
        self.kind
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn tree_position(&self) -> Vec3 {
        self.tree_pos
    }

    pub fn scatter_position(&self) -> Vec3 {
        self.scatter_pos
    }

    pub fn blend_toward(&mut self, target: Vec3, scale: f32, factor: f32) {
        self.position = self.position.lerp(target, factor);
        self.scale += (scale - self.scale) * factor;
    }

    pub fn spin(&mut self) {
        self.rotation += self.spin_rate;
    }
}

/// A small glowing mote that drifts up through the tree.
#[derive(Clone, Debug)]
pub struct DustMote {
    tree_pos: Vec3,
    scatter_pos: Vec3,
    speed: f32,
    pub position: Vec3,
    pub scale: f32,
}

impl DustMote {
    pub fn random<R: Rng + ?Sized>(rng: &mut R, cfg: &SceneConfig) -> Self {
        let tree_pos = layout::tree_position(rng, cfg);
        Self {
            tree_pos,
            scatter_pos: layout::scatter_position(rng, cfg),
            speed: rng.random_range(cfg.dust_min_speed..cfg.dust_max_speed),
            position: tree_pos,
            scale: 1.0,
        }
    }

    pub fn tree_position(&self) -> Vec3 {
        self.tree_pos
    }

    pub fn scatter_position(&self) -> Vec3 {
        self.scatter_pos
    }

    pub fn blend_toward(&mut self, target: Vec3, scale: f32, factor: f32) {
        self.position = self.position.lerp(target, factor);
        self.scale += (scale - self.scale) * factor;
    }

    /// Tree-state motion: rise, recycle to the bottom, stay inside the cone.
    pub fn rise(&mut self, cfg: &SceneConfig) {
        let half = cfg.tree_height * 0.5;
        let factor = cfg.position_blend;

        self.position.x += (self.tree_pos.x - self.position.x) * factor;
        self.position.z += (self.tree_pos.z - self.position.z) * factor;
        self.scale += (1.0 - self.scale) * factor;

        self.position.y += self.speed;
        if !(-half..=half).contains(&self.position.y) {
            self.position.y = -half;
        }

        let limit = layout::radius_profile(self.position.y, cfg);
        let lateral = Vec2::new(self.position.x, self.position.z);
        if lateral.length() > limit {
            let pulled = lateral * cfg.dust_pull;
            self.position.x = pulled.x;
            self.position.z = pulled.y;
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn blend_closes_a_fixed_fraction() {
        let cfg = SceneConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut ornament = Ornament::random(&mut rng, &cfg);
        let start = ornament.position;
        let target = ornament.scatter_position();

        ornament.blend_toward(target, 0.5, 0.08);
        let expected = start + (target - start) * 0.08;
        assert!(ornament.position.distance(expected) < 1e-5);
        assert!((ornament.scale - 0.96).abs() < 1e-6);
        assert_eq!(ornament.tree_position(), start);
    }

    #[test]
    fn dust_stays_inside_the_tree_span() {
        let cfg = SceneConfig::default();
        let half = cfg.tree_height * 0.5;
        let mut rng = StdRng::seed_from_u64(5);
        let mut motes: Vec<DustMote> = (0..200).map(|_| DustMote::random(&mut rng, &cfg)).collect();
        for mote in &mut motes {
            mote.position = mote.scatter_position();
        }

        for _ in 0..1_500 {
            for mote in &mut motes {
                mote.rise(&cfg);
                assert!(mote.position.y >= -half && mote.position.y <= half);
            }
        }
    }

    #[test]
    fn dust_outside_the_cone_is_pulled_in() {
        let cfg = SceneConfig::default();
        let half = cfg.tree_height * 0.5;
        let mut rng = StdRng::seed_from_u64(11);

        let mut outside = DustMote::random(&mut rng, &cfg);
        outside.position = Vec3::new(cfg.tree_radius, half * 0.8, 0.0);
        let before = outside.position.x.hypot(outside.position.z);
        outside.rise(&cfg);
        let after = outside.position.x.hypot(outside.position.z);
        assert!(after < before);
        let blended = Vec2::new(
            cfg.tree_radius + (outside.tree_pos.x - cfg.tree_radius) * cfg.position_blend,
            outside.tree_pos.z * cfg.position_blend,
        );
        assert!((after - blended.length() * cfg.dust_pull).abs() < 1e-4);

        // well inside the profile only the blend toward its slot applies
        let mut inside = DustMote::random(&mut rng, &cfg);
        inside.tree_pos = Vec3::new(1.0, -half * 0.5, 0.0);
        inside.position = inside.tree_pos;
        inside.rise(&cfg);
        assert_eq!(inside.position.x, 1.0);
        assert_eq!(inside.position.z, 0.0);
    }

    #[test]
    fn dust_recycles_past_the_top() {
        let cfg = SceneConfig::default();
        let half = cfg.tree_height * 0.5;
        let mut rng = StdRng::seed_from_u64(9);
        let mut mote = DustMote::random(&mut rng, &cfg);
        mote.position.y = half - 1e-4;
        mote.rise(&cfg);
        assert_eq!(mote.position.y, -half);
    }
}
