use glam::{EulerRot, Quat, Vec2};

use crate::{config::SceneConfig, gesture::PinchLatch, types::Gesture};

/// Palm travel below this is treated as a still hand.
const STILL_PALM_EPSILON: f32 = 1e-3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VisualState {
    #[default]
    Tree,
    Scatter,
    Zoom,
    Orbit,
}

impl VisualState {
    pub const ALL: [VisualState; 4] = [
        VisualState::Tree,
        VisualState::Scatter,
        VisualState::Zoom,
        VisualState::Orbit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            VisualState::Tree => "tree",
            VisualState::Scatter => "scatter",
            VisualState::Zoom => "zoom",
            VisualState::Orbit => "orbit",
        }
    }
}

/// Gesture after edge handling: what actually asks for a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    Fist,
    Open,
    PinchStart,
    Peace,
}

impl Trigger {
    pub const ALL: [Trigger; 4] = [
        Trigger::Fist,
        Trigger::Open,
        Trigger::PinchStart,
        Trigger::Peace,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Stay,
    Enter(VisualState),
    NeedsPhotos(Trigger),
}

/// The transition table. Depends only on its arguments.
pub fn transition(current: VisualState, trigger: Trigger, photo_count: usize) -> Transition {
    match trigger {
        Trigger::Fist => Transition::Enter(VisualState::Tree),
        Trigger::Open => match current {
            VisualState::Tree | VisualState::Orbit => Transition::Enter(VisualState::Scatter),
            VisualState::Scatter | VisualState::Zoom => Transition::Stay,
        },
        Trigger::PinchStart | Trigger::Peace if photo_count == 0 => {
            Transition::NeedsPhotos(trigger)
        }
        Trigger::PinchStart => Transition::Enter(VisualState::Zoom),
        Trigger::Peace => Transition::Enter(VisualState::Orbit),
    }
}

/// Something the user should hear about after a gesture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Entered(VisualState),
    Focused { index: usize, name: String },
    NoPhotosToZoom,
    NoPhotosToOrbit,
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::Entered(VisualState::Tree) => "Tree assembled".to_string(),
            Notice::Entered(VisualState::Scatter) => "Scattered, move your hand to spin".to_string(),
            Notice::Entered(VisualState::Zoom) => {
                "Zoomed in, pinch again for the next photo".to_string()
            }
            Notice::Entered(VisualState::Orbit) => "Photos in orbit".to_string(),
            Notice::Focused { index, name } => format!("Photo {} · {name}", index + 1),
            Notice::NoPhotosToZoom => "No photos to zoom into, add some first".to_string(),
            Notice::NoPhotosToOrbit => "No photos yet, upload a few to orbit them".to_string(),
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Notice::NoPhotosToZoom | Notice::NoPhotosToOrbit)
    }
}

/// Inertial rotation of the whole assembly, x = tilt, y = yaw.
#[derive(Clone, Debug, Default)]
pub struct AssemblyMotion {
    rotation: Vec2,
    velocity: Vec2,
    last_palm: Option<Vec2>,
}

impl AssemblyMotion {
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.rotation.y, self.rotation.x, 0.0)
    }

    pub fn angles(&self) -> Vec2 {
        self.rotation
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Hand-driven spin: palm deltas feed velocity, a still or absent hand lets it decay.
    pub fn steer(&mut self, palm: Option<Vec2>, cfg: &SceneConfig) {
        let delta = match (palm, self.last_palm) {
            (Some(now), Some(before)) => now - before,
            _ => Vec2::ZERO,
        };
        self.last_palm = palm;

        if delta.length() > STILL_PALM_EPSILON {
            self.velocity.y += delta.x * cfg.palm_rotation_gain;
            self.velocity.x += delta.y * cfg.palm_rotation_gain;
        } else {
            self.velocity *= cfg.momentum_decay;
        }
        self.velocity.x *= cfg.tilt_decay;
        self.rotation += self.velocity;
    }

    /// Let residual spin run down without input.
    pub fn coast(&mut self, palm: Option<Vec2>, cfg: &SceneConfig) {
        self.last_palm = palm;
        self.velocity *= cfg.momentum_decay;
        self.rotation += self.velocity;
    }

    pub fn auto_orbit(&mut self, palm: Option<Vec2>, cfg: &SceneConfig) {
        self.last_palm = palm;
        self.velocity = Vec2::ZERO;
        self.rotation.y += cfg.orbit_yaw_rate;
        self.rotation.x *= cfg.momentum_decay;
    }
}

/// Owns the visualization state and reacts to gestures.
#[derive(Debug, Default)]
pub struct Choreographer {
    state: VisualState,
    zoom_index: usize,
    pinch: PinchLatch,
    palm: Option<Vec2>,
}

impl Choreographer {
    pub fn state(&self) -> VisualState {
        self.state
    }

    pub fn zoom_index(&self) -> usize {
        self.zoom_index
    }

    pub fn palm(&self) -> Option<Vec2> {
        self.palm
    }

    /// Apply one recognized frame. `photo_names` is only read when focusing a photo.
    pub fn handle(&mut self, gesture: Gesture, palm: Option<Vec2>, photo_names: &[&str]) -> Option<Notice> {
        self.palm = if gesture == Gesture::NoHand { None } else { palm };

        let pinch_started = self.pinch.update(gesture);
        let trigger = match gesture {
            Gesture::Fist => Trigger::Fist,
            Gesture::Open => Trigger::Open,
            Gesture::Peace => Trigger::Peace,
            Gesture::Pinch if pinch_started => Trigger::PinchStart,
            Gesture::Pinch | Gesture::NoHand => return None,
        };

        let photo_count = photo_names.len();
        match transition(self.state, trigger, photo_count) {
            Transition::Stay => None,
            Transition::NeedsPhotos(Trigger::PinchStart) => Some(Notice::NoPhotosToZoom),
            Transition::NeedsPhotos(_) => Some(Notice::NoPhotosToOrbit),
            Transition::Enter(next) => {
                if trigger == Trigger::PinchStart {
                    self.zoom_index = (self.zoom_index + 1) % photo_count;
                }
                let entered = next != self.state;
                if entered {
                    log::debug!("{} -> {} on {:?}", self.state.label(), next.label(), trigger);
                    self.state = next;
                }

                if entered {
                    Some(Notice::Entered(next))
                } else if trigger == Trigger::PinchStart {
                    // already zoomed: the pinch moved on to another photo
                    Some(Notice::Focused {
                        index: self.zoom_index,
                        name: photo_names[self.zoom_index].to_string(),
                    })
                } else {
                    None
                }
            }
        }
    }
}
