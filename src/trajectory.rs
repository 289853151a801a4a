// src/trajectory.rs
//! Closed parametric path for the slime actor.

use glam::Vec3;

/// A figure-eight loop in the XZ plane. `update` advances an internal
/// phase; `position` is stable between updates so every consumer in a
/// frame sees the same point.
pub struct Trajectory {
    center: Vec3,
    extent: f32,
    speed: f32,
    phase: f32,
    enabled: bool,
}

impl Trajectory {
    pub fn new(center: Vec3, extent: f32, speed: f32) -> Self {
        Self {
            center,
            extent,
            speed,
            phase: 0.0,
            enabled: true,
        }
    }

    pub fn enable(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn update(&mut self, dt: f32) {
        if self.enabled {
            self.phase = (self.phase + self.speed * dt) % (2.0 * std::f32::consts::PI);
        }
    }

    pub fn position(&self) -> Vec3 {
        let t = self.phase;
        self.center + Vec3::new(self.extent * t.sin(), 0.0, self.extent * t.sin() * t.cos())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_trajectory_holds_position() {
        let mut path = Trajectory::new(Vec3::ZERO, 10.0, 1.0);
        path.enable(false);
        let before = path.position();
        path.update(0.5);
        assert_eq!(path.position(), before);
    }

    #[test]
    fn path_stays_within_extent() {
        let mut path = Trajectory::new(Vec3::new(0.0, 0.0, -10.0), 15.0, 0.7);
        for _ in 0..1000 {
            path.update(0.016);
            let offset = path.position() - Vec3::new(0.0, 0.0, -10.0);
            assert!(offset.length() <= 15.0 * 1.001);
            assert_eq!(offset.y, 0.0);
        }
    }
}
