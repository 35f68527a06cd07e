//! Camera feedback scalars and cull bounds
//!
//! The camera itself is render-side; the sim owns only the feedback scalars
//! (shake, kick, hit-stop) and the cull rectangle every FX-update pass and
//! renderer must use identically, so simulation and drawing agree on what is
//! on screen.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{VIEW_HALF_HEIGHT, VIEW_HALF_WIDTH};

/// Sim-side camera state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Camera {
    pub pos: Vec2,
    /// Screen shake magnitude, 0..~1.5, decays every tick
    pub shake: f32,
    /// Aim-lead offset, written by the embedding layer, read by renderers
    pub offset: Vec2,
    /// Directional kick, decays toward zero
    pub kick: Vec2,
    /// Frames the external frame loop should freeze for
    pub hit_stop_ticks: u32,
}

impl Camera {
    /// Add shake up to a cap (caps differ for player-caused vs received)
    pub fn add_shake(&mut self, amount: f32, cap: f32) {
        self.shake = (self.shake + amount).min(cap);
    }

    pub fn add_kick(&mut self, dir: Vec2, amount: f32) {
        self.kick += dir * amount;
        self.kick = self.kick.clamp_length_max(0.6);
    }

    /// Per-tick decay of all feedback scalars
    pub fn decay(&mut self, _dt: f32) {
        self.shake *= 0.9;
        if self.shake < 0.01 {
            self.shake = 0.0;
        }
        self.kick *= 0.82;
        if self.kick.length_squared() < 0.0001 {
            self.kick = Vec2::ZERO;
        }
        self.hit_stop_ticks = self.hit_stop_ticks.saturating_sub(1);
    }
}

/// Camera-relative visibility rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CullBounds {
    pub min: Vec2,
    pub max: Vec2,
}

/// Bounds of what the camera can see, grown by `padding` world units
pub fn build_cull_bounds(camera_pos: Vec2, padding: f32) -> CullBounds {
    let half = Vec2::new(VIEW_HALF_WIDTH + padding, VIEW_HALF_HEIGHT + padding);
    CullBounds {
        min: camera_pos - half,
        max: camera_pos + half,
    }
}

/// Shared point-in-bounds test used by renderers and FX-update passes alike
#[inline]
pub fn is_inside_cull_bounds(x: f32, y: f32, bounds: &CullBounds, padding: f32) -> bool {
    x >= bounds.min.x - padding
        && x <= bounds.max.x + padding
        && y >= bounds.min.y - padding
        && y <= bounds.max.y + padding
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_shake_decays_to_zero() {
        let mut cam = Camera::default();
        cam.add_shake(1.0, 1.0);
        for _ in 0..120 {
            cam.decay(1.0 / 60.0);
        }
        assert_eq!(cam.shake, 0.0);
        assert_eq!(cam.kick, Vec2::ZERO);
    }

    #[test]
    fn test_point_inside_padded_bounds() {
        let bounds = build_cull_bounds(Vec2::new(10.0, 10.0), 0.0);
        assert!(is_inside_cull_bounds(10.0, 10.0, &bounds, 0.0));
        let just_outside = 10.0 + VIEW_HALF_WIDTH + 0.5;
        assert!(!is_inside_cull_bounds(just_outside, 10.0, &bounds, 0.0));
        assert!(is_inside_cull_bounds(just_outside, 10.0, &bounds, 1.0));
    }

    proptest! {
        /// A larger padding strictly contains the bounds of a smaller one.
        #[test]
        fn prop_padding_monotonic(
            cx in -100.0f32..100.0,
            cy in -100.0f32..100.0,
            p1 in 0.0f32..10.0,
            extra in 0.01f32..10.0,
        ) {
            let p2 = p1 + extra;
            let small = build_cull_bounds(Vec2::new(cx, cy), p1);
            let big = build_cull_bounds(Vec2::new(cx, cy), p2);
            prop_assert!(big.min.x < small.min.x);
            prop_assert!(big.min.y < small.min.y);
            prop_assert!(big.max.x > small.max.x);
            prop_assert!(big.max.y > small.max.y);
        }
    }
}
