//! Bloom Arena - deterministic simulation core for a top-down arena shooter
//!
//! Core modules:
//! - `sim`: Deterministic simulation (obstacle grid, entity pools, collisions,
//!   combat, flower coverage index)
//! - `settings`: Data-driven game feel tuning
//!
//! Rendering, input devices, audio and UI live outside this crate; they
//! consume read-only snapshots and inject callbacks (`sim::EventSink`).

pub mod settings;
pub mod sim;

pub use settings::ImpactFeel;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 4;

    /// One obstacle cell is 1.0 world units; all other sizes follow from it.
    pub const UNIT_RADIUS: f32 = 0.35;
    pub const UNIT_MOVE_SPEED: f32 = 5.2;
    /// Per-second velocity damping applied to units and loose physics props
    pub const UNIT_FRICTION: f32 = 9.0;

    /// HP awarded to the killer on a kill (capped at max HP)
    pub const KILL_HP_BONUS: f32 = 25.0;
    pub const RESPAWN_DELAY_TICKS: u32 = 180;
    /// Damage per second while outside the arena ring
    pub const ARENA_BOUNDARY_DPS: f32 = 12.0;

    /// Pool capacities - fixed at construction, never resized
    pub const MAX_PROJECTILES: usize = 128;
    pub const MAX_THROWABLES: usize = 32;
    pub const MAX_MOLOTOV_ZONES: usize = 16;
    pub const MAX_EXPLOSIONS: usize = 32;
    pub const MAX_FLOWERS: usize = 512;
    pub const MAX_PICKUPS: usize = 48;
    pub const MAX_DEBRIS: usize = 128;
    pub const MAX_RAGDOLLS: usize = 16;
    pub const MAX_KILL_PETALS: usize = 64;
    pub const MAX_SHELL_CASINGS: usize = 96;
    pub const MAX_FLIGHT_TRAILS: usize = 160;

    /// Soft cap on summed bloom weight per density cell
    pub const FLOWER_CELL_SOFT_CAP: i32 = 18;
    pub const FLOWER_PLACEMENT_ATTEMPTS: usize = 9;
    /// Half-angle of the placement cone around the burst direction (radians)
    pub const FLOWER_CONE_HALF_ANGLE: f32 = 0.65;
    pub const FLOWER_MIN_DIST: f32 = 0.25;
    pub const FLOWER_MAX_DIST: f32 = 1.6;

    /// Obstacle push-out settles in at most this many passes per unit per tick
    pub const OBSTACLE_SETTLE_PASSES: usize = 3;
    /// Velocity kick per world unit of overlap during push-out
    pub const OBSTACLE_PUSH_KICK: f32 = 2.5;
    /// Sample count for ray-marched projectile-vs-grid hits
    pub const RAY_MARCH_STEPS: usize = 8;
    /// Seconds of travel to back-track before ray marching
    pub const RAY_BACKTRACK: f32 = 0.012;
    /// Resolved ricochet positions end up at least this far outside the cell
    pub const RICOCHET_SEPARATION: f32 = 0.02;

    /// Flat damage applied to each cell caught in a blast
    pub const EXPLOSION_CELL_DAMAGE: f32 = 12.0;
    pub const KNOCKBACK_PER_DAMAGE: f32 = 0.12;
    pub const MAX_KNOCKBACK: f32 = 9.0;

    /// Camera view half-extents in world units (cells)
    pub const VIEW_HALF_WIDTH: f32 = 12.0;
    pub const VIEW_HALF_HEIGHT: f32 = 7.0;
    /// Extra padding used when culling FX updates
    pub const FX_CULL_PADDING: f32 = 2.0;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Unit vector for an angle in radians
#[inline]
pub fn vec_from_angle(theta: f32) -> Vec2 {
    Vec2::new(theta.cos(), theta.sin())
}

/// Rotate a vector by an angle in radians
#[inline]
pub fn rotate_vec(v: Vec2, theta: f32) -> Vec2 {
    Vec2::from_angle(theta).rotate(v)
}
