//! Transient FX entities: explosions, trails, debris, shells, ragdolls,
//! kill petals
//!
//! Short-lived pooled entities with no gameplay effect beyond feedback.
//! Updates outside the camera's cull bounds are skipped entirely - the
//! entity is deactivated rather than simulated off screen, using the same
//! bounds helper the renderer culls with.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::FX_CULL_PADDING;

use super::camera::{build_cull_bounds, is_inside_cull_bounds};
use super::collision::{apply_obstacle_ricochet, raymarch_grid_hit};
use super::grid::Material;
use super::pool::PoolSlot;
use super::rng::fx_rng;
use super::state::{TeamId, World};

const DEBRIS_LIFE: f32 = 1.4;
const RAGDOLL_LIFE: f32 = 3.0;
const SHELL_LIFE: f32 = 4.0;
const TRAIL_LIFE: f32 = 0.22;
const PETAL_LIFE: f32 = 0.9;
const EXPLOSION_LIFE: f32 = 0.45;

/// Expanding blast ring
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Explosion {
    pub active: bool,
    pub pos: Vec2,
    pub radius: f32,
    pub max_radius: f32,
    pub life: f32,
}

impl PoolSlot for Explosion {
    fn active(&self) -> bool {
        self.active
    }
    fn deactivate(&mut self) {
        self.active = false;
    }
}

/// Chunk of a destroyed obstacle
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Debris {
    pub active: bool,
    pub pos: Vec2,
    pub prev_pos: Vec2,
    pub vel: Vec2,
    pub rot: f32,
    pub rot_vel: f32,
    pub size: f32,
    pub material: Material,
    pub life: f32,
}

impl PoolSlot for Debris {
    fn active(&self) -> bool {
        self.active
    }
    fn deactivate(&mut self) {
        self.active = false;
    }
}

/// Corpse physics prop
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Ragdoll {
    pub active: bool,
    pub pos: Vec2,
    pub prev_pos: Vec2,
    pub vel: Vec2,
    pub rot: f32,
    pub rot_vel: f32,
    pub team: TeamId,
    pub life: f32,
}

impl PoolSlot for Ragdoll {
    fn active(&self) -> bool {
        self.active
    }
    fn deactivate(&mut self) {
        self.active = false;
    }
}

/// Ejected brass
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ShellCasing {
    pub active: bool,
    pub pos: Vec2,
    pub vel: Vec2,
    pub rot: f32,
    pub rot_vel: f32,
    pub life: f32,
}

impl PoolSlot for ShellCasing {
    fn active(&self) -> bool {
        self.active
    }
    fn deactivate(&mut self) {
        self.active = false;
    }
}

/// Fading muzzle/flight streak
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FlightTrail {
    pub active: bool,
    pub pos: Vec2,
    pub dir: Vec2,
    pub len: f32,
    pub life: f32,
}

impl PoolSlot for FlightTrail {
    fn active(&self) -> bool {
        self.active
    }
    fn deactivate(&mut self) {
        self.active = false;
    }
}

/// Kill confirmation burst petal
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct KillPetal {
    pub active: bool,
    pub pos: Vec2,
    pub vel: Vec2,
    pub team: TeamId,
    pub size: f32,
    pub life: f32,
}

impl PoolSlot for KillPetal {
    fn active(&self) -> bool {
        self.active
    }
    fn deactivate(&mut self) {
        self.active = false;
    }
}

pub fn spawn_explosion_fx(world: &mut World, pos: Vec2, max_radius: f32) {
    let i = world.explosions.alloc();
    world.explosions.slots_mut()[i] = Explosion {
        active: true,
        pos,
        radius: 0.2,
        max_radius,
        life: EXPLOSION_LIFE,
    };
}

/// Scatter a handful of chunks from a destroyed cell
pub fn spawn_debris_burst(world: &mut World, center: Vec2, material: Material) {
    let mut jitter = fx_rng(world.time_ticks, 0xdeb_u64 ^ (center.x.to_bits() as u64));
    for _ in 0..5 {
        let angle = jitter.random::<f32>() * std::f32::consts::TAU;
        let speed = 2.0 + jitter.random::<f32>() * 4.0;
        let i = world.debris.alloc();
        world.debris.slots_mut()[i] = Debris {
            active: true,
            pos: center,
            prev_pos: center,
            vel: crate::vec_from_angle(angle) * speed,
            rot: angle,
            rot_vel: (jitter.random::<f32>() - 0.5) * 12.0,
            size: 0.1 + jitter.random::<f32>() * 0.15,
            material,
            life: DEBRIS_LIFE,
        };
    }
}

pub fn spawn_ragdoll(world: &mut World, pos: Vec2, vel: Vec2, team: TeamId) {
    let mut jitter = fx_rng(world.time_ticks, 0xbead ^ pos.x.to_bits() as u64);
    let i = world.ragdolls.alloc();
    world.ragdolls.slots_mut()[i] = Ragdoll {
        active: true,
        pos,
        prev_pos: pos,
        vel,
        rot: jitter.random::<f32>() * std::f32::consts::TAU,
        rot_vel: (jitter.random::<f32>() - 0.5) * 10.0,
        team,
        life: RAGDOLL_LIFE,
    };
}

pub fn spawn_shell_casing(world: &mut World, pos: Vec2, aim: Vec2, jitter: &mut rand_pcg::Pcg32) {
    // Eject perpendicular to the aim with a bit of scatter.
    let side = Vec2::new(-aim.y, aim.x);
    let speed = 1.6 + jitter.random::<f32>() * 1.2;
    let i = world.shells.alloc();
    world.shells.slots_mut()[i] = ShellCasing {
        active: true,
        pos,
        vel: side * speed + aim * 0.3,
        rot: jitter.random::<f32>() * std::f32::consts::TAU,
        rot_vel: (jitter.random::<f32>() - 0.5) * 20.0,
        life: SHELL_LIFE,
    };
}

pub fn spawn_flight_trail(world: &mut World, pos: Vec2, dir: Vec2, speed: f32) {
    let i = world.trails.alloc();
    world.trails.slots_mut()[i] = FlightTrail {
        active: true,
        pos,
        dir,
        len: (speed * 0.02).clamp(0.2, 0.8),
        life: TRAIL_LIFE,
    };
}

/// Ring of petals marking a kill
pub fn spawn_kill_petals(world: &mut World, pos: Vec2, team: TeamId) {
    let mut jitter = fx_rng(world.time_ticks, 0x9e7a1 ^ pos.y.to_bits() as u64);
    let count = 6;
    for k in 0..count {
        let angle = std::f32::consts::TAU * k as f32 / count as f32
            + jitter.random::<f32>() * 0.3;
        let i = world.kill_petals.alloc();
        world.kill_petals.slots_mut()[i] = KillPetal {
            active: true,
            pos,
            vel: crate::vec_from_angle(angle) * (3.0 + jitter.random::<f32>() * 1.5),
            team,
            size: 0.15 + jitter.random::<f32>() * 0.1,
            life: PETAL_LIFE,
        };
    }
}

/// Non-finite kinematics mean corrupted math upstream; quarantine the entity
/// instead of feeding NaNs into the collision resolver.
fn kinematics_ok(pos: Vec2, vel: Vec2, rot: f32, life: f32) -> bool {
    pos.is_finite() && vel.is_finite() && rot.is_finite() && life.is_finite()
}

/// Age and cull every FX pool
pub fn update_effects(world: &mut World, dt: f32) {
    let bounds = build_cull_bounds(world.camera.pos, FX_CULL_PADDING);
    let friction = (-3.5f32 * dt).exp();
    let time = world.time_ticks;

    for e in world.explosions.iter_active_mut() {
        e.life -= dt;
        let t = 1.0 - (e.life / EXPLOSION_LIFE).clamp(0.0, 1.0);
        e.radius = e.max_radius * t.sqrt();
        if e.life <= 0.0 {
            e.deactivate();
        }
    }

    for t in world.trails.iter_active_mut() {
        t.life -= dt;
        if t.life <= 0.0 {
            t.deactivate();
        }
    }

    for p in world.kill_petals.iter_active_mut() {
        p.life -= dt;
        p.pos += p.vel * dt;
        p.vel *= friction;
        if p.life <= 0.0 || !is_inside_cull_bounds(p.pos.x, p.pos.y, &bounds, 0.0) {
            p.deactivate();
        }
    }

    for s in world.shells.iter_active_mut() {
        s.life -= dt;
        s.pos += s.vel * dt;
        s.vel *= friction * friction; // brass settles fast
        s.rot += s.rot_vel * dt;
        s.rot_vel *= friction;
        if s.life <= 0.0 || !is_inside_cull_bounds(s.pos.x, s.pos.y, &bounds, 0.0) {
            s.deactivate();
        }
    }

    // Debris and ragdolls bounce off obstacles; both get the non-finite
    // quarantine since they're fed by explosion impulses.
    for i in 0..world.debris.capacity() {
        let mut d = world.debris.slots()[i];
        if !d.active {
            continue;
        }
        if !kinematics_ok(d.pos, d.vel, d.rot, d.life) {
            log::warn!("debris {i} had non-finite kinematics, deactivating");
            d.active = false;
            world.debris.slots_mut()[i] = d;
            continue;
        }
        d.life -= dt;
        d.prev_pos = d.pos;
        d.pos += d.vel * dt;
        d.vel *= friction;
        d.rot += d.rot_vel * dt;
        if let Some(hit) = raymarch_grid_hit(d.prev_pos, d.pos, d.vel, &world.grid) {
            let mut jitter = fx_rng(time, 0xd0 + i as u64);
            apply_obstacle_ricochet(
                d.prev_pos, &mut d.pos, &mut d.vel, hit.cell, 0.4, 0.7, 0.1, &mut jitter,
            );
        }
        if d.life <= 0.0 || !is_inside_cull_bounds(d.pos.x, d.pos.y, &bounds, 0.0) {
            d.active = false;
        }
        world.debris.slots_mut()[i] = d;
    }

    for i in 0..world.ragdolls.capacity() {
        let mut r = world.ragdolls.slots()[i];
        if !r.active {
            continue;
        }
        if !kinematics_ok(r.pos, r.vel, r.rot, r.life) {
            log::warn!("ragdoll {i} had non-finite kinematics, deactivating");
            r.active = false;
            world.ragdolls.slots_mut()[i] = r;
            continue;
        }
        r.life -= dt;
        r.prev_pos = r.pos;
        r.pos += r.vel * dt;
        r.vel *= friction;
        r.rot += r.rot_vel * dt;
        r.rot_vel *= friction;
        if let Some(hit) = raymarch_grid_hit(r.prev_pos, r.pos, r.vel, &world.grid) {
            let mut jitter = fx_rng(time, 0x4a9 + i as u64);
            apply_obstacle_ricochet(
                r.prev_pos, &mut r.pos, &mut r.vel, hit.cell, 0.55, 0.8, 0.12, &mut jitter,
            );
        }
        if r.life <= 0.0 || !is_inside_cull_bounds(r.pos.x, r.pos.y, &bounds, 0.0) {
            r.active = false;
        }
        world.ragdolls.slots_mut()[i] = r;
    }
}
