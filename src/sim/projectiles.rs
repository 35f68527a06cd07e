//! Projectiles, throwables and molotov burn zones
//!
//! All three are pooled kinematic entities. Projectiles ray-march against
//! the obstacle grid every tick so fast shots can't tunnel through 1-cell
//! walls; bouncing shots and thrown items share the ricochet resolver with
//! ragdolls and debris.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{apply_obstacle_ricochet, raymarch_grid_hit};
use super::combat::{self, DamageEvent, DamageOrigin};
use super::effects;
use super::events::EventSink;
use super::grid::DamageSource;
use super::pickups::{self, PickupKind};
use super::pool::PoolSlot;
use super::rng::fx_rng;
use super::state::{TeamId, UnitId, World};

/// Hit radius of a projectile against units
const PROJECTILE_RADIUS: f32 = 0.12;
/// Air drag applied to thrown items per tick
const THROWABLE_DRAG: f32 = 2.6;
const GRENADE_FUSE_TICKS: u32 = 60;
const MOLOTOV_FUSE_TICKS: u32 = 55;
const GRENADE_RADIUS: f32 = 2.2;
const GRENADE_DAMAGE: f32 = 55.0;
const GRENADE_POWER: f32 = 9.0;
const MOLOTOV_ZONE_RADIUS: f32 = 1.6;
const MOLOTOV_ZONE_LIFE: f32 = 6.0;
const MOLOTOV_TICK_INTERVAL: u32 = 20;
const MOLOTOV_TICK_DAMAGE: f32 = 6.0;
const BOUNCER_BOUNCES: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProjectileKind {
    #[default]
    Bullet,
    Pellet,
    Flame,
    Bounce,
}

impl ProjectileKind {
    pub fn damage_source(self) -> DamageSource {
        match self {
            ProjectileKind::Flame => DamageSource::Fire,
            _ => DamageSource::Ballistic,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Projectile {
    pub active: bool,
    pub kind: ProjectileKind,
    pub pos: Vec2,
    pub prev_pos: Vec2,
    pub vel: Vec2,
    pub damage: f32,
    pub range_left: f32,
    pub owner: UnitId,
    pub team: TeamId,
    pub bounces_left: u8,
}

impl PoolSlot for Projectile {
    fn active(&self) -> bool {
        self.active
    }
    fn deactivate(&mut self) {
        self.active = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThrowableKind {
    #[default]
    Grenade,
    Molotov,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Throwable {
    pub active: bool,
    pub kind: ThrowableKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub spin: f32,
    pub rot: f32,
    pub fuse_ticks: u32,
    pub owner: UnitId,
    pub team: TeamId,
}

impl PoolSlot for Throwable {
    fn active(&self) -> bool {
        self.active
    }
    fn deactivate(&mut self) {
        self.active = false;
    }
}

/// Lingering ground fire left by a molotov
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MolotovZone {
    pub active: bool,
    pub pos: Vec2,
    pub radius: f32,
    pub life: f32,
    pub tick_timer: u32,
    pub owner: UnitId,
    pub team: TeamId,
}

impl PoolSlot for MolotovZone {
    fn active(&self) -> bool {
        self.active
    }
    fn deactivate(&mut self) {
        self.active = false;
    }
}

#[allow(clippy::too_many_arguments)]
pub fn spawn_projectile(
    world: &mut World,
    kind: ProjectileKind,
    pos: Vec2,
    vel: Vec2,
    damage: f32,
    range: f32,
    owner: UnitId,
    team: TeamId,
) {
    let i = world.projectiles.alloc();
    world.projectiles.slots_mut()[i] = Projectile {
        active: true,
        kind,
        pos,
        prev_pos: pos,
        vel,
        damage,
        range_left: range,
        owner,
        team,
        bounces_left: if kind == ProjectileKind::Bounce {
            BOUNCER_BOUNCES
        } else {
            0
        },
    };
}

pub fn spawn_throwable(
    world: &mut World,
    kind: ThrowableKind,
    pos: Vec2,
    vel: Vec2,
    owner: UnitId,
    team: TeamId,
) {
    let i = world.throwables.alloc();
    world.throwables.slots_mut()[i] = Throwable {
        active: true,
        kind,
        pos,
        vel,
        spin: 7.0,
        rot: 0.0,
        fuse_ticks: match kind {
            ThrowableKind::Grenade => GRENADE_FUSE_TICKS,
            ThrowableKind::Molotov => MOLOTOV_FUSE_TICKS,
        },
        owner,
        team,
    };
}

fn spawn_molotov_zone(world: &mut World, pos: Vec2, owner: UnitId, team: TeamId) {
    let i = world.molotov_zones.alloc();
    world.molotov_zones.slots_mut()[i] = MolotovZone {
        active: true,
        pos,
        radius: MOLOTOV_ZONE_RADIUS,
        life: MOLOTOV_ZONE_LIFE,
        tick_timer: 1,
        owner,
        team,
    };
}

/// What a projectile ran into this tick, closest-first along its segment
#[derive(Clone, Copy)]
enum Impact {
    None,
    Cell { cell: (i32, i32), point: Vec2 },
    Unit { target: UnitId },
}

pub fn update_projectiles(world: &mut World, sink: &mut dyn EventSink, dt: f32) {
    for i in 0..world.projectiles.capacity() {
        let mut p = world.projectiles.slots()[i];
        if !p.active {
            continue;
        }

        p.prev_pos = p.pos;
        p.pos += p.vel * dt;
        p.range_left -= p.vel.length() * dt;

        let seg = p.pos - p.prev_pos;
        let seg_len_sq = seg.length_squared().max(1e-12);

        // Grid hit, parameterized along the segment so it can be ordered
        // against unit hits.
        let grid_hit = raymarch_grid_hit(p.prev_pos, p.pos, p.vel, &world.grid);
        let grid_t = grid_hit
            .map(|hit| ((hit.point - p.prev_pos).dot(seg) / seg_len_sq).clamp(0.0, 1.0));

        // Closest enemy unit the segment passes through. Teammates and the
        // shooter never block shots.
        let mut unit_hit: Option<(UnitId, f32)> = None;
        for unit in &world.units {
            if !unit.alive || unit.id == p.owner || unit.team == p.team {
                continue;
            }
            let t = ((unit.pos - p.prev_pos).dot(seg) / seg_len_sq).clamp(0.0, 1.0);
            let closest = p.prev_pos + seg * t;
            if closest.distance_squared(unit.pos)
                < (unit.radius + PROJECTILE_RADIUS) * (unit.radius + PROJECTILE_RADIUS)
                && unit_hit.is_none_or(|(_, best)| t < best)
            {
                unit_hit = Some((unit.id, t));
            }
        }

        let mut impact = Impact::None;
        match (grid_hit, unit_hit) {
            (Some(hit), Some((target, unit_t))) => {
                let cell_t = grid_t.unwrap_or(1.0);
                impact = if cell_t <= unit_t {
                    Impact::Cell {
                        cell: hit.cell,
                        point: hit.point,
                    }
                } else {
                    Impact::Unit { target }
                };
            }
            (Some(hit), None) => {
                impact = Impact::Cell {
                    cell: hit.cell,
                    point: hit.point,
                };
            }
            (None, Some((target, _))) => {
                impact = Impact::Unit { target };
            }
            (None, None) => {}
        }

        // Bouncers ricochet off cells instead of impacting, while they have
        // bounces left. The cell is never damaged by the bounce itself.
        if let Impact::Cell { cell, .. } = impact {
            if p.kind == ProjectileKind::Bounce && p.bounces_left > 0 {
                let mut jitter = fx_rng(world.time_ticks, i as u64);
                apply_obstacle_ricochet(
                    p.prev_pos, &mut p.pos, &mut p.vel, cell, 0.65, 0.9, 0.08, &mut jitter,
                );
                p.bounces_left -= 1;
                impact = Impact::None;
            }
        }

        let expired = p.range_left <= 0.0 && matches!(impact, Impact::None);
        let exploded = expired && p.kind == ProjectileKind::Bounce;
        if !matches!(impact, Impact::None) || expired {
            p.active = false;
        }

        let (vel, damage, owner, team, kind, pos) = (p.vel, p.damage, p.owner, p.team, p.kind, p.pos);
        world.projectiles.slots_mut()[i] = p;

        match impact {
            Impact::Cell { cell, point } => {
                impact_cell(world, sink, cell, point, kind.damage_source(), damage, owner);
            }
            Impact::Unit { target } => {
                let speed = vel.length();
                combat::apply_damage(
                    world,
                    sink,
                    DamageEvent {
                        target,
                        origin: DamageOrigin::Unit(owner),
                        source_team: team,
                        amount: damage,
                        dir: vel.normalize_or(Vec2::X),
                        impact_speed: speed,
                        kind: kind.damage_source(),
                    },
                );
            }
            Impact::None => {
                if exploded {
                    combat::spawn_explosion(
                        world,
                        sink,
                        pos,
                        GRENADE_RADIUS * 0.8,
                        damage * 2.0,
                        GRENADE_POWER * 0.7,
                        Some(owner),
                        team,
                    );
                }
            }
        }
    }
}

/// Shared cell-impact path: damage, SFX, debris, loot drop
fn impact_cell(
    world: &mut World,
    sink: &mut dyn EventSink,
    cell: (i32, i32),
    point: Vec2,
    source: DamageSource,
    damage: f32,
    owner: UnitId,
) {
    use super::grid::ObstacleGrid;

    let had_loot = world.grid.has_high_tier_loot(cell.0, cell.1);
    let material = world.grid.material_at(cell.0, cell.1);
    let result = world.grid.damage_cell(cell.0, cell.1, damage, source);
    if result.damaged {
        sink.sfx_obstacle_hit(point, result.destroyed);
    }
    if result.destroyed {
        if let Some(material) = material {
            effects::spawn_debris_burst(world, ObstacleGrid::cell_center(cell.0, cell.1), material);
        }
        if had_loot {
            pickups::spawn_pickup(
                world,
                ObstacleGrid::cell_center(cell.0, cell.1),
                PickupKind::HighTier,
                0,
            );
        }
        let by_player = world.is_player(owner);
        combat::impact_feedback(world, point, 0.25, by_player, false);
    }
}

pub fn update_throwables(world: &mut World, sink: &mut dyn EventSink, dt: f32) {
    let drag = (-THROWABLE_DRAG * dt).exp();
    for i in 0..world.throwables.capacity() {
        let mut t = world.throwables.slots()[i];
        if !t.active {
            continue;
        }

        let prev = t.pos;
        t.vel *= drag;
        t.pos += t.vel * dt;
        t.rot += t.spin * dt;
        t.spin *= drag;

        if let Some(hit) = raymarch_grid_hit(prev, t.pos, t.vel, &world.grid) {
            let mut jitter = fx_rng(world.time_ticks, 0x70 + i as u64);
            apply_obstacle_ricochet(
                prev, &mut t.pos, &mut t.vel, hit.cell, 0.45, 0.75, 0.06, &mut jitter,
            );
        }

        t.fuse_ticks = t.fuse_ticks.saturating_sub(1);
        let detonated = t.fuse_ticks == 0;
        if detonated {
            t.active = false;
        }
        let (pos, kind, owner, team) = (t.pos, t.kind, t.owner, t.team);
        world.throwables.slots_mut()[i] = t;

        if detonated {
            match kind {
                ThrowableKind::Grenade => {
                    combat::spawn_explosion(
                        world,
                        sink,
                        pos,
                        GRENADE_RADIUS,
                        GRENADE_DAMAGE,
                        GRENADE_POWER,
                        Some(owner),
                        team,
                    );
                }
                ThrowableKind::Molotov => {
                    spawn_molotov_zone(world, pos, owner, team);
                }
            }
        }
    }
}

pub fn update_molotov_zones(world: &mut World, sink: &mut dyn EventSink, dt: f32) {
    for i in 0..world.molotov_zones.capacity() {
        let mut z = world.molotov_zones.slots()[i];
        if !z.active {
            continue;
        }

        z.life -= dt;
        z.tick_timer = z.tick_timer.saturating_sub(1);
        let burn_now = z.tick_timer == 0;
        if burn_now {
            z.tick_timer = MOLOTOV_TICK_INTERVAL;
        }
        if z.life <= 0.0 {
            z.active = false;
        }
        let (pos, radius, owner, team) = (z.pos, z.radius, z.owner, z.team);
        world.molotov_zones.slots_mut()[i] = z;

        if !burn_now {
            continue;
        }

        // Units standing in the fire. The damage pipeline filters teammates;
        // the thrower burns in their own fire.
        let victims: Vec<(UnitId, Vec2)> = world
            .units
            .iter()
            .filter(|u| u.alive && u.pos.distance(pos) <= radius + u.radius)
            .map(|u| (u.id, (u.pos - pos).normalize_or(Vec2::X)))
            .collect();
        for (target, dir) in victims {
            combat::apply_damage(
                world,
                sink,
                DamageEvent {
                    target,
                    origin: DamageOrigin::Unit(owner),
                    source_team: team,
                    amount: MOLOTOV_TICK_DAMAGE,
                    dir,
                    impact_speed: 0.0,
                    kind: DamageSource::Fire,
                },
            );
        }

        // Fire spreads into vegetation; anything else just gets a blocked
        // flash through the material policy.
        let min_x = (pos.x - radius).floor() as i32;
        let max_x = (pos.x + radius).ceil() as i32;
        let min_y = (pos.y - radius).floor() as i32;
        let max_y = (pos.y + radius).ceil() as i32;
        for cy in min_y..=max_y {
            for cx in min_x..=max_x {
                if !world.grid.is_cell_solid(cx, cy) {
                    continue;
                }
                let center = super::grid::ObstacleGrid::cell_center(cx, cy);
                if center.distance(pos) <= radius + 0.5 {
                    world
                        .grid
                        .damage_cell(cx, cy, MOLOTOV_TICK_DAMAGE * 0.5, DamageSource::Fire);
                }
            }
        }
    }
}
