//! Damage pipeline, kill resolution, flower bursts and explosions
//!
//! Every damage event runs the same gauntlet, in order: friendly-fire
//! check, self-harm detection, amount scaling, HP mutation, popup emission,
//! optional kill branch, camera feedback. Attribution failures degrade
//! through a fallback chain instead of crashing or crediting the wrong
//! team.

use glam::Vec2;
use rand::Rng;

use crate::consts::{KILL_HP_BONUS, KNOCKBACK_PER_DAMAGE, MAX_KNOCKBACK, RESPAWN_DELAY_TICKS};

use super::camera::{build_cull_bounds, is_inside_cull_bounds};
use super::effects;
use super::events::EventSink;
use super::flowers::{bloom_weight_for_size, pick_flower_position};
use super::grid::{CellDamage, DamageSource, ObstacleGrid};
use super::pickups;
use super::pool::PoolSlot;
use super::rng::burst_rng;
use super::state::{TeamId, UnitId, World};

/// Where a damage event came from. The arena boundary is a sentinel, not a
/// unit, so it bypasses team rules and earns no kill credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOrigin {
    Unit(UnitId),
    Arena,
}

/// One damage event flowing through the pipeline
#[derive(Debug, Clone, Copy)]
pub struct DamageEvent {
    pub target: UnitId,
    pub origin: DamageOrigin,
    /// Team of the source at fire time (outlives the source's death)
    pub source_team: TeamId,
    pub amount: f32,
    /// Impact direction, used for knockback and burst spread
    pub dir: Vec2,
    pub impact_speed: f32,
    pub kind: DamageSource,
}

/// Kill credit / burst ownership resolution: literal id -> live player of
/// the source team -> nearest live unit of the source team -> boundary
/// sentinel (None). Never crashes, never credits the wrong team.
fn resolve_attacker(
    world: &World,
    origin: DamageOrigin,
    team: TeamId,
    near: Vec2,
) -> Option<UnitId> {
    match origin {
        DamageOrigin::Arena => None,
        DamageOrigin::Unit(id) => {
            if world.live_unit(id).is_some() {
                return Some(id);
            }
            if world
                .live_unit(world.player_id)
                .is_some_and(|p| p.team == team)
            {
                log::debug!("attribution fell back to player for dead source {}", id.0);
                return Some(world.player_id);
            }
            world.nearest_live_teammate(team, near, None)
        }
    }
}

/// Apply one damage event. Unresolvable targets are a silent no-op.
pub fn apply_damage(world: &mut World, sink: &mut dyn EventSink, ev: DamageEvent) {
    let Some(target) = world.live_unit(ev.target) else {
        return;
    };
    let target_pos = target.pos;
    let target_team = target.team;
    let target_hp = target.hp;
    let flat_reduction = target.flat_reduction;
    let taken_mul = target.damage_taken_mul;

    let self_harm = matches!(ev.origin, DamageOrigin::Unit(src) if src == ev.target);

    // Friendly fire is rejected unless the source is the arena boundary,
    // the target itself, or a different team.
    let allowed = match ev.origin {
        DamageOrigin::Arena => true,
        DamageOrigin::Unit(_) => self_harm || ev.source_team != target_team,
    };
    if !allowed {
        return;
    }

    let mut amount = ((ev.amount - flat_reduction) * taken_mul.max(0.1)).max(1.0);
    // One's own blast radius is always lethal: the amount is floored at the
    // target's current HP. Asymmetric with every other formula, and load-
    // bearing for match balance - do not "fix".
    if self_harm && ev.kind == DamageSource::Blast {
        amount = amount.max(target_hp);
    }

    let lethal = target_hp - amount <= 0.0;
    let attacker = resolve_attacker(world, ev.origin, ev.source_team, target_pos);

    if let Some(target) = world.unit_mut(ev.target) {
        target.hp = (target.hp - amount).max(0.0);
        target.hit_flash = 1.0;
        let impulse = (amount * KNOCKBACK_PER_DAMAGE).min(MAX_KNOCKBACK);
        target.vel += ev.dir * impulse;
        if lethal {
            target.alive = false;
            target.hp = 0.0;
            target.respawn_ticks = RESPAWN_DELAY_TICKS;
        }
    }
    sink.damage_popup(target_pos, amount, lethal);

    if lethal {
        resolve_kill(world, sink, &ev, attacker, target_pos, target_team);
    } else {
        if let Some(owner) = attacker {
            random_flower_burst(world, owner, target_pos, ev.dir, amount, ev.impact_speed);
        }
        sink.sfx_hit(target_pos);
    }

    let caused_by_player = attacker == Some(world.player_id) && !self_harm;
    let received_by_player = ev.target == world.player_id;
    let magnitude = (amount * 0.02).min(0.5) + if lethal { 0.25 } else { 0.0 };
    impact_feedback(world, target_pos, magnitude, caused_by_player, received_by_player);
    if lethal && (caused_by_player || received_by_player) {
        let stop = world.impact_feel.hit_stop_ticks(true);
        world.camera.hit_stop_ticks = world.camera.hit_stop_ticks.max(stop);
    }
}

/// Kill branch: bonus HP, ragdoll, flower bursts, kill petals, loot roll,
/// respawn scheduling, SFX routing.
fn resolve_kill(
    world: &mut World,
    sink: &mut dyn EventSink,
    ev: &DamageEvent,
    attacker: Option<UnitId>,
    pos: Vec2,
    target_team: TeamId,
) {
    let killer = attacker.filter(|&k| k != ev.target);
    if let Some(killer_id) = killer {
        if let Some(k) = world.unit_mut(killer_id) {
            if k.alive {
                k.hp = (k.hp + KILL_HP_BONUS).min(k.max_hp);
            }
            k.kills += 1;
        }
    }

    effects::spawn_ragdoll(
        world,
        pos,
        ev.dir * (2.5 + ev.impact_speed * 0.15),
        target_team,
    );

    if let Some(owner) = attacker {
        death_flower_burst(world, owner, pos, ev.dir);
        let petal_team = world.unit(owner).map(|u| u.team).unwrap_or(target_team);
        effects::spawn_kill_petals(world, pos, petal_team);
    } else {
        effects::spawn_kill_petals(world, pos, target_team);
    }

    pickups::maybe_drop_on_kill(world, pos);
    sink.respawn_requested(ev.target, RESPAWN_DELAY_TICKS);

    if ev.target == world.player_id {
        sink.sfx_player_death();
    } else if killer == Some(world.player_id) {
        sink.sfx_player_kill();
    } else {
        sink.sfx_generic_death(pos);
    }
}

/// Bloom one flower near `origin`, spread along `dir`. Placement, size
/// jitter and lateral scatter all come from the seeded burst stream, so a
/// burst with identical parameters is reproducible.
pub fn spawn_single_flower(
    world: &mut World,
    owner: UnitId,
    team: TeamId,
    origin: Vec2,
    dir: Vec2,
    base_size: f32,
) {
    let count = world.unit(owner).map(|u| u.flowers_bloomed).unwrap_or(0);
    let mut rng = burst_rng(owner, origin, dir, count);
    let size = base_size * (0.75 + rng.random::<f32>() * 0.5);
    let weight = bloom_weight_for_size(size);
    let pos = pick_flower_position(origin, dir, weight, &world.flower_grid, &mut rng);
    let cell = world.flower_grid.cell_index_at(pos.x, pos.y);

    // Recycling an active flower must unlink it first or the cell weights
    // drift; this is the pairing invariant the density index depends on.
    if let Some(victim) = world.flowers.would_evict() {
        let World {
            flowers,
            flower_grid,
            ..
        } = world;
        flower_grid.unlink(flowers.slots_mut(), victim);
        flowers.slots_mut()[victim].active = false;
    }

    let i = world.flowers.alloc();
    {
        let flower = &mut world.flowers.slots_mut()[i];
        flower.active = true;
        flower.pos = pos;
        flower.size = size;
        flower.team = team;
        flower.owner = owner;
        flower.bloom_weight = weight;
    }
    let World {
        flowers,
        flower_grid,
        ..
    } = world;
    flower_grid.link_to_cell(flowers.slots_mut(), i, cell);

    if let Some(unit) = world.unit_mut(owner) {
        unit.flowers_bloomed += 1;
    }
}

/// Non-lethal hit burst: amount is inversely related to damage (bigger
/// single hits bloom fewer, larger flowers) and directly related to impact
/// speed, each clamped independently.
pub fn random_flower_burst(
    world: &mut World,
    owner: UnitId,
    origin: Vec2,
    dir: Vec2,
    damage: f32,
    impact_speed: f32,
) {
    let from_damage = (10.0 / damage.max(1.0)).clamp(1.0, 5.0);
    let from_speed = (impact_speed * 0.2).clamp(0.0, 4.0);
    let count = (from_damage + from_speed).round() as u32;
    let base_size = (0.35 + damage * 0.035).clamp(0.3, 1.45);
    let team = match world.unit(owner) {
        Some(u) => u.team,
        None => return,
    };
    for _ in 0..count {
        spawn_single_flower(world, owner, team, origin, dir, base_size);
    }
}

/// Kill burst: one large bloom on the corpse plus a few secondary scatter
/// bursts around it.
pub fn death_flower_burst(world: &mut World, owner: UnitId, pos: Vec2, dir: Vec2) {
    let team = match world.unit(owner) {
        Some(u) => u.team,
        None => return,
    };
    for _ in 0..12 {
        spawn_single_flower(world, owner, team, pos, dir, 1.1);
    }
    for k in 0..3 {
        let scatter_dir = crate::rotate_vec(dir, (k as f32 - 1.0) * 1.6);
        let scatter_pos = pos + scatter_dir * 0.8;
        for _ in 0..4 {
            spawn_single_flower(world, owner, team, scatter_pos, scatter_dir, 0.6);
        }
    }
}

/// Camera shake with feel scaling, separate caps for player-caused vs
/// player-received events, and a cut for off-screen third-party impacts.
pub fn impact_feedback(
    world: &mut World,
    pos: Vec2,
    magnitude: f32,
    caused_by_player: bool,
    received_by_player: bool,
) {
    let feel = world.impact_feel;
    let mut magnitude = magnitude * feel.shake_scale();
    let cap = if received_by_player {
        feel.player_received_cap()
    } else if caused_by_player {
        feel.player_caused_cap()
    } else {
        feel.player_caused_cap() * 0.5
    };
    if !caused_by_player && !received_by_player {
        let bounds = build_cull_bounds(world.camera.pos, 0.0);
        if !is_inside_cull_bounds(pos.x, pos.y, &bounds, 0.0) {
            magnitude *= 0.3;
        }
    }
    world.camera.add_shake(magnitude, cap);
}

/// Radial velocity impulse with linear falloff. Same-team units are skipped
/// except the origin unit itself (you ride your own blast). Pickups inside
/// the radius are destroyed outright, no falloff.
pub fn apply_explosion_impulse(
    world: &mut World,
    center: Vec2,
    radius: f32,
    power: f32,
    source_team: TeamId,
    origin_unit: Option<UnitId>,
) {
    for unit in world.units.iter_mut() {
        if !unit.alive {
            continue;
        }
        if unit.team == source_team && Some(unit.id) != origin_unit {
            continue;
        }
        let delta = unit.pos - center;
        let dist = delta.length();
        if dist > radius {
            continue;
        }
        let falloff = 1.0 - dist / radius;
        unit.vel += delta.normalize_or(Vec2::X) * power * falloff;
    }

    for pickup in world.pickups.iter_active_mut() {
        if pickup.pos.distance(center) <= radius {
            pickup.deactivate();
        }
    }
}

/// Damage every solid cell whose center falls inside the blast circle
/// (cell-center sampling with a half-cell allowance), aggregating whether
/// anything was damaged or destroyed for SFX.
pub fn damage_obstacles_by_explosion(world: &mut World, center: Vec2, radius: f32) -> CellDamage {
    let mut aggregate = CellDamage::default();
    let min_x = (center.x - radius - 0.5).floor() as i32;
    let max_x = (center.x + radius + 0.5).ceil() as i32;
    let min_y = (center.y - radius - 0.5).floor() as i32;
    let max_y = (center.y + radius + 0.5).ceil() as i32;

    for cy in min_y..=max_y {
        for cx in min_x..=max_x {
            if !world.grid.is_cell_solid(cx, cy) {
                continue;
            }
            let cell_center = ObstacleGrid::cell_center(cx, cy);
            if cell_center.distance(center) > radius + 0.5 {
                continue;
            }
            let had_loot = world.grid.has_high_tier_loot(cx, cy);
            let material = world.grid.material_at(cx, cy);
            let result = world.grid.damage_cell(
                cx,
                cy,
                crate::consts::EXPLOSION_CELL_DAMAGE,
                DamageSource::Blast,
            );
            aggregate.damaged |= result.damaged;
            aggregate.destroyed |= result.destroyed;
            if result.destroyed {
                if let Some(material) = material {
                    effects::spawn_debris_burst(world, cell_center, material);
                }
                if had_loot {
                    pickups::spawn_pickup(
                        world,
                        cell_center,
                        super::pickups::PickupKind::HighTier,
                        0,
                    );
                }
            }
        }
    }
    aggregate
}

/// Full explosion: FX entry, impulse, falloff unit damage, obstacle sweep,
/// SFX and camera feedback.
#[allow(clippy::too_many_arguments)]
pub fn spawn_explosion(
    world: &mut World,
    sink: &mut dyn EventSink,
    center: Vec2,
    radius: f32,
    damage: f32,
    power: f32,
    origin_unit: Option<UnitId>,
    source_team: TeamId,
) {
    effects::spawn_explosion_fx(world, center, radius);
    apply_explosion_impulse(world, center, radius, power, source_team, origin_unit);

    let origin = origin_unit
        .map(DamageOrigin::Unit)
        .unwrap_or(DamageOrigin::Arena);
    let victims: Vec<(UnitId, Vec2, f32)> = world
        .units
        .iter()
        .filter(|u| u.alive && u.pos.distance(center) <= radius)
        .map(|u| {
            let dist = u.pos.distance(center);
            (
                u.id,
                (u.pos - center).normalize_or(Vec2::X),
                1.0 - dist / radius,
            )
        })
        .collect();
    for (target, dir, falloff) in victims {
        apply_damage(
            world,
            sink,
            DamageEvent {
                target,
                origin,
                source_team,
                amount: damage * falloff.max(0.15),
                dir,
                impact_speed: power * falloff,
                kind: DamageSource::Blast,
            },
        );
    }

    let aggregate = damage_obstacles_by_explosion(world, center, radius);
    if aggregate.damaged {
        sink.sfx_obstacle_hit(center, aggregate.destroyed);
    }
    sink.sfx_explosion(center);

    let by_player = origin_unit == Some(world.player_id);
    impact_feedback(world, center, 0.5, by_player, false);
}
