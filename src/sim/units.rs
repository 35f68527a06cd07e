//! Units, weapons, perks and input intents
//!
//! The core performs no input polling; the embedding layer calls the intent
//! functions (`fire_primary`, `start_reload`, `throw_secondary`) directly
//! and sets movement/aim intents that `update_units` integrates each tick.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::*;

use super::collision::{resolve_circle_vs_grid, separate_pair};
use super::combat::{self, DamageEvent, DamageOrigin};
use super::events::EventSink;
use super::grid::DamageSource;
use super::projectiles::{self, ProjectileKind, ThrowableKind};
use super::rng::fx_rng;
use super::state::{TeamId, UnitId, World, spawn_ring_position};

/// Weapon archetypes - each maps to a projectile kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeaponKind {
    Rifle,
    Shotgun,
    Flamethrower,
    Bouncer,
}

impl WeaponKind {
    pub fn projectile_kind(self) -> ProjectileKind {
        match self {
            WeaponKind::Rifle => ProjectileKind::Bullet,
            WeaponKind::Shotgun => ProjectileKind::Pellet,
            WeaponKind::Flamethrower => ProjectileKind::Flame,
            WeaponKind::Bouncer => ProjectileKind::Bounce,
        }
    }

    /// Flamethrowers don't eject brass
    pub fn ejects_shell(self) -> bool {
        !matches!(self, WeaponKind::Flamethrower)
    }
}

/// One row of the content-layer weapon stat table
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeaponStats {
    pub kind: WeaponKind,
    pub damage: f32,
    pub speed: f32,
    pub range: f32,
    pub pellets: u32,
    pub spread_rad: f32,
    pub fire_interval_ticks: u32,
    pub reload_ticks: u32,
    pub magazine: u32,
}

impl WeaponStats {
    /// Stock table used by the headless binary and tests; real matches get
    /// their table from the content layer.
    pub fn default_loadout() -> Vec<WeaponStats> {
        vec![
            WeaponStats {
                kind: WeaponKind::Rifle,
                damage: 9.0,
                speed: 26.0,
                range: 18.0,
                pellets: 1,
                spread_rad: 0.035,
                fire_interval_ticks: 9,
                reload_ticks: 72,
                magazine: 12,
            },
            WeaponStats {
                kind: WeaponKind::Shotgun,
                damage: 4.0,
                speed: 22.0,
                range: 9.0,
                pellets: 6,
                spread_rad: 0.22,
                fire_interval_ticks: 42,
                reload_ticks: 90,
                magazine: 5,
            },
            WeaponStats {
                kind: WeaponKind::Flamethrower,
                damage: 1.6,
                speed: 9.0,
                range: 3.2,
                pellets: 2,
                spread_rad: 0.3,
                fire_interval_ticks: 3,
                reload_ticks: 120,
                magazine: 40,
            },
            WeaponStats {
                kind: WeaponKind::Bouncer,
                damage: 14.0,
                speed: 14.0,
                range: 22.0,
                pellets: 1,
                spread_rad: 0.02,
                fire_interval_ticks: 48,
                reload_ticks: 100,
                magazine: 4,
            },
        ]
    }
}

/// Content-layer perk: id plus an apply-to-unit function, run at match start
#[derive(Clone, Copy)]
pub struct PerkDef {
    pub id: &'static str,
    pub apply: fn(&mut Unit),
}

/// One combatant. Created at match start, reset in place between matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub team: TeamId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub aim: Vec2,
    pub move_intent: Vec2,
    pub radius: f32,
    pub hp: f32,
    pub max_hp: f32,
    pub alive: bool,
    /// Index into the world's weapon table
    pub weapon: usize,
    pub ammo: u32,
    pub reloading: bool,
    pub reload_ticks_left: u32,
    pub fire_cooldown: u32,
    pub throw_cooldown: u32,
    pub hit_flash: f32,
    pub recoil: f32,
    pub respawn_ticks: u32,
    // Per-match perk multipliers
    pub damage_mul: f32,
    pub fire_rate_mul: f32,
    pub reload_mul: f32,
    pub damage_taken_mul: f32,
    pub flat_reduction: f32,
    pub kills: u32,
    /// Cumulative flowers bloomed on this unit's behalf; salts burst seeds
    pub flowers_bloomed: u32,
}

impl Unit {
    pub fn new(id: UnitId, team: TeamId, pos: Vec2) -> Self {
        Self {
            id,
            team,
            pos,
            vel: Vec2::ZERO,
            aim: Vec2::X,
            move_intent: Vec2::ZERO,
            radius: UNIT_RADIUS,
            hp: 100.0,
            max_hp: 100.0,
            alive: true,
            weapon: 0,
            ammo: 0,
            reloading: false,
            reload_ticks_left: 0,
            fire_cooldown: 0,
            throw_cooldown: 0,
            hit_flash: 0.0,
            recoil: 0.0,
            respawn_ticks: 0,
            damage_mul: 1.0,
            fire_rate_mul: 1.0,
            reload_mul: 1.0,
            damage_taken_mul: 1.0,
            flat_reduction: 0.0,
            kills: 0,
            flowers_bloomed: 0,
        }
    }

    /// Restore baseline between matches. Perk multipliers go back to
    /// neutral; the match layer re-applies perks for the new match.
    pub fn baseline_reset(&mut self, pos: Vec2) {
        let id = self.id;
        let team = self.team;
        let weapon = self.weapon;
        *self = Unit::new(id, team, pos);
        self.weapon = weapon;
    }

    /// Restore a dead unit mid-match. Perks and score survive a respawn.
    pub fn respawn_at(&mut self, pos: Vec2, magazine: u32) {
        self.pos = pos;
        self.vel = Vec2::ZERO;
        self.hp = self.max_hp;
        self.alive = true;
        self.ammo = magazine;
        self.reloading = false;
        self.reload_ticks_left = 0;
        self.fire_cooldown = 0;
        self.throw_cooldown = 0;
        self.hit_flash = 0.0;
        self.recoil = 0.0;
        self.respawn_ticks = 0;
    }
}

/// Run a perk's apply function against a unit
pub fn apply_perk(world: &mut World, id: UnitId, perk: &PerkDef) {
    if let Some(unit) = world.unit_mut(id) {
        (perk.apply)(unit);
        log::debug!("perk {} applied to unit {}", perk.id, id.0);
    }
}

pub fn set_move_intent(world: &mut World, id: UnitId, dir: Vec2) {
    if let Some(unit) = world.unit_mut(id) {
        unit.move_intent = dir.clamp_length_max(1.0);
    }
}

pub fn set_aim(world: &mut World, id: UnitId, dir: Vec2) {
    if let Some(unit) = world.unit_mut(id) {
        if dir.length_squared() > 1e-6 {
            unit.aim = dir.normalize();
        }
    }
}

/// Fire the unit's primary weapon: spends ammo, fans out pellets, ejects a
/// shell, applies recoil and (for the player) camera kick. Empty magazine
/// auto-starts a reload instead.
pub fn fire_primary(world: &mut World, sink: &mut dyn EventSink, id: UnitId) {
    let Some(unit) = world.live_unit(id) else {
        return;
    };
    if unit.fire_cooldown > 0 || unit.reloading {
        return;
    }
    if unit.ammo == 0 {
        start_reload(world, sink, id);
        return;
    }
    let Some(&stats) = world.weapons.get(unit.weapon) else {
        return;
    };

    let origin = unit.pos + unit.aim * (unit.radius + 0.2);
    let aim = unit.aim;
    let team = unit.team;
    let damage = stats.damage * unit.damage_mul;
    let fire_rate_mul = unit.fire_rate_mul.max(0.1);
    let salt = id.0 as u64;

    if let Some(unit) = world.unit_mut(id) {
        unit.ammo -= 1;
        unit.fire_cooldown =
            ((stats.fire_interval_ticks as f32 / fire_rate_mul).round() as u32).max(1);
        unit.recoil = 1.0;
    }

    let mut jitter = fx_rng(world.time_ticks, salt);
    for _pellet in 0..stats.pellets {
        let angle = (jitter.random::<f32>() - 0.5) * stats.spread_rad * 2.0;
        let dir = crate::rotate_vec(aim, angle);
        projectiles::spawn_projectile(
            world,
            stats.kind.projectile_kind(),
            origin,
            dir * stats.speed,
            damage,
            stats.range,
            id,
            team,
        );
    }

    if stats.kind.ejects_shell() {
        super::effects::spawn_shell_casing(world, origin, aim, &mut jitter);
    }
    super::effects::spawn_flight_trail(world, origin, aim, stats.speed);

    if world.is_player(id) {
        let kick = 0.08 * world.impact_feel.kick_scale();
        world.camera.add_kick(-aim, kick);
    }
}

/// Begin reloading unless already full or mid-reload
pub fn start_reload(world: &mut World, sink: &mut dyn EventSink, id: UnitId) {
    let Some(&stats) = world
        .live_unit(id)
        .and_then(|u| world.weapons.get(u.weapon))
    else {
        return;
    };
    let is_player = world.is_player(id);
    let Some(unit) = world.unit_mut(id) else {
        return;
    };
    if !unit.alive || unit.reloading || unit.ammo == stats.magazine {
        return;
    }
    unit.reloading = true;
    unit.reload_ticks_left =
        ((stats.reload_ticks as f32 / unit.reload_mul.max(0.1)).round() as u32).max(1);
    if is_player {
        sink.status_text("reloading");
    }
}

/// Lob a grenade or molotov toward the aim direction
pub fn throw_secondary(
    world: &mut World,
    _sink: &mut dyn EventSink,
    id: UnitId,
    kind: ThrowableKind,
) {
    let Some(unit) = world.live_unit(id) else {
        return;
    };
    if unit.throw_cooldown > 0 {
        return;
    }
    let origin = unit.pos + unit.aim * (unit.radius + 0.15);
    let vel = unit.aim * THROW_SPEED;
    let team = unit.team;
    if let Some(unit) = world.unit_mut(id) {
        unit.throw_cooldown = THROW_COOLDOWN_TICKS;
    }
    projectiles::spawn_throwable(world, kind, origin, vel, id, team);
}

const THROW_SPEED: f32 = 11.0;
const THROW_COOLDOWN_TICKS: u32 = 90;

/// Per-tick unit integration: timers, movement with friction, obstacle
/// push-out, pairwise separation, respawns and arena-boundary damage.
pub fn update_units(world: &mut World, sink: &mut dyn EventSink, dt: f32) {
    let blend = 1.0 - (-UNIT_FRICTION * dt).exp();
    let magazines: Vec<u32> = world.weapons.iter().map(|w| w.magazine).collect();

    let mut due_respawn: Vec<UnitId> = Vec::new();
    {
        let World { units, grid, .. } = world;
        for unit in units.iter_mut() {
            if !unit.alive {
                if unit.respawn_ticks > 0 {
                    unit.respawn_ticks -= 1;
                    if unit.respawn_ticks == 0 {
                        due_respawn.push(unit.id);
                    }
                }
                continue;
            }

            unit.fire_cooldown = unit.fire_cooldown.saturating_sub(1);
            unit.throw_cooldown = unit.throw_cooldown.saturating_sub(1);
            if unit.reloading {
                unit.reload_ticks_left = unit.reload_ticks_left.saturating_sub(1);
                if unit.reload_ticks_left == 0 {
                    unit.reloading = false;
                    unit.ammo = magazines.get(unit.weapon).copied().unwrap_or(0);
                }
            }
            unit.hit_flash = (unit.hit_flash - dt * 2.5).max(0.0);
            unit.recoil = (unit.recoil - dt * 6.0).max(0.0);

            let target_vel = unit.move_intent * UNIT_MOVE_SPEED;
            unit.vel += (target_vel - unit.vel) * blend;
            unit.pos += unit.vel * dt;
            resolve_circle_vs_grid(&mut unit.pos, &mut unit.vel, unit.radius, grid);
        }

        // Symmetric separation, once per unordered pair.
        let n = units.len();
        for i in 0..n {
            let (left, right) = units.split_at_mut(i + 1);
            let a = &mut left[i];
            if !a.alive {
                continue;
            }
            for b in right.iter_mut() {
                if !b.alive {
                    continue;
                }
                separate_pair(
                    &mut a.pos, &mut a.vel, a.radius, &mut b.pos, &mut b.vel, b.radius,
                );
            }
        }
    }

    for id in due_respawn {
        respawn_unit(world, sink, id);
    }

    // Standing outside the ring bleeds HP on a half-second cadence.
    if world.time_ticks.is_multiple_of(30) {
        let center = world.arena_center;
        let limit = world.arena.arena;
        let victims: Vec<(UnitId, TeamId, Vec2)> = world
            .units
            .iter()
            .filter(|u| u.alive && u.pos.distance(center) > limit)
            .map(|u| (u.id, u.team, (center - u.pos).normalize_or(Vec2::X)))
            .collect();
        for (id, team, dir) in victims {
            combat::apply_damage(
                world,
                sink,
                DamageEvent {
                    target: id,
                    origin: DamageOrigin::Arena,
                    source_team: team,
                    amount: ARENA_BOUNDARY_DPS * 0.5,
                    dir,
                    impact_speed: 0.0,
                    kind: DamageSource::Blast,
                },
            );
        }
    }
}

fn respawn_unit(world: &mut World, sink: &mut dyn EventSink, id: UnitId) {
    let center = world.arena_center;
    let ring = world.arena.spawn_ring;
    let count = world.units.len();
    let magazine = world
        .unit(id)
        .and_then(|u| world.weapons.get(u.weapon))
        .map(|w| w.magazine)
        .unwrap_or(0);
    if let Some(unit) = world.unit_mut(id) {
        let pos = spawn_ring_position(center, ring, id.0 as usize, count);
        unit.respawn_at(pos, magazine);
        sink.status_text("respawned");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::events::NullSink;
    use crate::sim::grid::generate_terrain;
    use crate::sim::state::World;

    fn world() -> World {
        World::new(
            7,
            generate_terrain(7, 24),
            &[TeamId(0), TeamId(1)],
            WeaponStats::default_loadout(),
            0,
        )
    }

    #[test]
    fn test_fire_spends_ammo_and_spawns_projectiles() {
        let mut w = world();
        w.units[0].ammo = 3;
        fire_primary(&mut w, &mut NullSink, UnitId(0));
        assert_eq!(w.units[0].ammo, 2);
        assert!(w.units[0].fire_cooldown > 0);
        assert_eq!(w.projectiles.active_count(), 1);
        assert_eq!(w.shells.active_count(), 1);
    }

    #[test]
    fn test_fire_respects_cooldown() {
        let mut w = world();
        w.units[0].ammo = 5;
        fire_primary(&mut w, &mut NullSink, UnitId(0));
        fire_primary(&mut w, &mut NullSink, UnitId(0));
        assert_eq!(w.units[0].ammo, 4, "second shot should be gated");
    }

    #[test]
    fn test_empty_magazine_starts_reload() {
        let mut w = world();
        w.units[0].ammo = 0;
        fire_primary(&mut w, &mut NullSink, UnitId(0));
        assert!(w.units[0].reloading);
        assert_eq!(w.projectiles.active_count(), 0);
    }

    #[test]
    fn test_reload_completes_over_ticks() {
        let mut w = world();
        w.units[0].ammo = 0;
        start_reload(&mut w, &mut NullSink, UnitId(0));
        let ticks = w.units[0].reload_ticks_left;
        for _ in 0..ticks {
            update_units(&mut w, &mut NullSink, crate::consts::SIM_DT);
            w.time_ticks += 1;
        }
        assert!(!w.units[0].reloading);
        assert_eq!(w.units[0].ammo, w.weapons[0].magazine);
    }

    #[test]
    fn test_shotgun_fans_pellets() {
        let mut w = world();
        w.units[0].weapon = 1;
        w.units[0].ammo = 2;
        fire_primary(&mut w, &mut NullSink, UnitId(0));
        assert_eq!(w.projectiles.active_count(), w.weapons[1].pellets as usize);
    }

    #[test]
    fn test_dead_unit_ignores_intents() {
        let mut w = world();
        w.units[0].alive = false;
        w.units[0].ammo = 5;
        fire_primary(&mut w, &mut NullSink, UnitId(0));
        assert_eq!(w.projectiles.active_count(), 0);
    }

    #[test]
    fn test_perk_application() {
        let mut w = world();
        let perk = PerkDef {
            id: "adrenaline",
            apply: |u| u.fire_rate_mul *= 1.25,
        };
        apply_perk(&mut w, UnitId(0), &perk);
        assert!((w.units[0].fire_rate_mul - 1.25).abs() < 1e-6);
    }
}
