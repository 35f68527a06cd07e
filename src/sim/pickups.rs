//! Pickups: pooled drops with priority-ordered eviction
//!
//! Unlike the other pools, a saturated pickup pool evicts the globally
//! lowest-priority drop (ties broken by oldest spawn order) so a high-tier
//! drop never vanishes to make room for loose ammo.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::events::EventSink;
use super::pool::PoolSlot;
use super::rng::fx_rng;
use super::state::{UnitId, World};

const PICKUP_TTL_TICKS: u32 = 15 * 60;
const COLLECT_RADIUS: f32 = 0.9;
const HEAL_AMOUNT: f32 = 30.0;
/// High-tier loot grants a small permanent (per-match) damage bump
const HIGH_TIER_DAMAGE_BONUS: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PickupKind {
    #[default]
    Ammo,
    Heal,
    Weapon,
    HighTier,
}

impl PickupKind {
    /// Eviction priority: lower goes first when the pool is saturated
    pub fn priority(self) -> i32 {
        match self {
            PickupKind::Ammo => 0,
            PickupKind::Heal => 1,
            PickupKind::Weapon => 2,
            PickupKind::HighTier => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Pickup {
    pub active: bool,
    pub kind: PickupKind,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Weapon table index, meaningful only for `Weapon` drops
    pub weapon_index: usize,
    pub ttl_ticks: u32,
    pub spawn_seq: u64,
}

impl PoolSlot for Pickup {
    fn active(&self) -> bool {
        self.active
    }
    fn deactivate(&mut self) {
        self.active = false;
    }
}

pub fn spawn_pickup(world: &mut World, pos: Vec2, kind: PickupKind, weapon_index: usize) {
    let seq = world.pickup_seq;
    world.pickup_seq += 1;
    let i = world
        .pickups
        .alloc_evict_by(|p| (p.kind.priority(), p.spawn_seq));
    world.pickups.slots_mut()[i] = Pickup {
        active: true,
        kind,
        pos,
        vel: Vec2::ZERO,
        weapon_index,
        ttl_ticks: PICKUP_TTL_TICKS,
        spawn_seq: seq,
    };
}

/// Chance drop on a kill, rolled from the deterministic FX stream
pub fn maybe_drop_on_kill(world: &mut World, pos: Vec2) {
    let mut roll = fx_rng(world.time_ticks, 0x41c ^ pos.x.to_bits() as u64);
    let r = roll.random::<f32>();
    if r < 0.15 {
        spawn_pickup(world, pos, PickupKind::Heal, 0);
    } else if r < 0.35 {
        spawn_pickup(world, pos, PickupKind::Ammo, 0);
    }
}

/// Grab the nearest pickup within reach, applying its effect
pub fn collect_nearby_pickup(world: &mut World, sink: &mut dyn EventSink, id: UnitId) {
    let Some(unit) = world.live_unit(id) else {
        return;
    };
    let unit_pos = unit.pos;

    let mut best: Option<(usize, f32)> = None;
    for (i, p) in world.pickups.slots().iter().enumerate() {
        if !p.active {
            continue;
        }
        let dist_sq = p.pos.distance_squared(unit_pos);
        if dist_sq <= COLLECT_RADIUS * COLLECT_RADIUS
            && best.is_none_or(|(_, bd)| dist_sq < bd)
        {
            best = Some((i, dist_sq));
        }
    }
    let Some((slot, _)) = best else {
        return;
    };

    let pickup = world.pickups.slots()[slot];
    world.pickups.slots_mut()[slot].deactivate();

    let magazine = world
        .unit(id)
        .and_then(|u| world.weapons.get(u.weapon))
        .map(|w| w.magazine)
        .unwrap_or(0);
    let is_player = world.is_player(id);
    let Some(unit) = world.unit_mut(id) else {
        return;
    };
    match pickup.kind {
        PickupKind::Ammo => {
            unit.ammo = magazine;
            unit.reloading = false;
            unit.reload_ticks_left = 0;
        }
        PickupKind::Heal => {
            unit.hp = (unit.hp + HEAL_AMOUNT).min(unit.max_hp);
        }
        PickupKind::Weapon => {
            unit.weapon = pickup.weapon_index;
            unit.ammo = 0;
            unit.reloading = false;
            unit.reload_ticks_left = 0;
        }
        PickupKind::HighTier => {
            unit.damage_mul += HIGH_TIER_DAMAGE_BONUS;
        }
    }
    sink.sfx_pickup(pickup.pos, pickup.kind);
    if is_player {
        sink.status_text(match pickup.kind {
            PickupKind::Ammo => "ammo restocked",
            PickupKind::Heal => "patched up",
            PickupKind::Weapon => "new weapon",
            PickupKind::HighTier => "high-tier salvage",
        });
    }
}

/// Drift, expire
pub fn update_pickups(world: &mut World, dt: f32) {
    let drag = (-4.0f32 * dt).exp();
    for p in world.pickups.iter_active_mut() {
        p.pos += p.vel * dt;
        p.vel *= drag;
        p.ttl_ticks = p.ttl_ticks.saturating_sub(1);
        if p.ttl_ticks == 0 {
            p.deactivate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::MAX_PICKUPS;
    use crate::sim::events::NullSink;
    use crate::sim::grid::TerrainMap;
    use crate::sim::state::{TeamId, World};
    use crate::sim::units::WeaponStats;

    fn world() -> World {
        World::new(
            13,
            TerrainMap {
                grid_size: 24,
                obstacles: vec![],
            },
            &[TeamId(0), TeamId(1)],
            WeaponStats::default_loadout(),
            0,
        )
    }

    #[test]
    fn test_saturation_evicts_lowest_priority_oldest() {
        let mut w = world();
        // Fill with ammo, then one high-tier.
        for _ in 0..(MAX_PICKUPS - 1) {
            spawn_pickup(&mut w, Vec2::new(5.0, 5.0), PickupKind::Ammo, 0);
        }
        spawn_pickup(&mut w, Vec2::new(9.0, 9.0), PickupKind::HighTier, 0);
        assert_eq!(w.pickups.active_count(), MAX_PICKUPS);

        // Next spawn evicts the oldest ammo drop, not the high-tier one.
        spawn_pickup(&mut w, Vec2::new(6.0, 6.0), PickupKind::Heal, 0);
        let high_tier_alive = w
            .pickups
            .iter_active()
            .any(|p| p.kind == PickupKind::HighTier);
        assert!(high_tier_alive);
        let oldest_gone = w.pickups.iter_active().all(|p| p.spawn_seq != 0);
        assert!(oldest_gone, "oldest ammo drop should have been evicted");
    }

    #[test]
    fn test_collect_heals_and_fires_callback() {
        struct Sink {
            picked: u32,
        }
        impl EventSink for Sink {
            fn sfx_pickup(&mut self, _pos: Vec2, _kind: PickupKind) {
                self.picked += 1;
            }
        }

        let mut w = world();
        w.units[0].hp = 50.0;
        let pos = w.units[0].pos;
        spawn_pickup(&mut w, pos, PickupKind::Heal, 0);

        let mut sink = Sink { picked: 0 };
        collect_nearby_pickup(&mut w, &mut sink, UnitId(0));
        assert_eq!(w.units[0].hp, 80.0);
        assert_eq!(sink.picked, 1);
        assert_eq!(w.pickups.active_count(), 0);
    }

    #[test]
    fn test_collect_out_of_reach_is_noop() {
        let mut w = world();
        let pos = w.units[0].pos + Vec2::new(5.0, 0.0);
        spawn_pickup(&mut w, pos, PickupKind::Heal, 0);
        collect_nearby_pickup(&mut w, &mut NullSink, UnitId(0));
        assert_eq!(w.pickups.active_count(), 1);
    }

    #[test]
    fn test_pickup_expires() {
        let mut w = world();
        spawn_pickup(&mut w, Vec2::new(4.0, 4.0), PickupKind::Ammo, 0);
        for _ in 0..PICKUP_TTL_TICKS {
            update_pickups(&mut w, crate::consts::SIM_DT);
        }
        assert_eq!(w.pickups.active_count(), 0);
    }
}
