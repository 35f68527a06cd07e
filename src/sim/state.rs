//! World state and core simulation types
//!
//! One `World` aggregate exclusively owns the obstacle grid, every entity
//! pool, the flower density index and the camera feedback scalars. Nothing
//! in the sim holds a reference into it across ticks; cross-entity links are
//! ids, so dangling references are impossible by construction.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::ImpactFeel;
use crate::consts::*;
use crate::vec_from_angle;

use super::camera::Camera;
use super::effects::{Debris, Explosion, FlightTrail, KillPetal, Ragdoll, ShellCasing};
use super::flowers::{DensityGrid, Flower};
use super::grid::{ObstacleGrid, TerrainMap};
use super::pickups::Pickup;
use super::pool::Pool;
use super::projectiles::{MolotovZone, Projectile, Throwable};
use super::rng;
use super::units::{Unit, WeaponStats};

/// Stable unit handle. Units are created at match start and reset in place,
/// so the id doubles as the roster index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct UnitId(pub u32);

/// Team tag; flowers, projectiles and damage events all carry one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct TeamId(pub u8);

/// Arena sizing derived from the roster size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArenaRadii {
    /// Units outside this ring take boundary damage
    pub arena: f32,
    /// Units spawn evenly spaced on this ring
    pub spawn_ring: f32,
}

/// Pure function of player count; match reset re-derives it. Grows with the
/// square root of the roster so densities stay comparable.
pub fn arena_radii_for_player_count(count: u32) -> ArenaRadii {
    let count = count.max(1) as f32;
    let arena = (18.0 + 3.2 * count.sqrt()).min(48.0);
    ArenaRadii {
        arena,
        spawn_ring: arena * 0.72,
    }
}

/// Complete simulation state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    /// Match seed for reproducibility
    pub seed: u64,
    /// Bumped on every match reset; salts match-generation streams
    pub match_index: u32,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub arena: ArenaRadii,
    pub arena_center: Vec2,
    /// Terrain kept around so match reset can rebuild the grid
    pub terrain: TerrainMap,
    pub grid: ObstacleGrid,
    pub flower_grid: DensityGrid,
    pub units: Vec<Unit>,
    /// Weapon stat table supplied by the content layer, indexed by weapon id
    pub weapons: Vec<WeaponStats>,
    /// The locally controlled unit (camera focus, SFX routing)
    pub player_id: UnitId,
    pub impact_feel: ImpactFeel,
    pub camera: Camera,
    pub projectiles: Pool<Projectile>,
    pub throwables: Pool<Throwable>,
    pub molotov_zones: Pool<MolotovZone>,
    pub explosions: Pool<Explosion>,
    pub flowers: Pool<Flower>,
    pub pickups: Pool<Pickup>,
    pub debris: Pool<Debris>,
    pub ragdolls: Pool<Ragdoll>,
    pub kill_petals: Pool<KillPetal>,
    pub shells: Pool<ShellCasing>,
    pub trails: Pool<FlightTrail>,
    /// Monotonic spawn counter for pickup eviction ordering
    pub pickup_seq: u64,
}

impl World {
    /// Build a world for one match. `roster` lists each unit's team;
    /// `player_index` marks the locally controlled one.
    pub fn new(
        seed: u64,
        terrain: TerrainMap,
        roster: &[TeamId],
        weapons: Vec<WeaponStats>,
        player_index: usize,
    ) -> Self {
        let arena = arena_radii_for_player_count(roster.len() as u32);
        let center = Vec2::splat(terrain.grid_size as f32 * 0.5);
        let grid = ObstacleGrid::from_map(&terrain);
        let flower_grid = DensityGrid::new(terrain.grid_size);

        let units: Vec<Unit> = roster
            .iter()
            .enumerate()
            .map(|(i, &team)| {
                let pos = spawn_ring_position(center, arena.spawn_ring, i, roster.len());
                let mut unit = Unit::new(UnitId(i as u32), team, pos);
                unit.ammo = weapons.first().map(|w| w.magazine).unwrap_or(0);
                unit
            })
            .collect();

        let mut world = Self {
            seed,
            match_index: 0,
            time_ticks: 0,
            arena,
            arena_center: center,
            terrain,
            grid,
            flower_grid,
            units,
            weapons,
            player_id: UnitId(player_index as u32),
            impact_feel: ImpactFeel::default(),
            camera: Camera::default(),
            projectiles: Pool::new(MAX_PROJECTILES),
            throwables: Pool::new(MAX_THROWABLES),
            molotov_zones: Pool::new(MAX_MOLOTOV_ZONES),
            explosions: Pool::new(MAX_EXPLOSIONS),
            flowers: Pool::new(MAX_FLOWERS),
            pickups: Pool::new(MAX_PICKUPS),
            debris: Pool::new(MAX_DEBRIS),
            ragdolls: Pool::new(MAX_RAGDOLLS),
            kill_petals: Pool::new(MAX_KILL_PETALS),
            shells: Pool::new(MAX_SHELL_CASINGS),
            trails: Pool::new(MAX_FLIGHT_TRAILS),
            pickup_seq: 0,
        };
        world.camera.pos = world
            .unit(world.player_id)
            .map(|u| u.pos)
            .unwrap_or(center);
        world
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id.0 as usize)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(id.0 as usize)
    }

    /// A unit that exists and has not been killed
    pub fn live_unit(&self, id: UnitId) -> Option<&Unit> {
        self.unit(id).filter(|u| u.alive)
    }

    pub fn is_player(&self, id: UnitId) -> bool {
        id == self.player_id
    }

    /// Nearest live unit of a team, excluding `exclude`. Attribution
    /// fallback for area damage whose literal source is gone.
    pub fn nearest_live_teammate(
        &self,
        team: TeamId,
        near: Vec2,
        exclude: Option<UnitId>,
    ) -> Option<UnitId> {
        self.units
            .iter()
            .filter(|u| u.alive && u.team == team && Some(u.id) != exclude)
            .min_by(|a, b| {
                a.pos
                    .distance_squared(near)
                    .partial_cmp(&b.pos.distance_squared(near))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|u| u.id)
    }

    /// Baseline-state restoration between matches: grid rebuilt, every pool
    /// bulk-cleared, density index zeroed, units restored in place. Perk
    /// multipliers reset to neutral; the match layer re-applies the new
    /// match's perks afterwards.
    pub fn reset_for_match(&mut self) {
        self.match_index += 1;
        self.time_ticks = 0;
        self.arena = arena_radii_for_player_count(self.units.len() as u32);
        self.grid = ObstacleGrid::from_map(&self.terrain);
        self.flower_grid.clear();

        self.projectiles.clear();
        self.throwables.clear();
        self.molotov_zones.clear();
        self.explosions.clear();
        self.flowers.clear();
        self.pickups.clear();
        self.debris.clear();
        self.ragdolls.clear();
        self.kill_petals.clear();
        self.shells.clear();
        self.trails.clear();
        self.pickup_seq = 0;

        let center = self.arena_center;
        let ring = self.arena.spawn_ring;
        let count = self.units.len();
        let magazines: Vec<u32> = self.weapons.iter().map(|w| w.magazine).collect();
        for (i, unit) in self.units.iter_mut().enumerate() {
            let pos = spawn_ring_position(center, ring, i, count);
            unit.baseline_reset(pos);
            unit.ammo = magazines.get(unit.weapon).copied().unwrap_or(0);
        }

        self.camera = Camera::default();
        self.camera.pos = self
            .unit(self.player_id)
            .map(|u| u.pos)
            .unwrap_or(center);
        log::info!(
            "match {} reset: {} units, arena radius {:.1}",
            self.match_index,
            count,
            self.arena.arena
        );
    }

    /// Read-only JSON snapshot for the debug/clipboard consumer
    pub fn snapshot_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            log::warn!("snapshot serialization failed: {e}");
            String::from("{}")
        })
    }

    /// Match-generation RNG stream, salted by match index
    pub fn match_rng(&self, stream: u64) -> rand_pcg::Pcg32 {
        rng::stream_rng(self.seed.wrapping_add(self.match_index as u64), stream)
    }
}

/// Evenly spaced spawn slot on the ring
pub fn spawn_ring_position(center: Vec2, ring: f32, slot: usize, count: usize) -> Vec2 {
    let theta = std::f32::consts::TAU * slot as f32 / count.max(1) as f32;
    center + vec_from_angle(theta) * ring
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::grid::generate_terrain;
    use crate::sim::units::WeaponStats;

    pub(crate) fn test_world(seed: u64) -> World {
        let terrain = generate_terrain(seed, 24);
        World::new(
            seed,
            terrain,
            &[TeamId(0), TeamId(0), TeamId(1), TeamId(1)],
            WeaponStats::default_loadout(),
            0,
        )
    }

    #[test]
    fn test_arena_radii_snapshot_stable() {
        // Pure function of player count - these values are load-bearing for
        // match balance and must not drift.
        let cases = [
            (2, 22.525484, 16.218348),
            (5, 25.155418, 18.111902),
            (8, 27.050966, 19.476696),
            (12, 29.085125, 20.941292),
        ];
        for (count, arena, spawn_ring) in cases {
            let radii = arena_radii_for_player_count(count);
            assert!(
                (radii.arena - arena).abs() < 1e-3,
                "arena radius for {count} players drifted: {}",
                radii.arena
            );
            assert!(
                (radii.spawn_ring - spawn_ring).abs() < 1e-3,
                "spawn ring for {count} players drifted: {}",
                radii.spawn_ring
            );
        }
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut world = test_world(5);
        // Dirty some state.
        let i = world.flowers.alloc();
        world.flowers.slots_mut()[i].active = true;
        world.units[1].hp = 1.0;
        world.units[1].alive = false;
        world.time_ticks = 999;

        world.reset_for_match();
        assert_eq!(world.flowers.active_count(), 0);
        assert_eq!(world.time_ticks, 0);
        assert!(world.units[1].alive);
        assert_eq!(world.units[1].hp, world.units[1].max_hp);
    }

    #[test]
    fn test_snapshot_is_valid_json() {
        let world = test_world(9);
        let snapshot = world.snapshot_json();
        let parsed: serde_json::Value = serde_json::from_str(&snapshot).unwrap();
        assert!(parsed.get("units").is_some());
        assert!(parsed.get("grid").is_some());
    }

    #[test]
    fn test_nearest_teammate_excludes_self() {
        let world = test_world(1);
        let near = world.units[0].pos;
        let found = world.nearest_live_teammate(TeamId(0), near, Some(UnitId(0)));
        assert_eq!(found, Some(UnitId(1)));
    }
}
