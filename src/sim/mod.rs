//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG / hash streams only, never the platform RNG
//! - Stable iteration order (pool slot order, unit index order)
//! - No rendering or platform dependencies

pub mod camera;
pub mod collision;
pub mod combat;
pub mod effects;
pub mod events;
pub mod flowers;
pub mod grid;
pub mod pickups;
pub mod pool;
pub mod projectiles;
pub mod rng;
pub mod state;
pub mod tick;
pub mod units;

pub use camera::{Camera, CullBounds, build_cull_bounds, is_inside_cull_bounds};
pub use collision::{GridHit, apply_obstacle_ricochet, raymarch_grid_hit, resolve_circle_vs_grid};
pub use combat::{DamageEvent, DamageOrigin, apply_damage, spawn_explosion};
pub use events::{EventSink, NullSink};
pub use flowers::{DensityGrid, Flower, bloom_weight_for_size, pick_flower_position};
pub use grid::{CellDamage, DamageSource, FlashKind, Material, ObstacleGrid, ObstacleSpec, TerrainMap};
pub use pickups::{Pickup, PickupKind};
pub use pool::{Pool, PoolSlot};
pub use state::{ArenaRadii, TeamId, UnitId, World, arena_radii_for_player_count};
pub use tick::tick;
pub use units::{PerkDef, Unit, WeaponKind, WeaponStats};
