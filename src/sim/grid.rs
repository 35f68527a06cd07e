//! Destructible obstacle grid
//!
//! Square grid of 1x1 terrain cells held in parallel arrays. Built once per
//! match from a terrain map, mutated by damage events, never resized.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// What a solid cell is made of. Decides base HP and which damage sources
/// can affect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Material {
    #[default]
    Crate,
    Wall,
    Warehouse,
    Rock,
    Hedge,
}

impl Material {
    pub fn base_hp(self) -> f32 {
        match self {
            Material::Crate => 6.0,
            Material::Wall => 10.0,
            Material::Warehouse => 16.0,
            Material::Rock => 30.0,
            Material::Hedge => 4.0,
        }
    }

    /// Whether a damage source can reduce this material's HP at all.
    /// Fire only burns vegetation; everything else chews through any cell.
    pub fn admits(self, source: DamageSource) -> bool {
        match source {
            DamageSource::Fire => matches!(self, Material::Hedge),
            DamageSource::Ballistic | DamageSource::Blast => true,
        }
    }
}

/// How the last hit on a cell should read visually
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FlashKind {
    #[default]
    None,
    /// Hit landed but the material shrugged it off
    Blocked,
    /// HP was actually reduced
    Damaged,
}

/// Kind of damage arriving at a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageSource {
    Ballistic,
    Blast,
    Fire,
}

/// Outcome of `damage_cell`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellDamage {
    pub damaged: bool,
    pub destroyed: bool,
}

/// One obstacle in a terrain map
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ObstacleSpec {
    pub x: i32,
    pub y: i32,
    pub material: Material,
    pub high_tier_loot: bool,
}

/// Content-layer terrain description consumed at match start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainMap {
    pub grid_size: usize,
    pub obstacles: Vec<ObstacleSpec>,
}

/// Destructible terrain cells addressed by `y * size + x`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleGrid {
    size: usize,
    solid: Vec<bool>,
    material: Vec<Material>,
    hp: Vec<f32>,
    max_hp: Vec<f32>,
    high_tier_loot: Vec<bool>,
    flash: Vec<f32>,
    flash_kind: Vec<FlashKind>,
}

impl ObstacleGrid {
    pub fn new(size: usize) -> Self {
        let n = size * size;
        Self {
            size,
            solid: vec![false; n],
            material: vec![Material::default(); n],
            hp: vec![0.0; n],
            max_hp: vec![0.0; n],
            high_tier_loot: vec![false; n],
            flash: vec![0.0; n],
            flash_kind: vec![FlashKind::None; n],
        }
    }

    pub fn from_map(map: &TerrainMap) -> Self {
        let mut grid = Self::new(map.grid_size);
        for obstacle in &map.obstacles {
            if !grid.in_bounds(obstacle.x, obstacle.y) {
                log::warn!(
                    "terrain obstacle at ({}, {}) outside {}x{} grid, dropped",
                    obstacle.x,
                    obstacle.y,
                    map.grid_size,
                    map.grid_size
                );
                continue;
            }
            let i = grid.idx(obstacle.x, obstacle.y);
            grid.solid[i] = true;
            grid.material[i] = obstacle.material;
            grid.hp[i] = obstacle.material.base_hp();
            grid.max_hp[i] = obstacle.material.base_hp();
            grid.high_tier_loot[i] = obstacle.high_tier_loot;
        }
        grid
    }

    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn idx(&self, x: i32, y: i32) -> usize {
        y as usize * self.size + x as usize
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.size && (y as usize) < self.size
    }

    /// World position to cell coordinates (cells are 1x1, origin at 0,0)
    #[inline]
    pub fn world_to_cell(pos: Vec2) -> (i32, i32) {
        (pos.x.floor() as i32, pos.y.floor() as i32)
    }

    /// Center of a cell in world coordinates
    #[inline]
    pub fn cell_center(x: i32, y: i32) -> Vec2 {
        Vec2::new(x as f32 + 0.5, y as f32 + 0.5)
    }

    /// Out-of-range cells are treated as open ground - projectiles and units
    /// legitimately travel near and across map edges.
    #[inline]
    pub fn is_cell_solid(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && self.solid[self.idx(x, y)]
    }

    pub fn material_at(&self, x: i32, y: i32) -> Option<Material> {
        if self.is_cell_solid(x, y) {
            Some(self.material[self.idx(x, y)])
        } else {
            None
        }
    }

    pub fn hp_at(&self, x: i32, y: i32) -> f32 {
        if self.in_bounds(x, y) {
            self.hp[self.idx(x, y)]
        } else {
            0.0
        }
    }

    pub fn flash_at(&self, x: i32, y: i32) -> (f32, FlashKind) {
        if self.in_bounds(x, y) {
            let i = self.idx(x, y);
            (self.flash[i], self.flash_kind[i])
        } else {
            (0.0, FlashKind::None)
        }
    }

    pub fn has_high_tier_loot(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && self.high_tier_loot[self.idx(x, y)]
    }

    /// Apply damage to a cell. Reducing HP pulses a `Damaged` flash; a source
    /// the material ignores pulses `Blocked` instead and leaves HP alone.
    /// Destruction clears `solid` and zeroes HP, reported exactly once.
    pub fn damage_cell(&mut self, x: i32, y: i32, amount: f32, source: DamageSource) -> CellDamage {
        if !self.is_cell_solid(x, y) {
            return CellDamage::default();
        }
        let i = self.idx(x, y);

        if !self.material[i].admits(source) {
            self.flash[i] = 1.0;
            self.flash_kind[i] = FlashKind::Blocked;
            return CellDamage {
                damaged: false,
                destroyed: false,
            };
        }

        self.hp[i] = (self.hp[i] - amount.max(0.0)).min(self.max_hp[i]);
        self.flash[i] = 1.0;
        self.flash_kind[i] = FlashKind::Damaged;

        if self.hp[i] <= 0.0 {
            self.hp[i] = 0.0;
            self.solid[i] = false;
            CellDamage {
                damaged: true,
                destroyed: true,
            }
        } else {
            CellDamage {
                damaged: true,
                destroyed: false,
            }
        }
    }

    /// Linear flash drain over the whole grid. O(size^2), fine for the small
    /// fixed grids this game uses.
    pub fn decay_flash(&mut self, dt: f32) {
        for (flash, kind) in self.flash.iter_mut().zip(self.flash_kind.iter_mut()) {
            if *flash > 0.0 {
                *flash = (*flash - dt * 3.0).max(0.0);
                if *flash == 0.0 {
                    *kind = FlashKind::None;
                }
            }
        }
    }

    /// Read-only cell arrays for the renderer
    pub fn solid_cells(&self) -> &[bool] {
        &self.solid
    }

    pub fn materials(&self) -> &[Material] {
        &self.material
    }

    pub fn flash_levels(&self) -> &[f32] {
        &self.flash
    }
}

/// Scatter a deterministic obstacle layout for the headless binary and
/// tests; real matches get their map from the content layer. Derives
/// everything from the seed the way wave layouts do, so the same seed
/// always produces the same arena.
pub fn generate_terrain(seed: u64, size: usize) -> TerrainMap {
    use rand::Rng;

    let mut rng = super::rng::stream_rng(seed, 0xe77a);
    let mut obstacles = Vec::new();
    let center = size as f32 * 0.5;
    let cluster_count = (size / 6).max(3);

    for _ in 0..cluster_count {
        let cx = rng.random_range(2..size.saturating_sub(2).max(3)) as i32;
        let cy = rng.random_range(2..size.saturating_sub(2).max(3)) as i32;
        let material = match rng.random_range(0..5u32) {
            0 => Material::Crate,
            1 => Material::Wall,
            2 => Material::Warehouse,
            3 => Material::Rock,
            _ => Material::Hedge,
        };
        let span = rng.random_range(1..4i32);
        let horizontal = rng.random::<bool>();
        for k in 0..span {
            let (x, y) = if horizontal { (cx + k, cy) } else { (cx, cy + k) };
            // Keep the middle of the arena open for the opening brawl.
            let d = Vec2::new(x as f32 + 0.5 - center, y as f32 + 0.5 - center).length();
            if d < 3.0 {
                continue;
            }
            obstacles.push(ObstacleSpec {
                x,
                y,
                material,
                high_tier_loot: rng.random::<f32>() < 0.05,
            });
        }
    }

    TerrainMap {
        grid_size: size,
        obstacles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall_at(x: i32, y: i32) -> ObstacleGrid {
        ObstacleGrid::from_map(&TerrainMap {
            grid_size: 8,
            obstacles: vec![ObstacleSpec {
                x,
                y,
                material: Material::Wall,
                high_tier_loot: false,
            }],
        })
    }

    #[test]
    fn test_projectile_damage_reduces_hp() {
        let mut grid = wall_at(2, 3);
        // Wall starts at 10 HP; two 4-damage hits leave 2.
        let first = grid.damage_cell(2, 3, 4.0, DamageSource::Ballistic);
        assert_eq!(
            first,
            CellDamage {
                damaged: true,
                destroyed: false
            }
        );
        assert_eq!(grid.hp_at(2, 3), 6.0);

        let second = grid.damage_cell(2, 3, 4.0, DamageSource::Ballistic);
        assert!(second.damaged && !second.destroyed);
        assert_eq!(grid.hp_at(2, 3), 2.0);
        let (flash, kind) = grid.flash_at(2, 3);
        assert_eq!(flash, 1.0);
        assert_eq!(kind, FlashKind::Damaged);
    }

    #[test]
    fn test_fire_blocked_by_wall() {
        let mut grid = wall_at(2, 3);
        let result = grid.damage_cell(2, 3, 4.0, DamageSource::Fire);
        assert!(!result.damaged && !result.destroyed);
        assert_eq!(grid.hp_at(2, 3), 10.0);
        let (flash, kind) = grid.flash_at(2, 3);
        assert_eq!(flash, 1.0);
        assert_eq!(kind, FlashKind::Blocked);
    }

    #[test]
    fn test_fire_burns_hedge() {
        let mut grid = ObstacleGrid::from_map(&TerrainMap {
            grid_size: 8,
            obstacles: vec![ObstacleSpec {
                x: 1,
                y: 1,
                material: Material::Hedge,
                high_tier_loot: false,
            }],
        });
        let result = grid.damage_cell(1, 1, 1.5, DamageSource::Fire);
        assert!(result.damaged);
        assert_eq!(grid.hp_at(1, 1), 2.5);
    }

    #[test]
    fn test_destruction_clears_solid_once() {
        let mut grid = wall_at(0, 0);
        let result = grid.damage_cell(0, 0, 50.0, DamageSource::Blast);
        assert!(result.destroyed);
        assert!(!grid.is_cell_solid(0, 0));
        assert_eq!(grid.hp_at(0, 0), 0.0);
        // Further hits on the cleared cell are no-ops.
        let again = grid.damage_cell(0, 0, 50.0, DamageSource::Blast);
        assert_eq!(again, CellDamage::default());
    }

    #[test]
    fn test_out_of_range_not_solid() {
        let grid = wall_at(0, 0);
        assert!(!grid.is_cell_solid(-1, 0));
        assert!(!grid.is_cell_solid(0, 100));
        assert_eq!(grid.hp_at(-5, -5), 0.0);
    }

    #[test]
    fn test_flash_decays_to_none() {
        let mut grid = wall_at(2, 2);
        grid.damage_cell(2, 2, 1.0, DamageSource::Ballistic);
        for _ in 0..120 {
            grid.decay_flash(1.0 / 60.0);
        }
        let (flash, kind) = grid.flash_at(2, 2);
        assert_eq!(flash, 0.0);
        assert_eq!(kind, FlashKind::None);
    }
}
