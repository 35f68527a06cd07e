//! Collision detection and response against the obstacle grid
//!
//! Three flavors of resolution live here:
//! - soft circle-vs-cell push-out for units (a few settle passes, small
//!   velocity kick, tolerates slight interpenetration under heavy force)
//! - ray-marched segment sampling for fast projectiles, so thin walls don't
//!   get tunneled through at high velocity
//! - ricochet reflection for ragdolls, debris and bouncing shots

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::consts::{
    OBSTACLE_PUSH_KICK, OBSTACLE_SETTLE_PASSES, RAY_BACKTRACK, RAY_MARCH_STEPS,
    RICOCHET_SEPARATION,
};

use super::grid::ObstacleGrid;

/// A ray-marched hit against the grid
#[derive(Debug, Clone, Copy)]
pub struct GridHit {
    pub cell: (i32, i32),
    /// Sample point where the hit was detected
    pub point: Vec2,
    /// Obstacle-to-point normal at the hit
    pub normal: Vec2,
}

/// Overlap between a circle and a 1x1 cell rect: (push normal, depth).
/// Degenerate case (center inside the rect) resolves along the axis of
/// minimum overlap.
fn circle_cell_overlap(center: Vec2, radius: f32, cell_x: i32, cell_y: i32) -> Option<(Vec2, f32)> {
    let rect_min = Vec2::new(cell_x as f32, cell_y as f32);
    let rect_max = rect_min + Vec2::ONE;
    let nearest = center.clamp(rect_min, rect_max);
    let delta = center - nearest;
    let dist_sq = delta.length_squared();

    if dist_sq > 1e-12 {
        if dist_sq >= radius * radius {
            return None;
        }
        let dist = dist_sq.sqrt();
        return Some((delta / dist, radius - dist));
    }

    // Center is inside the rect. Find the cheapest face to exit through.
    let left = center.x - rect_min.x;
    let right = rect_max.x - center.x;
    let down = center.y - rect_min.y;
    let up = rect_max.y - center.y;
    let min_overlap = left.min(right).min(down).min(up);
    let normal = if min_overlap == left {
        Vec2::NEG_X
    } else if min_overlap == right {
        Vec2::X
    } else if min_overlap == down {
        Vec2::NEG_Y
    } else {
        Vec2::Y
    };
    Some((normal, radius + min_overlap))
}

/// Nearest point on a cell's surface to `p`, with the outward normal there.
/// Handles `p` inside the rect via the minimum-overlap face.
fn exterior_point_and_normal(cell_x: i32, cell_y: i32, p: Vec2) -> (Vec2, Vec2) {
    let rect_min = Vec2::new(cell_x as f32, cell_y as f32);
    let rect_max = rect_min + Vec2::ONE;
    let nearest = p.clamp(rect_min, rect_max);
    let delta = p - nearest;
    if delta.length_squared() > 1e-12 {
        return (nearest, delta.normalize());
    }

    let left = p.x - rect_min.x;
    let right = rect_max.x - p.x;
    let down = p.y - rect_min.y;
    let up = rect_max.y - p.y;
    let min_overlap = left.min(right).min(down).min(up);
    if min_overlap == left {
        (Vec2::new(rect_min.x, p.y), Vec2::NEG_X)
    } else if min_overlap == right {
        (Vec2::new(rect_max.x, p.y), Vec2::X)
    } else if min_overlap == down {
        (Vec2::new(p.x, rect_min.y), Vec2::NEG_Y)
    } else {
        (Vec2::new(p.x, rect_max.y), Vec2::Y)
    }
}

/// Push a circle out of any solid cells around it. Soft-constraint style:
/// position correction plus a velocity kick proportional to overlap, up to
/// `OBSTACLE_SETTLE_PASSES` passes so corners against multiple adjacent
/// cells settle. Returns whether anything moved.
pub fn resolve_circle_vs_grid(
    pos: &mut Vec2,
    vel: &mut Vec2,
    radius: f32,
    grid: &ObstacleGrid,
) -> bool {
    let mut any_moved = false;
    for _pass in 0..OBSTACLE_SETTLE_PASSES {
        let mut moved = false;
        let (cx, cy) = ObstacleGrid::world_to_cell(*pos);
        for dy in -1..=1 {
            for dx in -1..=1 {
                let (x, y) = (cx + dx, cy + dy);
                if !grid.is_cell_solid(x, y) {
                    continue;
                }
                if let Some((normal, depth)) = circle_cell_overlap(*pos, radius, x, y) {
                    *pos += normal * depth;
                    *vel += normal * depth * OBSTACLE_PUSH_KICK;
                    moved = true;
                }
            }
        }
        if !moved {
            break;
        }
        any_moved = true;
    }
    any_moved
}

/// Symmetric push-apart for two overlapping circles, applied once per
/// unordered pair per tick: each gets half the separation and a matching
/// velocity kick.
pub fn separate_pair(
    pos_a: &mut Vec2,
    vel_a: &mut Vec2,
    radius_a: f32,
    pos_b: &mut Vec2,
    vel_b: &mut Vec2,
    radius_b: f32,
) -> bool {
    let delta = *pos_b - *pos_a;
    let dist_sq = delta.length_squared();
    let min_dist = radius_a + radius_b;
    if dist_sq >= min_dist * min_dist {
        return false;
    }
    let dist = dist_sq.sqrt();
    let normal = if dist > 1e-6 { delta / dist } else { Vec2::X };
    let overlap = min_dist - dist;
    let half = normal * (overlap * 0.5);
    *pos_a -= half;
    *pos_b += half;
    *vel_a -= normal * overlap * OBSTACLE_PUSH_KICK * 0.5;
    *vel_b += normal * overlap * OBSTACLE_PUSH_KICK * 0.5;
    true
}

/// Ray-marched obstacle hit for fast projectiles. The segment from the
/// previous position (back-tracked slightly along the velocity) to the
/// current position is sampled at a fixed step count; the first solid cell
/// sampled is the hit. Compensates for tunneling through 1-cell walls
/// without a full continuous-collision solve.
pub fn raymarch_grid_hit(prev: Vec2, pos: Vec2, vel: Vec2, grid: &ObstacleGrid) -> Option<GridHit> {
    let start = prev - vel * RAY_BACKTRACK;
    let seg = pos - start;
    for step in 0..=RAY_MARCH_STEPS {
        let t = step as f32 / RAY_MARCH_STEPS as f32;
        let sample = start + seg * t;
        let (cx, cy) = ObstacleGrid::world_to_cell(sample);
        if grid.is_cell_solid(cx, cy) {
            let (_, normal) = exterior_point_and_normal(cx, cy, prev);
            return Some(GridHit {
                cell: (cx, cy),
                point: sample,
                normal,
            });
        }
    }
    None
}

/// Reflect a velocity and resolve a position out of a solid cell.
///
/// The velocity's normal component is scaled by `restitution`, the
/// tangential component by `friction`, and the result is rotated by a
/// seeded angular jitter in `[-jitter, jitter]`. The position lands on the
/// cell surface nearest the pre-collision point, nudged out along the
/// normal by a fixed separation so the next tick doesn't immediately
/// re-collide.
pub fn apply_obstacle_ricochet(
    prev: Vec2,
    pos: &mut Vec2,
    vel: &mut Vec2,
    cell: (i32, i32),
    restitution: f32,
    friction: f32,
    jitter: f32,
    rng: &mut Pcg32,
) {
    let (surface, normal) = exterior_point_and_normal(cell.0, cell.1, prev);

    let normal_speed = vel.dot(normal);
    let normal_part = normal * normal_speed;
    let tangent_part = *vel - normal_part;
    let mut reflected = tangent_part * friction - normal_part * restitution;

    if jitter > 0.0 {
        let angle = (rng.random::<f32>() * 2.0 - 1.0) * jitter;
        reflected = crate::rotate_vec(reflected, angle);
    }

    *vel = reflected;
    *pos = surface + normal * RICOCHET_SEPARATION;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::UNIT_RADIUS;
    use crate::sim::grid::{Material, ObstacleSpec, TerrainMap};
    use proptest::prelude::*;
    use rand::SeedableRng;

    fn grid_with_wall(x: i32, y: i32) -> ObstacleGrid {
        ObstacleGrid::from_map(&TerrainMap {
            grid_size: 16,
            obstacles: vec![ObstacleSpec {
                x,
                y,
                material: Material::Wall,
                high_tier_loot: false,
            }],
        })
    }

    #[test]
    fn test_push_out_of_single_cell() {
        let grid = grid_with_wall(5, 5);
        // Overlapping the left face of the cell at x=5.
        let mut pos = Vec2::new(4.8, 5.5);
        let mut vel = Vec2::ZERO;
        resolve_circle_vs_grid(&mut pos, &mut vel, UNIT_RADIUS, &grid);
        assert!(pos.x <= 5.0 - UNIT_RADIUS + 1e-4);
        assert!(vel.x < 0.0, "push-out should kick velocity away from the wall");
    }

    #[test]
    fn test_corner_settles_within_passes() {
        // Two adjacent cells forming an inside corner.
        let grid = ObstacleGrid::from_map(&TerrainMap {
            grid_size: 16,
            obstacles: vec![
                ObstacleSpec { x: 5, y: 5, material: Material::Wall, high_tier_loot: false },
                ObstacleSpec { x: 4, y: 5, material: Material::Wall, high_tier_loot: false },
            ],
        });
        let mut pos = Vec2::new(4.95, 4.9);
        let mut vel = Vec2::ZERO;
        resolve_circle_vs_grid(&mut pos, &mut vel, UNIT_RADIUS, &grid);
        for dy in -1..=1 {
            for dx in -1..=1 {
                let (cx, cy) = ObstacleGrid::world_to_cell(pos);
                if grid.is_cell_solid(cx + dx, cy + dy) {
                    let overlap =
                        circle_cell_overlap(pos, UNIT_RADIUS - 0.01, cx + dx, cy + dy);
                    assert!(overlap.is_none(), "still embedded after settle passes");
                }
            }
        }
    }

    #[test]
    fn test_pair_separation_is_symmetric() {
        let mut pos_a = Vec2::new(0.0, 0.0);
        let mut pos_b = Vec2::new(0.3, 0.0);
        let mut vel_a = Vec2::ZERO;
        let mut vel_b = Vec2::ZERO;
        separate_pair(&mut pos_a, &mut vel_a, 0.35, &mut pos_b, &mut vel_b, 0.35);
        let gap = (pos_b - pos_a).length();
        assert!((gap - 0.7).abs() < 1e-4);
        // Midpoint unchanged by the symmetric push.
        assert!(((pos_a + pos_b) * 0.5 - Vec2::new(0.15, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_raymarch_catches_thin_wall() {
        let grid = grid_with_wall(8, 5);
        // Fast horizontal shot whose discrete step lands past the 1-cell
        // wall entirely: 6.5 -> 9.5 in one tick.
        let vel = Vec2::new(180.0, 0.0);
        let prev = Vec2::new(6.5, 5.5);
        let pos = prev + vel * (1.0 / 60.0);
        assert!(!grid.is_cell_solid(pos.x.floor() as i32, pos.y.floor() as i32));
        let hit = raymarch_grid_hit(prev, pos, vel, &grid);
        let hit = hit.expect("ray march should find the 1-cell wall");
        assert_eq!(hit.cell, (8, 5));
    }

    #[test]
    fn test_raymarch_open_ground_misses() {
        let grid = grid_with_wall(8, 5);
        let prev = Vec2::new(2.5, 2.5);
        let pos = Vec2::new(3.5, 2.5);
        assert!(raymarch_grid_hit(prev, pos, Vec2::new(60.0, 0.0), &grid).is_none());
    }

    proptest! {
        /// Ricochet always resolves at least the separation epsilon outside
        /// the solid cell, whatever the approach angle.
        #[test]
        fn prop_ricochet_separates(angle in 0.0f32..std::f32::consts::TAU, speed in 1.0f32..40.0) {
            let cell = (5, 5);
            let center = Vec2::new(5.5, 5.5);
            let prev = center + crate::vec_from_angle(angle) * 0.9;
            let mut pos = center; // ended up inside the cell
            let mut vel = -crate::vec_from_angle(angle) * speed;
            let mut rng = Pcg32::seed_from_u64(1);
            apply_obstacle_ricochet(prev, &mut pos, &mut vel, cell, 0.5, 0.8, 0.1, &mut rng);

            let rect_min = Vec2::new(5.0, 5.0);
            let rect_max = Vec2::new(6.0, 6.0);
            let nearest = pos.clamp(rect_min, rect_max);
            let dist = (pos - nearest).length();
            prop_assert!(dist >= RICOCHET_SEPARATION * 0.99,
                "resolved {dist} inside/too close, pos {pos:?}");
        }

        /// Reflection never increases speed when restitution and friction
        /// are both below one.
        #[test]
        fn prop_ricochet_dissipates(angle in 0.0f32..std::f32::consts::TAU, speed in 1.0f32..40.0) {
            let prev = Vec2::new(5.5, 4.2);
            let mut pos = Vec2::new(5.5, 5.1);
            let mut vel = crate::vec_from_angle(angle) * speed;
            let mut rng = Pcg32::seed_from_u64(2);
            apply_obstacle_ricochet(prev, &mut pos, &mut vel, (5, 5), 0.45, 0.8, 0.0, &mut rng);
            prop_assert!(vel.length() <= speed * 1.001);
        }
    }
}
