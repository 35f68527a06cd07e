//! Bloom Arena headless entry point
//!
//! Runs a scripted bot match with no renderer attached: the reference
//! consumer for the sim's intent calls, event callbacks and snapshot
//! interface, and a quick smoke run for the whole core.

use glam::Vec2;

use bloom_arena::consts::SIM_DT;
use bloom_arena::sim::flowers::coverage_by_team;
use bloom_arena::sim::grid::generate_terrain;
use bloom_arena::sim::projectiles::ThrowableKind;
use bloom_arena::sim::units::{self, WeaponStats};
use bloom_arena::sim::{EventSink, PickupKind, TeamId, UnitId, World, tick};

/// Counts events instead of playing them
#[derive(Default)]
struct TallySink {
    hits: u32,
    explosions: u32,
    deaths: u32,
    pickups: u32,
}

impl EventSink for TallySink {
    fn sfx_hit(&mut self, _pos: Vec2) {
        self.hits += 1;
    }
    fn sfx_explosion(&mut self, pos: Vec2) {
        self.explosions += 1;
        log::debug!("explosion at ({:.1}, {:.1})", pos.x, pos.y);
    }
    fn sfx_player_death(&mut self) {
        self.deaths += 1;
    }
    fn sfx_generic_death(&mut self, _pos: Vec2) {
        self.deaths += 1;
    }
    fn sfx_pickup(&mut self, _pos: Vec2, _kind: PickupKind) {
        self.pickups += 1;
    }
    fn status_text(&mut self, text: &str) {
        log::debug!("status: {text}");
    }
}

fn main() {
    env_logger::init();

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0xB100u64);
    let minutes: u64 = std::env::args()
        .nth(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(2);

    let roster = [
        TeamId(0),
        TeamId(0),
        TeamId(0),
        TeamId(1),
        TeamId(1),
        TeamId(1),
    ];
    let mut world = World::new(
        seed,
        generate_terrain(seed, 52),
        &roster,
        WeaponStats::default_loadout(),
        0,
    );
    // Mix up the loadouts so every weapon archetype gets exercised.
    for (i, unit) in world.units.iter_mut().enumerate() {
        unit.weapon = i % 4;
    }

    let mut sink = TallySink::default();
    let total_ticks = minutes * 60 * 60;
    log::info!("seed {seed}: running {total_ticks} ticks with {} bots", roster.len());

    for step in 0..total_ticks {
        drive_bots(&mut world, &mut sink, step);
        tick(&mut world, &mut sink, SIM_DT);
    }

    let coverage = coverage_by_team(&world.flowers, 2);
    println!("=== match summary (seed {seed}) ===");
    println!("ticks:           {total_ticks}");
    println!("hits:            {}", sink.hits);
    println!("deaths:          {}", sink.deaths);
    println!("explosions:      {}", sink.explosions);
    println!("pickups taken:   {}", sink.pickups);
    println!("flower coverage: team0={} team1={}", coverage[0], coverage[1]);
    for unit in &world.units {
        println!(
            "unit {} (team {}): {} kills, {:.0}/{:.0} hp, {} flowers",
            unit.id.0, unit.team.0, unit.kills, unit.hp, unit.max_hp, unit.flowers_bloomed
        );
    }
    println!("snapshot bytes:  {}", world.snapshot_json().len());
}

/// Minimal bot driver: chase the nearest enemy, strafe a little, shoot on a
/// per-unit cadence, lob something occasionally.
fn drive_bots(world: &mut World, sink: &mut TallySink, step: u64) {
    let mut orders: Vec<(UnitId, Vec2, Vec2)> = Vec::new();
    for unit in &world.units {
        if !unit.alive {
            continue;
        }
        let Some(enemy) = world
            .units
            .iter()
            .filter(|e| e.alive && e.team != unit.team)
            .min_by(|a, b| {
                a.pos
                    .distance_squared(unit.pos)
                    .partial_cmp(&b.pos.distance_squared(unit.pos))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
        else {
            continue;
        };
        let to_enemy = enemy.pos - unit.pos;
        let aim = to_enemy.normalize_or(Vec2::X);
        let strafe = Vec2::new(-aim.y, aim.x) * ((step as f32 * 0.01).sin() * 0.4);
        let advance = if to_enemy.length() > 6.0 { aim } else { Vec2::ZERO };
        orders.push((unit.id, aim, (advance + strafe).clamp_length_max(1.0)));
    }

    for (id, aim, movement) in orders {
        units::set_aim(world, id, aim);
        units::set_move_intent(world, id, movement);
        let phase = id.0 as u64 * 7;
        if (step + phase).is_multiple_of(12) {
            units::fire_primary(world, sink, id);
        }
        if (step + phase).is_multiple_of(600) {
            let kind = if id.0 % 2 == 0 {
                ThrowableKind::Grenade
            } else {
                ThrowableKind::Molotov
            };
            units::throw_secondary(world, sink, id, kind);
        }
        if (step + phase).is_multiple_of(30) {
            bloom_arena::sim::pickups::collect_nearby_pickup(world, sink, id);
        }
    }
}
