//! Seeded hash streams for reproducible in-sim randomness
//!
//! The simulation never touches the platform RNG. Anything that needs jitter
//! derives a `Pcg32` from a hash of stable inputs, so repeated calls with the
//! same inputs produce the same results regardless of global draw order.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::state::UnitId;

/// splitmix64 finalizer - cheap, well-mixed
#[inline]
pub fn mix(mut h: u64) -> u64 {
    h = h.wrapping_add(0x9e37_79b9_7f4a_7c15);
    h = (h ^ (h >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    h ^ (h >> 31)
}

/// Fold a value into a running hash
#[inline]
pub fn mix_in(h: u64, v: u64) -> u64 {
    mix(h ^ v.wrapping_mul(0x9e37_79b9_7f4a_7c15))
}

/// Quantize a world coordinate to 1/16 cell for hashing
#[inline]
fn quantize(v: f32) -> u64 {
    (v * 16.0).round() as i64 as u64
}

/// Seed for one flower-burst placement, hashed from the burst parameters and
/// the owner's cumulative flower count. Two bursts with identical parameters
/// land identically; consecutive flowers of one burst differ via the count.
pub fn burst_seed(owner: UnitId, pos: Vec2, dir: Vec2, flower_count: u32) -> u64 {
    let mut h = mix(owner.0 as u64);
    h = mix_in(h, quantize(pos.x));
    h = mix_in(h, quantize(pos.y));
    h = mix_in(h, quantize(dir.x * 16.0));
    h = mix_in(h, quantize(dir.y * 16.0));
    mix_in(h, flower_count as u64)
}

/// Deterministic jitter stream for transient FX (shell ejection, ricochet
/// angular noise). Keyed by tick and an entity-ish salt.
pub fn fx_rng(tick: u64, salt: u64) -> Pcg32 {
    Pcg32::seed_from_u64(mix_in(mix(tick), salt))
}

/// RNG for one flower burst
pub fn burst_rng(owner: UnitId, pos: Vec2, dir: Vec2, flower_count: u32) -> Pcg32 {
    Pcg32::seed_from_u64(burst_seed(owner, pos, dir, flower_count))
}

/// Match-generation stream (spawn layout, loadout rolls) - seed plus stream
/// index, mirroring how wave generation derives per-wave seeds.
pub fn stream_rng(seed: u64, stream: u64) -> Pcg32 {
    Pcg32::seed_from_u64(mix_in(mix(seed), stream))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_seed_stable() {
        let a = burst_seed(UnitId(3), Vec2::new(4.25, 9.5), Vec2::X, 17);
        let b = burst_seed(UnitId(3), Vec2::new(4.25, 9.5), Vec2::X, 17);
        assert_eq!(a, b);
    }

    #[test]
    fn test_burst_seed_varies_with_count() {
        let a = burst_seed(UnitId(3), Vec2::new(4.25, 9.5), Vec2::X, 17);
        let b = burst_seed(UnitId(3), Vec2::new(4.25, 9.5), Vec2::X, 18);
        assert_ne!(a, b);
    }

    #[test]
    fn test_fx_rng_decorrelated() {
        use rand::Rng;
        let mut a = fx_rng(100, 1);
        let mut b = fx_rng(100, 2);
        // Not a statistical test - just make sure the salt reaches the stream.
        let va: u32 = a.random();
        let vb: u32 = b.random();
        assert_ne!(va, vb);
    }
}
