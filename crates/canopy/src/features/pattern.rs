//! Fixed BRIEF test pattern.
//!
//! 256 point pairs drawn once from a seeded generator with an approximately
//! Gaussian spread (σ ≈ patch/5) and clipped to a disc of radius
//! [`PATTERN_RADIUS`], so any rotation of a pair stays inside the patch.

use std::sync::OnceLock;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Number of binary tests (bits) per descriptor.
pub(crate) const PATTERN_PAIRS: usize = 256;
/// Radius of the disc the test points are confined to.
pub(crate) const PATTERN_RADIUS: i32 = 13;

const PATTERN_SEED: u64 = 0x0b51_2f5e_ed00_c0de;
const PATTERN_SIGMA: f64 = 31.0 / 5.0;

/// One intensity comparison: bit is set when `I(a) < I(b)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TestPair {
    pub a: [i8; 2],
    pub b: [i8; 2],
}

pub(crate) fn brief_pattern() -> &'static [TestPair; PATTERN_PAIRS] {
    static PATTERN: OnceLock<[TestPair; PATTERN_PAIRS]> = OnceLock::new();
    PATTERN.get_or_init(|| generate(PATTERN_SEED))
}

/// Approximately normal sample via the sum of four uniforms (Irwin–Hall).
fn gaussian_ish(rng: &mut StdRng, sigma: f64) -> f64 {
    let sum: f64 = (0..4).map(|_| rng.gen::<f64>()).sum();
    // Irwin–Hall(4): mean 2, variance 1/3.
    (sum - 2.0) * 3f64.sqrt() * sigma
}

fn sample_point(rng: &mut StdRng) -> [i8; 2] {
    let r2 = PATTERN_RADIUS * PATTERN_RADIUS;
    loop {
        let x = gaussian_ish(rng, PATTERN_SIGMA).round() as i32;
        let y = gaussian_ish(rng, PATTERN_SIGMA).round() as i32;
        if x * x + y * y <= r2 {
            return [x as i8, y as i8];
        }
    }
}

fn generate(seed: u64) -> [TestPair; PATTERN_PAIRS] {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = [TestPair {
        a: [0, 0],
        b: [0, 0],
    }; PATTERN_PAIRS];
    for pair in out.iter_mut() {
        let a = sample_point(&mut rng);
        let mut b = sample_point(&mut rng);
        while b == a {
            b = sample_point(&mut rng);
        }
        *pair = TestPair { a, b };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_is_deterministic_and_inside_disc() {
        let p = brief_pattern();
        assert_eq!(p, &generate(PATTERN_SEED));
        let r2 = PATTERN_RADIUS * PATTERN_RADIUS;
        for t in p.iter() {
            assert_ne!(t.a, t.b);
            for q in [t.a, t.b] {
                let (x, y) = (q[0] as i32, q[1] as i32);
                assert!(x * x + y * y <= r2, "{q:?} outside radius");
            }
        }
    }

    #[test]
    fn pattern_pairs_are_spread_out() {
        let p = brief_pattern();
        let distinct: std::collections::HashSet<_> = p.iter().map(|t| (t.a, t.b)).collect();
        assert!(distinct.len() > 250);
    }
}
