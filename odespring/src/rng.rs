// SPDX-License-Identifier: AGPL-3.0-only

//! 48-bit LCG for reproducible initial conditions.
//!
//! Uses the drand48 recurrence so that the same seed produces the same
//! oscillator amplitudes, lattice disorder, and phases on every back-end.
//! The unseeded state matches the C library default.

/// LCG multiplier (drand48).
pub const LCG48_MULTIPLIER: u64 = 0x5_DEEC_E66D;

/// LCG increment (drand48).
pub const LCG48_INCREMENT: u64 = 0xB;

/// State mask: arithmetic is modulo 2^48.
pub const LCG48_MASK: u64 = (1u64 << 48) - 1;

/// Initial state when no seed is given.
pub const LCG48_DEFAULT_STATE: u64 = 0x1234_ABCD_330E;

/// Low 16 bits appended to the seed, as `srand48` does.
const SEED_LOW_BITS: u64 = 0x330E;

const LCG48_DIVISOR: f64 = (1u64 << 48) as f64;

/// drand48-compatible generator.
#[derive(Debug, Clone)]
pub struct Lcg48 {
    state: u64,
}

impl Default for Lcg48 {
    fn default() -> Self {
        Self {
            state: LCG48_DEFAULT_STATE,
        }
    }
}

impl Lcg48 {
    /// Seed the generator the way `srand48(seed)` does (low 32 bits used).
    #[must_use]
    pub const fn seeded(seed: u64) -> Self {
        Self {
            state: ((seed & 0xFFFF_FFFF) << 16) | SEED_LOW_BITS,
        }
    }

    /// Seeded if `seed` is given, otherwise the unseeded default stream.
    #[must_use]
    pub fn from_option(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::default, Self::seeded)
    }

    /// Advance the state by one step.
    #[inline]
    pub fn step(&mut self) {
        self.state = self
            .state
            .wrapping_mul(LCG48_MULTIPLIER)
            .wrapping_add(LCG48_INCREMENT)
            & LCG48_MASK;
    }

    /// Uniform f64 in [0, 1) from all 48 state bits.
    #[inline]
    pub fn uniform(&mut self) -> f64 {
        self.step();
        self.state as f64 / LCG48_DIVISOR
    }

    /// Fill a slice with uniforms in [0, 1).
    pub fn fill_uniform(&mut self, out: &mut [f64]) {
        for v in out.iter_mut() {
            *v = self.uniform();
        }
    }

    /// `n` uniforms in [0, 1).
    #[must_use]
    pub fn uniform_vec(&mut self, n: usize) -> Vec<f64> {
        let mut v = vec![0.0; n];
        self.fill_uniform(&mut v);
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stream_matches_unseeded_drand48() {
        let mut rng = Lcg48::default();
        assert!((rng.uniform() - 0.396_464_773_760_275_34).abs() < 1e-15);
        assert!((rng.uniform() - 0.840_485_369_411_425_2).abs() < 1e-15);
        assert!((rng.uniform() - 0.353_336_097_245_243_5).abs() < 1e-15);
    }

    #[test]
    fn seeded_stream_matches_srand48() {
        let mut rng = Lcg48::seeded(42);
        assert!((rng.uniform() - 0.744_525_000_061_006_6).abs() < 1e-15);
    }

    #[test]
    fn uniform_in_range() {
        let mut rng = Lcg48::seeded(12345);
        for _ in 0..1000 {
            let v = rng.uniform();
            assert!((0.0..1.0).contains(&v), "out of range: {v}");
        }
    }

    #[test]
    fn same_seed_same_stream() {
        let a = Lcg48::seeded(7).uniform_vec(16);
        let b = Lcg48::seeded(7).uniform_vec(16);
        assert_eq!(a, b);
    }

    #[test]
    fn from_option_none_is_default() {
        let a = Lcg48::from_option(None).uniform_vec(4);
        let b = Lcg48::default().uniform_vec(4);
        assert_eq!(a, b);
    }
}
