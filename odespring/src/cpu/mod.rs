// SPDX-License-Identifier: AGPL-3.0-only

//! Host back-ends for the integration core.
//!
//! - [`HostAlgebra`] over `Vec<f64>`, serial or rayon-parallel
//! - [`FixedAlgebra`] over `[f64; N]` for per-member stepping of small systems

mod fixed;

pub use fixed::FixedAlgebra;

use crate::odeint::Algebra;
use rayon::prelude::*;

/// Vector length at which [`HostAlgebra::parallel`] switches to rayon.
///
/// Below this the fork/join overhead exceeds the arithmetic.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4096;

/// `init + Σ cₖ·vₖ[i]`, summed in term order so every back-end rounds alike.
#[inline]
fn combine_at(init: f64, terms: &[(f64, &Vec<f64>)], i: usize) -> f64 {
    terms.iter().fold(init, |acc, (c, v)| acc + c * v[i])
}

/// Host `Vec<f64>` algebra.
#[derive(Debug, Clone, Copy)]
pub struct HostAlgebra {
    /// Vectors with at least this many elements are processed with rayon.
    pub parallel_threshold: usize,
}

impl HostAlgebra {
    /// Single-threaded loops regardless of size.
    #[must_use]
    pub const fn serial() -> Self {
        Self {
            parallel_threshold: usize::MAX,
        }
    }

    /// Rayon loops above [`DEFAULT_PARALLEL_THRESHOLD`] elements.
    #[must_use]
    pub const fn parallel() -> Self {
        Self {
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }

    #[must_use]
    pub const fn is_parallel_for(&self, len: usize) -> bool {
        len >= self.parallel_threshold
    }

    fn apply(&self, out: &mut [f64], terms: &[(f64, &Vec<f64>)], keep: bool) {
        debug_assert!(terms.iter().all(|(_, v)| v.len() == out.len()));
        if self.is_parallel_for(out.len()) {
            out.par_iter_mut().enumerate().for_each(|(i, o)| {
                let init = if keep { *o } else { 0.0 };
                *o = combine_at(init, terms, i);
            });
        } else {
            for (i, o) in out.iter_mut().enumerate() {
                let init = if keep { *o } else { 0.0 };
                *o = combine_at(init, terms, i);
            }
        }
    }
}

impl Default for HostAlgebra {
    fn default() -> Self {
        Self::serial()
    }
}

impl Algebra for HostAlgebra {
    type Vector = Vec<f64>;

    fn dim(&self, v: &Vec<f64>) -> usize {
        v.len()
    }

    fn zeros_like(&self, v: &Vec<f64>) -> Vec<f64> {
        vec![0.0; v.len()]
    }

    fn lincomb(&self, out: &mut Vec<f64>, terms: &[(f64, &Vec<f64>)]) {
        self.apply(out, terms, false);
    }

    fn accumulate(&self, out: &mut Vec<f64>, terms: &[(f64, &Vec<f64>)]) {
        self.apply(out, terms, true);
    }
}
