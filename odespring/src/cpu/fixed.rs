// SPDX-License-Identifier: AGPL-3.0-only

//! Stack-allocated `[f64; N]` algebra.

use crate::odeint::Algebra;

/// Algebra over fixed-size arrays, one small system per stepper.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedAlgebra<const N: usize>;

impl<const N: usize> FixedAlgebra<N> {
    fn apply(out: &mut [f64; N], terms: &[(f64, &[f64; N])], keep: bool) {
        for (i, o) in out.iter_mut().enumerate() {
            let init = if keep { *o } else { 0.0 };
            *o = terms.iter().fold(init, |acc, (c, v)| acc + c * v[i]);
        }
    }
}

impl<const N: usize> Algebra for FixedAlgebra<N> {
    type Vector = [f64; N];

    fn dim(&self, _v: &[f64; N]) -> usize {
        N
    }

    fn zeros_like(&self, _v: &[f64; N]) -> [f64; N] {
        [0.0; N]
    }

    fn lincomb(&self, out: &mut [f64; N], terms: &[(f64, &[f64; N])]) {
        Self::apply(out, terms, false);
    }

    fn accumulate(&self, out: &mut [f64; N], terms: &[(f64, &[f64; N])]) {
        Self::apply(out, terms, true);
    }
}
