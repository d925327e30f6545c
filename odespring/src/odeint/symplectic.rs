// SPDX-License-Identifier: AGPL-3.0-only

//! McLachlan SB3A symplectic Runge-Kutta-Nyström stepper.
//!
//! Six stages, order four, for separable Hamiltonians `H = p²/2 + V(q)`.
//! Each stage drifts the coordinates with `a_l` and then kicks the momenta
//! with `b_l`. The scheme is symmetric so the coefficients read the same
//! forwards and backwards, and the final kick weight is zero.
//!
//! Reference: R. I. McLachlan, "On the numerical integration of ordinary
//! differential equations by symmetric composition methods",
//! SIAM J. Sci. Comput. 16 (1995) 151-168.

use super::{Algebra, MomentumSystem, Stepper};

const A0: f64 = 0.405_188_618_395_252_277_22;
const A1: f64 = -0.287_144_040_816_524_089;
const A2: f64 = 0.5 - (A0 + A1);

const B0: f64 = -3.0 / 73.0;
const B1: f64 = 17.0 / 59.0;
const B2: f64 = 1.0 - 2.0 * (B0 + B1);

/// Drift weights, `Σ a_l = 1`.
pub const SB3A_COEFF_A: [f64; 6] = [A0, A1, A2, A2, A1, A0];

/// Kick weights, `Σ b_l = 1`. The last stage has no kick.
pub const SB3A_COEFF_B: [f64; 6] = [B0, B1, B2, B1, B0, 0.0];

/// SB3A stepper with its force buffer kept between steps.
pub struct SymplecticRkn<V> {
    dpdt: Option<(usize, V)>,
}

impl<V> Default for SymplecticRkn<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> SymplecticRkn<V> {
    #[must_use]
    pub const fn new() -> Self {
        Self { dpdt: None }
    }

    /// Number of force evaluations per step.
    #[must_use]
    pub fn force_evaluations_per_step() -> usize {
        SB3A_COEFF_B.iter().filter(|b| **b != 0.0).count()
    }
}

impl<A, S> Stepper<A, S> for SymplecticRkn<A::Vector>
where
    A: Algebra,
    S: MomentumSystem<A::Vector> + ?Sized,
{
    type State = (A::Vector, A::Vector);

    fn do_step(&mut self, alg: &A, sys: &mut S, state: &mut Self::State, _t: f64, dt: f64) {
        let (q, p) = state;
        let dim = alg.dim(q);
        if self.dpdt.as_ref().is_some_and(|(d, _)| *d != dim) {
            self.dpdt = None;
        }
        let (_, dpdt) = self.dpdt.get_or_insert_with(|| (dim, alg.zeros_like(q)));

        for (a, b) in SB3A_COEFF_A.iter().zip(SB3A_COEFF_B.iter()) {
            alg.accumulate(q, &[(a * dt, &*p)]);
            if *b != 0.0 {
                sys.momentum_derivative(q, dpdt);
                alg.accumulate(p, &[(b * dt, &*dpdt)]);
            }
        }
    }
}
