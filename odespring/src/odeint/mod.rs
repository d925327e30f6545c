// SPDX-License-Identifier: AGPL-3.0-only

//! Fixed-step integration core.
//!
//! The steppers are written once against the [`Algebra`] trait and run
//! unchanged on every back-end: host `Vec<f64>`, fixed-size `[f64; N]`
//! members, or GPU-resident buffers. A back-end supplies only the
//! linear-combination kernels; the right-hand side is an [`OdeSystem`] (or a
//! [`MomentumSystem`] for separable Hamiltonians).
//!
//! ```text
//!   integrate_const ─► Stepper::do_step ─► OdeSystem::derivative
//!                                     └──► Algebra::{lincomb, accumulate}
//! ```
//!
//! ## Module structure
//!
//! - `rk4` — classical 4th-order Runge-Kutta
//! - `symplectic` — McLachlan SB3A symplectic Runge-Kutta-Nyström

mod rk4;
mod symplectic;

pub use rk4::Rk4;
pub use symplectic::{SymplecticRkn, SB3A_COEFF_A, SB3A_COEFF_B};

/// Vector-space operations a back-end provides for its state type.
///
/// Every operation writes one output and reads up to five inputs, matching
/// the `scale_sum1..5` kernels the steppers need.
pub trait Algebra {
    type Vector;

    /// Number of f64 elements in `v`.
    fn dim(&self, v: &Self::Vector) -> usize;

    /// A zero-filled vector with the same dimension as `v`.
    fn zeros_like(&self, v: &Self::Vector) -> Self::Vector;

    /// `out = Σ cᵢ·vᵢ`
    fn lincomb(&self, out: &mut Self::Vector, terms: &[(f64, &Self::Vector)]);

    /// `out += Σ cᵢ·vᵢ`
    fn accumulate(&self, out: &mut Self::Vector, terms: &[(f64, &Self::Vector)]);
}

/// Right-hand side `dx/dt = f(x, t)`.
pub trait OdeSystem<V> {
    fn derivative(&mut self, x: &V, dxdt: &mut V, t: f64);
}

/// Force term of a separable Hamiltonian with unit mass:
/// `dq/dt = p`, `dp/dt = F(q)`.
pub trait MomentumSystem<V> {
    fn momentum_derivative(&mut self, q: &V, dpdt: &mut V);
}

/// A fixed-step method advancing `state` from `t` to `t + dt`.
pub trait Stepper<A: Algebra, S: ?Sized> {
    /// Integrator state: a single vector for RK, a `(q, p)` pair for RKN.
    type State;

    fn do_step(&mut self, alg: &A, sys: &mut S, state: &mut Self::State, t: f64, dt: f64);
}

/// `t1 <= t2` up to machine epsilon, for positive `dt`.
#[inline]
fn less_eq_with_eps(t1: f64, t2: f64) -> bool {
    t1 - t2 <= f64::EPSILON
}

/// Number of steps [`integrate_const`] takes from `t0` to `t_end`.
#[must_use]
pub fn step_count(t0: f64, t_end: f64, dt: f64) -> usize {
    if dt.is_nan() || dt <= 0.0 {
        return 0;
    }
    let mut steps = 0usize;
    let mut t = t0;
    while less_eq_with_eps(t + dt, t_end) {
        steps += 1;
        t = t0 + steps as f64 * dt;
    }
    steps
}

/// Integrate with constant step `dt` from `t0` while `t + dt <= t_end`.
///
/// Time is recomputed as `t0 + step·dt` after each step so that rounding
/// does not accumulate into an extra step. The observer sees the state
/// before every step and once more at the final time. Returns the number
/// of steps taken; a non-positive `dt` takes none.
#[allow(clippy::too_many_arguments)]
pub fn integrate_const<A, S, M, O>(
    stepper: &mut M,
    alg: &A,
    sys: &mut S,
    state: &mut M::State,
    t0: f64,
    t_end: f64,
    dt: f64,
    mut observer: O,
) -> usize
where
    A: Algebra,
    S: ?Sized,
    M: Stepper<A, S>,
    O: FnMut(&M::State, f64),
{
    if dt.is_nan() || dt <= 0.0 {
        observer(state, t0);
        return 0;
    }
    let mut t = t0;
    let mut steps = 0usize;
    while less_eq_with_eps(t + dt, t_end) {
        observer(state, t);
        stepper.do_step(alg, sys, state, t, dt);
        steps += 1;
        t = t0 + steps as f64 * dt;
    }
    observer(state, t);
    log::debug!("integrate_const: {steps} steps of dt={dt} from t={t0}");
    steps
}

/// Take exactly `n` steps of size `dt` starting at `t0`. Returns the final time.
pub fn integrate_n_steps<A, S, M>(
    stepper: &mut M,
    alg: &A,
    sys: &mut S,
    state: &mut M::State,
    t0: f64,
    dt: f64,
    n: usize,
) -> f64
where
    A: Algebra,
    S: ?Sized,
    M: Stepper<A, S>,
{
    for step in 0..n {
        let t = t0 + step as f64 * dt;
        stepper.do_step(alg, sys, state, t, dt);
    }
    t0 + n as f64 * dt
}

/// Observer that ignores every state.
pub const fn no_observer<V: ?Sized>(_: &V, _: f64) {}
