// SPDX-License-Identifier: AGPL-3.0-only

//! Classical 4th-order Runge-Kutta.

use super::{Algebra, OdeSystem, Stepper};

/// Intermediate stages, allocated on first use and whenever the state
/// dimension changes.
struct Stages<V> {
    dim: usize,
    k1: V,
    k2: V,
    k3: V,
    k4: V,
    x_tmp: V,
}

/// RK4 stepper holding its stage buffers between steps.
///
/// One step costs four right-hand-side evaluations and five vector
/// operations:
///
/// ```text
/// k1 = f(x, t)
/// k2 = f(x + dt/2·k1, t + dt/2)
/// k3 = f(x + dt/2·k2, t + dt/2)
/// k4 = f(x + dt·k3,   t + dt)
/// x += dt/6·k1 + dt/3·k2 + dt/3·k3 + dt/6·k4
/// ```
pub struct Rk4<V> {
    stages: Option<Stages<V>>,
}

impl<V> Default for Rk4<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Rk4<V> {
    #[must_use]
    pub const fn new() -> Self {
        Self { stages: None }
    }

    fn stages_for<A>(&mut self, alg: &A, x: &V) -> &mut Stages<V>
    where
        A: Algebra<Vector = V>,
    {
        let dim = alg.dim(x);
        if self.stages.as_ref().is_some_and(|s| s.dim != dim) {
            self.stages = None;
        }
        self.stages.get_or_insert_with(|| {
            log::trace!("rk4: allocating stage buffers for dim={dim}");
            Stages {
                dim,
                k1: alg.zeros_like(x),
                k2: alg.zeros_like(x),
                k3: alg.zeros_like(x),
                k4: alg.zeros_like(x),
                x_tmp: alg.zeros_like(x),
            }
        })
    }
}

impl<A, S> Stepper<A, S> for Rk4<A::Vector>
where
    A: Algebra,
    S: OdeSystem<A::Vector> + ?Sized,
{
    type State = A::Vector;

    fn do_step(&mut self, alg: &A, sys: &mut S, x: &mut A::Vector, t: f64, dt: f64) {
        let half = 0.5 * dt;
        let st = self.stages_for(alg, x);

        sys.derivative(x, &mut st.k1, t);

        alg.lincomb(&mut st.x_tmp, &[(1.0, &*x), (half, &st.k1)]);
        sys.derivative(&st.x_tmp, &mut st.k2, t + half);

        alg.lincomb(&mut st.x_tmp, &[(1.0, &*x), (half, &st.k2)]);
        sys.derivative(&st.x_tmp, &mut st.k3, t + half);

        alg.lincomb(&mut st.x_tmp, &[(1.0, &*x), (dt, &st.k3)]);
        sys.derivative(&st.x_tmp, &mut st.k4, t + dt);

        let sixth = dt / 6.0;
        let third = dt / 3.0;
        alg.accumulate(
            x,
            &[
                (sixth, &st.k1),
                (third, &st.k2),
                (third, &st.k3),
                (sixth, &st.k4),
            ],
        );
    }
}
