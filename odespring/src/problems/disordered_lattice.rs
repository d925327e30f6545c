// SPDX-License-Identifier: AGPL-3.0-only

//! Disordered Hamiltonian lattice with a quartic on-site term.
//!
//! ```text
//! H = Σ p²/2 + β/4 Σ q⁴ − ½ qᵀ A q
//! dq/dt = p
//! dp/dt = −β q³ + A q
//! ```
//!
//! `A` couples each site to `idx ± 1` and `idx ± side` in flat index space,
//! wrapped modulo `n = side²`. The first and last site of a row are flat
//! neighbours, so this is not a 2-D torus. Diagonal entries are
//! `−d_idx − 4K` with uniform disorder `d ∈ [0, 1)`, off-diagonals `K`.
//! On small lattices the five neighbour indices can coincide; every
//! coincident entry is stored and contributes.
//!
//! The lattice starts at rest with a unit displacement at the centre site.

use super::{finish_report, first_or_nan, require_gpu, Backend};
use crate::config::RunConfig;
use crate::cpu::HostAlgebra;
use crate::error::Result;
use crate::gpu::{workgroups_for, GpuAlgebra, GpuF64, GpuVector};
use crate::odeint::{integrate_const, no_observer, MomentumSystem, SymplecticRkn};
use crate::report::RunReport;
use crate::rng::Lcg48;
use crate::shaders::SHADER_LATTICE_FORCE;
use crate::sparse::{CsrMatrix, EllMatrix};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

pub const NAME: &str = "disordered_lattice";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatticeParams {
    /// Sites per side; the lattice has `side²` sites.
    pub side: usize,
    /// Nearest-neighbour coupling `K`.
    pub coupling: f64,
    /// Quartic nonlinearity `β`.
    pub beta: f64,
}

impl Default for LatticeParams {
    fn default() -> Self {
        Self {
            side: 64,
            coupling: 0.1,
            beta: 0.01,
        }
    }
}

impl LatticeParams {
    #[must_use]
    pub const fn sites(&self) -> usize {
        self.side * self.side
    }

    /// Flat index of the initially displaced site.
    #[must_use]
    pub const fn center(&self) -> usize {
        (self.side / 2) * self.side + self.side / 2
    }
}

/// Sorted flat neighbour indices of `idx`, itself included.
#[must_use]
pub fn neighbours(idx: usize, side: usize) -> [usize; 5] {
    let n = (side * side) as i64;
    let i = idx as i64;
    let s = side as i64;
    let mut is = [i, i + 1, i - 1, i - s, i + s].map(|j| j.rem_euclid(n) as usize);
    is.sort_unstable();
    is
}

/// Coupling matrix for the given on-site disorder.
#[must_use]
pub fn coupling_matrix(params: &LatticeParams, disorder: &[f64]) -> CsrMatrix {
    let n = params.sites();
    let k = params.coupling;
    let rows: Vec<Vec<(usize, f64)>> = (0..n)
        .map(|idx| {
            neighbours(idx, params.side)
                .into_iter()
                .map(|c| {
                    let v = if c == idx { -disorder[idx] - 4.0 * k } else { k };
                    (c, v)
                })
                .collect()
        })
        .collect();
    CsrMatrix::from_rows(&rows)
}

/// Disorder draws, then the matrix built from them.
#[must_use]
pub fn build_lattice(params: &LatticeParams, seed: Option<u64>) -> CsrMatrix {
    let disorder = Lcg48::from_option(seed).uniform_vec(params.sites());
    coupling_matrix(params, &disorder)
}

/// `(q, p)` at rest with `q[center] = 1`.
#[must_use]
pub fn initial_state(params: &LatticeParams) -> (Vec<f64>, Vec<f64>) {
    let n = params.sites();
    let mut q = vec![0.0; n];
    if let Some(c) = q.get_mut(params.center()) {
        *c = 1.0;
    }
    (q, vec![0.0; n])
}

/// Total energy, conserved by the dynamics.
#[must_use]
pub fn energy(matrix: &CsrMatrix, beta: f64, q: &[f64], p: &[f64]) -> f64 {
    let kinetic: f64 = p.iter().map(|v| 0.5 * v * v).sum();
    let quartic: f64 = q.iter().map(|x| x * x * x * x).sum();
    kinetic + 0.25 * beta * quartic - 0.5 * matrix.quadratic_form(q)
}

/// Host force `−β q³ + A q`.
pub struct LatticeForce<'m> {
    matrix: &'m CsrMatrix,
    beta: f64,
    parallel: bool,
}

impl<'m> LatticeForce<'m> {
    #[must_use]
    pub const fn new(matrix: &'m CsrMatrix, beta: f64, parallel: bool) -> Self {
        Self {
            matrix,
            beta,
            parallel,
        }
    }
}

impl MomentumSystem<Vec<f64>> for LatticeForce<'_> {
    fn momentum_derivative(&mut self, q: &Vec<f64>, dpdt: &mut Vec<f64>) {
        let beta = self.beta;
        let a = self.matrix;
        if self.parallel {
            dpdt.par_iter_mut().enumerate().for_each(|(i, d)| {
                let x = q[i];
                *d = a.row_dot(i, -beta * x * x * x, q);
            });
        } else {
            for (d, x) in dpdt.iter_mut().zip(q) {
                *d = -beta * x * x * x;
            }
            a.spmv_accumulate(q, dpdt);
        }
    }
}

/// ELLPACK force kernel for the `gpu` back-end.
pub struct GpuLatticeForce<'a> {
    alg: &'a GpuAlgebra<'a>,
    n: usize,
    width: usize,
    col: wgpu::Buffer,
    val: wgpu::Buffer,
    params_buf: wgpu::Buffer,
    pipeline: wgpu::ComputePipeline,
}

impl<'a> GpuLatticeForce<'a> {
    #[must_use]
    pub fn new(alg: &'a GpuAlgebra<'a>, ell: &EllMatrix, beta: f64) -> Self {
        let gpu = alg.gpu();
        let params = [ell.n as f64, ell.width as f64, ell.pitch as f64, beta];
        Self {
            alg,
            n: ell.n,
            width: ell.width,
            col: gpu.create_i32_buffer(&ell.col, "lattice_ell_col"),
            val: gpu.create_f64_buffer(&ell.values, "lattice_ell_val"),
            params_buf: gpu.create_f64_buffer(&params, "lattice_params"),
            pipeline: gpu.create_pipeline(SHADER_LATTICE_FORCE, "lattice_force"),
        }
    }
}

impl MomentumSystem<GpuVector> for GpuLatticeForce<'_> {
    fn momentum_derivative(&mut self, q: &GpuVector, dpdt: &mut GpuVector) {
        let gpu = self.alg.gpu();
        let bind_group = gpu.create_bind_group(
            &self.pipeline,
            &[&self.params_buf, &self.col, &self.val, q.buffer(), dpdt.buffer()],
        );
        gpu.dispatch(&self.pipeline, &bind_group, workgroups_for(self.n));
        let (n, w) = (self.n as u64, self.width as u64);
        // per slot: i32 column, f64 value, gathered q; per row: q[i] and dp[i]
        self.alg.record_bytes((4 + 2 * 8) * n * w + 8 * 2 * n);
    }
}

/// Integrate on `backend` and report `q[0]`, with `p[0]` and the relative
/// energy drift as extras.
///
/// # Errors
///
/// [`crate::error::OdeSpringError::InvalidConfig`] if `config` fails
/// validation, [`crate::error::OdeSpringError::NoAdapter`] for a GPU back-end
/// without `gpu`, an ELL conversion failure, or a readback failure.
pub fn run(config: &RunConfig, backend: Backend, gpu: Option<&GpuF64>) -> Result<RunReport> {
    config.validate()?;
    let params = &config.lattice;
    let dt = config.integration.dt;
    let t_max = config.integration.t_max;
    let matrix = build_lattice(params, config.integration.seed);
    let (q0, p0) = initial_state(params);
    let e0 = energy(&matrix, params.beta, &q0, &p0);
    let mut report = RunReport::new(NAME, backend, params.side);
    let started = Instant::now();

    let (q, p, steps) = match backend {
        Backend::Host | Backend::HostParallel => {
            let parallel = backend == Backend::HostParallel;
            let alg = if parallel {
                HostAlgebra::parallel()
            } else {
                HostAlgebra::serial()
            };
            let mut sys = LatticeForce::new(&matrix, params.beta, parallel);
            let mut state = (q0, p0);
            let mut stepper = SymplecticRkn::new();
            let steps = integrate_const(&mut stepper, &alg, &mut sys, &mut state, 0.0, t_max, dt, no_observer);
            (state.0, state.1, steps)
        }
        Backend::Gpu => {
            let gpu = require_gpu(gpu)?;
            let ell = EllMatrix::from_csr(&matrix)?;
            let alg = GpuAlgebra::new(gpu);
            let mut sys = GpuLatticeForce::new(&alg, &ell, params.beta);
            let mut state = (
                GpuVector::from_host(gpu, &q0, "lattice_q"),
                GpuVector::from_host(gpu, &p0, "lattice_p"),
            );
            let mut stepper = SymplecticRkn::new();
            let steps = integrate_const(&mut stepper, &alg, &mut sys, &mut state, 0.0, t_max, dt, no_observer);
            report.bytes_touched = Some(alg.bytes_touched());
            (state.0.to_host(gpu)?, state.1.to_host(gpu)?, steps)
        }
        Backend::GpuFused => return Err(super::Problem::DisorderedLattice.unsupported(backend)),
    };

    let e1 = energy(&matrix, params.beta, &q, &p);
    let drift = if e0 == 0.0 { (e1 - e0).abs() } else { ((e1 - e0) / e0).abs() };
    log::debug!("{NAME}: energy {e0:.12e} -> {e1:.12e}");
    let report = report
        .with_extra("p0", first_or_nan(&p))
        .with_extra("energy_drift", drift);
    let value = first_or_nan(&q);
    Ok(finish_report(report, config, steps, value, started, gpu.filter(|_| backend.needs_gpu())))
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::odeint::integrate_n_steps;

    fn params(side: usize) -> LatticeParams {
        LatticeParams {
            side,
            ..LatticeParams::default()
        }
    }

    #[test]
    fn neighbours_wrap_in_flat_index() {
        // side 4: site 0 reaches 15 through idx − 1 and 12 through idx − side
        assert_eq!(neighbours(0, 4), [0, 1, 4, 12, 15]);
        // last site of the first row is coupled to the first of the second
        assert_eq!(neighbours(3, 4), [2, 3, 4, 7, 15]);
    }

    #[test]
    fn small_lattice_keeps_duplicates() {
        let p = params(2);
        assert_eq!(neighbours(0, 2), [0, 1, 2, 2, 3]);
        let a = coupling_matrix(&p, &[0.0; 4]);
        assert_eq!(a.nnz(), 20);
        let mut y = vec![0.0; 4];
        a.spmv(&[0.0, 0.0, 1.0, 0.0], &mut y);
        assert!((y[0] - 0.2).abs() < 1e-15);
    }

    #[test]
    fn single_site_stores_diagonal_five_times() {
        let a = coupling_matrix(&params(1), &[0.5]);
        assert_eq!(a.nnz(), 5);
        assert!(a.values.iter().all(|v| (v - (-0.5 - 0.4)).abs() < 1e-15));
    }

    #[test]
    fn matrix_rows_sum_to_minus_disorder() {
        let p = params(8);
        let disorder = Lcg48::seeded(3).uniform_vec(p.sites());
        let a = coupling_matrix(&p, &disorder);
        let mut y = vec![0.0; p.sites()];
        a.spmv(&vec![1.0; p.sites()], &mut y);
        for (yi, d) in y.iter().zip(&disorder) {
            assert!((yi + d).abs() < 1e-14);
        }
    }

    #[test]
    fn matrix_is_symmetric() {
        let p = params(6);
        let a = build_lattice(&p, Some(11));
        let n = p.sites();
        let dense = |i: usize, j: usize| -> f64 {
            (a.row_ptr[i]..a.row_ptr[i + 1])
                .filter(|&k| a.col_idx[k] == j)
                .map(|k| a.values[k])
                .sum()
        };
        for i in 0..n {
            for j in 0..n {
                assert!((dense(i, j) - dense(j, i)).abs() < 1e-15);
            }
        }
    }

    #[test]
    fn centre_site_is_displaced() {
        let p = params(64);
        assert_eq!(p.center(), 32 * 64 + 32);
        let (q, v) = initial_state(&p);
        assert!((q[p.center()] - 1.0).abs() < 1e-15);
        assert!((q.iter().sum::<f64>() - 1.0).abs() < 1e-15);
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn parallel_force_matches_serial() {
        let p = params(16);
        let a = build_lattice(&p, None);
        let q: Vec<f64> = (0..p.sites()).map(|i| (i as f64 * 0.1).cos()).collect();
        let mut fs = vec![0.0; q.len()];
        let mut fp = vec![0.0; q.len()];
        LatticeForce::new(&a, p.beta, false).momentum_derivative(&q, &mut fs);
        LatticeForce::new(&a, p.beta, true).momentum_derivative(&q, &mut fp);
        assert_eq!(fs, fp);
    }

    #[test]
    fn energy_is_conserved() {
        let p = params(8);
        let a = build_lattice(&p, Some(7));
        let mut state = initial_state(&p);
        let e0 = energy(&a, p.beta, &state.0, &state.1);
        let mut sys = LatticeForce::new(&a, p.beta, false);
        let mut stepper = SymplecticRkn::new();
        integrate_n_steps(&mut stepper, &HostAlgebra::serial(), &mut sys, &mut state, 0.0, 0.01, 2000);
        let e1 = energy(&a, p.beta, &state.0, &state.1);
        assert!(((e1 - e0) / e0).abs() < 1e-8, "drift {}", (e1 - e0) / e0);
    }

    #[test]
    fn run_reports_drift_and_momentum() {
        let mut cfg = RunConfig::default();
        cfg.lattice.side = 8;
        cfg.integration.t_max = 1.0;
        let r = run(&cfg, Backend::Host, None).expect("host run");
        assert_eq!(r.size, 8);
        assert!(r.extras.contains_key("p0"));
        assert!(r.extras["energy_drift"] < 1e-8);
    }
}
