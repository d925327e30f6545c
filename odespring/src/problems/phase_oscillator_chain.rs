// SPDX-License-Identifier: AGPL-3.0-only

//! Chain of nearest-neighbour coupled phase oscillators.
//!
//! ```text
//! dθ_i = ω_i + sin(θ_{i−1} − θ_i) + sin(θ_i − θ_{i+1})
//! ```
//!
//! The ends are clamped (`θ_{−1} = θ_0`, `θ_N = θ_{N−1}`). Natural
//! frequencies decrease along the chain, `ω_i = (N − i)·ε`; phase locking
//! sets in for `ε < 8/N²`, and the default is `6/N²`.

use super::{finish_report, first_or_nan, require_gpu, Backend};
use crate::config::RunConfig;
use crate::cpu::HostAlgebra;
use crate::error::Result;
use crate::gpu::{workgroups_for, GpuAlgebra, GpuF64, GpuVector};
use crate::odeint::{integrate_const, no_observer, OdeSystem, Rk4};
use crate::report::RunReport;
use crate::rng::Lcg48;
use crate::shaders::SHADER_PHASE_CHAIN_RHS;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_2_PI, TAU};
use std::time::Instant;

pub const NAME: &str = "phase_oscillator_chain";

/// Coefficients of the kernel's software `sin`:
/// `[2/π, π/2 high, π/2 low, S1..S6, C1..C6]`.
pub const SIN_F64_COEFFS: [f64; 15] = [
    FRAC_2_PI,
    1.570_796_326_734_125_614_17e+00,
    6.077_100_506_506_192_249_32e-11,
    -1.666_666_666_666_663_243_48e-01,
    8.333_333_333_322_489_461_24e-03,
    -1.984_126_982_985_794_931_34e-04,
    2.755_731_370_707_006_767_89e-06,
    -2.505_076_025_340_686_341_95e-08,
    1.589_690_995_211_550_102_21e-10,
    4.166_666_666_666_660_190_37e-02,
    -1.388_888_888_887_410_957_49e-03,
    2.480_158_728_947_672_941_78e-05,
    -2.755_731_435_139_066_330_35e-07,
    2.087_572_321_298_174_827_90e-09,
    -1.135_964_755_778_819_482_65e-11,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainParams {
    /// Chain length.
    pub n: usize,
    /// Frequency spacing; `6/N²` when unset.
    pub epsilon: Option<f64>,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            n: 1024,
            epsilon: None,
        }
    }
}

impl ChainParams {
    #[must_use]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
            .unwrap_or_else(|| 6.0 / (self.n as f64 * self.n as f64))
    }

    /// `ω_i = (N − i)·ε`.
    #[must_use]
    pub fn omega_values(&self) -> Vec<f64> {
        let eps = self.epsilon();
        (0..self.n).map(|i| (self.n - i) as f64 * eps).collect()
    }
}

/// Phases drawn uniformly from `[0, 2π)`.
#[must_use]
pub fn initial_state(n: usize, seed: Option<u64>) -> Vec<f64> {
    let mut rng = Lcg48::from_option(seed);
    (0..n).map(|_| TAU * rng.uniform()).collect()
}

#[inline]
fn chain_rhs(theta: &[f64], omega: &[f64], i: usize) -> f64 {
    let n = theta.len();
    let mid = theta[i];
    let left = theta[i.saturating_sub(1)];
    let right = theta[(i + 1).min(n - 1)];
    omega[i] + (left - mid).sin() + (mid - right).sin()
}

/// Host right-hand side.
pub struct PhaseChain {
    omega: Vec<f64>,
    parallel: bool,
}

impl PhaseChain {
    #[must_use]
    pub fn new(params: &ChainParams, parallel: bool) -> Self {
        Self {
            omega: params.omega_values(),
            parallel,
        }
    }
}

impl OdeSystem<Vec<f64>> for PhaseChain {
    fn derivative(&mut self, theta: &Vec<f64>, dtheta: &mut Vec<f64>, _t: f64) {
        let omega = &self.omega;
        if self.parallel {
            dtheta
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, d)| *d = chain_rhs(theta, omega, i));
        } else {
            for (i, d) in dtheta.iter_mut().enumerate() {
                *d = chain_rhs(theta, omega, i);
            }
        }
    }
}

/// GPU right-hand side for the `gpu` back-end.
pub struct GpuPhaseChain<'a> {
    alg: &'a GpuAlgebra<'a>,
    n: usize,
    params_buf: wgpu::Buffer,
    trig: wgpu::Buffer,
    omega: wgpu::Buffer,
    pipeline: wgpu::ComputePipeline,
}

impl<'a> GpuPhaseChain<'a> {
    #[must_use]
    pub fn new(alg: &'a GpuAlgebra<'a>, params: &ChainParams) -> Self {
        let gpu = alg.gpu();
        Self {
            alg,
            n: params.n,
            params_buf: gpu.create_f64_buffer(&[params.n as f64], "chain_params"),
            trig: gpu.create_f64_buffer(&SIN_F64_COEFFS, "chain_sin_coeffs"),
            omega: gpu.create_f64_buffer(&params.omega_values(), "chain_omega"),
            pipeline: gpu.create_pipeline(SHADER_PHASE_CHAIN_RHS, "phase_chain_rhs"),
        }
    }
}

impl OdeSystem<GpuVector> for GpuPhaseChain<'_> {
    fn derivative(&mut self, theta: &GpuVector, dtheta: &mut GpuVector, _t: f64) {
        let gpu = self.alg.gpu();
        let bind_group = gpu.create_bind_group(
            &self.pipeline,
            &[&self.params_buf, &self.trig, &self.omega, theta.buffer(), dtheta.buffer()],
        );
        gpu.dispatch(&self.pipeline, &bind_group, workgroups_for(self.n));
        self.alg.record_bytes(3 * self.n as u64 * 8);
    }
}

/// Integrate on `backend` and report `θ_0`.
///
/// # Errors
///
/// [`crate::error::OdeSpringError::InvalidConfig`] if `config` fails
/// validation, [`crate::error::OdeSpringError::NoAdapter`] for a GPU back-end
/// without `gpu`, or a readback failure.
pub fn run(config: &RunConfig, backend: Backend, gpu: Option<&GpuF64>) -> Result<RunReport> {
    config.validate()?;
    let params = &config.chain;
    let dt = config.integration.dt;
    let t_max = config.integration.t_max;
    let initial = initial_state(params.n, config.integration.seed);
    let mut report = RunReport::new(NAME, backend, params.n);
    let started = Instant::now();

    let (value, steps) = match backend {
        Backend::Host | Backend::HostParallel => {
            let parallel = backend == Backend::HostParallel;
            let alg = if parallel {
                HostAlgebra::parallel()
            } else {
                HostAlgebra::serial()
            };
            let mut sys = PhaseChain::new(params, parallel);
            let mut theta = initial;
            let mut rk = Rk4::new();
            let steps = integrate_const(&mut rk, &alg, &mut sys, &mut theta, 0.0, t_max, dt, no_observer);
            (first_or_nan(&theta), steps)
        }
        Backend::Gpu => {
            let gpu = require_gpu(gpu)?;
            let alg = GpuAlgebra::new(gpu);
            let mut sys = GpuPhaseChain::new(&alg, params);
            let mut theta = GpuVector::from_host(gpu, &initial, "chain_theta");
            let mut rk = Rk4::new();
            let steps = integrate_const(&mut rk, &alg, &mut sys, &mut theta, 0.0, t_max, dt, no_observer);
            let value = theta.first(gpu)?;
            report.bytes_touched = Some(alg.bytes_touched());
            (value, steps)
        }
        Backend::GpuFused => return Err(super::Problem::PhaseOscillatorChain.unsupported(backend)),
    };

    Ok(finish_report(report, config, steps, value, started, gpu.filter(|_| backend.needs_gpu())))
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::tolerances;

    /// Host mirror of the kernel's `sin_f64`.
    fn sin_f64(x: f64) -> f64 {
        let c = &SIN_F64_COEFFS;
        let kernel_sin = |r: f64| {
            let z = r * r;
            let p = c[3] + z * (c[4] + z * (c[5] + z * (c[6] + z * (c[7] + z * c[8]))));
            r + r * z * p
        };
        let kernel_cos = |r: f64| {
            let z = r * r;
            let p = c[9] + z * (c[10] + z * (c[11] + z * (c[12] + z * (c[13] + z * c[14]))));
            1.0 - 0.5 * z + z * z * p
        };
        let k = (x * c[0] + 0.5).floor();
        let r = (x - k * c[1]) - k * c[2];
        match (k as i64) & 3 {
            0 => kernel_sin(r),
            1 => kernel_cos(r),
            2 => -kernel_sin(r),
            _ => -kernel_cos(r),
        }
    }

    #[test]
    fn software_sin_matches_libm() {
        let mut worst: f64 = 0.0;
        for i in -20_000..=20_000 {
            let x = f64::from(i) * 1e-3;
            worst = worst.max((sin_f64(x) - x.sin()).abs());
        }
        assert!(worst < tolerances::SOFTWARE_SIN_F64, "max error {worst}");
    }

    #[test]
    fn pio2_split_sums_to_half_pi() {
        let sum = SIN_F64_COEFFS[1] + SIN_F64_COEFFS[2];
        assert!((sum - std::f64::consts::FRAC_PI_2).abs() < 1e-16);
    }

    #[test]
    fn default_epsilon_and_frequencies() {
        let p = ChainParams {
            n: 4,
            epsilon: None,
        };
        assert!((p.epsilon() - 6.0 / 16.0).abs() < 1e-15);
        let w = p.omega_values();
        assert!((w[0] - 4.0 * 0.375).abs() < 1e-15);
        assert!((w[3] - 0.375).abs() < 1e-15);
    }

    #[test]
    fn explicit_epsilon_overrides_default() {
        let p = ChainParams {
            n: 10,
            epsilon: Some(0.5),
        };
        assert!((p.omega_values()[9] - 0.5).abs() < 1e-15);
    }

    #[test]
    fn phases_in_range() {
        let th = initial_state(1000, Some(2));
        assert!(th.iter().all(|t| (0.0..TAU).contains(t)));
    }

    #[test]
    fn ends_are_clamped() {
        let p = ChainParams {
            n: 3,
            epsilon: Some(0.0),
        };
        let mut sys = PhaseChain::new(&p, false);
        let theta = vec![0.0, 1.0, 3.0];
        let mut d = vec![0.0; 3];
        sys.derivative(&theta, &mut d, 0.0);
        assert!((d[0] - (-1.0f64).sin()).abs() < 1e-15);
        assert!((d[1] - ((-1.0f64).sin() + (-2.0f64).sin())).abs() < 1e-15);
        assert!((d[2] - 2.0f64.sin()).abs() < 1e-15);
    }

    #[test]
    fn single_oscillator_runs_free() {
        let p = ChainParams {
            n: 1,
            epsilon: Some(0.25),
        };
        let mut sys = PhaseChain::new(&p, false);
        let mut d = vec![0.0];
        sys.derivative(&vec![1.3], &mut d, 0.0);
        assert!((d[0] - 0.25).abs() < 1e-15);
    }

    #[test]
    fn parallel_matches_serial() {
        let mut cfg = RunConfig::default();
        cfg.chain.n = 128;
        cfg.integration.t_max = 1.0;
        let a = run(&cfg, Backend::Host, None).expect("host");
        let b = run(&cfg, Backend::HostParallel, None).expect("host-parallel");
        assert_eq!(a.value.to_bits(), b.value.to_bits());
    }
}
