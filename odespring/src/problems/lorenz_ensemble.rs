// SPDX-License-Identifier: AGPL-3.0-only

//! Ensemble of Lorenz systems sweeping the Rayleigh parameter `R`.
//!
//! ```text
//! dx = σ (y − x)
//! dy = R x − y − x z
//! dz = x y − b z
//! ```
//!
//! Member `i` uses `R_i = R_min + i·(R_max − R_min)/(N − 1)`; every member
//! starts at `(10, 10, 10)`. State is SoA, `[x(N), y(N), z(N)]`.

use super::{finish_report, first_or_nan, require_gpu, Backend};
use crate::config::RunConfig;
use crate::cpu::{FixedAlgebra, HostAlgebra};
use crate::error::Result;
use crate::gpu::{workgroups_for, GpuAlgebra, GpuF64, GpuVector};
use crate::odeint::{integrate_const, no_observer, step_count, OdeSystem, Rk4};
use crate::report::RunReport;
use crate::shaders::{SHADER_LORENZ_FUSED_RK4, SHADER_LORENZ_RHS};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

pub const NAME: &str = "lorenz_ensemble";

/// Starting value of every coordinate.
pub const INITIAL_VALUE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LorenzParams {
    /// Ensemble size.
    pub n: usize,
    pub sigma: f64,
    pub b: f64,
    pub r_min: f64,
    pub r_max: f64,
    /// Fused RK4 passes recorded into one command encoder.
    pub steps_per_submit: usize,
}

impl Default for LorenzParams {
    fn default() -> Self {
        Self {
            n: 1024,
            sigma: 10.0,
            b: 8.0 / 3.0,
            r_min: 0.1,
            r_max: 50.0,
            steps_per_submit: 256,
        }
    }
}

impl LorenzParams {
    /// Rayleigh parameter of every member. A single member gets `r_min`.
    #[must_use]
    pub fn r_values(&self) -> Vec<f64> {
        if self.n <= 1 {
            return vec![self.r_min; self.n];
        }
        let dr = (self.r_max - self.r_min) / (self.n - 1) as f64;
        (0..self.n).map(|i| self.r_min + i as f64 * dr).collect()
    }
}

/// SoA initial state, all coordinates at [`INITIAL_VALUE`].
#[must_use]
pub fn initial_state(n: usize) -> Vec<f64> {
    vec![INITIAL_VALUE; 3 * n]
}

#[inline]
fn lorenz(s: [f64; 3], r: f64, sigma: f64, b: f64) -> [f64; 3] {
    [
        sigma * (s[1] - s[0]),
        r * s[0] - s[1] - s[0] * s[2],
        s[0] * s[1] - b * s[2],
    ]
}

/// Host right-hand side over the whole SoA ensemble. The parallel back-end
/// steps members independently through [`integrate_members`] instead.
pub struct LorenzEnsemble {
    r: Vec<f64>,
    sigma: f64,
    b: f64,
}

impl LorenzEnsemble {
    #[must_use]
    pub fn new(params: &LorenzParams) -> Self {
        Self {
            r: params.r_values(),
            sigma: params.sigma,
            b: params.b,
        }
    }
}

impl OdeSystem<Vec<f64>> for LorenzEnsemble {
    fn derivative(&mut self, state: &Vec<f64>, deriv: &mut Vec<f64>, _t: f64) {
        let n = self.r.len();
        let (x, rest) = state.split_at(n);
        let (y, z) = rest.split_at(n);
        let (dx, rest) = deriv.split_at_mut(n);
        let (dy, dz) = rest.split_at_mut(n);
        let (sigma, b) = (self.sigma, self.b);
        let r = &self.r;

        for i in 0..n {
            let [a, c, e] = lorenz([x[i], y[i], z[i]], r[i], sigma, b);
            dx[i] = a;
            dy[i] = c;
            dz[i] = e;
        }
    }
}

/// One member, stepped on its own.
pub struct LorenzMember {
    pub r: f64,
    pub sigma: f64,
    pub b: f64,
}

impl OdeSystem<[f64; 3]> for LorenzMember {
    fn derivative(&mut self, s: &[f64; 3], d: &mut [f64; 3], _t: f64) {
        *d = lorenz(*s, self.r, self.sigma, self.b);
    }
}

/// Integrate each member with its own stepper on the rayon pool and return
/// the final `[x, y, z]` of every member.
#[must_use]
pub fn integrate_members(params: &LorenzParams, dt: f64, t_max: f64) -> Vec<[f64; 3]> {
    params
        .r_values()
        .into_par_iter()
        .map(|r| {
            let mut sys = LorenzMember {
                r,
                sigma: params.sigma,
                b: params.b,
            };
            let mut s = [INITIAL_VALUE; 3];
            let mut rk = Rk4::new();
            integrate_const(&mut rk, &FixedAlgebra::<3>, &mut sys, &mut s, 0.0, t_max, dt, no_observer);
            s
        })
        .collect()
}

/// GPU right-hand side for the `gpu` back-end.
pub struct GpuLorenzEnsemble<'a> {
    alg: &'a GpuAlgebra<'a>,
    n: usize,
    r: wgpu::Buffer,
    pipeline: wgpu::ComputePipeline,
    params_buf: wgpu::Buffer,
}

impl<'a> GpuLorenzEnsemble<'a> {
    #[must_use]
    pub fn new(alg: &'a GpuAlgebra<'a>, params: &LorenzParams) -> Self {
        let gpu = alg.gpu();
        let n = params.n;
        let params_buf = gpu.create_f64_buffer(&[n as f64, params.sigma, params.b], "lorenz_params");
        Self {
            alg,
            n,
            r: gpu.create_f64_buffer(&params.r_values(), "lorenz_r"),
            pipeline: gpu.create_pipeline(SHADER_LORENZ_RHS, "lorenz_rhs"),
            params_buf,
        }
    }
}

impl OdeSystem<GpuVector> for GpuLorenzEnsemble<'_> {
    fn derivative(&mut self, state: &GpuVector, deriv: &mut GpuVector, _t: f64) {
        let gpu = self.alg.gpu();
        let bind_group = gpu.create_bind_group(
            &self.pipeline,
            &[&self.params_buf, &self.r, state.buffer(), deriv.buffer()],
        );
        gpu.dispatch(&self.pipeline, &bind_group, workgroups_for(self.n));
        // R, three coordinates in, three derivatives out
        self.alg.record_bytes(7 * self.n as u64 * 8);
    }
}

/// Run `steps` fused RK4 steps, `steps_per_submit` passes per encoder, and
/// return the final SoA state.
///
/// # Errors
///
/// Propagates a readback failure.
pub fn integrate_fused(gpu: &GpuF64, params: &LorenzParams, dt: f64, steps: usize) -> Result<Vec<f64>> {
    let n = params.n;
    let pipeline = gpu.create_pipeline(SHADER_LORENZ_FUSED_RK4, "lorenz_fused_rk4");
    let params_buf = gpu.create_f64_buffer(&[n as f64, params.sigma, params.b, dt], "lorenz_fused_params");
    let r = gpu.create_f64_buffer(&params.r_values(), "lorenz_r");
    let state = GpuVector::from_host(gpu, &initial_state(n), "lorenz_state");
    let bind_group = gpu.create_bind_group(&pipeline, &[&params_buf, &r, state.buffer()]);
    let workgroups = workgroups_for(n);

    let batch = params.steps_per_submit.max(1);
    let mut done = 0;
    while done < steps {
        let k = (steps - done).min(batch);
        let mut encoder = gpu.begin_encoder("lorenz_fused_batch");
        for _ in 0..k {
            GpuF64::encode_pass(&mut encoder, &pipeline, &bind_group, workgroups);
        }
        gpu.submit_encoder(encoder);
        done += k;
    }
    log::debug!("{NAME}: fused {steps} steps, {batch} per submit");
    state.to_host(gpu)
}

/// Integrate the ensemble on `backend` and report `x[0]`.
///
/// # Errors
///
/// [`crate::error::OdeSpringError::InvalidConfig`] if `config` fails
/// validation, [`crate::error::OdeSpringError::NoAdapter`] for a GPU back-end
/// without `gpu`, or a readback failure.
pub fn run(config: &RunConfig, backend: Backend, gpu: Option<&GpuF64>) -> Result<RunReport> {
    config.validate()?;
    let params = &config.lorenz;
    let dt = config.integration.dt;
    let t_max = config.integration.t_max;
    let mut report = RunReport::new(NAME, backend, params.n);
    let started = Instant::now();

    let (value, steps) = match backend {
        Backend::Host => {
            let alg = HostAlgebra::serial();
            let mut sys = LorenzEnsemble::new(params);
            let mut state = initial_state(params.n);
            let mut rk = Rk4::new();
            let steps = integrate_const(&mut rk, &alg, &mut sys, &mut state, 0.0, t_max, dt, no_observer);
            (first_or_nan(&state), steps)
        }
        Backend::HostParallel => {
            let members = integrate_members(params, dt, t_max);
            let value = members.first().map_or(f64::NAN, |s| s[0]);
            (value, step_count(0.0, t_max, dt))
        }
        Backend::Gpu => {
            let gpu = require_gpu(gpu)?;
            let alg = GpuAlgebra::new(gpu);
            let mut sys = GpuLorenzEnsemble::new(&alg, params);
            let mut state = GpuVector::from_host(gpu, &initial_state(params.n), "lorenz_state");
            let mut rk = Rk4::new();
            let steps = integrate_const(&mut rk, &alg, &mut sys, &mut state, 0.0, t_max, dt, no_observer);
            let value = state.first(gpu)?;
            report.bytes_touched = Some(alg.bytes_touched());
            (value, steps)
        }
        Backend::GpuFused => {
            let gpu = require_gpu(gpu)?;
            let steps = step_count(0.0, t_max, dt);
            let state = integrate_fused(gpu, params, dt, steps)?;
            (first_or_nan(&state), steps)
        }
    };

    Ok(finish_report(report, config, steps, value, started, gpu.filter(|_| backend.needs_gpu())))
}
