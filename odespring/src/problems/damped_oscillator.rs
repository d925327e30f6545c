// SPDX-License-Identifier: AGPL-3.0-only

//! Ensemble of independent, periodically driven 2-D oscillators.
//!
//! ```text
//! ε(t) = offset + amp·cos(ω_d t)
//! dx/dt = ε x + ω y
//! dy/dt = ε y − ω x
//! ```
//!
//! State is stored SoA, `[x(N), y(N)]`, and initialised from 2N uniforms:
//! the first N go to `x`, the rest to `y`.

use super::{finish_report, first_or_nan, require_gpu, Backend};
use crate::config::RunConfig;
use crate::cpu::{FixedAlgebra, HostAlgebra};
use crate::error::Result;
use crate::gpu::{workgroups_for, GpuAlgebra, GpuF64, GpuVector};
use crate::odeint::{integrate_const, no_observer, step_count, OdeSystem, Rk4};
use crate::report::RunReport;
use crate::rng::Lcg48;
use crate::shaders::{SHADER_OSCILLATOR_FUSED_RK4, SHADER_OSCILLATOR_RHS};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

pub const NAME: &str = "damped_oscillator";

/// Step size of the single-oscillator trace.
pub const TRACE_DT: f64 = 0.1;

/// Oscillator parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscillatorParams {
    /// Ensemble size.
    pub n: usize,
    pub omega: f64,
    pub amp: f64,
    pub offset: f64,
    pub omega_d: f64,
    /// RK4 steps per dispatch of the fused kernel.
    pub fused_steps_per_dispatch: usize,
}

impl Default for OscillatorParams {
    fn default() -> Self {
        Self {
            n: 1024,
            omega: 1.0,
            amp: 0.2,
            offset: 0.0,
            omega_d: 1.2,
            fused_steps_per_dispatch: 1000,
        }
    }
}

impl OscillatorParams {
    /// Damping coefficient ε(t).
    #[inline]
    #[must_use]
    pub fn eps(&self, t: f64) -> f64 {
        self.offset + self.amp * (self.omega_d * t).cos()
    }
}

/// SoA initial state from `2n` uniforms.
#[must_use]
pub fn initial_state(n: usize, seed: Option<u64>) -> Vec<f64> {
    Lcg48::from_option(seed).uniform_vec(2 * n)
}

/// Host right-hand side over the SoA `Vec<f64>` state.
pub struct OscillatorEnsemble {
    params: OscillatorParams,
    parallel: bool,
}

impl OscillatorEnsemble {
    #[must_use]
    pub const fn new(params: OscillatorParams, parallel: bool) -> Self {
        Self { params, parallel }
    }
}

impl OdeSystem<Vec<f64>> for OscillatorEnsemble {
    fn derivative(&mut self, state: &Vec<f64>, deriv: &mut Vec<f64>, t: f64) {
        let eps = self.params.eps(t);
        let omega = self.params.omega;
        let n = state.len() / 2;
        let (x, y) = state.split_at(n);
        let (dx, dy) = deriv.split_at_mut(n);
        if self.parallel {
            dx.par_iter_mut()
                .zip(dy.par_iter_mut())
                .zip(x.par_iter().zip(y.par_iter()))
                .for_each(|((dxi, dyi), (xi, yi))| {
                    *dxi = eps * xi + omega * yi;
                    *dyi = eps * yi - omega * xi;
                });
        } else {
            for i in 0..n {
                dx[i] = eps * x[i] + omega * y[i];
                dy[i] = eps * y[i] - omega * x[i];
            }
        }
    }
}

/// A single oscillator as a stack `[x, y]`.
pub struct SingleOscillator {
    params: OscillatorParams,
}

impl OdeSystem<[f64; 2]> for SingleOscillator {
    fn derivative(&mut self, s: &[f64; 2], d: &mut [f64; 2], t: f64) {
        let eps = self.params.eps(t);
        d[0] = eps * s[0] + self.params.omega * s[1];
        d[1] = eps * s[1] - self.params.omega * s[0];
    }
}

/// Integrate one oscillator from `(1, 0)` and hand `(t, [x, y])` to
/// `observer` before every step and at the end. Returns the step count.
pub fn trace_single<O>(params: &OscillatorParams, dt: f64, t_max: f64, mut observer: O) -> usize
where
    O: FnMut(f64, [f64; 2]),
{
    let mut sys = SingleOscillator {
        params: params.clone(),
    };
    let mut state = [1.0, 0.0];
    let mut rk = Rk4::new();
    integrate_const(
        &mut rk,
        &FixedAlgebra::<2>,
        &mut sys,
        &mut state,
        0.0,
        t_max,
        dt,
        |s: &[f64; 2], t| observer(t, *s),
    )
}

/// GPU right-hand side for the `gpu` back-end; ε(t) is evaluated on the host.
pub struct GpuOscillatorEnsemble<'a> {
    alg: &'a GpuAlgebra<'a>,
    params: OscillatorParams,
    pipeline: wgpu::ComputePipeline,
    params_buf: wgpu::Buffer,
}

impl<'a> GpuOscillatorEnsemble<'a> {
    #[must_use]
    pub fn new(alg: &'a GpuAlgebra<'a>, params: OscillatorParams) -> Self {
        let gpu = alg.gpu();
        Self {
            alg,
            params,
            pipeline: gpu.create_pipeline(SHADER_OSCILLATOR_RHS, "oscillator_rhs"),
            params_buf: gpu.create_f64_output_buffer(3, "oscillator_params"),
        }
    }
}

impl OdeSystem<GpuVector> for GpuOscillatorEnsemble<'_> {
    fn derivative(&mut self, state: &GpuVector, deriv: &mut GpuVector, t: f64) {
        let gpu = self.alg.gpu();
        let n = state.len() / 2;
        gpu.upload_f64(
            &self.params_buf,
            &[n as f64, self.params.eps(t), self.params.omega],
        );
        let bind_group = gpu.create_bind_group(
            &self.pipeline,
            &[&self.params_buf, state.buffer(), deriv.buffer()],
        );
        gpu.dispatch(&self.pipeline, &bind_group, workgroups_for(n));
        self.alg.record_bytes(4 * n as u64 * 8);
    }
}

/// Run `steps` RK4 steps of size `dt` with the fused kernel and return the
/// final SoA state.
///
/// # Errors
///
/// Propagates a readback failure.
pub fn integrate_fused(
    gpu: &GpuF64,
    params: &OscillatorParams,
    initial: &[f64],
    dt: f64,
    steps: usize,
) -> Result<Vec<f64>> {
    let n = initial.len() / 2;
    let chunk = params.fused_steps_per_dispatch.max(1);
    let pipeline = gpu.create_pipeline(SHADER_OSCILLATOR_FUSED_RK4, "oscillator_fused_rk4");
    let state = GpuVector::from_host(gpu, initial, "oscillator_state");
    let params_buf = gpu.create_f64_output_buffer(4, "oscillator_fused_params");
    let eps_buf = gpu.create_f64_output_buffer(3 * chunk, "oscillator_eps_table");
    let bind_group = gpu.create_bind_group(&pipeline, &[&params_buf, &eps_buf, state.buffer()]);

    let half = 0.5 * dt;
    let mut done = 0;
    while done < steps {
        let k = (steps - done).min(chunk);
        let table: Vec<f64> = (done..done + k)
            .flat_map(|s| {
                let t = s as f64 * dt;
                [params.eps(t), params.eps(t + half), params.eps(t + dt)]
            })
            .collect();
        gpu.upload_f64(&eps_buf, &table);
        gpu.upload_f64(&params_buf, &[n as f64, params.omega, dt, k as f64]);
        gpu.dispatch(&pipeline, &bind_group, workgroups_for(n));
        done += k;
    }
    log::debug!("{NAME}: fused {steps} steps in chunks of {chunk}");
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
    let params = &config.oscillator;
    let dt = config.integration.dt;
    let t_max = config.integration.t_max;
    let initial = initial_state(params.n, config.integration.seed);
    let mut report = RunReport::new(NAME, backend, params.n);
    let started = Instant::now();

    let (value, steps) = match backend {
        Backend::Host | Backend::HostParallel => {
            let alg = if backend == Backend::HostParallel {
                HostAlgebra::parallel()
            } else {
                HostAlgebra::serial()
            };
            let mut sys = OscillatorEnsemble::new(params.clone(), alg.is_parallel_for(params.n));
            let mut state = initial;
            let mut rk = Rk4::new();
            let steps = integrate_const(&mut rk, &alg, &mut sys, &mut state, 0.0, t_max, dt, no_observer);
            (first_or_nan(&state), steps)
        }
        Backend::Gpu => {
            let gpu = require_gpu(gpu)?;
            let alg = GpuAlgebra::new(gpu);
            let mut sys = GpuOscillatorEnsemble::new(&alg, params.clone());
            let mut state = GpuVector::from_host(gpu, &initial, "oscillator_state");
            let mut rk = Rk4::new();
            let steps = integrate_const(&mut rk, &alg, &mut sys, &mut state, 0.0, t_max, dt, no_observer);
            let value = state.first(gpu)?;
            report.bytes_touched = Some(alg.bytes_touched());
            (value, steps)
        }
        Backend::GpuFused => {
            let gpu = require_gpu(gpu)?;
            let steps = step_count(0.0, t_max, dt);
            let state = integrate_fused(gpu, params, &initial, dt, steps)?;
            (first_or_nan(&state), steps)
        }
    };

    Ok(finish_report(report, config, steps, value, started, gpu.filter(|_| backend.needs_gpu())))
}
