// SPDX-License-Identifier: AGPL-3.0-only

//! The four ODE problems and the back-ends each one runs on.
//!
//! | Problem | Stepper | Back-ends |
//! |---------|---------|-----------|
//! | `damped_oscillator` | RK4 | host, host-parallel, gpu, gpu-fused |
//! | `lorenz_ensemble` | RK4 | host, host-parallel, gpu, gpu-fused |
//! | `disordered_lattice` | SB3A RKN | host, host-parallel, gpu |
//! | `phase_oscillator_chain` | RK4 | host, host-parallel, gpu |
//!
//! Every `run` integrates over `[0, t_max]` with the configured `dt` and
//! reports the first state component.

pub mod damped_oscillator;
pub mod disordered_lattice;
pub mod lorenz_ensemble;
pub mod phase_oscillator_chain;

use crate::config::RunConfig;
use crate::error::{OdeSpringError, Result};
use crate::gpu::GpuF64;
use crate::report::RunReport;
use serde::Serialize;
use std::time::Instant;

/// Where state vectors live and how the right-hand side is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// `Vec<f64>`, single thread.
    Host,
    /// `Vec<f64>` with rayon loops, or one stepper per ensemble member.
    HostParallel,
    /// GPU buffers stepped by the generic steppers through `GpuAlgebra`.
    Gpu,
    /// Hand-written kernels that fuse the RK4 stages.
    GpuFused,
}

impl Backend {
    pub const ALL: [Self; 4] = [Self::Host, Self::HostParallel, Self::Gpu, Self::GpuFused];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::HostParallel => "host-parallel",
            Self::Gpu => "gpu",
            Self::GpuFused => "gpu-fused",
        }
    }

    #[must_use]
    pub const fn needs_gpu(self) -> bool {
        matches!(self, Self::Gpu | Self::GpuFused)
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The four problems, for dispatch from shared binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Problem {
    DampedOscillator,
    LorenzEnsemble,
    DisorderedLattice,
    PhaseOscillatorChain,
}

impl Problem {
    pub const ALL: [Self; 4] = [
        Self::DampedOscillator,
        Self::LorenzEnsemble,
        Self::DisorderedLattice,
        Self::PhaseOscillatorChain,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DampedOscillator => "damped_oscillator",
            Self::LorenzEnsemble => "lorenz_ensemble",
            Self::DisorderedLattice => "disordered_lattice",
            Self::PhaseOscillatorChain => "phase_oscillator_chain",
        }
    }

    #[must_use]
    pub const fn supports(self, backend: Backend) -> bool {
        match self {
            Self::DampedOscillator | Self::LorenzEnsemble => true,
            Self::DisorderedLattice | Self::PhaseOscillatorChain => {
                !matches!(backend, Backend::GpuFused)
            }
        }
    }

    /// Set the problem's size parameter (members, chain length, or lattice side).
    pub fn set_size(self, config: &mut RunConfig, size: usize) {
        match self {
            Self::DampedOscillator => config.oscillator.n = size,
            Self::LorenzEnsemble => config.lorenz.n = size,
            Self::DisorderedLattice => config.lattice.side = size,
            Self::PhaseOscillatorChain => config.chain.n = size,
        }
    }

    /// Run on `backend`. GPU back-ends need `gpu`.
    ///
    /// # Errors
    ///
    /// [`OdeSpringError::UnsupportedBackend`] for a combination the problem
    /// does not implement, [`OdeSpringError::InvalidConfig`] if `config`
    /// fails [`RunConfig::validate`], [`OdeSpringError::NoAdapter`] if a GPU back-end is
    /// requested without a device, or any GPU readback failure.
    pub fn run(self, config: &RunConfig, backend: Backend, gpu: Option<&GpuF64>) -> Result<RunReport> {
        if !self.supports(backend) {
            return Err(self.unsupported(backend));
        }
        match self {
            Self::DampedOscillator => damped_oscillator::run(config, backend, gpu),
            Self::LorenzEnsemble => lorenz_ensemble::run(config, backend, gpu),
            Self::DisorderedLattice => disordered_lattice::run(config, backend, gpu),
            Self::PhaseOscillatorChain => phase_oscillator_chain::run(config, backend, gpu),
        }
    }

    fn unsupported(self, backend: Backend) -> OdeSpringError {
        OdeSpringError::UnsupportedBackend {
            problem: self.name(),
            backend: backend.name().to_string(),
        }
    }
}

/// The device a GPU back-end runs on.
pub(crate) fn require_gpu(gpu: Option<&GpuF64>) -> Result<&GpuF64> {
    gpu.ok_or(OdeSpringError::NoAdapter)
}

/// First state component, NaN for an empty state.
pub(crate) fn first_or_nan(state: &[f64]) -> f64 {
    state.first().copied().unwrap_or(f64::NAN)
}

/// Fill the fields every problem reports the same way.
pub(crate) fn finish_report(
    mut report: RunReport,
    config: &RunConfig,
    steps: usize,
    value: f64,
    started: Instant,
    gpu: Option<&GpuF64>,
) -> RunReport {
    report.steps = steps;
    report.value = value;
    report.dt = config.integration.dt;
    report.t_max = config.integration.t_max;
    report.wall_time_s = started.elapsed().as_secs_f64();
    report.adapter = gpu.map(|g| g.adapter_name.clone());
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::ValueEnum;

    #[test]
    fn backend_names_match_cli_values() {
        for b in Backend::ALL {
            let pv = b.to_possible_value().map(|v| v.get_name().to_string());
            assert_eq!(pv.as_deref(), Some(b.name()));
        }
    }

    #[test]
    fn backend_serializes_kebab_case() {
        let json = serde_json::to_string(&Backend::HostParallel).unwrap_or_default();
        assert_eq!(json, "\"host-parallel\"");
    }

    #[test]
    fn gpu_flags() {
        assert!(!Backend::Host.needs_gpu());
        assert!(!Backend::HostParallel.needs_gpu());
        assert!(Backend::Gpu.needs_gpu());
        assert!(Backend::GpuFused.needs_gpu());
    }

    #[test]
    fn fused_only_for_rk4_ensembles() {
        assert!(Problem::DampedOscillator.supports(Backend::GpuFused));
        assert!(Problem::LorenzEnsemble.supports(Backend::GpuFused));
        assert!(!Problem::DisorderedLattice.supports(Backend::GpuFused));
        assert!(!Problem::PhaseOscillatorChain.supports(Backend::GpuFused));
    }

    #[test]
    fn unsupported_combination_is_an_error() {
        let cfg = RunConfig::default();
        let err = Problem::DisorderedLattice
            .run(&cfg, Backend::GpuFused, None)
            .err()
            .map(|e| e.to_string())
            .unwrap_or_default();
        assert!(err.contains("gpu-fused"));
        assert!(err.contains("disordered_lattice"));
    }

    #[test]
    fn gpu_backend_without_device_is_no_adapter() {
        let mut cfg = RunConfig::default();
        cfg.oscillator.n = 4;
        let res = Problem::DampedOscillator.run(&cfg, Backend::Gpu, None);
        assert!(matches!(res, Err(OdeSpringError::NoAdapter)));
    }

    #[test]
    fn zero_size_is_invalid_config_on_every_backend() {
        for problem in Problem::ALL {
            let mut cfg = RunConfig::default();
            problem.set_size(&mut cfg, 0);
            for backend in [Backend::Host, Backend::HostParallel] {
                let res = problem.run(&cfg, backend, None);
                assert!(
                    matches!(res, Err(OdeSpringError::InvalidConfig(_))),
                    "{} {backend}",
                    problem.name()
                );
            }
        }
    }

    #[test]
    fn first_or_nan_handles_empty_state() {
        assert!(first_or_nan(&[]).is_nan());
        assert!((first_or_nan(&[2.5, 1.0]) - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn set_size_targets_problem() {
        let mut cfg = RunConfig::default();
        Problem::DisorderedLattice.set_size(&mut cfg, 8);
        Problem::PhaseOscillatorChain.set_size(&mut cfg, 33);
        assert_eq!(cfg.lattice.side, 8);
        assert_eq!(cfg.chain.n, 33);
    }
}
