// SPDX-License-Identifier: AGPL-3.0-only

//! Host / GPU parity validation
//!
//! Runs every problem at a small size on each back-end it supports and
//! compares the reported `x[0]` against the serial host run. The Lorenz
//! ensemble is chaotic, so it is compared only up to
//! `LORENZ_PARITY_T_MAX`. The lattice runs also check energy conservation.
//!
//! Without a GPU the host checks still run and the GPU checks are skipped.
//!
//! Exit code 0 = parity confirmed, exit code 1 = divergence detected.

use odespring::cli::{init_logging, open_gpu};
use odespring::config::RunConfig;
use odespring::gpu::GpuF64;
use odespring::problems::{Backend, Problem};
use odespring::tolerances;
use odespring::validation::ValidationHarness;

fn small_config(problem: Problem) -> RunConfig {
    let mut cfg = RunConfig::default();
    cfg.integration.seed = Some(42);
    cfg.integration.t_max = 10.0;
    match problem {
        Problem::DampedOscillator => cfg.oscillator.n = 256,
        Problem::LorenzEnsemble => {
            cfg.lorenz.n = 64;
            cfg.integration.t_max = tolerances::LORENZ_PARITY_T_MAX;
        }
        Problem::DisorderedLattice => cfg.lattice.side = 16,
        Problem::PhaseOscillatorChain => cfg.chain.n = 256,
    }
    cfg
}

fn check_problem(harness: &mut ValidationHarness, problem: Problem, gpu: Option<&GpuF64>) {
    let cfg = small_config(problem);
    println!("── {} ──────────────────────────────────────", problem.name());

    let reference = match problem.run(&cfg, Backend::Host, None) {
        Ok(r) => r,
        Err(e) => {
            println!("  host run failed: {e}");
            harness.check_bool(&format!("{} host run", problem.name()), false);
            return;
        }
    };
    println!("  host          x[0] = {:.15e} ({} steps)", reference.value, reference.steps);
    if let Some(drift) = reference.extras.get("energy_drift") {
        harness.check_upper(
            &format!("{} host energy drift", problem.name()),
            *drift,
            tolerances::SYMPLECTIC_ENERGY_DRIFT,
        );
    }

    for backend in [Backend::HostParallel, Backend::Gpu, Backend::GpuFused] {
        if !problem.supports(backend) || (backend.needs_gpu() && gpu.is_none()) {
            continue;
        }
        let tol = if backend.needs_gpu() {
            tolerances::GPU_VS_CPU_F64
        } else {
            tolerances::HOST_PARALLEL_F64
        };
        match problem.run(&cfg, backend, gpu) {
            Ok(report) => {
                println!("  {:<13} x[0] = {:.15e}", backend.name(), report.value);
                harness.check_reports(&report, &reference, tol);
                if let Some(drift) = report.extras.get("energy_drift") {
                    harness.check_upper(
                        &format!("{} {backend} energy drift", problem.name()),
                        *drift,
                        tolerances::SYMPLECTIC_ENERGY_DRIFT,
                    );
                }
                if let Some(bytes) = report.bytes_touched {
                    println!("  {:<13} bytes io: {bytes}", backend.name());
                    harness.check_bool(&format!("{} {backend} bytes io counted", problem.name()), bytes > 0);
                }
            }
            Err(e) => {
                println!("  {backend} run failed: {e}");
                harness.check_bool(&format!("{} {backend} run", problem.name()), false);
            }
        }
    }
    println!();
}

fn main() {
    init_logging();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  Host / GPU Parity Validation                                ║");
    println!("║  Same stepper, same initial conditions, different back-end   ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let gpu = match open_gpu() {
        Ok(gpu) => Some(gpu),
        Err(e) => {
            println!("  GPU unavailable ({e:#}); skipping GPU checks");
            GpuF64::print_available_adapters();
            println!();
            None
        }
    };

    let mut harness = ValidationHarness::new("cpu_gpu_parity");
    for problem in Problem::ALL {
        check_problem(&mut harness, problem, gpu.as_ref());
    }
    harness.finish();
}
