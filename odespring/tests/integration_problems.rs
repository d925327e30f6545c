// SPDX-License-Identifier: AGPL-3.0-only

//! Integration tests: every problem end-to-end on the host back-ends.

use odespring::config::RunConfig;
use odespring::error::OdeSpringError;
use odespring::odeint::step_count;
use odespring::problems::damped_oscillator::{trace_single, OscillatorParams};
use odespring::problems::{Backend, Problem};
use odespring::tolerances;

fn short_config() -> RunConfig {
    let mut cfg = RunConfig::default();
    cfg.integration.t_max = 1.0;
    cfg.integration.seed = Some(42);
    cfg.oscillator.n = 32;
    cfg.lorenz.n = 16;
    cfg.lattice.side = 8;
    cfg.chain.n = 32;
    cfg
}

#[test]
fn every_problem_runs_on_host() {
    let cfg = short_config();
    for problem in Problem::ALL {
        let report = problem
            .run(&cfg, Backend::Host, None)
            .unwrap_or_else(|e| panic!("{} failed: {e}", problem.name()));
        assert_eq!(report.problem, problem.name());
        assert_eq!(report.steps, 100);
        assert!(report.value.is_finite(), "{} value {}", problem.name(), report.value);
        assert!(report.bytes_touched.is_none());
        assert!(report.adapter.is_none());
    }
}

#[test]
fn host_parallel_agrees_with_host() {
    let cfg = short_config();
    for problem in Problem::ALL {
        let a = problem.run(&cfg, Backend::Host, None).expect("host");
        let b = problem.run(&cfg, Backend::HostParallel, None).expect("host-parallel");
        assert_eq!(a.steps, b.steps);
        assert!(
            (a.value - b.value).abs() < tolerances::HOST_PARALLEL_F64,
            "{}: {} vs {}",
            problem.name(),
            a.value,
            b.value
        );
    }
}

#[test]
fn seeded_runs_are_reproducible() {
    let cfg = short_config();
    let a = Problem::PhaseOscillatorChain.run(&cfg, Backend::Host, None).expect("run");
    let b = Problem::PhaseOscillatorChain.run(&cfg, Backend::Host, None).expect("run");
    assert_eq!(a.value.to_bits(), b.value.to_bits());

    let mut other = cfg.clone();
    other.integration.seed = Some(43);
    let c = Problem::PhaseOscillatorChain.run(&other, Backend::Host, None).expect("run");
    assert_ne!(a.value.to_bits(), c.value.to_bits());
}

#[test]
fn gpu_backends_need_a_device() {
    let cfg = short_config();
    for problem in Problem::ALL {
        for backend in [Backend::Gpu, Backend::GpuFused] {
            let res = problem.run(&cfg, backend, None);
            if problem.supports(backend) {
                assert!(matches!(res, Err(OdeSpringError::NoAdapter)));
            } else {
                assert!(matches!(res, Err(OdeSpringError::UnsupportedBackend { .. })));
            }
        }
    }
}

#[test]
fn zero_size_runs_are_rejected_not_panicking() {
    for problem in Problem::ALL {
        let mut cfg = short_config();
        problem.set_size(&mut cfg, 0);
        for backend in [Backend::Host, Backend::HostParallel, Backend::Gpu] {
            let res = problem.run(&cfg, backend, None);
            assert!(
                matches!(res, Err(OdeSpringError::InvalidConfig(_))),
                "{} {backend}: {res:?}",
                problem.name()
            );
        }
    }
}

#[test]
fn default_horizon_takes_9999_steps() {
    // The last candidate step lands past t_max by more than machine epsilon.
    let cfg = RunConfig::default();
    assert_eq!(cfg.steps(), 9_999);
    assert_eq!(step_count(0.0, 100.0, 0.1), 1_000);
}

#[test]
fn lattice_conserves_energy_over_default_dt() {
    let mut cfg = short_config();
    cfg.integration.t_max = 20.0;
    let report = Problem::DisorderedLattice.run(&cfg, Backend::Host, None).expect("run");
    let drift = report.extras["energy_drift"];
    assert!(drift < tolerances::SYMPLECTIC_ENERGY_DRIFT, "drift {drift}");
}

#[test]
fn lorenz_members_start_at_ten() {
    let mut cfg = short_config();
    cfg.integration.t_max = 0.0;
    let report = Problem::LorenzEnsemble.run(&cfg, Backend::Host, None).expect("run");
    assert_eq!(report.steps, 0);
    assert!((report.value - 10.0).abs() < tolerances::EXACT_F64);
}

#[test]
fn trace_prints_one_line_per_step_plus_final() {
    let params = OscillatorParams::default();
    let mut lines = Vec::new();
    let steps = trace_single(&params, 0.1, 100.0, |t, [x, y]| {
        lines.push(format!("{t}\t{x}\t{y}"));
    });
    assert_eq!(steps, 1_000);
    assert_eq!(lines.len(), 1_001);
    assert_eq!(lines[0], "0\t1\t0");
}

#[test]
fn json_report_round_trips_through_serde_json() {
    let cfg = short_config();
    let report = Problem::DisorderedLattice.run(&cfg, Backend::Host, None).expect("run");
    let json = report.to_json().expect("serialise");
    let v: serde_json::Value = serde_json::from_str(&json).expect("parse");
    assert_eq!(v["backend"], "host");
    assert_eq!(v["size"], 8);
    assert!(v["extras"]["p0"].is_number());
}
