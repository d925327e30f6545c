// SPDX-License-Identifier: AGPL-3.0-only

//! Integration tests: TOML configuration files and tolerance hierarchy.

use odespring::config::RunConfig;
use odespring::error::OdeSpringError;
use odespring::problems::{Backend, Problem};
use odespring::tolerances;

#[test]
fn config_file_drives_a_run() {
    let path = std::env::temp_dir().join(format!("odespring_cfg_{}.toml", std::process::id()));
    std::fs::write(
        &path,
        "[integration]\nt_max = 0.5\ndt = 0.05\nseed = 1\n\n[oscillator]\nn = 8\namp = 0.0\n",
    )
    .expect("write temp config");
    let cfg = RunConfig::load(&path).expect("load");
    let _ = std::fs::remove_file(&path);

    cfg.validate().expect("valid");
    assert_eq!(cfg.oscillator.n, 8);
    assert_eq!(cfg.steps(), 10);
    let r = Problem::DampedOscillator.run(&cfg, Backend::Host, None).expect("run");
    assert_eq!(r.steps, 10);
    assert_eq!(r.size, 8);
}

#[test]
fn unknown_value_type_is_reported() {
    let err = RunConfig::from_toml_str("[lattice]\nside = \"big\"\n");
    assert!(matches!(err, Err(OdeSpringError::ConfigLoad(_))));
}

#[test]
fn tolerance_hierarchy_consistent() {
    let tols = [
        ("HOST_PARALLEL_F64", tolerances::HOST_PARALLEL_F64),
        ("EXACT_F64", tolerances::EXACT_F64),
        ("ITERATIVE_F64", tolerances::ITERATIVE_F64),
        ("GPU_VS_CPU_F64", tolerances::GPU_VS_CPU_F64),
    ];
    for pair in tols.windows(2) {
        assert!(pair[0].1 < pair[1].1, "{} must be tighter than {}", pair[0].0, pair[1].0);
    }
}
