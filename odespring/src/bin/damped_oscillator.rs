// SPDX-License-Identifier: AGPL-3.0-only

//! Ensemble of periodically driven 2-D oscillators, RK4.
//!
//!   `cargo run --release --bin damped_oscillator -- [SIZE] --backend host-parallel`

use odespring::cli::run_problem;
use odespring::problems::Problem;

fn main() -> anyhow::Result<()> {
    run_problem(Problem::DampedOscillator)
}
