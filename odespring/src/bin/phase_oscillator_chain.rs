// SPDX-License-Identifier: AGPL-3.0-only

//! Chain of coupled phase oscillators with clamped ends, RK4.
//!
//!   `cargo run --release --bin phase_oscillator_chain -- [SIZE] --backend host-parallel`

use odespring::cli::run_problem;
use odespring::problems::Problem;

fn main() -> anyhow::Result<()> {
    run_problem(Problem::PhaseOscillatorChain)
}
