// SPDX-License-Identifier: AGPL-3.0-only

//! Lorenz ensemble sweeping the Rayleigh parameter, RK4.
//!
//!   `cargo run --release --bin lorenz_ensemble -- [SIZE] --backend gpu-fused`

use odespring::cli::run_problem;
use odespring::problems::Problem;

fn main() -> anyhow::Result<()> {
    run_problem(Problem::LorenzEnsemble)
}
