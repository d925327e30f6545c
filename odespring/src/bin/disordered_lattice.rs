// SPDX-License-Identifier: AGPL-3.0-only

//! Disordered Hamiltonian lattice, SB3A symplectic RKN.
//!
//! Prints `q[0]`; with `--json` the report also carries `p[0]` and the
//! relative energy drift.
//!
//!   `cargo run --release --bin disordered_lattice -- [SIZE] --backend host-parallel`

use odespring::cli::run_problem;
use odespring::problems::Problem;

fn main() -> anyhow::Result<()> {
    run_problem(Problem::DisorderedLattice)
}
