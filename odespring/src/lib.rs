// SPDX-License-Identifier: AGPL-3.0-only

#![deny(clippy::expect_used, clippy::unwrap_used)]

//! odeSpring — fixed-step ODE integration on host and wgpu f64 back-ends
//!
//! Four small ODE problems integrated with classical RK4 or the SB3A
//! symplectic Runge-Kutta-Nyström scheme. The steppers are written once
//! against an [`odeint::Algebra`] and run on plain host vectors, rayon
//! loops, per-member stack arrays, or GPU storage buffers.
//!
//! ## Modules
//!   - `odeint` — `Algebra`/`OdeSystem` traits, `Rk4`, `SymplecticRkn`,
//!     `integrate_const`
//!   - `cpu` — `HostAlgebra` (serial or rayon) and `FixedAlgebra<N>`
//!   - `gpu` — `GpuF64` device, `GpuVector`, `GpuAlgebra`
//!   - `sparse` — CSR and ELLPACK coupling matrices
//!   - `problems` — damped oscillator, Lorenz ensemble, disordered lattice,
//!     phase oscillator chain
//!   - `config`, `cli`, `report` — run configuration and output
//!   - `validation`, `tolerances` — pass/fail harness for parity checks
//!
//! ## Binaries
//!   - `damped_oscillator`, `lorenz_ensemble`, `disordered_lattice`,
//!     `phase_oscillator_chain` — integrate one problem and print `x[0]`
//!   - `oscillator_trace` — one oscillator, `t x y` per step
//!   - `validate_cpu_gpu_parity` — host against GPU on small sizes

pub mod cli;
pub mod config;
pub mod cpu;
pub mod error;
pub mod gpu;
pub mod odeint;
pub mod problems;
pub mod report;
pub mod rng;
pub mod shaders;
pub mod sparse;
pub mod tolerances;
pub mod validation;
