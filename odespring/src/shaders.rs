// SPDX-License-Identifier: AGPL-3.0-only

//! WGSL kernels for the problem right-hand sides and the fused steppers.
//!
//! Every kernel reads its scalars from an f64 `params` storage buffer at
//! binding 0, runs 64 threads per workgroup, and linearises 2-D dispatches
//! with `gid.x + gid.y * nwg.x * 64u`. The generic linear-combination
//! kernels are generated at runtime in [`crate::gpu::scale_sum_shader`].

// ═══════════════════════════════════════════════════════════════════
// Damped oscillator
// ═══════════════════════════════════════════════════════════════════

pub const SHADER_OSCILLATOR_RHS: &str = include_str!("shaders/oscillator_rhs_f64.wgsl");

// Whole RK4 loop per thread, chunked by the host; eps tabulated per step.
pub const SHADER_OSCILLATOR_FUSED_RK4: &str =
    include_str!("shaders/oscillator_fused_rk4_f64.wgsl");

// ═══════════════════════════════════════════════════════════════════
// Lorenz ensemble
// ═══════════════════════════════════════════════════════════════════

pub const SHADER_LORENZ_RHS: &str = include_str!("shaders/lorenz_rhs_f64.wgsl");

pub const SHADER_LORENZ_FUSED_RK4: &str = include_str!("shaders/lorenz_fused_rk4_f64.wgsl");

// ═══════════════════════════════════════════════════════════════════
// Disordered Hamiltonian lattice (ELL SpMV + cubic on-site term)
// ═══════════════════════════════════════════════════════════════════

pub const SHADER_LATTICE_FORCE: &str = include_str!("shaders/lattice_force_f64.wgsl");

// ═══════════════════════════════════════════════════════════════════
// Phase oscillator chain (software f64 sin)
// ═══════════════════════════════════════════════════════════════════

pub const SHADER_PHASE_CHAIN_RHS: &str = include_str!("shaders/phase_chain_rhs_f64.wgsl");
