// SPDX-License-Identifier: AGPL-3.0-only

//! Centralized tolerances for tests and the parity binary.
//!
//! | Category | Basis | Example |
//! |----------|-------|---------|
//! | Machine precision | IEEE 754 f64 | identical operation order |
//! | Back-end parity | GPU vs host instruction order | RK4 on GPU buffers |
//! | Integrator | order and structure of the scheme | SB3A energy drift |

// ═══════════════════════════════════════════════════════════════════
// Machine precision
// ═══════════════════════════════════════════════════════════════════

/// Results that should agree up to a few roundings.
pub const EXACT_F64: f64 = 1e-10;

/// Accumulated rounding over thousands of steps.
pub const ITERATIVE_F64: f64 = 1e-8;

/// Below this magnitude a relative check falls back to absolute.
pub const NEAR_ZERO_EXPECTED: f64 = 1e-14;

/// Serial host against rayon host. Both evaluate every element with the
/// same expression and term order, so results are bitwise equal; the
/// bound only absorbs fused multiply-add differences between builds.
pub const HOST_PARALLEL_F64: f64 = 1e-12;

// ═══════════════════════════════════════════════════════════════════
// GPU parity
// ═══════════════════════════════════════════════════════════════════

/// GPU f64 against host f64 for non-chaotic problems.
///
/// Same IEEE 754 representation, different instruction ordering and FMA
/// contraction in the driver compiler.
pub const GPU_VS_CPU_F64: f64 = 1e-6;

/// Software `sin` in the phase chain kernel against libm.
pub const SOFTWARE_SIN_F64: f64 = 1e-15;

/// Horizon over which chaotic Lorenz members are compared across
/// back-ends. Trajectory differences grow like `e^{λt}` with `λ ≈ 0.9`,
/// so rounding differences stay below [`GPU_VS_CPU_F64`] up to `t ≈ 5`.
pub const LORENZ_PARITY_T_MAX: f64 = 2.0;

// ═══════════════════════════════════════════════════════════════════
// Integrators
// ═══════════════════════════════════════════════════════════════════

/// Relative energy drift of the SB3A lattice run at `dt = 0.01`.
///
/// The scheme is symplectic, so the error stays bounded; observed drift on
/// an 8×8 lattice over 2000 steps is about 2e-12.
pub const SYMPLECTIC_ENERGY_DRIFT: f64 = 1e-8;

/// Phase-space error of an undamped oscillator after a few periods of RK4
/// at `dt ≈ 0.01`. Global error is `O(dt⁴)`.
pub const RK4_PERIOD_F64: f64 = 1e-9;
