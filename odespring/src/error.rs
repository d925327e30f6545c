// SPDX-License-Identifier: AGPL-3.0-only

//! Typed errors for odeSpring GPU setup, configuration, and integration runs.
//!
//! Callers pattern-match on failure modes (no adapter, missing feature, bad
//! configuration) rather than parsing opaque strings.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OdeSpringError>;

/// Errors arising from GPU initialization, configuration, or a run.
#[derive(Debug, Error)]
pub enum OdeSpringError {
    /// No compatible GPU adapter was found by wgpu.
    #[error("No GPU adapter found")]
    NoAdapter,

    /// GPU device creation failed (wraps the underlying wgpu error message).
    #[error("Failed to create GPU device: {0}")]
    DeviceCreation(String),

    /// GPU lacks the `SHADER_F64` feature required for f64 compute.
    #[error("GPU does not support SHADER_F64, cannot run f64 integration")]
    NoShaderF64,

    /// A GPU readback or map operation failed.
    #[error("GPU compute failed: {0}")]
    GpuCompute(String),

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration file could not be read or parsed.
    #[error("Failed to load configuration: {0}")]
    ConfigLoad(String),

    /// The requested back-end has no implementation for this problem.
    #[error("Back-end '{backend}' is not available for {problem}")]
    UnsupportedBackend {
        problem: &'static str,
        backend: String,
    },
}
