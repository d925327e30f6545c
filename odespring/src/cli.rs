// SPDX-License-Identifier: AGPL-3.0-only

//! Command-line surface shared by the problem binaries.
//!
//! ```text
//! lorenz_ensemble [SIZE] [--backend host|host-parallel|gpu|gpu-fused]
//!                 [--dt DT] [--t-max T] [--seed S] [--config FILE] [--json]
//! ```
//!
//! Flags override the TOML file, which overrides the built-in defaults.

use crate::config::RunConfig;
use crate::error::Result;
use crate::gpu::GpuF64;
use crate::problems::{Backend, Problem};
use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Problem size: ensemble members, chain length, or lattice side
    pub size: Option<usize>,

    #[arg(long, value_enum, default_value_t = Backend::Host)]
    pub backend: Backend,

    /// Step size
    #[arg(long)]
    pub dt: Option<f64>,

    /// End time
    #[arg(long)]
    pub t_max: Option<f64>,

    /// Seed for the initial-condition generator
    #[arg(long)]
    pub seed: Option<u64>,

    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Build the effective configuration for `problem`.
    ///
    /// # Errors
    ///
    /// [`crate::error::OdeSpringError::ConfigLoad`] if the file cannot be
    /// read, [`crate::error::OdeSpringError::InvalidConfig`] if the merged
    /// values are out of range.
    pub fn resolve(&self, problem: Problem) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::default(),
        };
        if let Some(size) = self.size {
            problem.set_size(&mut config, size);
        }
        if let Some(dt) = self.dt {
            config.integration.dt = dt;
        }
        if let Some(t_max) = self.t_max {
            config.integration.t_max = t_max;
        }
        if self.seed.is_some() {
            config.integration.seed = self.seed;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Log to stderr at info level unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    let _ = env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .format_timestamp(None)
        .parse_default_env()
        .try_init();
}

/// Open the GPU selected by `ODESPRING_GPU_ADAPTER`.
///
/// # Errors
///
/// Fails if the tokio runtime cannot start or no f64-capable device opens.
pub fn open_gpu() -> anyhow::Result<GpuF64> {
    let rt = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    let gpu = rt.block_on(GpuF64::new()).context("GPU init failed")?;
    gpu.print_info();
    Ok(gpu)
}

/// Entry point of a single-problem binary: parse flags, run, print.
///
/// # Errors
///
/// Any configuration, device, or run failure.
pub fn run_problem(problem: Problem) -> anyhow::Result<()> {
    init_logging();
    let args = RunArgs::parse();
    let config = args
        .resolve(problem)
        .with_context(|| format!("configuring {}", problem.name()))?;
    let gpu = if args.backend.needs_gpu() {
        Some(open_gpu()?)
    } else {
        None
    };
    let report = problem
        .run(&config, args.backend, gpu.as_ref())
        .with_context(|| format!("running {} on {}", problem.name(), args.backend))?;
    report.print(args.json).context("printing report")?;
    Ok(())
}
