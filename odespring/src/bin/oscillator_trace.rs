// SPDX-License-Identifier: AGPL-3.0-only

//! Single damped oscillator from `(1, 0)`, printing `t  x  y` before every
//! step and at the end.
//!
//!   `cargo run --release --bin oscillator_trace > trace.tsv`

use anyhow::Context;
use clap::Parser;
use odespring::cli::init_logging;
use odespring::config::RunConfig;
use odespring::problems::damped_oscillator::{trace_single, TRACE_DT};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser)]
struct Args {
    /// Step size
    #[arg(long, default_value_t = TRACE_DT)]
    dt: f64,

    /// End time
    #[arg(long, default_value_t = 100.0)]
    t_max: f64,

    /// TOML file supplying the `[oscillator]` parameters
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    config.integration.dt = args.dt;
    config.integration.t_max = args.t_max;
    config.validate()?;

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut io_result = Ok(());
    let steps = trace_single(&config.oscillator, args.dt, args.t_max, |t, [x, y]| {
        if io_result.is_ok() {
            io_result = writeln!(out, "{t}\t{x}\t{y}");
        }
    });
    io_result.context("writing trace")?;
    out.flush().context("flushing trace")?;
    log::info!("oscillator_trace: {steps} steps of dt={}", args.dt);
    Ok(())
}
