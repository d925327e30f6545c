// SPDX-License-Identifier: AGPL-3.0-only

//! Per-run result record, printed as text or JSON.

use crate::problems::Backend;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Outcome of one integration run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub problem: &'static str,
    pub backend: Backend,
    /// Ensemble members, chain length, or lattice side.
    pub size: usize,
    pub steps: usize,
    pub dt: f64,
    pub t_max: f64,
    /// First state component after integration.
    pub value: f64,
    pub wall_time_s: f64,
    /// Memory traffic of the `gpu` back-end's kernels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_touched: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapter: Option<String>,
    /// Problem-specific diagnostics (e.g. lattice energy drift).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, f64>,
}

impl RunReport {
    #[must_use]
    pub fn new(problem: &'static str, backend: Backend, size: usize) -> Self {
        Self {
            problem,
            backend,
            size,
            steps: 0,
            dt: 0.0,
            t_max: 0.0,
            value: f64::NAN,
            wall_time_s: 0.0,
            bytes_touched: None,
            adapter: None,
            extras: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_extra(mut self, key: &str, value: f64) -> Self {
        self.extras.insert(key.to_string(), value);
        self
    }

    /// The value on the first line, then `bytes io` when counted.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = format!("{}", self.value);
        if let Some(bytes) = self.bytes_touched {
            let _ = write!(out, "\nbytes io: {bytes}");
        }
        out
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns the serde error if serialisation fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Print to stdout and log the timing.
    ///
    /// # Errors
    ///
    /// Propagates a JSON serialisation failure.
    pub fn print(&self, json: bool) -> serde_json::Result<()> {
        log::info!(
            "{} [{}] size={} steps={} in {:.3} s",
            self.problem,
            self.backend,
            self.size,
            self.steps,
            self.wall_time_s
        );
        if json {
            println!("{}", self.to_json()?);
        } else {
            println!("{}", self.to_text());
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn text_is_value_then_bytes() {
        let mut r = RunReport::new("damped_oscillator", Backend::Gpu, 4);
        r.value = 0.5;
        r.bytes_touched = Some(1024);
        assert_eq!(r.to_text(), "0.5\nbytes io: 1024");
    }

    #[test]
    fn text_without_bytes_is_single_line() {
        let mut r = RunReport::new("lorenz_ensemble", Backend::Host, 4);
        r.value = -1.25;
        assert_eq!(r.to_text(), "-1.25");
    }

    #[test]
    fn json_contains_fields_and_skips_empty() {
        let mut r = RunReport::new("disordered_lattice", Backend::HostParallel, 8)
            .with_extra("energy_drift", 1e-12);
        r.value = 0.25;
        r.steps = 100;
        let json = r.to_json().expect("serialise");
        let v: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(v["problem"], "disordered_lattice");
        assert_eq!(v["backend"], "host-parallel");
        assert_eq!(v["steps"], 100);
        assert!(v.get("bytes_touched").is_none());
        assert!(v.get("adapter").is_none());
        assert!(v["extras"]["energy_drift"].as_f64().is_some());
    }
}
