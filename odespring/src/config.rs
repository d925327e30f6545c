// SPDX-License-Identifier: AGPL-3.0-only

//! Run configuration.
//!
//! Every field has a default, so an empty TOML file (or none at all) gives
//! the standard runs. A partial file only overrides what it names:
//!
//! ```toml
//! [integration]
//! dt = 0.005
//! seed = 42
//!
//! [lattice]
//! side = 32
//! ```

use crate::error::{OdeSpringError, Result};
use crate::odeint::step_count;
use crate::problems::damped_oscillator::OscillatorParams;
use crate::problems::disordered_lattice::LatticeParams;
use crate::problems::lorenz_ensemble::LorenzParams;
use crate::problems::phase_oscillator_chain::ChainParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Time grid and random seed shared by every problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    pub dt: f64,
    pub t_max: f64,
    /// drand48-style seed; the unseeded stream when absent.
    pub seed: Option<u64>,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            dt: 0.01,
            t_max: 100.0,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub integration: IntegrationConfig,
    pub oscillator: OscillatorParams,
    pub lorenz: LorenzParams,
    pub lattice: LatticeParams,
    pub chain: ChainParams,
}

impl RunConfig {
    /// Parse from TOML text.
    ///
    /// # Errors
    ///
    /// [`OdeSpringError::ConfigLoad`] on malformed TOML or unknown value types.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| OdeSpringError::ConfigLoad(e.to_string()))
    }

    /// Read and parse a TOML file.
    ///
    /// # Errors
    ///
    /// [`OdeSpringError::ConfigLoad`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| OdeSpringError::ConfigLoad(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Check the time grid and problem sizes.
    ///
    /// # Errors
    ///
    /// [`OdeSpringError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(OdeSpringError::InvalidConfig(msg));
        let integ = &self.integration;
        if !integ.dt.is_finite() || integ.dt <= 0.0 {
            return invalid(format!("dt must be positive and finite, got {}", integ.dt));
        }
        if !integ.t_max.is_finite() || integ.t_max < 0.0 {
            return invalid(format!("t_max must be non-negative and finite, got {}", integ.t_max));
        }
        for (name, size) in [
            ("oscillator.n", self.oscillator.n),
            ("lorenz.n", self.lorenz.n),
            ("lattice.side", self.lattice.side),
            ("chain.n", self.chain.n),
        ] {
            if size == 0 {
                return invalid(format!("{name} must be at least 1"));
            }
        }
        let finite = [
            ("oscillator.omega", self.oscillator.omega),
            ("oscillator.amp", self.oscillator.amp),
            ("oscillator.offset", self.oscillator.offset),
            ("oscillator.omega_d", self.oscillator.omega_d),
            ("lorenz.sigma", self.lorenz.sigma),
            ("lorenz.b", self.lorenz.b),
            ("lorenz.r_min", self.lorenz.r_min),
            ("lorenz.r_max", self.lorenz.r_max),
            ("lattice.coupling", self.lattice.coupling),
            ("lattice.beta", self.lattice.beta),
            ("chain.epsilon", self.chain.epsilon()),
        ];
        if let Some((name, v)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return invalid(format!("{name} must be finite, got {v}"));
        }
        Ok(())
    }

    /// Steps a run over `[0, t_max]` takes.
    #[must_use]
    pub fn steps(&self) -> usize {
        step_count(0.0, self.integration.t_max, self.integration.dt)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_runs() {
        let cfg = RunConfig::default();
        assert!((cfg.integration.dt - 0.01).abs() < f64::EPSILON);
        assert!((cfg.integration.t_max - 100.0).abs() < f64::EPSILON);
        assert!(cfg.integration.seed.is_none());
        assert_eq!(cfg.oscillator.n, 1024);
        assert_eq!(cfg.lorenz.n, 1024);
        assert_eq!(cfg.lattice.side, 64);
        assert_eq!(cfg.chain.n, 1024);
        assert_eq!(cfg.steps(), 9_999);
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn empty_toml_is_default() {
        let cfg = RunConfig::from_toml_str("").expect("parse");
        assert_eq!(cfg, RunConfig::default());
    }

    #[test]
    fn partial_toml_overrides_named_fields() {
        let cfg = RunConfig::from_toml_str(
            "[integration]\ndt = 0.1\nseed = 42\n\n[lattice]\nside = 16\n\n[chain]\nepsilon = 0.001\n",
        )
        .expect("parse");
        assert!((cfg.integration.dt - 0.1).abs() < f64::EPSILON);
        assert!((cfg.integration.t_max - 100.0).abs() < f64::EPSILON);
        assert_eq!(cfg.integration.seed, Some(42));
        assert_eq!(cfg.lattice.side, 16);
        assert!((cfg.lattice.beta - 0.01).abs() < f64::EPSILON);
        assert_eq!(cfg.chain.epsilon, Some(0.001));
        assert_eq!(cfg.steps(), 1_000);
    }

    #[test]
    fn malformed_toml_is_config_load_error() {
        let err = RunConfig::from_toml_str("[integration]\ndt = \"fast\"\n");
        assert!(matches!(err, Err(OdeSpringError::ConfigLoad(_))));
    }

    #[test]
    fn missing_file_is_config_load_error() {
        let err = RunConfig::load(Path::new("/nonexistent/odespring.toml"));
        assert!(matches!(err, Err(OdeSpringError::ConfigLoad(_))));
    }

    #[test]
    fn rejects_bad_time_grid() {
        let mut cfg = RunConfig::default();
        cfg.integration.dt = 0.0;
        assert!(matches!(cfg.validate(), Err(OdeSpringError::InvalidConfig(_))));
        cfg.integration.dt = -0.1;
        assert!(cfg.validate().is_err());
        cfg.integration.dt = f64::NAN;
        assert!(cfg.validate().is_err());
        cfg.integration.dt = 0.01;
        cfg.integration.t_max = f64::INFINITY;
        assert!(cfg.validate().is_err());
        cfg.integration.t_max = 0.0;
        cfg.validate().expect("zero horizon is allowed");
    }

    #[test]
    fn rejects_empty_problem() {
        let mut cfg = RunConfig::default();
        cfg.lattice.side = 0;
        let msg = cfg.validate().err().map(|e| e.to_string()).unwrap_or_default();
        assert!(msg.contains("lattice.side"), "{msg}");
    }

    #[test]
    fn rejects_non_finite_parameter() {
        let mut cfg = RunConfig::default();
        cfg.lorenz.sigma = f64::NAN;
        let msg = cfg.validate().err().map(|e| e.to_string()).unwrap_or_default();
        assert!(msg.contains("lorenz.sigma"), "{msg}");
    }
}
