// SPDX-License-Identifier: AGPL-3.0-only

//! Pass/fail harness for validation binaries.
//!
//! A binary records explicit checks against the bounds in
//! [`crate::tolerances`], prints one line per check, and exits with 0 when
//! every check passed or 1 otherwise.

use crate::report::RunReport;
use std::fmt::Write as _;
use std::process;

/// One recorded check.
#[derive(Debug, Clone)]
pub struct Check {
    pub label: String,
    pub passed: bool,
    pub observed: f64,
    pub expected: f64,
    pub tolerance: f64,
    pub mode: ToleranceMode,
}

/// How a tolerance is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToleranceMode {
    /// |observed − expected| < tolerance
    Absolute,
    /// |observed − expected| / |expected| < tolerance
    Relative,
    /// observed < threshold
    UpperBound,
    /// observed > threshold
    LowerBound,
    /// Boolean outcome.
    Flag,
}

impl std::fmt::Display for ToleranceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Absolute => "abs",
            Self::Relative => "rel",
            Self::UpperBound => "<",
            Self::LowerBound => ">",
            Self::Flag => "flag",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Default)]
#[must_use]
pub struct ValidationHarness {
    pub name: String,
    pub checks: Vec<Check>,
}

impl ValidationHarness {
    #[must_use = "validation harness must be used to run checks"]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            checks: Vec::new(),
        }
    }

    fn push(&mut self, label: &str, passed: bool, observed: f64, expected: f64, tolerance: f64, mode: ToleranceMode) {
        if !passed {
            log::warn!("{}: check '{label}' failed (observed={observed:e}, expected={expected:e})", self.name);
        }
        self.checks.push(Check {
            label: label.to_string(),
            passed,
            observed,
            expected,
            tolerance,
            mode,
        });
    }

    pub fn check_abs(&mut self, label: &str, observed: f64, expected: f64, tolerance: f64) {
        let passed = (observed - expected).abs() < tolerance;
        self.push(label, passed, observed, expected, tolerance, ToleranceMode::Absolute);
    }

    /// Relative check; falls back to absolute for an expected value near zero.
    pub fn check_rel(&mut self, label: &str, observed: f64, expected: f64, tolerance: f64) {
        let passed = if expected.abs() > crate::tolerances::NEAR_ZERO_EXPECTED {
            ((observed - expected) / expected).abs() < tolerance
        } else {
            observed.abs() < tolerance
        };
        self.push(label, passed, observed, expected, tolerance, ToleranceMode::Relative);
    }

    pub fn check_upper(&mut self, label: &str, observed: f64, threshold: f64) {
        self.push(label, observed < threshold, observed, threshold, threshold, ToleranceMode::UpperBound);
    }

    pub fn check_lower(&mut self, label: &str, observed: f64, threshold: f64) {
        self.push(label, observed > threshold, observed, threshold, threshold, ToleranceMode::LowerBound);
    }

    pub fn check_bool(&mut self, label: &str, passed: bool) {
        self.push(label, passed, f64::from(u8::from(passed)), 1.0, 0.0, ToleranceMode::Flag);
    }

    /// Compare the reported values of two runs of the same problem.
    pub fn check_reports(&mut self, candidate: &RunReport, reference: &RunReport, tolerance: f64) {
        let label = format!(
            "{} {} vs {}",
            candidate.problem, candidate.backend, reference.backend
        );
        self.check_bool(&format!("{label}: step count"), candidate.steps == reference.steps);
        self.check_abs(&label, candidate.value, reference.value, tolerance);
    }

    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    #[must_use]
    pub const fn total_count(&self) -> usize {
        self.checks.len()
    }

    /// Vacuously true with no checks.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.all_passed())
    }

    /// Header line plus one line per check.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(
            s,
            "═══ {} validation: {}/{} checks passed ═══",
            self.name,
            self.passed_count(),
            self.total_count()
        );
        for check in &self.checks {
            let icon = if check.passed { "✓" } else { "✗" };
            let _ = writeln!(
                s,
                "  {icon} {}: observed={:.6e}, expected={:.6e}, tol={:.2e} ({})",
                check.label, check.observed, check.expected, check.tolerance, check.mode
            );
        }
        s
    }

    /// Print the summary and exit with [`Self::exit_code`].
    pub fn finish(&self) -> ! {
        println!();
        print!("{}", self.summary());
        if self.all_passed() {
            println!("ALL CHECKS PASSED");
        } else {
            let failed: Vec<&str> = self
                .checks
                .iter()
                .filter(|c| !c.passed)
                .map(|c| c.label.as_str())
                .collect();
            println!("FAILED CHECKS: {}", failed.join(", "));
        }
        process::exit(self.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problems::Backend;

    fn report(backend: Backend, value: f64, steps: usize) -> RunReport {
        let mut r = RunReport::new("damped_oscillator", backend, 4);
        r.value = value;
        r.steps = steps;
        r
    }

    #[test]
    fn tracks_pass_and_fail() {
        let mut h = ValidationHarness::new("test");
        h.check_abs("exact", 1.0, 1.0, 1e-10);
        h.check_abs("close", 1.0001, 1.0, 1e-3);
        h.check_abs("far", 2.0, 1.0, 1e-3);
        assert_eq!(h.passed_count(), 2);
        assert_eq!(h.total_count(), 3);
        assert!(!h.all_passed());
        assert_eq!(h.exit_code(), 1);
    }

    #[test]
    fn empty_harness_passes() {
        let h = ValidationHarness::new("empty");
        assert!(h.all_passed());
        assert_eq!(h.exit_code(), 0);
    }

    #[test]
    fn relative_check_near_zero_is_absolute() {
        let mut h = ValidationHarness::new("test");
        h.check_rel("zero", 1e-15, 0.0, 1e-10);
        h.check_rel("wrong_sign", 16.0, -16.0, 0.1);
        assert!(h.checks[0].passed);
        assert!(!h.checks[1].passed);
    }

    #[test]
    fn bounds_are_strict() {
        let mut h = ValidationHarness::new("test");
        h.check_upper("at_upper", 1.0, 1.0);
        h.check_lower("above_lower", -15.0, -20.0);
        assert!(!h.checks[0].passed);
        assert!(h.checks[1].passed);
    }

    #[test]
    fn report_pair_checks_steps_and_value() {
        let mut h = ValidationHarness::new("parity");
        h.check_reports(&report(Backend::Gpu, 0.5, 100), &report(Backend::Host, 0.5, 100), 1e-6);
        assert_eq!(h.total_count(), 2);
        assert!(h.all_passed());

        h.check_reports(&report(Backend::Gpu, 0.5, 99), &report(Backend::Host, 0.6, 100), 1e-6);
        assert_eq!(h.passed_count(), 2);
        assert!(h.checks[2].label.contains("gpu vs host"));
    }

    #[test]
    fn summary_lists_every_check() {
        let mut h = ValidationHarness::new("my_validation");
        h.check_abs("a", 1.0, 1.0, 1e-10);
        h.check_bool("b", false);
        let s = h.summary();
        assert!(s.contains("my_validation"));
        assert!(s.contains("1/2"));
        assert!(s.contains("✓ a"));
        assert!(s.contains("✗ b"));
        assert!(s.contains("(flag)"));
    }
}
