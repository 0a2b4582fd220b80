//! Startup latency checks
//!
//! Guards against regressions in how long it takes to bring the library up.
//! Crossing the soft threshold emits a CI warning annotation, crossing the
//! hard threshold is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::warn;

/// Soft and hard startup thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartupThresholds {
    /// Warn above this many seconds
    #[serde(default = "default_warn_secs")]
    pub warn_secs: f64,

    /// Fail above this many seconds
    #[serde(default = "default_error_secs")]
    pub error_secs: f64,
}

impl Default for StartupThresholds {
    fn default() -> Self {
        Self {
            warn_secs: default_warn_secs(),
            error_secs: default_error_secs(),
        }
    }
}

/// Outcome of a startup check that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum StartupCheck {
    Ok,
    /// Above the soft threshold; carries the reported message
    Warned(String),
}

impl StartupCheck {
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warned(_))
    }
}

impl StartupThresholds {
    pub fn new(warn: Duration, error: Duration) -> Result<Self> {
        let thresholds = Self {
            warn_secs: warn.as_secs_f64(),
            error_secs: error.as_secs_f64(),
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Both thresholds must be finite, non-negative, and ordered
    pub fn validate(&self) -> Result<()> {
        self.warn()?;
        self.error()?;
        if self.warn_secs > self.error_secs {
            return Err(Error::config(format!(
                "startup warn_secs ({}) exceeds error_secs ({})",
                self.warn_secs, self.error_secs
            )));
        }
        Ok(())
    }

    pub fn warn(&self) -> Result<Duration> {
        threshold_duration("warn_secs", self.warn_secs)
    }

    pub fn error(&self) -> Result<Duration> {
        threshold_duration("error_secs", self.error_secs)
    }

    /// Check an elapsed duration, writing a `::warning::` annotation to
    /// `sink` when the soft threshold is crossed.
    pub fn check<W: Write>(&self, label: &str, elapsed: Duration, sink: &mut W) -> Result<StartupCheck> {
        self.validate()?;
        let message = format!("`{}` took {:.6} seconds", label, elapsed.as_secs_f64());

        if elapsed > self.error()? {
            return Err(Error::StartupTooSlow(message));
        }

        if elapsed > self.warn()? {
            // Format understood by GitHub Actions workflow commands
            writeln!(sink, "\n::warning::{}\n", message)?;
            warn!("{}", message);
            return Ok(StartupCheck::Warned(message));
        }

        Ok(StartupCheck::Ok)
    }

    /// Time `f` and check the result, annotating to stdout
    pub fn measure<T>(&self, label: &str, f: impl FnOnce() -> T) -> Result<(T, StartupCheck)> {
        let start = Instant::now();
        let value = f();
        let elapsed = start.elapsed();

        let stdout = std::io::stdout();
        let check = self.check(label, elapsed, &mut stdout.lock())?;
        Ok((value, check))
    }
}

fn threshold_duration(name: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|e| Error::config(format!("startup {} ({}) is not a valid duration: {}", name, secs, e)))
}

fn default_warn_secs() -> f64 {
    1.75
}

fn default_error_secs() -> f64 {
    5.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_startup_is_ok() {
        let mut out = Vec::new();
        let check = StartupThresholds::default()
            .check("init", Duration::from_millis(200), &mut out)
            .unwrap();

        assert_eq!(check, StartupCheck::Ok);
        assert!(out.is_empty());
    }

    #[test]
    fn test_between_thresholds_warns() {
        let mut out = Vec::new();
        let check = StartupThresholds::default()
            .check("init", Duration::from_secs_f64(2.0), &mut out)
            .unwrap();

        assert!(check.is_warning());
        let annotation = String::from_utf8(out).unwrap();
        assert!(annotation.contains("::warning::`init` took 2.000000 seconds"));
    }

    #[test]
    fn test_above_error_threshold_fails() {
        let mut out = Vec::new();
        let err = StartupThresholds::default()
            .check("init", Duration::from_secs(6), &mut out)
            .unwrap_err();

        assert!(matches!(err, Error::StartupTooSlow(_)));
        assert!(err.to_string().contains("6.000000 seconds"));
        assert!(out.is_empty());
    }

    #[test]
    fn test_thresholds_must_be_ordered() {
        assert!(StartupThresholds::new(Duration::from_secs(5), Duration::from_secs(1)).is_err());
        let t = StartupThresholds::new(Duration::from_secs(1), Duration::from_secs(2)).unwrap();
        assert_eq!(t.error().unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn test_negative_or_non_finite_thresholds_rejected() {
        for (warn_secs, error_secs) in [(-1.0, 5.0), (1.0, f64::NAN), (f64::INFINITY, f64::INFINITY)] {
            let thresholds = StartupThresholds { warn_secs, error_secs };
            assert!(matches!(thresholds.validate(), Err(Error::Config(_))));

            let mut out = Vec::new();
            let result = thresholds.check("init", Duration::from_secs(1), &mut out);
            assert!(matches!(result, Err(Error::Config(_))));
            assert!(out.is_empty());
        }
    }

    #[test]
    fn test_measure_returns_value() {
        let (value, check) = StartupThresholds::default().measure("noop", || 42).unwrap();
        assert_eq!(value, 42);
        assert_eq!(check, StartupCheck::Ok);
    }
}
