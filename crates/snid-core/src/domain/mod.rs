pub mod errors;

pub use errors::{SnidError, SnidErrorCategory, SnidResult};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Identifier for one classifier invocation. Caller-supplied or synthesized;
/// the run directory and the short input name embed it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(String);

static RUN_COUNTER: AtomicU64 = AtomicU64::new(0);

impl RunId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Eight decimal digits mixed from wall clock, process id, and a
    /// process-local counter so concurrent runs get disjoint directories.
    pub fn generate() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.subsec_nanos() as u64)
            .unwrap_or(0);
        let counter = RUN_COUNTER.fetch_add(1, Ordering::Relaxed);
        let seed = nanos
            .wrapping_mul(1_000_003)
            .wrapping_add(std::process::id() as u64)
            .wrapping_add(counter.wrapping_mul(7_919));
        Self(format!("{:08}", seed % 100_000_000))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Options forwarded to the external classifier. Immutable per invocation;
/// out-of-range values pass through untouched, the tool's behavior governs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub wavelength_range: (f64, f64),
    pub phase_range: (f64, f64),
    pub redshift_range: (f64, f64),
    pub forced_redshift: Option<f64>,
    pub median_filter: Option<u32>,
    pub median_fwhm: Option<u32>,
    pub rlap_min: u32,
    pub flux_table_count: u32,
    pub sky_clip: bool,
    pub a_band: bool,
    pub interactive: bool,
    pub plot: bool,
    pub parameter_file: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            wavelength_range: (4_000.0, 8_000.0),
            phase_range: (-20.0, 50.0),
            redshift_range: (-0.01, 0.4),
            forced_redshift: None,
            median_filter: Some(20),
            median_fwhm: None,
            rlap_min: 2,
            flux_table_count: 30,
            sky_clip: false,
            a_band: false,
            interactive: false,
            plot: false,
            parameter_file: None,
        }
    }
}

impl RunConfig {
    /// Narrow the phase window to `phase +/- delta`.
    pub fn with_phase_window(mut self, phase: f64, delta: f64) -> Self {
        self.phase_range = (phase - delta, phase + delta);
        self
    }

    /// Force the redshift and, when `delta` is given, narrow the search
    /// window to `redshift +/- delta`.
    pub fn with_forced_redshift(mut self, redshift: f64, delta: Option<f64>) -> Self {
        self.forced_redshift = Some(redshift);
        if let Some(delta) = delta {
            self.redshift_range = (redshift - delta, redshift + delta);
        }
        self
    }
}

/// How a batch of independent runs is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DispatchMode {
    /// Return the prepared jobs without invoking them.
    Deferred,
    /// Evaluate every job on the local worker pool.
    #[default]
    Compute,
    /// Evaluate, then load each persisted result back into a reader.
    Gather,
}

impl DispatchMode {
    pub const ACCEPTED: [DispatchMode; 3] = [Self::Deferred, Self::Compute, Self::Gather];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deferred => "deferred",
            Self::Compute => "compute",
            Self::Gather => "gather",
        }
    }
}

impl Display for DispatchMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl FromStr for DispatchMode {
    type Err = SnidError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "deferred" => Ok(Self::Deferred),
            "compute" => Ok(Self::Compute),
            "gather" => Ok(Self::Gather),
            other => Err(SnidError::usage(
                "INPUT.DISPATCH_MODE",
                format!("dispatch mode can only be 'deferred', 'compute', or 'gather': '{other}' given"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DispatchMode, RunConfig, RunId};
    use std::str::FromStr;

    #[test]
    fn generated_run_ids_are_eight_digits_and_distinct() {
        let first = RunId::generate();
        let second = RunId::generate();

        assert_eq!(first.as_str().len(), 8);
        assert!(first.as_str().chars().all(|c| c.is_ascii_digit()));
        assert_ne!(first, second);
    }

    #[test]
    fn default_config_matches_tool_defaults() {
        let config = RunConfig::default();

        assert_eq!(config.wavelength_range, (4_000.0, 8_000.0));
        assert_eq!(config.phase_range, (-20.0, 50.0));
        assert_eq!(config.redshift_range, (-0.01, 0.4));
        assert_eq!(config.median_filter, Some(20));
        assert_eq!(config.median_fwhm, None);
        assert_eq!(config.rlap_min, 2);
        assert_eq!(config.flux_table_count, 30);
        assert!(!config.sky_clip && !config.a_band && !config.interactive && !config.plot);
    }

    #[test]
    fn phase_and_redshift_windows_center_on_the_given_value() {
        let config = RunConfig::default()
            .with_phase_window(3.0, 5.0)
            .with_forced_redshift(0.05, Some(0.01));

        assert_eq!(config.phase_range, (-2.0, 8.0));
        assert_eq!(config.forced_redshift, Some(0.05));
        assert!((config.redshift_range.0 - 0.04).abs() < 1.0e-12);
        assert!((config.redshift_range.1 - 0.06).abs() < 1.0e-12);
    }

    #[test]
    fn forced_redshift_without_delta_keeps_the_search_window() {
        let config = RunConfig::default().with_forced_redshift(0.1, None);

        assert_eq!(config.forced_redshift, Some(0.1));
        assert_eq!(config.redshift_range, (-0.01, 0.4));
    }

    #[test]
    fn dispatch_mode_parses_the_three_accepted_tokens() {
        assert_eq!(
            DispatchMode::from_str("deferred").expect("deferred should parse"),
            DispatchMode::Deferred
        );
        assert_eq!(
            DispatchMode::from_str("compute").expect("compute should parse"),
            DispatchMode::Compute
        );
        assert_eq!(
            DispatchMode::from_str("gather").expect("gather should parse"),
            DispatchMode::Gather
        );
    }

    #[test]
    fn unknown_dispatch_mode_names_the_value_and_the_accepted_set() {
        let error = DispatchMode::from_str("eager").expect_err("unknown mode should fail");

        assert_eq!(error.placeholder(), "INPUT.DISPATCH_MODE");
        assert!(error.message().contains("'eager'"));
        for accepted in DispatchMode::ACCEPTED {
            assert!(error.message().contains(accepted.as_str()));
        }
    }
}
