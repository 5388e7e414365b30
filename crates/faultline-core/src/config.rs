//! Engine configuration and warn-and-fall-back validation.

use chrono::{Duration, Months, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Optimization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Genetic,
    Greedy,
}

/// Granularity of the sliding time window. `No` disables slicing and
/// aggregates a single network pair over the whole statement range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    No,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl TimeWindow {
    /// Advances a timestamp by `steps` units of this granularity.
    ///
    /// Calendar units (months, years) follow calendar arithmetic; the
    /// remaining units are fixed durations.
    pub fn advance(&self, t: NaiveDateTime, steps: u32) -> NaiveDateTime {
        match self {
            TimeWindow::No => t,
            TimeWindow::Minutes => t + Duration::minutes(steps as i64),
            TimeWindow::Hours => t + Duration::hours(steps as i64),
            TimeWindow::Days => t + Duration::days(steps as i64),
            TimeWindow::Weeks => t + Duration::weeks(steps as i64),
            TimeWindow::Months => t
                .checked_add_months(Months::new(steps))
                .unwrap_or(NaiveDateTime::MAX),
            TimeWindow::Years => t
                .checked_add_months(Months::new(12 * steps))
                .unwrap_or(NaiveDateTime::MAX),
        }
    }

    /// Moves a timestamp back by `steps` units of this granularity.
    pub fn retreat(&self, t: NaiveDateTime, steps: u32) -> NaiveDateTime {
        match self {
            TimeWindow::No => t,
            TimeWindow::Minutes => t - Duration::minutes(steps as i64),
            TimeWindow::Hours => t - Duration::hours(steps as i64),
            TimeWindow::Days => t - Duration::days(steps as i64),
            TimeWindow::Weeks => t - Duration::weeks(steps as i64),
            TimeWindow::Months => t
                .checked_sub_months(Months::new(steps))
                .unwrap_or(NaiveDateTime::MIN),
            TimeWindow::Years => t
                .checked_sub_months(Months::new(12 * steps))
                .unwrap_or(NaiveDateTime::MIN),
        }
    }

    /// Nominal length of one unit in seconds, used to normalize kernel
    /// offsets (calendar units use their mean length).
    pub fn nominal_seconds(&self) -> f64 {
        match self {
            TimeWindow::No => 1.0,
            TimeWindow::Minutes => 60.0,
            TimeWindow::Hours => 3_600.0,
            TimeWindow::Days => 86_400.0,
            TimeWindow::Weeks => 604_800.0,
            TimeWindow::Months => 2_629_746.0,
            TimeWindow::Years => 31_556_952.0,
        }
    }
}

/// Kernel weight function for time smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kernel {
    Uniform,
    Triangular,
    Epanechnikov,
    Gaussian,
}

impl Kernel {
    /// Kernel weight for an offset `u` normalized by the half-window
    /// (`u = 0` at the midpoint, `|u| = 1` at the window edge).
    ///
    /// The bounded kernels have support `|u| <= 1`; the gaussian extends
    /// over the whole range with the half-window as its standard deviation.
    pub fn weight(&self, u: f64) -> f64 {
        match self {
            Kernel::Uniform => {
                if u.abs() <= 1.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Kernel::Triangular => (1.0 - u.abs()).max(0.0),
            Kernel::Epanechnikov => {
                if u.abs() <= 1.0 {
                    0.75 * (1.0 - u * u)
                } else {
                    0.0
                }
            }
            Kernel::Gaussian => (-0.5 * u * u).exp(),
        }
    }
}

/// Full configuration of a polarization run.
///
/// Out-of-range numeric parameters are not rejected: [`sanitize`] logs a
/// warning and substitutes the documented default, so a run always proceeds.
///
/// [`sanitize`]: PolarizationConfig::sanitize
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolarizationConfig {
    /// Optimization strategy
    #[serde(default = "default_algorithm")]
    pub algorithm: Algorithm,

    /// Number of clusters K (usually 2 for bipolarization)
    #[serde(default = "default_num_clusters")]
    pub num_clusters: usize,

    /// Number of parent solutions P for the genetic algorithm
    #[serde(default = "default_num_parents")]
    pub num_parents: usize,

    /// Maximum number of genetic iterations if no convergence
    #[serde(default = "default_num_iterations")]
    pub num_iterations: usize,

    /// Share of elite solutions retained per generation, in [0, 1]
    #[serde(default = "default_elite_share")]
    pub elite_share: f64,

    /// Share of membership pair-swaps mutated per child, in [0, 1]
    #[serde(default = "default_mutation_share")]
    pub mutation_share: f64,

    /// Granularity of the sliding window
    #[serde(default = "default_time_window")]
    pub time_window: TimeWindow,

    /// Window size in units of `time_window`; even, and 0 iff no window
    #[serde(default)]
    pub window_size: u32,

    /// Kernel weight function for smoothing
    #[serde(default = "default_kernel")]
    pub kernel: Kernel,

    /// Shift the slicing range inward by half a window on both ends
    #[serde(default)]
    pub indent_time: bool,

    /// Divide quality scores by their theoretical maximum
    #[serde(default)]
    pub normalize_scores: bool,

    /// Master RNG seed; 0 draws a nondeterministic seed
    #[serde(default)]
    pub random_seed: u64,

    /// Lower bound of the analyzed time range (defaults to the first statement)
    #[serde(default)]
    pub start: Option<NaiveDateTime>,

    /// Upper bound of the analyzed time range (defaults to the last statement)
    #[serde(default)]
    pub stop: Option<NaiveDateTime>,

    /// First variable (the node class of the networks)
    pub variable1: String,

    /// Whether `variable1` is a document-level attribute
    #[serde(default)]
    pub variable1_document: bool,

    /// Second variable (the one-mode projection runs over its labels)
    pub variable2: String,

    /// Whether `variable2` is a document-level attribute
    #[serde(default)]
    pub variable2_document: bool,

    /// Optional qualifier variable
    #[serde(default)]
    pub qualifier: Option<String>,

    /// Whether the qualifier is a document-level attribute
    #[serde(default)]
    pub qualifier_document: bool,
}

fn default_algorithm() -> Algorithm {
    Algorithm::Greedy
}

fn default_num_clusters() -> usize {
    2
}

fn default_num_parents() -> usize {
    50
}

fn default_num_iterations() -> usize {
    1000
}

fn default_elite_share() -> f64 {
    0.1
}

fn default_mutation_share() -> f64 {
    0.1
}

fn default_time_window() -> TimeWindow {
    TimeWindow::No
}

fn default_kernel() -> Kernel {
    Kernel::Uniform
}

impl PolarizationConfig {
    /// A minimal configuration over two statement-level variables, using
    /// defaults for everything else.
    pub fn new(variable1: impl Into<String>, variable2: impl Into<String>) -> Self {
        Self {
            algorithm: default_algorithm(),
            num_clusters: default_num_clusters(),
            num_parents: default_num_parents(),
            num_iterations: default_num_iterations(),
            elite_share: default_elite_share(),
            mutation_share: default_mutation_share(),
            time_window: default_time_window(),
            window_size: 0,
            kernel: default_kernel(),
            indent_time: false,
            normalize_scores: false,
            random_seed: 0,
            start: None,
            stop: None,
            variable1: variable1.into(),
            variable1_document: false,
            variable2: variable2.into(),
            variable2_document: false,
            qualifier: None,
            qualifier_document: false,
        }
    }

    /// Validates the configuration, replacing out-of-range parameters with
    /// their defaults. Each substitution is logged as a warning; this never
    /// fails.
    pub fn sanitize(mut self) -> Self {
        if self.num_clusters <= 1 {
            log::warn!(
                "Invalid number of clusters: {} (must be greater than 1); using 2 instead",
                self.num_clusters
            );
            self.num_clusters = default_num_clusters();
        }
        if self.num_parents == 0 {
            log::warn!("Invalid number of parent solutions: 0 (must be positive); using 50 instead");
            self.num_parents = default_num_parents();
        }
        if self.num_iterations == 0 {
            log::warn!("Invalid number of iterations: 0 (must be positive); using 1000 instead");
            self.num_iterations = default_num_iterations();
        }
        if !(0.0..=1.0).contains(&self.elite_share) {
            log::warn!(
                "Invalid elite share: {} (must be between 0 and 1); using 0.1 instead",
                self.elite_share
            );
            self.elite_share = default_elite_share();
        }
        if !(0.0..=1.0).contains(&self.mutation_share) {
            log::warn!(
                "Invalid mutation share: {} (must be between 0 and 1); using 0.1 instead",
                self.mutation_share
            );
            self.mutation_share = default_mutation_share();
        }
        if self.time_window == TimeWindow::No {
            if self.window_size != 0 {
                log::warn!(
                    "Window size must be 0 because no time window is used; setting it to 0"
                );
                self.window_size = 0;
            }
        } else if self.window_size == 0 {
            log::warn!("Invalid window size: 0 (must be positive); using 10 instead");
            self.window_size = 10;
        } else if self.window_size % 2 != 0 {
            // only even sizes keep the midpoint offsets on whole units
            log::warn!(
                "Invalid window size: {} (must be even); using {} instead",
                self.window_size,
                self.window_size + 1
            );
            self.window_size += 1;
        }
        self
    }
}
