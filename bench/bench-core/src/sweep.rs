//! Enumeration of the configurations to benchmark.

use std::collections::HashSet;
use std::ops::Range;

use bench_types::{
    BenchError, Configuration, EulerSettings, ExponentialSettings, ForwardDynamics, Result,
    TruncationOrder,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Truncation orders swept by default: 0 through 4 multiplications, then none.
pub const DEFAULT_TRUNCATION_ORDERS: [TruncationOrder; 6] = [
    TruncationOrder::Limited(0),
    TruncationOrder::Limited(1),
    TruncationOrder::Limited(2),
    TruncationOrder::Limited(3),
    TruncationOrder::Limited(4),
    TruncationOrder::Unlimited,
];

/// Ranges and knobs of a sweep.
///
/// Sub-step counts are the powers of two inside each half-open range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepBounds {
    /// Sub-step counts of the exponential family.
    pub exponential_ndt: Range<u32>,
    /// Sub-step counts of the Euler family.
    pub euler_ndt: Range<u32>,
    /// Truncation orders crossed with every exponential sub-step count.
    pub truncation_orders: Vec<TruncationOrder>,
    /// Knobs shared by exponential configurations (truncation is overridden).
    /// Defaults to Cholesky forward dynamics.
    #[serde(default = "swept_exponential")]
    pub exponential: ExponentialSettings,
    /// Knobs shared by Euler configurations. Defaults to Cholesky forward
    /// dynamics.
    #[serde(default = "swept_euler")]
    pub euler: EulerSettings,
}

fn swept_exponential() -> ExponentialSettings {
    ExponentialSettings::default().forward_dynamics(ForwardDynamics::Cholesky)
}

fn swept_euler() -> EulerSettings {
    EulerSettings::default().forward_dynamics(ForwardDynamics::Cholesky)
}

impl SweepBounds {
    /// Same sub-step range for both families, default truncation orders, and
    /// Cholesky forward dynamics.
    #[must_use]
    pub fn new(ndt: Range<u32>) -> Self {
        Self {
            exponential_ndt: ndt.clone(),
            euler_ndt: ndt,
            truncation_orders: DEFAULT_TRUNCATION_ORDERS.to_vec(),
            exponential: swept_exponential(),
            euler: swept_euler(),
        }
    }

    /// Bounds derived from the exponential ground truth's sub-step count
    /// `2^k`: exponential exponents `[0, k - 2)`, Euler exponents `[0, k + 1)`.
    ///
    /// # Example
    ///
    /// ```
    /// use bench_core::SweepBounds;
    ///
    /// let bounds = SweepBounds::relative_to_ground_truth(1024);
    /// assert_eq!(bounds.exponential_ndt, 1..256);
    /// assert_eq!(bounds.euler_ndt, 1..2048);
    /// ```
    #[must_use]
    pub fn relative_to_ground_truth(ground_truth_ndt: u32) -> Self {
        let k = ground_truth_ndt.max(1).ilog2();
        let bound = |exponent: u32| 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        Self {
            exponential_ndt: 1..bound(k.saturating_sub(2)),
            euler_ndt: 1..bound(k + 1),
            ..Self::new(1..1)
        }
    }

    /// Restrict the sweep to Euler configurations.
    #[must_use]
    pub fn euler_only(mut self) -> Self {
        self.exponential_ndt = 1..1;
        self
    }

    /// Restrict the sweep to exponential configurations.
    #[must_use]
    pub fn exponential_only(mut self) -> Self {
        self.euler_ndt = 1..1;
        self
    }

    /// Set the truncation orders.
    #[must_use]
    pub fn with_truncation_orders(mut self, orders: impl Into<Vec<TruncationOrder>>) -> Self {
        self.truncation_orders = orders.into();
        self
    }

    /// Set the Euler knobs.
    #[must_use]
    pub fn with_euler(mut self, settings: EulerSettings) -> Self {
        self.euler = settings;
        self
    }

    /// Set the exponential knobs.
    #[must_use]
    pub fn with_exponential(mut self, settings: ExponentialSettings) -> Self {
        self.exponential = settings;
        self
    }
}

/// Powers of two in a half-open range, ascending.
fn powers_of_two(range: &Range<u32>) -> impl Iterator<Item = u32> + '_ {
    (0..u32::BITS)
        .map(|exponent| 1u32 << exponent)
        .skip_while(move |ndt| *ndt < range.start)
        .take_while(move |ndt| *ndt < range.end)
}

/// Produces the ordered list of configurations of a sweep.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepScheduler;

impl SweepScheduler {
    /// Generate the configurations of a sweep.
    ///
    /// Exponential configurations come first, then Euler ones; each block is
    /// ascending by `ndt`, exponential configurations then by truncation
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::DuplicateConfigurationName`] if two
    /// configurations share a name (e.g. a repeated truncation order).
    pub fn generate(bounds: &SweepBounds) -> Result<Vec<Configuration>> {
        let mut orders = bounds.truncation_orders.clone();
        orders.sort();

        let mut configurations = Vec::new();
        for ndt in powers_of_two(&bounds.exponential_ndt) {
            for &order in &orders {
                let settings = bounds.exponential.truncation(order);
                configurations.push(Configuration::exponential(ndt, settings)?);
            }
        }
        for ndt in powers_of_two(&bounds.euler_ndt) {
            configurations.push(Configuration::euler(ndt, bounds.euler)?);
        }

        let mut seen = HashSet::new();
        for configuration in &configurations {
            if !seen.insert(configuration.name()) {
                return Err(BenchError::duplicate_name(configuration.name()));
            }
        }
        debug!(count = configurations.len(), "generated sweep");
        Ok(configurations)
    }
}
