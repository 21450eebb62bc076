//! Integrator configurations.
//!
//! A [`Configuration`] names one experiment variant: which integrator family
//! runs, how many sub-steps it takes per control step, and the knobs that only
//! make sense for that family. The knobs live in [`IntegratorSettings`], one
//! variant per family, so an exponential run can never carry a semi-implicit
//! flag and an Euler run can never carry a truncation order.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{BenchError, Result};

/// Integrator family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IntegratorFamily {
    /// Exponential integrator (matrix exponential of the linearized contact dynamics).
    Exponential,
    /// Explicit Euler integrator.
    ExplicitEuler,
}

impl IntegratorFamily {
    /// Both families, in the order ground truths are produced.
    pub const ALL: [Self; 2] = [Self::Exponential, Self::ExplicitEuler];

    /// Short key used in file names and result names.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Exponential => "exp",
            Self::ExplicitEuler => "euler",
        }
    }

    /// Name under which this family's ground truth is stored.
    #[must_use]
    pub const fn ground_truth_name(self) -> &'static str {
        match self {
            Self::Exponential => "ground-truth-exp",
            Self::ExplicitEuler => "ground-truth-euler",
        }
    }
}

impl fmt::Display for IntegratorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exponential => write!(f, "Exponential"),
            Self::ExplicitEuler => write!(f, "Explicit Euler"),
        }
    }
}

/// How the engine solves forward dynamics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ForwardDynamics {
    /// Explicit inverse of the mass matrix.
    #[default]
    MassInverse,
    /// Articulated body algorithm.
    Aba,
    /// Cholesky factorization of the mass matrix.
    Cholesky,
}

/// Truncation order of the matrix-exponential series.
///
/// Bounds the number of matrix multiplications the exponential integrator may
/// spend per sub-step. `Limited(n)` values order ascending by `n`, and
/// `Unlimited` orders after every limited value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TruncationOrder {
    /// At most this many matrix multiplications.
    Limited(u32),
    /// No bound; the engine picks the accuracy-driven count.
    Unlimited,
}

impl TruncationOrder {
    /// The multiplication budget, or `None` when unbounded.
    #[must_use]
    pub const fn max_multiplications(self) -> Option<u32> {
        match self {
            Self::Limited(n) => Some(n),
            Self::Unlimited => None,
        }
    }
}

impl Default for TruncationOrder {
    /// 100 multiplications, which no practical sub-step exhausts.
    fn default() -> Self {
        Self::Limited(100)
    }
}

impl fmt::Display for TruncationOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited(n) => f.pad(&n.to_string()),
            Self::Unlimited => f.pad("inf"),
        }
    }
}

/// Knobs of the exponential family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExponentialSettings {
    /// Truncation order of the matrix-exponential series.
    pub truncation: TruncationOrder,
    /// Forward dynamics method.
    pub forward_dynamics: ForwardDynamics,
    /// Whether the matrix is balanced before exponentiation.
    pub use_balancing: bool,
}

impl Default for ExponentialSettings {
    /// Mass-matrix inverse, 100-multiplication budget, balancing on.
    fn default() -> Self {
        Self {
            truncation: TruncationOrder::default(),
            forward_dynamics: ForwardDynamics::MassInverse,
            use_balancing: true,
        }
    }
}

impl ExponentialSettings {
    /// Set the truncation order.
    #[must_use]
    pub const fn truncation(mut self, truncation: TruncationOrder) -> Self {
        self.truncation = truncation;
        self
    }

    /// Set the forward dynamics method.
    #[must_use]
    pub const fn forward_dynamics(mut self, method: ForwardDynamics) -> Self {
        self.forward_dynamics = method;
        self
    }

    /// Enable or disable balancing.
    #[must_use]
    pub const fn balancing(mut self, enable: bool) -> Self {
        self.use_balancing = enable;
        self
    }
}

/// Knobs of the Euler family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EulerSettings {
    /// Semi-implicit (symplectic) update instead of the explicit one.
    pub semi_implicit: bool,
    /// Forward dynamics method.
    pub forward_dynamics: ForwardDynamics,
}

impl EulerSettings {
    /// Use the semi-implicit update.
    #[must_use]
    pub const fn semi_implicit(mut self, enable: bool) -> Self {
        self.semi_implicit = enable;
        self
    }

    /// Set the forward dynamics method.
    #[must_use]
    pub const fn forward_dynamics(mut self, method: ForwardDynamics) -> Self {
        self.forward_dynamics = method;
        self
    }
}

/// Family-specific integrator knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntegratorSettings {
    /// Exponential family.
    Exponential(ExponentialSettings),
    /// Euler family.
    Euler(EulerSettings),
}

impl IntegratorSettings {
    /// The family these settings belong to.
    #[must_use]
    pub const fn family(&self) -> IntegratorFamily {
        match self {
            Self::Exponential(_) => IntegratorFamily::Exponential,
            Self::Euler(_) => IntegratorFamily::ExplicitEuler,
        }
    }

    /// Default settings for a family.
    #[must_use]
    pub fn default_for(family: IntegratorFamily) -> Self {
        match family {
            IntegratorFamily::Exponential => Self::Exponential(ExponentialSettings::default()),
            IntegratorFamily::ExplicitEuler => Self::Euler(EulerSettings::default()),
        }
    }
}

/// One experiment variant.
///
/// # Example
///
/// ```
/// use bench_types::{Configuration, ExponentialSettings, IntegratorFamily, TruncationOrder};
///
/// let config = Configuration::exponential(
///     8,
///     ExponentialSettings::default().truncation(TruncationOrder::Limited(2)),
/// )
/// .unwrap();
///
/// assert_eq!(config.family(), IntegratorFamily::Exponential);
/// assert_eq!(config.ndt(), 8);
/// assert_eq!(config.name(), "exp    8 mmm   2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Configuration {
    name: String,
    method: String,
    ndt: u32,
    settings: IntegratorSettings,
}

impl Configuration {
    /// Create a configuration with explicit names.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::InvalidConfig`] if `ndt` is zero or a name is empty.
    pub fn new(
        name: impl Into<String>,
        method: impl Into<String>,
        ndt: u32,
        settings: IntegratorSettings,
    ) -> Result<Self> {
        let config = Self {
            name: name.into(),
            method: method.into(),
            ndt,
            settings,
        };
        config.validate()?;
        Ok(config)
    }

    /// Exponential configuration named after its sub-step count and truncation order.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::InvalidConfig`] if `ndt` is zero.
    pub fn exponential(ndt: u32, settings: ExponentialSettings) -> Result<Self> {
        let order = settings.truncation;
        Self::new(
            format!("exp {ndt:4} mmm {order:>3}"),
            format!("exp mmm {order:>3}"),
            ndt,
            IntegratorSettings::Exponential(settings),
        )
    }

    /// Euler configuration named after its sub-step count.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::InvalidConfig`] if `ndt` is zero.
    pub fn euler(ndt: u32, settings: EulerSettings) -> Result<Self> {
        let method = if settings.semi_implicit {
            "euler semi"
        } else {
            "euler"
        };
        Self::new(
            format!("{method} {ndt:4}"),
            method,
            ndt,
            IntegratorSettings::Euler(settings),
        )
    }

    /// Ground-truth configuration of a family at the given sub-step count.
    ///
    /// Uses the family's default knobs.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::InvalidConfig`] if `ndt` is zero.
    pub fn ground_truth(family: IntegratorFamily, ndt: u32) -> Result<Self> {
        let name = family.ground_truth_name();
        Self::new(name, name, ndt, IntegratorSettings::default_for(family))
    }

    /// Rename the configuration.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.ndt == 0 {
            return Err(BenchError::invalid_config(format!(
                "{}: ndt must be a positive integer",
                self.name
            )));
        }
        if self.name.trim().is_empty() {
            return Err(BenchError::invalid_config("configuration name is empty"));
        }
        Ok(())
    }

    /// Display name; unique within a session.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Series name shared by configurations that differ only in `ndt`.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Sub-steps per control step.
    #[must_use]
    pub const fn ndt(&self) -> u32 {
        self.ndt
    }

    /// Family-specific knobs.
    #[must_use]
    pub const fn settings(&self) -> &IntegratorSettings {
        &self.settings
    }

    /// Integrator family.
    #[must_use]
    pub const fn family(&self) -> IntegratorFamily {
        self.settings.family()
    }

    /// Truncation order, for exponential configurations.
    #[must_use]
    pub const fn truncation(&self) -> Option<TruncationOrder> {
        match self.settings {
            IntegratorSettings::Exponential(s) => Some(s.truncation),
            IntegratorSettings::Euler(_) => None,
        }
    }

    /// Sub-step duration for a control step of `dt` seconds.
    #[must_use]
    pub fn sub_step(&self, dt: f64) -> f64 {
        dt / f64::from(self.ndt)
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, ndt={})", self.name, self.family(), self.ndt)
    }
}
