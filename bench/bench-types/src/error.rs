//! Error types for benchmark operations.

use thiserror::Error;

/// Errors that can occur while building, running, or analyzing benchmark runs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BenchError {
    /// A configured contact frame does not exist in the robot model.
    #[error("contact frame not found: {frame}")]
    ContactFrameNotFound {
        /// Name of the missing frame.
        frame: String,
    },

    /// A persisted record does not match the identity it was requested for.
    #[error("configuration mismatch: expected {expected}, found {found}")]
    ConfigurationMismatch {
        /// Identity that was requested.
        expected: String,
        /// Identity stored in the record.
        found: String,
    },

    /// Simulation diverged (non-finite or unbounded velocity).
    #[error("simulation diverged at step {step}: velocity norm {velocity_norm:.1}")]
    DivergedSimulation {
        /// Step index whose velocity tripped the guard.
        step: usize,
        /// 2-norm of the offending velocity (`NaN` if non-finite).
        velocity_norm: f64,
    },

    /// Two scheduled configurations share a name.
    #[error("duplicate configuration name: {name}")]
    DuplicateConfigurationName {
        /// The repeated name.
        name: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// The simulation engine refused to build or drive a simulator.
    #[error("engine error: {reason}")]
    Engine {
        /// Description of the engine failure.
        reason: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Bundle does not start with the expected magic bytes.
    #[error("invalid bundle magic bytes: {0:?}")]
    InvalidBundle([u8; 4]),

    /// Bundle was written by an unsupported format version.
    #[error("unsupported bundle version: {0}")]
    UnsupportedBundleVersion(u32),
}

impl BenchError {
    /// Create a contact frame not found error.
    #[must_use]
    pub fn frame_not_found(frame: impl Into<String>) -> Self {
        Self::ContactFrameNotFound {
            frame: frame.into(),
        }
    }

    /// Create a configuration mismatch error.
    #[must_use]
    pub fn mismatch(expected: impl ToString, found: impl ToString) -> Self {
        Self::ConfigurationMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Create a diverged simulation error.
    #[must_use]
    pub const fn diverged(step: usize, velocity_norm: f64) -> Self {
        Self::DivergedSimulation {
            step,
            velocity_norm,
        }
    }

    /// Create a duplicate configuration name error.
    #[must_use]
    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::DuplicateConfigurationName { name: name.into() }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an engine error.
    #[must_use]
    pub fn engine(reason: impl Into<String>) -> Self {
        Self::Engine {
            reason: reason.into(),
        }
    }

    /// Check if this is a divergence error.
    #[must_use]
    pub fn is_diverged(&self) -> bool {
        matches!(self, Self::DivergedSimulation { .. })
    }

    /// Check if a sweep may continue past this error.
    ///
    /// Only divergence is confined to the run that produced it; every other
    /// error halts the sweep.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.is_diverged()
    }

    /// Check if this is a configuration error.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. }
                | Self::ContactFrameNotFound { .. }
                | Self::ConfigurationMismatch { .. }
        )
    }
}

impl From<std::io::Error> for BenchError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BenchError::frame_not_found("FL_contact");
        assert!(err.to_string().contains("FL_contact"));

        let err = BenchError::diverged(17, 2.5e6);
        assert!(err.to_string().contains("step 17"));

        let err = BenchError::mismatch("solo/trot/0.002/exp", "solo/jump/0.002/exp");
        assert!(err.to_string().contains("solo/jump"));
    }

    #[test]
    fn test_error_predicates() {
        let err = BenchError::diverged(3, f64::NAN);
        assert!(err.is_diverged());
        assert!(err.is_recoverable());
        assert!(!err.is_config_error());

        let err = BenchError::frame_not_found("missing");
        assert!(!err.is_recoverable());
        assert!(err.is_config_error());

        let err = BenchError::duplicate_name("euler    1");
        assert!(!err.is_recoverable());
        assert!(!err.is_config_error());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: BenchError = io.into();
        assert!(matches!(err, BenchError::Io(ref msg) if msg.contains("gone")));
    }
}
