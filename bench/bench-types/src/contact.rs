//! Contact point types.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::{BenchError, Result};

/// Index of a frame in a robot model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameId(pub usize);

impl FrameId {
    /// Create a new frame ID.
    #[must_use]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the raw index.
    #[must_use]
    pub const fn raw(self) -> usize {
        self.0
    }
}

/// Handle to a contact point registered with a simulator.
///
/// Handles are issued in registration order, starting at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContactHandle(pub usize);

impl ContactHandle {
    /// Get the raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// State of one contact point at one time step.
///
/// The anchor is the position a sticking contact is pulled back toward; it is
/// hidden simulator state distinct from the instantaneous position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactPointSample {
    /// Contact force in world coordinates (N).
    pub force: Vector3<f64>,
    /// Current contact point position.
    pub position: Vector3<f64>,
    /// Anchor ("stuck") position.
    pub anchor: Vector3<f64>,
    /// Velocity of the contact point relative to the environment.
    pub relative_velocity: Vector3<f64>,
    /// Whether the contact is sliding on the friction cone boundary.
    pub slipping: bool,
    /// Whether the point is in contact.
    pub active: bool,
}

impl Default for ContactPointSample {
    fn default() -> Self {
        Self::inactive(Vector3::zeros())
    }
}

impl ContactPointSample {
    /// A detached contact point at `position`.
    #[must_use]
    pub fn inactive(position: Vector3<f64>) -> Self {
        Self {
            force: Vector3::zeros(),
            position,
            anchor: position,
            relative_velocity: Vector3::zeros(),
            slipping: false,
            active: false,
        }
    }

    /// Normal (vertical) component of the contact force.
    #[must_use]
    pub fn normal_force(&self) -> f64 {
        self.force.z
    }

    /// Magnitude of the tangential contact force.
    #[must_use]
    pub fn tangential_force(&self) -> f64 {
        self.force.xy().norm()
    }

    /// Whether every vector field is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        [
            &self.force,
            &self.position,
            &self.anchor,
            &self.relative_velocity,
        ]
        .iter()
        .all(|v| v.iter().all(|x| x.is_finite()))
    }
}

/// Compliant contact parameters shared by every contact point.
///
/// Stiffness and damping are 3×3 matrices in world coordinates (tangential
/// x, tangential y, normal z). The friction coefficient bounds the tangential
/// force by `friction * normal_force`.
///
/// # Example
///
/// ```
/// use bench_types::ContactParams;
///
/// let params = ContactParams::isotropic(1e5, 3e2, 0.3);
/// assert!(params.validate().is_ok());
/// assert_eq!(params.stiffness[(2, 2)], 1e5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactParams {
    /// Contact stiffness matrix (N/m).
    pub stiffness: Matrix3<f64>,
    /// Contact damping matrix (N·s/m).
    pub damping: Matrix3<f64>,
    /// Coulomb friction coefficient.
    pub friction: f64,
}

impl Default for ContactParams {
    /// Stiff ground: 1e5 N/m, 3e2 N·s/m, friction 0.3.
    fn default() -> Self {
        Self::isotropic(1e5, 3e2, 0.3)
    }
}

impl ContactParams {
    /// Same stiffness and damping along every axis.
    #[must_use]
    pub fn isotropic(stiffness: f64, damping: f64, friction: f64) -> Self {
        Self {
            stiffness: Matrix3::from_diagonal_element(stiffness),
            damping: Matrix3::from_diagonal_element(damping),
            friction,
        }
    }

    /// Soft ground, useful for coarse control steps.
    #[must_use]
    pub fn soft() -> Self {
        Self::isotropic(1e3, 5e1, 0.5)
    }

    /// Set the friction coefficient.
    #[must_use]
    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    /// Validate the parameters.
    pub fn validate(&self) -> Result<()> {
        if !self.friction.is_finite() || self.friction < 0.0 {
            return Err(BenchError::invalid_config(
                "friction coefficient must be finite and non-negative",
            ));
        }
        for i in 0..3 {
            if self.stiffness[(i, i)] <= 0.0 || !self.stiffness[(i, i)].is_finite() {
                return Err(BenchError::invalid_config(
                    "contact stiffness diagonal must be positive",
                ));
            }
            if self.damping[(i, i)] < 0.0 || !self.damping[(i, i)].is_finite() {
                return Err(BenchError::invalid_config(
                    "contact damping diagonal cannot be negative",
                ));
            }
        }
        Ok(())
    }
}
