//! Compliant ground contact with anchor points.
//!
//! Each contact point is attached to the ground through a spring-damper whose
//! rest position is the contact's *anchor*:
//!
//! ```text
//! f = K (anchor - p) - B ṗ
//! ```
//!
//! The anchor is set where the point first touches the ground (`z ≤ 0`). When
//! the tangential force leaves the friction cone `‖f_t‖ ≤ μ f_n`, the force is
//! projected onto the cone boundary and the anchor slides so the spring agrees
//! with the projected force; the point is then *slipping*. Unilateral contacts
//! never pull (`f_n < 0` is clipped to zero).

use bench_types::{ContactParams, ContactPointSample, FrameId, Vector3};
use nalgebra::{Matrix2, Vector2};

/// One contact point owned by a simulator.
#[derive(Debug, Clone)]
pub(crate) struct ContactState {
    pub(crate) frame_name: String,
    pub(crate) frame_id: FrameId,
    /// Position of the frame relative to the body origin.
    pub(crate) offset: Vector3<f64>,
    pub(crate) unilateral: bool,
    pub(crate) sample: ContactPointSample,
}

impl ContactState {
    pub(crate) fn new(
        frame_name: &str,
        frame_id: FrameId,
        offset: Vector3<f64>,
        unilateral: bool,
    ) -> Self {
        Self {
            frame_name: frame_name.to_owned(),
            frame_id,
            offset,
            unilateral,
            sample: ContactPointSample::inactive(offset),
        }
    }

    /// Detach from the ground, forgetting the anchor.
    pub(crate) fn detach(&mut self) {
        self.sample.active = false;
        self.sample.slipping = false;
        self.sample.force = Vector3::zeros();
    }

    /// Whether the spring law is currently linear (sticking and pushing).
    pub(crate) fn is_sticking(&self) -> bool {
        self.sample.active
            && !self.sample.slipping
            && (!self.unilateral || self.sample.force.z > 0.0)
    }

    /// Update kinematics, contact detection, and force for a body state.
    pub(crate) fn update(
        &mut self,
        body_position: &Vector3<f64>,
        body_velocity: &Vector3<f64>,
        params: &ContactParams,
    ) {
        let position = body_position + self.offset;
        self.sample.position = position;
        self.sample.relative_velocity = *body_velocity;

        if position.z > 0.0 {
            self.detach();
            self.sample.anchor = position;
            return;
        }
        if !self.sample.active {
            self.sample.active = true;
            self.sample.slipping = false;
            self.sample.anchor = Vector3::new(position.x, position.y, 0.0);
        }

        let sample = &mut self.sample;
        let mut force = params.stiffness * (sample.anchor - position) - params.damping * body_velocity;
        if self.unilateral && force.z < 0.0 {
            sample.force = Vector3::zeros();
            sample.slipping = false;
            return;
        }

        let tangential = Vector2::new(force.x, force.y);
        let bound = params.friction * force.z.max(0.0);
        let magnitude = tangential.norm();
        if magnitude > bound {
            let projected = if magnitude > 0.0 {
                tangential * (bound / magnitude)
            } else {
                Vector2::zeros()
            };
            force.x = projected.x;
            force.y = projected.y;
            sample.slipping = true;

            // Slide the anchor so the spring-damper reproduces the projected force
            let k_t: Matrix2<f64> = params.stiffness.fixed_view::<2, 2>(0, 0).into_owned();
            let b_t: Matrix2<f64> = params.damping.fixed_view::<2, 2>(0, 0).into_owned();
            if let Some(k_inv) = k_t.try_inverse() {
                let v_t = Vector2::new(body_velocity.x, body_velocity.y);
                let shift = k_inv * (projected + b_t * v_t);
                sample.anchor.x = position.x + shift.x;
                sample.anchor.y = position.y + shift.y;
            }
        } else {
            sample.slipping = false;
        }
        sample.force = force;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn contact() -> ContactState {
        ContactState::new("foot", FrameId::new(0), Vector3::zeros(), true)
    }

    #[test]
    fn test_detached_above_ground() {
        let mut c = contact();
        c.update(
            &Vector3::new(0.0, 0.0, 0.1),
            &Vector3::zeros(),
            &ContactParams::default(),
        );
        assert!(!c.sample.active);
        assert_eq!(c.sample.force, Vector3::zeros());
    }

    #[test]
    fn test_penetration_pushes_up() {
        let mut c = contact();
        let params = ContactParams::isotropic(1e4, 0.0, 0.5);
        c.update(&Vector3::new(0.2, 0.0, -0.001), &Vector3::zeros(), &params);
        assert!(c.sample.active);
        assert!(!c.sample.slipping);
        assert_relative_eq!(c.sample.anchor, Vector3::new(0.2, 0.0, 0.0), epsilon = 1e-15);
        assert_relative_eq!(c.sample.force.z, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_unilateral_never_pulls() {
        let mut c = contact();
        let params = ContactParams::isotropic(1e4, 1e3, 0.5);
        // Shallow penetration while separating fast: damping would pull
        c.update(&Vector3::new(0.0, 0.0, -1e-4), &Vector3::new(0.0, 0.0, 1.0), &params);
        assert!(c.sample.active);
        assert_eq!(c.sample.force, Vector3::zeros());
    }

    #[test]
    fn test_friction_cone_projection_slides_anchor() {
        let mut c = contact();
        let params = ContactParams::isotropic(1e4, 0.0, 0.5);
        c.update(&Vector3::new(0.0, 0.0, -0.001), &Vector3::zeros(), &params);
        // Drag far sideways: tangential spring force exceeds the cone
        c.update(&Vector3::new(0.01, 0.0, -0.001), &Vector3::zeros(), &params);
        assert!(c.sample.slipping);
        let fz = c.sample.force.z;
        assert_relative_eq!(c.sample.tangential_force(), 0.5 * fz, epsilon = 1e-9);
        // Spring from the new anchor reproduces the projected force
        let spring = 1e4 * (c.sample.anchor.x - c.sample.position.x);
        assert_relative_eq!(spring, c.sample.force.x, epsilon = 1e-9);
    }
}
