//! Reference engine: a translating rigid body on compliant ground.
//!
//! The body has three translational degrees of freedom (`nq = nv = 3`) and
//! any number of contact frames rigidly attached at fixed offsets. Gravity
//! acts along `-z`; the ground is the plane `z = 0`.
//!
//! Both integrator families are provided:
//!
//! - **Euler**: per sub-step, accelerations from the current contact forces,
//!   then either the explicit update (position with the mid-step velocity) or
//!   the semi-implicit one.
//! - **Exponential**: per sub-step, the sticking contacts make the dynamics
//!   linear, `ż = A z` on the augmented state `z = [p; v; 1]`, which is
//!   advanced exactly with `exp(A h)` up to the truncation budget. Slipping
//!   contacts contribute their current (cone-projected) force as a constant.
//!
//! # Example
//!
//! ```
//! use bench_engine::{PointMassEngine, PointMassModel, RobotModel, SimulationEngine, Simulator};
//! use bench_types::{ContactParams, DVector, EulerSettings, SimulatorParams};
//!
//! let model = PointMassModel::quadruped(1.0, 0.1, 0.1);
//! let params = SimulatorParams::new(0.01, 4, ContactParams::soft());
//! let mut sim = PointMassEngine
//!     .build_euler(&model, &params, &EulerSettings::default())
//!     .unwrap();
//!
//! sim.reset_state(&DVector::from_vec(vec![0.0, 0.0, 0.1]), &DVector::zeros(3), true)
//!     .unwrap();
//! sim.step(&DVector::zeros(3)).unwrap();
//!
//! // Falling under gravity
//! assert!(sim.v()[2] < 0.0);
//! ```

use bench_types::{
    BenchError, ContactHandle, ContactPointSample, DVector, EulerSettings,
    ExponentialDiagnostics, ExponentialSettings, ForwardDynamics, FrameId, Matrix3, Result,
    SimulatorParams, Vector3,
};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::contact::ContactState;
use crate::expm::MatrixExponential;
use crate::traits::{RobotModel, SimulationEngine, Simulator};

/// Standard gravity (m/s²).
pub const GRAVITY: f64 = 9.81;

/// Model of a translating rigid body with contact frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointMassModel {
    name: String,
    mass: f64,
    gravity: Vector3<f64>,
    frames: Vec<(String, Vector3<f64>)>,
}

impl PointMassModel {
    /// Create a model with no frames.
    #[must_use]
    pub fn new(name: impl Into<String>, mass: f64) -> Self {
        Self {
            name: name.into(),
            mass,
            gravity: Vector3::new(0.0, 0.0, -GRAVITY),
            frames: Vec::new(),
        }
    }

    /// Four feet at `(±half_length, ±half_width, 0)`, named like a quadruped's.
    #[must_use]
    pub fn quadruped(mass: f64, half_length: f64, half_width: f64) -> Self {
        Self::new("point-quadruped", mass)
            .with_frame("BL_contact", Vector3::new(-half_length, half_width, 0.0))
            .with_frame("BR_contact", Vector3::new(-half_length, -half_width, 0.0))
            .with_frame("FL_contact", Vector3::new(half_length, half_width, 0.0))
            .with_frame("FR_contact", Vector3::new(half_length, -half_width, 0.0))
    }

    /// Attach a frame at an offset from the body origin.
    #[must_use]
    pub fn with_frame(mut self, name: impl Into<String>, offset: Vector3<f64>) -> Self {
        self.frames.push((name.into(), offset));
        self
    }

    /// Set the gravity vector.
    #[must_use]
    pub fn with_gravity(mut self, gravity: Vector3<f64>) -> Self {
        self.gravity = gravity;
        self
    }

    /// Body mass (kg).
    #[must_use]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Gravity vector.
    #[must_use]
    pub fn gravity(&self) -> Vector3<f64> {
        self.gravity
    }

    /// Names of all frames, in frame-id order.
    pub fn frame_names(&self) -> impl Iterator<Item = &str> {
        self.frames.iter().map(|(name, _)| name.as_str())
    }

    /// Generalized force that holds the body still against gravity.
    #[must_use]
    pub fn gravity_compensation(&self) -> DVector<f64> {
        DVector::from_column_slice((-self.mass * self.gravity).as_slice())
    }

    fn frame_offset(&self, id: FrameId) -> Option<Vector3<f64>> {
        self.frames.get(id.raw()).map(|(_, offset)| *offset)
    }
}

impl RobotModel for PointMassModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn nq(&self) -> usize {
        3
    }

    fn nv(&self) -> usize {
        3
    }

    fn frame_id(&self, name: &str) -> Option<FrameId> {
        self.frames
            .iter()
            .position(|(frame, _)| frame == name)
            .map(FrameId::new)
    }
}

/// Builder of [`PointMassSimulator`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointMassEngine;

impl SimulationEngine for PointMassEngine {
    type Model = PointMassModel;
    type Simulator = PointMassSimulator;

    fn build_exponential(
        &self,
        model: &PointMassModel,
        params: &SimulatorParams,
        settings: &ExponentialSettings,
    ) -> Result<PointMassSimulator> {
        let expm =
            MatrixExponential::new(settings.truncation.max_multiplications(), settings.use_balancing);
        PointMassSimulator::new(
            model,
            params,
            settings.forward_dynamics,
            Scheme::Exponential(expm),
        )
    }

    fn build_euler(
        &self,
        model: &PointMassModel,
        params: &SimulatorParams,
        settings: &EulerSettings,
    ) -> Result<PointMassSimulator> {
        PointMassSimulator::new(
            model,
            params,
            settings.forward_dynamics,
            Scheme::Euler {
                semi_implicit: settings.semi_implicit,
            },
        )
    }
}

#[derive(Debug, Clone)]
enum Scheme {
    Euler { semi_implicit: bool },
    Exponential(MatrixExponential),
}

/// Simulator built by [`PointMassEngine`].
#[derive(Debug, Clone)]
pub struct PointMassSimulator {
    model: PointMassModel,
    params: SimulatorParams,
    inverse_mass: Matrix3<f64>,
    scheme: Scheme,
    q: DVector<f64>,
    v: DVector<f64>,
    contacts: Vec<ContactState>,
    diagnostics: Option<ExponentialDiagnostics>,
    initialized: bool,
}

impl PointMassSimulator {
    fn new(
        model: &PointMassModel,
        params: &SimulatorParams,
        forward_dynamics: ForwardDynamics,
        scheme: Scheme,
    ) -> Result<Self> {
        params.validate()?;
        if !model.mass.is_finite() || model.mass <= 0.0 {
            return Err(BenchError::engine(format!(
                "{}: mass must be positive, got {}",
                model.name, model.mass
            )));
        }
        let inverse_mass = inverse_mass(model.mass, forward_dynamics)?;
        let diagnostics = match scheme {
            Scheme::Exponential(_) => Some(ExponentialDiagnostics::default()),
            Scheme::Euler { .. } => None,
        };
        debug!(
            model = %model.name,
            ndt = params.ndt,
            dt = params.dt,
            "built point-mass simulator"
        );
        Ok(Self {
            model: model.clone(),
            params: *params,
            inverse_mass,
            scheme,
            q: DVector::zeros(3),
            v: DVector::zeros(3),
            contacts: Vec::new(),
            diagnostics,
            initialized: false,
        })
    }

    /// Frame name and id of a registered contact point.
    #[must_use]
    pub fn contact_frame(&self, handle: ContactHandle) -> Option<(&str, FrameId)> {
        self.contacts
            .get(handle.index())
            .map(|c| (c.frame_name.as_str(), c.frame_id))
    }

    fn position(&self) -> Vector3<f64> {
        Vector3::new(self.q[0], self.q[1], self.q[2])
    }

    fn velocity(&self) -> Vector3<f64> {
        Vector3::new(self.v[0], self.v[1], self.v[2])
    }

    fn set_state(&mut self, p: &Vector3<f64>, v: &Vector3<f64>) {
        self.q.copy_from_slice(p.as_slice());
        self.v.copy_from_slice(v.as_slice());
    }

    fn refresh_contacts(&mut self) {
        let p = self.position();
        let v = self.velocity();
        let contact = self.params.contact;
        for c in &mut self.contacts {
            c.update(&p, &v, &contact);
        }
    }

    fn contact_force(&self) -> Vector3<f64> {
        self.contacts
            .iter()
            .filter(|c| c.sample.active)
            .map(|c| c.sample.force)
            .sum()
    }

    fn check_dimensions(&self, label: &str, x: &DVector<f64>) -> Result<()> {
        if x.len() == 3 {
            Ok(())
        } else {
            Err(BenchError::engine(format!(
                "{label} has {} entries, expected 3",
                x.len()
            )))
        }
    }

    fn euler_substep(&mut self, tau: &Vector3<f64>, h: f64, semi_implicit: bool) {
        let force = tau + self.model.mass * self.model.gravity + self.contact_force();
        let a = self.inverse_mass * force;
        let p = self.position();
        let v = self.velocity();
        let (p_next, v_next) = if semi_implicit {
            let v_next = v + a * h;
            (p + v_next * h, v_next)
        } else {
            let v_mean = v + a * (0.5 * h);
            (p + v_mean * h, v + a * h)
        };
        self.set_state(&p_next, &v_next);
        self.refresh_contacts();
    }

    fn exponential_substep(&mut self, tau: &Vector3<f64>, h: f64, expm: &MatrixExponential) {
        let k = self.params.contact.stiffness;
        let b = self.params.contact.damping;

        let mut stiffness = Matrix3::zeros();
        let mut damping = Matrix3::zeros();
        let mut constant = tau + self.model.mass * self.model.gravity;
        for c in self.contacts.iter().filter(|c| c.sample.active) {
            if c.is_sticking() {
                stiffness += k;
                damping += b;
                constant += k * (c.sample.anchor - c.offset);
            } else {
                constant += c.sample.force;
            }
        }

        // z = [p; v; 1], ż = A z
        let mut a = DMatrix::<f64>::zeros(7, 7);
        a.fixed_view_mut::<3, 3>(0, 3).copy_from(&Matrix3::identity());
        a.fixed_view_mut::<3, 3>(3, 0)
            .copy_from(&(-self.inverse_mass * stiffness));
        a.fixed_view_mut::<3, 3>(3, 3)
            .copy_from(&(-self.inverse_mass * damping));
        a.fixed_view_mut::<3, 1>(3, 6)
            .copy_from(&(self.inverse_mass * constant));

        let result = expm.compute(&(a * h));
        let p = self.position();
        let v = self.velocity();
        let z = DVector::from_column_slice(&[p.x, p.y, p.z, v.x, v.y, v.z, 1.0]);
        let z_next = result.value * z;

        if let Some(diag) = self.diagnostics.as_mut() {
            diag.matrix_multiplications += result.multiplications;
            diag.matrix_norm = diag.matrix_norm.max(result.norm);
        }
        self.set_state(
            &Vector3::new(z_next[0], z_next[1], z_next[2]),
            &Vector3::new(z_next[3], z_next[4], z_next[5]),
        );
        self.refresh_contacts();
    }
}

impl Simulator for PointMassSimulator {
    fn add_contact_point(
        &mut self,
        frame_name: &str,
        frame_id: FrameId,
        unilateral: bool,
    ) -> ContactHandle {
        let offset = self.model.frame_offset(frame_id).unwrap_or_else(Vector3::zeros);
        self.contacts
            .push(ContactState::new(frame_name, frame_id, offset, unilateral));
        ContactHandle(self.contacts.len() - 1)
    }

    fn contact(&self, handle: ContactHandle) -> Option<ContactPointSample> {
        self.contacts.get(handle.index()).map(|c| c.sample)
    }

    fn reset_anchor_point(
        &mut self,
        handle: ContactHandle,
        anchor: &Vector3<f64>,
        slipping: bool,
    ) -> Result<()> {
        let contact = self.contacts.get_mut(handle.index()).ok_or_else(|| {
            BenchError::engine(format!("unknown contact handle {}", handle.index()))
        })?;
        contact.sample.anchor = *anchor;
        contact.sample.slipping = slipping;
        Ok(())
    }

    fn reset_state(
        &mut self,
        q: &DVector<f64>,
        v: &DVector<f64>,
        reset_anchor_points: bool,
    ) -> Result<()> {
        self.check_dimensions("q", q)?;
        self.check_dimensions("v", v)?;
        self.q.copy_from(q);
        self.v.copy_from(v);
        if reset_anchor_points {
            for c in &mut self.contacts {
                c.detach();
            }
        }
        self.refresh_contacts();
        self.initialized = true;
        Ok(())
    }

    fn step(&mut self, tau: &DVector<f64>) -> Result<()> {
        if !self.initialized {
            return Err(BenchError::engine("reset_state() must be called first"));
        }
        self.check_dimensions("tau", tau)?;
        let tau = Vector3::new(tau[0], tau[1], tau[2]);
        let h = self.params.sub_dt();

        if let Some(diag) = self.diagnostics.as_mut() {
            *diag = ExponentialDiagnostics::default();
        }
        match self.scheme.clone() {
            Scheme::Euler { semi_implicit } => {
                for _ in 0..self.params.ndt {
                    self.euler_substep(&tau, h, semi_implicit);
                }
            }
            Scheme::Exponential(expm) => {
                for _ in 0..self.params.ndt {
                    self.exponential_substep(&tau, h, &expm);
                }
            }
        }
        Ok(())
    }

    fn q(&self) -> &DVector<f64> {
        &self.q
    }

    fn v(&self) -> &DVector<f64> {
        &self.v
    }

    fn exponential_diagnostics(&self) -> Option<ExponentialDiagnostics> {
        self.diagnostics
    }
}

/// Inverse of the mass matrix `m I`, computed the way `method` would.
fn inverse_mass(mass: f64, method: ForwardDynamics) -> Result<Matrix3<f64>> {
    let m = Matrix3::from_diagonal_element(mass);
    match method {
        ForwardDynamics::MassInverse => m
            .try_inverse()
            .ok_or_else(|| BenchError::engine("mass matrix is singular")),
        ForwardDynamics::Cholesky => m
            .cholesky()
            .map(|chol| chol.inverse())
            .ok_or_else(|| BenchError::engine("mass matrix is not positive definite")),
        // A single free body: the articulated inertia is the body inertia
        ForwardDynamics::Aba => Ok(Matrix3::from_diagonal_element(1.0 / mass)),
    }
}
