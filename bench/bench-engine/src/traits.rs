//! Collaborator seams: robot model, simulator, engine, controller.
//!
//! The benchmark harness never computes dynamics itself. It builds simulators
//! through a [`SimulationEngine`], drives them through [`Simulator`], and asks
//! a [`Controller`] for the control input of every step.

use bench_types::{
    ContactHandle, ContactPointSample, DVector, EulerSettings, ExponentialDiagnostics,
    ExponentialSettings, FrameId, Result, SimulatorParams, Vector3,
};

/// Kinematic/dynamic model of a robot.
pub trait RobotModel {
    /// Model name.
    fn name(&self) -> &str;

    /// Size of the generalized configuration.
    fn nq(&self) -> usize;

    /// Size of the generalized velocity (and of the control vector).
    fn nv(&self) -> usize;

    /// Look up a frame by name.
    fn frame_id(&self, name: &str) -> Option<FrameId>;
}

/// A simulator instance built for one configuration.
///
/// Contact points are owned by the simulator and addressed through the
/// [`ContactHandle`]s returned by [`add_contact_point`](Self::add_contact_point).
pub trait Simulator {
    /// Register a frame as a contact point.
    fn add_contact_point(
        &mut self,
        frame_name: &str,
        frame_id: FrameId,
        unilateral: bool,
    ) -> ContactHandle;

    /// Current state of a contact point, or `None` for an unknown handle.
    fn contact(&self, handle: ContactHandle) -> Option<ContactPointSample>;

    /// Overwrite a contact point's anchor position and slipping flag.
    ///
    /// Contact forces are not recomputed until the next
    /// [`reset_state`](Self::reset_state) or [`step`](Self::step).
    fn reset_anchor_point(
        &mut self,
        handle: ContactHandle,
        anchor: &Vector3<f64>,
        slipping: bool,
    ) -> Result<()>;

    /// Overwrite configuration and velocity and recompute contact state.
    ///
    /// With `reset_anchor_points` every contact point is first detached, so
    /// points found in contact get fresh anchors at their current position.
    /// Without it, points that stay in contact keep their anchors.
    fn reset_state(
        &mut self,
        q: &DVector<f64>,
        v: &DVector<f64>,
        reset_anchor_points: bool,
    ) -> Result<()>;

    /// Advance by one control step under the given generalized forces.
    fn step(&mut self, tau: &DVector<f64>) -> Result<()>;

    /// Current configuration.
    fn q(&self) -> &DVector<f64>;

    /// Current velocity.
    fn v(&self) -> &DVector<f64>;

    /// Diagnostics of the last step; `None` for non-exponential simulators.
    fn exponential_diagnostics(&self) -> Option<ExponentialDiagnostics> {
        None
    }
}

/// Builds simulators, one entry point per integrator family.
pub trait SimulationEngine {
    /// Robot model type accepted by the builders.
    type Model: RobotModel;
    /// Simulator type produced by the builders.
    type Simulator: Simulator;

    /// Build an exponential-family simulator.
    fn build_exponential(
        &self,
        model: &Self::Model,
        params: &SimulatorParams,
        settings: &ExponentialSettings,
    ) -> Result<Self::Simulator>;

    /// Build an Euler-family simulator.
    fn build_euler(
        &self,
        model: &Self::Model,
        params: &SimulatorParams,
        settings: &EulerSettings,
    ) -> Result<Self::Simulator>;
}

/// Feedback controller producing generalized forces.
pub trait Controller {
    /// Restart the controller at an initial state.
    ///
    /// `pre_roll` is how long (seconds) the controller holds the initial
    /// state before the reference motion starts.
    fn reset(&mut self, q0: &DVector<f64>, v0: &DVector<f64>, pre_roll: f64);

    /// Control input for the current state. Called once per control step.
    fn compute_control(&mut self, q: &DVector<f64>, v: &DVector<f64>) -> DVector<f64>;
}
