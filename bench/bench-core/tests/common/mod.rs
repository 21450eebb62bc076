//! Scripted engine and recording controller shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use bench_engine::{Controller, RobotModel, SimulationEngine, Simulator};
use bench_types::{
    BenchError, ContactHandle, ContactPointSample, DVector, EulerSettings, ExponentialDiagnostics,
    ExponentialSettings, FrameId, Result, SimulatorParams, Vector3,
};

/// One call received by a [`ScriptedSimulator`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ResetState { q: f64, reset_anchor_points: bool },
    ResetAnchor { contact: usize, anchor: Vector3<f64>, slipping: bool },
    Step,
}

/// One-dimensional model with a single `foot` frame.
#[derive(Debug, Clone)]
pub struct LineModel;

impl RobotModel for LineModel {
    fn name(&self) -> &str {
        "line"
    }

    fn nq(&self) -> usize {
        1
    }

    fn nv(&self) -> usize {
        1
    }

    fn frame_id(&self, name: &str) -> Option<FrameId> {
        (name == "foot").then_some(FrameId::new(0))
    }
}

/// Engine whose simulators integrate `q' = v, v' = u` and can be told to
/// produce a `NaN` velocity on a given step.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEngine {
    /// Step call (1-based) whose velocity becomes `NaN`.
    pub diverge_at: Option<usize>,
    /// Calls of every simulator built by this engine.
    pub log: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedEngine {
    pub fn diverging_at(step: usize) -> Self {
        Self {
            diverge_at: Some(step),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().unwrap().clone()
    }

    fn build(&self, params: &SimulatorParams, exponential: bool) -> ScriptedSimulator {
        ScriptedSimulator {
            dt: params.dt,
            q: DVector::zeros(1),
            v: DVector::zeros(1),
            anchors: Vec::new(),
            steps: 0,
            diverge_at: self.diverge_at,
            exponential,
            log: Arc::clone(&self.log),
        }
    }
}

impl SimulationEngine for ScriptedEngine {
    type Model = LineModel;
    type Simulator = ScriptedSimulator;

    fn build_exponential(
        &self,
        _model: &LineModel,
        params: &SimulatorParams,
        _settings: &ExponentialSettings,
    ) -> Result<ScriptedSimulator> {
        Ok(self.build(params, true))
    }

    fn build_euler(
        &self,
        _model: &LineModel,
        params: &SimulatorParams,
        _settings: &EulerSettings,
    ) -> Result<ScriptedSimulator> {
        Ok(self.build(params, false))
    }
}

pub struct ScriptedSimulator {
    dt: f64,
    q: DVector<f64>,
    v: DVector<f64>,
    anchors: Vec<(Vector3<f64>, bool)>,
    steps: usize,
    diverge_at: Option<usize>,
    exponential: bool,
    log: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedSimulator {
    fn log(&self, call: Call) {
        self.log.lock().unwrap().push(call);
    }
}

impl Simulator for ScriptedSimulator {
    fn add_contact_point(&mut self, _name: &str, _id: FrameId, _unilateral: bool) -> ContactHandle {
        self.anchors.push((Vector3::zeros(), false));
        ContactHandle(self.anchors.len() - 1)
    }

    fn contact(&self, handle: ContactHandle) -> Option<ContactPointSample> {
        let (anchor, slipping) = *self.anchors.get(handle.index())?;
        let mut sample = ContactPointSample::inactive(Vector3::new(self.q[0], 0.0, 0.0));
        sample.anchor = anchor;
        sample.slipping = slipping;
        sample.active = true;
        Some(sample)
    }

    fn reset_anchor_point(
        &mut self,
        handle: ContactHandle,
        anchor: &Vector3<f64>,
        slipping: bool,
    ) -> Result<()> {
        self.log(Call::ResetAnchor {
            contact: handle.index(),
            anchor: *anchor,
            slipping,
        });
        let slot = self
            .anchors
            .get_mut(handle.index())
            .ok_or_else(|| BenchError::engine("bad handle"))?;
        *slot = (*anchor, slipping);
        Ok(())
    }

    fn reset_state(&mut self, q: &DVector<f64>, v: &DVector<f64>, reset: bool) -> Result<()> {
        self.log(Call::ResetState {
            q: q[0],
            reset_anchor_points: reset,
        });
        self.q.copy_from(q);
        self.v.copy_from(v);
        if reset {
            for (anchor, slipping) in &mut self.anchors {
                *anchor = Vector3::new(self.q[0], 0.0, 0.0);
                *slipping = false;
            }
        }
        Ok(())
    }

    fn step(&mut self, tau: &DVector<f64>) -> Result<()> {
        self.log(Call::Step);
        self.steps += 1;
        self.q[0] += self.v[0] * self.dt;
        self.v[0] += tau[0] * self.dt;
        // Slide anchors along so they carry state worth restoring
        for (anchor, slipping) in &mut self.anchors {
            anchor.x += 0.5 * self.dt;
            *slipping = !*slipping;
        }
        if Some(self.steps) == self.diverge_at {
            self.v[0] = f64::NAN;
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
        self.exponential.then_some(ExponentialDiagnostics {
            matrix_multiplications: 3,
            matrix_norm: 0.5,
        })
    }
}

/// Constant control that remembers the state it was asked about.
#[derive(Debug, Clone, Default)]
pub struct RecordingController {
    pub control: DVector<f64>,
    pub seen: Vec<(DVector<f64>, DVector<f64>)>,
    pub pre_roll: Option<f64>,
}

impl RecordingController {
    pub fn new(control: DVector<f64>) -> Self {
        Self {
            control,
            ..Self::default()
        }
    }
}

impl Controller for RecordingController {
    fn reset(&mut self, _q0: &DVector<f64>, _v0: &DVector<f64>, pre_roll: f64) {
        self.pre_roll = Some(pre_roll);
        self.seen.clear();
    }

    fn compute_control(&mut self, q: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
        self.seen.push((q.clone(), v.clone()));
        self.control.clone()
    }
}

/// Bit patterns of a vector, so `-0.0 != 0.0` and `NaN == NaN`.
pub fn bits(x: &DVector<f64>) -> Vec<u64> {
    x.iter().map(|v| v.to_bits()).collect()
}
