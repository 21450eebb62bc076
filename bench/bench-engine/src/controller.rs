//! PD tracking controller with an optional sinusoidal reference.

use bench_types::DVector;
use serde::{Deserialize, Serialize};

use crate::traits::Controller;

/// Sinusoidal offset added to the initial configuration once the pre-roll
/// has elapsed: `q_ref(t) = q0 + amplitude ∘ sin(2π frequency ∘ t)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinusoidalReference {
    /// Per-coordinate amplitude.
    pub amplitude: DVector<f64>,
    /// Per-coordinate frequency (Hz).
    pub frequency: DVector<f64>,
}

/// Joint-space PD controller with feed-forward.
///
/// ```text
/// u = u_ff + Kp (q_ref - q) + Kd (v_ref - v)
/// ```
///
/// The controller keeps its own clock: [`reset`](Controller::reset) sets it to
/// `-pre_roll` and every [`compute_control`](Controller::compute_control)
/// advances it by `dt`. While the clock is negative the reference is the
/// initial state.
#[derive(Debug, Clone, PartialEq)]
pub struct PdController {
    kp: f64,
    kd: f64,
    dt: f64,
    feed_forward: DVector<f64>,
    reference: Option<SinusoidalReference>,
    q0: DVector<f64>,
    time: f64,
}

impl PdController {
    /// Create a controller for a control step `dt`.
    #[must_use]
    pub fn new(kp: f64, kd: f64, dt: f64, feed_forward: DVector<f64>) -> Self {
        let n = feed_forward.len();
        Self {
            kp,
            kd,
            dt,
            feed_forward,
            reference: None,
            q0: DVector::zeros(n),
            time: 0.0,
        }
    }

    /// Track a sinusoid around the initial configuration.
    #[must_use]
    pub fn with_reference(mut self, reference: SinusoidalReference) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Controller clock (seconds, negative during pre-roll).
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Reference configuration and velocity at the current clock.
    #[must_use]
    pub fn reference_state(&self) -> (DVector<f64>, DVector<f64>) {
        let mut q_ref = self.q0.clone();
        let mut v_ref = DVector::zeros(self.q0.len());
        if let Some(reference) = self.reference.as_ref().filter(|_| self.time >= 0.0) {
            let n = q_ref.len().min(reference.amplitude.len()).min(reference.frequency.len());
            for i in 0..n {
                let omega = 2.0 * std::f64::consts::PI * reference.frequency[i];
                q_ref[i] += reference.amplitude[i] * (omega * self.time).sin();
                v_ref[i] = reference.amplitude[i] * omega * (omega * self.time).cos();
            }
        }
        (q_ref, v_ref)
    }
}

impl Controller for PdController {
    fn reset(&mut self, q0: &DVector<f64>, _v0: &DVector<f64>, pre_roll: f64) {
        self.q0 = q0.clone();
        self.time = -pre_roll;
    }

    fn compute_control(&mut self, q: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
        let (q_ref, v_ref) = self.reference_state();
        let mut u = self.feed_forward.clone();
        let n = u.len().min(q.len()).min(v.len()).min(q_ref.len());
        for i in 0..n {
            u[i] += self.kp * (q_ref[i] - q[i]) + self.kd * (v_ref[i] - v[i]);
        }
        self.time += self.dt;
        u
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sinusoid() -> SinusoidalReference {
        SinusoidalReference {
            amplitude: DVector::from_vec(vec![0.0, 0.02, 0.0]),
            frequency: DVector::from_vec(vec![0.0, 0.6, 0.0]),
        }
    }

    #[test]
    fn test_holds_initial_state() {
        let mut ctrl = PdController::new(10.0, 1.0, 0.01, DVector::from_vec(vec![0.0, 0.0, 9.81]));
        let q0 = DVector::from_vec(vec![0.0, 0.0, 0.2]);
        ctrl.reset(&q0, &DVector::zeros(3), 0.0);
        let u = ctrl.compute_control(&q0, &DVector::zeros(3));
        assert_eq!(u, DVector::from_vec(vec![0.0, 0.0, 9.81]));
    }

    #[test]
    fn test_pd_law() {
        let mut ctrl = PdController::new(10.0, 2.0, 0.01, DVector::zeros(3));
        ctrl.reset(&DVector::zeros(3), &DVector::zeros(3), 0.0);
        let q = DVector::from_vec(vec![0.1, 0.0, 0.0]);
        let v = DVector::from_vec(vec![0.0, 0.5, 0.0]);
        let u = ctrl.compute_control(&q, &v);
        assert_relative_eq!(u[0], -1.0, epsilon = 1e-15);
        assert_relative_eq!(u[1], -1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_reference_waits_for_pre_roll() {
        let mut ctrl =
            PdController::new(1.0, 0.0, 0.1, DVector::zeros(3)).with_reference(sinusoid());
        ctrl.reset(&DVector::zeros(3), &DVector::zeros(3), 0.25);
        assert_relative_eq!(ctrl.time(), -0.25);

        let (q_ref, v_ref) = ctrl.reference_state();
        assert_eq!(q_ref, DVector::zeros(3));
        assert_eq!(v_ref, DVector::zeros(3));

        for _ in 0..3 {
            ctrl.compute_control(&DVector::zeros(3), &DVector::zeros(3));
        }
        // Clock is now 0.05: the sinusoid has started
        let (q_ref, v_ref) = ctrl.reference_state();
        assert!(q_ref[1] > 0.0);
        assert!(v_ref[1] > 0.0);
        assert_eq!(q_ref[0], 0.0);
    }
}
