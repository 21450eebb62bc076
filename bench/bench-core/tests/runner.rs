//! Runner behavior observed through a scripted engine.
//!
//! The scripted simulator logs every call it receives, which lets these tests
//! check the reset protocol and divergence handling call by call.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::float_cmp)]

mod common;

use approx::assert_relative_eq;
use bench_core::{ExperimentConfig, InitialState, SimulationRunner};
use bench_types::{
    BenchError, Configuration, DVector, EulerSettings, ExperimentIdentity, ExponentialSettings,
    TruncationOrder,
};
use common::{bits, Call, LineModel, RecordingController, ScriptedEngine};

fn config(horizon: usize) -> ExperimentConfig {
    ExperimentConfig::new(ExperimentIdentity::new("line", "push", 0.1), horizon)
        .with_contact_frames(["foot"])
}

fn state(q: f64, v: f64) -> InitialState {
    InitialState::new(DVector::from_vec(vec![q]), DVector::from_vec(vec![v]))
}

fn push() -> RecordingController {
    RecordingController::new(DVector::from_vec(vec![0.3]))
}

// =============================================================================
// Trajectory layout
// =============================================================================

mod layout {
    use super::*;

    #[test]
    fn length_is_horizon_plus_one_for_every_family() {
        let engine = ScriptedEngine::default();
        let config = config(7);
        let runner = SimulationRunner::new(&engine, &LineModel, &config);
        let configurations = [
            Configuration::euler(1, EulerSettings::default()).unwrap(),
            Configuration::euler(8, EulerSettings::default()).unwrap(),
            Configuration::exponential(
                2,
                ExponentialSettings::default().truncation(TruncationOrder::Limited(1)),
            )
            .unwrap(),
        ];
        for configuration in &configurations {
            let traj = runner
                .run(&mut push(), &state(0.0, 0.0), configuration, None)
                .unwrap()
                .into_result()
                .unwrap();
            assert_eq!(traj.len(), 8);
            assert_eq!(traj.q().len(), 8);
            assert_eq!(traj.v().len(), 8);
            assert_eq!(traj.u().len(), 8);
            assert_eq!(traj.contacts().steps(), 8);
        }
    }

    #[test]
    fn control_belongs_to_the_transition_it_drives() {
        let engine = ScriptedEngine::default();
        let config = config(3);
        let runner = SimulationRunner::new(&engine, &LineModel, &config);
        let configuration = Configuration::euler(1, EulerSettings::default()).unwrap();
        let traj = runner
            .run(&mut push(), &state(0.0, 0.0), &configuration, None)
            .unwrap()
            .trajectory;

        for i in 0..3 {
            assert_eq!(traj.u()[i][0], 0.3);
            assert_relative_eq!(traj.v()[i + 1][0], traj.v()[i][0] + 0.3 * 0.1, epsilon = 1e-12);
        }
        // No transition leaves the last sample
        assert_eq!(traj.u()[3][0], 0.0);
    }

    #[test]
    fn diagnostics_only_for_exponential_runs() {
        let engine = ScriptedEngine::default();
        let config = config(4);
        let runner = SimulationRunner::new(&engine, &LineModel, &config);

        let euler = Configuration::euler(1, EulerSettings::default()).unwrap();
        let traj = runner
            .run(&mut push(), &state(0.0, 0.0), &euler, None)
            .unwrap()
            .trajectory;
        assert!(traj.diagnostics().is_none());

        let exp = Configuration::exponential(1, ExponentialSettings::default()).unwrap();
        let traj = runner
            .run(&mut push(), &state(0.0, 0.0), &exp, None)
            .unwrap()
            .trajectory;
        let diag = traj.diagnostics().unwrap();
        assert_eq!(diag.matrix_multiplications[..4], [3, 3, 3, 3]);
        assert_eq!(diag.matrix_multiplications[4], 0);
    }
}

// =============================================================================
// Local-error mode
// =============================================================================

mod local_error {
    use super::*;

    #[test]
    fn reset_protocol_call_order() {
        let engine = ScriptedEngine::default();
        let config = config(3);
        let runner = SimulationRunner::new(&engine, &LineModel, &config);
        let configuration = Configuration::euler(1, EulerSettings::default()).unwrap();
        let reference = runner
            .run(&mut push(), &state(0.2, 1.0), &configuration, None)
            .unwrap()
            .trajectory;
        engine.log.lock().unwrap().clear();

        runner
            .run(&mut push(), &state(0.2, 1.0), &configuration, Some(&reference))
            .unwrap();

        let mut expected = vec![Call::ResetState {
            q: 0.2,
            reset_anchor_points: true,
        }];
        for i in 0..3 {
            let q = reference.q()[i][0];
            let sample = reference.contacts().get(0, i).unwrap();
            expected.extend([
                Call::ResetState {
                    q,
                    reset_anchor_points: true,
                },
                Call::ResetAnchor {
                    contact: 0,
                    anchor: sample.anchor,
                    slipping: sample.slipping,
                },
                Call::ResetState {
                    q,
                    reset_anchor_points: false,
                },
                Call::Step,
            ]);
        }
        assert_eq!(engine.calls(), expected);
    }

    #[test]
    fn controller_sees_the_reference_bit_for_bit() {
        let engine = ScriptedEngine::default();
        let config = config(5);
        let runner = SimulationRunner::new(&engine, &LineModel, &config);

        // Reference from a different configuration and control
        let truth = Configuration::ground_truth(bench_types::IntegratorFamily::Exponential, 64)
            .unwrap();
        let reference = runner
            .run(
                &mut RecordingController::new(DVector::from_vec(vec![-0.7])),
                &state(0.1, 1.0),
                &truth,
                None,
            )
            .unwrap()
            .trajectory;

        let mut controller = push();
        let configuration = Configuration::euler(2, EulerSettings::default()).unwrap();
        runner
            .run(&mut controller, &state(0.1, 1.0), &configuration, Some(&reference))
            .unwrap();

        assert_eq!(controller.seen.len(), 5);
        for (i, (q, v)) in controller.seen.iter().enumerate() {
            assert_eq!(bits(q), bits(&reference.q()[i]));
            assert_eq!(bits(v), bits(&reference.v()[i]));
        }
    }

    #[test]
    fn recorded_sample_is_one_step_from_the_reference() {
        let engine = ScriptedEngine::default();
        let config = config(4);
        let runner = SimulationRunner::new(&engine, &LineModel, &config);
        let configuration = Configuration::euler(1, EulerSettings::default()).unwrap();
        let reference = runner
            .run(
                &mut RecordingController::new(DVector::from_vec(vec![2.0])),
                &state(0.0, 0.5),
                &configuration,
                None,
            )
            .unwrap()
            .trajectory;

        let replay = runner
            .run(&mut push(), &state(0.0, 0.5), &configuration, Some(&reference))
            .unwrap()
            .trajectory;
        for i in 0..4 {
            let v_ref = reference.v()[i][0];
            assert_relative_eq!(replay.v()[i + 1][0], v_ref + 0.3 * 0.1, epsilon = 1e-12);
        }
    }

    #[test]
    fn diverged_reference_is_rejected() {
        let engine = ScriptedEngine::diverging_at(2);
        let config = config(4);
        let runner = SimulationRunner::new(&engine, &LineModel, &config);
        let configuration = Configuration::euler(1, EulerSettings::default()).unwrap();
        let reference = runner
            .run(&mut push(), &state(0.0, 0.0), &configuration, None)
            .unwrap()
            .trajectory;
        assert!(reference.is_diverged());

        let err = runner
            .run(&mut push(), &state(0.0, 0.0), &configuration, Some(&reference))
            .unwrap_err();
        assert!(matches!(err, BenchError::InvalidConfig { .. }));
    }
}

// =============================================================================
// Divergence
// =============================================================================

mod divergence {
    use super::*;

    #[test]
    fn stops_at_the_offending_step() {
        let engine = ScriptedEngine::diverging_at(4);
        let config = config(10);
        let runner = SimulationRunner::new(&engine, &LineModel, &config);
        let configuration = Configuration::euler(1, EulerSettings::default()).unwrap();
        let outcome = runner
            .run(
                &mut RecordingController::new(DVector::zeros(1)),
                &state(0.0, 1.0),
                &configuration,
                None,
            )
            .unwrap();

        assert!(outcome.is_diverged());
        assert!(matches!(
            outcome.failure,
            Some(BenchError::DivergedSimulation { step: 4, .. })
        ));

        let traj = &outcome.trajectory;
        assert_eq!(traj.len(), 11);
        assert_relative_eq!(traj.q()[4][0], 0.4, epsilon = 1e-12);
        assert!(traj.v()[4][0].is_nan());
        // Samples after the divergence stay zeroed
        assert_eq!(traj.q()[5][0], 0.0);
        assert_eq!(traj.q()[10][0], 0.0);
        assert!(traj.timing().mean_step_time.is_nan());

        let steps = engine.calls().iter().filter(|c| **c == Call::Step).count();
        assert_eq!(steps, 4);
    }

    #[test]
    fn finite_velocity_above_bound_diverges() {
        let engine = ScriptedEngine::default();
        let config = config(5);
        let runner = SimulationRunner::new(&engine, &LineModel, &config);
        let configuration = Configuration::euler(1, EulerSettings::default()).unwrap();
        let outcome = runner
            .run(
                &mut RecordingController::new(DVector::from_vec(vec![2e7])),
                &state(0.0, 0.0),
                &configuration,
                None,
            )
            .unwrap();

        match outcome.failure {
            Some(BenchError::DivergedSimulation {
                step,
                velocity_norm,
            }) => {
                assert_eq!(step, 1);
                assert!(velocity_norm.is_finite());
                assert_relative_eq!(velocity_norm, 2e6, max_relative = 1e-12);
            }
            other => panic!("expected divergence, got {other:?}"),
        }

        let traj = &outcome.trajectory;
        assert!(traj.is_diverged());
        assert_eq!(traj.q()[0][0], 0.0);
        assert_relative_eq!(traj.v()[1][0], 2e6, max_relative = 1e-12);
        assert_eq!(traj.u()[0][0], 2e7);
        // Nothing recorded past the offending step
        assert_eq!(traj.v()[2][0], 0.0);
        assert!(traj.timing().mean_step_time.is_nan());
    }

    #[test]
    fn empty_horizon_rejected_before_building() {
        let engine = ScriptedEngine::default();
        let config = config(0);
        let runner = SimulationRunner::new(&engine, &LineModel, &config);
        let configuration = Configuration::euler(1, EulerSettings::default()).unwrap();
        let err = runner
            .run(&mut push(), &state(0.0, 0.0), &configuration, None)
            .unwrap_err();
        assert!(matches!(err, BenchError::InvalidConfig { .. }));
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn into_result_surfaces_the_failure() {
        let engine = ScriptedEngine::diverging_at(1);
        let config = config(3);
        let runner = SimulationRunner::new(&engine, &LineModel, &config);
        let configuration = Configuration::euler(1, EulerSettings::default()).unwrap();
        let err = runner
            .run(&mut push(), &state(0.0, 0.0), &configuration, None)
            .unwrap()
            .into_result()
            .unwrap_err();
        assert!(err.is_diverged());
        assert!(err.is_recoverable());
    }

    #[test]
    fn unknown_frame_never_steps() {
        let engine = ScriptedEngine::default();
        let config = config(3).with_contact_frames(["hand"]);
        let runner = SimulationRunner::new(&engine, &LineModel, &config);
        let configuration = Configuration::euler(1, EulerSettings::default()).unwrap();
        let err = runner
            .run(&mut push(), &state(0.0, 0.0), &configuration, None)
            .unwrap_err();
        assert_eq!(err, BenchError::frame_not_found("hand"));
        assert!(engine.calls().is_empty());
    }
}
