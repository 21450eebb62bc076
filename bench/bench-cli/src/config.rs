//! JSON run config: experiment settings plus the point-mass robot, initial
//! state, and controller they run on.

use std::path::Path;

use anyhow::{Context, Result};
use bench_core::{ExperimentConfig, InitialState, SweepBounds};
use bench_engine::{PdController, PointMassModel, SinusoidalReference};
use bench_types::DVector;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Everything a `run` needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub experiment: ExperimentConfig,
    pub robot: RobotSpec,
    pub initial: InitialSpec,
    pub controller: ControllerSpec,
    /// Explicit sweep; derived from the exponential ground truth when absent.
    pub sweep: Option<SweepBounds>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            experiment: ExperimentConfig::default().with_pre_roll(0.1),
            robot: RobotSpec::default(),
            initial: InitialSpec::default(),
            controller: ControllerSpec::default(),
            sweep: None,
        }
    }
}

/// Point-mass quadruped dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RobotSpec {
    /// Body mass (kg).
    pub mass: f64,
    /// Half the distance between front and back feet (m).
    pub half_length: f64,
    /// Half the distance between left and right feet (m).
    pub half_width: f64,
}

impl Default for RobotSpec {
    fn default() -> Self {
        Self {
            mass: 10.0,
            half_length: 0.2,
            half_width: 0.15,
        }
    }
}

/// Initial body state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InitialSpec {
    /// Body position (m); the feet sit at the body height.
    pub position: [f64; 3],
    /// Body velocity (m/s).
    pub velocity: [f64; 3],
}

impl Default for InitialSpec {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, -0.002],
            velocity: [0.0; 3],
        }
    }
}

/// PD gains, feed-forward, and reference motion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerSpec {
    pub kp: f64,
    pub kd: f64,
    /// Add the force that holds the body against gravity.
    pub gravity_compensation: bool,
    /// Sinusoidal motion around the initial position, after the pre-roll.
    pub reference: Option<ReferenceSpec>,
}

impl Default for ControllerSpec {
    fn default() -> Self {
        Self {
            kp: 200.0,
            kd: 20.0,
            gravity_compensation: true,
            reference: Some(ReferenceSpec {
                amplitude: [0.02, 0.0, 0.005],
                frequency: [1.0, 0.0, 2.0],
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceSpec {
    pub amplitude: [f64; 3],
    pub frequency: [f64; 3],
}

impl RunConfig {
    pub fn model(&self) -> PointMassModel {
        PointMassModel::quadruped(self.robot.mass, self.robot.half_length, self.robot.half_width)
    }

    pub fn initial_state(&self) -> InitialState {
        InitialState::new(
            DVector::from_row_slice(&self.initial.position),
            DVector::from_row_slice(&self.initial.velocity),
        )
    }

    pub fn controller(&self, model: &PointMassModel) -> PdController {
        let spec = &self.controller;
        let feed_forward = if spec.gravity_compensation {
            model.gravity_compensation()
        } else {
            DVector::zeros(3)
        };
        let controller = PdController::new(spec.kp, spec.kd, self.experiment.dt(), feed_forward);
        match &spec.reference {
            Some(reference) => controller.with_reference(SinusoidalReference {
                amplitude: DVector::from_row_slice(&reference.amplitude),
                frequency: DVector::from_row_slice(&reference.frequency),
            }),
            None => controller,
        }
    }
}

/// Read a config file, or take the defaults.
pub fn load(path: Option<&Path>) -> Result<RunConfig> {
    let Some(path) = path else {
        info!("using default run config");
        return Ok(RunConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: RunConfig = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse config from {}", path.display()))?;
    config
        .experiment
        .validate()
        .with_context(|| format!("Invalid experiment in {}", path.display()))?;
    Ok(config)
}

pub fn write_default(path: &Path) -> Result<()> {
    let text = serde_json::to_string_pretty(&RunConfig::default())?;
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
