//! Conversions from wire messages back to domain values.
//!
//! Plans arrive from the network and are checked before use: a decoded
//! [`PiecewisePolynomial`] always has at least two strictly increasing
//! breakpoints and exactly one coefficient vector per segment entry.

use thiserror::Error;

use crate::models::{first_unordered, PiecewisePolynomial, SystemConf, SystemPlan, SystemTrajectory, Waypoint};
use crate::wire::{PolynomialMsg, SystemConfMsg, SystemPolynomialMsg, SystemTrajectoryMsg, TrajectoryMsg};

/// A plan received from the server is structurally invalid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedPlanError {
    #[error("Polynomial needs at least 2 breakpoints, got {count}")]
    TooFewBreaks { count: usize },

    #[error("Breakpoint {index} is not finite or not greater than the previous one")]
    NonIncreasingBreaks { index: usize },

    #[error("Expected {expected} coefficient vectors, got {actual}")]
    CoefficientCount { expected: usize, actual: usize },

    #[error("Trajectory has {times} times but {confs} configurations")]
    TrajectoryLength { times: usize, confs: usize },

    #[error("Trajectory time {index} is not finite or not greater than the previous one")]
    NonIncreasingTimes { index: usize },

    #[error("Plan for robot '{robot}': {source}")]
    Robot {
        robot: String,
        #[source]
        source: Box<MalformedPlanError>,
    },
}

impl MalformedPlanError {
    fn for_robot(robot: &str, source: MalformedPlanError) -> Self {
        MalformedPlanError::Robot {
            robot: robot.to_string(),
            source: Box::new(source),
        }
    }
}

/// Inverse of [`crate::encode::encode_system_conf`].
pub fn decode_system_conf(msg: &SystemConfMsg) -> SystemConf {
    msg.data
        .iter()
        .map(|(robot, conf)| (robot.clone(), conf.data.clone()))
        .collect()
}

/// Rebuild a piecewise polynomial from its breakpoints and coefficient blocks.
pub fn decode_piecewise_polynomial(msg: &PolynomialMsg) -> Result<PiecewisePolynomial, MalformedPlanError> {
    PiecewisePolynomial::new(
        msg.breaks.clone(),
        msg.rows as usize,
        msg.cols as usize,
        msg.coeffs.iter().map(|c| c.data.clone()).collect(),
    )
}

/// Decode every robot's polynomial, keeping robot names.
pub fn decode_system_plan(msg: &SystemPolynomialMsg) -> Result<SystemPlan, MalformedPlanError> {
    msg.data
        .iter()
        .map(|(robot, poly)| {
            decode_piecewise_polynomial(poly)
                .map(|decoded| (robot.clone(), decoded))
                .map_err(|e| MalformedPlanError::for_robot(robot, e))
        })
        .collect()
}

/// Pair each time with its configuration.
pub fn decode_trajectory(msg: &TrajectoryMsg) -> Result<Vec<Waypoint>, MalformedPlanError> {
    if msg.times.len() != msg.confs.len() {
        return Err(MalformedPlanError::TrajectoryLength {
            times: msg.times.len(),
            confs: msg.confs.len(),
        });
    }
    if let Some(index) = first_unordered(&msg.times) {
        return Err(MalformedPlanError::NonIncreasingTimes { index });
    }

    Ok(msg
        .times
        .iter()
        .zip(&msg.confs)
        .map(|(&time, conf)| Waypoint {
            time,
            conf: conf.data.clone(),
        })
        .collect())
}

pub fn decode_system_trajectory(msg: &SystemTrajectoryMsg) -> Result<SystemTrajectory, MalformedPlanError> {
    msg.data
        .iter()
        .map(|(robot, trajectory)| {
            decode_trajectory(trajectory)
                .map(|waypoints| (robot.clone(), waypoints))
                .map_err(|e| MalformedPlanError::for_robot(robot, e))
        })
        .collect()
}
