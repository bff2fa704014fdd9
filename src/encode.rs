//! Conversions from domain values to wire messages.
//!
//! Everything here is a pure copy into the wire layout. Dimensions and
//! bounds are not checked: the planning service validates its inputs.

use crate::models::{PiecewisePolynomial, Point3, SystemConf, SystemPlan, SystemTrajectory, Waypoint};
use crate::wire::{
    AngleBetweenVectorsConstraint, CoeffsMsg, ConfMsg, Constraints, PolynomialMsg,
    PositionConstraint, ProblemDef, SystemConfMsg, SystemPolynomialMsg, SystemTrajectoryMsg,
    TrajectoryMsg,
};

/// The query point of a position constraint: frame B's origin.
pub const FRAME_B_ORIGIN: Point3 = [0.0, 0.0, 0.0];

/// Copy every robot's configuration into a wire record keyed by robot name.
pub fn encode_system_conf(sys_conf: &SystemConf) -> SystemConfMsg {
    SystemConfMsg {
        data: sys_conf
            .iter()
            .map(|(robot, conf)| (robot.clone(), ConfMsg { data: conf.clone() }))
            .collect(),
    }
}

/// Constrain the angle between `a_A` (fixed in frame A) and `b_B` (fixed in
/// frame B) to `[0, |angle_tolerance|]`.
///
/// A negative tolerance is taken by magnitude.
pub fn encode_angle_constraint(
    frame_a: &str,
    frame_b: &str,
    a_a: Point3,
    b_b: Point3,
    angle_tolerance: f64,
) -> AngleBetweenVectorsConstraint {
    AngleBetweenVectorsConstraint {
        frame_a: frame_a.to_string(),
        frame_b: frame_b.to_string(),
        a_a,
        b_b,
        angle_lower: 0.0,
        angle_upper: angle_tolerance.abs(),
    }
}

/// Keep frame B's origin inside the box `[p_aq_lower, p_aq_upper]`
/// expressed in frame A.
pub fn encode_position_constraint(
    frame_a: &str,
    frame_b: &str,
    p_aq_lower: Point3,
    p_aq_upper: Point3,
) -> PositionConstraint {
    PositionConstraint {
        frame_a: frame_a.to_string(),
        frame_b: frame_b.to_string(),
        p_aq_lower,
        p_aq_upper,
        p_bq: FRAME_B_ORIGIN,
    }
}

/// Assemble a problem definition from domain configurations.
pub fn problem_definition(
    name: &str,
    start: &SystemConf,
    goal: &SystemConf,
    constraints: Constraints,
    context_id: Option<u64>,
) -> ProblemDef {
    ProblemDef {
        name: name.to_string(),
        start: encode_system_conf(start),
        goal: encode_system_conf(goal),
        constraints,
        context_id,
    }
}

pub fn encode_piecewise_polynomial(poly: &PiecewisePolynomial) -> PolynomialMsg {
    PolynomialMsg {
        breaks: poly.breaks().to_vec(),
        rows: poly.rows() as u32,
        cols: poly.cols() as u32,
        coeffs: poly
            .raw_coefficients()
            .iter()
            .map(|data| CoeffsMsg { data: data.clone() })
            .collect(),
    }
}

pub fn encode_system_plan(plan: &SystemPlan) -> SystemPolynomialMsg {
    SystemPolynomialMsg {
        data: plan
            .iter()
            .map(|(robot, poly)| (robot.clone(), encode_piecewise_polynomial(poly)))
            .collect(),
    }
}

pub fn encode_trajectory(waypoints: &[Waypoint]) -> TrajectoryMsg {
    TrajectoryMsg {
        times: waypoints.iter().map(|w| w.time).collect(),
        confs: waypoints
            .iter()
            .map(|w| ConfMsg { data: w.conf.clone() })
            .collect(),
    }
}

pub fn encode_system_trajectory(trajectory: &SystemTrajectory) -> SystemTrajectoryMsg {
    SystemTrajectoryMsg {
        data: trajectory
            .iter()
            .map(|(robot, waypoints)| (robot.clone(), encode_trajectory(waypoints)))
            .collect(),
    }
}
