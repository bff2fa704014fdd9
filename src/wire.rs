//! Wire messages of the motion planning service.
//!
//! Field names match the service schema exactly, including the frame
//! suffixes of the constraint fields (`p_AQ_lower` is the position of
//! point Q measured and expressed in frame A). Every record tolerates
//! missing fields on input so that newer servers can omit defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{PlanId, PlanStatus, Point3};

/// JSON-RPC method names exposed by the service.
pub mod methods {
    pub const START_PLAN: &str = "MotionPlanner.HandleStartRequest";
    pub const RETRIEVE_PLAN: &str = "MotionPlanner.HandleRetrieveRequest";
}

/// Joint positions of one robot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfMsg {
    #[serde(default)]
    pub data: Vec<f64>,
}

/// Configuration of every robot in a system.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SystemConfMsg {
    #[serde(default)]
    pub data: BTreeMap<String, ConfMsg>,
}

/// Keeps point Q, fixed in frame B at `p_BQ`, inside the box
/// `[p_AQ_lower, p_AQ_upper]` expressed in frame A.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PositionConstraint {
    #[serde(rename = "frame_A", default)]
    pub frame_a: String,
    #[serde(rename = "frame_B", default)]
    pub frame_b: String,
    #[serde(rename = "p_AQ_lower", default)]
    pub p_aq_lower: Point3,
    #[serde(rename = "p_AQ_upper", default)]
    pub p_aq_upper: Point3,
    #[serde(rename = "p_BQ", default)]
    pub p_bq: Point3,
}

/// Bounds the angle between vector `a_A` fixed in frame A and vector `b_B`
/// fixed in frame B.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AngleBetweenVectorsConstraint {
    #[serde(rename = "frame_A", default)]
    pub frame_a: String,
    #[serde(rename = "frame_B", default)]
    pub frame_b: String,
    #[serde(rename = "a_A", default)]
    pub a_a: Point3,
    #[serde(rename = "b_B", default)]
    pub b_b: Point3,
    #[serde(default)]
    pub angle_lower: f64,
    #[serde(default)]
    pub angle_upper: f64,
}

/// Constraints applied along the whole plan.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default)]
    pub pos_constraints: Vec<PositionConstraint>,
    #[serde(default)]
    pub angle_constraints: Vec<AngleBetweenVectorsConstraint>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        self.pos_constraints.is_empty() && self.angle_constraints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pos_constraints.len() + self.angle_constraints.len()
    }
}

/// What to plan: named start and goal configurations plus constraints.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProblemDef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub start: SystemConfMsg,
    #[serde(default)]
    pub goal: SystemConfMsg,
    #[serde(default)]
    pub constraints: Constraints,
    /// Registered planning context (models and constraints) to plan in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<u64>,
}

/// Which system geometry the server should load.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Params {
    #[serde(default)]
    pub system_name: String,
    #[serde(default)]
    pub model_directive: String,
    #[serde(default)]
    pub robot_name: String,
}

impl Params {
    pub fn new(
        system_name: impl Into<String>,
        model_directive: impl Into<String>,
        robot_name: impl Into<String>,
    ) -> Self {
        Self {
            system_name: system_name.into(),
            model_directive: model_directive.into(),
            robot_name: robot_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StartPlanRequest {
    /// Caller-chosen request id.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub problem_def: ProblemDef,
    #[serde(default)]
    pub params: Params,
}

impl StartPlanRequest {
    pub fn new(id: impl Into<String>, problem_def: ProblemDef, params: Params) -> Self {
        Self {
            id: id.into(),
            problem_def,
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StartPlanResponse {
    /// Plan id to retrieve the result with.
    #[serde(default)]
    pub id: PlanId,
    #[serde(default)]
    pub success: bool,
    /// Server diagnostic, set on failure.
    #[serde(default)]
    pub msg: String,
}

/// How the server answers a retrieve request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetrieveType {
    /// Answer once the plan is ready or has failed.
    #[default]
    Blocking,
    /// Answer right away (or after `timeout_ms`) with the current status.
    NonBlocking,
}

/// Form of the returned plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanType {
    /// Piecewise polynomials per robot.
    #[default]
    SystemPoly,
    /// Waypoints sampled by the server every `traj_interval_ms`.
    SystemTrajectory,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RetrievePlanRequest {
    #[serde(default)]
    pub id: PlanId,
    #[serde(default)]
    pub retrieve_type: RetrieveType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub plan_type: PlanType,
    #[serde(default)]
    pub traj_interval_ms: u32,
}

impl RetrievePlanRequest {
    /// Wait for the plan to finish.
    pub fn blocking(id: impl Into<PlanId>) -> Self {
        Self {
            id: id.into(),
            retrieve_type: RetrieveType::Blocking,
            ..Self::default()
        }
    }

    /// Ask for the current status, letting the server wait up to
    /// `timeout_ms` for completion first.
    pub fn non_blocking(id: impl Into<PlanId>, timeout_ms: Option<u64>) -> Self {
        Self {
            id: id.into(),
            retrieve_type: RetrieveType::NonBlocking,
            timeout_ms,
            ..Self::default()
        }
    }

    pub fn with_plan_type(mut self, plan_type: PlanType, traj_interval_ms: u32) -> Self {
        self.plan_type = plan_type;
        self.traj_interval_ms = traj_interval_ms;
        self
    }
}

/// Coefficient vector of one polynomial, ascending powers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CoeffsMsg {
    #[serde(default)]
    pub data: Vec<f64>,
}

/// A piecewise polynomial. `coeffs` holds `(breaks - 1) * rows * cols`
/// entries, segment-major, then row, then column.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolynomialMsg {
    #[serde(default)]
    pub breaks: Vec<f64>,
    #[serde(default)]
    pub rows: u32,
    #[serde(default)]
    pub cols: u32,
    #[serde(default)]
    pub coeffs: Vec<CoeffsMsg>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SystemPolynomialMsg {
    #[serde(default)]
    pub data: BTreeMap<String, PolynomialMsg>,
}

/// Waypoints of one robot: `confs[i]` is reached at `times[i]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrajectoryMsg {
    #[serde(default)]
    pub times: Vec<f64>,
    #[serde(default)]
    pub confs: Vec<ConfMsg>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SystemTrajectoryMsg {
    #[serde(default)]
    pub data: BTreeMap<String, TrajectoryMsg>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RetrievePlanResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub status: PlanStatus,
    /// Set when `status` is `READY` and a polynomial plan was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<SystemPolynomialMsg>,
    /// Set when `status` is `READY` and a sampled trajectory was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trajectory: Option<SystemTrajectoryMsg>,
    /// Server diagnostic, set on failure.
    #[serde(default)]
    pub msg: String,
}

impl RetrievePlanResponse {
    pub fn is_ready(&self) -> bool {
        self.status == PlanStatus::Ready
    }

    pub fn is_pending(&self) -> bool {
        self.status == PlanStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_constraint_field_names_keep_frame_suffixes() {
        let constraint = PositionConstraint {
            frame_a: "franka_head".to_string(),
            frame_b: "bowl_center_location".to_string(),
            p_aq_lower: [-0.1, -0.1, -0.02],
            p_aq_upper: [0.1, 0.1, 1.0],
            p_bq: [0.0, 0.0, 0.0],
        };

        assert_eq!(
            serde_json::to_value(&constraint).unwrap(),
            json!({
                "frame_A": "franka_head",
                "frame_B": "bowl_center_location",
                "p_AQ_lower": [-0.1, -0.1, -0.02],
                "p_AQ_upper": [0.1, 0.1, 1.0],
                "p_BQ": [0.0, 0.0, 0.0]
            })
        );
    }

    #[test]
    fn test_retrieve_request_wire_shape() {
        let blocking = RetrievePlanRequest::blocking("plan-1");
        assert_eq!(
            serde_json::to_value(&blocking).unwrap(),
            json!({
                "id": "plan-1",
                "retrieve_type": "BLOCKING",
                "plan_type": "SYSTEM_POLY",
                "traj_interval_ms": 0
            })
        );

        let polling = RetrievePlanRequest::non_blocking("plan-1", Some(250))
            .with_plan_type(PlanType::SystemTrajectory, 50);
        let value = serde_json::to_value(&polling).unwrap();
        assert_eq!(value["retrieve_type"], json!("NON_BLOCKING"));
        assert_eq!(value["timeout_ms"], json!(250));
        assert_eq!(value["plan_type"], json!("SYSTEM_TRAJECTORY"));
        assert_eq!(value["traj_interval_ms"], json!(50));
    }

    #[test]
    fn test_problem_def_omits_absent_context() {
        let def = ProblemDef {
            name: "plan".to_string(),
            ..ProblemDef::default()
        };
        let value = serde_json::to_value(&def).unwrap();
        assert!(value.get("context_id").is_none());

        let with_context = ProblemDef {
            context_id: Some(16791776422234053788),
            ..def
        };
        let value = serde_json::to_value(&with_context).unwrap();
        assert_eq!(value["context_id"], json!(16791776422234053788u64));
    }

    #[test]
    fn test_retrieve_response_parses_sparse_reply() {
        let response: RetrievePlanResponse =
            serde_json::from_str(r#"{"success": true, "status": "PENDING"}"#).unwrap();
        assert!(response.is_pending());
        assert!(!response.is_ready());
        assert_eq!(response.plan, None);
        assert_eq!(response.msg, "");
    }

    #[test]
    fn test_constraints_count() {
        let mut constraints = Constraints::default();
        assert!(constraints.is_empty());
        constraints.angle_constraints.push(AngleBetweenVectorsConstraint::default());
        constraints.pos_constraints.push(PositionConstraint::default());
        assert_eq!(constraints.len(), 2);
    }
}
