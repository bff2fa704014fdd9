//! Motion Planner Client Library
//!
//! A typed client for a remote multi-robot motion planning service:
//!
//! - `encode` - domain values (configurations, constraints) to wire messages
//! - `decode` - wire plans back to piecewise polynomial trajectories
//! - `client` - submit planning requests and retrieve their results
//! - `rpc` - JSON-RPC 2.0 transport over TCP
//! - `wire` - request and response messages of the service
//! - `models` - domain types shared by the above
//! - `config` - endpoint, channel security and deadlines
//! - `constraints` - constraint sets loaded from JSON files
//!
//! # Usage
//!
//! ```ignore
//! use motion_planner_client::encode::{encode_position_constraint, problem_definition};
//! use motion_planner_client::decode::decode_system_plan;
//! use motion_planner_client::{ClientConfig, Params, PlannerClient, RetrievePlanRequest, StartPlanRequest};
//!
//! let client = PlannerClient::new(&ClientConfig::insecure("localhost:5050"));
//! let def = problem_definition("plan", &start, &goal, constraints, None);
//! let request = StartPlanRequest::new(
//!     client.new_correlation_id(),
//!     def,
//!     Params::new("test-system", "example_geometry", "robot_arm"),
//! );
//! let started = client.submit(&request).await?;
//! let finished = client.retrieve(&RetrievePlanRequest::blocking(started.id)).await?;
//! let plan = decode_system_plan(&finished.plan.unwrap_or_default())?;
//! ```

pub mod client;
pub mod config;
pub mod constraints;
pub mod decode;
pub mod encode;
pub mod models;
pub mod rpc;
pub mod wire;

pub use client::{CallOptions, ClientError, Operation, PlannerClient};
pub use config::{ChannelSecurity, ClientConfig, ConfigError};
pub use constraints::{load_constraints, ConstraintSpec};
pub use decode::MalformedPlanError;
pub use models::{PiecewisePolynomial, PlanId, PlanStatus, Point3, RobotConf, SystemConf, SystemPlan, Waypoint};
pub use rpc::TransportError;
pub use wire::{
    Params, PlanType, ProblemDef, RetrievePlanRequest, RetrievePlanResponse, RetrieveType,
    StartPlanRequest, StartPlanResponse,
};
