//! Command-line caller for the motion planning service.
//!
//! Submits a start request for one robot, retrieves the resulting plan and
//! logs a summary of it.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use motion_planner_client::config::{default_config_path, default_endpoint};
use motion_planner_client::constraints::load_constraints;
use motion_planner_client::decode::{decode_system_plan, decode_system_trajectory};
use motion_planner_client::encode::problem_definition;
use motion_planner_client::models::sample_system_plan;
use motion_planner_client::wire::Constraints;
use motion_planner_client::{
    ClientConfig, Params, PlanStatus, PlanType, PlannerClient, RetrievePlanRequest,
    StartPlanRequest, SystemConf,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Planning service address (host:port); overrides the config file
    #[arg(short, long)]
    addr: Option<String>,

    /// Path to a JSON client config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Robot to plan for
    #[arg(long, default_value = "robot_arm")]
    robot: String,

    /// System the robot belongs to
    #[arg(long, default_value = "test-system")]
    system_name: String,

    /// Model directive describing the system geometry
    #[arg(long, default_value = "example_geometry")]
    model_directive: String,

    /// Registered planning context to plan in
    #[arg(long)]
    context_id: Option<u64>,

    /// JSON file of position and angle constraints
    #[arg(long)]
    constraints: Option<PathBuf>,

    /// Request piecewise polynomials instead of sampled waypoints
    #[arg(long, conflicts_with = "traj")]
    poly: bool,

    /// Request sampled waypoints (the default)
    #[arg(long)]
    traj: bool,

    /// Waypoint interval in milliseconds for trajectory replies
    #[arg(long, default_value_t = 50)]
    interval: u32,

    /// Return the current status instead of waiting for the plan
    #[arg(long)]
    non_blocking: bool,

    /// Server-side wait before a non-blocking reply, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Rate for sampling polynomial plans in the summary (with --poly)
    #[arg(long, default_value_t = 20.0)]
    sample_hz: f64,
}

fn load_config(args: &Args) -> Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::load(path)?,
        None => {
            let path = default_config_path();
            if path.exists() {
                ClientConfig::load(&path)?
            } else {
                tracing::warn!("No client config found; using an unencrypted channel");
                ClientConfig::insecure(default_endpoint())
            }
        }
    };
    if let Some(addr) = &args.addr {
        config.endpoint = addr.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "motion_planner_client=info,planner_client=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    tracing::info!(endpoint = %config.endpoint, "Starting motion planner client v{}", env!("CARGO_PKG_VERSION"));

    let client = PlannerClient::new(&config);

    let constraints = match &args.constraints {
        Some(path) => load_constraints(path)?,
        None => Constraints::default(),
    };

    let mut empty = SystemConf::new();
    empty.insert(args.robot.clone(), Vec::new());
    let request = StartPlanRequest::new(
        client.new_correlation_id(),
        problem_definition("plan", &empty, &empty, constraints, args.context_id),
        Params::new(&args.system_name, &args.model_directive, &args.robot),
    );

    let started = client.submit(&request).await.context("Start RPC call failed")?;
    if !started.success {
        bail!("Planner rejected the request: {}", started.msg);
    }

    let mut retrieve = if args.non_blocking {
        RetrievePlanRequest::non_blocking(started.id.clone(), args.timeout_ms)
    } else {
        RetrievePlanRequest::blocking(started.id.clone())
    };
    if args.traj || !args.poly {
        retrieve = retrieve.with_plan_type(PlanType::SystemTrajectory, args.interval);
    }

    let response = client.retrieve(&retrieve).await.context("Retrieval RPC call failed")?;

    match response.status {
        PlanStatus::Ready => {}
        PlanStatus::Pending => {
            tracing::info!(plan_id = %started.id, "Plan not ready yet");
            return Ok(());
        }
        PlanStatus::Failed => bail!("Planning failed: {}", response.msg),
        PlanStatus::Unknown => bail!("Planner returned an unknown status: {}", response.msg),
    }

    let trajectory = if let Some(trajectory) = &response.trajectory {
        decode_system_trajectory(trajectory)?
    } else if let Some(plan) = &response.plan {
        let plan = decode_system_plan(plan)?;
        for (robot, poly) in &plan {
            tracing::info!(
                robot = %robot,
                segments = poly.segment_count(),
                start = poly.start_time(),
                end = poly.end_time(),
                "Decoded polynomial plan"
            );
        }
        sample_system_plan(&plan, args.sample_hz)
    } else {
        bail!("Plan {} is ready but the reply carries no plan", started.id);
    };

    for (robot, waypoints) in &trajectory {
        match (waypoints.first(), waypoints.last()) {
            (Some(first), Some(last)) => tracing::info!(
                robot = %robot,
                waypoints = waypoints.len(),
                "t={:.3} {:?} -> t={:.3} {:?}",
                first.time,
                first.conf,
                last.time,
                last.conf
            ),
            _ => tracing::info!(robot = %robot, "Empty trajectory"),
        }
    }

    Ok(())
}
