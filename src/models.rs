//! Domain types for multi-robot motion planning.
//!
//! These are the in-process values a caller works with. Their wire
//! counterparts live in [`crate::wire`]; [`crate::encode`] and
//! [`crate::decode`] convert between the two.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::decode::MalformedPlanError;

/// Joint positions of one robot, in joint order.
pub type RobotConf = Vec<f64>;

/// Configuration of every robot in a system, keyed by robot name.
pub type SystemConf = BTreeMap<String, RobotConf>;

/// A position or direction in a named frame.
pub type Point3 = [f64; 3];

/// Decoded plan: one trajectory per robot.
pub type SystemPlan = BTreeMap<String, PiecewisePolynomial>;

/// Sampled plan: timed joint positions per robot.
pub type SystemTrajectory = BTreeMap<String, Vec<Waypoint>>;

/// Most waypoints [`PiecewisePolynomial::sample`] produces for one robot.
pub const MAX_SAMPLES: usize = 1_000_000;

/// Server-issued identifier of a planning request and its result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(String);

impl PlanId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PlanId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for PlanId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Server-side state of a submitted plan.
///
/// `Pending` is only ever observed through a non-blocking retrieve.
/// Includes `Unknown` for forward-compatibility with new states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    Pending,
    Ready,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Pending => "Pending",
            PlanStatus::Ready => "Ready",
            PlanStatus::Failed => "Failed",
            PlanStatus::Unknown => "Unknown",
        }
    }

    /// Check if the plan can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlanStatus::Ready | PlanStatus::Failed)
    }
}

/// Joint positions of one robot at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub time: f64,
    pub conf: RobotConf,
}

/// A piecewise polynomial trajectory.
///
/// The trajectory spans `breaks[0]..=breaks[last]` and is split into
/// `breaks.len() - 1` segments. Each segment holds a `rows x cols` matrix
/// of polynomials; each polynomial is a coefficient vector in ascending
/// powers of the time elapsed since the segment's start. For joint
/// trajectories `rows` is the robot's degree-of-freedom count and `cols`
/// is 1.
///
/// Coefficients are stored segment-major, then row, then column, which is
/// also their order on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewisePolynomial {
    breaks: Vec<f64>,
    rows: usize,
    cols: usize,
    coefficients: Vec<Vec<f64>>,
}

impl PiecewisePolynomial {
    /// Build a trajectory, checking its structure.
    ///
    /// # Errors
    ///
    /// - fewer than two breakpoints
    /// - breakpoints that are not finite and strictly increasing
    /// - a coefficient count other than `segments * rows * cols`
    pub fn new(
        breaks: Vec<f64>,
        rows: usize,
        cols: usize,
        coefficients: Vec<Vec<f64>>,
    ) -> Result<Self, MalformedPlanError> {
        if breaks.len() < 2 {
            return Err(MalformedPlanError::TooFewBreaks { count: breaks.len() });
        }
        if let Some(index) = first_unordered(&breaks) {
            return Err(MalformedPlanError::NonIncreasingBreaks { index });
        }

        let expected = (breaks.len() - 1).saturating_mul(rows).saturating_mul(cols);
        if coefficients.len() != expected {
            return Err(MalformedPlanError::CoefficientCount {
                expected,
                actual: coefficients.len(),
            });
        }

        Ok(Self {
            breaks,
            rows,
            cols,
            coefficients,
        })
    }

    pub fn breaks(&self) -> &[f64] {
        &self.breaks
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn segment_count(&self) -> usize {
        self.breaks.len() - 1
    }

    pub fn start_time(&self) -> f64 {
        self.breaks[0]
    }

    pub fn end_time(&self) -> f64 {
        self.breaks[self.breaks.len() - 1]
    }

    pub fn duration(&self) -> f64 {
        self.end_time() - self.start_time()
    }

    /// All coefficient vectors in wire order.
    pub fn raw_coefficients(&self) -> &[Vec<f64>] {
        &self.coefficients
    }

    /// Coefficients of one entry of one segment.
    pub fn coefficients(&self, segment: usize, row: usize, col: usize) -> Option<&[f64]> {
        if segment >= self.segment_count() || row >= self.rows || col >= self.cols {
            return None;
        }
        let index = (segment * self.rows + row) * self.cols + col;
        self.coefficients.get(index).map(Vec::as_slice)
    }

    /// Index of the segment containing `t`; the final breakpoint belongs
    /// to the last segment.
    pub fn segment_index(&self, t: f64) -> Option<usize> {
        if !(self.start_time()..=self.end_time()).contains(&t) {
            return None;
        }
        let after = self.breaks.partition_point(|&b| b <= t);
        Some((after - 1).min(self.segment_count() - 1))
    }

    /// Evaluate the trajectory at `t`, returning the `rows x cols` matrix
    /// in row-major order. `None` outside `[start_time, end_time]`.
    pub fn value(&self, t: f64) -> Option<Vec<f64>> {
        let segment = self.segment_index(t)?;
        let tau = t - self.breaks[segment];
        let per_segment = self.rows * self.cols;
        let block = &self.coefficients[segment * per_segment..(segment + 1) * per_segment];
        Some(block.iter().map(|poly| horner(poly, tau)).collect())
    }

    /// Sample at a fixed rate from the start time up to, but excluding,
    /// the end time. The start is always included.
    ///
    /// Sample times are strictly increasing: steps that round onto the
    /// previous time (tiny steps on large breakpoints) are skipped. A
    /// non-positive or non-finite rate, or one that would produce more
    /// than [`MAX_SAMPLES`] samples, yields no samples.
    pub fn sample(&self, rate_hz: f64) -> Vec<Waypoint> {
        if !rate_hz.is_finite() || rate_hz <= 0.0 {
            return Vec::new();
        }

        let steps = self.duration() * rate_hz;
        if steps >= MAX_SAMPLES as f64 {
            tracing::warn!(
                rate_hz,
                duration = self.duration(),
                max = MAX_SAMPLES,
                "Sampling rate too high for trajectory; no samples taken"
            );
            return Vec::new();
        }

        let mut waypoints: Vec<Waypoint> = Vec::with_capacity(steps.ceil() as usize + 1);
        let mut k = 0u64;
        loop {
            let time = self.start_time() + k as f64 / rate_hz;
            if k > 0 && time >= self.end_time() {
                break;
            }
            k += 1;
            if waypoints.last().is_some_and(|last| time <= last.time) {
                continue;
            }
            match self.value(time) {
                Some(conf) => waypoints.push(Waypoint { time, conf }),
                None => break,
            }
        }
        waypoints
    }
}

/// Sample every robot's trajectory at `rate_hz`.
pub fn sample_system_plan(plan: &SystemPlan, rate_hz: f64) -> SystemTrajectory {
    plan.iter()
        .map(|(robot, poly)| (robot.clone(), poly.sample(rate_hz)))
        .collect()
}

/// Index of the first value that is non-finite or not greater than its
/// predecessor.
pub(crate) fn first_unordered(values: &[f64]) -> Option<usize> {
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        return Some(index);
    }
    values
        .windows(2)
        .position(|pair| pair[1] <= pair[0])
        .map(|i| i + 1)
}

fn horner(coefficients: &[f64], tau: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * tau + c)
}
