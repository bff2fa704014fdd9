//! Constraint sets loaded from files.
//!
//! A constraints file lists the position and angle constraints of a
//! planning problem in JSON:
//!
//! ```json
//! {
//!   "position_constraints": [
//!     {
//!       "frame_A": "world",
//!       "frame_B": "gripper",
//!       "position_AQ_lower": [-0.1, -0.1, 0.0],
//!       "position_AQ_upper": [0.1, 0.1, 0.5]
//!     }
//!   ],
//!   "angle_constraints": [
//!     {
//!       "frame_A": "world",
//!       "frame_B": "gripper",
//!       "a_A": [0.0, 0.0, 1.0],
//!       "b_B": [0.0, 0.0, 1.0],
//!       "tolerance": 0.1
//!     }
//!   ]
//! }
//! ```
//!
//! Entries go through the encoders, so the query point of every position
//! constraint is frame B's origin and every angle range is
//! `[0, |tolerance|]`. A `position_BQ` entry is ignored, and `angle_upper`
//! is read as the tolerance.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::encode::{encode_angle_constraint, encode_position_constraint};
use crate::models::Point3;
use crate::wire::Constraints;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSpec {
    #[serde(rename = "frame_A")]
    pub frame_a: String,
    #[serde(rename = "frame_B")]
    pub frame_b: String,
    #[serde(rename = "position_AQ_lower")]
    pub lower: Point3,
    #[serde(rename = "position_AQ_upper")]
    pub upper: Point3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleSpec {
    #[serde(rename = "frame_A")]
    pub frame_a: String,
    #[serde(rename = "frame_B")]
    pub frame_b: String,
    #[serde(rename = "a_A")]
    pub a_a: Point3,
    #[serde(rename = "b_B")]
    pub b_b: Point3,
    #[serde(alias = "angle_upper")]
    pub tolerance: f64,
}

/// Contents of a constraints file. Both lists are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSpec {
    #[serde(default, alias = "pos_constraints")]
    pub position_constraints: Vec<PositionSpec>,
    #[serde(default)]
    pub angle_constraints: Vec<AngleSpec>,
}

impl ConstraintSpec {
    /// Read a constraints file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Encode every entry, keeping file order.
    pub fn to_constraints(&self) -> Constraints {
        Constraints {
            pos_constraints: self
                .position_constraints
                .iter()
                .map(|c| encode_position_constraint(&c.frame_a, &c.frame_b, c.lower, c.upper))
                .collect(),
            angle_constraints: self
                .angle_constraints
                .iter()
                .map(|c| encode_angle_constraint(&c.frame_a, &c.frame_b, c.a_a, c.b_b, c.tolerance))
                .collect(),
        }
    }
}

/// Load a constraints file and encode it for a problem definition.
pub fn load_constraints(path: &Path) -> Result<Constraints, ConfigError> {
    let spec = ConstraintSpec::load(path)?;
    tracing::debug!(
        path = %path.display(),
        position = spec.position_constraints.len(),
        angle = spec.angle_constraints.len(),
        "Loaded constraints"
    );
    Ok(spec.to_constraints())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::FRAME_B_ORIGIN;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write constraints");
        file
    }

    #[test]
    fn test_load_constraints_through_encoders() {
        let file = write_file(
            r#"{
                "position_constraints": [
                    {
                        "frame_A": "franka_head",
                        "frame_B": "bowl_center_location",
                        "position_AQ_lower": [-0.1, -0.1, -0.02],
                        "position_AQ_upper": [0.1, 0.1, 1.0],
                        "position_BQ": [0.3, 0.3, 0.3]
                    }
                ],
                "angle_constraints": [
                    {
                        "frame_A": "world",
                        "frame_B": "gripper",
                        "a_A": [0.0, 0.0, 1.0],
                        "b_B": [0.0, 0.0, -1.0],
                        "angle_lower": 0.2,
                        "angle_upper": -0.25
                    }
                ]
            }"#,
        );

        let constraints = load_constraints(file.path()).unwrap();

        assert_eq!(constraints.len(), 2);
        let position = &constraints.pos_constraints[0];
        assert_eq!(position.frame_a, "franka_head");
        assert_eq!(position.p_aq_lower, [-0.1, -0.1, -0.02]);
        assert_eq!(position.p_aq_upper, [0.1, 0.1, 1.0]);
        assert_eq!(position.p_bq, FRAME_B_ORIGIN);

        let angle = &constraints.angle_constraints[0];
        assert_eq!(angle.frame_b, "gripper");
        assert_eq!(angle.b_b, [0.0, 0.0, -1.0]);
        assert_eq!(angle.angle_lower, 0.0);
        assert_eq!(angle.angle_upper, 0.25);
    }

    #[test]
    fn test_missing_lists_are_empty() {
        let file = write_file(r#"{"angle_constraints": []}"#);
        assert!(load_constraints(file.path()).unwrap().is_empty());
    }

    #[test]
    fn test_incomplete_entry_is_parse_error() {
        let file = write_file(r#"{"position_constraints": [{"frame_A": "world"}]}"#);
        let err = load_constraints(file.path()).unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("frame_B"), "got: {}", err);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_constraints(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
