//! Error types for trajectory planning.
//!
//! Every variant is fatal for the run: the planner never relaxes a filter or
//! retries outside the bounded perturbation loop of the initial resolver.

use camwalk_env::EnvError;
use std::fmt;
use thiserror::Error;

/// Which running point a candidate set was sampled around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorKind {
    LookFrom,
    LookAt,
}

impl fmt::Display for AnchorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorKind::LookFrom => write!(f, "look-from"),
            AnchorKind::LookAt => write!(f, "look-at"),
        }
    }
}

/// Candidate filter stage, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStage {
    /// Uniform draw around the current anchor
    LocalBox,
    /// Global bound around the start anchor
    StartBox,
    /// Occupancy must be Free
    Occupancy,
    /// Unoccluded straight line from the current anchor
    LineOfSight,
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterStage::LocalBox => "local box",
            FilterStage::StartBox => "start box",
            FilterStage::Occupancy => "occupancy",
            FilterStage::LineOfSight => "line of sight",
        };
        write!(f, "{}", name)
    }
}

/// Errors that abort a planning run.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The start pose's full ray bundle misses all geometry
    #[error("Unobservable scene: camera doesn't observe any part of the scene, all intersection distances are at infinity")]
    UnobservableScene,

    /// No Free occupancy sample near any observed intersection
    #[error("No traversable space: all observed occupancy samples are unknown or occupied after {attempts} perturbation attempts")]
    NoTraversableSpace { attempts: usize },

    /// A candidate filter stage removed every point
    #[error("No traversable space: {stage} filter left no {anchor} candidates at step {step}")]
    EmptyCandidates {
        anchor: AnchorKind,
        stage: FilterStage,
        step: usize,
    },

    /// A ray origin lies outside the occupancy volume's bounding box
    #[error("Ray {ray} does not start inside the occupancy volume (t_min={t_min}, t_max={t_max})")]
    RayOutsideVolume { ray: usize, t_min: f64, t_max: f64 },

    /// Planner parameters are unusable
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Input arrays are malformed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation not allowed in the controller's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Scene construction failed
    #[error(transparent)]
    Env(#[from] EnvError),
}

impl PlanError {
    /// Creates an invalid config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Creates an invalid input error.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// True for the "no traversable space" failure class.
    pub fn is_no_traversable_space(&self) -> bool {
        matches!(
            self,
            PlanError::NoTraversableSpace { .. } | PlanError::EmptyCandidates { .. }
        )
    }

    /// True for the "unobservable scene" failure class.
    pub fn is_unobservable(&self) -> bool {
        matches!(self, PlanError::UnobservableScene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_classes() {
        assert!(PlanError::UnobservableScene.is_unobservable());
        assert!(PlanError::NoTraversableSpace { attempts: 8 }.is_no_traversable_space());
        assert!(PlanError::EmptyCandidates {
            anchor: AnchorKind::LookAt,
            stage: FilterStage::Occupancy,
            step: 3,
        }
        .is_no_traversable_space());
        assert!(!PlanError::config("x").is_no_traversable_space());
    }

    #[test]
    fn test_messages_name_the_stage() {
        let err = PlanError::EmptyCandidates {
            anchor: AnchorKind::LookFrom,
            stage: FilterStage::LineOfSight,
            step: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("line of sight"));
        assert!(msg.contains("look-from"));
    }
}
