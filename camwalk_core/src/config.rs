//! Planner configuration.

use crate::error::PlanError;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a planning run.
///
/// Defaults are the production values used for indoor scenes in meters.
/// Missing JSON fields fall back to these defaults. In JSON, a `null`
/// component of `half_extent_relative_to_start` means "unbounded".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Number of poses in the trajectory, including the start pose
    pub trajectory_length: usize,

    /// Points drawn per anchor per step before filtering
    pub occupancy_query_samples: usize,

    /// (look-from, look-at) pairs scored per step
    pub pose_candidates: usize,

    /// Edge length of an occupancy voxel
    pub voxel_size: f64,

    /// Global bound, relative to the start look-from / look-at
    #[serde(with = "unbounded_extent")]
    pub half_extent_relative_to_start: Vector3<f64>,

    /// Local sampling box, relative to the current look-from / look-at
    pub half_extent_relative_to_current: Vector3<f64>,

    /// Up direction that per-step up hints are perturbed around
    pub up_hint_nominal: Vector3<f64>,

    /// Standard deviation of the Gaussian up-hint noise (per component)
    pub up_hint_noise_std_dev: f64,

    /// Line-of-sight margin: a point is visible if it is closer than
    /// `(1 - eps)` times the geometry along the same ray
    pub line_of_sight_eps: f64,

    /// Minimum distance between the start look-from and look-at
    pub min_look_at_offset: f64,

    /// Constant added to every view score; large values flatten selection
    /// toward uniform
    pub score_floor: f64,

    /// Bundle casts tried by the initial resolver before giving up
    pub perturb_attempts: usize,

    /// Origin shift per perturbation attempt, in voxels, along the backward axis
    pub perturb_step_voxels: f64,

    /// Pull-back from a surface hit, in voxels, so the query leaves the hit voxel
    pub surface_margin_voxels: f64,

    /// Direction components at or below this magnitude don't clip a slab
    pub slab_gamma: f64,

    /// How far (in voxels) a ray origin may sit outside the volume bounds
    pub slab_start_slack_voxels: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            trajectory_length: 100,
            occupancy_query_samples: 1000,
            pose_candidates: 20,
            voxel_size: 0.1,
            half_extent_relative_to_start: Vector3::new(f64::INFINITY, f64::INFINITY, 0.25),
            half_extent_relative_to_current: Vector3::new(1.5, 1.5, 0.25),
            up_hint_nominal: Vector3::new(0.0, 0.0, 1.0),
            up_hint_noise_std_dev: 0.1,
            line_of_sight_eps: 0.01,
            min_look_at_offset: 0.0001,
            score_floor: 0.0,
            perturb_attempts: 8,
            perturb_step_voxels: 0.25,
            surface_margin_voxels: 1.75,
            slab_gamma: 0.000001,
            slab_start_slack_voxels: 0.5 * 1.75,
        }
    }
}

impl PlannerConfig {
    /// Loads a config from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| PlanError::config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Parses a config from JSON text and validates it.
    pub fn from_json_str(text: &str) -> Result<Self, PlanError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| PlanError::config(format!("malformed config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the trajectory length.
    pub fn with_trajectory_length(mut self, length: usize) -> Self {
        self.trajectory_length = length;
        self
    }

    /// Sets the voxel size.
    pub fn with_voxel_size(mut self, voxel_size: f64) -> Self {
        self.voxel_size = voxel_size;
        self
    }

    /// Sets the per-step sample counts.
    pub fn with_samples(mut self, occupancy_query_samples: usize, pose_candidates: usize) -> Self {
        self.occupancy_query_samples = occupancy_query_samples;
        self.pose_candidates = pose_candidates;
        self
    }

    /// Sets both half-extent vectors.
    pub fn with_half_extents(mut self, relative_to_start: Vector3<f64>, relative_to_current: Vector3<f64>) -> Self {
        self.half_extent_relative_to_start = relative_to_start;
        self.half_extent_relative_to_current = relative_to_current;
        self
    }

    /// Sets the score floor (lambda).
    pub fn with_score_floor(mut self, score_floor: f64) -> Self {
        self.score_floor = score_floor;
        self
    }

    /// Pull-back distance from a surface hit.
    pub fn surface_margin(&self) -> f64 {
        self.surface_margin_voxels * self.voxel_size
    }

    /// Origin shift per perturbation attempt.
    pub fn perturb_step(&self) -> f64 {
        self.perturb_step_voxels * self.voxel_size
    }

    /// Largest allowed entry parameter for a clipped ray.
    pub fn slab_start_slack(&self) -> f64 {
        self.slab_start_slack_voxels * self.voxel_size
    }

    /// Checks that every parameter is usable.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.trajectory_length == 0 {
            return Err(PlanError::config("trajectory_length must be at least 1"));
        }
        if self.occupancy_query_samples == 0 {
            return Err(PlanError::config("occupancy_query_samples must be at least 1"));
        }
        if self.pose_candidates == 0 {
            return Err(PlanError::config("pose_candidates must be at least 1"));
        }
        if self.perturb_attempts == 0 {
            return Err(PlanError::config("perturb_attempts must be at least 1"));
        }
        if !(self.voxel_size.is_finite() && self.voxel_size > 0.0) {
            return Err(PlanError::config(format!("voxel_size must be positive, got {}", self.voxel_size)));
        }
        if !self.half_extent_relative_to_current.iter().all(|c| c.is_finite() && *c >= 0.0) {
            return Err(PlanError::config("half_extent_relative_to_current must be finite and non-negative"));
        }
        if !self.half_extent_relative_to_start.iter().all(|c| !c.is_nan() && *c >= 0.0) {
            return Err(PlanError::config("half_extent_relative_to_start must be non-negative"));
        }
        if !self.up_hint_nominal.iter().all(|c| c.is_finite()) || self.up_hint_nominal.norm() == 0.0 {
            return Err(PlanError::config("up_hint_nominal must be a finite non-zero vector"));
        }
        if !(self.up_hint_noise_std_dev.is_finite() && self.up_hint_noise_std_dev >= 0.0) {
            return Err(PlanError::config("up_hint_noise_std_dev must be non-negative"));
        }
        if !(0.0..1.0).contains(&self.line_of_sight_eps) {
            return Err(PlanError::config("line_of_sight_eps must lie in [0, 1)"));
        }
        if !(self.min_look_at_offset.is_finite() && self.min_look_at_offset >= 0.0) {
            return Err(PlanError::config("min_look_at_offset must be non-negative"));
        }
        if !(self.score_floor.is_finite() && self.score_floor >= 0.0) {
            return Err(PlanError::config("score_floor must be non-negative"));
        }
        let non_negative = [
            ("perturb_step_voxels", self.perturb_step_voxels),
            ("surface_margin_voxels", self.surface_margin_voxels),
            ("slab_gamma", self.slab_gamma),
            ("slab_start_slack_voxels", self.slab_start_slack_voxels),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(PlanError::config(format!("{} must be non-negative, got {}", name, value)));
            }
        }
        Ok(())
    }
}

/// Serializes infinite extent components as `null`.
mod unbounded_extent {
    use nalgebra::Vector3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(extent: &Vector3<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        let components: [Option<f64>; 3] = [0usize, 1, 2].map(|a| extent[a].is_finite().then_some(extent[a]));
        components.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vector3<f64>, D::Error> {
        let components = <[Option<f64>; 3]>::deserialize(deserializer)?;
        Ok(Vector3::from(components.map(|c| c.unwrap_or(f64::INFINITY))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PlannerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.perturb_attempts, 8);
        assert!((config.surface_margin() - 0.175).abs() < 1e-12);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PlannerConfig::from_json_str(
            r#"{ "trajectory_length": 5, "voxel_size": 1.0, "half_extent_relative_to_start": [null, 3.0, null] }"#,
        )
        .unwrap();

        assert_eq!(config.trajectory_length, 5);
        assert_eq!(config.pose_candidates, 20);
        assert_eq!(config.half_extent_relative_to_start.x, f64::INFINITY);
        assert_eq!(config.half_extent_relative_to_start.y, 3.0);
        assert_eq!(config.half_extent_relative_to_start.z, f64::INFINITY);
    }

    #[test]
    fn test_unbounded_extent_round_trips_through_json() {
        let config = PlannerConfig::default();
        let text = serde_json::to_string(&config).unwrap();
        assert!(text.contains("[null,null,0.25]"));
        let back = PlannerConfig::from_json_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(PlannerConfig::default().with_trajectory_length(0).validate().is_err());
        assert!(PlannerConfig::default().with_voxel_size(-1.0).validate().is_err());
        assert!(PlannerConfig::default().with_samples(0, 3).validate().is_err());
        assert!(PlannerConfig::default().with_score_floor(-0.5).validate().is_err());

        let mut config = PlannerConfig::default();
        config.half_extent_relative_to_current.x = f64::INFINITY;
        assert!(config.validate().is_err());

        let mut config = PlannerConfig::default();
        config.line_of_sight_eps = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = PlannerConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, PlanError::InvalidConfig(_)));
    }
}
