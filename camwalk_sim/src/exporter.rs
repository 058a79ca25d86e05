//! JSON exporter for planned trajectories.
//!
//! Writes the five per-pose arrays consumed by the capture pipeline. Ray
//! misses are written as `null` distances and `-1` primitive ids.

use camwalk_core::Trajectory;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A complete trajectory export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryExport {
    /// Seed used for planning
    pub seed: u64,

    /// Camera positions, N×3
    pub look_from_positions: Vec<[f64; 3]>,

    /// Look-at points, N×3
    pub look_at_positions: Vec<[f64; 3]>,

    /// World-from-camera rotations, N×3×3 (row-major)
    pub orientations: Vec<[[f64; 3]; 3]>,

    /// Per-pose bundle hit distances, N×K
    pub distances: Vec<Vec<Option<f64>>>,

    /// Per-pose bundle primitive ids, N×K
    pub primitive_ids: Vec<Vec<i64>>,
}

impl TrajectoryExport {
    /// Creates an export from a finished trajectory.
    pub fn new(seed: u64, trajectory: &Trajectory) -> Self {
        let diagnostics = trajectory.diagnostics();

        Self {
            seed,
            look_from_positions: trajectory.look_from_positions(),
            look_at_positions: trajectory.look_at_positions(),
            orientations: trajectory.orientations(),
            distances: diagnostics
                .iter()
                .map(|row| row.distances.iter().map(|d| d.is_finite().then_some(*d)).collect())
                .collect(),
            primitive_ids: diagnostics.iter().map(|row| row.primitive_ids.clone()).collect(),
        }
    }

    /// Number of poses.
    pub fn len(&self) -> usize {
        self.look_from_positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.look_from_positions.is_empty()
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Reads an export back from a JSON file.
    pub fn read_from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
