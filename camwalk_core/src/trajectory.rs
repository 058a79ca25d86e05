//! Poses, per-pose diagnostics and the trajectory container.

use camwalk_env::{PrimitiveId, RayHit, MISS_PRIMITIVE};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A camera pose.
///
/// `orientation` is world-from-camera: column 0 is right, column 1 is up and
/// column 2 points backward, away from the view direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub look_from: Vector3<f64>,
    pub look_at: Vector3<f64>,
    pub orientation: Matrix3<f64>,
}

impl Pose {
    pub fn new(look_from: Vector3<f64>, look_at: Vector3<f64>, orientation: Matrix3<f64>) -> Self {
        Self {
            look_from,
            look_at,
            orientation,
        }
    }

    /// Unit view direction, `-orientation.col(2)`.
    pub fn view_direction(&self) -> Vector3<f64> {
        crate::geometry::view_direction(&self.orientation)
    }
}

/// Hit distances and primitive ids of one full bundle cast.
///
/// Misses are stored as `+inf` / `-1`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagnosticRow {
    pub distances: Vec<f64>,
    pub primitive_ids: Vec<PrimitiveId>,
}

impl DiagnosticRow {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            distances: Vec::with_capacity(capacity),
            primitive_ids: Vec::with_capacity(capacity),
        }
    }

    /// Appends one ray result.
    pub fn push(&mut self, hit: &RayHit) {
        if hit.is_hit() {
            self.distances.push(hit.distance);
            self.primitive_ids.push(hit.primitive_id);
        } else {
            self.distances.push(f64::INFINITY);
            self.primitive_ids.push(MISS_PRIMITIVE);
        }
    }

    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Number of rays that hit geometry.
    pub fn hit_count(&self) -> usize {
        self.distances.iter().filter(|d| d.is_finite()).count()
    }

    /// Fraction of rays that hit geometry (0 for an empty row).
    pub fn hit_fraction(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.hit_count() as f64 / self.len() as f64
        }
    }

    /// Number of distinct primitive ids in the row.
    ///
    /// The miss id counts as one more value when any ray missed.
    pub fn unique_primitives(&self) -> usize {
        self.primitive_ids.iter().collect::<BTreeSet<_>>().len()
    }
}

/// An ordered, append-only sequence of poses with one diagnostic row each.
///
/// Pose 0 is the resolved start pose. Stored poses are never handed out
/// mutably.
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    poses: Vec<Pose>,
    diagnostics: Vec<DiagnosticRow>,
}

impl Trajectory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            poses: Vec::with_capacity(capacity),
            diagnostics: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, pose: Pose, row: DiagnosticRow) {
        self.poses.push(pose);
        self.diagnostics.push(row);
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn poses(&self) -> &[Pose] {
        &self.poses
    }

    pub fn pose(&self, index: usize) -> Option<&Pose> {
        self.poses.get(index)
    }

    pub fn last(&self) -> Option<&Pose> {
        self.poses.last()
    }

    pub fn diagnostics(&self) -> &[DiagnosticRow] {
        &self.diagnostics
    }

    /// Look-from positions, N×3.
    pub fn look_from_positions(&self) -> Vec<[f64; 3]> {
        self.poses.iter().map(|p| p.look_from.into()).collect()
    }

    /// Look-at positions, N×3.
    pub fn look_at_positions(&self) -> Vec<[f64; 3]> {
        self.poses.iter().map(|p| p.look_at.into()).collect()
    }

    /// Orientations, N×3×3, row-major per pose.
    pub fn orientations(&self) -> Vec<[[f64; 3]; 3]> {
        self.poses
            .iter()
            .map(|p| {
                let m = &p.orientation;
                [
                    [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
                    [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
                    [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
                ]
            })
            .collect()
    }
}
