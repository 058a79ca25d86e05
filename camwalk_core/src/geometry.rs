//! Geometric primitives used by the planner: slab clipping, camera frames
//! and box bounds.

use crate::error::PlanError;
use camwalk_env::Aabb;
use nalgebra::{Matrix3, Vector3};

/// Parameter interval `[t_min, t_max]` of a ray inside a box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlabInterval {
    pub t_min: f64,
    pub t_max: f64,
}

impl SlabInterval {
    /// The interval of an unclipped ray.
    pub fn unbounded() -> Self {
        Self {
            t_min: f64::NEG_INFINITY,
            t_max: f64::INFINITY,
        }
    }

    /// True when the ray overlaps the box.
    pub fn is_nonempty(&self) -> bool {
        self.t_max > self.t_min
    }
}

/// Clips a ray against an axis-aligned box (slab method).
///
/// Axes whose direction component has magnitude `<= gamma` leave the
/// interval unchanged, so a ray parallel to a slab is never clipped by it.
pub fn slab_clip(origin: &Vector3<f64>, direction: &Vector3<f64>, bounds: &Aabb, gamma: f64) -> SlabInterval {
    let mut interval = SlabInterval::unbounded();

    for a in 0..3 {
        if direction[a].abs() > gamma {
            let t0 = (bounds.min[a] - origin[a]) / direction[a];
            let t1 = (bounds.max[a] - origin[a]) / direction[a];
            interval.t_min = interval.t_min.max(t0.min(t1));
            interval.t_max = interval.t_max.min(t0.max(t1));
        }
    }

    interval
}

/// Clips a ray that must start inside the occupancy volume.
///
/// Fails with `RayOutsideVolume` unless the interval is finite, non-empty
/// and contains the origin up to `start_slack` (the origin may sit at most
/// that far outside the box).
pub fn clip_to_volume(
    ray: usize,
    origin: &Vector3<f64>,
    direction: &Vector3<f64>,
    bounds: &Aabb,
    gamma: f64,
    start_slack: f64,
) -> Result<SlabInterval, PlanError> {
    let interval = slab_clip(origin, direction, bounds, gamma);

    let valid = interval.t_min.is_finite()
        && interval.t_max.is_finite()
        && interval.is_nonempty()
        && interval.t_min < start_slack
        && interval.t_max > -start_slack;

    if valid {
        Ok(interval)
    } else {
        Err(PlanError::RayOutsideVolume {
            ray,
            t_min: interval.t_min,
            t_max: interval.t_max,
        })
    }
}

/// Pulls a hit distance back toward the ray origin, never below `floor`.
///
/// Infinite distances (misses) stay infinite.
pub fn pull_back(distance: f64, margin: f64, floor: f64) -> f64 {
    (distance - margin).max(floor)
}

/// World-from-camera rotation for a camera at `look_from` looking at
/// `look_at`.
///
/// Columns are right, up and backward (+z points away from the view
/// direction).
pub fn camera_frame(look_from: &Vector3<f64>, look_at: &Vector3<f64>, up_hint: &Vector3<f64>) -> Matrix3<f64> {
    let backward = (look_from - look_at).normalize();
    let right = -backward.cross(up_hint).normalize();
    let up = backward.cross(&right).normalize();
    Matrix3::from_columns(&[right, up, backward])
}

/// Unit view direction of a world-from-camera rotation.
pub fn view_direction(orientation: &Matrix3<f64>) -> Vector3<f64> {
    (-orientation.column(2)).normalize()
}

/// True when `point` lies inside `[center - half_extent, center + half_extent]`.
///
/// Infinite half extents make the corresponding axis unbounded.
pub fn within_half_extent(point: &Vector3<f64>, center: &Vector3<f64>, half_extent: &Vector3<f64>) -> bool {
    (0..3).all(|a| point[a] >= center[a] - half_extent[a] && point[a] <= center[a] + half_extent[a])
}
