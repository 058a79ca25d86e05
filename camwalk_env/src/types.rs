//! Common value types shared by the scene collaborators and the planner.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Identifier of a mesh primitive (triangle index).
pub type PrimitiveId = i64;

/// Primitive id reported for rays that miss all geometry.
pub const MISS_PRIMITIVE: PrimitiveId = -1;

/// Result of a nearest-hit ray query.
///
/// A miss is encoded as `distance = +inf` and `primitive_id = -1`, so hit
/// buffers can be stored densely without an `Option` per ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance along the (unit) ray direction to the nearest hit
    pub distance: f64,

    /// Index of the triangle that was hit
    pub primitive_id: PrimitiveId,

    /// Unit geometric normal at the hit point (zero on miss)
    pub normal: Vector3<f64>,
}

impl RayHit {
    /// Creates a hit record.
    pub fn new(distance: f64, primitive_id: PrimitiveId, normal: Vector3<f64>) -> Self {
        Self {
            distance,
            primitive_id,
            normal,
        }
    }

    /// The miss record.
    pub fn miss() -> Self {
        Self {
            distance: f64::INFINITY,
            primitive_id: MISS_PRIMITIVE,
            normal: Vector3::zeros(),
        }
    }

    /// Returns true if the ray hit geometry.
    pub fn is_hit(&self) -> bool {
        self.primitive_id != MISS_PRIMITIVE && self.distance.is_finite()
    }
}

/// Why an occupancy query could not be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnknownReason {
    /// The voxel was never observed (or lies outside the volume)
    Unobserved,

    /// The query point had a NaN or infinite coordinate
    NonFinite,
}

/// Tri-state answer of an occupancy query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OccupancySample {
    /// Traversable space
    Free,

    /// Space occupied by scene geometry
    Occupied,

    /// No information
    Unknown(UnknownReason),
}

impl OccupancySample {
    /// Returns true for `Free`.
    pub fn is_free(&self) -> bool {
        matches!(self, OccupancySample::Free)
    }
}

/// An axis-aligned bounding box, defined by its minimum and maximum corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vector3<f64>,
    pub max: Vector3<f64>,
}

impl Aabb {
    /// Create a bounding box from its two opposite corners.
    ///
    /// The corners are normalised so that `min <= max` per axis.
    pub fn new(a: Vector3<f64>, b: Vector3<f64>) -> Self {
        Self {
            min: a.inf(&b),
            max: a.sup(&b),
        }
    }

    /// Smallest box containing every point, or `None` for an empty slice.
    pub fn from_points(points: &[Vector3<f64>]) -> Option<Self> {
        let first = points.first()?;
        let (min, max) = points
            .iter()
            .fold((*first, *first), |(lo, hi), p| (lo.inf(p), hi.sup(p)));
        Some(Self { min, max })
    }

    /// Edge lengths along each axis.
    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// True when the point lies inside or on the boundary of the box.
    pub fn contains_point(&self, p: &Vector3<f64>) -> bool {
        (0..3).all(|a| p[a] >= self.min[a] && p[a] <= self.max[a])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_is_not_hit() {
        let miss = RayHit::miss();
        assert!(!miss.is_hit());
        assert_eq!(miss.primitive_id, MISS_PRIMITIVE);
        assert!(miss.distance.is_infinite());

        let hit = RayHit::new(2.0, 7, Vector3::z());
        assert!(hit.is_hit());
    }

    #[test]
    fn test_aabb_normalises_corners() {
        let b = Aabb::new(Vector3::new(1.0, -1.0, 3.0), Vector3::new(-1.0, 1.0, 0.0));
        assert_eq!(b.min, Vector3::new(-1.0, -1.0, 0.0));
        assert_eq!(b.max, Vector3::new(1.0, 1.0, 3.0));
    }

    #[test]
    fn test_aabb_contains_boundary() {
        let b = Aabb::new(Vector3::new(-1.0, -2.0, -3.0), Vector3::new(1.0, 2.0, 3.0));
        assert!(b.contains_point(&Vector3::new(1.0, -2.0, 3.0)));
        assert!(!b.contains_point(&Vector3::new(1.0001, 0.0, 0.0)));
        assert!(!b.contains_point(&Vector3::new(f64::NAN, 0.0, 0.0)));
    }

    #[test]
    fn test_aabb_from_points() {
        assert!(Aabb::from_points(&[]).is_none());
        let b = Aabb::from_points(&[
            Vector3::new(0.0, 5.0, -1.0),
            Vector3::new(2.0, -3.0, 4.0),
        ])
        .unwrap();
        assert_eq!(b.min, Vector3::new(0.0, -3.0, -1.0));
        assert_eq!(b.max, Vector3::new(2.0, 5.0, 4.0));
    }
}
