//! Occupancy volume interface.

use crate::types::{Aabb, OccupancySample, UnknownReason};
use nalgebra::Vector3;

/// Ternary free/occupied/unknown queries over a bounded region.
///
/// Implementors provide [`lookup`](OccupancyVolume::lookup) for finite
/// points and the volume bounds; [`query`](OccupancyVolume::query) adds the
/// non-finite guard so callers can pass unchecked points.
pub trait OccupancyVolume {
    /// Looks up the state of the voxel containing a finite point.
    fn lookup(&self, point: &Vector3<f64>) -> OccupancySample;

    /// Minimum corner of the volume's bounding box.
    fn bounds_min(&self) -> Vector3<f64>;

    /// Maximum corner of the volume's bounding box.
    fn bounds_max(&self) -> Vector3<f64>;

    /// Queries the state at `point`.
    ///
    /// Points with a NaN or infinite coordinate map to
    /// `Unknown(NonFinite)` instead of reaching `lookup`.
    fn query(&self, point: &Vector3<f64>) -> OccupancySample {
        if point.iter().all(|c| c.is_finite()) {
            self.lookup(point)
        } else {
            OccupancySample::Unknown(UnknownReason::NonFinite)
        }
    }

    /// Bounding box of the volume.
    fn bounds(&self) -> Aabb {
        Aabb::new(self.bounds_min(), self.bounds_max())
    }
}

impl<T: OccupancyVolume + ?Sized> OccupancyVolume for &T {
    fn lookup(&self, point: &Vector3<f64>) -> OccupancySample {
        (**self).lookup(point)
    }

    fn bounds_min(&self) -> Vector3<f64> {
        (**self).bounds_min()
    }

    fn bounds_max(&self) -> Vector3<f64> {
        (**self).bounds_max()
    }
}
