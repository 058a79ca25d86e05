//! Ray casting interface.

use crate::types::RayHit;
use nalgebra::Vector3;

/// Nearest-hit ray queries against an immutable triangle mesh.
///
/// # Implementations
///
/// - **Reference**: [`TriangleMesh`](crate::TriangleMesh) - brute-force Möller–Trumbore
/// - **Tests**: small stubs that return scripted hits
///
/// Queries take `&self` and never mutate the scene, so a caster can be
/// shared freely between the resolver, the sampler and the scorer.
pub trait RayCaster {
    /// Casts a ray and returns the nearest hit.
    ///
    /// `direction` is expected to be unit length so that the returned
    /// distance is metric. A miss returns [`RayHit::miss`].
    fn intersect(&self, origin: &Vector3<f64>, direction: &Vector3<f64>) -> RayHit;
}

impl<T: RayCaster + ?Sized> RayCaster for &T {
    fn intersect(&self, origin: &Vector3<f64>, direction: &Vector3<f64>) -> RayHit {
        (**self).intersect(origin, direction)
    }
}
