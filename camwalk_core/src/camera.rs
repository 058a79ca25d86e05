//! The fixed camera ray bundle.

use crate::error::PlanError;
use crate::trajectory::DiagnosticRow;
use camwalk_env::RayCaster;
use nalgebra::{Matrix3, Vector3};

/// Unit ray directions in camera space plus, per ray, the distance of its
/// pixel to the image center.
///
/// Camera space follows the pose convention: +x right, +y up, and the
/// camera looks down -z.
#[derive(Debug, Clone)]
pub struct CameraRays {
    directions: Vec<Vector3<f64>>,
    center_distances: Vec<f64>,
}

impl CameraRays {
    /// Creates a bundle from externally supplied rays.
    ///
    /// Directions are normalized. Both slices must have the same non-zero
    /// length and contain only finite values.
    pub fn new(directions: Vec<Vector3<f64>>, center_distances: Vec<f64>) -> Result<Self, PlanError> {
        if directions.is_empty() {
            return Err(PlanError::input("camera ray bundle is empty"));
        }
        if directions.len() != center_distances.len() {
            return Err(PlanError::input(format!(
                "{} ray directions but {} center distances",
                directions.len(),
                center_distances.len()
            )));
        }
        if let Some(i) = directions
            .iter()
            .position(|d| !d.iter().all(|c| c.is_finite()) || d.norm() == 0.0)
        {
            return Err(PlanError::input(format!("ray direction {} is zero or not finite", i)));
        }
        if let Some(i) = center_distances.iter().position(|w| !w.is_finite()) {
            return Err(PlanError::input(format!("center distance {} is not finite", i)));
        }

        Ok(Self {
            directions: directions.into_iter().map(|d| d.normalize()).collect(),
            center_distances,
        })
    }

    /// Pinhole camera with `width × height` pixels and horizontal field of
    /// view `fov_x` (radians).
    ///
    /// Rays are ordered row-major, top row first, left to right.
    pub fn pinhole(width: usize, height: usize, fov_x: f64) -> Result<Self, PlanError> {
        if width == 0 || height == 0 {
            return Err(PlanError::input(format!("image size {}x{} is empty", width, height)));
        }
        if !(fov_x > 0.0 && fov_x < std::f64::consts::PI) {
            return Err(PlanError::input(format!("fov_x must lie in (0, pi), got {}", fov_x)));
        }

        let tan_half_x = (0.5 * fov_x).tan();
        let fov_y = 2.0 * (height as f64 * tan_half_x / width as f64).atan();
        let tan_half_y = (0.5 * fov_y).tan();

        let us = linspace(-1.0 + 1.0 / width as f64, 1.0 - 1.0 / width as f64, width);
        let vs = linspace(1.0 - 1.0 / height as f64, -1.0 + 1.0 / height as f64, height);

        // Pixel coordinates used for the center weights
        let px = linspace(0.5, width as f64 + 0.5, width);
        let py = linspace(0.5, height as f64 + 0.5, height);
        let cx = (width as f64 + 1.0) / 2.0;
        let cy = (height as f64 + 1.0) / 2.0;

        let mut directions = Vec::with_capacity(width * height);
        let mut center_distances = Vec::with_capacity(width * height);

        for (row, v) in vs.iter().enumerate() {
            for (col, u) in us.iter().enumerate() {
                directions.push(Vector3::new(u * tan_half_x, v * tan_half_y, -1.0));
                center_distances.push((px[col] - cx).hypot(py[row] - cy));
            }
        }

        Self::new(directions, center_distances)
    }

    /// Number of rays.
    pub fn len(&self) -> usize {
        self.directions.len()
    }

    /// Always false; an empty bundle cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }

    /// Unit directions in camera space.
    pub fn directions(&self) -> &[Vector3<f64>] {
        &self.directions
    }

    /// Per-ray pixel distance to the image center.
    pub fn center_distances(&self) -> &[f64] {
        &self.center_distances
    }

    /// Rotates every ray into world space.
    pub fn to_world(&self, rotation: &Matrix3<f64>) -> Vec<Vector3<f64>> {
        self.directions.iter().map(|d| (rotation * d).normalize()).collect()
    }

    /// Casts the whole bundle from `origin` with the given camera rotation.
    pub fn cast<C: RayCaster + ?Sized>(&self, caster: &C, origin: &Vector3<f64>, rotation: &Matrix3<f64>) -> DiagnosticRow {
        let mut row = DiagnosticRow::with_capacity(self.len());
        for direction in self.to_world(rotation) {
            row.push(&caster.intersect(origin, &direction));
        }
        row
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive.
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![start];
    }
    let step = (end - start) / (n - 1) as f64;
    (0..n).map(|i| start + step * i as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use camwalk_env::RayHit;

    struct Wall;

    impl RayCaster for Wall {
        // Plane z = -2, primitive id 7
        fn intersect(&self, origin: &Vector3<f64>, direction: &Vector3<f64>) -> RayHit {
            if direction.z < 0.0 {
                RayHit::new((origin.z + 2.0) / -direction.z, 7, Vector3::z())
            } else {
                RayHit::miss()
            }
        }
    }

    #[test]
    fn test_pinhole_layout() {
        let rays = CameraRays::pinhole(4, 2, std::f64::consts::FRAC_PI_2).unwrap();
        assert_eq!(rays.len(), 8);

        // Top-left ray points left and up, bottom-right points right and down
        let first = rays.directions()[0];
        let last = rays.directions()[7];
        assert!(first.x < 0.0 && first.y > 0.0 && first.z < 0.0);
        assert!(last.x > 0.0 && last.y < 0.0 && last.z < 0.0);
        assert_relative_eq!(first.norm(), 1.0, epsilon = 1e-12);

        // Symmetric weights around the center
        let w = rays.center_distances();
        assert_relative_eq!(w[0], w[7], epsilon = 1e-12);
        assert_relative_eq!(w[1], w[2], epsilon = 1e-12);
    }

    #[test]
    fn test_single_pixel_looks_straight_ahead() {
        let rays = CameraRays::pinhole(1, 1, 1.0).unwrap();
        assert_relative_eq!(rays.directions()[0], -Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(rays.center_distances()[0], 0.5_f64.hypot(0.5), epsilon = 1e-12);
    }

    #[test]
    fn test_new_validates() {
        assert!(CameraRays::new(vec![], vec![]).is_err());
        assert!(CameraRays::new(vec![Vector3::z()], vec![]).is_err());
        assert!(CameraRays::new(vec![Vector3::zeros()], vec![0.0]).is_err());
        assert!(CameraRays::new(vec![Vector3::new(f64::NAN, 0.0, 1.0)], vec![0.0]).is_err());
        assert!(CameraRays::pinhole(0, 3, 1.0).is_err());
    }

    #[test]
    fn test_cast_rotates_rays() {
        let rays = CameraRays::new(vec![Vector3::new(0.0, 0.0, -3.0)], vec![0.0]).unwrap();

        let row = rays.cast(&Wall, &Vector3::zeros(), &Matrix3::identity());
        assert_relative_eq!(row.distances[0], 2.0, epsilon = 1e-12);
        assert_eq!(row.primitive_ids[0], 7);

        // Turned around, the camera looks up +z and misses
        let flipped = Matrix3::from_diagonal(&Vector3::new(-1.0, 1.0, -1.0));
        let row = rays.cast(&Wall, &Vector3::zeros(), &flipped);
        assert_eq!(row.distances[0], f64::INFINITY);
        assert_eq!(row.primitive_ids[0], -1);
    }
}
