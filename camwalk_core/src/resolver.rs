//! Initial pose resolution.
//!
//! Turns the user-supplied start position and orientation into pose 0 by
//! finding a Free look-at point in front of the camera. Resolution consumes
//! no randomness: identical inputs always yield the identical start pose.

use crate::camera::CameraRays;
use crate::config::PlannerConfig;
use crate::error::PlanError;
use crate::geometry::{clip_to_volume, pull_back, view_direction};
use crate::trajectory::Pose;
use camwalk_env::{OccupancyVolume, RayCaster};
use nalgebra::{Matrix3, Vector3};
use tracing::{debug, info, warn};

/// How the start look-at point was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The single center ray hit geometry and the point in front of it is Free
    FastPath,

    /// Found by a full bundle cast from a shifted origin
    Perturbed { attempt: usize, ray: usize },
}

/// A resolved start pose.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStart {
    pub pose: Pose,
    pub resolution: Resolution,
}

/// Finds a valid look-at point for the start pose.
pub struct InitialPoseResolver<'a, C: ?Sized, O: ?Sized> {
    caster: &'a C,
    occupancy: &'a O,
    rays: &'a CameraRays,
    config: &'a PlannerConfig,
}

impl<'a, C, O> InitialPoseResolver<'a, C, O>
where
    C: RayCaster + ?Sized,
    O: OccupancyVolume + ?Sized,
{
    pub fn new(caster: &'a C, occupancy: &'a O, rays: &'a CameraRays, config: &'a PlannerConfig) -> Self {
        Self {
            caster,
            occupancy,
            rays,
            config,
        }
    }

    /// Resolves pose 0.
    ///
    /// `look_from` and `orientation` are stored unchanged; only `look_at` is
    /// computed.
    pub fn resolve(&self, look_from: &Vector3<f64>, orientation: &Matrix3<f64>) -> Result<ResolvedStart, PlanError> {
        if !look_from.iter().all(|c| c.is_finite()) {
            return Err(PlanError::input("start position is not finite"));
        }
        if !orientation.iter().all(|c| c.is_finite()) {
            return Err(PlanError::input("start orientation is not finite"));
        }

        if let Some(look_at) = self.fast_path(look_from, orientation) {
            info!("Start look-at resolved on the fast path: {:?}", look_at);
            return Ok(ResolvedStart {
                pose: Pose::new(*look_from, look_at, *orientation),
                resolution: Resolution::FastPath,
            });
        }

        debug!("Fast path failed, casting the full bundle");
        let (look_at, attempt, ray) = self.perturbed(look_from, orientation)?;
        info!(
            "Start look-at resolved by bundle cast (attempt {}, ray {}): {:?}",
            attempt, ray, look_at
        );

        Ok(ResolvedStart {
            pose: Pose::new(*look_from, look_at, *orientation),
            resolution: Resolution::Perturbed { attempt, ray },
        })
    }

    /// Single ray along the view direction.
    fn fast_path(&self, look_from: &Vector3<f64>, orientation: &Matrix3<f64>) -> Option<Vector3<f64>> {
        let direction = view_direction(orientation);
        let hit = self.caster.intersect(look_from, &direction);
        if !hit.is_hit() {
            return None;
        }

        let distance = pull_back(
            hit.distance,
            self.config.surface_margin(),
            self.config.min_look_at_offset,
        );
        let point = look_from + direction * distance;

        self.occupancy.query(&point).is_free().then_some(point)
    }

    /// Full bundle casts from origins shifted backward along the camera axis.
    ///
    /// Each attempt casts the whole bundle first; a bundle that sees nothing
    /// is fatal before any ray is clipped. The look-at point lies on a ray
    /// from the shifted origin, since that is where it was verified Free.
    ///
    /// Returns the look-at point with the attempt and ray that produced it.
    fn perturbed(
        &self,
        look_from: &Vector3<f64>,
        orientation: &Matrix3<f64>,
    ) -> Result<(Vector3<f64>, usize, usize), PlanError> {
        let directions = self.rays.to_world(orientation);
        let weights = self.rays.center_distances();
        let bounds = self.occupancy.bounds();
        let backward: Vector3<f64> = orientation.column(2).into_owned();

        let margin = self.config.surface_margin();
        let floor = self.config.min_look_at_offset;
        let gamma = self.config.slab_gamma;
        let slack = self.config.slab_start_slack();

        for attempt in 0..self.config.perturb_attempts {
            let origin = look_from + backward * (attempt as f64 * self.config.perturb_step());

            let hits: Vec<_> = directions
                .iter()
                .map(|direction| self.caster.intersect(&origin, direction))
                .collect();
            if !hits.iter().any(|hit| hit.is_hit()) {
                warn!("Every bundle ray missed the scene (attempt {})", attempt);
                return Err(PlanError::UnobservableScene);
            }

            let mut best: Option<(usize, f64, Vector3<f64>)> = None;

            for (ray, (direction, hit)) in directions.iter().zip(&hits).enumerate() {
                let interval = clip_to_volume(ray, &origin, direction, &bounds, gamma, slack)?;
                if !hit.is_hit() {
                    continue;
                }

                let distance = pull_back(hit.distance.min(interval.t_max), margin, floor);
                let point = origin + direction * distance;

                if self.occupancy.query(&point).is_free()
                    && best.map_or(true, |(_, weight, _)| weights[ray] < weight)
                {
                    best = Some((ray, weights[ray], point));
                }
            }

            if let Some((ray, _, point)) = best {
                return Ok((point, attempt, ray));
            }

            debug!("No Free query point on attempt {}", attempt);
        }

        Err(PlanError::NoTraversableSpace {
            attempts: self.config.perturb_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use camwalk_env::{OccupancySample, RayHit, UnknownReason};
    use std::cell::Cell;

    /// Infinite wall at x = `at`, facing -x.
    struct Wall {
        at: f64,
    }

    impl RayCaster for Wall {
        fn intersect(&self, origin: &Vector3<f64>, direction: &Vector3<f64>) -> RayHit {
            if direction.x > 1e-9 && origin.x < self.at {
                RayHit::new((self.at - origin.x) / direction.x, 0, -Vector3::x())
            } else {
                RayHit::miss()
            }
        }
    }

    struct Nothing;

    impl RayCaster for Nothing {
        fn intersect(&self, _: &Vector3<f64>, _: &Vector3<f64>) -> RayHit {
            RayHit::miss()
        }
    }

    /// Free inside `[-20, 20]^3` where `free` returns true; counts queries.
    struct Volume<F: Fn(&Vector3<f64>) -> bool> {
        free: F,
        queries: Cell<usize>,
    }

    impl<F: Fn(&Vector3<f64>) -> bool> Volume<F> {
        fn new(free: F) -> Self {
            Self {
                free,
                queries: Cell::new(0),
            }
        }
    }

    impl<F: Fn(&Vector3<f64>) -> bool> OccupancyVolume for Volume<F> {
        fn lookup(&self, point: &Vector3<f64>) -> OccupancySample {
            self.queries.set(self.queries.get() + 1);
            if (self.free)(point) {
                OccupancySample::Free
            } else {
                OccupancySample::Unknown(UnknownReason::Unobserved)
            }
        }

        fn bounds_min(&self) -> Vector3<f64> {
            Vector3::repeat(-20.0)
        }

        fn bounds_max(&self) -> Vector3<f64> {
            Vector3::repeat(20.0)
        }
    }

    /// Camera at the origin looking down +x (backward = -x).
    fn looking_along_x() -> Matrix3<f64> {
        Matrix3::from_columns(&[-Vector3::y(), Vector3::z(), -Vector3::x()])
    }

    fn config() -> PlannerConfig {
        PlannerConfig::default().with_voxel_size(1.0)
    }

    #[test]
    fn test_fast_path_pulls_back_from_surface() {
        let rays = CameraRays::pinhole(4, 3, 1.0).unwrap();
        let config = config();
        let volume = Volume::new(|_: &Vector3<f64>| true);
        let resolver = InitialPoseResolver::new(&Wall { at: 10.0 }, &volume, &rays, &config);

        let start = resolver.resolve(&Vector3::zeros(), &looking_along_x()).unwrap();
        assert_eq!(start.resolution, Resolution::FastPath);
        assert_relative_eq!(start.pose.look_at, Vector3::new(8.25, 0.0, 0.0), epsilon = 1e-12);
        assert_eq!(start.pose.orientation, looking_along_x());
        assert_eq!(volume.queries.get(), 1);
    }

    #[test]
    fn test_fast_path_floors_at_min_offset() {
        let rays = CameraRays::pinhole(2, 2, 1.0).unwrap();
        let config = config();
        let volume = Volume::new(|_: &Vector3<f64>| true);
        let resolver = InitialPoseResolver::new(&Wall { at: 0.5 }, &volume, &rays, &config);

        let start = resolver.resolve(&Vector3::zeros(), &looking_along_x()).unwrap();
        assert_relative_eq!(start.pose.look_at.x, config.min_look_at_offset, epsilon = 1e-15);
    }

    #[test]
    fn test_unobservable_scene() {
        let rays = CameraRays::pinhole(4, 3, 1.0).unwrap();
        let config = config();
        let volume = Volume::new(|_: &Vector3<f64>| true);
        let resolver = InitialPoseResolver::new(&Nothing, &volume, &rays, &config);

        let err = resolver.resolve(&Vector3::zeros(), &looking_along_x()).unwrap_err();
        assert!(err.is_unobservable());
    }

    #[test]
    fn test_no_traversable_space_after_all_attempts() {
        let rays = CameraRays::pinhole(4, 3, 1.0).unwrap();
        let config = config();
        let volume = Volume::new(|_: &Vector3<f64>| false);
        let resolver = InitialPoseResolver::new(&Wall { at: 10.0 }, &volume, &rays, &config);

        let err = resolver.resolve(&Vector3::zeros(), &looking_along_x()).unwrap_err();
        assert!(matches!(err, PlanError::NoTraversableSpace { attempts: 8 }));
        // One fast-path query plus one per ray per attempt
        assert_eq!(volume.queries.get(), 1 + 8 * rays.len());
    }

    #[test]
    fn test_perturbation_prefers_central_rays() {
        // Free only off the optical axis, so the fast path fails
        let rays = CameraRays::pinhole(5, 5, 1.0).unwrap();
        let config = config();
        let volume = Volume::new(|p: &Vector3<f64>| p.y.abs() > 0.1 || p.z.abs() > 0.1);
        let resolver = InitialPoseResolver::new(&Wall { at: 10.0 }, &volume, &rays, &config);

        let start = resolver.resolve(&Vector3::zeros(), &looking_along_x()).unwrap();
        let Resolution::Perturbed { attempt, ray } = start.resolution else {
            panic!("expected the perturbation path");
        };
        assert_eq!(attempt, 0);

        // The chosen ray is one of the four next to the center, the first in row order
        let center = rays.center_distances()[12];
        let chosen = rays.center_distances()[ray];
        assert!(chosen > center);
        assert!(rays.center_distances().iter().all(|&w| w == center || w >= chosen));
        assert_eq!(ray, 7);
        assert_eq!(start.pose.look_from, Vector3::zeros());
    }

    #[test]
    fn test_origin_outside_volume_is_rejected() {
        let rays = CameraRays::pinhole(2, 2, 1.0).unwrap();
        let config = config();
        let volume = Volume::new(|_: &Vector3<f64>| false);
        let resolver = InitialPoseResolver::new(&Wall { at: 40.0 }, &volume, &rays, &config);

        let err = resolver
            .resolve(&Vector3::new(-30.0, 0.0, 0.0), &looking_along_x())
            .unwrap_err();
        assert!(matches!(err, PlanError::RayOutsideVolume { .. }));
    }

    #[test]
    fn test_outside_volume_seeing_nothing_is_unobservable() {
        let rays = CameraRays::pinhole(4, 3, 1.0).unwrap();
        let config = config();
        let volume = Volume::new(|_: &Vector3<f64>| true);
        let resolver = InitialPoseResolver::new(&Nothing, &volume, &rays, &config);

        let err = resolver
            .resolve(&Vector3::new(0.0, 0.0, 50.0), &looking_along_x())
            .unwrap_err();
        assert!(err.is_unobservable(), "{:?}", err);
    }

    #[test]
    fn test_later_attempt_shifts_origin_backward() {
        // One ray tilted up: world direction (0.8, 0, 0.6). Shifting the
        // origin back by 0.25 per attempt raises the pulled-back point by
        // 0.1875; only attempt 2 clears z > 6.7.
        let rays = CameraRays::new(vec![Vector3::new(0.0, 0.6, -0.8)], vec![0.0]).unwrap();
        let config = config();
        let volume = Volume::new(|p: &Vector3<f64>| p.z > 6.7);
        let resolver = InitialPoseResolver::new(&Wall { at: 10.0 }, &volume, &rays, &config);

        let start = resolver.resolve(&Vector3::zeros(), &looking_along_x()).unwrap();
        assert_eq!(start.resolution, Resolution::Perturbed { attempt: 2, ray: 0 });
        assert_relative_eq!(start.pose.look_at, Vector3::new(8.6, 0.0, 6.825), epsilon = 1e-9);
        assert_eq!(start.pose.look_from, Vector3::zeros());
    }

    #[test]
    fn test_hit_beyond_volume_is_capped_at_exit() {
        // Wall at x = 40 lies outside the [-20, 20] volume; the ray leaves
        // the box at t = 20 and the look-at is pulled back from there.
        let rays = CameraRays::new(vec![Vector3::new(0.0, 0.0, -1.0)], vec![0.0]).unwrap();
        let config = config();
        let volume = Volume::new(|p: &Vector3<f64>| p.x < 20.0);
        let resolver = InitialPoseResolver::new(&Wall { at: 40.0 }, &volume, &rays, &config);

        let start = resolver.resolve(&Vector3::zeros(), &looking_along_x()).unwrap();
        assert_eq!(start.resolution, Resolution::Perturbed { attempt: 0, ray: 0 });
        assert_relative_eq!(
            start.pose.look_at,
            Vector3::new(20.0 - config.surface_margin(), 0.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let rays = CameraRays::pinhole(8, 6, 1.0).unwrap();
        let config = config();
        let volume = Volume::new(|p: &Vector3<f64>| p.y > 0.3);
        let resolver = InitialPoseResolver::new(&Wall { at: 10.0 }, &volume, &rays, &config);

        let a = resolver.resolve(&Vector3::zeros(), &looking_along_x()).unwrap();
        let b = resolver.resolve(&Vector3::zeros(), &looking_along_x()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_non_finite_start() {
        let rays = CameraRays::pinhole(2, 2, 1.0).unwrap();
        let config = config();
        let volume = Volume::new(|_: &Vector3<f64>| true);
        let resolver = InitialPoseResolver::new(&Wall { at: 10.0 }, &volume, &rays, &config);

        let err = resolver
            .resolve(&Vector3::new(f64::NAN, 0.0, 0.0), &looking_along_x())
            .unwrap_err();
        assert!(matches!(err, PlanError::InvalidInput(_)));
    }
}
