//! Candidate position sampling.
//!
//! Each step draws points around the current look-from and look-at anchors
//! and runs them through four filters, in order:
//!
//! 1. [`draw_in_box`]: uniform draw in the local box around the anchor
//! 2. [`retain_within_box`]: global bound around the start anchor
//! 3. [`retain_free`]: occupancy must be Free
//! 4. [`retain_line_of_sight`]: no geometry between the anchor and the point
//!
//! A stage that leaves nothing is a hard failure; filters are never relaxed.

use crate::config::PlannerConfig;
use crate::error::{AnchorKind, FilterStage, PlanError};
use crate::geometry::within_half_extent;
use camwalk_env::{OccupancyVolume, RayCaster};
use nalgebra::Vector3;
use rand::Rng;
use tracing::debug;

/// Draws `count` points uniformly in `[center - half_extent, center + half_extent]`.
///
/// Each point consumes three uniform draws (x, y, z).
pub fn draw_in_box<R: Rng + ?Sized>(
    rng: &mut R,
    center: &Vector3<f64>,
    half_extent: &Vector3<f64>,
    count: usize,
) -> Vec<Vector3<f64>> {
    (0..count)
        .map(|_| {
            let x = rng.gen::<f64>();
            let y = rng.gen::<f64>();
            let z = rng.gen::<f64>();
            center - half_extent + Vector3::new(x, y, z).component_mul(&(2.0 * half_extent))
        })
        .collect()
}

/// Keeps points inside the (inclusive) box around `start`.
pub fn retain_within_box(
    points: Vec<Vector3<f64>>,
    start: &Vector3<f64>,
    half_extent: &Vector3<f64>,
) -> Vec<Vector3<f64>> {
    points
        .into_iter()
        .filter(|p| within_half_extent(p, start, half_extent))
        .collect()
}

/// Keeps points whose occupancy is Free.
pub fn retain_free<O: OccupancyVolume + ?Sized>(points: Vec<Vector3<f64>>, occupancy: &O) -> Vec<Vector3<f64>> {
    points.into_iter().filter(|p| occupancy.query(p).is_free()).collect()
}

/// Keeps points that can be reached from `anchor` in a straight line.
///
/// A point is visible when `(1 - eps) * hit_distance >= |point - anchor|`
/// for the ray from `anchor` toward it. Misses always pass, and so does a
/// point coinciding with the anchor.
pub fn retain_line_of_sight<C: RayCaster + ?Sized>(
    points: Vec<Vector3<f64>>,
    anchor: &Vector3<f64>,
    caster: &C,
    eps: f64,
) -> Vec<Vector3<f64>> {
    points
        .into_iter()
        .filter(|p| {
            let offset = p - anchor;
            let distance = offset.norm();
            if distance == 0.0 {
                return true;
            }
            let hit = caster.intersect(anchor, &(offset / distance));
            (1.0 - eps) * hit.distance >= distance
        })
        .collect()
}

/// Runs the full filter pipeline against one pair of collaborators.
pub struct CandidateSampler<'a, C: ?Sized, O: ?Sized> {
    caster: &'a C,
    occupancy: &'a O,
    config: &'a PlannerConfig,
}

impl<'a, C, O> CandidateSampler<'a, C, O>
where
    C: RayCaster + ?Sized,
    O: OccupancyVolume + ?Sized,
{
    pub fn new(caster: &'a C, occupancy: &'a O, config: &'a PlannerConfig) -> Self {
        Self {
            caster,
            occupancy,
            config,
        }
    }

    /// Samples candidates around `current`, bounded globally around `start`.
    ///
    /// `anchor` and `step` only label the error when a stage comes up empty.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        anchor: AnchorKind,
        current: &Vector3<f64>,
        start: &Vector3<f64>,
        step: usize,
    ) -> Result<Vec<Vector3<f64>>, PlanError> {
        let check = |points: Vec<Vector3<f64>>, stage: FilterStage| {
            debug!("{} candidates after {} filter: {}", anchor, stage, points.len());
            if points.is_empty() {
                Err(PlanError::EmptyCandidates { anchor, stage, step })
            } else {
                Ok(points)
            }
        };

        let points = draw_in_box(
            rng,
            current,
            &self.config.half_extent_relative_to_current,
            self.config.occupancy_query_samples,
        );
        let points = check(points, FilterStage::LocalBox)?;

        let points = retain_within_box(points, start, &self.config.half_extent_relative_to_start);
        let points = check(points, FilterStage::StartBox)?;

        let points = retain_free(points, self.occupancy);
        let points = check(points, FilterStage::Occupancy)?;

        let points = retain_line_of_sight(points, current, self.caster, self.config.line_of_sight_eps);
        check(points, FilterStage::LineOfSight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camwalk_env::{OccupancySample, RayHit, UnknownReason};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Wall at x = 1 across all of space.
    struct Wall;

    impl RayCaster for Wall {
        fn intersect(&self, origin: &Vector3<f64>, direction: &Vector3<f64>) -> RayHit {
            if direction.x > 0.0 && origin.x < 1.0 {
                RayHit::new((1.0 - origin.x) / direction.x, 0, -Vector3::x())
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

    /// Free where z >= 0, unobserved below.
    struct UpperHalf;

    impl OccupancyVolume for UpperHalf {
        fn lookup(&self, point: &Vector3<f64>) -> OccupancySample {
            if point.z >= 0.0 {
                OccupancySample::Free
            } else {
                OccupancySample::Unknown(UnknownReason::Unobserved)
            }
        }

        fn bounds_min(&self) -> Vector3<f64> {
            Vector3::repeat(-10.0)
        }

        fn bounds_max(&self) -> Vector3<f64> {
            Vector3::repeat(10.0)
        }
    }

    #[test]
    fn test_draw_in_box_stays_inside() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let center = Vector3::new(1.0, -2.0, 3.0);
        let half = Vector3::new(0.5, 1.0, 0.0);
        let points = draw_in_box(&mut rng, &center, &half, 500);

        assert_eq!(points.len(), 500);
        for p in &points {
            assert!(within_half_extent(p, &center, &half));
            assert_eq!(p.z, 3.0);
        }
    }

    #[test]
    fn test_draw_in_box_is_seeded() {
        let half = Vector3::repeat(1.0);
        let a = draw_in_box(&mut ChaCha8Rng::seed_from_u64(9), &Vector3::zeros(), &half, 20);
        let b = draw_in_box(&mut ChaCha8Rng::seed_from_u64(9), &Vector3::zeros(), &half, 20);
        assert_eq!(a, b);
    }

    #[test]
    fn test_retain_within_box_is_inclusive() {
        let points = vec![
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0001, 0.0, 0.0),
            Vector3::new(0.0, 100.0, 0.0),
        ];
        let half = Vector3::new(1.0, f64::INFINITY, 1.0);
        let kept = retain_within_box(points, &Vector3::zeros(), &half);
        assert_eq!(kept, vec![Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 100.0, 0.0)]);
    }

    #[test]
    fn test_retain_free() {
        let points = vec![Vector3::new(0.0, 0.0, 1.0), Vector3::new(0.0, 0.0, -1.0)];
        assert_eq!(retain_free(points, &UpperHalf), vec![Vector3::new(0.0, 0.0, 1.0)]);
    }

    #[test]
    fn test_line_of_sight_margin() {
        let points = vec![
            Vector3::new(0.5, 0.0, 0.0),   // well in front of the wall
            Vector3::new(0.995, 0.0, 0.0), // inside the eps margin
            Vector3::new(2.0, 0.0, 0.0),   // behind the wall
            Vector3::new(-3.0, 0.0, 0.0),  // ray misses
            Vector3::zeros(),              // the anchor itself
        ];
        let kept = retain_line_of_sight(points, &Vector3::zeros(), &Wall, 0.01);
        assert_eq!(
            kept,
            vec![Vector3::new(0.5, 0.0, 0.0), Vector3::new(-3.0, 0.0, 0.0), Vector3::zeros()]
        );
    }

    #[test]
    fn test_sample_reports_empty_stage() {
        let config = PlannerConfig::default()
            .with_samples(50, 5)
            .with_half_extents(Vector3::new(f64::INFINITY, f64::INFINITY, 0.25), Vector3::repeat(0.5));
        let sampler = CandidateSampler::new(&Nothing, &UpperHalf, &config);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        // Whole local box below z = -1 is unobserved
        let err = sampler
            .sample(&mut rng, AnchorKind::LookAt, &Vector3::new(0.0, 0.0, -5.0), &Vector3::new(0.0, 0.0, -5.0), 4)
            .unwrap_err();
        assert!(matches!(
            err,
            PlanError::EmptyCandidates {
                anchor: AnchorKind::LookAt,
                stage: FilterStage::Occupancy,
                step: 4,
            }
        ));

        // Local box lies entirely outside the start box
        let err = sampler
            .sample(&mut rng, AnchorKind::LookFrom, &Vector3::new(0.0, 0.0, 5.0), &Vector3::zeros(), 1)
            .unwrap_err();
        assert!(matches!(
            err,
            PlanError::EmptyCandidates {
                stage: FilterStage::StartBox,
                ..
            }
        ));
        assert!(err.is_no_traversable_space());
    }

    #[test]
    fn test_sample_output_passes_every_filter() {
        let config = PlannerConfig::default()
            .with_samples(200, 5)
            .with_half_extents(Vector3::new(f64::INFINITY, f64::INFINITY, 0.25), Vector3::new(1.5, 1.5, 0.25));
        let sampler = CandidateSampler::new(&Wall, &UpperHalf, &config);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let current = Vector3::new(0.0, 0.0, 0.1);

        let points = sampler
            .sample(&mut rng, AnchorKind::LookFrom, &current, &Vector3::zeros(), 1)
            .unwrap();

        assert!(!points.is_empty());
        for p in &points {
            assert!(p.z >= 0.0 && p.z <= 0.25);
            assert!(p.x < 1.0);
        }
    }
}
