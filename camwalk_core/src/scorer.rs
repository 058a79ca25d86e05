//! View scoring.

use crate::camera::CameraRays;
use crate::error::PlanError;
use crate::geometry::camera_frame;
use crate::trajectory::{DiagnosticRow, Pose};
use camwalk_env::RayCaster;
use nalgebra::Vector3;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Saliency of a view: `hit_fraction^2 * unique_primitives + score_floor`.
///
/// Views that see mostly geometry, and many distinct triangles of it, score
/// highest.
pub fn view_score(row: &DiagnosticRow, score_floor: f64) -> f64 {
    row.hit_fraction().powi(2) * row.unique_primitives() as f64 + score_floor
}

/// Draws a noisy up hint: `nominal + N(0, std_dev)` per component, x then y
/// then z.
pub fn draw_up_hint<R: Rng + ?Sized>(
    rng: &mut R,
    nominal: &Vector3<f64>,
    std_dev: f64,
) -> Result<Vector3<f64>, PlanError> {
    if !(std_dev.is_finite() && std_dev >= 0.0) {
        return Err(PlanError::config(format!(
            "up hint noise std dev must be finite and non-negative, got {}",
            std_dev
        )));
    }

    let noise = Normal::new(0.0, std_dev)
        .map_err(|e| PlanError::config(format!("up hint noise: {}", e)))?;

    let x = noise.sample(rng);
    let y = noise.sample(rng);
    let z = noise.sample(rng);
    Ok(nominal + Vector3::new(x, y, z))
}

/// A scored candidate pose.
#[derive(Debug, Clone)]
pub struct ScoredPose {
    pub pose: Pose,
    pub score: f64,
    pub row: DiagnosticRow,
}

/// Scores (look-from, look-at) pairs by casting the full bundle.
pub struct PoseScorer<'a, C: ?Sized> {
    caster: &'a C,
    rays: &'a CameraRays,
    score_floor: f64,
}

impl<'a, C: RayCaster + ?Sized> PoseScorer<'a, C> {
    pub fn new(caster: &'a C, rays: &'a CameraRays, score_floor: f64) -> Self {
        Self {
            caster,
            rays,
            score_floor,
        }
    }

    pub fn score(&self, look_from: &Vector3<f64>, look_at: &Vector3<f64>, up_hint: &Vector3<f64>) -> ScoredPose {
        let orientation = camera_frame(look_from, look_at, up_hint);
        let row = self.rays.cast(self.caster, look_from, &orientation);
        let score = view_score(&row, self.score_floor);

        ScoredPose {
            pose: Pose::new(*look_from, *look_at, orientation),
            score,
            row,
        }
    }
}
