//! The random-walk controller.
//!
//! One [`WalkController`] plans one trajectory. It owns the only random
//! source of the run, a `ChaCha8Rng` seeded once, and threads it by `&mut`
//! through every draw. Per step the draws happen in a fixed order:
//!
//! 1. look-from candidates (three uniforms per point)
//! 2. look-at candidates (three uniforms per point)
//! 3. up-hint noise (three Gaussians)
//! 4. pair indices: all look-from indices, then all look-at indices
//! 5. one uniform for the weighted selection
//!
//! so the same seed and inputs always give the bit-identical trajectory.

use crate::camera::CameraRays;
use crate::config::PlannerConfig;
use crate::error::{AnchorKind, PlanError};
use crate::resolver::{InitialPoseResolver, Resolution};
use crate::sampler::CandidateSampler;
use crate::scorer::{draw_up_hint, PoseScorer, ScoredPose};
use crate::trajectory::{Pose, Trajectory};
use camwalk_env::{OccupancyVolume, RayCaster};
use nalgebra::{Matrix3, Vector3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

/// Lifecycle of a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkState {
    /// Start pose not resolved yet
    Init,

    /// Pose `next` is the next to be planned
    Stepping { next: usize },

    /// All poses planned
    Done,

    /// A step failed; the walk cannot continue
    Failed,
}

/// Picks an index from non-negative scores by inverse-CDF sampling.
///
/// Returns the first index whose normalized cumulative score reaches `u`.
/// For `u > 0` a zero-score entry is never chosen while any score is
/// positive; `u == 0` picks index 0 whatever its score. If every score is
/// zero the choice is uniform. Returns `None` for an empty slice.
pub fn select_index(scores: &[f64], u: f64) -> Option<usize> {
    if scores.is_empty() {
        return None;
    }

    let total: f64 = scores.iter().sum();
    if !(total > 0.0 && total.is_finite()) {
        let n = scores.len();
        return Some(((u * n as f64) as usize).min(n - 1));
    }

    let mut cumulative = 0.0;
    for (i, &score) in scores.iter().enumerate() {
        cumulative += score;
        if cumulative / total >= u {
            return Some(i);
        }
    }

    // u above the rounded final sum
    scores.iter().rposition(|&s| s > 0.0)
}

/// Plans a trajectory against borrowed scene collaborators.
pub struct WalkController<'a, C: ?Sized, O: ?Sized> {
    caster: &'a C,
    occupancy: &'a O,
    rays: &'a CameraRays,
    config: PlannerConfig,
    rng: ChaCha8Rng,
    state: WalkState,
    trajectory: Trajectory,

    /// Resolved pose 0; global bounds are anchored here
    start: Option<Pose>,
}

impl<'a, C, O> WalkController<'a, C, O>
where
    C: RayCaster + ?Sized,
    O: OccupancyVolume + ?Sized,
{
    /// Creates a controller. The config is validated here.
    pub fn new(
        caster: &'a C,
        occupancy: &'a O,
        rays: &'a CameraRays,
        config: PlannerConfig,
        seed: u64,
    ) -> Result<Self, PlanError> {
        config.validate()?;

        Ok(Self {
            caster,
            occupancy,
            rays,
            trajectory: Trajectory::with_capacity(config.trajectory_length),
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            state: WalkState::Init,
            start: None,
        })
    }

    pub fn state(&self) -> WalkState {
        self.state
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Poses planned so far.
    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn into_trajectory(self) -> Trajectory {
        self.trajectory
    }

    /// Resolves pose 0 from the start position and orientation.
    ///
    /// Only valid in `Init`.
    pub fn initialize(&mut self, look_from: &Vector3<f64>, orientation: &Matrix3<f64>) -> Result<Resolution, PlanError> {
        if self.state != WalkState::Init {
            return Err(PlanError::InvalidState(format!(
                "initialize called in state {:?}",
                self.state
            )));
        }

        let resolver = InitialPoseResolver::new(self.caster, self.occupancy, self.rays, &self.config);
        let resolved = match resolver.resolve(look_from, orientation) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("Start pose resolution failed: {}", e);
                self.state = WalkState::Failed;
                return Err(e);
            }
        };

        let pose = resolved.pose;
        let row = self.rays.cast(self.caster, &pose.look_from, &pose.orientation);
        self.trajectory.push(pose.clone(), row);
        self.start = Some(pose);

        self.state = if self.config.trajectory_length > 1 {
            WalkState::Stepping { next: 1 }
        } else {
            WalkState::Done
        };

        Ok(resolved.resolution)
    }

    /// Plans the next pose.
    ///
    /// Only valid in `Stepping`. Any error moves the walk to `Failed`.
    pub fn step(&mut self) -> Result<&Pose, PlanError> {
        let WalkState::Stepping { next } = self.state else {
            return Err(PlanError::InvalidState(format!("step called in state {:?}", self.state)));
        };

        let chosen = match self.plan_step(next) {
            Ok(chosen) => chosen,
            Err(e) => {
                warn!("Step {} failed: {}", next, e);
                self.state = WalkState::Failed;
                return Err(e);
            }
        };

        self.trajectory.push(chosen.pose, chosen.row);
        self.state = if next + 1 < self.config.trajectory_length {
            WalkState::Stepping { next: next + 1 }
        } else {
            info!("Trajectory complete: {} poses", self.trajectory.len());
            WalkState::Done
        };

        self.trajectory
            .last()
            .ok_or_else(|| PlanError::InvalidState("trajectory is empty after a step".into()))
    }

    /// Resolves the start pose and plans every remaining pose.
    pub fn run(mut self, look_from: &Vector3<f64>, orientation: &Matrix3<f64>) -> Result<Trajectory, PlanError> {
        self.initialize(look_from, orientation)?;
        while matches!(self.state, WalkState::Stepping { .. }) {
            self.step()?;
        }
        Ok(self.trajectory)
    }

    fn plan_step(&mut self, step: usize) -> Result<ScoredPose, PlanError> {
        let (start, current) = match (&self.start, self.trajectory.last()) {
            (Some(start), Some(current)) => (start.clone(), current.clone()),
            _ => return Err(PlanError::InvalidState("stepping without a start pose".into())),
        };

        let sampler = CandidateSampler::new(self.caster, self.occupancy, &self.config);
        let from_candidates = sampler.sample(
            &mut self.rng,
            AnchorKind::LookFrom,
            &current.look_from,
            &start.look_from,
            step,
        )?;
        let at_candidates = sampler.sample(
            &mut self.rng,
            AnchorKind::LookAt,
            &current.look_at,
            &start.look_at,
            step,
        )?;

        let up_hint = draw_up_hint(
            &mut self.rng,
            &self.config.up_hint_nominal,
            self.config.up_hint_noise_std_dev,
        )?;

        let count = self.config.pose_candidates;
        let from_indices: Vec<usize> = (0..count)
            .map(|_| self.rng.gen_range(0..from_candidates.len()))
            .collect();
        let at_indices: Vec<usize> = (0..count)
            .map(|_| self.rng.gen_range(0..at_candidates.len()))
            .collect();

        let scorer = PoseScorer::new(self.caster, self.rays, self.config.score_floor);
        let mut scored: Vec<ScoredPose> = from_indices
            .iter()
            .zip(&at_indices)
            .map(|(&f, &a)| scorer.score(&from_candidates[f], &at_candidates[a], &up_hint))
            .collect();
        let scores: Vec<f64> = scored.iter().map(|s| s.score).collect();

        let u: f64 = self.rng.gen();
        let index = select_index(&scores, u)
            .ok_or_else(|| PlanError::InvalidState("no pose candidates to select from".into()))?;

        debug!(
            "Step {}: {} look-from / {} look-at candidates, scores {:?}",
            step,
            from_candidates.len(),
            at_candidates.len(),
            scores
        );
        info!("Step {}: selected candidate {} (score {:.4})", step, index, scores[index]);

        Ok(scored.swap_remove(index))
    }
}
