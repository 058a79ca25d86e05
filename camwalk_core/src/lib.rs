//! camwalk Core - Informative Camera Random Walks
//!
//! Plans a camera trajectory through a static scene for synthetic data
//! capture. Starting from a given pose, every new pose:
//! 1. **Stays traversable**: look-from and look-at points are Free in the occupancy volume
//! 2. **Stays connected**: each point has line of sight to its predecessor
//! 3. **Stays bounded**: points remain inside a box around the start pose
//! 4. **Prefers informative views**: candidates are drawn in proportion to a
//!    saliency score computed from a full ray-bundle cast
//!
//! The scene is only reached through the [`camwalk_env::RayCaster`] and
//! [`camwalk_env::OccupancyVolume`] traits.
//!
//! # Example
//!
//! ```ignore
//! use camwalk_core::{CameraRays, PlannerConfig, WalkController};
//!
//! let rays = CameraRays::pinhole(256, 192, std::f64::consts::FRAC_PI_3)?;
//! let config = PlannerConfig::default().with_trajectory_length(50);
//! let walk = WalkController::new(&mesh, &grid, &rays, config, 0)?;
//! let trajectory = walk.run(&start_position, &start_orientation)?;
//! ```

pub mod camera;
pub mod config;
pub mod error;
pub mod geometry;
pub mod resolver;
pub mod sampler;
pub mod scorer;
pub mod trajectory;
pub mod walk;

// Re-export key types for convenience
pub use camera::CameraRays;
pub use config::PlannerConfig;
pub use error::{AnchorKind, FilterStage, PlanError};
pub use resolver::{InitialPoseResolver, Resolution, ResolvedStart};
pub use sampler::CandidateSampler;
pub use scorer::{view_score, PoseScorer, ScoredPose};
pub use trajectory::{DiagnosticRow, Pose, Trajectory};
pub use walk::{select_index, WalkController, WalkState};
