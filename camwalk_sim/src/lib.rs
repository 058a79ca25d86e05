//! camwalk Simulation Harness
//!
//! Runs the planner end to end against the reference scene collaborators:
//!
//! - **Scenes**: JSON scene files ([`SceneInput`]) assembled into a mesh,
//!   an occupancy grid and a camera ray bundle ([`Scene`])
//! - **Scenarios**: small synthetic scenes with known outcomes, run by
//!   [`ScenarioRunner`] and checked for containment and free-space invariants
//! - **Export**: planned trajectories as JSON arrays ([`TrajectoryExport`])
//!
//! # Usage
//!
//! ```ignore
//! use camwalk_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(0).run(ScenarioId::FreeBox);
//! assert!(result.passed);
//! ```

mod exporter;
mod runner;
mod scene;
pub mod scenarios;

pub use exporter::TrajectoryExport;
pub use runner::{check_trajectory, ScenarioResult, ScenarioRunner};
pub use scene::{CameraSpec, OccupancyBounds, Scene, SceneError, SceneInput};
