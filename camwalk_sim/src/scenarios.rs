//! Built-in deterministic scenarios.
//!
//! Each scenario is a small synthetic scene with a known expected outcome.

use crate::scene::{Scene, SceneError};
use camwalk_core::{CameraRays, PlannerConfig};
use camwalk_env::{Aabb, TriangleMesh, VoxelGrid, VoxelState};
use nalgebra::{Matrix3, Vector3};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// A: camera 10 units in front of a cube face
    CubeFace,

    /// B: camera aimed at open sky
    OpenSky,

    /// C: short walk in a free box with one small distant triangle
    FreeBox,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![ScenarioId::CubeFace, ScenarioId::OpenSky, ScenarioId::FreeBox]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::CubeFace => "cube_face",
            ScenarioId::OpenSky => "open_sky",
            ScenarioId::FreeBox => "free_box",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::CubeFace => "Start 10 units from a cube face; fast path puts look-at 1.75 units before it",
            ScenarioId::OpenSky => "Start aimed at empty sky; planning fails as unobservable and nothing is written",
            ScenarioId::FreeBox => "5-step walk in a free box with one small distant triangle",
        }
    }

    /// Returns true if planning is expected to fail.
    pub fn expects_failure(&self) -> bool {
        matches!(self, ScenarioId::OpenSky)
    }

    /// Planner settings for the scenario.
    pub fn config(&self) -> PlannerConfig {
        match self {
            ScenarioId::CubeFace => PlannerConfig::default()
                .with_voxel_size(1.0)
                .with_trajectory_length(3),
            ScenarioId::OpenSky => PlannerConfig::default().with_voxel_size(0.5),
            ScenarioId::FreeBox => PlannerConfig::default()
                .with_voxel_size(0.1)
                .with_trajectory_length(5),
        }
    }

    /// Builds the synthetic scene.
    pub fn scene(&self) -> Result<Scene, SceneError> {
        let voxel_size = self.config().voxel_size;
        let rays = CameraRays::pinhole(64, 48, std::f64::consts::FRAC_PI_3)?;

        match self {
            ScenarioId::CubeFace => {
                // Asymmetric in y so the center ray does not land on a face diagonal
                let mesh = cube(Vector3::new(10.0, -1.0, -1.0), Vector3::new(12.0, 1.5, 1.0))?;
                let bounds = Aabb::new(Vector3::new(-5.0, -5.0, -5.0), Vector3::new(15.0, 5.0, 5.0));
                let grid = VoxelGrid::from_mesh(&mesh, bounds, voxel_size)?;
                Ok(Scene::new(mesh, grid, rays, Vector3::zeros(), looking_along_x()))
            }
            ScenarioId::OpenSky => {
                // Ground patch well below the camera, outside the upward view
                let mesh = TriangleMesh::from_rows(
                    &[[-3.0, -3.0, -5.0], [3.0, -3.0, -5.0], [0.0, 3.0, -5.0]],
                    &[[0, 1, 2]],
                )?;
                let bounds = Aabb::new(Vector3::repeat(-10.0), Vector3::repeat(10.0));
                let grid = VoxelGrid::from_mesh(&mesh, bounds, voxel_size)?;
                Ok(Scene::new(mesh, grid, rays, Vector3::zeros(), looking_up()))
            }
            ScenarioId::FreeBox => {
                let mesh = TriangleMesh::from_rows(
                    &[[4.0, -0.25, -0.25], [4.0, 0.25, -0.25], [4.0, 0.0, 0.25]],
                    &[[0, 1, 2]],
                )?;
                let bounds = Aabb::new(Vector3::repeat(-5.0), Vector3::repeat(5.0));
                let mut grid = VoxelGrid::new(bounds, voxel_size)?;
                grid.fill_region(&bounds, VoxelState::Free);
                grid.mark_mesh_occupied(&mesh);
                Ok(Scene::new(mesh, grid, rays, Vector3::zeros(), looking_along_x()))
            }
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cube_face" | "cubeface" | "a" => Ok(ScenarioId::CubeFace),
            "open_sky" | "opensky" | "b" => Ok(ScenarioId::OpenSky),
            "free_box" | "freebox" | "c" => Ok(ScenarioId::FreeBox),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

/// Camera looking down +x with +z up.
fn looking_along_x() -> Matrix3<f64> {
    Matrix3::from_columns(&[-Vector3::y(), Vector3::z(), -Vector3::x()])
}

/// Camera looking straight up +z.
fn looking_up() -> Matrix3<f64> {
    Matrix3::from_columns(&[Vector3::x(), -Vector3::y(), -Vector3::z()])
}

/// Closed axis-aligned box made of 12 triangles.
fn cube(min: Vector3<f64>, max: Vector3<f64>) -> Result<TriangleMesh, SceneError> {
    let vertices: Vec<[f64; 3]> = (0..8)
        .map(|i| {
            [
                if i & 1 == 0 { min.x } else { max.x },
                if i & 2 == 0 { min.y } else { max.y },
                if i & 4 == 0 { min.z } else { max.z },
            ]
        })
        .collect();

    let faces = [
        [0, 2, 6], [0, 6, 4], // x = min
        [1, 5, 7], [1, 7, 3], // x = max
        [0, 4, 5], [0, 5, 1], // y = min
        [2, 3, 7], [2, 7, 6], // y = max
        [0, 1, 3], [0, 3, 2], // z = min
        [4, 6, 7], [4, 7, 5], // z = max
    ];

    Ok(TriangleMesh::from_rows(&vertices, &faces)?)
}
