//! Scene description files and the assembled scene.

use camwalk_core::{CameraRays, PlanError, PlannerConfig, Trajectory, WalkController};
use camwalk_env::{Aabb, EnvError, TriangleMesh, VoxelGrid};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors while loading or assembling a scene.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Cannot read scene file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed scene file: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// How the camera ray bundle is specified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CameraSpec {
    /// Regular pixel grid
    Pinhole { width: usize, height: usize, fov_x: f64 },

    /// Explicit camera-space directions and center distances
    Rays {
        directions: Vec<[f64; 3]>,
        center_distances: Vec<f64>,
    },
}

impl Default for CameraSpec {
    fn default() -> Self {
        CameraSpec::Pinhole {
            width: 256,
            height: 192,
            fov_x: std::f64::consts::FRAC_PI_3,
        }
    }
}

impl CameraSpec {
    pub fn build(&self) -> Result<CameraRays, PlanError> {
        match self {
            CameraSpec::Pinhole { width, height, fov_x } => CameraRays::pinhole(*width, *height, *fov_x),
            CameraSpec::Rays {
                directions,
                center_distances,
            } => CameraRays::new(
                directions.iter().map(|d| Vector3::from(*d)).collect(),
                center_distances.clone(),
            ),
        }
    }
}

/// Bounds of the occupancy grid built around the mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyBounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

/// A scene description as stored on disk (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneInput {
    /// Mesh vertices, N×3
    pub vertices: Vec<[f64; 3]>,

    /// Triangle vertex indices, M×3
    pub faces: Vec<[u32; 3]>,

    /// Camera position of pose 0
    pub start_position: [f64; 3],

    /// World-from-camera rotation of pose 0, row-major
    pub start_orientation: [[f64; 3]; 3],

    #[serde(default)]
    pub camera: CameraSpec,

    /// Region voxelized for occupancy queries
    pub occupancy_bounds: OccupancyBounds,

    /// Planner settings stored with the scene
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<PlannerConfig>,
}

impl SceneInput {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, SceneError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Builds the mesh, occupancy grid and ray bundle.
    ///
    /// The grid is Free everywhere inside the bounds except voxels touched
    /// by the mesh surface.
    pub fn build(&self, voxel_size: f64) -> Result<Scene, SceneError> {
        let mesh = TriangleMesh::from_rows(&self.vertices, &self.faces)?;
        let bounds = Aabb::new(
            Vector3::from(self.occupancy_bounds.min),
            Vector3::from(self.occupancy_bounds.max),
        );
        let grid = VoxelGrid::from_mesh(&mesh, bounds, voxel_size)?;
        let rays = self.camera.build()?;

        let o = &self.start_orientation;
        let orientation = Matrix3::new(
            o[0][0], o[0][1], o[0][2],
            o[1][0], o[1][1], o[1][2],
            o[2][0], o[2][1], o[2][2],
        );

        Ok(Scene::new(mesh, grid, rays, Vector3::from(self.start_position), orientation))
    }
}

/// Everything a planning run needs, built before planning starts.
#[derive(Debug, Clone)]
pub struct Scene {
    pub mesh: TriangleMesh,
    pub grid: VoxelGrid,
    pub rays: CameraRays,
    pub start_position: Vector3<f64>,
    pub start_orientation: Matrix3<f64>,
}

impl Scene {
    pub fn new(
        mesh: TriangleMesh,
        grid: VoxelGrid,
        rays: CameraRays,
        start_position: Vector3<f64>,
        start_orientation: Matrix3<f64>,
    ) -> Self {
        Self {
            mesh,
            grid,
            rays,
            start_position,
            start_orientation,
        }
    }

    /// A fresh walk over this scene.
    pub fn walk(&self, config: PlannerConfig, seed: u64) -> Result<WalkController<'_, TriangleMesh, VoxelGrid>, PlanError> {
        WalkController::new(&self.mesh, &self.grid, &self.rays, config, seed)
    }

    /// Plans a full trajectory from the scene's start pose.
    pub fn plan(&self, config: PlannerConfig, seed: u64) -> Result<Trajectory, PlanError> {
        self.walk(config, seed)?
            .run(&self.start_position, &self.start_orientation)
    }
}
