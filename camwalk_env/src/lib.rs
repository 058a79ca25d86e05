//! camwalk Scene Abstraction Layer
//!
//! The trajectory planner never touches meshes or voxel maps directly. It
//! talks to the scene through two narrow, read-only interfaces:
//!
//! - [`RayCaster`]: nearest-hit ray/triangle intersection against a fixed mesh
//! - [`OccupancyVolume`]: ternary free/occupied/unknown query over a bounded region
//!
//! Both are built once, before planning starts, and are only ever borrowed
//! immutably afterwards. This crate also ships reference implementations
//! ([`TriangleMesh`], [`VoxelGrid`]) so the planner can run end to end
//! without an external ray tracing or mapping backend.
//!
//! # Example
//!
//! ```ignore
//! use camwalk_env::{Aabb, OccupancyVolume, RayCaster, TriangleMesh, VoxelGrid};
//! use nalgebra::Vector3;
//!
//! let mesh = TriangleMesh::new(vertices, triangles)?;
//! let bounds = Aabb::new(Vector3::new(-5.0, -5.0, -5.0), Vector3::new(5.0, 5.0, 5.0));
//! let grid = VoxelGrid::from_mesh(&mesh, bounds, 0.25)?;
//!
//! let hit = mesh.intersect(&Vector3::zeros(), &Vector3::x());
//! let sample = grid.query(&Vector3::new(1.0, 0.0, 0.0));
//! ```

mod caster;
mod occupancy;
mod types;
mod error;
mod mesh_impl;
mod voxel_impl;

pub use caster::RayCaster;
pub use occupancy::OccupancyVolume;
pub use types::{Aabb, OccupancySample, PrimitiveId, RayHit, UnknownReason, MISS_PRIMITIVE};
pub use error::EnvError;
pub use mesh_impl::TriangleMesh;
pub use voxel_impl::{VoxelGrid, VoxelState};
