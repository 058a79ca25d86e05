//! Error types for the camwalk scene abstraction.

use thiserror::Error;

/// Errors that can occur while building scene collaborators.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Mesh data is malformed (index out of range, non-finite vertex, etc.)
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// Voxel grid parameters are unusable
    #[error("Invalid voxel grid: {0}")]
    InvalidGrid(String),
}

impl EnvError {
    /// Creates an invalid mesh error.
    pub fn mesh(msg: impl Into<String>) -> Self {
        Self::InvalidMesh(msg.into())
    }

    /// Creates an invalid grid error.
    pub fn grid(msg: impl Into<String>) -> Self {
        Self::InvalidGrid(msg.into())
    }
}
