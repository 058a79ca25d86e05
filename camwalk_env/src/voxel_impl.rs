//! Reference OccupancyVolume: a dense voxel grid.

use crate::error::EnvError;
use crate::mesh_impl::TriangleMesh;
use crate::occupancy::OccupancyVolume;
use crate::types::{Aabb, OccupancySample, UnknownReason};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Largest number of cells a grid may allocate
const MAX_CELLS: usize = 1 << 28;

/// Stored state of a single voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoxelState {
    Unknown,
    Free,
    Occupied,
}

impl From<VoxelState> for OccupancySample {
    fn from(state: VoxelState) -> Self {
        match state {
            VoxelState::Free => OccupancySample::Free,
            VoxelState::Occupied => OccupancySample::Occupied,
            VoxelState::Unknown => OccupancySample::Unknown(UnknownReason::Unobserved),
        }
    }
}

/// Dense grid of cubic voxels covering an axis-aligned region.
///
/// The grid starts at `bounds.min` and is rounded up to a whole number of
/// voxels per axis, so [`bounds_max`](OccupancyVolume::bounds_max) may lie
/// slightly beyond the requested maximum corner. Anything outside the grid
/// reads as `Unknown(Unobserved)`.
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    origin: Vector3<f64>,
    voxel_size: f64,
    dims: [usize; 3],
    cells: Vec<VoxelState>,
}

impl VoxelGrid {
    /// Creates a grid over `bounds` with every voxel `Unknown`.
    pub fn new(bounds: Aabb, voxel_size: f64) -> Result<Self, EnvError> {
        if !(voxel_size.is_finite() && voxel_size > 0.0) {
            return Err(EnvError::grid(format!("voxel size must be positive, got {}", voxel_size)));
        }
        if !bounds.min.iter().chain(bounds.max.iter()).all(|c| c.is_finite()) {
            return Err(EnvError::grid("bounds must be finite"));
        }

        let size = bounds.size();
        let mut dims = [0usize; 3];
        for a in 0..3 {
            dims[a] = ((size[a] / voxel_size).ceil() as usize).max(1);
        }

        let total = dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .filter(|&n| n <= MAX_CELLS)
            .ok_or_else(|| EnvError::grid(format!("grid of {:?} voxels is too large", dims)))?;

        Ok(Self {
            origin: bounds.min,
            voxel_size,
            dims,
            cells: vec![VoxelState::Unknown; total],
        })
    }

    /// Creates a grid where everything is `Free` except voxels touched by
    /// the mesh surface, which are `Occupied`.
    pub fn from_mesh(mesh: &TriangleMesh, bounds: Aabb, voxel_size: f64) -> Result<Self, EnvError> {
        let mut grid = Self::new(bounds, voxel_size)?;
        grid.fill(VoxelState::Free);
        grid.mark_mesh_occupied(mesh);
        Ok(grid)
    }

    /// Number of voxels along each axis.
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Voxel index containing `point`, if inside the grid.
    pub fn voxel_index(&self, point: &Vector3<f64>) -> Option<[usize; 3]> {
        let mut index = [0usize; 3];
        for a in 0..3 {
            let cell = ((point[a] - self.origin[a]) / self.voxel_size).floor();
            if !(cell >= 0.0 && cell < self.dims[a] as f64) {
                return None;
            }
            index[a] = cell as usize;
        }
        Some(index)
    }

    /// Centre of a voxel.
    pub fn voxel_centre(&self, index: [usize; 3]) -> Vector3<f64> {
        Vector3::new(
            self.origin.x + (index[0] as f64 + 0.5) * self.voxel_size,
            self.origin.y + (index[1] as f64 + 0.5) * self.voxel_size,
            self.origin.z + (index[2] as f64 + 0.5) * self.voxel_size,
        )
    }

    fn linear(&self, [i, j, k]: [usize; 3]) -> usize {
        (k * self.dims[1] + j) * self.dims[0] + i
    }

    /// State of a voxel; out-of-range indices read as `Unknown`.
    pub fn state(&self, index: [usize; 3]) -> VoxelState {
        if (0..3).all(|a| index[a] < self.dims[a]) {
            self.cells[self.linear(index)]
        } else {
            VoxelState::Unknown
        }
    }

    /// Sets a single voxel. Out-of-range indices are ignored.
    pub fn set_voxel(&mut self, index: [usize; 3], state: VoxelState) {
        if (0..3).all(|a| index[a] < self.dims[a]) {
            let at = self.linear(index);
            self.cells[at] = state;
        }
    }

    /// Sets the voxel containing `point`. Returns false if outside the grid.
    pub fn set_point(&mut self, point: &Vector3<f64>, state: VoxelState) -> bool {
        match self.voxel_index(point) {
            Some(index) => {
                self.set_voxel(index, state);
                true
            }
            None => false,
        }
    }

    /// Sets every voxel.
    pub fn fill(&mut self, state: VoxelState) {
        self.cells.fill(state);
    }

    /// Sets every voxel whose centre lies inside `region`.
    pub fn fill_region(&mut self, region: &Aabb, state: VoxelState) {
        for k in 0..self.dims[2] {
            for j in 0..self.dims[1] {
                for i in 0..self.dims[0] {
                    if region.contains_point(&self.voxel_centre([i, j, k])) {
                        let at = self.linear([i, j, k]);
                        self.cells[at] = state;
                    }
                }
            }
        }
    }

    /// Marks every voxel touched by a triangle of `mesh` as `Occupied`.
    ///
    /// Triangles are rasterized by barycentric sampling at half-voxel spacing.
    pub fn mark_mesh_occupied(&mut self, mesh: &TriangleMesh) {
        let spacing = 0.5 * self.voxel_size;

        for index in 0..mesh.len() {
            let [a, b, c] = mesh.triangle(index);
            let longest = (b - a).norm().max((c - a).norm()).max((c - b).norm());
            let steps = ((longest / spacing).ceil() as usize).max(1);

            for i in 0..=steps {
                for j in 0..=(steps - i) {
                    let s = i as f64 / steps as f64;
                    let t = j as f64 / steps as f64;
                    let p = a + (b - a) * s + (c - a) * t;
                    self.set_point(&p, VoxelState::Occupied);
                }
            }
        }
    }

    /// Number of voxels currently in `state`.
    pub fn count(&self, state: VoxelState) -> usize {
        self.cells.iter().filter(|&&s| s == state).count()
    }
}

impl OccupancyVolume for VoxelGrid {
    fn lookup(&self, point: &Vector3<f64>) -> OccupancySample {
        match self.voxel_index(point) {
            Some(index) => self.state(index).into(),
            None => OccupancySample::Unknown(UnknownReason::Unobserved),
        }
    }

    fn bounds_min(&self) -> Vector3<f64> {
        self.origin
    }

    fn bounds_max(&self) -> Vector3<f64> {
        self.origin
            + Vector3::new(
                self.dims[0] as f64,
                self.dims[1] as f64,
                self.dims[2] as f64,
            ) * self.voxel_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_bounds() -> Aabb {
        Aabb::new(Vector3::zeros(), Vector3::repeat(4.0))
    }

    #[test]
    fn test_new_grid_is_unknown() {
        let grid = VoxelGrid::new(unit_bounds(), 1.0).unwrap();
        assert_eq!(grid.dims(), [4, 4, 4]);
        assert_eq!(grid.count(VoxelState::Unknown), 64);
        assert_eq!(
            grid.query(&Vector3::new(1.5, 1.5, 1.5)),
            OccupancySample::Unknown(UnknownReason::Unobserved)
        );
    }

    #[test]
    fn test_outside_is_unobserved() {
        let mut grid = VoxelGrid::new(unit_bounds(), 1.0).unwrap();
        grid.fill(VoxelState::Free);
        assert_eq!(grid.query(&Vector3::new(2.0, 2.0, 2.0)), OccupancySample::Free);
        assert_eq!(
            grid.query(&Vector3::new(-0.1, 2.0, 2.0)),
            OccupancySample::Unknown(UnknownReason::Unobserved)
        );
        assert_eq!(
            grid.query(&Vector3::new(2.0, 2.0, f64::NAN)),
            OccupancySample::Unknown(UnknownReason::NonFinite)
        );
    }

    #[test]
    fn test_fill_region_and_set_point() {
        let mut grid = VoxelGrid::new(unit_bounds(), 1.0).unwrap();
        grid.fill_region(
            &Aabb::new(Vector3::zeros(), Vector3::new(2.0, 4.0, 4.0)),
            VoxelState::Free,
        );
        assert_eq!(grid.count(VoxelState::Free), 32);

        assert!(grid.set_point(&Vector3::new(0.5, 0.5, 0.5), VoxelState::Occupied));
        assert!(!grid.set_point(&Vector3::new(9.0, 0.5, 0.5), VoxelState::Occupied));
        assert_eq!(grid.query(&Vector3::new(0.9, 0.1, 0.2)), OccupancySample::Occupied);
    }

    #[test]
    fn test_mesh_surface_is_occupied() {
        let mesh = TriangleMesh::from_rows(
            &[[0.5, 0.5, 2.2], [3.5, 0.5, 2.2], [0.5, 3.5, 2.2]],
            &[[0, 1, 2]],
        )
        .unwrap();
        let grid = VoxelGrid::from_mesh(&mesh, unit_bounds(), 1.0).unwrap();

        assert_eq!(grid.query(&Vector3::new(1.0, 1.0, 2.5)), OccupancySample::Occupied);
        assert_eq!(grid.query(&Vector3::new(1.0, 1.0, 0.5)), OccupancySample::Free);
        assert_eq!(grid.query(&Vector3::new(3.5, 3.5, 2.5)), OccupancySample::Free);
        assert!(grid.count(VoxelState::Occupied) > 0);
    }

    #[test]
    fn test_bounds_round_up_to_whole_voxels() {
        let grid = VoxelGrid::new(
            Aabb::new(Vector3::zeros(), Vector3::new(1.0, 1.0, 0.3)),
            0.25,
        )
        .unwrap();
        assert_eq!(grid.dims(), [4, 4, 2]);
        assert_eq!(grid.bounds_max(), Vector3::new(1.0, 1.0, 0.5));
    }

    #[test]
    fn test_rejects_bad_voxel_size() {
        assert!(VoxelGrid::new(unit_bounds(), 0.0).is_err());
        assert!(VoxelGrid::new(unit_bounds(), f64::NAN).is_err());
    }
}
