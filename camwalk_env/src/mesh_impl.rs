//! Reference RayCaster: brute-force ray/triangle intersection.

use crate::caster::RayCaster;
use crate::error::EnvError;
use crate::types::{Aabb, PrimitiveId, RayHit};
use nalgebra::Vector3;

/// Determinant threshold below which a ray is treated as parallel to a triangle
const PARALLEL_EPS: f64 = 1e-12;

/// Hits closer than this are ignored so a ray never re-hits its own origin surface
const MIN_HIT_DISTANCE: f64 = 1e-9;

/// An immutable triangle mesh that answers nearest-hit ray queries.
///
/// Every triangle is tested (Möller–Trumbore, two-sided) after a whole-mesh
/// bounding box rejection. The primitive id of a hit is the triangle's index
/// in the input index buffer.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    /// Vertex positions
    vertices: Vec<Vector3<f64>>,

    /// Vertex index triples, one per triangle
    triangles: Vec<[u32; 3]>,

    /// Bounding box of all vertices (None for a mesh without vertices)
    bounds: Option<Aabb>,
}

impl TriangleMesh {
    /// Builds a mesh, validating that every index refers to a vertex and
    /// every vertex is finite.
    pub fn new(vertices: Vec<Vector3<f64>>, triangles: Vec<[u32; 3]>) -> Result<Self, EnvError> {
        if let Some(i) = vertices.iter().position(|v| !v.iter().all(|c| c.is_finite())) {
            return Err(EnvError::mesh(format!("vertex {} is not finite", i)));
        }

        for (t, tri) in triangles.iter().enumerate() {
            if let Some(&bad) = tri.iter().find(|&&i| i as usize >= vertices.len()) {
                return Err(EnvError::mesh(format!(
                    "triangle {} references vertex {} but mesh has {} vertices",
                    t,
                    bad,
                    vertices.len()
                )));
            }
        }

        let bounds = Aabb::from_points(&vertices);

        Ok(Self {
            vertices,
            triangles,
            bounds,
        })
    }

    /// Builds a mesh from plain row arrays (N×3 vertices, M×3 indices).
    pub fn from_rows(vertices: &[[f64; 3]], triangles: &[[u32; 3]]) -> Result<Self, EnvError> {
        let vertices = vertices.iter().map(|v| Vector3::from(*v)).collect();
        Self::new(vertices, triangles.to_vec())
    }

    /// Number of triangles.
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// Returns true if the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Corner positions of a triangle.
    pub fn triangle(&self, index: usize) -> [Vector3<f64>; 3] {
        let [a, b, c] = self.triangles[index];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    /// Returns false when the ray provably misses the mesh bounds.
    fn ray_may_hit_bounds(&self, origin: &Vector3<f64>, direction: &Vector3<f64>) -> bool {
        let Some(bounds) = self.bounds else {
            return false;
        };

        let mut t_min = f64::NEG_INFINITY;
        let mut t_max = f64::INFINITY;

        for a in 0..3 {
            if direction[a].abs() > PARALLEL_EPS {
                let t0 = (bounds.min[a] - origin[a]) / direction[a];
                let t1 = (bounds.max[a] - origin[a]) / direction[a];
                t_min = t_min.max(t0.min(t1));
                t_max = t_max.min(t0.max(t1));
            } else if origin[a] < bounds.min[a] || origin[a] > bounds.max[a] {
                return false;
            }
        }

        t_max >= t_min && t_max >= 0.0
    }
}

/// Möller–Trumbore ray/triangle test. Returns the hit distance.
fn intersect_triangle(
    origin: &Vector3<f64>,
    direction: &Vector3<f64>,
    [a, b, c]: &[Vector3<f64>; 3],
) -> Option<f64> {
    let e1 = b - a;
    let e2 = c - a;

    let p = direction.cross(&e2);
    let det = e1.dot(&p);
    if det.abs() < PARALLEL_EPS {
        return None;
    }
    let inv_det = 1.0 / det;

    let s = origin - a;
    let u = s.dot(&p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&e1);
    let v = direction.dot(&q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = e2.dot(&q) * inv_det;
    (t > MIN_HIT_DISTANCE).then_some(t)
}

impl RayCaster for TriangleMesh {
    fn intersect(&self, origin: &Vector3<f64>, direction: &Vector3<f64>) -> RayHit {
        if !self.ray_may_hit_bounds(origin, direction) {
            return RayHit::miss();
        }

        let mut nearest: Option<(f64, usize)> = None;

        for index in 0..self.triangles.len() {
            let corners = self.triangle(index);
            if let Some(t) = intersect_triangle(origin, direction, &corners) {
                if nearest.map_or(true, |(best, _)| t < best) {
                    nearest = Some((t, index));
                }
            }
        }

        match nearest {
            Some((distance, index)) => {
                let [a, b, c] = self.triangle(index);
                let normal = (b - a).cross(&(c - a)).normalize();
                RayHit::new(distance, index as PrimitiveId, normal)
            }
            None => RayHit::miss(),
        }
    }
}
