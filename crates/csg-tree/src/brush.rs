//! Convex brush primitives: the leaves of a CSG tree.

use std::collections::HashMap;

use nalgebra::{Matrix3, Point3, Vector3};

use crate::bounds::Aabb;
use crate::error::Result;
use crate::mesh::{CsgMesh, HalfEdge, MeshIndex, Polygon, PolygonCategory};
use crate::plane::{DISTANCE_EPSILON, Plane, PlaneSide};

/// Determinant threshold below which a plane triple is treated as having no
/// single intersection point.
const CORNER_DETERMINANT_EPSILON: f32 = 1e-6;

/// A convex solid bounded by outward-facing planes.
///
/// The solid is the intersection of the planes' negative half-spaces. The
/// plane list is not validated: a set that does not bound a closed convex
/// volume still produces a mesh, but its shape is unspecified.
#[derive(Debug, Clone, PartialEq)]
pub struct Brush {
    planes: Vec<Plane>,
}

impl Brush {
    /// Creates a brush from outward-facing boundary planes.
    pub fn new(planes: Vec<Plane>) -> Self {
        Self { planes }
    }

    /// Creates an axis-aligned cuboid centred on the origin.
    pub fn cuboid(half_extents: Vector3<f32>) -> Self {
        Self::new(vec![
            Plane::new(Vector3::x(), half_extents.x),
            Plane::new(-Vector3::x(), half_extents.x),
            Plane::new(Vector3::y(), half_extents.y),
            Plane::new(-Vector3::y(), half_extents.y),
            Plane::new(Vector3::z(), half_extents.z),
            Plane::new(-Vector3::z(), half_extents.z),
        ])
    }

    /// Returns the boundary planes.
    #[inline]
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// Tests whether a point is inside the brush or on its boundary.
    pub fn contains_point(&self, point: Point3<f32>) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.classify_point(point) != PlaneSide::Outside)
    }

    /// Builds the brush's boundary mesh in local space.
    ///
    /// Corners are the intersection points of plane triples that lie on or
    /// inside every plane; each plane with at least three incident corners
    /// becomes one polygon, wound counter-clockwise around its outward
    /// normal. All polygons start visible.
    pub fn base_mesh(&self) -> Result<CsgMesh> {
        let corners = self.corners();
        let mut mesh = CsgMesh::new();
        for corner in &corners {
            mesh.add_vertex(*corner)?;
        }

        // Directed tail->head edges of the faces built so far, for stitching
        // twins once the opposite face exists.
        let mut directed: HashMap<(MeshIndex, MeshIndex), MeshIndex> = HashMap::new();

        for plane in &self.planes {
            let incident: Vec<MeshIndex> = (0..corners.len() as MeshIndex)
                .filter(|&v| plane.classify_point(corners[v as usize]) == PlaneSide::Intersects)
                .collect();
            if incident.len() < 3 {
                continue;
            }
            let ring = sort_counter_clockwise(&corners, incident, *plane);

            let plane_slot = mesh.find_or_add_plane(*plane)?;
            let polygon = mesh.add_polygon(Polygon {
                first_edge: 0,
                plane: plane_slot,
                category: PolygonCategory::Aligned,
                visible: true,
                bounds: Aabb::empty(),
            })?;

            let first = mesh.edges().len() as MeshIndex;
            let count = ring.len() as MeshIndex;
            for (i, window) in ring.iter().zip(ring.iter().cycle().skip(1)).enumerate() {
                let (&tail, &head) = window;
                let e = mesh.add_edge(HalfEdge {
                    vertex: head,
                    next: first + (i as MeshIndex + 1) % count,
                    twin: 0,
                    polygon,
                })?;
                directed.insert((tail, head), e);
            }
            mesh.polygons[polygon as usize].first_edge = first;
            mesh.update_polygon_bounds(polygon);
        }

        // Stitch twins through the reversed directed edge. A missing
        // opposite face leaves the edge twinned with itself.
        for (&(tail, head), &e) in &directed {
            let twin = directed.get(&(head, tail)).copied().unwrap_or(e);
            mesh.edges[e as usize].twin = twin;
        }

        mesh.update_bounds();
        Ok(mesh)
    }

    /// Intersects every plane triple and keeps the points on or inside all
    /// planes, welding points within the distance epsilon of each other.
    fn corners(&self) -> Vec<Point3<f32>> {
        let mut corners: Vec<Point3<f32>> = Vec::new();
        let n = self.planes.len();
        for i in 0..n {
            for j in i + 1..n {
                for k in j + 1..n {
                    let Some(point) =
                        intersect_planes(&self.planes[i], &self.planes[j], &self.planes[k])
                    else {
                        continue;
                    };
                    if !self.contains_point(point) {
                        continue;
                    }
                    let welded = corners
                        .iter()
                        .any(|c| (c - point).norm() <= DISTANCE_EPSILON);
                    if !welded {
                        corners.push(point);
                    }
                }
            }
        }
        corners
    }
}

/// Intersection point of three planes, if they meet in a single point.
fn intersect_planes(a: &Plane, b: &Plane, c: &Plane) -> Option<Point3<f32>> {
    let m = Matrix3::from_rows(&[
        a.normal().transpose(),
        b.normal().transpose(),
        c.normal().transpose(),
    ]);
    if m.determinant().abs() < CORNER_DETERMINANT_EPSILON {
        return None;
    }
    let rhs = Vector3::new(a.offset(), b.offset(), c.offset());
    m.lu().solve(&rhs).map(Point3::from)
}

/// Sorts coplanar vertices counter-clockwise around the plane's outward
/// normal, by angle around their centroid in an in-plane basis.
fn sort_counter_clockwise(
    corners: &[Point3<f32>],
    mut ring: Vec<MeshIndex>,
    plane: Plane,
) -> Vec<MeshIndex> {
    let normal = plane.normal();
    let seed = if normal.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let u = normal.cross(&seed).normalize();
    let v = normal.cross(&u);

    let mut centroid = Vector3::zeros();
    for &i in &ring {
        centroid += corners[i as usize].coords;
    }
    centroid /= ring.len() as f32;

    // u x v = u x (n x u) = n, so (u, v, normal) is right-handed and
    // increasing atan2(d.v, d.u) walks counter-clockwise around the normal.
    ring.sort_by(|&a, &b| {
        let da = corners[a as usize].coords - centroid;
        let db = corners[b as usize].coords - centroid;
        let angle_a = da.dot(&v).atan2(da.dot(&u));
        let angle_b = db.dot(&v).atan2(db.dot(&u));
        angle_a.total_cmp(&angle_b)
    });
    ring
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_involution(mesh: &CsgMesh) {
        for (i, edge) in mesh.edges().iter().enumerate() {
            assert_eq!(mesh.edge(edge.twin).twin as usize, i);
        }
    }

    #[test]
    fn cuboid_mesh_is_a_closed_box() {
        let brush = Brush::cuboid(Vector3::new(1.0, 2.0, 3.0));
        let mesh = brush.base_mesh().unwrap();

        assert_eq!(mesh.vertices().len(), 8);
        assert_eq!(mesh.polygons().len(), 6);
        assert_eq!(mesh.edges().len(), 24);
        assert_eq!(mesh.planes().len(), 6);
        assert_involution(&mesh);

        let bounds = mesh.bounds();
        assert_relative_eq!(bounds.min.x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(bounds.max.z, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn faces_wind_counter_clockwise_around_outward_normals() {
        let brush = Brush::cuboid(Vector3::new(0.5, 0.5, 0.5));
        let mesh = brush.base_mesh().unwrap();

        for i in 0..mesh.polygons().len() as MeshIndex {
            let area = mesh.polygon_area_vector(i);
            let normal = mesh.plane(mesh.polygon(i).plane).normal();
            assert!(
                area.dot(&normal) > 0.0,
                "polygon {i} winds against its outward normal"
            );
            assert_relative_eq!(area.norm(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn tetrahedron_from_four_planes() {
        let diagonal = Vector3::new(1.0, 1.0, 1.0);
        let brush = Brush::new(vec![
            Plane::new(-Vector3::x(), 0.0),
            Plane::new(-Vector3::y(), 0.0),
            Plane::new(-Vector3::z(), 0.0),
            Plane::from_point_and_normal(Point3::new(1.0, 0.0, 0.0), diagonal),
        ]);
        let mesh = brush.base_mesh().unwrap();

        assert_eq!(mesh.vertices().len(), 4);
        assert_eq!(mesh.polygons().len(), 4);
        assert_eq!(mesh.edges().len(), 12);
        assert_involution(&mesh);
    }

    #[test]
    fn unbounded_plane_set_yields_no_faces() {
        let brush = Brush::new(vec![
            Plane::new(Vector3::x(), 1.0),
            Plane::new(-Vector3::x(), 1.0),
        ]);
        let mesh = brush.base_mesh().unwrap();

        assert!(mesh.vertices().is_empty());
        assert!(mesh.polygons().is_empty());
    }

    #[test]
    fn contains_point_includes_the_boundary() {
        let brush = Brush::cuboid(Vector3::new(0.5, 0.5, 0.5));

        assert!(brush.contains_point(Point3::origin()));
        assert!(brush.contains_point(Point3::new(0.5, 0.0, 0.0)));
        assert!(brush.contains_point(Point3::new(0.5, 0.5, 0.5)));
        assert!(!brush.contains_point(Point3::new(0.6, 0.0, 0.0)));
    }
}
