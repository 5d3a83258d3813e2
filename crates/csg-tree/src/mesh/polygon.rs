//! Polygon records of the half-edge mesh.

use crate::bounds::Aabb;

use super::half_edge::MeshIndex;

/// How a polygon fragment relates to the opposite operand of a boolean
/// operation. Decides, together with the operator, whether the fragment
/// survives as visible surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonCategory {
    /// Fragment lies inside the opposite operand's solid.
    Inside,
    /// Fragment is coplanar with the opposite operand's boundary, normals
    /// pointing the same way.
    Aligned,
    /// Fragment is coplanar with the opposite operand's boundary, normals
    /// pointing opposite ways.
    ReverseAligned,
    /// Fragment lies outside the opposite operand's solid.
    Outside,
}

/// A face of a [`super::CsgMesh`].
///
/// Invisible polygons stay stored in the arena; the renderer must draw only
/// polygons with `visible = true`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Polygon {
    /// First half-edge of the polygon's loop.
    pub first_edge: MeshIndex,
    /// Index of the supporting plane in the mesh's plane arena.
    pub plane: MeshIndex,
    /// Classification against the opposite boolean operand.
    pub category: PolygonCategory,
    /// Whether the polygon is part of the visible surface.
    pub visible: bool,
    /// Cached bounds of the polygon's vertex loop.
    pub bounds: Aabb,
}
