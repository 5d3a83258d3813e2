//! Arena-backed half-edge mesh container.

use std::collections::HashMap;
use std::ops::Range;

use nalgebra::{Point3, Vector3};

use crate::bounds::Aabb;
use crate::error::{CsgError, MeshElement, Result};
use crate::plane::Plane;

use super::half_edge::{HalfEdge, MESH_CAPACITY, MeshIndex};
use super::polygon::Polygon;

/// Exact-position lookup key for vertex welding. Positions are compared by
/// bit pattern: welding only merges vertices that are numerically identical,
/// which is what splitting and re-merging the same geometry produces.
type WeldKey = [u32; 3];

fn weld_key(p: &Point3<f32>) -> WeldKey {
    [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]
}

/// Exact-position vertex lookup for one mesh.
///
/// Kept alive across appends and splits of the same mesh, so a crossing
/// vertex minted by clipping lands on an already-stored vertex at the same
/// position instead of duplicating it.
#[derive(Debug, Clone, Default)]
pub struct VertexWeld {
    map: HashMap<WeldKey, MeshIndex>,
}

impl VertexWeld {
    /// Creates an empty lookup.
    pub fn new() -> Self {
        Self::default()
    }
}

/// A node's evaluated boundary: vertices, half-edges, polygons and
/// supporting planes in flat arenas addressed by [`MeshIndex`].
///
/// Vertex positions are in the owning node's local space; the renderer
/// applies the node's world translation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CsgMesh {
    pub(crate) vertices: Vec<Point3<f32>>,
    pub(crate) edges: Vec<HalfEdge>,
    pub(crate) polygons: Vec<Polygon>,
    pub(crate) planes: Vec<Plane>,
    pub(crate) bounds: Aabb,
}

impl CsgMesh {
    /// Creates an empty mesh.
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            edges: Vec::new(),
            polygons: Vec::new(),
            planes: Vec::new(),
            bounds: Aabb::empty(),
        }
    }

    /// Returns all vertex positions.
    #[inline]
    pub fn vertices(&self) -> &[Point3<f32>] {
        &self.vertices
    }

    /// Returns all half-edges.
    #[inline]
    pub fn edges(&self) -> &[HalfEdge] {
        &self.edges
    }

    /// Returns all polygons, including invisible ones.
    #[inline]
    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    /// Returns the supporting planes.
    #[inline]
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// Returns the bounds of all vertices.
    #[inline]
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Returns the position of a vertex.
    #[inline]
    pub fn vertex(&self, index: MeshIndex) -> Point3<f32> {
        self.vertices[index as usize]
    }

    /// Returns a half-edge record.
    #[inline]
    pub fn edge(&self, index: MeshIndex) -> HalfEdge {
        self.edges[index as usize]
    }

    /// Returns a polygon record.
    #[inline]
    pub fn polygon(&self, index: MeshIndex) -> &Polygon {
        &self.polygons[index as usize]
    }

    /// Returns a supporting plane.
    #[inline]
    pub fn plane(&self, index: MeshIndex) -> &Plane {
        &self.planes[index as usize]
    }

    /// Counts polygons that are part of the visible surface.
    pub fn visible_polygon_count(&self) -> usize {
        self.polygons.iter().filter(|p| p.visible).count()
    }

    pub(crate) fn add_vertex(&mut self, p: Point3<f32>) -> Result<MeshIndex> {
        if self.vertices.len() >= MESH_CAPACITY {
            return Err(CsgError::MeshCapacity(MeshElement::Vertices));
        }
        self.vertices.push(p);
        Ok((self.vertices.len() - 1) as MeshIndex)
    }

    /// Returns the vertex already stored at exactly `p`, adding it if the
    /// mesh does not carry one.
    pub(crate) fn add_or_weld_vertex(
        &mut self,
        p: Point3<f32>,
        weld: &mut VertexWeld,
    ) -> Result<MeshIndex> {
        let key = weld_key(&p);
        if let Some(&i) = weld.map.get(&key) {
            return Ok(i);
        }
        let i = self.add_vertex(p)?;
        weld.map.insert(key, i);
        Ok(i)
    }

    pub(crate) fn add_edge(&mut self, edge: HalfEdge) -> Result<MeshIndex> {
        if self.edges.len() >= MESH_CAPACITY {
            return Err(CsgError::MeshCapacity(MeshElement::Edges));
        }
        self.edges.push(edge);
        Ok((self.edges.len() - 1) as MeshIndex)
    }

    pub(crate) fn add_polygon(&mut self, polygon: Polygon) -> Result<MeshIndex> {
        if self.polygons.len() >= MESH_CAPACITY {
            return Err(CsgError::MeshCapacity(MeshElement::Polygons));
        }
        self.polygons.push(polygon);
        Ok((self.polygons.len() - 1) as MeshIndex)
    }

    /// Returns the slot of a plane equal to `plane` within tolerance,
    /// appending it if the mesh does not carry it yet.
    pub(crate) fn find_or_add_plane(&mut self, plane: Plane) -> Result<MeshIndex> {
        if let Some(i) = self.planes.iter().position(|p| p.approx_eq(&plane)) {
            return Ok(i as MeshIndex);
        }
        if self.planes.len() >= MESH_CAPACITY {
            return Err(CsgError::MeshCapacity(MeshElement::Planes));
        }
        self.planes.push(plane);
        Ok((self.planes.len() - 1) as MeshIndex)
    }

    /// Iterates the half-edges of a polygon's loop, starting at its first
    /// edge and walking `next` until the loop closes.
    pub fn polygon_edges(&self, polygon: MeshIndex) -> PolygonLoop<'_> {
        let first = self.polygons[polygon as usize].first_edge;
        PolygonLoop {
            mesh: self,
            first,
            next: Some(first),
            remaining: self.edges.len(),
        }
    }

    /// Returns the vertex positions of a polygon's loop, in winding order.
    pub fn polygon_vertices(&self, polygon: MeshIndex) -> impl Iterator<Item = Point3<f32>> + '_ {
        self.polygon_edges(polygon)
            .map(|e| self.vertices[self.edges[e as usize].vertex as usize])
    }

    /// Computes the centroid of a polygon's vertex loop.
    pub fn polygon_centroid(&self, polygon: MeshIndex) -> Point3<f32> {
        let mut sum = Vector3::zeros();
        let mut count = 0;
        for p in self.polygon_vertices(polygon) {
            sum += p.coords;
            count += 1;
        }
        Point3::from(sum / count.max(1) as f32)
    }

    /// Computes the polygon's area vector (half the Newell normal sum). Its
    /// direction is the winding normal, its magnitude the polygon area.
    pub(crate) fn polygon_area_vector(&self, polygon: MeshIndex) -> Vector3<f32> {
        let positions: Vec<Point3<f32>> = self.polygon_vertices(polygon).collect();
        let mut sum = Vector3::zeros();
        for (i, p) in positions.iter().enumerate() {
            let q = &positions[(i + 1) % positions.len()];
            sum += p.coords.cross(&q.coords);
        }
        sum * 0.5
    }

    /// Recomputes a polygon's cached bounds from its vertex loop.
    pub(crate) fn update_polygon_bounds(&mut self, polygon: MeshIndex) {
        let mut bounds = Aabb::empty();
        for p in self.polygon_vertices(polygon) {
            bounds.add_point(p);
        }
        self.polygons[polygon as usize].bounds = bounds;
    }

    /// Recomputes the whole-mesh bounds from all vertices.
    pub(crate) fn update_bounds(&mut self) {
        let mut bounds = Aabb::empty();
        for p in &self.vertices {
            bounds.add_point(*p);
        }
        self.bounds = bounds;
    }

    /// Bounds of the visible surface only.
    pub fn visible_bounds(&self) -> Aabb {
        let mut bounds = Aabb::empty();
        for i in 0..self.polygons.len() {
            if !self.polygons[i].visible {
                continue;
            }
            for p in self.polygon_vertices(i as MeshIndex) {
                bounds.add_point(p);
            }
        }
        bounds
    }

    /// Tests whether a half-edge is a silhouette/outline edge: its twin's
    /// polygon is invisible, or lies on a different supporting plane.
    pub fn is_outline_edge(&self, edge: MeshIndex) -> bool {
        let e = &self.edges[edge as usize];
        let twin = &self.edges[e.twin as usize];
        let twin_polygon = &self.polygons[twin.polygon as usize];
        if !twin_polygon.visible {
            return true;
        }
        let own_plane = &self.planes[self.polygons[e.polygon as usize].plane as usize];
        let twin_plane = &self.planes[twin_polygon.plane as usize];
        !own_plane.approx_eq(twin_plane)
    }

    /// Appends a translated copy of `other` into this mesh, welding vertices
    /// at numerically identical positions through `weld` and deduplicating
    /// supporting planes. Returns the range of appended polygon indices.
    pub(crate) fn append_translated(
        &mut self,
        other: &CsgMesh,
        offset: Vector3<f32>,
        weld: &mut VertexWeld,
    ) -> Result<Range<usize>> {
        if self.edges.len() + other.edges.len() > MESH_CAPACITY {
            return Err(CsgError::MeshCapacity(MeshElement::Edges));
        }
        if self.polygons.len() + other.polygons.len() > MESH_CAPACITY {
            return Err(CsgError::MeshCapacity(MeshElement::Polygons));
        }
        let edge_base = self.edges.len() as MeshIndex;
        let polygon_base = self.polygons.len();

        let mut vertex_map = Vec::with_capacity(other.vertices.len());
        for v in &other.vertices {
            vertex_map.push(self.add_or_weld_vertex(v + offset, weld)?);
        }

        let mut plane_map = Vec::with_capacity(other.planes.len());
        for plane in &other.planes {
            plane_map.push(self.find_or_add_plane(plane.translated(offset))?);
        }

        for edge in &other.edges {
            self.edges.push(HalfEdge {
                vertex: vertex_map[edge.vertex as usize],
                next: edge.next + edge_base,
                twin: edge.twin + edge_base,
                polygon: edge.polygon + polygon_base as MeshIndex,
            });
        }
        for polygon in &other.polygons {
            self.polygons.push(Polygon {
                first_edge: polygon.first_edge + edge_base,
                plane: plane_map[polygon.plane as usize],
                category: polygon.category,
                visible: polygon.visible,
                bounds: polygon.bounds.translated(offset),
            });
        }
        self.bounds.add_aabb_translated(&other.bounds, offset);
        Ok(polygon_base..self.polygons.len())
    }

    /// Splits the edge `e` (and its twin) at `point`, keeping both adjacent
    /// polygon loops closed. The point is welded onto an existing vertex at
    /// the same position when the mesh has one. Returns the new edge
    /// continuing `e`'s loop beyond the inserted vertex.
    pub(crate) fn split_edge(
        &mut self,
        e: MeshIndex,
        point: Point3<f32>,
        weld: &mut VertexWeld,
    ) -> Result<MeshIndex> {
        let t = self.edges[e as usize].twin;
        let w = self.add_or_weld_vertex(point, weld)?;

        let ei = e as usize;
        let a = self.add_edge(HalfEdge {
            vertex: self.edges[ei].vertex,
            next: self.edges[ei].next,
            twin: t,
            polygon: self.edges[ei].polygon,
        })?;
        let ti = t as usize;
        let b = self.add_edge(HalfEdge {
            vertex: self.edges[ti].vertex,
            next: self.edges[ti].next,
            twin: e,
            polygon: self.edges[ti].polygon,
        })?;

        self.edges[ei].vertex = w;
        self.edges[ei].next = a;
        self.edges[ei].twin = b;
        self.edges[ti].vertex = w;
        self.edges[ti].next = b;
        self.edges[ti].twin = a;
        Ok(a)
    }

    /// Reverses a polygon's winding in place and replaces its supporting
    /// plane by the negated plane. Twin links are untouched.
    pub(crate) fn reverse_polygon(&mut self, polygon: MeshIndex) -> Result<()> {
        let loop_edges: Vec<MeshIndex> = self.polygon_edges(polygon).collect();
        let heads: Vec<MeshIndex> = loop_edges
            .iter()
            .map(|&e| self.edges[e as usize].vertex)
            .collect();
        let n = loop_edges.len();
        for i in 0..n {
            let prev = (i + n - 1) % n;
            let e = loop_edges[i] as usize;
            self.edges[e].next = loop_edges[prev];
            self.edges[e].vertex = heads[prev];
        }
        let flipped = self.planes[self.polygons[polygon as usize].plane as usize].flipped();
        let slot = self.find_or_add_plane(flipped)?;
        self.polygons[polygon as usize].plane = slot;
        Ok(())
    }
}

/// Iterator over the half-edges of one polygon loop.
///
/// Bounded by the total edge count, so a malformed loop terminates instead
/// of cycling forever.
pub struct PolygonLoop<'a> {
    mesh: &'a CsgMesh,
    first: MeshIndex,
    next: Option<MeshIndex>,
    remaining: usize,
}

impl Iterator for PolygonLoop<'_> {
    type Item = MeshIndex;

    fn next(&mut self) -> Option<MeshIndex> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let current = self.next?;
        let next = self.mesh.edges[current as usize].next;
        self.next = if next == self.first { None } else { Some(next) };
        Some(current)
    }
}
