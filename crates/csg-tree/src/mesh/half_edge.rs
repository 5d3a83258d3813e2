//! The directed-edge record of the half-edge structure.

/// Index type shared by all mesh arenas.
pub type MeshIndex = u16;

/// Maximum number of vertices, half-edges, polygons or planes in one mesh.
pub const MESH_CAPACITY: usize = MeshIndex::MAX as usize;

/// A directed edge of a polygon loop.
///
/// Each polygon is bounded by a closed chain of half-edges linked through
/// `next`. The oppositely-directed edge of the adjacent polygon is `twin`;
/// `edge(edge(e).twin).twin == e` holds for every half-edge of a well-formed
/// mesh. `vertex` is the head vertex the edge points at, so a polygon's
/// vertex loop is recovered by walking `next` from its first edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalfEdge {
    /// Head vertex this half-edge points at.
    pub vertex: MeshIndex,
    /// Next half-edge of the same polygon loop, counter-clockwise.
    pub next: MeshIndex,
    /// The oppositely-directed half-edge bounding the adjacent polygon.
    pub twin: MeshIndex,
    /// The polygon this half-edge bounds.
    pub polygon: MeshIndex,
}
