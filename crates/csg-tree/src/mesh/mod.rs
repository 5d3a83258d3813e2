//! Half-edge boundary representation for evaluated CSG nodes.
//!
//! A [`CsgMesh`] stores vertices, half-edges, polygons and supporting planes
//! in flat arenas addressed by 16-bit indices. The fixed index width caps a
//! single mesh at 65535 entries of each kind; exceeding it is reported as
//! [`crate::CsgError::MeshCapacity`], never silently truncated.
//!
//! Polygons are never physically removed. Fragments discarded by a boolean
//! operation are kept in the arena with `visible = false`, so indices stay
//! stable across incremental updates.

mod half_edge;
mod mesh;
mod polygon;
mod split;

pub use half_edge::{HalfEdge, MESH_CAPACITY, MeshIndex};
pub use mesh::{CsgMesh, PolygonLoop, VertexWeld};
pub use polygon::{Polygon, PolygonCategory};
pub use split::{PolygonSplitResult, split_polygon};
