//! CSG (Constructive Solid Geometry) evaluation kernel: boolean trees of
//! convex brushes evaluated into half-edge boundary meshes, with
//! bounds-driven incremental re-evaluation.

mod bounds;
mod brush;
mod categorize;
mod error;
mod mesh;
mod plane;
mod tree;
mod update;

pub use bounds::Aabb;
pub use brush::Brush;
pub use categorize::evaluate_node;
pub use error::{CsgError, MeshElement, Result};
pub use mesh::{
    CsgMesh, HalfEdge, MESH_CAPACITY, MeshIndex, Polygon, PolygonCategory, PolygonLoop,
    PolygonSplitResult, VertexWeld, split_polygon,
};
pub use plane::{DISTANCE_EPSILON, NORMAL_EPSILON, Plane, PlaneSide};
pub use tree::{BooleanOp, CsgNode, CsgTree, Descendants, NodeId, NodeKind};
pub use update::{MeshCache, MeshLookup, process_nodes};
