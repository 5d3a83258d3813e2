//! The CSG tree: brush leaves combined by boolean branch nodes.

mod node;
mod tree;

pub use node::{BooleanOp, CsgNode, NodeId, NodeKind};
pub use tree::{CsgTree, Descendants};
