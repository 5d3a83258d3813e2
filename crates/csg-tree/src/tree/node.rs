//! Node records of the CSG tree arena.

use nalgebra::Vector3;

use crate::bounds::Aabb;
use crate::brush::Brush;

/// Index of a node in its tree's arena.
///
/// Handed out by [`super::CsgTree::add_brush`] and
/// [`super::CsgTree::add_branch`]; only valid for the tree that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

/// Boolean set operator of a branch node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    Union,
    Intersection,
    /// Left operand minus the right operand.
    Subtraction,
}

/// Payload of a node: a convex leaf or an operator over two children.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Brush(Brush),
    Branch {
        op: BooleanOp,
        left: NodeId,
        right: NodeId,
    },
}

/// One node of a [`super::CsgTree`].
///
/// `local_translation` positions the node relative to its parent;
/// `world_translation` is the accumulated ancestor chain, refreshed
/// top-down by [`super::CsgTree::update_world_translations`]. `bounds` is
/// in the node's local space and covers the whole subtree with child
/// offsets baked in.
#[derive(Debug, Clone, PartialEq)]
pub struct CsgNode {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) local_translation: Vector3<f32>,
    pub(crate) world_translation: Vector3<f32>,
    pub(crate) bounds: Aabb,
}

impl CsgNode {
    pub(crate) fn new(kind: NodeKind, local_translation: Vector3<f32>) -> Self {
        Self {
            kind,
            parent: None,
            local_translation,
            world_translation: local_translation,
            bounds: Aabb::empty(),
        }
    }

    #[inline]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn local_translation(&self) -> Vector3<f32> {
        self.local_translation
    }

    #[inline]
    pub fn world_translation(&self) -> Vector3<f32> {
        self.world_translation
    }

    #[inline]
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Whether the node is a brush leaf.
    pub fn is_brush(&self) -> bool {
        matches!(self.kind, NodeKind::Brush(_))
    }
}
