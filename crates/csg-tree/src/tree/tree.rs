//! Arena-backed CSG tree.

use nalgebra::{Point3, Vector3};

use crate::bounds::Aabb;
use crate::brush::Brush;

use super::node::{BooleanOp, CsgNode, NodeId, NodeKind};

/// A binary tree of boolean set operations over convex brushes.
///
/// Nodes live in a flat arena addressed by [`NodeId`]; parent links are
/// plain indices, so ownership stays strictly tree-owns-nodes. The root is
/// the most recently added parentless node, which is the last branch of a
/// bottom-up build, or the only brush of a single-leaf tree.
#[derive(Debug, Clone, Default)]
pub struct CsgTree {
    nodes: Vec<CsgNode>,
    root: Option<NodeId>,
}

impl CsgTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
        }
    }

    /// Returns the root node, if the tree has any nodes.
    #[inline]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Returns the number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns a node.
    #[inline]
    pub fn node(&self, id: NodeId) -> &CsgNode {
        &self.nodes[id.0]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut CsgNode {
        &mut self.nodes[id.0]
    }

    /// Adds a brush leaf positioned relative to its future parent.
    pub fn add_brush(&mut self, brush: Brush, local_translation: Vector3<f32>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes
            .push(CsgNode::new(NodeKind::Brush(brush), local_translation));
        if self.root.is_none() {
            self.root = Some(id);
        }
        id
    }

    /// Adds a branch over two existing parentless nodes and makes it the
    /// root. Children are re-parented to the new branch.
    pub fn add_branch(
        &mut self,
        op: BooleanOp,
        left: NodeId,
        right: NodeId,
        local_translation: Vector3<f32>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(CsgNode::new(
            NodeKind::Branch { op, left, right },
            local_translation,
        ));
        self.nodes[left.0].parent = Some(id);
        self.nodes[right.0].parent = Some(id);
        self.root = Some(id);
        id
    }

    /// Moves a node relative to its parent. World translations and bounds
    /// are stale until the next update pass refreshes them.
    pub fn set_local_translation(&mut self, id: NodeId, local_translation: Vector3<f32>) {
        self.nodes[id.0].local_translation = local_translation;
    }

    /// Recomputes every node's world translation top-down from the root.
    pub fn update_world_translations(&mut self) {
        let Some(root) = self.root else {
            return;
        };
        let order: Vec<NodeId> = self.descendants(root).collect();
        for id in order {
            let local = self.nodes[id.0].local_translation;
            let world = match self.nodes[id.0].parent {
                Some(parent) => self.nodes[parent.0].world_translation + local,
                None => local,
            };
            self.nodes[id.0].world_translation = world;
        }
    }

    /// Recomputes branch bounds bottom-up from the root. Leaf bounds are
    /// set from their evaluated meshes and left untouched here.
    pub fn update_bounds(&mut self) {
        let Some(root) = self.root else {
            return;
        };
        let order: Vec<NodeId> = self.descendants(root).collect();
        for id in order.into_iter().rev() {
            if let NodeKind::Branch { left, right, .. } = self.nodes[id.0].kind {
                let mut bounds = Aabb::empty();
                let l = &self.nodes[left.0];
                bounds.add_aabb_translated(&l.bounds, l.local_translation);
                let r = &self.nodes[right.0];
                bounds.add_aabb_translated(&r.bounds, r.local_translation);
                self.nodes[id.0].bounds = bounds;
            }
        }
    }

    pub(crate) fn set_node_bounds(&mut self, id: NodeId, bounds: Aabb) {
        self.nodes[id.0].bounds = bounds;
    }

    /// Iterates a subtree in preorder (parents before children).
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: vec![id],
        }
    }

    /// Iterates the brush leaves of a subtree.
    pub fn child_brushes(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.descendants(id).filter(|&n| self.node(n).is_brush())
    }

    /// Iterates a node's ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).parent, |&n| self.node(n).parent)
    }

    /// Tests solid membership of a point given in the node's local space.
    ///
    /// A brush contains every point not strictly outside any of its planes,
    /// so boundaries count as solid. A branch applies its operator over its
    /// children, with the point translated into each child's space.
    pub fn contains_point(&self, id: NodeId, point: Point3<f32>) -> bool {
        match &self.nodes[id.0].kind {
            NodeKind::Brush(brush) => brush.contains_point(point),
            NodeKind::Branch { op, left, right } => {
                let in_left =
                    self.contains_point(*left, point - self.node(*left).local_translation);
                let in_right =
                    self.contains_point(*right, point - self.node(*right).local_translation);
                match op {
                    BooleanOp::Union => in_left || in_right,
                    BooleanOp::Intersection => in_left && in_right,
                    BooleanOp::Subtraction => in_left && !in_right,
                }
            }
        }
    }
}

/// Preorder subtree iterator over an explicit stack.
pub struct Descendants<'a> {
    tree: &'a CsgTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        if let NodeKind::Branch { left, right, .. } = self.tree.node(id).kind {
            self.stack.push(right);
            self.stack.push(left);
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_brush() -> Brush {
        Brush::cuboid(Vector3::new(0.5, 0.5, 0.5))
    }

    /// Union(A, B - C) with B and C offset along x.
    fn sample_tree() -> (CsgTree, [NodeId; 5]) {
        let mut tree = CsgTree::new();
        let a = tree.add_brush(unit_brush(), Vector3::zeros());
        let b = tree.add_brush(unit_brush(), Vector3::zeros());
        let c = tree.add_brush(unit_brush(), Vector3::new(0.5, 0.0, 0.0));
        let cut = tree.add_branch(BooleanOp::Subtraction, b, c, Vector3::new(2.0, 0.0, 0.0));
        let root = tree.add_branch(BooleanOp::Union, a, cut, Vector3::new(0.0, 1.0, 0.0));
        (tree, [a, b, c, cut, root])
    }

    #[test]
    fn root_follows_the_build() {
        let (tree, [a, _, _, _, root]) = sample_tree();
        assert_eq!(tree.root(), Some(root));
        assert_eq!(tree.node(a).parent(), Some(root));
        assert_eq!(tree.node(root).parent(), None);
        assert!(CsgTree::new().root().is_none());
    }

    #[test]
    fn descendants_are_preorder() {
        let (tree, [a, b, c, cut, root]) = sample_tree();
        let order: Vec<NodeId> = tree.descendants(root).collect();
        assert_eq!(order, vec![root, a, cut, b, c]);

        let brushes: Vec<NodeId> = tree.child_brushes(root).collect();
        assert_eq!(brushes, vec![a, b, c]);

        let up: Vec<NodeId> = tree.ancestors(b).collect();
        assert_eq!(up, vec![cut, root]);
    }

    #[test]
    fn world_translations_accumulate() {
        let (mut tree, [a, b, c, cut, root]) = sample_tree();
        tree.update_world_translations();

        assert_eq!(
            tree.node(root).world_translation(),
            Vector3::new(0.0, 1.0, 0.0)
        );
        assert_eq!(tree.node(a).world_translation(), Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(
            tree.node(cut).world_translation(),
            Vector3::new(2.0, 1.0, 0.0)
        );
        assert_eq!(tree.node(b).world_translation(), Vector3::new(2.0, 1.0, 0.0));
        assert_eq!(
            tree.node(c).world_translation(),
            Vector3::new(2.5, 1.0, 0.0)
        );
    }

    #[test]
    fn branch_bounds_union_translated_children() {
        let (mut tree, [a, b, c, cut, root]) = sample_tree();
        let unit = Aabb {
            min: Point3::new(-0.5, -0.5, -0.5),
            max: Point3::new(0.5, 0.5, 0.5),
        };
        tree.set_node_bounds(a, unit);
        tree.set_node_bounds(b, unit);
        tree.set_node_bounds(c, unit);

        tree.update_bounds();

        let cut_bounds = tree.node(cut).bounds();
        assert_eq!(cut_bounds.min, Point3::new(-0.5, -0.5, -0.5));
        assert_eq!(cut_bounds.max, Point3::new(1.0, 0.5, 0.5));

        let root_bounds = tree.node(root).bounds();
        assert_eq!(root_bounds.min, Point3::new(-0.5, -0.5, -0.5));
        assert_eq!(root_bounds.max, Point3::new(3.0, 0.5, 0.5));
    }

    #[test]
    fn contains_point_applies_the_operator() {
        let mut tree = CsgTree::new();
        let a = tree.add_brush(unit_brush(), Vector3::zeros());
        let b = tree.add_brush(unit_brush(), Vector3::new(0.5, 0.0, 0.0));
        let root = tree.add_branch(BooleanOp::Subtraction, a, b, Vector3::zeros());

        // Left of the cut survives, the overlap is removed.
        assert!(tree.contains_point(root, Point3::new(-0.25, 0.0, 0.0)));
        assert!(!tree.contains_point(root, Point3::new(0.25, 0.0, 0.0)));
        assert!(!tree.contains_point(root, Point3::new(0.75, 0.0, 0.0)));

        // Same leaves under the other operators.
        tree.node_mut(root).kind = NodeKind::Branch {
            op: BooleanOp::Union,
            left: a,
            right: b,
        };
        assert!(tree.contains_point(root, Point3::new(0.75, 0.0, 0.0)));
        assert!(!tree.contains_point(root, Point3::new(1.5, 0.0, 0.0)));

        tree.node_mut(root).kind = NodeKind::Branch {
            op: BooleanOp::Intersection,
            left: a,
            right: b,
        };
        assert!(tree.contains_point(root, Point3::new(0.25, 0.0, 0.0)));
        assert!(!tree.contains_point(root, Point3::new(-0.25, 0.0, 0.0)));
    }
}
