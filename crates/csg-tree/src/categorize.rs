//! Boolean categorization: evaluating tree nodes into meshes.
//!
//! A leaf evaluates to its brush's base polyhedron. A branch merges both
//! child meshes into one arena, clips each child's polygons against the
//! opposite child's composite plane set until every fragment lies in a
//! single cell of that plane arrangement, categorizes the fragments against
//! the opposite operand solid, and applies the operator's truth table to
//! decide which fragments stay visible. Nothing is physically deleted;
//! losing fragments are kept invisible so indices stay stable.

use std::borrow::Cow;
use std::ops::Range;

use nalgebra::{Point3, Vector3};

use crate::bounds::Aabb;
use crate::error::Result;
use crate::mesh::{
    CsgMesh, MeshIndex, PolygonCategory, PolygonSplitResult, VertexWeld, split_polygon,
};
use crate::plane::{DISTANCE_EPSILON, Plane};
use crate::tree::{BooleanOp, CsgTree, NodeId, NodeKind};
use crate::update::MeshLookup;

/// Probe distance for membership tests beside a coplanar fragment. Ten
/// classification epsilons: decisively clear of the on-plane band, still
/// small against any brush a caller can represent.
const PROBE_EPSILON: f32 = DISTANCE_EPSILON * 10.0;

/// Polygons with a smaller area vector count as degenerate.
const AREA_EPSILON: f32 = DISTANCE_EPSILON * DISTANCE_EPSILON;

/// Evaluates a node into its boundary mesh, in the node's local space.
///
/// Child meshes are read from `meshes` when present and evaluated
/// recursively otherwise, so a cold cache still produces a full result.
pub fn evaluate_node(tree: &CsgTree, id: NodeId, meshes: &impl MeshLookup) -> Result<CsgMesh> {
    match tree.node(id).kind() {
        NodeKind::Brush(brush) => brush.base_mesh(),
        NodeKind::Branch { op, left, right } => {
            let left_mesh = lookup_or_evaluate(tree, *left, meshes)?;
            let right_mesh = lookup_or_evaluate(tree, *right, meshes)?;
            evaluate_branch(tree, *op, *left, &left_mesh, *right, &right_mesh)
        }
    }
}

fn lookup_or_evaluate<'a>(
    tree: &CsgTree,
    id: NodeId,
    meshes: &'a impl MeshLookup,
) -> Result<Cow<'a, CsgMesh>> {
    match meshes.mesh(id) {
        Some(mesh) => Ok(Cow::Borrowed(mesh)),
        None => Ok(Cow::Owned(evaluate_node(tree, id, meshes)?)),
    }
}

fn evaluate_branch(
    tree: &CsgTree,
    op: BooleanOp,
    left: NodeId,
    left_mesh: &CsgMesh,
    right: NodeId,
    right_mesh: &CsgMesh,
) -> Result<CsgMesh> {
    let left_offset = tree.node(left).local_translation();
    let right_offset = tree.node(right).local_translation();

    let mut mesh = CsgMesh::new();
    let mut weld = VertexWeld::new();
    let left_range = mesh.append_translated(left_mesh, left_offset, &mut weld)?;
    let right_range = mesh.append_translated(right_mesh, right_offset, &mut weld)?;

    let left_bounds = left_mesh.bounds().translated(left_offset);
    let right_bounds = right_mesh.bounds().translated(right_offset);

    let (left_fragments, right_fragments) = if left_bounds.overlaps(&right_bounds) {
        let left_planes = composite_planes(tree, left, left_offset);
        let right_planes = composite_planes(tree, right, right_offset);
        (
            clip_and_categorize(
                &mut mesh,
                tree,
                left_range,
                &right_planes,
                &right_bounds,
                right,
                right_offset,
                &mut weld,
            )?,
            clip_and_categorize(
                &mut mesh,
                tree,
                right_range,
                &left_planes,
                &left_bounds,
                left,
                left_offset,
                &mut weld,
            )?,
        )
    } else {
        // Disjoint operands: nothing to clip, everything is outside.
        let outside = |range: Range<usize>| {
            range
                .map(|i| (i as MeshIndex, PolygonCategory::Outside))
                .collect::<Vec<_>>()
        };
        (outside(left_range), outside(right_range))
    };

    for (polygon, category) in left_fragments {
        resolve_fragment(&mut mesh, op, polygon, category, true)?;
    }
    for (polygon, category) in right_fragments {
        resolve_fragment(&mut mesh, op, polygon, category, false)?;
    }

    mesh.update_bounds();
    Ok(mesh)
}

/// Collects the operand subtree's brush planes, translated into the space
/// the meshes were appended in, deduplicated by plane equality.
fn composite_planes(tree: &CsgTree, id: NodeId, offset: Vector3<f32>) -> Vec<Plane> {
    let mut planes: Vec<Plane> = Vec::new();
    let mut stack = vec![(id, offset)];
    while let Some((node, offset)) = stack.pop() {
        match tree.node(node).kind() {
            NodeKind::Brush(brush) => {
                for plane in brush.planes() {
                    let moved = plane.translated(offset);
                    if !planes.iter().any(|p| p.approx_eq(&moved)) {
                        planes.push(moved);
                    }
                }
            }
            NodeKind::Branch { left, right, .. } => {
                stack.push((*left, offset + tree.node(*left).local_translation()));
                stack.push((*right, offset + tree.node(*right).local_translation()));
            }
        }
    }
    planes
}

/// Splits one child's polygons against the operand's plane set and
/// categorizes every resulting fragment against the operand solid.
///
/// Fragments whose bounds miss the operand's bounds are categorized
/// `Outside` without touching any plane. Splits share the branch's weld
/// lookup, so cut seams reuse vertices the other child already placed.
#[allow(clippy::too_many_arguments)]
fn clip_and_categorize(
    mesh: &mut CsgMesh,
    tree: &CsgTree,
    seed: Range<usize>,
    operand_planes: &[Plane],
    operand_bounds: &Aabb,
    operand: NodeId,
    operand_offset: Vector3<f32>,
    weld: &mut VertexWeld,
) -> Result<Vec<(MeshIndex, PolygonCategory)>> {
    // (fragment, first plane still to clip against, fragment was coplanar
    // with some operand plane)
    let mut pending: Vec<(MeshIndex, usize, bool)> =
        seed.map(|i| (i as MeshIndex, 0, false)).collect();
    let mut out = Vec::new();

    while let Some((polygon, start, mut coplanar)) = pending.pop() {
        if !mesh.polygon(polygon).bounds.overlaps(operand_bounds) {
            out.push((polygon, PolygonCategory::Outside));
            continue;
        }
        for i in start..operand_planes.len() {
            match split_polygon(mesh, polygon, &operand_planes[i], weld)? {
                (PolygonSplitResult::Split, Some(outside)) => {
                    // The outside half finishes the remaining planes on its
                    // own; the inside half continues in this loop.
                    pending.push((outside, i + 1, coplanar));
                }
                (PolygonSplitResult::PlaneAligned, _)
                | (PolygonSplitResult::PlaneOppositeAligned, _) => coplanar = true,
                _ => {}
            }
        }
        let category = fragment_category(mesh, tree, polygon, coplanar, operand, operand_offset);
        out.push((polygon, category));
    }
    Ok(out)
}

/// Categorizes one fully clipped fragment against the operand solid.
///
/// A fragment that was coplanar with an operand plane probes membership
/// just behind and just ahead of its supporting plane: solid behind and
/// empty ahead means the fragment coincides with the operand's boundary
/// facing the same way (`Aligned`), the reverse means it faces into the
/// operand (`ReverseAligned`). Any other fragment lies strictly in one
/// cell, so its centroid decides.
fn fragment_category(
    mesh: &CsgMesh,
    tree: &CsgTree,
    polygon: MeshIndex,
    coplanar: bool,
    operand: NodeId,
    operand_offset: Vector3<f32>,
) -> PolygonCategory {
    let centroid = mesh.polygon_centroid(polygon);
    let solid = |p: Point3<f32>| tree.contains_point(operand, p - operand_offset);
    if coplanar {
        let normal = mesh.plane(mesh.polygon(polygon).plane).normal();
        let behind = solid(centroid - normal * PROBE_EPSILON);
        let ahead = solid(centroid + normal * PROBE_EPSILON);
        match (behind, ahead) {
            (true, false) => PolygonCategory::Aligned,
            (false, true) => PolygonCategory::ReverseAligned,
            (true, true) => PolygonCategory::Inside,
            (false, false) => PolygonCategory::Outside,
        }
    } else if solid(centroid) {
        PolygonCategory::Inside
    } else {
        PolygonCategory::Outside
    }
}

/// Records a fragment's category and applies the operator's truth table.
/// Surviving right-side fragments of a subtraction become the cut surface
/// and get their winding reversed. A fragment already invisible in the
/// child mesh stays invisible, whatever the table says.
fn resolve_fragment(
    mesh: &mut CsgMesh,
    op: BooleanOp,
    polygon: MeshIndex,
    category: PolygonCategory,
    is_left: bool,
) -> Result<()> {
    let degenerate = mesh.polygon_area_vector(polygon).norm() <= AREA_EPSILON;
    let visible = mesh.polygons[polygon as usize].visible
        && !degenerate
        && fragment_survives(op, category, is_left);
    mesh.polygons[polygon as usize].category = category;
    mesh.polygons[polygon as usize].visible = visible;
    if visible && op == BooleanOp::Subtraction && !is_left {
        mesh.reverse_polygon(polygon)?;
    }
    Ok(())
}

/// The per-operator truth table. Coplanar geometry survives once, on the
/// left side.
fn fragment_survives(op: BooleanOp, category: PolygonCategory, is_left: bool) -> bool {
    use PolygonCategory::*;
    match (op, is_left) {
        (BooleanOp::Union, true) => matches!(category, Outside | Aligned),
        (BooleanOp::Union, false) => category == Outside,
        (BooleanOp::Intersection, true) => matches!(category, Inside | Aligned),
        (BooleanOp::Intersection, false) => category == Inside,
        (BooleanOp::Subtraction, true) => matches!(category, Outside | ReverseAligned),
        (BooleanOp::Subtraction, false) => category == Inside,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brush::Brush;
    use crate::update::MeshCache;
    use approx::assert_relative_eq;

    fn two_cubes(op: BooleanOp, offset: Vector3<f32>) -> (CsgTree, NodeId) {
        let mut tree = CsgTree::new();
        let half = Vector3::new(0.5, 0.5, 0.5);
        let a = tree.add_brush(Brush::cuboid(half), Vector3::zeros());
        let b = tree.add_brush(Brush::cuboid(half), offset);
        let root = tree.add_branch(op, a, b, Vector3::zeros());
        (tree, root)
    }

    fn evaluate(tree: &CsgTree, root: NodeId) -> CsgMesh {
        evaluate_node(tree, root, &MeshCache::new()).unwrap()
    }

    fn assert_involution(mesh: &CsgMesh) {
        for (i, edge) in mesh.edges().iter().enumerate() {
            assert_eq!(mesh.edge(edge.twin).twin as usize, i);
        }
    }

    /// Every visible polygon must lie on the evaluated solid's boundary:
    /// solid just behind its plane, empty just ahead.
    fn assert_visible_is_boundary(tree: &CsgTree, root: NodeId, mesh: &CsgMesh) {
        for i in 0..mesh.polygons().len() as MeshIndex {
            if !mesh.polygon(i).visible {
                continue;
            }
            let centroid = mesh.polygon_centroid(i);
            let normal = mesh.plane(mesh.polygon(i).plane).normal();
            assert!(
                tree.contains_point(root, centroid - normal * PROBE_EPSILON),
                "polygon {i} has empty space behind it"
            );
            assert!(
                !tree.contains_point(root, centroid + normal * PROBE_EPSILON),
                "polygon {i} has solid ahead of it"
            );
        }
    }

    #[test]
    fn self_union_is_the_identity() {
        let (tree, root) = two_cubes(BooleanOp::Union, Vector3::zeros());
        let mesh = evaluate(&tree, root);

        // Same surface as a single cube; the duplicate stays invisible.
        assert_eq!(mesh.vertices().len(), 8);
        assert_eq!(mesh.visible_polygon_count(), 6);
        assert_eq!(mesh.polygons().len(), 12);
        assert_involution(&mesh);
        assert_visible_is_boundary(&tree, root, &mesh);
    }

    #[test]
    fn self_subtraction_is_empty() {
        let (tree, root) = two_cubes(BooleanOp::Subtraction, Vector3::zeros());
        let mesh = evaluate(&tree, root);

        assert_eq!(mesh.visible_polygon_count(), 0);
        assert_involution(&mesh);
    }

    #[test]
    fn disjoint_union_keeps_both_shells() {
        let (tree, root) = two_cubes(BooleanOp::Union, Vector3::new(4.0, 0.0, 0.0));
        let mesh = evaluate(&tree, root);

        assert_eq!(mesh.vertices().len(), 16);
        assert_eq!(mesh.visible_polygon_count(), 12);
        assert_involution(&mesh);
        assert_visible_is_boundary(&tree, root, &mesh);
    }

    #[test]
    fn disjoint_intersection_is_empty() {
        let (tree, root) = two_cubes(BooleanOp::Intersection, Vector3::new(4.0, 0.0, 0.0));
        let mesh = evaluate(&tree, root);
        assert_eq!(mesh.visible_polygon_count(), 0);
    }

    #[test]
    fn overlapping_union_has_one_outer_shell() {
        let (tree, root) = two_cubes(BooleanOp::Union, Vector3::new(0.5, 0.0, 0.0));
        let mesh = evaluate(&tree, root);

        // Every visible polygon faces outward from the merged solid, so
        // there are no internal faces.
        assert_visible_is_boundary(&tree, root, &mesh);
        assert_involution(&mesh);

        let bounds = mesh.visible_bounds();
        assert_relative_eq!(bounds.min.x, -0.5, epsilon = 1e-5);
        assert_relative_eq!(bounds.max.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(bounds.max.y, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn overlapping_intersection_is_the_shared_box() {
        let (tree, root) = two_cubes(BooleanOp::Intersection, Vector3::new(0.5, 0.0, 0.0));
        let mesh = evaluate(&tree, root);

        // A 0.5 x 1 x 1 box: six visible faces, one copy of each coplanar
        // pair.
        assert_eq!(mesh.visible_polygon_count(), 6);
        assert_involution(&mesh);
        assert_visible_is_boundary(&tree, root, &mesh);

        let bounds = mesh.visible_bounds();
        assert_relative_eq!(bounds.min.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(bounds.max.x, 0.5, epsilon = 1e-5);
        assert_relative_eq!(bounds.min.y, -0.5, epsilon = 1e-5);
        assert_relative_eq!(bounds.max.z, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn clipping_welds_seam_vertices() {
        let (tree, root) = two_cubes(BooleanOp::Intersection, Vector3::new(0.5, 0.0, 0.0));
        let mesh = evaluate(&tree, root);

        // Both shells get cut along x = 0 and x = 0.5; the crossing points
        // land on corners the other shell already stored, so no position
        // appears twice in the arena.
        let mut seen = std::collections::HashSet::new();
        for v in mesh.vertices() {
            assert!(
                seen.insert([v.x.to_bits(), v.y.to_bits(), v.z.to_bits()]),
                "vertex {v} is stored twice"
            );
        }
        assert_eq!(mesh.vertices().len(), 16);
    }

    #[test]
    fn single_axis_subtraction_is_a_closed_slab() {
        let (tree, root) = two_cubes(BooleanOp::Subtraction, Vector3::new(0.5, 0.0, 0.0));
        let mesh = evaluate(&tree, root);

        // Cutting half the cube away leaves a convex slab; the reversed
        // right-side fragment caps it.
        assert_eq!(mesh.visible_polygon_count(), 6);
        assert_involution(&mesh);
        assert_visible_is_boundary(&tree, root, &mesh);

        let bounds = mesh.visible_bounds();
        assert_relative_eq!(bounds.min.x, -0.5, epsilon = 1e-5);
        assert_relative_eq!(bounds.max.x, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn two_axis_subtraction_is_an_l_shape() {
        let (tree, root) = two_cubes(BooleanOp::Subtraction, Vector3::new(0.5, 0.5, 0.0));
        let mesh = evaluate(&tree, root);

        assert!(
            mesh.visible_polygon_count() > 6,
            "a non-convex solid needs more faces than a box, got {}",
            mesh.visible_polygon_count()
        );
        assert_involution(&mesh);
        assert_visible_is_boundary(&tree, root, &mesh);

        // The notch is gone, the rest of the cube remains.
        assert!(!tree.contains_point(root, Point3::new(0.25, 0.25, 0.0)));
        assert!(tree.contains_point(root, Point3::new(0.25, -0.25, 0.0)));
        assert!(tree.contains_point(root, Point3::new(-0.25, 0.25, 0.0)));
    }

    #[test]
    fn re_evaluation_is_idempotent() {
        let (tree, root) = two_cubes(BooleanOp::Subtraction, Vector3::new(0.5, 0.5, 0.0));
        let first = evaluate(&tree, root);
        let second = evaluate(&tree, root);
        assert_eq!(first, second);
    }

    #[test]
    fn nested_tree_evaluates_through_branches() {
        // (A - B) union C, with C off to the side.
        let mut tree = CsgTree::new();
        let half = Vector3::new(0.5, 0.5, 0.5);
        let a = tree.add_brush(Brush::cuboid(half), Vector3::zeros());
        let b = tree.add_brush(Brush::cuboid(half), Vector3::new(0.5, 0.5, 0.0));
        let cut = tree.add_branch(BooleanOp::Subtraction, a, b, Vector3::zeros());
        let c = tree.add_brush(Brush::cuboid(half), Vector3::new(4.0, 0.0, 0.0));
        let root = tree.add_branch(BooleanOp::Union, cut, c, Vector3::zeros());

        let mesh = evaluate(&tree, root);
        assert_involution(&mesh);
        assert_visible_is_boundary(&tree, root, &mesh);
        // The L-shape and the free cube both contribute their shells.
        assert!(mesh.visible_polygon_count() > 12);
    }
}
