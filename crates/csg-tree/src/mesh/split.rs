//! Plane-based polygon splitting inside a half-edge mesh.

use crate::error::Result;
use crate::plane::{DISTANCE_EPSILON, Plane, PlaneSide};

use super::half_edge::{HalfEdge, MeshIndex};
use super::mesh::{CsgMesh, VertexWeld};
use super::polygon::Polygon;

/// Outcome of cutting one polygon with one plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonSplitResult {
    /// Polygon is completely inside the half-space defined by the plane.
    CompletelyInside,
    /// Polygon is completely outside the half-space defined by the plane.
    CompletelyOutside,
    /// Polygon has been split into an inside half and an outside half.
    Split,
    /// Polygon is coplanar with the cutting plane, its normal pointing the
    /// same way as the plane's.
    PlaneAligned,
    /// Polygon is coplanar with the cutting plane, its normal pointing the
    /// opposite way.
    PlaneOppositeAligned,
}

/// Cuts one polygon against one plane.
///
/// A loop that is entirely on the plane is classified `PlaneAligned` or
/// `PlaneOppositeAligned` by its normal and left uncut. A loop entirely on
/// one side (on-plane vertices included) is `CompletelyInside` or
/// `CompletelyOutside`. Otherwise the convex loop crosses the plane exactly
/// twice: crossing vertices are inserted on the straddling edges (the edge
/// and its twin are both split, keeping neighbour loops closed), except that
/// an intersection within [`DISTANCE_EPSILON`] of an existing endpoint
/// snaps to that endpoint instead of minting a near-zero-length edge. A new
/// mutually-twin edge pair then bridges the two crossing vertices. Crossing
/// vertices go through `weld`, so cutting two shells along the same seam
/// stores each seam vertex once.
///
/// Returns the classification and, for `Split`, the index of the appended
/// polygon holding the outside half; the original polygon keeps the inside
/// half. Both halves keep the source polygon's supporting plane, category
/// and visibility; the cutting plane is registered in the mesh's plane set.
pub fn split_polygon(
    mesh: &mut CsgMesh,
    polygon: MeshIndex,
    cut: &Plane,
    weld: &mut VertexWeld,
) -> Result<(PolygonSplitResult, Option<MeshIndex>)> {
    let mut loop_edges: Vec<MeshIndex> = mesh.polygon_edges(polygon).collect();
    let mut sides: Vec<PlaneSide> = loop_edges
        .iter()
        .map(|&e| cut.classify_point(mesh.vertex(mesh.edge(e).vertex)))
        .collect();

    let inside = sides.iter().filter(|s| **s == PlaneSide::Inside).count();
    let outside = sides.iter().filter(|s| **s == PlaneSide::Outside).count();

    // An all-on-plane loop is the coplanar case; it must be recognised
    // before the one-sided checks, which would both match it.
    if inside == 0 && outside == 0 {
        let own = mesh.plane(mesh.polygon(polygon).plane);
        let result = if own.normal().dot(&cut.normal()) > 0.0 {
            PolygonSplitResult::PlaneAligned
        } else {
            PolygonSplitResult::PlaneOppositeAligned
        };
        return Ok((result, None));
    }
    if outside == 0 {
        return Ok((PolygonSplitResult::CompletelyInside, None));
    }
    if inside == 0 {
        return Ok((PolygonSplitResult::CompletelyOutside, None));
    }

    // Insert a crossing vertex on every strictly straddling edge, snapping
    // to an endpoint when the intersection lands within the epsilon of one.
    let mut i = 0;
    while i < loop_edges.len() {
        let len = loop_edges.len();
        let prev = (i + len - 1) % len;
        let straddles = matches!(
            (sides[prev], sides[i]),
            (PlaneSide::Inside, PlaneSide::Outside) | (PlaneSide::Outside, PlaneSide::Inside)
        );
        if straddles {
            let e = loop_edges[i];
            let tail = mesh.vertex(mesh.edge(loop_edges[prev]).vertex);
            let head = mesh.vertex(mesh.edge(e).vertex);
            if let Some((_, point)) = cut.intersect_segment(tail, head) {
                if (point - tail).norm() <= DISTANCE_EPSILON {
                    sides[prev] = PlaneSide::Intersects;
                } else if (point - head).norm() <= DISTANCE_EPSILON {
                    sides[i] = PlaneSide::Intersects;
                } else {
                    let continuation = mesh.split_edge(e, point, weld)?;
                    loop_edges.insert(i + 1, continuation);
                    sides.insert(i + 1, sides[i]);
                    sides[i] = PlaneSide::Intersects;
                    i += 1;
                }
            }
        }
        i += 1;
    }

    // Snapping may have pulled the whole loop onto one side.
    let outside = sides.iter().filter(|s| **s == PlaneSide::Outside).count();
    let inside = sides.iter().filter(|s| **s == PlaneSide::Inside).count();
    if outside == 0 {
        return Ok((PolygonSplitResult::CompletelyInside, None));
    }
    if inside == 0 {
        return Ok((PolygonSplitResult::CompletelyOutside, None));
    }

    // The outside heads now form one run bounded by two on-plane vertices.
    let len = loop_edges.len();
    let Some(run) = sides.iter().position(|s| *s == PlaneSide::Outside) else {
        return Ok((PolygonSplitResult::CompletelyInside, None));
    };
    let mut a = run;
    while sides[(a + len - 1) % len] == PlaneSide::Outside {
        a = (a + len - 1) % len;
    }
    let a = (a + len - 1) % len;
    let mut b = run;
    while sides[(b + 1) % len] == PlaneSide::Outside {
        b = (b + 1) % len;
    }
    let b = (b + 1) % len;
    debug_assert_eq!(sides[a], PlaneSide::Intersects);
    debug_assert_eq!(sides[b], PlaneSide::Intersects);

    let edge_a = loop_edges[a];
    let edge_b = loop_edges[b];
    let x1 = mesh.edge(edge_a).vertex;
    let x2 = mesh.edge(edge_b).vertex;
    let after_a = mesh.edge(edge_a).next;
    let after_b = mesh.edge(edge_b).next;

    // The outside half becomes a fresh polygon; the inside half keeps the
    // original slot. A mutually-twin bridge pair closes both loops.
    let outside_polygon = mesh.add_polygon(Polygon {
        first_edge: 0,
        ..*mesh.polygon(polygon)
    })?;
    let bridge_out = mesh.add_edge(HalfEdge {
        vertex: x1,
        next: after_a,
        twin: 0,
        polygon: outside_polygon,
    })?;
    let bridge_in = mesh.add_edge(HalfEdge {
        vertex: x2,
        next: after_b,
        twin: bridge_out,
        polygon,
    })?;
    mesh.edges[bridge_out as usize].twin = bridge_in;
    mesh.edges[edge_b as usize].next = bridge_out;
    mesh.edges[edge_a as usize].next = bridge_in;
    mesh.polygons[polygon as usize].first_edge = bridge_in;
    mesh.polygons[outside_polygon as usize].first_edge = bridge_out;

    // Hand the outside arc over to the new polygon.
    let mut e = after_a;
    let mut guard = mesh.edges.len();
    loop {
        mesh.edges[e as usize].polygon = outside_polygon;
        if e == edge_b || guard == 0 {
            break;
        }
        guard -= 1;
        e = mesh.edges[e as usize].next;
    }

    // Register the cutting plane so the shared cut stays identifiable; both
    // halves keep the source polygon's supporting plane.
    mesh.find_or_add_plane(*cut)?;

    mesh.update_polygon_bounds(polygon);
    mesh.update_polygon_bounds(outside_polygon);
    Ok((PolygonSplitResult::Split, Some(outside_polygon)))
}
