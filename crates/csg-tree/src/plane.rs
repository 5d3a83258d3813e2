//! Plane representation and point classification for brush-based CSG.

use nalgebra::{Point3, Vector3};

/// Distance tolerance for point/plane classification and vertex snapping.
/// Points within this distance of a plane are considered "on" the plane.
pub const DISTANCE_EPSILON: f32 = 1e-4;

/// Alignment tolerance for comparing unit normals.
/// Two normals are parallel when their dot product is within this of ±1.
pub const NORMAL_EPSILON: f32 = 1.0 / 65535.0;

/// Which side of a plane a point lies on.
///
/// Brush planes face outward, so the negative half-space is the solid
/// interior and the positive half-space is empty space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneSide {
    /// Point is on the negative side of the plane (the solid interior).
    Inside,
    /// Point is on the positive side of the plane (empty space).
    Outside,
    /// Point lies on the plane (within the distance epsilon).
    Intersects,
}

/// A plane in 3D space, represented as `normal · point = offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    normal: Vector3<f32>,
    offset: f32,
}

impl Plane {
    /// Creates a new plane from a normal vector and offset.
    /// The normal will be normalized automatically.
    ///
    /// # Panics
    /// Panics if the normal vector has zero length.
    pub fn new(normal: Vector3<f32>, offset: f32) -> Self {
        let norm = normal.norm();
        assert!(norm > f32::EPSILON, "Plane normal cannot be zero");
        Self {
            normal: normal / norm,
            offset: offset / norm,
        }
    }

    /// Creates a plane from a point on the plane and a normal vector.
    /// The normal will be normalized automatically.
    ///
    /// # Panics
    /// Panics if the normal vector has zero length.
    pub fn from_point_and_normal(point: Point3<f32>, normal: Vector3<f32>) -> Self {
        let norm = normal.norm();
        assert!(norm > f32::EPSILON, "Plane normal cannot be zero");
        let unit_normal = normal / norm;
        let offset = unit_normal.dot(&point.coords);
        Self {
            normal: unit_normal,
            offset,
        }
    }

    /// Returns the unit normal vector of the plane.
    #[inline]
    pub fn normal(&self) -> Vector3<f32> {
        self.normal
    }

    /// Returns the signed distance from the origin to the plane along the normal.
    #[inline]
    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// Computes the signed distance from a point to the plane.
    /// - Positive: point is outside (same side as the normal)
    /// - Negative: point is inside (opposite side from the normal)
    /// - Zero: point is on the plane
    #[inline]
    pub fn signed_distance(&self, point: Point3<f32>) -> f32 {
        self.normal.dot(&point.coords) - self.offset
    }

    /// Classifies which side of the plane a point lies on.
    ///
    /// A point at exactly [`DISTANCE_EPSILON`] from the plane still
    /// classifies as [`PlaneSide::Intersects`]; only a strictly larger
    /// distance is `Inside` or `Outside`.
    pub fn classify_point(&self, point: Point3<f32>) -> PlaneSide {
        let dist = self.signed_distance(point);
        if dist > DISTANCE_EPSILON {
            PlaneSide::Outside
        } else if dist < -DISTANCE_EPSILON {
            PlaneSide::Inside
        } else {
            PlaneSide::Intersects
        }
    }

    /// Tests whether two planes are equal within tolerance: normals aligned
    /// within [`NORMAL_EPSILON`] and offsets within [`DISTANCE_EPSILON`].
    pub fn approx_eq(&self, other: &Plane) -> bool {
        self.normal.dot(&other.normal) > 1.0 - NORMAL_EPSILON
            && (self.offset - other.offset).abs() < DISTANCE_EPSILON
    }

    /// Returns a new plane with the normal flipped (facing the opposite direction).
    #[inline]
    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            offset: -self.offset,
        }
    }

    /// Returns this plane carried along a rigid translation of the solid it
    /// bounds: the normal is unchanged and the offset shifts by `normal · t`.
    #[inline]
    pub fn translated(&self, t: Vector3<f32>) -> Self {
        Self {
            normal: self.normal,
            offset: self.offset + self.normal.dot(&t),
        }
    }

    /// Computes the intersection of a line segment with the plane.
    ///
    /// Returns `Some((t, point))` where `t` is the interpolation parameter
    /// (0.0 = start, 1.0 = end) and `point` the intersection point, or
    /// `None` if the segment is parallel to the plane or does not cross it.
    pub fn intersect_segment(
        &self,
        start: Point3<f32>,
        end: Point3<f32>,
    ) -> Option<(f32, Point3<f32>)> {
        let direction = end - start;
        let denom = self.normal.dot(&direction);

        // Segment is parallel to plane
        if denom.abs() < f32::EPSILON {
            return None;
        }

        let t = (self.offset - self.normal.dot(&start.coords)) / denom;
        if !(0.0..=1.0).contains(&t) {
            return None;
        }

        Some((t, start + direction * t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn classify_point_sides() {
        let plane = Plane::new(Vector3::new(1.0, 0.0, 0.0), 0.0);

        assert_eq!(
            plane.classify_point(Point3::new(1.0, 0.0, 0.0)),
            PlaneSide::Outside
        );
        assert_eq!(
            plane.classify_point(Point3::new(-1.0, 0.0, 0.0)),
            PlaneSide::Inside
        );
        assert_eq!(
            plane.classify_point(Point3::new(0.0, 5.0, -3.0)),
            PlaneSide::Intersects
        );
    }

    #[test]
    fn classify_point_epsilon_boundary() {
        let plane = Plane::new(Vector3::new(1.0, 0.0, 0.0), 0.0);

        // Exactly at the epsilon: still on the plane.
        assert_eq!(
            plane.classify_point(Point3::new(DISTANCE_EPSILON, 0.0, 0.0)),
            PlaneSide::Intersects
        );
        assert_eq!(
            plane.classify_point(Point3::new(-DISTANCE_EPSILON, 0.0, 0.0)),
            PlaneSide::Intersects
        );

        // Just past the epsilon: strictly sided.
        assert_eq!(
            plane.classify_point(Point3::new(DISTANCE_EPSILON * 1.01, 0.0, 0.0)),
            PlaneSide::Outside
        );
        assert_eq!(
            plane.classify_point(Point3::new(-DISTANCE_EPSILON * 1.01, 0.0, 0.0)),
            PlaneSide::Inside
        );
    }

    #[test]
    fn normalizes_on_construction() {
        let plane = Plane::new(Vector3::new(0.0, 3.0, 0.0), 6.0);
        assert_relative_eq!(plane.normal().norm(), 1.0);
        assert_relative_eq!(plane.offset(), 2.0);
    }

    #[test]
    fn approx_eq_tolerances() {
        let a = Plane::new(Vector3::new(0.0, 0.0, 1.0), 1.0);
        let b = Plane::new(Vector3::new(0.0, 0.0, 1.0), 1.0 + DISTANCE_EPSILON * 0.5);
        let c = Plane::new(Vector3::new(0.0, 0.0, 1.0), 1.5);
        let d = a.flipped();

        assert!(a.approx_eq(&b));
        assert!(!a.approx_eq(&c));
        assert!(!a.approx_eq(&d));
    }

    #[test]
    fn translated_shifts_offset() {
        let plane = Plane::new(Vector3::new(1.0, 0.0, 0.0), 0.5);
        let moved = plane.translated(Vector3::new(2.0, 7.0, -1.0));

        assert_relative_eq!(moved.offset(), 2.5);
        assert_eq!(moved.normal(), plane.normal());
    }

    #[test]
    fn intersect_segment_crossing() {
        let plane = Plane::new(Vector3::new(1.0, 0.0, 0.0), 0.0);
        let (t, point) = plane
            .intersect_segment(Point3::new(-1.0, 0.0, 0.0), Point3::new(3.0, 4.0, 0.0))
            .unwrap();

        assert_relative_eq!(t, 0.25);
        assert_relative_eq!(point.x, 0.0);
        assert_relative_eq!(point.y, 1.0);
    }

    #[test]
    fn intersect_segment_parallel_or_short() {
        let plane = Plane::new(Vector3::new(0.0, 1.0, 0.0), 0.0);

        assert!(plane
            .intersect_segment(Point3::new(0.0, 1.0, 0.0), Point3::new(1.0, 1.0, 0.0))
            .is_none());
        assert!(plane
            .intersect_segment(Point3::new(0.0, 1.0, 0.0), Point3::new(0.0, 2.0, 0.0))
            .is_none());
    }
}
