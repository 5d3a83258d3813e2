//! Axis-aligned bounding boxes, used for incremental-update pruning and as
//! a broadphase filter before polygon clipping.

use nalgebra::{Point3, Vector3};

use crate::plane::DISTANCE_EPSILON;

/// An axis-aligned bounding box in 3D.
///
/// A freshly created box is empty (inverted) and expands as points or other
/// boxes are added.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3<f32>,
    /// Maximum corner.
    pub max: Point3<f32>,
}

impl Aabb {
    /// Creates an empty (inverted) box suitable for expansion.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// Returns `true` if the box contains nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Resets the box to the empty state.
    pub fn clear(&mut self) {
        *self = Self::empty();
    }

    /// Expands the box to include a point.
    pub fn add_point(&mut self, p: Point3<f32>) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Expands the box to include another box.
    pub fn add_aabb(&mut self, other: &Aabb) {
        if other.is_empty() {
            return;
        }
        self.add_point(other.min);
        self.add_point(other.max);
    }

    /// Expands the box to include another box shifted by `offset`.
    pub fn add_aabb_translated(&mut self, other: &Aabb, offset: Vector3<f32>) {
        if other.is_empty() {
            return;
        }
        self.add_point(other.min + offset);
        self.add_point(other.max + offset);
    }

    /// Returns this box shifted by `offset`.
    pub fn translated(&self, offset: Vector3<f32>) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        Aabb {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Tests whether two boxes overlap. Touching counts as overlap, and the
    /// test is slack by the distance epsilon so that geometry within
    /// classification tolerance of a box is not pruned away.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.min.x <= other.max.x + DISTANCE_EPSILON
            && self.max.x >= other.min.x - DISTANCE_EPSILON
            && self.min.y <= other.max.y + DISTANCE_EPSILON
            && self.max.y >= other.min.y - DISTANCE_EPSILON
            && self.min.z <= other.max.z + DISTANCE_EPSILON
            && self.max.z >= other.min.z - DISTANCE_EPSILON
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}
