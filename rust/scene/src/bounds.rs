// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounding volumes and the geometry query seam.

use std::collections::BTreeSet;
use std::fmt;

use bimtodo_core::{AnnotationId, ElementIndex, RuntimeId};
use nalgebra::Point3;

/// Axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point, or `None` for no points.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bounds = Self::new(first, first);
        for p in iter {
            bounds.expand(p);
        }
        Some(bounds)
    }

    /// Expand bounds to include a point
    #[inline]
    pub fn expand(&mut self, p: &Point3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Smallest box containing both
    #[inline]
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::new(self.min.inf(&other.min), self.max.sup(&other.max))
    }

    /// Center of the box
    #[inline]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }
}

/// Geometry queries against loaded models.
pub trait GeometrySource {
    /// World-space bounds of one element of `model`, or `None` when the model
    /// no longer has that element.
    fn element_bounds(&self, model: &RuntimeId, element: ElementIndex) -> Option<Aabb>;
}

/// An element group that could not be resolved against the loaded geometry.
/// Skipped, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleGeometryWarning {
    pub annotation: AnnotationId,
    /// Position of the group inside the annotation's group list.
    pub group: usize,
    /// Elements with no geometry. Empty when the group itself was empty.
    pub missing: Vec<ElementIndex>,
}

impl fmt::Display for StaleGeometryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.missing.is_empty() {
            write!(f, "annotation {} group {} has no elements", self.annotation, self.group)
        } else {
            write!(
                f,
                "annotation {} group {} references {} element(s) missing from the loaded geometry",
                self.annotation,
                self.group,
                self.missing.len()
            )
        }
    }
}

/// Union of the bounds of every element in `group`.
///
/// Fails if the group is empty or any element is unknown to `geometry`.
pub fn group_bounds<G: GeometrySource + ?Sized>(
    geometry: &G,
    model: &RuntimeId,
    annotation: AnnotationId,
    group_index: usize,
    group: &BTreeSet<ElementIndex>,
) -> Result<Aabb, StaleGeometryWarning> {
    let mut bounds: Option<Aabb> = None;
    let mut missing = Vec::new();

    for &element in group {
        match geometry.element_bounds(model, element) {
            Some(b) => bounds = Some(bounds.map_or(b, |acc| acc.union(&b))),
            None => missing.push(element),
        }
    }

    match bounds {
        Some(b) if missing.is_empty() => Ok(b),
        _ => Err(StaleGeometryWarning {
            annotation,
            group: group_index,
            missing,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rustc_hash::FxHashMap;

    struct Boxes(FxHashMap<u32, Aabb>);

    impl GeometrySource for Boxes {
        fn element_bounds(&self, _model: &RuntimeId, element: ElementIndex) -> Option<Aabb> {
            self.0.get(&element.0).copied()
        }
    }

    fn unit_box_at(x: f64) -> Aabb {
        Aabb::new(Point3::new(x, 0.0, 0.0), Point3::new(x + 1.0, 1.0, 1.0))
    }

    #[test]
    fn from_points_and_center() {
        let pts = [Point3::new(-1.0, 0.0, 2.0), Point3::new(3.0, 4.0, -2.0)];
        let b = Aabb::from_points(&pts).unwrap();
        assert_eq!(b.min, Point3::new(-1.0, 0.0, -2.0));
        assert_eq!(b.max, Point3::new(3.0, 4.0, 2.0));
        assert_relative_eq!(b.center().x, 1.0);
        assert!(Aabb::from_points(&[]).is_none());
    }

    #[test]
    fn group_bounds_unions_elements() {
        let geometry = Boxes(FxHashMap::from_iter([(1, unit_box_at(0.0)), (2, unit_box_at(4.0))]));
        let group = BTreeSet::from([ElementIndex(1), ElementIndex(2)]);
        let b = group_bounds(&geometry, &RuntimeId::from("m"), AnnotationId(1), 0, &group).unwrap();
        assert_relative_eq!(b.center().x, 2.5);
    }

    #[test]
    fn group_bounds_reports_missing_elements() {
        let geometry = Boxes(FxHashMap::from_iter([(1, unit_box_at(0.0))]));
        let group = BTreeSet::from([ElementIndex(1), ElementIndex(9)]);
        let warning =
            group_bounds(&geometry, &RuntimeId::from("m"), AnnotationId(4), 2, &group).unwrap_err();
        assert_eq!(warning.missing, vec![ElementIndex(9)]);
        assert_eq!(warning.group, 2);

        let none = BTreeSet::new();
        let empty =
            group_bounds(&geometry, &RuntimeId::from("m"), AnnotationId(4), 0, &none).unwrap_err();
        assert!(empty.missing.is_empty());
    }
}
