// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Deduplicated annotation markers.
//!
//! Each element group of an annotation gets an anchor at the center of its
//! bounding box. Anchor positions are quantized to [`QUANTIZE_DECIMALS`]
//! decimals per axis, so repeated geometry queries that jitter in the last
//! bits land on the same anchor. An anchor hit more than once shows a count
//! label next to its icon; the newest hit replaces the label.

use std::collections::BTreeMap;
use std::fmt;

use bimtodo_core::{AnnotationId, AnnotationRecord, RuntimeId, SelectionSet};
use nalgebra::{Point3, Vector3};

use crate::bounds::{group_bounds, GeometrySource, StaleGeometryWarning};

/// Decimal places kept per axis when merging anchors.
pub const QUANTIZE_DECIMALS: i32 = 2;

/// Icon drawn at every anchor.
pub const ANCHOR_ICON: &str = "🚀";

/// Id of a marker drawn by the scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarkerId(pub String);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where markers are drawn.
pub trait MarkerSurface {
    fn create_marker(&mut self, text: &str, position: Point3<f64>) -> MarkerId;
    fn delete_marker(&mut self, id: &MarkerId);
}

/// Anchor position rounded to [`QUANTIZE_DECIMALS`] decimals, stored as
/// integers so `-0.001` and `0.001` share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuantizedKey {
    x: i64,
    y: i64,
    z: i64,
}

impl QuantizedKey {
    pub fn from_position(p: &Point3<f64>) -> Self {
        let scale = 10f64.powi(QUANTIZE_DECIMALS);
        let q = |v: f64| (v * scale).round() as i64;
        Self {
            x: q(p.x),
            y: q(p.y),
            z: q(p.z),
        }
    }
}

impl fmt::Display for QuantizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = 10f64.powi(QUANTIZE_DECIMALS);
        let d = QUANTIZE_DECIMALS as usize;
        write!(
            f,
            "{:.d$}_{:.d$}_{:.d$}",
            self.x as f64 / scale,
            self.y as f64 / scale,
            self.z as f64 / scale,
        )
    }
}

/// One deduplicated marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerAnchor {
    pub key: QuantizedKey,
    /// Position of the first hit.
    pub world_position: Point3<f64>,
    pub occurrence_count: u32,
    pub icon: MarkerId,
    /// Count label, present once the anchor has been hit more than once.
    pub label: Option<MarkerId>,
    /// Annotation of the most recent hit.
    pub latest_annotation: AnnotationId,
}

/// Outcome of a [`MarkerPlacer::recompute`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecomputeReport {
    /// Anchors created.
    pub placed: usize,
    /// Hits merged into an existing anchor.
    pub merged: usize,
    /// Groups skipped because their elements are not in the loaded geometry.
    pub stale: Vec<StaleGeometryWarning>,
    /// Annotations touching the active selection, in input order.
    pub highlighted: Vec<AnnotationId>,
}

/// Owns the marker set of the active model.
#[derive(Debug)]
pub struct MarkerPlacer {
    anchors: BTreeMap<QuantizedKey, MarkerAnchor>,
    label_offset: f64,
}

impl MarkerPlacer {
    /// `label_offset` is how far along +X the count label sits from its icon.
    pub fn new(label_offset: f64) -> Self {
        Self {
            anchors: BTreeMap::new(),
            label_offset,
        }
    }

    /// Replaces every marker with anchors computed from `records`.
    pub fn recompute<S>(
        &mut self,
        model: &RuntimeId,
        records: &[AnnotationRecord],
        selection: Option<&SelectionSet>,
        scene: &mut S,
    ) -> RecomputeReport
    where
        S: GeometrySource + MarkerSurface + ?Sized,
    {
        self.clear(scene);
        let mut report = RecomputeReport::default();

        for record in records {
            for (i, group) in record.element_index_groups.iter().enumerate() {
                match group_bounds(&*scene, model, record.id, i, group) {
                    Ok(bounds) => {
                        if self.place(bounds.center(), record.id, scene) {
                            report.placed += 1;
                        } else {
                            report.merged += 1;
                        }
                    }
                    Err(warning) => {
                        tracing::warn!(model = %model, %warning, "Skipping stale element group");
                        report.stale.push(warning);
                    }
                }
            }

            if selection.map_or(false, |s| record.touches(&s.element_indices)) {
                report.highlighted.push(record.id);
            }
        }

        tracing::debug!(
            model = %model,
            anchors = self.anchors.len(),
            placed = report.placed,
            merged = report.merged,
            stale = report.stale.len(),
            "Recomputed markers"
        );
        report
    }

    /// Inserts or merges an anchor at `center`. Returns `true` if a new
    /// anchor was created.
    fn place<M>(&mut self, center: Point3<f64>, annotation: AnnotationId, surface: &mut M) -> bool
    where
        M: MarkerSurface + ?Sized,
    {
        let key = QuantizedKey::from_position(&center);

        if let Some(anchor) = self.anchors.get_mut(&key) {
            anchor.occurrence_count += 1;
            anchor.latest_annotation = annotation;
            if let Some(old) = anchor.label.take() {
                surface.delete_marker(&old);
            }
            let label_pos = anchor.world_position + Vector3::new(self.label_offset, 0.0, 0.0);
            let text = anchor.occurrence_count.to_string();
            anchor.label = Some(surface.create_marker(&text, label_pos));
            return false;
        }

        let icon = surface.create_marker(ANCHOR_ICON, center);
        self.anchors.insert(
            key,
            MarkerAnchor {
                key,
                world_position: center,
                occurrence_count: 1,
                icon,
                label: None,
                latest_annotation: annotation,
            },
        );
        true
    }

    /// Removes every marker from `surface`.
    pub fn clear<M>(&mut self, surface: &mut M)
    where
        M: MarkerSurface + ?Sized,
    {
        for (_, anchor) in std::mem::take(&mut self.anchors) {
            surface.delete_marker(&anchor.icon);
            if let Some(label) = &anchor.label {
                surface.delete_marker(label);
            }
        }
    }

    pub fn anchor(&self, key: &QuantizedKey) -> Option<&MarkerAnchor> {
        self.anchors.get(key)
    }

    /// Anchors ordered by quantized position.
    pub fn anchors(&self) -> impl Iterator<Item = &MarkerAnchor> {
        self.anchors.values()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

impl Default for MarkerPlacer {
    fn default() -> Self {
        Self::new(0.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantization_absorbs_jitter() {
        let a = QuantizedKey::from_position(&Point3::new(1.0049, 2.0, -3.0));
        let b = QuantizedKey::from_position(&Point3::new(1.0001, 2.0000001, -2.9999));
        assert_eq!(a, b);
        assert_ne!(a, QuantizedKey::from_position(&Point3::new(1.01, 2.0, -3.0)));
    }

    #[test]
    fn key_renders_two_decimals() {
        let key = QuantizedKey::from_position(&Point3::new(1.234, -0.001, 10.0));
        assert_eq!(key.to_string(), "1.23_0.00_10.00");
        let key = QuantizedKey::from_position(&Point3::new(-0.05, 0.0, 0.0));
        assert_eq!(key.to_string(), "-0.05_0.00_0.00");
    }
}
