// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeSet;

use approx::assert_relative_eq;
use bimtodo_core::{
    AnnotationId, AnnotationRecord, ElementIndex, ManagerId, PersistedModelId, Priority,
    RuntimeId, SelectionSet, Viewpoint,
};
use bimtodo_scene::{Aabb, GeometrySource, MarkerId, MarkerPlacer, MarkerSurface, QuantizedKey};
use chrono::{NaiveDate, TimeZone, Utc};
use nalgebra::Point3;
use rustc_hash::FxHashMap;

/// Fake viewer: fixed element boxes plus a log of live markers.
#[derive(Default)]
struct FakeScene {
    boxes: FxHashMap<u32, Aabb>,
    live: FxHashMap<String, (String, Point3<f64>)>,
    next: u32,
}

impl FakeScene {
    fn with_box(mut self, element: u32, min: [f64; 3], max: [f64; 3]) -> Self {
        self.boxes.insert(
            element,
            Aabb::new(Point3::from(min), Point3::from(max)),
        );
        self
    }

    fn texts(&self) -> Vec<String> {
        let mut texts: Vec<_> = self.live.values().map(|(t, _)| t.clone()).collect();
        texts.sort();
        texts
    }
}

impl GeometrySource for FakeScene {
    fn element_bounds(&self, _model: &RuntimeId, element: ElementIndex) -> Option<Aabb> {
        self.boxes.get(&element.0).copied()
    }
}

impl MarkerSurface for FakeScene {
    fn create_marker(&mut self, text: &str, position: Point3<f64>) -> MarkerId {
        self.next += 1;
        let id = format!("marker-{}", self.next);
        self.live.insert(id.clone(), (text.to_string(), position));
        MarkerId(id)
    }

    fn delete_marker(&mut self, id: &MarkerId) {
        self.live.remove(&id.0);
    }
}

fn annotation(id: i64, groups: &[&[u32]]) -> AnnotationRecord {
    AnnotationRecord {
        id: AnnotationId(id),
        title: format!("todo {id}"),
        description: String::new(),
        model_id: PersistedModelId(1),
        manager_id: ManagerId(1),
        manager_name: None,
        manager_position: None,
        writer_id: None,
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        deadline: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        priority: Priority::Medium,
        element_index_groups: groups
            .iter()
            .map(|g| g.iter().copied().map(ElementIndex).collect::<BTreeSet<_>>())
            .collect(),
        viewpoint: Viewpoint::default(),
    }
}

fn model() -> RuntimeId {
    RuntimeId::from("scene-model")
}

#[test]
fn identical_centers_merge_into_one_counted_anchor() {
    let mut scene = FakeScene::default()
        .with_box(1, [0.0, 0.0, 0.0], [2.0, 2.0, 2.0])
        // Slightly different box with the same center to two decimals.
        .with_box(2, [0.001, 0.0, 0.0], [2.002, 2.0, 2.0]);
    let records = vec![annotation(10, &[&[1]]), annotation(11, &[&[2]])];

    let mut placer = MarkerPlacer::default();
    let report = placer.recompute(&model(), &records, None, &mut scene);

    assert_eq!(report.placed, 1);
    assert_eq!(report.merged, 1);
    assert_eq!(placer.len(), 1);

    let key = QuantizedKey::from_position(&Point3::new(1.0, 1.0, 1.0));
    let anchor = placer.anchor(&key).unwrap();
    assert_eq!(anchor.occurrence_count, 2);
    assert_eq!(anchor.latest_annotation, AnnotationId(11));

    // Icon plus a single count label offset along +X.
    assert_eq!(scene.texts(), vec!["2".to_string(), "🚀".to_string()]);
    let label = anchor.label.as_ref().unwrap();
    let (_, label_pos) = &scene.live[&label.0];
    assert_relative_eq!(label_pos.x, anchor.world_position.x + 0.1);
}

#[test]
fn third_hit_replaces_the_count_label() {
    let mut scene = FakeScene::default().with_box(1, [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
    let records = vec![
        annotation(1, &[&[1]]),
        annotation(2, &[&[1]]),
        annotation(3, &[&[1]]),
    ];

    let mut placer = MarkerPlacer::new(0.25);
    placer.recompute(&model(), &records, None, &mut scene);

    assert_eq!(placer.anchors().next().unwrap().occurrence_count, 3);
    assert_eq!(scene.texts(), vec!["3".to_string(), "🚀".to_string()]);
}

#[test]
fn stale_groups_are_skipped_and_reported() {
    let mut scene = FakeScene::default().with_box(1, [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
    let records = vec![annotation(1, &[&[1], &[99]]), annotation(2, &[&[1, 98]])];

    let mut placer = MarkerPlacer::default();
    let report = placer.recompute(&model(), &records, None, &mut scene);

    assert_eq!(report.placed, 1);
    assert_eq!(report.stale.len(), 2);
    assert_eq!(report.stale[0].annotation, AnnotationId(1));
    assert_eq!(report.stale[0].group, 1);
    assert_eq!(report.stale[1].missing, vec![ElementIndex(98)]);
}

#[test]
fn recompute_replaces_previous_markers() {
    let mut scene = FakeScene::default()
        .with_box(1, [0.0, 0.0, 0.0], [1.0, 1.0, 1.0])
        .with_box(2, [5.0, 5.0, 5.0], [6.0, 6.0, 6.0]);

    let mut placer = MarkerPlacer::default();
    placer.recompute(&model(), &[annotation(1, &[&[1]]), annotation(2, &[&[2]])], None, &mut scene);
    assert_eq!(scene.live.len(), 2);

    placer.recompute(&model(), &[annotation(1, &[&[1]])], None, &mut scene);
    assert_eq!(scene.live.len(), 1);
    assert_eq!(placer.len(), 1);

    placer.clear(&mut scene);
    assert!(scene.live.is_empty());
    assert!(placer.is_empty());
}

#[test]
fn records_touching_the_selection_are_highlighted() {
    let mut scene = FakeScene::default()
        .with_box(1, [0.0, 0.0, 0.0], [1.0, 1.0, 1.0])
        .with_box(2, [5.0, 5.0, 5.0], [6.0, 6.0, 6.0]);
    let records = vec![annotation(1, &[&[1]]), annotation(2, &[&[2]])];
    let selection = SelectionSet::new("frag", [2]);

    let mut placer = MarkerPlacer::default();
    let report = placer.recompute(&model(), &records, Some(&selection), &mut scene);
    assert_eq!(report.highlighted, vec![AnnotationId(2)]);
}
