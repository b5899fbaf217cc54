// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bimtodo_core::{
    AnnotationId, AnnotationRecord, ElementIndex, FragmentId, ManagerId, PersistedModelId,
    Priority, RuntimeId, Viewpoint,
};
use bimtodo_engine::{
    AnnotationLifecycle, EngineConfig, FormFields, InMemoryStore, LifecycleEvent,
    SceneCollaborator,
};
use bimtodo_scene::{Aabb, GeometrySource, MarkerId, MarkerSurface, SceneArtifact};
use chrono::{NaiveDate, TimeZone, Utc};
use nalgebra::Point3;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc::UnboundedReceiver;

/// Scene double: fragment ownership, per-element unit boxes, live markers.
#[derive(Default)]
pub struct FakeScene {
    pub fragments: FxHashMap<FragmentId, RuntimeId>,
    pub boxes: FxHashMap<(RuntimeId, u32), Aabb>,
    pub live_markers: FxHashMap<String, String>,
    next_marker: u32,
}

impl FakeScene {
    /// Adds a fragment of `runtime` whose elements are unit boxes at x = index.
    pub fn with_fragment(mut self, fragment: &str, runtime: &str, elements: &[u32]) -> Self {
        let runtime = RuntimeId::from(runtime);
        self.fragments.insert(FragmentId::from(fragment), runtime.clone());
        for &e in elements {
            let x = e as f64;
            self.boxes.insert(
                (runtime.clone(), e),
                Aabb::new(Point3::new(x, 0.0, 0.0), Point3::new(x + 1.0, 1.0, 1.0)),
            );
        }
        self
    }
}

impl GeometrySource for FakeScene {
    fn element_bounds(&self, model: &RuntimeId, element: ElementIndex) -> Option<Aabb> {
        self.boxes.get(&(model.clone(), element.0)).copied()
    }
}

impl MarkerSurface for FakeScene {
    fn create_marker(&mut self, text: &str, _position: Point3<f64>) -> MarkerId {
        self.next_marker += 1;
        let id = format!("m{}", self.next_marker);
        self.live_markers.insert(id.clone(), text.to_string());
        MarkerId(id)
    }

    fn delete_marker(&mut self, id: &MarkerId) {
        self.live_markers.remove(&id.0);
    }
}

impl SceneCollaborator for FakeScene {
    fn owning_model(&self, fragment: &FragmentId) -> Option<RuntimeId> {
        self.fragments.get(fragment).cloned()
    }
}

/// Artifact that counts its disposals.
pub struct CountedArtifact(pub Arc<AtomicUsize>);

impl SceneArtifact for CountedArtifact {
    fn dispose(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Two models: 1 loaded as `uuid-a` (fragment `frag-a`, elements 1..=5) and
/// 2 as `uuid-b` (fragment `frag-b`, elements 1..=5).
pub fn two_model_scene() -> FakeScene {
    FakeScene::default()
        .with_fragment("frag-a", "uuid-a", &[1, 2, 3, 4, 5])
        .with_fragment("frag-b", "uuid-b", &[1, 2, 3, 4, 5])
}

pub fn lifecycle(
    store: &Arc<InMemoryStore>,
    scene: FakeScene,
) -> AnnotationLifecycle<FakeScene> {
    AnnotationLifecycle::new(EngineConfig::builtin(), store.clone(), store.clone(), scene)
}

pub fn record(id: i64, model: i64, elements: &[u32]) -> AnnotationRecord {
    AnnotationRecord {
        id: AnnotationId(id),
        title: format!("todo {id}"),
        description: String::new(),
        model_id: PersistedModelId(model),
        manager_id: ManagerId(1),
        manager_name: None,
        manager_position: None,
        writer_id: None,
        created_at: Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap(),
        deadline: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        priority: Priority::Medium,
        element_index_groups: vec![elements
            .iter()
            .copied()
            .map(ElementIndex)
            .collect::<BTreeSet<_>>()],
        viewpoint: Viewpoint::default(),
    }
}

pub fn form(title: &str) -> FormFields {
    FormFields {
        title: title.to_string(),
        description: "from test".into(),
        manager: Some(ManagerId(1)),
        deadline: "2024-07-15".into(),
        priority: "MEDIUM".into(),
        writer: Some(1),
    }
}

pub fn drain(rx: &mut UnboundedReceiver<LifecycleEvent>) -> Vec<LifecycleEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
