// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::{Arc, Mutex};

use bimtodo_core::RuntimeId;
use bimtodo_scene::{ArtifactKind, DerivedArtifactRegistry, SceneArtifact};

/// Records its name in a shared log when disposed.
struct Logged {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
}

impl SceneArtifact for Logged {
    fn dispose(&mut self) {
        self.log.lock().unwrap().push(self.name.clone());
    }
}

fn logged(name: &str, log: &Arc<Mutex<Vec<String>>>) -> Result<Box<dyn SceneArtifact>, ()> {
    Ok(Box::new(Logged {
        name: name.to_string(),
        log: Arc::clone(log),
    }))
}

#[test]
fn disposing_a_model_releases_only_its_artifacts() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = DerivedArtifactRegistry::new();
    let a = RuntimeId::from("model-a");
    let b = RuntimeId::from("model-b");

    registry
        .create_artifact(&a, "clip", ArtifactKind::ClippingPlane, || logged("a-clip", &log))
        .unwrap();
    registry
        .create_artifact(&a, "edge", ArtifactKind::EdgeMeasurement, || logged("a-edge", &log))
        .unwrap();
    let survivor = registry
        .create_artifact(&b, "clip", ArtifactKind::ClippingPlane, || logged("b-clip", &log))
        .unwrap();

    assert_eq!(registry.dispose_all_for_model(&a), 2);
    let mut disposed = log.lock().unwrap().clone();
    disposed.sort();
    assert_eq!(disposed, vec!["a-clip".to_string(), "a-edge".to_string()]);

    assert!(registry.artifacts_for_model(&a).is_empty());
    assert_eq!(registry.artifacts_for_model(&b), vec![survivor]);
    assert_eq!(registry.owner(survivor), Some(&b));
}

#[test]
fn dispose_all_for_model_is_idempotent() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = DerivedArtifactRegistry::new();
    let a = RuntimeId::from("model-a");
    registry
        .create_artifact(&a, "clip", ArtifactKind::ClippingPlane, || logged("a-clip", &log))
        .unwrap();

    assert_eq!(registry.dispose_all_for_model(&a), 1);
    assert_eq!(registry.dispose_all_for_model(&a), 0);
    assert_eq!(registry.dispose_all_for_model(&RuntimeId::from("never-loaded")), 0);
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn same_key_on_another_model_is_a_separate_artifact() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = DerivedArtifactRegistry::new();
    let kind = ArtifactKind::FaceMeasurement;
    let h1 = registry
        .create_artifact(&RuntimeId::from("a"), "k", kind, || logged("1", &log))
        .unwrap();
    let h2 = registry
        .create_artifact(&RuntimeId::from("b"), "k", kind, || logged("2", &log))
        .unwrap();
    assert_ne!(h1, h2);
    assert_eq!(registry.len(), 2);
}

#[test]
fn key_is_free_again_after_disposal() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = DerivedArtifactRegistry::new();
    let model = RuntimeId::from("a");
    let first = registry
        .create_artifact(&model, "k", ArtifactKind::ClippingPlane, || logged("first", &log))
        .unwrap();
    registry.dispose_artifact(first);

    let second = registry
        .create_artifact(&model, "k", ArtifactKind::ClippingPlane, || logged("second", &log))
        .unwrap();
    assert_ne!(first, second);
    assert!(!registry.contains(first));
    assert_eq!(registry.kind(second), Some(ArtifactKind::ClippingPlane));
}
