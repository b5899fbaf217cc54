// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lifetime tracking for scene objects derived from a loaded model.
//!
//! Clipping planes and measurement overlays reference the geometry of the
//! model they were created on. Every such object is registered here under its
//! owning model, and all of them are disposed when that model goes away.
//! Handles are generational ([`slotmap`]), so a handle whose artifact was
//! already disposed never aliases a newer one.

use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::{new_key_type, SlotMap};

use bimtodo_core::RuntimeId;

new_key_type! {
    /// Handle to a registered artifact.
    pub struct ArtifactHandle;
}

/// What a derived artifact is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    ClippingPlane,
    EdgeMeasurement,
    FaceMeasurement,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::ClippingPlane,
        ArtifactKind::EdgeMeasurement,
        ArtifactKind::FaceMeasurement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::ClippingPlane => "clipping-plane",
            ArtifactKind::EdgeMeasurement => "edge-measurement",
            ArtifactKind::FaceMeasurement => "face-measurement",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scene object that holds resources until disposed.
pub trait SceneArtifact: Send {
    /// Releases the object's scene resources. Called exactly once.
    fn dispose(&mut self);
}

struct Entry {
    owner: RuntimeId,
    key: String,
    kind: ArtifactKind,
    artifact: Box<dyn SceneArtifact>,
}

/// Registry of derived artifacts keyed by owning model.
///
/// At most one artifact exists per `(owner, key)`. Creating again with the
/// same key returns the existing handle without calling the factory.
#[derive(Default)]
pub struct DerivedArtifactRegistry {
    entries: SlotMap<ArtifactHandle, Entry>,
    by_key: FxHashMap<(RuntimeId, String), ArtifactHandle>,
    by_model: FxHashMap<RuntimeId, FxHashSet<ArtifactHandle>>,
}

impl DerivedArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the artifact built by `factory`, unless one already exists
    /// for `(owner, key)`.
    ///
    /// A failing factory leaves the registry unchanged.
    pub fn create_artifact<F, E>(
        &mut self,
        owner: &RuntimeId,
        key: impl Into<String>,
        kind: ArtifactKind,
        factory: F,
    ) -> Result<ArtifactHandle, E>
    where
        F: FnOnce() -> Result<Box<dyn SceneArtifact>, E>,
    {
        let key = key.into();
        let lookup = (owner.clone(), key);
        if let Some(&handle) = self.by_key.get(&lookup) {
            return Ok(handle);
        }

        let artifact = factory()?;
        let (owner, key) = lookup;
        let handle = self.entries.insert(Entry {
            owner: owner.clone(),
            key: key.clone(),
            kind,
            artifact,
        });
        self.by_key.insert((owner.clone(), key), handle);
        self.by_model.entry(owner.clone()).or_default().insert(handle);

        tracing::debug!(model = %owner, %kind, "Created derived artifact");
        Ok(handle)
    }

    /// Disposes one artifact. Returns `false` for a handle that is not (or no
    /// longer) registered.
    pub fn dispose_artifact(&mut self, handle: ArtifactHandle) -> bool {
        match self.entries.remove(handle) {
            Some(entry) => {
                self.forget(handle, &entry);
                Self::release(entry);
                true
            }
            None => {
                tracing::warn!(?handle, "Dispose requested for unknown artifact");
                false
            }
        }
    }

    /// Disposes every artifact owned by `model` and returns how many there
    /// were. Calling it again is a no-op.
    pub fn dispose_all_for_model(&mut self, model: &RuntimeId) -> usize {
        let Some(handles) = self.by_model.remove(model) else {
            return 0;
        };
        let mut count = 0;
        for handle in handles {
            if let Some(entry) = self.entries.remove(handle) {
                self.by_key.remove(&(entry.owner.clone(), entry.key.clone()));
                Self::release(entry);
                count += 1;
            }
        }
        if count > 0 {
            tracing::info!(model = %model, count, "Disposed artifacts of unloaded model");
        }
        count
    }

    /// Disposes every artifact of `kind`, across all models.
    pub fn dispose_all_of_kind(&mut self, kind: ArtifactKind) -> usize {
        let handles: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, e)| e.kind == kind)
            .map(|(h, _)| h)
            .collect();
        let count = handles.len();
        for handle in handles {
            self.dispose_artifact(handle);
        }
        count
    }

    /// Handles owned by `model`, in no particular order.
    pub fn artifacts_for_model(&self, model: &RuntimeId) -> Vec<ArtifactHandle> {
        self.by_model
            .get(model)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, handle: ArtifactHandle) -> bool {
        self.entries.contains_key(handle)
    }

    pub fn kind(&self, handle: ArtifactHandle) -> Option<ArtifactKind> {
        self.entries.get(handle).map(|e| e.kind)
    }

    pub fn owner(&self, handle: ArtifactHandle) -> Option<&RuntimeId> {
        self.entries.get(handle).map(|e| &e.owner)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn forget(&mut self, handle: ArtifactHandle, entry: &Entry) {
        self.by_key.remove(&(entry.owner.clone(), entry.key.clone()));
        if let Some(set) = self.by_model.get_mut(&entry.owner) {
            set.remove(&handle);
            if set.is_empty() {
                self.by_model.remove(&entry.owner);
            }
        }
    }

    fn release(mut entry: Entry) {
        entry.artifact.dispose();
    }
}

impl Drop for DerivedArtifactRegistry {
    fn drop(&mut self) {
        for (_, mut entry) in self.entries.drain() {
            entry.artifact.dispose();
        }
    }
}

impl std::fmt::Debug for DerivedArtifactRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedArtifactRegistry")
            .field("artifacts", &self.entries.len())
            .field("models", &self.by_model.len())
            .finish()
    }
}
