// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The rendering side, as seen by the lifecycle.

use bimtodo_core::{FragmentId, PersistedModelId, RawSelection, RuntimeId};
use bimtodo_scene::{GeometrySource, MarkerSurface};

/// Notifications from the scene, delivered in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    /// A stored model finished loading under a fresh runtime id.
    ModelLoaded {
        persisted: PersistedModelId,
        runtime: RuntimeId,
        name: String,
    },
    /// A loaded model was removed from the scene.
    ModelDisposed { runtime: RuntimeId },
    /// The pick selection changed. Empty means nothing is selected.
    SelectionChanged(RawSelection),
}

/// Geometry queries, marker drawing, and fragment ownership.
pub trait SceneCollaborator: GeometrySource + MarkerSurface {
    /// Loaded model that `fragment` belongs to.
    fn owning_model(&self, fragment: &FragmentId) -> Option<RuntimeId>;
}
