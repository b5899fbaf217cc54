// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # BIM-Todo Engine
//!
//! Runs the annotation lifecycle: scene notifications in, store calls out,
//! markers and artifacts kept consistent in between.
//!
//! ## Architecture
//!
//! ```text
//! SceneEvent ──► AnnotationLifecycle ──► AnnotationStore / ModelStore
//!                 │   IdentityRegistry        (HttpStore, InMemoryStore)
//!                 │   MarkerPlacer
//!                 │   DerivedArtifactRegistry
//!                 ▼
//!            LifecycleEvent (AnnotationsChanged, MarkersChanged, SelectionChanged, RefreshFailed)
//! ```

pub mod config;
pub mod events;
pub mod form;
pub mod http;
pub mod lifecycle;
pub mod memory;
pub mod scene;
pub mod store;

pub use config::EngineConfig;
pub use events::{EventBus, LifecycleEvent};
pub use form::{validate_patch, FormFields, ValidForm};
pub use http::HttpStore;
pub use lifecycle::{ActiveModel, AnnotationLifecycle, RefreshOutcome, RefreshTicket, TrackTarget};
pub use memory::InMemoryStore;
pub use scene::{SceneCollaborator, SceneEvent};
pub use store::{AnnotationPatch, AnnotationStore, ModelStore, NewAnnotation};
