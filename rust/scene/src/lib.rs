// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # BIM-Todo Scene
//!
//! Scene-side state derived from annotations and loaded models.
//!
//! - [`MarkerPlacer`] turns annotation element groups into deduplicated
//!   anchors with occurrence counts
//! - [`DerivedArtifactRegistry`] tracks clipping planes and measurements per
//!   owning model, so unloading a model disposes everything built on it
//!
//! The viewer itself stays behind two traits: [`GeometrySource`] answers
//! bounding-box queries and [`MarkerSurface`] draws and removes markers.

pub mod artifacts;
pub mod bounds;
pub mod markers;

pub use artifacts::{ArtifactHandle, ArtifactKind, DerivedArtifactRegistry, SceneArtifact};
pub use bounds::{group_bounds, Aabb, GeometrySource, StaleGeometryWarning};
pub use markers::{
    MarkerAnchor, MarkerId, MarkerPlacer, MarkerSurface, QuantizedKey, RecomputeReport,
    ANCHOR_ICON, QUANTIZE_DECIMALS,
};
