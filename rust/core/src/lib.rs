// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # BIM-Todo Core
//!
//! Types that tie runtime scene objects to persisted backend records.
//!
//! - **Identifiers**: one wrapper type per id-space ([`PersistedModelId`],
//!   [`RuntimeId`], [`FragmentId`], [`ElementIndex`], ...)
//! - **Identity**: [`IdentityRegistry`], the bijection between stored models
//!   and the scene objects they are loaded as
//! - **Selection**: [`SelectionSet`], the elements picked within one fragment
//! - **Records**: [`AnnotationRecord`] and its backend wire format
//! - **Queries**: [`AnnotationQueryBuilder`] / [`QueryParams`] for filtered,
//!   sorted annotation lists
//!
//! ## Quick Start
//!
//! ```rust
//! use bimtodo_core::{IdentityRegistry, PersistedModelId, RawSelection, RuntimeId, SelectionSet};
//!
//! let mut registry = IdentityRegistry::new();
//! registry
//!     .register(PersistedModelId(7), RuntimeId::from("scene-uuid"), "Tower A")
//!     .unwrap();
//!
//! let raw = RawSelection::new().with_group("fragment-1", [12, 13]);
//! let selection = SelectionSet::from_selection_event(&raw).unwrap();
//! assert_eq!(selection.len(), 2);
//! assert_eq!(
//!     registry.resolve_persisted_id(&RuntimeId::from("scene-uuid")).unwrap(),
//!     PersistedModelId(7)
//! );
//! ```

pub mod error;
pub mod identity;
pub mod ids;
pub mod query;
pub mod record;
pub mod selection;

pub use error::{EntityKind, Error, NetworkError, Result, StatusClass, ValidationError};
pub use identity::IdentityRegistry;
pub use ids::{AnnotationId, ElementIndex, FragmentId, ManagerId, PersistedModelId, RuntimeId};
pub use query::{reconcile, AnnotationQueryBuilder, ListEntry, QueryParams, SortKey};
pub use record::{
    filter_models, AnnotationRecord, Manager, ModelRecord, ModelSummary, Priority, Viewpoint,
};
pub use selection::{RawSelection, SelectionSet};
