// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Backend seams: where annotation and model records live.
//!
//! Implementations convert every failure into [`bimtodo_core::Error`] before
//! returning, so callers only ever see the core taxonomy.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use bimtodo_core::record::{deadline_format, element_groups};
use bimtodo_core::{
    AnnotationId, AnnotationRecord, ElementIndex, Manager, ManagerId, ModelSummary,
    PersistedModelId, Priority, QueryParams, Result, Viewpoint,
};

/// Fields of an annotation about to be created. The backend assigns the id
/// and creation timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAnnotation {
    pub title: String,
    #[serde(rename = "content")]
    pub description: String,
    #[serde(rename = "ifc")]
    pub model_id: PersistedModelId,
    #[serde(rename = "manager")]
    pub manager_id: ManagerId,
    #[serde(rename = "writer", skip_serializing_if = "Option::is_none")]
    pub writer_id: Option<i64>,
    #[serde(with = "deadline_format")]
    pub deadline: NaiveDate,
    pub priority: Priority,
    #[serde(rename = "expressIDs", with = "element_groups")]
    pub element_index_groups: Vec<BTreeSet<ElementIndex>>,
    #[serde(rename = "camera")]
    pub viewpoint: Viewpoint,
}

/// Partial update of an annotation. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnnotationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "content", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "manager", skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<ManagerId>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_deadline"
    )]
    pub deadline: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(
        rename = "expressIDs",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_groups"
    )]
    pub element_index_groups: Option<Vec<BTreeSet<ElementIndex>>>,
    #[serde(rename = "camera", skip_serializing_if = "Option::is_none")]
    pub viewpoint: Option<Viewpoint>,
}

impl AnnotationPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Writes every set field into `record`.
    pub fn apply_to(&self, record: &mut AnnotationRecord) {
        if let Some(title) = &self.title {
            record.title = title.clone();
        }
        if let Some(description) = &self.description {
            record.description = description.clone();
        }
        if let Some(manager) = self.manager_id {
            record.manager_id = manager;
        }
        if let Some(deadline) = self.deadline {
            record.deadline = deadline;
        }
        if let Some(priority) = self.priority {
            record.priority = priority;
        }
        if let Some(groups) = &self.element_index_groups {
            record.element_index_groups = groups.clone();
        }
        if let Some(viewpoint) = self.viewpoint {
            record.viewpoint = viewpoint;
        }
    }
}

fn serialize_opt_deadline<S: Serializer>(
    v: &Option<NaiveDate>,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    match v {
        Some(date) => deadline_format::serialize(date, s),
        None => s.serialize_none(),
    }
}

fn serialize_opt_groups<S: Serializer>(
    v: &Option<Vec<BTreeSet<ElementIndex>>>,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    match v {
        Some(groups) => element_groups::serialize(groups, s),
        None => s.serialize_none(),
    }
}

/// Persisted annotation records.
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    /// Records of `query.model_id`, filtered and sorted as `query` asks.
    async fn list(&self, query: &QueryParams) -> Result<Vec<AnnotationRecord>>;

    async fn create(&self, fields: &NewAnnotation) -> Result<AnnotationRecord>;

    /// Fails with `NotFound` for an unknown id.
    async fn update(&self, id: AnnotationId, patch: &AnnotationPatch) -> Result<()>;

    /// Fails with `NotFound` for an unknown id.
    async fn delete(&self, id: AnnotationId) -> Result<()>;

    /// People annotations can be assigned to.
    async fn managers(&self) -> Result<Vec<Manager>>;
}

/// Stored model files.
#[async_trait]
pub trait ModelStore: Send + Sync {
    async fn list_names(&self) -> Result<Vec<ModelSummary>>;

    /// Raw file content of a stored model.
    async fn fetch_content(&self, id: PersistedModelId) -> Result<Vec<u8>>;

    async fn delete(&self, id: PersistedModelId) -> Result<()>;
}
