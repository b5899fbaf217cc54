// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-process store used for offline work and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use bimtodo_core::{
    AnnotationId, AnnotationRecord, EntityKind, Error, Manager, ModelSummary, PersistedModelId,
    QueryParams, Result,
};

use crate::store::{AnnotationPatch, AnnotationStore, ModelStore, NewAnnotation};

#[derive(Default)]
struct Tables {
    annotations: BTreeMap<AnnotationId, AnnotationRecord>,
    next_annotation: i64,
    models: BTreeMap<PersistedModelId, (String, Vec<u8>)>,
    managers: Vec<Manager>,
    mutations: usize,
    /// Returned by the next call instead of its normal result.
    injected: Option<Error>,
    /// Returned by the next `list` only.
    injected_list: Option<Error>,
}

/// Annotation and model store held in memory.
///
/// Lists are answered in insertion order before [`QueryParams::apply`]
/// sorts them, matching a backend that returns rows by primary key.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_manager(self, manager: Manager) -> Self {
        self.tables.lock().managers.push(manager);
        self
    }

    pub fn with_model(self, id: PersistedModelId, name: &str, content: Vec<u8>) -> Self {
        self.tables.lock().models.insert(id, (name.to_string(), content));
        self
    }

    /// Inserts a record as-is, keeping its id. Does not count as a mutation.
    pub fn seed(&self, record: AnnotationRecord) {
        let mut tables = self.tables.lock();
        tables.next_annotation = tables.next_annotation.max(record.id.0);
        tables.annotations.insert(record.id, record);
    }

    /// Makes the next store call fail with `error`.
    pub fn fail_next(&self, error: Error) {
        self.tables.lock().injected = Some(error);
    }

    /// Makes the next `list` call fail with `error`; other calls succeed.
    pub fn fail_next_list(&self, error: Error) {
        self.tables.lock().injected_list = Some(error);
    }

    /// Number of successful create/update/delete calls.
    pub fn mutation_count(&self) -> usize {
        self.tables.lock().mutations
    }

    pub fn annotation(&self, id: AnnotationId) -> Option<AnnotationRecord> {
        self.tables.lock().annotations.get(&id).cloned()
    }

    pub fn annotation_count(&self) -> usize {
        self.tables.lock().annotations.len()
    }

    fn check_injected(tables: &mut Tables) -> Result<()> {
        match tables.injected.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AnnotationStore for InMemoryStore {
    async fn list(&self, query: &QueryParams) -> Result<Vec<AnnotationRecord>> {
        let mut tables = self.tables.lock();
        Self::check_injected(&mut tables)?;
        if let Some(err) = tables.injected_list.take() {
            return Err(err);
        }
        Ok(query.apply(tables.annotations.values().cloned()))
    }

    async fn create(&self, fields: &NewAnnotation) -> Result<AnnotationRecord> {
        let mut tables = self.tables.lock();
        Self::check_injected(&mut tables)?;

        tables.next_annotation += 1;
        let manager = tables.managers.iter().find(|m| m.id == fields.manager_id).cloned();
        let record = AnnotationRecord {
            id: AnnotationId(tables.next_annotation),
            title: fields.title.clone(),
            description: fields.description.clone(),
            model_id: fields.model_id,
            manager_id: fields.manager_id,
            manager_name: manager.as_ref().map(|m| m.name.clone()),
            manager_position: manager.map(|m| m.position),
            writer_id: fields.writer_id,
            created_at: Utc::now(),
            deadline: fields.deadline,
            priority: fields.priority,
            element_index_groups: fields.element_index_groups.clone(),
            viewpoint: fields.viewpoint,
        };
        tables.annotations.insert(record.id, record.clone());
        tables.mutations += 1;
        Ok(record)
    }

    async fn update(&self, id: AnnotationId, patch: &AnnotationPatch) -> Result<()> {
        let mut tables = self.tables.lock();
        Self::check_injected(&mut tables)?;

        let record = tables
            .annotations
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(EntityKind::Annotation, id))?;
        patch.apply_to(record);
        tables.mutations += 1;
        Ok(())
    }

    async fn delete(&self, id: AnnotationId) -> Result<()> {
        let mut tables = self.tables.lock();
        Self::check_injected(&mut tables)?;

        if tables.annotations.remove(&id).is_none() {
            return Err(Error::not_found(EntityKind::Annotation, id));
        }
        tables.mutations += 1;
        Ok(())
    }

    async fn managers(&self) -> Result<Vec<Manager>> {
        let mut tables = self.tables.lock();
        Self::check_injected(&mut tables)?;
        Ok(tables.managers.clone())
    }
}

#[async_trait]
impl ModelStore for InMemoryStore {
    async fn list_names(&self) -> Result<Vec<ModelSummary>> {
        let mut tables = self.tables.lock();
        Self::check_injected(&mut tables)?;
        Ok(tables
            .models
            .iter()
            .map(|(id, (name, _))| ModelSummary {
                id: *id,
                name: name.clone(),
            })
            .collect())
    }

    async fn fetch_content(&self, id: PersistedModelId) -> Result<Vec<u8>> {
        let mut tables = self.tables.lock();
        Self::check_injected(&mut tables)?;
        tables
            .models
            .get(&id)
            .map(|(_, content)| content.clone())
            .ok_or_else(|| Error::not_found(EntityKind::Model, id))
    }

    async fn delete(&self, id: PersistedModelId) -> Result<()> {
        let mut tables = self.tables.lock();
        Self::check_injected(&mut tables)?;

        if tables.models.remove(&id).is_none() {
            return Err(Error::not_found(EntityKind::Model, id));
        }
        // Annotations go with their model.
        tables.annotations.retain(|_, r| r.model_id != id);
        tables.mutations += 1;
        Ok(())
    }
}
