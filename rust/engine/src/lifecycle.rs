// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Orchestration of annotation create/edit/delete against the scene.
//!
//! [`AnnotationLifecycle`] owns the identity registry, the artifact registry
//! and the marker placer, and is the only consumer of [`SceneEvent`]s. That
//! makes it the single disposal handler for every loaded model.
//!
//! ## Refresh generations
//!
//! A list refresh is split in two: [`AnnotationLifecycle::begin_refresh`]
//! takes a ticket stamped with the current generation, and
//! [`AnnotationLifecycle::complete_refresh`] applies the fetched records only
//! if no later refresh, selection change or disposal bumped the generation
//! meanwhile. [`AnnotationLifecycle::refresh`] does both around the store
//! call.

use std::collections::BTreeSet;
use std::sync::Arc;

use nalgebra::{Point3, Vector3};

use bimtodo_core::{
    filter_models, reconcile, AnnotationId, AnnotationQueryBuilder, AnnotationRecord,
    ElementIndex, EntityKind, Error, IdentityRegistry, ListEntry, Manager, ModelSummary,
    PersistedModelId, QueryParams, RawSelection, Result, RuntimeId, SelectionSet, Viewpoint,
};
use bimtodo_scene::{
    ArtifactHandle, ArtifactKind, DerivedArtifactRegistry, MarkerPlacer, RecomputeReport,
    SceneArtifact,
};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::EngineConfig;
use crate::events::{EventBus, LifecycleEvent};
use crate::form::{validate_patch, FormFields};
use crate::scene::{SceneCollaborator, SceneEvent};
use crate::store::{AnnotationPatch, AnnotationStore, ModelStore, NewAnnotation};

/// The model whose annotations are listed and marked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveModel {
    pub persisted: PersistedModelId,
    pub runtime: RuntimeId,
}

/// An outstanding list fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshTicket {
    generation: u64,
    model: ActiveModel,
    query: QueryParams,
}

impl RefreshTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn model(&self) -> &ActiveModel {
        &self.model
    }

    /// Parameters to fetch with.
    pub fn query(&self) -> &QueryParams {
        &self.query
    }
}

/// What happened to a fetched list.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// Rendered: markers recomputed and list replaced.
    Applied(RecomputeReport),
    /// Superseded by a later selection, refresh or disposal.
    Discarded,
}

/// Where to point the camera to revisit an annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackTarget {
    pub viewpoint: Viewpoint,
    /// Elements to highlight.
    pub elements: BTreeSet<ElementIndex>,
}

/// Glue between the scene, the stores and the derived scene state.
pub struct AnnotationLifecycle<S: SceneCollaborator> {
    config: EngineConfig,
    annotations: Arc<dyn AnnotationStore>,
    models: Arc<dyn ModelStore>,
    scene: S,
    identity: IdentityRegistry,
    artifacts: DerivedArtifactRegistry,
    markers: MarkerPlacer,
    query: AnnotationQueryBuilder,
    events: EventBus,
    active: Option<ActiveModel>,
    /// Union of `selected` under the first fragment; drives highlighting.
    selection: Option<SelectionSet>,
    /// Picked groups, one per fragment.
    selected: Vec<SelectionSet>,
    listed: Vec<ListEntry>,
    generation: u64,
    tool: Option<ArtifactKind>,
}

impl<S: SceneCollaborator> AnnotationLifecycle<S> {
    pub fn new(
        config: EngineConfig,
        annotations: Arc<dyn AnnotationStore>,
        models: Arc<dyn ModelStore>,
        scene: S,
    ) -> Self {
        Self {
            markers: MarkerPlacer::new(config.label_offset),
            config,
            annotations,
            models,
            scene,
            identity: IdentityRegistry::new(),
            artifacts: DerivedArtifactRegistry::new(),
            query: AnnotationQueryBuilder::new(),
            events: EventBus::new(),
            active: None,
            selection: None,
            selected: Vec::new(),
            listed: Vec::new(),
            generation: 0,
            tool: None,
        }
    }

    /// Receives every [`LifecycleEvent`] from now on.
    pub fn subscribe(&mut self) -> UnboundedReceiver<LifecycleEvent> {
        self.events.subscribe()
    }

    // ========================================================================
    // Scene events
    // ========================================================================

    /// Processes one scene notification. A selection change that picks a
    /// model returns the ticket of the refresh it started; pass the fetched
    /// records to [`Self::complete_refresh`].
    pub fn handle_scene_event(&mut self, event: SceneEvent) -> Result<Option<RefreshTicket>> {
        match event {
            SceneEvent::ModelLoaded {
                persisted,
                runtime,
                name,
            } => {
                tracing::info!(
                    model = %persisted,
                    runtime = %runtime,
                    name = %name,
                    "Model loaded"
                );
                self.identity.register(persisted, runtime, name)?;
                Ok(None)
            }
            SceneEvent::ModelDisposed { runtime } => {
                self.dispose_model(&runtime);
                Ok(None)
            }
            SceneEvent::SelectionChanged(raw) => self.select(&raw),
        }
    }

    fn select(&mut self, raw: &RawSelection) -> Result<Option<RefreshTicket>> {
        let groups = raw.selection_sets();
        let Some(first) = groups.first() else {
            self.selection = None;
            self.selected.clear();
            self.listed = reconcile(self.take_listed_records(), None);
            self.events.emit(LifecycleEvent::SelectionChanged(None));
            return Ok(None);
        };

        let model = self.resolve_groups(&groups)?;
        let selection = SelectionSet {
            owner: first.owner.clone(),
            element_indices: SelectionSet::union(&groups),
        };
        tracing::debug!(
            model = %model.persisted,
            fragments = groups.len(),
            elements = selection.len(),
            "Selection changed"
        );
        self.active = Some(model);
        self.selection = Some(selection.clone());
        self.selected = groups;
        self.events.emit(LifecycleEvent::SelectionChanged(Some(selection)));
        self.begin_refresh().map(Some)
    }

    /// Tears down everything derived from a disposed model. Repeated
    /// notifications for the same model are no-ops.
    fn dispose_model(&mut self, runtime: &RuntimeId) {
        let artifacts = self.artifacts.dispose_all_for_model(runtime);
        let record = match self.identity.unregister_runtime(runtime) {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(runtime = %runtime, error = %e, "Could not unbind disposed model");
                None
            }
        };

        let was_active = self.active.as_ref().map_or(false, |a| &a.runtime == runtime);
        if was_active {
            self.generation += 1;
            self.active = None;
            self.selection = None;
            self.selected.clear();
            self.listed.clear();
            self.markers.clear(&mut self.scene);
            self.events.emit(LifecycleEvent::MarkersChanged);
            self.events.emit(LifecycleEvent::SelectionChanged(None));
        }

        tracing::info!(
            runtime = %runtime,
            model = ?record.map(|r| r.persisted_id),
            artifacts,
            was_active,
            "Model disposed"
        );
    }

    /// Model owning every group. Groups spanning several models are rejected.
    fn resolve_groups(&self, groups: &[SelectionSet]) -> Result<ActiveModel> {
        let mut owners: Vec<RuntimeId> = Vec::new();
        for group in groups {
            let owner = self
                .scene
                .owning_model(&group.owner)
                .ok_or_else(|| Error::not_found(EntityKind::Fragment, &group.owner))?;
            if !owners.contains(&owner) {
                owners.push(owner);
            }
        }
        match owners.len() {
            0 => Err(Error::validation("selection", "select at least one element")),
            1 => {
                let runtime = owners.remove(0);
                let persisted = self.identity.resolve_persisted_id(&runtime)?;
                Ok(ActiveModel { persisted, runtime })
            }
            n => Err(Error::validation(
                "selection",
                format!("spans {n} loaded models; select within one model"),
            )),
        }
    }

    fn resolve_owner(&self, selection: &SelectionSet) -> Result<ActiveModel> {
        self.resolve_groups(std::slice::from_ref(selection))
    }

    fn take_listed_records(&mut self) -> Vec<AnnotationRecord> {
        std::mem::take(&mut self.listed)
            .into_iter()
            .map(|e| e.record)
            .collect()
    }

    // ========================================================================
    // List refresh
    // ========================================================================

    /// Starts a refresh of the active model's list, invalidating any refresh
    /// still in flight.
    pub fn begin_refresh(&mut self) -> Result<RefreshTicket> {
        let model = self
            .active
            .clone()
            .ok_or_else(|| Error::not_found(EntityKind::LoadedModel, "active model"))?;
        self.generation += 1;
        Ok(RefreshTicket {
            generation: self.generation,
            query: self.query.for_model(model.persisted),
            model,
        })
    }

    /// Applies fetched records if `ticket` is still current.
    pub fn complete_refresh(
        &mut self,
        ticket: RefreshTicket,
        fetched: Result<Vec<AnnotationRecord>>,
    ) -> Result<RefreshOutcome> {
        if ticket.generation != self.generation || !self.identity.is_loaded(&ticket.model.runtime) {
            tracing::debug!(
                model = %ticket.model.persisted,
                ticket = ticket.generation,
                current = self.generation,
                "Discarding stale annotation list"
            );
            return Ok(RefreshOutcome::Discarded);
        }

        let records = fetched.map_err(|e| {
            tracing::warn!(
                model = %ticket.model.persisted,
                error = %e,
                "Annotation list fetch failed"
            );
            e
        })?;

        let report = self.markers.recompute(
            &ticket.model.runtime,
            &records,
            self.selection.as_ref(),
            &mut self.scene,
        );
        self.listed = reconcile(records, self.selection.as_ref());

        self.events.emit(LifecycleEvent::AnnotationsChanged(ticket.model.persisted));
        self.events.emit(LifecycleEvent::MarkersChanged);
        Ok(RefreshOutcome::Applied(report))
    }

    /// Fetches and applies the active model's list.
    pub async fn refresh(&mut self) -> Result<RefreshOutcome> {
        let ticket = self.begin_refresh()?;
        let fetched = self.annotations.list(ticket.query()).await;
        self.complete_refresh(ticket, fetched)
    }

    /// Refresh after a successful mutation. The mutation already happened,
    /// so a failed refresh is announced with [`LifecycleEvent::RefreshFailed`]
    /// instead of failing the mutation.
    async fn refresh_after_mutation(&mut self, model: PersistedModelId) {
        let is_active = self.active.as_ref().map_or(false, |a| a.persisted == model);
        if is_active {
            if let Err(e) = self.refresh().await {
                tracing::warn!(model = %model, error = %e, "Refresh after mutation failed");
                self.events.emit(LifecycleEvent::RefreshFailed {
                    model,
                    retryable: e.is_retryable(),
                });
            }
        } else {
            self.events.emit(LifecycleEvent::AnnotationsChanged(model));
        }
    }

    // ========================================================================
    // Annotation mutations
    // ========================================================================

    /// Creates an annotation on the elements of `groups`, storing one element
    /// group per fragment. See [`Self::selected_groups`] for the current pick.
    ///
    /// Fails with a validation error, without touching the store, when no
    /// element is selected, the groups span several models or a form field
    /// is invalid.
    pub async fn create(
        &mut self,
        groups: &[SelectionSet],
        fields: &FormFields,
        viewpoint: Viewpoint,
    ) -> Result<AnnotationRecord> {
        let picked: Vec<&SelectionSet> = groups.iter().filter(|g| !g.is_empty()).collect();
        if picked.is_empty() {
            return Err(Error::validation("selection", "select at least one element"));
        }
        let form = fields.validate(&self.config)?;
        let model = self.resolve_groups(groups)?;

        let new = NewAnnotation {
            title: form.title,
            description: form.description,
            model_id: model.persisted,
            manager_id: form.manager,
            writer_id: form.writer,
            deadline: form.deadline,
            priority: form.priority,
            element_index_groups: picked.iter().map(|g| g.element_indices.clone()).collect(),
            viewpoint,
        };
        let record = self.annotations.create(&new).await?;
        tracing::info!(annotation = %record.id, model = %model.persisted, "Annotation created");

        self.refresh_after_mutation(model.persisted).await;
        Ok(record)
    }

    pub async fn update(&mut self, id: AnnotationId, patch: &AnnotationPatch) -> Result<()> {
        validate_patch(patch, &self.config)?;
        self.annotations.update(id, patch).await?;
        tracing::info!(annotation = %id, "Annotation updated");

        let model = self.listed_model_of(id);
        self.after_keyed_mutation(model).await;
        Ok(())
    }

    pub async fn delete(&mut self, id: AnnotationId) -> Result<()> {
        let model = self.listed_model_of(id);
        self.annotations.delete(id).await?;
        tracing::info!(annotation = %id, "Annotation deleted");

        self.after_keyed_mutation(model).await;
        Ok(())
    }

    fn listed_model_of(&self, id: AnnotationId) -> Option<PersistedModelId> {
        self.listed
            .iter()
            .find(|e| e.record.id == id)
            .map(|e| e.record.model_id)
    }

    async fn after_keyed_mutation(&mut self, model: Option<PersistedModelId>) {
        let active = self.active.as_ref().map(|a| a.persisted);
        // An unlisted record may still belong to the active model.
        if let Some(model) = model.or(active) {
            self.refresh_after_mutation(model).await;
        }
    }

    /// Camera pose and elements of a listed annotation.
    pub fn track(&self, id: AnnotationId) -> Result<TrackTarget> {
        let entry = self
            .listed
            .iter()
            .find(|e| e.record.id == id)
            .ok_or_else(|| Error::not_found(EntityKind::Annotation, id))?;
        Ok(TrackTarget {
            viewpoint: entry.record.viewpoint,
            elements: entry.record.flattened_elements(),
        })
    }

    /// Viewpoint for a camera at `position` looking along `direction`.
    pub fn viewpoint_from_camera(
        &self,
        position: Point3<f64>,
        direction: Vector3<f64>,
    ) -> Viewpoint {
        Viewpoint::from_camera(position, direction, self.config.view_distance)
    }

    // ========================================================================
    // Derived artifacts
    // ========================================================================

    /// Enables one tool, disabling the others. `None` disables all.
    pub fn set_tool(&mut self, tool: Option<ArtifactKind>) {
        if self.tool != tool {
            tracing::debug!(?tool, "Tool changed");
        }
        self.tool = tool;
    }

    pub fn active_tool(&self) -> Option<ArtifactKind> {
        self.tool
    }

    /// Derives an artifact from the current selection with the enabled tool.
    /// Returns `None` when no tool is enabled.
    pub fn derive_artifact<F>(&mut self, factory: F) -> Result<Option<ArtifactHandle>>
    where
        F: FnOnce(ArtifactKind, &SelectionSet) -> Result<Box<dyn SceneArtifact>>,
    {
        let Some(kind) = self.tool else {
            return Ok(None);
        };
        let selection = self
            .selection
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::validation("selection", "select an element first"))?;
        let model = self.resolve_owner(&selection)?;

        let key = format!("{kind}/{}", selection.group_key());
        let handle = self
            .artifacts
            .create_artifact(&model.runtime, key, kind, || factory(kind, &selection))?;
        Ok(Some(handle))
    }

    /// Removes one artifact. Unknown handles are logged and ignored.
    pub fn delete_artifact(&mut self, handle: ArtifactHandle) -> bool {
        self.artifacts.dispose_artifact(handle)
    }

    /// Removes every artifact a tool created.
    pub fn delete_all_artifacts(&mut self, kind: ArtifactKind) -> usize {
        self.artifacts.dispose_all_of_kind(kind)
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    /// Stored models whose name contains `filter`, ignoring case.
    pub async fn list_models(&self, filter: &str) -> Result<Vec<ModelSummary>> {
        let all = self.models.list_names().await?;
        Ok(filter_models(&all, filter).into_iter().cloned().collect())
    }

    pub async fn model_content(&self, id: PersistedModelId) -> Result<Vec<u8>> {
        self.models.fetch_content(id).await
    }

    /// Deletes a stored model. Returns its runtime id when it is loaded; the
    /// caller removes it from the scene, and the resulting
    /// [`SceneEvent::ModelDisposed`] cleans up.
    pub async fn delete_model(&mut self, id: PersistedModelId) -> Result<Option<RuntimeId>> {
        self.models.delete(id).await?;
        tracing::info!(model = %id, "Model deleted");
        Ok(self.identity.resolve_runtime_id(id).ok())
    }

    pub async fn managers(&self) -> Result<Vec<Manager>> {
        self.annotations.managers().await
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Sort and filter choices. Call [`Self::refresh`] after changing them.
    pub fn query_mut(&mut self) -> &mut AnnotationQueryBuilder {
        &mut self.query
    }

    pub fn query(&self) -> &AnnotationQueryBuilder {
        &self.query
    }

    pub fn listed(&self) -> &[ListEntry] {
        &self.listed
    }

    /// Union of the picked elements, owned by the first picked fragment.
    pub fn selection(&self) -> Option<&SelectionSet> {
        self.selection.as_ref()
    }

    /// Picked element groups, one per fragment, in pick order.
    pub fn selected_groups(&self) -> &[SelectionSet] {
        &self.selected
    }

    pub fn active_model(&self) -> Option<&ActiveModel> {
        self.active.as_ref()
    }

    pub fn identity(&self) -> &IdentityRegistry {
        &self.identity
    }

    /// Clears every binding and lifts a halt after a binding violation.
    pub fn reset_identity(&mut self) {
        self.identity.reset();
    }

    pub fn artifacts(&self) -> &DerivedArtifactRegistry {
        &self.artifacts
    }

    pub fn markers(&self) -> &MarkerPlacer {
        &self.markers
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
