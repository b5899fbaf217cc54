// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bidirectional persisted-id ⇄ runtime-id registry.
//!
//! The scene assigns a fresh runtime id to every model it loads, while the
//! backend refers to models by durable integer ids. [`IdentityRegistry`]
//! keeps the two in a bijection over the models currently loaded, with O(1)
//! lookups in both directions.
//!
//! A conflicting binding means a collaborator broke its contract. The write is
//! rejected without touching the table and the registry halts: every further
//! write fails with [`Error::RegistryHalted`] until [`IdentityRegistry::reset`]
//! is called. Reads keep working.

use rustc_hash::FxHashMap;

use crate::error::{EntityKind, Error, Result};
use crate::ids::{PersistedModelId, RuntimeId};
use crate::record::ModelRecord;

/// Registry of the models currently loaded into the scene.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    by_persisted: FxHashMap<PersistedModelId, ModelRecord>,
    by_runtime: FxHashMap<RuntimeId, PersistedModelId>,
    halted: bool,
}

impl IdentityRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `persisted` to `runtime`.
    ///
    /// Re-registering the exact same pair is a no-op. Binding either id to a
    /// different counterpart fails with [`Error::DuplicateBinding`] and halts
    /// the registry.
    pub fn register(
        &mut self,
        persisted: PersistedModelId,
        runtime: RuntimeId,
        display_name: impl Into<String>,
    ) -> Result<()> {
        if self.halted {
            return Err(Error::RegistryHalted);
        }

        let by_persisted = self.by_persisted.get(&persisted).map(|r| &r.runtime_id);
        let by_runtime = self.by_runtime.get(&runtime);

        match (by_persisted, by_runtime) {
            (Some(existing), Some(&owner)) if *existing == runtime && owner == persisted => {
                return Ok(());
            }
            (Some(existing), _) => {
                let existing = existing.to_string();
                return Err(self.violation(persisted, runtime, existing));
            }
            (None, Some(&owner)) => {
                let existing = owner.to_string();
                return Err(self.violation(persisted, runtime, existing));
            }
            (None, None) => {}
        }

        tracing::debug!(model = %persisted, runtime = %runtime, "Registered model binding");
        self.by_runtime.insert(runtime.clone(), persisted);
        self.by_persisted.insert(
            persisted,
            ModelRecord {
                persisted_id: persisted,
                runtime_id: runtime,
                display_name: display_name.into(),
            },
        );
        Ok(())
    }

    fn violation(
        &mut self,
        persisted: PersistedModelId,
        runtime: RuntimeId,
        existing: String,
    ) -> Error {
        tracing::error!(
            model = %persisted,
            runtime = %runtime,
            existing = %existing,
            "Identity bijection violated, halting registry writes"
        );
        self.halted = true;
        Error::DuplicateBinding {
            persisted,
            runtime,
            existing,
        }
    }

    /// Removes the binding for `persisted`. Absent ids are a no-op.
    ///
    /// Returns the removed record, if any.
    pub fn unregister(&mut self, persisted: PersistedModelId) -> Result<Option<ModelRecord>> {
        if self.halted {
            return Err(Error::RegistryHalted);
        }
        let removed = self.by_persisted.remove(&persisted);
        if let Some(record) = &removed {
            self.by_runtime.remove(&record.runtime_id);
            tracing::debug!(
                model = %persisted,
                runtime = %record.runtime_id,
                "Unregistered model binding"
            );
        }
        Ok(removed)
    }

    /// Removes the binding owned by `runtime`. Absent ids are a no-op.
    pub fn unregister_runtime(&mut self, runtime: &RuntimeId) -> Result<Option<ModelRecord>> {
        if self.halted {
            return Err(Error::RegistryHalted);
        }
        match self.by_runtime.get(runtime).copied() {
            Some(persisted) => self.unregister(persisted),
            None => Ok(None),
        }
    }

    /// Looks up the backend id of a loaded model.
    pub fn resolve_persisted_id(&self, runtime: &RuntimeId) -> Result<PersistedModelId> {
        self.by_runtime
            .get(runtime)
            .copied()
            .ok_or_else(|| Error::not_found(EntityKind::LoadedModel, runtime))
    }

    /// Looks up the scene id a stored model is currently loaded as.
    pub fn resolve_runtime_id(&self, persisted: PersistedModelId) -> Result<RuntimeId> {
        self.by_persisted
            .get(&persisted)
            .map(|r| r.runtime_id.clone())
            .ok_or_else(|| Error::not_found(EntityKind::LoadedModel, persisted))
    }

    /// Returns the record for a loaded model.
    pub fn record(&self, persisted: PersistedModelId) -> Option<&ModelRecord> {
        self.by_persisted.get(&persisted)
    }

    /// Returns `true` if a model with this runtime id is loaded.
    pub fn is_loaded(&self, runtime: &RuntimeId) -> bool {
        self.by_runtime.contains_key(runtime)
    }

    /// Iterates over every loaded model, in no particular order.
    pub fn loaded(&self) -> impl Iterator<Item = &ModelRecord> {
        self.by_persisted.values()
    }

    /// Number of loaded models.
    pub fn len(&self) -> usize {
        self.by_persisted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_persisted.is_empty()
    }

    /// `true` after a bijection violation until [`reset`](Self::reset).
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Drops every binding and lifts the halted state.
    pub fn reset(&mut self) {
        tracing::info!(bindings = self.by_persisted.len(), "Resetting identity registry");
        self.by_persisted.clear();
        self.by_runtime.clear();
        self.halted = false;
    }
}
