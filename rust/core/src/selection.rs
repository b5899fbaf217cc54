// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! User selections of elements inside a loaded model.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::ids::{ElementIndex, FragmentId};

/// A pick/selection event as the scene reports it: element indices keyed by
/// the fragment they were picked from, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSelection {
    groups: Vec<(FragmentId, BTreeSet<ElementIndex>)>,
}

impl RawSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a group. A fragment named twice has its indices merged into the
    /// first occurrence.
    pub fn with_group(
        mut self,
        fragment: impl Into<FragmentId>,
        indices: impl IntoIterator<Item = u32>,
    ) -> Self {
        self.push(fragment.into(), indices.into_iter().map(ElementIndex));
        self
    }

    pub fn push(&mut self, fragment: FragmentId, indices: impl IntoIterator<Item = ElementIndex>) {
        match self.groups.iter_mut().find(|(f, _)| *f == fragment) {
            Some((_, set)) => set.extend(indices),
            None => self.groups.push((fragment, indices.into_iter().collect())),
        }
    }

    /// Fragments in emission order.
    pub fn fragments(&self) -> impl Iterator<Item = &FragmentId> {
        self.groups.iter().map(|(f, _)| f)
    }

    pub fn groups(&self) -> &[(FragmentId, BTreeSet<ElementIndex>)] {
        &self.groups
    }

    /// One [`SelectionSet`] per fragment, in emission order.
    pub fn selection_sets(&self) -> Vec<SelectionSet> {
        self.groups
            .iter()
            .map(|(owner, indices)| SelectionSet {
                owner: owner.clone(),
                element_indices: indices.clone(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// The elements currently chosen within one fragment.
///
/// Rebuilt from scratch on every selection event. An empty index set is valid
/// and means nothing is selected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionSet {
    pub owner: FragmentId,
    pub element_indices: BTreeSet<ElementIndex>,
}

impl SelectionSet {
    pub fn new(owner: impl Into<FragmentId>, indices: impl IntoIterator<Item = u32>) -> Self {
        Self {
            owner: owner.into(),
            element_indices: indices.into_iter().map(ElementIndex).collect(),
        }
    }

    /// Builds a selection from the first group of a pick event.
    ///
    /// Selections spanning several fragments collapse to the first one.
    /// Returns `None` when the event carries no group at all (cleared
    /// selection).
    pub fn from_selection_event(raw: &RawSelection) -> Option<Self> {
        raw.groups.first().map(|(owner, indices)| Self {
            owner: owner.clone(),
            element_indices: indices.clone(),
        })
    }

    /// Union of the element indices of several selections.
    pub fn union<'a>(sets: impl IntoIterator<Item = &'a SelectionSet>) -> BTreeSet<ElementIndex> {
        sets.into_iter()
            .flat_map(|s| s.element_indices.iter().copied())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.element_indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.element_indices.len()
    }

    pub fn contains(&self, index: ElementIndex) -> bool {
        self.element_indices.contains(&index)
    }

    /// Stable key naming this exact group: `<fragment>:<i1,i2,...>`.
    pub fn group_key(&self) -> String {
        let mut key = String::with_capacity(self.owner.as_str().len() + 8 * self.len());
        key.push_str(self.owner.as_str());
        key.push(':');
        for (i, idx) in self.element_indices.iter().enumerate() {
            if i > 0 {
                key.push(',');
            }
            let _ = write!(key, "{}", idx.0);
        }
        key
    }
}
