// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Filter/sort parameters for listing the annotations of one model.
//!
//! [`QueryParams`] is sent to the backend as query-string pairs and can also
//! be applied locally, so results are ordered the same way whichever side
//! did the work. Sorting is stable: records the sort key cannot tell apart
//! keep the order the store returned them in.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ids::{ManagerId, PersistedModelId};
use crate::record::{AnnotationRecord, Priority};
use crate::selection::SelectionSet;

/// Ordering applied to an annotation list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortKey {
    /// Case-insensitive title, ascending.
    Title,
    /// Deadline ascending.
    #[default]
    Deadline,
    /// Priority rank descending, then deadline ascending.
    Priority,
}

impl SortKey {
    /// Name the backend understands in `sortBy`. It calls the title sort
    /// `Description`.
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            SortKey::Title => "Description",
            SortKey::Deadline => "Deadline",
            SortKey::Priority => "Priority",
        }
    }

    fn compare(&self, a: &AnnotationRecord, b: &AnnotationRecord) -> Ordering {
        match self {
            SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortKey::Deadline => a.deadline.cmp(&b.deadline),
            SortKey::Priority => b
                .priority
                .rank()
                .cmp(&a.priority.rank())
                .then_with(|| a.deadline.cmp(&b.deadline)),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortKey::Title => "title",
            SortKey::Deadline => "deadline",
            SortKey::Priority => "priority",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort key `{0}` (expected title, deadline or priority)")]
pub struct UnknownSortKey(pub String);

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" | "description" => Ok(SortKey::Title),
            "deadline" => Ok(SortKey::Deadline),
            "priority" => Ok(SortKey::Priority),
            _ => Err(UnknownSortKey(s.to_string())),
        }
    }
}

/// A fully specified list request for one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    pub model_id: PersistedModelId,
    pub sort_by: SortKey,
    /// Empty means every priority.
    pub priorities: BTreeSet<Priority>,
    pub manager: Option<ManagerId>,
}

impl QueryParams {
    /// Returns `true` if `record` passes every filter.
    pub fn matches(&self, record: &AnnotationRecord) -> bool {
        record.model_id == self.model_id
            && (self.priorities.is_empty() || self.priorities.contains(&record.priority))
            && self.manager.map_or(true, |m| record.manager_id == m)
    }

    /// Filters and stably sorts `records`.
    pub fn apply(
        &self,
        records: impl IntoIterator<Item = AnnotationRecord>,
    ) -> Vec<AnnotationRecord> {
        let mut out: Vec<_> = records.into_iter().filter(|r| self.matches(r)).collect();
        out.sort_by(|a, b| self.sort_by.compare(a, b));
        out
    }

    /// Query-string pairs for the list endpoint (the model id goes in the
    /// path).
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("sortBy", self.sort_by.as_wire_str().to_string())];
        if !self.priorities.is_empty() {
            // Most urgent first, matching the filter checkboxes.
            let joined = Priority::ALL
                .iter()
                .filter(|p| self.priorities.contains(*p))
                .map(Priority::as_str)
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("filter", joined));
        }
        if let Some(manager) = self.manager {
            pairs.push(("manager", manager.to_string()));
        }
        pairs
    }
}

/// Holds the current sort and filter choices and turns them into
/// [`QueryParams`] for whichever model is active.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationQueryBuilder {
    sort_by: SortKey,
    priorities: BTreeSet<Priority>,
    manager: Option<ManagerId>,
}

impl AnnotationQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds parameters from explicit arguments.
    pub fn build_query(
        model_id: PersistedModelId,
        sort_by: SortKey,
        priorities: impl IntoIterator<Item = Priority>,
        manager: Option<ManagerId>,
    ) -> QueryParams {
        QueryParams {
            model_id,
            sort_by,
            priorities: priorities.into_iter().collect(),
            manager,
        }
    }

    /// Builds parameters for `model_id` from the current choices.
    pub fn for_model(&self, model_id: PersistedModelId) -> QueryParams {
        Self::build_query(model_id, self.sort_by, self.priorities.iter().copied(), self.manager)
    }

    pub fn sort_by(&self) -> SortKey {
        self.sort_by
    }

    pub fn set_sort(&mut self, sort_by: SortKey) {
        self.sort_by = sort_by;
    }

    /// Turns one priority checkbox on or off.
    pub fn toggle_priority(&mut self, priority: Priority, enabled: bool) {
        if enabled {
            self.priorities.insert(priority);
        } else {
            self.priorities.remove(&priority);
        }
    }

    pub fn set_priorities(&mut self, priorities: impl IntoIterator<Item = Priority>) {
        self.priorities = priorities.into_iter().collect();
    }

    pub fn set_manager(&mut self, manager: Option<ManagerId>) {
        self.manager = manager;
    }
}

/// One rendered row of the annotation list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListEntry {
    pub record: AnnotationRecord,
    /// The record references at least one currently selected element.
    pub highlighted: bool,
}

/// Flags the records that touch the active selection.
pub fn reconcile(
    records: Vec<AnnotationRecord>,
    selection: Option<&SelectionSet>,
) -> Vec<ListEntry> {
    records
        .into_iter()
        .map(|record| {
            let highlighted = selection.map_or(false, |s| record.touches(&s.element_indices));
            ListEntry { record, highlighted }
        })
        .collect()
}
