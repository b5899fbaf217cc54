// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Records exchanged with the annotation backend.
//!
//! The serde layout follows the backend's JSON rows, which predate this crate:
//! element groups travel as a JSON-encoded string (`expressIDs`) and the
//! camera may arrive either as an object or as a JSON string.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::ids::{AnnotationId, ElementIndex, ManagerId, PersistedModelId, RuntimeId};

/// Binding between a stored model and the scene object it was loaded as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRecord {
    pub persisted_id: PersistedModelId,
    pub runtime_id: RuntimeId,
    pub display_name: String,
}

/// One row of the model catalog (`{id, name}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub id: PersistedModelId,
    pub name: String,
}

/// Case-insensitive substring filter over the model catalog.
pub fn filter_models<'a>(models: &'a [ModelSummary], query: &str) -> Vec<&'a ModelSummary> {
    let needle = query.trim().to_lowercase();
    models
        .iter()
        .filter(|m| needle.is_empty() || m.name.to_lowercase().contains(&needle))
        .collect()
}

/// Person an annotation can be assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manager {
    pub id: ManagerId,
    pub name: String,
    pub position: String,
}

impl Manager {
    /// Label used in pickers: `name [position]`.
    pub fn label(&self) -> String {
        format!("{} [{}]", self.name, self.position)
    }
}

/// Annotation urgency.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Sort rank, higher is more urgent.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no priority.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown priority `{0}` (expected LOW, MEDIUM or HIGH)")]
pub struct UnknownPriority(pub String);

impl FromStr for Priority {
    type Err = UnknownPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Priority::Low),
            "MEDIUM" => Ok(Priority::Medium),
            "HIGH" => Ok(Priority::High),
            _ => Err(UnknownPriority(s.to_string())),
        }
    }
}

/// Camera pose stored with an annotation so it can be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewpoint {
    #[serde(with = "xyz")]
    pub position: Point3<f64>,
    #[serde(with = "xyz")]
    pub target: Point3<f64>,
}

impl Viewpoint {
    pub fn new(position: Point3<f64>, target: Point3<f64>) -> Self {
        Self { position, target }
    }

    /// Builds a viewpoint looking from `position` along `direction`, with the
    /// target placed `distance` units ahead.
    pub fn from_camera(position: Point3<f64>, direction: Vector3<f64>, distance: f64) -> Self {
        let ahead = direction
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(|| Vector3::new(0.0, 0.0, -1.0));
        Self {
            position,
            target: position + ahead * distance,
        }
    }
}

impl Default for Viewpoint {
    fn default() -> Self {
        Self::new(Point3::origin(), Point3::origin())
    }
}

/// A persisted annotation ("todo") attached to elements of one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub id: AnnotationId,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "content", default)]
    pub description: String,
    #[serde(rename = "ifc")]
    pub model_id: PersistedModelId,
    #[serde(rename = "manager")]
    pub manager_id: ManagerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_position: Option<String>,
    #[serde(rename = "writer", default, skip_serializing_if = "Option::is_none")]
    pub writer_id: Option<i64>,
    #[serde(rename = "createDate")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "deadline_format")]
    pub deadline: NaiveDate,
    pub priority: Priority,
    #[serde(rename = "expressIDs", with = "element_groups")]
    pub element_index_groups: Vec<BTreeSet<ElementIndex>>,
    #[serde(rename = "camera", with = "camera_format")]
    pub viewpoint: Viewpoint,
}

impl AnnotationRecord {
    /// Union of every element group.
    pub fn flattened_elements(&self) -> BTreeSet<ElementIndex> {
        self.element_index_groups
            .iter()
            .flat_map(|g| g.iter().copied())
            .collect()
    }

    /// Returns `true` if any referenced element is in `selected`.
    pub fn touches(&self, selected: &BTreeSet<ElementIndex>) -> bool {
        self.element_index_groups
            .iter()
            .any(|g| g.iter().any(|e| selected.contains(e)))
    }

    /// Manager line shown in list entries, when the backend joined it in.
    pub fn manager_label(&self) -> Option<String> {
        match (&self.manager_name, &self.manager_position) {
            (Some(name), Some(position)) => Some(format!("{name} [{position}]")),
            (Some(name), None) => Some(name.clone()),
            _ => None,
        }
    }
}

/// `{x, y, z}` objects for nalgebra points.
pub(crate) mod xyz {
    use nalgebra::Point3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Xyz {
        x: f64,
        y: f64,
        z: f64,
    }

    pub fn serialize<S: Serializer>(p: &Point3<f64>, s: S) -> Result<S::Ok, S::Error> {
        Xyz {
            x: p.x,
            y: p.y,
            z: p.z,
        }
        .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Point3<f64>, D::Error> {
        let v = Xyz::deserialize(d)?;
        Ok(Point3::new(v.x, v.y, v.z))
    }
}

/// Deadlines are written as `YYYY-MM-DD`; the backend may send a full
/// timestamp back.
pub mod deadline_format {
    use chrono::{DateTime, NaiveDate};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn parse(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, FORMAT) {
            return Some(date);
        }
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.date_naive())
    }

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&date.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("unparsable deadline `{raw}`")))
    }
}

/// Element groups as a JSON string holding `number[][]`. Legacy rows hold a
/// flat `number[]`, or mix numbers and arrays; a bare number becomes its own
/// group.
pub mod element_groups {
    use std::collections::BTreeSet;

    use serde::{de, Deserialize, Deserializer, Serializer};

    use crate::ids::ElementIndex;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Item {
        Group(Vec<u32>),
        Single(u32),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Encoded {
        Text(String),
        Inline(Vec<Item>),
    }

    pub fn decode(raw: &str) -> Result<Vec<BTreeSet<ElementIndex>>, serde_json::Error> {
        let items: Vec<Item> = serde_json::from_str(raw)?;
        Ok(from_items(items))
    }

    pub fn encode(groups: &[BTreeSet<ElementIndex>]) -> String {
        let nested: Vec<Vec<u32>> = groups
            .iter()
            .map(|g| g.iter().map(|e| e.0).collect())
            .collect();
        // Vec<Vec<u32>> always serializes.
        serde_json::to_string(&nested).unwrap_or_else(|_| "[]".to_string())
    }

    fn from_items(items: Vec<Item>) -> Vec<BTreeSet<ElementIndex>> {
        items
            .into_iter()
            .map(|item| match item {
                Item::Group(ids) => ids.into_iter().map(ElementIndex).collect(),
                Item::Single(id) => BTreeSet::from([ElementIndex(id)]),
            })
            .collect()
    }

    pub fn serialize<S: Serializer>(
        groups: &[BTreeSet<ElementIndex>],
        s: S,
    ) -> Result<S::Ok, S::Error> {
        s.serialize_str(&encode(groups))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Vec<BTreeSet<ElementIndex>>, D::Error> {
        match Encoded::deserialize(d)? {
            Encoded::Text(raw) => decode(&raw).map_err(de::Error::custom),
            Encoded::Inline(items) => Ok(from_items(items)),
        }
    }
}

/// Camera as an object, or as a JSON string containing that object.
pub mod camera_format {
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    use super::Viewpoint;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Encoded {
        Object(Viewpoint),
        Text(String),
    }

    pub fn serialize<S: Serializer>(v: &Viewpoint, s: S) -> Result<S::Ok, S::Error> {
        v.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Viewpoint, D::Error> {
        match Encoded::deserialize(d)? {
            Encoded::Object(v) => Ok(v),
            Encoded::Text(raw) => serde_json::from_str(&raw).map_err(de::Error::custom),
        }
    }
}
