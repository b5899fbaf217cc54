// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Identifier types, one per id-space.
//!
//! Backend records, scene objects and geometry elements each get their own
//! wrapper so an id from one space can never be compared against or looked up
//! in another. Runtime ids are volatile: the scene hands out fresh ones every
//! time a model is loaded.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Durable backend id of a stored model (the `ifc` column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistedModelId(pub i64);

/// Durable backend id of an annotation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(pub i64);

/// Durable backend id of a manager (person responsible for an annotation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManagerId(pub i64);

/// Scene-assigned id of a loaded model root object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuntimeId(String);

/// Scene-assigned id of a fragment, a geometric subset of a loaded model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentId(String);

/// Index of one building element inside a loaded model (IFC express id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementIndex(pub u32);

macro_rules! opaque_string_id {
    ($name:ident) => {
        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_string_id!(RuntimeId);
opaque_string_id!(FragmentId);

macro_rules! integer_id {
    ($name:ident, $inner:ty) => {
        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

integer_id!(PersistedModelId, i64);
integer_id!(AnnotationId, i64);
integer_id!(ManagerId, i64);
integer_id!(ElementIndex, u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_ids_compare_by_value() {
        assert_eq!(RuntimeId::from("abc"), RuntimeId::new(String::from("abc")));
        assert_ne!(RuntimeId::from("abc"), RuntimeId::from("abd"));
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&PersistedModelId(7)).unwrap();
        assert_eq!(json, "7");
        let json = serde_json::to_string(&FragmentId::from("frag-1")).unwrap();
        assert_eq!(json, "\"frag-1\"");
    }

    #[test]
    fn display_matches_inner_value() {
        assert_eq!(ElementIndex(42).to_string(), "42");
        assert_eq!(RuntimeId::from("model-uuid").to_string(), "model-uuid");
    }
}
