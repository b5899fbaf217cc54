// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types shared by every markup component.

use std::fmt;

use crate::ids::{PersistedModelId, RuntimeId};

/// Result type alias for markup operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while correlating, selecting or editing markup.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A referenced id is absent. Recovered locally and shown to the user.
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// Malformed user input. Blocks the operation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The persisted/runtime bijection would be broken by this binding.
    #[error(
        "duplicate binding: model {persisted} -> {runtime} conflicts with existing {existing}"
    )]
    DuplicateBinding {
        persisted: PersistedModelId,
        runtime: RuntimeId,
        existing: String,
    },

    /// The identity registry refused a write after a bijection violation.
    #[error("identity registry is halted after a binding violation; reset it first")]
    RegistryHalted,

    /// A collaborator was unreachable or answered with a non-success status.
    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl Error {
    pub fn not_found(kind: EntityKind, id: impl fmt::Display) -> Self {
        Error::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Error::Validation(ValidationError::new(field, message))
    }

    /// Returns `true` if the user should be offered a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network(e) if e.class.is_retryable())
    }
}

/// What kind of entity a [`Error::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Model,
    LoadedModel,
    Annotation,
    Fragment,
    Artifact,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Model => "model",
            EntityKind::LoadedModel => "loaded model",
            EntityKind::Annotation => "annotation",
            EntityKind::Fragment => "fragment",
            EntityKind::Artifact => "artifact",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field-level input error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Coarse class of a failed collaborator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 4xx answer.
    Client(u16),
    /// 5xx answer.
    Server(u16),
    /// No answer at all (connect, timeout, decode).
    Transport,
}

impl StatusClass {
    pub fn from_status(status: u16) -> Self {
        if (400..500).contains(&status) {
            StatusClass::Client(status)
        } else if status >= 500 {
            StatusClass::Server(status)
        } else {
            StatusClass::Transport
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self, StatusClass::Client(_))
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusClass::Client(code) => write!(f, "client error {code}"),
            StatusClass::Server(code) => write!(f, "server error {code}"),
            StatusClass::Transport => f.write_str("network failure"),
        }
    }
}

/// A collaborator call that did not succeed. No retry is performed here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} failed ({class}): {message}")]
pub struct NetworkError {
    pub operation: &'static str,
    pub class: StatusClass,
    pub message: String,
}

impl NetworkError {
    pub fn new(operation: &'static str, class: StatusClass, message: impl Into<String>) -> Self {
        Self {
            operation,
            class,
            message: message.into(),
        }
    }

    pub fn transport(operation: &'static str, message: impl Into<String>) -> Self {
        Self::new(operation, StatusClass::Transport, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes() {
        assert_eq!(StatusClass::from_status(404), StatusClass::Client(404));
        assert_eq!(StatusClass::from_status(503), StatusClass::Server(503));
        assert_eq!(StatusClass::from_status(302), StatusClass::Transport);
        assert!(!StatusClass::Client(400).is_retryable());
        assert!(StatusClass::Server(500).is_retryable());
        assert!(StatusClass::Transport.is_retryable());
    }

    #[test]
    fn messages_name_the_field() {
        let err = Error::validation("title", "must not be empty");
        assert_eq!(err.to_string(), "invalid title: must not be empty");

        let err = Error::not_found(EntityKind::Annotation, 12);
        assert_eq!(err.to_string(), "annotation not found: 12");
    }

    #[test]
    fn network_errors_are_retryable_unless_client_side() {
        let server =
            Error::from(NetworkError::new("list", StatusClass::Server(502), "bad gateway"));
        assert!(server.is_retryable());
        let client = Error::from(NetworkError::new("list", StatusClass::Client(422), "nope"));
        assert!(!client.is_retryable());
        assert!(!Error::RegistryHalted.is_retryable());
    }
}
