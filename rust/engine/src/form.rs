// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Validation of the annotation form.

use chrono::NaiveDate;

use bimtodo_core::record::deadline_format;
use bimtodo_core::{ManagerId, Priority, ValidationError};

use crate::config::EngineConfig;
use crate::store::AnnotationPatch;

/// Raw values as typed into the annotation form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    pub title: String,
    pub description: String,
    pub manager: Option<ManagerId>,
    /// `YYYY-MM-DD`.
    pub deadline: String,
    /// `LOW`, `MEDIUM` or `HIGH`, any case. Empty means `LOW`.
    pub priority: String,
    pub writer: Option<i64>,
}

/// Form values that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidForm {
    pub title: String,
    pub description: String,
    pub manager: ManagerId,
    pub deadline: NaiveDate,
    pub priority: Priority,
    pub writer: Option<i64>,
}

impl FormFields {
    /// Checks every field, reporting the first failure.
    pub fn validate(&self, config: &EngineConfig) -> Result<ValidForm, ValidationError> {
        let title = check_title(&self.title, config)?;
        let description = check_description(&self.description, config)?;
        let manager = self
            .manager
            .ok_or_else(|| ValidationError::new("manager", "a manager must be assigned"))?;
        let deadline = parse_deadline(&self.deadline)?;
        let priority = parse_priority(&self.priority)?;

        Ok(ValidForm {
            title,
            description,
            manager,
            deadline,
            priority,
            writer: self.writer,
        })
    }
}

/// Applies the form limits to the fields a patch sets.
pub fn validate_patch(
    patch: &AnnotationPatch,
    config: &EngineConfig,
) -> Result<(), ValidationError> {
    if patch.is_empty() {
        return Err(ValidationError::new("patch", "nothing to update"));
    }
    if let Some(title) = &patch.title {
        check_title(title, config)?;
    }
    if let Some(description) = &patch.description {
        check_description(description, config)?;
    }
    if let Some(groups) = &patch.element_index_groups {
        if groups.iter().all(|g| g.is_empty()) {
            return Err(ValidationError::new("selection", "at least one element is required"));
        }
    }
    Ok(())
}

fn check_title(raw: &str, config: &EngineConfig) -> Result<String, ValidationError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ValidationError::new("title", "must not be empty"));
    }
    let len = title.chars().count();
    if len > config.title_max_len {
        return Err(ValidationError::new(
            "title",
            format!("{len} characters exceeds the limit of {}", config.title_max_len),
        ));
    }
    Ok(title.to_string())
}

fn check_description(raw: &str, config: &EngineConfig) -> Result<String, ValidationError> {
    let len = raw.chars().count();
    if len > config.description_max_len {
        return Err(ValidationError::new(
            "description",
            format!("{len} characters exceeds the limit of {}", config.description_max_len),
        ));
    }
    Ok(raw.to_string())
}

fn parse_deadline(raw: &str) -> Result<NaiveDate, ValidationError> {
    if raw.trim().is_empty() {
        return Err(ValidationError::new("deadline", "a deadline is required"));
    }
    deadline_format::parse(raw)
        .ok_or_else(|| {
            ValidationError::new("deadline", format!("`{raw}` is not a YYYY-MM-DD date"))
        })
}

fn parse_priority(raw: &str) -> Result<Priority, ValidationError> {
    if raw.trim().is_empty() {
        return Ok(Priority::default());
    }
    raw.parse::<Priority>()
        .map_err(|e| ValidationError::new("priority", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> FormFields {
        FormFields {
            title: "  Fire door swing  ".into(),
            description: "Swings into the corridor".into(),
            manager: Some(ManagerId(3)),
            deadline: "2024-09-01".into(),
            priority: "high".into(),
            writer: Some(1),
        }
    }

    #[test]
    fn valid_form_is_normalized() {
        let form = filled().validate(&EngineConfig::builtin()).unwrap();
        assert_eq!(form.title, "Fire door swing");
        assert_eq!(form.priority, Priority::High);
        assert_eq!(form.deadline, NaiveDate::from_ymd_opt(2024, 9, 1).unwrap());
    }

    #[test]
    fn empty_priority_defaults_to_low() {
        let mut fields = filled();
        fields.priority = String::new();
        assert_eq!(fields.validate(&EngineConfig::builtin()).unwrap().priority, Priority::Low);
    }

    fn mutated(change: impl Fn(&mut FormFields)) -> FormFields {
        let mut fields = filled();
        change(&mut fields);
        fields
    }

    #[test]
    fn each_field_reports_itself() {
        let config = EngineConfig::builtin();
        let cases = vec![
            ("title", mutated(|f| f.title = "   ".into())),
            ("title", mutated(|f| f.title = "x".repeat(121))),
            ("description", mutated(|f| f.description = "x".repeat(2001))),
            ("manager", mutated(|f| f.manager = None)),
            ("deadline", mutated(|f| f.deadline = "next friday".into())),
            ("deadline", mutated(|f| f.deadline = String::new())),
            ("priority", mutated(|f| f.priority = "URGENT".into())),
        ];
        for (field, fields) in cases {
            assert_eq!(fields.validate(&config).unwrap_err().field, field);
        }
    }

    #[test]
    fn title_limit_counts_characters() {
        let mut fields = filled();
        fields.title = "가".repeat(120);
        assert!(fields.validate(&EngineConfig::builtin()).is_ok());
    }

    #[test]
    fn patch_limits() {
        let config = EngineConfig::builtin();
        let err = validate_patch(&AnnotationPatch::default(), &config).unwrap_err();
        assert_eq!(err.field, "patch");

        let patch = AnnotationPatch {
            title: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(validate_patch(&patch, &config).unwrap_err().field, "title");

        let patch = AnnotationPatch {
            priority: Some(Priority::Medium),
            ..Default::default()
        };
        assert!(validate_patch(&patch, &config).is_ok());
    }
}
